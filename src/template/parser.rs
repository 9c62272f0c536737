//! A small, forgiving HTML parser for marked-up template markup.
//!
//! This is not a conformant HTML5 tree builder: there is no implied end tag insertion or foster parenting.
//! Unmatched closing tags are ignored, unclosed elements are closed at the end of input.

use crate::dom::{is_raw_text_element, is_void_element, Namespace};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplateNode {
	Element { name: String, namespace: Namespace, attributes: Vec<(String, String)>, children: Vec<TemplateNode> },
	Text(String),
	Comment(String),
}

struct OpenElement {
	name: String,
	namespace: Namespace,
	attributes: Vec<(String, String)>,
	children: Vec<TemplateNode>,
}

struct Parser<'a> {
	input: &'a str,
	position: usize,
	stack: Vec<OpenElement>,
	root: Vec<TemplateNode>,
}

fn is_space(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

fn first_length(text: &str) -> usize {
	text.chars().next().map_or(0, char::len_utf8)
}

fn starts_with_letter(text: &str) -> bool {
	text.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
}

pub(crate) fn parse(markup: &str) -> Vec<TemplateNode> {
	let mut parser = Parser { input: markup, position: 0, stack: Vec::new(), root: Vec::new() };
	parser.run();
	while !parser.stack.is_empty() {
		parser.close_top();
	}
	parser.root
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.input[self.position..]
	}

	fn append(&mut self, node: TemplateNode) {
		let siblings = match self.stack.last_mut() {
			Some(parent) => &mut parent.children,
			None => &mut self.root,
		};
		if let TemplateNode::Text(text) = &node {
			if let Some(TemplateNode::Text(previous)) = siblings.last_mut() {
				previous.push_str(text);
				return;
			}
		}
		siblings.push(node);
	}

	fn close_top(&mut self) {
		if let Some(OpenElement { name, namespace, attributes, children }) = self.stack.pop() {
			self.append(TemplateNode::Element { name, namespace, attributes, children });
		}
	}

	fn namespace_for(&self, name: &str) -> Namespace {
		if name.eq_ignore_ascii_case("svg") {
			return Namespace::Svg;
		}
		if name.eq_ignore_ascii_case("math") {
			return Namespace::MathMl;
		}
		match self.stack.last() {
			Some(parent) if parent.namespace == Namespace::Svg && parent.name.eq_ignore_ascii_case("foreignObject") => Namespace::Html,
			Some(parent) => parent.namespace,
			None => Namespace::Html,
		}
	}

	fn run(&mut self) {
		while self.position < self.input.len() {
			let rest = self.rest();
			if let Some(body) = rest.strip_prefix("<!--") {
				let (data, consumed) = match body.find("-->") {
					Some(end) => (&body[..end], 4 + end + 3),
					None => (body, rest.len()),
				};
				self.append(TemplateNode::Comment(data.to_owned()));
				self.position += consumed;
			} else if rest.starts_with("</") && starts_with_letter(&rest[2..]) {
				self.end_tag();
			} else if rest.starts_with("<?") || rest.starts_with("<!") || rest.starts_with("</") {
				// Bogus comment. Processing instructions keep their `?`.
				let skip = if rest.starts_with("<?") { 1 } else { 2 };
				let body = &rest[skip..];
				let (data, consumed) = match body.find('>') {
					Some(end) => (&body[..end], skip + end + 1),
					None => (body, rest.len()),
				};
				self.append(TemplateNode::Comment(data.to_owned()));
				self.position += consumed;
			} else if rest.starts_with('<') && starts_with_letter(&rest[1..]) {
				self.start_tag();
			} else {
				let first = first_length(rest);
				let end = rest[first..].find('<').map_or(rest.len(), |end| end + first);
				self.append(TemplateNode::Text(decode(&rest[..end])));
				self.position += end;
			}
		}
	}

	fn skip_spaces(&mut self) {
		let rest = self.rest();
		self.position += rest.len() - rest.trim_start_matches(is_space).len();
	}

	fn start_tag(&mut self) {
		let rest = &self.rest()[1..];
		let name_length = rest.find(|c: char| is_space(c) || c == '/' || c == '>').unwrap_or_else(|| rest.len());
		let raw_name = &rest[..name_length];
		let namespace = self.namespace_for(raw_name);
		let name = if namespace == Namespace::Html { raw_name.to_ascii_lowercase() } else { raw_name.to_owned() };
		self.position += 1 + name_length;

		let mut attributes: Vec<(String, String)> = Vec::new();
		let mut self_closing = false;
		loop {
			self.skip_spaces();
			let rest = self.rest();
			if rest.is_empty() {
				break;
			} else if rest.starts_with("/>") {
				self_closing = true;
				self.position += 2;
				break;
			} else if rest.starts_with('>') {
				self.position += 1;
				break;
			} else if rest.starts_with('/') {
				self.position += 1;
				continue;
			}

			let first = first_length(rest);
			let name_length = rest[first..].find(|c: char| is_space(c) || c == '/' || c == '>' || c == '=').map_or(rest.len(), |length| length + first);
			let attribute_name = rest[..name_length].to_owned();
			self.position += name_length;
			self.skip_spaces();
			let value = if self.rest().starts_with('=') {
				self.position += 1;
				self.skip_spaces();
				self.attribute_value()
			} else {
				String::new()
			};
			if !attributes.iter().any(|(name, _)| name == &attribute_name) {
				attributes.push((attribute_name, value));
			}
		}

		if (namespace == Namespace::Html && is_void_element(&name)) || (self_closing && namespace != Namespace::Html) {
			self.append(TemplateNode::Element { name, namespace, attributes, children: Vec::new() });
		} else if is_raw_text_element(&name) {
			let rest = self.rest();
			let end = find_end_tag(rest, &name);
			let text = &rest[..end];
			let text = if name.eq_ignore_ascii_case("textarea") || name.eq_ignore_ascii_case("title") { decode(text) } else { text.to_owned() };
			let children = if text.is_empty() { Vec::new() } else { vec![TemplateNode::Text(text)] };
			self.position += end;
			let rest = self.rest();
			self.position += rest.find('>').map_or(rest.len(), |close| close + 1);
			self.append(TemplateNode::Element { name, namespace, attributes, children });
		} else {
			self.stack.push(OpenElement { name, namespace, attributes, children: Vec::new() });
		}
	}

	fn attribute_value(&mut self) -> String {
		let rest = self.rest();
		match rest.chars().next() {
			Some(quote) if quote == '"' || quote == '\'' => {
				let body = &rest[1..];
				let end = body.find(quote).unwrap_or_else(|| body.len());
				self.position += 1 + end + usize::from(end < body.len());
				decode(&body[..end])
			}
			_ => {
				let end = rest.find(|c: char| is_space(c) || c == '>').unwrap_or_else(|| rest.len());
				self.position += end;
				decode(&rest[..end])
			}
		}
	}

	fn end_tag(&mut self) {
		let rest = &self.rest()[2..];
		let name_length = rest.find(|c: char| is_space(c) || c == '/' || c == '>').unwrap_or_else(|| rest.len());
		let name = &rest[..name_length];
		self.position += 2 + rest.find('>').map_or(rest.len(), |close| close + 1);

		if let Some(index) = self.stack.iter().rposition(|open| open.name.eq_ignore_ascii_case(name)) {
			while self.stack.len() > index {
				self.close_top();
			}
		}
	}
}

/// Finds the start of `</name` (ASCII case-insensitive) followed by a delimiter, or the end of `text`.
fn find_end_tag(text: &str, name: &str) -> usize {
	let bytes = text.as_bytes();
	let mut from = 0;
	while let Some(offset) = text[from..].find("</") {
		let start = from + offset;
		let name_end = start + 2 + name.len();
		if bytes.get(start + 2..name_end).map_or(false, |candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
			&& bytes.get(name_end).map_or(true, |&next| next == b'>' || next == b'/' || is_space(char::from(next)))
		{
			return start;
		}
		from = start + 2;
	}
	text.len()
}

/// Decodes character references. Only the most common named ones are supported.
pub(crate) fn decode(text: &str) -> String {
	if !text.contains('&') {
		return text.to_owned();
	}

	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(ampersand) = rest.find('&') {
		decoded.push_str(&rest[..ampersand]);
		rest = &rest[ampersand..];
		match decode_reference(rest) {
			Some((c, length)) => {
				decoded.push(c);
				rest = &rest[length..];
			}
			None => {
				decoded.push('&');
				rest = &rest[1..];
			}
		}
	}
	decoded.push_str(rest);
	decoded
}

fn decode_reference(text: &str) -> Option<(char, usize)> {
	let end = text.find(';').filter(|&end| end < 12)?;
	let name = &text[1..end];
	let c = match name {
		"amp" => '&',
		"lt" => '<',
		"gt" => '>',
		"quot" => '"',
		"apos" => '\'',
		"nbsp" => '\u{a0}',
		_ => {
			let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
				u32::from_str_radix(hex, 16).ok()?
			} else {
				name.strip_prefix('#')?.parse().ok()?
			};
			char::from_u32(code)?
		}
	};
	Some((c, end + 1))
}

#[cfg(test)]
mod tests {
	use super::{decode, parse, TemplateNode};
	use crate::dom::Namespace;
	use pretty_assertions::assert_eq;

	fn element(name: &str, attributes: &[(&str, &str)], children: Vec<TemplateNode>) -> TemplateNode {
		TemplateNode::Element {
			name: name.to_owned(),
			namespace: Namespace::Html,
			attributes: attributes.iter().map(|&(name, value)| (name.to_owned(), value.to_owned())).collect(),
			children,
		}
	}

	fn text(text: &str) -> TemplateNode {
		TemplateNode::Text(text.to_owned())
	}

	#[test]
	fn nested_elements_and_attributes() {
		assert_eq!(
			parse("<DIV id=a class=\"b c\" hidden><p>x &amp; y</p><br>tail</div>"),
			vec![element(
				"div",
				&[("id", "a"), ("class", "b c"), ("hidden", "")],
				vec![element("p", &[], vec![text("x & y")]), element("br", &[], vec![]), text("tail")]
			)]
		);
	}

	#[test]
	fn comments_and_processing_instructions() {
		assert_eq!(
			parse("<!-- a --><?lit$1$>b<!x>"),
			vec![TemplateNode::Comment(" a ".to_owned()), TemplateNode::Comment("?lit$1$".to_owned()), text("b"), TemplateNode::Comment("x".to_owned())]
		);
	}

	#[test]
	fn raw_text_is_not_parsed() {
		assert_eq!(
			parse("<script>if (a <b) {}</script><textarea>&lt;</TEXTAREA>"),
			vec![element("script", &[], vec![text("if (a <b) {}")]), element("textarea", &[], vec![text("<")])]
		);
	}

	#[test]
	fn foreign_content() {
		let nodes = parse("<svg viewBox=\"0 0 1 1\"><circle r=1 /><foreignObject><p></p></foreignObject></svg>");
		let svg = match &nodes[..] {
			[TemplateNode::Element { namespace: Namespace::Svg, children, .. }] => children,
			other => panic!("unexpected nodes: {:?}", other),
		};
		match &svg[..] {
			[TemplateNode::Element { name: circle, namespace: Namespace::Svg, children: circle_children, .. }, TemplateNode::Element { name: foreign_object, children, .. }] => {
				assert_eq!(circle, "circle");
				assert!(circle_children.is_empty());
				assert_eq!(foreign_object, "foreignObject");
				assert!(matches!(&children[..], [TemplateNode::Element { namespace: Namespace::Html, .. }]));
			}
			other => panic!("unexpected svg children: {:?}", other),
		}
	}

	#[test]
	fn unmatched_closing_tags_are_ignored() {
		assert_eq!(parse("<p>a</span>b</p>"), vec![element("p", &[], vec![text("ab")])]);
	}

	#[test]
	fn character_references() {
		assert_eq!(decode("&lt;&#65;&#x42;&unknown; & &"), "<AB&unknown; & &");
	}
}
