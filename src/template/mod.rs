//! Template compilation.
//!
//! The static strings of a template are [scanned](`scanner`) into HTML with markers at each binding position,
//! [parsed](`parser`) into an immutable node tree and walked once to find a [`PartDescriptor`] for each binding.
//! The result is cached per call site, see [`TemplateStrings`].

mod cache;
mod parser;
mod scanner;

pub(crate) use cache::template_for;

use crate::{
	dom::Node,
	error::{ParseErrorKind, TemplateParseError},
	part::PartKind,
	value::Value,
};
use core::fmt::{self, Debug, Formatter};
use parser::TemplateNode;
use std::{rc::Rc, sync::Arc};
use tracing::trace_span;

pub(crate) const MARKER: &str = "lit$29831$";
/// The data of a child marker comment, which the parser sees as processing instruction.
pub(crate) const MARKER_MATCH: &str = "?lit$29831$";
pub(crate) const NODE_MARKER: &str = "<?lit$29831$>";
pub(crate) const BOUND_ATTRIBUTE_SUFFIX: &str = "$lit$";
/// Appended if the last static string is empty, so that a trailing child part has an end node.
pub(crate) const TAIL_MARKER: &str = "<?>";

/// Which markup language a template is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
	Html,
	Svg,
	MathMl,
}
impl TemplateKind {
	fn wrapper_open(self) -> &'static str {
		match self {
			TemplateKind::Html => "",
			TemplateKind::Svg => "<svg>",
			TemplateKind::MathMl => "<math>",
		}
	}

	fn wrapper_close(self) -> &'static str {
		match self {
			TemplateKind::Html => "",
			TemplateKind::Svg => "</svg>",
			TemplateKind::MathMl => "</math>",
		}
	}
}

/// The static strings of a template, one more than there are bindings.
///
/// Each [`html!`](`crate::html!`), [`svg!`](`crate::svg!`) and [`mathml!`](`crate::mathml!`) invocation
/// declares its own `static` instance, whose address identifies the template for caching.
/// Two distinct instances with equal strings are compiled separately.
#[derive(Debug)]
pub struct TemplateStrings {
	strings: &'static [&'static str],
	location: &'static str,
}
impl TemplateStrings {
	#[must_use]
	pub const fn new(strings: &'static [&'static str], location: &'static str) -> Self {
		Self { strings, location }
	}

	#[must_use]
	pub fn strings(&self) -> &'static [&'static str] {
		self.strings
	}

	/// `file:line:column` of the template.
	#[must_use]
	pub fn location(&self) -> &'static str {
		self.location
	}

	fn key(&'static self) -> usize {
		self as *const Self as usize
	}
}

/// A template with values for its bindings, as returned by [`html!`](`crate::html!`).
///
/// Cheap to clone and plain data: nothing happens until it's rendered.
#[derive(Clone)]
pub struct TemplateResult {
	strings: &'static TemplateStrings,
	values: Rc<[Value]>,
	kind: TemplateKind,
}
impl TemplateResult {
	#[must_use]
	pub fn new(strings: &'static TemplateStrings, kind: TemplateKind, values: Vec<Value>) -> Self {
		Self { strings, values: values.into(), kind }
	}

	#[must_use]
	pub fn strings(&self) -> &'static TemplateStrings {
		self.strings
	}

	#[must_use]
	pub fn values(&self) -> &[Value] {
		&self.values
	}

	#[must_use]
	pub fn kind(&self) -> TemplateKind {
		self.kind
	}
}
impl Debug for TemplateResult {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateResult").field("location", &self.strings.location).field("kind", &self.kind).field("values", &self.values).finish()
	}
}

/// Where in a [`Template`] a binding is, and what it binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
	kind: PartKind,
	node_index: usize,
	value_index: usize,
	name: Option<String>,
	strings: Option<Arc<[String]>>,
}
impl PartDescriptor {
	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.kind
	}

	/// Index of the bound node in a depth-first pre-order walk of the template content.
	#[must_use]
	pub fn node_index(&self) -> usize {
		self.node_index
	}

	/// Index of the first value this part consumes.
	#[must_use]
	pub fn value_index(&self) -> usize {
		self.value_index
	}

	/// The attribute, property or event name, without sigil.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// The static fragments around the bindings of a multi-binding attribute or raw text element.
	#[must_use]
	pub fn strings(&self) -> Option<&[String]> {
		self.strings.as_deref()
	}

	pub(crate) fn shared_strings(&self) -> Option<Arc<[String]>> {
		self.strings.clone()
	}

	/// How many values this part consumes.
	#[must_use]
	pub fn value_count(&self) -> usize {
		self.strings.as_ref().map_or(1, |strings| strings.len() - 1)
	}
}

/// A compiled template, shared by all renders of the same call site.
#[derive(Debug)]
pub struct Template {
	kind: TemplateKind,
	location: &'static str,
	markup: String,
	content: Vec<TemplateNode>,
	parts: Vec<PartDescriptor>,
	binding_count: usize,
}
impl Template {
	/// # Errors
	///
	/// Iff a binding is in an unsupported position, or the number of found binding positions doesn't match the strings.
	pub fn compile(strings: &TemplateStrings, kind: TemplateKind) -> Result<Self, TemplateParseError> {
		let span = trace_span!("compile", location = strings.location);
		let _enter = span.enter();

		let statics = if strings.strings.is_empty() { &[""][..] } else { strings.strings };
		let markup = scanner::scan(statics, kind, strings.location)?;

		let mut content = parser::parse(&markup.html);
		if kind != TemplateKind::Html {
			let mut nodes = content.into_iter();
			content = match nodes.next() {
				Some(TemplateNode::Element { children, .. }) => children.into_iter().chain(nodes).collect(),
				first => first.into_iter().chain(nodes).collect(),
			};
		}

		let binding_count = statics.len() - 1;
		let mut collector = Collector { attribute_names: markup.attribute_names.into_iter(), parts: Vec::new(), node_index: 0, binding_index: 0, binding_count, location: strings.location };
		collector.visit(&mut content)?;
		if collector.binding_index != binding_count || collector.attribute_names.next().is_some() {
			return Err(collector.error(ParseErrorKind::BindingCount { expected: binding_count, found: collector.binding_index }));
		}

		Ok(Self { kind, location: strings.location, markup: markup.html, content, parts: collector.parts, binding_count })
	}

	#[must_use]
	pub fn kind(&self) -> TemplateKind {
		self.kind
	}

	#[must_use]
	pub fn location(&self) -> &'static str {
		self.location
	}

	/// The marked-up HTML the template content was parsed from.
	#[must_use]
	pub fn markup(&self) -> &str {
		&self.markup
	}

	#[must_use]
	pub fn parts(&self) -> &[PartDescriptor] {
		&self.parts
	}

	#[must_use]
	pub fn binding_count(&self) -> usize {
		self.binding_count
	}

	/// Creates a detached copy of the template content, with bound attributes and element markers removed.
	#[must_use]
	pub fn clone_content(&self) -> Node {
		fn materialize(nodes: &[TemplateNode], parent: &Node) {
			for node in nodes {
				let child = match node {
					TemplateNode::Element { name, namespace, attributes, children } => {
						let element = Node::element_ns(*namespace, name);
						for (name, value) in attributes {
							element.set_attribute(name, value);
						}
						materialize(children, &element);
						element
					}
					TemplateNode::Text(text) => Node::text(text),
					TemplateNode::Comment(data) => Node::comment(data),
				};
				parent.adopt_child(child);
			}
		}

		let fragment = Node::fragment();
		materialize(&self.content, &fragment);
		fragment
	}
}

struct Collector {
	attribute_names: std::vec::IntoIter<String>,
	parts: Vec<PartDescriptor>,
	node_index: usize,
	binding_index: usize,
	binding_count: usize,
	location: &'static str,
}
impl Collector {
	fn error(&self, kind: ParseErrorKind) -> TemplateParseError {
		TemplateParseError { location: self.location, binding: self.binding_index, kind }
	}

	fn push(&mut self, kind: PartKind, node_index: usize, name: Option<String>, strings: Option<Arc<[String]>>) {
		let value_count = strings.as_ref().map_or(1, |strings| strings.len() - 1);
		self.parts.push(PartDescriptor { kind, node_index, value_index: self.binding_index, name, strings });
		self.binding_index += value_count;
	}

	fn visit(&mut self, nodes: &mut [TemplateNode]) -> Result<(), TemplateParseError> {
		for node in nodes {
			let index = self.node_index;
			self.node_index += 1;
			match node {
				TemplateNode::Element { name, attributes, children, .. } => {
					self.visit_attributes(index, attributes)?;
					let raw_text = crate::dom::is_raw_text_element(name)
						&& children.iter().any(|child| matches!(child, TemplateNode::Text(text) if text.contains(MARKER)));
					if raw_text {
						let text = children
							.iter()
							.filter_map(|child| match child {
								TemplateNode::Text(text) => Some(text.as_str()),
								_ => None,
							})
							.collect::<String>();
						let strings = text.split(MARKER).map(str::to_owned).collect::<Vec<_>>();
						self.push(PartKind::RawText, index, None, Some(strings.into()));
						children.clear();
					} else {
						self.visit(children)?;
					}
				}
				TemplateNode::Comment(data) => {
					if data.as_str() == MARKER_MATCH {
						if self.binding_index < self.binding_count {
							self.push(PartKind::Child, index, None, None);
						}
					} else {
						// Bindings inside ordinary comments are inert.
						self.binding_index += data.matches(MARKER).count();
					}
				}
				TemplateNode::Text(_) => (),
			}
		}
		Ok(())
	}

	fn visit_attributes(&mut self, index: usize, attributes: &mut Vec<(String, String)>) -> Result<(), TemplateParseError> {
		let mut kept = Vec::with_capacity(attributes.len());
		for (name, value) in attributes.drain(..) {
			if name.ends_with(BOUND_ATTRIBUTE_SUFFIX) {
				let source_name = match self.attribute_names.next() {
					Some(source_name) => source_name,
					None => return Err(self.error(ParseErrorKind::BindingCount { expected: self.binding_count, found: self.binding_index })),
				};
				let (kind, name) = match source_name.as_bytes().first() {
					Some(b'.') => (PartKind::Property, &source_name[1..]),
					Some(b'?') => (PartKind::BooleanAttribute, &source_name[1..]),
					Some(b'@') => (PartKind::Event, &source_name[1..]),
					_ => (PartKind::Attribute, source_name.as_str()),
				};
				let strings = value.split(MARKER).map(str::to_owned).collect::<Vec<_>>();
				let single = strings.len() == 2 && strings.iter().all(String::is_empty);
				if kind == PartKind::Event && !single {
					return Err(self.error(ParseErrorKind::InterpolatedEvent));
				}
				self.push(kind, index, Some(name.to_owned()), if single { None } else { Some(strings.into()) });
			} else if name == MARKER {
				self.push(PartKind::Element, index, None, None);
			} else {
				kept.push((name, value));
			}
		}
		*attributes = kept;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::{Template, TemplateKind, TemplateStrings};
	use crate::{dom::Namespace, error::ParseErrorKind, part::PartKind};
	use pretty_assertions::assert_eq;

	fn compile(strings: &'static [&'static str]) -> Template {
		Template::compile(&TemplateStrings::new(strings, "test"), TemplateKind::Html).unwrap()
	}

	fn summary(template: &Template) -> Vec<(PartKind, usize, usize, Option<&str>)> {
		template.parts().iter().map(|part| (part.kind(), part.node_index(), part.value_index(), part.name())).collect()
	}

	#[test]
	fn descriptors_follow_document_order() {
		let template = compile(&["<div class=", " .value=", "><p>", "</p><span ", " @click=", "></span></div>", ""]);
		assert_eq!(
			summary(&template),
			vec![
				(PartKind::Attribute, 0, 0, Some("class")),
				(PartKind::Property, 0, 1, Some("value")),
				(PartKind::Child, 2, 2, None),
				(PartKind::Element, 3, 3, None),
				(PartKind::Event, 3, 4, Some("click")),
				(PartKind::Child, 4, 5, None),
			]
		);
	}

	#[test]
	fn bound_attributes_and_markers_are_stripped() {
		let template = compile(&["<div id=x class=\"", "\" ", "></div>"]);
		assert_eq!(template.clone_content().inner_html(), "<div id=\"x\"></div>");
	}

	#[test]
	fn multi_binding_attributes_are_one_part() {
		let template = compile(&["<a href=\"/", "/", "\"></a>"]);
		let part = &template.parts()[0];
		assert_eq!(template.parts().len(), 1);
		assert_eq!(part.value_count(), 2);
		assert_eq!(part.strings(), Some(&["/".to_owned(), "/".to_owned(), String::new()][..]));
	}

	#[test]
	fn raw_text_bindings_replace_the_whole_content() {
		let template = compile(&["<textarea>a", "b", "c</textarea>"]);
		assert_eq!(summary(&template), vec![(PartKind::RawText, 0, 0, None)]);
		assert_eq!(template.parts()[0].value_count(), 2);
		assert_eq!(template.clone_content().inner_html(), "<textarea></textarea>");
	}

	#[test]
	fn comment_bindings_are_inert() {
		let template = compile(&["<!-- ", " --><p>", "</p>"]);
		assert_eq!(summary(&template), vec![(PartKind::Child, 2, 1, None)]);
	}

	#[test]
	fn interpolated_events_are_rejected() {
		let error = Template::compile(&TemplateStrings::new(&["<button @click=\"a", "\"></button>"], "test"), TemplateKind::Html).unwrap_err();
		assert_eq!(error.kind, ParseErrorKind::InterpolatedEvent);
		assert_eq!(error.location, "test");
	}

	#[test]
	fn svg_content_is_unwrapped() {
		let template = Template::compile(&TemplateStrings::new(&["<circle r=", "></circle>"], "test"), TemplateKind::Svg).unwrap();
		let fragment = template.clone_content();
		let circle = fragment.first_child().unwrap();
		assert_eq!(circle.local_name(), Some("circle"));
		assert_eq!(circle.namespace(), Some(Namespace::Svg));
		assert_eq!(summary(&template), vec![(PartKind::Attribute, 0, 0, Some("r"))]);
	}
}
