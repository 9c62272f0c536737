//! Finds the syntactic position of each binding between a template's static strings,
//! and produces HTML with markers in their place.

use super::{TemplateKind, BOUND_ATTRIBUTE_SUFFIX, MARKER, NODE_MARKER, TAIL_MARKER};
use crate::{
	dom::is_raw_text_element,
	error::{ParseErrorKind, TemplateParseError},
};
use tracing::{trace_span, warn};

#[derive(Debug)]
pub(crate) struct Markup {
	pub(crate) html: String,
	/// The source names (including sigil) of bound attributes, in document order.
	pub(crate) attribute_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Text,
	Comment,
	BogusComment,
	/// Right after `<` at the very end of a string.
	TagOpen,
	TagName,
	BeforeAttributeName,
	AttributeName,
	AfterAttributeName,
	BeforeAttributeValue,
	AttributeValueUnquoted,
	AttributeValueQuoted(u8),
	RawText,
}

#[derive(Debug)]
struct PendingAttribute {
	name_start: usize,
	name_end: usize,
	bound: bool,
}

struct Scanner {
	html: String,
	attribute_names: Vec<String>,
	state: State,
	closing: bool,
	tag_name: String,
	raw_text_end: String,
	attribute: Option<PendingAttribute>,
}

fn is_space(byte: u8) -> bool {
	matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

/// # Errors
///
/// Iff a binding is in a position that can't be bound.
pub(crate) fn scan(strings: &[&str], kind: TemplateKind, location: &'static str) -> Result<Markup, TemplateParseError> {
	let span = trace_span!("scan", location, bindings = strings.len().saturating_sub(1));
	let _enter = span.enter();

	let mut scanner = Scanner {
		html: String::new(),
		attribute_names: Vec::new(),
		state: State::Text,
		closing: false,
		tag_name: String::new(),
		raw_text_end: String::new(),
		attribute: None,
	};

	let (last, bound) = match strings.split_last() {
		Some(split) => split,
		None => (&"", &[][..]),
	};

	scanner.html.push_str(kind.wrapper_open());
	for (binding, (string, next)) in bound.iter().zip(strings.iter().skip(1)).enumerate() {
		scanner.feed(string);
		scanner.bind(next).map_err(|kind| TemplateParseError { location, binding, kind })?;
	}
	scanner.feed(last);

	if !matches!(scanner.state, State::Text | State::RawText) {
		warn!(location, "Template ends inside markup ({:?}). It may not render as intended.", scanner.state);
	}
	if last.is_empty() {
		scanner.html.push_str(TAIL_MARKER);
	}
	scanner.html.push_str(kind.wrapper_close());

	Ok(Markup { html: scanner.html, attribute_names: scanner.attribute_names })
}

impl Scanner {
	fn start_tag(&mut self, closing: bool) {
		self.state = State::TagName;
		self.closing = closing;
		self.tag_name.clear();
		self.attribute = None;
	}

	fn end_tag(&mut self) {
		self.attribute = None;
		if !self.closing && is_raw_text_element(&self.tag_name) {
			self.raw_text_end = self.tag_name.to_ascii_lowercase();
			self.state = State::RawText;
		} else {
			self.state = State::Text;
		}
	}

	fn start_attribute(&mut self, at: usize) {
		self.attribute = Some(PendingAttribute { name_start: at, name_end: at, bound: false });
		self.state = State::AttributeName;
	}

	fn end_attribute_name(&mut self, at: usize) {
		if let Some(attribute) = &mut self.attribute {
			attribute.name_end = at;
		}
	}

	#[allow(clippy::too_many_lines)]
	fn feed(&mut self, string: &str) {
		let base = self.html.len();
		self.html.push_str(string);
		let bytes = string.as_bytes();

		let mut i = 0;
		while i < bytes.len() {
			let byte = bytes[i];
			match self.state {
				State::Text => {
					if byte == b'<' {
						match (bytes.get(i + 1), bytes.get(i + 2)) {
							(Some(b'!'), _) if bytes[i + 1..].starts_with(b"!--") => {
								self.state = State::Comment;
								i += 4;
								continue;
							}
							(Some(b'!'), _) | (Some(b'?'), _) => self.state = State::BogusComment,
							(Some(b'/'), Some(c)) if c.is_ascii_alphabetic() => {
								self.start_tag(true);
								i += 2;
								continue;
							}
							(Some(b'/'), Some(_)) => self.state = State::BogusComment,
							(Some(b'/'), None) => {
								self.state = State::TagOpen;
								self.closing = true;
							}
							(Some(c), _) if c.is_ascii_alphabetic() => {
								self.start_tag(false);
								i += 1;
								continue;
							}
							(None, _) => {
								self.state = State::TagOpen;
								self.closing = false;
							}
							_ => (),
						}
					}
				}
				State::Comment => {
					if bytes[i..].starts_with(b"-->") {
						self.state = State::Text;
						i += 3;
						continue;
					}
				}
				State::BogusComment => {
					if byte == b'>' {
						self.state = State::Text;
					}
				}
				State::TagOpen => {
					// Only reachable without a binding in between, so the string continues the markup.
					if byte.is_ascii_alphabetic() {
						let closing = self.closing;
						self.start_tag(closing);
						continue;
					}
					self.state = State::Text;
					continue;
				}
				State::TagName => match byte {
					b'>' => self.end_tag(),
					b'/' => self.state = State::BeforeAttributeName,
					byte if is_space(byte) => self.state = State::BeforeAttributeName,
					byte => self.tag_name.push(char::from(byte)),
				},
				State::BeforeAttributeName => match byte {
					b'>' => self.end_tag(),
					b'/' => (),
					byte if is_space(byte) => (),
					_ => self.start_attribute(base + i),
				},
				State::AttributeName => match byte {
					b'>' => {
						self.end_attribute_name(base + i);
						self.end_tag()
					}
					b'=' => {
						self.end_attribute_name(base + i);
						self.state = State::BeforeAttributeValue
					}
					b'/' => {
						self.end_attribute_name(base + i);
						self.state = State::BeforeAttributeName
					}
					byte if is_space(byte) => {
						self.end_attribute_name(base + i);
						self.state = State::AfterAttributeName
					}
					_ => (),
				},
				State::AfterAttributeName => match byte {
					b'>' => self.end_tag(),
					b'=' => self.state = State::BeforeAttributeValue,
					b'/' => self.state = State::BeforeAttributeName,
					byte if is_space(byte) => (),
					_ => self.start_attribute(base + i),
				},
				State::BeforeAttributeValue => match byte {
					b'>' => self.end_tag(),
					b'"' | b'\'' => self.state = State::AttributeValueQuoted(byte),
					byte if is_space(byte) => (),
					_ => self.state = State::AttributeValueUnquoted,
				},
				State::AttributeValueUnquoted => match byte {
					b'>' => self.end_tag(),
					byte if is_space(byte) => self.state = State::BeforeAttributeName,
					_ => (),
				},
				State::AttributeValueQuoted(quote) => {
					if byte == quote {
						self.state = State::BeforeAttributeName
					}
				}
				State::RawText => {
					if bytes[i..].starts_with(b"</") {
						let name_end = i + 2 + self.raw_text_end.len();
						let matches_name = bytes.get(i + 2..name_end).map_or(false, |name| name.eq_ignore_ascii_case(self.raw_text_end.as_bytes()));
						if matches_name && bytes.get(name_end).map_or(true, |&next| next == b'>' || next == b'/' || is_space(next)) {
							self.closing = true;
							self.tag_name = self.raw_text_end.clone();
							self.state = State::BeforeAttributeName;
							i = name_end;
							continue;
						}
					}
				}
			}
			i += 1;
		}
	}

	/// Emits the marker for the binding between the current string and `next`.
	fn bind(&mut self, next: &str) -> Result<(), ParseErrorKind> {
		match self.state {
			State::Text => self.html.push_str(NODE_MARKER),
			State::Comment | State::BogusComment | State::RawText => self.html.push_str(MARKER),
			State::TagOpen | State::TagName => return Err(ParseErrorKind::TagName),
			State::BeforeAttributeName | State::AfterAttributeName if self.closing => return Err(ParseErrorKind::ClosingTag),
			State::BeforeAttributeName | State::AfterAttributeName => {
				let standalone = next.bytes().next().map_or(false, |next| next == b'>' || next == b'/' || is_space(next));
				if !standalone {
					return Err(ParseErrorKind::AttributeName);
				}
				self.html.push_str(MARKER);
				self.attribute = None;
				self.state = State::AfterAttributeName;
			}
			State::AttributeName => return Err(ParseErrorKind::AttributeName),
			State::BeforeAttributeValue | State::AttributeValueUnquoted | State::AttributeValueQuoted(_) => {
				if self.closing {
					return Err(ParseErrorKind::ClosingTag);
				}
				let attribute = match &mut self.attribute {
					Some(attribute) => attribute,
					None => return Err(ParseErrorKind::AttributeName),
				};
				if !attribute.bound {
					self.attribute_names.push(self.html[attribute.name_start..attribute.name_end].to_owned());
					self.html.insert_str(attribute.name_end, BOUND_ATTRIBUTE_SUFFIX);
					attribute.bound = true;
				}
				self.html.push_str(MARKER);
				if self.state == State::BeforeAttributeValue {
					self.state = State::AttributeValueUnquoted;
				}
			}
		}
		Ok(())
	}
}
