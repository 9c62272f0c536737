use super::Part;
use crate::{
	directive::{self, DirectiveSlot},
	dom::Node,
	error::{RenderError, ValueCommitError},
	instance::TemplateInstance,
	render::RenderOptions,
	sanitize::{self, SinkKind, ValueSanitizer},
	template::{self, TemplateResult},
	value::{Primitive, Value},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
};
use std::{rc::Rc, sync::Arc};
use tracing::{trace, trace_span};

/// A range of sibling nodes between a start marker and an (optional) end node.
///
/// Content is always inserted directly before the end node, or appended to the parent if there is none.
#[derive(Clone)]
pub struct ChildPart(pub(crate) Rc<RefCell<ChildState>>);

pub(crate) struct ChildState {
	start: Node,
	end: Option<Node>,
	committed: Committed,
	pub(super) directive: Option<Box<DirectiveSlot>>,
	options: Rc<RenderOptions>,
	connected: bool,
}

enum Committed {
	Empty,
	Text { value: Primitive, node: Node, sanitizer: Option<ValueSanitizer> },
	Node(Node),
	Instance(Rc<TemplateInstance>),
	Items(Vec<ChildPart>),
}

impl Committed {
	fn dispose(self) {
		match self {
			Committed::Instance(instance) => instance.dispose(),
			Committed::Items(items) => items.iter().for_each(ChildPart::dispose),
			Committed::Empty | Committed::Text { .. } | Committed::Node(_) => (),
		}
	}
}

impl ChildPart {
	pub(crate) fn new(start: Node, end: Option<Node>, options: Rc<RenderOptions>, connected: bool) -> Self {
		Self(Rc::new(RefCell::new(ChildState { start, end, committed: Committed::Empty, directive: None, options, connected })))
	}

	#[must_use]
	pub fn start_node(&self) -> Node {
		self.0.borrow().start.clone()
	}

	/// [`None`] iff the part extends to the end of its parent.
	#[must_use]
	pub fn end_node(&self) -> Option<Node> {
		self.0.borrow().end.clone()
	}

	#[must_use]
	pub fn parent_node(&self) -> Option<Node> {
		self.0.borrow().start.parent_node()
	}

	#[must_use]
	pub fn options(&self) -> Rc<RenderOptions> {
		self.0.borrow().options.clone()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.0.borrow().connected
	}

	/// Resolves `value` and commits it, touching the DOM only where it differs from what is currently committed.
	///
	/// # Errors
	///
	/// Iff the value can't be rendered here, a template fails to compile or a directive fails.
	/// The part may be left partially updated.
	pub fn set_value(&self, value: impl Into<Value>) -> Result<(), RenderError> {
		let value = directive::resolve(&Part::Child(self.clone()), value.into(), None)?;
		self.commit(value)
	}

	pub(crate) fn commit(&self, value: Value) -> Result<(), RenderError> {
		match value {
			Value::NoChange => Ok(()),
			Value::Nothing | Value::Primitive(Primitive::Null) => {
				self.commit_nothing();
				Ok(())
			}
			Value::Primitive(Primitive::Str(text)) if text.is_empty() => {
				self.commit_nothing();
				Ok(())
			}
			Value::Primitive(primitive) => self.commit_text(primitive),
			Value::Template(result) => self.commit_template(&result),
			Value::Node(node) => self.commit_node(node),
			Value::List(items) => self.commit_items(&items),
			other => Err(ValueCommitError::Unrenderable { part: super::PartKind::Child, value: other.kind_name() }.into()),
		}
	}

	fn commit_nothing(&self) {
		if let Committed::Empty = self.0.borrow().committed {
			return;
		}
		self.clear();
	}

	fn commit_text(&self, primitive: Primitive) -> Result<(), RenderError> {
		let current = match &self.0.borrow().committed {
			Committed::Text { value, node, sanitizer } => Some((value == &primitive, node.clone(), sanitizer.clone())),
			_ => None,
		};
		if let Some((unchanged, node, sanitizer)) = current {
			if !unchanged {
				node.set_data(&text_data(&primitive, sanitizer.as_ref())?);
				if let Committed::Text { value, .. } = &mut self.0.borrow_mut().committed {
					*value = primitive;
				}
			}
			return Ok(());
		}

		self.clear();
		// Sanitizers are created for the node in place, since they may depend on its parent.
		let node = Node::text("");
		self.insert(&node)?;
		let sanitizer = sanitize::create(&node, "data", SinkKind::Property);
		node.set_data(&text_data(&primitive, sanitizer.as_ref())?);
		self.0.borrow_mut().committed = Committed::Text { value: primitive, node, sanitizer };
		Ok(())
	}

	fn commit_node(&self, node: Node) -> Result<(), RenderError> {
		if let Committed::Node(current) = &self.0.borrow().committed {
			if current == &node {
				return Ok(());
			}
		}

		self.clear();
		self.insert(&node)?;
		self.0.borrow_mut().committed = Committed::Node(node);
		Ok(())
	}

	fn commit_template(&self, result: &TemplateResult) -> Result<(), RenderError> {
		let template = template::template_for(result)?;

		let current = match &self.0.borrow().committed {
			Committed::Instance(instance) if Arc::ptr_eq(instance.template(), &template) => Some(instance.clone()),
			_ => None,
		};
		if let Some(instance) = current {
			return instance.update(result.values());
		}

		let span = trace_span!("instantiate", location = template.location());
		let _enter = span.enter();

		let (options, connected) = {
			let state = self.0.borrow();
			(state.options.clone(), state.connected)
		};
		let (instance, fragment) = TemplateInstance::instantiate(template, result.values(), &options, connected)?;
		self.clear();
		self.insert(&fragment)?;
		self.0.borrow_mut().committed = Committed::Instance(instance);
		trace!("Committed new template instance.");
		Ok(())
	}

	/// Renders each item into its own nested part, reusing nested parts by position.
	fn commit_items(&self, items: &[Value]) -> Result<(), RenderError> {
		let committed = mem::replace(&mut self.0.borrow_mut().committed, Committed::Empty);
		let mut parts = match committed {
			Committed::Items(parts) => parts,
			other => {
				self.0.borrow_mut().committed = other;
				self.clear();
				Vec::new()
			}
		};

		let filled = self.fill_items(&mut parts, items);
		self.0.borrow_mut().committed = Committed::Items(parts);
		filled
	}

	fn fill_items(&self, parts: &mut Vec<ChildPart>, items: &[Value]) -> Result<(), RenderError> {
		for (index, item) in items.iter().enumerate() {
			if index == parts.len() {
				parts.push(self.insert_part(None, None)?);
			}
			parts[index].set_value(item.clone())?;
		}
		for removed in parts.drain(items.len().min(parts.len())..) {
			removed.remove();
		}
		Ok(())
	}

	fn parent(&self) -> Result<Node, ValueCommitError> {
		self.parent_node().ok_or(ValueCommitError::DetachedPart)
	}

	fn insert(&self, node: &Node) -> Result<(), ValueCommitError> {
		let end = self.end_node();
		Ok(self.parent()?.insert_before(node, end.as_ref())?)
	}

	/// Disposes and removes the committed content, leaving the markers in place.
	pub(crate) fn clear(&self) {
		let (committed, start, end) = {
			let mut state = self.0.borrow_mut();
			(mem::replace(&mut state.committed, Committed::Empty), state.start.clone(), state.end.clone())
		};
		committed.dispose();

		let mut next = start.next_sibling();
		while let Some(node) = next {
			if end.as_ref() == Some(&node) {
				break;
			}
			next = node.next_sibling();
			node.remove();
		}
	}

	/// The nested parts of a committed list, if a list is committed.
	#[must_use]
	pub fn committed_items(&self) -> Option<Vec<ChildPart>> {
		match &self.0.borrow().committed {
			Committed::Items(items) => Some(items.clone()),
			_ => None,
		}
	}

	/// Records `items` as the committed list, for directives that rearrange nested parts themselves.
	///
	/// The DOM must already match.
	pub fn set_committed_items(&self, items: Vec<ChildPart>) {
		self.0.borrow_mut().committed = Committed::Items(items);
	}

	/// Moves `existing` (or a new, empty nested part) directly in front of `before`, or to the end of this part.
	///
	/// # Errors
	///
	/// Iff this part is detached.
	pub fn insert_part(&self, before: Option<&ChildPart>, existing: Option<&ChildPart>) -> Result<ChildPart, ValueCommitError> {
		let parent = self.parent()?;
		let reference = match before {
			Some(before) => Some(before.start_node()),
			None => self.end_node(),
		};

		match existing {
			None => {
				let start = Node::comment("");
				let end = Node::comment("");
				parent.insert_before(&start, reference.as_ref())?;
				parent.insert_before(&end, reference.as_ref())?;
				let (options, connected) = {
					let state = self.0.borrow();
					(state.options.clone(), state.connected)
				};
				Ok(ChildPart::new(start, Some(end), options, connected))
			}
			Some(part) => {
				let (start, end) = (part.start_node(), part.end_node());
				let after = end.as_ref().and_then(Node::next_sibling);
				if after != reference || part.parent_node().as_ref() != Some(&parent) {
					let mut next = Some(start);
					while let Some(node) = next {
						if after.as_ref() == Some(&node) {
							break;
						}
						next = node.next_sibling();
						parent.insert_before(&node, reference.as_ref())?;
					}
				}
				Ok(part.clone())
			}
		}
	}

	/// Disposes this part and removes it from the DOM, markers included.
	pub fn remove(&self) {
		self.clear();
		let directive = self.0.borrow_mut().directive.take();
		if let Some(directive) = directive {
			directive.dispose();
		}

		let (start, end) = (self.start_node(), self.end_node());
		if let Some(end) = end {
			end.remove();
		}
		start.remove();
	}

	/// Notifies async directives in and below this part.
	///
	/// # Errors
	///
	/// Iff committing a value held back while disconnected fails.
	pub fn set_connected(&self, connected: bool) -> Result<(), RenderError> {
		let chain = {
			let mut state = self.0.borrow_mut();
			if state.connected == connected {
				return Ok(());
			}
			state.connected = connected;
			directive::async_chain(&state.directive)
		};
		directive::set_chain_connected(chain, connected)?;

		for child in self.children() {
			child.set_connected(connected)?;
		}
		Ok(())
	}

	fn children(&self) -> Vec<Part> {
		match &self.0.borrow().committed {
			Committed::Instance(instance) => instance.parts().to_vec(),
			Committed::Items(items) => items.iter().cloned().map(Part::Child).collect(),
			Committed::Empty | Committed::Text { .. } | Committed::Node(_) => Vec::new(),
		}
	}

	pub(crate) fn dispose(&self) {
		let (directive, committed) = {
			let mut state = self.0.borrow_mut();
			(state.directive.take(), mem::replace(&mut state.committed, Committed::Empty))
		};
		if let Some(directive) = directive {
			directive.dispose();
		}
		committed.dispose();
	}
}

fn text_data(primitive: &Primitive, sanitizer: Option<&ValueSanitizer>) -> Result<String, ValueCommitError> {
	match sanitizer {
		Some(sanitizer) => sanitizer(Value::Primitive(primitive.clone())).to_attribute_string(super::PartKind::Child),
		None => Ok(primitive.to_string()),
	}
}

impl Debug for ChildPart {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(state) => f.debug_struct("ChildPart").field("start", &state.start).field("end", &state.end).field("connected", &state.connected).finish_non_exhaustive(),
			Err(_) => f.write_str("ChildPart(<updating>)"),
		}
	}
}
