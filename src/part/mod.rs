//! Parts: the dynamic locations of an instantiated template.
//!
//! Each part remembers what it last committed and only touches the DOM when a new value differs.

mod attribute;
mod child;
mod element;

pub use attribute::AttributePart;
pub use child::ChildPart;
pub use element::ElementPart;

pub(crate) use attribute::AttributeState;
pub(crate) use child::ChildState;
pub(crate) use element::ElementState;

use crate::{
	directive::{self, DirectiveCore, DirectiveHandle, DirectiveSlot, PartInfo},
	dom::Node,
	error::RenderError,
	render::RenderOptions,
	template::PartDescriptor,
	value::Value,
};
use core::cell::RefCell;
use std::rc::{Rc, Weak};

/// What kind of binding a part is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
	/// Between nodes: `<p>${…}</p>`.
	Child,
	/// `name=${…}`
	Attribute,
	/// `.name=${…}`
	Property,
	/// `?name=${…}`
	BooleanAttribute,
	/// `@name=${…}`
	Event,
	/// `<div ${…}>`
	Element,
	/// Inside `<script>`, `<style>`, `<textarea>` or `<title>`, which can't contain markers.
	RawText,
}

/// A handle to any kind of part.
#[derive(Debug, Clone)]
pub enum Part {
	Child(ChildPart),
	Attribute(AttributePart),
	Element(ElementPart),
}

impl Part {
	pub(crate) fn from_descriptor(descriptor: &PartDescriptor, node: &Node, options: &Rc<RenderOptions>, connected: bool) -> Self {
		match descriptor.kind() {
			PartKind::Child => Part::Child(ChildPart::new(node.clone(), node.next_sibling(), options.clone(), connected)),
			PartKind::Element => Part::Element(ElementPart::new(node.clone(), options.clone(), connected)),
			kind => Part::Attribute(AttributePart::new(
				node.clone(),
				descriptor.name().unwrap_or_default().to_owned(),
				kind,
				descriptor.shared_strings(),
				options.clone(),
				connected,
			)),
		}
	}

	#[must_use]
	pub fn kind(&self) -> PartKind {
		match self {
			Part::Child(_) => PartKind::Child,
			Part::Attribute(part) => part.kind(),
			Part::Element(_) => PartKind::Element,
		}
	}

	#[must_use]
	pub fn options(&self) -> Rc<RenderOptions> {
		match self {
			Part::Child(part) => part.options(),
			Part::Attribute(part) => part.options(),
			Part::Element(part) => part.options(),
		}
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		match self {
			Part::Child(part) => part.is_connected(),
			Part::Attribute(part) => part.is_connected(),
			Part::Element(part) => part.is_connected(),
		}
	}

	#[must_use]
	pub fn as_child(&self) -> Option<&ChildPart> {
		match self {
			Part::Child(part) => Some(part),
			_ => None,
		}
	}

	/// The bound element of attribute and element parts.
	#[must_use]
	pub fn element(&self) -> Option<Node> {
		match self {
			Part::Child(_) => None,
			Part::Attribute(part) => Some(part.element()),
			Part::Element(part) => Some(part.element()),
		}
	}

	pub(crate) fn info(&self, handle: DirectiveHandle) -> PartInfo {
		let host = self.options().host().cloned();
		match self {
			Part::Child(_) => PartInfo { kind: PartKind::Child, name: None, tag_name: None, strings: None, host, handle },
			Part::Attribute(part) => {
				let element = part.element();
				PartInfo { kind: part.kind(), name: Some(part.name()), tag_name: element.local_name().map(str::to_owned), strings: part.strings(), host, handle }
			}
			Part::Element(part) => PartInfo { kind: PartKind::Element, name: None, tag_name: part.element().local_name().map(str::to_owned), strings: None, host, handle },
		}
	}

	pub(crate) fn downgrade(&self) -> WeakPart {
		match self {
			Part::Child(part) => WeakPart::Child(Rc::downgrade(&part.0)),
			Part::Attribute(part) => WeakPart::Attribute(Rc::downgrade(&part.0)),
			Part::Element(part) => WeakPart::Element(Rc::downgrade(&part.0)),
		}
	}

	pub(crate) fn has_directive(&self, index: Option<usize>) -> bool {
		match self {
			Part::Child(part) => part.0.borrow().directive.is_some(),
			Part::Attribute(part) => part.0.borrow().directives.get(index.unwrap_or(0)).map_or(false, Option::is_some),
			Part::Element(part) => part.0.borrow().directive.is_some(),
		}
	}

	pub(crate) fn take_directive(&self, index: Option<usize>) -> Option<Box<DirectiveSlot>> {
		match self {
			Part::Child(part) => part.0.borrow_mut().directive.take(),
			Part::Attribute(part) => part.0.borrow_mut().directives.get_mut(index.unwrap_or(0)).and_then(Option::take),
			Part::Element(part) => part.0.borrow_mut().directive.take(),
		}
	}

	pub(crate) fn restore_directive(&self, index: Option<usize>, slot: Option<Box<DirectiveSlot>>) {
		match self {
			Part::Child(part) => part.0.borrow_mut().directive = slot,
			Part::Attribute(part) => {
				if let Some(target) = part.0.borrow_mut().directives.get_mut(index.unwrap_or(0)) {
					*target = slot;
				}
			}
			Part::Element(part) => part.0.borrow_mut().directive = slot,
		}
	}

	/// Whether the directive `core` is currently bound to this part.
	pub(crate) fn owns(&self, core: &Rc<DirectiveCore>) -> bool {
		match self {
			Part::Child(part) => directive::chain_contains(&part.0.borrow().directive, core),
			Part::Attribute(part) => part.0.borrow().directives.iter().any(|slot| directive::chain_contains(slot, core)),
			Part::Element(part) => directive::chain_contains(&part.0.borrow().directive, core),
		}
	}

	/// Resolves and commits the values of one render, as many as the part has bindings.
	pub(crate) fn update(&self, values: &[Value]) -> Result<(), RenderError> {
		let first = || values.first().cloned().unwrap_or(Value::NoChange);
		match self {
			Part::Child(part) => part.set_value(first()),
			Part::Attribute(part) => part.set_values(values),
			Part::Element(part) => part.set_value(first()),
		}
	}

	/// Commits an already resolved value, for [`DirectiveHandle::set_value`].
	pub(crate) fn commit_resolved(&self, index: Option<usize>, value: Value) -> Result<(), RenderError> {
		match self {
			Part::Child(part) => part.commit(value),
			Part::Attribute(part) => part.commit_at(index.unwrap_or(0), value),
			Part::Element(_) => Ok(()),
		}
	}

	pub(crate) fn set_connected(&self, connected: bool) -> Result<(), RenderError> {
		match self {
			Part::Child(part) => part.set_connected(connected),
			Part::Attribute(part) => part.set_connected(connected),
			Part::Element(part) => part.set_connected(connected),
		}
	}

	/// Disposes the directives in and below this part. The DOM is left alone.
	pub(crate) fn dispose(&self) {
		match self {
			Part::Child(part) => part.dispose(),
			Part::Attribute(part) => part.dispose(),
			Part::Element(part) => part.dispose(),
		}
	}
}

/// A part that doesn't keep its DOM alive, held by directives.
#[derive(Clone)]
pub(crate) enum WeakPart {
	Child(Weak<RefCell<ChildState>>),
	Attribute(Weak<RefCell<AttributeState>>),
	Element(Weak<RefCell<ElementState>>),
}
impl WeakPart {
	pub(crate) fn upgrade(&self) -> Option<Part> {
		match self {
			WeakPart::Child(state) => state.upgrade().map(|state| Part::Child(ChildPart(state))),
			WeakPart::Attribute(state) => state.upgrade().map(|state| Part::Attribute(AttributePart(state))),
			WeakPart::Element(state) => state.upgrade().map(|state| Part::Element(ElementPart(state))),
		}
	}
}
