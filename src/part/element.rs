use super::Part;
use crate::{
	directive::{self, DirectiveSlot},
	dom::Node,
	error::RenderError,
	render::RenderOptions,
	value::Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// A binding in element position, `<div ${…}>`. Only useful with directives, any resolved value is ignored.
#[derive(Clone)]
pub struct ElementPart(pub(crate) Rc<RefCell<ElementState>>);

pub(crate) struct ElementState {
	element: Node,
	pub(super) directive: Option<Box<DirectiveSlot>>,
	options: Rc<RenderOptions>,
	connected: bool,
}

impl ElementPart {
	pub(crate) fn new(element: Node, options: Rc<RenderOptions>, connected: bool) -> Self {
		Self(Rc::new(RefCell::new(ElementState { element, directive: None, options, connected })))
	}

	#[must_use]
	pub fn element(&self) -> Node {
		self.0.borrow().element.clone()
	}

	#[must_use]
	pub fn options(&self) -> Rc<RenderOptions> {
		self.0.borrow().options.clone()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.0.borrow().connected
	}

	/// # Errors
	///
	/// Iff a directive fails.
	pub fn set_value(&self, value: impl Into<Value>) -> Result<(), RenderError> {
		directive::resolve(&Part::Element(self.clone()), value.into(), None).map(drop)
	}

	pub(crate) fn set_connected(&self, connected: bool) -> Result<(), RenderError> {
		let chain = {
			let mut state = self.0.borrow_mut();
			if state.connected == connected {
				return Ok(());
			}
			state.connected = connected;
			directive::async_chain(&state.directive)
		};
		directive::set_chain_connected(chain, connected)
	}

	pub(crate) fn dispose(&self) {
		let directive = self.0.borrow_mut().directive.take();
		if let Some(directive) = directive {
			directive.dispose();
		}
	}
}

impl Debug for ElementPart {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(state) => f.debug_struct("ElementPart").field("element", &state.element).finish_non_exhaustive(),
			Err(_) => f.write_str("ElementPart(<updating>)"),
		}
	}
}
