//! The entry point: rendering values into containers.

use crate::{
	dom::Node,
	error::{RenderError, ValueCommitError},
	part::ChildPart,
	value::Value,
};
use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Options of a render root, fixed when the root is first rendered into.
#[derive(Clone)]
pub struct RenderOptions {
	render_before: Option<Node>,
	host: Option<Rc<dyn Any>>,
	connected: bool,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self { render_before: None, host: None, connected: true }
	}
}

impl RenderOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Renders before `node` (which must be a child of the container) instead of appending.
	///
	/// Each distinct `render_before` node is a separate render root within the same container.
	#[must_use]
	pub fn with_render_before(self, node: Node) -> Self {
		Self { render_before: Some(node), ..self }
	}

	/// An arbitrary value directives can access through [`PartInfo::host`](`crate::directive::PartInfo::host`).
	#[must_use]
	pub fn with_host(self, host: Rc<dyn Any>) -> Self {
		Self { host: Some(host), ..self }
	}

	/// Whether async directives in the new root start out connected. Defaults to `true`.
	#[must_use]
	pub fn with_connected(self, connected: bool) -> Self {
		Self { connected, ..self }
	}

	#[must_use]
	pub fn render_before(&self) -> Option<&Node> {
		self.render_before.as_ref()
	}

	#[must_use]
	pub fn host(&self) -> Option<&Rc<dyn Any>> {
		self.host.as_ref()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.connected
	}
}

impl Debug for RenderOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderOptions")
			.field("render_before", &self.render_before)
			.field("host", &self.host.as_ref().map(|_| "…"))
			.field("connected", &self.connected)
			.finish()
	}
}

/// Renders `value` into `container`, see [`render_with_options`].
///
/// # Errors
///
/// See [`render_with_options`].
pub fn render(value: impl Into<Value>, container: &Node) -> Result<ChildPart, RenderError> {
	render_with_options(value, container, RenderOptions::default())
}

/// Renders `value` into `container`, updating what a previous call with the same container and
/// [`render_before`](`RenderOptions::with_render_before`) node committed.
///
/// The first call for a root inserts an empty marker comment and creates the root [`ChildPart`], which is returned each time.
/// `options` are only used by that first call.
///
/// # Errors
///
/// Iff the `render_before` node isn't a child of `container`, or committing `value` fails.
/// Errors are not caught: the DOM may have been partially updated.
pub fn render_with_options(value: impl Into<Value>, container: &Node, options: RenderOptions) -> Result<ChildPart, RenderError> {
	let span = trace_span!("render", ?container);
	let _enter = span.enter();

	// The root part lives on the node it renders before, or on the container itself.
	let owner = options.render_before.clone().unwrap_or_else(|| container.clone());
	let existing = owner.expando().and_then(|expando| expando.downcast_ref::<ChildPart>().cloned());
	let part = match existing {
		Some(part) => part,
		None => {
			let marker = Node::comment("");
			container.insert_before(&marker, options.render_before.as_ref()).map_err(ValueCommitError::from)?;
			let connected = options.connected;
			let part = ChildPart::new(marker, options.render_before.clone(), Rc::new(options), connected);
			owner.set_expando(Rc::new(part.clone()));
			trace!("Created render root.");
			part
		}
	};

	part.set_value(value)?;
	Ok(part)
}
