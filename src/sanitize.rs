//! A process-wide hook that can rewrite values before they are written into the DOM.
//!
//! Without an installed factory, values are written unchanged.
//! With one, each part asks it once for a [`ValueSanitizer`] specific to its node and sink,
//! then passes every value it writes through that sanitizer:
//!
//! - text in child expressions as the `data` [property](`SinkKind::Property`) of its text node,
//! - attribute values (except removals) as [attributes](`SinkKind::Attribute`),
//! - property values as [properties](`SinkKind::Property`),
//! - raw text content as the element's `textContent` [property](`SinkKind::Property`).
//!
//! Boolean attributes and event listeners aren't sanitized.

use crate::{dom::Node, error::SanitizerAlreadySet, value::Value};
use std::{rc::Rc, sync::OnceLock};
use tracing::info;

/// The kind of DOM write a [`ValueSanitizer`] guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
	Attribute,
	Property,
}

/// Rewrites one value before it's written.
pub type ValueSanitizer = Rc<dyn Fn(Value) -> Value>;

type Factory = dyn Fn(&Node, &str, SinkKind) -> ValueSanitizer + Send + Sync;

static FACTORY: OnceLock<Box<Factory>> = OnceLock::new();

/// Installs the sanitizer factory for the rest of the process.
///
/// `factory` receives the node that is written to (already in place), the attribute or property name and the sink kind.
///
/// # Errors
///
/// Iff a factory is already installed. It can't be replaced.
pub fn set_sanitizer(factory: impl Fn(&Node, &str, SinkKind) -> ValueSanitizer + Send + Sync + 'static) -> Result<(), SanitizerAlreadySet> {
	FACTORY.set(Box::new(factory)).map_err(|_| SanitizerAlreadySet)?;
	info!("Installed sanitizer factory.");
	Ok(())
}

/// The sanitizer for writes of `name` on `node`, or [`None`] if no factory is installed.
pub(crate) fn create(node: &Node, name: &str, sink: SinkKind) -> Option<ValueSanitizer> {
	FACTORY.get().map(|factory| factory(node, name, sink))
}
