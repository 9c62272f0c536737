use crate::{dom::DomError, part::PartKind};
use std::error::Error as StdError;
use thiserror::Error;

/// Everything that can go wrong while rendering.
///
/// Errors are never caught internally: the DOM may be left partially updated.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error(transparent)]
	TemplateParse(#[from] TemplateParseError),
	#[error(transparent)]
	DirectiveUsage(#[from] DirectiveUsageError),
	#[error(transparent)]
	ValueCommit(#[from] ValueCommitError),
	/// Raised by directive code.
	#[error("directive `{directive}` failed")]
	Directive {
		directive: &'static str,
		#[source]
		source: Box<dyn StdError>,
	},
}
impl RenderError {
	pub fn directive(directive: &'static str, source: impl Into<Box<dyn StdError>>) -> Self {
		Self::Directive { directive, source: source.into() }
	}
}

/// A binding in a position the template compiler can't handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (binding {binding} of the template at {location})")]
pub struct TemplateParseError {
	/// `file:line:column` of the template.
	pub location: &'static str,
	pub binding: usize,
	pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
	#[error("bindings can't be used as or in tag names")]
	TagName,
	#[error("bindings can't be used in closing tags")]
	ClosingTag,
	#[error("ambiguous attribute name: a binding must be a complete attribute value, or stand alone as element binding")]
	AttributeName,
	#[error("event bindings must consist of exactly one expression")]
	InterpolatedEvent,
	#[error("found {found} binding position(s), but the template has {expected} value(s)")]
	BindingCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveUsageError {
	#[error("`{directive}` can only be used in {expected}, not in a {found:?} part")]
	UnsupportedPart { directive: &'static str, expected: &'static str, found: PartKind },
	#[error("`{directive}` received arguments of an unexpected type")]
	ArgumentType { directive: &'static str },
	#[error("`{directive}` is not an async directive and can't set values on its own")]
	NotAsync { directive: &'static str },
	#[error("`{directive}` was updated while it was already updating")]
	Reentrant { directive: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueCommitError {
	#[error("a {value} can't be rendered into a {part:?} part")]
	Unrenderable { part: PartKind, value: &'static str },
	#[error("event binding `{name}` expects a listener or nothing, but received a {value}")]
	NotAListener { name: String, value: &'static str },
	#[error("the part is no longer attached to a parent node")]
	DetachedPart,
	#[error("the template expects {expected} value(s), but received {found}")]
	ValueCount { expected: usize, found: usize },
	#[error(transparent)]
	Dom(#[from] DomError),
}

/// Returned by [`set_sanitizer`](`crate::sanitize::set_sanitizer`) when called more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a sanitizer factory is already installed and can't be replaced")]
pub struct SanitizerAlreadySet;
