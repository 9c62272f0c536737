//! Values that can be bound into templates.

use crate::{
	directive::DirectiveResult,
	dom::{Event, EventOptions, Node},
	error::ValueCommitError,
	part::PartKind,
	template::TemplateResult,
};
use core::{
	any::Any,
	convert::TryFrom,
	fmt::{self, Debug, Display, Formatter},
};
use std::rc::Rc;

/// Renders nothing: clears a child part or removes an attribute.
pub const NOTHING: Value = Value::Nothing;

/// Leaves a part exactly as it is.
pub const NO_CHANGE: Value = Value::NoChange;

/// A dynamic value bound to a part.
#[derive(Clone)]
pub enum Value {
	/// See [`NOTHING`].
	Nothing,
	/// See [`NO_CHANGE`].
	NoChange,
	Primitive(Primitive),
	Template(TemplateResult),
	Node(Node),
	/// Rendered item by item into child parts.
	List(Rc<[Value]>),
	Directive(DirectiveResult),
	/// Only valid in event bindings.
	Listener(Listener),
	/// An opaque value, only valid in property bindings.
	Object(Rc<dyn Any>),
}

impl Value {
	/// Collects `items` into a [`Value::List`].
	pub fn list<I>(items: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<Value>,
	{
		Value::List(items.into_iter().map(Into::into).collect::<Vec<_>>().into())
	}

	pub fn object<T: Any>(value: T) -> Self {
		Value::Object(Rc::new(value))
	}

	#[must_use]
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Nothing => "nothing",
			Value::NoChange => "noChange",
			Value::Primitive(_) => "primitive",
			Value::Template(_) => "template result",
			Value::Node(_) => "node",
			Value::List(_) => "list",
			Value::Directive(_) => "directive result",
			Value::Listener(_) => "listener",
			Value::Object(_) => "object",
		}
	}

	/// Whether committing `self` after `committed` would be a no-op.
	///
	/// Only [`Value::Nothing`] and primitives are compared, everything else is always considered changed.
	pub(crate) fn is_same_as(&self, committed: &Value) -> bool {
		match (self, committed) {
			(Value::Nothing, Value::Nothing) => true,
			(Value::Primitive(a), Value::Primitive(b)) => a == b,
			_ => false,
		}
	}

	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Nothing => false,
			Value::Primitive(primitive) => primitive.is_truthy(),
			_ => true,
		}
	}

	pub(crate) fn to_attribute_string(&self, part: PartKind) -> Result<String, ValueCommitError> {
		match self {
			Value::Nothing => Ok(String::new()),
			Value::Primitive(primitive) => Ok(primitive.to_string()),
			other => Err(ValueCommitError::Unrenderable { part, value: other.kind_name() }),
		}
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Nothing => f.write_str("nothing"),
			Value::NoChange => f.write_str("noChange"),
			Value::Primitive(primitive) if cfg!(feature = "dangerous-logging") => Debug::fmt(primitive, f),
			Value::Primitive(_) => f.write_str("Primitive(…)"),
			Value::Template(result) => Debug::fmt(result, f),
			Value::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Value::List(items) => f.debug_list().entries(items.iter()).finish(),
			Value::Directive(result) => Debug::fmt(result, f),
			Value::Listener(listener) => Debug::fmt(listener, f),
			Value::Object(_) => f.write_str("Object(…)"),
		}
	}
}

/// Values that are stringified into text nodes and attributes, and compared when dirty-checking.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Rc<str>),
}

impl Primitive {
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Primitive::Null => false,
			Primitive::Bool(value) => *value,
			Primitive::Int(value) => *value != 0,
			Primitive::Float(value) => *value != 0.0 && !value.is_nan(),
			Primitive::Str(value) => !value.is_empty(),
		}
	}
}

/// Formats like JavaScript's `String(value)`, except that [`Primitive::Null`] is empty.
impl Display for Primitive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Primitive::Null => Ok(()),
			Primitive::Bool(value) => Display::fmt(value, f),
			Primitive::Int(value) => Display::fmt(value, f),
			Primitive::Float(value) => format_number(*value, f),
			Primitive::Str(value) => f.write_str(value),
		}
	}
}

fn format_number(value: f64, f: &mut Formatter<'_>) -> fmt::Result {
	if value.is_nan() {
		f.write_str("NaN")
	} else if value.is_infinite() {
		f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
	} else if value == 0.0 {
		f.write_str("0")
	} else if value.fract() == 0.0 && value.abs() < 1e21 {
		write!(f, "{:.0}", value)
	} else {
		write!(f, "{}", value)
	}
}

/// An event listener bound with `@event=…`.
#[derive(Clone)]
pub struct Listener {
	callback: Rc<dyn Fn(&Event)>,
	options: EventOptions,
}
impl Listener {
	pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
		Self { callback: Rc::new(callback), options: EventOptions::default() }
	}

	#[must_use]
	pub fn with_options(self, options: EventOptions) -> Self {
		Self { options, ..self }
	}

	#[must_use]
	pub fn options(&self) -> EventOptions {
		self.options
	}

	pub fn call(&self, event: &Event) {
		(self.callback)(event)
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener").field("options", &self.options).finish_non_exhaustive()
	}
}

impl From<Primitive> for Value {
	fn from(primitive: Primitive) -> Self {
		Value::Primitive(primitive)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Primitive(Primitive::Str(value.into()))
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Primitive(Primitive::Str(value.into()))
	}
}

impl From<&String> for Value {
	fn from(value: &String) -> Self {
		value.as_str().into()
	}
}

impl From<Rc<str>> for Value {
	fn from(value: Rc<str>) -> Self {
		Value::Primitive(Primitive::Str(value))
	}
}

impl From<char> for Value {
	fn from(value: char) -> Self {
		Value::Primitive(Primitive::Str(value.to_string().into()))
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Primitive(Primitive::Bool(value))
	}
}

macro_rules! from_integer {
	($($lossless:ty),*; $($lossy:ty),*) => {
		$(impl From<$lossless> for Value {
			fn from(value: $lossless) -> Self {
				Value::Primitive(Primitive::Int(value.into()))
			}
		})*
		$(impl From<$lossy> for Value {
			#[allow(clippy::cast_precision_loss)]
			fn from(value: $lossy) -> Self {
				Value::Primitive(i64::try_from(value).map_or(Primitive::Float(value as f64), Primitive::Int))
			}
		})*
	};
}
from_integer!(i8, i16, i32, i64, u8, u16, u32; u64, usize, isize, i128, u128);

impl From<f32> for Value {
	fn from(value: f32) -> Self {
		Value::Primitive(Primitive::Float(value.into()))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Primitive(Primitive::Float(value))
	}
}

impl From<()> for Value {
	fn from((): ()) -> Self {
		Value::Primitive(Primitive::Null)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	/// [`None`] renders as [`Primitive::Null`], which behaves like [`NOTHING`] in child parts.
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Primitive(Primitive::Null), Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::list(items)
	}
}

impl From<TemplateResult> for Value {
	fn from(result: TemplateResult) -> Self {
		Value::Template(result)
	}
}

impl From<Node> for Value {
	fn from(node: Node) -> Self {
		Value::Node(node)
	}
}

impl From<&Node> for Value {
	fn from(node: &Node) -> Self {
		Value::Node(node.clone())
	}
}

impl From<Listener> for Value {
	fn from(listener: Listener) -> Self {
		Value::Listener(listener)
	}
}

impl From<DirectiveResult> for Value {
	fn from(result: DirectiveResult) -> Self {
		Value::Directive(result)
	}
}

#[cfg(test)]
mod tests {
	use super::{Primitive, Value};

	fn text(value: impl Into<Value>) -> String {
		match value.into() {
			Value::Primitive(primitive) => primitive.to_string(),
			other => panic!("not a primitive: {:?}", other),
		}
	}

	#[test]
	fn javascript_style_stringification() {
		assert_eq!(text(1.0), "1");
		assert_eq!(text(-0.0), "0");
		assert_eq!(text(0.25), "0.25");
		assert_eq!(text(f64::NAN), "NaN");
		assert_eq!(text(f64::NEG_INFINITY), "-Infinity");
		assert_eq!(text(42_u64), "42");
		assert_eq!(text(true), "true");
		assert_eq!(text(None::<i32>), "");
	}

	#[test]
	fn truthiness() {
		assert!(!Primitive::Str("".into()).is_truthy());
		assert!(Primitive::Str("false".into()).is_truthy());
		assert!(!Primitive::Float(f64::NAN).is_truthy());
		assert!(!Value::Nothing.is_truthy());
		assert!(Value::list(vec![1]).is_truthy());
	}

	#[test]
	fn only_primitives_and_nothing_are_dirty_checked() {
		assert!(Value::from("a").is_same_as(&Value::from("a")));
		assert!(!Value::from(1).is_same_as(&Value::from(1.0)));
		assert!(Value::Nothing.is_same_as(&Value::Nothing));
		let list = Value::list(vec![1]);
		assert!(!list.is_same_as(&list.clone()));
	}
}
