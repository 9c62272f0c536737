use super::{Part, PartKind};
use crate::{
	directive::{self, DirectiveSlot},
	dom::{Event, Node},
	error::{RenderError, ValueCommitError},
	render::RenderOptions,
	sanitize::{self, SinkKind, ValueSanitizer},
	value::{Listener, Primitive, Value},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::{rc::Rc, sync::Arc};
use tracing::trace;

/// A binding on an element: attribute, property, boolean attribute, event listener or raw text content.
///
/// With [`strings`](`AttributePart::strings`), the part takes one value per gap between them
/// and commits their concatenation.
#[derive(Clone)]
pub struct AttributePart(pub(crate) Rc<RefCell<AttributeState>>);

pub(crate) struct AttributeState {
	element: Node,
	name: String,
	kind: PartKind,
	strings: Option<Arc<[String]>>,
	/// [`None`] until the first commit of a multi-value part.
	committed: Vec<Option<Value>>,
	pub(super) directives: Vec<Option<Box<DirectiveSlot>>>,
	listener: Option<Listener>,
	trampoline: Option<Rc<dyn Fn(&Event)>>,
	sanitizer: Option<ValueSanitizer>,
	options: Rc<RenderOptions>,
	connected: bool,
}

impl AttributePart {
	pub(crate) fn new(element: Node, name: String, kind: PartKind, strings: Option<Arc<[String]>>, options: Rc<RenderOptions>, connected: bool) -> Self {
		let count = strings.as_ref().map_or(1, |strings| strings.len().saturating_sub(1));
		let committed = if strings.is_some() { vec![None; count] } else { vec![Some(Value::Nothing)] };
		let part = Self(Rc::new(RefCell::new(AttributeState {
			element,
			name,
			kind,
			strings,
			committed,
			directives: (0..count).map(|_| None).collect(),
			listener: None,
			trampoline: None,
			sanitizer: None,
			options,
			connected,
		})));

		if kind == PartKind::Event {
			let state = Rc::downgrade(&part.0);
			let trampoline: Rc<dyn Fn(&Event)> = Rc::new(move |event: &Event| {
				let listener = state.upgrade().and_then(|state| state.try_borrow().ok().and_then(|state| state.listener.clone()));
				if let Some(listener) = listener {
					listener.call(event)
				}
			});
			part.0.borrow_mut().trampoline = Some(trampoline);
		}
		part
	}

	#[must_use]
	pub fn element(&self) -> Node {
		self.0.borrow().element.clone()
	}

	/// The attribute, property or event name, without sigil.
	#[must_use]
	pub fn name(&self) -> String {
		self.0.borrow().name.clone()
	}

	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.0.borrow().kind
	}

	pub(crate) fn strings(&self) -> Option<Arc<[String]>> {
		self.0.borrow().strings.clone()
	}

	#[must_use]
	pub fn value_count(&self) -> usize {
		self.0.borrow().committed.len()
	}

	#[must_use]
	pub fn options(&self) -> Rc<RenderOptions> {
		self.0.borrow().options.clone()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.0.borrow().connected
	}

	/// Resolves and commits one value per binding of this part.
	///
	/// Missing values are treated as [`NO_CHANGE`](`crate::NO_CHANGE`).
	///
	/// # Errors
	///
	/// Iff a value can't be committed to this kind of part or a directive fails.
	pub fn set_values(&self, values: &[Value]) -> Result<(), RenderError> {
		let part = Part::Attribute(self.clone());
		let resolved = (0..self.value_count())
			.map(|index| directive::resolve(&part, values.get(index).cloned().unwrap_or(Value::NoChange), Some(index)))
			.collect::<Result<Vec<_>, _>>()?;
		self.commit_values(resolved)
	}

	/// Commits a single resolved value at `index`, keeping the others.
	pub(crate) fn commit_at(&self, index: usize, value: Value) -> Result<(), RenderError> {
		let mut values = vec![Value::NoChange; self.value_count()];
		if let Some(slot) = values.get_mut(index) {
			*slot = value;
		}
		self.commit_values(values)
	}

	fn commit_values(&self, values: Vec<Value>) -> Result<(), RenderError> {
		let value = {
			let mut state = self.0.borrow_mut();
			let kind = state.kind;
			match state.strings.clone() {
				None => {
					let value = values.into_iter().next().unwrap_or(Value::NoChange);
					let committed = &mut state.committed[0];
					if let Value::NoChange = value {
						return Ok(());
					}
					if committed.as_ref().map_or(false, |committed| value.is_same_as(committed)) {
						return Ok(());
					}
					*committed = Some(value.clone());
					value
				}
				Some(strings) => {
					let mut changed = false;
					let mut joined = strings.first().cloned();
					for (index, value) in values.into_iter().enumerate() {
						let committed = &mut state.committed[index];
						let value = match value {
							Value::NoChange => committed.clone().unwrap_or_else(|| Value::from("")),
							value => value,
						};
						changed |= committed.as_ref().map_or(true, |committed| !value.is_same_as(committed));
						if let Value::Nothing = value {
							joined = None;
						} else if let Some(text) = &mut joined {
							text.push_str(&value.to_attribute_string(kind)?);
							text.push_str(strings.get(index + 1).map_or("", String::as_str));
						}
						*committed = Some(value);
					}
					if !changed {
						return Ok(());
					}
					joined.map_or(Value::Nothing, Value::from)
				}
			}
		};
		self.apply(value)
	}

	fn apply(&self, value: Value) -> Result<(), RenderError> {
		let (element, name, kind) = {
			let state = self.0.borrow();
			(state.element.clone(), state.name.clone(), state.kind)
		};
		#[cfg(feature = "dangerous-logging")]
		trace!(?kind, name = name.as_str(), ?value, "Committing binding.");
		#[cfg(not(feature = "dangerous-logging"))]
		trace!(?kind, name = name.as_str(), "Committing binding.");

		match kind {
			PartKind::Attribute => match value {
				Value::Nothing | Value::Primitive(Primitive::Null) => element.remove_attribute(&name),
				value => {
					let value = self.sanitize(&element, &name, SinkKind::Attribute, value);
					element.set_attribute(&name, &value.to_attribute_string(kind)?)
				}
			},
			PartKind::Property => element.set_property(&name, self.sanitize(&element, &name, SinkKind::Property, value)),
			PartKind::BooleanAttribute => {
				if value.is_truthy() {
					element.set_attribute(&name, "")
				} else {
					element.remove_attribute(&name)
				}
			}
			PartKind::RawText => {
				let value = self.sanitize(&element, "textContent", SinkKind::Property, value);
				element.set_text_content(&value.to_attribute_string(kind)?)
			}
			PartKind::Event => self.apply_listener(&element, &name, value)?,
			PartKind::Child | PartKind::Element => (),
		}
		Ok(())
	}

	/// Passes `value` through this part's sanitizer, which is created on first use if a factory is installed.
	fn sanitize(&self, element: &Node, name: &str, sink: SinkKind, value: Value) -> Value {
		let existing = self.0.borrow().sanitizer.clone();
		let sanitizer = match existing.or_else(|| sanitize::create(element, name, sink)) {
			Some(sanitizer) => sanitizer,
			None => return value,
		};
		self.0.borrow_mut().sanitizer = Some(sanitizer.clone());
		sanitizer(value)
	}

	/// Swaps the listener called by this part's trampoline.
	///
	/// The trampoline itself is only re-registered if the listener options change, or when switching to or from nothing.
	fn apply_listener(&self, element: &Node, name: &str, value: Value) -> Result<(), ValueCommitError> {
		let listener = match value {
			Value::Nothing | Value::Primitive(Primitive::Null) => None,
			Value::Listener(listener) => Some(listener),
			other => return Err(ValueCommitError::NotAListener { name: name.to_owned(), value: other.kind_name() }),
		};

		let (old, new, trampoline) = {
			let mut state = self.0.borrow_mut();
			let old = state.listener.as_ref().map(Listener::options);
			let new = listener.as_ref().map(Listener::options);
			state.listener = listener;
			(old, new, state.trampoline.clone())
		};
		let trampoline = match trampoline {
			Some(trampoline) => trampoline,
			None => return Ok(()),
		};

		let remove = old.is_some() && old != new;
		if let (true, Some(old)) = (remove, old) {
			element.remove_event_listener(name, &trampoline, old.capture);
		}
		if let (true, Some(new)) = (old.is_none() || remove, new) {
			element.add_event_listener(name, trampoline, new);
		}
		Ok(())
	}

	pub(crate) fn set_connected(&self, connected: bool) -> Result<(), RenderError> {
		let chain = {
			let mut state = self.0.borrow_mut();
			if state.connected == connected {
				return Ok(());
			}
			state.connected = connected;
			state.directives.iter().flat_map(directive::async_chain).collect::<Vec<_>>()
		};
		directive::set_chain_connected(chain, connected)
	}

	pub(crate) fn dispose(&self) {
		let directives = self.0.borrow_mut().directives.iter_mut().filter_map(Option::take).collect::<Vec<_>>();
		for directive in directives {
			directive.dispose();
		}
	}
}

impl Debug for AttributePart {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(state) => f.debug_struct("AttributePart").field("kind", &state.kind).field("name", &state.name).field("element", &state.element).finish_non_exhaustive(),
			Err(_) => f.write_str("AttributePart(<updating>)"),
		}
	}
}
