//! Stateful directives.
//!
//! A [`DirectiveResult`] is plain data: a directive class and its arguments.
//! When a part resolves one, it constructs the class's [`Directive`] instance on first use,
//! keeps it for as long as the same class is bound to the same slot, and calls [`Directive::update`] on each render.
//! Binding a different class, or any other value, disposes the instance.
//!
//! [`AsyncDirective`]s additionally follow the connectedness of their part and may
//! [set values](`DirectiveHandle::set_value`) outside of renders.

use crate::{
	error::{DirectiveUsageError, RenderError},
	part::{Part, PartKind, WeakPart},
	value::Value,
};
use core::{
	any::{type_name, Any, TypeId},
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::{rc::Rc, sync::Arc};
use tracing::{error, trace, trace_span};

/// A stateful value transformer bound to one part.
pub trait Directive: 'static {
	type Args: 'static;

	/// Called once when the directive is first bound to a part.
	///
	/// # Errors
	///
	/// Reject unsupported part kinds here.
	fn new(part: &PartInfo) -> Result<Self, DirectiveUsageError>
	where
		Self: Sized;

	/// Computes the value to commit.
	///
	/// # Errors
	///
	/// Errors are propagated out of the render call unchanged.
	fn render(&mut self, args: &Self::Args) -> Result<Value, RenderError>;

	/// Like [`Directive::render`], but with access to the part.
	///
	/// Directives that manipulate the DOM directly do so here, and usually return [`NO_CHANGE`](`crate::NO_CHANGE`).
	///
	/// # Errors
	///
	/// Errors are propagated out of the render call unchanged.
	fn update(&mut self, part: &Part, args: &Self::Args) -> Result<Value, RenderError> {
		let _ = part;
		self.render(args)
	}
}

/// A [`Directive`] that is notified when its part is disconnected from or reconnected to the document,
/// and that may commit values through its [`DirectiveHandle`] at any time.
pub trait AsyncDirective: Directive {
	/// Release subscriptions here. Also called (once) when a connected directive is disposed.
	fn disconnected(&mut self) {}

	/// Called after values that were set while disconnected have been committed.
	fn reconnected(&mut self) {}
}

pub(crate) trait ErasedDirective {
	fn update(&mut self, part: &Part, args: &dyn Any) -> Result<Value, RenderError>;
	fn disconnected(&mut self) {}
	fn reconnected(&mut self) {}
}

struct Plain<D>(D);
impl<D: Directive> ErasedDirective for Plain<D> {
	fn update(&mut self, part: &Part, args: &dyn Any) -> Result<Value, RenderError> {
		let args = args.downcast_ref::<D::Args>().ok_or(DirectiveUsageError::ArgumentType { directive: type_name::<D>() })?;
		self.0.update(part, args)
	}
}

struct Disconnectable<D>(D);
impl<D: AsyncDirective> ErasedDirective for Disconnectable<D> {
	fn update(&mut self, part: &Part, args: &dyn Any) -> Result<Value, RenderError> {
		let args = args.downcast_ref::<D::Args>().ok_or(DirectiveUsageError::ArgumentType { directive: type_name::<D>() })?;
		self.0.update(part, args)
	}

	fn disconnected(&mut self) {
		self.0.disconnected()
	}

	fn reconnected(&mut self) {
		self.0.reconnected()
	}
}

type Constructor = fn(&PartInfo) -> Result<Box<dyn ErasedDirective>, DirectiveUsageError>;

fn construct_plain<D: Directive>(part: &PartInfo) -> Result<Box<dyn ErasedDirective>, DirectiveUsageError> {
	Ok(Box::new(Plain(D::new(part)?)))
}

fn construct_disconnectable<D: AsyncDirective>(part: &PartInfo) -> Result<Box<dyn ErasedDirective>, DirectiveUsageError> {
	Ok(Box::new(Disconnectable(D::new(part)?)))
}

/// Identifies a directive type. Instances are reused only while the class stays the same.
#[derive(Clone, Copy)]
pub struct DirectiveClass {
	type_id: TypeId,
	name: &'static str,
	is_async: bool,
	construct: Constructor,
}
impl DirectiveClass {
	#[must_use]
	pub fn of<D: Directive>() -> Self {
		Self { type_id: TypeId::of::<D>(), name: type_name::<D>(), is_async: false, construct: construct_plain::<D> }
	}

	#[must_use]
	pub fn of_async<D: AsyncDirective>() -> Self {
		Self { type_id: TypeId::of::<D>(), name: type_name::<D>(), is_async: true, construct: construct_disconnectable::<D> }
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	#[must_use]
	pub fn is_async(&self) -> bool {
		self.is_async
	}
}
impl PartialEq for DirectiveClass {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id && self.is_async == other.is_async
	}
}
impl Eq for DirectiveClass {}
impl Debug for DirectiveClass {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveClass").field("name", &self.name).field("is_async", &self.is_async).finish()
	}
}

/// A directive class with arguments, bound like any other value.
#[derive(Clone)]
pub struct DirectiveResult {
	class: DirectiveClass,
	args: Rc<dyn Any>,
}
impl DirectiveResult {
	#[must_use]
	pub fn class(&self) -> DirectiveClass {
		self.class
	}

	#[must_use]
	pub fn args<T: 'static>(&self) -> Option<&T> {
		self.args.downcast_ref()
	}
}
impl Debug for DirectiveResult {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveResult").field("class", &self.class.name).finish_non_exhaustive()
	}
}

/// Binds directive `D` with `args`.
pub fn directive<D: Directive>(args: D::Args) -> Value {
	Value::Directive(DirectiveResult { class: DirectiveClass::of::<D>(), args: Rc::new(args) })
}

/// Binds async directive `D` with `args`.
pub fn async_directive<D: AsyncDirective>(args: D::Args) -> Value {
	Value::Directive(DirectiveResult { class: DirectiveClass::of_async::<D>(), args: Rc::new(args) })
}

/// What a directive can learn about its part when it's constructed.
pub struct PartInfo {
	pub(crate) kind: PartKind,
	pub(crate) name: Option<String>,
	pub(crate) tag_name: Option<String>,
	pub(crate) strings: Option<Arc<[String]>>,
	pub(crate) host: Option<Rc<dyn Any>>,
	pub(crate) handle: DirectiveHandle,
}
impl PartInfo {
	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.kind
	}

	/// The attribute, property or event name.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// The tag name of the bound element, for all but child parts.
	#[must_use]
	pub fn tag_name(&self) -> Option<&str> {
		self.tag_name.as_deref()
	}

	/// The static strings around a multi-binding attribute.
	#[must_use]
	pub fn strings(&self) -> Option<&[String]> {
		self.strings.as_deref()
	}

	/// Whether the directive is the only binding in its part.
	#[must_use]
	pub fn is_single_expression(&self) -> bool {
		self.strings.is_none()
	}

	/// The [`host`](`crate::RenderOptions::with_host`) passed to the render call that created this part.
	#[must_use]
	pub fn host(&self) -> Option<&Rc<dyn Any>> {
		self.host.as_ref()
	}

	#[must_use]
	pub fn handle(&self) -> DirectiveHandle {
		self.handle.clone()
	}
}
impl Debug for PartInfo {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("PartInfo").field("kind", &self.kind).field("name", &self.name).field("tag_name", &self.tag_name).field("strings", &self.strings).finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveState {
	/// A synchronous directive bound to a part.
	Attached,
	Connected,
	Disconnected,
	/// Replaced or discarded. Handles to it are inert.
	Disposed,
}

pub(crate) struct DirectiveCore {
	name: &'static str,
	is_async: bool,
	state: Cell<DirectiveState>,
	pending: RefCell<Option<Value>>,
	part: WeakPart,
	attribute_index: Option<usize>,
}

/// Lets a directive reach back to its part, see [`PartInfo::handle`].
#[derive(Clone)]
pub struct DirectiveHandle(Rc<DirectiveCore>);
impl DirectiveHandle {
	#[must_use]
	pub fn state(&self) -> DirectiveState {
		self.0.state.get()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		matches!(self.state(), DirectiveState::Attached | DirectiveState::Connected)
	}

	/// Commits `value` to the directive's part outside of a render.
	///
	/// The value is resolved like a render result, so it may be another directive.
	/// Nothing happens if the directive was disposed or replaced in the meantime.
	/// While disconnected, the last value is held back and committed on reconnection.
	///
	/// # Errors
	///
	/// Iff the directive isn't async, or committing the value fails.
	pub fn set_value(&self, value: impl Into<Value>) -> Result<(), RenderError> {
		let core = &self.0;
		if !core.is_async {
			return Err(DirectiveUsageError::NotAsync { directive: core.name }.into());
		}

		let span = trace_span!("set_value", directive = core.name);
		let _enter = span.enter();

		let value = value.into();
		match core.state.get() {
			DirectiveState::Disposed => {
				trace!("Ignored value set on a disposed directive.");
				return Ok(());
			}
			DirectiveState::Disconnected => {
				trace!("Holding back value until the directive is reconnected.");
				*core.pending.borrow_mut() = Some(value);
				return Ok(());
			}
			DirectiveState::Attached | DirectiveState::Connected => (),
		}

		let part = match core.part.upgrade() {
			Some(part) => part,
			None => {
				trace!("Ignored value set on a directive whose part is gone.");
				return Ok(());
			}
		};
		if !part.owns(core) {
			trace!("Ignored value set by a directive that no longer owns its part.");
			return Ok(());
		}

		let index = core.attribute_index;
		let mut slot = part.take_directive(index);
		let resolved = resolve_below(&part, &mut slot, core, value, index);
		part.restore_directive(index, slot);
		part.commit_resolved(index, resolved?)
	}
}
impl Debug for DirectiveHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveHandle").field("directive", &self.0.name).field("state", &self.0.state.get()).finish()
	}
}

type SharedInstance = Rc<RefCell<Box<dyn ErasedDirective>>>;

/// A directive instance in a part, with the chain of directives its result resolved to.
pub(crate) struct DirectiveSlot {
	class: DirectiveClass,
	core: Rc<DirectiveCore>,
	instance: SharedInstance,
	nested: Option<Box<DirectiveSlot>>,
}
impl DirectiveSlot {
	pub(crate) fn dispose(self: Box<Self>) {
		let DirectiveSlot { core, instance, nested, .. } = *self;
		if let Some(nested) = nested {
			nested.dispose();
		}
		let previous = core.state.replace(DirectiveState::Disposed);
		core.pending.borrow_mut().take();
		if previous == DirectiveState::Connected {
			call(core.name, &instance, |directive| directive.disconnected());
		}
		trace!(directive = core.name, "Disposed directive.");
	}
}

fn call(name: &'static str, instance: &SharedInstance, hook: impl FnOnce(&mut Box<dyn ErasedDirective>)) {
	match instance.try_borrow_mut() {
		Ok(mut directive) => hook(&mut *directive),
		Err(_) => error!(directive = name, "Skipped a lifecycle callback of a directive that is currently updating."),
	}
}

/// Whether `core` is part of the directive chain in `slot`.
pub(crate) fn chain_contains(slot: &Option<Box<DirectiveSlot>>, core: &Rc<DirectiveCore>) -> bool {
	let mut current = slot.as_deref();
	while let Some(slot) = current {
		if Rc::ptr_eq(&slot.core, core) {
			return true;
		}
		current = slot.nested.as_deref();
	}
	false
}

/// The async members of a directive chain, outermost first.
pub(crate) fn async_chain(slot: &Option<Box<DirectiveSlot>>) -> Vec<(Rc<DirectiveCore>, SharedInstance)> {
	let mut chain = Vec::new();
	let mut current = slot.as_deref();
	while let Some(slot) = current {
		if slot.class.is_async {
			chain.push((slot.core.clone(), slot.instance.clone()));
		}
		current = slot.nested.as_deref();
	}
	chain
}

/// Moves the directives in `chain` to the new connectedness, calling their lifecycle hooks.
///
/// Values held back while disconnected are committed before [`AsyncDirective::reconnected`] is called.
pub(crate) fn set_chain_connected(chain: Vec<(Rc<DirectiveCore>, SharedInstance)>, connected: bool) -> Result<(), RenderError> {
	for (core, instance) in chain {
		match (core.state.get(), connected) {
			(DirectiveState::Disconnected, true) => {
				core.state.set(DirectiveState::Connected);
				let pending = core.pending.borrow_mut().take();
				if let Some(value) = pending {
					DirectiveHandle(core.clone()).set_value(value)?;
				}
				call(core.name, &instance, |directive| directive.reconnected());
			}
			(DirectiveState::Connected, false) => {
				core.state.set(DirectiveState::Disconnected);
				call(core.name, &instance, |directive| directive.disconnected());
			}
			_ => (),
		}
	}
	Ok(())
}

/// Resolves `value` against the directive slot of `part` at `index` (the value index within an attribute part).
///
/// Non-directive values pass through unchanged, disposing any previous directive.
pub(crate) fn resolve(part: &Part, value: Value, index: Option<usize>) -> Result<Value, RenderError> {
	if !matches!(value, Value::Directive(_)) && !part.has_directive(index) {
		return Ok(value);
	}

	let mut slot = part.take_directive(index);
	let resolved = resolve_in_slot(part, &mut slot, value, index);
	part.restore_directive(index, slot);
	resolved
}

fn resolve_in_slot(part: &Part, slot: &mut Option<Box<DirectiveSlot>>, value: Value, index: Option<usize>) -> Result<Value, RenderError> {
	let result = match value {
		Value::Directive(result) => result,
		value => {
			if let Some(previous) = slot.take() {
				previous.dispose();
			}
			return Ok(value);
		}
	};

	let mut current = match slot.take() {
		Some(current) if current.class == result.class => current,
		previous => {
			if let Some(previous) = previous {
				previous.dispose();
			}
			construct(part, result.class, index)?
		}
	};

	let span = trace_span!("update", directive = current.class.name);
	let updated = {
		let _enter = span.enter();
		let instance = current.instance.clone();
		let borrowed = instance.try_borrow_mut();
		match borrowed {
			Ok(mut directive) => directive.update(part, result.args.as_ref()),
			Err(_) => Err(DirectiveUsageError::Reentrant { directive: current.class.name }.into()),
		}
	};
	let resolved = match updated {
		Ok(value) => resolve_in_slot(part, &mut current.nested, value, index),
		Err(error) => Err(error),
	};
	*slot = Some(current);
	resolved
}

/// Resolves `value` below the directive `core` in the chain, for commits from [`DirectiveHandle::set_value`].
fn resolve_below(part: &Part, slot: &mut Option<Box<DirectiveSlot>>, core: &Rc<DirectiveCore>, value: Value, index: Option<usize>) -> Result<Value, RenderError> {
	match slot {
		Some(current) if Rc::ptr_eq(&current.core, core) => resolve_in_slot(part, &mut current.nested, value, index),
		Some(current) => resolve_below(part, &mut current.nested, core, value, index),
		None => Ok(Value::NoChange),
	}
}

fn construct(part: &Part, class: DirectiveClass, index: Option<usize>) -> Result<Box<DirectiveSlot>, RenderError> {
	let state = match (class.is_async, part.is_connected()) {
		(false, _) => DirectiveState::Attached,
		(true, true) => DirectiveState::Connected,
		(true, false) => DirectiveState::Disconnected,
	};
	let core = Rc::new(DirectiveCore { name: class.name, is_async: class.is_async, state: Cell::new(state), pending: RefCell::new(None), part: part.downgrade(), attribute_index: index });
	let info = part.info(DirectiveHandle(core.clone()));
	let instance = match (class.construct)(&info) {
		Ok(instance) => instance,
		Err(error) => {
			core.state.set(DirectiveState::Disposed);
			return Err(error.into());
		}
	};
	trace!(directive = class.name, ?state, "Constructed directive.");
	Ok(Box::new(DirectiveSlot { class, core, instance: Rc::new(RefCell::new(instance)), nested: None }))
}
