//! Keyed lists that move DOM with their items.
//!
//! Rendering a plain [list](`crate::Value::List`) reuses nested parts by position: reordering items
//! re-renders each position with a different value.
//! [`repeat`] instead matches items to parts by key, so that reordered items keep their DOM (and its state).

use crate::{
	directive::{self, Directive, PartInfo},
	error::{DirectiveUsageError, RenderError},
	part::{ChildPart, Part, PartKind},
	value::Value,
};
use core::convert::TryFrom;
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{trace, warn};

/// Identifies an item across renders of a [`repeat`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}

impl From<i64> for Key {
	fn from(key: i64) -> Self {
		Key::Int(key)
	}
}

impl From<i32> for Key {
	fn from(key: i32) -> Self {
		Key::Int(key.into())
	}
}

impl From<u32> for Key {
	fn from(key: u32) -> Self {
		Key::Int(key.into())
	}
}

impl From<usize> for Key {
	fn from(key: usize) -> Self {
		i64::try_from(key).map_or_else(|_| Key::Str(key.to_string().into()), Key::Int)
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Key::Str(key.into())
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::Str(key.into())
	}
}

impl From<Rc<str>> for Key {
	fn from(key: Rc<str>) -> Self {
		Key::Str(key)
	}
}

/// Renders `items` keyed by `key_fn`, each through `template`.
///
/// Only valid in child expressions. Keys should be unique: items with duplicate keys are still rendered,
/// but which DOM they reuse is unspecified.
pub fn repeat<T, K, V>(items: impl IntoIterator<Item = T>, mut key_fn: impl FnMut(&T, usize) -> K, mut template: impl FnMut(T, usize) -> V) -> Value
where
	K: Into<Key>,
	V: Into<Value>,
{
	let mut keys = Vec::new();
	let mut values = Vec::new();
	for (index, item) in items.into_iter().enumerate() {
		keys.push(key_fn(&item, index).into());
		values.push(template(item, index).into());
	}

	if keys.iter().collect::<HashSet<_>>().len() != keys.len() {
		warn!("Duplicate keys passed to `repeat`.");
	}

	directive::directive::<Repeat>(RepeatArgs { keys, values })
}

pub struct RepeatArgs {
	keys: Vec<Key>,
	values: Vec<Value>,
}

/// The directive behind [`repeat`].
pub struct Repeat {
	/// The keys of the last committed items.
	keys: Option<Vec<Key>>,
}

impl Directive for Repeat {
	type Args = RepeatArgs;

	fn new(part: &PartInfo) -> Result<Self, DirectiveUsageError> {
		match part.kind() {
			PartKind::Child => Ok(Self { keys: None }),
			found => Err(DirectiveUsageError::UnsupportedPart { directive: "repeat", expected: "child expressions", found }),
		}
	}

	fn render(&mut self, args: &RepeatArgs) -> Result<Value, RenderError> {
		Ok(Value::list(args.values.iter().cloned()))
	}

	fn update(&mut self, part: &Part, args: &RepeatArgs) -> Result<Value, RenderError> {
		let (container, old_parts, old_keys) = match (part.as_child(), self.keys.take()) {
			(Some(container), Some(old_keys)) => match container.committed_items() {
				Some(old_parts) => (container, old_parts, old_keys),
				None => return self.first_render(args),
			},
			_ => return self.first_render(args),
		};

		reconcile(container, old_parts, &old_keys, args)?;
		self.keys = Some(args.keys.clone());
		Ok(Value::NoChange)
	}
}

impl Repeat {
	/// Lets the part commit a plain list, which creates one nested part per item in order.
	fn first_render(&mut self, args: &RepeatArgs) -> Result<Value, RenderError> {
		self.keys = Some(args.keys.clone());
		self.render(args)
	}
}

fn index_map(keys: &[Key], start: usize, end: usize) -> HashMap<&Key, usize> {
	(start..end).filter_map(|index| keys.get(index).map(|key| (key, index))).collect()
}

/// Updates the nested parts of `container` from `old_keys` to `args.keys`,
/// matching from both ends first and falling back to key lookup for the middle.
///
/// Nested parts are moved rather than re-rendered where keys match. Unmatched old parts are removed.
fn reconcile(container: &ChildPart, old_parts: Vec<ChildPart>, old_keys: &[Key], args: &RepeatArgs) -> Result<(), RenderError> {
	let RepeatArgs { keys: new_keys, values: new_values } = args;

	let mut old_parts = old_parts.into_iter().map(Some).collect::<Vec<_>>();
	let mut new_parts: Vec<Option<ChildPart>> = vec![None; new_values.len()];
	let (mut old_head, mut old_end) = (0, old_parts.len());
	let (mut new_head, mut new_end) = (0, new_values.len());
	let mut maps = None;

	let old_key = move |index: usize| old_keys.get(index);
	while old_head < old_end && new_head < new_end {
		let (head, tail) = match (&old_parts[old_head], &old_parts[old_end - 1]) {
			(None, _) => {
				old_head += 1;
				continue;
			}
			(_, None) => {
				old_end -= 1;
				continue;
			}
			(Some(head), Some(tail)) => (head.clone(), tail.clone()),
		};

		if old_key(old_head) == Some(&new_keys[new_head]) {
			head.set_value(new_values[new_head].clone())?;
			new_parts[new_head] = Some(head);
			old_head += 1;
			new_head += 1;
		} else if old_key(old_end - 1) == Some(&new_keys[new_end - 1]) {
			tail.set_value(new_values[new_end - 1].clone())?;
			new_parts[new_end - 1] = Some(tail);
			old_end -= 1;
			new_end -= 1;
		} else if old_key(old_head) == Some(&new_keys[new_end - 1]) {
			head.set_value(new_values[new_end - 1].clone())?;
			container.insert_part(new_parts.get(new_end).and_then(Option::as_ref), Some(&head))?;
			new_parts[new_end - 1] = Some(head);
			old_head += 1;
			new_end -= 1;
		} else if old_key(old_end - 1) == Some(&new_keys[new_head]) {
			tail.set_value(new_values[new_head].clone())?;
			container.insert_part(Some(&head), Some(&tail))?;
			new_parts[new_head] = Some(tail);
			old_end -= 1;
			new_head += 1;
		} else {
			let (new_map, old_map) = maps.get_or_insert_with(|| (index_map(new_keys, new_head, new_end), index_map(old_keys, old_head, old_end)));
			if !old_key(old_head).map_or(false, |key| new_map.contains_key(key)) {
				head.remove();
				old_head += 1;
			} else if !old_key(old_end - 1).map_or(false, |key| new_map.contains_key(key)) {
				tail.remove();
				old_end -= 1;
			} else {
				let reused = old_map.get(&new_keys[new_head]).and_then(|&index| old_parts.get_mut(index).and_then(Option::take));
				let part = match reused {
					Some(part) => {
						part.set_value(new_values[new_head].clone())?;
						container.insert_part(Some(&head), Some(&part))?
					}
					None => {
						let part = container.insert_part(Some(&head), None)?;
						part.set_value(new_values[new_head].clone())?;
						part
					}
				};
				new_parts[new_head] = Some(part);
				new_head += 1;
			}
		}
	}

	while new_head < new_end {
		let part = container.insert_part(new_parts.get(new_end).and_then(Option::as_ref), None)?;
		part.set_value(new_values[new_head].clone())?;
		new_parts[new_head] = Some(part);
		new_head += 1;
	}
	for removed in old_parts[old_head..old_end].iter().flatten() {
		removed.remove();
	}

	trace!(items = new_parts.len(), "Reconciled keyed items.");
	container.set_committed_items(new_parts.into_iter().flatten().collect());
	Ok(())
}
