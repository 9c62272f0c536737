//! Live instances of compiled templates.

use crate::{
	dom::Node,
	error::{RenderError, ValueCommitError},
	part::Part,
	render::RenderOptions,
	template::Template,
	value::Value,
};
use std::{rc::Rc, sync::Arc};
use tracing::{trace, trace_span};

/// A clone of a [`Template`]'s content with one [`Part`] per [`PartDescriptor`](`crate::template::PartDescriptor`).
#[derive(Debug)]
pub struct TemplateInstance {
	template: Arc<Template>,
	parts: Vec<Part>,
}

impl TemplateInstance {
	/// Clones `template`'s content, creates its parts and commits `values` to them.
	///
	/// Returns the instance and the fragment holding its (not yet inserted) nodes.
	///
	/// # Errors
	///
	/// Iff committing `values` fails.
	pub fn instantiate(template: Arc<Template>, values: &[Value], options: &Rc<RenderOptions>, connected: bool) -> Result<(Rc<Self>, Node), RenderError> {
		let fragment = template.clone_content();
		let nodes = fragment.descendants();

		let mut parts = Vec::with_capacity(template.parts().len());
		for descriptor in template.parts() {
			let node = nodes.get(descriptor.node_index()).ok_or(ValueCommitError::DetachedPart)?;
			parts.push(Part::from_descriptor(descriptor, node, options, connected));
		}
		trace!(parts = parts.len(), "Created parts.");

		let instance = Rc::new(Self { template, parts });
		instance.update(values)?;
		Ok((instance, fragment))
	}

	#[must_use]
	pub fn template(&self) -> &Arc<Template> {
		&self.template
	}

	#[must_use]
	pub fn parts(&self) -> &[Part] {
		&self.parts
	}

	/// Commits a new set of values, one per binding.
	///
	/// # Errors
	///
	/// Iff the number of values doesn't match the template, or committing one of them fails.
	pub fn update(&self, values: &[Value]) -> Result<(), RenderError> {
		let span = trace_span!("update", location = self.template.location());
		let _enter = span.enter();

		let expected = self.template.binding_count();
		if values.len() != expected {
			return Err(ValueCommitError::ValueCount { expected, found: values.len() }.into());
		}

		for (part, descriptor) in self.parts.iter().zip(self.template.parts()) {
			let start = descriptor.value_index();
			part.update(values.get(start..start + descriptor.value_count()).unwrap_or_default())?;
		}
		Ok(())
	}

	/// # Errors
	///
	/// Iff committing a value held back while disconnected fails.
	pub fn set_connected(&self, connected: bool) -> Result<(), RenderError> {
		self.parts.iter().try_for_each(|part| part.set_connected(connected))
	}

	pub(crate) fn dispose(&self) {
		self.parts.iter().for_each(Part::dispose);
	}
}
