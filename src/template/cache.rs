use super::{Template, TemplateKind, TemplateResult};
use crate::error::TemplateParseError;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// [`TemplateStrings`](`super::TemplateStrings`) address and the kind the strings are parsed as.
type CacheKey = (usize, TemplateKind);

/// Compiled templates. Entries are never evicted.
fn cache() -> &'static RwLock<HashMap<CacheKey, Arc<Template>>> {
	static CACHE: OnceLock<RwLock<HashMap<CacheKey, Arc<Template>>>> = OnceLock::new();
	CACHE.get_or_init(RwLock::default)
}

/// Returns the cached [`Template`] for `result`'s call site, compiling it on first use.
///
/// Compilation happens outside the lock. If two threads race, the first inserted template wins.
/// Failed compilations are not cached.
pub(crate) fn template_for(result: &TemplateResult) -> Result<Arc<Template>, TemplateParseError> {
	let strings = result.strings();
	let key = (strings.key(), result.kind());
	if let Some(template) = cache().read().get(&key) {
		return Ok(Arc::clone(template));
	}

	let template = Arc::new(Template::compile(strings, result.kind())?);
	info!(location = strings.location(), parts = template.parts().len(), "Compiled template.");
	Ok(Arc::clone(cache().write().entry(key).or_insert(template)))
}
