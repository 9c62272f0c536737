#![doc(html_root_url = "https://docs.rs/lit-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Template-literal style rendering into a lightweight DOM.
//!
//! Templates are written with [`html!`], [`svg!`] or [`mathml!`], which split them into static strings and dynamic values.
//! The static strings are compiled once per call site into a [`Template`](`template::Template`),
//! and each [`render`] of the same template only updates the [parts](`part`) whose values changed.
//!
//! Stateful behaviour is added through [directives](`directive`), for example the keyed [`repeat`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod directive;
pub mod dom;
mod error;
pub mod instance;
#[cfg(target_arch = "wasm32")]
pub mod load;
pub mod part;
mod render;
pub mod repeat;
pub mod sanitize;
pub mod template;
mod value;

pub use directive::{async_directive, directive, AsyncDirective, Directive, DirectiveHandle, DirectiveState, PartInfo};
pub use error::{DirectiveUsageError, ParseErrorKind, RenderError, SanitizerAlreadySet, TemplateParseError, ValueCommitError};
pub use render::{render, render_with_options, RenderOptions};
pub use repeat::repeat;
pub use sanitize::set_sanitizer;
pub use template::{TemplateKind, TemplateResult};
pub use value::{Listener, Primitive, Value, NOTHING, NO_CHANGE};

/// Creates an HTML [`TemplateResult`].
///
/// String literals are static markup (adjacent ones are concatenated), `{expressions}` are bindings.
/// Each binding is converted with [`Value::from`].
///
/// ```
/// use lit_dom::{html, TemplateResult};
///
/// fn link(href: &str, label: &str) -> TemplateResult {
///     html!("<a href=" {href} ">" {label} "</a>")
/// }
///
/// assert_eq!(link("/", "Home").strings().strings(), &["<a href=", ">", "</a>"]);
/// ```
///
/// Binding positions are:
///
/// - between nodes, `"<p>" {content} "</p>"`,
/// - complete or interpolated attribute values, `"<a href=\"/users/" {id} "\">"`,
/// - `.property=`, `?boolean-attribute=` and `@event=` values,
/// - element position `"<div " {directive} ">"`,
/// - and the content of raw text elements like `<textarea>`.
///
/// Bindings inside comments are inert.
#[macro_export]
macro_rules! html {
	($($template:tt)*) => {
		$crate::__template!(@munch $crate::TemplateKind::Html; [] [] []; $($template)*)
	};
}

/// Like [`html!`], but the markup is parsed as SVG content.
#[macro_export]
macro_rules! svg {
	($($template:tt)*) => {
		$crate::__template!(@munch $crate::TemplateKind::Svg; [] [] []; $($template)*)
	};
}

/// Like [`html!`], but the markup is parsed as MathML content.
#[macro_export]
macro_rules! mathml {
	($($template:tt)*) => {
		$crate::__template!(@munch $crate::TemplateKind::MathMl; [] [] []; $($template)*)
	};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __template {
	(@munch $kind:expr; [$($strings:expr,)*] [$($current:literal)*] [$($values:expr,)*];) => {{
		static STRINGS: $crate::template::TemplateStrings = $crate::template::TemplateStrings::new(
			&[$($strings,)* ::core::concat!("" $(, $current)*)],
			::core::concat!(::core::file!(), ":", ::core::line!(), ":", ::core::column!()),
		);
		$crate::TemplateResult::new(&STRINGS, $kind, ::std::vec![$($values,)*])
	}};
	(@munch $kind:expr; [$($strings:expr,)*] [$($current:literal)*] [$($values:expr,)*]; {$value:expr} $($rest:tt)*) => {
		$crate::__template!(@munch $kind; [$($strings,)* ::core::concat!("" $(, $current)*),] [] [$($values,)* $crate::Value::from($value),]; $($rest)*)
	};
	(@munch $kind:expr; [$($strings:expr,)*] [$($current:literal)*] [$($values:expr,)*]; $literal:literal $($rest:tt)*) => {
		$crate::__template!(@munch $kind; [$($strings,)*] [$($current)* $literal] [$($values,)*]; $($rest)*)
	};
}
