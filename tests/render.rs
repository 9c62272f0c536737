use lit_dom::{
	dom::{mutation_count, Event, Namespace, Node},
	html, render, render_with_options, svg,
	template::{TemplateKind, TemplateStrings},
	Listener, ParseErrorKind, Primitive, RenderError, RenderOptions, TemplateParseError, TemplateResult, Value, ValueCommitError, NOTHING, NO_CHANGE,
};
use pretty_assertions::assert_eq;
use std::{cell::Cell, rc::Rc};

use dom_::{first, html, init_logging};

fn greeting(name: &str) -> TemplateResult {
	html!("<p>Hello, " {name} "!</p>")
}

fn paragraph(value: Value) -> TemplateResult {
	html!("<p>" {value} "</p>")
}

#[test]
fn rerendering_equal_values_does_not_touch_the_dom() {
	init_logging();
	let container = Node::element("div");

	render(greeting("World"), &container).unwrap();
	assert_eq!(html(&container), "<p>Hello, World!</p>");
	let p = first(&container, "p");

	let before = mutation_count();
	render(greeting("World"), &container).unwrap();
	assert_eq!(mutation_count(), before);

	render(greeting("Rust"), &container).unwrap();
	assert_eq!(mutation_count(), before + 1);
	assert_eq!(html(&container), "<p>Hello, Rust!</p>");
	assert!(p.is_same_node(&first(&container, "p")));
}

#[test]
fn a_different_template_replaces_the_content() {
	let container = Node::element("div");

	render(html!("<p>" {1} "</p>"), &container).unwrap();
	let p = first(&container, "p");
	render(html!("<span>" {1} "</span>"), &container).unwrap();

	assert_eq!(html(&container), "<span>1</span>");
	assert!(p.parent_node().is_none());
}

#[test]
fn nothing_and_no_change() {
	let container = Node::element("div");

	render(paragraph("a".into()), &container).unwrap();
	let before = mutation_count();
	render(paragraph(NO_CHANGE), &container).unwrap();
	assert_eq!(mutation_count(), before);
	assert_eq!(html(&container), "<p>a</p>");

	render(paragraph(NOTHING), &container).unwrap();
	assert_eq!(html(&container), "<p></p>");

	render(paragraph(Value::from(Some(2.5))), &container).unwrap();
	assert_eq!(html(&container), "<p>2.5</p>");

	render(paragraph(Value::from(None::<i32>)), &container).unwrap();
	assert_eq!(html(&container), "<p></p>");
}

#[test]
fn nodes_can_be_rendered_directly() {
	let container = Node::element("div");
	let em = Node::element("em");

	render(paragraph(em.clone().into()), &container).unwrap();
	assert_eq!(html(&container), "<p><em></em></p>");

	let before = mutation_count();
	render(paragraph(em.clone().into()), &container).unwrap();
	assert_eq!(mutation_count(), before);

	render(paragraph("text".into()), &container).unwrap();
	assert!(em.parent_node().is_none());
}

#[test]
fn interpolated_attributes() {
	fn link(a: Value, b: Value) -> TemplateResult {
		html!("<a href=\"/" {a} "/" {b} "\"></a>")
	}

	let container = Node::element("div");
	render(link("users".into(), 1.into()), &container).unwrap();
	assert_eq!(html(&container), "<a href=\"/users/1\"></a>");

	render(link(NO_CHANGE, 2.into()), &container).unwrap();
	assert_eq!(html(&container), "<a href=\"/users/2\"></a>");

	let before = mutation_count();
	render(link("users".into(), 2.into()), &container).unwrap();
	assert_eq!(mutation_count(), before);

	render(link("users".into(), NOTHING), &container).unwrap();
	assert_eq!(html(&container), "<a></a>");
}

#[test]
fn single_attribute_values() {
	fn titled(title: Value) -> TemplateResult {
		html!("<abbr title=" {title} ">x</abbr>")
	}

	let container = Node::element("div");
	render(titled(NOTHING), &container).unwrap();
	assert_eq!(html(&container), "<abbr>x</abbr>");

	render(titled(true.into()), &container).unwrap();
	assert_eq!(first(&container, "abbr").get_attribute("title").as_deref(), Some("true"));

	render(titled(Value::from(())), &container).unwrap();
	assert!(!first(&container, "abbr").has_attribute("title"));
}

#[test]
fn boolean_attributes_and_properties() {
	fn input(disabled: bool, value: &str) -> TemplateResult {
		html!("<input ?disabled=" {disabled} " .value=" {value} ">")
	}

	let container = Node::element("div");
	render(input(true, "a"), &container).unwrap();
	let element = first(&container, "input");
	assert_eq!(element.get_attribute("disabled").as_deref(), Some(""));
	assert!(matches!(element.property("value"), Some(Value::Primitive(Primitive::Str(value))) if &*value == "a"));
	assert!(!element.has_attribute("value"));

	render(input(false, "b"), &container).unwrap();
	assert!(!element.has_attribute("disabled"));
	assert!(matches!(element.property("value"), Some(Value::Primitive(Primitive::Str(value))) if &*value == "b"));
}

#[test]
fn event_listeners_are_swapped_without_re_registration() {
	fn button(listener: Value) -> TemplateResult {
		html!("<button @click=" {listener} ">Go</button>")
	}

	let clicks = Rc::new(Cell::new(0));
	let counter = |step: i32| {
		let clicks = clicks.clone();
		Listener::new(move |_| clicks.set(clicks.get() + step))
	};

	let container = Node::element("div");
	render(button(counter(1).into()), &container).unwrap();
	let element = first(&container, "button");
	element.dispatch_event(&Event::new("click"));
	assert_eq!(clicks.get(), 1);
	assert_eq!(element.listener_count("click"), 1);

	render(button(counter(10).into()), &container).unwrap();
	element.dispatch_event(&Event::new("click"));
	assert_eq!(clicks.get(), 11);
	assert_eq!(element.listener_count("click"), 1);

	render(button(NOTHING), &container).unwrap();
	element.dispatch_event(&Event::new("click"));
	assert_eq!(clicks.get(), 11);
	assert_eq!(element.listener_count("click"), 0);
}

#[test]
fn event_bindings_only_accept_listeners() {
	let container = Node::element("div");
	let error = render(html!("<button @click=" {"alert()"} "></button>"), &container).unwrap_err();
	assert!(matches!(error, RenderError::ValueCommit(ValueCommitError::NotAListener { name, .. }) if name == "click"));
}

#[test]
fn lists_reuse_items_by_position() {
	fn list(items: &[&str]) -> TemplateResult {
		html!("<ul>" {Value::list(items.iter().map(|item| html!("<li>" {*item} "</li>")))} "</ul>")
	}

	let container = Node::element("div");
	render(list(&["a", "b"]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>a</li><li>b</li></ul>");
	let li = first(&container, "li");

	render(list(&["a", "b", "c"]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>a</li><li>b</li><li>c</li></ul>");
	assert!(li.is_same_node(&first(&container, "li")));

	render(list(&["c"]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>c</li></ul>");
	assert!(li.is_same_node(&first(&container, "li")));

	render(list(&[]), &container).unwrap();
	assert_eq!(html(&container), "<ul></ul>");
}

#[test]
fn nested_templates() {
	fn card(title: &str, body: Value) -> TemplateResult {
		html!("<section><h1>" {title} "</h1>" {body} "</section>")
	}
	fn bold(text: &str) -> Value {
		html!("<b>" {text} "</b>").into()
	}

	let container = Node::element("div");
	render(card("A", bold("bold")), &container).unwrap();
	assert_eq!(html(&container), "<section><h1>A</h1><b>bold</b></section>");
	let b = first(&container, "b");

	render(card("B", bold("bold")), &container).unwrap();
	assert_eq!(html(&container), "<section><h1>B</h1><b>bold</b></section>");
	assert!(b.is_same_node(&first(&container, "b")));
}

#[test]
fn render_before_is_a_separate_root() {
	let container = Node::element("div");
	let footer = Node::element("footer");
	container.append_child(&footer).unwrap();

	let options = RenderOptions::new().with_render_before(footer.clone());
	render_with_options(html!("<main>" {"x"} "</main>"), &container, options.clone()).unwrap();
	render(html!("<aside></aside>"), &container).unwrap();
	assert_eq!(html(&container), "<main>x</main><footer></footer><aside></aside>");

	render_with_options(html!("<main>" {"y"} "</main>"), &container, options).unwrap();
	assert_eq!(html(&container), "<main>y</main><footer></footer><aside></aside>");
}

#[test]
fn render_returns_the_same_root_part() {
	let container = Node::element("div");
	let first_part = render(paragraph(1.into()), &container).unwrap();
	let second_part = render(paragraph(2.into()), &container).unwrap();
	assert!(first_part.start_node().is_same_node(&second_part.start_node()));
	assert!(first_part.end_node().is_none());
}

#[test]
fn parse_errors_name_the_template() {
	let container = Node::element("div");
	let error = render(html!("<" {"div"} "></div>"), &container).unwrap_err();
	match error {
		RenderError::TemplateParse(TemplateParseError { location, binding, kind }) => {
			assert!(location.contains("render.rs"));
			assert_eq!(binding, 0);
			assert_eq!(kind, ParseErrorKind::TagName);
		}
		other => panic!("unexpected error: {:?}", other),
	}
}

#[test]
fn value_count_must_match() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<p>", "</p>"], "value_count_must_match");
	let container = Node::element("div");
	let error = render(TemplateResult::new(&STRINGS, TemplateKind::Html, vec![]), &container).unwrap_err();
	assert!(matches!(error, RenderError::ValueCommit(ValueCommitError::ValueCount { expected: 1, found: 0 })));
}

#[test]
fn listeners_are_not_renderable_as_children() {
	let container = Node::element("div");
	let error = render(paragraph(Listener::new(|_| ()).into()), &container).unwrap_err();
	assert!(matches!(error, RenderError::ValueCommit(ValueCommitError::Unrenderable { .. })));
}

#[test]
fn svg_templates() {
	let container = Node::element("div");
	render(html!("<svg>" {svg!("<circle r=" {5} "></circle>")} "</svg>"), &container).unwrap();

	let circle = first(&container, "circle");
	assert_eq!(circle.namespace(), Some(Namespace::Svg));
	assert_eq!(circle.get_attribute("r").as_deref(), Some("5"));
}

#[test]
fn raw_text_elements() {
	fn textarea(value: &str) -> TemplateResult {
		html!("<textarea>" {value} "</textarea>")
	}

	let container = Node::element("div");
	render(textarea("a<b"), &container).unwrap();
	assert_eq!(first(&container, "textarea").text_content(), "a<b");
	assert_eq!(html(&container), "<textarea>a&lt;b</textarea>");

	render(textarea("c"), &container).unwrap();
	assert_eq!(first(&container, "textarea").text_content(), "c");
}
