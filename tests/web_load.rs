#![cfg(target_arch = "wasm32")]

use lit_dom::{dom::Node, html, load, render, Listener, TemplateResult};
use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, Element, HtmlBodyElement, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn init() -> (Document, HtmlBodyElement) {
	static LOGGING: Once = Once::new();
	LOGGING.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	(document, body)
}

#[wasm_bindgen_test]
fn store_and_load() {
	let (document, body) = init();

	let container = Node::element("div");
	render(html!("<p class=" {"greeting"} ">Hello, " {"browser"} "!</p>"), &container).unwrap();

	let stored = load::store(&container, &document).unwrap();
	body.append_child(&stored).unwrap();
	let element = stored.dyn_into::<Element>().unwrap();
	assert_eq!(element.inner_html(), container.inner_html());

	let loaded = Node::element("div");
	load::load_child_nodes(&element.child_nodes(), &loaded);
	assert_eq!(loaded.inner_html(), container.inner_html());
	assert_eq!(loaded.text_content(), "Hello, browser!");
}

#[wasm_bindgen_test]
fn mirrored_renders_update_the_page_in_place() {
	fn counter(count: u32, clicks: &Rc<Cell<u32>>) -> TemplateResult {
		let clicks = clicks.clone();
		html!("<button @click=" {Listener::new(move |_| clicks.set(clicks.get() + 1))} ">" {count} "</button>")
	}

	let (document, body) = init();
	let element = document.create_element("div").unwrap();
	element.set_inner_html("<h1>Counter</h1>");
	body.append_child(&element).unwrap();

	let root = load::mirror(&element).unwrap();
	let clicks = Rc::new(Cell::new(0));
	render(counter(0, &clicks), &root).unwrap();
	assert_eq!(element.inner_html(), root.inner_html());
	assert!(element.inner_html().starts_with("<h1>Counter</h1>"));

	let button = element.last_element_child().unwrap().dyn_into::<HtmlElement>().unwrap();
	button.click();
	button.click();
	assert_eq!(clicks.get(), 2);

	render(counter(2, &clicks), &root).unwrap();
	assert_eq!(element.inner_html(), root.inner_html());
	let same_button: &web_sys::Node = button.as_ref();
	let last = element.last_element_child().unwrap();
	let last: &web_sys::Node = last.as_ref();
	assert!(same_button.is_same_node(Some(last)));
	assert_eq!(button.text_content().as_deref(), Some("2"));

	render(html!("<p>Done</p>"), &root).unwrap();
	assert_eq!(element.inner_html(), root.inner_html());
	assert!(!body.contains(Some(same_button)));
}
