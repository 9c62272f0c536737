use lit_dom::{
	async_directive, directive,
	dom::Node,
	html,
	part::{Part, PartKind},
	render, render_with_options, repeat, AsyncDirective, Directive, DirectiveHandle, DirectiveState, DirectiveUsageError, PartInfo, RenderError, RenderOptions, TemplateResult,
	Value, NOTHING, NO_CHANGE,
};
use pretty_assertions::assert_eq;
use std::{cell::RefCell, error::Error as _, rc::Rc};

use dom_::{first, html, init_logging};

/// Collects what happens to the directives it is passed to.
#[derive(Default)]
struct Journal {
	log: RefCell<Vec<String>>,
	handle: RefCell<Option<DirectiveHandle>>,
}
impl Journal {
	fn note(&self, entry: impl Into<String>) {
		self.log.borrow_mut().push(entry.into())
	}

	fn log(&self) -> Vec<String> {
		self.log.borrow().clone()
	}

	fn handle(&self) -> DirectiveHandle {
		self.handle.borrow().clone().unwrap()
	}
}

/// Renders its argument and reports to the journal.
struct Tracked {
	handle: DirectiveHandle,
	journal: Option<Rc<Journal>>,
}
impl Directive for Tracked {
	type Args = (Rc<Journal>, &'static str);

	fn new(part: &PartInfo) -> Result<Self, DirectiveUsageError> {
		Ok(Self { handle: part.handle(), journal: None })
	}

	fn render(&mut self, (journal, value): &Self::Args) -> Result<Value, RenderError> {
		if self.journal.is_none() {
			journal.note("new");
		}
		journal.note(format!("render {}", value));
		*journal.handle.borrow_mut() = Some(self.handle.clone());
		self.journal = Some(journal.clone());
		Ok((*value).into())
	}
}
impl AsyncDirective for Tracked {
	fn disconnected(&mut self) {
		if let Some(journal) = &self.journal {
			journal.note("disconnected")
		}
	}

	fn reconnected(&mut self) {
		if let Some(journal) = &self.journal {
			journal.note("reconnected")
		}
	}
}

fn tracked(journal: &Rc<Journal>, value: &'static str) -> Value {
	async_directive::<Tracked>((journal.clone(), value))
}

fn tracked_sync(journal: &Rc<Journal>, value: &'static str) -> Value {
	directive::<Tracked>((journal.clone(), value))
}

fn paragraph(value: Value) -> TemplateResult {
	html!("<p>" {value} "</p>")
}

#[test]
fn instances_live_while_the_class_stays_the_same() {
	init_logging();
	let (first_journal, second_journal) = (Rc::new(Journal::default()), Rc::new(Journal::default()));
	let container = Node::element("div");

	render(paragraph(tracked(&first_journal, "a")), &container).unwrap();
	render(paragraph(tracked(&first_journal, "b")), &container).unwrap();
	assert_eq!(html(&container), "<p>b</p>");
	assert_eq!(first_journal.log(), vec!["new", "render a", "render b"]);

	render(paragraph(tracked_sync(&second_journal, "c")), &container).unwrap();
	assert_eq!(html(&container), "<p>c</p>");
	assert_eq!(first_journal.log(), vec!["new", "render a", "render b", "disconnected"]);
	assert_eq!(first_journal.handle().state(), DirectiveState::Disposed);
	assert_eq!(second_journal.log(), vec!["new", "render c"]);
	assert_eq!(second_journal.handle().state(), DirectiveState::Attached);
}

#[test]
fn async_lifecycle() {
	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	let root = render(paragraph(tracked(&journal, "a")), &container).unwrap();
	let handle = journal.handle();
	assert_eq!(handle.state(), DirectiveState::Connected);

	handle.set_value("b").unwrap();
	assert_eq!(html(&container), "<p>b</p>");

	root.set_connected(false).unwrap();
	assert_eq!(handle.state(), DirectiveState::Disconnected);
	assert!(!handle.is_connected());

	handle.set_value("queued").unwrap();
	assert_eq!(html(&container), "<p>b</p>");

	root.set_connected(true).unwrap();
	assert_eq!(html(&container), "<p>queued</p>");
	assert_eq!(handle.state(), DirectiveState::Connected);

	render(paragraph("plain".into()), &container).unwrap();
	assert_eq!(handle.state(), DirectiveState::Disposed);
	handle.set_value("ignored").unwrap();
	assert_eq!(html(&container), "<p>plain</p>");

	assert_eq!(journal.log(), vec!["new", "render a", "disconnected", "reconnected", "disconnected"]);
}

#[test]
fn disconnected_roots_create_disconnected_directives() {
	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	let root = render_with_options(paragraph(tracked(&journal, "a")), &container, RenderOptions::new().with_connected(false)).unwrap();
	assert_eq!(journal.handle().state(), DirectiveState::Disconnected);

	root.set_connected(true).unwrap();
	assert_eq!(journal.handle().state(), DirectiveState::Connected);
	assert_eq!(journal.log(), vec!["new", "render a", "reconnected"]);
}

#[test]
fn removing_a_branch_disconnects_its_directives_once() {
	fn card(body: Value) -> TemplateResult {
		html!("<section>" {body} "</section>")
	}

	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	render(card(paragraph(tracked(&journal, "a")).into()), &container).unwrap();
	let handle = journal.handle();
	assert_eq!(html(&container), "<section><p>a</p></section>");

	render(card(NOTHING), &container).unwrap();
	assert_eq!(html(&container), "<section></section>");
	assert_eq!(handle.state(), DirectiveState::Disposed);

	render(card(NOTHING), &container).unwrap();
	handle.set_value("ignored").unwrap();
	assert_eq!(html(&container), "<section></section>");
	assert_eq!(journal.log(), vec!["new", "render a", "disconnected"]);
}

#[test]
fn connectedness_reaches_directives_in_nested_lists() {
	fn list(items: Vec<TemplateResult>) -> TemplateResult {
		html!("<div>" {Value::list(items)} "</div>")
	}

	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	let root = render(list(vec![paragraph("plain".into()), paragraph(tracked(&journal, "a"))]), &container).unwrap();
	let handle = journal.handle();

	root.set_connected(false).unwrap();
	assert_eq!(handle.state(), DirectiveState::Disconnected);
	root.set_connected(false).unwrap();

	root.set_connected(true).unwrap();
	assert_eq!(handle.state(), DirectiveState::Connected);
	assert_eq!(journal.log(), vec!["new", "render a", "disconnected", "reconnected"]);

	render(list(vec![paragraph("plain".into())]), &container).unwrap();
	assert_eq!(html(&container), "<div><p>plain</p></div>");
	assert_eq!(handle.state(), DirectiveState::Disposed);
	assert_eq!(journal.log(), vec!["new", "render a", "disconnected", "reconnected", "disconnected"]);
}

#[test]
fn sync_directives_cannot_set_values() {
	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	render(paragraph(tracked_sync(&journal, "a")), &container).unwrap();
	let error = journal.handle().set_value("b").unwrap_err();
	assert!(matches!(error, RenderError::DirectiveUsage(DirectiveUsageError::NotAsync { .. })));
	assert_eq!(html(&container), "<p>a</p>");
}

#[test]
fn async_values_in_interpolated_attributes() {
	let journal = Rc::new(Journal::default());
	let container = Node::element("div");

	render(html!("<p class=\"a " {tracked(&journal, "x")} "\"></p>"), &container).unwrap();
	assert_eq!(first(&container, "p").get_attribute("class").as_deref(), Some("a x"));

	journal.handle().set_value("y").unwrap();
	assert_eq!(first(&container, "p").get_attribute("class").as_deref(), Some("a y"));
}

/// Writes to its element directly.
struct Stamp {
	tag_name: String,
	host: Option<String>,
}
impl Directive for Stamp {
	type Args = &'static str;

	fn new(part: &PartInfo) -> Result<Self, DirectiveUsageError> {
		match part.kind() {
			PartKind::Element => Ok(Self {
				tag_name: part.tag_name().unwrap_or_default().to_owned(),
				host: part.host().and_then(|host| host.downcast_ref::<String>()).cloned(),
			}),
			found => Err(DirectiveUsageError::UnsupportedPart { directive: "stamp", expected: "element expressions", found }),
		}
	}

	fn render(&mut self, _: &&'static str) -> Result<Value, RenderError> {
		Ok(NO_CHANGE)
	}

	fn update(&mut self, part: &Part, label: &&'static str) -> Result<Value, RenderError> {
		if let Some(element) = part.element() {
			element.set_attribute("data-stamp", &format!("{}:{}:{}", self.tag_name, self.host.as_deref().unwrap_or("-"), label));
		}
		Ok(NO_CHANGE)
	}
}

#[test]
fn element_directives_see_their_element_and_host() {
	let container = Node::element("div");
	let options = RenderOptions::new().with_host(Rc::new("app".to_owned()));
	render_with_options(html!("<section " {directive::<Stamp>("a")} "></section>"), &container, options).unwrap();
	assert_eq!(html(&container), "<section data-stamp=\"section:app:a\"></section>");

	let error = render(paragraph(directive::<Stamp>("b")), &Node::element("div")).unwrap_err();
	assert!(matches!(error, RenderError::DirectiveUsage(DirectiveUsageError::UnsupportedPart { found: PartKind::Child, .. })));
}

struct Failing;
impl Directive for Failing {
	type Args = ();

	fn new(_: &PartInfo) -> Result<Self, DirectiveUsageError> {
		Ok(Self)
	}

	fn render(&mut self, (): &()) -> Result<Value, RenderError> {
		Err(RenderError::directive("failing", "boom"))
	}
}

#[test]
fn directive_errors_propagate() {
	let container = Node::element("div");
	let error = render(paragraph(directive::<Failing>(())), &container).unwrap_err();
	assert_eq!(error.to_string(), "directive `failing` failed");
	assert_eq!(error.source().map(ToString::to_string).as_deref(), Some("boom"));
}

fn keyed(keys: &[i32]) -> TemplateResult {
	html!("<ul>" {repeat(keys.iter().copied(), |key, _| *key, |key, _| html!("<li>" {key} "</li>"))} "</ul>")
}

#[test]
fn repeat_moves_items_with_their_keys() {
	let container = Node::element("div");
	render(keyed(&[1, 2, 3]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>1</li><li>2</li><li>3</li></ul>");
	let items = container.elements_by_tag_name("li");

	render(keyed(&[3, 1, 2]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>3</li><li>1</li><li>2</li></ul>");
	let reordered = container.elements_by_tag_name("li");
	assert!(reordered[0].is_same_node(&items[2]));
	assert!(reordered[1].is_same_node(&items[0]));
	assert!(reordered[2].is_same_node(&items[1]));

	render(keyed(&[2, 4]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>2</li><li>4</li></ul>");
	assert!(first(&container, "li").is_same_node(&items[1]));
	assert!(items[0].parent_node().is_none());
	assert!(items[2].parent_node().is_none());

	render(keyed(&[]), &container).unwrap();
	assert_eq!(html(&container), "<ul></ul>");
}

#[test]
fn repeat_renders_every_item_with_duplicate_keys() {
	let container = Node::element("div");
	render(keyed(&[1, 1, 2]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>1</li><li>1</li><li>2</li></ul>");
	let items = container.elements_by_tag_name("li");

	render(keyed(&[1, 2]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>1</li><li>2</li></ul>");
	let kept = container.elements_by_tag_name("li");
	assert!(kept[0].is_same_node(&items[0]));
	assert!(kept[1].is_same_node(&items[2]));
}

#[test]
fn repeat_reverses_in_place() {
	let container = Node::element("div");
	render(keyed(&[1, 2, 3, 4, 5]), &container).unwrap();
	let items = container.elements_by_tag_name("li");

	render(keyed(&[5, 4, 3, 2, 1]), &container).unwrap();
	assert_eq!(html(&container), "<ul><li>5</li><li>4</li><li>3</li><li>2</li><li>1</li></ul>");
	for (item, original) in container.elements_by_tag_name("li").iter().zip(items.iter().rev()) {
		assert!(item.is_same_node(original));
	}
}

#[test]
fn repeat_only_works_in_child_expressions() {
	let container = Node::element("div");
	let error = render(html!("<p class=" {repeat(vec![1], |key, _| *key, |key, _| key)} "></p>"), &container).unwrap_err();
	assert!(matches!(error, RenderError::DirectiveUsage(DirectiveUsageError::UnsupportedPart { found: PartKind::Attribute, .. })));
}
