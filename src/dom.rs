//! A small in-memory DOM that templates are instantiated into.
//!
//! [`Node`]s are reference-counted handles: cloning one yields another handle to the *same* node,
//! and equality is identity, like [***Node.isSameNode()***](https://developer.mozilla.org/en-US/docs/Web/API/Node/isSameNode).
//!
//! Children are owned by their parent, parents are only referenced weakly.
//!
//! A tree can be [mirrored](`Mirror`) onto another DOM (like the browser's, see `load::mirror` on wasm32),
//! in which case each mutation is replayed there in place.

use crate::value::Value;
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::{trace_span, warn};

thread_local! {
	static MUTATIONS: Cell<u64> = Cell::new(0);
}

/// Returns the number of DOM mutations performed on the current thread so far.
///
/// Creating detached nodes is not counted, but inserting, removing and editing nodes is.
/// Compare two readings to assert that a render did not touch the DOM.
#[must_use]
pub fn mutation_count() -> u64 {
	MUTATIONS.with(Cell::get)
}

fn mutated() {
	MUTATIONS.with(|mutations| mutations.set(mutations.get() + 1));
}

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub(crate) fn is_void_element(name: &str) -> bool {
	VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

/// Elements whose content is parsed as text only.
pub(crate) fn is_raw_text_element(name: &str) -> bool {
	RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name))
}

/// Element namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
	MathMl,
}
impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Html => "http://www.w3.org/1999/xhtml",
			Namespace::Svg => "http://www.w3.org/2000/svg",
			Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
		}
	}
}

/// See [***Node.nodeType***](https://developer.mozilla.org/en-US/docs/Web/API/Node/nodeType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	Element = 1,
	Text = 3,
	Comment = 8,
	DocumentFragment = 11,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
	#[error("the reference node is not a child of this node")]
	NotAChild,
	#[error("a node can't be inserted into itself or one of its descendants")]
	HierarchyRequest,
	#[error("{0:?} nodes can't have children")]
	NotAContainer(NodeType),
}

/// [***addEventListener()***](https://developer.mozilla.org/en-US/docs/Web/API/EventTarget/addEventListener) options.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Capturing,
	AtTarget,
	Bubbling,
}

/// A synthetic event, see [`Node::dispatch_event`].
pub struct Event {
	event_type: String,
	bubbles: bool,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	stopped: Cell<bool>,
	default_prevented: Cell<bool>,
}
impl Event {
	/// Creates a non-bubbling event.
	#[must_use]
	pub fn new(event_type: &str) -> Self {
		Self {
			event_type: event_type.to_owned(),
			bubbles: false,
			target: RefCell::default(),
			current_target: RefCell::default(),
			stopped: Cell::new(false),
			default_prevented: Cell::new(false),
		}
	}

	#[must_use]
	pub fn bubbling(event_type: &str) -> Self {
		Self { bubbles: true, ..Self::new(event_type) }
	}

	#[must_use]
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	#[must_use]
	pub fn bubbles(&self) -> bool {
		self.bubbles
	}

	#[must_use]
	pub fn target(&self) -> Option<Node> {
		self.target.borrow().clone()
	}

	#[must_use]
	pub fn current_target(&self) -> Option<Node> {
		self.current_target.borrow().clone()
	}

	pub fn stop_propagation(&self) {
		self.stopped.set(true)
	}

	pub fn prevent_default(&self) {
		self.default_prevented.set(true)
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	#[must_use]
	pub fn propagation_stopped(&self) -> bool {
		self.stopped.get()
	}
}
impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("event_type", &self.event_type).field("bubbles", &self.bubbles).finish_non_exhaustive()
	}
}

struct Registration {
	event_type: String,
	callback: Rc<dyn Fn(&Event)>,
	options: EventOptions,
}

fn same_callback(a: &Rc<dyn Fn(&Event)>, b: &Rc<dyn Fn(&Event)>) -> bool {
	Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

struct ElementData {
	name: String,
	namespace: Namespace,
	attributes: RefCell<Vec<(String, String)>>,
	properties: RefCell<HashMap<String, Value>>,
	listeners: RefCell<Vec<Registration>>,
}

enum NodeKind {
	Element(ElementData),
	Text(RefCell<String>),
	Comment(RefCell<String>),
	Fragment,
}

struct NodeData {
	kind: NodeKind,
	parent: RefCell<Weak<NodeData>>,
	children: RefCell<Vec<Node>>,
	expando: RefCell<Option<Rc<dyn Any>>>,
	mirror: RefCell<Option<Rc<dyn Mirror>>>,
	counterpart: RefCell<Option<Rc<dyn Any>>>,
}

/// Replays the mutations of a [`Node`] tree onto another DOM, see [`Node::set_mirror`].
///
/// Each method is called after the in-memory tree was updated, for nodes below the node the mirror is set on.
/// Nodes keep their [counterpart](`Node::counterpart`) when removed, so that moves can reuse it,
/// but changes made to a subtree while it is detached from the mirrored tree aren't replayed.
pub trait Mirror {
	/// `node` was inserted (or moved) into `parent`, before `reference` or at the end.
	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>);
	fn remove(&self, parent: &Node, node: &Node);
	fn set_data(&self, node: &Node, data: &str);
	fn set_attribute(&self, element: &Node, name: &str, value: &str);
	fn remove_attribute(&self, element: &Node, name: &str);
	fn set_property(&self, element: &Node, name: &str, value: &Value);
	/// The first listener for `event_type` with `options.capture` was added.
	fn add_event_listener(&self, element: &Node, event_type: &str, options: EventOptions);
	/// The last listener for `event_type` with `capture` was removed.
	fn remove_event_listener(&self, element: &Node, event_type: &str, capture: bool);
}

/// A [`Node`] reference that doesn't keep it alive.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeData>);
impl WeakNode {
	#[must_use]
	pub fn upgrade(&self) -> Option<Node> {
		self.0.upgrade().map(Node)
	}
}
impl Debug for WeakNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("WeakNode")
	}
}

/// A handle to a DOM node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);
impl Node {
	fn new(kind: NodeKind) -> Self {
		Self(Rc::new(NodeData {
			kind,
			parent: RefCell::new(Weak::new()),
			children: RefCell::default(),
			expando: RefCell::default(),
			mirror: RefCell::default(),
			counterpart: RefCell::default(),
		}))
	}

	/// Creates an HTML element.
	#[must_use]
	pub fn element(name: &str) -> Self {
		Self::element_ns(Namespace::Html, name)
	}

	#[must_use]
	pub fn element_ns(namespace: Namespace, name: &str) -> Self {
		Self::new(NodeKind::Element(ElementData {
			name: name.to_owned(),
			namespace,
			attributes: RefCell::default(),
			properties: RefCell::default(),
			listeners: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn text(data: &str) -> Self {
		Self::new(NodeKind::Text(RefCell::new(data.to_owned())))
	}

	#[must_use]
	pub fn comment(data: &str) -> Self {
		Self::new(NodeKind::Comment(RefCell::new(data.to_owned())))
	}

	#[must_use]
	pub fn fragment() -> Self {
		Self::new(NodeKind::Fragment)
	}

	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match self.0.kind {
			NodeKind::Element(_) => NodeType::Element,
			NodeKind::Text(_) => NodeType::Text,
			NodeKind::Comment(_) => NodeType::Comment,
			NodeKind::Fragment => NodeType::DocumentFragment,
		}
	}

	/// The element's tag name as written, or [`None`] for other node types.
	#[must_use]
	pub fn local_name(&self) -> Option<&str> {
		self.element_data().map(|element| element.name.as_str())
	}

	#[must_use]
	pub fn namespace(&self) -> Option<Namespace> {
		self.element_data().map(|element| element.namespace)
	}

	#[must_use]
	pub fn is_same_node(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn element_data(&self) -> Option<&ElementData> {
		match &self.0.kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	fn can_have_children(&self) -> bool {
		matches!(self.0.kind, NodeKind::Element(_) | NodeKind::Fragment)
	}

	#[must_use]
	pub fn parent_node(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	#[must_use]
	pub fn child_nodes(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn first_child(&self) -> Option<Node> {
		self.0.children.borrow().first().cloned()
	}

	#[must_use]
	pub fn last_child(&self) -> Option<Node> {
		self.0.children.borrow().last().cloned()
	}

	#[must_use]
	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent_node()?;
		let children = parent.0.children.borrow();
		let index = children.iter().position(|child| child == self)?;
		children.get(index + 1).cloned()
	}

	#[must_use]
	pub fn previous_sibling(&self) -> Option<Node> {
		let parent = self.parent_node()?;
		let children = parent.0.children.borrow();
		let index = children.iter().position(|child| child == self)?;
		index.checked_sub(1).and_then(|index| children.get(index).cloned())
	}

	/// Whether `other` is this node or one of its descendants.
	#[must_use]
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if &node == self {
				return true;
			}
			current = node.parent_node();
		}
		false
	}

	/// Inserts `node` before `reference`, or at the end if `reference` is [`None`].
	///
	/// `node` is removed from its previous parent first.
	/// Document fragments are emptied into this node instead of being inserted themselves.
	///
	/// # Errors
	///
	/// Iff `reference` isn't a child of this node, this node can't have children
	/// or `node` is an inclusive ancestor of this node.
	pub fn insert_before(&self, node: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		if !self.can_have_children() {
			return Err(DomError::NotAContainer(self.node_type()));
		}
		if node.contains(self) {
			return Err(DomError::HierarchyRequest);
		}
		if let Some(reference) = reference {
			if reference.parent_node().as_ref() != Some(self) {
				return Err(DomError::NotAChild);
			}
			if reference == node {
				return Ok(());
			}
		}

		let moved = if let NodeKind::Fragment = node.0.kind {
			node.0.children.borrow_mut().drain(..).collect::<Vec<_>>()
		} else {
			node.remove();
			vec![node.clone()]
		};

		{
			let mut children = self.0.children.borrow_mut();
			let index = match reference {
				Some(reference) => children.iter().position(|child| child == reference).ok_or(DomError::NotAChild)?,
				None => children.len(),
			};
			for (offset, child) in moved.iter().enumerate() {
				*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
				children.insert(index + offset, child.clone());
				mutated();
			}
		}

		if let Some(mirror) = self.mirror() {
			for child in &moved {
				mirror.insert_before(self, child, reference);
			}
		}
		Ok(())
	}

	/// # Errors
	///
	/// See [`Node::insert_before`].
	pub fn append_child(&self, node: &Node) -> Result<(), DomError> {
		self.insert_before(node, None)
	}

	/// Appends a freshly created child without validation or mutation tracking.
	pub(crate) fn adopt_child(&self, child: Node) {
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child);
	}

	/// # Errors
	///
	/// Iff `child` isn't a child of this node.
	pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
		if child.parent_node().as_ref() != Some(self) {
			return Err(DomError::NotAChild);
		}
		child.remove();
		Ok(())
	}

	/// Detaches this node from its parent, if any.
	pub fn remove(&self) {
		let parent = match self.parent_node() {
			Some(parent) => parent,
			None => return,
		};
		let mirror = parent.mirror();
		{
			let mut children = parent.0.children.borrow_mut();
			if let Some(index) = children.iter().position(|child| child == self) {
				children.remove(index);
				mutated();
			}
		}
		*self.0.parent.borrow_mut() = Weak::new();

		if let Some(mirror) = mirror {
			mirror.remove(&parent, self);
		}
	}

	/// The data of a text or comment node.
	#[must_use]
	pub fn data(&self) -> Option<String> {
		match &self.0.kind {
			NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.borrow().clone()),
			_ => None,
		}
	}

	pub fn set_data(&self, data: &str) {
		match &self.0.kind {
			NodeKind::Text(current) | NodeKind::Comment(current) => {
				*current.borrow_mut() = data.to_owned();
				mutated();
				if let Some(mirror) = self.mirror() {
					mirror.set_data(self, data);
				}
			}
			_ => warn!("Tried to set data on a {:?} node.", self.node_type()),
		}
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		match &self.0.kind {
			NodeKind::Text(data) | NodeKind::Comment(data) => data.borrow().clone(),
			NodeKind::Element(_) | NodeKind::Fragment => {
				let mut text = String::new();
				for node in self.descendants() {
					if let NodeKind::Text(data) = &node.0.kind {
						text.push_str(&data.borrow());
					}
				}
				text
			}
		}
	}

	/// Replaces all children with a single text node, or with nothing if `text` is empty.
	pub fn set_text_content(&self, text: &str) {
		match &self.0.kind {
			NodeKind::Text(_) | NodeKind::Comment(_) => self.set_data(text),
			NodeKind::Element(_) | NodeKind::Fragment => {
				let removed = self.0.children.borrow_mut().drain(..).collect::<Vec<_>>();
				for child in &removed {
					*child.0.parent.borrow_mut() = Weak::new();
				}
				mutated();
				let text = if text.is_empty() { None } else { Some(Node::text(text)) };
				if let Some(text) = &text {
					self.adopt_child(text.clone());
				}

				if let Some(mirror) = self.mirror() {
					for child in &removed {
						mirror.remove(self, child);
					}
					if let Some(text) = &text {
						mirror.insert_before(self, text, None);
					}
				}
			}
		}
	}

	#[must_use]
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		let attributes = self.element_data()?.attributes.borrow();
		attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
	}

	#[must_use]
	pub fn has_attribute(&self, name: &str) -> bool {
		self.element_data().map_or(false, |element| element.attributes.borrow().iter().any(|(key, _)| key == name))
	}

	/// All attributes in insertion order.
	#[must_use]
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.element_data().map_or_else(Vec::new, |element| element.attributes.borrow().clone())
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		let element = match self.element_data() {
			Some(element) => element,
			None => {
				warn!("Tried to set attribute {:?} on a {:?} node.", name, self.node_type());
				return;
			}
		};
		{
			let mut attributes = element.attributes.borrow_mut();
			match attributes.iter_mut().find(|(key, _)| key == name) {
				Some((_, current)) => *current = value.to_owned(),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
		mutated();
		if let Some(mirror) = self.mirror() {
			mirror.set_attribute(self, name, value);
		}
	}

	pub fn remove_attribute(&self, name: &str) {
		if let Some(element) = self.element_data() {
			let removed = {
				let mut attributes = element.attributes.borrow_mut();
				let count = attributes.len();
				attributes.retain(|(key, _)| key != name);
				attributes.len() != count
			};
			if removed {
				mutated();
				if let Some(mirror) = self.mirror() {
					mirror.remove_attribute(self, name);
				}
			}
		}
	}

	/// Reads a (JavaScript-style) property previously set with [`Node::set_property`].
	#[must_use]
	pub fn property(&self, name: &str) -> Option<Value> {
		self.element_data()?.properties.borrow().get(name).cloned()
	}

	#[must_use]
	pub fn properties(&self) -> Vec<(String, Value)> {
		self.element_data().map_or_else(Vec::new, |element| {
			element.properties.borrow().iter().map(|(name, value)| (name.clone(), value.clone())).collect()
		})
	}

	pub fn set_property(&self, name: &str, value: Value) {
		match self.element_data() {
			Some(element) => {
				if let Some(mirror) = self.mirror() {
					mirror.set_property(self, name, &value);
				}
				element.properties.borrow_mut().insert(name.to_owned(), value);
				mutated();
			}
			None => warn!("Tried to set property {:?} on a {:?} node.", name, self.node_type()),
		}
	}

	/// Registers `callback` for `event_type`.
	///
	/// Like in browsers, registering the same callback twice for the same type and `capture` flag has no effect.
	pub fn add_event_listener(&self, event_type: &str, callback: Rc<dyn Fn(&Event)>, options: EventOptions) {
		let element = match self.element_data() {
			Some(element) => element,
			None => {
				warn!("Tried to add a {:?} listener to a {:?} node.", event_type, self.node_type());
				return;
			}
		};
		let first = {
			let mut listeners = element.listeners.borrow_mut();
			if listeners
				.iter()
				.any(|registration| registration.event_type == event_type && registration.options.capture == options.capture && same_callback(&registration.callback, &callback))
			{
				return;
			}
			listeners.push(Registration { event_type: event_type.to_owned(), callback, options });
			listeners.iter().filter(|registration| registration.event_type == event_type && registration.options.capture == options.capture).count() == 1
		};
		mutated();
		if first {
			if let Some(mirror) = self.mirror() {
				mirror.add_event_listener(self, event_type, options);
			}
		}
	}

	pub fn remove_event_listener(&self, event_type: &str, callback: &Rc<dyn Fn(&Event)>, capture: bool) {
		if let Some(element) = self.element_data() {
			let removed = {
				let mut listeners = element.listeners.borrow_mut();
				let count = listeners.len();
				listeners.retain(|registration| !(registration.event_type == event_type && registration.options.capture == capture && same_callback(&registration.callback, callback)));
				listeners.len() != count
			};
			if removed {
				mutated();
				if !self.has_listener(event_type, capture) {
					if let Some(mirror) = self.mirror() {
						mirror.remove_event_listener(self, event_type, capture);
					}
				}
			}
		}
	}

	/// Whether a listener for `event_type` is registered with this `capture` flag.
	#[must_use]
	pub fn has_listener(&self, event_type: &str, capture: bool) -> bool {
		self.element_data().map_or(false, |element| {
			element.listeners.borrow().iter().any(|registration| registration.event_type == event_type && registration.options.capture == capture)
		})
	}

	#[must_use]
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.element_data().map_or(0, |element| element.listeners.borrow().iter().filter(|registration| registration.event_type == event_type).count())
	}

	/// Dispatches `event` with this node as target, through capture, target and (if the event bubbles) bubble phases.
	pub fn dispatch_event(&self, event: &Event) {
		let span = trace_span!("dispatch_event", event_type = event.event_type());
		let _enter = span.enter();

		*event.target.borrow_mut() = Some(self.clone());
		let mut path = Vec::new();
		let mut current = self.parent_node();
		while let Some(node) = current {
			current = node.parent_node();
			path.push(node);
		}

		for node in path.iter().rev() {
			node.invoke_listeners(event, Phase::Capturing);
			if event.stopped.get() {
				*event.current_target.borrow_mut() = None;
				return;
			}
		}
		self.invoke_listeners(event, Phase::AtTarget);
		if event.bubbles && !event.stopped.get() {
			for node in &path {
				node.invoke_listeners(event, Phase::Bubbling);
				if event.stopped.get() {
					break;
				}
			}
		}
		*event.current_target.borrow_mut() = None;
	}

	/// Distinct `(event_type, capture)` pairs of the registered listeners, in registration order.
	#[must_use]
	pub fn listened_events(&self) -> Vec<(String, bool)> {
		let mut events = Vec::<(String, bool)>::new();
		if let Some(element) = self.element_data() {
			for registration in element.listeners.borrow().iter() {
				if !events.iter().any(|(event_type, capture)| *event_type == registration.event_type && *capture == registration.options.capture) {
					events.push((registration.event_type.clone(), registration.options.capture));
				}
			}
		}
		events
	}

	/// Invokes only this node's listeners registered with `capture`, for an event a [`Mirror`]'s DOM dispatched.
	///
	/// Propagation is left to that DOM. [`Event::target`] is [`None`] for relayed events.
	pub fn relay_event(&self, event: &Event, capture: bool) {
		let phase = if capture { Phase::Capturing } else { Phase::Bubbling };
		self.invoke_listeners(event, phase);
		*event.current_target.borrow_mut() = None;
	}

	fn invoke_listeners(&self, event: &Event, phase: Phase) {
		let element = match self.element_data() {
			Some(element) => element,
			None => return,
		};
		let matching = element
			.listeners
			.borrow()
			.iter()
			.filter(|registration| {
				registration.event_type == event.event_type
					&& match phase {
						Phase::Capturing => registration.options.capture,
						Phase::AtTarget => true,
						Phase::Bubbling => !registration.options.capture,
					}
			})
			.map(|registration| (registration.callback.clone(), registration.options))
			.collect::<Vec<_>>();

		*event.current_target.borrow_mut() = Some(self.clone());
		for (callback, options) in matching {
			if options.once {
				self.remove_event_listener(&event.event_type, &callback, options.capture);
			}
			callback(event);
		}
	}

	/// All descendants in depth-first pre-order, excluding this node.
	#[must_use]
	pub fn descendants(&self) -> Vec<Node> {
		fn walk(node: &Node, into: &mut Vec<Node>) {
			for child in node.0.children.borrow().iter() {
				into.push(child.clone());
				walk(child, into);
			}
		}

		let mut descendants = Vec::new();
		walk(self, &mut descendants);
		descendants
	}

	/// Descendant elements with a matching tag name (ASCII case-insensitive), in document order.
	#[must_use]
	pub fn elements_by_tag_name(&self, name: &str) -> Vec<Node> {
		self.descendants().into_iter().filter(|node| node.local_name().map_or(false, |local_name| local_name.eq_ignore_ascii_case(name))).collect()
	}

	/// Serializes this node's children.
	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		let raw = self.local_name().map_or(false, |name| name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style"));
		for child in self.0.children.borrow().iter() {
			child.serialize(&mut html, raw);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.serialize(&mut html, false);
		html
	}

	fn serialize(&self, out: &mut String, raw_text: bool) {
		match &self.0.kind {
			NodeKind::Element(element) => {
				out.push('<');
				out.push_str(&element.name);
				for (name, value) in element.attributes.borrow().iter() {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					escape(value, true, out);
					out.push('"');
				}
				out.push('>');
				if element.namespace == Namespace::Html && is_void_element(&element.name) {
					return;
				}
				out.push_str(&self.inner_html());
				out.push_str("</");
				out.push_str(&element.name);
				out.push('>');
			}
			NodeKind::Text(data) => {
				if raw_text {
					out.push_str(&data.borrow())
				} else {
					escape(&data.borrow(), false, out)
				}
			}
			NodeKind::Comment(data) => {
				out.push_str("<!--");
				out.push_str(&data.borrow());
				out.push_str("-->");
			}
			NodeKind::Fragment => out.push_str(&self.inner_html()),
		}
	}

	pub(crate) fn expando(&self) -> Option<Rc<dyn Any>> {
		self.0.expando.borrow().clone()
	}

	pub(crate) fn set_expando(&self, value: Rc<dyn Any>) {
		*self.0.expando.borrow_mut() = Some(value);
	}

	/// Replays all later mutations in this node's subtree to `mirror`, unless a descendant has its own.
	pub fn set_mirror(&self, mirror: Rc<dyn Mirror>) {
		*self.0.mirror.borrow_mut() = Some(mirror);
	}

	/// The mirror set on this node or its closest ancestor that has one.
	#[must_use]
	pub fn mirror(&self) -> Option<Rc<dyn Mirror>> {
		let mut current = Some(self.clone());
		while let Some(node) = current {
			if let Some(mirror) = node.0.mirror.borrow().clone() {
				return Some(mirror);
			}
			current = node.parent_node();
		}
		None
	}

	/// Data a [`Mirror`] keeps for this node, usually the node it corresponds to.
	#[must_use]
	pub fn counterpart(&self) -> Option<Rc<dyn Any>> {
		self.0.counterpart.borrow().clone()
	}

	pub fn set_counterpart(&self, counterpart: Rc<dyn Any>) {
		*self.0.counterpart.borrow_mut() = Some(counterpart);
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakNode {
		WeakNode(Rc::downgrade(&self.0))
	}
}

fn escape(text: &str, attribute: bool, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			'"' if attribute => out.push_str("&quot;"),
			'<' if !attribute => out.push_str("&lt;"),
			'>' if !attribute => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.is_same_node(other)
	}
}
impl Eq for Node {}
impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		Rc::as_ptr(&self.0).hash(state)
	}
}

impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			NodeKind::Element(element) => write!(f, "<{}>", element.name),
			NodeKind::Text(data) => match data.try_borrow() {
				Ok(data) if cfg!(feature = "dangerous-logging") => write!(f, "#text {:?}", &*data),
				Ok(data) => write!(f, "#text ({} bytes)", data.len()),
				Err(_) => f.write_str("#text"),
			},
			NodeKind::Comment(_) => f.write_str("<!---->"),
			NodeKind::Fragment => f.write_str("#document-fragment"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{mutation_count, Event, EventOptions, Node};
	use std::{cell::RefCell, rc::Rc};

	#[test]
	fn insert_and_serialize() {
		let div = Node::element("div");
		let text = Node::text("a < b");
		div.append_child(&text).unwrap();
		div.insert_before(&Node::comment("c"), Some(&text)).unwrap();
		div.set_attribute("title", "\"quoted\"");
		div.append_child(&Node::element("br")).unwrap();

		assert_eq!(div.outer_html(), "<div title=\"&quot;quoted&quot;\"><!--c-->a &lt; b<br></div>");
		assert_eq!(text.parent_node(), Some(div.clone()));
		assert_eq!(div.first_child().unwrap().next_sibling(), Some(text));
	}

	#[test]
	fn fragments_are_emptied_on_insertion() {
		let fragment = Node::fragment();
		fragment.append_child(&Node::text("a")).unwrap();
		fragment.append_child(&Node::text("b")).unwrap();

		let p = Node::element("p");
		p.append_child(&fragment).unwrap();

		assert_eq!(p.child_nodes().len(), 2);
		assert!(fragment.child_nodes().is_empty());
		assert_eq!(p.text_content(), "ab");
	}

	#[test]
	fn hierarchy_errors() {
		let outer = Node::element("div");
		let inner = Node::element("span");
		outer.append_child(&inner).unwrap();

		assert!(inner.append_child(&outer).is_err());
		assert!(Node::text("x").append_child(&Node::text("y")).is_err());
		assert!(outer.insert_before(&Node::text("z"), Some(&Node::text("stray"))).is_err());
	}

	#[test]
	fn moving_within_the_same_parent() {
		let list = Node::element("ul");
		let items = (0..3).map(|_| Node::element("li")).collect::<Vec<_>>();
		for item in &items {
			list.append_child(item).unwrap();
		}

		list.insert_before(&items[2], Some(&items[0])).unwrap();

		assert_eq!(list.child_nodes(), vec![items[2].clone(), items[0].clone(), items[1].clone()]);
	}

	#[test]
	fn dispatch_phases() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let outer = Node::element("div");
		let inner = Node::element("button");
		outer.append_child(&inner).unwrap();

		for (node, name, capture) in vec![(&outer, "outer capture", true), (&outer, "outer bubble", false), (&inner, "target", false)] {
			let log = log.clone();
			node.add_event_listener("click", Rc::new(move |_| log.borrow_mut().push(name)), EventOptions { capture, ..EventOptions::default() });
		}

		inner.dispatch_event(&Event::bubbling("click"));
		assert_eq!(*log.borrow(), vec!["outer capture", "target", "outer bubble"]);

		log.borrow_mut().clear();
		inner.dispatch_event(&Event::new("click"));
		assert_eq!(*log.borrow(), vec!["outer capture", "target"]);
	}

	#[test]
	fn once_listeners_are_removed() {
		let count = Rc::new(RefCell::new(0));
		let button = Node::element("button");
		let counter = count.clone();
		button.add_event_listener("click", Rc::new(move |_| *counter.borrow_mut() += 1), EventOptions { once: true, ..EventOptions::default() });

		button.dispatch_event(&Event::new("click"));
		button.dispatch_event(&Event::new("click"));

		assert_eq!(*count.borrow(), 1);
		assert_eq!(button.listener_count("click"), 0);
	}

	#[test]
	fn mutations_are_counted() {
		let div = Node::element("div");
		let before = mutation_count();
		div.set_attribute("a", "1");
		div.remove_attribute("missing");
		div.append_child(&Node::text("x")).unwrap();
		assert_eq!(mutation_count() - before, 2);
	}
}
