//! Conversion between the browser DOM and [`crate::dom`].
//!
//! [`load_child_nodes`] copies existing markup (for example server-rendered content) so that it can be rendered into,
//! [`store`] materializes a rendered tree in a real document,
//! and [`mirror`] keeps a browser element in sync with renders into its in-memory counterpart.

use crate::{
	dom::{self, EventOptions, Namespace, Node, NodeType},
	value::{Primitive, Value},
};
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Attr, Comment, Document, Element, NamedNodeMap, Node as wNode, NodeList, Text};

/// Appends copies of `child_nodes` to `parent`.
///
/// Node types other than elements, text and comments are skipped.
pub fn load_child_nodes(child_nodes: &NodeList, parent: &Node) {
	load_children(child_nodes, parent, false);
}

#[must_use]
pub fn load_node(node: &wNode) -> Option<Node> {
	load(node, false)
}

#[must_use]
pub fn load_element(element: &Element) -> Node {
	load_element_bound(element, false)
}

fn load_children(child_nodes: &NodeList, parent: &Node, bind: bool) {
	for i in 0..child_nodes.length() {
		if let Some(child) = child_nodes.item(i).as_ref().and_then(|child| load(child, bind)) {
			parent.adopt_child(child);
		}
	}
}

fn load(node: &wNode, bind: bool) -> Option<Node> {
	if let Some(element) = node.dyn_ref::<Element>() {
		return Some(load_element_bound(element, bind));
	}

	let loaded = if let Some(text) = node.dyn_ref::<Text>() {
		Node::text(&text.data())
	} else if let Some(comment) = node.dyn_ref::<Comment>() {
		Node::comment(&comment.data())
	} else {
		warn!(node_type = node.node_type(), "Skipped unrecognised child node.");
		return None;
	};
	if bind {
		loaded.set_counterpart(Rc::new(Counterpart::new(node.clone())));
	}
	Some(loaded)
}

fn load_element_bound(element: &Element, bind: bool) -> Node {
	let namespace = match element.namespace_uri().as_deref() {
		Some(uri) if uri == Namespace::Svg.uri() => Namespace::Svg,
		Some(uri) if uri == Namespace::MathMl.uri() => Namespace::MathMl,
		_ => Namespace::Html,
	};
	let loaded = Node::element_ns(namespace, &element.local_name());
	load_attributes(&element.attributes(), &loaded);

	let node: &wNode = element.as_ref();
	load_children(&node.child_nodes(), &loaded, bind);
	if bind {
		loaded.set_counterpart(Rc::new(Counterpart::new(node.clone())));
	}
	loaded
}

pub fn load_attributes(attributes: &NamedNodeMap, element: &Node) {
	for i in 0..attributes.length() {
		if let Some(attribute) = attributes.item(i) {
			load_attribute(&attribute, element);
		}
	}
}

pub fn load_attribute(attribute: &Attr, element: &Node) {
	element.set_attribute(&attribute.name(), &attribute.value());
}

/// Loads `element` and mirrors all later changes of the loaded tree back onto it.
///
/// Render into the returned node: existing browser nodes are updated in place, new ones are created in `element`'s document
/// and event listeners are forwarded to the browser, which relays its events to them.
///
/// # Errors
///
/// Iff `element` has no owner document.
pub fn mirror(element: &Element) -> Result<Node, JsValue> {
	let document = element.owner_document().ok_or_else(|| JsValue::from_str("lit-dom: No owner document found for the mirrored element."))?;
	let loaded = load_element_bound(element, true);
	loaded.set_mirror(Rc::new(WebMirror { document }));
	trace!("Mirroring element.");
	Ok(loaded)
}

/// The browser node of a mirrored [`Node`], with one relaying closure per listened `(event_type, capture)`.
struct Counterpart {
	node: wNode,
	listeners: RefCell<HashMap<(String, bool), Closure<dyn Fn(web_sys::Event)>>>,
}
impl Counterpart {
	fn new(node: wNode) -> Self {
		Self { node, listeners: RefCell::default() }
	}

	/// Closures stay alive until the counterpart is dropped, since a listener may remove itself while its closure runs.
	fn listen(&self, element: &Node, event_type: &str, capture: bool) -> Result<(), JsValue> {
		let mut listeners = self.listeners.borrow_mut();
		let closure = listeners.entry((event_type.to_owned(), capture)).or_insert_with(|| {
			let element = element.downgrade();
			Closure::wrap(Box::new(move |web_event: web_sys::Event| {
				if let Some(element) = element.upgrade() {
					let event_type = web_event.type_();
					let event = if web_event.bubbles() { dom::Event::bubbling(&event_type) } else { dom::Event::new(&event_type) };
					element.relay_event(&event, capture);
					if event.default_prevented() {
						web_event.prevent_default();
					}
					if event.propagation_stopped() {
						web_event.stop_propagation();
					}
				}
			}) as Box<dyn Fn(web_sys::Event)>)
		});
		self.node.add_event_listener_with_callback_and_bool(event_type, closure.as_ref().unchecked_ref(), capture)
	}

	fn unlisten(&self, event_type: &str, capture: bool) -> Result<(), JsValue> {
		match self.listeners.borrow().get(&(event_type.to_owned(), capture)) {
			Some(closure) => self.node.remove_event_listener_with_callback_and_bool(event_type, closure.as_ref().unchecked_ref(), capture),
			None => Ok(()),
		}
	}
}

/// Replays [`dom`] mutations onto browser nodes, creating those that don't exist yet.
struct WebMirror {
	document: Document,
}
impl WebMirror {
	fn counterpart(&self, node: &Node) -> Result<Rc<Counterpart>, JsValue> {
		if let Some(counterpart) = node.counterpart().and_then(|counterpart| counterpart.downcast::<Counterpart>().ok()) {
			return Ok(counterpart);
		}

		let counterpart = Rc::new(Counterpart::new(create(node, &self.document)?));
		node.set_counterpart(counterpart.clone());
		for child in node.child_nodes() {
			counterpart.node.append_child(&self.counterpart(&child)?.node)?;
		}
		for (event_type, capture) in node.listened_events() {
			counterpart.listen(node, &event_type, capture)?;
		}
		Ok(counterpart)
	}

	fn element(&self, element: &Node) -> Result<Element, JsValue> {
		self.counterpart(element)?.node.clone().dyn_into::<Element>().map_err(JsValue::from)
	}
}
impl dom::Mirror for WebMirror {
	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) {
		let result = (|| {
			let parent = self.counterpart(parent)?;
			let node = self.counterpart(node)?;
			let reference = reference.map(|reference| self.counterpart(reference)).transpose()?;
			parent.node.insert_before(&node.node, reference.as_ref().map(|reference| &reference.node))?;
			Ok::<_, JsValue>(())
		})();
		if let Err(error) = result {
			error!("Failed to insert mirrored node: {:?}", error);
		}
	}

	fn remove(&self, parent: &Node, node: &Node) {
		let result = (|| {
			let parent = self.counterpart(parent)?;
			let node = self.counterpart(node)?;
			parent.node.remove_child(&node.node)?;
			Ok::<_, JsValue>(())
		})();
		if let Err(error) = result {
			error!("Failed to remove mirrored node: {:?}", error);
		}
	}

	fn set_data(&self, node: &Node, data: &str) {
		match self.counterpart(node) {
			Ok(counterpart) => counterpart.node.set_text_content(Some(data)),
			Err(error) => error!("Failed to update mirrored character data: {:?}", error),
		}
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) {
		if let Err(error) = self.element(element).and_then(|element| element.set_attribute(name, value)) {
			error!("Failed to set mirrored attribute {:?}: {:?}", name, error);
		}
	}

	fn remove_attribute(&self, element: &Node, name: &str) {
		if let Err(error) = self.element(element).and_then(|element| element.remove_attribute(name)) {
			error!("Failed to remove mirrored attribute {:?}: {:?}", name, error);
		}
	}

	fn set_property(&self, element: &Node, name: &str, value: &Value) {
		let value = match to_js(value) {
			Some(value) => value,
			None => {
				warn!(property = name, value = value.kind_name(), "Skipped property that has no JavaScript equivalent.");
				return;
			}
		};
		if let Err(error) = self.element(element).and_then(|element| js_sys::Reflect::set(element.as_ref(), &JsValue::from_str(name), &value)) {
			error!("Failed to set mirrored property {:?}: {:?}", name, error);
		}
	}

	fn add_event_listener(&self, element: &Node, event_type: &str, options: EventOptions) {
		if let Err(error) = self.counterpart(element).and_then(|counterpart| counterpart.listen(element, event_type, options.capture)) {
			error!("Failed to add event listener {:?}: {:?}", event_type, error);
		}
	}

	fn remove_event_listener(&self, element: &Node, event_type: &str, capture: bool) {
		if let Err(error) = self.counterpart(element).and_then(|counterpart| counterpart.unlisten(event_type, capture)) {
			error!("Failed to remove event listener {:?}: {:?}", event_type, error);
		}
	}
}

/// Creates a browser DOM copy of `node` in `document`.
///
/// Properties are assigned if their values are primitives or [`NOTHING`](`crate::NOTHING`), others are skipped.
/// Event listeners are not carried over.
///
/// # Errors
///
/// Iff the browser rejects a tag or attribute name.
pub fn store(node: &Node, document: &Document) -> Result<wNode, JsValue> {
	let stored = create(node, document)?;
	for child in node.child_nodes() {
		stored.append_child(&store(&child, document)?)?;
	}
	Ok(stored)
}

/// Creates `node` without its children.
fn create(node: &Node, document: &Document) -> Result<wNode, JsValue> {
	match node.node_type() {
		NodeType::Element => {
			let name = node.local_name().unwrap_or_default();
			let element = match node.namespace() {
				Some(Namespace::Html) | None => document.create_element(name)?,
				Some(namespace) => document.create_element_ns(Some(namespace.uri()), name)?,
			};
			for (name, value) in node.attributes() {
				element.set_attribute(&name, &value)?;
			}
			for (name, value) in node.properties() {
				match to_js(&value) {
					Some(value) => {
						js_sys::Reflect::set(element.as_ref(), &JsValue::from_str(&name), &value)?;
					}
					None => warn!(property = name.as_str(), value = value.kind_name(), "Skipped property that has no JavaScript equivalent."),
				}
			}
			Ok(element.into())
		}
		NodeType::Text => Ok(document.create_text_node(&node.data().unwrap_or_default()).into()),
		NodeType::Comment => Ok(document.create_comment(&node.data().unwrap_or_default()).into()),
		NodeType::DocumentFragment => Ok(document.create_document_fragment().into()),
	}
}

#[allow(clippy::cast_precision_loss)]
fn to_js(value: &Value) -> Option<JsValue> {
	Some(match value {
		Value::Nothing => JsValue::UNDEFINED,
		Value::Primitive(Primitive::Null) => JsValue::NULL,
		Value::Primitive(Primitive::Bool(value)) => JsValue::from_bool(*value),
		Value::Primitive(Primitive::Int(value)) => JsValue::from_f64(*value as f64),
		Value::Primitive(Primitive::Float(value)) => JsValue::from_f64(*value),
		Value::Primitive(Primitive::Str(value)) => JsValue::from_str(value),
		_ => return None,
	})
}
