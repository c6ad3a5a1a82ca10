//! The browser [`Dom`], backed by [`web_sys`].
//!
//! Markers are comment nodes.

use crate::{
	cancel::{CancelSignal, CancelTrigger},
	dom::Dom,
	error::DomError,
	render::{mount, Renderer},
	template::Template,
};
use tracing::{error, trace};
use wasm_bindgen::{throw_str, JsCast, JsValue};
use web_sys::{Document, Node};

#[derive(Debug, Clone)]
pub struct WebDom {
	document: Document,
}

impl WebDom {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	/// The current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Mounts `template` into `parent` on the current thread's executor and returns the trigger that unmounts it again.
	///
	/// Fatal [`RenderError`](`crate::error::RenderError`)s are logged and then thrown as JavaScript exceptions.
	#[must_use = "dropping the trigger leaves the template mounted forever"]
	pub fn spawn_mount(&self, parent: Node, template: Template) -> CancelTrigger {
		let (signal, trigger) = CancelSignal::root();
		let renderer = Renderer::new(self.clone());
		wasm_bindgen_futures::spawn_local(async move {
			match mount(&renderer, &parent, template, signal).await {
				Ok(()) => trace!("Unmounted template."),
				Err(error) => {
					error!("Mounted template failed: {}", error);
					throw_str(&error.to_string())
				}
			}
		});
		trigger
	}
}

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> DomError {
	move |error| DomError::Operation {
		operation,
		message: format!("{:?}", error),
	}
}

impl Dom for WebDom {
	type Node = Node;

	fn create_element(&self, tag_name: &str) -> Result<Node, DomError> {
		self.document.create_element(tag_name).map(Into::into).map_err(|_| DomError::InvalidName {
			kind: "tag",
			name: tag_name.to_owned(),
		})
	}

	fn create_text(&self, data: &str) -> Node {
		self.document.create_text_node(data).into()
	}

	fn create_marker(&self, label: &str) -> Node {
		self.document.create_comment(label).into()
	}

	fn create_fragment(&self) -> Node {
		self.document.create_document_fragment().into()
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), DomError> {
		element
			.dyn_ref::<web_sys::Element>()
			.ok_or(DomError::NotAnElement("set_attribute"))?
			.set_attribute(name, value)
			.map_err(|_| DomError::InvalidName {
				kind: "attribute",
				name: name.to_owned(),
			})
	}

	fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), DomError> {
		element
			.dyn_ref::<web_sys::Element>()
			.ok_or(DomError::NotAnElement("remove_attribute"))?
			.remove_attribute(name)
			.map_err(js_error("removeAttribute"))
	}

	fn set_text(&self, text: &Node, data: &str) -> Result<(), DomError> {
		text.dyn_ref::<web_sys::Text>().ok_or(DomError::NotAText("set_text"))?.set_data(data);
		Ok(())
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		parent.insert_before(node, reference).map(drop).map_err(js_error("insertBefore"))
	}

	fn remove(&self, node: &Node) -> Result<(), DomError> {
		match node.parent_node() {
			Some(parent) => parent.remove_child(node).map(drop).map_err(js_error("removeChild")),
			None => Ok(()),
		}
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}
}
