//! An in-memory [`Dom`], for rendering outside of a browser and for tests.

use crate::{dom::Dom, error::DomError};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::trace;

/// A handle to a node owned by a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

enum NodeKind {
	Element { tag_name: String, attributes: Vec<(String, String)> },
	Text(String),
	Marker(String),
	Fragment,
}

struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Default)]
struct Arena {
	nodes: Vec<NodeData>,
}

impl Arena {
	fn push(&mut self, kind: NodeKind) -> NodeId {
		self.nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.nodes[node.0].parent.take() {
			self.nodes[parent.0].children.retain(|&child| child != node);
		}
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.nodes[node.0].parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn serialize(&self, node: NodeId, out: &mut String) {
		let data = &self.nodes[node.0];
		match &data.kind {
			NodeKind::Element { tag_name, attributes } => {
				out.push('<');
				out.push_str(tag_name);
				for (name, value) in attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
					out.push('"');
				}
				out.push('>');
				for &child in &data.children {
					self.serialize(child, out);
				}
				out.push_str("</");
				out.push_str(tag_name);
				out.push('>');
			}
			NodeKind::Text(text) => out.push_str(&text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")),
			NodeKind::Marker(label) => {
				out.push_str("<!--");
				out.push_str(label);
				out.push_str("-->");
			}
			NodeKind::Fragment => {
				for &child in &data.children {
					self.serialize(child, out);
				}
			}
		}
	}

	fn text_content(&self, node: NodeId, out: &mut String) {
		let data = &self.nodes[node.0];
		match &data.kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Marker(_) => (),
			NodeKind::Element { .. } | NodeKind::Fragment => {
				for &child in &data.children {
					self.text_content(child, out);
				}
			}
		}
	}
}

/// A cheaply cloneable handle to a shared node arena.
///
/// This backend is meant for tests and server-side rendering, where a tree is built, inspected or serialised, and then dropped.
/// Nodes are never freed before the last handle to the arena is dropped, and sibling lookups scan their parent's children linearly,
/// so a long-lived page with a lot of churn should use a real DOM (like [`WebDom`](`crate::web::WebDom`)) instead.
#[derive(Clone, Default)]
pub struct MemoryDom(Rc<RefCell<Arena>>);

impl Debug for MemoryDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom").field("nodes", &self.0.borrow().nodes.len()).finish()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Serialises `node`'s children as HTML. Markers appear as comments.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let arena = self.0.borrow();
		let mut html = String::new();
		for &child in &arena.nodes[node.0].children {
			arena.serialize(child, &mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.0.borrow().serialize(node, &mut html);
		html
	}

	/// The concatenated text of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let mut text = String::new();
		self.0.borrow().text_content(node, &mut text);
		text
	}

	#[must_use]
	pub fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
		match &self.0.borrow().nodes[element.0].kind {
			NodeKind::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.0.borrow().nodes[node.0].children.clone()
	}

	/// Whether `node` is `ancestor` or one of its descendants.
	#[must_use]
	pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
		self.0.borrow().is_inclusive_ancestor(ancestor, node)
	}
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), DomError> {
	let valid = !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='));
	if valid {
		Ok(())
	} else {
		Err(DomError::InvalidName { kind, name: name.to_owned() })
	}
}

impl Dom for MemoryDom {
	type Node = NodeId;

	fn create_element(&self, tag_name: &str) -> Result<NodeId, DomError> {
		validate_name("tag", tag_name)?;
		Ok(self.0.borrow_mut().push(NodeKind::Element {
			tag_name: tag_name.to_owned(),
			attributes: Vec::new(),
		}))
	}

	fn create_text(&self, data: &str) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Text(data.to_owned()))
	}

	fn create_marker(&self, label: &str) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Marker(label.to_owned()))
	}

	fn create_fragment(&self) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Fragment)
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
		validate_name("attribute", name)?;
		match &mut self.0.borrow_mut().nodes[element.0].kind {
			NodeKind::Element { attributes, .. } => {
				match attributes.iter_mut().find(|(n, _)| n == name) {
					Some((_, existing)) => value.clone_into(existing),
					None => attributes.push((name.to_owned(), value.to_owned())),
				}
				Ok(())
			}
			_ => Err(DomError::NotAnElement("set_attribute")),
		}
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) -> Result<(), DomError> {
		match &mut self.0.borrow_mut().nodes[element.0].kind {
			NodeKind::Element { attributes, .. } => {
				attributes.retain(|(n, _)| n != name);
				Ok(())
			}
			_ => Err(DomError::NotAnElement("remove_attribute")),
		}
	}

	fn set_text(&self, text: &NodeId, data: &str) -> Result<(), DomError> {
		match &mut self.0.borrow_mut().nodes[text.0].kind {
			NodeKind::Text(existing) => {
				data.clone_into(existing);
				Ok(())
			}
			_ => Err(DomError::NotAText("set_text")),
		}
	}

	fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let (parent, node) = (*parent, *node);

		if !matches!(arena.nodes[parent.0].kind, NodeKind::Element { .. } | NodeKind::Fragment) {
			return Err(DomError::HierarchyRequest("insert_before"));
		}
		if arena.is_inclusive_ancestor(node, parent) {
			return Err(DomError::HierarchyRequest("insert_before"));
		}
		if let Some(reference) = reference {
			if arena.nodes[reference.0].parent != Some(parent) {
				return Err(DomError::NotAChild);
			}
			// Inserting a node before itself leaves it where it is.
			if *reference == node {
				return Ok(());
			}
		}

		let moved = if let NodeKind::Fragment = arena.nodes[node.0].kind {
			std::mem::take(&mut arena.nodes[node.0].children)
		} else {
			arena.detach(node);
			vec![node]
		};

		let index = match reference {
			Some(reference) => arena.nodes[parent.0]
				.children
				.iter()
				.position(|child| child == reference)
				.ok_or(DomError::NotAChild)?,
			None => arena.nodes[parent.0].children.len(),
		};
		for &child in &moved {
			arena.nodes[child.0].parent = Some(parent);
		}
		trace!("Inserting {} node(s) at index {}.", moved.len(), index);
		arena.nodes[parent.0].children.splice(index..index, moved);
		Ok(())
	}

	fn remove(&self, node: &NodeId) -> Result<(), DomError> {
		self.0.borrow_mut().detach(*node);
		Ok(())
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.0.borrow().nodes[node.0].parent
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let arena = self.0.borrow();
		let parent = arena.nodes[node.0].parent?;
		let siblings = &arena.nodes[parent.0].children;
		let index = siblings.iter().position(|child| child == node)?;
		siblings.get(index + 1).copied()
	}
}
