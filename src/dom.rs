//! The output tree the renderer writes into.

use crate::error::{DomError, RenderError};
use core::fmt::Debug;

/// The primitives of a mutable node tree.
///
/// Implementations must give fragments [***DocumentFragment***](https://developer.mozilla.org/en-US/docs/Web/API/DocumentFragment) semantics:
/// Inserting a fragment moves its children (in order) to the insertion point and leaves it empty.
///
/// Markers are content-less boundary nodes, like HTML comments.
pub trait Dom: 'static + Clone {
	/// A handle to one node. Equality is identity.
	type Node: 'static + Clone + PartialEq + Debug;

	fn create_element(&self, tag_name: &str) -> Result<Self::Node, DomError>;
	fn create_text(&self, data: &str) -> Self::Node;
	fn create_marker(&self, label: &str) -> Self::Node;
	fn create_fragment(&self) -> Self::Node;

	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), DomError>;
	fn set_text(&self, text: &Self::Node, data: &str) -> Result<(), DomError>;

	/// Inserts `node` into `parent` before `reference`, or at the end if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), DomError>;

	/// Detaches `node` from its parent, if it has one.
	fn remove(&self, node: &Self::Node) -> Result<(), DomError>;

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	fn append_child(&self, parent: &Self::Node, node: &Self::Node) -> Result<(), DomError> {
		self.insert_before(parent, node, None)
	}
}

/// Removes `first` and all of its following siblings up to, but excluding, `boundary`.
///
/// `boundary_name` names the boundary in the [`RenderError::MissingMarker`] returned if it is never reached.
pub(crate) fn remove_until<D: Dom>(dom: &D, first: Option<D::Node>, boundary: &D::Node, boundary_name: &'static str) -> Result<usize, RenderError> {
	let mut removed = 0;
	let mut current = first;
	while let Some(node) = current {
		if node == *boundary {
			return Ok(removed);
		}
		current = dom.next_sibling(&node);
		dom.remove(&node)?;
		removed += 1;
	}
	Err(RenderError::MissingMarker(boundary_name))
}

/// Inserts `node` directly before `marker`, wherever that currently is.
pub(crate) fn insert_before_marker<D: Dom>(dom: &D, node: &D::Node, marker: &D::Node, marker_name: &'static str) -> Result<(), RenderError> {
	let parent = dom.parent(marker).ok_or(RenderError::MissingMarker(marker_name))?;
	dom.insert_before(&parent, node, Some(marker))?;
	Ok(())
}
