//! Error types.
//!
//! All of these are contract violations: The renderer never retries, and any of them aborts the enclosing render operation.

use thiserror::Error;

/// A fatal failure while rendering or reconciling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
	/// A render stream completed before producing its node.
	#[error("rendering a template completed without producing a node")]
	NoNode,

	/// A render stream produced a second node after its first one.
	#[error("rendering a template produced more than one node")]
	ExtraNode,

	#[error("dynamic list insert index {index} is out of bounds (length {len})")]
	InsertOutOfBounds { index: usize, len: usize },

	#[error("dynamic list remove index {index} is out of bounds (length {len})")]
	RemoveOutOfBounds { index: usize, len: usize },

	/// A region boundary marker was detached or reordered by someone else.
	#[error("could not find the {0} marker")]
	MissingMarker(&'static str),

	/// Text interpolation requires exactly one more string part than values.
	#[error("text template has {parts} string part(s) for {values} value(s)")]
	TemplateMismatch { parts: usize, values: usize },

	#[error(transparent)]
	Dom(#[from] DomError),
}

/// A failed output tree primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	#[error("invalid {kind} name {name:?}")]
	InvalidName { kind: &'static str, name: String },

	#[error("`{0}` requires an element")]
	NotAnElement(&'static str),

	#[error("`{0}` requires a text node")]
	NotAText(&'static str),

	#[error("the reference node is not a child of the given parent")]
	NotAChild,

	/// The insertion would create a cycle or attach children to a leaf node.
	#[error("`{0}` would produce an invalid tree")]
	HierarchyRequest(&'static str),

	/// Failure reported by the host tree implementation.
	#[error("`{operation}` failed: {message}")]
	Operation { operation: &'static str, message: String },
}
