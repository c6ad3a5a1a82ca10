//! The declarative description of what to render.
//!
//! Every [`Template`] renders to exactly one output node.
//! For [`Template::List`] and the region-shaped variants that node is a fragment, which dissolves into its parent once inserted.

use crate::stream::CancelStream;

#[derive(Debug, Clone)]
pub enum Template {
	Text(Text),
	Element(Element),
	/// A child position whose entire content is replaced by each emitted template.
	Stream(CancelStream<Template>),
	/// Sibling templates rendered together, in order.
	List(Vec<Template>),
	/// An ordered run of independently live children, driven by structural changes.
	DynamicList(CancelStream<DynamicListChange>),
}

impl Template {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(Text::Static(text.into()))
	}

	#[must_use]
	pub fn live_text(text: CancelStream<String>) -> Self {
		Self::Text(Text::Live(text))
	}

	#[must_use]
	pub fn stream(templates: CancelStream<Template>) -> Self {
		Self::Stream(templates)
	}

	#[must_use]
	pub fn list(templates: Vec<Template>) -> Self {
		Self::List(templates)
	}

	#[must_use]
	pub fn dynamic_list(changes: CancelStream<DynamicListChange>) -> Self {
		Self::DynamicList(changes)
	}

	/// A short name of the variant, for diagnostics.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Text(Text::Static(_)) => "static text",
			Self::Text(Text::Live(_)) => "live text",
			Self::Element(_) => "element",
			Self::Stream(_) => "stream",
			Self::List(_) => "list",
			Self::DynamicList(_) => "dynamic list",
		}
	}
}

impl From<Element> for Template {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}

impl From<Text> for Template {
	fn from(text: Text) -> Self {
		Self::Text(text)
	}
}

impl From<&str> for Template {
	fn from(text: &str) -> Self {
		Self::text(text)
	}
}

impl From<String> for Template {
	fn from(text: String) -> Self {
		Self::text(text)
	}
}

#[derive(Debug, Clone)]
pub enum Text {
	Static(String),
	Live(CancelStream<String>),
}

#[derive(Debug, Clone)]
pub struct Element {
	pub tag_name: String,
	pub attributes: CancelStream<AttributeChange>,
	pub body: Option<Box<Template>>,
}

impl Element {
	/// An element without attributes or body.
	pub fn new(tag_name: impl Into<String>) -> Self {
		Self {
			tag_name: tag_name.into(),
			attributes: CancelStream::empty(),
			body: None,
		}
	}

	#[must_use]
	pub fn with_attributes(mut self, attributes: CancelStream<AttributeChange>) -> Self {
		self.attributes = attributes;
		self
	}

	#[must_use]
	pub fn with_body(mut self, body: impl Into<Template>) -> Self {
		self.body = Some(Box::new(body.into()));
		self
	}
}

/// Sets or removes one attribute. Applying the same change twice has the same effect as applying it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
	pub name: String,
	pub value: AttributeValue,
}

impl AttributeChange {
	pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: AttributeValue::Set(value.into()),
		}
	}

	pub fn remove(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: AttributeValue::Remove,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
	Set(String),
	Remove,
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		Self::Set(value.to_owned())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		Self::Set(value)
	}
}

/// `true` sets the attribute to the empty string, `false` removes it.
impl From<bool> for AttributeValue {
	fn from(present: bool) -> Self {
		if present {
			Self::Set(String::new())
		} else {
			Self::Remove
		}
	}
}

/// A structural change to a [`Template::DynamicList`].
///
/// Indices refer to the list's live ordering at the moment the change is applied.
#[derive(Debug, Clone)]
pub enum DynamicListChange {
	Insert { index: usize, template: Template },
	Remove { index: usize },
}

impl DynamicListChange {
	pub fn insert(index: usize, template: impl Into<Template>) -> Self {
		Self::Insert {
			index,
			template: template.into(),
		}
	}

	#[must_use]
	pub fn remove(index: usize) -> Self {
		Self::Remove { index }
	}
}
