//! Shorthands for assembling [`Template`]s from static and live parts.

use crate::{
	error::RenderError,
	stream::CancelStream,
	template::{AttributeChange, AttributeValue, DynamicListChange, Element, Template, Text},
};
use async_stream::stream;
use futures::StreamExt;
use std::rc::Rc;
use tracing::error;

/// Where an attribute's value comes from.
#[derive(Debug, Clone)]
pub enum AttributeSource {
	Static(AttributeValue),
	Live(CancelStream<AttributeValue>),
}

impl From<AttributeValue> for AttributeSource {
	fn from(value: AttributeValue) -> Self {
		Self::Static(value)
	}
}

impl From<&str> for AttributeSource {
	fn from(value: &str) -> Self {
		Self::Static(value.into())
	}
}

impl From<String> for AttributeSource {
	fn from(value: String) -> Self {
		Self::Static(value.into())
	}
}

impl From<bool> for AttributeSource {
	fn from(present: bool) -> Self {
		Self::Static(present.into())
	}
}

impl From<CancelStream<AttributeValue>> for AttributeSource {
	fn from(values: CancelStream<AttributeValue>) -> Self {
		Self::Live(values)
	}
}

impl From<CancelStream<String>> for AttributeSource {
	fn from(values: CancelStream<String>) -> Self {
		Self::Live(values.map(AttributeValue::Set))
	}
}

impl From<CancelStream<bool>> for AttributeSource {
	fn from(values: CancelStream<bool>) -> Self {
		Self::Live(values.map(AttributeValue::from))
	}
}

/// Merges named attribute sources into one change stream.
///
/// Static values are applied once, live ones whenever they emit.
pub fn attributes<I, N, S>(pairs: I) -> CancelStream<AttributeChange>
where
	I: IntoIterator<Item = (N, S)>,
	N: Into<String>,
	S: Into<AttributeSource>,
{
	CancelStream::merge(pairs.into_iter().map(|(name, source)| {
		let name = name.into();
		match source.into() {
			AttributeSource::Static(value) => CancelStream::of(AttributeChange { name, value }),
			AttributeSource::Live(values) => values.map(move |value| AttributeChange { name: name.clone(), value }),
		}
	}))
}

/// Inserts each of `templates` at its own index, once.
pub fn fixed_children(templates: Vec<Template>) -> CancelStream<DynamicListChange> {
	CancelStream::iter(templates.into_iter().enumerate().map(|(index, template)| DynamicListChange::Insert { index, template }).collect::<Vec<_>>())
}

/// Keeps exactly the latest of `templates` as the only item.
pub fn single_child(templates: CancelStream<Template>) -> CancelStream<DynamicListChange> {
	CancelStream::new(move |signal| {
		let mut templates = templates.start(signal);
		stream! {
			let mut occupied = false;
			while let Some(template) = templates.next().await {
				if occupied {
					yield DynamicListChange::remove(0);
				}
				yield DynamicListChange::Insert { index: 0, template };
				occupied = true;
			}
		}
	})
}

/// One value spliced into [`interpolate`]d text.
#[derive(Debug, Clone)]
pub enum TextSource {
	Static(String),
	Live(CancelStream<String>),
}

impl From<&str> for TextSource {
	fn from(text: &str) -> Self {
		Self::Static(text.to_owned())
	}
}

impl From<String> for TextSource {
	fn from(text: String) -> Self {
		Self::Static(text)
	}
}

impl From<CancelStream<String>> for TextSource {
	fn from(text: CancelStream<String>) -> Self {
		Self::Live(text)
	}
}

macro_rules! display_text_source {
	($($type:ty),*$(,)?) => {$(
		impl From<$type> for TextSource {
			fn from(value: $type) -> Self {
				Self::Static(value.to_string())
			}
		}
	)*};
}
display_text_source!(bool, char, i32, i64, u32, u64, usize, f64);

/// Splices `values` between `parts`, like a tagged template literal.
///
/// The text is static if all values are. Otherwise it is live and first emits once every live value has emitted.
///
/// # Errors
///
/// [`RenderError::TemplateMismatch`] unless there is exactly one more part than there are values.
pub fn interpolate<P: AsRef<str>>(parts: &[P], values: Vec<TextSource>) -> Result<Text, RenderError> {
	if parts.len() != values.len() + 1 {
		error!(parts = parts.len(), values = values.len(), "Interpolation parts don't fit the values.");
		return Err(RenderError::TemplateMismatch {
			parts: parts.len(),
			values: values.len(),
		});
	}
	let parts: Rc<[String]> = parts.iter().map(|part| part.as_ref().to_owned()).collect();

	if values.iter().all(|value| matches!(value, TextSource::Static(_))) {
		let values: Vec<String> = values
			.into_iter()
			.filter_map(|value| match value {
				TextSource::Static(value) => Some(value),
				TextSource::Live(_) => None,
			})
			.collect();
		return Ok(Text::Static(splice(&parts, &values)));
	}

	let values = values.into_iter().map(|value| match value {
		TextSource::Static(value) => CancelStream::of(value),
		TextSource::Live(values) => values,
	});
	Ok(Text::Live(CancelStream::combine_latest(values).map(move |values| splice(&parts, &values))))
}

fn splice(parts: &[String], values: &[String]) -> String {
	let mut text = parts[0].clone();
	for (value, part) in values.iter().zip(&parts[1..]) {
		text.push_str(value);
		text.push_str(part);
	}
	text
}

/// An element whose body is nothing, the only child, or a list of all `children`.
pub fn element(tag_name: impl Into<String>, attributes: CancelStream<AttributeChange>, mut children: Vec<Template>) -> Template {
	let element = Element::new(tag_name).with_attributes(attributes);
	if children.len() > 1 {
		element.with_body(Template::List(children)).into()
	} else {
		match children.pop() {
			Some(child) => element.with_body(child).into(),
			None => element.into(),
		}
	}
}
