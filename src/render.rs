//! Turns one [`Template`] into exactly one output node and keeps that node live.
//!
//! # Lifecycle
//!
//! Each template kind renders as a run of a [`NodeStream`]:
//! The first item is the node, which the caller attaches wherever it needs to go.
//! The rest of the run (the [`LiveHandle`]) applies updates from the template's streams to that node,
//! and only completes once the governing [`CancelSignal`] was cancelled **and** the node's teardown finished.
//!
//! Since the node is handed out before its updates are wired up, nested templates are attached depth-first ("mount, then hydrate").
//! Destruction never races ahead of cleanup: Nodes are only removed after everything that could still write to them has completed.

use crate::{
	cancel::CancelSignal,
	dom::{self, Dom},
	drive::drive,
	dynamic_list,
	error::RenderError,
	redact::Redacted,
	stream::{CancelStream, StreamBody},
	template::{AttributeChange, AttributeValue, Element, Template, Text},
};
use async_stream::try_stream;
use core::fmt::{self, Debug, Formatter};
use futures::{future, Stream, StreamExt};
use tracing::{error, instrument, trace};

const STREAM_START: &str = "stream start";
const STREAM_END: &str = "stream end";

/// A render run: one node, then nothing but (possibly) an error.
pub type NodeStream<N> = CancelStream<Result<N, RenderError>>;

/// The result of [`Renderer::render`].
#[derive(Debug)]
pub struct Rendered<N> {
	pub node: N,
	pub live: LiveHandle<N>,
}

/// The remainder of a render run after its node was produced.
///
/// It must be [drained](`LiveHandle::drain`) for the node to receive updates and, after cancellation, to be torn down.
#[must_use = "a rendered node is neither updated nor removed unless its live handle is drained"]
pub struct LiveHandle<N>(StreamBody<Result<N, RenderError>>);

impl<N> Debug for LiveHandle<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("LiveHandle").finish()
	}
}

impl<N: 'static> LiveHandle<N> {
	/// Drives the node's updates until cancellation and teardown complete.
	///
	/// # Errors
	///
	/// Any error raised while updating or tearing down the node, or [`RenderError::ExtraNode`].
	pub async fn drain(mut self) -> Result<(), RenderError> {
		while let Some(next) = self.0.next().await {
			match next {
				Ok(_) => {
					error!("Render stream yielded a second node.");
					return Err(RenderError::ExtraNode);
				}
				Err(error) => return Err(error),
			}
		}
		Ok(())
	}
}

/// Renders [`Template`]s into the tree of a particular [`Dom`].
#[derive(Debug, Clone)]
pub struct Renderer<D> {
	dom: D,
}

impl<D: Dom> Renderer<D> {
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self { dom }
	}

	pub fn dom(&self) -> &D {
		&self.dom
	}

	/// Renders `template` under `signal`, returning its node as soon as it exists.
	///
	/// # Errors
	///
	/// Fails if the node could not be constructed, including when a nested template fails to produce its node ([`RenderError::NoNode`]).
	#[instrument(level = "trace", skip(self, template, signal), fields(kind = template.kind()))]
	pub async fn render(&self, template: Template, signal: CancelSignal) -> Result<Rendered<D::Node>, RenderError> {
		let mut body = self.start(template, signal);
		match body.next().await {
			Some(Ok(node)) => Ok(Rendered { node, live: LiveHandle(body) }),
			Some(Err(error)) => Err(error),
			None => {
				error!("Render stream completed without producing a node.");
				Err(RenderError::NoNode)
			}
		}
	}

	/// The same rendering as [`Renderer::render`], as a stream factory.
	pub fn template_stream(&self, template: Template) -> NodeStream<D::Node> {
		let renderer = self.clone();
		CancelStream::new(move |signal| renderer.start(template.clone(), signal))
	}

	fn start(&self, template: Template, signal: CancelSignal) -> StreamBody<Result<D::Node, RenderError>> {
		match template {
			Template::Text(Text::Static(data)) => static_text(self.dom.clone(), data, signal).boxed_local(),
			Template::Text(Text::Live(data)) => live_text(self.dom.clone(), data, signal).boxed_local(),
			Template::Element(element) => render_element(self.clone(), element, signal).boxed_local(),
			Template::Stream(templates) => stream_region(self.clone(), templates, signal).boxed_local(),
			Template::List(templates) => fixed_list(self.clone(), templates, signal).boxed_local(),
			Template::DynamicList(changes) => dynamic_list::render(self.clone(), changes, signal).boxed_local(),
		}
	}
}

/// Renders `template` under `signal`, appends its node to `parent` and keeps it live until cancellation.
///
/// Resolves once the node was removed again.
///
/// # Errors
///
/// Any fatal [`RenderError`] raised while rendering, updating or tearing down the template.
#[instrument(level = "debug", skip_all)]
pub async fn mount<D: Dom>(renderer: &Renderer<D>, parent: &D::Node, template: Template, signal: CancelSignal) -> Result<(), RenderError> {
	let Rendered { node, live } = renderer.render(template, signal).await?;
	renderer.dom().append_child(parent, &node)?;
	trace!("Mounted rendered node.");
	live.drain().await
}

fn static_text<D: Dom>(dom: D, data: String, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let node = dom.create_text(&data);
		trace!(data = ?Redacted(&data), "Created text node.");
		yield node.clone();

		signal.cancelled().await;
		dom.remove(&node)?;
		trace!("Removed text node.");
	}
}

fn live_text<D: Dom>(dom: D, data: CancelStream<String>, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let node = dom.create_text("");
		trace!("Created live text node.");
		yield node.clone();

		drive(&data, &signal, |value| future::ready(set_text(&dom, &node, &value))).await?;
		signal.cancelled().await;
		dom.remove(&node)?;
		trace!("Removed live text node.");
	}
}

fn set_text<D: Dom>(dom: &D, node: &D::Node, value: &str) -> Result<(), RenderError> {
	trace!(data = ?Redacted(value), "Updating text node.");
	dom.set_text(node, value)?;
	Ok(())
}

fn render_element<D: Dom>(renderer: Renderer<D>, element: Element, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let dom = renderer.dom().clone();
		let node = dom.create_element(&element.tag_name)?;

		// The body is attached before the element is handed out.
		let body = match element.body {
			Some(body) => {
				let Rendered { node: child, live } = renderer.render(*body, signal.clone()).await?;
				dom.append_child(&node, &child)?;
				Some(live)
			}
			None => None,
		};
		trace!(tag = %element.tag_name, "Created element.");
		yield node.clone();

		let attributes = drive(&element.attributes, &signal, |change| future::ready(apply_attribute(&dom, &node, &change)));
		let body = async move {
			match body {
				Some(live) => live.drain().await,
				None => Ok(()),
			}
		};
		future::try_join(attributes, body).await?;

		signal.cancelled().await;
		dom.remove(&node)?;
		trace!(tag = %element.tag_name, "Removed element.");
	}
}

fn apply_attribute<D: Dom>(dom: &D, element: &D::Node, change: &AttributeChange) -> Result<(), RenderError> {
	match &change.value {
		AttributeValue::Set(value) => {
			trace!(name = %change.name, value = ?Redacted(value), "Setting attribute.");
			dom.set_attribute(element, &change.name, value)?;
		}
		AttributeValue::Remove => {
			trace!(name = %change.name, "Removing attribute.");
			dom.remove_attribute(element, &change.name)?;
		}
	}
	Ok(())
}

fn stream_region<D: Dom>(renderer: Renderer<D>, templates: CancelStream<Template>, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let dom = renderer.dom().clone();
		let fragment = dom.create_fragment();
		let start = dom.create_marker(STREAM_START);
		let end = dom.create_marker(STREAM_END);
		dom.append_child(&fragment, &start)?;
		dom.append_child(&fragment, &end)?;
		trace!("Created stream region.");
		yield fragment;

		let nodes = templates.map(move |template| renderer.template_stream(template)).try_switch_to_latest();
		drive(&nodes, &signal, |node| future::ready(node.and_then(|node| replace_region(&dom, &start, &end, &node)))).await?;

		signal.cancelled().await;
		dom::remove_until(&dom, dom.next_sibling(&start), &end, STREAM_END)?;
		dom.remove(&start)?;
		dom.remove(&end)?;
		trace!("Removed stream region.");
	}
}

/// Empties the region between `start` and `end`, then places `node` into it.
fn replace_region<D: Dom>(dom: &D, start: &D::Node, end: &D::Node, node: &D::Node) -> Result<(), RenderError> {
	let stale = dom::remove_until(dom, dom.next_sibling(start), end, STREAM_END)?;
	dom::insert_before_marker(dom, node, end, STREAM_END)?;
	trace!("Replaced stream region content, removing {} stale node(s).", stale);
	Ok(())
}

fn fixed_list<D: Dom>(renderer: Renderer<D>, templates: Vec<Template>, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let dom = renderer.dom().clone();

		// Constructed concurrently, attached in order.
		let rendered = future::try_join_all(templates.into_iter().map(|template| renderer.render(template, signal.clone()))).await?;
		let fragment = dom.create_fragment();
		let mut live = Vec::with_capacity(rendered.len());
		for Rendered { node, live: handle } in rendered {
			dom.append_child(&fragment, &node)?;
			live.push(handle.drain());
		}
		trace!("Created list of {} node(s).", live.len());
		yield fragment;

		future::try_join_all(live).await?;
		signal.cancelled().await;
	}
}
