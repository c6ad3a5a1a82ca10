//! Reconciliation of [`Template::DynamicList`](`crate::template::Template::DynamicList`).
//!
//! Each item owns a start marker followed by its rendered node(s).
//! The list as a whole is closed by an end marker, so the region of item `i` always reaches up to the start of item `i + 1` (or the end marker).
//! Items are located by walking siblings from their start marker, which also covers items whose node is a fragment of several nodes.
//!
//! Changes are applied strictly one at a time, in arrival order.
//! A removal waits for the removed item's own teardown before its region is cleared, and later changes wait for the removal.

use crate::{
	cancel::{CancelSignal, CancelTrigger},
	dom::{self, Dom},
	error::RenderError,
	render::{LiveHandle, Rendered, Renderer},
	stream::CancelStream,
	template::{DynamicListChange, Template},
};
use async_stream::try_stream;
use core::{
	cell::RefCell,
	future::Future,
	task::{Poll, Waker},
};
use futures::{
	channel::oneshot,
	future::{self, LocalBoxFuture},
	stream::FuturesUnordered,
	FutureExt, Stream, StreamExt,
};
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, warn, Level};

const ITEM_START: &str = "list item";
const LIST_END: &str = "list end";

struct Item<N> {
	start: N,
	trigger: CancelTrigger,
	/// Completes once the item's live handle was drained.
	done: oneshot::Receiver<()>,
}

#[derive(Default)]
struct TaskState {
	running: FuturesUnordered<LocalBoxFuture<'static, Result<(), RenderError>>>,
	waker: Option<Waker>,
	closed: bool,
}

/// The live handles of all items, polled together.
#[derive(Clone, Default)]
struct ItemTasks(Rc<RefCell<TaskState>>);

impl ItemTasks {
	fn push<N: 'static>(&self, live: LiveHandle<N>) -> oneshot::Receiver<()> {
		let (done, receiver) = oneshot::channel();
		let mut state = self.0.borrow_mut();
		state.running.push(
			async move {
				let result = live.drain().await;
				// The receiver is gone if the list was aborted.
				done.send(()).ok();
				result
			}
			.boxed_local(),
		);
		if let Some(waker) = state.waker.take() {
			waker.wake();
		}
		receiver
	}

	fn close(&self) {
		let mut state = self.0.borrow_mut();
		state.closed = true;
		if let Some(waker) = state.waker.take() {
			waker.wake();
		}
	}

	/// Resolves after [`ItemTasks::close`] once all items completed, or with the first error.
	fn run(&self) -> impl Future<Output = Result<(), RenderError>> {
		let state = Rc::clone(&self.0);
		future::poll_fn(move |cx| {
			let mut state = state.borrow_mut();
			loop {
				match state.running.poll_next_unpin(cx) {
					Poll::Ready(Some(Ok(()))) => (),
					Poll::Ready(Some(Err(error))) => return Poll::Ready(Err(error)),
					Poll::Ready(None) if state.closed => return Poll::Ready(Ok(())),
					Poll::Ready(None) | Poll::Pending => {
						state.waker = Some(cx.waker().clone());
						return Poll::Pending;
					}
				}
			}
		})
	}
}

/// The live state of one dynamic list, positioned before its end marker.
///
/// Items only make progress (including their teardown) while [`DynamicList::run`] is being polled.
pub struct DynamicList<D: Dom> {
	renderer: Renderer<D>,
	signal: CancelSignal,
	end: D::Node,
	items: Vec<Item<D::Node>>,
	tasks: ItemTasks,
}

impl<D: Dom> DynamicList<D> {
	/// Creates an empty list whose items will be inserted before `end`.
	///
	/// Each item is rendered under a signal derived from `signal`.
	#[must_use]
	pub fn new(renderer: Renderer<D>, signal: CancelSignal, end: D::Node) -> Self {
		Self {
			renderer,
			signal,
			end,
			items: Vec::new(),
			tasks: ItemTasks::default(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.items.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// # Errors
	///
	/// See [`DynamicList::insert`] and [`DynamicList::remove`].
	pub async fn apply(&mut self, change: DynamicListChange) -> Result<(), RenderError> {
		match change {
			DynamicListChange::Insert { index, template } => self.insert(index, template).await,
			DynamicListChange::Remove { index } => self.remove(index).await,
		}
	}

	/// Renders `template` and places it so that it becomes the item at `index`.
	///
	/// # Errors
	///
	/// [`RenderError::InsertOutOfBounds`] if `index` is greater than [`len`](`DynamicList::len`), in which case the list is left unchanged.
	/// Otherwise any error raised while rendering the item.
	#[instrument(level = "trace", skip(self, template))]
	pub async fn insert(&mut self, index: usize, template: Template) -> Result<(), RenderError> {
		let len = self.items.len();
		if index > len {
			error!(index, len, "Dynamic list insert index out of bounds.");
			return Err(RenderError::InsertOutOfBounds { index, len });
		}

		let (signal, trigger) = self.signal.derive();
		let Rendered { node, live } = self.renderer.render(template, signal).await?;

		let dom = self.renderer.dom();
		let start = dom.create_marker(ITEM_START);
		let fragment = dom.create_fragment();
		dom.append_child(&fragment, &start)?;
		dom.append_child(&fragment, &node)?;
		match self.items.get(index) {
			Some(next) => dom::insert_before_marker(dom, &fragment, &next.start, ITEM_START)?,
			None => dom::insert_before_marker(dom, &fragment, &self.end, LIST_END)?,
		}

		let done = self.tasks.push(live);
		self.items.insert(index, Item { start, trigger, done });
		trace!("Inserted dynamic list item.");
		Ok(())
	}

	/// Cancels the item at `index`, waits for its teardown and then clears its region.
	///
	/// # Errors
	///
	/// [`RenderError::RemoveOutOfBounds`] if there is no item at `index`, in which case the list is left unchanged.
	/// [`RenderError::MissingMarker`] if the item's region was disturbed from outside.
	#[instrument(level = "trace", skip(self))]
	pub async fn remove(&mut self, index: usize) -> Result<(), RenderError> {
		let len = self.items.len();
		if index >= len {
			error!(index, len, "Dynamic list remove index out of bounds.");
			return Err(RenderError::RemoveOutOfBounds { index, len });
		}

		let item = &mut self.items[index];
		item.trigger.cancel();
		if (&mut item.done).await.is_err() {
			warn!("Dynamic list item task was dropped before completing.");
		}

		let dom = self.renderer.dom();
		let start = &self.items[index].start;
		if STATIC_MAX_LEVEL >= Level::ERROR && dom.parent(start) != dom.parent(&self.end) {
			error!(index, "Dynamic list item marker was moved out of its list.");
		}
		let first = Some(start.clone());
		let removed = match self.items.get(index + 1) {
			Some(next) => dom::remove_until(dom, first, &next.start, ITEM_START)?,
			None => dom::remove_until(dom, first, &self.end, LIST_END)?,
		};
		self.items.remove(index);
		trace!(removed, "Removed dynamic list item.");
		Ok(())
	}

	/// Applies `changes` in order until the list's signal is cancelled, then tears the list down.
	///
	/// A completed change stream leaves the list as it is until cancellation.
	///
	/// # Errors
	///
	/// The first error raised by a change or by any item, after which the list stops being maintained.
	pub async fn run(&mut self, changes: &CancelStream<DynamicListChange>) -> Result<(), RenderError> {
		let tasks = self.tasks.clone();
		let process = async {
			let mut changes = changes.start(self.signal.clone());
			while let Some(change) = changes.next().await {
				self.apply(change).await?;
			}
			drop(changes);
			self.signal.cancelled().await;
			self.teardown().await
		};
		future::try_join(process, tasks.run()).await?;
		Ok(())
	}

	async fn teardown(&mut self) -> Result<(), RenderError> {
		trace!("Tearing down dynamic list of {} item(s).", self.items.len());
		while !self.items.is_empty() {
			self.remove(0).await?;
		}
		self.renderer.dom().remove(&self.end)?;
		self.tasks.close();
		Ok(())
	}
}

pub(crate) fn render<D: Dom>(renderer: Renderer<D>, changes: CancelStream<DynamicListChange>, signal: CancelSignal) -> impl Stream<Item = Result<D::Node, RenderError>> {
	try_stream! {
		let dom = renderer.dom().clone();
		let fragment = dom.create_fragment();
		let end = dom.create_marker(LIST_END);
		dom.append_child(&fragment, &end)?;
		trace!("Created dynamic list.");
		yield fragment;

		let mut list = DynamicList::new(renderer, signal, end);
		list.run(&changes).await?;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;
	use futures::executor::block_on;
	use rstest::rstest;

	fn list() -> (MemoryDom, <MemoryDom as Dom>::Node, DynamicList<MemoryDom>) {
		let dom = MemoryDom::new();
		let root = dom.create_element("ul").unwrap();
		let end = dom.create_marker(LIST_END);
		dom.append_child(&root, &end).unwrap();
		let list = DynamicList::new(Renderer::new(dom.clone()), CancelSignal::never(), end);
		(dom, root, list)
	}

	#[test]
	fn inserts_at_live_indices() {
		let (dom, root, mut list) = list();
		block_on(list.insert(0, "b".into())).unwrap();
		block_on(list.insert(0, "a".into())).unwrap();
		block_on(list.insert(2, "c".into())).unwrap();
		assert_eq!(list.len(), 3);
		assert_eq!(dom.inner_html(root), "<!--list item-->a<!--list item-->b<!--list item-->c<!--list end-->");
	}

	#[rstest]
	#[case(0, 2)]
	#[case(1, 3)]
	#[case(2, 100)]
	fn insert_out_of_bounds_leaves_list_unchanged(#[case] len: usize, #[case] index: usize) {
		let (dom, root, mut list) = list();
		for i in 0..len {
			block_on(list.insert(i, i.to_string().into())).unwrap();
		}
		let before = dom.inner_html(root);

		assert_eq!(block_on(list.insert(index, "x".into())), Err(RenderError::InsertOutOfBounds { index, len }));
		assert_eq!(list.len(), len);
		assert_eq!(dom.inner_html(root), before);
	}

	#[test]
	fn remove_out_of_bounds_leaves_list_unchanged() {
		let (dom, root, mut list) = list();
		assert_eq!(block_on(list.remove(0)), Err(RenderError::RemoveOutOfBounds { index: 0, len: 0 }));
		assert!(list.is_empty());
		assert_eq!(dom.inner_html(root), "<!--list end-->");
	}
}
