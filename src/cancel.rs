//! Hierarchical cooperative cancellation.
//!
//! Every subscription in this crate is scoped by a [`CancelSignal`].
//! Signals form a tree: [`CancelSignal::derive`] creates a child that is cancelled whenever its parent is,
//! together with a [`CancelTrigger`] that cancels just that child (and its own descendants).
//!
//! Cancellation is never preemptive. It only becomes observable at the next suspension point of whoever awaits [`CancelSignal::cancelled`].

use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	future::Future,
	mem,
	pin::Pin,
	task::{Context, Poll, Waker},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

struct Node {
	cancelled: Cell<bool>,
	wakers: RefCell<Vec<Waker>>,
	children: RefCell<HashMap<u64, Weak<Node>>>,
	next_child_key: Cell<u64>,
	parent: Option<(Weak<Node>, u64)>,
}

impl Node {
	fn new(parent: Option<(Weak<Node>, u64)>, cancelled: bool) -> Self {
		Self {
			cancelled: Cell::new(cancelled),
			wakers: RefCell::default(),
			children: RefCell::default(),
			next_child_key: Cell::new(0),
			parent,
		}
	}

	fn cancel(&self) {
		if self.cancelled.replace(true) {
			return;
		}

		let wakers = mem::take(&mut *self.wakers.borrow_mut());
		for waker in wakers {
			waker.wake();
		}

		// Taken so that children dropping during the walk don't re-borrow the map.
		let children = mem::take(&mut *self.children.borrow_mut());
		for child in children.values().filter_map(Weak::upgrade) {
			child.cancel();
		}
	}
}

impl Drop for Node {
	fn drop(&mut self) {
		if let Some((parent, key)) = &self.parent {
			if let Some(parent) = parent.upgrade() {
				parent.children.borrow_mut().remove(key);
			}
		}
	}
}

/// A cloneable handle to one node of the cancellation tree.
#[derive(Clone)]
pub struct CancelSignal(Rc<Node>);

impl CancelSignal {
	/// Creates a new root signal and the trigger that cancels it.
	#[must_use]
	pub fn root() -> (Self, CancelTrigger) {
		let node = Rc::new(Node::new(None, false));
		(Self(Rc::clone(&node)), CancelTrigger(node))
	}

	/// A root signal whose trigger was discarded, so it is never cancelled.
	#[must_use]
	pub fn never() -> Self {
		Self::root().0
	}

	/// Creates a child signal that is cancelled once `self` is, plus a trigger that cancels only the child.
	#[must_use]
	pub fn derive(&self) -> (Self, CancelTrigger) {
		let key = self.0.next_child_key.get();
		self.0.next_child_key.set(key.wrapping_add(1));

		let child = Rc::new(Node::new(Some((Rc::downgrade(&self.0), key)), self.is_cancelled()));
		if !child.cancelled.get() {
			self.0.children.borrow_mut().insert(key, Rc::downgrade(&child));
		}
		(Self(Rc::clone(&child)), CancelTrigger(child))
	}

	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.0.cancelled.get()
	}

	/// Resolves once this signal is cancelled. Resolves immediately if it already was.
	pub fn cancelled(&self) -> Cancelled {
		Cancelled(Rc::clone(&self.0))
	}

	#[cfg(test)]
	pub(crate) fn live_children(&self) -> usize {
		self.0.children.borrow().len()
	}
}

impl Debug for CancelSignal {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CancelSignal").field("cancelled", &self.is_cancelled()).finish()
	}
}

/// Cancels one [`CancelSignal`] and all of its descendants.
///
/// Dropping a trigger does **not** cancel its signal.
pub struct CancelTrigger(Rc<Node>);

impl CancelTrigger {
	pub fn cancel(&self) {
		if !self.0.cancelled.get() {
			trace!("Cancelling signal.");
		}
		self.0.cancel();
	}

	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.0.cancelled.get()
	}
}

impl Debug for CancelTrigger {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CancelTrigger").field("cancelled", &self.is_cancelled()).finish()
	}
}

/// Future returned by [`CancelSignal::cancelled`].
#[must_use = "futures do nothing unless polled"]
pub struct Cancelled(Rc<Node>);

impl Future for Cancelled {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		if self.0.cancelled.get() {
			return Poll::Ready(());
		}

		let mut wakers = self.0.wakers.borrow_mut();
		if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
			wakers.push(cx.waker().clone());
		}
		Poll::Pending
	}
}

impl Debug for Cancelled {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cancelled").field("ready", &self.0.cancelled.get()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::{executor::block_on, FutureExt};

	#[test]
	fn parent_cancels_descendants() {
		let (root, trigger) = CancelSignal::root();
		let (child, _child_trigger) = root.derive();
		let (grandchild, _grandchild_trigger) = child.derive();

		trigger.cancel();

		assert!(root.is_cancelled());
		assert!(child.is_cancelled());
		assert!(grandchild.is_cancelled());
		block_on(grandchild.cancelled());
	}

	#[test]
	fn child_does_not_affect_parent_or_siblings() {
		let (root, _trigger) = CancelSignal::root();
		let (left, left_trigger) = root.derive();
		let (right, _right_trigger) = root.derive();

		left_trigger.cancel();

		assert!(left.is_cancelled());
		assert!(!right.is_cancelled());
		assert!(!root.is_cancelled());
	}

	#[test]
	fn derived_from_cancelled_is_cancelled() {
		let (root, trigger) = CancelSignal::root();
		trigger.cancel();
		let (child, _) = root.derive();
		assert!(child.is_cancelled());
	}

	#[test]
	fn cancelled_future_waits() {
		let (signal, trigger) = CancelSignal::root();
		let mut cancelled = signal.cancelled();
		assert!((&mut cancelled).now_or_never().is_none());
		trigger.cancel();
		assert!(cancelled.now_or_never().is_some());
	}

	#[test]
	fn dropped_children_unregister() {
		let (root, _trigger) = CancelSignal::root();
		{
			let _child = root.derive();
			assert_eq!(root.live_children(), 1);
		}
		assert_eq!(root.live_children(), 0);
	}
}
