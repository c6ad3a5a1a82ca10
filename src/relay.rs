//! A hot, push-based source for [`CancelStream`]s.

use crate::{cancel::CancelSignal, stream::CancelStream};
use core::fmt::{self, Debug, Formatter};
use futures::channel::mpsc::{self, UnboundedSender};
use std::{cell::RefCell, rc::Rc};
use tracing::trace;

/// Fans each sent value out to every currently running subscription.
///
/// Each run of [`Relay::stream`] subscribes once it is first polled and only sees values sent after that point.
/// Runs complete when their signal is cancelled or when the relay is [closed](`Relay::close`).
pub struct Relay<T> {
	senders: Rc<RefCell<Vec<UnboundedSender<T>>>>,
}

impl<T> Clone for Relay<T> {
	fn clone(&self) -> Self {
		Self { senders: Rc::clone(&self.senders) }
	}
}

impl<T> Default for Relay<T> {
	fn default() -> Self {
		Self { senders: Rc::default() }
	}
}

impl<T> Debug for Relay<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Relay").field("subscriptions", &self.senders.borrow().len()).finish()
	}
}

impl<T: 'static + Clone> Relay<T> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn send(&self, value: T) {
		self.senders.borrow_mut().retain(|sender| sender.unbounded_send(value.clone()).is_ok());
	}

	/// Completes all running subscriptions. Later runs still subscribe normally.
	pub fn close(&self) {
		let closed = self.senders.borrow_mut().drain(..).count();
		trace!("Closed {} relay subscription(s).", closed);
	}

	#[must_use]
	pub fn subscriber_count(&self) -> usize {
		let mut senders = self.senders.borrow_mut();
		senders.retain(|sender| !sender.is_closed());
		senders.len()
	}

	#[must_use]
	pub fn stream(&self) -> CancelStream<T> {
		let senders = Rc::clone(&self.senders);
		CancelStream::until_cancelled(move |_: CancelSignal| {
			let (sender, receiver) = mpsc::unbounded();
			senders.borrow_mut().push(sender);
			receiver
		})
	}
}

/// Creates a [`Relay`] together with a [`CancelStream`] subscribing to it.
#[must_use]
pub fn relay<T: 'static + Clone>() -> (Relay<T>, CancelStream<T>) {
	let relay = Relay::new();
	let stream = relay.stream();
	(relay, stream)
}
