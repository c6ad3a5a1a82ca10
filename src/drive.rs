//! The subscription driver: the one way values are read out of a [`CancelStream`].

use crate::{
	cancel::CancelSignal,
	stream::{CancelStream, StreamBody},
};
use core::future::Future;
use futures::StreamExt;
use tracing::trace;

/// Pulls a run of `stream` under `signal` to completion, awaiting `on_value` for each value in emission order.
///
/// `on_value` calls never overlap. The first `Err` aborts the run and is returned.
/// Otherwise this resolves once the run completed, which is guaranteed to happen after `signal` is cancelled.
pub async fn drive<T, E, F, Fut>(stream: &CancelStream<T>, signal: &CancelSignal, mut on_value: F) -> Result<(), E>
where
	T: 'static,
	F: FnMut(T) -> Fut,
	Fut: Future<Output = Result<(), E>>,
{
	let mut body = stream.start(signal.clone());
	let mut count = 0_usize;
	while let Some(value) = body.next().await {
		on_value(value).await?;
		count += 1;
	}
	trace!("Drove {} value(s) to completion.", count);
	Ok(())
}

/// Drains an already started run, discarding its values. Returns how many were discarded.
pub async fn exhaust<T>(body: StreamBody<T>) -> usize {
	body.fold(0, |count, _| async move { count + 1 }).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::relay::Relay;
	use futures::{executor::block_on, future, FutureExt};
	use std::{cell::RefCell, rc::Rc};

	#[test]
	fn applies_in_order() {
		let seen = RefCell::new(Vec::new());
		let result: Result<(), ()> = block_on(drive(&CancelStream::iter(vec![1, 2, 3]), &CancelSignal::never(), |value| {
			seen.borrow_mut().push(value);
			future::ready(Ok(()))
		}));
		assert_eq!(result, Ok(()));
		assert_eq!(*seen.borrow(), vec![1, 2, 3]);
	}

	#[test]
	fn first_error_aborts() {
		let result = block_on(drive(&CancelStream::iter(vec![1, 2, 3]), &CancelSignal::never(), |value| future::ready(if value == 2 { Err(value) } else { Ok(()) })));
		assert_eq!(result, Err(2));
	}

	#[test]
	fn resolves_after_cancellation() {
		let relay = Relay::<u8>::new();
		let (signal, trigger) = CancelSignal::root();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut driving = {
			let seen = Rc::clone(&seen);
			let stream = relay.stream();
			async move {
				drive(&stream, &signal, |value| {
					seen.borrow_mut().push(value);
					future::ready(Ok::<_, ()>(()))
				})
				.await
			}
			.boxed_local()
		};

		assert!((&mut driving).now_or_never().is_none());
		relay.send(1);
		assert!((&mut driving).now_or_never().is_none());
		trigger.cancel();
		assert_eq!(block_on(driving), Ok(()));
		assert_eq!(*seen.borrow(), vec![1]);
	}

	#[test]
	fn exhaust_counts() {
		assert_eq!(block_on(exhaust(CancelStream::iter(vec!['a', 'b']).start(CancelSignal::never()))), 2);
	}
}
