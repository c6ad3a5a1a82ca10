//! Lazy, cancellable, push-based value sources.
//!
//! A [`CancelStream`] is a factory: Each call to [`CancelStream::start`] with a fresh [`CancelSignal`] begins an independent run,
//! and nothing happens until the returned [`StreamBody`] is first polled.
//!
//! # Contract
//!
//! After the signal passed to [`start`](`CancelStream::start`) is cancelled,
//! the body must complete after at most one more in-flight value, having performed its cleanup by then.
//! All constructors and operators in this module uphold this as long as their inputs do.
//! Use [`CancelStream::until_cancelled`] to adapt sources that don't observe cancellation by themselves.

use crate::cancel::{CancelSignal, CancelTrigger};
use async_stream::stream;
use core::{
	any::type_name,
	fmt::{self, Debug, Formatter},
};
use futures::{
	future::{self, Either},
	stream::{self, LocalBoxStream},
	Stream, StreamExt,
};
use std::rc::Rc;
use tracing::trace;

/// A started run of a [`CancelStream`].
pub type StreamBody<T> = LocalBoxStream<'static, T>;

/// A cancellable stream factory. Cloning is cheap and shares the factory, not any run state.
pub struct CancelStream<T>(Rc<dyn Fn(CancelSignal) -> StreamBody<T>>);

impl<T> Clone for CancelStream<T> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<T> Debug for CancelStream<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "CancelStream<{}>", type_name::<T>())
	}
}

impl<T: 'static> CancelStream<T> {
	/// Wraps a factory that is trusted to observe cancellation of the signal it receives.
	pub fn new<F, S>(factory: F) -> Self
	where
		F: 'static + Fn(CancelSignal) -> S,
		S: 'static + Stream<Item = T>,
	{
		Self(Rc::new(move |signal| factory(signal).boxed_local()))
	}

	/// Wraps a factory whose streams end on their own schedule, cutting them off when the signal is cancelled.
	pub fn until_cancelled<F, S>(factory: F) -> Self
	where
		F: 'static + Fn(CancelSignal) -> S,
		S: 'static + Stream<Item = T>,
	{
		Self::new(move |signal: CancelSignal| {
			let cancelled = signal.cancelled();
			factory(signal).take_until(cancelled)
		})
	}

	/// Emits `value` once, then completes.
	pub fn of(value: T) -> Self
	where
		T: Clone,
	{
		Self::new(move |_| stream::once(future::ready(value.clone())))
	}

	/// Emits each of `values` in order, stopping early on cancellation.
	pub fn iter<I>(values: I) -> Self
	where
		I: 'static + IntoIterator<Item = T> + Clone,
	{
		Self::until_cancelled(move |_| stream::iter(values.clone()))
	}

	/// Completes immediately.
	#[must_use]
	pub fn empty() -> Self {
		Self::new(|_| stream::empty())
	}

	/// Never emits, completing only on cancellation.
	#[must_use]
	pub fn pending() -> Self {
		Self::until_cancelled(|_| stream::pending())
	}

	/// Begins a new, independent run under `signal`.
	///
	/// The factory itself is only invoked once the body is first polled.
	pub fn start(&self, signal: CancelSignal) -> StreamBody<T> {
		let factory = Rc::clone(&self.0);
		stream::once(async move { (*factory)(signal) }).flatten().boxed_local()
	}

	pub fn map<U, F>(&self, f: F) -> CancelStream<U>
	where
		U: 'static,
		F: 'static + Fn(T) -> U,
	{
		let source = self.clone();
		let f = Rc::new(f);
		CancelStream::new(move |signal| {
			let f = Rc::clone(&f);
			source.start(signal).map(move |value| f(value))
		})
	}

	/// Interleaves all values of `streams` as they arrive. Each run starts all of them under the same signal.
	pub fn merge(streams: impl IntoIterator<Item = Self>) -> Self {
		let streams: Rc<[Self]> = streams.into_iter().collect();
		Self::new(move |signal: CancelSignal| stream::select_all(streams.iter().map(|stream| stream.start(signal.clone()))))
	}

	/// Emits a snapshot of the latest value of each of `streams` whenever any of them emits,
	/// but only once all of them have emitted at least once.
	///
	/// Without any inputs, a single empty snapshot is emitted.
	pub fn combine_latest(streams: impl IntoIterator<Item = Self>) -> CancelStream<Vec<T>>
	where
		T: Clone,
	{
		let streams: Rc<[Self]> = streams.into_iter().collect();
		CancelStream::new(move |signal: CancelSignal| {
			let len = streams.len();
			let mut merged = stream::select_all(streams.iter().enumerate().map(|(i, stream)| stream.start(signal.clone()).map(move |value| (i, value)).boxed_local()));
			stream! {
				if len == 0 {
					yield Vec::new();
				} else {
					let mut latest: Vec<Option<T>> = vec![None; len];
					while let Some((i, value)) = merged.next().await {
						latest[i] = Some(value);
						if latest.iter().all(Option::is_some) {
							yield latest.iter().flatten().cloned().collect::<Vec<T>>();
						}
					}
				}
			}
		})
	}
}

enum Switch<S, T> {
	Next(S),
	Value(T),
	InnerDone,
	OuterDone,
}

impl<T: 'static> CancelStream<CancelStream<T>> {
	/// Flattens a stream of streams by only ever following the most recent inner stream.
	///
	/// Each new inner stream runs under its own signal derived from the outer run's signal.
	/// Before it is started, the previous inner stream is cancelled and drained to completion, discarding its remaining values.
	/// Once the outer stream completes, the active inner stream (if any) is followed until it completes too.
	#[must_use]
	pub fn switch_to_latest(&self) -> CancelStream<T> {
		self.switch_forwarding(|_| false)
	}

	/// Like [`switch_to_latest`](`CancelStream::switch_to_latest`), except that the first value matching `fatal`
	/// that turns up while draining a previous inner stream is emitted, ending the run.
	fn switch_forwarding(&self, fatal: fn(&T) -> bool) -> CancelStream<T> {
		let outer = self.clone();
		CancelStream::new(move |signal: CancelSignal| {
			let mut outer = outer.start(signal.clone());
			stream! {
				let mut active: Option<(CancelTrigger, StreamBody<T>)> = None;
				loop {
					let event = match &mut active {
						None => match outer.next().await {
							Some(inner) => Switch::Next(inner),
							None => break,
						},
						Some((_, body)) => match future::select(outer.next(), body.next()).await {
							Either::Left((Some(inner), _)) => Switch::Next(inner),
							Either::Left((None, _)) => Switch::OuterDone,
							Either::Right((Some(value), _)) => Switch::Value(value),
							Either::Right((None, _)) => Switch::InnerDone,
						},
					};

					match event {
						Switch::Next(inner) => {
							if let Some((trigger, mut body)) = active.take() {
								trigger.cancel();
								let mut discarded = 0_usize;
								while let Some(value) = body.next().await {
									if fatal(&value) {
										yield value;
										return;
									}
									discarded += 1;
								}
								trace!("Switched away from previous inner stream, discarding {} value(s).", discarded);
							}
							let (inner_signal, trigger) = signal.derive();
							active = Some((trigger, inner.start(inner_signal)));
						}
						Switch::Value(value) => yield value,
						Switch::InnerDone => active = None,
						Switch::OuterDone => {
							if let Some((_, mut body)) = active.take() {
								while let Some(value) = body.next().await {
									yield value;
								}
							}
							break;
						}
					}
				}
			}
		})
	}
}

impl<T: 'static, E: 'static> CancelStream<CancelStream<Result<T, E>>> {
	/// [`switch_to_latest`](`CancelStream::switch_to_latest`) for fallible streams.
	///
	/// Values of a previous inner stream are still discarded, but the first error it raises while being drained
	/// is emitted and ends the run.
	#[must_use]
	pub fn try_switch_to_latest(&self) -> CancelStream<Result<T, E>> {
		self.switch_forwarding(Result::is_err)
	}
}
