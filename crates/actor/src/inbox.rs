use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Unbounded multi-producer FIFO with a single awaiting consumer.
///
/// Producers push synchronously from any thread, including from inside a
/// running handler. Items are handed out in the order their pushes completed;
/// nothing is dropped, reordered or coalesced. There is no close: an inbox
/// whose consumer has gone away keeps accepting items.
pub struct Inbox<T> {
	queue: Mutex<VecDeque<T>>,
	notify_recv: Notify,
}

impl<T> Default for Inbox<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Inbox<T> {
	pub fn new() -> Self {
		Self {
			queue: Mutex::new(VecDeque::new()),
			notify_recv: Notify::new(),
		}
	}

	/// Enqueues one item.
	pub fn push(&self, item: T) {
		self.queue.lock().push_back(item);
		// `notify_one` stores a permit when the consumer is not parked yet.
		self.notify_recv.notify_one();
	}

	/// Waits for and removes the oldest item.
	///
	/// Cancel-safe: an item is only removed in the poll that returns it.
	pub async fn recv(&self) -> T {
		loop {
			if let Some(item) = self.queue.lock().pop_front() {
				return item;
			}
			self.notify_recv.notified().await;
		}
	}

	/// Removes the oldest item without waiting.
	pub fn try_recv(&self) -> Option<T> {
		self.queue.lock().pop_front()
	}

	/// Returns current queue length.
	pub fn len(&self) -> usize {
		self.queue.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn delivers_in_push_order() {
		let inbox = Inbox::new();
		for n in 1u32..=5 {
			inbox.push(n);
		}
		assert_eq!(inbox.len(), 5);

		let mut seen = Vec::new();
		for _ in 0..5 {
			seen.push(inbox.recv().await);
		}
		assert_eq!(seen, vec![1, 2, 3, 4, 5]);
		assert!(inbox.is_empty());
		assert_eq!(inbox.try_recv(), None);
	}

	#[tokio::test]
	async fn recv_parks_until_push() {
		let inbox = Arc::new(Inbox::new());
		let rx = Arc::clone(&inbox);
		let waiter = tokio::spawn(async move { rx.recv().await });

		// Give the receiver a moment to park on the notify.
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!waiter.is_finished());

		inbox.push("late");
		let got = tokio::time::timeout(Duration::from_millis(200), waiter)
			.await
			.expect("recv should wake after push")
			.unwrap();
		assert_eq!(got, "late");
	}

	#[tokio::test]
	async fn dropped_recv_loses_nothing() {
		let inbox = Inbox::new();
		let timed_out = tokio::time::timeout(Duration::from_millis(5), inbox.recv()).await;
		assert!(timed_out.is_err());

		inbox.push(9u8);
		assert_eq!(inbox.recv().await, 9);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_producers_keep_per_producer_order() {
		let inbox = Arc::new(Inbox::new());
		let mut producers = Vec::new();
		for producer in 0u32..4 {
			let tx = Arc::clone(&inbox);
			producers.push(tokio::spawn(async move {
				for seq in 0u32..250 {
					tx.push((producer, seq));
				}
			}));
		}
		for p in producers {
			p.await.unwrap();
		}

		let mut last = [None::<u32>; 4];
		for _ in 0..1000 {
			let (producer, seq) = inbox.recv().await;
			let slot = &mut last[producer as usize];
			assert!(slot.is_none_or(|prev| prev < seq), "producer {producer} reordered");
			*slot = Some(seq);
		}
		assert!(inbox.is_empty());
	}
}
