use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::event::{AudioFragment, RecognitionEvent};
use crate::error::ChannelClosed;

pub type AudioSender = ChannelSender<AudioFragment>;
pub type AudioReceiver = ChannelReceiver<AudioFragment>;
pub type ResultSender = ChannelSender<RecognitionEvent>;
pub type ResultReceiver = ChannelReceiver<RecognitionEvent>;

/// Internal queue item: a payload or the terminal marker.
///
/// The marker is a tagged variant rather than a sentinel payload, so
/// "no item yet" and "no more items ever" stay distinguishable no matter
/// what the payload type looks like.
enum Item<T> {
    Next(T),
    End,
}

/// Create a bounded, ordered, single-producer/single-consumer channel with
/// explicit end-of-stream signaling.
///
/// `push` suspends the producer once `capacity` items are queued; that
/// backpressure is the point of the bound, since an unbounded queue lets a
/// fast producer and a slow consumer exhaust memory.
pub fn channel<T>(capacity: usize) -> (ChannelSender<T>, ChannelReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        ChannelSender {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        ChannelReceiver { rx, done: false },
    )
}

/// Producer half of a session channel.
pub struct ChannelSender<T> {
    tx: mpsc::Sender<Item<T>>,
    closed: Arc<AtomicBool>,
}

impl<T> ChannelSender<T> {
    /// Queue an item, waiting if the channel is at capacity.
    ///
    /// Fails fast with `ChannelClosed` once `close` has been called or the
    /// consumer side has been dropped, instead of blocking forever.
    pub async fn push(&self, item: T) -> Result<(), ChannelClosed> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelClosed);
        }
        self.tx
            .send(Item::Next(item))
            .await
            .map_err(|_| ChannelClosed)
    }

    /// Enqueue the terminal marker. Idempotent: only the first call sends
    /// the marker, later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // The consumer being gone already is fine; there is nobody left
        // who needs the marker.
        let _ = self.tx.send(Item::End).await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// Consumer half of a session channel.
pub struct ChannelReceiver<T> {
    rx: mpsc::Receiver<Item<T>>,
    done: bool,
}

impl<T> ChannelReceiver<T> {
    /// Next item, or `None` once the terminal marker has been consumed or
    /// the producer is gone. Not restartable: after the first `None` every
    /// later call returns `None`.
    pub async fn recv(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(Item::Next(item)) => Some(item),
            Some(Item::End) | None => {
                self.done = true;
                self.rx.close();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn delivers_items_in_order_until_marker() {
        let (tx, mut rx) = channel::<u32>(8);
        for i in 0..5 {
            tx.push(i).await.unwrap();
        }
        tx.close().await;

        let mut got = Vec::new();
        while let Some(item) = rx.recv().await {
            got.push(item);
        }
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (tx, mut rx) = channel::<u32>(4);
        tx.push(7).await.unwrap();
        tx.close().await;
        tx.close().await;

        assert_eq!(rx.recv().await, Some(7));
        assert!(rx.recv().await.is_none());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn push_after_close_is_rejected() {
        let (tx, _rx) = channel::<u32>(4);
        tx.close().await;
        assert!(tx.push(1).await.is_err());
    }

    #[tokio::test]
    async fn push_fails_fast_when_consumer_dropped() {
        let (tx, rx) = channel::<u32>(4);
        drop(rx);
        assert!(tx.push(1).await.is_err());
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn push_suspends_at_capacity() {
        let (tx, mut rx) = channel::<u32>(1);
        tx.push(1).await.unwrap();

        // Queue is full: the second push must wait for the consumer
        assert!(timeout(Duration::from_millis(50), tx.push(2))
            .await
            .is_err());

        assert_eq!(rx.recv().await, Some(1));
        timeout(Duration::from_millis(50), tx.push(2))
            .await
            .expect("push should complete once space frees up")
            .unwrap();
        assert_eq!(rx.recv().await, Some(2));
    }
}
