// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Where a delivered value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Remote,
}

/// One answer of a cache-then-remote load
///
/// A cache delivery may carry `None` on a cold cache; a remote delivery is
/// only ever sent for a successful answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub source: Source,
    pub value: Option<T>,
}

impl<T> Delivery<T> {
    pub fn cached(value: Option<T>) -> Self {
        Self {
            source: Source::Cache,
            value,
        }
    }

    pub fn remote(value: T) -> Self {
        Self {
            source: Source::Remote,
            value: Some(value),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.source == Source::Remote
    }
}

/// The answers of one load, in order: cache first, then remote if it succeeded
///
/// At most two deliveries arrive. Dropping the receiver is how a caller
/// stops listening; late answers are then discarded.
pub struct Deliveries<T> {
    rx: mpsc::UnboundedReceiver<Delivery<T>>,
}

impl<T> Deliveries<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Delivery<T>>) -> Self {
        Self { rx }
    }

    /// Wait for the next delivery; `None` once the load has finished
    pub async fn next(&mut self) -> Option<Delivery<T>> {
        self.rx.recv().await
    }

    /// Wait for the load to finish and return every delivery
    pub async fn collect_all(mut self) -> Vec<Delivery<T>> {
        let mut deliveries = Vec::with_capacity(2);
        while let Some(delivery) = self.rx.recv().await {
            deliveries.push(delivery);
        }
        deliveries
    }

    /// Wait for the load to finish and return the freshest value
    pub async fn settle(self) -> Option<T> {
        self.collect_all()
            .await
            .into_iter()
            .rev()
            .find_map(|delivery| delivery.value)
    }
}

impl<T> Stream for Deliveries<T> {
    type Item = Delivery<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A delivery tagged with the run it belongs to
///
/// Token-gated resources are reloaded whenever the access token changes;
/// each reload gets the next generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Watched<T> {
    pub generation: u64,
    pub delivery: Delivery<T>,
}

/// Deliveries of a resource that is reloaded on every token change
pub struct WatchedDeliveries<T> {
    rx: mpsc::UnboundedReceiver<Watched<T>>,
}

impl<T> WatchedDeliveries<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Watched<T>>) -> Self {
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<Watched<T>> {
        self.rx.recv().await
    }
}

impl<T> Stream for WatchedDeliveries<T> {
    type Item = Watched<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn settle_prefers_the_last_value() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Delivery::cached(Some(1))).unwrap();
        tx.send(Delivery::remote(2)).unwrap();
        drop(tx);

        assert_eq!(Deliveries::new(rx).settle().await, Some(2));
    }

    #[tokio::test]
    async fn settle_falls_back_to_cached_value() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Delivery::cached(Some("stale"))).unwrap();
        drop(tx);

        assert_eq!(Deliveries::new(rx).settle().await, Some("stale"));
    }

    #[tokio::test]
    async fn settle_on_cold_cache_is_none() {
        let (tx, rx) = mpsc::unbounded_channel::<Delivery<u8>>();
        tx.send(Delivery::cached(None)).unwrap();
        drop(tx);

        assert_eq!(Deliveries::new(rx).settle().await, None);
    }

    #[tokio::test]
    async fn deliveries_are_a_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Delivery::cached(None)).unwrap();
        tx.send(Delivery::remote(5)).unwrap();
        drop(tx);

        let sources: Vec<Source> = Deliveries::new(rx).map(|d| d.source).collect().await;
        assert_eq!(sources, vec![Source::Cache, Source::Remote]);
    }
}
