//! Per-step state streaming with backpressure
//!
//! When a run is given a [`StreamSink`], the executor emits one
//! [`StreamState`] per visited node, *before* the node's transition runs,
//! followed by [`StreamSink::close`] when the run ends. The final event of a
//! completed run is therefore the `End` pre-image, carrying the final state.
//!
//! ```text
//!  Executor ──emit(A, s0)──▶ ┌──────────────┐ ──▶ consumer
//!           ──emit(B, s1)──▶ │ bounded mpsc │ ──▶ (awaits recv)
//!           ──emit(End,s2)─▶ └──────────────┘ ──▶
//!           ──close()──────▶  channel closed  ──▶ stream ends
//! ```
//!
//! `emit` awaits until the consumer has room, so a slow consumer slows the
//! traversal down instead of letting snapshots pile up in memory. This is the
//! engine's only backpressure mechanism.
//!
//! # Example
//!
//! ```rust
//! use clan_core::stream::{stream_channel, StreamState};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, mut events) = stream_channel::<u32>(8);
//! tokio::spawn(async move {
//!     tx.send(StreamState::new("A", 1)).await.unwrap();
//! });
//!
//! let event = events.next().await.unwrap();
//! assert_eq!(event.node_name, "A");
//! # }
//! ```

use crate::graph::NodeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Snapshot of the traversal just before `node_name` runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState<S> {
    pub node_name: NodeId,
    pub state: S,
}

impl<S> StreamState<S> {
    pub fn new(node_name: impl Into<NodeId>, state: S) -> Self {
        Self {
            node_name: node_name.into(),
            state,
        }
    }
}

/// The consumer behind a sink has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream consumer disconnected")]
pub struct SinkClosed;

/// Ordered, backpressure-aware consumer of per-step snapshots
#[async_trait]
pub trait StreamSink<S>: Send {
    /// Deliver one event, waiting until the consumer can take it
    async fn emit(&mut self, event: StreamState<S>) -> Result<(), SinkClosed>;

    /// Signal end-of-stream. Further emits fail with [`SinkClosed`].
    fn close(&mut self);
}

/// [`StreamSink`] over a bounded tokio channel
#[derive(Debug)]
pub struct ChannelSink<S> {
    tx: Option<mpsc::Sender<StreamState<S>>>,
}

impl<S> ChannelSink<S> {
    pub fn new(tx: mpsc::Sender<StreamState<S>>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl<S> From<mpsc::Sender<StreamState<S>>> for ChannelSink<S> {
    fn from(tx: mpsc::Sender<StreamState<S>>) -> Self {
        Self::new(tx)
    }
}

#[async_trait]
impl<S: Send + 'static> StreamSink<S> for ChannelSink<S> {
    async fn emit(&mut self, event: StreamState<S>) -> Result<(), SinkClosed> {
        let tx = self.tx.as_ref().ok_or(SinkClosed)?;
        tx.send(event).await.map_err(|_| SinkClosed)
    }

    fn close(&mut self) {
        // dropping the last sender ends the receiver's stream
        self.tx = None;
    }
}

/// Receiving half handed to stream consumers
pub type StateStream<S> = ReceiverStream<StreamState<S>>;

/// Create a bounded channel suitable for [`ExecuteOptions::with_stream`]
///
/// A `buffer` of zero is raised to one.
///
/// [`ExecuteOptions::with_stream`]: crate::executor::ExecuteOptions::with_stream
pub fn stream_channel<S>(buffer: usize) -> (mpsc::Sender<StreamState<S>>, StateStream<S>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, ReceiverStream::new(rx))
}
