//! Per-sensor publish/subscribe core for streaming sensor events to connected clients.
//!
//! # Architecture
//!
//! - **Mailboxes**: every subscription owns a single-slot mailbox. The registry keeps the only
//!   strong sender, so removing a subscription is what closes its mailbox.
//! - **Sharded registry**: subscriber sets are keyed by sensor, each behind its own lock.
//!   Activity on one sensor never waits on another.
//! - **Fan-out loops**: one task per broadcasting sensor copies each value into every mailbox
//!   of that sensor, waiting on any mailbox that is still full.
//! - **Pipeline**: a subscriber's mailbox is encoded to JSON and grouped into timed batches by a
//!   chain of tasks that stops from the consumer end.
//! - **Streaming handler**: writes batches to a [`connection::Connection`] with a bounded write
//!   time and closes every tracked connection on shutdown.
//!
//! # Message Flow
//!
//! 1. A client asks to follow a sensor; `Registry::subscribe` returns its `Subscription`
//! 2. The subscription's reader is fed through `pipeline::encode_and_batch`
//! 3. `StreamingHandler::handle_subscription` writes each batch to the connection
//! 4. A producer obtains `Registry::broadcast_handle` for the sensor and sends an event
//! 5. The sensor's fan-out loop delivers the event to every mailbox
//! 6. When the connection ends the caller runs `Registry::unsubscribe`, closing the mailbox
//!
//! # Modules
//!
//! - `connection`: `Connection` transport trait, `StreamingHandler` and its settings
//! - `error`: error type shared by the whole crate
//! - `mailbox`: read and write views of a subscriber's mailbox
//! - `pipeline`: encode and batch stages
//! - `registry`: `Registry`, `Subscription` and `BroadcastHandle`

pub mod connection;
pub mod error;
pub mod mailbox;
pub mod pipeline;
pub mod registry;

pub use connection::{Connection, StreamSettings, StreamingHandler};
pub use error::{Error, ErrorKind};
pub use registry::{BroadcastHandle, Registry, Subscription, SubscriptionId};

/// Identifier of the sensor a subscription follows.
pub type SensorId = i64;
