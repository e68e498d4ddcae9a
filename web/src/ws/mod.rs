//! Websocket transport for sensor event subscriptions.
//!
//! - `connection`: adapts the write half of an axum websocket to `subscription::Connection`
//! - `handler`: runs one subscriber from upgrade to unsubscribe

pub(crate) mod connection;
pub(crate) mod handler;
