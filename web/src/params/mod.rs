//! This module holds typed parameters for various endpoint inputs.
//!
//! Request bodies and query strings are deserialized into these types before anything reaches
//! the `domain` layer, so malformed input is rejected by the extractor itself.

pub(crate) mod event;
pub(crate) mod sensor;
pub(crate) mod user;
