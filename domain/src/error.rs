//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError, Record};
use std::error::Error as StdError;
use std::fmt;
use subscription::{Error as SubscriptionError, ErrorKind as SubscriptionErrorKind};

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field holds the original error so callers can still
/// inspect it. `web` maps the `error_kind` tree to HTTP status codes and never depends
/// on `entity_api` or `subscription` errors directly.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    /// The subscription core has shut down or refused the operation
    Subscription,
    Other(String),
}

/// Errors about the records a request refers to, whether they come from storage or from
/// validation in this layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound(Resource),
    Invalid(Violation),
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Sensor,
    Event,
    User,
    Subscription,
}

/// Which part of the input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    EventTimestamp,
    SensorSerialNumber,
    SensorType,
    UserName,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// Writing to or closing a subscriber's connection failed
    Transport,
}

impl Error {
    pub fn not_found(resource: Resource) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::NotFound(resource),
            )),
        }
    }

    pub fn invalid(violation: Violation) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Invalid(violation),
            )),
        }
    }

    pub fn is_not_found(&self, resource: Resource) -> bool {
        self.error_kind
            == DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound(
                resource,
            )))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound(record) => EntityErrorKind::NotFound(match record {
                Record::Sensor => Resource::Sensor,
                Record::Event => Resource::Event,
                Record::User => Resource::User,
            }),
            EntityApiErrorKind::SystemError => EntityErrorKind::Other("SystemError".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

// And here from the subscription core.
impl From<SubscriptionError> for Error {
    fn from(err: SubscriptionError) -> Self {
        let error_kind = match err.error_kind {
            SubscriptionErrorKind::SensorNotFound => DomainErrorKind::Internal(
                InternalErrorKind::Entity(EntityErrorKind::NotFound(Resource::Sensor)),
            ),
            SubscriptionErrorKind::SubscriptionNotFound => DomainErrorKind::Internal(
                InternalErrorKind::Entity(EntityErrorKind::NotFound(Resource::Subscription)),
            ),
            SubscriptionErrorKind::WriteTimeout | SubscriptionErrorKind::Transport => {
                DomainErrorKind::External(ExternalErrorKind::Transport)
            }
            SubscriptionErrorKind::Closed | SubscriptionErrorKind::MailboxFull => {
                DomainErrorKind::Internal(InternalErrorKind::Subscription)
            }
            SubscriptionErrorKind::InvalidPeriod => {
                DomainErrorKind::Internal(InternalErrorKind::Other("InvalidPeriod".to_string()))
            }
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
