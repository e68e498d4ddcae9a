//! Error types for the subscription core.
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No subscriber set exists for the sensor
    SensorNotFound,
    /// The subscriber set exists but does not contain the subscription
    SubscriptionNotFound,
    /// The mailbox, fan-out loop or registry has been closed
    Closed,
    /// The mailbox already holds an undelivered value
    MailboxFull,
    /// A batching period of zero was requested
    InvalidPeriod,
    /// A transport write did not finish within the write timeout
    WriteTimeout,
    /// The underlying transport failed
    Transport,
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }

    pub fn with_source<E>(error_kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            source: Some(source.into()),
            error_kind,
        }
    }

    /// Combines several errors into one. The first error decides the kind and every error is
    /// kept as the source, so nothing is lost when a close error follows a write error.
    pub fn join(mut errors: Vec<Error>) -> Result<(), Error> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error {
                error_kind: errors[0].error_kind,
                source: Some(Box::new(Errors(errors))),
            }),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Subscription Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Subscription Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Error::new(error_kind)
    }
}

/// Several errors raised by one operation, in the order they happened.
#[derive(Debug)]
pub struct Errors(pub Vec<Error>);

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl StdError for Errors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_nothing_is_ok() {
        assert!(Error::join(Vec::new()).is_ok());
    }

    #[test]
    fn join_of_one_error_returns_it_unchanged() {
        let err = Error::join(vec![Error::new(ErrorKind::WriteTimeout)]).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::WriteTimeout);
        assert!(err.source.is_none());
    }

    #[test]
    fn join_keeps_every_error_as_source() {
        let err = Error::join(vec![
            Error::new(ErrorKind::Transport),
            Error::new(ErrorKind::Closed),
        ])
        .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Transport);
        let joined = err
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<Errors>())
            .expect("joined errors as source");
        assert_eq!(joined.0.len(), 2);
        assert_eq!(joined.0[1].error_kind, ErrorKind::Closed);
    }
}
