//! Single-slot mailboxes connecting the fan-out loop to one subscriber.
//!
//! A mailbox is one bounded channel seen through two restricted views: the reader can only
//! drain it and the writer can only push into it. The strong sender lives in the registry, so
//! removing a subscription from its sensor's set is what closes the mailbox.

use crate::error::{Error, ErrorKind};
use tokio::sync::mpsc;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Number of undelivered values a mailbox holds before the fan-out loop has to wait.
pub const MAILBOX_CAPACITY: usize = 1;

pub(crate) fn mailbox<T>() -> (mpsc::Sender<T>, MailboxWriter<T>, MailboxReader<T>) {
    let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
    let writer = MailboxWriter {
        sender: sender.downgrade(),
    };
    (sender, writer, MailboxReader { receiver })
}

/// Read-only end of a subscriber's mailbox.
#[derive(Debug)]
pub struct MailboxReader<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> MailboxReader<T> {
    /// Waits for the next value. `None` means the subscription was removed or the registry shut down.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Write-only end of a subscriber's mailbox, used to hand a subscriber its welcome value.
#[derive(Debug)]
pub struct MailboxWriter<T> {
    sender: mpsc::WeakSender<T>,
}

impl<T> MailboxWriter<T> {
    /// Places `value` in the mailbox without waiting.
    ///
    /// Fails with `MailboxFull` when a live value is already waiting to be read and with
    /// `Closed` once the subscription has been removed.
    pub fn try_deliver(&self, value: T) -> Result<(), Error> {
        let sender = self
            .sender
            .upgrade()
            .ok_or_else(|| Error::new(ErrorKind::Closed))?;

        sender.try_send(value).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::new(ErrorKind::MailboxFull),
            mpsc::error::TrySendError::Closed(_) => Error::new(ErrorKind::Closed),
        })
    }
}

impl<T> Clone for MailboxWriter<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_delivers_to_reader() {
        let (_sender, writer, mut reader) = mailbox::<u32>();

        writer.try_deliver(7).unwrap();

        assert_eq!(reader.recv().await, Some(7));
    }

    #[tokio::test]
    async fn second_undelivered_value_is_rejected() {
        let (_sender, writer, mut reader) = mailbox::<u32>();

        writer.try_deliver(1).unwrap();
        let err = writer.try_deliver(2).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::MailboxFull);
        assert_eq!(reader.recv().await, Some(1));
    }

    #[tokio::test]
    async fn dropping_the_strong_sender_closes_the_mailbox() {
        let (sender, writer, mut reader) = mailbox::<u32>();

        drop(sender);

        assert_eq!(reader.recv().await, None);
        assert_eq!(
            writer.try_deliver(3).unwrap_err().error_kind,
            ErrorKind::Closed
        );
    }
}
