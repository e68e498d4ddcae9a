//! Transforms between a subscriber's mailbox and its streaming connection.
//!
//! Each stage runs as its own task and owns the sending half of its output channel. A stage
//! stops as soon as its output receiver is dropped, which drops its input in turn: tearing down
//! the consumer at the end of the chain tears down every stage behind it.

use crate::error::{Error, ErrorKind};
use crate::mailbox::MailboxReader;
use log::*;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Capacity of the channel between two stages.
pub const STAGE_CAPACITY: usize = 1;

/// Serializes every value read from the mailbox to JSON text.
///
/// Stops at the first value that fails to serialize; the output then closes like any other
/// end of stream.
pub fn encode<T>(mut reader: MailboxReader<T>) -> mpsc::Receiver<String>
where
    T: Serialize + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tokio::spawn(async move {
        loop {
            let value = tokio::select! {
                _ = tx.closed() => break,
                value = reader.recv() => match value {
                    Some(value) => value,
                    None => break,
                },
            };

            let encoded = match serde_json::to_string(&value) {
                Ok(encoded) => encoded,
                Err(e) => {
                    error!("Unable to encode value for subscriber stream: {e}");
                    break;
                }
            };

            if tx.send(encoded).await.is_err() {
                break;
            }
        }
        trace!("Encode stage stopped");
    });

    rx
}

/// Groups values arriving on `input` and emits the group accumulated since the previous tick
/// once every `period`. Empty groups are never emitted. When `input` closes, whatever is still
/// buffered is emitted before the output closes.
///
/// Fails with `InvalidPeriod` when `period` is zero; no task is started in that case.
pub fn batch<T>(
    mut input: mpsc::Receiver<T>,
    period: Duration,
) -> Result<mpsc::Receiver<Vec<T>>, Error>
where
    T: Send + 'static,
{
    if period.is_zero() {
        return Err(Error::new(ErrorKind::InvalidPeriod));
    }

    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buffer = Vec::new();

        loop {
            tokio::select! {
                _ = tx.closed() => return,
                value = input.recv() => match value {
                    Some(value) => buffer.push(value),
                    None => break,
                },
                _ = ticker.tick() => {
                    if !buffer.is_empty() && tx.send(std::mem::take(&mut buffer)).await.is_err() {
                        return;
                    }
                }
            }
        }

        if !buffer.is_empty() {
            // Receiver may already be gone; there is nobody left to report to
            let _ = tx.send(buffer).await;
        }
        trace!("Batch stage stopped");
    });

    Ok(rx)
}

/// The full stream a subscriber connection consumes: JSON text grouped per `period`.
pub fn encode_and_batch<T>(
    reader: MailboxReader<T>,
    period: Duration,
) -> Result<mpsc::Receiver<Vec<String>>, Error>
where
    T: Serialize + Send + 'static,
{
    if period.is_zero() {
        return Err(Error::new(ErrorKind::InvalidPeriod));
    }

    batch(encode(reader), period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::mailbox;
    use serde::ser::Error as _;
    use serde::Serializer;
    use tokio::time::timeout;

    const PERIOD: Duration = Duration::from_millis(500);

    #[derive(Serialize)]
    struct Reading {
        sensor_id: i64,
        payload: i64,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("value cannot be encoded"))
        }
    }

    #[tokio::test]
    async fn encode_writes_json_text() {
        let (sender, _writer, reader) = mailbox();
        let mut encoded = encode(reader);

        sender
            .send(Reading {
                sensor_id: 1,
                payload: 42,
            })
            .await
            .unwrap();

        assert_eq!(
            encoded.recv().await,
            Some(r#"{"sensor_id":1,"payload":42}"#.to_string())
        );
    }

    #[tokio::test]
    async fn encode_stops_at_first_failure() {
        let (sender, _writer, reader) = mailbox();
        let mut encoded = encode(reader);

        sender.send(Unencodable).await.unwrap();

        // The stage gives up even though the mailbox is still open
        assert_eq!(encoded.recv().await, None);
        timeout(Duration::from_secs(5), sender.closed())
            .await
            .expect("encode stage drops its mailbox reader");
    }

    #[tokio::test(start_paused = true)]
    async fn batch_groups_values_arriving_within_one_period() {
        let (input, rx) = mpsc::channel(STAGE_CAPACITY);
        let mut batches = batch(rx, PERIOD).unwrap();
        let start = Instant::now();

        for value in 0..3 {
            input.send(value).await.unwrap();
        }

        assert_eq!(batches.recv().await, Some(vec![0, 1, 2]));
        assert!(start.elapsed() >= PERIOD);

        input.send(3).await.unwrap();
        assert_eq!(batches.recv().await, Some(vec![3]));
        assert!(start.elapsed() >= PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_preserves_order_and_delivers_each_value_once() {
        let (input, rx) = mpsc::channel(STAGE_CAPACITY);
        let mut batches = batch(rx, PERIOD).unwrap();

        let producer = tokio::spawn(async move {
            for value in 0..50 {
                input.send(value).await.unwrap();
                tokio::time::sleep(Duration::from_millis(35)).await;
            }
        });

        let mut received = Vec::new();
        while let Some(group) = batches.recv().await {
            assert!(!group.is_empty());
            received.extend(group);
        }
        producer.await.unwrap();

        assert_eq!(received, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_flushes_buffer_when_input_closes() {
        let (input, rx) = mpsc::channel(STAGE_CAPACITY);
        let mut batches = batch(rx, PERIOD).unwrap();
        let start = Instant::now();

        input.send("a").await.unwrap();
        input.send("b").await.unwrap();
        drop(input);

        assert_eq!(batches.recv().await, Some(vec!["a", "b"]));
        assert!(start.elapsed() < PERIOD);
        assert_eq!(batches.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn encode_and_batch_streams_mailbox_contents() {
        let (sender, _writer, reader) = mailbox();
        let mut batches = encode_and_batch(reader, PERIOD).unwrap();

        for payload in 0..3 {
            sender
                .send(Reading {
                    sensor_id: 7,
                    payload,
                })
                .await
                .unwrap();
        }
        drop(sender);

        let mut received = Vec::new();
        while let Some(group) = batches.recv().await {
            received.extend(group);
        }

        assert_eq!(
            received,
            vec![
                r#"{"sensor_id":7,"payload":0}"#.to_string(),
                r#"{"sensor_id":7,"payload":1}"#.to_string(),
                r#"{"sensor_id":7,"payload":2}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn dropping_the_output_tears_down_every_stage() {
        let (sender, _writer, reader) = mailbox::<i64>();
        let batches = encode_and_batch(reader, PERIOD).unwrap();

        drop(batches);

        timeout(Duration::from_secs(5), sender.closed())
            .await
            .expect("mailbox reader dropped after the pipeline stopped");
    }

    #[tokio::test]
    async fn batch_refuses_a_zero_period() {
        let (input, rx) = mpsc::channel::<i64>(STAGE_CAPACITY);

        let err = batch(rx, Duration::ZERO).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::InvalidPeriod);
        // Nothing is left reading the input
        assert!(input.is_closed());
    }

    #[tokio::test]
    async fn encode_and_batch_refuses_a_zero_period() {
        let (sender, _writer, reader) = mailbox::<i64>();

        let err = encode_and_batch(reader, Duration::ZERO).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::InvalidPeriod);
        timeout(Duration::from_secs(5), sender.closed())
            .await
            .expect("mailbox reader dropped when the pipeline was refused");
    }
}
