use crate::error::{Error, ErrorKind};
use crate::mailbox::{mailbox, MailboxReader, MailboxWriter};
use crate::SensorId;
use dashmap::DashMap;
use log::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Number of values a producer can hand to a sensor's fan-out loop before it has to wait.
pub const FAN_OUT_CAPACITY: usize = 16;

/// Unique identifier for a subscription (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(uuid::Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber's registration for one sensor, together with both views of its mailbox.
#[derive(Debug)]
pub struct Subscription<T> {
    pub id: SubscriptionId,
    pub sensor_id: SensorId,
    pub reader: MailboxReader<T>,
    pub writer: MailboxWriter<T>,
}

/// Write-only handle into the fan-out loop of one sensor.
#[derive(Debug)]
pub struct BroadcastHandle<T> {
    inbound: mpsc::Sender<T>,
}

impl<T> BroadcastHandle<T> {
    /// Queues `value` for delivery to every current subscriber of the sensor.
    pub async fn send(&self, value: T) -> Result<(), Error> {
        self.inbound
            .send(value)
            .await
            .map_err(|_| Error::new(ErrorKind::Closed))
    }
}

impl<T> Clone for BroadcastHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inbound: self.inbound.clone(),
        }
    }
}

struct FanOut<T> {
    inbound: mpsc::Sender<T>,
    task: JoinHandle<()>,
}

/// All subscriptions of one sensor plus its lazily started fan-out loop.
struct SubscriberSet<T> {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::Sender<T>>>,
    fan_out: Mutex<Option<FanOut<T>>>,
}

impl<T> SubscriberSet<T> {
    fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            fan_out: Mutex::new(None),
        }
    }
}

impl<T: Clone + Send + 'static> SubscriberSet<T> {
    /// Writes `value` to every subscriber while holding the set's lock, so no subscription can
    /// be removed halfway through a broadcast. Each write waits for that subscriber's mailbox to
    /// have room: one slow subscriber holds back delivery to the whole sensor.
    async fn deliver(&self, sensor_id: SensorId, value: T) {
        let subscribers = self.subscribers.lock().await;
        for (subscription_id, mailbox) in subscribers.iter() {
            if mailbox.send(value.clone()).await.is_err() {
                // Reader already gone; the owning connection will unsubscribe it
                debug!("Skipping subscription {subscription_id} of sensor {sensor_id}: reader dropped");
            }
        }
    }
}

/// Per-sensor subscriber sets with one fan-out task per sensor that broadcasts.
///
/// Subscriber sets are sharded per sensor: subscribing, unsubscribing and broadcasting on one
/// sensor never contends with another sensor.
pub struct Registry<T> {
    sensors: DashMap<SensorId, Arc<SubscriberSet<T>>>,
    shutdown_token: CancellationToken,
}

impl<T: Clone + Send + 'static> Registry<T> {
    pub fn new() -> Self {
        Self {
            sensors: DashMap::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Adds a new subscription to the sensor's set, creating the set on first use.
    ///
    /// The registry does not know which sensors exist; callers validate the sensor first.
    pub async fn subscribe(&self, sensor_id: SensorId) -> Result<Subscription<T>, Error> {
        let set = self
            .sensors
            .entry(sensor_id)
            .or_insert_with(|| Arc::new(SubscriberSet::new()))
            .value()
            .clone();

        let mut subscribers = set.subscribers.lock().await;
        if self.shutdown_token.is_cancelled() {
            return Err(Error::new(ErrorKind::Closed));
        }

        let id = SubscriptionId::new();
        let (sender, writer, reader) = mailbox();
        subscribers.insert(id, sender);

        debug!(
            "Subscription {id} added to sensor {sensor_id} ({} subscriber(s))",
            subscribers.len()
        );

        Ok(Subscription {
            id,
            sensor_id,
            reader,
            writer,
        })
    }

    /// Removes a subscription and closes its mailbox.
    ///
    /// Fails with `SensorNotFound` when the sensor never had a subscriber and with
    /// `SubscriptionNotFound` when the subscription is not (or no longer) in the set.
    pub async fn unsubscribe(
        &self,
        sensor_id: SensorId,
        subscription_id: SubscriptionId,
    ) -> Result<(), Error> {
        let set = self.subscriber_set(sensor_id)?;

        let mut subscribers = set.subscribers.lock().await;
        match subscribers.remove(&subscription_id) {
            Some(mailbox) => {
                // Closed while the set is still locked, so no broadcast can reach it afterwards
                drop(mailbox);
                debug!(
                    "Subscription {subscription_id} removed from sensor {sensor_id} ({} left)",
                    subscribers.len()
                );
                Ok(())
            }
            None => Err(Error::new(ErrorKind::SubscriptionNotFound)),
        }
    }

    /// Returns the handle feeding the sensor's fan-out loop, starting the loop on first use.
    ///
    /// Fails with `SensorNotFound` when no subscriber set exists for the sensor, even though a
    /// set that has become empty is still accepted.
    pub async fn broadcast_handle(&self, sensor_id: SensorId) -> Result<BroadcastHandle<T>, Error> {
        let set = self.subscriber_set(sensor_id)?;

        let mut fan_out = set.fan_out.lock().await;
        if self.shutdown_token.is_cancelled() {
            return Err(Error::new(ErrorKind::Closed));
        }

        let inbound = match fan_out.as_ref() {
            Some(running) => running.inbound.clone(),
            None => {
                let (inbound, receiver) = mpsc::channel(FAN_OUT_CAPACITY);
                let task = tokio::spawn(run_fan_out(
                    sensor_id,
                    Arc::clone(&set),
                    receiver,
                    self.shutdown_token.clone(),
                ));
                info!("Started fan-out loop for sensor {sensor_id}");

                *fan_out = Some(FanOut {
                    inbound: inbound.clone(),
                    task,
                });
                inbound
            }
        };

        Ok(BroadcastHandle { inbound })
    }

    pub async fn subscriber_count(&self, sensor_id: SensorId) -> usize {
        match self.subscriber_set(sensor_id) {
            Ok(set) => set.subscribers.lock().await.len(),
            Err(_) => 0,
        }
    }

    /// Stops every fan-out loop and closes every remaining mailbox. Later calls to `subscribe`
    /// and `broadcast_handle` fail with `Closed`.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let sets: Vec<(SensorId, Arc<SubscriberSet<T>>)> = self
            .sensors
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        info!("Shutting down subscription registry ({} sensor(s))", sets.len());

        for (sensor_id, set) in sets {
            if let Some(fan_out) = set.fan_out.lock().await.take() {
                drop(fan_out.inbound);
                if let Err(e) = fan_out.task.await {
                    warn!("Fan-out loop for sensor {sensor_id} ended abnormally: {e}");
                }
            }

            // Dropping the senders closes every mailbox that is still open
            set.subscribers.lock().await.clear();
        }
    }

    fn subscriber_set(&self, sensor_id: SensorId) -> Result<Arc<SubscriberSet<T>>, Error> {
        self.sensors
            .get(&sensor_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::new(ErrorKind::SensorNotFound))
    }
}

impl<T: Clone + Send + 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Registry<T> {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

async fn run_fan_out<T: Clone + Send + 'static>(
    sensor_id: SensorId,
    set: Arc<SubscriberSet<T>>,
    mut inbound: mpsc::Receiver<T>,
    shutdown_token: CancellationToken,
) {
    loop {
        let value = tokio::select! {
            biased;
            _ = shutdown_token.cancelled() => break,
            value = inbound.recv() => match value {
                Some(value) => value,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = shutdown_token.cancelled() => break,
            _ = set.deliver(sensor_id, value) => {}
        }
    }

    debug!("Fan-out loop for sensor {sensor_id} stopped");
}
