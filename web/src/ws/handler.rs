use crate::ws::connection::WsConnection;
use crate::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use domain::{subscription as SubscriptionApi, Id};
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use log::*;
use std::sync::Arc;
use subscription::pipeline;
use tokio_util::sync::CancellationToken;

/// Streams a sensor's events to an upgraded websocket until either side goes away.
///
/// The subscription is always removed before returning, whatever ended the stream.
pub(crate) async fn stream_events(app_state: AppState, sensor_id: Id, socket: WebSocket) {
    let subscription =
        match SubscriptionApi::subscribe(&app_state.storage, &app_state.registry, sensor_id).await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("Cannot subscribe to sensor {sensor_id}: {e}");
                refuse(socket, close_code::AWAY, "subscriptions unavailable").await;
                return;
            }
        };
    let subscription_id = subscription.id;
    info!("Subscription {subscription_id} streaming events of sensor {sensor_id}");

    if let Err(e) = SubscriptionApi::welcome(&app_state.storage, &subscription).await {
        warn!("Unable to send welcome event to subscription {subscription_id}: {e}");
    }

    let settings = app_state.streaming_handler.settings();
    match pipeline::encode_and_batch(subscription.reader, settings.batch_period) {
        Ok(batches) => {
            let (sink, stream) = socket.split();
            let connection = Arc::new(WsConnection::new(sink));
            let cancel = CancellationToken::new();
            let peer = tokio::spawn(watch_peer(stream, cancel.clone()));

            match app_state
                .streaming_handler
                .handle_subscription(connection, cancel, batches)
                .await
            {
                Ok(()) => debug!("Subscription {subscription_id} finished"),
                Err(e) => warn!("Subscription {subscription_id} ended with error: {e}"),
            }

            peer.abort();
        }
        Err(e) => {
            error!("Cannot stream events of sensor {sensor_id}: {e}");
            refuse(socket, close_code::ERROR, "event stream unavailable").await;
        }
    }

    if let Err(e) =
        SubscriptionApi::unsubscribe(&app_state.registry, sensor_id, subscription_id).await
    {
        // Expected when the registry already shut down and dropped every subscription
        debug!("Unsubscribe of {subscription_id} from sensor {sensor_id} failed: {e}");
    }
}

async fn refuse(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to close refused websocket: {e}");
    }
}

/// Drains client messages so control frames are handled, and cancels `cancel` once the peer
/// closes the socket or the socket fails.
async fn watch_peer(mut stream: SplitStream<WebSocket>, cancel: CancellationToken) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(frame)) => {
                debug!("Peer closed websocket: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Websocket read failed: {e}");
                break;
            }
        }
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use crate::{router, test_support, AppState};
    use domain::{event as EventApi, event::ReportedEvent, events, sensor as SensorApi, sensors};
    use futures_util::StreamExt;
    use std::net::SocketAddr;
    use std::time::Duration;
    use subscription::connection::SHUTDOWN_REASON;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;

    const WAIT: Duration = Duration::from_secs(5);

    async fn serve(app_state: AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router::define_routes(app_state))
                .await
                .unwrap();
        });
        addr
    }

    async fn register_sensor(app_state: &AppState, serial_number: &str) -> sensors::Model {
        SensorApi::register(
            &app_state.storage,
            domain::sensor::NewSensor {
                serial_number: serial_number.to_string(),
                sensor_type: "cc".to_string(),
                description: String::new(),
                is_active: true,
            },
        )
        .await
        .unwrap()
    }

    async fn report(app_state: &AppState, serial_number: &str, payload: i64) -> events::Model {
        EventApi::receive(
            &app_state.storage,
            &app_state.registry,
            ReportedEvent {
                timestamp: Some(chrono::Utc::now()),
                sensor_serial_number: serial_number.to_string(),
                payload,
            },
        )
        .await
        .unwrap()
    }

    async fn wait_for_subscribers(app_state: &AppState, sensor_id: i64, expected: usize) {
        for _ in 0..500 {
            if app_state.registry.subscriber_count(sensor_id).await == expected
                && app_state.streaming_handler.open_connections().await == expected
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {expected} subscriber(s) on sensor {sensor_id}");
    }

    fn event_from(message: Message) -> events::Model {
        match message {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_welcome_then_live_events() {
        let app_state = test_support::app_state();
        let sensor = register_sensor(&app_state, "1234567890").await;
        let last = report(&app_state, "1234567890", 1).await;
        let addr = serve(app_state.clone()).await;

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/sensors/{}/events", sensor.id))
                .await
                .unwrap();
        wait_for_subscribers(&app_state, sensor.id, 1).await;

        let welcome = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(event_from(welcome), last);

        report(&app_state, "1234567890", 42).await;
        let live = event_from(timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap());
        assert_eq!(live.sensor_id, sensor.id);
        assert_eq!(live.payload, 42);
    }

    #[tokio::test]
    async fn closing_the_client_removes_the_subscription() {
        let app_state = test_support::app_state();
        let sensor = register_sensor(&app_state, "2222222222").await;
        let addr = serve(app_state.clone()).await;

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/sensors/{}/events", sensor.id))
                .await
                .unwrap();
        wait_for_subscribers(&app_state, sensor.id, 1).await;

        client.close(None).await.unwrap();

        wait_for_subscribers(&app_state, sensor.id, 0).await;
    }

    #[tokio::test]
    async fn shutdown_sends_close_frame_to_subscribers() {
        let app_state = test_support::app_state();
        let sensor = register_sensor(&app_state, "3333333333").await;
        let addr = serve(app_state.clone()).await;

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/sensors/{}/events", sensor.id))
                .await
                .unwrap();
        wait_for_subscribers(&app_state, sensor.id, 1).await;

        app_state.streaming_handler.shutdown().await.unwrap();
        app_state.registry.shutdown().await;

        match timeout(WAIT, client.next()).await.unwrap() {
            Some(Ok(Message::Close(Some(frame)))) => assert_eq!(&*frame.reason, SHUTDOWN_REASON),
            other => panic!("expected a close frame, got {other:?}"),
        }
        assert_eq!(app_state.streaming_handler.open_connections().await, 0);
    }

    #[tokio::test]
    async fn unknown_sensor_is_refused_before_upgrade() {
        let app_state = test_support::app_state();
        let addr = serve(app_state).await;

        let result = tokio_tungstenite::connect_async(format!("ws://{addr}/sensors/77/events")).await;

        match result {
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 404)
            }
            other => panic!("expected an HTTP 404, got {other:?}"),
        }
    }
}
