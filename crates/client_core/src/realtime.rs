//! Websocket side of the backend: one Phoenix channel per subscription.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::protocol::{ChangeFilter, PhoenixFrame, RealtimeMessage, HEARTBEAT_TOPIC};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    backend::Subscription,
    error::{BackendError, BackendResult},
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const PROTOCOL_VERSION: &str = "1.0.0";

/// Derives the realtime endpoint from the HTTP base URL.
pub fn websocket_url(base_url: &str, api_key: &str) -> BackendResult<String> {
    let ws_base = if base_url.starts_with("https://") {
        base_url.replacen("https://", "wss://", 1)
    } else if base_url.starts_with("http://") {
        base_url.replacen("http://", "ws://", 1)
    } else {
        return Err(BackendError::Realtime(
            "backend_url must start with http:// or https://".to_string(),
        ));
    };

    let mut url = Url::parse(&format!(
        "{}/realtime/v1/websocket",
        ws_base.trim_end_matches('/')
    ))
    .map_err(|err| BackendError::Realtime(format!("invalid realtime url: {err}")))?;
    url.query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url.to_string())
}

/// Connects, joins `topic` and forwards matching change notifications until
/// the returned subscription is dropped or the server closes the channel.
pub async fn subscribe(
    ws_url: &str,
    topic: String,
    filter: ChangeFilter,
    access_token: Option<String>,
) -> BackendResult<Subscription> {
    let (ws_stream, _) = connect_async(ws_url)
        .await
        .map_err(|err| BackendError::Realtime(format!("failed to connect websocket: {err}")))?;
    let (mut writer, mut reader) = ws_stream.split();

    let join = PhoenixFrame::join(&topic, &filter, access_token.as_deref(), 1);
    writer
        .send(Message::Text(serde_json::to_string(&join)?))
        .await
        .map_err(|err| BackendError::Realtime(format!("failed to join {topic}: {err}")))?;
    info!(topic = %topic, table = %filter.table, "realtime: joined channel");

    let (tx, rx) = mpsc::unbounded_channel();
    let task_topic = topic.clone();
    let task_filter = filter.clone();
    let task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let frame = PhoenixFrame::heartbeat(next_ref);
                    next_ref += 1;
                    let Ok(text) = serde_json::to_string(&frame) else {
                        continue;
                    };
                    if let Err(err) = writer.send(Message::Text(text)).await {
                        warn!(topic = %task_topic, "realtime: heartbeat failed: {err}");
                        break;
                    }
                }
                _ = tx.closed() => {
                    if let Ok(text) = serde_json::to_string(&PhoenixFrame::leave(&task_topic, next_ref)) {
                        let _ = writer.send(Message::Text(text)).await;
                    }
                    break;
                }
                msg = reader.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = match serde_json::from_str::<PhoenixFrame>(&text) {
                            Ok(frame) => frame,
                            Err(err) => {
                                warn!(topic = %task_topic, "realtime: invalid frame: {err}");
                                continue;
                            }
                        };
                        if frame.topic != task_topic && frame.topic != HEARTBEAT_TOPIC {
                            continue;
                        }
                        match RealtimeMessage::classify(&frame) {
                            RealtimeMessage::Change(change) => {
                                if !task_filter.matches(&change) {
                                    continue;
                                }
                                if tx.send(change).is_err() {
                                    break;
                                }
                            }
                            RealtimeMessage::Reply { status, response } => {
                                if status != "ok" {
                                    warn!(topic = %task_topic, %response, "realtime: request rejected: {status}");
                                }
                            }
                            RealtimeMessage::Closed => break,
                            RealtimeMessage::Error(reason) => {
                                warn!(topic = %task_topic, "realtime: channel error: {reason}");
                            }
                            RealtimeMessage::Other => {
                                debug!(topic = %task_topic, event = %frame.event, "realtime: ignored frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(topic = %task_topic, "realtime: websocket receive failed: {err}");
                        break;
                    }
                }
            }
        }
        info!(topic = %task_topic, "realtime: channel closed");
    });

    Ok(Subscription::new(topic, filter, rx, Some(task)))
}
