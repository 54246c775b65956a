//! Hub log access: backlog fetch and live streaming.
//!
//! `log.subscribe` makes the hub push `{"event": {"log": {"log": [...]}}}`
//! frames over the session; those arrive on the client's event broadcast
//! channel and are decoded here.

use serde::Deserialize;
use serde_json::json;
use sprut_rpc::{EventFrame, RpcClient};
use sprut_types::LogEntry;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::response::ApiResponse;

/// Log operations. Borrow one from [`crate::Sprut::logs`].
pub struct Logs<'a> {
    pub(crate) client: &'a RpcClient,
}

#[derive(Debug, Deserialize)]
struct SubscribeAck {
    uuid: String,
}

impl Logs<'_> {
    /// Fetch the most recent `count` log entries.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn recent(&self, count: u32) -> Result<Vec<LogEntry>> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"log": {"list": {"count": count}}}), None)
            .await?;
        ApiResponse::from_response(response, &["log", "list", "log"])?.into_data("log entries")
    }

    /// Start the live log stream; returns the subscription id needed to
    /// stop it. Frames arrive via [`Logs::events`].
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn subscribe(&self) -> Result<String> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"log": {"subscribe": {}}}), None)
            .await?;
        let ack: SubscribeAck = ApiResponse::from_response(response, &["log", "subscribe"])?
            .into_data("subscription uuid")?;
        Ok(ack.uuid)
    }

    /// Stop a live log stream started with [`Logs::subscribe`].
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn unsubscribe(&self, uuid: &str) -> Result<()> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"log": {"unsubscribe": {"uuid": uuid}}}), None)
            .await?;
        ApiResponse::<serde_json::Value>::from_response(response, &[])?.into_ack()
    }

    /// Receiver for the session's unsolicited frames. Filter with
    /// [`decode_log_event`].
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<EventFrame> {
        self.client.subscribe_events()
    }
}

/// Extract log entries from an unsolicited frame, or `None` when the frame
/// is not a log event.
#[must_use]
pub fn decode_log_event(frame: &EventFrame) -> Option<Vec<LogEntry>> {
    let entries = frame.event.get("log")?.get("log")?;
    serde_json::from_value(entries.clone()).ok()
}
