//! RPC facade over the hub session.
//!
//! [`RpcClient`] is the single entry point the higher-level managers use:
//! it generates correlation ids, builds envelopes, pairs requests with
//! responses through the [`ResponseQueue`], drives the login flow, and
//! transparently refreshes a stale token with at most one retry per call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info};
use url::Url;

use crate::auth::{AuthFlow, AuthSession, Credentials};
use crate::connection::{ConnectionHandlers, ConnectionManager, ConnectionOptions};
use crate::error::{Error, Result};
use crate::protocol::{Envelope, EventFrame, Frame, Response};
use crate::queue::ResponseQueue;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Connection settings for one hub.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://spruthub.local:55080/spruthub`.
    pub ws_url: String,
    /// Account email, answered to the first login challenge.
    pub email: String,
    /// Account password, answered to the second login challenge.
    pub password: String,
    /// Serial of the target hub, stamped into every envelope.
    pub serial: String,
    /// Timeout applied to calls that do not specify their own.
    pub default_timeout: Duration,
    /// Delay before reconnecting after an unexpected connection loss.
    pub reconnect_delay: Duration,
    /// Grace period for `close()` before cleanup is forced.
    pub close_grace: Duration,
}

impl ClientConfig {
    pub fn new(
        ws_url: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        serial: impl Into<String>,
    ) -> Self {
        let options = ConnectionOptions::default();
        Self {
            ws_url: ws_url.into(),
            email: email.into(),
            password: password.into(),
            serial: serial.into(),
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: options.reconnect_delay,
            close_grace: options.close_grace,
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ws_url.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.serial.is_empty()
        {
            return Err(Error::Config(
                "ws_url, email, password and serial must all be set".to_string(),
            ));
        }
        let url =
            Url::parse(&self.ws_url).map_err(|e| Error::Config(format!("invalid ws_url: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "ws_url must use the ws or wss scheme, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}

struct ClientInner {
    conn: ConnectionManager,
    queue: ResponseQueue,
    auth: Arc<AuthSession>,
    serial: String,
    next_id: AtomicU64,
    default_timeout: Duration,
    events: broadcast::Sender<EventFrame>,
}

/// Client for one hub's JSON-RPC-over-WebSocket API.
///
/// Cheap to clone; clones share the connection, the pending-request table,
/// and the session token.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

impl RpcClient {
    /// Validate the configuration and start connecting in the background.
    ///
    /// The connection is established asynchronously; use
    /// [`RpcClient::connected`] to wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required field is missing or the URL
    /// is not a WebSocket URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let queue = ResponseQueue::new();
        let (events, _) = broadcast::channel(256);
        let auth = Arc::new(AuthSession::new(Credentials {
            email: config.email,
            password: config.password,
        }));

        let handlers = {
            let queue = queue.clone();
            let events = events.clone();
            let auth = Arc::clone(&auth);
            ConnectionHandlers {
                on_open: Box::new(|| info!("hub session transport open")),
                on_message: Box::new(move |text| dispatch_frame(text, &queue, &events)),
                // The hub invalidates sessions on disconnect; drop the token
                // so the next call re-authenticates instead of failing.
                on_close: Box::new(move || auth.clear_token()),
                on_error: Box::new(|e| error!("websocket error: {e}")),
            }
        };

        let conn = ConnectionManager::new(
            config.ws_url,
            handlers,
            ConnectionOptions {
                reconnect_delay: config.reconnect_delay,
                close_grace: config.close_grace,
            },
        );
        conn.connect();

        Ok(Self {
            inner: Arc::new(ClientInner {
                conn,
                queue,
                auth,
                serial: config.serial,
                next_id: AtomicU64::new(1),
                default_timeout: config.default_timeout,
                events,
            }),
        })
    }

    /// Issue one request and await its response.
    ///
    /// `params` is the nested domain/action object, e.g.
    /// `{"room": {"list": {}}}`. A response carrying the hub's stale-token
    /// error code triggers one token refresh and one transparent retry; the
    /// retry's outcome — whatever it is — goes to the caller. Hub-level
    /// error payloads other than stale-token are returned as-is, not mapped
    /// to [`Error`].
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotOpen`] when the connection is down (calls are
    /// never buffered), [`Error::RequestTimeout`] when no response arrives in
    /// time, and auth errors when a stale-token refresh fails.
    pub async fn call(&self, params: Value, timeout: Option<Duration>) -> Result<Response> {
        let timeout = timeout.unwrap_or(self.inner.default_timeout);
        // Hard cap of one retry: a persistently rejected token must not loop.
        let mut retries_left = 1_u8;
        loop {
            let response = self.dispatch(&params, timeout).await?;
            if response.is_stale_token() && retries_left > 0 {
                retries_left -= 1;
                info!("hub rejected token as stale, re-authenticating");
                self.refresh_token().await?;
                continue;
            }
            return Ok(response);
        }
    }

    /// Fail fast when disconnected, then make sure the session is logged in.
    ///
    /// Every higher-level operation calls this before issuing domain
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when the transport is down, or the
    /// login-flow error when authentication fails.
    pub async fn ensure_connection_and_authentication(&self) -> Result<()> {
        if !self.inner.conn.is_open() {
            return Err(Error::NotConnected);
        }
        self.ensure_authenticated().await
    }

    /// Log in unless a token is already held.
    ///
    /// # Errors
    ///
    /// Propagates login-flow failures; see [`AuthFlow::advance`].
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.inner.auth.is_authenticated() {
            return Ok(());
        }
        let _guard = self.inner.auth.begin_flow().await;
        // Another task may have finished the flow while we waited.
        if self.inner.auth.is_authenticated() {
            return Ok(());
        }
        self.run_auth_flow().await
    }

    /// Drop the held token and run the full login flow again.
    ///
    /// Concurrent refreshes coalesce: whoever waits on the flow lock and
    /// finds a token from a newer login simply adopts it.
    ///
    /// # Errors
    ///
    /// Propagates login-flow failures.
    pub async fn refresh_token(&self) -> Result<()> {
        let generation = self.inner.auth.generation();
        let _guard = self.inner.auth.begin_flow().await;
        if self.inner.auth.generation() != generation && self.inner.auth.is_authenticated() {
            return Ok(());
        }
        self.inner.auth.clear_token();
        self.run_auth_flow().await
    }

    /// Drive the 3-step login state machine over the ordinary call channel.
    /// Caller must hold the flow lock.
    async fn run_auth_flow(&self) -> Result<()> {
        let mut flow = AuthFlow::Begin;
        while let Some(request) = flow.request(self.inner.auth.credentials()) {
            let response = self.dispatch(&request, self.inner.default_timeout).await?;
            flow = flow.advance(&response)?;
        }
        match flow {
            AuthFlow::Authenticated(token) => {
                self.inner.auth.set_token(token);
                info!("authenticated with hub");
                Ok(())
            }
            _ => Err(Error::AuthenticationFailed),
        }
    }

    /// Send one envelope and register it with the pending-request table.
    ///
    /// The entry is registered before the write so a fast response cannot
    /// race the registration, and removed again if the write fails.
    async fn dispatch(&self, params: &Value, timeout: Duration) -> Result<Response> {
        let inner = &self.inner;
        if !inner.conn.is_open() {
            return Err(Error::NotOpen);
        }

        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope::new(id, inner.auth.token(), inner.serial.clone(), params.clone());
        let frame = serde_json::to_string(&envelope)?;

        let (tx, rx) = oneshot::channel();
        inner.queue.add(id, tx, timeout);
        if let Err(e) = inner.conn.send(frame).await {
            inner.queue.remove(id);
            return Err(e);
        }

        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Whether a session token is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    /// Whether the transport is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.conn.is_open()
    }

    /// Wait until the connection reaches the open state.
    pub async fn connected(&self) {
        self.inner.conn.connected().await;
    }

    /// Subscribe to unsolicited frames pushed by the hub (log stream,
    /// state-change notifications).
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventFrame> {
        self.inner.events.subscribe()
    }

    /// Serial of the hub this client talks to.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.inner.serial
    }

    /// Graceful shutdown: drop all pending requests so no timer fires after
    /// teardown, then close the transport without triggering a reconnect.
    pub async fn close(&self) {
        self.inner.queue.clear();
        self.inner.conn.close().await;
    }
}

/// Handle one inbound text frame. Malformed frames are logged and dropped;
/// this path must never panic or tear the connection down.
fn dispatch_frame(text: &str, queue: &ResponseQueue, events: &broadcast::Sender<EventFrame>) {
    match Frame::parse(text) {
        Ok(Frame::Response(response)) => {
            debug!(id = response.id, "received response");
            let _ = queue.resolve(response.id, response);
        }
        Ok(Frame::Event(event)) => {
            // No subscribers is fine; events are best-effort.
            let _ = events.send(event);
        }
        Err(e) => error!("dropping malformed frame: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig::new("ws://127.0.0.1:9/spruthub", "user@example.com", "pw", "AB123")
    }

    #[test]
    fn test_config_requires_all_fields() {
        let mut config = config();
        config.serial = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = self::config();
        config.email = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_rejects_non_websocket_url() {
        let mut config = config();
        config.ws_url = "http://spruthub.local".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.ws_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_accepts_wss() {
        let mut config = config();
        config.ws_url = "wss://spruthub.local/spruthub".to_string();
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_call_fails_fast_when_disconnected() {
        let client = RpcClient::new(config()).unwrap();
        let result = client.call(json!({"room": {"list": {}}}), None).await;
        assert!(matches!(result, Err(Error::NotOpen)));
    }

    #[tokio::test]
    async fn test_ensure_fails_with_not_connected() {
        let client = RpcClient::new(config()).unwrap();
        let result = client.ensure_connection_and_authentication().await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_dispatch_frame_resolves_response() {
        let queue = ResponseQueue::new();
        let (events, _) = broadcast::channel(8);
        let (tx, rx) = oneshot::channel();
        queue.add(4, tx, Duration::from_secs(5));

        dispatch_frame(r#"{"id": 4, "result": {"ok": true}}"#, &queue, &events);

        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.id, 4);
    }

    #[tokio::test]
    async fn test_dispatch_frame_routes_events() {
        let queue = ResponseQueue::new();
        let (events, mut rx) = broadcast::channel(8);

        dispatch_frame(r#"{"event": {"log": {"log": []}}}"#, &queue, &events);

        let event = rx.recv().await.unwrap();
        assert!(event.event.get("log").is_some());
    }

    #[tokio::test]
    async fn test_dispatch_frame_drops_garbage() {
        let queue = ResponseQueue::new();
        let (events, _) = broadcast::channel(8);
        // Must not panic, must not touch the queue.
        dispatch_frame("not json at all", &queue, &events);
        assert!(queue.is_empty());
    }
}
