//! WebSocket connection lifecycle.
//!
//! [`ConnectionManager`] keeps exactly one logical connection to the hub
//! alive at a time. An unexpected close tears the transport down and a new
//! attempt is made after a fixed delay; an explicit [`ConnectionManager::close`]
//! marks the connection as intentionally terminated and suppresses any
//! further reconnects. The reconnect delay is fixed, with no backoff and no
//! attempt cap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Default delay before a reconnect attempt after an unexpected close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default grace period for `close()` before cleanup is forced.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Handler slots invoked by the connection task as events occur.
///
/// Handlers run synchronously on the reader task, so inbound frames are
/// processed one at a time in arrival order.
pub struct ConnectionHandlers {
    pub on_open: Box<dyn Fn() + Send + Sync>,
    pub on_message: Box<dyn Fn(&str) + Send + Sync>,
    pub on_close: Box<dyn Fn() + Send + Sync>,
    pub on_error: Box<dyn Fn(&tokio_tungstenite::tungstenite::Error) + Send + Sync>,
}

impl ConnectionHandlers {
    /// Handlers that do nothing; useful for tests.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            on_open: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_close: Box::new(|| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

/// Timing knobs for the connection. Tests shorten these.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub reconnect_delay: Duration,
    pub close_grace: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

struct Shared {
    sink: Mutex<Option<WsSink>>,
    open_tx: watch::Sender<bool>,
    terminated: AtomicBool,
}

/// Owns the WebSocket lifecycle: connect, reconnect after loss, raw send,
/// intentional close.
#[derive(Clone)]
pub struct ConnectionManager {
    url: String,
    options: ConnectionOptions,
    handlers: Arc<ConnectionHandlers>,
    shared: Arc<Shared>,
    open_rx: watch::Receiver<bool>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(url: String, handlers: ConnectionHandlers, options: ConnectionOptions) -> Self {
        let (open_tx, open_rx) = watch::channel(false);
        Self {
            url,
            options,
            handlers: Arc::new(handlers),
            shared: Arc::new(Shared {
                sink: Mutex::new(None),
                open_tx,
                terminated: AtomicBool::new(false),
            }),
            open_rx,
        }
    }

    /// Spawn the connection task. Must not be called again without closing
    /// first: a second call would race a second transport against the first.
    pub fn connect(&self) {
        let url = self.url.clone();
        let delay = self.options.reconnect_delay;
        let handlers = Arc::clone(&self.handlers);
        let shared = Arc::clone(&self.shared);
        let _task = tokio::spawn(run(url, delay, handlers, shared));
    }

    /// Whether the transport is currently in the open state.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.open_rx.borrow()
    }

    /// Wait until the transport reaches the open state.
    pub async fn connected(&self) {
        let mut rx = self.open_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Write one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] if the transport is not open, or the
    /// transport error if the underlying write fails.
    pub async fn send(&self, text: String) -> Result<()> {
        let mut guard = self.shared.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(Error::NotOpen);
        };
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Terminate the connection intentionally.
    ///
    /// Suppresses auto-reconnect, requests a transport close, and resolves
    /// once the reader observes the close or after the grace timeout —
    /// whichever comes first, so this never hangs.
    pub async fn close(&self) {
        self.shared.terminated.store(true, Ordering::SeqCst);
        let was_open = self.is_open();

        {
            let mut guard = self.shared.sink.lock().await;
            if let Some(mut sink) = guard.take()
                && let Err(e) = sink.close().await
            {
                debug!("error while closing websocket: {e}");
            }
        }

        if was_open {
            let mut rx = self.open_rx.clone();
            let wait_closed = async {
                while *rx.borrow_and_update() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            };
            if tokio::time::timeout(self.options.close_grace, wait_closed)
                .await
                .is_err()
            {
                warn!("websocket close timed out, forcing cleanup");
            }
        }

        let _ = self.shared.open_tx.send_replace(false);
    }
}

/// Connection task: dial, pump inbound frames, and reconnect after the fixed
/// delay until intentionally terminated.
async fn run(
    url: String,
    reconnect_delay: Duration,
    handlers: Arc<ConnectionHandlers>,
    shared: Arc<Shared>,
) {
    loop {
        if shared.terminated.load(Ordering::SeqCst) {
            return;
        }

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                let (mut sink, mut inbound) = stream.split();
                {
                    // close() may have resolved while the dial was in
                    // flight; do not install a transport it can no longer
                    // tear down.
                    let mut guard = shared.sink.lock().await;
                    if shared.terminated.load(Ordering::SeqCst) {
                        drop(guard);
                        let _ = sink.close().await;
                        return;
                    }
                    *guard = Some(sink);
                    // Flip the flag while still holding the lock so a
                    // concurrent close() observes it before forcing the
                    // flag back to false.
                    let _ = shared.open_tx.send_replace(true);
                }
                info!("hub connected");
                (handlers.on_open)();

                while let Some(item) = inbound.next().await {
                    match item {
                        Ok(Message::Text(text)) => (handlers.on_message)(text.as_str()),
                        Ok(Message::Close(_)) => break,
                        // Pings are answered by tungstenite; binary frames
                        // are not part of the hub protocol.
                        Ok(_) => {}
                        Err(e) => {
                            (handlers.on_error)(&e);
                            break;
                        }
                    }
                }

                let _ = shared.open_tx.send_replace(false);
                shared.sink.lock().await.take();

                if shared.terminated.load(Ordering::SeqCst) {
                    info!("hub connection closed");
                    return;
                }

                info!("hub connection lost, reconnecting in {reconnect_delay:?}");
                (handlers.on_close)();
            }
            Err(e) => {
                if shared.terminated.load(Ordering::SeqCst) {
                    return;
                }
                warn!("hub connect failed, retrying in {reconnect_delay:?}: {e}");
                (handlers.on_error)(&e);
            }
        }

        tokio::time::sleep(reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(
            "ws://127.0.0.1:9".to_string(),
            ConnectionHandlers::noop(),
            ConnectionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_send_before_connect_fails_with_not_open() {
        let conn = manager();
        let result = conn.send("{}".to_string()).await;
        assert!(matches!(result, Err(Error::NotOpen)));
    }

    #[tokio::test]
    async fn test_close_without_transport_resolves_immediately() {
        let conn = manager();
        conn.close().await;
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_is_open_starts_false() {
        let conn = manager();
        assert!(!conn.is_open());
    }
}
