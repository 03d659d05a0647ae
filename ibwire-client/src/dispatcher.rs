//! Background read loop.
//!
//! The dispatcher owns the read half of the connection while it runs. It
//! feeds socket bytes to the decoder and routes every decoded message to the
//! correlator. Stop requests are observed between messages only, since the
//! decoder never consumes a partial message.

use crate::connection::{Connection, ConnectionState};
use crate::correlation::Correlator;
use crate::error::ClientError;
use crate::stream::ClientStream;
use ibwire_protocol::{ErrorCode, ErrorMessage, Incoming, ProtocolError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, ReadHalf};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Lifecycle notifications published by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Started,
    /// Stopped on request or because the session was closed locally.
    Stopped,
    /// The read side failed; the connection was torn down.
    Terminated { code: ErrorCode, reason: String },
}

struct Running {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    /// Transport the loop was started on.
    generation: u64,
}

/// Starts and stops the read loop for one connection.
pub struct Dispatcher {
    conn: Arc<Connection>,
    correlator: Arc<Correlator>,
    events: broadcast::Sender<DispatchEvent>,
    running: Mutex<Option<Running>>,
}

impl Dispatcher {
    pub fn new(conn: Arc<Connection>, correlator: Arc<Correlator>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            conn,
            correlator,
            events,
            running: Mutex::new(None),
        }
    }

    /// Spawns the read loop.
    ///
    /// A loop still winding down from an earlier transport is aborted.
    pub fn start(&self) -> Result<(), ClientError> {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref().filter(|r| !r.handle.is_finished()) {
            if current.generation == self.conn.generation() {
                return Err(ClientError::DispatcherAlreadyRunning);
            }
            tracing::debug!("Aborting read loop of a closed transport");
            current.handle.abort();
        }
        if !self.conn.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let generation = self.conn.generation();
        let (stop_tx, stop_rx) = oneshot::channel();
        let read_loop = ReadLoop {
            conn: Arc::clone(&self.conn),
            correlator: Arc::clone(&self.correlator),
            events: self.events.clone(),
            generation,
        };
        let handle = tokio::spawn(read_loop.run(stop_rx));
        *running = Some(Running {
            stop_tx,
            handle,
            generation,
        });

        let _ = self.events.send(DispatchEvent::Started);
        Ok(())
    }

    /// Stops the read loop and waits for it to exit.
    ///
    /// Pending futures stay queued; the connection remains usable.
    pub async fn stop(&self) -> Result<(), ClientError> {
        let running = self.running.lock().take();
        let running = match running {
            Some(r) if !r.handle.is_finished() => r,
            _ => return Err(ClientError::DispatcherNotRunning),
        };
        let _ = running.stop_tx.send(());
        if let Err(e) = running.handle.await {
            tracing::warn!("Dispatcher task failed: {}", e);
        }
        Ok(())
    }

    /// Stops the loop if it runs. Used before the connection is closed.
    pub(crate) async fn shutdown(&self) {
        if self.stop().await.is_ok() {
            tracing::debug!("Dispatcher shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }
}

struct ReadLoop {
    conn: Arc<Connection>,
    correlator: Arc<Correlator>,
    events: broadcast::Sender<DispatchEvent>,
    generation: u64,
}

impl ReadLoop {
    async fn run(self, mut stop_rx: oneshot::Receiver<()>) {
        let Some(mut reader) = self.conn.take_reader().await else {
            self.closed_locally();
            return;
        };
        let mut closed = self.conn.closed_signal();
        let already_closed = *closed.borrow_and_update();
        if already_closed {
            self.closed_locally();
            return;
        }
        let mut buf = vec![0u8; self.conn.config().read_buffer_size];
        tracing::debug!("Dispatcher started");

        loop {
            loop {
                if stop_requested(&mut stop_rx) {
                    self.stop(reader).await;
                    return;
                }
                match self.conn.decode_next() {
                    Ok(Some(batch)) => {
                        for msg in batch {
                            self.deliver(msg).await;
                        }
                    }
                    Ok(None) => break,
                    Err(ProtocolError::UnknownMessageKind(kind)) => {
                        tracing::warn!("Unknown message kind {}", kind);
                        self.report(ErrorCode::UnknownId, kind.to_string());
                    }
                    Err(e) => {
                        self.report(ErrorCode::BadMessage, e.to_string());
                        self.terminate(ErrorCode::BadMessage, e.to_string()).await;
                        return;
                    }
                }
            }

            tokio::select! {
                biased;

                _ = &mut stop_rx => {
                    self.stop(reader).await;
                    return;
                }
                // any change means this transport is gone
                _ = closed.changed() => {
                    self.closed_locally();
                    return;
                }
                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        let reason = "connection closed by peer".to_string();
                        self.report(ErrorCode::SocketException, &reason);
                        self.terminate(ErrorCode::SocketException, reason).await;
                        return;
                    }
                    Ok(n) => {
                        tracing::trace!("Read {} bytes", n);
                        self.conn.feed(&buf[..n]);
                    }
                    Err(e) => {
                        self.report(ErrorCode::SocketException, e.to_string());
                        self.terminate(ErrorCode::SocketException, e.to_string()).await;
                        return;
                    }
                }
            }
        }
    }

    async fn deliver(&self, msg: Incoming) {
        if let Incoming::VerifyCompleted(verify) = &msg {
            if verify.is_successful && self.conn.state() == ConnectionState::AwaitingExplicitStart
            {
                if let Err(e) = self.conn.start_api().await {
                    tracing::warn!("Failed to start API after verification: {}", e);
                }
            }
        }
        self.correlator.route(msg);
    }

    /// Puts a client-side report on the error queue.
    fn report(&self, code: ErrorCode, detail: impl AsRef<str>) {
        self.correlator
            .route(Incoming::Error(ErrorMessage::client(code, detail)));
    }

    async fn stop(&self, reader: ReadHalf<ClientStream>) {
        self.conn.restore_reader(reader, self.generation).await;
        tracing::debug!("Dispatcher stopped");
        let _ = self.events.send(DispatchEvent::Stopped);
    }

    /// Pending waiters are left to whoever closed the connection.
    fn closed_locally(&self) {
        tracing::debug!("Connection closed, dispatcher exiting");
        let _ = self.events.send(DispatchEvent::Stopped);
    }

    async fn terminate(&self, code: ErrorCode, reason: String) {
        tracing::error!("Dispatcher terminated ({}): {}", code, reason);
        self.conn.teardown().await;
        let failed = self.correlator.fail_all();
        if failed > 0 {
            tracing::debug!("Failed {} pending requests", failed);
        }
        let _ = self.events.send(DispatchEvent::Terminated { code, reason });
    }
}

fn stop_requested(stop_rx: &mut oneshot::Receiver<()>) -> bool {
    !matches!(
        stop_rx.try_recv(),
        Err(oneshot::error::TryRecvError::Empty)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{connected, read_tokens, reconnect, write_tokens};
    use tokio_test::{assert_err, assert_ok};

    fn dispatcher(conn: &Arc<Connection>) -> (Dispatcher, Arc<Correlator>) {
        let correlator = Arc::new(Correlator::new());
        (
            Dispatcher::new(Arc::clone(conn), Arc::clone(&correlator)),
            correlator,
        )
    }

    #[tokio::test]
    async fn test_start_requires_connection() {
        let conn = Arc::new(Connection::new(Default::default()));
        let (dispatcher, _) = dispatcher(&conn);
        assert!(matches!(dispatcher.start(), Err(ClientError::NotConnected)));
        assert!(!dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_routes_messages() {
        let (conn, mut server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let next_id = correlator.next_valid_id();
        assert_ok!(dispatcher.start());

        write_tokens(&mut server, &["9", "1", "42"]).await;
        assert_eq!(next_id.await.unwrap().order_id, 42);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let (conn, _server) = connected(71, false).await;
        let (dispatcher, _) = dispatcher(&conn);
        let mut events = dispatcher.subscribe();

        assert_ok!(dispatcher.start());
        assert!(dispatcher.is_running());
        assert!(matches!(
            dispatcher.start(),
            Err(ClientError::DispatcherAlreadyRunning)
        ));

        assert_ok!(dispatcher.stop().await);
        assert!(!dispatcher.is_running());
        assert!(matches!(
            dispatcher.stop().await,
            Err(ClientError::DispatcherNotRunning)
        ));

        assert_eq!(events.recv().await.unwrap(), DispatchEvent::Started);
        assert_eq!(events.recv().await.unwrap(), DispatchEvent::Stopped);
        assert_eq!(conn.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn test_stop_keeps_pending_and_restart_resumes() {
        let (conn, mut server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let next_id = correlator.next_valid_id();

        assert_ok!(dispatcher.start());
        assert_ok!(dispatcher.stop().await);
        assert_eq!(correlator.pending_count(), 1);

        assert_ok!(dispatcher.start());
        write_tokens(&mut server, &["9", "1", "8"]).await;
        assert_eq!(next_id.await.unwrap().order_id, 8);
    }

    #[tokio::test]
    async fn test_peer_close_fails_pending() {
        let (conn, server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let mut events = dispatcher.subscribe();
        let errors = correlator.errors();
        let next_id = correlator.next_valid_id();

        assert_ok!(dispatcher.start());
        drop(server);

        let report = errors.await.unwrap();
        assert_eq!(report.code, 509);
        assert_eq!(report.id, -1);
        assert!(matches!(
            next_id.await,
            Err(ClientError::ConnectionClosed)
        ));

        assert_eq!(events.recv().await.unwrap(), DispatchEvent::Started);
        match events.recv().await.unwrap() {
            DispatchEvent::Terminated { code, .. } => {
                assert_eq!(code, ErrorCode::SocketException)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_reported_and_skipped() {
        let (conn, mut server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let errors = correlator.errors();
        let next_id = correlator.next_valid_id();
        assert_ok!(dispatcher.start());

        write_tokens(&mut server, &["99", "9", "1", "7"]).await;

        let report = errors.await.unwrap();
        assert_eq!(report.code, 505);
        assert!(report.message.contains("99"));
        assert_eq!(next_id.await.unwrap().order_id, 7);
        assert!(dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_malformed_message_terminates() {
        let (conn, mut server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let errors = correlator.errors();
        let time = correlator.current_time();
        assert_ok!(dispatcher.start());

        write_tokens(&mut server, &["9", "1", "forty-two"]).await;

        assert_eq!(errors.await.unwrap().code, 508);
        assert_err!(time.await);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_successful_verify_starts_api() {
        let (conn, mut server) = connected(71, true).await;
        assert_eq!(conn.state(), ConnectionState::AwaitingExplicitStart);

        let (dispatcher, correlator) = dispatcher(&conn);
        let verified = correlator.verify_completed();
        assert_ok!(dispatcher.start());

        write_tokens(&mut server, &["66", "1", "true", ""]).await;
        assert!(verified.await.unwrap().is_successful);
        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(read_tokens(&mut server, 3).await, vec!["71", "1", "1"]);
    }

    #[tokio::test]
    async fn test_local_disconnect_stops_loop() {
        let (conn, _server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let mut events = dispatcher.subscribe();
        let _pending = correlator.current_time();
        assert_ok!(dispatcher.start());

        assert_ok!(conn.disconnect().await);
        assert_eq!(events.recv().await.unwrap(), DispatchEvent::Started);
        assert_eq!(events.recv().await.unwrap(), DispatchEvent::Stopped);
        // waiters are failed by the owner of the connection, not the loop
        assert_eq!(correlator.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_on_new_transport() {
        let (conn, _old) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        assert_ok!(dispatcher.start());
        assert_ok!(conn.disconnect().await);

        let mut server = reconnect(&conn, 71).await;
        let time = correlator.current_time();
        assert_ok!(dispatcher.start());
        assert!(matches!(
            dispatcher.start(),
            Err(ClientError::DispatcherAlreadyRunning)
        ));

        write_tokens(&mut server, &["49", "1", "1700000000"]).await;
        assert_eq!(time.await.unwrap().time, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_size_tick_follows_price_tick() {
        let (conn, mut server) = connected(71, false).await;
        let (dispatcher, correlator) = dispatcher(&conn);
        let price = correlator.tick_price();
        let size = correlator.tick_size();
        assert_ok!(dispatcher.start());

        write_tokens(&mut server, &["1", "2", "5", "1", "1.5", "100"]).await;

        let price = price.await.unwrap();
        assert_eq!(price.ticker_id, 5);
        assert_eq!(price.field, 1);
        let size = size.await.unwrap();
        assert_eq!(size.ticker_id, 5);
        assert_eq!(size.field, 0);
        assert_eq!(size.size, 100);
    }
}
