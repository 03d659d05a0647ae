//! Connection management and version negotiation.

use crate::error::ClientError;
use crate::stream::{ClientStream, Transport};
use ibwire_protocol::kind::server_version as sv;
use ibwire_protocol::{
    Decoder, Encoder, ErrorCode, Incoming, OutgoingMessage, ProtocolError, RequestEncoder,
    CLIENT_VERSION, DEFAULT_PORT,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (4 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Negotiating,
    /// Negotiated with extra authentication; waiting for `start_api`.
    AwaitingExplicitStart,
    Active,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Client id announced to the server.
    pub client_id: i32,
    /// Hold the session in `AwaitingExplicitStart` after negotiation.
    pub extra_auth: bool,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: 0,
            extra_auth: false,
            connect_timeout: Duration::from_secs(10),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_client_id(mut self, client_id: i32) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_extra_auth(mut self, extra_auth: bool) -> Self {
        self.extra_auth = extra_auth;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", DEFAULT_PORT)
    }
}

#[derive(Debug)]
struct Session {
    state: ConnectionState,
    server_version: i32,
    client_id: i32,
    extra_auth: bool,
    server_time: Option<String>,
}

impl Session {
    fn closed() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            server_version: 0,
            client_id: -1,
            extra_auth: false,
            server_time: None,
        }
    }
}

/// A connection to a gateway.
///
/// The write half is shared by all callers behind a lock, so a message is
/// never interleaved with another. The read half is lent to the dispatcher
/// while it runs.
pub struct Connection {
    config: ConnectionConfig,
    writer: Mutex<Option<WriteHalf<ClientStream>>>,
    reader: Mutex<Option<ReadHalf<ClientStream>>>,
    decoder: parking_lot::Mutex<Decoder>,
    session: RwLock<Session>,
    /// Flips to `true` whenever the transport is torn down.
    closed: watch::Sender<bool>,
    /// Bumped for every negotiated transport.
    generation: AtomicU64,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let (closed, _) = watch::channel(true);
        let decoder = Decoder::with_capacity(config.read_buffer_size);
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            decoder: parking_lot::Mutex::new(decoder),
            session: RwLock::new(Session::closed()),
            closed,
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Opens a TCP connection and negotiates the protocol version.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.begin_negotiation()?;
        tracing::debug!(
            "Connecting to {}:{}...",
            self.config.host,
            self.config.port
        );

        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let tcp_stream = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::debug!("Connection failed: {}", e);
                *self.session.write() = Session::closed();
                return Err(ClientError::transport(ErrorCode::ConnectFail, None, e));
            }
            Err(_) => {
                tracing::debug!("Connection timeout");
                *self.session.write() = Session::closed();
                return Err(ClientError::ConnectTimeout);
            }
        };
        tcp_stream.set_nodelay(true).ok();

        self.negotiate(ClientStream::Tcp { stream: tcp_stream })
            .await
    }

    /// Negotiates over an already-open duplex stream.
    pub async fn connect_stream<T: Transport>(&self, stream: T) -> Result<(), ClientError> {
        self.begin_negotiation()?;
        self.negotiate(ClientStream::custom(stream)).await
    }

    fn begin_negotiation(&self) -> Result<(), ClientError> {
        let mut session = self.session.write();
        if session.state != ConnectionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        session.state = ConnectionState::Negotiating;
        session.client_id = self.config.client_id;
        session.extra_auth = self.config.extra_auth;
        Ok(())
    }

    async fn negotiate(&self, stream: ClientStream) -> Result<(), ClientError> {
        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.decoder.lock().clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.closed.send_replace(false);

        if let Err(e) = self.handshake().await {
            tracing::debug!("Handshake failed: {}", e);
            self.teardown().await;
            return Err(e);
        }
        Ok(())
    }

    async fn handshake(&self) -> Result<(), ClientError> {
        tracing::debug!("Sending client version {}", CLIENT_VERSION);
        self.write_raw(&Encoder::handshake(CLIENT_VERSION)).await?;

        let server_version = self.read_handshake(|d| d.next_int()).await?;
        if server_version < sv::MIN_VERSION {
            return Err(ClientError::ProtocolTooOld {
                server_version,
                min_version: sv::MIN_VERSION,
            });
        }
        let server_time = if server_version >= sv::SERVER_TIME {
            Some(self.read_handshake(|d| Ok(d.next_token())).await?)
        } else {
            None
        };
        tracing::debug!(
            "Server version {} (connection time {:?})",
            server_version,
            server_time
        );

        let (client_id, extra_auth) = {
            let mut session = self.session.write();
            session.server_version = server_version;
            session.server_time = server_time;
            (session.client_id, session.extra_auth)
        };

        if server_version < sv::LINKING {
            self.write_raw(&Encoder::legacy_client_id(client_id)).await?;
            self.session.write().state = ConnectionState::Active;
        } else if !extra_auth {
            self.send_start_api().await?;
        } else {
            tracing::debug!("Waiting for explicit start");
            self.session.write().state = ConnectionState::AwaitingExplicitStart;
        }
        Ok(())
    }

    /// Reads until `take` can pull a value out of the decoder.
    async fn read_handshake<T>(
        &self,
        mut take: impl FnMut(&mut Decoder) -> Result<Option<T>, ProtocolError>,
    ) -> Result<T, ClientError> {
        let mut buf = vec![0u8; self.config.read_buffer_size];
        loop {
            let taken = take(&mut *self.decoder.lock())?;
            if let Some(value) = taken {
                return Ok(value);
            }
            let n = {
                let mut reader_guard = self.reader.lock().await;
                let reader = reader_guard.as_mut().ok_or(ClientError::NotConnected)?;
                reader
                    .read(&mut buf)
                    .await
                    .map_err(|e| ClientError::transport(ErrorCode::ConnectFail, None, e))?
            };
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            self.decoder.lock().extend(&buf[..n]);
        }
    }

    async fn write_raw(&self, bytes: &[u8]) -> Result<(), ClientError> {
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| ClientError::transport(ErrorCode::ConnectFail, None, e))
    }

    /// Sends the activation message, completing a session opened with
    /// extra authentication.
    pub async fn start_api(&self) -> Result<(), ClientError> {
        match self.state() {
            ConnectionState::Disconnected | ConnectionState::Negotiating => {
                Err(ClientError::NotConnected)
            }
            _ => self.send_start_api().await,
        }
    }

    async fn send_start_api(&self) -> Result<(), ClientError> {
        let (server_version, client_id) = {
            let session = self.session.read();
            (session.server_version, session.client_id)
        };
        let msg = RequestEncoder::new(server_version).start_api(client_id);
        self.send(&msg).await?;
        self.session.write().state = ConnectionState::Active;
        tracing::debug!("Session active (client id {})", client_id);
        Ok(())
    }

    /// Writes one encoded request.
    pub async fn send(&self, msg: &OutgoingMessage) -> Result<(), ClientError> {
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .write_all(&msg.payload)
            .await
            .map_err(|e| ClientError::transport(msg.error_code, msg.request_id, e))?;
        tracing::trace!("Sent {:?} ({} bytes)", msg.kind, msg.payload.len());
        Ok(())
    }

    /// Encoder for the negotiated version. Requires an active session.
    pub fn encoder(&self) -> Result<RequestEncoder, ClientError> {
        let session = self.session.read();
        if session.state != ConnectionState::Active {
            return Err(ClientError::NotConnected);
        }
        Ok(RequestEncoder::new(session.server_version).with_extra_auth(session.extra_auth))
    }

    /// Encoder for the verify exchange, which also runs before activation.
    pub(crate) fn verify_encoder(&self) -> Result<RequestEncoder, ClientError> {
        let session = self.session.read();
        match session.state {
            ConnectionState::AwaitingExplicitStart | ConnectionState::Active => {
                Ok(RequestEncoder::new(session.server_version)
                    .with_extra_auth(session.extra_auth))
            }
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Closes the connection.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        if self.state() == ConnectionState::Disconnected {
            return Err(ClientError::NotConnected);
        }
        self.teardown().await;
        Ok(())
    }

    /// Releases the transport and resets the session. Safe to call when
    /// already disconnected; returns whether a session was open.
    pub(crate) async fn teardown(&self) -> bool {
        let was_open = {
            let mut session = self.session.write();
            let was_open = session.state != ConnectionState::Disconnected;
            *session = Session::closed();
            was_open
        };
        self.closed.send_replace(true);

        if let Some(mut writer) = self.writer.lock().await.take() {
            tracing::debug!("Shutting down writer");
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.lock().await.take();
        self.decoder.lock().clear();

        if was_open {
            tracing::debug!("Connection closed");
        }
        was_open
    }

    // =========================================================================
    // Dispatcher support
    // =========================================================================

    pub(crate) async fn take_reader(&self) -> Option<ReadHalf<ClientStream>> {
        self.reader.lock().await.take()
    }

    /// Hands the read half back after a cooperative stop. A reader taken
    /// from an earlier transport is dropped.
    pub(crate) async fn restore_reader(&self, reader: ReadHalf<ClientStream>, generation: u64) {
        let closed = *self.closed.borrow();
        if closed || generation != self.generation() {
            return;
        }
        let mut slot = self.reader.lock().await;
        if slot.is_none() {
            *slot = Some(reader);
        }
    }

    /// Identifies the current transport.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    pub(crate) fn feed(&self, data: &[u8]) {
        self.decoder.lock().extend(data);
    }

    pub(crate) fn decode_next(&self) -> Result<Option<Vec<Incoming>>, ProtocolError> {
        let server_version = self.server_version();
        self.decoder.lock().decode(server_version)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        self.session.read().state
    }

    /// Returns whether a session exists, active or not.
    pub fn is_connected(&self) -> bool {
        self.state() != ConnectionState::Disconnected
    }

    /// Negotiated server version; 0 when disconnected.
    pub fn server_version(&self) -> i32 {
        self.session.read().server_version
    }

    /// Client id of the session; -1 when disconnected.
    pub fn client_id(&self) -> i32 {
        self.session.read().client_id
    }

    /// Connection time reported by the server during the handshake.
    pub fn server_time(&self) -> Option<String> {
        self.session.read().server_time.clone()
    }
}
