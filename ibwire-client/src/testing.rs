//! Scripted gateway peer for unit tests.

use crate::connection::{Connection, ConnectionConfig};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Reads `count` null-terminated tokens written by the client.
pub(crate) async fn read_tokens(stream: &mut DuplexStream, count: usize) -> Vec<String> {
    let mut tokens = Vec::with_capacity(count);
    let mut current = Vec::new();
    while tokens.len() < count {
        let byte = stream.read_u8().await.unwrap();
        if byte == 0 {
            tokens.push(String::from_utf8(std::mem::take(&mut current)).unwrap());
        } else {
            current.push(byte);
        }
    }
    tokens
}

/// Writes tokens as the server would.
pub(crate) async fn write_tokens(stream: &mut DuplexStream, tokens: &[&str]) {
    for token in tokens {
        stream.write_all(token.as_bytes()).await.unwrap();
        stream.write_all(&[0]).await.unwrap();
    }
}

/// Negotiates a session with client id 1 and drains the handshake bytes.
pub(crate) async fn connected(
    server_version: i32,
    extra_auth: bool,
) -> (Arc<Connection>, DuplexStream) {
    let config = ConnectionConfig::default()
        .with_client_id(1)
        .with_extra_auth(extra_auth);
    let conn = Arc::new(Connection::new(config));
    let server = reconnect(&conn, server_version).await;
    (conn, server)
}

/// Negotiates `conn` over a fresh duplex pipe and returns the server end.
pub(crate) async fn reconnect(conn: &Connection, server_version: i32) -> DuplexStream {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let version = server_version.to_string();
    write_tokens(&mut server, &[&version, "20240101 09:30:00 EST"]).await;
    conn.connect_stream(client).await.unwrap();

    let written = if server_version < 70 {
        2
    } else if conn.config().extra_auth {
        1
    } else {
        4
    };
    read_tokens(&mut server, written).await;
    server
}
