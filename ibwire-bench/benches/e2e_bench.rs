//! End-to-end client benchmarks against an in-process gateway peer.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ibwire_client::{Client, ConnectionConfig};
use ibwire_protocol::token::TokenWriter;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::runtime::Runtime;

/// Answers every current-time request (two tokens) with a reply.
async fn serve_current_time(mut server: DuplexStream) {
    let mut reply = TokenWriter::new();
    reply.put_int(49);
    reply.put_int(1);
    reply.put_long(1_700_000_000);
    let reply = reply.into_bytes();

    let mut buf = [0u8; 4096];
    let mut tokens = 0usize;
    loop {
        let n = match server.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        tokens += buf[..n].iter().filter(|&&b| b == 0).count();
        while tokens >= 2 {
            tokens -= 2;
            if server.write_all(&reply).await.is_err() {
                return;
            }
        }
    }
}

fn setup_client(rt: &Runtime) -> Client {
    rt.block_on(async {
        let (stream, mut server) = tokio::io::duplex(64 * 1024);

        let mut hello = TokenWriter::new();
        hello.put_int(71);
        hello.put_str("20240101 09:30:00 EST");
        server.write_all(&hello.into_bytes()).await.unwrap();

        let client = Client::new(ConnectionConfig::default().with_client_id(1));
        client.connect_stream(stream).await.unwrap();

        // client version and start message
        let mut seen = 0;
        let mut byte = [0u8; 1];
        while seen < 4 {
            server.read_exact(&mut byte).await.unwrap();
            if byte[0] == 0 {
                seen += 1;
            }
        }

        tokio::spawn(serve_current_time(server));
        client.start_dispatcher().unwrap();
        client
    })
}

fn bench_current_time_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);

    let mut group = c.benchmark_group("e2e_current_time");
    group.bench_function("round_trip", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.current_time().await.unwrap()) });
    });
    group.finish();
}

criterion_group!(benches, bench_current_time_round_trip);
criterion_main!(benches);
