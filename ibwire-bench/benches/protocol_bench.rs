//! Token codec and message decoding benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ibwire_protocol::token::{TokenCursor, TokenWriter};
use ibwire_protocol::{Contract, Decoder, Order, RequestEncoder};

/// Encodes a historical data response carrying `bars` bars.
fn historical_frame(bars: usize) -> Bytes {
    let mut w = TokenWriter::new();
    w.put_int(17);
    w.put_int(3);
    w.put_int(1);
    w.put_str("20240102  09:30:00");
    w.put_str("20240103  09:30:00");
    w.put_int(bars as i32);
    for i in 0..bars {
        w.put_str("20240102  10:00:00");
        w.put_double(100.0 + i as f64);
        w.put_double(101.5);
        w.put_double(99.25);
        w.put_double(100.75);
        w.put_long(12_000);
        w.put_double(100.4);
        w.put_str("false");
        w.put_int(87);
    }
    w.into_bytes()
}

fn tick_stream(ticks: usize) -> Bytes {
    let mut w = TokenWriter::new();
    for i in 0..ticks {
        w.put_int(1);
        w.put_int(6);
        w.put_int(1);
        w.put_int(1);
        w.put_double(187.25 + i as f64 / 100.0);
        w.put_int(300);
        w.put_int(1);
    }
    w.into_bytes()
}

fn bench_token_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_write");

    for count in [10, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut w = TokenWriter::new();
                for i in 0..count {
                    w.put_int(i);
                    w.put_double(i as f64 * 0.5);
                    w.put_str("SMART");
                }
                black_box(w.into_bytes())
            });
        });
    }

    group.finish();
}

fn bench_token_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_read");

    for count in [10, 100, 1000] {
        let mut w = TokenWriter::new();
        for i in 0..count {
            w.put_int(i);
            w.put_double(i as f64 * 0.5);
            w.put_str("SMART");
        }
        let bytes = w.into_bytes();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut cur = TokenCursor::new(bytes);
                for _ in 0..count {
                    black_box(cur.read_int().unwrap());
                    black_box(cur.read_double().unwrap());
                    black_box(cur.read_string().unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");
    let encoder = RequestEncoder::new(71);
    let contract = Contract::stock("AAPL", "USD");

    group.bench_function("req_mkt_data", |b| {
        b.iter(|| black_box(encoder.req_mkt_data(1, &contract, "", false, &[]).unwrap()));
    });

    let order = Order {
        action: "BUY".to_string(),
        total_quantity: 100,
        order_type: "LMT".to_string(),
        lmt_price: 187.5,
        ..Default::default()
    };
    group.bench_function("place_order", |b| {
        b.iter(|| black_box(encoder.place_order(1, &contract, &order).unwrap()));
    });

    group.finish();
}

fn bench_decode_historical(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_historical");

    for bars in [10, 100, 1000] {
        let frame = historical_frame(bars);

        group.throughput(Throughput::Elements(bars as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bars), &frame, |b, frame| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(frame);
                black_box(decoder.decode(71).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_decode_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_ticks");

    for ticks in [100, 1000] {
        let stream = tick_stream(ticks);

        group.throughput(Throughput::Elements(ticks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ticks), &stream, |b, stream| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(stream);
                let mut n = 0;
                while let Some(batch) = decoder.decode(71).unwrap() {
                    n += batch.len();
                }
                black_box(n)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_token_write,
    bench_token_read,
    bench_request_encode,
    bench_decode_historical,
    bench_decode_ticks,
);

criterion_main!(benches);
