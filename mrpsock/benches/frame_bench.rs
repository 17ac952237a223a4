// MRP frame-codec benchmarks using criterion.
//
// Measures:
//   - DATA frame encode / decode throughput across payload sizes
//   - ACK frame encode / decode

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use bytes::Bytes;
use mrpsock::frame::{Frame, MAX_PAYLOAD_SIZE};

// ---------------------------------------------------------------------------
// DATA frame encode throughput
// ---------------------------------------------------------------------------

fn bench_data_encode(c: &mut Criterion) {
    let sizes: &[usize] = &[1, 16, 64, MAX_PAYLOAD_SIZE];

    let mut group = c.benchmark_group("data_encode");
    for &size in sizes {
        let frame = Frame::Data {
            msg_id: 42,
            payload: Bytes::from(vec![0xABu8; size]),
        };
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &frame,
            |b, f| {
                b.iter(|| {
                    black_box(f.encode());
                });
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// DATA frame decode throughput
// ---------------------------------------------------------------------------

fn bench_data_decode(c: &mut Criterion) {
    let sizes: &[usize] = &[1, 16, 64, MAX_PAYLOAD_SIZE];

    let mut group = c.benchmark_group("data_decode");
    for &size in sizes {
        let encoded = Frame::Data {
            msg_id: 42,
            payload: Bytes::from(vec![0xABu8; size]),
        }
        .encode();
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &encoded,
            |b, data| {
                b.iter(|| {
                    black_box(Frame::decode(black_box(data)).unwrap());
                });
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// ACK frame encode/decode
// ---------------------------------------------------------------------------

fn bench_ack_frame(c: &mut Criterion) {
    let frame = Frame::Ack { msg_id: 999 };

    c.bench_function("ack_frame_encode", |b| {
        b.iter(|| {
            black_box(frame.encode());
        });
    });

    let encoded = frame.encode();
    c.bench_function("ack_frame_decode", |b| {
        b.iter(|| {
            black_box(Frame::decode(black_box(&encoded)).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group! {
    name = frame_benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_data_encode,
        bench_data_decode,
        bench_ack_frame
}

criterion_main!(frame_benches);
