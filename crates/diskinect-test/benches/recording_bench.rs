//! Benchmarks for recording serialization and playback

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use diskinect_core::{TrackerConfig, Vec3};
use diskinect_stream::{PlayerStream, Recording, StreamContext, UserStream};
use diskinect_test::synthetic_gesture;
use diskinect_tracker::{SensorHub, UserTracker};

fn bench_recording_json(c: &mut Criterion) {
    let recording = synthetic_gesture(300, Vec3::new(0.0, 0.0, 3.0));
    let json = recording.to_json().unwrap();

    let mut group = c.benchmark_group("recording_json");
    group.throughput(Throughput::Bytes(json.len() as u64));

    group.bench_function("serialize_300_frames", |b| {
        b.iter(|| black_box(recording.to_json().unwrap()))
    });
    group.bench_function("parse_300_frames", |b| {
        b.iter(|| black_box(Recording::from_json_str(black_box(&json)).unwrap()))
    });

    group.finish();
}

fn bench_player_tick(c: &mut Criterion) {
    let hub = SensorHub::new();
    let tracker = UserTracker::detached(TrackerConfig::default());
    let ctx = StreamContext::new(&tracker, &hub);

    let mut player =
        PlayerStream::with_recording(synthetic_gesture(300, Vec3::new(0.0, 0.0, 3.0)), true);
    player.enter();

    c.bench_function("player_update_and_skeleton", |b| {
        b.iter(|| {
            player.update(&ctx);
            black_box(player.skeleton(&ctx))
        })
    });
}

criterion_group!(benches, bench_recording_json, bench_player_tick);
criterion_main!(benches);
