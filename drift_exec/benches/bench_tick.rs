//! # Tick Benchmark
//!
//! Everything a tick does between receiving a datagram and having the next command ready to send.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::sim::{
    command,
    telemetry::{self, TelemetryFrame}
};
use drift_lib::{
    drift_ctrl::{DriftCtrl, InputData, Params},
    est
};
use util::module::State;

fn tick_benchmark(c: &mut Criterion) {
    // ---- Build a drifting frame and controller ----

    let frame = TelemetryFrame {
        vel_x_world_ms: 11.0,
        vel_y_world_ms: -11.34,
        yaw_rad: -0.3,
        yaw_rate_rads: 0.51,
        wheel_spin_rl_rads: 61.2,
        wheel_spin_rr_rads: 61.9,
        ..Default::default()
    };
    let datagram = telemetry::encode(&frame);

    let params = Params {
        handshake_warmup_s: 0.0,
        ..Params::default()
    };
    let geometry = params.geometry();

    let mut drift_ctrl = DriftCtrl::default();
    drift_ctrl.init(params).unwrap();
    drift_ctrl.proc(&InputData { elapsed_s: 0.0, state: None }).unwrap();

    // ---- Benchmarks ----

    c.bench_function("telemetry decode", |b| {
        b.iter(|| telemetry::decode(black_box(&datagram)).unwrap())
    });

    c.bench_function("estimate", |b| {
        b.iter(|| est::estimate(black_box(&frame), black_box(-0.11), &geometry))
    });

    c.bench_function("full tick", |b| {
        let mut seq = 0u8;

        b.iter(|| {
            let frame = telemetry::decode(black_box(&datagram)).unwrap();
            let state = est::estimate(&frame, -0.11, &geometry);
            let (output, _) = drift_ctrl
                .proc(&InputData { elapsed_s: 1.0, state: Some(state) })
                .unwrap();

            seq = seq.wrapping_add(1);
            command::encode(&output.to_command(seq))
        })
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
