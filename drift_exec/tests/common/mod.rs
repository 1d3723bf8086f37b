//! Scripted simulator link shared by the integration tests.

#![allow(dead_code)]

use std::{collections::VecDeque, time::Duration};

use comms_if::sim::{
    command::{self, Command},
    telemetry::{self, TelemetryFrame}
};
use drift_lib::sim_client::{SimClientError, SimLink};

/// What the scripted simulator answers to a receive.
pub enum Reply {
    /// A well formed telemetry record
    Frame(TelemetryFrame),

    /// Arbitrary bytes, e.g. a truncated record
    Raw(Vec<u8>),

    /// Nothing arrives before the timeout
    Timeout
}

/// A link which answers the `k`th receive with `script(k)` and records every command sent.
pub struct ScriptedLink<F>
where
    F: FnMut(usize) -> Reply
{
    script: F,
    num_recvs: usize,
    pub sent: Vec<Command>,
    pub num_flushes: usize
}

impl<F> ScriptedLink<F>
where
    F: FnMut(usize) -> Reply
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            num_recvs: 0,
            sent: Vec::new(),
            num_flushes: 0
        }
    }
}

impl<F> SimLink for ScriptedLink<F>
where
    F: FnMut(usize) -> Reply
{
    fn send(&mut self, datagram: &[u8]) -> Result<(), SimClientError> {
        let cmd = command::decode(datagram).expect("Run loop sent a malformed command");
        self.sent.push(cmd);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SimClientError> {
        let reply = (self.script)(self.num_recvs);
        self.num_recvs += 1;

        let bytes = match reply {
            Reply::Frame(frame) => telemetry::encode(&frame).to_vec(),
            Reply::Raw(bytes) => bytes,
            Reply::Timeout => return Err(SimClientError::Timeout(Duration::from_millis(1)))
        };

        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<usize, SimClientError> {
        self.num_flushes += 1;
        Ok(0)
    }
}

/// A link which answers each command with one frame carrying the command's sequence number.
///
/// When `late(k)` is true the `k`th receive times out and its frame stays queued, as if it
/// arrived just after the deadline.
pub struct QueueLink<F>
where
    F: FnMut(usize) -> bool
{
    late: F,
    num_recvs: usize,
    queue: VecDeque<TelemetryFrame>,
    last_sent_seq: Option<u8>,

    /// (sequence of the last command sent, sequence of the frame returned) for each good receive
    pub consumed: Vec<(u8, u8)>
}

impl<F> QueueLink<F>
where
    F: FnMut(usize) -> bool
{
    pub fn new(late: F) -> Self {
        Self {
            late,
            num_recvs: 0,
            queue: VecDeque::new(),
            last_sent_seq: None,
            consumed: Vec::new()
        }
    }
}

impl<F> SimLink for QueueLink<F>
where
    F: FnMut(usize) -> bool
{
    fn send(&mut self, datagram: &[u8]) -> Result<(), SimClientError> {
        let cmd = command::decode(datagram).expect("Run loop sent a malformed command");
        self.last_sent_seq = Some(cmd.sequence);
        self.queue.push_back(TelemetryFrame {
            sequence: cmd.sequence,
            ..frame(0.0, 5.0, 0.0, 0.0)
        });
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SimClientError> {
        let k = self.num_recvs;
        self.num_recvs += 1;

        if (self.late)(k) {
            return Err(SimClientError::Timeout(Duration::from_millis(1)))
        }

        let tlm = match self.queue.pop_front() {
            Some(f) => f,
            None => return Err(SimClientError::Timeout(Duration::from_millis(1)))
        };
        let sent_seq = self.last_sent_seq.expect("Receive before any command was sent");
        self.consumed.push((sent_seq, tlm.sequence));

        let bytes = telemetry::encode(&tlm);
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<usize, SimClientError> {
        let n = self.queue.len();
        self.queue.clear();
        Ok(n)
    }
}

/// Telemetry for a car with the given heading and body frame velocities.
pub fn frame(yaw_rad: f64, v_x_ms: f64, v_y_ms: f64, yaw_rate_rads: f64) -> TelemetryFrame {
    let (s, c) = yaw_rad.sin_cos();
    let wheel_spin_rads = (v_x_ms / 0.4572) as f32;

    TelemetryFrame {
        vel_x_world_ms: (c * v_x_ms - s * v_y_ms) as f32,
        vel_y_world_ms: (s * v_x_ms + c * v_y_ms) as f32,
        yaw_rad: yaw_rad as f32,
        yaw_rate_rads: yaw_rate_rads as f32,
        wheel_spin_rl_rads: wheel_spin_rads,
        wheel_spin_rr_rads: wheel_spin_rads,
        ..Default::default()
    }
}
