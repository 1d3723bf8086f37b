//! # Run loop
//!
//! A run is a single synchronous loop owning the simulator link and all mutable controller state:
//!
//! 1. Handshake: neutral datagrams every `handshake_period_ms` until drift control leaves its
//!    handshake phase, after which any telemetry queued during the handshake is dropped.
//! 2. Ticks: send the current command, wait for one telemetry frame, estimate the vehicle state
//!    and run drift control to get the command for the next tick.
//!
//! A tick whose telemetry times out or cannot be decoded sends a neutral command and is retried,
//! after dropping any telemetry already queued. Too many of these in a row ends the run with
//! [`RunError::TooManyFailures`]. Every other way out of the run also ends on a neutral command.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, atomic::{AtomicBool, Ordering}},
    thread,
    time::Instant
};
use log::{debug, info, trace, warn};
use serde::Serialize;

use comms_if::sim::{
    ProtocolError,
    command::{self, Command},
    telemetry
};
use util::{archive::Archiver, module::State};

use crate::{
    drift_ctrl::{self, ControllerPhase, DriftCtrl, DriftCtrlError, InputData, OutputData},
    est::{self, Geometry, VehicleState},
    params::{ConfigError, ExecParams},
    sim_client::{SimClientError, SimLink, RECV_BUF_LEN},
    tyre
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared flag used to stop a run from outside the loop. Checked between ticks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

/// Mutable state carried between ticks.
pub struct RunState {
    drift_ctrl: DriftCtrl,

    /// Command to send on the next tick
    output: OutputData,

    /// Sequence number for the next datagram
    sequence: u8,

    num_ticks: u64,
    num_sent: u64,
    num_failures: u64,
    num_consec_failures: u32
}

/// Owns everything a run needs.
pub struct RunContext<L: SimLink> {
    link: L,
    state: RunState,
    params: ExecParams,
    geometry: Geometry,
    archiver: Archiver,
    cancel: CancelToken
}

/// How a run went.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    /// Number of completed driving ticks.
    pub num_ticks: u64,

    /// Number of datagrams sent, handshake included.
    pub num_sent: u64,

    /// Number of failed ticks across the run.
    pub num_failures: u64,

    pub final_phase: ControllerPhase,

    pub termination: Termination,

    /// Units: seconds
    pub elapsed_s: f64
}

/// One row of the per-tick archive.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub phase: ControllerPhase,

    /// Sequence number of the command applied during the tick.
    pub sequence: u8,

    pub v_x_ms: f64,
    pub v_y_ms: f64,
    pub yaw_rate_rads: f64,
    pub slip_ratio: f64,
    pub slip_angle_front_rad: f64,
    pub slip_angle_rear_rad: f64,

    /// Steering applied during the tick.
    pub steer_rad: f64,

    /// Throttle applied during the tick.
    pub throttle: f64,

    /// Magic Formula force at the measured front slip angle.
    pub force_front_pred_n: f64,
    pub force_rear_pred_n: f64,

    /// Steady-turn force implied by the measured yaw rate.
    pub force_front_meas_n: f64,
    pub force_rear_meas_n: f64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reason a run ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The configured number of ticks completed.
    TickBudget,

    /// The wall-clock limit was reached.
    TimeLimit,

    /// The cancel token was set.
    Cancelled
}

/// A tick that did not produce a usable vehicle state.
#[derive(Debug, thiserror::Error)]
pub enum TickFailure {
    #[error("{0}")]
    Link(SimClientError),

    #[error("Malformed telemetry: {0}")]
    Protocol(ProtocolError),

    #[error("Telemetry produced a non-finite vehicle state")]
    NonFinite
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Aborting after {count} consecutive failed ticks, last failure: {last}")]
    TooManyFailures {
        count: u32,
        last: TickFailure
    },

    #[error("Could not send a command to the simulator: {0}")]
    Send(SimClientError),

    #[error("Drift control error: {0}")]
    Controller(DriftCtrlError)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl RunState {
    /// Create the state for a new run, initialising drift control with the given parameters.
    pub fn new(params: drift_ctrl::Params) -> Result<Self, ConfigError> {
        let mut drift_ctrl = DriftCtrl::default();
        drift_ctrl.init(params)?;

        Ok(Self {
            drift_ctrl,
            output: OutputData::neutral(),
            sequence: 0,
            num_ticks: 0,
            num_sent: 0,
            num_failures: 0,
            num_consec_failures: 0
        })
    }

    /// Take the sequence number for the next datagram. Wraps after 255.
    pub fn next_sequence(&mut self) -> u8 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    pub fn phase(&self) -> ControllerPhase {
        self.drift_ctrl.phase()
    }

    pub fn output(&self) -> OutputData {
        self.output
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    pub fn num_sent(&self) -> u64 {
        self.num_sent
    }
}

impl<L: SimLink> RunContext<L> {
    /// Create a new run over the given link. All parameters are checked here, before anything is
    /// sent.
    pub fn new(
        link: L,
        drift_params: drift_ctrl::Params,
        params: ExecParams,
        cancel: CancelToken
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let geometry = drift_params.geometry();

        Ok(Self {
            link,
            state: RunState::new(drift_params)?,
            params,
            geometry,
            archiver: Archiver::default(),
            cancel
        })
    }

    /// Archive every tick with the given archiver.
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Execute the run until the tick budget, the time limit, cancellation, or a fatal error.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        let start = Instant::now();

        info!(
            "Starting run: {} ticks, time limit {:?} s, {} consecutive failures tolerated",
            self.params.max_ticks,
            self.params.max_duration_s,
            self.params.max_consec_failures
        );

        let termination = loop {
            if self.cancel.is_cancelled() {
                break Termination::Cancelled
            }
            if self.state.num_ticks >= self.params.max_ticks {
                break Termination::TickBudget
            }

            let elapsed_s = start.elapsed().as_secs_f64();
            if let Some(max_s) = self.params.max_duration_s {
                if elapsed_s >= max_s {
                    break Termination::TimeLimit
                }
            }

            match self.state.phase() {
                ControllerPhase::Handshake => self.handshake_step(elapsed_s)?,
                _ => self.tick(elapsed_s)?
            }
        };

        // Leave the car with no throttle or steering applied
        self.send(OutputData::neutral())?;

        let summary = RunSummary {
            num_ticks: self.state.num_ticks,
            num_sent: self.state.num_sent,
            num_failures: self.state.num_failures,
            final_phase: self.state.phase(),
            termination,
            elapsed_s: start.elapsed().as_secs_f64()
        };

        info!(
            "Run ended ({:?}) after {} ticks in the {} phase",
            summary.termination,
            summary.num_ticks,
            summary.final_phase
        );

        Ok(summary)
    }

    fn handshake_step(&mut self, elapsed_s: f64) -> Result<(), RunError> {
        let (output, report) = self.state.drift_ctrl
            .proc(&InputData { elapsed_s, state: None })
            .map_err(RunError::Controller)?;
        self.state.output = output;

        if report.transition.is_some() {
            match self.link.flush() {
                Ok(0) => (),
                Ok(n) => debug!("Dropped {} telemetry datagrams queued during the handshake", n),
                Err(e) => warn!("Could not flush telemetry after the handshake: {}", e)
            }
            return Ok(())
        }

        let output = self.state.output;
        self.send(output)?;
        thread::sleep(self.params.handshake_period());

        Ok(())
    }

    fn tick(&mut self, elapsed_s: f64) -> Result<(), RunError> {
        // Frames arriving late after a failure, or answering its neutral command, would leave every
        // later tick reading telemetry from an older command
        if self.state.num_consec_failures > 0 {
            match self.link.flush() {
                Ok(0) => (),
                Ok(n) => debug!("Dropped {} stale telemetry datagrams before retrying", n),
                Err(e) => warn!("Could not flush telemetry before retrying: {}", e)
            }
        }

        let applied = self.state.output;
        let cmd = self.send(applied)?;

        let vehicle = match self.receive_state(applied.steer_rad) {
            Ok(v) => v,
            Err(failure) => return self.handle_failure(failure)
        };
        self.state.num_consec_failures = 0;

        let (output, report) = self.state.drift_ctrl
            .proc(&InputData { elapsed_s, state: Some(vehicle) })
            .map_err(RunError::Controller)?;
        self.state.output = output;

        let record = self.record(report.phase, &cmd, &applied, &vehicle);
        trace!("{:?}", record);
        if let Err(e) = self.archiver.serialise(record) {
            warn!("Could not archive tick {}: {}", self.state.num_ticks, e);
        }

        self.state.num_ticks += 1;

        Ok(())
    }

    fn handle_failure(&mut self, failure: TickFailure) -> Result<(), RunError> {
        self.state.num_consec_failures += 1;
        self.state.num_failures += 1;

        warn!(
            "Tick {} failed ({} in a row): {}",
            self.state.num_ticks,
            self.state.num_consec_failures,
            failure
        );

        self.send(OutputData::neutral())?;

        if self.state.num_consec_failures > self.params.max_consec_failures {
            return Err(RunError::TooManyFailures {
                count: self.state.num_consec_failures,
                last: failure
            })
        }

        Ok(())
    }

    fn send(&mut self, output: OutputData) -> Result<Command, RunError> {
        let cmd = output.to_command(self.state.next_sequence());

        self.link.send(&command::encode(&cmd)).map_err(RunError::Send)?;
        self.state.num_sent += 1;

        Ok(cmd)
    }

    fn receive_state(&mut self, steer_rad: f64) -> Result<VehicleState, TickFailure> {
        let mut buf = [0u8; RECV_BUF_LEN];

        let n = self.link.recv(&mut buf).map_err(TickFailure::Link)?;
        let frame = telemetry::decode(&buf[..n]).map_err(TickFailure::Protocol)?;

        let vehicle = est::estimate(&frame, steer_rad, &self.geometry);
        if !vehicle.is_finite() {
            return Err(TickFailure::NonFinite)
        }

        Ok(vehicle)
    }

    fn record(
        &self,
        phase: ControllerPhase,
        cmd: &Command,
        applied: &OutputData,
        vehicle: &VehicleState
    ) -> TickRecord {
        let p = self.state.drift_ctrl.params();

        TickRecord {
            tick: self.state.num_ticks,
            phase,
            sequence: cmd.sequence,
            v_x_ms: vehicle.v_x_ms,
            v_y_ms: vehicle.v_y_ms,
            yaw_rate_rads: vehicle.yaw_rate_rads,
            slip_ratio: vehicle.slip_ratio,
            slip_angle_front_rad: vehicle.slip_angle_front_rad,
            slip_angle_rear_rad: vehicle.slip_angle_rear_rad,
            steer_rad: applied.steer_rad,
            throttle: applied.throttle,
            force_front_pred_n: p.tyre_front.lateral_force_n(vehicle.slip_angle_front_rad),
            force_rear_pred_n: p.tyre_rear.lateral_force_n(vehicle.slip_angle_rear_rad),
            force_front_meas_n: tyre::front_axle_force_n(
                p.mass_kg,
                vehicle.v_x_ms,
                vehicle.yaw_rate_rads,
                p.l_front_m,
                p.l_rear_m,
                applied.steer_rad
            ),
            force_rear_meas_n: tyre::rear_axle_force_n(
                p.mass_kg,
                vehicle.v_x_ms,
                vehicle.yaw_rate_rads,
                p.l_front_m,
                p.l_rear_m
            )
        }
    }
}
