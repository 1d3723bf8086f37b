//! Drift control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::Serialize;

// Internal
use super::*;
use crate::est::VehicleState;
use crate::params::ConfigError;
use comms_if::sim::command::{Command, PacketType};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct DriftCtrl {
    params: Params,

    initialised: bool,

    phase: PhaseMachine,

    /// Controller objects used to calculate the demands
    controllers: DriftControllers,

    output: OutputData,
    report: StatusReport
}

/// Input data to the module
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Time since the run started.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Estimated state from this tick's telemetry, `None` during the handshake.
    pub state: Option<VehicleState>
}

/// The command to send on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    pub packet_type: PacketType,

    /// Units: radians
    pub steer_rad: f64,

    pub throttle: f64
}

/// The status report containing the phase and controller monitoring quantities.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub phase: ControllerPhase,

    /// The phase entered on this cycle, if any.
    pub transition: Option<ControllerPhase>,

    pub dwell_count: u32,

    /// Throttle law output before limiting.
    pub throttle_raw: f64,

    pub throttle_limited: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriftCtrl {
    fn default() -> Self {
        let params = Params::default();

        Self {
            initialised: false,
            phase: PhaseMachine::new(&params),
            controllers: DriftControllers::new(&params),
            output: OutputData::neutral(),
            report: StatusReport::default(),
            params
        }
    }
}

impl DriftCtrl {
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase.phase()
    }

    /// The most recently computed output.
    pub fn output(&self) -> OutputData {
        self.output
    }
}

impl State for DriftCtrl {
    type InitData = Params;
    type InitError = ConfigError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriftCtrlError;

    /// Initialise the module with already loaded parameters, which are validated here.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.phase = PhaseMachine::new(&init_data);
        self.controllers = DriftControllers::new(&init_data);
        self.output = OutputData::neutral();
        self.report = StatusReport::default();
        self.params = init_data;
        self.initialised = true;

        Ok(())
    }

    /// Perform cyclic processing of drift control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if !self.initialised {
            return Err(DriftCtrlError::NotInit)
        }

        // Clear the status report
        self.report = StatusReport::default();

        let transition = match (self.phase.phase(), input_data.state) {
            (ControllerPhase::Handshake, _) => {
                self.phase.update_handshake(input_data.elapsed_s)
            },
            (_, Some(state)) => self.phase.update_tick(state.v_x_ms),
            (phase, None) => return Err(DriftCtrlError::NoVehicleState(phase))
        };

        if let Some(phase) = transition {
            info!("DriftCtrl entered {} phase", phase);
        }

        self.output = match self.phase.phase() {
            ControllerPhase::Handshake => OutputData::neutral(),
            phase => {
                let throttle = match (phase, self.params.launch_throttle, input_data.state) {
                    (ControllerPhase::Launch, Some(t), _) => t,
                    (_, _, Some(state)) => {
                        let demand = self.controllers.throttle.get(state.v_x_ms);
                        self.report.throttle_raw = demand.raw;
                        self.report.throttle_limited = demand.limited;
                        demand.value
                    },
                    // First command after the handshake, nothing measured yet
                    (_, _, None) => THROTTLE_MIN
                };

                let steer_rad = match (phase, input_data.state) {
                    (ControllerPhase::Drifting, Some(state)) => {
                        self.controllers.steer.get(state.v_y_ms, state.yaw_rate_rads)
                    },
                    _ => 0.0
                };

                OutputData {
                    packet_type: PacketType::Drive,
                    steer_rad,
                    throttle
                }
            }
        };

        self.report.phase = self.phase.phase();
        self.report.transition = transition;
        self.report.dwell_count = self.phase.dwell_count();

        trace!(
            "DriftCtrl output: steer {:.4} rad, throttle {:.3}",
            self.output.steer_rad,
            self.output.throttle
        );

        Ok((self.output, self.report))
    }
}

impl OutputData {
    /// Neutral output sent during the handshake and after failed ticks.
    pub fn neutral() -> Self {
        Self {
            packet_type: PacketType::Handshake,
            steer_rad: 0.0,
            throttle: 0.0
        }
    }

    /// Build the wire command for this output. Steering goes out in degrees.
    pub fn to_command(&self, sequence: u8) -> Command {
        match self.packet_type {
            PacketType::Handshake => Command::neutral(sequence),
            PacketType::Drive => Command::drive(
                self.steer_rad.to_degrees() as f32,
                self.throttle as f32,
                sequence
            )
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn state(v_x_ms: f64, v_y_ms: f64, yaw_rate_rads: f64) -> Option<VehicleState> {
        Some(VehicleState {
            v_x_ms,
            v_y_ms,
            yaw_rate_rads,
            ..Default::default()
        })
    }

    fn init(params: Params) -> DriftCtrl {
        let mut ctrl = DriftCtrl::default();
        ctrl.init(params).unwrap();
        ctrl
    }

    #[test]
    fn test_not_init() {
        let mut ctrl = DriftCtrl::default();
        assert_eq!(
            ctrl.proc(&InputData::default()).unwrap_err(),
            DriftCtrlError::NotInit
        );
    }

    #[test]
    fn test_init_rejects_invalid() {
        let mut ctrl = DriftCtrl::default();
        let params = Params { mass_kg: 0.0, ..Params::default() };
        assert!(ctrl.init(params).is_err());
    }

    #[test]
    fn test_full_sequence() {
        let mut ctrl = init(Params {
            handshake_warmup_s: 1.0,
            launch_throttle: Some(0.4),
            dwell_ticks: 2,
            ..Params::default()
        });

        // Handshake
        let (out, report) = ctrl.proc(&InputData { elapsed_s: 0.5, state: None }).unwrap();
        assert_eq!(out, OutputData::neutral());
        assert_eq!(report.phase, ControllerPhase::Handshake);

        // First drive command uses the fixed launch throttle
        let (out, report) = ctrl.proc(&InputData { elapsed_s: 1.0, state: None }).unwrap();
        assert_eq!(report.transition, Some(ControllerPhase::Launch));
        assert_eq!(out.packet_type, PacketType::Drive);
        assert_eq!(out.throttle, 0.4);
        assert_eq!(out.steer_rad, 0.0);

        let (out, _) = ctrl.proc(&InputData { elapsed_s: 1.1, state: state(5.0, 0.0, 0.0) })
            .unwrap();
        assert_eq!(out.throttle, 0.4);

        // Trigger, law takes over the throttle but steering stays neutral
        let (out, report) = ctrl.proc(&InputData { elapsed_s: 1.2, state: state(13.9, 0.0, 0.0) })
            .unwrap();
        assert_eq!(report.transition, Some(ControllerPhase::Triggered));
        assert_abs_diff_eq!(out.throttle, 1.3 * 0.1, epsilon = 1e-9);
        assert_eq!(out.steer_rad, 0.0);

        let (_, report) = ctrl.proc(&InputData { elapsed_s: 1.3, state: state(13.9, 0.0, 0.0) })
            .unwrap();
        assert_eq!(report.phase, ControllerPhase::Triggered);
        assert_eq!(report.dwell_count, 1);

        // Drifting
        let (out, report) = ctrl.proc(
            &InputData { elapsed_s: 1.4, state: state(14.0, -7.8594, 0.5049) }
        ).unwrap();
        assert_eq!(report.transition, Some(ControllerPhase::Drifting));
        assert_abs_diff_eq!(out.steer_rad, -0.11, epsilon = 1e-12);
        assert_abs_diff_eq!(out.throttle, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_state() {
        let mut ctrl = init(Params { handshake_warmup_s: 0.0, ..Params::default() });
        ctrl.proc(&InputData { elapsed_s: 0.0, state: None }).unwrap();
        assert_eq!(
            ctrl.proc(&InputData { elapsed_s: 0.1, state: None }).unwrap_err(),
            DriftCtrlError::NoVehicleState(ControllerPhase::Launch)
        );
    }

    #[test]
    fn test_to_command() {
        let out = OutputData {
            packet_type: PacketType::Drive,
            steer_rad: std::f64::consts::FRAC_PI_4,
            throttle: 0.5
        };
        let cmd = out.to_command(9);
        assert_abs_diff_eq!(cmd.steer_deg, 45.0, epsilon = 1e-4);
        assert_eq!(cmd.throttle, 0.5);
        assert_eq!(cmd.sequence, 9);

        assert_eq!(OutputData::neutral().to_command(4), Command::neutral(4));
    }
}
