//! Drift controller executable entry point.
//!
//! # Architecture
//!
//! The executable:
//!
//!     - Starts a session and the logger
//!     - Loads and validates all parameters, before any socket is opened
//!     - Binds the simulator link
//!     - Runs the handshake and drift loop until the tick budget, a time limit, Ctrl-C, or too
//!       many failed ticks
//!
//! Parameters are read from `$DRIFT_SW_ROOT/params` unless `--root` or `--params-dir` is given.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use drift_lib::{
    drift_ctrl,
    params::ExecParams,
    run::{CancelToken, RunContext},
    sim_client::SimClient
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    params::{self, LoadError},
    session::Session
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Closed loop drift controller for the Speed Dreams simulator.
#[derive(Debug, StructOpt)]
#[structopt(name = "drift_exec")]
struct Opt {
    /// Software root to use instead of $DRIFT_SW_ROOT.
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// Directory containing the parameter files. Defaults to the params directory of the
    /// software root.
    #[structopt(long, parse(from_os_str))]
    params_dir: Option<PathBuf>,

    /// Number of driving ticks to run, overriding drift_exec.toml.
    #[structopt(long)]
    ticks: Option<u64>,

    /// Log every tick.
    #[structopt(short, long)]
    verbose: bool
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = match opt.root {
        Some(ref root) => Session::in_root(root, "drift_exec", "sessions"),
        None => Session::new("drift_exec", "sessions")
    }.wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if opt.verbose { LevelFilter::Trace } else { LevelFilter::Debug };
    logger_init(level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Speed Dreams Drift Controller\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params_dir = opt.params_dir.clone()
        .or_else(|| opt.root.as_ref().map(|r| r.join("params")));

    let net_params: NetParams = load(&params_dir, "net.toml")
        .wrap_err("Could not load net params")?;
    net_params.validate()
        .wrap_err("Invalid net params")?;

    let drift_params: drift_ctrl::Params = load(&params_dir, "drift_ctrl.toml")
        .wrap_err("Could not load DriftCtrl params")?;

    let mut exec_params: ExecParams = load(&params_dir, "drift_exec.toml")
        .wrap_err("Could not load exec params")?;
    if let Some(ticks) = opt.ticks {
        exec_params.max_ticks = ticks;
    }

    info!("Parameters loaded");

    let archiver = if exec_params.archive {
        Archiver::from_path(&session, "run/ticks.csv")
            .map_err(|e| eyre!("{}", e))
            .wrap_err("Failed to create the tick archive")?
    }
    else {
        Archiver::default()
    };

    // Nothing is sent until every parameter set has been checked
    drift_params.validate().wrap_err("Invalid DriftCtrl params")?;
    exec_params.validate().wrap_err("Invalid exec params")?;

    // ---- INITIALISE NETWORK ----

    let client = SimClient::new(&net_params)
        .wrap_err("Failed to initialise the SimClient")?;
    info!(
        "SimClient initialised, commands to {}, telemetry on {}",
        net_params.command_endpoint,
        net_params.telemetry_bind
    );

    let cancel = CancelToken::new();
    let mut ctx = RunContext::new(client, drift_params, exec_params, cancel.clone())
        .wrap_err("Failed to create the run")?
        .with_archiver(archiver);

    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, stopping after the current tick");
            cancel.cancel();
        }).wrap_err("Failed to set the Ctrl-C handler")?;
    }

    // ---- MAIN LOOP ----

    match ctx.run() {
        Ok(summary) => {
            info!(
                "{} ticks completed ({} datagrams sent, {} failed ticks) in {:.2} s, final phase {}",
                summary.num_ticks,
                summary.num_sent,
                summary.num_failures,
                summary.elapsed_s,
                summary.final_phase
            );
            Ok(())
        },
        Err(e) => {
            error!("Run aborted: {}", e);
            Err(Report::new(e).wrap_err("Run aborted"))
        }
    }
}

/// Load a parameter file from the given directory, or from the software root if there is none.
fn load<P: DeserializeOwned>(dir: &Option<PathBuf>, file: &str) -> Result<P, LoadError> {
    match dir {
        Some(d) => params::load_from_dir(d, file),
        None => params::load(file)
    }
}
