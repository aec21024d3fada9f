use chrono::Utc;
use clap::{Parser, ValueEnum};
use hil_test_runner::config::{Config, ConfigLoader};
use hil_test_runner::error::{RunnerError, RunnerResult};
use hil_test_runner::orchestrator::select_cases;
use hil_test_runner::{flash, logging};
use hil_test_runner::{DeviceEnvironment, Instance, Orchestrator, RunOptions, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Hardware attached to ports A and (optionally) B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HardwareType {
    /// A single board
    Solo,
    /// Two boards wired to each other
    Dual,
    /// A pair on an eyore test fixture
    #[value(name = "eyore_test")]
    EyoreTest,
}

impl HardwareType {
    fn name(self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Dual => "dual",
            Self::EyoreTest => "eyore_test",
        }
    }

    fn is_paired(self) -> bool {
        self != Self::Solo
    }
}

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "test_runner",
    version,
    about = "Runs on-device test cases on one or two boards over serial."
)]
struct Args {
    /// Type of test hardware attached to serial ports A & (optionally) B
    #[arg(short = 't', long = "type", value_enum, default_value_t = HardwareType::Solo)]
    hardware: HardwareType,

    /// Serial port for device A
    #[arg(short = 'a', long)]
    aport: Option<String>,

    /// Serial port for device B (ignored if type is 'solo')
    #[arg(short = 'b', long)]
    bport: Option<String>,

    /// Baud rate of the test image console
    #[arg(long)]
    baud: Option<u32>,

    /// Don't flash the test binary image before running tests
    #[arg(short = 'n', long)]
    no_flash: bool,

    /// Display list of available test cases on a device
    #[arg(short, long)]
    list: bool,

    /// Verbose test runner debugging output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (overrides the standard search path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Optional list of test case numbers to run. By default, all tests are run.
    testcases: Vec<u32>,
}

fn load_config(args: &Args) -> RunnerResult<Config> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    if let Some(port) = &args.aport {
        config.serial.port_a = port.clone();
    }
    if let Some(port) = &args.bport {
        config.serial.port_b = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }
    config.validate()?;
    Ok(config)
}

/// Returns whether every executed case passed or was skipped.
fn run(args: Args) -> RunnerResult<bool> {
    let config = load_config(&args)?;
    logging::init_logging(&config.logging, args.verbose)?;
    debug!(?config, "configuration loaded");

    let paired = args.hardware.is_paired();
    if !args.no_flash {
        flash::flash_image(&config.serial.port_a, &config.flash, args.verbose)?;
        if paired {
            flash::flash_image(&config.serial.port_b, &config.flash, args.verbose)?;
        }
    }

    let timing = config.timing;
    let env_a = DeviceEnvironment::open(&config.serial.port_a, config.serial.baud, Instance::A, timing)?;
    let env_b = if paired {
        Some(DeviceEnvironment::open(
            &config.serial.port_b,
            config.serial.baud,
            Instance::B,
            timing,
        )?)
    } else {
        None
    };

    let options = RunOptions::new(&timing, args.verbose);
    let mut orchestrator = Orchestrator::new(env_a, env_b, options, std::io::stdout());
    let cases = orchestrator.discover()?;

    if args.list {
        orchestrator.list(&cases)?;
        return Ok(true);
    }

    let cases = select_cases(cases, &args.testcases);
    let started_at = Utc::now();
    let summary = orchestrator.run(&cases)?;

    if let Some(path) = &args.report {
        RunReport::new(&summary, args.hardware.name(), started_at, Utc::now()).write_to(path)?;
    }
    Ok(!summary.has_failures())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            println!("{e}");
            ExitCode::from(RunnerError::EXIT_CODE)
        }
    }
}
