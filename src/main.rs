use clap::Parser;
use multi_serial_scanner::config::{ResolvedConfig, Settings, DEFAULT_OPTIONS_PATH};
use multi_serial_scanner::{launcher, scanner, AppResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Home Assistant add-on that scans serial devices concurrently and bridges them to MQTT.",
    long_about = "Resolves add-on options into an environment contract, verifies the scan \
program's entry point, and either runs the scan engine in-process or hands off to an \
external program with the resolved environment."
)]
struct Args {
    /// Run the scan engine directly from the current environment, skipping
    /// options resolution. This is the mode a handed-off child runs in.
    #[arg(long)]
    run: bool,

    /// Path to the supervisor-provided options document.
    #[arg(long, default_value = DEFAULT_OPTIONS_PATH)]
    options: PathBuf,

    /// Hand off to an external entry point instead of scanning in-process.
    #[arg(long)]
    entrypoint: Option<PathBuf>,

    /// Interpreter for the entry point; pass an empty string to execute it
    /// directly.
    #[arg(long, default_value = "python3")]
    interpreter: String,

    /// Device directory enumerated during preflight.
    #[arg(long, default_value = "/dev")]
    device_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> AppResult<ExitCode> {
    info!("Multi Serial Scanner v{}", env!("CARGO_PKG_VERSION"));

    if args.run {
        scanner::run(Settings::from_env()).await;
        return Ok(ExitCode::SUCCESS);
    }

    let resolved = ResolvedConfig::load(&args.options)?;
    resolved.log_summary();
    resolved.export();

    launcher::inspect_device_dir(&args.device_dir);

    match args.entrypoint {
        Some(entrypoint) => {
            launcher::ensure_entrypoint(&entrypoint)?;
            let command = launcher::build_command(&args.interpreter, &entrypoint);
            // On Unix this replaces the process and only returns on failure.
            let code = launcher::hand_off(command)?;
            Ok(forwarded_exit_code(code))
        }
        None => {
            // Single-binary deployment: the engine consumes the environment
            // the resolver just exported, same contract as a real child.
            scanner::run(Settings::from_env()).await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn forwarded_exit_code(code: i32) -> ExitCode {
    u8::try_from(code)
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE)
}
