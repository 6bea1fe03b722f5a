//! signin-bridge demo host.
//!
//! Plays the part of the hosting application: it attaches a coordinator,
//! drives it through a simulated sign-in SDK, forwards UI results the way an
//! activity would and prints the final result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use signin_bridge::config::Config;
use signin_bridge::coordinator::HostId;
use signin_bridge::platform::simulated::{SimulatedGames, SimulatedPlatform, demo_account};
use signin_bridge::platform::{CapabilityRegistry, SignInOutcome};
use signin_bridge::{SignInClient, TokenResult, logging};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
    silent: bool,
    connected: bool,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut cli = CliArgs {
        config_path: PathBuf::from("signin-bridge.toml"),
        silent: false,
        connected: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    cli.config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--silent" | "-s" => cli.silent = true,
            "--connected" => cli.connected = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("signin-bridge {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    cli
}

fn print_usage() {
    println!(
        "\
signin-bridge {version} -- sign-in bridge demo host

USAGE:
    signin-bridge [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: signin-bridge.toml]
    -s, --silent           Sign in silently instead of showing the sign-in UI
        --connected        Simulate a user who is already signed in
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    SIGNIN_CONFIG          Alternative to --config flag
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();

    // Allow SIGNIN_CONFIG env var as alternative to --config flag
    let config_path = std::env::var("SIGNIN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    // 2. Load configuration
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    logging::init_tracing(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        silent = cli.silent,
        "Starting signin-bridge demo host"
    );

    // 4. Simulated SDK and capabilities
    let platform = SimulatedPlatform::new();
    if cli.connected {
        platform.set_connected(true);
        platform.set_silent_outcome(SignInOutcome::success(demo_account()));
    }
    let capabilities = Arc::new(CapabilityRegistry::new());
    capabilities.register(Arc::new(SimulatedGames::default()));

    // 5. Client and host lifecycle
    let client = SignInClient::new(
        HostId::new(config.bridge.host_id.clone()),
        Arc::new(platform.clone()),
        capabilities,
        config.bridge.ui_request_code,
    );
    client.configure(config.sign_in.clone());

    // The host is not active yet, so this parks the request.
    let pending = if cli.silent {
        client.sign_in_silently()
    } else {
        client.sign_in()
    };
    let coordinator = client.coordinator();
    tracing::info!(state = %coordinator.state(), "Sign-in requested");

    coordinator.on_host_started();
    coordinator.on_host_active();

    // 6. Forward UI results the way the host activity would
    let forwarder = {
        let platform = platform.clone();
        let coordinator = Arc::clone(&coordinator);
        tokio::task::spawn_blocking(move || {
            while let Some(code) = platform.take_ui_launch() {
                tracing::info!(code, "Sign-in UI shown, returning its result");
                coordinator.on_activity_result(code, platform.ui_outcome());
            }
        })
    };
    forwarder.await?;

    // 7. Wait for the result
    let result: TokenResult = match tokio::time::timeout(config.wait_timeout(), pending.wait_async()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?config.wait_timeout(), "Timed out waiting for sign-in result");
            pending.wait_timeout(std::time::Duration::ZERO)
        }
    };

    tracing::info!(result = %result, "Sign-in finished");
    println!("{}", serde_json::to_string_pretty(&result)?);

    client.disconnect();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
