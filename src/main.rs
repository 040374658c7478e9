mod appium;
mod config;
mod error;
mod instagram;
mod outcome;
mod selector;
mod session;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

use appium::AppiumSession;
use config::{
    Credentials, SessionSettings, Timings, DEFAULT_DEVICE_NAME, DEFAULT_PLATFORM_VERSION,
    DEFAULT_SERVER_URL,
};
use outcome::LoginOutcome;
use session::DeviceSession;
use utils::{log_error, log_info, setup_dir};

/// Logs into the Instagram Android app through an Appium server.
/// Credentials come from IG_USERNAME and IG_PASSWORD.
#[derive(Parser, Debug)]
#[command(name = "igdroid", version)]
struct Cli {
    /// Appium server base URL
    #[arg(long, env = "APPIUM_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[arg(long, env = "ANDROID_DEVICE_NAME", default_value = DEFAULT_DEVICE_NAME)]
    device_name: String,

    #[arg(long, env = "ANDROID_PLATFORM_VERSION", default_value = DEFAULT_PLATFORM_VERSION)]
    platform_version: String,

    /// Where outcome screenshots are written
    #[arg(long, env = "IG_SCREENSHOT_DIR", default_value = ".")]
    screenshot_dir: PathBuf,

    /// Cut every wait to a tenth (warm emulator)
    #[arg(long)]
    fast: bool,
}

impl Cli {
    fn settings(&self) -> SessionSettings {
        SessionSettings {
            server_url: self.server.clone(),
            device_name: self.device_name.clone(),
            platform_version: self.platform_version.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
            ..SessionSettings::default()
        }
    }

    fn timings(&self) -> Timings {
        if self.fast {
            Timings::default().scaled(10)
        } else {
            Timings::default()
        }
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    println!("{}", "======================================".cyan().bold());
    println!("{}", "      IGDROID - APPIUM LOGIN BOT      ".cyan().bold());
    println!("{}", "======================================".cyan().bold());
    println!();

    match execute(&cli.settings(), &cli.timings(), Credentials::from_env, AppiumSession::connect) {
        Ok(outcome) => {
            if outcome == LoginOutcome::Success {
                log_info(&format!("Result: {}", outcome.to_string().green().bold()));
            } else {
                log_error(&format!("Result: {}", outcome));
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            log_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Credentials are loaded before `connect` is ever called.
fn execute<S, L, C>(
    settings: &SessionSettings,
    timings: &Timings,
    load: L,
    connect: C,
) -> Result<LoginOutcome>
where
    S: DeviceSession,
    L: FnOnce() -> error::Result<Credentials>,
    C: FnOnce(&SessionSettings) -> error::Result<S>,
{
    let credentials = load().context("cannot start without credentials")?;
    log_info(&format!("Account: {}", credentials.redacted_username()));

    setup_dir(&settings.screenshot_dir).context("cannot prepare screenshot directory")?;
    let session = connect(settings).context("session connect failure")?;

    Ok(instagram::run(&session, &credentials, timings))
}
