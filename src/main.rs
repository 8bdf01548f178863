use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser};
use log::{LevelFilter, info, warn};
use tokio::io::BufReader;

use drivesh::config::{APP_NAME, Settings};
use drivesh::core::DriveFs;
use drivesh::core::error::ConfigError;
use drivesh::models::Address;
use drivesh::shell::Shell;
use drivesh::sync::MemoryConnector;

/// Browse a collaborative drive as a filesystem.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version)]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Share link of the home drive
    #[arg(long)]
    drive: Option<String>,
    /// Realtime transport endpoint
    #[arg(long)]
    websocket: Option<String>,
    /// Origin used to resolve relative links
    #[arg(long)]
    origin: Option<String>,
    /// JSON snapshot of documents to serve offline
    #[arg(long)]
    snapshot: Option<String>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if self.drive.is_some() {
            settings.drive = self.drive;
        }
        if self.websocket.is_some() {
            settings.websocket = self.websocket;
        }
        if self.origin.is_some() {
            settings.origin = self.origin;
        }
        if self.snapshot.is_some() {
            settings.snapshot = self.snapshot;
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    args.apply(&mut settings);

    let drive = settings.drive.clone().ok_or(ConfigError::MissingDrive)?;
    let snapshot = settings.snapshot.clone().ok_or(ConfigError::NoTransport)?;
    if let Some(websocket) = &settings.websocket {
        warn!("ignoring transport {}: serving snapshot {}", websocket, snapshot);
    }

    let connector = Arc::new(MemoryConnector::from_snapshot(Path::new(&snapshot))?);
    let fs = DriveFs::connect(connector, &Address::parse(&drive), &settings).await?;
    info!("{} ready at {}", APP_NAME, fs.get_path());

    let mut shell = Shell::new(fs, settings.prompt.clone(), std::io::stdout());
    shell.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
