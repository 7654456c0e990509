use std::path::PathBuf;

use clap::Parser;
use rulevision_lib::config::ClientConfig;
use rulevision_lib::RunOptions;

#[derive(Parser, Debug)]
#[command(name = "rulevision")]
#[command(about = "Terminal client for the RuleVision monitoring dashboard")]
#[command(version)]
struct Cli {
    /// Base URL of the monitoring server
    #[arg(short, long, env = "RULEVISION_SERVER")]
    server: Option<String>,

    /// Forget completed onboarding and start from the intro screen
    #[arg(long)]
    reset: bool,

    /// Answer the camera permission prompt with a denial
    #[arg(long)]
    deny_camera: bool,

    /// Answer the notification permission prompt with a denial
    #[arg(long)]
    deny_notifications: bool,

    /// Include base64 preview frames in printed telemetry
    #[arg(long)]
    with_frames: bool,

    /// Settings file location
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }
    config.debug |= cli.debug;

    let options = RunOptions {
        reset: cli.reset,
        grant_camera: !cli.deny_camera,
        grant_notifications: !cli.deny_notifications,
        with_frames: cli.with_frames,
    };

    rulevision_lib::run(config, options).await
}
