use anyhow::Context as _;
use clap::Parser;
use log::{info, warn};
use tokio::io::AsyncBufReadExt as _;
use tokio::sync::mpsc;

mod clock;
mod config;
mod dashboard;
mod gate;
mod gateway;
mod manager;
mod messages;
mod reader;
mod tracker;
mod uid;

use messages::ControlCommand;
use uid::TagUid;

/// Relay RFID tag readings from a frame source to an HTTP or MQTT collector.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config_contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config))?;
    let app_config: config::AppConfig = toml::de::from_str(&config_contents)?;

    let timing = app_config.timing.clone().unwrap_or_default().resolve();
    let gateway = gateway::MessageGateway::new(app_config.gateway.clone());

    // Frames arrive as hex UID lines on stdin, one per inventory round; an
    // empty line reads as "no tag in field". Lines starting with `!` are
    // control commands (`!mode mqtt`, `!enable`, `!disable`, `!clear`).
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix('!') {
                match ControlCommand::parse(rest) {
                    Some(command) => {
                        if control_tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => warn!("ignoring unknown command: {line:?}"),
                }
                continue;
            }

            let frame = if line.is_empty() {
                Some(TagUid::ZERO)
            } else {
                TagUid::from_hex(line)
            };
            match frame {
                Some(frame_uid) => {
                    if frame_tx.send(frame_uid).is_err() {
                        break;
                    }
                }
                None => warn!("ignoring malformed frame: {line:?}"),
            }
        }
    });

    info!(
        "starting relay loop ({:?} transport)",
        app_config.gateway.mode
    );
    let core = manager::Manager::new(
        reader::FrameReader::new(frame_rx),
        dashboard::LogDashboard,
        gateway,
        control_rx,
        timing,
    );
    core.run_loop().await
}
