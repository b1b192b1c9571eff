//! Console front end: every stdin line is the new content of the search
//! field, except for a few commands.
//!
//! ```text
//! :select N      accept suggestion N
//! :highlight N   move the cursor to suggestion N
//! :reload        re-read settings.json and connections.json
//! :quit
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use postgis_search::console::ConsoleHost;
use postgis_search::geometry::Rect;
use postgis_search::{run, HostEvent, SearchSession, Storage};

#[derive(Parser, Debug)]
#[command(name = "postgis-search", version, about = "Search a PostGIS table as you type")]
struct CliArgs {
    /// Directory holding settings.json and connections.json
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Display CRS of the simulated map
    #[arg(long, default_value = "EPSG:3857")]
    crs: String,

    /// Initial map extent as xmin,ymin,xmax,ymax
    #[arg(
        long,
        default_value = "-20000,-20000,20000,20000",
        value_parser = parse_extent,
        allow_hyphen_values = true
    )]
    extent: Rect,

    /// Initial scale denominator
    #[arg(long, default_value_t = 50_000.0)]
    scale: f64,
}

fn parse_extent(raw: &str) -> Result<Rect, String> {
    Rect::from_bbox_str(raw).ok_or_else(|| format!("'{}' is not xmin,ymin,xmax,ymax", raw))
}

fn parse_line(line: &str, storage: &Storage) -> Option<HostEvent> {
    let (command, arg) = match line.strip_prefix(':') {
        Some(rest) => rest.split_once(' ').unwrap_or((rest, "")),
        None => return Some(HostEvent::TextEdited(line.to_string())),
    };
    match command {
        "select" => arg.trim().parse().ok().map(HostEvent::Selected),
        "highlight" => arg.trim().parse().ok().map(HostEvent::Highlighted),
        "reload" => match (storage.load_settings(), storage.load_connections()) {
            (Ok(settings), Ok(connections)) => Some(HostEvent::Reconfigure {
                settings,
                connections,
            }),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("cannot reload: {}", e);
                None
            }
        },
        "quit" => Some(HostEvent::Shutdown),
        other => {
            eprintln!("unknown command :{}", other);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,postgis_search=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    let storage = Storage::new(&args.config_dir);
    let settings = storage
        .load_settings()
        .with_context(|| format!("reading settings from {}", args.config_dir.display()))?;
    let connections = storage
        .load_connections()
        .with_context(|| format!("reading connections from {}", args.config_dir.display()))?;

    let mut host = ConsoleHost::new(args.extent, args.scale, args.crs);
    let mut session = SearchSession::postgres();
    session
        .reconfigure(&settings, &connections, &mut host, Instant::now())
        .await;

    let (tx, rx) = mpsc::channel(64);
    let reader_storage = storage.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(event) = parse_line(&line, &reader_storage) {
                let quit = matches!(event, HostEvent::Shutdown);
                if tx.send(event).await.is_err() || quit {
                    break;
                }
            }
        }
    });

    run(&mut session, &mut host, rx).await;
    Ok(())
}
