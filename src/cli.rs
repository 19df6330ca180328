use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{self, Config};
use crate::core::matcher::Matcher;
use crate::mqtt;
use crate::pipeline::ArtUpdater;
use crate::server::{self, AppContext};
use crate::sources::itunes::ItunesClient;
use crate::state::ArtStore;

#[derive(Parser)]
#[command(
    name = "albumart-bridge",
    about = "Serves album art for the track announced on an MQTT now-playing topic"
)]
pub struct Cli {
    /// TOML config file (default: ~/.config/albumart-bridge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to the player topic and serve artwork over HTTP (default)
    Serve,
    /// Run a single artwork lookup
    Lookup {
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Where to write the image
        #[arg(long, short, default_value = "albumart.jpg")]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(config::default_config_path);
    let cfg = config::load_config(&path)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(cfg),
        Commands::Lookup {
            artist,
            title,
            album,
            output,
        } => cmd_lookup(
            cfg,
            artist.as_deref(),
            title.as_deref(),
            album.as_deref(),
            &output,
        ),
    }
}

fn cmd_serve(cfg: Config) -> Result<()> {
    if !cfg.mqtt.is_configured() {
        bail!("MQTT_HOST is required. Set it via environment variable or .env file.");
    }

    let store = Arc::new(ArtStore::open(cfg.http.albumart_path())?);
    let ctx = AppContext {
        store: store.clone(),
        topic: cfg.mqtt.topic.clone(),
    };

    let mqtt_cfg = cfg.mqtt.clone();
    let matching = cfg.matching.clone();
    let worker = std::thread::Builder::new()
        .name("mqtt".to_string())
        .spawn(move || -> Result<()> {
            let client = ItunesClient::new()?;
            let updater = ArtUpdater::new(Matcher::new(client, matching), store);
            mqtt::run_subscriber(&mqtt_cfg, &updater)
        })
        .context("cannot start MQTT worker")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    let result = runtime.block_on(async move {
        let worker = tokio::task::spawn_blocking(move || worker.join());
        tokio::select! {
            res = server::run(&cfg.http.host, cfg.http.port, ctx) => res,
            joined = worker => match joined {
                Ok(Ok(res)) => res.context("MQTT worker stopped"),
                Ok(Err(_)) => Err(anyhow!("MQTT worker panicked")),
                Err(e) => Err(e).context("MQTT worker join failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                Ok(())
            }
        }
    });

    // The MQTT thread never finishes on its own; don't wait for its join task.
    runtime.shutdown_background();
    result
}

fn cmd_lookup(
    cfg: Config,
    artist: Option<&str>,
    title: Option<&str>,
    album: Option<&str>,
    output: &Path,
) -> Result<()> {
    let client = ItunesClient::new()?;
    let matcher = Matcher::new(client, cfg.matching);

    let Some(best) = matcher.best_candidate(artist, title, album) else {
        println!("No matching artwork found.");
        return Ok(());
    };

    println!(
        "Best match ({:.3}): {} - {} [{}]",
        best.score,
        best.candidate.artist_name.as_deref().unwrap_or("?"),
        best.candidate.scoring_title().unwrap_or("?"),
        best.candidate.collection_name.as_deref().unwrap_or("?"),
    );

    let image = matcher
        .fetch_artwork(&best.candidate)
        .context("artwork download failed")?;
    std::fs::write(output, &image.data)
        .with_context(|| format!("cannot write {}", output.display()))?;
    println!(
        "Saved {} bytes ({}) to {}",
        image.data.len(),
        image.content_type,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["albumart-bridge"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_lookup_args() {
        let cli = Cli::try_parse_from([
            "albumart-bridge",
            "lookup",
            "--artist",
            "PALESKIN",
            "--title",
            "Absence Of You",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Some(Commands::Lookup {
                artist,
                title,
                album,
                output,
            }) => {
                assert_eq!(artist.as_deref(), Some("PALESKIN"));
                assert_eq!(title.as_deref(), Some("Absence Of You"));
                assert!(album.is_none());
                assert_eq!(output, PathBuf::from("albumart.jpg"));
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn test_serve_returns_when_http_bind_fails() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut cfg = Config::default();
        cfg.mqtt.host = Some("127.0.0.1".to_string());
        cfg.mqtt.port = 1;
        cfg.http.host = "127.0.0.1".to_string();
        cfg.http.port = port;
        cfg.http.static_dir = dir.path().to_path_buf();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(cmd_serve(cfg).map_err(|e| e.to_string()));
        });

        let res = rx
            .recv_timeout(std::time::Duration::from_secs(15))
            .expect("serve did not return after the HTTP bind failed");
        let err = res.unwrap_err();
        assert!(err.contains("cannot bind"), "unexpected error: {err}");
        drop(taken);
    }

    #[test]
    fn test_serve_requires_mqtt_host() {
        let err = cmd_serve(Config::default()).unwrap_err();
        assert!(err.to_string().contains("MQTT_HOST"));
    }
}
