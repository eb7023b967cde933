mod config;
mod gallery;
mod layout;
mod models;
mod scanner;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use config::Config;
use gallery::{commands, Action, Arranger, Command, GallerySession, GalleryState, View};
use layout::{wrap_rows, FirstPick, PickSource, RandomPick};
use scanner::{ListConfig, MediaLister};

#[derive(Parser)]
#[command(name = "folio", version, about = "Image/video portfolio gallery server")]
struct Cli {
    /// Config file (default: XDG config dir/folio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the media root directory
    #[arg(long, global = true)]
    media_root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the gallery API and media files (default)
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// List and pack one collection, printing the rows
    Pack {
        /// Collection (tab) to pack; defaults to the configured default
        collection: Option<String>,

        /// Seed for shuffle and tie-breaking
        #[arg(long)]
        seed: Option<u64>,

        /// Keep listing order and take the first candidate on ties
        #[arg(long, default_value_t = false)]
        no_shuffle: bool,
    },

    /// Browse the gallery interactively with line commands on stdin
    Browse {
        /// Seed for shuffle and tie-breaking
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the configured tabs
    Tabs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("folio=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = cli.media_root {
        config.media_root = root;
    }

    match cli.cmd.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            server::serve(config).await
        }
        Commands::Pack {
            collection,
            seed,
            no_shuffle,
        } => {
            let collection = collection.unwrap_or_else(|| config.default_collection.clone());
            if no_shuffle {
                pack_collection(&config, &collection, FirstPick).await
            } else {
                pack_collection(&config, &collection, RandomPick::from_seed(seed)).await
            }
        }
        Commands::Browse { seed } => browse(&config, seed).await,
        Commands::Tabs => {
            for tab in &config.tabs {
                println!("{:<12} {}", tab.id, tab.label);
            }
            Ok(())
        }
    }
}

/// Runs one gallery load for `collection` and prints the rendered rows.
async fn pack_collection<P: PickSource>(config: &Config, collection: &str, picker: P) -> Result<()> {
    let lister = MediaLister::new(ListConfig::from(config));
    let arranger = Arranger::new(config.packer(), picker);
    let mut session = GallerySession::new(lister, arranger, collection);

    session.dispatch(Action::EnterGallery);
    session.settle().await;

    let state = session.state();
    if let Some(e) = &state.last_error {
        bail!("Failed to list {}: {}", collection, e);
    }
    info!("Packed {} items from {}", state.displayed.len(), collection);

    print_rows(state, config);
    Ok(())
}

/// Reads commands from stdin and applies them to one gallery session until
/// `quit` or end of input.
async fn browse(config: &Config, seed: Option<u64>) -> Result<()> {
    let lister = MediaLister::new(ListConfig::from(config));
    let arranger = Arranger::new(config.packer(), RandomPick::from_seed(seed));
    let mut session = GallerySession::new(lister, arranger, &config.default_collection);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", commands::HELP);
    render(session.state(), config);

    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Show) => {}
            Ok(Command::Dispatch(Action::SelectTab(id))) if config.tab(&id).is_none() => {
                warn!("Unknown tab {}", id);
                continue;
            }
            Ok(Command::Dispatch(action)) => session.dispatch(action),
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        }

        if session.state().is_loading() {
            session.settle().await;
        }
        // Background tabs may have finished while we waited
        session.pump();
        render(session.state(), config);
    }
    Ok(())
}

fn render(state: &GalleryState, config: &Config) {
    match state.view {
        View::Home => {
            let labels: Vec<&str> = config.tabs.iter().map(|t| t.label.as_str()).collect();
            println!("home: {}", labels.join(" / "));
        }
        View::Gallery => {
            let label = config
                .tab(&state.selected_tab)
                .map_or(state.selected_tab.as_str(), |t| t.label.as_str());
            println!("{} ({} items)", label, state.displayed.len());
            print_rows(state, config);
        }
    }

    if let Some(media) = &state.selected_media {
        println!(
            "open #{} {} [{}] {}x{} ({:.2}:1) {}",
            media.id,
            media.display_name(),
            if media.is_video() { "video" } else { "image" },
            media.width,
            media.height,
            media.aspect_ratio(),
            media.src
        );
    }
    if let Some(e) = &state.last_error {
        println!("error: {}", e);
    }
}

fn print_rows(state: &GalleryState, config: &Config) {
    for row in wrap_rows(&state.displayed, config.row_width, config.item_gap) {
        let names: Vec<String> = row
            .items
            .iter()
            .map(|i| format!("#{} {}", i.id, i.display_name()))
            .collect();
        println!("{:>3} [{:>4}] {}", row.row_index, row.width, names.join(" | "));
    }
}
