//! Partify - a collaborative queue for a shared music player
//!
//! Listeners queue tracks, vote on what is queued, and every played entry
//! ends up in the history with its votes attached.

#![allow(dead_code)]

mod config;
mod core;
mod db;
mod error;
mod models;
mod serializers;
mod stores;
mod utils;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Paths, ServerConfig};
use crate::core::Jukebox;
use crate::db::{run_migrations, setup_sqlite, DbEngine};
use crate::models::{TrackMetadata, User, VoteDirection, VoteTarget};
use crate::utils::dates::timestamp_to_relative;

/// Partify - collaborative music queue
#[derive(Parser, Debug)]
#[command(name = "partify")]
#[command(version = "0.3.0")]
#[command(about = "A collaborative queue for a shared music player")]
struct Args {
    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Path to config directory
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the config directory, settings file and database
    Init,

    /// Register a listener
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Privilege bitmask
        #[arg(long)]
        privs: Option<i64>,
    },

    /// Put a track at the end of the queue
    Enqueue {
        /// Catalog URL, e.g. spotify:track:...
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Length in seconds
        #[arg(long)]
        length: Option<i64>,
        #[arg(long)]
        date: Option<String>,
        /// Backend slot id, if the track is already in the player's playlist
        #[arg(long)]
        slot: Option<i64>,
        #[command(flatten)]
        login: Login,
    },

    /// Show the queue in playback order
    Queue {
        #[arg(long)]
        json: bool,
    },

    /// Vote on a queue or history entry
    Vote {
        entry: i64,
        #[arg(long, value_enum)]
        direction: Direction,
        /// Vote on a history entry instead of a queue entry
        #[arg(long)]
        history: bool,
        #[command(flatten)]
        login: Login,
    },

    /// Mark a queue entry as played
    Play {
        /// Queue entry id
        entry: Option<i64>,
        /// Backend slot id that started playing
        #[arg(long, conflicts_with = "entry")]
        slot: Option<i64>,
    },

    /// List played tracks, newest first
    History {
        /// Only plays of this catalog URL
        #[arg(long)]
        track: Option<String>,
        /// Only plays queued by this username
        #[arg(long, conflicts_with = "track")]
        user: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Most played tracks and most active listeners
    Stats {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Move a queue entry to a new playback priority
    Reorder { entry: i64, priority: i64 },

    /// Print the effective settings
    Config,
}

#[derive(clap::Args, Debug)]
struct Login {
    /// Act as this user; anonymous when omitted
    #[arg(long, requires = "password")]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Up,
    Down,
    Neutral,
}

impl From<Direction> for VoteDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => VoteDirection::Up,
            Direction::Down => VoteDirection::Down,
            Direction::Neutral => VoteDirection::Neutral,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("{},sqlx=warn", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let paths = Paths::init(args.config)?;
    info!("Config directory: {:?}", paths.config_dir());

    if let Command::Config = args.command {
        let config = ServerConfig::global();
        println!("{}", serde_json::to_string_pretty(&*config.read())?);
        return Ok(());
    }

    if let Command::Init = args.command {
        return init(&paths).await;
    }

    let jukebox = open_jukebox().await?;
    run(args.command, &jukebox).await
}

async fn init(paths: &Paths) -> Result<()> {
    let settings_path = paths.settings_path();
    if settings_path.exists() {
        info!("Keeping existing settings at {}", settings_path.display());
    } else {
        ServerConfig::default().save()?;
        info!("Wrote default settings to {}", settings_path.display());
    }

    open_jukebox().await?;
    println!("Initialized {}", paths.config_dir().display());
    Ok(())
}

async fn open_jukebox() -> Result<Jukebox> {
    let strategy = {
        let config = ServerConfig::global();
        let config = config.read();
        config.validate()?;
        config.priority_strategy
    };

    setup_sqlite().await?;
    let engine = DbEngine::get()?;
    run_migrations(engine.pool()).await?;

    info!("Queue priorities: {}", strategy.as_str());
    Ok(Jukebox::new(&engine, strategy))
}

async fn login(jukebox: &Jukebox, login: &Login) -> Result<Option<User>> {
    let Some(username) = login.user.as_deref() else {
        return Ok(None);
    };
    let password = login.password.as_deref().unwrap_or_default();

    if !jukebox.identity.verify_credential(username, password).await? {
        bail!("Invalid username or password");
    }
    let user = jukebox
        .identity
        .get_by_username(username)
        .await?
        .with_context(|| format!("User {} disappeared", username))?;
    Ok(Some(user))
}

async fn run(command: Command, jukebox: &Jukebox) -> Result<()> {
    match command {
        Command::Init | Command::Config => Ok(()),

        Command::AddUser {
            name,
            username,
            password,
            privs,
        } => {
            let user = jukebox.identity.create_user(&name, &username, &password).await?;
            if let Some(privs) = privs {
                jukebox.identity.set_privileges(user.id, privs).await?;
            }
            println!("{}", serde_json::to_string_pretty(&user.to_minimal())?);
            Ok(())
        }

        Command::Enqueue {
            url,
            title,
            artist,
            album,
            length,
            date,
            slot,
            login: creds,
        } => {
            let user = login(jukebox, &creds).await?;
            let metadata = TrackMetadata {
                title,
                artist,
                album,
                length,
                date,
            };

            let entry = jukebox
                .enqueue_track(&url, &metadata, user.as_ref().map(|u| u.id), slot)
                .await?;
            // metadata given for a known track fills whatever is still missing
            if metadata != TrackMetadata::default() {
                jukebox.catalog.backfill(&url, &metadata).await?;
            }

            let view = jukebox.queue.to_external_view(&entry).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }

        Command::Queue { json } => {
            let views = jukebox.queue.external_queue().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
                return Ok(());
            }

            for view in views {
                let tally = jukebox.votes.tally(VoteTarget::Queue(view.id)).await?;
                println!(
                    "{:>4}  {:>3}  {:+}  {} - {}  ({})",
                    view.id,
                    view.playback_priority,
                    tally,
                    view.artist.as_deref().unwrap_or("?"),
                    view.title.as_deref().unwrap_or(&view.spotify_url),
                    view.username
                );
            }
            Ok(())
        }

        Command::Vote {
            entry,
            direction,
            history,
            login: creds,
        } => {
            let Some(user) = login(jukebox, &creds).await? else {
                bail!("Voting requires --user and --password");
            };
            let target = if history {
                VoteTarget::History(entry)
            } else {
                VoteTarget::Queue(entry)
            };

            jukebox.votes.cast_vote(user.id, target, direction.into()).await?;
            println!("{} tally: {}", target, jukebox.votes.tally(target).await?);
            Ok(())
        }

        Command::Play { entry, slot } => {
            let played = match (entry, slot) {
                (Some(id), _) => Some(jukebox.playback.consume(id).await?),
                (None, Some(slot)) => jukebox.playback.track_started(slot).await?,
                (None, None) => bail!("Give a queue entry id or --slot"),
            };

            match played {
                Some(played) => {
                    let view = jukebox.history_view(played.history.id).await?;
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                None => println!("Nothing matched; history unchanged"),
            }
            Ok(())
        }

        Command::History { track, user, limit } => {
            let query = if let Some(url) = track {
                let track = jukebox
                    .catalog
                    .get_by_url(&url)
                    .await?
                    .with_context(|| format!("Unknown track {}", url))?;
                jukebox.history.history_for_track(track.id)
            } else if let Some(username) = user {
                let user = jukebox
                    .identity
                    .get_by_username(&username)
                    .await?
                    .with_context(|| format!("Unknown user {}", username))?;
                jukebox.history.history_for_user(user.id)
            } else {
                jukebox.history.all()
            };

            let mut entries = query.stream().take(limit);
            while let Some(entry) = entries.next().await {
                let view = jukebox.history_view(entry?.id).await?;
                println!(
                    "{:>4}  {}  {:+}  {} - {}  ({})",
                    view.id,
                    view.time_played,
                    view.tally,
                    view.artist.as_deref().unwrap_or("?"),
                    view.title.as_deref().unwrap_or(&view.spotify_url),
                    view.username
                );
            }
            Ok(())
        }

        Command::Stats { limit } => {
            println!("Most played:");
            for count in jukebox.history.most_played_tracks(limit).await? {
                let name = match jukebox.catalog.get_by_id(count.track_id).await? {
                    Some(track) => track.to_string(),
                    None => format!("track {}", count.track_id),
                };
                println!(
                    "  {:>4}x  {}  (last {})",
                    count.plays,
                    name,
                    timestamp_to_relative(count.last_played)
                );
            }

            println!("Most active:");
            for count in jukebox.history.most_active_users(limit).await? {
                let name = match jukebox.identity.get_by_id(count.user_id).await? {
                    Some(user) => user.username,
                    None => format!("user {}", count.user_id),
                };
                println!("  {:>4}x  {}", count.plays, name);
            }
            Ok(())
        }

        Command::Reorder { entry, priority } => {
            let entry = jukebox.queue.reorder(entry, priority).await?;
            println!(
                "Entry {} now at playback priority {}",
                entry.id, entry.playback_priority
            );
            Ok(())
        }
    }
}
