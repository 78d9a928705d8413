// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strive-Sync command-line host
//!
//! Connects a Strava account over OAuth, keeps its tokens fresh in a local
//! credential file, and prints Strava data as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use strive_sync::{
    config::Config,
    polyline,
    services::{ActivityQuery, LoopbackAgent, StravaService, TokenManager},
    store::FileCredentialStore,
    time_utils::format_utc_rfc3339,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIRECTIVES: &str = "strive_sync=debug,info";

#[derive(Parser)]
#[command(name = "strive-sync")]
#[command(about = "Connect to Strava and fetch activity data", long_about = None)]
struct Cli {
    /// Credential file (default: STRAVA_CREDENTIALS_PATH or .strive/credentials.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Strava account through the browser
    Authorize {
        /// Seconds to wait for the Strava redirect
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
    },
    /// Show whether a valid token is stored
    Status,
    /// List recent activities
    Activities {
        #[arg(long, default_value = "30")]
        count: u32,

        /// 1-based page of `count` activities
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one activity in detail
    Activity {
        id: u64,

        /// Print the decoded route instead of the activity
        #[arg(long)]
        coordinates: bool,
    },
    /// Show the connected athlete's profile
    Athlete,
    /// Show aggregate stats (default: the connected athlete)
    Stats {
        #[arg(long)]
        athlete_id: Option<u64>,
    },
    /// Forget the stored tokens
    Disconnect {
        /// Also deauthorize the app with Strava
        #[arg(long)]
        revoke: bool,
    },
    /// Decode an encoded polyline
    Decode { polyline: String },
}

#[derive(Serialize)]
struct StatusOutput {
    authorized: bool,
    expires_at: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    // Decoding needs no Strava configuration.
    if let Commands::Decode { polyline: encoded } = &cli.command {
        let coordinates = polyline::decode(encoded).context("Failed to decode polyline")?;
        return print_json(&coordinates);
    }

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = cli.store {
        config.credentials_path = path;
    }
    tracing::info!(
        client_id = %config.client_id,
        store = %config.credentials_path.display(),
        "Starting strive-sync"
    );

    let store = Arc::new(FileCredentialStore::new(&config.credentials_path));
    let tokens = Arc::new(TokenManager::new(config, store)?);
    let strava = StravaService::new(tokens.clone());

    match cli.command {
        Commands::Authorize { timeout_secs } => {
            let agent = LoopbackAgent::new(|url| {
                eprintln!("\nOpen this URL to connect your Strava account:\n{}\n", url);
            })
            .with_timeout(Duration::from_secs(timeout_secs));

            let cancel = agent.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.notify_one();
                }
            });

            tokens.authorize(&agent).await?;
            eprintln!("Strava account connected.");
        }
        Commands::Status => {
            let record = tokens.credentials().await?;
            print_json(&StatusOutput {
                authorized: tokens.is_authorized().await,
                expires_at: record.map(|r| format_utc_rfc3339(r.expires_at)),
            })?;
        }
        Commands::Activities { count, page } => {
            let activities = match page {
                Some(page) => {
                    let query = ActivityQuery {
                        page: Some(page),
                        ..ActivityQuery::recent(count)
                    };
                    strava.fetch_activities(&query).await?
                }
                None => strava.fetch_recent_activities(count).await?,
            };
            print_json(&activities)?;
        }
        Commands::Activity { id, coordinates } => {
            let activity = strava.fetch_detailed_activity(id).await?;
            if coordinates {
                print_json(&activity.coordinates()?)?;
            } else {
                print_json(&activity)?;
            }
        }
        Commands::Athlete => {
            print_json(&strava.fetch_athlete_profile().await?)?;
        }
        Commands::Stats { athlete_id } => {
            let athlete_id = match athlete_id {
                Some(id) => id,
                None => strava.fetch_athlete_profile().await?.id,
            };
            print_json(&strava.fetch_athlete_stats(athlete_id).await?)?;
        }
        Commands::Disconnect { revoke } => {
            if revoke {
                tokens.revoke().await?;
            } else {
                tokens.disconnect().await;
            }
            eprintln!("Strava account disconnected.");
        }
        Commands::Decode { .. } => {} // handled above
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    tracing_subscriber::registry().with(filter).with(format).init();
}
