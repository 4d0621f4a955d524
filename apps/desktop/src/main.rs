mod config;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    Dashboard, DashboardEvent, FeedbackApi, FilterState, HttpFeedbackApi, SubmissionController,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Terminal front-end for the review feedback service")]
struct Args {
    #[arg(long, default_value = "feedback.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a rating with an optional written review.
    Submit {
        #[arg(long, allow_negative_numbers = true)]
        rating: i64,
        #[arg(long, default_value = "")]
        review: String,
    },
    /// Live admin view. Type all, 1..5, refresh or q on stdin.
    Dashboard {
        #[arg(long, default_value = "all")]
        filter: String,
        #[arg(long)]
        once: bool,
    },
    Stats,
    Reviews {
        #[arg(long, default_value = "all")]
        filter: String,
    },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config)?;
    if let Some(url) = args.server_url {
        settings.api_base_url = url;
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    let client_config = settings.client_config()?;
    tracing::info!(base_url = %client_config.base_url, "using feedback api");

    match args.command {
        Command::Submit { rating, review } => {
            let controller = SubmissionController::connect(client_config)?;
            submit(&controller, rating, review).await
        }
        Command::Dashboard { filter, once } => {
            let filter: FilterState = filter.parse()?;
            let dashboard = Dashboard::connect(client_config)?;
            dashboard.set_filter(filter).await;
            if once {
                dashboard.refresh_now().await;
                print!("{}", ui::stats_text(&dashboard.stats().panel().await));
                print!("{}", ui::feed_text(&dashboard.feed().panel().await));
                Ok(())
            } else {
                run_dashboard(&dashboard).await
            }
        }
        Command::Stats => {
            let dashboard = Dashboard::connect(client_config)?;
            dashboard.stats().refresh().await;
            print!("{}", ui::stats_text(&dashboard.stats().panel().await));
            Ok(())
        }
        Command::Reviews { filter } => {
            let filter: FilterState = filter.parse()?;
            let dashboard = Dashboard::connect(client_config)?;
            dashboard.set_filter(filter).await;
            dashboard.feed().refresh().await;
            print!("{}", ui::feed_text(&dashboard.feed().panel().await));
            Ok(())
        }
        Command::Health => {
            let api = HttpFeedbackApi::new(client_config)?;
            let health = api.health().await?;
            println!("status: {}", health.status);
            Ok(())
        }
    }
}

async fn submit(controller: &SubmissionController, rating: i64, review: String) -> Result<()> {
    // An out-of-range rating leaves the form unselected so submit reports it.
    if let Err(err) = controller.select_rating(rating).await {
        tracing::warn!(error = %err, rating, "rating rejected");
    }
    controller.update_review_text(review).await;

    let outcome = controller.submit().await;
    print!("{}", ui::form_text(&controller.form().await));
    outcome?;
    Ok(())
}

async fn run_dashboard(dashboard: &Dashboard) -> Result<()> {
    let mut events = dashboard.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    dashboard.start().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(DashboardEvent::StatsUpdated(panel)) => print!("{}", ui::stats_text(&panel)),
                Ok(DashboardEvent::ReviewsUpdated(panel)) => print!("{}", ui::feed_text(&panel)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dashboard output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "q" | "quit" => break,
                    "refresh" => {
                        dashboard.refresh_now().await;
                    }
                    other => match other.parse::<FilterState>() {
                        Ok(filter) => {
                            dashboard.set_filter(filter).await;
                        }
                        Err(err) => eprintln!("{}", err.user_message("")),
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.stop().await;
    tracing::info!("dashboard closed");
    Ok(())
}
