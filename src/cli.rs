//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analytics::{Summary, summarize};
use crate::domain::config_validation::{default_timeframe, mock_params};
use crate::domain::error::FxError;
use crate::domain::mock_data::generate_mock_series;
use crate::domain::monitor::check_alerts;
use crate::domain::timeframe::Timeframe;
use crate::ports::alert_port::AlertPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::rate_port::RatePort;

#[derive(Parser, Debug)]
#[command(name = "fxwatch", about = "UGX/USD exchange-rate analytics and alerts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the JSON API and the alert poller
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Generate and store synthetic hourly rates
    MockData {
        #[arg(short, long)]
        config: PathBuf,
        /// Hours of history to generate (overrides [mock] hours)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        hours: Option<u32>,
        /// RNG seed for a reproducible series
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Import rate samples from a CSV file
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print summary statistics for a timeframe
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        /// One of 1d, 7d, 30d, 90d, 1y
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Evaluate active alert rules against the latest rate once
    CheckAlerts {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored data range
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::MockData {
            config,
            hours,
            seed,
        } => run_mock_data(&config, hours, seed),
        Command::Import { config, file } => run_import(&config, &file),
        Command::Summary { config, timeframe } => run_summary(&config, timeframe.as_deref()),
        Command::CheckAlerts { config } => run_check_alerts(&config),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FxError> {
    tracing::debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub type Stores = (
    Arc<dyn RatePort + Send + Sync>,
    Arc<dyn AlertPort + Send + Sync>,
);

#[cfg(feature = "sqlite")]
pub fn open_stores(config: &dyn ConfigPort) -> Result<Stores, FxError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let store = Arc::new(SqliteAdapter::from_config(config)?);
    Ok((store.clone(), store))
}

#[cfg(not(feature = "sqlite"))]
pub fn open_stores(_config: &dyn ConfigPort) -> Result<Stores, FxError> {
    Err(FxError::Database {
        reason: "fxwatch was built without the sqlite feature".to_string(),
    })
}

fn run_mock_data(config_path: &Path, hours: Option<u32>, seed: Option<u64>) -> Result<(), FxError> {
    let config = load_config(config_path)?;
    let mut params = mock_params(&config)?;
    if let Some(hours) = hours {
        params.hours = hours as usize;
    }
    let (rates, _) = open_stores(&config)?;

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let series = generate_mock_series(&params, Utc::now(), &mut rng);
    let inserted = rates.insert_samples(&series)?;

    println!("Generated {} samples, inserted {}", series.len(), inserted);
    Ok(())
}

fn run_import(config_path: &Path, file: &Path) -> Result<(), FxError> {
    let config = load_config(config_path)?;
    let samples = csv_adapter::read_samples_from_file(file)?;
    let (rates, _) = open_stores(&config)?;
    let inserted = rates.insert_samples(&samples)?;

    tracing::info!(file = %file.display(), read = samples.len(), inserted, "csv import finished");
    println!(
        "Imported {} of {} samples ({} already present)",
        inserted,
        samples.len(),
        samples.len() - inserted
    );
    Ok(())
}

fn run_summary(config_path: &Path, timeframe: Option<&str>) -> Result<(), FxError> {
    let config = load_config(config_path)?;
    let timeframe = match timeframe {
        Some(token) => Timeframe::parse(token),
        None => default_timeframe(&config)?,
    };
    let (rates, _) = open_stores(&config)?;

    let (start, end) = timeframe.range(Utc::now());
    let series = rates.fetch_range(start, end)?;
    let summary = summarize(&series)?;
    print!("{}", format_summary(timeframe, &summary));
    Ok(())
}

pub fn format_summary(timeframe: Timeframe, s: &Summary) -> String {
    format!(
        "UGX/USD over {timeframe} ({} samples)\n\
         current:  {}\n\
         previous: {}\n\
         change:   {} ({:.2}%)\n\
         high:     {}\n\
         low:      {}\n\
         average:  {:.2}\n\
         stddev:   {:.2}\n",
        s.samples,
        s.current,
        s.previous,
        s.change,
        s.change_percent,
        s.high,
        s.low,
        s.avg,
        s.stddev,
    )
}

fn run_check_alerts(config_path: &Path) -> Result<(), FxError> {
    let config = load_config(config_path)?;
    let (rates, alerts) = open_stores(&config)?;
    let outcome = check_alerts(&*rates, &*alerts)?;

    for event in &outcome.recorded {
        println!(
            "rule {} triggered at {} (rate {})",
            event.rule_id,
            event.triggered_at.to_rfc3339(),
            event.triggered_rate
        );
    }
    eprintln!(
        "{} rules checked, {} alerts recorded, {} already recorded",
        outcome.rules_checked,
        outcome.recorded.len(),
        outcome.duplicates
    );
    Ok(())
}

fn run_info(config_path: &Path) -> Result<(), FxError> {
    let config = load_config(config_path)?;
    let (rates, _) = open_stores(&config)?;

    match rates.data_range()? {
        Some((first, last, count)) => println!(
            "UGX/USD: {} samples, {} to {}",
            count,
            first.to_rfc3339(),
            last.to_rfc3339()
        ),
        None => eprintln!("UGX/USD: no data found"),
    }
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), FxError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::config_validation::{
            analytics_params, listen_addr, poll_interval_seconds, validate_config,
        };
        use std::time::Duration;

        let config = load_config(config_path)?;
        validate_config(&config)?;

        let (rates, alerts) = open_stores(&config)?;
        let addr = listen_addr(&config)?;
        let poll = Duration::from_secs(poll_interval_seconds(&config)?);

        let state = AppState {
            rates: rates.clone(),
            alerts: alerts.clone(),
            analytics: analytics_params(&config)?,
            default_timeframe: default_timeframe(&config)?,
            mock: mock_params(&config)?,
            seed_on_empty: config.get_bool("mock", "seed_on_empty", false),
        };
        let router = build_router(state);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async move {
            tokio::spawn(poll_alerts(rates, alerts, poll));

            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, poll_seconds = poll.as_secs(), "fxwatch listening");
            axum::serve(listener, router).await?;
            Ok::<(), FxError>(())
        })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(FxError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: "fxwatch was built without the web feature".to_string(),
        })
    }
}

/// Run one monitor tick per interval for the life of the server.
#[cfg(feature = "web")]
async fn poll_alerts(
    rates: Arc<dyn RatePort + Send + Sync>,
    alerts: Arc<dyn AlertPort + Send + Sync>,
    every: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let (rates, alerts) = (rates.clone(), alerts.clone());
        let tick = tokio::task::spawn_blocking(move || check_alerts(&*rates, &*alerts)).await;
        match tick {
            Ok(Ok(outcome)) if !outcome.recorded.is_empty() => {
                tracing::info!(recorded = outcome.recorded.len(), "alert poll recorded events");
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "alert poll failed"),
            Err(e) => tracing::error!(error = %e, "alert poll task panicked"),
        }
    }
}
