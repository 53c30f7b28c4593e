//! Wiring & DI. Entry point: bootstrap adapters, inject into services, dispatch the
//! subcommand. No business logic here.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use weather_alerts::adapters::notify::{HttpNotifier, LogNotifier};
use weather_alerts::adapters::persistence::SqliteRepo;
use weather_alerts::ports::{
    Notifier, SubscriptionRegistry, SubscriptionStore, WeatherSource, WeatherStore,
};
use weather_alerts::shared::config::AppConfig;
use weather_alerts::usecases::{
    AlertScheduler, NotificationService, SubscriptionService, WeatherService,
};

#[derive(Parser)]
#[command(name = "weather-alerts")]
#[command(about = "Condition-based weather alert subscriptions", long_about = None)]
struct Cli {
    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alert scheduler until Ctrl-C
    Run,
    /// Register a subscription and send its confirmation email
    Subscribe {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        city: String,
        /// e.g. "temp < 10" or "rain"
        #[arg(long)]
        condition: String,
    },
    /// Confirm a subscription with the token from its email
    Confirm { token: String },
    /// Store the current weather for a city
    Weather {
        #[arg(long)]
        city: String,
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,
        #[arg(long)]
        humidity: u8,
        #[arg(long)]
        condition: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    let policy = cfg.schedule_policy()?;

    // --- Storage: one SQLite file backs both subscriptions and weather snapshots ---
    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );
    info!(path = %repo.path().display(), "alert store ready");
    let subscriptions: Arc<dyn SubscriptionStore> = Arc::clone(&repo) as Arc<dyn SubscriptionStore>;
    let registry: Arc<dyn SubscriptionRegistry> = Arc::clone(&repo) as Arc<dyn SubscriptionRegistry>;
    let weather: Arc<dyn WeatherSource> = Arc::clone(&repo) as Arc<dyn WeatherSource>;
    let weather_store: Arc<dyn WeatherStore> = Arc::clone(&repo) as Arc<dyn WeatherStore>;

    // --- Delivery ---
    let notifier: Arc<dyn Notifier> = match cfg.notifier_url.clone().filter(|_| cfg.is_relay_configured()) {
        Some(url) => {
            info!(url = %url, "mail relay notifier enabled");
            Arc::new(
                HttpNotifier::new(url, cfg.notifier_token.clone(), cfg.mail_from_or_default())
                    .map_err(|e| anyhow::anyhow!("{}", e))?,
            )
        }
        None => {
            warn!("WEATHER_ALERTS_NOTIFIER_URL not set, alerts will only be logged");
            Arc::new(LogNotifier::new())
        }
    };

    // --- Commands ---
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let notifications = Arc::new(NotificationService::new(notifier, cfg.send_timeout()));
            let scheduler = AlertScheduler::new(subscriptions, weather, notifications, policy);
            run_until_ctrl_c(scheduler).await;
        }
        Commands::Subscribe {
            email,
            city,
            condition,
        } => {
            let service =
                SubscriptionService::new(registry, weather, notifier, cfg.confirm_url_or_default());
            let id = service.create(&email, &city, &condition).await?;
            println!("Subscription {} created; check {} for the confirmation link", id, email);
        }
        Commands::Confirm { token } => {
            let service =
                SubscriptionService::new(registry, weather, notifier, cfg.confirm_url_or_default());
            let sub = service.confirm(&token).await?;
            println!(
                "Subscription {} confirmed: {} in {} when {}",
                sub.id, sub.email, sub.city, sub.condition
            );
        }
        Commands::Weather {
            city,
            temp,
            humidity,
            condition,
        } => {
            let service = WeatherService::new(weather_store);
            let w = service
                .update_weather(&city, temp, humidity, &condition)
                .await?;
            println!(
                "{}: {:.1}°C, {}% humidity, {}",
                w.city, w.temperature, w.humidity, w.condition
            );
        }
    }
    Ok(())
}

/// Ctrl-C cancels; the subscription being processed finishes first.
async fn run_until_ctrl_c(scheduler: AlertScheduler) {
    let policy = scheduler.policy();
    if policy.cooldown() < policy.tick_interval() {
        warn!(
            tick_secs = policy.tick_interval().as_secs(),
            cooldown_secs = policy.cooldown().as_secs(),
            "cooldown is shorter than the tick interval; every matching tick will alert"
        );
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "cannot listen for Ctrl-C; stop the process to exit"),
            }
        }
    });

    scheduler.run(shutdown).await;
}
