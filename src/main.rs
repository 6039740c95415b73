use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use krabot_notif::adapters::rest::{self, ApiState, HealthProbes};
use krabot_notif::adapters::{
    DiscordNotifier, GithubReleaseFeed, InMemoryCharacteristicsStore, InMemoryStateStore,
    KralandScraper, NotificationTemplates, WebhookClient,
};
use krabot_notif::app::{CheckMessages, CheckRelease, CheckReminder, Lifecycle, UploadCharacteristics};
use krabot_notif::core::{
    start_scheduler, Cycles, DelayPolicy, DelayableTimer, TimerSchedule, Triggers,
};
use krabot_notif::domain::model::ReleaseVersion;
use krabot_notif::utils::monitor::MemoryMonitor;
use krabot_notif::utils::{logger, validation::Validate};
use krabot_notif::{AppConfig, CliConfig};
use std::sync::Arc;
use std::time::Duration;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 載入 TOML 配置
    let config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, config.logging.format());

    tracing::info!("🚀 Starting krabot-notif v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!(category = ?e.category(), "❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    run(config).await
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let account = config.account()?;
    let timeout = config.site.timeout();

    let state = Arc::new(InMemoryStateStore::new(ReleaseVersion::from_build(env!(
        "CARGO_PKG_VERSION"
    ))));
    let scraper = Arc::new(KralandScraper::new(&config.site)?);
    let webhook = WebhookClient::new(
        config.discord.webhook_url.as_str(),
        config.discord.username(),
        config.discord.avatar_url(),
        timeout,
    )?;
    let notifier = Arc::new(DiscordNotifier::new(
        webhook,
        NotificationTemplates::from(&config.discord.messages),
        config.release.page_url(),
    ));
    let feed = Arc::new(GithubReleaseFeed::new(config.release.feed_url(), timeout)?);

    let lifecycle = Lifecycle::new(feed.clone(), notifier.clone(), state.clone());
    let check_messages = Arc::new(CheckMessages::new(
        scraper.clone(),
        notifier.clone(),
        state.clone(),
        account.clone(),
    ));
    let check_release = Arc::new(CheckRelease::new(feed, notifier.clone(), state.clone()));
    let check_reminder = Arc::new(CheckReminder::new(scraper, notifier, account));
    let characteristics = Arc::new(UploadCharacteristics::new(Arc::new(
        InMemoryCharacteristicsStore::new(),
    )));

    let monitor = Arc::new(MemoryMonitor::new(
        config.memory.warning_threshold(),
        config.memory.critical_threshold(),
    ));

    let message_timer = Arc::new(DelayableTimer::new(
        "Kramail check",
        TimerSchedule::Every(config.scheduler.message_check_interval()),
        config.scheduler.delay_amount(),
        DelayPolicy::Always,
    ));
    let reminder_timer = Arc::new(DelayableTimer::new(
        "Sleep check",
        TimerSchedule::DailyAt(config.scheduler.reminder_time()?),
        config.scheduler.delay_amount(),
        DelayPolicy::WhenImminent,
    ));

    lifecycle.initialize().await;

    let scheduler = start_scheduler(
        Cycles {
            check_messages,
            check_release,
            check_reminder: check_reminder.clone(),
        },
        Triggers {
            message_timer: message_timer.clone(),
            reminder_timer: reminder_timer.clone(),
            release_cron: config.release.cron().to_string(),
            memory_cron: config.scheduler.memory_report_cron().to_string(),
        },
        lifecycle.clone(),
        monitor.clone(),
    )
    .await
    .context("failed to start scheduler")?;

    let server = if config.server.enabled() {
        let probes = HealthProbes::for_services(
            config.site.base_url(),
            &config.discord.webhook_url,
            config.release.feed_url(),
            HEALTH_PROBE_TIMEOUT,
        )?;
        let api = ApiState {
            state,
            message_timer,
            reminder_timer,
            check_reminder,
            characteristics,
            monitor,
            probes: Arc::new(probes),
            public_url: config.server.public_url().to_string(),
            script_version: Utc::now().timestamp().to_string(),
        };

        let listener = tokio::net::TcpListener::bind(config.server.bind_address())
            .await
            .with_context(|| format!("failed to bind {}", config.server.bind_address()))?;
        tracing::info!("🌐 REST API listening on {}", config.server.bind_address());

        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, rest::router(api)).await {
                tracing::error!("❌ REST server stopped: {}", e);
            }
        }))
    } else {
        tracing::info!("REST API disabled");
        None
    };

    shutdown_signal().await;
    tracing::info!("🛑 Shutdown requested");

    if let Some(server) = server {
        server.abort();
    }
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("⚠️ Scheduler did not stop cleanly: {}", e);
    }
    lifecycle.shutdown().await;

    tracing::info!("👋 krabot-notif stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn display_config_summary(config: &AppConfig, args: &CliConfig) {
    println!("📋 Krabot Configuration Summary:");
    println!("  Config file: {}", args.config);
    println!("  Site: {}", config.site.base_url());
    println!("  Account: {} (password: ***)", config.account.username);
    println!("  Discord bot name: {}", config.discord.username());
    println!(
        "  Kramail check every {}s (delay {}s)",
        config.scheduler.message_check_interval().as_secs(),
        config.scheduler.delay_amount().as_secs()
    );
    match config.scheduler.reminder_time() {
        Ok(time) => println!("  Sleep check daily at {}", time.format("%H:%M")),
        Err(e) => println!("  Sleep check: {}", e),
    }
    println!("  Release cron: {}", config.release.cron());
    println!("  Memory report cron: {}", config.scheduler.memory_report_cron());
    if config.server.enabled() {
        println!(
            "  REST API: {} (public {})",
            config.server.bind_address(),
            config.server.public_url()
        );
    } else {
        println!("  REST API: disabled");
    }

    if args.verbose {
        println!("  🔍 VERBOSE MODE ENABLED");
    }
    println!();
}
