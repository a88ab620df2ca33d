//! rhythmee CLI - internet-radio alarm clock
//!
//! The binary front end over the rhythmee engine:
//! - manage alarms (add/list/remove/enable/disable)
//! - search the radio directory (stations, countries, tags)
//! - preview stations with an optional sleep timer
//! - run the alarm daemon

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::sync::broadcast;

use rhythmee::alarms::{Alarm, AlarmStore};
use rhythmee::cli::{AlarmAddArgs, AlarmCommands, Cli, Commands, Display, FavoriteCommands, ListenArgs, SearchArgs};
use rhythmee::clock::SystemClock;
use rhythmee::daemon::{App, AppConfig};
use rhythmee::directory::{
    CachedDirectory, FavoriteStations, RadioDirectoryClient, ReqwestTransport, SearchParams,
    Station,
};
use rhythmee::report::LogReporter;
use rhythmee::sleep_timer::SleepTimerEvent;
use rhythmee::storage::{JsonFileStorage, KeyValueStore};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolves the configuration, honoring the `--data-dir` override.
fn load_config(cli: &Cli) -> AppConfig {
    match &cli.data_dir {
        Some(dir) => AppConfig::load_from(dir.clone()),
        None => AppConfig::load(),
    }
}

/// Opens the key-value storage for the configured data directory.
fn open_storage(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    let storage = JsonFileStorage::new(config.storage_path())
        .context("ストレージを開けませんでした")?;
    Ok(Arc::new(storage))
}

/// Builds the cached directory client (no audio device required).
fn build_directory(config: &AppConfig) -> Result<CachedDirectory> {
    let storage = open_storage(config)?;
    let transport =
        Arc::new(ReqwestTransport::new().context("HTTPクライアントの初期化に失敗しました")?);
    let client = RadioDirectoryClient::with_mirrors(
        transport,
        Arc::new(LogReporter),
        config.mirrors.clone(),
    );
    Ok(CachedDirectory::new(client, storage, Arc::new(SystemClock)))
}

/// Returns the first search hit for `query`, if any.
async fn search_first(directory: &CachedDirectory, query: &str) -> Option<Station> {
    let params = SearchParams {
        name: Some(query.to_string()),
        limit: Some(1),
        ..SearchParams::default()
    };
    directory.search(&params).await.into_iter().next()
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli);

    match cli.command {
        Some(Commands::Alarm { command }) => {
            handle_alarm(command, &config).await?;
        }
        Some(Commands::Search(args)) => {
            handle_search(args, &config).await?;
        }
        Some(Commands::Countries) => {
            let directory = build_directory(&config)?;
            Display::show_countries(&directory.countries().await);
        }
        Some(Commands::Tags) => {
            let directory = build_directory(&config)?;
            Display::show_tags(&directory.tags().await);
        }
        Some(Commands::Listen(args)) => {
            handle_listen(args, config).await?;
        }
        Some(Commands::Favorite { command }) => {
            handle_favorite(command, &config).await?;
        }
        Some(Commands::Daemon) => {
            let app = App::new(config)?;
            app.run().await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Handles `alarm` subcommands.
async fn handle_alarm(command: AlarmCommands, config: &AppConfig) -> Result<()> {
    let store = AlarmStore::new(open_storage(config)?);

    match command {
        AlarmCommands::Add(args) => {
            let alarm = build_alarm(args, config).await?;
            store.add(alarm.clone())?;
            Display::show_alarm_added(&alarm);
        }
        AlarmCommands::List => {
            Display::show_alarm_list(&store.list()?);
        }
        AlarmCommands::Remove { id } => {
            store.remove(id)?;
            Display::show_alarm_removed(&id.to_string());
        }
        AlarmCommands::Enable { id } => {
            store.set_enabled(id, true)?;
            Display::show_alarm_toggled(&id.to_string(), true);
        }
        AlarmCommands::Disable { id } => {
            store.set_enabled(id, false)?;
            Display::show_alarm_toggled(&id.to_string(), false);
        }
        AlarmCommands::Snooze { id, minutes } => {
            let until = chrono::Local::now() + chrono::Duration::minutes(i64::from(minutes));
            store.set_snooze(id, Some(until))?;
            Display::show_alarm_snoozed(&id.to_string(), minutes);
        }
    }
    Ok(())
}

/// Builds an alarm from `alarm add` arguments, attaching the first station
/// hit when a station query was given.
async fn build_alarm(args: AlarmAddArgs, config: &AppConfig) -> Result<Alarm> {
    let mut alarm = Alarm::new(args.time, args.label).with_repeat_days(args.days);
    alarm.validate().map_err(anyhow::Error::msg)?;

    if let Some(query) = args.station {
        let directory = build_directory(config)?;
        let station = search_first(&directory, &query)
            .await
            .with_context(|| format!("ステーションが見つかりませんでした: {query}"))?;
        alarm = alarm.with_station((&station).into());
    }
    Ok(alarm)
}

/// Handles the `search` command.
async fn handle_search(args: SearchArgs, config: &AppConfig) -> Result<()> {
    let directory = build_directory(config)?;
    let params = SearchParams {
        name: Some(args.query),
        country: args.country,
        tag: args.tag,
        limit: Some(args.limit),
    };
    Display::show_stations(&directory.search(&params).await);
    Ok(())
}

/// Handles `favorite` subcommands.
async fn handle_favorite(command: FavoriteCommands, config: &AppConfig) -> Result<()> {
    let storage = open_storage(config)?;
    let favorites = FavoriteStations::new(storage);

    match command {
        FavoriteCommands::Toggle { query } => {
            let directory = build_directory(config)?;
            let station = search_first(&directory, &query)
                .await
                .with_context(|| format!("ステーションが見つかりませんでした: {query}"))?;
            let is_favorite = favorites.toggle(station.clone())?;
            Display::show_favorite_toggled(&station, is_favorite);
        }
        FavoriteCommands::List => {
            Display::show_favorites(&favorites.list()?);
        }
    }
    Ok(())
}

/// Handles the `listen` command: preview a station until ctrl-c or sleep
/// timer expiry.
async fn handle_listen(args: ListenArgs, config: AppConfig) -> Result<()> {
    let app = App::new(config)?;

    let station = search_first(&app.directory, &args.query)
        .await
        .with_context(|| format!("ステーションが見つかりませんでした: {}", args.query))?;
    Display::show_listening(&station);

    let preview_task = tokio::spawn(app.preview.clone().run());
    app.preview.play_preview(station).await;

    let mut timer_events = app.sleep_timer.subscribe();
    if let Some(minutes) = args.sleep {
        app.sleep_timer.start(minutes);
        Display::show_sleep_timer_started(minutes);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = timer_events.recv() => {
                match event {
                    Ok(SleepTimerEvent::Completed) => break,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    app.sleep_timer.stop();
    app.preview.stop_preview();
    preview_task.abort();
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
