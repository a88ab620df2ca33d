//! Composition root and daemon run loop.
//!
//! [`App`] builds the whole object graph exactly once at startup with
//! constructor-injected dependencies, so every collaborator (clock, engine,
//! storage, notifier) can be swapped for a double in tests. [`App::run`]
//! drives the scheduler until ctrl-c, mapping SIGUSR1 from the host to the
//! scheduler's immediate re-evaluation signal.

mod config;

pub use config::{AppConfig, CONFIG_FILE_NAME, STORAGE_FILE_NAME};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alarms::AlarmStore;
use crate::audio::{PlaybackEngine, RodioEngine};
use crate::clock::{Clock, SystemClock};
use crate::directory::{
    CachedDirectory, FavoriteStations, RadioDirectoryClient, ReqwestTransport,
};
use crate::playback::PreviewCoordinator;
use crate::report::{ErrorReporter, LogReporter};
use crate::scheduler::{AlarmScheduler, LogNotifier};
use crate::sleep_timer::SleepTimer;
use crate::storage::{JsonFileStorage, KeyValueStore};

/// The wired application.
pub struct App {
    pub config: AppConfig,
    pub storage: Arc<dyn KeyValueStore>,
    pub store: Arc<AlarmStore>,
    pub directory: Arc<CachedDirectory>,
    pub favorites: Arc<FavoriteStations>,
    pub engine: Arc<dyn PlaybackEngine>,
    pub scheduler: Arc<AlarmScheduler>,
    pub preview: Arc<PreviewCoordinator>,
    pub sleep_timer: Arc<SleepTimer>,
}

impl App {
    /// Builds the production object graph, opening the audio device.
    pub fn new(config: AppConfig) -> Result<Self> {
        let engine: Arc<dyn PlaybackEngine> =
            Arc::new(RodioEngine::new().context("オーディオデバイスの初期化に失敗しました")?);
        Self::with_engine(config, engine)
    }

    /// Builds the graph around an existing engine (tests, headless use).
    pub fn with_engine(config: AppConfig, engine: Arc<dyn PlaybackEngine>) -> Result<Self> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(
            JsonFileStorage::new(config.storage_path())
                .context("ストレージの初期化に失敗しました")?,
        );
        let reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store = Arc::new(AlarmStore::new(storage.clone()));
        let favorites = Arc::new(FavoriteStations::new(storage.clone()));

        let transport = Arc::new(
            ReqwestTransport::new().context("HTTPクライアントの初期化に失敗しました")?,
        );
        let client = RadioDirectoryClient::with_mirrors(
            transport,
            reporter.clone(),
            config.mirrors.clone(),
        );
        let directory = Arc::new(CachedDirectory::new(client, storage.clone(), clock.clone()));

        let preview = Arc::new(PreviewCoordinator::new(engine.clone(), reporter.clone()));
        let sleep_timer = Arc::new(SleepTimer::new(clock.clone(), preview.clone()));
        let scheduler = Arc::new(
            AlarmScheduler::new(
                store.clone(),
                engine.clone(),
                clock,
                Arc::new(LogNotifier),
                reporter,
            )
            .with_tick_interval(Duration::from_secs(config.tick_secs)),
        );

        Ok(Self {
            config,
            storage,
            store,
            directory,
            favorites,
            engine,
            scheduler,
            preview,
            sleep_timer,
        })
    }

    /// Runs the daemon until ctrl-c.
    ///
    /// SIGUSR1 triggers an immediate evaluation pass, for hosts that want to
    /// force a re-check on foreground/wake transitions.
    pub async fn run(&self) -> Result<()> {
        let (wake_tx, wake_rx) = mpsc::channel::<()>(4);

        let scheduler_task = tokio::spawn(self.scheduler.clone().run(wake_rx));
        let preview_task = tokio::spawn(self.preview.clone().run());

        #[cfg(unix)]
        let wake_task = {
            let wake_tx = wake_tx.clone();
            tokio::spawn(async move {
                let mut signal = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::user_defined1(),
                ) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!(error = %e, "SIGUSR1 handler unavailable");
                        return;
                    }
                };
                while signal.recv().await.is_some() {
                    info!("SIGUSR1: forcing evaluation pass");
                    if wake_tx.send(()).await.is_err() {
                        return;
                    }
                }
            })
        };

        info!(
            tick_secs = self.config.tick_secs,
            data_dir = %self.config.data_dir.display(),
            "Daemon running"
        );

        tokio::signal::ctrl_c()
            .await
            .context("シグナルハンドラの登録に失敗しました")?;
        info!("Shutting down");

        self.scheduler.dismiss_active();
        self.sleep_timer.stop();
        self.preview.stop_preview();

        scheduler_task.abort();
        preview_task.abort();
        #[cfg(unix)]
        wake_task.abort();
        Ok(())
    }
}
