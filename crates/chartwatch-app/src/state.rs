use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chartwatch_config::Config;
use chartwatch_core::{AlertSink, Dispatcher, PatternExtractor};
use chartwatch_directory::{DirectoryMatcher, HttpDirectory};
use chartwatch_history::{HistoryStorage, HistoryStore, JsonFileStorage, MemoryStorage};
use chartwatch_io::{CommandAlertSink, CompanionHub, OriginPolicy};
use chartwatch_types::AppEvent;
use kanal::AsyncSender;
use tokio::sync::{Mutex, RwLock};

use crate::pipeline::Pipeline;
use crate::profile::default_data_dir;
use crate::scheduler::Scheduler;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub history: Arc<HistoryStore>,
    pub hub: Arc<CompanionHub>,
    pub scheduler: Mutex<Scheduler>,
}

impl AppState {
    /// Wire every component from `config`. Nothing touches the screen yet;
    /// capture and OCR are acquired when monitoring starts.
    pub async fn build(config: Config, events_tx: AsyncSender<AppEvent>) -> anyhow::Result<Self> {
        let history = Arc::new(open_history(&config).await?);

        let policy = OriginPolicy::new(config.notify.companion_origins.as_slice())
            .context("Invalid companion origin pattern")?;
        let hub = Arc::new(CompanionHub::new(policy, config.notify.companion_queue));

        let alerts: Option<Arc<dyn AlertSink>> = config.notify.desktop_alerts.then(|| {
            Arc::new(CommandAlertSink::new(
                &config.notify.alert_program,
                &config.notify.app_name,
                events_tx,
            )) as Arc<dyn AlertSink>
        });

        let dispatcher = Arc::new(Dispatcher::new(
            history.clone(),
            alerts,
            hub.clone(),
            &config.notify.app_name,
        ));

        let extractor =
            PatternExtractor::new(&config.extractor).context("Invalid extractor pattern")?;
        let matcher = DirectoryMatcher::new(
            Arc::new(HttpDirectory::new(&config.directory)),
            config.directory.min_confidence,
        );

        let pipeline = Pipeline::new(
            chartwatch_capture::open_surface(&config.capture)?,
            chartwatch_capture::open_recognizer(&config.ocr)?,
            Arc::new(extractor),
            Arc::new(matcher),
            dispatcher,
        )
        .keep_raw_text(config.history.keep_raw_text);

        let scheduler = Scheduler::new(
            pipeline,
            Duration::from_millis(config.cycle_interval_ms),
            Duration::from_millis(config.cycle_timeout_ms),
        );

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            history,
            hub,
            scheduler: Mutex::new(scheduler),
        })
    }
}

/// The persisted history, or an in-memory one if there is nowhere to persist
pub async fn open_history(config: &Config) -> anyhow::Result<HistoryStore> {
    let storage: Arc<dyn HistoryStorage> = match (&config.history.path, default_data_dir()) {
        (Some(path), _) => Arc::new(JsonFileStorage::new(path)),
        (None, Some(dir)) => Arc::new(JsonFileStorage::in_dir(dir)),
        (None, None) => {
            tracing::warn!("No data directory, history is kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    HistoryStore::open(storage, config.history.capacity)
        .await
        .context("Failed to load notification history")
}
