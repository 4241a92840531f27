use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chartwatch_capture::{CaptureSurface, Snapshot, TextRecognizer};
use chartwatch_config::extractor::ExtractorConfig;
use chartwatch_core::{
    Destination, DestinationRegistry, Dispatcher, Error, PatternExtractor, Result,
};
use chartwatch_directory::{
    DirectoryError, DirectoryMatcher, DirectoryQuery, DirectoryRecord, PatientDirectory,
};
use chartwatch_history::{HistoryStorage, HistoryStore};
use chartwatch_types::{BroadcastMessage, HistoryEntry};
use chrono::Utc;

use crate::pipeline::Pipeline;

pub const SMITH: &str = "MRN: 12345 John Smith";
pub const DOE: &str = "Patient: Jane Doe\nMRN: 67890";

/// Counts every call the pipeline makes into the fakes
#[derive(Default)]
pub struct Calls {
    pub surface_inits: AtomicUsize,
    pub surface_stops: AtomicUsize,
    pub ocr_inits: AtomicUsize,
    pub ocr_terminates: AtomicUsize,
    pub recognized: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub lookups: AtomicUsize,
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

struct FakeSurface {
    calls: Arc<Calls>,
    active: bool,
}

#[async_trait::async_trait]
impl CaptureSurface for FakeSurface {
    fn label(&self) -> &str {
        "fake-screen"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn initialize(&mut self) -> Result<()> {
        self.calls.surface_inits.fetch_add(1, Ordering::SeqCst);
        self.active = true;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        if !self.active {
            return Err(Error::NotInitialized("capture surface"));
        }
        Ok(Snapshot {
            png: Vec::new(),
            width: 1,
            height: 1,
            captured_at: Utc::now(),
        })
    }

    async fn stop(&mut self) {
        self.calls.surface_stops.fetch_add(1, Ordering::SeqCst);
        self.active = false;
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    /// The engine died underneath us
    NotReady,
}

/// Plays back recognized text in order, repeating the last step forever
struct ScriptedRecognizer {
    calls: Arc<Calls>,
    script: Mutex<VecDeque<Step>>,
    delay: Option<Duration>,
    fail_init: bool,
    ready: bool,
}

impl ScriptedRecognizer {
    fn next_step(&self) -> Step {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Step::Text(""))
        }
    }
}

#[async_trait::async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn initialize(&mut self) -> Result<()> {
        self.calls.ocr_inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(Error::Recognition("language pack missing".to_string()));
        }
        self.ready = true;
        Ok(())
    }

    async fn recognize(&self, _snapshot: &Snapshot) -> Result<String> {
        if !self.ready {
            return Err(Error::NotInitialized("text recognizer"));
        }

        let now = self.calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.recognized.fetch_add(1, Ordering::SeqCst);

        match self.next_step() {
            Step::Text(text) => Ok(text.to_string()),
            Step::NotReady => Err(Error::NotInitialized("text recognizer")),
        }
    }

    async fn terminate(&mut self) {
        self.calls.ocr_terminates.fetch_add(1, Ordering::SeqCst);
        self.ready = false;
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Directory keyed by MRN
pub struct StaticDirectory {
    calls: Arc<Calls>,
    records: HashMap<String, DirectoryRecord>,
    pub unavailable: AtomicBool,
}

#[async_trait::async_trait]
impl PatientDirectory for StaticDirectory {
    async fn search(
        &self,
        query: &DirectoryQuery,
    ) -> std::result::Result<Vec<DirectoryRecord>, DirectoryError> {
        self.calls.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Status(503));
        }

        let found = match query {
            DirectoryQuery::Mrn(mrn) => self.records.get(mrn).cloned(),
            DirectoryQuery::Name(name) => self
                .records
                .values()
                .find(|record| record.display_name.eq_ignore_ascii_case(name))
                .cloned(),
        };
        Ok(found.into_iter().collect())
    }
}

pub struct RecordingWindow {
    name: String,
    pub received: Mutex<Vec<BroadcastMessage>>,
}

impl RecordingWindow {
    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl Destination for RecordingWindow {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn send(&self, message: &BroadcastMessage) -> Result<()> {
        self.received.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// History storage with a slow disk
pub struct SlowStorage(pub Duration);

#[async_trait::async_trait]
impl HistoryStorage for SlowStorage {
    async fn load(&self) -> chartwatch_history::Result<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    async fn save(&self, _entries: &[HistoryEntry]) -> chartwatch_history::Result<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

/// Everything a test wants to inspect after driving a [`Pipeline`]
pub struct Harness {
    pub calls: Arc<Calls>,
    pub history: Arc<HistoryStore>,
    pub directory: Arc<StaticDirectory>,
    pub windows: Vec<Arc<RecordingWindow>>,
}

pub struct Fixture {
    script: Vec<Step>,
    delay: Option<Duration>,
    fail_ocr_init: bool,
}

impl Fixture {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: script.into_iter().collect(),
            delay: None,
            fail_ocr_init: false,
        }
    }

    pub fn texts(texts: &[&'static str]) -> Self {
        Self::new(texts.iter().copied().map(Step::Text))
    }

    pub fn recognize_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_ocr_init(mut self) -> Self {
        self.fail_ocr_init = true;
        self
    }

    pub fn build(self) -> (Pipeline, Harness) {
        self.build_with(Arc::new(HistoryStore::in_memory(100)))
    }

    pub fn build_with(self, history: Arc<HistoryStore>) -> (Pipeline, Harness) {
        let calls = Arc::new(Calls::default());

        let records = [("12345", "pat-1", "John Smith"), ("67890", "pat-2", "Jane Doe")]
            .into_iter()
            .map(|(mrn, id, name)| {
                let record = DirectoryRecord {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    mrn: Some(mrn.to_string()),
                };
                (mrn.to_string(), record)
            })
            .collect();
        let directory = Arc::new(StaticDirectory {
            calls: calls.clone(),
            records,
            unavailable: AtomicBool::new(false),
        });

        let windows: Vec<Arc<RecordingWindow>> = ["window-a", "window-b"]
            .into_iter()
            .map(|name| {
                Arc::new(RecordingWindow {
                    name: name.to_string(),
                    received: Mutex::new(Vec::new()),
                })
            })
            .collect();
        let destinations: Vec<Arc<dyn Destination>> = windows
            .iter()
            .map(|w| w.clone() as Arc<dyn Destination>)
            .collect();
        let registry: Arc<dyn DestinationRegistry> = Arc::new(destinations);

        let dispatcher = Arc::new(Dispatcher::new(history.clone(), None, registry, "ChartWatch"));

        let pipeline = Pipeline::new(
            Box::new(FakeSurface {
                calls: calls.clone(),
                active: false,
            }),
            Box::new(ScriptedRecognizer {
                calls: calls.clone(),
                script: Mutex::new(self.script.into()),
                delay: self.delay,
                fail_init: self.fail_ocr_init,
                ready: false,
            }),
            Arc::new(PatternExtractor::new(&ExtractorConfig::default()).unwrap()),
            Arc::new(DirectoryMatcher::new(directory.clone(), 0.0)),
            dispatcher,
        );

        let harness = Harness {
            calls,
            history,
            directory,
            windows,
        };
        (pipeline, harness)
    }
}
