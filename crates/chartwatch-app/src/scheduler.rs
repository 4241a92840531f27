use std::sync::Arc;
use std::time::Duration;

use chartwatch_core::Result;
use chartwatch_types::ActiveContext;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{CycleOutcome, Pipeline};
use crate::status::MonitorStatus;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the monitoring on/off lifecycle.
///
/// Cycles run inline in one task, so a slow cycle delays the next tick
/// instead of overlapping it.
pub struct Scheduler {
    pipeline: Arc<Mutex<Pipeline>>,
    interval: Duration,
    cycle_timeout: Duration,
    status: Arc<RwLock<MonitorStatus>>,
    running_tx: watch::Sender<bool>,
    running: Option<Running>,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, interval: Duration, cycle_timeout: Duration) -> Self {
        let (running_tx, _) = watch::channel(false);
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            interval,
            cycle_timeout,
            status: Arc::new(RwLock::new(MonitorStatus::default())),
            running_tx,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Follows running state, including the loop ending on its own
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    pub async fn active_patient(&self) -> Option<ActiveContext> {
        self.pipeline.lock().await.active().cloned()
    }

    pub async fn status(&self) -> MonitorStatus {
        self.status.read().await.clone()
    }

    /// Acquire capture and OCR and begin cycling. `Ok(false)` if already running.
    pub async fn start(&mut self) -> Result<bool> {
        if self.is_running() {
            return Ok(false);
        }

        // The previous loop may have ended by itself after a fatal worker error
        if let Some(finished) = self.running.take() {
            let _ = finished.handle.await;
        }

        if let Err(e) = self.pipeline.lock().await.acquire().await {
            tracing::error!("Failed to start monitoring: {e}");
            self.status.write().await.last_error = Some(e.to_string());
            return Err(e);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            self.pipeline.clone(),
            self.interval,
            self.cycle_timeout,
            self.status.clone(),
            self.running_tx.clone(),
            cancel.clone(),
        ));
        self.running = Some(Running { cancel, handle });

        self.status.write().await.running = true;
        self.running_tx.send_replace(true);
        tracing::info!("Monitoring started, every {:?}", self.interval);
        Ok(true)
    }

    /// Cancel the timer, let an in-flight cycle finish, then release capture
    /// and OCR and clear the active patient. Returns false if nothing was running.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };

        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::error!("Monitor loop failed to join: {e}");
        }

        let released = self.pipeline.lock().await.release().await;

        self.status.write().await.running = false;
        self.running_tx.send_replace(false);
        if released {
            tracing::info!("Monitoring stopped");
        }
        released
    }

    pub async fn toggle(&mut self) -> Result<bool> {
        if self.is_running() {
            self.stop().await;
            Ok(false)
        } else {
            self.start().await?;
            Ok(true)
        }
    }
}

async fn monitor_loop(
    pipeline: Arc<Mutex<Pipeline>>,
    interval: Duration,
    cycle_timeout: Duration,
    status: Arc<RwLock<MonitorStatus>>,
    running_tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut cycle = pipeline.lock().await;
        // Only detection is bounded; a transition the tracker accepted is
        // always fanned out in full
        let result = match tokio::time::timeout(cycle_timeout, cycle.detect()).await {
            Ok(Ok(detection)) => Ok(Ok(cycle.commit(detection).await)),
            Ok(Err(e)) => Ok(Err(e)),
            Err(elapsed) => Err(elapsed),
        };

        let mut counters = status.write().await;
        counters.cycles_run += 1;
        counters.last_cycle_at = Some(Utc::now());

        match result {
            Ok(Ok(CycleOutcome::Notified(report))) => {
                counters.notifications_sent += 1;
                tracing::debug!("Cycle notified {}", report.notification_id);
            }
            Ok(Ok(CycleOutcome::NoIdentity | CycleOutcome::NoMatch)) => {
                counters.cycles_skipped += 1;
            }
            Ok(Ok(CycleOutcome::Unchanged)) => {}
            Ok(Err(e)) if e.is_unrecoverable() => {
                tracing::error!("Monitoring halted: {e}");
                counters.cycles_failed += 1;
                counters.last_error = Some(e.to_string());
                counters.running = false;
                cycle.release().await;
                running_tx.send_replace(false);
                break;
            }
            Ok(Err(e)) => {
                tracing::warn!("Cycle aborted: {e}");
                counters.cycles_failed += 1;
                counters.last_error = Some(e.to_string());
            }
            Err(_) => {
                tracing::warn!("Cycle timed out after {:?}", cycle_timeout);
                counters.cycles_failed += 1;
                counters.last_error = Some("cycle timed out".to_string());
            }
        }
    }

    tracing::debug!("Monitor loop exiting");
}
