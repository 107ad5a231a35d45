//! Background scheduling of prefilter passes.

use super::Prefilter;
use crate::error::PrefilterError;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Runs a prefilter's passes on a dedicated thread, waiting the prefilter's
/// current [`Prefilter::update_interval`] between passes.
pub struct Scheduler;

impl Scheduler {
    /// Begin the scan and start the repeating task.
    pub fn spawn(prefilter: Arc<dyn Prefilter>) -> Result<ScheduleHandle, PrefilterError> {
        prefilter.begin_scan()?;

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicUsize::new(0));

        let task = prefilter.clone();
        let task_ticks = ticks.clone();
        let thread = std::thread::Builder::new()
            .name(format!("{}-scheduler", prefilter.name()))
            .spawn(move || loop {
                if let Err(e) = task.update_scan() {
                    tracing::warn!("{} pass failed: {}", task.name(), e);
                }
                task_ticks.fetch_add(1, Ordering::Relaxed);

                match stop_rx.recv_timeout(task.update_interval()) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(PrefilterError::Spawn)?;

        tracing::debug!("{} scheduled", prefilter.name());

        Ok(ScheduleHandle {
            prefilter,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            ticks,
        })
    }
}

/// Handle to a running [`Scheduler`] task. Dropping it stops the task.
pub struct ScheduleHandle {
    prefilter: Arc<dyn Prefilter>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    ticks: Arc<AtomicUsize>,
}

impl ScheduleHandle {
    /// Passes started so far.
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn prefilter(&self) -> &Arc<dyn Prefilter> {
        &self.prefilter
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop after the in-flight pass. No further chunks are dequeued once
    /// this is called; chunks already being read finish normally.
    pub fn stop(mut self) -> usize {
        self.shutdown();
        self.ticks()
    }

    fn shutdown(&mut self) {
        self.prefilter.cancel();
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("{} scheduler thread panicked", self.prefilter.name());
            }
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
