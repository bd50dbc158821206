//! Fan-out generation: one streaming task per placeholder.
//!
//! Each task coalesces backend deltas and flushes them as
//! [`GenerationEvent::Progress`] at most once per throttle interval, then
//! reports a single [`GenerationEvent::Finished`]. The editor stays on the
//! caller's side: events are folded in by [`Coordinator::drive`].

use std::sync::Arc;
use std::time::Duration;

use textloom::v1::{
    BatchId, BatchReport, Editor, GenerationBatch, GenerationEvent, GenerationMeta,
    GenerationRequest, GenerationResult, NodeId,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::CompletionBackend;
use crate::error::{GenError, Result};

/// Configuration for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Minimum spacing between progress events of one request
    pub throttle: Duration,
    /// Capacity of the event channel handed out by [`Coordinator::start`]
    pub channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(100),
            channel_capacity: 64,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

pub struct Coordinator {
    backend: Arc<dyn CompletionBackend>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator over `backend` (uses defaults if `config` is None).
    pub fn new(backend: Arc<dyn CompletionBackend>, config: Option<CoordinatorConfig>) -> Self {
        Self {
            backend,
            config: config.unwrap_or_default(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Spawn one streaming task per request of `batch`, all reporting to
    /// `events`.
    pub fn spawn(&self, batch: &GenerationBatch, events: mpsc::Sender<GenerationEvent>) -> BatchHandle {
        let mut cancels = Vec::with_capacity(batch.requests.len());
        let mut tasks = Vec::with_capacity(batch.requests.len());

        for request in &batch.requests {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            cancels.push((request.node_id.clone(), cancel_tx));
            tasks.push(tokio::spawn(run_request(
                Arc::clone(&self.backend),
                request.clone(),
                events.clone(),
                cancel_rx,
                self.config.throttle,
            )));
        }

        tracing::info!(batch = batch.id, tasks = tasks.len(), "spawned generation tasks");
        BatchHandle {
            batch: batch.id,
            cancels,
            tasks,
        }
    }

    /// Plant placeholders in `editor` and start streaming into them.
    pub fn start(
        &self,
        editor: &mut Editor,
        params: GenerationMeta,
        count: usize,
    ) -> Result<(BatchHandle, mpsc::Receiver<GenerationEvent>)> {
        let batch = editor.begin_generation(params, count)?;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let handle = self.spawn(&batch, tx);
        Ok((handle, rx))
    }

    /// Fold events into `editor` until `batch` settles.
    pub async fn drive(
        editor: &mut Editor,
        batch: BatchId,
        events: &mut mpsc::Receiver<GenerationEvent>,
    ) -> Result<BatchReport> {
        while let Some(event) = events.recv().await {
            if let Some(report) = editor.apply_generation_event(event)
                && report.batch == batch
            {
                return Ok(report);
            }
        }
        Err(GenError::ChannelClosed(batch))
    }

    /// Generate `count` continuations of the focus and wait for all of them.
    pub async fn run(
        &self,
        editor: &mut Editor,
        params: GenerationMeta,
        count: usize,
    ) -> Result<BatchReport> {
        let (handle, mut events) = self.start(editor, params, count)?;
        let report = Self::drive(editor, handle.batch(), &mut events).await?;
        handle.join().await?;
        Ok(report)
    }

    /// Stop every task of `handle` and drop its pending placeholders.
    pub fn cancel(editor: &mut Editor, handle: &BatchHandle) -> Option<BatchReport> {
        handle.cancel_all();
        editor.cancel_generation(handle.batch())
    }
}

/// Stream one request, coalescing deltas between throttle ticks.
async fn run_request(
    backend: Arc<dyn CompletionBackend>,
    request: GenerationRequest,
    events: mpsc::Sender<GenerationEvent>,
    mut cancel: watch::Receiver<bool>,
    throttle: Duration,
) {
    let (delta_tx, mut delta_rx) = mpsc::unbounded_channel::<String>();
    let mut stream = backend.stream(&request.prompt, &request.params, delta_tx);
    let mut tick = tokio::time::interval(throttle);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending = String::new();
    let mut watching = true;

    let result = loop {
        tokio::select! {
            biased;

            changed = cancel.changed(), if watching => {
                match changed {
                    Ok(()) if *cancel.borrow() => break GenerationResult::Cancelled,
                    Ok(()) => {}
                    // Handle dropped: nobody can cancel any more.
                    Err(_) => watching = false,
                }
            }

            Some(delta) = delta_rx.recv() => {
                pending.push_str(&delta);
            }

            outcome = &mut stream => {
                break match outcome {
                    Ok(text) => GenerationResult::Completed(text),
                    Err(reason) => GenerationResult::Failed(reason),
                };
            }

            _ = tick.tick() => {
                if !pending.is_empty() {
                    let delta = std::mem::take(&mut pending);
                    let progress = GenerationEvent::Progress {
                        node_id: request.node_id.clone(),
                        delta,
                    };
                    if events.send(progress).await.is_err() {
                        return; // Receiver dropped
                    }
                }
            }
        }
    };
    drop(stream);

    tracing::debug!(node = %request.node_id, ?result, "request finished");
    let _ = events
        .send(GenerationEvent::Finished {
            node_id: request.node_id,
            result,
        })
        .await;
}

/// Handle to the tasks of one batch
pub struct BatchHandle {
    batch: BatchId,
    cancels: Vec<(NodeId, watch::Sender<bool>)>,
    tasks: Vec<JoinHandle<()>>,
}

impl BatchHandle {
    pub fn batch(&self) -> BatchId {
        self.batch
    }

    /// Cancel a single request. Returns false for a node not in this batch.
    pub fn cancel(&self, node_id: &str) -> bool {
        match self.cancels.iter().find(|(id, _)| id == node_id) {
            Some((_, tx)) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, tx) in &self.cancels {
            let _ = tx.send(true);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every task to exit.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}
