// Background I/O for the GUI thread. Jobs go in over one channel, results come
// back over another and are drained once per frame. The GUI never blocks on
// the network.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use anyhow::Context;

use super::generator::{ContentGenerator, GenerateRequest};
use super::store::{StoreError, StoreNode, TreeStore};
use super::sync::{LoadTicket, SavePlan};
use crate::graph_utils::content::{ContentKind, ContentRecord};
use crate::graph_utils::graph::LocalId;

#[derive(Debug)]
pub enum SyncJob {
    Load(LoadTicket),
    Save(SavePlan),
    Generate { node: LocalId, kind: ContentKind, request: GenerateRequest },
}

#[derive(Debug)]
pub enum SyncEvent {
    Loaded { ticket: LoadTicket, result: Result<Vec<StoreNode>, StoreError> },
    Saved { result: Result<(), StoreError> },
    Generated { node: LocalId, kind: ContentKind, result: Result<Vec<ContentRecord>, StoreError> },
}

pub struct SyncWorker {
    jobs: Option<Sender<SyncJob>>,
    events: Receiver<SyncEvent>,
    thread: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Start the worker thread with its own tokio runtime. `repaint` is called
    /// after every finished job so an idle GUI wakes up to apply it.
    pub fn spawn(
        store: Arc<dyn TreeStore>,
        generator: Arc<dyn ContentGenerator>,
        repaint: impl Fn() + Send + Sync + 'static,
    ) -> anyhow::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<SyncJob>();
        let (event_tx, event_rx) = mpsc::channel::<SyncEvent>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("mind-loom-sync")
            .build()
            .context("Failed to create tokio runtime for sync")?;
        let repaint: Arc<dyn Fn() + Send + Sync> = Arc::new(repaint);

        let thread = std::thread::Builder::new()
            .name("mind-loom-sync-broker".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let (store, generator, tx, repaint) =
                        (store.clone(), generator.clone(), event_tx.clone(), repaint.clone());
                    runtime.spawn(async move {
                        let ev = run_job(job, store.as_ref(), generator.as_ref()).await;
                        if tx.send(ev).is_ok() {
                            repaint();
                        }
                    });
                }
                runtime.shutdown_background();
                log::debug!("sync worker stopped");
            })
            .context("Failed to spawn sync worker thread")?;

        Ok(Self { jobs: Some(job_tx), events: event_rx, thread: Some(thread) })
    }

    pub fn submit(&self, job: SyncJob) -> anyhow::Result<()> {
        self.jobs
            .as_ref()
            .and_then(|tx| tx.send(job).ok())
            .ok_or_else(|| anyhow::anyhow!("sync worker is not running"))
    }

    /// Everything that finished since the last call.
    pub fn poll(&self) -> Vec<SyncEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        // closing the job channel ends the broker loop
        self.jobs.take();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

async fn run_job(job: SyncJob, store: &dyn TreeStore, generator: &dyn ContentGenerator) -> SyncEvent {
    match job {
        SyncJob::Load(ticket) => {
            let result = store.load(ticket.mindmap).await;
            SyncEvent::Loaded { ticket, result }
        }
        SyncJob::Save(plan) => SyncEvent::Saved { result: store.save(plan.mindmap, &plan.nodes).await },
        SyncJob::Generate { node, kind, request } => {
            let result = generator.generate(kind, &request).await;
            SyncEvent::Generated { node, kind, result }
        }
    }
}
