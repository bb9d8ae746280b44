//! Editing sessions: one campaign's flow open in a [`FlowEditor`].
//!
//! The editor submits a snapshot of the flow after every mutation.  A
//! [`FlowWriter`] takes those snapshots off the queue and hands them to
//! [`CampaignStore::update_flow`], either on demand ([`EditingSession::sync`])
//! or from a background task ([`EditingSession::spawn_writer`]).  Closing the
//! session applies whatever is still pending.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flow::{Flow, FlowEditor};
use queue::{QueueError, Snapshot, SnapshotQueue, SnapshotSink};
use storage::BlobStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{CampaignError, CampaignStore};

/// A store shared between the caller and background writers.
pub type SharedStore<B> = Arc<Mutex<CampaignStore<B>>>;

// ---------------------------------------------------------------------------
// FlowWriter
// ---------------------------------------------------------------------------

/// Applies flow snapshots to one campaign.
///
/// Snapshots with a sequence number at or below the last one applied are
/// skipped, so an older flow never overwrites a newer one.
pub struct FlowWriter<B> {
    store: SharedStore<B>,
    campaign_id: Uuid,
    last_applied: Arc<AtomicU64>,
}

impl<B> Clone for FlowWriter<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            campaign_id: self.campaign_id,
            last_applied: Arc::clone(&self.last_applied),
        }
    }
}

impl<B> FlowWriter<B> {
    pub fn new(store: SharedStore<B>, campaign_id: Uuid) -> Self {
        Self {
            store,
            campaign_id,
            last_applied: Arc::default(),
        }
    }

    pub fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }

    /// Highest sequence number written to the store, 0 if none.
    pub fn last_applied(&self) -> u64 {
        self.last_applied.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<B: BlobStore + 'static> SnapshotSink<Flow> for FlowWriter<B> {
    async fn apply(&self, snapshot: Snapshot<Flow>) -> Result<(), QueueError> {
        // Held across the check and the write so writers cannot interleave.
        let mut store = self.store.lock().await;

        let last = self.last_applied.load(Ordering::Acquire);
        if snapshot.seq <= last {
            debug!(seq = snapshot.seq, last, "stale flow snapshot skipped");
            return Ok(());
        }

        if !store.update_flow(self.campaign_id, snapshot.value) {
            return Err(QueueError::Rejected {
                seq: snapshot.seq,
                reason: format!("campaign {} no longer exists", self.campaign_id),
            });
        }
        self.last_applied.store(snapshot.seq, Ordering::Release);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EditingSession
// ---------------------------------------------------------------------------

/// A campaign's flow open for editing.
pub struct EditingSession<B> {
    editor: FlowEditor,
    writer: FlowWriter<B>,
    worker: Option<JoinHandle<usize>>,
}

impl<B: BlobStore + 'static> EditingSession<B> {
    /// Open the flow of `campaign_id`.  Returns `None` if no such campaign exists.
    pub async fn open(store: &SharedStore<B>, campaign_id: Uuid) -> Option<Self> {
        let flow = store.lock().await.get(campaign_id)?.flow.clone();
        info!(campaign_id = %campaign_id, nodes = flow.nodes.len(), "editing session opened");

        let changes = Arc::new(SnapshotQueue::new());
        Some(Self {
            editor: FlowEditor::new(flow, changes),
            writer: FlowWriter::new(Arc::clone(store), campaign_id),
            worker: None,
        })
    }

    /// Like [`open`](Self::open), failing with [`CampaignError::NotFound`].
    pub async fn open_existing(
        store: &SharedStore<B>,
        campaign_id: Uuid,
    ) -> Result<Self, CampaignError> {
        Self::open(store, campaign_id)
            .await
            .ok_or(CampaignError::NotFound(campaign_id))
    }

    pub fn campaign_id(&self) -> Uuid {
        self.writer.campaign_id()
    }

    pub fn editor(&self) -> &FlowEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut FlowEditor {
        &mut self.editor
    }

    pub fn writer(&self) -> &FlowWriter<B> {
        &self.writer
    }

    fn changes(&self) -> &Arc<SnapshotQueue<Flow>> {
        self.editor.changes()
    }

    /// Write the newest pending snapshot now, if any.
    ///
    /// Returns the sequence number written.
    pub async fn sync(&self) -> Result<Option<u64>, QueueError> {
        queue::flush(self.changes().as_ref(), &self.writer).await
    }

    /// Drain the change queue from a background task until the session closes.
    ///
    /// Calling this again while a writer is running does nothing.
    pub fn spawn_writer(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let changes = Arc::clone(self.changes());
        let writer = self.writer.clone();
        self.worker = Some(tokio::spawn(async move {
            queue::drain(changes.as_ref(), &writer).await
        }));
        debug!(campaign_id = %self.campaign_id(), "background flow writer started");
    }

    /// End the session, writing any change still pending, and return the
    /// final flow.
    pub async fn close(mut self) -> Result<Flow, CampaignError> {
        let changes = Arc::clone(self.changes());
        changes.close();

        match self.worker.take() {
            Some(worker) => {
                let applied = worker
                    .await
                    .map_err(|e| QueueError::WorkerStopped(e.to_string()))?;
                debug!(applied, "background flow writer finished");
            }
            None => {
                self.sync().await?;
            }
        }

        info!(
            campaign_id = %self.campaign_id(),
            last_applied = self.writer.last_applied(),
            "editing session closed"
        );
        Ok(self.editor.into_flow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow::{Connection, Position};
    use nodes::NodeType;
    use storage::MemoryBlobStore;

    fn shared(backend: MemoryBlobStore) -> SharedStore<MemoryBlobStore> {
        Arc::new(Mutex::new(CampaignStore::open(backend)))
    }

    #[tokio::test]
    async fn open_unknown_campaign_returns_none() {
        let store = shared(MemoryBlobStore::new());
        assert!(EditingSession::open(&store, Uuid::new_v4()).await.is_none());
        assert!(matches!(
            EditingSession::open_existing(&store, Uuid::new_v4()).await,
            Err(CampaignError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sync_writes_only_the_newest_flow() {
        let backend = MemoryBlobStore::new();
        let store = shared(backend.clone());
        let id = store.lock().await.create().id;

        let mut session = EditingSession::open(&store, id).await.unwrap();
        let editor = session.editor_mut();
        let trigger = editor.add_node_at(NodeType::Trigger, Position::new(100.0, 100.0));
        let sms = editor.add_node_at(NodeType::Sms, Position::new(300.0, 100.0));
        editor.connect(Connection::new(&trigger.id, &sms.id)).unwrap();

        assert_eq!(session.sync().await.unwrap(), Some(3));
        assert_eq!(session.sync().await.unwrap(), None);

        let stored = store.lock().await.get(id).unwrap().flow.clone();
        assert_eq!(&stored, session.editor().flow());
        assert_eq!(stored.edges[0].source, trigger.id);

        // The write reached the backend, not just memory.
        let reloaded = CampaignStore::open(backend);
        assert_eq!(reloaded.get(id).unwrap().flow, stored);
    }

    #[tokio::test]
    async fn close_applies_pending_change() {
        let store = shared(MemoryBlobStore::new());
        let id = store.lock().await.create().id;

        let mut session = EditingSession::open(&store, id).await.unwrap();
        session.editor_mut().add_node_at(NodeType::Email, Position::default());
        let flow = session.close().await.unwrap();

        assert_eq!(flow.nodes.len(), 1);
        assert_eq!(store.lock().await.get(id).unwrap().flow, flow);
    }

    #[tokio::test]
    async fn background_writer_keeps_store_current() {
        let store = shared(MemoryBlobStore::new());
        let id = store.lock().await.create().id;

        let mut session = EditingSession::open(&store, id).await.unwrap();
        session.spawn_writer();
        for i in 0..10 {
            session
                .editor_mut()
                .add_node_at(NodeType::Delay, Position::new(f64::from(i) * 50.0, 0.0));
            tokio::task::yield_now().await;
        }
        let flow = session.close().await.unwrap();

        assert_eq!(flow.nodes.len(), 10);
        assert_eq!(store.lock().await.get(id).unwrap().flow, flow);
    }

    #[tokio::test]
    async fn writer_skips_stale_snapshots() {
        let store = shared(MemoryBlobStore::new());
        let id = store.lock().await.create().id;
        let writer = FlowWriter::new(Arc::clone(&store), id);

        let mut newer = Flow::default();
        newer.nodes.push(flow::FlowNode {
            id: "sms-1".into(),
            position: Position::default(),
            data: nodes::defaults_for(NodeType::Sms),
        });

        writer.apply(Snapshot { seq: 5, value: newer.clone() }).await.unwrap();
        writer.apply(Snapshot { seq: 3, value: Flow::default() }).await.unwrap();

        assert_eq!(writer.last_applied(), 5);
        assert_eq!(store.lock().await.get(id).unwrap().flow, newer);
    }

    #[tokio::test]
    async fn writer_rejects_removed_campaign() {
        let store = shared(MemoryBlobStore::new());
        let id = store.lock().await.create().id;
        let writer = FlowWriter::new(Arc::clone(&store), id);
        store.lock().await.remove(id);

        let result = writer.apply(Snapshot { seq: 1, value: Flow::default() }).await;

        assert!(matches!(result, Err(QueueError::Rejected { seq: 1, .. })));
        assert_eq!(writer.last_applied(), 0);
    }
}
