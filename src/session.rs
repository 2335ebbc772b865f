use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::formats::{ChapterRef, DocumentRecord, HistoryRecord};
use crate::position::{InitialPosition, capture_current_position, compute_initial_position};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct OpenedDocument {
    pub document: DocumentRecord,
    pub history: Option<HistoryRecord>,
    pub position: InitialPosition,
}

/// Loads a document and works out where the reader left off. Failing to
/// load the document is an error; failing to read its history only loses
/// the restore.
pub async fn open_document(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<OpenedDocument> {
    let document = store
        .get_document(id)
        .await
        .context("load document")?
        .ok_or_else(|| anyhow::anyhow!("document not found: {id}"))?;

    let history = match store.get_history(id).await {
        Ok(history) => history,
        Err(err) => {
            tracing::warn!(document_id = %id, ?err, "history unavailable; opening at start");
            None
        }
    };

    let position = compute_initial_position(&document.chapters, history.as_ref());
    tracing::debug!(
        document_id = %id,
        scroll = ?position.scroll_target,
        chapter = ?position.chapter_target.as_ref().map(|c| &c.anchor_id),
        "opened document"
    );

    Ok(OpenedDocument {
        document,
        history,
        position,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLink {
    pub id: Uuid,
    pub title: String,
    pub sequence_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbors {
    pub previous: Option<ChunkLink>,
    pub next: Option<ChunkLink>,
}

/// Adjacent chunks of the same group, for moving between parts of a book.
pub async fn neighbors(
    store: &dyn DocumentStore,
    document: &DocumentRecord,
) -> anyhow::Result<Neighbors> {
    let Some(seq) = document.sequence_index else {
        return Ok(Neighbors::default());
    };
    let siblings = store
        .list_documents_by_group(document.group_id)
        .await
        .context("list group documents")?;

    let link = |target: usize| {
        siblings
            .iter()
            .find(|d| d.sequence_index == Some(target))
            .map(|d| ChunkLink {
                id: d.id,
                title: d.extracted_title.clone(),
                sequence_index: d.sequence_index,
            })
    };

    Ok(Neighbors {
        previous: seq.checked_sub(1).and_then(link),
        next: link(seq + 1),
    })
}

#[derive(Debug)]
struct ViewState {
    scroll: f64,
    chapter: Option<ChapterRef>,
    last_capture: Instant,
    previous: Option<HistoryRecord>,
}

struct SessionInner {
    store: Arc<dyn DocumentStore>,
    document_id: Uuid,
    state: Mutex<ViewState>,
}

impl SessionInner {
    /// Best effort: store errors are logged and dropped. The view state is
    /// only locked while the record is built, never across the store write.
    async fn capture(&self, reason: &'static str) -> bool {
        let record = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_capture).as_secs_f64();
            let record = capture_current_position(state.scroll, state.chapter.as_ref())
                .into_record(self.document_id, state.previous.as_ref(), elapsed, Utc::now());
            // A failed write still carries its reading time into the next record.
            state.last_capture = now;
            state.previous = Some(record.clone());
            record
        };

        match self.store.upsert_history(&record).await {
            Ok(()) => {
                tracing::debug!(document_id = %self.document_id, reason, "captured position");
                true
            }
            Err(err) => {
                tracing::warn!(document_id = %self.document_id, reason, ?err, "position capture failed");
                false
            }
        }
    }
}

/// Live reading state of one open document. Captures the position every
/// `interval` and once more on [`ReadingSession::close`]. Dropping the
/// session stops the timer without a final capture. Neither waits for a
/// store write.
pub struct ReadingSession {
    inner: Arc<SessionInner>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ReadingSession {
    pub fn start(
        store: Arc<dyn DocumentStore>,
        opened: &OpenedDocument,
        interval: Duration,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            store,
            document_id: opened.document.id,
            state: Mutex::new(ViewState {
                scroll: opened.position.scroll_target.unwrap_or(0.0),
                chapter: opened.position.chapter_target.clone(),
                last_capture: Instant::now(),
                previous: opened.history.clone(),
            }),
        });

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let interval = interval.max(Duration::from_millis(1));
        let timer_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        timer_inner.capture("interval").await;
                    }
                }
            }
        });

        Self {
            inner,
            shutdown: Some(shutdown_tx),
        }
    }

    pub async fn update(&self, scroll: f64, chapter: Option<ChapterRef>) {
        let mut state = self.inner.state.lock().await;
        state.scroll = scroll;
        state.chapter = chapter;
    }

    pub async fn current(&self) -> (f64, Option<ChapterRef>) {
        let state = self.inner.state.lock().await;
        (state.scroll, state.chapter.clone())
    }

    /// Returns whether the store accepted the record.
    pub async fn capture_now(&self) -> bool {
        self.inner.capture("manual").await
    }

    /// Stops the timer and hands the final capture to its own task. Awaiting
    /// the handle yields whether the store accepted the record; a timer
    /// capture still in flight finishes on its own.
    pub fn close(mut self) -> JoinHandle<bool> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.capture("close").await })
    }
}

impl Drop for ReadingSession {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
