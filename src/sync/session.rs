use std::sync::Arc;

use serde_json::Value;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::{sleep, sleep_until, Instant},
};

use crate::{
    core::{
        config::SyncConfig,
        errors::{AppError, AppResult},
        types::Document,
    },
    sync::{
        controller::{SyncController, SyncDecision},
        store::DeckStore,
    },
};

const CLOSE_FLUSH_ATTEMPTS: usize = 3;

/// Instructions for the editing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Discard the in-memory document and load this one.
    Replace(Document),
    Saved { fingerprint: String },
    SaveFailed { message: String, retrying: bool },
}

enum SessionCommand {
    RequestSave(Value),
    ExternalChange(Document),
    Close(oneshot::Sender<AppResult<Option<String>>>),
}

/// Handle to a running editing session. Dropping it without calling
/// [`SyncSessionHandle::close`] still flushes the pending save.
pub struct SyncSessionHandle {
    project_id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SyncSessionHandle {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Queues an editor-originated save. Never waits on storage.
    pub fn request_save(&self, project: Value) -> AppResult<()> {
        self.send(SessionCommand::RequestSave(project))
    }

    /// Delivers a deck change observed outside the store's own feed.
    pub fn on_external_change(&self, document: Document) -> AppResult<()> {
        self.send(SessionCommand::ExternalChange(document))
    }

    /// Flushes the latest pending save and stops the session. Returns the
    /// fingerprint this session last persisted, if any.
    pub async fn close(self) -> AppResult<Option<String>> {
        let (reply, outcome) = oneshot::channel();
        self.send(SessionCommand::Close(reply))?;
        let result = outcome
            .await
            .map_err(|_| AppError::Internal("sync session stopped before closing".to_string()))?;
        self.task
            .await
            .map_err(|err| AppError::Internal(format!("sync session task failed: {err}")))?;
        result
    }

    fn send(&self, command: SessionCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::Internal(format!("sync session for {} is closed", self.project_id)))
    }
}

/// Starts a session for the editor currently showing `initial`.
pub fn spawn_session(
    store: Arc<dyn DeckStore>,
    initial: &Document,
    config: SyncConfig,
) -> (SyncSessionHandle, mpsc::UnboundedReceiver<EditorEvent>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = SyncSession {
        controller: SyncController::new(initial),
        changes: Some(store.subscribe()),
        store,
        config,
        commands: commands_rx,
        events: events_tx,
        pending: None,
        deadline: None,
    };
    let task = tokio::spawn(session.run());
    let handle = SyncSessionHandle {
        project_id: initial.project_id.clone(),
        commands: commands_tx,
        task,
    };
    (handle, events_rx)
}

struct SyncSession {
    controller: SyncController,
    store: Arc<dyn DeckStore>,
    changes: Option<broadcast::Receiver<Document>>,
    config: SyncConfig,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<EditorEvent>,
    pending: Option<Value>,
    deadline: Option<Instant>,
}

impl SyncSession {
    async fn run(mut self) {
        tracing::debug!(project_id = self.controller.project_id(), "sync session started");
        loop {
            let deadline = self.deadline;
            tokio::select! {
                // Change notifications go first so an echo of an earlier write
                // is matched before the next save moves `last_saved`.
                biased;

                change = recv_change(&mut self.changes), if self.changes.is_some() => {
                    self.on_feed(change).await;
                }
                command = self.commands.recv() => match command {
                    Some(SessionCommand::RequestSave(project)) => {
                        self.pending = Some(project);
                        self.deadline = Some(Instant::now() + self.config.debounce);
                    }
                    Some(SessionCommand::ExternalChange(document)) => {
                        self.on_document(document);
                    }
                    Some(SessionCommand::Close(reply)) => {
                        let result = self.close().await;
                        let _ = reply.send(result);
                        break;
                    }
                    None => {
                        let _ = self.close().await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                }
            }
        }
        tracing::debug!(project_id = self.controller.project_id(), "sync session closed");
    }

    async fn on_feed(&mut self, change: Result<Document, broadcast::error::RecvError>) {
        match change {
            Ok(document) => {
                if document.project_id == self.controller.project_id() {
                    self.on_document(document);
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(
                    project_id = self.controller.project_id(),
                    missed,
                    "deck change feed lagged, re-reading deck"
                );
                let project_id = self.controller.project_id().to_string();
                match self.store.read(&project_id).await {
                    Ok(document) => self.on_document(document),
                    Err(err) => tracing::warn!(project_id = %project_id, error = %err, "deck re-read failed"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.changes = None;
            }
        }
    }

    fn on_document(&mut self, document: Document) {
        match self.controller.on_external_change(document) {
            SyncDecision::AlreadyLoaded | SyncDecision::OwnWriteEcho => {}
            SyncDecision::Reload(document) => {
                if self.pending.take().is_some() {
                    tracing::info!(
                        project_id = self.controller.project_id(),
                        "external deck change supersedes pending save"
                    );
                }
                self.deadline = None;
                self.emit(EditorEvent::Replace(document));
            }
        }
    }

    /// Writes the pending document. On failure it stays pending and a retry
    /// is scheduled unless a newer edit replaces it first.
    async fn flush(&mut self) -> bool {
        self.deadline = None;
        let Some(project) = self.pending.take() else {
            return true;
        };
        let save = self.controller.request_save(project);
        let project_id = self.controller.project_id().to_string();

        match self.store.write(&project_id, None, &save.project).await {
            Ok(_) => {
                self.controller.record_saved(&save);
                self.emit(EditorEvent::Saved {
                    fingerprint: save.fingerprint,
                });
                true
            }
            Err(err) => {
                tracing::warn!(project_id = %project_id, error = %err, "deck save failed");
                self.pending = Some(save.project);
                self.deadline = Some(Instant::now() + self.config.retry_delay);
                self.emit(EditorEvent::SaveFailed {
                    message: err.to_string(),
                    retrying: true,
                });
                false
            }
        }
    }

    async fn close(&mut self) -> AppResult<Option<String>> {
        for attempt in 1..=CLOSE_FLUSH_ATTEMPTS {
            if self.flush().await {
                return Ok(self.controller.last_saved().map(ToString::to_string));
            }
            if attempt < CLOSE_FLUSH_ATTEMPTS {
                sleep(self.config.retry_delay).await;
            }
        }
        self.deadline = None;
        self.emit(EditorEvent::SaveFailed {
            message: "session closed with unsaved changes".to_string(),
            retrying: false,
        });
        Err(AppError::StorageUnavailable(format!(
            "could not persist deck {} before closing",
            self.controller.project_id()
        )))
    }

    fn emit(&self, event: EditorEvent) {
        // The editor may already be gone.
        let _ = self.events.send(event);
    }
}

async fn recv_change(
    changes: &mut Option<broadcast::Receiver<Document>>,
) -> Result<Document, broadcast::error::RecvError> {
    match changes {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
