use serde_json::Value;

use crate::core::{fingerprint::fingerprint, types::Document};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncDecision {
    /// The incoming document is the one already shown in the editor.
    AlreadyLoaded,
    /// The incoming document is this session's own write coming back.
    OwnWriteEcho,
    /// The document changed elsewhere; the editor must load it.
    Reload(Document),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub project: Value,
    pub fingerprint: String,
}

/// Per-session view of which deck content the editor holds and which content
/// this session last persisted. Never authoritative: the deck store is.
#[derive(Debug, Clone)]
pub struct SyncController {
    project_id: String,
    last_loaded: String,
    last_saved: Option<String>,
}

impl SyncController {
    pub fn new(initial: &Document) -> Self {
        Self::from_project(&initial.project_id, &initial.project)
    }

    pub fn from_project(project_id: &str, project: &Value) -> Self {
        Self {
            project_id: project_id.to_string(),
            last_loaded: fingerprint(project),
            last_saved: None,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn last_loaded(&self) -> &str {
        &self.last_loaded
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn on_external_change(&mut self, document: Document) -> SyncDecision {
        if document.fingerprint == self.last_loaded {
            return SyncDecision::AlreadyLoaded;
        }
        if self.last_saved.as_deref() == Some(document.fingerprint.as_str()) {
            self.last_loaded = document.fingerprint;
            return SyncDecision::OwnWriteEcho;
        }
        self.last_loaded = document.fingerprint.clone();
        SyncDecision::Reload(document)
    }

    /// Prepares an editor-originated save. State only moves once the write
    /// succeeds, via [`SyncController::record_saved`].
    pub fn request_save(&self, project: Value) -> PendingSave {
        let fingerprint = fingerprint(&project);
        PendingSave {
            project,
            fingerprint,
        }
    }

    pub fn record_saved(&mut self, saved: &PendingSave) {
        self.last_saved = Some(saved.fingerprint.clone());
    }
}
