use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use crate::{
    core::{errors::AppResult, types::Document},
    db::{repositories::decks, Database},
};

const CHANGE_FEED_CAPACITY: usize = 64;

/// Persisted decks plus a feed of every successful write.
pub trait DeckStore: Send + Sync {
    fn read<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, AppResult<Document>>;

    fn write<'a>(
        &'a self,
        project_id: &'a str,
        title: Option<&'a str>,
        project: &'a Value,
    ) -> BoxFuture<'a, AppResult<Document>>;

    fn subscribe(&self) -> broadcast::Receiver<Document>;
}

#[derive(Clone)]
pub struct SqliteDeckStore {
    db: Database,
    changes: broadcast::Sender<Document>,
    // Held from the write until its notification is queued, so the feed
    // order is the commit order.
    write_gate: Arc<Mutex<()>>,
}

impl SqliteDeckStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            db,
            changes,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl DeckStore for SqliteDeckStore {
    fn read<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, AppResult<Document>> {
        decks::read_deck(self.db.pool(), project_id).boxed()
    }

    fn write<'a>(
        &'a self,
        project_id: &'a str,
        title: Option<&'a str>,
        project: &'a Value,
    ) -> BoxFuture<'a, AppResult<Document>> {
        async move {
            let gate = self.write_gate.lock().await;
            let document = decks::write_deck(self.db.pool(), project_id, title, project).await?;
            // No subscribers is fine.
            let _ = self.changes.send(document.clone());
            drop(gate);
            tracing::debug!(
                project_id = %document.project_id,
                fingerprint = %document.fingerprint,
                "deck written"
            );
            Ok(document)
        }
        .boxed()
    }

    fn subscribe(&self) -> broadcast::Receiver<Document> {
        self.changes.subscribe()
    }
}
