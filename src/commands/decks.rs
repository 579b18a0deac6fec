use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{Document, ListDecksResponse, SaveDeckRequest},
    },
    db::repositories::decks,
    sync::store::DeckStore,
    AppState,
};

fn normalized_title(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(ToString::to_string)
}

pub async fn list_decks(state: &AppState) -> AppResult<ListDecksResponse> {
    let decks = decks::list_decks(state.db.pool()).await?;
    Ok(ListDecksResponse { decks })
}

pub async fn get_deck(state: &AppState, project_id: &str) -> AppResult<Document> {
    state.decks.read(project_id).await
}

/// Persists a deck through the shared store so open sessions are notified.
pub async fn save_deck(
    state: &AppState,
    project_id: &str,
    request: SaveDeckRequest,
) -> AppResult<Document> {
    if !request.project.is_object() {
        return Err(AppError::InvalidInput("project must be a JSON object".to_string()));
    }
    let title = normalized_title(request.title.as_deref());
    state
        .decks
        .write(project_id, title.as_deref(), &request.project)
        .await
}
