use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{
            ClearNarrationResponse, GenerateNarrationResponse, NarrationItem, Provider,
            SaveNarrationResponse, SlideNarration,
        },
    },
    db::repositories::{decks, narration},
    narration::generate::NarrationGenerator,
    providers::{elevenlabs::ElevenLabsClient, SpeechSynthesizer},
    security::keyring,
    AppState,
};

fn required_project_id(project_id: Option<&str>) -> AppResult<String> {
    match project_id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AppError::InvalidInput("missing projectId".to_string())),
    }
}

fn project_id_from_body(body: &Value) -> AppResult<String> {
    required_project_id(body.get("projectId").and_then(Value::as_str))
}

/// Validates a batch body without touching storage.
pub fn parse_batch(body: &Value) -> AppResult<(String, Vec<NarrationItem>)> {
    let project_id = project_id_from_body(body)?;
    let raw_items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::InvalidInput("items must be an array".to_string()))?;

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            serde_json::from_value::<NarrationItem>(raw.clone())
                .map_err(|err| AppError::InvalidInput(format!("items[{position}]: {err}")))
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok((project_id, items))
}

pub async fn get_narration_cache(
    state: &AppState,
    project_id: Option<&str>,
) -> AppResult<SlideNarration> {
    let project_id = required_project_id(project_id)?;
    let grouped = narration::get_for_project(state.db.pool(), &project_id).await?;
    tracing::debug!(project_id = %project_id, slides = grouped.len(), "narration cache read");
    Ok(grouped)
}

pub async fn save_narration_cache(state: &AppState, body: Value) -> AppResult<SaveNarrationResponse> {
    let (project_id, items) = parse_batch(&body)?;
    narration::save_batch(state.db.pool(), &project_id, &items, &state.config.narration).await
}

pub async fn clear_narration_cache(
    state: &AppState,
    project_id: Option<&str>,
) -> AppResult<ClearNarrationResponse> {
    let project_id = required_project_id(project_id)?;
    narration::clear_for_project(state.db.pool(), &project_id).await
}

pub async fn generate_narration(state: &AppState, body: Value) -> AppResult<GenerateNarrationResponse> {
    let project_id = project_id_from_body(&body)?;
    let voice_id = body.get("voiceId").and_then(Value::as_str);
    let deck = decks::read_deck(state.db.pool(), &project_id).await?;

    let synthesizer: Arc<dyn SpeechSynthesizer> = match &state.synthesizer {
        Some(synthesizer) => Arc::clone(synthesizer),
        None => {
            let api_key = keyring::get_provider_key(Provider::ElevenLabs)?;
            Arc::new(ElevenLabsClient::new(api_key, state.config.narration.model_id.clone())?)
        }
    };
    let generator = NarrationGenerator::new(synthesizer, state.config.narration.clone());
    generator
        .generate(&state.db, &project_id, &deck.project, voice_id)
        .await
}
