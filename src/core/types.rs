use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    ElevenLabs,
}

/// A persisted slide deck. `fingerprint` is always derived from `project`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub project_id: String,
    pub title: Option<String>,
    pub project: Value,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    pub project_id: String,
    pub title: Option<String>,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NarrationFragment {
    pub slide_index: u32,
    pub element_index: u32,
    pub text: String,
    pub order: u32,
}

/// One item of a batch write, as sent by the client after synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NarrationItem {
    pub slide_index: u32,
    pub element_index: u32,
    #[serde(alias = "ttsText")]
    pub text: String,
    #[serde(alias = "audioDataUrl")]
    pub audio_data: String,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub project_id: String,
    pub slide_index: u32,
    pub element_index: u32,
    pub text: String,
    pub audio_data: String,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Playback view of a clip, as returned inside a [`SlideNarration`] group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedClip {
    pub element_index: u32,
    pub text: String,
    pub audio_data: String,
    pub duration: i64,
}

impl From<AudioClip> for CachedClip {
    fn from(clip: AudioClip) -> Self {
        Self {
            element_index: clip.element_index,
            text: clip.text,
            audio_data: clip.audio_data,
            duration: clip.duration,
        }
    }
}

/// Clips keyed by slide index, each list ascending by element index.
pub type SlideNarration = BTreeMap<u32, Vec<CachedClip>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveNarrationResponse {
    pub saved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClearNarrationResponse {
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlideGenerationReport {
    pub index: u32,
    pub fragment_count: usize,
    pub synthesized: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateNarrationResponse {
    pub slides: Vec<SlideGenerationReport>,
    pub saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDeckRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub project: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDecksResponse {
    pub decks: Vec<DeckSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProviderKeyRequest {
    pub provider: Provider,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProviderKeyResponse {
    pub stored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub message: String,
}
