use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::{
    core::{
        config::NarrationConfig,
        errors::{AppError, AppResult},
        types::{GenerateNarrationResponse, NarrationFragment, NarrationItem, SlideGenerationReport},
    },
    db::{repositories::narration, Database},
    narration::{
        extract::{fragments_for_slide, slide_plain_text, UNORDERED},
        slides::extract_slides,
    },
    providers::SpeechSynthesizer,
};

/// Voices every narration fragment of a deck and replaces the project's
/// cached clips with the result.
#[derive(Clone)]
pub struct NarrationGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: NarrationConfig,
}

impl NarrationGenerator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, config: NarrationConfig) -> Self {
        Self {
            synthesizer,
            config,
        }
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.config
    }

    /// Fragments to synthesize, slide by slide in playback order.
    ///
    /// A slide without narration markers falls back to one fragment holding
    /// its visible text; a slide with neither contributes nothing.
    pub fn plan(project: &Value) -> Vec<Vec<NarrationFragment>> {
        extract_slides(project)
            .into_iter()
            .map(|slide| {
                let fragments = fragments_for_slide(slide.index, &slide.html);
                if !fragments.is_empty() {
                    return fragments;
                }
                let text = slide_plain_text(&slide.html);
                if text.is_empty() {
                    return vec![];
                }
                vec![NarrationFragment {
                    slide_index: slide.index,
                    element_index: 0,
                    text,
                    order: UNORDERED,
                }]
            })
            .collect()
    }

    /// Synthesizes `project` and writes the batch for `project_id`.
    ///
    /// A fragment the provider fails on is left out of the batch; any other
    /// error aborts the run before the cache is touched. When no fragment
    /// could be voiced the last provider error is returned and the cached
    /// clips are kept.
    pub async fn generate(
        &self,
        db: &Database,
        project_id: &str,
        project: &Value,
        voice_id: Option<&str>,
    ) -> AppResult<GenerateNarrationResponse> {
        let voice_id = voice_id
            .filter(|voice| !voice.trim().is_empty())
            .unwrap_or(self.config.default_voice_id.as_str());

        let mut items: Vec<NarrationItem> = vec![];
        let mut reports: Vec<SlideGenerationReport> = vec![];
        let mut skipped = 0usize;
        let mut last_failure: Option<AppError> = None;

        for (index, fragments) in Self::plan(project).into_iter().enumerate() {
            let mut synthesized = 0usize;
            for fragment in &fragments {
                match self.synthesizer.synthesize(&fragment.text, voice_id).await {
                    Ok(audio) => {
                        let encoded = general_purpose::STANDARD.encode(&audio.bytes);
                        items.push(NarrationItem {
                            slide_index: fragment.slide_index,
                            element_index: fragment.element_index,
                            text: fragment.text.clone(),
                            audio_data: format!("data:{};base64,{}", audio.mime, encoded),
                            duration: audio.duration_ms,
                        });
                        synthesized += 1;
                    }
                    Err(err) if err.is_provider_failure() => {
                        tracing::warn!(
                            project_id,
                            slide = fragment.slide_index,
                            element = fragment.element_index,
                            error = %err,
                            "narration fragment synthesis failed, omitting"
                        );
                        skipped += 1;
                        last_failure = Some(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            reports.push(SlideGenerationReport {
                index: index as u32,
                fragment_count: fragments.len(),
                synthesized,
            });
        }

        if items.is_empty() {
            if let Some(err) = last_failure {
                tracing::warn!(project_id, skipped, "no narration fragment synthesized, cache kept");
                return Err(err);
            }
        }

        let saved = narration::save_batch(db.pool(), project_id, &items, &self.config).await?;
        tracing::info!(project_id, saved = saved.saved, skipped, "narration generated");
        Ok(GenerateNarrationResponse {
            slides: reports,
            saved: saved.saved,
            skipped,
        })
    }
}
