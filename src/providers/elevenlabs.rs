use std::time::Duration;

use futures::{future::BoxFuture, FutureExt};
use reqwest::StatusCode;

use crate::{
    core::errors::{AppError, AppResult},
    providers::{SpeechSynthesizer, SynthesizedAudio},
};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, model)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::ProviderAuth);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// `{base}/v1/text-to-speech/{voice}` with the voice id kept as a single
    /// percent-encoded path segment.
    fn speech_endpoint(&self, voice_id: &str) -> AppResult<reqwest::Url> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() || voice_id == "." || voice_id == ".." {
            return Err(AppError::InvalidInput(format!("invalid voice id {voice_id:?}")));
        }
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| AppError::Internal(format!("invalid provider base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("provider base url cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id]);
        Ok(url)
    }

    pub async fn text_to_speech(&self, text: &str, voice_id: &str) -> AppResult<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput("narration text cannot be empty".to_string()));
        }
        let endpoint = self.speech_endpoint(voice_id)?;
        let payload = serde_json::json!({
            "text": text,
            "model_id": self.model,
            "optimize_streaming_latency": 0
        });

        let response = self
            .http
            .post(endpoint)
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AppError::ProviderAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(AppError::ProviderRateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ProviderInvalidResponse(format!(
                    "status {status} body {body}"
                )));
            }
            _ => {}
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AppError::ProviderInvalidResponse(err.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::ProviderInvalidResponse("empty audio body".to_string()));
        }

        // MP3 duration is not decoded; the cache applies its configured fallback.
        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            mime,
            duration_ms: None,
        })
    }
}

impl SpeechSynthesizer for ElevenLabsClient {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice_id: &'a str,
    ) -> BoxFuture<'a, AppResult<SynthesizedAudio>> {
        self.text_to_speech(text, voice_id).boxed()
    }
}
