use futures::future::BoxFuture;

use crate::core::errors::AppResult;

pub mod elevenlabs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Known playback length, when the provider reports one.
    pub duration_ms: Option<i64>,
}

/// Text-to-speech backend used to voice narration fragments.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice_id: &'a str,
    ) -> BoxFuture<'a, AppResult<SynthesizedAudio>>;
}
