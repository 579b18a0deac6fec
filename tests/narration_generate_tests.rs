use std::sync::{Arc, Mutex};

use futures::{future::BoxFuture, FutureExt};
use serde_json::json;
use slidevoice_lib::{
    core::{
        config::NarrationConfig,
        errors::{AppError, AppResult},
    },
    db::{repositories::narration, Database},
    narration::generate::NarrationGenerator,
    providers::{SpeechSynthesizer, SynthesizedAudio},
};

/// Returns the text bytes as audio; text containing `FAIL` hits a provider
/// timeout, `AUTH` a rejected key and `BOOM` an internal error.
#[derive(Default)]
struct ScriptedSynthesizer {
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSynthesizer {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SpeechSynthesizer for ScriptedSynthesizer {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice_id: &'a str,
    ) -> BoxFuture<'a, AppResult<SynthesizedAudio>> {
        async move {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), voice_id.to_string()));
            if text.contains("FAIL") {
                return Err(AppError::ProviderTimeout);
            }
            if text.contains("AUTH") {
                return Err(AppError::ProviderAuth);
            }
            if text.contains("BOOM") {
                return Err(AppError::Internal("synthesizer crashed".to_string()));
            }
            Ok(SynthesizedAudio {
                bytes: text.as_bytes().to_vec(),
                mime: "audio/mpeg".to_string(),
                duration_ms: Some(text.len() as i64 * 100),
            })
        }
        .boxed()
    }
}

fn generator(synthesizer: Arc<ScriptedSynthesizer>) -> NarrationGenerator {
    NarrationGenerator::new(synthesizer, NarrationConfig::default())
}

#[tokio::test]
async fn fragments_are_voiced_in_playback_order() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let project = json!({
        "pages": [{
            "name": "Intro",
            "component": "<section>\
                <p data-tts=\"second\" data-fragment-index=\"2\">B</p>\
                <p data-tts=\"unordered\">C</p>\
                <p data-tts=\"first\" data-fragment-index=\"1\">A</p>\
            </section>"
        }]
    });

    let report = generator(synthesizer.clone())
        .generate(&db, "deck-1", &project, None)
        .await
        .expect("generate narration");
    assert_eq!(report.saved, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.slides.len(), 1);
    assert_eq!(report.slides[0].fragment_count, 3);

    let spoken: Vec<String> = synthesizer.calls().into_iter().map(|(text, _)| text).collect();
    assert_eq!(spoken, vec!["first", "second", "unordered"]);

    let grouped = narration::get_for_project(db.pool(), "deck-1")
        .await
        .expect("read cache");
    let cached: Vec<(u32, &str)> = grouped[&0]
        .iter()
        .map(|clip| (clip.element_index, clip.text.as_str()))
        .collect();
    assert_eq!(cached, vec![(0, "first"), (1, "second"), (2, "unordered")]);
    assert!(grouped[&0][0].audio_data.starts_with("data:audio/mpeg;base64,"));
    assert_eq!(grouped[&0][0].duration, 500);
}

#[tokio::test]
async fn failed_fragments_are_omitted_not_fatal() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let project = json!({
        "pages": [
            {"component": "<p data-tts=\"hello\">x</p><p data-tts=\"FAIL here\">y</p>"},
            {"component": "<p data-tts=\"goodbye\">z</p>"}
        ]
    });

    let report = generator(synthesizer)
        .generate(&db, "deck-1", &project, None)
        .await
        .expect("generate narration");
    assert_eq!(report.saved, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.slides[0].synthesized, 1);
    assert_eq!(report.slides[1].synthesized, 1);

    let grouped = narration::get_for_project(db.pool(), "deck-1")
        .await
        .expect("read cache");
    assert_eq!(grouped[&0].len(), 1);
    assert_eq!(grouped[&0][0].text, "hello");
    assert_eq!(grouped[&1][0].text, "goodbye");
}

#[tokio::test]
async fn non_provider_error_leaves_cache_untouched() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let generator = generator(synthesizer);

    generator
        .generate(
            &db,
            "deck-1",
            &json!({"pages": [{"component": "<p data-tts=\"kept\">k</p>"}]}),
            None,
        )
        .await
        .expect("first run");

    let err = generator
        .generate(
            &db,
            "deck-1",
            &json!({"pages": [{"component": "<p data-tts=\"BOOM\">b</p>"}]}),
            None,
        )
        .await
        .expect_err("internal failure aborts");
    assert!(matches!(err, AppError::Internal(_)));

    let grouped = narration::get_for_project(db.pool(), "deck-1")
        .await
        .expect("read cache");
    assert_eq!(grouped[&0][0].text, "kept");
}

async fn seed_cache(db: &Database, generator: &NarrationGenerator) {
    generator
        .generate(
            db,
            "deck-1",
            &json!({"pages": [{"component": "<p data-tts=\"kept\">k</p>"}]}),
            None,
        )
        .await
        .expect("seed run");
}

#[tokio::test]
async fn rejected_key_aborts_and_keeps_cached_clips() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let generator = generator(synthesizer.clone());
    seed_cache(&db, &generator).await;

    let err = generator
        .generate(
            &db,
            "deck-1",
            &json!({"pages": [{"component": "<p data-tts=\"AUTH one\">1</p><p data-tts=\"two\">2</p>"}]}),
            None,
        )
        .await
        .expect_err("rejected key aborts");
    assert!(matches!(err, AppError::ProviderAuth));
    assert_eq!(synthesizer.calls().len(), 2, "no request after the rejected key");

    let grouped = narration::get_for_project(db.pool(), "deck-1")
        .await
        .expect("read cache");
    assert_eq!(grouped[&0].len(), 1);
    assert_eq!(grouped[&0][0].text, "kept");
}

#[tokio::test]
async fn run_where_every_fragment_fails_keeps_cached_clips() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let generator = generator(synthesizer);
    seed_cache(&db, &generator).await;

    let err = generator
        .generate(
            &db,
            "deck-1",
            &json!({"pages": [{"component": "<p data-tts=\"FAIL one\">1</p><p data-tts=\"FAIL two\">2</p>"}]}),
            None,
        )
        .await
        .expect_err("nothing voiced");
    assert!(matches!(err, AppError::ProviderTimeout));

    let grouped = narration::get_for_project(db.pool(), "deck-1")
        .await
        .expect("read cache");
    assert_eq!(grouped[&0][0].text, "kept");
}

#[tokio::test]
async fn slide_without_markers_narrates_its_visible_text() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let project = json!({
        "pages": [
            {"component": "<style>h1 { color: red; }</style><h1>Roadmap</h1>\n<p>Ship   &amp; learn</p>"},
            {"component": "<div></div>"}
        ]
    });

    let report = generator(synthesizer.clone())
        .generate(&db, "deck-1", &project, Some("voice-x"))
        .await
        .expect("generate narration");
    assert_eq!(report.saved, 1);
    assert_eq!(report.slides[1].fragment_count, 0);
    assert_eq!(
        synthesizer.calls(),
        vec![("Roadmap Ship & learn".to_string(), "voice-x".to_string())]
    );
}

#[tokio::test]
async fn blank_voice_falls_back_to_default() {
    let db = Database::in_memory().await.expect("db should initialize");
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let project = json!({"pages": [{"component": "<p data-tts=\"hi\">hi</p>"}]});

    generator(synthesizer.clone())
        .generate(&db, "deck-1", &project, Some("   "))
        .await
        .expect("generate narration");
    let default_voice = NarrationConfig::default().default_voice_id;
    assert_eq!(synthesizer.calls()[0].1, default_voice);
}
