pub mod commands;
pub mod core;
pub mod db;
pub mod http;
pub mod narration;
pub mod providers;
pub mod security;
pub mod sync;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::{config::AppConfig, errors::AppResult};
use db::Database;
use providers::SpeechSynthesizer;
use sync::store::SqliteDeckStore;

fn log_level_from_env() -> &'static str {
    match std::env::var("SLIDEVOICE_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

fn sqlx_debug_enabled() -> bool {
    matches!(
        std::env::var("SLIDEVOICE_SQLX_DEBUG")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn init_tracing() {
    let mut filter = EnvFilter::new(log_level_from_env());
    if !sqlx_debug_enabled() {
        if let Ok(directive) = "sqlx::query=warn".parse() {
            filter = filter.add_directive(directive);
        }
    }
    // A subscriber may already be installed (tests, embedding hosts).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub decks: Arc<SqliteDeckStore>,
    pub config: Arc<AppConfig>,
    /// Overrides the keyring-configured provider when set.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            decks: Arc::new(SqliteDeckStore::new(db.clone())),
            db,
            config: Arc::new(config),
            synthesizer: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }
}

pub async fn run() -> AppResult<()> {
    init_tracing();
    let config = AppConfig::from_env()?;
    let db = Database::new(&config.data_dir).await?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db.clone(), config);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "slidevoice listening");
    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    db.close().await;
    Ok(())
}
