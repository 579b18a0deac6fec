use crate::core::{
    errors::{AppError, AppResult},
    types::Provider,
};

const SERVICE: &str = "slidevoice";

fn username_for_provider(provider: &Provider) -> &'static str {
    match provider {
        Provider::ElevenLabs => "elevenlabs",
    }
}

fn env_var_for_provider(provider: &Provider) -> &'static str {
    match provider {
        Provider::ElevenLabs => "ELEVENLABS_API_KEY",
    }
}

pub fn set_provider_key(provider: Provider, api_key: &str) -> AppResult<()> {
    if api_key.trim().is_empty() {
        return Err(AppError::InvalidInput("api key cannot be empty".to_string()));
    }
    let entry = keyring::Entry::new(SERVICE, username_for_provider(&provider))
        .map_err(|err| AppError::Internal(err.to_string()))?;
    entry
        .set_password(api_key)
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// Key from the provider's environment variable, else from the OS keyring.
pub fn get_provider_key(provider: Provider) -> AppResult<String> {
    if let Ok(key) = std::env::var(env_var_for_provider(&provider)) {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }
    let entry = keyring::Entry::new(SERVICE, username_for_provider(&provider))
        .map_err(|err| AppError::Internal(err.to_string()))?;
    entry
        .get_password()
        .map_err(|_err| AppError::ProviderAuth)
}
