use std::collections::HashMap;

use crate::error::{AssistantError, Result};

pub(crate) const SERVICE_NAME: &str = "lucy-assistant";
const KEYRING_SERVER: &str = "anthropic-api";

fn attributes() -> HashMap<&'static str, &'static str> {
    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", KEYRING_SERVER);
    attrs
}

/// Store the Anthropic API key in the system keyring via Secret Service.
pub async fn store_api_key(key: &str) -> Result<()> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| AssistantError::Keyring(format!("Failed to connect to keyring: {}", e)))?;

    keyring
        .create_item(
            "Lucy Anthropic API Key",
            &attributes(),
            key.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| AssistantError::Keyring(format!("Failed to store API key: {}", e)))?;

    Ok(())
}

/// Load the Anthropic API key from the system keyring.
pub async fn load_api_key() -> Result<Option<String>> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| AssistantError::Keyring(format!("Failed to connect to keyring: {}", e)))?;

    let items = keyring
        .search_items(&attributes())
        .await
        .map_err(|e| AssistantError::Keyring(format!("Failed to search keyring: {}", e)))?;

    if let Some(item) = items.first() {
        let secret_bytes = item
            .secret()
            .await
            .map_err(|e| AssistantError::Keyring(format!("Failed to read secret: {}", e)))?;
        let key = String::from_utf8(secret_bytes.to_vec())
            .map_err(|e| AssistantError::Keyring(format!("Invalid UTF-8 in secret: {}", e)))?;
        if !key.is_empty() {
            return Ok(Some(key));
        }
    }

    Ok(None)
}

/// Environment first, then the keyring.
pub async fn resolve_api_key() -> Result<Option<String>> {
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(Some(key.trim().to_string()));
        }
    }
    load_api_key().await
}
