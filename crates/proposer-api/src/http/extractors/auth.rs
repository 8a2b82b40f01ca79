//! API key authentication extractor.
//!
//! Keys arrive as `Authorization: Bearer <key>` or `X-API-Key: <key>`, are
//! SHA-256 hashed and compared against the `api_keys` table.

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix of generated keys; anything else printed by `ensure_api_key` is a
/// placeholder for an existing key.
pub const KEY_PREFIX: &str = "prop_";

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key_hash = hash_api_key(&extract_api_key(&parts.headers)?);

        let id: Option<(String,)> = sqlx::query_as("SELECT id FROM api_keys WHERE key_hash = ?")
            .bind(&key_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

        let Some((id,)) = id else {
            return Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            ));
        };

        // Best effort; a failed touch never fails the request
        let now = chrono::Utc::now().to_rfc3339();
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id)
            .execute(&state.db_pool.writer)
            .await
        {
            tracing::debug!(error = %e, "failed to record api key use");
        }
        Ok(Authenticated)
    }
}

/// Extract the API key from request headers.
fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth) = headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

fn generate_api_key() -> String {
    let mut key_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut key_bytes);
    format!(
        "{KEY_PREFIX}{}",
        key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    )
}

/// Make sure an API key exists, creating one on first start.
///
/// Returns the plaintext of a newly created key (shown to the user once),
/// or a placeholder when a key already exists.
pub async fn ensure_api_key(state: &AppState) -> anyhow::Result<String> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM api_keys LIMIT 1")
        .fetch_optional(&state.db_pool.reader)
        .await?;

    if existing.is_some() {
        return Ok("(existing key - shown only on first creation)".to_string());
    }

    let plaintext_key = generate_api_key();
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO api_keys (id, key_hash, name, created_at) VALUES (?, ?, 'default', ?)")
        .bind(&id)
        .bind(hash_api_key(&plaintext_key))
        .bind(&now)
        .execute(&state.db_pool.writer)
        .await?;

    tracing::info!(key_id = %id, "generated API key");
    Ok(plaintext_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer prop_abc "));
        assert_eq!(extract_api_key(&headers).unwrap(), "prop_abc");
    }

    #[test]
    fn test_x_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("prop_xyz"));
        assert_eq!(extract_api_key(&headers).unwrap(), "prop_xyz");
    }

    #[test]
    fn test_missing_key_is_unauthorized() {
        let err = extract_api_key(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_api_key("prop_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("prop_abc"));
        assert_ne!(hash, hash_api_key("prop_abd"));
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
        assert_ne!(key, generate_api_key());
    }
}
