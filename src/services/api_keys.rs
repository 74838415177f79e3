use crate::error::{WebhookError, WebhookResult};
use crate::models::TenantApiKey;
use crate::Database;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "gl_";
const KEY_BYTE_LENGTH: usize = 32;

/// Generate a raw random key string with the `gl_` prefix.
fn generate_raw_key() -> String {
    let mut bytes = [0u8; KEY_BYTE_LENGTH];
    rand::thread_rng().fill(&mut bytes);
    format!("{}{}", KEY_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// SHA-256 hash a raw key for storage.
fn hash_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Short display prefix (first 8 chars after `gl_`).
fn extract_prefix(raw: &str) -> String {
    let without_prefix = raw.strip_prefix(KEY_PREFIX).unwrap_or(raw);
    let end = without_prefix.len().min(8);
    format!("{}{}...", KEY_PREFIX, &without_prefix[..end])
}

/// Issue a key for `tenant_id`. Returns the raw key (shown once) and the stored record.
pub fn create_key(db: &Database, tenant_id: &str, name: &str) -> WebhookResult<(String, TenantApiKey)> {
    if tenant_id.trim().is_empty() {
        return Err(WebhookError::validation("tenant id cannot be empty"));
    }
    if name.trim().is_empty() {
        return Err(WebhookError::validation("key name cannot be empty"));
    }

    let raw_key = generate_raw_key();
    let conn = db.get().map_err(WebhookError::Storage)?;
    conn.execute(
        "INSERT INTO tenant_api_keys (tenant_id, name, key_hash, prefix) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![tenant_id, name.trim(), hash_key(&raw_key), extract_prefix(&raw_key)],
    )?;

    let id = conn.last_insert_rowid();
    let key = conn.query_row(
        "SELECT id, tenant_id, name, prefix, last_used_at, created_at FROM tenant_api_keys WHERE id = ?",
        [id],
        row_to_key,
    )?;

    Ok((raw_key, key))
}

/// Resolve a raw key to its record, touching `last_used_at`.
pub fn authenticate(db: &Database, raw_key: &str) -> WebhookResult<Option<TenantApiKey>> {
    if !raw_key.starts_with(KEY_PREFIX) {
        return Ok(None);
    }

    let conn = db.get().map_err(WebhookError::Storage)?;
    let key = conn
        .query_row(
            "SELECT id, tenant_id, name, prefix, last_used_at, created_at FROM tenant_api_keys WHERE key_hash = ?",
            [hash_key(raw_key)],
            row_to_key,
        )
        .optional()?;

    if let Some(ref key) = key {
        conn.execute(
            "UPDATE tenant_api_keys SET last_used_at = CURRENT_TIMESTAMP WHERE id = ?",
            [key.id],
        )?;
    }

    Ok(key)
}

/// List keys, optionally for a single tenant (hashes are never exposed).
pub fn list_keys(db: &Database, tenant_id: Option<&str>) -> WebhookResult<Vec<TenantApiKey>> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, prefix, last_used_at, created_at FROM tenant_api_keys
         WHERE ?1 IS NULL OR tenant_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;

    let keys = stmt
        .query_map([tenant_id], row_to_key)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(keys)
}

/// Revoke (delete) a key by ID. Returns whether a key was removed.
pub fn revoke_key(db: &Database, id: i64) -> WebhookResult<bool> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    Ok(conn.execute("DELETE FROM tenant_api_keys WHERE id = ?", [id])? > 0)
}

fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<TenantApiKey> {
    Ok(TenantApiKey {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        prefix: row.get(3)?,
        last_used_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}
