use crate::error::{WebhookError, WebhookResult};
use crate::models::{ActiveSubscription, NewSubscription, Subscription, SubscriptionPatch};
use crate::services::catalog;
use crate::services::secrets::{SecretCipher, WebhookSecret};
use crate::Database;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::Arc;

const MAX_URL_LENGTH: usize = 2048;
const MAX_DESCRIPTION_LENGTH: usize = 500;

const SELECT_COLUMNS: &str =
    "id, tenant_id, url, secret_hint, is_active, description, created_at, updated_at";

/// Per-tenant subscription records. Every read and write is scoped by
/// tenant; a subscription owned by another tenant behaves as missing.
#[derive(Clone)]
pub struct Subscriptions {
    db: Database,
    cipher: Arc<SecretCipher>,
    require_https: bool,
}

impl Subscriptions {
    pub fn new(db: Database, cipher: Arc<SecretCipher>, require_https: bool) -> Self {
        Self {
            db,
            cipher,
            require_https,
        }
    }

    /// Creates an active subscription with a fresh secret. The returned
    /// secret is the only time the plaintext leaves the store.
    pub fn create(
        &self,
        tenant_id: &str,
        input: NewSubscription,
    ) -> WebhookResult<(Subscription, WebhookSecret)> {
        validate_tenant(tenant_id)?;
        let url = validate_url(&input.url, self.require_https)?;
        let events = validate_events(&input.events)?;
        let description = normalize_description(input.description)?;

        let secret = WebhookSecret::generate();
        let ciphertext = self.cipher.encrypt(&secret)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        let mut conn = self.db.get().map_err(WebhookError::Storage)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO subscriptions (id, tenant_id, url, secret_ciphertext, secret_hint, is_active, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?7)",
            rusqlite::params![id, tenant_id, url, ciphertext, secret.hint(), description, now],
        )?;
        replace_events(&tx, &id, &events)?;
        tx.commit()?;

        let subscription =
            fetch(&conn, &id, tenant_id)?.ok_or_else(|| WebhookError::NotFound(id.clone()))?;

        tracing::info!(
            tenant_id = %tenant_id,
            subscription_id = %id,
            events = events.len(),
            "Webhook subscription created"
        );

        Ok((subscription, secret))
    }

    /// Applies a partial update. The secret and owning tenant never change.
    pub fn update(
        &self,
        id: &str,
        tenant_id: &str,
        patch: SubscriptionPatch,
    ) -> WebhookResult<Subscription> {
        let url = patch
            .url
            .as_deref()
            .map(|u| validate_url(u, self.require_https))
            .transpose()?;
        let events = patch.events.as_deref().map(validate_events).transpose()?;
        let description = match patch.description {
            Some(d) => Some(normalize_description(Some(d))?),
            None => None,
        };

        let mut conn = self.db.get().map_err(WebhookError::Storage)?;
        let tx = conn.transaction()?;

        let owned: Option<String> = tx
            .query_row(
                "SELECT id FROM subscriptions WHERE id = ?1 AND tenant_id = ?2",
                [id, tenant_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(WebhookError::NotFound(id.to_string()));
        }

        if let Some(ref url) = url {
            tx.execute(
                "UPDATE subscriptions SET url = ?1 WHERE id = ?2",
                [url.as_str(), id],
            )?;
        }
        if let Some(description) = description {
            tx.execute(
                "UPDATE subscriptions SET description = ?1 WHERE id = ?2",
                rusqlite::params![description, id],
            )?;
        }
        if let Some(active) = patch.is_active {
            tx.execute(
                "UPDATE subscriptions SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![active, id],
            )?;
        }
        if let Some(ref events) = events {
            replace_events(&tx, id, events)?;
        }
        tx.execute(
            "UPDATE subscriptions SET updated_at = ?1 WHERE id = ?2",
            [now().as_str(), id],
        )?;
        tx.commit()?;

        tracing::info!(tenant_id = %tenant_id, subscription_id = %id, "Webhook subscription updated");

        fetch(&conn, id, tenant_id)?.ok_or_else(|| WebhookError::NotFound(id.to_string()))
    }

    /// Removes the subscription. Its delivery history is kept.
    pub fn delete(&self, id: &str, tenant_id: &str) -> WebhookResult<()> {
        let conn = self.db.get().map_err(WebhookError::Storage)?;
        let removed = conn.execute(
            "DELETE FROM subscriptions WHERE id = ?1 AND tenant_id = ?2",
            [id, tenant_id],
        )?;
        if removed == 0 {
            return Err(WebhookError::NotFound(id.to_string()));
        }
        tracing::info!(tenant_id = %tenant_id, subscription_id = %id, "Webhook subscription deleted");
        Ok(())
    }

    pub fn get(&self, id: &str, tenant_id: &str) -> WebhookResult<Option<Subscription>> {
        let conn = self.db.get().map_err(WebhookError::Storage)?;
        fetch(&conn, id, tenant_id)
    }

    pub fn list_for_tenant(&self, tenant_id: &str) -> WebhookResult<Vec<Subscription>> {
        let conn = self.db.get().map_err(WebhookError::Storage)?;
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = ?1 ORDER BY created_at DESC, id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([tenant_id], row_to_subscription)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut subs = Vec::with_capacity(rows.len());
        for mut sub in rows {
            sub.events = load_events(&conn, &sub.id)?;
            subs.push(sub);
        }
        Ok(subs)
    }

    /// Dispatch resolution: active subscriptions of `tenant_id` whose event
    /// set contains `event_type`, with secrets decrypted. A row whose secret
    /// cannot be decrypted is skipped and logged, not dispatched unsigned.
    pub fn list_active_for_tenant_and_event(
        &self,
        tenant_id: &str,
        event_type: &str,
    ) -> WebhookResult<Vec<ActiveSubscription>> {
        let conn = self.db.get().map_err(WebhookError::Storage)?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.tenant_id, s.url, s.secret_hint, s.is_active, s.description, s.created_at, s.updated_at, s.secret_ciphertext
             FROM subscriptions s
             WHERE s.tenant_id = ?1
               AND s.is_active = 1
               AND EXISTS (
                   SELECT 1 FROM subscription_events e
                   WHERE e.subscription_id = s.id AND e.event_type = ?2
               )
             ORDER BY s.created_at, s.id",
        )?;
        let rows = stmt
            .query_map([tenant_id, event_type], |row| {
                Ok((row_to_subscription(row)?, row.get::<_, String>(8)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut active = Vec::with_capacity(rows.len());
        for (mut subscription, ciphertext) in rows {
            let secret = match self.cipher.decrypt(&ciphertext) {
                Ok(secret) => secret,
                Err(e) => {
                    tracing::error!(
                        alert = "webhook_secret_integrity",
                        subscription_id = %subscription.id,
                        tenant_id = %tenant_id,
                        error = %e,
                        "Skipping subscription with undecryptable secret"
                    );
                    continue;
                }
            };
            subscription.events = load_events(&conn, &subscription.id)?;
            active.push(ActiveSubscription {
                subscription,
                secret,
            });
        }
        Ok(active)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        url: row.get(2)?,
        events: Vec::new(),
        secret_hint: row.get(3)?,
        is_active: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn fetch(conn: &Connection, id: &str, tenant_id: &str) -> WebhookResult<Option<Subscription>> {
    let sql = format!(
        "SELECT {} FROM subscriptions WHERE id = ?1 AND tenant_id = ?2",
        SELECT_COLUMNS
    );
    let sub = conn
        .query_row(&sql, [id, tenant_id], row_to_subscription)
        .optional()?;
    match sub {
        Some(mut sub) => {
            sub.events = load_events(conn, &sub.id)?;
            Ok(Some(sub))
        }
        None => Ok(None),
    }
}

fn load_events(conn: &Connection, subscription_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT event_type FROM subscription_events WHERE subscription_id = ? ORDER BY event_type",
    )?;
    let events = stmt
        .query_map([subscription_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(events)
}

fn replace_events(conn: &Connection, subscription_id: &str, events: &[String]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM subscription_events WHERE subscription_id = ?",
        [subscription_id],
    )?;
    let mut stmt = conn
        .prepare("INSERT INTO subscription_events (subscription_id, event_type) VALUES (?1, ?2)")?;
    for event in events {
        stmt.execute([subscription_id, event.as_str()])?;
    }
    Ok(())
}

fn validate_tenant(tenant_id: &str) -> WebhookResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(WebhookError::validation("tenant id cannot be empty"));
    }
    Ok(())
}

/// Accepts absolute http(s) URLs with a host; only https when required.
pub fn validate_url(raw: &str, require_https: bool) -> WebhookResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WebhookError::validation("url cannot be empty"));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(WebhookError::validation(format!(
            "url must be {} characters or less",
            MAX_URL_LENGTH
        )));
    }

    let parsed = url::Url::parse(raw)
        .map_err(|e| WebhookError::validation(format!("invalid url '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "https" => {}
        "http" if !require_https => {}
        "http" => return Err(WebhookError::validation("url must use https")),
        other => {
            return Err(WebhookError::validation(format!(
                "unsupported url scheme '{}'",
                other
            )))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(WebhookError::validation("url must include a host"));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(WebhookError::validation("url must not embed credentials"));
    }

    Ok(parsed.to_string())
}

/// Non-empty subset of the catalog; duplicates collapse.
pub fn validate_events(events: &[String]) -> WebhookResult<Vec<String>> {
    if events.is_empty() {
        return Err(WebhookError::validation("at least one event is required"));
    }

    let mut unique = BTreeSet::new();
    for event in events {
        let event = event.trim();
        if !catalog::is_valid_event_type(event) {
            return Err(WebhookError::validation(format!(
                "unknown event type '{}'",
                event
            )));
        }
        unique.insert(event.to_string());
    }
    Ok(unique.into_iter().collect())
}

/// Empty or whitespace-only descriptions are stored as NULL.
fn normalize_description(description: Option<String>) -> WebhookResult<Option<String>> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(ref d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(WebhookError::validation(format!(
                "description must be {} characters or less",
                MAX_DESCRIPTION_LENGTH
            )));
        }
    }
    Ok(description)
}
