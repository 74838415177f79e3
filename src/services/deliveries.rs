use crate::error::{WebhookError, WebhookResult};
use crate::models::{Delivery, NewDelivery};
use crate::Database;
use chrono::{SecondsFormat, Utc};

const DELIVERY_COLUMNS: &str = "id, subscription_id, tenant_id, event_id, event_type, request_payload, response_status, response_body, error, succeeded, attempt, duration_ms, attempted_at";

/// Appends one attempt to the delivery log. The log has no update or
/// delete path; the table itself rejects UPDATE.
pub fn record(db: &Database, delivery: &NewDelivery<'_>) -> WebhookResult<Delivery> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    let attempted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    conn.execute(
        "INSERT INTO webhook_deliveries (subscription_id, tenant_id, event_id, event_type, request_payload, response_status, response_body, error, succeeded, attempt, duration_ms, attempted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            delivery.subscription_id,
            delivery.tenant_id,
            delivery.event_id,
            delivery.event_type,
            delivery.request_payload,
            delivery.response_status,
            delivery.response_body,
            delivery.error,
            delivery.succeeded(),
            delivery.attempt,
            delivery.duration_ms as i64,
            attempted_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    let sql = format!(
        "SELECT {} FROM webhook_deliveries WHERE id = ?",
        DELIVERY_COLUMNS
    );
    Ok(conn.query_row(&sql, [id], row_to_delivery)?)
}

/// Newest first. Scoped by tenant so a deleted subscription's history stays
/// visible to its owner and to nobody else.
pub fn list_for_subscription(
    db: &Database,
    tenant_id: &str,
    subscription_id: &str,
    limit: usize,
    offset: usize,
) -> WebhookResult<Vec<Delivery>> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    let sql = format!(
        "SELECT {} FROM webhook_deliveries
         WHERE tenant_id = ?1 AND subscription_id = ?2
         ORDER BY id DESC LIMIT ?3 OFFSET ?4",
        DELIVERY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let deliveries = stmt
        .query_map(
            rusqlite::params![
                tenant_id,
                subscription_id,
                i64::try_from(limit).unwrap_or(i64::MAX),
                i64::try_from(offset).unwrap_or(i64::MAX)
            ],
            row_to_delivery,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(deliveries)
}

pub fn count_for_subscription(
    db: &Database,
    tenant_id: &str,
    subscription_id: &str,
) -> WebhookResult<i64> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM webhook_deliveries WHERE tenant_id = ?1 AND subscription_id = ?2",
        [tenant_id, subscription_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// All attempts made for one emitted event, oldest first.
pub fn list_for_event(db: &Database, event_id: &str) -> WebhookResult<Vec<Delivery>> {
    let conn = db.get().map_err(WebhookError::Storage)?;
    let sql = format!(
        "SELECT {} FROM webhook_deliveries WHERE event_id = ? ORDER BY id",
        DELIVERY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let deliveries = stmt
        .query_map([event_id], row_to_delivery)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(deliveries)
}

fn row_to_delivery(row: &rusqlite::Row<'_>) -> rusqlite::Result<Delivery> {
    let duration_ms: i64 = row.get(11)?;
    Ok(Delivery {
        id: row.get(0)?,
        subscription_id: row.get(1)?,
        tenant_id: row.get(2)?,
        event_id: row.get(3)?,
        event_type: row.get(4)?,
        request_payload: row.get(5)?,
        response_status: row.get(6)?,
        response_body: row.get(7)?,
        error: row.get(8)?,
        succeeded: row.get(9)?,
        attempt: row.get(10)?,
        duration_ms: duration_ms.max(0) as u64,
        attempted_at: row.get(12)?,
    })
}
