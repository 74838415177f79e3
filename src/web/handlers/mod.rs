pub mod events;
pub mod subscriptions;

use axum::response::Json;

pub(crate) fn paginate(
    page: Option<usize>,
    per_page: Option<usize>,
    default_size: usize,
    max_size: usize,
) -> (usize, usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_size).min(max_size).max(1);
    let offset = (page - 1).saturating_mul(per_page);
    (page, per_page, offset)
}

pub(crate) fn json_envelope<T: serde::Serialize>(
    data: T,
    total: i64,
    page: usize,
    per_page: usize,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": data,
        "meta": {
            "total": total,
            "page": page,
            "per_page": per_page,
        }
    }))
}

pub(crate) fn json_single<T: serde::Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": data,
    }))
}
