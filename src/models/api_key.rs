use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantApiKey {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
    pub prefix: String,
    pub last_used_at: Option<String>,
    pub created_at: String,
}
