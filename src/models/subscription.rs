use crate::services::secrets::WebhookSecret;
use serde::{Deserialize, Serialize};

/// A tenant's registration of an endpoint for a set of event types.
///
/// The signing secret is never part of this record; it is stored encrypted
/// and only `secret_hint` is kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub tenant_id: String,
    pub url: String,
    pub events: Vec<String>,
    pub secret_hint: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Subscription {
    /// Response shape for the management API with the secret masked.
    pub fn to_view(&self) -> SubscriptionView {
        SubscriptionView::new(self, crate::services::secrets::mask_hint(&self.secret_hint))
    }

    /// Response shape returned once, at creation, carrying the full secret.
    pub fn to_view_with_secret(&self, secret: &WebhookSecret) -> SubscriptionView {
        SubscriptionView::new(self, secret.expose().to_string())
    }
}

/// A subscription loaded for dispatch, together with its decrypted secret.
#[derive(Debug, Clone)]
pub struct ActiveSubscription {
    pub subscription: Subscription,
    pub secret: WebhookSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: String,
    pub tenant_id: String,
    pub url: String,
    pub events: Vec<String>,
    pub secret: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SubscriptionView {
    fn new(sub: &Subscription, secret: String) -> Self {
        Self {
            id: sub.id.clone(),
            tenant_id: sub.tenant_id.clone(),
            url: sub.url.clone(),
            events: sub.events.clone(),
            secret,
            is_active: sub.is_active,
            description: sub.description.clone(),
            created_at: sub.created_at.clone(),
            updated_at: sub.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSubscription {
    pub url: String,
    pub events: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update. `secret` and `tenantId` are not representable here;
/// the API layer rejects bodies that try to set them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscriptionPatch {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.events.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
    }
}
