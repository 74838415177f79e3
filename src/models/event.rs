use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An emitted domain event. Never persisted on its own; it lives only while
/// it is queued and dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub tenant_id: String,
    pub data: EventData,
    pub timestamp: String,
}

impl Event {
    /// Stamps a new event with a fresh id and the current UTC time.
    pub fn new(event_type: &str, tenant_id: &str, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            tenant_id: tenant_id.to_string(),
            data: EventData::from_value(event_type, data),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn envelope(&self) -> Envelope<'_> {
        Envelope {
            event: &self.event_type,
            tenant_id: &self.tenant_id,
            data: &self.data,
            timestamp: &self.timestamp,
        }
    }

    /// The exact body that is signed and sent.
    pub fn envelope_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.envelope())
    }
}

/// Wire shape of a webhook body. Field order is fixed by declaration order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a> {
    pub event: &'a str,
    pub tenant_id: &'a str,
    pub data: &'a EventData,
    pub timestamp: &'a str,
}

/// Owned form of [`Envelope`], used by receivers and tests.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedEnvelope {
    pub event: String,
    pub tenant_id: String,
    pub data: Value,
    pub timestamp: String,
}

/// Event payload, typed for the event families we model and raw otherwise.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EventData {
    Order(OrderData),
    Consultation(ConsultationData),
    Product(ProductData),
    Raw(Value),
}

impl EventData {
    /// Picks the typed variant for the event's family when the payload fits
    /// it exactly. Anything that would not serialize back to the same JSON
    /// stays raw, so unknown fields and odd shapes are never lost.
    pub fn from_value(event_type: &str, value: Value) -> Self {
        let family = event_type.split('.').next().unwrap_or_default();
        let typed = match family {
            "order" => typed_if_lossless(&value).map(Self::Order),
            "consultation" => typed_if_lossless(&value).map(Self::Consultation),
            "product" => typed_if_lossless(&value).map(Self::Product),
            _ => None,
        };
        typed.unwrap_or(Self::Raw(value))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Raw(v) => v.clone(),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }

    pub fn as_order(&self) -> Option<&OrderData> {
        match self {
            Self::Order(o) => Some(o),
            _ => None,
        }
    }
}

fn typed_if_lossless<T>(value: &Value) -> Option<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let typed: T = serde_json::from_value(value.clone()).ok()?;
    let back = serde_json::to_value(&typed).ok()?;
    (back == *value).then_some(typed)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationData {
    pub consultation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
