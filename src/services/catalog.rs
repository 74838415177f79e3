//! Static registry of webhook event types.
//!
//! Subscriptions persist the `value` strings below, so a published value is
//! never renamed or removed. New event types are appended and
//! [`CATALOG_VERSION`] is bumped.

use serde::Serialize;

pub const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EventDefinition {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EventCategory {
    pub name: &'static str,
    pub events: &'static [EventDefinition],
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogExport {
    pub version: u32,
    pub categories: &'static [EventCategory],
}

const fn def(value: &'static str, label: &'static str) -> EventDefinition {
    EventDefinition { value, label }
}

static CATEGORIES: &[EventCategory] = &[
    EventCategory {
        name: "Orders",
        events: &[
            def("order.created", "Order created"),
            def("order.updated", "Order updated"),
            def("order.paid", "Order paid"),
            def("order.ready_for_pickup", "Order ready for pickup"),
            def("order.completed", "Order completed"),
            def("order.cancelled", "Order cancelled"),
            def("order.refunded", "Order refunded"),
        ],
    },
    EventCategory {
        name: "Consultations",
        events: &[
            def("consultation.submitted", "Consultation submitted"),
            def("consultation.approved", "Consultation approved"),
            def("consultation.rejected", "Consultation rejected"),
        ],
    },
    EventCategory {
        name: "Products",
        events: &[
            def("product.created", "Product created"),
            def("product.updated", "Product updated"),
            def("product.deleted", "Product deleted"),
            def("product.stock_changed", "Product stock changed"),
            def("product.out_of_stock", "Product out of stock"),
        ],
    },
    EventCategory {
        name: "Customers",
        events: &[
            def("customer.created", "Customer registered"),
            def("customer.updated", "Customer updated"),
            def("customer.verified", "Customer identity verified"),
        ],
    },
];

pub fn is_valid_event_type(value: &str) -> bool {
    find(value).is_some()
}

pub fn find(value: &str) -> Option<&'static EventDefinition> {
    CATEGORIES
        .iter()
        .flat_map(|c| c.events.iter())
        .find(|e| e.value == value)
}

/// Categories in presentation order.
pub fn categories() -> &'static [EventCategory] {
    CATEGORIES
}

pub fn all_values() -> impl Iterator<Item = &'static str> {
    CATEGORIES
        .iter()
        .flat_map(|c| c.events.iter())
        .map(|e| e.value)
}

pub fn export() -> CatalogExport {
    CatalogExport {
        version: CATALOG_VERSION,
        categories: CATEGORIES,
    }
}
