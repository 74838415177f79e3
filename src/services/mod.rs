pub mod api_keys;
pub mod catalog;
pub mod deliveries;
pub mod dispatcher;
pub mod secrets;
pub mod signer;
pub mod subscriptions;
pub mod trigger;
