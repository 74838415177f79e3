mod api_key;
mod delivery;
mod event;
mod subscription;

pub use api_key::*;
pub use delivery::*;
pub use event::*;
pub use subscription::*;
