// Entity state registry and device tracking

mod engine;
mod entity;
mod tracker;
pub mod zone;

pub use engine::StateRegistry;
pub use entity::{StateUpdate, TrackedEntity};
pub use tracker::{
    slugify, DeviceTracker, KnownDevice, SeeError, SeeRequest, DOMAIN, SOURCE_TYPE_GPS,
    STATE_UNKNOWN,
};
pub use zone::{Zone, STATE_HOME, STATE_NOT_HOME};
