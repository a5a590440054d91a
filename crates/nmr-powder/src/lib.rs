#![deny(missing_docs)]
#![doc = "Deterministic octahedral orientation sets for powder averaging."]

pub mod cache;
pub mod scheme;
pub mod volume;

pub use cache::OrientationCache;
pub use scheme::{generate, spherical_triangle_area, Orientation, OrientationSet, Triangle};
pub use volume::IntegrationVolume;
