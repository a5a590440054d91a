#![deny(missing_docs)]
#![doc = "Acquisition methods, transition queries and named experiments for the powder NMR engine."]

pub mod dimension;
pub mod event;
pub mod hash;
pub mod method;
pub mod query;
pub mod serde;
pub mod templates;

pub use dimension::SpectralDimension;
pub use event::{Event, MAGIC_ANGLE};
pub use hash::{round_for_hash, stable_hash_string, to_canonical_json_bytes};
pub use method::Method;
pub use query::{SymmetryQuery, TransitionQuery};
pub use crate::serde::{from_json_slice, from_yaml_slice, to_yaml_string};
pub use templates::{multiple_quantum_shear, DimensionParams, MethodParams, MethodTemplate};
