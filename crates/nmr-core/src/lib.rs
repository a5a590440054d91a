#![deny(missing_docs)]
#![doc = "Core tensors, spin systems and the error taxonomy shared by the powder NMR engine."]

pub mod errors;
pub mod isotope;
pub mod provenance;
pub mod spin;
pub mod spin_system;
pub mod tensor;
pub mod wigner;

pub use errors::{ErrorInfo, NmrError};
pub use isotope::Isotope;
pub use provenance::{RunProvenance, SchemaVersion};
pub use spin_system::{Coupling, Site, SpinSystem};
pub use tensor::{
    evaluate_antisymmetric, evaluate_symmetric, AntisymmetricTensor, EvaluatedTensor,
    SphericalTensor1, SphericalTensor2, SymmetricTensor,
};
pub use wigner::EulerAngles;
