//! Domain models for the patient dashboard.

mod address;
mod custom_field;
mod draft;
mod patient;

pub use address::*;
pub use custom_field::*;
pub use draft::*;
pub use patient::*;
