#![warn(clippy::pedantic)]

pub mod error;
pub mod scalar;
pub mod descriptor;
pub mod signature;
pub mod type_map;

pub use descriptor::TypeDescriptor;
pub use error::TypeError;
pub use scalar::ScalarType;
pub use signature::{FunctionSignature, ParameterDescriptor};
pub use type_map::TypeMapper;
