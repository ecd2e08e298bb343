#![warn(clippy::pedantic)]

pub mod denylist;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod provider;

pub use denylist::Denylist;
pub use error::{ExtractError, ManifestError};
pub use extractor::SignatureExtractor;
pub use manifest::ManifestProvider;
pub use provider::{AnalysisProvider, RawSignature, Symbol};
