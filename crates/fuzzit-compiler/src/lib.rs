#![warn(clippy::pedantic)]

pub mod byte_count;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod harness;
pub mod session;

mod naming;

pub use byte_count::{ByteCount, Term};
pub use config::{HarnessConfig, InputSource, LoopStyle};
pub use decoder::{ArgumentDecoder, DecodeFragment};
pub use dispatch::{DispatchCase, DispatchCompiler};
pub use emitter::HarnessEmitter;
pub use error::CompileError;
pub use harness::{BoundFunction, HarnessSpec};
pub use session::{
    Destination, Outcome, build_unit, generate_all, generate_one, library_file_name,
    render_harness,
};
