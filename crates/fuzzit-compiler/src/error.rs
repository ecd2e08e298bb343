use fuzzit_extract::ExtractError;

/// Errors that abort harness generation.
///
/// ```text
///   CompileError
///   ├── NoFunctions          ← zero dispatch cases requested
///   ├── InvalidConfig        ← buffer capacity out of range
///   ├── InvalidLibraryName   ← empty target file name
///   ├── Extract(ExtractError)← from fuzzit-extract (type mapping etc.)
///   └── Io(std::io::Error)   ← writing the harness to its destination
/// ```
///
/// "No usable functions" during a generation request is not an error:
/// the session reports it as [`Outcome::NoUsableFunctions`](crate::Outcome).
/// `NoFunctions` only fires when an empty list reaches the compiler
/// directly.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("no functions to dispatch: a harness needs at least one case")]
    NoFunctions,

    #[error("invalid harness configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid library file name {name:?}")]
    InvalidLibraryName { name: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
