use fuzzit_types::TypeError;

/// Errors that can occur while turning provider output into signatures.
///
/// ```text
///   ExtractError
///   ├── Type              ← a return/parameter type failed to map
///   ├── VoidParameter     ← bare `void` in a real parameter list
///   ├── DuplicateFunction ← two exports with the same name
///   └── UnknownFunction   ← a caller-selected name is not exported
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Mapping failed for one of the function's types. The function name
    /// is captured so the diagnostic points at the offending export.
    #[error("function '{function}': {source}")]
    Type {
        function: String,
        #[source]
        source: TypeError,
    },

    /// `void` appeared as a parameter next to other parameters, which
    /// has no byte representation.
    #[error("function '{function}': parameter {position} is void")]
    VoidParameter { function: String, position: usize },

    #[error("duplicate exported function '{name}'")]
    DuplicateFunction { name: String },

    #[error("no exported function named '{name}'")]
    UnknownFunction { name: String },
}

/// Errors loading a JSON export manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),
}
