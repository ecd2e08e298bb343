/// Errors raised while building C intermediate representation.
///
/// The IR refuses to hold anything the printer could not turn into valid
/// C source, so construction is the only place these can surface.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A string was used where a C identifier is required but does not
    /// match `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid C identifier: {name:?}")]
    InvalidIdentifier { name: String },
}
