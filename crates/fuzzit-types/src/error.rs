/// Errors raised while mapping an analysis-provided type description.
///
/// Every one of these is fatal for generation: a guessed width would
/// shift the byte offset of every later parameter in the same dispatch
/// case, so the mapper refuses instead of guessing.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                                  │
/// │   ├── UnknownType          token not in the whitelist   │
/// │   ├── EmptyDescription     nothing but whitespace       │
/// │   ├── MissingBaseType      only qualifiers / markers    │
/// │   └── ConflictingBaseTypes two scalar tokens            │
/// └─────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
  /// A token of the description is not a recognised scalar keyword or
  /// qualifier.
  #[error("unknown type '{token}' in '{description}'")]
  UnknownType { token: String, description: String },

  /// The description was empty or all whitespace.
  #[error("empty type description")]
  EmptyDescription,

  /// The description held only qualifiers and pointer markers, e.g.
  /// `const *`.
  #[error("no base type in '{description}'")]
  MissingBaseType { description: String },

  /// More than one scalar keyword appeared, e.g. `int char`.
  #[error("conflicting base types '{first}' and '{second}' in '{description}'")]
  ConflictingBaseTypes {
    first: String,
    second: String,
    description: String,
  },
}
