use std::fmt;

use crate::error::IrError;

/// A validated C identifier.
///
/// Every name that reaches the printer goes through this type, so the
/// generated source can never contain a symbol name with characters C
/// would reject (exported names such as `__x86.get_pc_thunk.ax` are legal
/// ELF symbols but not legal C).
///
/// ```text
/// ┌──────────────────────────┬───────────────────────────┐
/// │ Input                    │ Ident::sanitize           │
/// ├──────────────────────────┼───────────────────────────┤
/// │ "beep"                   │ beep                      │
/// │ "__x86.get_pc_thunk.ax"  │ __x86_get_pc_thunk_ax     │
/// │ "libfoo-1.2"             │ libfoo_1_2                │
/// │ "9lives"                 │ _9lives                   │
/// │ ""                       │ _                         │
/// └──────────────────────────┴───────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Wrap `name` as an identifier, rejecting anything that is not a
    /// valid C identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IrError::InvalidIdentifier`] when `name` is empty, starts
    /// with a digit, or contains a character outside `[A-Za-z0-9_]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IrError> {
        let name = name.into();
        if is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(IrError::InvalidIdentifier { name })
        }
    }

    /// Build an identifier from arbitrary text by replacing every invalid
    /// character with `_` and prefixing `_` when the result would start
    /// with a digit.
    pub fn sanitize(raw: &str) -> Self {
        let mut out: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
            out.insert(0, '_');
        }
        Self(out)
    }

    /// Identifier for compiler-internal names built from known-good parts.
    ///
    /// Used for generated locals such as `l_0_1`, whose shape is fixed by
    /// the generator and cannot be invalid.
    pub(crate) fn trusted(name: String) -> Self {
        debug_assert!(is_valid(&name), "untrusted identifier {name:?}");
        Self(name)
    }

    /// Build `<prefix>_<a>_<b>`, the shape used for per-case locals.
    pub fn indexed(prefix: &str, a: usize, b: usize) -> Self {
        Self::trusted(format!("{}_{a}_{b}", Self::sanitize(prefix).0))
    }

    /// Append `suffix` (which must itself be identifier-safe text).
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self::sanitize(&format!("{}{suffix}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_valid(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
