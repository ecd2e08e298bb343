/// An exported symbol as reported by the analysis provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
}

/// The provider's untyped view of one function.
///
/// Type descriptions are the provider's own spellings, e.g. `int32_t` or
/// `char const*`; [`TypeMapper`](fuzzit_types::TypeMapper) decides what
/// they mean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSignature {
    pub name: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
}

impl RawSignature {
    pub fn new(
        name: impl Into<String>,
        return_type: impl Into<String>,
        parameter_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }
}

/// The narrow interface a binary analysis backend must satisfy.
///
/// The compiler never talks to an analysis tool directly; anything that
/// can list exports and describe them can drive generation.
///
/// ```text
/// ┌──────────────────────┐  exported_symbols()  ┌─────────────────────┐
/// │ analysis backend     │ ───────────────────▶ │ SignatureExtractor  │
/// │ (disassembler, JSON, │  describe(symbol)    │                     │
/// │  test fixture, ...)  │ ───────────────────▶ │                     │
/// └──────────────────────┘                      └─────────────────────┘
/// ```
pub trait AnalysisProvider {
    /// Every export-type symbol, in the provider's order.
    fn exported_symbols(&self) -> Vec<Symbol>;

    /// Resolve `symbol` to a function and describe its signature.
    ///
    /// Returns `None` when the symbol is not a function (exported data,
    /// for instance).
    fn describe(&self, symbol: &Symbol) -> Option<RawSignature>;
}
