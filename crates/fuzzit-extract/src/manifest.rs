use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::provider::{AnalysisProvider, RawSignature, Symbol};

/// An [`AnalysisProvider`] backed by a JSON export manifest.
///
/// This is how the CLI is fed: an analysis tool dumps what it found in a
/// shared object, and generation works from the dump. The format is:
///
/// ```json
/// {
///   "file": "libdemo.so",
///   "symbols": [
///     { "name": "beep",  "return_type": "void", "parameters": ["int32_t"] },
///     { "name": "greet", "return_type": "int32_t", "parameters": ["char const*"] },
///     { "name": "counter", "kind": "data" }
///   ]
/// }
/// ```
///
/// `kind` defaults to `function`; `address` is optional and defaults to
/// the symbol's index. Data symbols are exported but never resolve to a
/// function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestProvider {
    /// File name of the analysed binary, e.g. `libdemo.so`.
    pub file: String,
    #[serde(default)]
    pub symbols: Vec<ManifestSymbol>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSymbol {
    pub name: String,
    #[serde(default)]
    pub kind: SymbolKind,
    #[serde(default)]
    pub address: Option<u64>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    #[default]
    Function,
    Data,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl ManifestProvider {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            symbols: Vec::new(),
        }
    }

    /// Append an exported function.
    #[must_use]
    pub fn function(
        mut self,
        name: &str,
        return_type: &str,
        parameters: &[&str],
    ) -> Self {
        self.symbols.push(ManifestSymbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            address: None,
            return_type: return_type.to_string(),
            parameters: parameters.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Append an exported data symbol.
    #[must_use]
    pub fn data(mut self, name: &str) -> Self {
        self.symbols.push(ManifestSymbol {
            name: name.to_string(),
            kind: SymbolKind::Data,
            address: None,
            return_type: default_return_type(),
            parameters: Vec::new(),
        });
        self
    }

    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if the text is not a valid manifest.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, or
    /// [`ManifestError::Json`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialise back to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] on serialisation failure.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl AnalysisProvider for ManifestProvider {
    fn exported_symbols(&self) -> Vec<Symbol> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(index, s)| Symbol {
                name: s.name.clone(),
                address: s.address.unwrap_or(index as u64),
            })
            .collect()
    }

    fn describe(&self, symbol: &Symbol) -> Option<RawSignature> {
        self.symbols
            .iter()
            .enumerate()
            .find(|(index, s)| {
                s.name == symbol.name && s.address.unwrap_or(*index as u64) == symbol.address
            })
            .filter(|(_, s)| s.kind == SymbolKind::Function)
            .map(|(_, s)| RawSignature {
                name: s.name.clone(),
                return_type: s.return_type.clone(),
                parameter_types: s.parameters.clone(),
            })
    }
}
