use std::collections::HashSet;

use fuzzit_types::{FunctionSignature, TypeMapper};
use tracing::debug;

use crate::denylist::Denylist;
use crate::error::ExtractError;
use crate::provider::{AnalysisProvider, RawSignature};

/// Turns provider output into typed [`FunctionSignature`]s.
///
/// ```text
/// exported_symbols() ──▶ describe() ──▶ denylist ──▶ TypeMapper ──▶ Vec<FunctionSignature>
///                          │ None          │ hit          │ Err
///                          ▼               ▼              ▼
///                        skipped         skipped      ExtractError::Type
/// ```
///
/// Order is preserved: the i-th surviving export becomes dispatch case i.
/// An empty result is not an error; the caller decides what "no usable
/// functions" means for it.
#[derive(Clone, Debug, Default)]
pub struct SignatureExtractor {
    denylist: Denylist,
}

impl SignatureExtractor {
    pub fn new(denylist: Denylist) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Extract every usable exported function.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Type`] / [`ExtractError::VoidParameter`] for the
    ///   first export whose types cannot be mapped.
    /// - [`ExtractError::DuplicateFunction`] if two exports share a name.
    pub fn extract<P>(&self, provider: &P) -> Result<Vec<FunctionSignature>, ExtractError>
    where
        P: AnalysisProvider + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for symbol in provider.exported_symbols() {
            let Some(raw) = provider.describe(&symbol) else {
                debug!(symbol = %symbol.name, "export is not a function, skipping");
                continue;
            };
            let Some(signature) = self.extract_one(&raw)? else {
                continue;
            };
            if !seen.insert(signature.name.clone()) {
                return Err(ExtractError::DuplicateFunction {
                    name: signature.name,
                });
            }
            out.push(signature);
        }

        debug!(count = out.len(), "extracted exported signatures");
        Ok(out)
    }

    /// Map exactly one caller-selected function.
    ///
    /// Returns `Ok(None)` when the function is on the denylist.
    ///
    /// # Errors
    ///
    /// Same mapping errors as [`extract`](Self::extract).
    pub fn extract_one(&self, raw: &RawSignature) -> Result<Option<FunctionSignature>, ExtractError> {
        if self.denylist.contains(&raw.name) {
            debug!(symbol = %raw.name, "denylisted, skipping");
            return Ok(None);
        }
        map_signature(raw).map(Some)
    }

    /// Look up an exported function by name.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::UnknownFunction`] when no export with that
    /// name resolves to a function.
    pub fn find<P>(&self, provider: &P, name: &str) -> Result<RawSignature, ExtractError>
    where
        P: AnalysisProvider + ?Sized,
    {
        provider
            .exported_symbols()
            .iter()
            .filter(|symbol| symbol.name == name)
            .find_map(|symbol| provider.describe(symbol))
            .ok_or_else(|| ExtractError::UnknownFunction {
                name: name.to_string(),
            })
    }

    /// Collect every mapping problem instead of stopping at the first.
    pub fn diagnose<P>(&self, provider: &P) -> Vec<ExtractError>
    where
        P: AnalysisProvider + ?Sized,
    {
        provider
            .exported_symbols()
            .iter()
            .filter_map(|symbol| provider.describe(symbol))
            .filter_map(|raw| self.extract_one(&raw).err())
            .collect()
    }
}

fn map_signature(raw: &RawSignature) -> Result<FunctionSignature, ExtractError> {
    let type_error = |source| ExtractError::Type {
        function: raw.name.clone(),
        source,
    };

    let return_type = TypeMapper::map(&raw.return_type).map_err(type_error)?;

    // `f(void)` is how some providers spell an empty parameter list
    let params: &[String] = match raw.parameter_types.as_slice() {
        [only] if only.trim() == "void" => &[],
        all => all,
    };

    let mut parameters = Vec::with_capacity(params.len());
    for (position, description) in params.iter().enumerate() {
        let ty = TypeMapper::map(description).map_err(type_error)?;
        if ty.is_void() {
            return Err(ExtractError::VoidParameter {
                function: raw.name.clone(),
                position,
            });
        }
        parameters.push(ty);
    }

    Ok(FunctionSignature::new(raw.name.clone(), return_type, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Symbol;
    use fuzzit_types::{ScalarType, TypeDescriptor, TypeError};

    struct Fixture {
        exports: Vec<(String, Option<RawSignature>)>,
    }

    impl Fixture {
        fn new(functions: &[RawSignature]) -> Self {
            Self {
                exports: functions
                    .iter()
                    .map(|f| (f.name.clone(), Some(f.clone())))
                    .collect(),
            }
        }

        fn with_data(mut self, name: &str) -> Self {
            self.exports.push((name.to_string(), None));
            self
        }
    }

    impl AnalysisProvider for Fixture {
        fn exported_symbols(&self) -> Vec<Symbol> {
            self.exports
                .iter()
                .enumerate()
                .map(|(i, (name, _))| Symbol {
                    name: name.clone(),
                    address: 0x1000 + i as u64 * 0x10,
                })
                .collect()
        }

        fn describe(&self, symbol: &Symbol) -> Option<RawSignature> {
            self.exports
                .iter()
                .find(|(name, _)| *name == symbol.name)
                .and_then(|(_, raw)| raw.clone())
        }
    }

    #[test]
    fn extracts_in_provider_order() {
        let provider = Fixture::new(&[
            RawSignature::new("beep", "void", ["int32_t"]),
            RawSignature::new("greet", "int32_t", ["char*"]),
        ]);
        let sigs = SignatureExtractor::default().extract(&provider).unwrap();
        let names: Vec<&str> = sigs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["beep", "greet"]);
        assert!(sigs[1].parameters[0].ty.is_pointer());
    }

    #[test]
    fn skips_denylisted_and_data_symbols() {
        let provider = Fixture::new(&[
            RawSignature::new("_init", "void", Vec::<String>::new()),
            RawSignature::new("frame_dummy", "void", Vec::<String>::new()),
            RawSignature::new("beep", "void", ["int32_t"]),
        ])
        .with_data("global_counter");
        let sigs = SignatureExtractor::default().extract(&provider).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "beep");
    }

    #[test]
    fn caller_supplied_denylist_entries_apply() {
        let provider = Fixture::new(&[
            RawSignature::new("beep", "void", ["int32_t"]),
            RawSignature::new("internal", "void", ["int32_t"]),
        ]);
        let extractor = SignatureExtractor::new(Denylist::default().with(["internal"]));
        let sigs = extractor.extract(&provider).unwrap();
        assert_eq!(sigs.len(), 1);
    }

    #[test]
    fn only_scaffolding_yields_empty_result() {
        let provider = Fixture::new(&[
            RawSignature::new("_start", "void", Vec::<String>::new()),
            RawSignature::new("_fini", "void", Vec::<String>::new()),
        ]);
        let sigs = SignatureExtractor::default().extract(&provider).unwrap();
        assert!(sigs.is_empty());
    }

    #[test]
    fn unknown_type_names_the_function() {
        let provider = Fixture::new(&[RawSignature::new("scale", "void", ["float"])]);
        let err = SignatureExtractor::default().extract(&provider).unwrap_err();
        match err {
            ExtractError::Type { function, source } => {
                assert_eq!(function, "scale");
                assert!(matches!(source, TypeError::UnknownType { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let sig = SignatureExtractor::default()
            .extract_one(&RawSignature::new("tick", "void", ["void"]))
            .unwrap()
            .unwrap();
        assert!(sig.parameters.is_empty());
    }

    #[test]
    fn void_among_parameters_is_rejected() {
        let err = SignatureExtractor::default()
            .extract_one(&RawSignature::new("odd", "void", ["int32_t", "void"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::VoidParameter { position: 1, .. }
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let provider = Fixture::new(&[
            RawSignature::new("beep", "void", ["int32_t"]),
            RawSignature::new("beep", "void", ["int32_t"]),
        ]);
        assert!(matches!(
            SignatureExtractor::default().extract(&provider),
            Err(ExtractError::DuplicateFunction { .. })
        ));
    }

    #[test]
    fn extract_one_respects_denylist() {
        let raw = RawSignature::new("__cxa_finalize", "void", ["void*"]);
        assert!(SignatureExtractor::default().extract_one(&raw).unwrap().is_none());
    }

    #[test]
    fn find_and_unknown_function() {
        let provider = Fixture::new(&[RawSignature::new("beep", "void", ["int32_t"])]);
        let extractor = SignatureExtractor::default();
        assert_eq!(extractor.find(&provider, "beep").unwrap().name, "beep");
        assert!(matches!(
            extractor.find(&provider, "boop"),
            Err(ExtractError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn diagnose_reports_every_failure() {
        let provider = Fixture::new(&[
            RawSignature::new("a", "void", ["float"]),
            RawSignature::new("b", "void", ["int32_t"]),
            RawSignature::new("c", "double", Vec::<String>::new()),
        ]);
        let problems = SignatureExtractor::default().diagnose(&provider);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn return_type_is_kept() {
        let sig = SignatureExtractor::default()
            .extract_one(&RawSignature::new("len", "uint64_t", ["char const*"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            sig.return_type,
            TypeDescriptor::Scalar {
                ty: ScalarType::LongLongInt,
                is_const: false
            }
        );
    }
}
