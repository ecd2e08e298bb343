use fuzzit_ir::{CType, Ident, Item};
use fuzzit_types::FunctionSignature;

use crate::config::HarnessConfig;
use crate::error::CompileError;
use crate::naming::Namer;

/// A signature bound to the C names the harness refers to it by.
///
/// `handle` is the function-pointer variable and `typedef` its type.
/// Both are valid, unique C identifiers; the original `signature.name`
/// is still what gets passed to `dlsym`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundFunction {
    pub signature: FunctionSignature,
    pub handle: Ident,
    pub typedef: Ident,
}

impl BoundFunction {
    /// `typedef <ret> (*<handle>_t)(<params>);`
    pub fn typedef_item(&self) -> Item {
        Item::FnPtrTypedef {
            name: self.typedef.clone(),
            ret: self.signature.return_type.c_type(),
            params: self
                .signature
                .parameters
                .iter()
                .map(|p| p.ty.c_type())
                .collect(),
        }
    }

    /// `static <handle>_t <handle> = NULL;`
    pub fn handle_item(&self) -> Item {
        Item::Global {
            ty: CType::Named(self.typedef.clone()),
            name: self.handle.clone(),
            init: Some(fuzzit_ir::Expr::Null),
            is_static: true,
        }
    }
}

/// Everything needed to emit one harness.
///
/// Dispatch cases are numbered by position in `functions`: index `i`
/// becomes `case i`, so the same spec always yields the same selector
/// mapping.
#[derive(Clone, Debug)]
pub struct HarnessSpec {
    library: String,
    library_handle: Ident,
    functions: Vec<BoundFunction>,
    config: HarnessConfig,
}

impl HarnessSpec {
    /// Validate the inputs and assign C names.
    ///
    /// # Errors
    ///
    /// - [`CompileError::NoFunctions`] when `signatures` is empty.
    /// - [`CompileError::InvalidLibraryName`] when `library` is empty.
    /// - [`CompileError::InvalidConfig`] when `config` fails validation.
    pub fn new(
        library: impl Into<String>,
        signatures: Vec<FunctionSignature>,
        config: HarnessConfig,
    ) -> Result<Self, CompileError> {
        let library = library.into();
        if library.trim().is_empty() {
            return Err(CompileError::InvalidLibraryName { name: library });
        }
        if signatures.is_empty() {
            return Err(CompileError::NoFunctions);
        }
        config.validate()?;

        let mut namer = Namer::new();
        let library_handle = namer.claim(library_stem(&library));
        let functions = signatures
            .into_iter()
            .map(|signature| {
                let (handle, typedef) = namer.claim_handle(&signature.name);
                BoundFunction {
                    signature,
                    handle,
                    typedef,
                }
            })
            .collect();

        Ok(Self {
            library,
            library_handle,
            functions,
            config,
        })
    }

    /// File name passed to `dlopen`.
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Identifier of the `void *` holding the loaded library.
    pub fn library_handle(&self) -> &Ident {
        &self.library_handle
    }

    pub fn functions(&self) -> &[BoundFunction] {
        &self.functions
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Number of dispatch cases, N.
    pub fn case_count(&self) -> usize {
        self.functions.len()
    }
}

/// The part of a library file name before `.so`, e.g. `libdemo` for
/// `libdemo.so.1`.
pub(crate) fn library_stem(library: &str) -> &str {
    library.split(".so").next().unwrap_or(library)
}
