use std::collections::HashSet;

use fuzzit_ir::Ident;

// Scaffolding identifiers shared by the emitter and the dispatch compiler.
pub(crate) const DATA: &str = "Data";
pub(crate) const SIZE: &str = "Size";
pub(crate) const CHOICE: &str = "choice";
pub(crate) const DISPATCH: &str = "Dispatch";
pub(crate) const BUF: &str = "Buf";
pub(crate) const AVAILABLE: &str = "Available";
pub(crate) const CONSUMED: &str = "Consumed";
pub(crate) const IS_LOADED: &str = "isLoaded";
pub(crate) const LOAD_LIBRARY: &str = "LoadLibrary";
pub(crate) const CLOSE_LIBRARY: &str = "CloseLibrary";
pub(crate) const RESOLVE_SYMBOLS: &str = "ResolveSymbols";
pub(crate) const READ_CHUNK: &str = "ReadChunk";
pub(crate) const INPUT: &str = "Input";
pub(crate) const INPUT_SIZE: &str = "InputSize";
pub(crate) const INPUT_OFFSET: &str = "InputOffset";
pub(crate) const BUF_SIZE: &str = "BufSize";
pub(crate) const REMAINING: &str = "Remaining";
pub(crate) const COUNT: &str = "Count";

/// Prefix of every function handle, so no export can shadow a name the
/// included headers declare.
pub(crate) const HANDLE_PREFIX: &str = "fp_";

/// Prefixes of per-case locals (`l_<case>_<pos>` and friends).
pub(crate) const SCALAR_LOCAL: &str = "l";
pub(crate) const LENGTH_LOCAL: &str = "len";
pub(crate) const BUFFER_LOCAL: &str = "buf";

/// Names a generated identifier must never take.
const RESERVED: &[&str] = &[
    // C keywords
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while",
    // libc and loader
    "memcpy", "memset", "malloc", "free", "printf", "fprintf", "stderr", "read", "atexit",
    "dlopen", "dlsym", "dlclose", "dlerror", "NULL", "RTLD_NOW", "RTLD_GLOBAL", "uint8_t",
    "int8_t", "uint16_t", "int16_t", "uint32_t", "int32_t", "uint64_t", "int64_t", "size_t",
    // declared by the included headers
    "stdin", "stdout", "FILE", "EOF", "fopen", "fclose", "fread", "fwrite", "fflush", "fputs",
    "fgets", "puts", "putchar", "getchar", "sprintf", "snprintf", "scanf", "sscanf", "perror",
    "remove", "rename", "exit", "abort", "calloc", "realloc", "atoi", "atol", "strtol",
    "strtoul", "getenv", "system", "qsort", "bsearch", "rand", "srand", "abs", "strlen",
    "strcpy", "strncpy", "strcmp", "strncmp", "strcat", "strchr", "strrchr", "strstr",
    "strdup", "strerror", "memmove", "memcmp", "memchr", "write", "close", "lseek", "unlink",
    "getpid", "sleep", "fork", "pipe", "dup", "dup2", "access", "_exit", "ssize_t", "off_t",
    "pid_t", "intptr_t", "uintptr_t", "intmax_t", "uintmax_t", "SIZE_MAX", "dladdr",
    "Dl_info", "RTLD_LAZY", "RTLD_LOCAL",
    // harness entry points and parameters
    "main", "argc", "argv", "LLVMFuzzerTestOneInput",
    DATA, SIZE, CHOICE, DISPATCH, BUF, AVAILABLE, CONSUMED, IS_LOADED, LOAD_LIBRARY,
    CLOSE_LIBRARY, RESOLVE_SYMBOLS, READ_CHUNK, INPUT, INPUT_SIZE, INPUT_OFFSET, BUF_SIZE,
    REMAINING, COUNT,
];

/// Hands out collision-free C identifiers for function handles.
///
/// A handle is `fp_` plus the sanitized symbol name when that is free.
/// Otherwise the first free `fp_<name>_<k>` (k = 1, 2, ...) is used. A
/// handle is only granted when its typedef name `<handle>_t` is free as
/// well.
#[derive(Debug)]
pub(crate) struct Namer {
    taken: HashSet<String>,
}

impl Namer {
    pub(crate) fn new() -> Self {
        Self {
            taken: RESERVED.iter().map(ToString::to_string).collect(),
        }
    }

    /// Claim `raw` (sanitized) or a suffixed variant of it.
    pub(crate) fn claim(&mut self, raw: &str) -> Ident {
        let base = Ident::sanitize(raw);
        let mut candidate = base.clone();
        let mut k = 0usize;
        while !self.is_free(candidate.as_str()) {
            k += 1;
            candidate = base.with_suffix(&format!("_{k}"));
        }
        self.taken.insert(candidate.as_str().to_string());
        candidate
    }

    /// Claim a handle together with its `_t` typedef name.
    pub(crate) fn claim_handle(&mut self, symbol: &str) -> (Ident, Ident) {
        let base = Ident::sanitize(&format!("{HANDLE_PREFIX}{symbol}"));
        let mut handle = base.clone();
        let mut k = 0usize;
        loop {
            let typedef = handle.with_suffix("_t");
            if self.is_free(handle.as_str()) && self.is_free(typedef.as_str()) {
                self.taken.insert(handle.as_str().to_string());
                self.taken.insert(typedef.as_str().to_string());
                return (handle, typedef);
            }
            k += 1;
            handle = base.with_suffix(&format!("_{k}"));
        }
    }

    fn is_free(&self, name: &str) -> bool {
        !self.taken.contains(name) && !is_case_local(name)
    }
}

/// Whether `name` has the shape of a generated per-case local.
fn is_case_local(name: &str) -> bool {
    [SCALAR_LOCAL, LENGTH_LOCAL, BUFFER_LOCAL].iter().any(|prefix| {
        let Some(rest) = name
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('_'))
        else {
            return false;
        };
        let mut parts = rest.split('_');
        matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(a), Some(b), None) if is_digits(a) && is_digits(b)
        )
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_carry_prefix() {
        let mut namer = Namer::new();
        let (handle, typedef) = namer.claim_handle("beep");
        assert_eq!(handle.as_str(), "fp_beep");
        assert_eq!(typedef.as_str(), "fp_beep_t");
    }

    #[test]
    fn libc_names_never_shadowed() {
        let mut namer = Namer::new();
        for symbol in ["strlen", "exit", "stdout", "read", "Dispatch", "main"] {
            let (handle, typedef) = namer.claim_handle(symbol);
            assert_eq!(handle.as_str(), format!("fp_{symbol}"));
            assert_eq!(typedef.as_str(), format!("fp_{symbol}_t"));
        }
    }

    #[test]
    fn sanitized_collisions_suffixed() {
        let mut namer = Namer::new();
        assert_eq!(namer.claim_handle("a.b").0.as_str(), "fp_a_b");
        assert_eq!(namer.claim_handle("a-b").0.as_str(), "fp_a_b_1");
        assert_eq!(namer.claim_handle("a@b").0.as_str(), "fp_a_b_2");
    }

    #[test]
    fn typedef_collision_forces_suffix() {
        let mut namer = Namer::new();
        assert_eq!(namer.claim_handle("foo_t").0.as_str(), "fp_foo_t");
        let (handle, typedef) = namer.claim_handle("foo");
        assert_eq!(handle.as_str(), "fp_foo_1");
        assert_eq!(typedef.as_str(), "fp_foo_1_t");
    }

    #[test]
    fn library_handle_avoids_header_names() {
        let mut namer = Namer::new();
        assert_eq!(namer.claim("stdout").as_str(), "stdout_1");
        assert_eq!(namer.claim("exit").as_str(), "exit_1");
        assert_eq!(namer.claim("l_0_0").as_str(), "l_0_0_1");
    }

    #[test]
    fn handle_yields_to_library_handle() {
        let mut namer = Namer::new();
        assert_eq!(namer.claim("fp_beep").as_str(), "fp_beep");
        assert_eq!(namer.claim_handle("beep").0.as_str(), "fp_beep_1");
    }
}
