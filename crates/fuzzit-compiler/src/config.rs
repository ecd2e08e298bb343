use crate::error::CompileError;

/// Default bytes read from the input source per outer loop iteration.
pub const DEFAULT_BUFFER_CAPACITY: usize = 512;

/// Upper bound on the read buffer. The buffer lives on the harness stack.
pub const MAX_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Settings baked into a generated harness.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                          │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ buffer_capacity │ bytes per read (default 512)                     │
/// │ loop_style      │ how the outer read loop is shaped                │
/// │ input_source    │ where bytes come from, and the entry point name  │
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    pub buffer_capacity: usize,
    pub loop_style: LoopStyle,
    pub input_source: InputSource,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            loop_style: LoopStyle::default(),
            input_source: InputSource::default(),
        }
    }
}

impl HarnessConfig {
    /// Check the configuration before any code is generated.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] when `buffer_capacity` is
    /// zero or above [`MAX_BUFFER_CAPACITY`].
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.buffer_capacity == 0 {
            return Err(CompileError::InvalidConfig {
                reason: "buffer capacity must be at least 1 byte".to_string(),
            });
        }
        if self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(CompileError::InvalidConfig {
                reason: format!(
                    "buffer capacity {} exceeds {MAX_BUFFER_CAPACITY} bytes",
                    self.buffer_capacity
                ),
            });
        }
        Ok(())
    }
}

/// Shape of the outer "read a chunk" loop. Both drain one read's worth of
/// bytes into calls before reading again.
///
/// ```text
/// ┌──────────┬────────────────────────────────────────────────────────┐
/// │ Style    │ Generated shape                                        │
/// ├──────────┼────────────────────────────────────────────────────────┤
/// │ DoWhile  │ do { n = read(); if (n <= 0) break; drain } while (n>0)│
/// │ While    │ while ((n = read()) > 0) { drain }                     │
/// └──────────┴────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopStyle {
    #[default]
    DoWhile,
    While,
}

/// Where the harness gets its bytes, which also fixes its entry point.
///
/// ```text
/// ┌───────────┬─────────────────────────────────────────────┬─────────────────────┐
/// │ Source    │ Entry point                                 │ One read            │
/// ├───────────┼─────────────────────────────────────────────┼─────────────────────┤
/// │ LibFuzzer │ LLVMFuzzerTestOneInput(const uint8_t*, size_t) │ next ≤ cap bytes │
/// │ Stdin     │ main(int, char *[])                         │ read(0, Buf, cap)   │
/// └───────────┴─────────────────────────────────────────────┴─────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputSource {
    #[default]
    LibFuzzer,
    Stdin,
}
