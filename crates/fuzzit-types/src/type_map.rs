use crate::descriptor::TypeDescriptor;
use crate::error::TypeError;
use crate::scalar::ScalarType;

/// Qualifier token accepted alongside a base type.
const CONST_QUALIFIER: &str = "const";

/// Pointer marker. Its presence anywhere in the original description,
/// not in any single token, decides whether the result is a pointer.
const POINTER_MARKER: char = '*';

/// Maps analysis-provider type descriptions to [`TypeDescriptor`]s.
///
/// The mapping is a total function over a fixed whitelist of scalar
/// keywords. Anything outside the whitelist is an error, never a guess.
///
/// ```text
/// ┌────────────┬──────────────────────┬───────┐
/// │ Token      │ C spelling           │ Width │
/// ├────────────┼──────────────────────┼───────┤
/// │ uint64_t   │ long long int        │ 8     │
/// │ int64_t    │ long long int        │ 8     │
/// │ int32_t    │ int                  │ 4     │
/// │ int        │ int                  │ 4     │
/// │ uint32_t   │ unsigned int         │ 4     │
/// │ void       │ void                 │ 4     │
/// │ int16_t    │ short int            │ 2     │
/// │ uint16_t   │ unsigned short int   │ 2     │
/// │ char       │ char                 │ 1     │
/// │ int8_t     │ char                 │ 1     │
/// │ uint8_t    │ unsigned char        │ 1     │
/// └────────────┴──────────────────────┴───────┘
/// ```
///
/// Composite descriptions are split on whitespace and each token is
/// mapped with its `*` markers stripped, so `char const*`,
/// `const char *` and `const char*` all become a pointer to const char.
pub struct TypeMapper;

impl TypeMapper {
    /// Every recognised scalar token.
    pub const TABLE: &'static [(&'static str, ScalarType)] = &[
        ("uint64_t", ScalarType::LongLongInt),
        ("int64_t", ScalarType::LongLongInt),
        ("int32_t", ScalarType::Int),
        ("int", ScalarType::Int),
        ("uint32_t", ScalarType::UnsignedInt),
        ("void", ScalarType::Void),
        ("int16_t", ScalarType::ShortInt),
        ("uint16_t", ScalarType::UnsignedShortInt),
        ("char", ScalarType::Char),
        ("int8_t", ScalarType::Char),
        ("uint8_t", ScalarType::UnsignedChar),
    ];

    /// Look up a single scalar token (no qualifiers, no markers).
    pub fn lookup(token: &str) -> Option<ScalarType> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == token)
            .map(|&(_, ty)| ty)
    }

    /// Map a full type description.
    ///
    /// # Errors
    ///
    /// - [`TypeError::EmptyDescription`] for blank input.
    /// - [`TypeError::UnknownType`] for any token outside the table.
    /// - [`TypeError::MissingBaseType`] when only `const` / `*` appear.
    /// - [`TypeError::ConflictingBaseTypes`] for two scalar tokens.
    pub fn map(raw: &str) -> Result<TypeDescriptor, TypeError> {
        if raw.trim().is_empty() {
            return Err(TypeError::EmptyDescription);
        }

        let depth = raw.chars().filter(|&c| c == POINTER_MARKER).count();
        let mut base: Option<(&str, ScalarType)> = None;
        let mut is_const = false;

        for token in raw.split_whitespace() {
            let token = token.trim_matches(POINTER_MARKER);
            if token.is_empty() {
                // A detached marker, as in `char *`
                continue;
            }
            if token == CONST_QUALIFIER {
                is_const = true;
                continue;
            }
            let Some(ty) = Self::lookup(token) else {
                return Err(TypeError::UnknownType {
                    token: token.to_string(),
                    description: raw.to_string(),
                });
            };
            if let Some((first, _)) = base {
                return Err(TypeError::ConflictingBaseTypes {
                    first: first.to_string(),
                    second: token.to_string(),
                    description: raw.to_string(),
                });
            }
            base = Some((token, ty));
        }

        let Some((_, ty)) = base else {
            return Err(TypeError::MissingBaseType {
                description: raw.to_string(),
            });
        };

        if depth == 0 {
            Ok(TypeDescriptor::Scalar { ty, is_const })
        } else {
            Ok(TypeDescriptor::Pointer {
                pointee: ty,
                is_const,
                depth: u8::try_from(depth).unwrap_or(u8::MAX),
            })
        }
    }
}
