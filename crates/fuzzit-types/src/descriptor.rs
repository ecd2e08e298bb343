use std::fmt;

use fuzzit_ir::CType;

use crate::scalar::ScalarType;

/// Canonical description of a parameter or return type.
///
/// Only [`TypeMapper`](crate::TypeMapper) produces these, which is what
/// guarantees the width invariant: a `Scalar` always has a width in
/// {1, 2, 4, 8}, and a `Pointer` is always decoded from a length-prefixed
/// buffer rather than a fixed width.
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────┐
/// │ Variant        │ Wire representation in the harness input │
/// ├────────────────┼──────────────────────────────────────────┤
/// │ Scalar{ty}     │ ty.width_bytes() raw bytes               │
/// │ Pointer{..}    │ 4-byte length L, then L raw bytes        │
/// └────────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar {
        ty: ScalarType,
        is_const: bool,
    },
    Pointer {
        pointee: ScalarType,
        is_const: bool,
        /// Number of `*` markers in the original description.
        depth: u8,
    },
}

impl TypeDescriptor {
    /// Width of a scalar value in bytes; `None` for pointers, whose
    /// consumption is only known at run time.
    pub fn width_bytes(&self) -> Option<u8> {
        match self {
            Self::Scalar { ty, .. } => Some(ty.width_bytes()),
            Self::Pointer { .. } => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    /// Whether this is a bare `void` (not `void *`).
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Self::Scalar {
                ty: ScalarType::Void,
                ..
            }
        )
    }

    /// The declared C type, qualifiers included. Used for typedefs.
    pub fn c_type(&self) -> CType {
        match *self {
            Self::Scalar { ty, is_const } => qualify(ty.c_type(), is_const),
            Self::Pointer {
                pointee,
                is_const,
                depth,
            } => {
                let mut out = qualify(pointee.c_type(), is_const);
                for _ in 0..depth.max(1) {
                    out = CType::pointer_to(out);
                }
                out
            }
        }
    }

    /// The type of a decoded local holding this value.
    ///
    /// Scalars drop their `const` so the harness can `memcpy` into them.
    pub fn local_c_type(&self) -> CType {
        match *self {
            Self::Scalar { ty, .. } => ty.c_type(),
            Self::Pointer { .. } => self.c_type(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.c_type().spelling())
    }
}

fn qualify(ty: CType, is_const: bool) -> CType {
    if is_const { CType::constant(ty) } else { ty }
}
