use crate::ident::Ident;

/// C types that can appear in generated harness source.
///
/// Only the types the harness actually needs are representable. Pointer
/// and qualifier layers nest, so `const char *` is
/// `Pointer(Const(Char))`.
///
/// ```text
/// ┌───────────────────────────────┬───────────────────────┐
/// │ Value                         │ Spelling              │
/// ├───────────────────────────────┼───────────────────────┤
/// │ Int                           │ int                   │
/// │ LongLongInt                   │ long long int         │
/// │ Pointer(Const(Char))          │ const char *          │
/// │ Pointer(Pointer(Char))        │ char **               │
/// │ Named(fp_beep_t)              │ fp_beep_t             │
/// │ Array(Uint8, 512)             │ uint8_t name[512]     │
/// └───────────────────────────────┴───────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Char,
    UnsignedChar,
    ShortInt,
    UnsignedShortInt,
    Int,
    UnsignedInt,
    LongLongInt,
    Uint8,
    SizeT,
    /// A typedef name introduced elsewhere in the translation unit.
    Named(Ident),
    Const(Box<CType>),
    Pointer(Box<CType>),
    /// Fixed-length array. Only valid as a declaration type.
    Array(Box<CType>, usize),
}

impl CType {
    pub fn pointer_to(inner: CType) -> Self {
        Self::Pointer(Box::new(inner))
    }

    pub fn constant(inner: CType) -> Self {
        Self::Const(Box::new(inner))
    }

    /// Storage width in bytes on the LP64 targets the harness is built for.
    ///
    /// Returns `None` for `void`, typedef names, and arrays of unknown
    /// element width.
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Char | Self::UnsignedChar | Self::Uint8 => Some(1),
            Self::ShortInt | Self::UnsignedShortInt => Some(2),
            Self::Int | Self::UnsignedInt => Some(4),
            Self::LongLongInt | Self::SizeT | Self::Pointer(_) => Some(8),
            Self::Const(inner) => inner.width(),
            Self::Array(elem, len) => elem.width().map(|w| w * len),
            Self::Void | Self::Named(_) => None,
        }
    }

    /// Whether values of this type are signed integers.
    pub fn is_signed(&self) -> bool {
        match self {
            Self::Char | Self::ShortInt | Self::Int | Self::LongLongInt => true,
            Self::Const(inner) => inner.is_signed(),
            _ => false,
        }
    }

    pub fn is_pointer(&self) -> bool {
        match self {
            Self::Pointer(_) | Self::Named(_) => true,
            Self::Const(inner) => inner.is_pointer(),
            _ => false,
        }
    }

    /// Type spelling as used in casts, `sizeof`, and parameter lists.
    pub fn spelling(&self) -> String {
        match self {
            Self::Void => "void".to_string(),
            Self::Char => "char".to_string(),
            Self::UnsignedChar => "unsigned char".to_string(),
            Self::ShortInt => "short int".to_string(),
            Self::UnsignedShortInt => "unsigned short int".to_string(),
            Self::Int => "int".to_string(),
            Self::UnsignedInt => "unsigned int".to_string(),
            Self::LongLongInt => "long long int".to_string(),
            Self::Uint8 => "uint8_t".to_string(),
            Self::SizeT => "size_t".to_string(),
            Self::Named(name) => name.to_string(),
            Self::Const(inner) => format!("const {}", inner.spelling()),
            Self::Pointer(inner) => {
                let inner = inner.spelling();
                if inner.ends_with('*') {
                    format!("{inner}*")
                } else {
                    format!("{inner} *")
                }
            }
            Self::Array(elem, len) => format!("{}[{len}]", elem.spelling()),
        }
    }

    /// Declaration of `name` with this type, e.g. `char *buf_0_0` or
    /// `uint8_t Buf[512]`.
    pub fn declare(&self, name: &Ident) -> String {
        if let Self::Array(elem, len) = self {
            return format!("{} {name}[{len}]", elem.spelling());
        }
        let spelled = self.spelling();
        if spelled.ends_with('*') {
            format!("{spelled}{name}")
        } else {
            format!("{spelled} {name}")
        }
    }
}
