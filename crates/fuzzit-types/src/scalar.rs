use fuzzit_ir::CType;

/// The C scalar types a harness can decode from the input stream.
///
/// ```text
/// ┌────────────────────┬──────────────────────┬───────┐
/// │ Variant            │ C spelling           │ Width │
/// ├────────────────────┼──────────────────────┼───────┤
/// │ Char               │ char                 │ 1     │
/// │ UnsignedChar       │ unsigned char        │ 1     │
/// │ ShortInt           │ short int            │ 2     │
/// │ UnsignedShortInt   │ unsigned short int   │ 2     │
/// │ Int                │ int                  │ 4     │
/// │ UnsignedInt        │ unsigned int         │ 4     │
/// │ LongLongInt        │ long long int        │ 8     │
/// │ Void               │ void                 │ 4     │
/// └────────────────────┴──────────────────────┴───────┘
/// ```
///
/// `Void` carries the placeholder width 4 so the width table stays
/// total; it is only ever decoded when it appears behind a pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Char,
    UnsignedChar,
    ShortInt,
    UnsignedShortInt,
    Int,
    UnsignedInt,
    LongLongInt,
    Void,
}

impl ScalarType {
    /// Number of input bytes one value of this type occupies.
    pub fn width_bytes(self) -> u8 {
        match self {
            Self::Char | Self::UnsignedChar => 1,
            Self::ShortInt | Self::UnsignedShortInt => 2,
            Self::Int | Self::UnsignedInt | Self::Void => 4,
            Self::LongLongInt => 8,
        }
    }

    pub fn c_type(self) -> CType {
        match self {
            Self::Char => CType::Char,
            Self::UnsignedChar => CType::UnsignedChar,
            Self::ShortInt => CType::ShortInt,
            Self::UnsignedShortInt => CType::UnsignedShortInt,
            Self::Int => CType::Int,
            Self::UnsignedInt => CType::UnsignedInt,
            Self::LongLongInt => CType::LongLongInt,
            Self::Void => CType::Void,
        }
    }

    pub fn c_name(self) -> String {
        self.c_type().spelling()
    }
}
