use std::fmt;

use crate::descriptor::TypeDescriptor;

/// One parameter of an exported function.
///
/// `position` is the 0-based argument index. It fixes both the call
/// order and the order in which the parameter's bytes appear in the
/// harness input, and is never changed after extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub position: usize,
    pub ty: TypeDescriptor,
}

/// A typed exported function, ready for harness generation.
///
/// `return_type` is only used to spell the function-pointer typedef;
/// the harness never inspects return values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: TypeDescriptor,
    pub parameters: Vec<ParameterDescriptor>,
}

impl FunctionSignature {
    /// Build a signature, numbering `parameters` in the order given.
    pub fn new(
        name: impl Into<String>,
        return_type: TypeDescriptor,
        parameters: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: parameters
                .into_iter()
                .enumerate()
                .map(|(position, ty)| ParameterDescriptor { position, ty })
                .collect(),
        }
    }

    /// Smallest number of input bytes a call can consume: scalar widths
    /// plus 4 for every length prefix.
    pub fn min_input_bytes(&self) -> usize {
        self.parameters
            .iter()
            .map(|p| p.ty.width_bytes().map_or(4, usize::from))
            .sum()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        write!(f, "{} {}({})", self.return_type, self.name, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarType;

    fn scalar(ty: ScalarType) -> TypeDescriptor {
        TypeDescriptor::Scalar { ty, is_const: false }
    }

    #[test]
    fn positions_follow_input_order() {
        let sig = FunctionSignature::new(
            "f",
            scalar(ScalarType::Void),
            [scalar(ScalarType::Char), scalar(ScalarType::LongLongInt)],
        );
        let positions: Vec<usize> = sig.parameters.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn min_input_bytes_counts_prefixes() {
        let sig = FunctionSignature::new(
            "f",
            scalar(ScalarType::Int),
            [
                scalar(ScalarType::Int),
                TypeDescriptor::Pointer {
                    pointee: ScalarType::Char,
                    is_const: false,
                    depth: 1,
                },
            ],
        );
        assert_eq!(sig.min_input_bytes(), 8);
    }

    #[test]
    fn display() {
        let sig = FunctionSignature::new(
            "greet",
            scalar(ScalarType::Void),
            [TypeDescriptor::Pointer {
                pointee: ScalarType::Char,
                is_const: true,
                depth: 1,
            }],
        );
        assert_eq!(sig.to_string(), "void greet(const char *)");
    }
}
