//! Per-parameter decoding of raw input bytes into call arguments.
//!
//! Every parameter reads its bytes at the case's running offset, which
//! is the sum of what the earlier parameters consumed. Each read is
//! preceded by a guard that bails out of the case (returning
//! [`BAIL_SENTINEL`](fuzzit_ir::BAIL_SENTINEL)) when `Size` is too small,
//! so no read can run past the chunk.
//!
//! ```text
//!  scalar (width w)                   pointer
//!  ┌───────────────┐                  ┌───────────────┬──────────────┐
//!  │ w raw bytes   │                  │ u32 length L  │ L raw bytes  │
//!  └───────────────┘                  └───────────────┴──────────────┘
//!  guard: Size < off + max(4, w)      guard: Size < off + 4
//!                                     guard: L > Size - (off + 4)
//!                                     guard: malloc(L + 1) == NULL
//! ```

use fuzzit_ir::{CType, Expr, Ident, Stmt};
use fuzzit_types::{ParameterDescriptor, TypeDescriptor};

use crate::byte_count::ByteCount;
use crate::naming::{BUFFER_LOCAL, DATA, LENGTH_LOCAL, SCALAR_LOCAL, SIZE};

/// Width of the length prefix in front of every pointer payload.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Minimum remaining input a scalar guard demands, whatever the width.
pub const MIN_SCALAR_GUARD: usize = 4;

/// The generated code for one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeFragment {
    /// Guards, declarations and copies, in execution order. Guards carry
    /// an empty release list; the dispatch compiler fills it in.
    pub statements: Vec<Stmt>,
    /// Expression passed at this parameter's position in the call.
    pub argument: Expr,
    /// Runs after the call (pointer buffers only).
    pub cleanup: Option<Stmt>,
    /// Heap buffer allocated by this fragment, if any.
    pub buffer: Option<Ident>,
    /// Input bytes this parameter consumes.
    pub consumed: ByteCount,
}

/// Decodes the parameters of one dispatch case.
#[derive(Clone, Copy, Debug)]
pub struct ArgumentDecoder {
    case: usize,
}

impl ArgumentDecoder {
    pub fn for_case(case: usize) -> Self {
        Self { case }
    }

    /// Decode `parameter` starting at `offset` bytes into the remaining
    /// input.
    pub fn decode(&self, parameter: &ParameterDescriptor, offset: &ByteCount) -> DecodeFragment {
        match parameter.ty {
            TypeDescriptor::Scalar { ty, .. } => {
                self.scalar(parameter, usize::from(ty.width_bytes()), offset)
            }
            TypeDescriptor::Pointer { .. } => self.pointer(parameter, offset),
        }
    }

    fn scalar(
        &self,
        parameter: &ParameterDescriptor,
        width: usize,
        offset: &ByteCount,
    ) -> DecodeFragment {
        let local = Ident::indexed(SCALAR_LOCAL, self.case, parameter.position);
        let ty = parameter.ty.local_c_type();
        let required = offset.plus_bytes(width.max(MIN_SCALAR_GUARD));
        let statements = vec![
            Stmt::bail_if(Expr::lt(size(), signed(&required))),
            Stmt::decl(ty.clone(), &local, None),
            Stmt::Expr(Expr::call(
                "memcpy",
                vec![
                    Expr::addr_of(Expr::ident(&local)),
                    data_at(offset),
                    Expr::SizeOf(ty),
                ],
            )),
        ];
        DecodeFragment {
            statements,
            argument: Expr::ident(&local),
            cleanup: None,
            buffer: None,
            consumed: ByteCount::bytes(width),
        }
    }

    fn pointer(&self, parameter: &ParameterDescriptor, offset: &ByteCount) -> DecodeFragment {
        let len = Ident::indexed(LENGTH_LOCAL, self.case, parameter.position);
        let buf = Ident::indexed(BUFFER_LOCAL, self.case, parameter.position);
        let payload = offset.plus_bytes(LENGTH_PREFIX_BYTES);
        let statements = vec![
            Stmt::bail_if(Expr::lt(size(), signed(&payload))),
            Stmt::decl(CType::UnsignedInt, &len, None),
            Stmt::Expr(Expr::call(
                "memcpy",
                vec![
                    Expr::addr_of(Expr::ident(&len)),
                    data_at(offset),
                    Expr::SizeOf(CType::UnsignedInt),
                ],
            )),
            Stmt::bail_if(Expr::gt(
                Expr::ident(&len),
                Expr::cast(CType::UnsignedInt, Expr::sub(size(), payload.to_expr())),
            )),
            Stmt::decl(
                CType::pointer_to(CType::Char),
                &buf,
                Some(Expr::call(
                    "malloc",
                    vec![Expr::add(Expr::ident(&len), Expr::Int(1))],
                )),
            ),
            Stmt::bail_if(Expr::eq(Expr::ident(&buf), Expr::Null)),
            Stmt::Expr(Expr::call(
                "memcpy",
                vec![Expr::ident(&buf), data_at(&payload), Expr::ident(&len)],
            )),
            Stmt::assign(
                Expr::index(Expr::ident(&buf), Expr::ident(&len)),
                Expr::Int(0),
            ),
        ];

        let declared = parameter.ty.c_type();
        let argument = if declared == CType::pointer_to(CType::Char) {
            Expr::ident(&buf)
        } else {
            Expr::cast(declared, Expr::ident(&buf))
        };

        DecodeFragment {
            statements,
            argument,
            cleanup: Some(Stmt::Expr(Expr::call("free", vec![Expr::ident(&buf)]))),
            buffer: Some(buf),
            consumed: ByteCount::length_prefixed(LENGTH_PREFIX_BYTES, &len),
        }
    }
}

fn size() -> Expr {
    Expr::named(SIZE)
}

/// `count` as an `int` operand for comparing against `Size`. Runtime
/// counts add `unsigned int` lengths, so they are cast back; an earlier
/// guard has already bounded them by `Size`.
fn signed(count: &ByteCount) -> Expr {
    match count.constant() {
        Some(_) => count.to_expr(),
        None => Expr::cast(CType::Int, count.to_expr()),
    }
}

/// `Data + offset`, or plain `Data` at offset zero.
fn data_at(offset: &ByteCount) -> Expr {
    match offset.constant() {
        Some(0) => Expr::named(DATA),
        _ => Expr::add(Expr::named(DATA), offset.to_expr()),
    }
}
