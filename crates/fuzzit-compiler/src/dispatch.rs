use fuzzit_ir::{BAIL_SENTINEL, BinOp, CType, Expr, Function, Ident, Param, Stmt, SwitchArm};
use tracing::debug;

use crate::byte_count::ByteCount;
use crate::decoder::ArgumentDecoder;
use crate::error::CompileError;
use crate::harness::BoundFunction;
use crate::naming::{CHOICE, DATA, DISPATCH, SIZE};

/// One arm of the dispatch switch: decode, call, free, report.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchCase {
    pub index: usize,
    /// Decoding statements for every parameter, in position order.
    pub statements: Vec<Stmt>,
    /// The call through the function handle.
    pub call: Expr,
    /// Frees for every buffer, in allocation order.
    pub cleanup: Vec<Stmt>,
    /// Total input the case consumes when it completes.
    pub consumed: ByteCount,
}

impl DispatchCase {
    /// Full arm body, ending in `return <consumed>;`.
    pub fn body(&self) -> Vec<Stmt> {
        let mut body = self.statements.clone();
        body.push(Stmt::Expr(self.call.clone()));
        body.extend(self.cleanup.iter().cloned());
        body.push(Stmt::ret(self.consumed.to_expr()));
        body
    }
}

/// Turns bound functions into dispatch cases and the `Dispatch` routine
/// that selects among them.
///
/// The routine has the shape:
///
/// ```c
/// static int Dispatch(uint8_t choice, const uint8_t *Data, int Size)
/// {
///     switch (choice % N) {
///     case 0: { ... return <consumed>; }
///     ...
///     }
///     return -1;
/// }
/// ```
///
/// A case returns the bytes it consumed, or -1 when a guard failed.
pub struct DispatchCompiler;

impl DispatchCompiler {
    /// Compile every function; case `i` belongs to `functions[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::NoFunctions`] if `functions` is empty.
    pub fn compile(functions: &[BoundFunction]) -> Result<Vec<DispatchCase>, CompileError> {
        if functions.is_empty() {
            return Err(CompileError::NoFunctions);
        }
        Ok(functions
            .iter()
            .enumerate()
            .map(|(index, function)| Self::compile_case(index, function))
            .collect())
    }

    pub fn compile_case(index: usize, function: &BoundFunction) -> DispatchCase {
        let decoder = ArgumentDecoder::for_case(index);
        let mut offset = ByteCount::zero();
        let mut live: Vec<Ident> = Vec::new();
        let mut statements = Vec::new();
        let mut arguments = Vec::new();
        let mut cleanup = Vec::new();

        for parameter in &function.signature.parameters {
            let mut fragment = decoder.decode(parameter, &offset);
            release_on_bail(&mut fragment.statements, &live);
            statements.extend(fragment.statements);
            arguments.push(fragment.argument);
            cleanup.extend(fragment.cleanup);
            live.extend(fragment.buffer);
            offset = offset.plus(&fragment.consumed);
        }

        debug!(
            case = index,
            function = %function.signature.name,
            consumed = %offset,
            "compiled dispatch case"
        );

        DispatchCase {
            index,
            statements,
            call: Expr::call_ident(&function.handle, arguments),
            cleanup,
            consumed: offset,
        }
    }

    /// Lower compiled cases into the `Dispatch` function.
    pub fn dispatch_function(cases: &[DispatchCase]) -> Function {
        let arms = cases
            .iter()
            .map(|case| SwitchArm {
                label: i64::try_from(case.index).unwrap_or(i64::MAX),
                body: case.body(),
            })
            .collect();
        Function {
            ret: CType::Int,
            name: Ident::sanitize(DISPATCH),
            params: vec![
                Param::new(CType::Uint8, Ident::sanitize(CHOICE)),
                Param::new(
                    CType::pointer_to(CType::constant(CType::Uint8)),
                    Ident::sanitize(DATA),
                ),
                Param::new(CType::Int, Ident::sanitize(SIZE)),
            ],
            body: vec![
                Stmt::Switch {
                    scrutinee: Expr::binary(
                        BinOp::Rem,
                        Expr::named(CHOICE),
                        Expr::int(cases.len()),
                    ),
                    arms,
                },
                Stmt::ret(Expr::Int(BAIL_SENTINEL)),
            ],
            is_static: true,
        }
    }
}

/// Point every bail in `stmts` at the buffers allocated before it.
fn release_on_bail(stmts: &mut [Stmt], live: &[Ident]) {
    for stmt in stmts {
        match stmt {
            Stmt::Bail { release } => *release = live.to_vec(),
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                release_on_bail(then_body, live);
                release_on_bail(else_body, live);
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => release_on_bail(body, live),
            Stmt::Switch { arms, .. } => {
                for arm in arms {
                    release_on_bail(&mut arm.body, live);
                }
            }
            _ => {}
        }
    }
}
