use crate::ctype::CType;
use crate::ident::Ident;

/// Value a dispatch case returns when its guards reject the input.
///
/// The drain loop treats any negative return as "insufficient input" and
/// stops consuming the current chunk.
pub const BAIL_SENTINEL: i64 = -1;

/// A whole generated C file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

impl TranslationUnit {
    /// Find a function definition by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name.as_str() == name => Some(f),
            _ => None,
        })
    }
}

/// Top-level declarations.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// `#include <header>`
    Include(String),
    /// `typedef ret (*name)(params);`
    FnPtrTypedef {
        name: Ident,
        ret: CType,
        params: Vec<CType>,
    },
    /// A file-scope variable, optionally `static`.
    Global {
        ty: CType,
        name: Ident,
        init: Option<Expr>,
        is_static: bool,
    },
    Function(Function),
    /// `/* text */` on its own line.
    Comment(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub ret: CType,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: CType,
    pub name: Ident,
}

impl Param {
    pub fn new(ty: CType, name: Ident) -> Self {
        Self { ty, name }
    }
}

/// Statements.
///
/// `Bail` is the one harness-specific statement: it abandons the current
/// dispatch case, releasing the listed buffers first, and returns
/// [`BAIL_SENTINEL`]. Keeping it explicit lets the dispatch compiler fill
/// in the buffers that are live at each guard.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Decl {
        ty: CType,
        name: Ident,
        init: Option<Expr>,
    },
    Expr(Expr),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    Switch {
        scrutinee: Expr,
        arms: Vec<SwitchArm>,
    },
    Return(Option<Expr>),
    Break,
    Bail {
        release: Vec<Ident>,
    },
    Comment(String),
}

impl Stmt {
    pub fn decl(ty: CType, name: &Ident, init: Option<Expr>) -> Self {
        Self::Decl {
            ty,
            name: name.clone(),
            init,
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target,
            op: AssignOp::Set,
            value,
        }
    }

    pub fn add_assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target,
            op: AssignOp::Add,
            value,
        }
    }

    pub fn sub_assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target,
            op: AssignOp::Sub,
            value,
        }
    }

    /// `if (cond) { then_body }` with no else branch.
    pub fn when(cond: Expr, then_body: Vec<Stmt>) -> Self {
        Self::If {
            cond,
            then_body,
            else_body: Vec::new(),
        }
    }

    /// Guard that bails out of the current case when `cond` holds.
    pub fn bail_if(cond: Expr) -> Self {
        Self::when(cond, vec![Self::Bail { release: Vec::new() }])
    }

    pub fn ret(value: Expr) -> Self {
        Self::Return(Some(value))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchArm {
    pub label: i64,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitOr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Rem => "%",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitOr => "|",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    AddrOf,
    Deref,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::AddrOf => "&",
            Self::Deref => "*",
        }
    }
}

/// Expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Int(i64),
    /// String literal; escaping is the printer's job.
    Str(String),
    Null,
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Cast {
        ty: CType,
        expr: Box<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    SizeOf(CType),
    /// Assignment used as a value, as in `(n = read(...)) > 0`.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn ident(name: &Ident) -> Self {
        Self::Ident(name.clone())
    }

    /// Reference a name the harness relies on from libc or its own
    /// scaffolding, e.g. `memcpy` or `RTLD_NOW`.
    pub fn named(name: &str) -> Self {
        Self::Ident(Ident::sanitize(name))
    }

    pub fn int(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Sub, lhs, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Lt, lhs, rhs)
    }

    pub fn gt(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Gt, lhs, rhs)
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Self::Call {
            callee: Box::new(Self::named(callee)),
            args,
        }
    }

    pub fn call_ident(callee: &Ident, args: Vec<Expr>) -> Self {
        Self::Call {
            callee: Box::new(Self::ident(callee)),
            args,
        }
    }

    pub fn cast(ty: CType, expr: Expr) -> Self {
        Self::Cast {
            ty,
            expr: Box::new(expr),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn addr_of(expr: Expr) -> Self {
        Self::unary(UnaryOp::AddrOf, expr)
    }

    pub fn not(expr: Expr) -> Self {
        Self::unary(UnaryOp::Not, expr)
    }

    pub fn deref(expr: Expr) -> Self {
        Self::unary(UnaryOp::Deref, expr)
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Expressions that never need parentheses as an operand.
    pub(crate) fn is_atom(&self) -> bool {
        matches!(
            self,
            Self::Ident(_)
                | Self::Int(_)
                | Self::Str(_)
                | Self::Null
                | Self::Call { .. }
                | Self::Index { .. }
                | Self::SizeOf(_)
        )
    }
}
