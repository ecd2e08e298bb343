#![warn(clippy::pedantic)]

pub mod ast;
pub mod ctype;
pub mod error;
pub mod ident;
pub mod printer;

pub use ast::{
    AssignOp, BAIL_SENTINEL, BinOp, Expr, Function, Item, Param, Stmt, SwitchArm,
    TranslationUnit, UnaryOp,
};
pub use ctype::CType;
pub use error::IrError;
pub use ident::Ident;
pub use printer::{render, render_expr, render_stmts};
