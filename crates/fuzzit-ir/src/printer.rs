use std::fmt::Write as _;

use crate::ast::{BAIL_SENTINEL, Expr, Function, Item, Stmt, TranslationUnit};
use crate::ctype::CType;

const INDENT: &str = "    ";

/// Pretty-print a translation unit as C source.
///
/// Layout is fixed so that generated harnesses diff cleanly:
///
/// ```text
/// #include <stdio.h>          ← consecutive includes, no gaps
/// #include <dlfcn.h>
///                             ← blank line between item groups
/// static int isLoaded = 0;    ← consecutive globals, no gaps
///
/// typedef int (*fp_beep_t)(int); ← consecutive typedefs, no gaps
///
/// static void CloseLibrary(void)
/// {                           ← function braces on their own line,
///     if (h != NULL) {        ← statement braces K&R style
///     }
/// }
/// ```
///
/// The output always ends with a single newline.
pub fn render(unit: &TranslationUnit) -> String {
    let mut out = String::new();
    let mut previous: Option<&Item> = None;
    for item in &unit.items {
        if let Some(prev) = previous {
            if needs_gap(prev, item) {
                out.push('\n');
            }
        }
        render_item(&mut out, item);
        previous = Some(item);
    }
    out
}

/// Render a statement list at the given indentation depth.
///
/// Exposed so individual fragments can be inspected in tests without
/// wrapping them in a function.
pub fn render_stmts(stmts: &[Stmt], depth: usize) -> String {
    let mut out = String::new();
    for stmt in stmts {
        render_stmt(&mut out, stmt, depth);
    }
    out
}

/// Render a single expression.
pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.to_string(),
        Expr::Int(value) => value.to_string(),
        Expr::Str(value) => quote(value),
        Expr::Null => "NULL".to_string(),
        Expr::Unary { op, expr } => format!("{}{}", op.symbol(), operand(expr)),
        Expr::Binary { op, lhs, rhs } => {
            format!("{} {} {}", binary_operand(lhs), op.symbol(), binary_operand(rhs))
        }
        Expr::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(render_expr).collect();
            format!("{}({})", operand(callee), args.join(", "))
        }
        Expr::Cast { ty, expr } => format!("({}){}", ty.spelling(), cast_operand(expr)),
        Expr::Index { base, index } => format!("{}[{}]", operand(base), render_expr(index)),
        Expr::SizeOf(ty) => format!("sizeof({})", ty.spelling()),
        Expr::Assign { target, value } => {
            format!("{} = {}", render_expr(target), render_expr(value))
        }
    }
}

fn needs_gap(prev: &Item, next: &Item) -> bool {
    match (prev, next) {
        (Item::Comment(_), _)
        | (Item::Include(_), Item::Include(_))
        | (Item::FnPtrTypedef { .. }, Item::FnPtrTypedef { .. })
        | (Item::Global { .. }, Item::Global { .. }) => false,
        _ => true,
    }
}

fn render_item(out: &mut String, item: &Item) {
    match item {
        Item::Include(header) => {
            let _ = writeln!(out, "#include <{header}>");
        }
        Item::FnPtrTypedef { name, ret, params } => {
            let ret = ret.spelling();
            let gap = if ret.ends_with('*') { "" } else { " " };
            let _ = writeln!(out, "typedef {ret}{gap}(*{name})({});", param_list(params));
        }
        Item::Global {
            ty,
            name,
            init,
            is_static,
        } => {
            let storage = if *is_static { "static " } else { "" };
            match init {
                Some(init) => {
                    let _ = writeln!(out, "{storage}{} = {};", ty.declare(name), render_expr(init));
                }
                None => {
                    let _ = writeln!(out, "{storage}{};", ty.declare(name));
                }
            }
        }
        Item::Function(function) => render_function(out, function),
        Item::Comment(text) => {
            let _ = writeln!(out, "/* {} */", comment_body(text));
        }
    }
}

fn render_function(out: &mut String, function: &Function) {
    let storage = if function.is_static { "static " } else { "" };
    let params = if function.params.is_empty() {
        "void".to_string()
    } else {
        function
            .params
            .iter()
            .map(|p| p.ty.declare(&p.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(
        out,
        "{storage}{}({params})",
        function.ret.declare(&function.name)
    );
    out.push_str("{\n");
    out.push_str(&render_stmts(&function.body, 1));
    out.push_str("}\n");
}

fn param_list(params: &[CType]) -> String {
    if params.is_empty() {
        "void".to_string()
    } else {
        params.iter().map(CType::spelling).collect::<Vec<_>>().join(", ")
    }
}

fn render_block(out: &mut String, body: &[Stmt], depth: usize) {
    for stmt in body {
        render_stmt(out, stmt, depth);
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Decl { ty, name, init } => match init {
            Some(init) => {
                let _ = writeln!(out, "{pad}{} = {};", ty.declare(name), render_expr(init));
            }
            None => {
                let _ = writeln!(out, "{pad}{};", ty.declare(name));
            }
        },
        Stmt::Expr(expr) => {
            let _ = writeln!(out, "{pad}{};", render_expr(expr));
        }
        Stmt::Assign { target, op, value } => {
            let _ = writeln!(
                out,
                "{pad}{} {} {};",
                render_expr(target),
                op.symbol(),
                render_expr(value)
            );
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            let _ = writeln!(out, "{pad}if ({}) {{", render_expr(cond));
            render_block(out, then_body, depth + 1);
            if else_body.is_empty() {
                let _ = writeln!(out, "{pad}}}");
            } else {
                let _ = writeln!(out, "{pad}}} else {{");
                render_block(out, else_body, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
        }
        Stmt::While { cond, body } => {
            let _ = writeln!(out, "{pad}while ({}) {{", render_expr(cond));
            render_block(out, body, depth + 1);
            let _ = writeln!(out, "{pad}}}");
        }
        Stmt::DoWhile { body, cond } => {
            let _ = writeln!(out, "{pad}do {{");
            render_block(out, body, depth + 1);
            let _ = writeln!(out, "{pad}}} while ({});", render_expr(cond));
        }
        Stmt::Switch { scrutinee, arms } => {
            let _ = writeln!(out, "{pad}switch ({}) {{", render_expr(scrutinee));
            for arm in arms {
                let _ = writeln!(out, "{pad}case {}: {{", arm.label);
                render_block(out, &arm.body, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Stmt::Return(None) => {
            let _ = writeln!(out, "{pad}return;");
        }
        Stmt::Return(Some(value)) => {
            let _ = writeln!(out, "{pad}return {};", render_expr(value));
        }
        Stmt::Break => {
            let _ = writeln!(out, "{pad}break;");
        }
        Stmt::Bail { release } => {
            for buffer in release {
                let _ = writeln!(out, "{pad}free({buffer});");
            }
            let _ = writeln!(out, "{pad}return {BAIL_SENTINEL};");
        }
        Stmt::Comment(text) => {
            let _ = writeln!(out, "{pad}/* {} */", comment_body(text));
        }
    }
}

fn operand(expr: &Expr) -> String {
    if expr.is_atom() {
        render_expr(expr)
    } else {
        format!("({})", render_expr(expr))
    }
}

// Binary operands keep unary and cast forms bare; nested binaries are always
// parenthesised so the printed grouping matches the tree exactly.
fn binary_operand(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assign { .. } => format!("({})", render_expr(expr)),
        _ => render_expr(expr),
    }
}

fn cast_operand(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assign { .. } => format!("({})", render_expr(expr)),
        _ => render_expr(expr),
    }
}

/// Comment text with every delimiter split, so the comment ends only
/// where the printer closes it.
fn comment_body(text: &str) -> String {
    text.replace("*/", "* /").replace("/*", "/ *")
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for byte in value.bytes() {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(char::from(byte)),
            other => {
                let _ = write!(out, "\\{other:03o}");
            }
        }
    }
    out.push('"');
    out
}
