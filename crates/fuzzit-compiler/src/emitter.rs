use fuzzit_ir::{BinOp, CType, Expr, Function, Ident, Item, Param, Stmt, TranslationUnit};

use crate::config::{InputSource, LoopStyle};
use crate::dispatch::{DispatchCase, DispatchCompiler};
use crate::harness::HarnessSpec;
use crate::naming::{
    AVAILABLE, BUF, BUF_SIZE, CHOICE, CLOSE_LIBRARY, CONSUMED, COUNT, DATA, DISPATCH, INPUT,
    INPUT_OFFSET, INPUT_SIZE, IS_LOADED, LOAD_LIBRARY, READ_CHUNK, REMAINING, RESOLVE_SYMBOLS,
    SIZE,
};

/// Headers every harness includes.
pub const INCLUDES: [&str; 6] = [
    "stdio.h", "stdlib.h", "stdint.h", "string.h", "dlfcn.h", "unistd.h",
];

/// Value the entry point returns when the library cannot be loaded.
pub const LOAD_FAILURE: i64 = -1;

/// Bytes taken from the chunk to pick a dispatch case.
pub const SELECTOR_BYTES: usize = 1;

/// Assembles a complete harness translation unit.
///
/// ```text
///   #include ...                  fixed header set
///   static int isLoaded = 0;      load-once flag
///   static void *<lib> = NULL;    library handle
///   typedef ... (*fp_f_t)(...);   one per function
///   static fp_f_t fp_f = NULL;    one per function
///   CloseLibrary                  dlclose at exit
///   LoadLibrary                   dlopen + atexit
///   ResolveSymbols                dlsym every function
///   ReadChunk                     libFuzzer input only
///   Dispatch                      selector → case
///   entry point                   read/drain loop
/// ```
pub struct HarnessEmitter;

impl HarnessEmitter {
    pub fn emit(spec: &HarnessSpec, cases: &[DispatchCase]) -> TranslationUnit {
        let mut items = vec![Item::Comment(format!(
            "fuzzing harness for {}: {} dispatch case(s)",
            spec.library(),
            spec.case_count()
        ))];
        items.extend(INCLUDES.iter().map(|h| Item::Include((*h).to_string())));
        items.push(Item::Global {
            ty: CType::Int,
            name: ident(IS_LOADED),
            init: Some(Expr::Int(0)),
            is_static: true,
        });
        items.push(Item::Global {
            ty: CType::pointer_to(CType::Void),
            name: spec.library_handle().clone(),
            init: Some(Expr::Null),
            is_static: true,
        });
        items.extend(spec.functions().iter().map(|f| f.typedef_item()));
        items.extend(spec.functions().iter().map(|f| f.handle_item()));
        items.push(Item::Function(close_library(spec)));
        items.push(Item::Function(load_library(spec)));
        items.push(Item::Function(resolve_symbols(spec)));
        if spec.config().input_source == InputSource::LibFuzzer {
            items.push(Item::Function(read_chunk()));
        }
        items.push(Item::Function(DispatchCompiler::dispatch_function(cases)));
        items.push(Item::Function(entry_point(spec)));
        TranslationUnit { items }
    }
}

fn ident(name: &str) -> Ident {
    Ident::sanitize(name)
}

fn var(name: &str) -> Expr {
    Expr::named(name)
}

fn helper(name: &str, ret: CType, body: Vec<Stmt>) -> Function {
    Function {
        ret,
        name: ident(name),
        params: Vec::new(),
        body,
        is_static: true,
    }
}

fn loaded_message(what: &str, address: Expr) -> Stmt {
    Stmt::Expr(Expr::call(
        "printf",
        vec![Expr::str("loaded %s at %p\n"), Expr::str(what), address],
    ))
}

fn close_library(spec: &HarnessSpec) -> Function {
    let lib = Expr::ident(spec.library_handle());
    helper(
        CLOSE_LIBRARY,
        CType::Void,
        vec![Stmt::when(
            Expr::binary(BinOp::Ne, lib.clone(), Expr::Null),
            vec![
                Stmt::Expr(Expr::call("dlclose", vec![lib.clone()])),
                Stmt::assign(lib, Expr::Null),
            ],
        )],
    )
}

fn load_library(spec: &HarnessSpec) -> Function {
    let lib = Expr::ident(spec.library_handle());
    helper(
        LOAD_LIBRARY,
        CType::Int,
        vec![
            Stmt::assign(
                lib.clone(),
                Expr::call(
                    "dlopen",
                    vec![
                        Expr::str(spec.library()),
                        Expr::binary(BinOp::BitOr, var("RTLD_NOW"), var("RTLD_GLOBAL")),
                    ],
                ),
            ),
            Stmt::when(
                Expr::eq(lib.clone(), Expr::Null),
                vec![
                    Stmt::Expr(Expr::call(
                        "fprintf",
                        vec![
                            var("stderr"),
                            Expr::str("%s\n"),
                            Expr::call("dlerror", Vec::new()),
                        ],
                    )),
                    Stmt::ret(Expr::Int(0)),
                ],
            ),
            loaded_message(spec.library(), lib),
            Stmt::Expr(Expr::call("atexit", vec![var(CLOSE_LIBRARY)])),
            Stmt::ret(Expr::Int(1)),
        ],
    )
}

fn resolve_symbols(spec: &HarnessSpec) -> Function {
    let lib = Expr::ident(spec.library_handle());
    let mut body = Vec::new();
    for function in spec.functions() {
        let handle = Expr::ident(&function.handle);
        body.push(Stmt::assign(
            handle.clone(),
            Expr::cast(
                CType::Named(function.typedef.clone()),
                Expr::call(
                    "dlsym",
                    vec![lib.clone(), Expr::str(function.signature.name.as_str())],
                ),
            ),
        ));
        body.push(loaded_message(
            &function.signature.name,
            Expr::cast(CType::pointer_to(CType::Void), handle),
        ));
    }
    helper(RESOLVE_SYMBOLS, CType::Void, body)
}

/// Copies the next `BufSize` bytes (or fewer) of the libFuzzer input.
fn read_chunk() -> Function {
    let offset = Expr::deref(var(INPUT_OFFSET));
    Function {
        ret: CType::Int,
        name: ident(READ_CHUNK),
        params: vec![
            Param::new(CType::pointer_to(CType::Uint8), ident(BUF)),
            Param::new(CType::Int, ident(BUF_SIZE)),
            Param::new(CType::pointer_to(CType::constant(CType::Uint8)), ident(INPUT)),
            Param::new(CType::SizeT, ident(INPUT_SIZE)),
            Param::new(CType::pointer_to(CType::SizeT), ident(INPUT_OFFSET)),
        ],
        body: vec![
            Stmt::decl(
                CType::SizeT,
                &ident(REMAINING),
                Some(Expr::sub(var(INPUT_SIZE), offset.clone())),
            ),
            Stmt::decl(CType::Int, &ident(COUNT), Some(var(BUF_SIZE))),
            Stmt::when(
                Expr::lt(var(REMAINING), Expr::cast(CType::SizeT, var(BUF_SIZE))),
                vec![Stmt::assign(
                    var(COUNT),
                    Expr::cast(CType::Int, var(REMAINING)),
                )],
            ),
            Stmt::when(
                Expr::gt(var(COUNT), Expr::Int(0)),
                vec![Stmt::Expr(Expr::call(
                    "memcpy",
                    vec![
                        var(BUF),
                        Expr::add(var(INPUT), offset.clone()),
                        var(COUNT),
                    ],
                ))],
            ),
            Stmt::add_assign(offset, var(COUNT)),
            Stmt::ret(var(COUNT)),
        ],
        is_static: true,
    }
}

fn entry_point(spec: &HarnessSpec) -> Function {
    let config = spec.config();
    let capacity = config.buffer_capacity;

    let mut body = vec![
        Stmt::decl(
            CType::Array(Box::new(CType::Uint8), capacity),
            &ident(BUF),
            None,
        ),
        Stmt::decl(
            CType::pointer_to(CType::constant(CType::Uint8)),
            &ident(DATA),
            Some(Expr::Null),
        ),
        Stmt::decl(CType::Int, &ident(SIZE), Some(Expr::Int(0))),
        Stmt::decl(CType::Int, &ident(AVAILABLE), Some(Expr::Int(0))),
    ];

    let (name, params) = match config.input_source {
        InputSource::LibFuzzer => {
            body.push(Stmt::decl(
                CType::SizeT,
                &ident(INPUT_OFFSET),
                Some(Expr::Int(0)),
            ));
            (
                "LLVMFuzzerTestOneInput",
                vec![
                    Param::new(CType::pointer_to(CType::constant(CType::Uint8)), ident(INPUT)),
                    Param::new(CType::SizeT, ident(INPUT_SIZE)),
                ],
            )
        }
        InputSource::Stdin => {
            body.push(Stmt::Expr(Expr::cast(CType::Void, var("argc"))));
            body.push(Stmt::Expr(Expr::cast(CType::Void, var("argv"))));
            (
                "main",
                vec![
                    Param::new(CType::Int, ident("argc")),
                    Param::new(CType::pointer_to(CType::pointer_to(CType::Char)), ident("argv")),
                ],
            )
        }
    };

    body.push(load_once(spec));
    body.extend(read_loop(spec));
    body.push(Stmt::ret(Expr::Int(0)));

    Function {
        ret: CType::Int,
        name: ident(name),
        params,
        body,
        is_static: false,
    }
}

/// Load the library and resolve symbols on the first invocation only.
fn load_once(spec: &HarnessSpec) -> Stmt {
    Stmt::when(
        Expr::not(var(IS_LOADED)),
        vec![
            Stmt::when(
                Expr::not(Expr::call(LOAD_LIBRARY, Vec::new())),
                vec![
                    Stmt::Expr(Expr::call(
                        "printf",
                        vec![Expr::str("could not load %s\n"), Expr::str(spec.library())],
                    )),
                    Stmt::ret(Expr::Int(LOAD_FAILURE)),
                ],
            ),
            Stmt::Expr(Expr::call(RESOLVE_SYMBOLS, Vec::new())),
            Stmt::assign(var(IS_LOADED), Expr::Int(1)),
        ],
    )
}

fn read_call(spec: &HarnessSpec) -> Expr {
    let capacity = Expr::int(spec.config().buffer_capacity);
    match spec.config().input_source {
        InputSource::LibFuzzer => Expr::call(
            READ_CHUNK,
            vec![
                var(BUF),
                capacity,
                var(INPUT),
                var(INPUT_SIZE),
                Expr::addr_of(var(INPUT_OFFSET)),
            ],
        ),
        InputSource::Stdin => Expr::cast(
            CType::Int,
            Expr::call("read", vec![Expr::Int(0), var(BUF), capacity]),
        ),
    }
}

fn clear_buffer(spec: &HarnessSpec) -> Stmt {
    Stmt::Expr(Expr::call(
        "memset",
        vec![
            var(BUF),
            Expr::Int(0),
            Expr::int(spec.config().buffer_capacity),
        ],
    ))
}

fn read_loop(spec: &HarnessSpec) -> Vec<Stmt> {
    match spec.config().loop_style {
        LoopStyle::DoWhile => {
            let mut body = vec![
                clear_buffer(spec),
                Stmt::assign(var(AVAILABLE), read_call(spec)),
                Stmt::when(
                    Expr::binary(BinOp::Le, var(AVAILABLE), Expr::Int(0)),
                    vec![Stmt::Break],
                ),
            ];
            body.extend(drain_chunk());
            vec![Stmt::DoWhile {
                body,
                cond: Expr::gt(var(AVAILABLE), Expr::Int(0)),
            }]
        }
        LoopStyle::While => {
            let mut body = drain_chunk();
            body.push(clear_buffer(spec));
            vec![
                clear_buffer(spec),
                Stmt::While {
                    cond: Expr::gt(
                        Expr::assign(var(AVAILABLE), read_call(spec)),
                        Expr::Int(0),
                    ),
                    body,
                },
            ]
        }
    }
}

/// Turn one chunk into as many calls as it can pay for.
///
/// Each iteration takes a selector byte and hands the rest to `Dispatch`.
/// A negative result means the chosen case could not be satisfied; the
/// rest of the chunk is dropped.
fn drain_chunk() -> Vec<Stmt> {
    let selector = SELECTOR_BYTES;
    vec![
        Stmt::assign(
            var(DATA),
            Expr::addr_of(Expr::index(var(BUF), Expr::Int(0))),
        ),
        Stmt::assign(var(SIZE), var(AVAILABLE)),
        Stmt::While {
            cond: Expr::binary(BinOp::Ge, var(SIZE), Expr::int(selector)),
            body: vec![
                Stmt::decl(
                    CType::Uint8,
                    &ident(CHOICE),
                    Some(Expr::index(var(DATA), Expr::Int(0))),
                ),
                Stmt::decl(CType::Int, &ident(CONSUMED), None),
                Stmt::add_assign(var(DATA), Expr::int(selector)),
                Stmt::sub_assign(var(SIZE), Expr::int(selector)),
                Stmt::assign(
                    var(CONSUMED),
                    Expr::call(DISPATCH, vec![var(CHOICE), var(DATA), var(SIZE)]),
                ),
                Stmt::when(Expr::lt(var(CONSUMED), Expr::Int(0)), vec![Stmt::Break]),
                Stmt::add_assign(var(DATA), var(CONSUMED)),
                Stmt::sub_assign(var(SIZE), var(CONSUMED)),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use fuzzit_ir::render;
    use fuzzit_types::{FunctionSignature, ScalarType, TypeDescriptor};

    use super::*;
    use crate::config::HarnessConfig;

    fn int() -> TypeDescriptor {
        TypeDescriptor::Scalar {
            ty: ScalarType::Int,
            is_const: false,
        }
    }

    fn spec(config: HarnessConfig) -> HarnessSpec {
        HarnessSpec::new(
            "libdemo.so",
            vec![FunctionSignature::new("beep", int(), [int()])],
            config,
        )
        .unwrap()
    }

    fn emit(config: HarnessConfig) -> String {
        let spec = spec(config);
        let cases = DispatchCompiler::compile(spec.functions()).unwrap();
        render(&HarnessEmitter::emit(&spec, &cases))
    }

    #[test]
    fn includes_and_globals() {
        let text = emit(HarnessConfig::default());
        assert!(text.starts_with(
            "/* fuzzing harness for libdemo.so: 1 dispatch case(s) */\n\
             #include <stdio.h>\n\
             #include <stdlib.h>\n\
             #include <stdint.h>\n\
             #include <string.h>\n\
             #include <dlfcn.h>\n\
             #include <unistd.h>\n\
             \n\
             static int isLoaded = 0;\n\
             static void *libdemo = NULL;\n\
             \n\
             typedef int (*fp_beep_t)(int);\n\
             \n\
             static fp_beep_t fp_beep = NULL;\n"
        ));
    }

    #[test]
    fn library_name_cannot_break_out_of_header_comment() {
        let spec = HarnessSpec::new(
            "lib*/x.so",
            vec![FunctionSignature::new("beep", int(), [int()])],
            HarnessConfig::default(),
        )
        .unwrap();
        let cases = DispatchCompiler::compile(spec.functions()).unwrap();
        let text = render(&HarnessEmitter::emit(&spec, &cases));
        let header = text.lines().next().unwrap_or_default();
        assert_eq!(header, "/* fuzzing harness for lib* /x.so: 1 dispatch case(s) */");
        assert!(text.contains("dlopen(\"lib*/x.so\", RTLD_NOW | RTLD_GLOBAL)"));
        assert!(text.contains("static void *lib__x = NULL;\n"));
    }

    #[test]
    fn load_library_body() {
        let text = emit(HarnessConfig::default());
        assert!(text.contains(
            "static int LoadLibrary(void)\n\
             {\n    \
                 libdemo = dlopen(\"libdemo.so\", RTLD_NOW | RTLD_GLOBAL);\n    \
                 if (libdemo == NULL) {\n        \
                     fprintf(stderr, \"%s\\n\", dlerror());\n        \
                     return 0;\n    \
                 }\n    \
                 printf(\"loaded %s at %p\\n\", \"libdemo.so\", libdemo);\n    \
                 atexit(CloseLibrary);\n    \
                 return 1;\n\
             }\n"
        ));
    }

    #[test]
    fn resolve_uses_symbol_name() {
        let text = emit(HarnessConfig::default());
        assert!(text.contains("    fp_beep = (fp_beep_t)dlsym(libdemo, \"beep\");\n"));
        assert!(text.contains("    printf(\"loaded %s at %p\\n\", \"beep\", (void *)fp_beep);\n"));
    }

    #[test]
    fn libfuzzer_entry_point() {
        let text = emit(HarnessConfig::default());
        assert!(text.contains("int LLVMFuzzerTestOneInput(const uint8_t *Input, size_t InputSize)\n{\n"));
        assert!(text.contains("static int ReadChunk(uint8_t *Buf, int BufSize, const uint8_t *Input, size_t InputSize, size_t *InputOffset)\n"));
        assert!(text.contains("        Available = ReadChunk(Buf, 512, Input, InputSize, &InputOffset);\n"));
        assert!(text.contains("    } while (Available > 0);\n"));
        assert!(text.ends_with("    return 0;\n}\n"));
    }

    #[test]
    fn stdin_while_entry_point() {
        let text = emit(HarnessConfig {
            buffer_capacity: 64,
            loop_style: LoopStyle::While,
            input_source: InputSource::Stdin,
        });
        assert!(text.contains("int main(int argc, char **argv)\n{\n    uint8_t Buf[64];\n"));
        assert!(text.contains("    (void)argc;\n    (void)argv;\n"));
        assert!(text.contains("    while ((Available = (int)read(0, Buf, 64)) > 0) {\n"));
        assert!(!text.contains("ReadChunk"));
    }

    #[test]
    fn load_failure_returns_minus_one() {
        let text = emit(HarnessConfig::default());
        assert!(text.contains(
            "    if (!isLoaded) {\n        \
                 if (!LoadLibrary()) {\n            \
                     printf(\"could not load %s\\n\", \"libdemo.so\");\n            \
                     return -1;\n        \
                 }\n        \
                 ResolveSymbols();\n        \
                 isLoaded = 1;\n    \
             }\n"
        ));
    }

    #[test]
    fn drain_loop_shape() {
        let text = emit(HarnessConfig::default());
        assert!(text.contains(
            "        while (Size >= 1) {\n            \
                 uint8_t choice = Data[0];\n            \
                 int Consumed;\n            \
                 Data += 1;\n            \
                 Size -= 1;\n            \
                 Consumed = Dispatch(choice, Data, Size);\n            \
                 if (Consumed < 0) {\n                \
                     break;\n            \
                 }\n            \
                 Data += Consumed;\n            \
                 Size -= Consumed;\n        \
             }\n"
        ));
    }
}
