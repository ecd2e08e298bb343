//! A small interpreter for generated harness translation units.
//!
//! The simulator executes the IR the emitter produces, not the printed C,
//! so the properties it checks hold for exactly what `fuzzit_ir::render`
//! prints. libc and the dynamic loader are stubbed:
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────────────────────────┐
//! │ Call               │ Simulated behaviour                              │
//! ├────────────────────┼──────────────────────────────────────────────────┤
//! │ memcpy / memset    │ bounds-checked byte copies                       │
//! │ malloc / free      │ heap regions; double free and leaks are caught   │
//! │ printf / fprintf   │ %s %p %d formatted into `Report::output`         │
//! │ dlopen             │ succeeds unless `SimOptions::fail_load`          │
//! │ dlsym              │ returns a symbol handle for the requested name   │
//! │ dlclose / atexit   │ counted / queued for `Machine::exit`             │
//! │ read(0, ..)        │ serves the stdin bytes given to `run_main`       │
//! │ <resolved symbol>  │ recorded as a `TargetCall`                       │
//! └────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Every pointer carries its region, so reads past a buffer, writes into
//! read-only input, and touches of freed or out-of-scope memory surface as
//! a [`Fault`] instead of silently succeeding.

use std::collections::HashMap;

use fuzzit_ir::{
    AssignOp, BAIL_SENTINEL, BinOp, CType, Expr, Function, Item, Stmt, TranslationUnit, UnaryOp,
};

const DEFAULT_STEP_LIMIT: usize = 2_000_000;
const MAX_ALLOCATION: usize = 1 << 24;
const RTLD_NOW: i64 = 0x2;
const RTLD_GLOBAL: i64 = 0x100;
const STDERR: i64 = 2;
const DLERROR_TEXT: &str = "simulated dlopen failure";

/// A runtime value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Ptr { region: usize, offset: i64 },
    Null,
    /// A harness function designator, e.g. `CloseLibrary` passed to `atexit`.
    Func(String),
    /// A function pointer obtained from `dlsym`.
    Symbol(String),
}

/// One argument as the target function observed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Int(i64),
    /// Bytes of a NUL-terminated buffer, terminator excluded.
    Bytes(Vec<u8>),
    Null,
}

/// A call that reached a resolved library symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetCall {
    pub symbol: String,
    pub args: Vec<Arg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Local,
    Heap,
    Input,
    Literal,
    Library,
}

/// Undefined or unsupported behaviour detected while running a harness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("out-of-bounds access of {len} byte(s) at offset {offset} in a {size}-byte {kind:?} region")]
    OutOfBounds {
        kind: RegionKind,
        offset: i64,
        len: usize,
        size: usize,
    },

    #[error("access to freed or out-of-scope {kind:?} memory")]
    UseAfterFree { kind: RegionKind },

    #[error("double free")]
    DoubleFree,

    #[error("free of a pointer malloc did not return")]
    InvalidFree,

    #[error("write to read-only {kind:?} memory")]
    ReadOnly { kind: RegionKind },

    #[error("null pointer dereference")]
    NullDeref,

    #[error("step limit exceeded")]
    StepLimit,

    #[error("undefined identifier '{0}'")]
    Undefined(String),

    #[error("allocation of {0} bytes refused")]
    HugeAllocation(usize),

    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// Knobs for one simulated process.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Make `dlopen` return NULL.
    pub fail_load: bool,
    /// Let this many `malloc` calls succeed, then return NULL.
    pub malloc_limit: Option<usize>,
    pub step_limit: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            fail_load: false,
            malloc_limit: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// What a simulated process did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Return value of the last entry-point invocation.
    pub status: i64,
    pub calls: Vec<TargetCall>,
    /// Heap regions still allocated at exit.
    pub leaked: usize,
    /// Successful `malloc` calls.
    pub allocations: usize,
    /// Successful `dlopen` calls.
    pub loads: usize,
    pub closes: usize,
    pub output: Vec<String>,
}

/// Run a libFuzzer-style harness once on `input`, then exit.
///
/// # Errors
///
/// Returns the first [`Fault`] the harness triggers.
pub fn run_libfuzzer(unit: &TranslationUnit, input: &[u8]) -> Result<Report, Fault> {
    run_libfuzzer_with(unit, input, SimOptions::default())
}

/// [`run_libfuzzer`] with explicit options.
///
/// # Errors
///
/// Returns the first [`Fault`] the harness triggers.
pub fn run_libfuzzer_with(
    unit: &TranslationUnit,
    input: &[u8],
    options: SimOptions,
) -> Result<Report, Fault> {
    let mut machine = Machine::new(unit, options)?;
    let status = machine.fuzz_one(input)?;
    let mut report = machine.exit()?;
    report.status = status;
    Ok(report)
}

/// Run a stdin-style harness to completion on `stdin`, then exit.
///
/// # Errors
///
/// Returns the first [`Fault`] the harness triggers.
pub fn run_stdin(unit: &TranslationUnit, stdin: &[u8]) -> Result<Report, Fault> {
    run_stdin_with(unit, stdin, SimOptions::default())
}

/// [`run_stdin`] with explicit options.
///
/// # Errors
///
/// Returns the first [`Fault`] the harness triggers.
pub fn run_stdin_with(
    unit: &TranslationUnit,
    stdin: &[u8],
    options: SimOptions,
) -> Result<Report, Fault> {
    let mut machine = Machine::new(unit, options)?;
    let status = machine.run_main(stdin)?;
    let mut report = machine.exit()?;
    report.status = status;
    Ok(report)
}

#[derive(Clone, Debug)]
enum Storage {
    Memory(usize),
    Value(Value),
}

#[derive(Clone, Debug)]
struct Var {
    ty: CType,
    storage: Storage,
}

#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, Var>,
    regions: Vec<usize>,
}

#[derive(Debug)]
struct Region {
    bytes: Vec<u8>,
    kind: RegionKind,
    /// Scalar type when the region backs a scalar variable.
    scalar: Option<CType>,
    live: bool,
}

enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// One simulated process: globals persist across entry-point calls the
/// way they do under libFuzzer.
pub struct Machine<'u> {
    functions: HashMap<&'u str, &'u Function>,
    globals: HashMap<String, Var>,
    frames: Vec<Vec<Scope>>,
    regions: Vec<Region>,
    options: SimOptions,
    steps: usize,
    stdin: Vec<u8>,
    stdin_pos: usize,
    atexit: Vec<String>,
    report: Report,
}

impl<'u> Machine<'u> {
    /// Load `unit` and initialise its globals.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] if a global initialiser cannot be evaluated.
    pub fn new(unit: &'u TranslationUnit, options: SimOptions) -> Result<Self, Fault> {
        let functions = unit
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Function(f) => Some((f.name.as_str(), f)),
                _ => None,
            })
            .collect();
        let mut machine = Self {
            functions,
            globals: HashMap::new(),
            frames: Vec::new(),
            regions: Vec::new(),
            options,
            steps: 0,
            stdin: Vec::new(),
            stdin_pos: 0,
            atexit: Vec::new(),
            report: Report::default(),
        };
        for item in &unit.items {
            if let Item::Global { ty, name, init, .. } = item {
                let value = init.as_ref().map(|e| machine.eval(e)).transpose()?;
                machine.declare(ty, name.as_str(), value)?;
            }
        }
        Ok(machine)
    }

    /// Call `LLVMFuzzerTestOneInput` with `input`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Fault`] the harness triggers.
    pub fn fuzz_one(&mut self, input: &[u8]) -> Result<i64, Fault> {
        let region = self.alloc(RegionKind::Input, input.to_vec(), None);
        let entry = self.function("LLVMFuzzerTestOneInput")?;
        let status = self.call_function(
            entry,
            vec![
                Value::Ptr { region, offset: 0 },
                Value::Int(i64::try_from(input.len()).unwrap_or(i64::MAX)),
            ],
        )?;
        // libFuzzer owns the input buffer and reuses it after the call
        self.regions[region].live = false;
        as_int(&status)
    }

    /// Call `main` with `stdin` as file descriptor 0.
    ///
    /// # Errors
    ///
    /// Returns the first [`Fault`] the harness triggers.
    pub fn run_main(&mut self, stdin: &[u8]) -> Result<i64, Fault> {
        self.stdin = stdin.to_vec();
        self.stdin_pos = 0;
        let entry = self.function("main")?;
        let status = self.call_function(entry, vec![Value::Int(1), Value::Null])?;
        as_int(&status)
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[TargetCall] {
        &self.report.calls
    }

    /// Run `atexit` handlers and produce the final report.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] raised by an exit handler.
    pub fn exit(mut self) -> Result<Report, Fault> {
        while let Some(handler) = self.atexit.pop() {
            let function = self.function(&handler)?;
            self.call_function(function, Vec::new())?;
        }
        self.report.leaked = self
            .regions
            .iter()
            .filter(|r| r.kind == RegionKind::Heap && r.live)
            .count();
        Ok(self.report)
    }

    fn function(&self, name: &str) -> Result<&'u Function, Fault> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| Fault::Undefined(name.to_string()))
    }

    // ── Memory ──────────────────────────────────────────────────────────────

    fn alloc(&mut self, kind: RegionKind, bytes: Vec<u8>, scalar: Option<CType>) -> usize {
        self.regions.push(Region {
            bytes,
            kind,
            scalar,
            live: true,
        });
        self.regions.len() - 1
    }

    fn region(&self, ptr: &Value, len: usize) -> Result<(usize, usize), Fault> {
        let (region, offset) = match ptr {
            Value::Ptr { region, offset } => (*region, *offset),
            Value::Null | Value::Int(0) => return Err(Fault::NullDeref),
            other => return Err(Fault::Unsupported(format!("dereference of {other:?}"))),
        };
        let r = &self.regions[region];
        if !r.live {
            return Err(Fault::UseAfterFree { kind: r.kind });
        }
        let start = usize::try_from(offset).ok();
        match start {
            Some(start) if start.checked_add(len).is_some_and(|end| end <= r.bytes.len()) => {
                Ok((region, start))
            }
            _ => Err(Fault::OutOfBounds {
                kind: r.kind,
                offset,
                len,
                size: r.bytes.len(),
            }),
        }
    }

    fn read_bytes(&self, ptr: &Value, len: usize) -> Result<Vec<u8>, Fault> {
        let (region, start) = self.region(ptr, len)?;
        Ok(self.regions[region].bytes[start..start + len].to_vec())
    }

    fn write_bytes(&mut self, ptr: &Value, data: &[u8]) -> Result<(), Fault> {
        let (region, start) = self.region(ptr, data.len())?;
        let r = &mut self.regions[region];
        if matches!(r.kind, RegionKind::Input | RegionKind::Literal) {
            return Err(Fault::ReadOnly { kind: r.kind });
        }
        r.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn c_string(&self, ptr: &Value) -> Result<Vec<u8>, Fault> {
        let (region, start) = self.region(ptr, 0)?;
        let bytes = &self.regions[region].bytes[start..];
        match bytes.iter().position(|b| *b == 0) {
            Some(end) => Ok(bytes[..end].to_vec()),
            None => Err(Fault::OutOfBounds {
                kind: self.regions[region].kind,
                offset: i64::try_from(self.regions[region].bytes.len()).unwrap_or(i64::MAX),
                len: 1,
                size: self.regions[region].bytes.len(),
            }),
        }
    }

    fn load_scalar(&self, ptr: &Value, ty: &CType) -> Result<Value, Fault> {
        let width = ty
            .width()
            .ok_or_else(|| Fault::Unsupported(format!("load of {}", ty.spelling())))?;
        let bytes = self.read_bytes(ptr, width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&bytes);
        Ok(Value::Int(truncate(i64::from_le_bytes(buf), width, ty.is_signed())))
    }

    fn store_scalar(&mut self, ptr: &Value, ty: &CType, value: &Value) -> Result<(), Fault> {
        let width = ty
            .width()
            .ok_or_else(|| Fault::Unsupported(format!("store of {}", ty.spelling())))?;
        let bytes = as_int(value)?.to_le_bytes();
        self.write_bytes(ptr, &bytes[..width])
    }

    /// Load through a pointer: scalars at the start of a variable's region
    /// use the variable's type, anything else is a single unsigned byte.
    fn load_through(&self, ptr: &Value) -> Result<Value, Fault> {
        if let Some(ty) = self.scalar_at(ptr) {
            return self.load_scalar(ptr, &ty);
        }
        let byte = self.read_bytes(ptr, 1)?;
        Ok(Value::Int(i64::from(byte[0])))
    }

    fn store_through(&mut self, ptr: &Value, value: &Value) -> Result<(), Fault> {
        if let Some(ty) = self.scalar_at(ptr) {
            return self.store_scalar(ptr, &ty, value);
        }
        let byte = as_int(value)?.to_le_bytes()[0];
        self.write_bytes(ptr, &[byte])
    }

    fn scalar_at(&self, ptr: &Value) -> Option<CType> {
        match ptr {
            Value::Ptr { region, offset: 0 } => self.regions[*region].scalar.clone(),
            _ => None,
        }
    }

    // ── Variables ───────────────────────────────────────────────────────────

    fn declare(&mut self, ty: &CType, name: &str, init: Option<Value>) -> Result<(), Fault> {
        let mut region = None;
        let storage = if let CType::Array(elem, len) = ty {
            let size = elem.width().unwrap_or(1) * len;
            let r = self.alloc(RegionKind::Local, vec![0; size], None);
            region = Some(r);
            Storage::Memory(r)
        } else if ty.width().is_some() && !ty.is_pointer() {
            let width = ty.width().unwrap_or(0);
            let r = self.alloc(RegionKind::Local, vec![0; width], Some(ty.clone()));
            if let Some(value) = &init {
                self.store_scalar(&Value::Ptr { region: r, offset: 0 }, ty, value)?;
            }
            region = Some(r);
            Storage::Memory(r)
        } else {
            Storage::Value(init.unwrap_or(Value::Null))
        };
        let var = Var {
            ty: ty.clone(),
            storage,
        };
        match self.frames.last_mut().and_then(|frame| frame.last_mut()) {
            Some(scope) => {
                scope.vars.insert(name.to_string(), var);
                scope.regions.extend(region);
            }
            None => {
                self.globals.insert(name.to_string(), var);
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Var> {
        self.frames
            .last()
            .and_then(|frame| frame.iter().rev().find_map(|scope| scope.vars.get(name)))
            .or_else(|| self.globals.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Var> {
        if let Some(frame) = self.frames.last_mut() {
            for scope in frame.iter_mut().rev() {
                if scope.vars.contains_key(name) {
                    return scope.vars.get_mut(name);
                }
            }
        }
        self.globals.get_mut(name)
    }

    fn read_ident(&self, name: &str) -> Result<Value, Fault> {
        if let Some(var) = self.lookup(name) {
            return match (&var.storage, &var.ty) {
                (Storage::Memory(region), CType::Array(..)) => Ok(Value::Ptr {
                    region: *region,
                    offset: 0,
                }),
                (Storage::Memory(region), ty) => self.load_scalar(
                    &Value::Ptr {
                        region: *region,
                        offset: 0,
                    },
                    ty,
                ),
                (Storage::Value(value), _) => Ok(value.clone()),
            };
        }
        if self.functions.contains_key(name) {
            return Ok(Value::Func(name.to_string()));
        }
        match name {
            "RTLD_NOW" => Ok(Value::Int(RTLD_NOW)),
            "RTLD_GLOBAL" => Ok(Value::Int(RTLD_GLOBAL)),
            "stderr" => Ok(Value::Int(STDERR)),
            _ => Err(Fault::Undefined(name.to_string())),
        }
    }

    fn write_ident(&mut self, name: &str, value: Value) -> Result<(), Fault> {
        let var = self
            .lookup_mut(name)
            .ok_or_else(|| Fault::Undefined(name.to_string()))?;
        match &mut var.storage {
            Storage::Value(slot) => {
                *slot = value;
                Ok(())
            }
            Storage::Memory(region) => {
                let (region, ty) = (*region, var.ty.clone());
                self.store_scalar(&Value::Ptr { region, offset: 0 }, &ty, &value)
            }
        }
    }

    fn push_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Scope::default());
        }
    }

    fn pop_scope(&mut self) {
        let Some(scope) = self.frames.last_mut().and_then(Vec::pop) else {
            return;
        };
        for region in scope.regions {
            self.regions[region].live = false;
        }
    }

    // ── Execution ───────────────────────────────────────────────────────────

    fn call_function(&mut self, function: &'u Function, args: Vec<Value>) -> Result<Value, Fault> {
        if args.len() != function.params.len() {
            return Err(Fault::Unsupported(format!(
                "{} called with {} argument(s)",
                function.name,
                args.len()
            )));
        }
        self.frames.push(Vec::new());
        self.push_scope();
        for (param, arg) in function.params.iter().zip(args) {
            self.declare(&param.ty, param.name.as_str(), Some(arg))?;
        }
        let flow = self.exec_all(&function.body)?;
        self.pop_scope();
        self.frames.pop();
        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break => Value::Int(0),
        })
    }

    fn exec_block(&mut self, stmts: &'u [Stmt]) -> Result<Flow, Fault> {
        self.push_scope();
        let flow = self.exec_all(stmts)?;
        self.pop_scope();
        Ok(flow)
    }

    fn exec_all(&mut self, stmts: &'u [Stmt]) -> Result<Flow, Fault> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &'u Stmt) -> Result<Flow, Fault> {
        self.steps += 1;
        if self.steps > self.options.step_limit {
            return Err(Fault::StepLimit);
        }
        match stmt {
            Stmt::Decl { ty, name, init } => {
                let value = init.as_ref().map(|e| self.eval(e)).transpose()?;
                self.declare(ty, name.as_str(), value)?;
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Assign { target, op, value } => {
                let value = self.eval(value)?;
                let value = match op {
                    AssignOp::Set => value,
                    AssignOp::Add => binary(BinOp::Add, &self.eval(target)?, &value)?,
                    AssignOp::Sub => binary(BinOp::Sub, &self.eval(target)?, &value)?,
                };
                self.store(target, value)?;
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let taken = if truthy(&self.eval(cond)?) {
                    then_body
                } else {
                    else_body
                };
                return self.exec_block(taken);
            }
            Stmt::While { cond, body } => loop {
                if !truthy(&self.eval(cond)?) {
                    break;
                }
                match self.exec_block(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal => {}
                }
            },
            Stmt::DoWhile { body, cond } => loop {
                match self.exec_block(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal => {}
                }
                if !truthy(&self.eval(cond)?) {
                    break;
                }
            },
            Stmt::Switch { scrutinee, arms } => {
                let selected = as_int(&self.eval(scrutinee)?)?;
                let Some(start) = arms.iter().position(|arm| arm.label == selected) else {
                    return Ok(Flow::Normal);
                };
                // C falls through into the following arms
                for arm in &arms[start..] {
                    match self.exec_block(&arm.body)? {
                        Flow::Normal => {}
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(e) => self.eval(e)?,
                    None => Value::Int(0),
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Bail { release } => {
                for buffer in release {
                    let pointer = self.read_ident(buffer.as_str())?;
                    self.free(&pointer)?;
                }
                return Ok(Flow::Return(Value::Int(BAIL_SENTINEL)));
            }
            Stmt::Comment(_) => {}
        }
        Ok(Flow::Normal)
    }

    fn store(&mut self, target: &'u Expr, value: Value) -> Result<(), Fault> {
        match target {
            Expr::Ident(name) => self.write_ident(name.as_str(), value),
            Expr::Index { base, index } => {
                let ptr = self.element(base, index)?;
                self.store_through(&ptr, &value)
            }
            Expr::Unary {
                op: UnaryOp::Deref,
                expr,
            } => {
                let ptr = self.eval(expr)?;
                self.store_through(&ptr, &value)
            }
            other => Err(Fault::Unsupported(format!(
                "assignment to {}",
                fuzzit_ir::render_expr(other)
            ))),
        }
    }

    fn element(&mut self, base: &'u Expr, index: &'u Expr) -> Result<Value, Fault> {
        let base = self.eval(base)?;
        let index = self.eval(index)?;
        binary(BinOp::Add, &base, &index)
    }

    fn eval(&mut self, expr: &'u Expr) -> Result<Value, Fault> {
        match expr {
            Expr::Ident(name) => self.read_ident(name.as_str()),
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Str(text) => {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                let region = self.alloc(RegionKind::Literal, bytes, None);
                Ok(Value::Ptr { region, offset: 0 })
            }
            Expr::Null => Ok(Value::Null),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not => Ok(Value::Int(i64::from(!truthy(&self.eval(expr)?)))),
                UnaryOp::AddrOf => self.address_of(expr),
                UnaryOp::Deref => {
                    let ptr = self.eval(expr)?;
                    self.load_through(&ptr)
                }
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(callee, args)
            }
            Expr::Cast { ty, expr } => {
                let value = self.eval(expr)?;
                cast(ty, value)
            }
            Expr::Index { base, index } => {
                let ptr = self.element(base, index)?;
                self.load_through(&ptr)
            }
            Expr::SizeOf(ty) => ty
                .width()
                .map(|w| Value::Int(i64::try_from(w).unwrap_or(i64::MAX)))
                .ok_or_else(|| Fault::Unsupported(format!("sizeof({})", ty.spelling()))),
            Expr::Assign { target, value } => {
                let value = self.eval(value)?;
                self.store(target, value.clone())?;
                Ok(value)
            }
        }
    }

    fn address_of(&mut self, expr: &'u Expr) -> Result<Value, Fault> {
        match expr {
            Expr::Ident(name) => match self.lookup(name.as_str()).map(|v| v.storage.clone()) {
                Some(Storage::Memory(region)) => Ok(Value::Ptr { region, offset: 0 }),
                Some(Storage::Value(_)) => Err(Fault::Unsupported(format!(
                    "address of pointer variable {name}"
                ))),
                None => Err(Fault::Undefined(name.to_string())),
            },
            Expr::Index { base, index } => self.element(base, index),
            other => Err(Fault::Unsupported(format!(
                "address of {}",
                fuzzit_ir::render_expr(other)
            ))),
        }
    }

    fn call(&mut self, callee: &'u Expr, args: Vec<Value>) -> Result<Value, Fault> {
        let Expr::Ident(name) = callee else {
            return Err(Fault::Unsupported("indirect callee expression".to_string()));
        };
        let name = name.as_str();
        if self.lookup(name).is_some() {
            let target = self.read_ident(name)?;
            return self.call_value(&target, args);
        }
        if let Some(function) = self.functions.get(name).copied() {
            return self.call_function(function, args);
        }
        self.builtin(name, &args)
    }

    fn call_value(&mut self, target: &Value, args: Vec<Value>) -> Result<Value, Fault> {
        match target {
            Value::Func(name) => {
                let function = self.function(name)?;
                self.call_function(function, args)
            }
            Value::Symbol(symbol) => {
                let args = args
                    .iter()
                    .map(|value| match value {
                        Value::Int(i) => Ok(Arg::Int(*i)),
                        Value::Null => Ok(Arg::Null),
                        Value::Ptr { .. } => self.c_string(value).map(Arg::Bytes),
                        other => Err(Fault::Unsupported(format!("argument {other:?}"))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.report.calls.push(TargetCall {
                    symbol: symbol.clone(),
                    args,
                });
                Ok(Value::Int(0))
            }
            Value::Null | Value::Int(0) => Err(Fault::NullDeref),
            other => Err(Fault::Unsupported(format!("call through {other:?}"))),
        }
    }

    fn free(&mut self, ptr: &Value) -> Result<(), Fault> {
        match ptr {
            Value::Null => Ok(()),
            Value::Ptr { region, offset: 0 } if self.regions[*region].kind == RegionKind::Heap => {
                let r = &mut self.regions[*region];
                if !r.live {
                    return Err(Fault::DoubleFree);
                }
                r.live = false;
                Ok(())
            }
            _ => Err(Fault::InvalidFree),
        }
    }

    fn builtin(&mut self, name: &str, args: &[Value]) -> Result<Value, Fault> {
        let arg = |i: usize| {
            args.get(i)
                .cloned()
                .ok_or_else(|| Fault::Unsupported(format!("{name} is missing argument {i}")))
        };
        match name {
            "memcpy" => {
                let (dst, src, len) = (arg(0)?, arg(1)?, to_len(&arg(2)?)?);
                let data = self.read_bytes(&src, len)?;
                self.write_bytes(&dst, &data)?;
                Ok(dst)
            }
            "memset" => {
                let (dst, fill, len) = (arg(0)?, as_int(&arg(1)?)?, to_len(&arg(2)?)?);
                self.write_bytes(&dst, &vec![fill.to_le_bytes()[0]; len])?;
                Ok(dst)
            }
            "malloc" => {
                let len = to_len(&arg(0)?)?;
                if len > MAX_ALLOCATION {
                    return Err(Fault::HugeAllocation(len));
                }
                if self
                    .options
                    .malloc_limit
                    .is_some_and(|limit| self.report.allocations >= limit)
                {
                    return Ok(Value::Null);
                }
                self.report.allocations += 1;
                let region = self.alloc(RegionKind::Heap, vec![0xAA; len], None);
                Ok(Value::Ptr { region, offset: 0 })
            }
            "free" => {
                self.free(&arg(0)?)?;
                Ok(Value::Int(0))
            }
            "printf" => {
                let line = self.format(&arg(0)?, &args[1..])?;
                self.report.output.push(line);
                Ok(Value::Int(0))
            }
            "fprintf" => {
                let line = self.format(&arg(1)?, &args[2..])?;
                self.report.output.push(line);
                Ok(Value::Int(0))
            }
            "dlopen" => {
                arg(0)?;
                if self.options.fail_load {
                    return Ok(Value::Null);
                }
                self.report.loads += 1;
                let region = self.alloc(RegionKind::Library, Vec::new(), None);
                Ok(Value::Ptr { region, offset: 0 })
            }
            "dlsym" => {
                self.library(&arg(0)?)?;
                let symbol = String::from_utf8_lossy(&self.c_string(&arg(1)?)?).into_owned();
                Ok(Value::Symbol(symbol))
            }
            "dlclose" => {
                self.library(&arg(0)?)?;
                self.report.closes += 1;
                Ok(Value::Int(0))
            }
            "dlerror" => self.eval_literal(DLERROR_TEXT),
            "atexit" => match arg(0)? {
                Value::Func(handler) => {
                    self.atexit.push(handler);
                    Ok(Value::Int(0))
                }
                other => Err(Fault::Unsupported(format!("atexit({other:?})"))),
            },
            "read" => {
                if as_int(&arg(0)?)? != 0 {
                    return Err(Fault::Unsupported("read from fd other than 0".to_string()));
                }
                let (dst, len) = (arg(1)?, to_len(&arg(2)?)?);
                let available = self.stdin.len() - self.stdin_pos;
                let count = len.min(available);
                let chunk = self.stdin[self.stdin_pos..self.stdin_pos + count].to_vec();
                self.write_bytes(&dst, &chunk)?;
                self.stdin_pos += count;
                Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
            }
            _ => Err(Fault::Undefined(name.to_string())),
        }
    }

    fn library(&self, handle: &Value) -> Result<(), Fault> {
        match handle {
            Value::Ptr { region, .. } if self.regions[*region].kind == RegionKind::Library => {
                Ok(())
            }
            Value::Null => Err(Fault::NullDeref),
            other => Err(Fault::Unsupported(format!("library handle {other:?}"))),
        }
    }

    fn eval_literal(&mut self, text: &str) -> Result<Value, Fault> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let region = self.alloc(RegionKind::Literal, bytes, None);
        Ok(Value::Ptr { region, offset: 0 })
    }

    fn format(&self, format: &Value, args: &[Value]) -> Result<String, Fault> {
        let format = String::from_utf8_lossy(&self.c_string(format)?).into_owned();
        let mut args = args.iter();
        let mut next = || {
            args.next()
                .ok_or_else(|| Fault::Unsupported("printf argument missing".to_string()))
        };
        let mut out = String::new();
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('s') => out.push_str(&String::from_utf8_lossy(&self.c_string(next()?)?)),
                Some('d') => out.push_str(&as_int(next()?)?.to_string()),
                Some('p') => {
                    next()?;
                    out.push_str("0x1");
                }
                Some('%') => out.push('%'),
                other => return Err(Fault::Unsupported(format!("format %{other:?}"))),
            }
        }
        Ok(out.trim_end_matches('\n').to_string())
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Int(i) => *i != 0,
        Value::Null => false,
        Value::Ptr { .. } | Value::Func(_) | Value::Symbol(_) => true,
    }
}

fn as_int(value: &Value) -> Result<i64, Fault> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Null => Ok(0),
        other => Err(Fault::Unsupported(format!("{other:?} used as an integer"))),
    }
}

fn to_len(value: &Value) -> Result<usize, Fault> {
    let n = as_int(value)?;
    usize::try_from(n).map_err(|_| Fault::Unsupported(format!("negative length {n}")))
}

/// Reduce `value` to a `width`-byte integer, as a C conversion would.
fn truncate(value: i64, width: usize, signed: bool) -> i64 {
    if width >= 8 {
        return value;
    }
    let bits = width * 8;
    let masked = value & ((1i64 << bits) - 1);
    if signed && (masked >> (bits - 1)) & 1 == 1 {
        masked - (1i64 << bits)
    } else {
        masked
    }
}

fn cast(ty: &CType, value: Value) -> Result<Value, Fault> {
    match ty {
        CType::Void => Ok(Value::Int(0)),
        _ if ty.is_pointer() => Ok(value),
        _ => {
            let width = ty
                .width()
                .ok_or_else(|| Fault::Unsupported(format!("cast to {}", ty.spelling())))?;
            Ok(Value::Int(truncate(as_int(&value)?, width, ty.is_signed())))
        }
    }
}

fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (op, lhs, rhs) {
        (BinOp::Add, Value::Ptr { region, offset }, Value::Int(n))
        | (BinOp::Add, Value::Int(n), Value::Ptr { region, offset }) => Ok(Value::Ptr {
            region: *region,
            offset: offset + n,
        }),
        (BinOp::Sub, Value::Ptr { region, offset }, Value::Int(n)) => Ok(Value::Ptr {
            region: *region,
            offset: offset - n,
        }),
        (BinOp::Eq, a, b) => Ok(Value::Int(i64::from(same(a, b)))),
        (BinOp::Ne, a, b) => Ok(Value::Int(i64::from(!same(a, b)))),
        _ => {
            let (a, b) = (as_int(lhs)?, as_int(rhs)?);
            let result = match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Rem => {
                    if b == 0 {
                        return Err(Fault::Unsupported("remainder by zero".to_string()));
                    }
                    a % b
                }
                BinOp::Lt => i64::from(a < b),
                BinOp::Le => i64::from(a <= b),
                BinOp::Gt => i64::from(a > b),
                BinOp::Ge => i64::from(a >= b),
                BinOp::BitOr => a | b,
                BinOp::Eq | BinOp::Ne => unreachable!("handled above"),
            };
            Ok(Value::Int(result))
        }
    }
}

fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null | Value::Int(0), Value::Null) | (Value::Null, Value::Int(0)) => true,
        _ => a == b,
    }
}
