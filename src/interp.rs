//! Tree-walking evaluator for `mino run` and the default reduce predicate.
//!
//! Executes `func main` of a parsed package and captures everything the
//! program prints, plus any panic or runtime error, as one byte stream.
//! `go` statements run their call synchronously; the toolchain only needs
//! deterministic output bytes. A fuel limit guards the reducer against
//! candidates that loop forever.

use crate::parser::ast::*;
use crate::stdlib;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const FUEL: u64 = 1 << 20;

/// Run the package and return its combined output. The caller has already
/// established that the package parses and type-checks.
pub fn run(ast: &Ast) -> Vec<u8> {
    let mut interp = Interp::new(ast);
    match interp.run_main() {
        Ok(()) => {}
        Err(Trap::Panic(msg)) => {
            interp.out.extend_from_slice(format!("panic: {}\n", msg).as_bytes());
        }
        Err(Trap::Error(msg)) => {
            interp
                .out
                .extend_from_slice(format!("panic: runtime error: {}\n", msg).as_bytes());
        }
    }
    interp.out
}

#[derive(Debug)]
enum Trap {
    Panic(String),
    Error(String),
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type Cell = Rc<RefCell<Value>>;

#[derive(Debug, Clone)]
enum Value {
    Unit,
    Int(i64),
    Bool(bool),
    Str(String),
    Char(char),
    Slice(Rc<RefCell<Vec<Value>>>),
    Struct(String),
    Ptr(Cell),
    Func(FuncRef),
}

#[derive(Debug, Clone)]
enum FuncRef {
    Decl(DeclId),
    Lit {
        params: Vec<Param>,
        body: StmtId,
        env: Env,
    },
}

#[derive(Debug)]
struct EnvNode {
    vars: RefCell<HashMap<String, Cell>>,
    parent: Option<Env>,
}

type Env = Rc<EnvNode>;

fn child_env(parent: &Env) -> Env {
    Rc::new(EnvNode {
        vars: RefCell::new(HashMap::new()),
        parent: Some(parent.clone()),
    })
}

fn env_lookup(env: &Env, name: &str) -> Option<Cell> {
    let mut cur = Some(env.clone());
    while let Some(e) = cur {
        if let Some(cell) = e.vars.borrow().get(name) {
            return Some(cell.clone());
        }
        cur = e.parent.clone();
    }
    None
}

/// A resolved call: callee plus already-evaluated arguments. `defer` stores
/// one of these and runs it at function exit.
enum Pending {
    Builtin(String, Vec<Value>),
    Stdlib(String, String, Vec<Value>),
    Func(FuncRef, Vec<Value>),
    Method(DeclId, Value, Vec<Value>),
}

struct Interp<'a> {
    ast: &'a Ast,
    out: Vec<u8>,
    globals: Env,
    funcs: HashMap<String, DeclId>,
    methods: HashMap<(String, String), DeclId>,
    imports: HashMap<String, String>,
    fuel: u64,
}

impl<'a> Interp<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: Vec::new(),
            globals: Rc::new(EnvNode {
                vars: RefCell::new(HashMap::new()),
                parent: None,
            }),
            funcs: HashMap::new(),
            methods: HashMap::new(),
            imports: HashMap::new(),
            fuel: FUEL,
        }
    }

    fn run_main(&mut self) -> Result<(), Trap> {
        self.collect_decls();
        self.init_globals()?;
        let Some(&main) = self.funcs.get("main") else {
            return Err(Trap::Error("no main function".into()));
        };
        self.call_decl(main, None, Vec::new())?;
        Ok(())
    }

    fn collect_decls(&mut self) {
        for file in &self.ast.files {
            for &decl in &file.decls {
                match self.ast.decl(decl) {
                    Decl::Func(f) => {
                        let name = self.ast.ident_name(f.name).to_string();
                        match &f.recv {
                            None => {
                                self.funcs.insert(name, decl);
                            }
                            Some(recv) => {
                                if let Some(t) = self.ast.base_type_name(recv.ty) {
                                    self.methods.insert((t.to_string(), name), decl);
                                }
                            }
                        }
                    }
                    Decl::Gen { tok: DeclTok::Import, specs } => {
                        for &spec in specs {
                            if let Spec::Import { name, path, .. } = self.ast.spec(spec) {
                                let bind = match name {
                                    Some(id) => self.ast.ident_name(*id).to_string(),
                                    None => stdlib::default_name(path).to_string(),
                                };
                                if bind != "_" {
                                    self.imports.insert(bind, path.clone());
                                }
                            }
                        }
                    }
                    Decl::Gen { .. } => {}
                }
            }
        }
    }

    fn init_globals(&mut self) -> Result<(), Trap> {
        for file_idx in 0..self.ast.files.len() {
            let decls = self.ast.files[file_idx].decls.clone();
            for decl in decls {
                let Decl::Gen { tok, specs } = self.ast.decl(decl).clone() else {
                    continue;
                };
                if tok != DeclTok::Var && tok != DeclTok::Const {
                    continue;
                }
                for spec in specs {
                    let env = self.globals.clone();
                    self.exec_value_spec(&env, spec)?;
                }
            }
        }
        Ok(())
    }

    fn exec_value_spec(&mut self, env: &Env, spec: SpecId) -> Result<(), Trap> {
        let Spec::Value { names, ty, values } = self.ast.spec(spec).clone() else {
            return Ok(());
        };
        let mut vals = Vec::new();
        if values.is_empty() {
            for _ in &names {
                vals.push(self.zero_value(ty));
            }
        } else {
            for &v in &values {
                vals.push(self.eval(env, v)?);
            }
        }
        if names.len() != vals.len() {
            return Err(Trap::Error("assignment count mismatch".into()));
        }
        for (&name, val) in names.iter().zip(vals) {
            let name = self.ast.ident_name(name);
            if name != "_" {
                env.vars
                    .borrow_mut()
                    .insert(name.to_string(), Rc::new(RefCell::new(val)));
            }
        }
        Ok(())
    }

    fn zero_value(&self, ty: Option<ExprId>) -> Value {
        let Some(ty) = ty else { return Value::Unit };
        match self.ast.expr(ty) {
            Expr::Ident(id) => match self.ast.ident_name(*id) {
                "int" => Value::Int(0),
                "string" => Value::Str(String::new()),
                "bool" => Value::Bool(false),
                name => Value::Struct(name.to_string()),
            },
            Expr::SliceType { .. } => Value::Slice(Rc::new(RefCell::new(Vec::new()))),
            _ => Value::Unit,
        }
    }

    // ── Calls ────────────────────────────────────────────────────────

    fn call_decl(
        &mut self,
        decl: DeclId,
        recv: Option<Value>,
        args: Vec<Value>,
    ) -> Result<Value, Trap> {
        let Decl::Func(f) = self.ast.decl(decl).clone() else {
            return Err(Trap::Error("call of non-function".into()));
        };
        let Some(body) = f.body else {
            return Err(Trap::Error("call of function without body".into()));
        };
        let env = child_env(&self.globals);
        if let (Some(recv_field), Some(value)) = (&f.recv, recv) {
            if let Some(name) = recv_field.name {
                let name = self.ast.ident_name(name);
                if name != "_" {
                    env.vars
                        .borrow_mut()
                        .insert(name.to_string(), Rc::new(RefCell::new(value)));
                }
            }
        }
        self.bind_params(&env, &f.params, args)?;
        self.exec_func_body(env, body)
    }

    fn bind_params(&self, env: &Env, params: &[Param], args: Vec<Value>) -> Result<(), Trap> {
        let names: Vec<IdentId> = params.iter().flat_map(|p| p.names.clone()).collect();
        if names.len() != args.len() {
            return Err(Trap::Error("wrong number of arguments".into()));
        }
        for (name, val) in names.into_iter().zip(args) {
            let name = self.ast.ident_name(name);
            if name != "_" {
                env.vars
                    .borrow_mut()
                    .insert(name.to_string(), Rc::new(RefCell::new(val)));
            }
        }
        Ok(())
    }

    fn exec_func_body(&mut self, env: Env, body: StmtId) -> Result<Value, Trap> {
        let mut defers: Vec<Pending> = Vec::new();
        let res = self.exec_stmt(&env, body, &mut defers);
        // Deferred calls run on the way out, panicking or not.
        let deferred: Vec<Pending> = defers.drain(..).rev().collect();
        for pending in deferred {
            self.exec_pending(pending)?;
        }
        match res? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Unit),
        }
    }

    fn resolve_call(&mut self, env: &Env, call: ExprId) -> Result<Pending, Trap> {
        let Expr::Call { fun, args } = self.ast.expr(call).clone() else {
            return Err(Trap::Error("expression is not a call".into()));
        };
        let mut fun = fun;
        while let Expr::Paren(inner) = self.ast.expr(fun) {
            fun = *inner;
        }
        let mut vals = Vec::new();
        for &a in &args {
            vals.push(self.eval(env, a)?);
        }
        match self.ast.expr(fun).clone() {
            Expr::Ident(id) => {
                let name = self.ast.ident_name(id).to_string();
                if let Some(cell) = env_lookup(env, &name) {
                    let v = cell.borrow().clone();
                    if let Value::Func(f) = v {
                        return Ok(Pending::Func(f, vals));
                    }
                    return Err(Trap::Error(format!("{} is not a function", name)));
                }
                if let Some(&decl) = self.funcs.get(&name) {
                    return Ok(Pending::Func(FuncRef::Decl(decl), vals));
                }
                if matches!(name.as_str(), "len" | "append" | "panic" | "print" | "println") {
                    return Ok(Pending::Builtin(name, vals));
                }
                Err(Trap::Error(format!("undefined: {}", name)))
            }
            Expr::Selector { x, sel } => {
                let sel_name = self.ast.ident_name(sel).to_string();
                if let Some(xid) = self.ast.as_ident(x) {
                    let xname = self.ast.ident_name(xid);
                    if env_lookup(env, xname).is_none() {
                        if let Some(path) = self.imports.get(xname) {
                            return Ok(Pending::Stdlib(path.clone(), sel_name, vals));
                        }
                    }
                }
                let recv = self.eval(env, x)?;
                let tname = match &recv {
                    Value::Struct(t) => t.clone(),
                    Value::Ptr(cell) => match &*cell.borrow() {
                        Value::Struct(t) => t.clone(),
                        _ => return Err(Trap::Error(format!("undefined: {}", sel_name))),
                    },
                    _ => return Err(Trap::Error(format!("undefined: {}", sel_name))),
                };
                match self.methods.get(&(tname.clone(), sel_name.clone())) {
                    Some(&decl) => Ok(Pending::Method(decl, recv, vals)),
                    None => Err(Trap::Error(format!(
                        "type {} has no method {}",
                        tname, sel_name
                    ))),
                }
            }
            Expr::FuncLit { params, body, .. } => Ok(Pending::Func(
                FuncRef::Lit { params, body, env: env.clone() },
                vals,
            )),
            _ => {
                let v = self.eval(env, fun)?;
                match v {
                    Value::Func(f) => Ok(Pending::Func(f, vals)),
                    _ => Err(Trap::Error("call of non-function".into())),
                }
            }
        }
    }

    fn exec_pending(&mut self, pending: Pending) -> Result<Value, Trap> {
        match pending {
            Pending::Builtin(name, args) => self.call_builtin(&name, args),
            Pending::Stdlib(path, member, args) => self.call_stdlib(&path, &member, args),
            Pending::Func(FuncRef::Decl(decl), args) => self.call_decl(decl, None, args),
            Pending::Func(FuncRef::Lit { params, body, env }, args) => {
                let env = child_env(&env);
                self.bind_params(&env, &params, args)?;
                self.exec_func_body(env, body)
            }
            Pending::Method(decl, recv, args) => self.call_decl(decl, Some(recv), args),
        }
    }

    fn call_builtin(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Trap> {
        match name {
            "len" => match args.first() {
                Some(Value::Str(s)) => Ok(Value::Int(s.len() as i64)),
                Some(Value::Slice(v)) => Ok(Value::Int(v.borrow().len() as i64)),
                _ => Err(Trap::Error("invalid argument to len".into())),
            },
            "append" => {
                let mut iter = args.into_iter();
                match iter.next() {
                    Some(Value::Slice(v)) => {
                        let mut out = v.borrow().clone();
                        out.extend(iter);
                        Ok(Value::Slice(Rc::new(RefCell::new(out))))
                    }
                    _ => Err(Trap::Error("invalid argument to append".into())),
                }
            }
            "panic" => {
                let msg = args
                    .first()
                    .map(format_value)
                    .unwrap_or_default();
                Err(Trap::Panic(msg))
            }
            "print" => {
                for a in &args {
                    let s = format_value(a);
                    self.out.extend_from_slice(s.as_bytes());
                }
                Ok(Value::Unit)
            }
            "println" => {
                let line = args.iter().map(format_value).collect::<Vec<_>>().join(" ");
                self.out.extend_from_slice(line.as_bytes());
                self.out.push(b'\n');
                Ok(Value::Unit)
            }
            _ => Err(Trap::Error(format!("unknown builtin {}", name))),
        }
    }

    fn call_stdlib(&mut self, path: &str, member: &str, args: Vec<Value>) -> Result<Value, Trap> {
        match (path, member) {
            ("fmt", "Println") => {
                let line = args.iter().map(format_value).collect::<Vec<_>>().join(" ");
                self.out.extend_from_slice(line.as_bytes());
                self.out.push(b'\n');
                Ok(Value::Unit)
            }
            ("fmt", "Print") => {
                for a in &args {
                    self.out.extend_from_slice(format_value(a).as_bytes());
                }
                Ok(Value::Unit)
            }
            ("strings", "Repeat") => match (args.first(), args.get(1)) {
                (Some(Value::Str(s)), Some(Value::Int(n))) if *n >= 0 => {
                    Ok(Value::Str(s.repeat(*n as usize)))
                }
                _ => Err(Trap::Error("invalid arguments to strings.Repeat".into())),
            },
            ("strings", "ToUpper") => match args.first() {
                Some(Value::Str(s)) => Ok(Value::Str(s.to_uppercase())),
                _ => Err(Trap::Error("invalid argument to strings.ToUpper".into())),
            },
            _ => Err(Trap::Error(format!("undefined: {}.{}", path, member))),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn exec_stmt(
        &mut self,
        env: &Env,
        stmt: StmtId,
        defers: &mut Vec<Pending>,
    ) -> Result<Flow, Trap> {
        self.fuel = self
            .fuel
            .checked_sub(1)
            .ok_or_else(|| Trap::Error("program took too long".into()))?;
        match self.ast.stmt(stmt).clone() {
            Stmt::Block(list) => {
                let inner = child_env(env);
                for s in list {
                    match self.exec_stmt(&inner, s, defers)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::If { init, cond, body, else_ } => {
                let inner = child_env(env);
                if let Some(init) = init {
                    self.exec_stmt(&inner, init, defers)?;
                }
                if self.eval_bool(&inner, cond)? {
                    self.exec_stmt(&inner, body, defers)
                } else if let Some(else_) = else_ {
                    self.exec_stmt(&inner, else_, defers)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Switch { init, tag, cases } => {
                let inner = child_env(env);
                if let Some(init) = init {
                    self.exec_stmt(&inner, init, defers)?;
                }
                let tag_val = match tag {
                    Some(e) => self.eval(&inner, e)?,
                    None => Value::Bool(true),
                };
                let mut chosen = None;
                let mut default = None;
                'cases: for &case in &cases {
                    let Stmt::Case { exprs, default: is_default, .. } = self.ast.stmt(case)
                    else {
                        continue;
                    };
                    if *is_default {
                        default = Some(case);
                        continue;
                    }
                    for &e in exprs.clone().iter() {
                        let v = self.eval(&inner, e)?;
                        if values_equal(&tag_val, &v)? {
                            chosen = Some(case);
                            break 'cases;
                        }
                    }
                }
                let Some(case) = chosen.or(default) else {
                    return Ok(Flow::Normal);
                };
                let Stmt::Case { body, .. } = self.ast.stmt(case).clone() else {
                    return Ok(Flow::Normal);
                };
                let case_env = child_env(&inner);
                for s in body {
                    match self.exec_stmt(&case_env, s, defers)? {
                        Flow::Normal => {}
                        Flow::Break => return Ok(Flow::Normal),
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { init, cond, post, body } => {
                let inner = child_env(env);
                if let Some(init) = init {
                    self.exec_stmt(&inner, init, defers)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_bool(&inner, cond)? {
                            break;
                        }
                    }
                    match self.exec_stmt(&inner, body, defers)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(post) = post {
                        self.exec_stmt(&inner, post, defers)?;
                    }
                    self.fuel = self
                        .fuel
                        .checked_sub(1)
                        .ok_or_else(|| Trap::Error("program took too long".into()))?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Assign { lhs, rhs, tok } => {
                let mut vals = Vec::new();
                for &r in &rhs {
                    vals.push(self.eval(env, r)?);
                }
                if lhs.len() != vals.len() {
                    return Err(Trap::Error("assignment count mismatch".into()));
                }
                for (&l, val) in lhs.iter().zip(vals) {
                    match tok {
                        AssignTok::Define => {
                            let Some(id) = self.ast.as_ident(l) else {
                                return Err(Trap::Error("non-name on left side of :=".into()));
                            };
                            let name = self.ast.ident_name(id);
                            if name != "_" {
                                env.vars
                                    .borrow_mut()
                                    .insert(name.to_string(), Rc::new(RefCell::new(val)));
                            }
                        }
                        AssignTok::Assign => self.assign_to(env, l, val)?,
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt(e) => {
                self.eval(env, e)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(exprs) => {
                let mut vals = Vec::new();
                for e in exprs {
                    vals.push(self.eval(env, e)?);
                }
                Ok(Flow::Return(vals.into_iter().next().unwrap_or(Value::Unit)))
            }
            Stmt::Defer(call) => {
                let pending = self.resolve_call(env, call)?;
                defers.push(pending);
                Ok(Flow::Normal)
            }
            Stmt::Go(call) => {
                let pending = self.resolve_call(env, call)?;
                self.exec_pending(pending)?;
                Ok(Flow::Normal)
            }
            Stmt::DeclStmt(d) => {
                if let Decl::Gen { tok, specs } = self.ast.decl(d).clone() {
                    if tok == DeclTok::Var || tok == DeclTok::Const {
                        for spec in specs {
                            self.exec_value_spec(env, spec)?;
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Case { .. } => unreachable!("case statements are only executed via Switch"),
        }
    }

    fn assign_to(&mut self, env: &Env, target: ExprId, val: Value) -> Result<(), Trap> {
        match self.ast.expr(target).clone() {
            Expr::Ident(id) => {
                let name = self.ast.ident_name(id);
                if name == "_" {
                    return Ok(());
                }
                match env_lookup(env, name) {
                    Some(cell) => {
                        *cell.borrow_mut() = val;
                        Ok(())
                    }
                    None => Err(Trap::Error(format!("undefined: {}", name))),
                }
            }
            Expr::Index { x, index } => {
                let xv = self.eval(env, x)?;
                let i = self.eval_int(env, index)?;
                match xv {
                    Value::Slice(v) => {
                        let mut v = v.borrow_mut();
                        let len = v.len();
                        if i < 0 || i as usize >= len {
                            return Err(Trap::Error("index out of range".into()));
                        }
                        v[i as usize] = val;
                        Ok(())
                    }
                    _ => Err(Trap::Error("cannot index this value".into())),
                }
            }
            Expr::Star(p) => match self.eval(env, p)? {
                Value::Ptr(cell) => {
                    *cell.borrow_mut() = val;
                    Ok(())
                }
                _ => Err(Trap::Error("invalid indirect".into())),
            },
            Expr::Paren(inner) => self.assign_to(env, inner, val),
            _ => Err(Trap::Error("cannot assign to this expression".into())),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn eval(&mut self, env: &Env, expr: ExprId) -> Result<Value, Trap> {
        match self.ast.expr(expr).clone() {
            Expr::Ident(id) => {
                let name = self.ast.ident_name(id).to_string();
                if name == "_" {
                    return Err(Trap::Error("cannot use _ as value".into()));
                }
                if let Some(cell) = env_lookup(env, &name) {
                    return Ok(cell.borrow().clone());
                }
                if let Some(&decl) = self.funcs.get(&name) {
                    return Ok(Value::Func(FuncRef::Decl(decl)));
                }
                match name.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(Trap::Error(format!("undefined: {}", name))),
                }
            }
            Expr::Lit(lit) => self.eval_lit(&lit),
            Expr::Composite { ty, elts } => {
                let mut vals = Vec::new();
                for &e in &elts {
                    vals.push(self.eval(env, e)?);
                }
                match ty.map(|t| self.ast.expr(t).clone()) {
                    Some(Expr::SliceType { .. }) => {
                        Ok(Value::Slice(Rc::new(RefCell::new(vals))))
                    }
                    Some(Expr::Ident(id)) => {
                        Ok(Value::Struct(self.ast.ident_name(id).to_string()))
                    }
                    _ => Err(Trap::Error("invalid composite literal".into())),
                }
            }
            Expr::Call { .. } => {
                let pending = self.resolve_call(env, expr)?;
                self.exec_pending(pending)
            }
            Expr::Index { x, index } => {
                let xv = self.eval(env, x)?;
                let i = self.eval_int(env, index)?;
                match xv {
                    Value::Slice(v) => {
                        let v = v.borrow();
                        if i < 0 || i as usize >= v.len() {
                            return Err(Trap::Error("index out of range".into()));
                        }
                        Ok(v[i as usize].clone())
                    }
                    Value::Str(s) => {
                        let bytes = s.as_bytes();
                        if i < 0 || i as usize >= bytes.len() {
                            return Err(Trap::Error("index out of range".into()));
                        }
                        Ok(Value::Char(bytes[i as usize] as char))
                    }
                    _ => Err(Trap::Error("cannot index this value".into())),
                }
            }
            Expr::Slice { x, low, high, max } => {
                let xv = self.eval(env, x)?;
                let lo = match low {
                    Some(e) => self.eval_int(env, e)?,
                    None => 0,
                };
                match xv {
                    Value::Slice(v) => {
                        let v = v.borrow();
                        let hi = match high {
                            Some(e) => self.eval_int(env, e)?,
                            None => v.len() as i64,
                        };
                        if let Some(m) = max {
                            let m = self.eval_int(env, m)?;
                            if m < hi || m > v.len() as i64 {
                                return Err(Trap::Error("slice bounds out of range".into()));
                            }
                        }
                        if lo < 0 || hi < lo || hi > v.len() as i64 {
                            return Err(Trap::Error("slice bounds out of range".into()));
                        }
                        Ok(Value::Slice(Rc::new(RefCell::new(
                            v[lo as usize..hi as usize].to_vec(),
                        ))))
                    }
                    Value::Str(s) => {
                        let hi = match high {
                            Some(e) => self.eval_int(env, e)?,
                            None => s.len() as i64,
                        };
                        if lo < 0 || hi < lo || hi > s.len() as i64 {
                            return Err(Trap::Error("slice bounds out of range".into()));
                        }
                        match s.as_bytes().get(lo as usize..hi as usize) {
                            Some(b) => match std::str::from_utf8(b) {
                                Ok(sub) => Ok(Value::Str(sub.to_string())),
                                Err(_) => {
                                    Err(Trap::Error("slice not on character boundary".into()))
                                }
                            },
                            None => Err(Trap::Error("slice bounds out of range".into())),
                        }
                    }
                    _ => Err(Trap::Error("cannot slice this value".into())),
                }
            }
            Expr::Unary { op, x } => match op {
                UnaryOp::Plus => self.eval(env, x),
                UnaryOp::Minus => {
                    let v = self.eval_int(env, x)?;
                    v.checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| Trap::Error("integer overflow".into()))
                }
                UnaryOp::Not => match self.eval(env, x)? {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    _ => Err(Trap::Error("operator ! expects bool".into())),
                },
                UnaryOp::Amp => match self.ast.expr(x).clone() {
                    Expr::Ident(id) => {
                        let name = self.ast.ident_name(id);
                        match env_lookup(env, name) {
                            Some(cell) => Ok(Value::Ptr(cell)),
                            None => Err(Trap::Error(format!("undefined: {}", name))),
                        }
                    }
                    _ => {
                        let v = self.eval(env, x)?;
                        Ok(Value::Ptr(Rc::new(RefCell::new(v))))
                    }
                },
            },
            Expr::Binary { op, x, y } => self.eval_binary(env, op, x, y),
            Expr::Star(x) => match self.eval(env, x)? {
                Value::Ptr(cell) => Ok(cell.borrow().clone()),
                _ => Err(Trap::Error("invalid indirect".into())),
            },
            Expr::Paren(x) => self.eval(env, x),
            Expr::Selector { .. } => {
                Err(Trap::Error("selector is not a value here".into()))
            }
            Expr::FuncLit { params, body, .. } => Ok(Value::Func(FuncRef::Lit {
                params,
                body,
                env: env.clone(),
            })),
            Expr::SliceType { .. } | Expr::StructType => {
                Err(Trap::Error("type is not a value".into()))
            }
        }
    }

    fn eval_lit(&self, lit: &Lit) -> Result<Value, Trap> {
        match lit.kind {
            LitKind::Int => lit
                .value
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Trap::Error(format!("invalid integer literal {}", lit.value))),
            LitKind::Str => unquote(&lit.value)
                .map(Value::Str)
                .ok_or_else(|| Trap::Error("malformed string literal".into())),
            LitKind::Char => unquote(&lit.value)
                .and_then(|s| s.chars().next())
                .map(Value::Char)
                .ok_or_else(|| Trap::Error("malformed character literal".into())),
        }
    }

    fn eval_binary(
        &mut self,
        env: &Env,
        op: BinOp,
        x: ExprId,
        y: ExprId,
    ) -> Result<Value, Trap> {
        // && and || short-circuit.
        if op == BinOp::And || op == BinOp::Or {
            let lhs = self.eval_bool(env, x)?;
            if op == BinOp::And && !lhs {
                return Ok(Value::Bool(false));
            }
            if op == BinOp::Or && lhs {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(self.eval_bool(env, y)?));
        }
        let lhs = self.eval(env, x)?;
        let rhs = self.eval(env, y)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs)?)),
            BinOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs)?)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ord = match (&lhs, &rhs) {
                    (Value::Int(a), Value::Int(b)) => a.cmp(b),
                    (Value::Str(a), Value::Str(b)) => a.cmp(b),
                    (Value::Char(a), Value::Char(b)) => a.cmp(b),
                    _ => return Err(Trap::Error("invalid comparison".into())),
                };
                Ok(Value::Bool(match op {
                    BinOp::Lt => ord.is_lt(),
                    BinOp::Le => ord.is_le(),
                    BinOp::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                }))
            }
            BinOp::Add => match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => a
                    .checked_add(*b)
                    .map(Value::Int)
                    .ok_or_else(|| Trap::Error("integer overflow".into())),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
                _ => Err(Trap::Error("invalid operands to +".into())),
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) else {
                    return Err(Trap::Error(format!("invalid operands to {}", op)));
                };
                let r = match op {
                    BinOp::Sub => a.checked_sub(*b),
                    BinOp::Mul => a.checked_mul(*b),
                    BinOp::Div => {
                        if *b == 0 {
                            return Err(Trap::Error("integer divide by zero".into()));
                        }
                        a.checked_div(*b)
                    }
                    _ => {
                        if *b == 0 {
                            return Err(Trap::Error("integer divide by zero".into()));
                        }
                        a.checked_rem(*b)
                    }
                };
                r.map(Value::Int)
                    .ok_or_else(|| Trap::Error("integer overflow".into()))
            }
            BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => unreachable!(),
        }
    }

    fn eval_bool(&mut self, env: &Env, expr: ExprId) -> Result<bool, Trap> {
        match self.eval(env, expr)? {
            Value::Bool(b) => Ok(b),
            _ => Err(Trap::Error("non-bool condition".into())),
        }
    }

    fn eval_int(&mut self, env: &Env, expr: ExprId) -> Result<i64, Trap> {
        match self.eval(env, expr)? {
            Value::Int(n) => Ok(n),
            _ => Err(Trap::Error("non-integer value".into())),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, Trap> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Char(x), Value::Char(y)) => Ok(x == y),
        (Value::Struct(x), Value::Struct(y)) => Ok(x == y),
        (Value::Unit, Value::Unit) => Ok(true),
        _ => Err(Trap::Error("invalid comparison".into())),
    }
}

/// Go-flavored formatting: runes print as their integer value, slices as
/// space-separated elements in brackets.
fn format_value(v: &Value) -> String {
    match v {
        Value::Unit => String::new(),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.clone(),
        Value::Char(c) => (*c as u32).to_string(),
        Value::Slice(elems) => {
            let inner = elems
                .borrow()
                .iter()
                .map(format_value)
                .collect::<Vec<_>>()
                .join(" ");
            format!("[{}]", inner)
        }
        Value::Struct(_) => "{}".to_string(),
        Value::Ptr(cell) => format!("&{}", format_value(&cell.borrow())),
        Value::Func(_) => "func".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::Path;

    fn run_src(src: &str) -> String {
        let mut ast = Ast::new();
        parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        String::from_utf8(run(&ast)).unwrap()
    }

    #[test]
    fn prints_arithmetic() {
        let out = run_src("package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k + 1)\n}\n");
        assert_eq!(out, "6");
    }

    #[test]
    fn panic_output() {
        let out = run_src("package main\n\nfunc main() {\n\tpanic(\"x\")\n}\n");
        assert_eq!(out, "panic: x\n");
    }

    #[test]
    fn dead_branch_picks_then() {
        let out = run_src(
            "package main\n\nfunc main() {\n\tif true {\n\t\tpanic(\"x\")\n\t} else {\n\t\tpanic(\"y\")\n\t}\n}\n",
        );
        assert_eq!(out, "panic: x\n");
    }

    #[test]
    fn slices_index_and_append() {
        let out = run_src(
            "package main\n\nfunc main() {\n\ta := []int{1, 2, 3, 4}\n\tprint(a[1:3][0])\n\tb := append(a, 5)\n\tprint(len(b))\n}\n",
        );
        assert_eq!(out, "25");
    }

    #[test]
    fn methods_dispatch_on_named_type() {
        let out = run_src(
            "package main\n\ntype T struct{}\n\nfunc (t T) M() {\n\tpanic(\"m\")\n}\n\nfunc main() {\n\tx := T{}\n\tx.M()\n}\n",
        );
        assert_eq!(out, "panic: m\n");
    }

    #[test]
    fn stdlib_calls() {
        let out = run_src(
            "package main\n\nimport (\n\t\"fmt\"\n\t\"strings\"\n)\n\nfunc main() {\n\tfmt.Println(strings.Repeat(\"ab\", 2))\n}\n",
        );
        assert_eq!(out, "abab\n");
    }

    #[test]
    fn defer_runs_after_body_even_on_panic() {
        let out = run_src(
            "package main\n\nfunc f() {\n\tdefer println(\"deferred\")\n\tpanic(\"boom\")\n}\n\nfunc main() {\n\tf()\n}\n",
        );
        assert_eq!(out, "deferred\npanic: boom\n");
    }

    #[test]
    fn go_runs_synchronously() {
        let out = run_src(
            "package main\n\nfunc f() {\n\tprintln(\"go\")\n}\n\nfunc main() {\n\tgo f()\n\tprintln(\"after\")\n}\n",
        );
        assert_eq!(out, "go\nafter\n");
    }

    #[test]
    fn control_flow_loops_and_switch() {
        let out = run_src(
            "package main\n\nfunc main() {\n\tsum := 0\n\tfor i := 0; i < 5; i = i + 1 {\n\t\tif i == 3 {\n\t\t\tcontinue\n\t\t}\n\t\tsum = sum + i\n\t}\n\tswitch sum {\n\tcase 7:\n\t\tprintln(\"seven\")\n\tdefault:\n\t\tprintln(\"other\")\n\t}\n}\n",
        );
        assert_eq!(out, "seven\n");
    }

    #[test]
    fn runtime_error_is_reported() {
        let out = run_src(
            "package main\n\nfunc main() {\n\ta := []int{1}\n\tprint(a[5])\n}\n",
        );
        assert_eq!(out, "panic: runtime error: index out of range\n");
    }

    #[test]
    fn infinite_loop_hits_fuel_limit() {
        let out = run_src("package main\n\nfunc main() {\n\tfor {\n\t}\n}\n");
        assert_eq!(out, "panic: runtime error: program took too long\n");
    }

    #[test]
    fn pointers_and_star() {
        let out = run_src(
            "package main\n\nfunc main() {\n\tx := 1\n\tp := &x\n\t*p = 2\n\tprint(x, *p)\n}\n",
        );
        assert_eq!(out, "22");
    }
}
