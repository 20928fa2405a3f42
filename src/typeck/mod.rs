//! Best-effort type checker.
//!
//! Two passes over the package: register every package-level name, then
//! check bodies, producing Defs/Uses keyed by identifier arena id. The
//! checker never fails — problems become [`Diag`]s and the maps stay
//! partially populated, which is all the reducer needs.

pub mod env;

use crate::diagnostics::Diag;
use crate::parser::ast::*;
use crate::span::Span;
use crate::stdlib::{self, MemberResult};
use env::{Info, Obj, ObjId, ObjKind, ScopeId, Type};
use std::collections::HashMap;

pub fn check(ast: &Ast) -> Info {
    let mut c = Checker {
        ast,
        info: Info::default(),
        universe: ScopeId(0),
        pkg_scope: ScopeId(0),
        methods: HashMap::new(),
        external: HashMap::new(),
        locals: Vec::new(),
        imports: Vec::new(),
    };
    c.universe = c.build_universe();
    c.pkg_scope = c.info.push_scope(Some(c.universe));
    c.register_package();
    for file in 0..ast.files.len() {
        c.check_file(FileId(file as u32));
    }
    c.report_unused();
    c.info
}

struct Checker<'a> {
    ast: &'a Ast,
    info: Info,
    universe: ScopeId,
    pkg_scope: ScopeId,
    /// (receiver type name, method name) → method object.
    methods: HashMap<(String, String), ObjId>,
    /// (package path, member name) → lazily created external object.
    external: HashMap<(String, String), ObjId>,
    /// Function-local variables, candidates for "declared and not used".
    locals: Vec<ObjId>,
    /// Non-blank imports, candidates for "imported and not used".
    imports: Vec<(ObjId, String, Span)>,
}

impl<'a> Checker<'a> {
    fn build_universe(&mut self) -> ScopeId {
        let scope = self.info.push_scope(None);
        let mut declare = |info: &mut Info, name: &str, kind: ObjKind, ty: Type| {
            let obj = info.push_obj(Obj {
                name: name.to_string(),
                kind,
                ty,
                local: false,
                scope,
                span: Span::dummy(),
                uses: 0,
            });
            info.scopes[scope.index()].insert(name.to_string(), obj);
        };
        for b in ["len", "append", "panic", "print", "println"] {
            declare(&mut self.info, b, ObjKind::Builtin, Type::Builtin);
        }
        declare(&mut self.info, "true", ObjKind::Const, Type::Bool);
        declare(&mut self.info, "false", ObjKind::Const, Type::Bool);
        declare(&mut self.info, "int", ObjKind::TypeName, Type::Int);
        declare(&mut self.info, "string", ObjKind::TypeName, Type::Str);
        declare(&mut self.info, "bool", ObjKind::TypeName, Type::Bool);
        scope
    }

    fn declare(
        &mut self,
        scope: ScopeId,
        name_id: IdentId,
        kind: ObjKind,
        ty: Type,
    ) -> Option<ObjId> {
        let ident = self.ast.ident(name_id);
        if ident.name == "_" {
            return None;
        }
        let obj = self.info.push_obj(Obj {
            name: ident.name.clone(),
            kind,
            ty,
            local: true,
            scope,
            span: ident.span,
            uses: 0,
        });
        self.info.scopes[scope.index()].insert(ident.name.clone(), obj);
        self.info.defs.insert(name_id, obj);
        Some(obj)
    }

    // ── Pass 1: package-level names ──────────────────────────────────

    fn register_package(&mut self) {
        for file in &self.ast.files {
            for &decl in &file.decls {
                match self.ast.decl(decl) {
                    Decl::Func(f) => self.register_func(f),
                    Decl::Gen { tok, specs } => {
                        for &spec in specs {
                            self.register_spec(*tok, spec);
                        }
                    }
                }
            }
        }
    }

    fn register_func(&mut self, f: &FuncDecl) {
        let result = f
            .result
            .map(|t| self.type_of_annotation(t))
            .unwrap_or(Type::Unit);
        let ty = Type::Func { result: Box::new(result) };
        match &f.recv {
            None => {
                self.declare(self.pkg_scope, f.name, ObjKind::Func, ty);
            }
            Some(recv) => {
                // Methods live outside the package scope; they are found
                // through their receiver type.
                let ident = self.ast.ident(f.name);
                let obj = self.info.push_obj(Obj {
                    name: ident.name.clone(),
                    kind: ObjKind::Func,
                    ty,
                    local: true,
                    scope: self.pkg_scope,
                    span: ident.span,
                    uses: 0,
                });
                self.info.defs.insert(f.name, obj);
                if let Some(tname) = self.ast.base_type_name(recv.ty) {
                    self.methods
                        .insert((tname.to_string(), ident.name.clone()), obj);
                }
            }
        }
    }

    fn register_spec(&mut self, tok: DeclTok, spec: SpecId) {
        match self.ast.spec(spec) {
            Spec::Value { names, .. } => {
                let kind = if tok == DeclTok::Const {
                    ObjKind::Const
                } else {
                    ObjKind::Var
                };
                for &name in names {
                    self.declare(self.pkg_scope, name, kind, Type::Invalid);
                }
            }
            Spec::Type { name, .. } => {
                let tname = self.ast.ident_name(*name).to_string();
                self.declare(self.pkg_scope, *name, ObjKind::TypeName, Type::Named(tname));
            }
            Spec::Import { .. } => {} // file-scoped, pass 2
        }
    }

    /// Annotation types are resolved without recording uses; pass 2 walks
    /// the same expressions again as part of the tree.
    fn type_of_annotation(&self, ty: ExprId) -> Type {
        match self.ast.expr(ty) {
            Expr::Ident(id) => match self.ast.ident_name(*id) {
                "int" => Type::Int,
                "string" => Type::Str,
                "bool" => Type::Bool,
                name => Type::Named(name.to_string()),
            },
            Expr::SliceType { elt } => Type::Slice(Box::new(self.type_of_annotation(*elt))),
            Expr::Star(inner) => Type::Ptr(Box::new(self.type_of_annotation(*inner))),
            _ => Type::Invalid,
        }
    }

    // ── Pass 2: bodies ───────────────────────────────────────────────

    fn check_file(&mut self, file: FileId) {
        let file_scope = self.info.push_scope(Some(self.pkg_scope));
        let decls = self.ast.files[file.index()].decls.clone();
        // Imports first so every body in the file sees them.
        for &decl in &decls {
            if let Decl::Gen { tok: DeclTok::Import, specs } = self.ast.decl(decl) {
                for &spec in specs {
                    self.check_import(file_scope, spec);
                }
            }
        }
        for &decl in &decls {
            match self.ast.decl(decl).clone() {
                Decl::Func(f) => self.check_func(file_scope, &f),
                Decl::Gen { tok, specs } => {
                    for spec in specs {
                        self.check_spec(file_scope, tok, spec);
                    }
                }
            }
        }
    }

    fn check_import(&mut self, file_scope: ScopeId, spec: SpecId) {
        let Spec::Import { name, path, path_span } = self.ast.spec(spec).clone() else {
            return;
        };
        if stdlib::members(&path).is_none() {
            self.info
                .diags
                .push(Diag::new(format!("cannot find package {:?}", path), path_span));
        }
        let (bind_name, name_id) = match name {
            Some(id) => (self.ast.ident_name(id).to_string(), Some(id)),
            None => (stdlib::default_name(&path).to_string(), None),
        };
        if bind_name == "_" {
            return; // blank imports bind nothing and are exempt from checks
        }
        let obj = self.info.push_obj(Obj {
            name: bind_name.clone(),
            kind: ObjKind::PkgName,
            ty: Type::Pkg(path.clone()),
            local: true,
            scope: file_scope,
            span: path_span,
            uses: 0,
        });
        self.info.scopes[file_scope.index()].insert(bind_name, obj);
        if let Some(id) = name_id {
            self.info.defs.insert(id, obj);
        }
        self.imports.push((obj, path, path_span));
    }

    fn check_spec(&mut self, scope: ScopeId, tok: DeclTok, spec: SpecId) {
        match self.ast.spec(spec).clone() {
            Spec::Value { names, ty, values } => {
                let annotated = ty.map(|t| {
                    self.check_expr(scope, t);
                    self.type_of_annotation(t)
                });
                let mut value_types = Vec::new();
                for &v in &values {
                    value_types.push(self.check_expr(scope, v));
                }
                for (i, &name) in names.iter().enumerate() {
                    let ty = annotated
                        .clone()
                        .or_else(|| value_types.get(i).cloned())
                        .unwrap_or(Type::Invalid);
                    if let Some(&obj) = self.info.defs.get(&name) {
                        self.info.objs[obj.index()].ty = ty;
                    } else if self.ast.ident_name(name) != "_" {
                        // Local spec: declare here.
                        let kind = if tok == DeclTok::Const {
                            ObjKind::Const
                        } else {
                            ObjKind::Var
                        };
                        if let Some(obj) = self.declare(scope, name, kind, ty) {
                            if kind == ObjKind::Var && scope != self.pkg_scope {
                                self.locals.push(obj);
                            }
                        }
                    }
                }
            }
            Spec::Type { name, ty } => {
                if !self.info.defs.contains_key(&name) {
                    let tname = self.ast.ident_name(name).to_string();
                    self.declare(scope, name, ObjKind::TypeName, Type::Named(tname));
                }
                // struct{} carries nothing to check.
                let _ = ty;
            }
            Spec::Import { .. } => {}
        }
    }

    fn check_func(&mut self, file_scope: ScopeId, f: &FuncDecl) {
        let scope = self.info.push_scope(Some(file_scope));
        if let Some(recv) = &f.recv {
            let ty = self.type_of_annotation(recv.ty);
            if let Some(name) = recv.name {
                self.declare(scope, name, ObjKind::Var, ty);
            }
        }
        for p in &f.params {
            let ty = self.type_of_annotation(p.ty);
            for &name in &p.names {
                self.declare(scope, name, ObjKind::Var, ty.clone());
            }
        }
        if let Some(body) = f.body {
            // The body block shares the function scope in spirit; give it a
            // child scope so shadowing works the same as in nested blocks.
            self.check_stmt(scope, body);
        }
    }

    fn check_stmt(&mut self, scope: ScopeId, stmt: StmtId) {
        match self.ast.stmt(stmt).clone() {
            Stmt::Block(list) => {
                let inner = self.info.push_scope(Some(scope));
                for s in list {
                    self.check_stmt(inner, s);
                }
            }
            Stmt::If { init, cond, body, else_ } => {
                let inner = self.info.push_scope(Some(scope));
                if let Some(init) = init {
                    self.check_stmt(inner, init);
                }
                self.check_expr(inner, cond);
                self.check_stmt(inner, body);
                if let Some(else_) = else_ {
                    self.check_stmt(inner, else_);
                }
            }
            Stmt::Switch { init, tag, cases } => {
                let inner = self.info.push_scope(Some(scope));
                if let Some(init) = init {
                    self.check_stmt(inner, init);
                }
                if let Some(tag) = tag {
                    self.check_expr(inner, tag);
                }
                for case in cases {
                    self.check_stmt(inner, case);
                }
            }
            Stmt::Case { exprs, body, .. } => {
                for e in exprs {
                    self.check_expr(scope, e);
                }
                let inner = self.info.push_scope(Some(scope));
                for s in body {
                    self.check_stmt(inner, s);
                }
            }
            Stmt::For { init, cond, post, body } => {
                let inner = self.info.push_scope(Some(scope));
                if let Some(init) = init {
                    self.check_stmt(inner, init);
                }
                if let Some(cond) = cond {
                    self.check_expr(inner, cond);
                }
                if let Some(post) = post {
                    self.check_stmt(inner, post);
                }
                self.check_stmt(inner, body);
            }
            Stmt::Assign { lhs, rhs, tok } => {
                let mut rhs_types = Vec::new();
                for &r in &rhs {
                    rhs_types.push(self.check_expr(scope, r));
                }
                match tok {
                    AssignTok::Define => {
                        for (i, &l) in lhs.iter().enumerate() {
                            let Some(id) = self.ast.as_ident(l) else {
                                self.info.diags.push(Diag::new(
                                    "non-name on left side of :=",
                                    self.ast.expr_span(l),
                                ));
                                continue;
                            };
                            let ty = rhs_types.get(i).cloned().unwrap_or(Type::Invalid);
                            if let Some(obj) = self.declare(scope, id, ObjKind::Var, ty) {
                                self.locals.push(obj);
                            }
                        }
                    }
                    AssignTok::Assign => {
                        for &l in &lhs {
                            self.check_expr(scope, l);
                        }
                    }
                }
            }
            Stmt::ExprStmt(e) => {
                self.check_expr(scope, e);
            }
            Stmt::Return(exprs) => {
                for e in exprs {
                    self.check_expr(scope, e);
                }
            }
            Stmt::Defer(e) | Stmt::Go(e) => {
                self.check_expr(scope, e);
            }
            Stmt::DeclStmt(d) => match self.ast.decl(d).clone() {
                Decl::Gen { tok, specs } => {
                    for spec in specs {
                        self.check_spec(scope, tok, spec);
                    }
                }
                Decl::Func(_) => {}
            },
            Stmt::Break | Stmt::Continue => {}
        }
    }

    fn check_expr(&mut self, scope: ScopeId, expr: ExprId) -> Type {
        match self.ast.expr(expr).clone() {
            Expr::Ident(id) => self.resolve_ident(scope, id),
            Expr::Lit(lit) => match lit.kind {
                LitKind::Int => Type::Int,
                LitKind::Str => Type::Str,
                LitKind::Char => Type::Char,
            },
            Expr::Composite { ty, elts } => {
                for e in elts {
                    self.check_expr(scope, e);
                }
                match ty {
                    Some(t) => {
                        self.check_expr(scope, t);
                        self.type_of_annotation(t)
                    }
                    None => Type::Invalid,
                }
            }
            Expr::Call { fun, args } => {
                let mut arg_types = Vec::new();
                for &a in &args {
                    arg_types.push(self.check_expr(scope, a));
                }
                let fun_ty = self.check_expr(scope, fun);
                match fun_ty {
                    Type::Builtin => {
                        let name = self
                            .ast
                            .as_ident(fun)
                            .map(|id| self.ast.ident_name(id))
                            .unwrap_or("");
                        match name {
                            "len" => Type::Int,
                            "append" => arg_types.first().cloned().unwrap_or(Type::Invalid),
                            _ => Type::Unit,
                        }
                    }
                    Type::Func { result } => *result,
                    _ => Type::Invalid,
                }
            }
            Expr::Index { x, index } => {
                self.check_expr(scope, index);
                match self.check_expr(scope, x) {
                    Type::Slice(elt) => *elt,
                    Type::Str => Type::Char,
                    _ => Type::Invalid,
                }
            }
            Expr::Slice { x, low, high, max } => {
                for e in [low, high, max].into_iter().flatten() {
                    self.check_expr(scope, e);
                }
                self.check_expr(scope, x)
            }
            Expr::Unary { op, x } => {
                let tx = self.check_expr(scope, x);
                match op {
                    UnaryOp::Not => Type::Bool,
                    UnaryOp::Amp => Type::Ptr(Box::new(tx)),
                    UnaryOp::Plus | UnaryOp::Minus => tx,
                }
            }
            Expr::Binary { op, x, y } => {
                let tx = self.check_expr(scope, x);
                self.check_expr(scope, y);
                match op {
                    BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Lt
                    | BinOp::Le
                    | BinOp::Gt
                    | BinOp::Ge
                    | BinOp::And
                    | BinOp::Or => Type::Bool,
                    _ => tx,
                }
            }
            Expr::Star(x) => match self.check_expr(scope, x) {
                Type::Ptr(inner) => *inner,
                _ => Type::Invalid,
            },
            Expr::Paren(x) => self.check_expr(scope, x),
            Expr::Selector { x, sel } => self.check_selector(scope, x, sel),
            Expr::FuncLit { params, result, body } => {
                let inner = self.info.push_scope(Some(scope));
                for p in &params {
                    let ty = self.type_of_annotation(p.ty);
                    for &name in &p.names {
                        self.declare(inner, name, ObjKind::Var, ty.clone());
                    }
                }
                self.check_stmt(inner, body);
                let result = result
                    .map(|t| self.type_of_annotation(t))
                    .unwrap_or(Type::Unit);
                Type::Func { result: Box::new(result) }
            }
            Expr::SliceType { elt } => {
                self.check_expr(scope, elt);
                Type::Invalid
            }
            Expr::StructType => Type::Invalid,
        }
    }

    fn resolve_ident(&mut self, scope: ScopeId, id: IdentId) -> Type {
        let ident = self.ast.ident(id);
        if ident.name == "_" {
            return Type::Invalid;
        }
        match self.info.lookup_chain(scope, &ident.name) {
            Some(obj) => {
                self.info.uses.insert(id, obj);
                self.info.objs[obj.index()].uses += 1;
                self.info.obj(obj).ty.clone()
            }
            None => {
                self.info
                    .diags
                    .push(Diag::new(format!("undefined: {}", ident.name), ident.span));
                Type::Invalid
            }
        }
    }

    fn check_selector(&mut self, scope: ScopeId, x: ExprId, sel: IdentId) -> Type {
        // Package member?
        if let Some(xid) = self.ast.as_ident(x) {
            let name = self.ast.ident_name(xid).to_string();
            if let Some(obj) = self.info.lookup_chain(scope, &name) {
                if let Type::Pkg(path) = self.info.obj(obj).ty.clone() {
                    self.info.uses.insert(xid, obj);
                    self.info.objs[obj.index()].uses += 1;
                    return self.resolve_member(path, sel);
                }
            }
        }
        // Method on a named type.
        let tx = self.check_expr(scope, x);
        let base = match &tx {
            Type::Named(n) => Some(n.clone()),
            Type::Ptr(inner) => match inner.as_ref() {
                Type::Named(n) => Some(n.clone()),
                _ => None,
            },
            _ => None,
        };
        let sel_name = self.ast.ident_name(sel).to_string();
        if let Some(base) = base {
            if let Some(&obj) = self.methods.get(&(base.clone(), sel_name.clone())) {
                self.info.uses.insert(sel, obj);
                self.info.objs[obj.index()].uses += 1;
                return self.info.obj(obj).ty.clone();
            }
            let span = self.ast.ident(sel).span;
            self.info.diags.push(Diag::new(
                format!("{}.{} undefined (type {} has no method {})", base, sel_name, base, sel_name),
                span,
            ));
        }
        Type::Invalid
    }

    fn resolve_member(&mut self, path: String, sel: IdentId) -> Type {
        let sel_name = self.ast.ident_name(sel).to_string();
        match stdlib::lookup(&path, &sel_name) {
            Some(member) => {
                let key = (path.clone(), sel_name.clone());
                let obj = *self.external.entry(key).or_insert_with(|| {
                    let result = match member.result {
                        MemberResult::Unit => Type::Unit,
                        MemberResult::Str => Type::Str,
                    };
                    self.info.push_obj(Obj {
                        name: sel_name.clone(),
                        kind: ObjKind::Func,
                        ty: Type::Func { result: Box::new(result) },
                        local: false,
                        scope: self.universe,
                        span: Span::dummy(),
                        uses: 0,
                    })
                });
                self.info.uses.insert(sel, obj);
                self.info.objs[obj.index()].uses += 1;
                self.info.obj(obj).ty.clone()
            }
            None => {
                let span = self.ast.ident(sel).span;
                self.info
                    .diags
                    .push(Diag::new(format!("undefined: {}.{}", path, sel_name), span));
                Type::Invalid
            }
        }
    }

    fn report_unused(&mut self) {
        for &obj in &self.locals {
            let o = self.info.obj(obj);
            if o.uses == 0 {
                self.info.diags.push(Diag::soft(
                    format!("declared and not used: {}", o.name),
                    o.span,
                ));
            }
        }
        for (obj, path, span) in &self.imports {
            if self.info.obj(*obj).uses == 0 {
                self.info.diags.push(Diag::soft(
                    format!("imported and not used: {:?}", path),
                    *span,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::Path;

    fn check_src(src: &str) -> (Ast, Info) {
        let mut ast = Ast::new();
        parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        let info = check(&ast);
        (ast, info)
    }

    fn diag_msgs(info: &Info) -> Vec<&str> {
        info.diags.iter().map(|d| d.msg.as_str()).collect()
    }

    #[test]
    fn clean_program_has_no_diags() {
        let (_, info) = check_src(
            "package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k + 1)\n}\n",
        );
        assert!(info.diags.is_empty(), "{:?}", info.diags);
    }

    #[test]
    fn defs_and_uses_are_keyed_by_ident() {
        let (ast, info) = check_src(
            "package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k + 1)\n}\n",
        );
        let k_def = info
            .defs
            .iter()
            .find(|(&id, _)| ast.ident_name(id) == "k")
            .map(|(_, &obj)| obj)
            .unwrap();
        let k_uses: Vec<_> = info
            .uses
            .iter()
            .filter(|(_, &obj)| obj == k_def)
            .collect();
        assert_eq!(k_uses.len(), 1);
        assert_eq!(info.obj(k_def).ty, Type::Int);
        assert!(info.obj(k_def).ty.is_basic());
    }

    #[test]
    fn unused_local_is_soft_diag() {
        let (_, info) =
            check_src("package main\n\nfunc main() {\n\tx := 1\n}\n");
        let diags = diag_msgs(&info);
        assert_eq!(diags, vec!["declared and not used: x"]);
        assert!(info.diags[0].soft);
    }

    #[test]
    fn unused_import_is_soft_diag() {
        let (_, info) = check_src(
            "package main\n\nimport \"strings\"\n\nfunc main() {\n}\n",
        );
        assert_eq!(diag_msgs(&info), vec!["imported and not used: \"strings\""]);
    }

    #[test]
    fn blank_import_is_exempt() {
        let (_, info) = check_src(
            "package main\n\nimport _ \"strings\"\n\nfunc main() {\n}\n",
        );
        assert!(info.diags.is_empty(), "{:?}", info.diags);
    }

    #[test]
    fn undefined_name_is_hard_diag() {
        let (_, info) = check_src("package main\n\nfunc main() {\n\tprint(y)\n}\n");
        assert_eq!(diag_msgs(&info), vec!["undefined: y"]);
        assert!(!info.diags[0].soft);
    }

    #[test]
    fn method_uses_are_recorded_on_selector() {
        let (ast, info) = check_src(
            "package main\n\ntype T struct{}\n\nfunc (t T) M() {\n}\n\nfunc main() {\n\tx := T{}\n\tx.M()\n}\n",
        );
        assert!(info.diags.is_empty(), "{:?}", info.diags);
        let m_def = info
            .defs
            .iter()
            .find(|(&id, _)| ast.ident_name(id) == "M")
            .map(|(_, &obj)| obj)
            .unwrap();
        let m_uses = info.uses.values().filter(|&&o| o == m_def).count();
        assert_eq!(m_uses, 1);
    }

    #[test]
    fn package_members_resolve_through_registry() {
        let (_, info) = check_src(
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
        );
        assert!(info.diags.is_empty(), "{:?}", info.diags);
    }

    #[test]
    fn unknown_member_is_diagnosed() {
        let (_, info) = check_src(
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Nope()\n}\n",
        );
        assert_eq!(diag_msgs(&info), vec!["undefined: fmt.Nope"]);
    }
}
