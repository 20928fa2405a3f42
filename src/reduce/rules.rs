//! The reduction rule catalog and the walk that dispatches it.
//!
//! One preorder walk over the package; each node gets the rules for its
//! category, resolver substitution first. The first accepted edit sets
//! `did_change` and every walk function unwinds immediately; the outer loop
//! then restarts the walk on the updated tree.

use super::slots::{self, NodeRef};
use super::Reducer;
use crate::parser::ast::*;

impl Reducer<'_> {
    pub(crate) fn walk_package(&mut self) {
        for i in 0..self.ast.files.len() {
            self.walk_file(FileId(i as u32));
            if self.did_change {
                return;
            }
        }
    }

    fn walk_file(&mut self, file: FileId) {
        self.cur_file = file;
        self.seed_memo();
        for decl in self.ast.files[file.index()].decls.clone() {
            self.walk_decl(decl);
            if self.did_change {
                return;
            }
        }
    }

    fn walk_decl(&mut self, decl: DeclId) {
        if self.did_change {
            return;
        }
        match self.ast.decl(decl).clone() {
            Decl::Func(_) => {
                self.rule_func_decl(decl);
                if self.did_change {
                    return;
                }
                let Decl::Func(f) = self.ast.decl(decl).clone() else { return };
                if let Some(recv) = &f.recv {
                    self.walk_expr(recv.ty);
                }
                for p in &f.params {
                    self.walk_expr(p.ty);
                }
                if let Some(result) = f.result {
                    self.walk_expr(result);
                }
                if let Some(body) = f.body {
                    self.walk_stmt(body);
                }
            }
            Decl::Gen { specs, .. } => {
                for spec in specs {
                    self.walk_spec(spec);
                    if self.did_change {
                        return;
                    }
                }
            }
        }
    }

    fn walk_spec(&mut self, spec: SpecId) {
        if self.did_change {
            return;
        }
        match self.ast.spec(spec).clone() {
            Spec::Value { ty, values, .. } => {
                self.rule_value_spec(spec);
                if self.did_change {
                    return;
                }
                if let Some(ty) = ty {
                    self.walk_expr(ty);
                }
                for v in values {
                    self.walk_expr(v);
                    if self.did_change {
                        return;
                    }
                }
            }
            Spec::Import { .. } => self.rule_import_spec(spec),
            Spec::Type { ty, .. } => self.walk_expr(ty),
        }
    }

    fn walk_stmt(&mut self, stmt: StmtId) {
        if self.did_change {
            return;
        }
        self.rule_stmt(stmt);
        if self.did_change {
            return;
        }
        match self.ast.stmt(stmt).clone() {
            Stmt::Block(list) => {
                self.rule_stmt_list(NodeRef::Stmt(stmt));
                if self.did_change {
                    return;
                }
                for s in list {
                    self.walk_stmt(s);
                    if self.did_change {
                        return;
                    }
                }
            }
            Stmt::If { init, cond, body, else_ } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                self.walk_expr(cond);
                self.walk_stmt(body);
                if let Some(else_) = else_ {
                    self.walk_stmt(else_);
                }
            }
            Stmt::Switch { init, tag, cases } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(tag) = tag {
                    self.walk_expr(tag);
                }
                for case in cases {
                    self.walk_stmt(case);
                    if self.did_change {
                        return;
                    }
                }
            }
            Stmt::Case { exprs, body, .. } => {
                for e in exprs {
                    self.walk_expr(e);
                    if self.did_change {
                        return;
                    }
                }
                self.rule_stmt_list(NodeRef::Stmt(stmt));
                if self.did_change {
                    return;
                }
                for s in body {
                    self.walk_stmt(s);
                    if self.did_change {
                        return;
                    }
                }
            }
            Stmt::For { init, cond, post, body } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond);
                }
                if let Some(post) = post {
                    self.walk_stmt(post);
                }
                self.walk_stmt(body);
            }
            Stmt::Assign { lhs, rhs, .. } => {
                for e in lhs.into_iter().chain(rhs) {
                    self.walk_expr(e);
                    if self.did_change {
                        return;
                    }
                }
            }
            Stmt::ExprStmt(e) | Stmt::Defer(e) | Stmt::Go(e) => self.walk_expr(e),
            Stmt::Return(exprs) => {
                for e in exprs {
                    self.walk_expr(e);
                    if self.did_change {
                        return;
                    }
                }
            }
            Stmt::DeclStmt(d) => self.walk_decl(d),
            Stmt::Break | Stmt::Continue => {}
        }
    }

    fn walk_expr(&mut self, expr: ExprId) {
        if self.did_change {
            return;
        }
        // Resolver substitution is tried before any other expression rule.
        if !matches!(self.ast.expr(expr), Expr::Lit(_)) {
            if let Some(val) = self.res_expr(expr) {
                if !self.res_is_self(expr, &val) {
                    let span = self.ast.expr_span(expr);
                    let new = self.materialize(val, span);
                    if self.changed_expr(expr, new) {
                        self.log_change(span, "resolved expression");
                        return;
                    }
                }
            }
        }
        self.rule_expr(expr);
        if self.did_change {
            return;
        }
        match self.ast.expr(expr).clone() {
            Expr::Ident(_) | Expr::Lit(_) | Expr::StructType => {}
            Expr::Composite { ty, elts } => {
                if let Some(ty) = ty {
                    self.walk_expr(ty);
                }
                for e in elts {
                    self.walk_expr(e);
                    if self.did_change {
                        return;
                    }
                }
            }
            Expr::Call { fun, args } => {
                self.walk_expr(fun);
                for a in args {
                    self.walk_expr(a);
                    if self.did_change {
                        return;
                    }
                }
            }
            Expr::Index { x, index } => {
                self.walk_expr(x);
                self.walk_expr(index);
            }
            Expr::Slice { x, low, high, max } => {
                self.walk_expr(x);
                for e in [low, high, max].into_iter().flatten() {
                    self.walk_expr(e);
                    if self.did_change {
                        return;
                    }
                }
            }
            Expr::Unary { x, .. } | Expr::Star(x) | Expr::Paren(x) => self.walk_expr(x),
            Expr::Binary { x, y, .. } => {
                self.walk_expr(x);
                self.walk_expr(y);
            }
            Expr::Selector { x, .. } => self.walk_expr(x),
            Expr::FuncLit { params, result, body } => {
                for p in params {
                    self.walk_expr(p.ty);
                }
                if let Some(result) = result {
                    self.walk_expr(result);
                }
                self.walk_stmt(body);
            }
            Expr::SliceType { elt } => self.walk_expr(elt),
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn rule_stmt(&mut self, stmt: StmtId) {
        match self.ast.stmt(stmt) {
            Stmt::Block(_) => self.rule_block(stmt),
            Stmt::If { .. } => self.rule_if(stmt),
            Stmt::Switch { .. } => self.rule_switch(stmt),
            Stmt::Go(_) => self.rule_go_defer(stmt, true),
            Stmt::Defer(_) => self.rule_go_defer(stmt, false),
            Stmt::ExprStmt(_) => self.rule_call_inline(stmt),
            _ => {}
        }
    }

    fn rule_expr(&mut self, expr: ExprId) {
        match self.ast.expr(expr) {
            Expr::Ident(_) => self.rule_ident(expr),
            Expr::Lit(_) => self.rule_lit(expr),
            Expr::Slice { .. } => self.rule_slice(expr),
            Expr::Composite { .. } => self.rule_composite(expr),
            Expr::Binary { .. } => self.rule_binary(expr),
            Expr::Index { .. } => self.rule_index(expr),
            Expr::Star(_) => self.rule_star(expr),
            _ => {}
        }
    }

    // ── Declaration rules ────────────────────────────────────────────

    /// Remove a var/const spec none of whose names is exported or used.
    fn rule_value_spec(&mut self, spec: SpecId) {
        let Spec::Value { names, .. } = self.ast.spec(spec).clone() else {
            return;
        };
        for &name in &names {
            if Ast::exported(self.ast.ident_name(name)) {
                return;
            }
            if let Some(&obj) = self.info.defs.get(&name) {
                if self.use_idents.get(&obj).is_some_and(|v| !v.is_empty()) {
                    return;
                }
            }
        }
        let span = self.ast.spec_span(spec);
        let NodeRef::Decl(decl) = self.parents[&NodeRef::Spec(spec)] else {
            return;
        };
        let Decl::Gen { tok, .. } = *self.ast.decl(decl) else { return };
        let undos = self.remove_spec(spec);
        if self.ok_change() {
            if tok == DeclTok::Const {
                self.log_change(span, "removed const decl");
            } else {
                self.log_change(span, "removed var decl");
            }
        } else {
            self.apply_undos(undos);
        }
    }

    /// Only explicitly-blank imports are removed directly; other imports
    /// fall out through the deferred fallbacks of deletions.
    fn rule_import_spec(&mut self, spec: SpecId) {
        let Spec::Import { name, .. } = self.ast.spec(spec).clone() else {
            return;
        };
        let Some(name) = name else { return };
        if self.ast.ident_name(name) != "_" {
            return;
        }
        let span = self.ast.spec_span(spec);
        let undos = self.remove_spec(spec);
        if self.ok_change() {
            self.log_change(span, "removed import");
        } else {
            self.apply_undos(undos);
        }
    }

    /// Strip an unused method receiver, rewriting `x.M(...)` call sites to
    /// `M(...)`.
    fn rule_func_decl(&mut self, decl: DeclId) {
        let Decl::Func(f) = self.ast.decl(decl).clone() else { return };
        let Some(recv) = f.recv.clone() else { return };
        if let Some(rname) = recv.name {
            if let Some(&obj) = self.info.defs.get(&rname) {
                if self.use_idents.get(&obj).is_some_and(|v| !v.is_empty()) {
                    return;
                }
            }
        }
        let uses = self
            .info
            .defs
            .get(&f.name)
            .and_then(|obj| self.use_idents.get(obj))
            .cloned()
            .unwrap_or_default();
        // Every use of a method is the selector of an `x.M` expression;
        // collect them all before touching anything.
        let mut sites = Vec::new();
        for use_id in uses {
            let Some(&NodeRef::Expr(sel_expr)) = self.parents.get(&NodeRef::Ident(use_id))
            else {
                return;
            };
            let Expr::Selector { x, sel } = *self.ast.expr(sel_expr) else {
                return;
            };
            if sel != use_id {
                return;
            }
            let Some(&sel_parent) = self.parents.get(&NodeRef::Expr(sel_expr)) else {
                return;
            };
            sites.push((use_id, sel_expr, sel_parent, x));
        }
        let mut rewrites = Vec::new();
        let mut deleted = Vec::new();
        for &(use_id, sel_expr, sel_parent, x) in &sites {
            let span = self.ast.expr_span(sel_expr);
            let bare = self.ast.push_expr(Expr::Ident(use_id), span);
            *slots::expr_slot(&mut self.ast, sel_parent, sel_expr) = bare;
            self.parents.insert(NodeRef::Expr(bare), sel_parent);
            self.parents.insert(NodeRef::Ident(use_id), NodeRef::Expr(bare));
            rewrites.push((use_id, sel_expr, sel_parent, bare));
            deleted.push(Some(NodeRef::Expr(x)));
        }
        self.after_delete(&deleted);
        let old_recv = {
            let Decl::Func(fd) = self.ast.decl_mut(decl) else { return };
            fd.recv.take()
        };
        if self.ok_change() {
            self.log_change(self.ast.decl_span(decl), "removed func decl receiver");
            return;
        }
        if let Decl::Func(fd) = self.ast.decl_mut(decl) {
            fd.recv = old_recv;
        }
        for (use_id, sel_expr, sel_parent, bare) in rewrites.into_iter().rev() {
            *slots::expr_slot(&mut self.ast, sel_parent, bare) = sel_expr;
            self.parents.insert(NodeRef::Ident(use_id), NodeRef::Expr(sel_expr));
        }
    }

    // ── Statement rules ──────────────────────────────────────────────

    /// For each statement in the list, try removing it, skipping the ones
    /// that would obviously break compilation and the final terminator of
    /// the list.
    fn rule_stmt_list(&mut self, owner: NodeRef) {
        let Some(list) = slots::stmt_list(&self.ast, owner) else { return };
        let orig = list.clone();
        if orig.len() == 1 {
            // removing the parent was already tried
            return;
        }
        let mut seen_terminating = false;
        for (i, &stmt) in orig.iter().enumerate() {
            match self.ast.stmt(stmt) {
                Stmt::DeclStmt(_) => continue,
                Stmt::Assign { tok: AssignTok::Define, .. } => continue,
                Stmt::ExprStmt(e) => {
                    if let Expr::Call { fun, .. } = self.ast.expr(*e) {
                        let is_panic = self
                            .ast
                            .as_ident(*fun)
                            .is_some_and(|id| self.ast.ident_name(id) == "panic");
                        if is_panic && !seen_terminating {
                            seen_terminating = true;
                            continue;
                        }
                    }
                }
                Stmt::Return(_) => {
                    if !seen_terminating {
                        seen_terminating = true;
                        continue;
                    }
                }
                _ => {}
            }
            let mut shorter = orig.clone();
            shorter.remove(i);
            *slots::stmt_list_mut(&mut self.ast, owner).unwrap() = shorter;
            self.after_delete(&[Some(NodeRef::Stmt(stmt))]);
            if self.ok_change() {
                let span = self.ast.stmt_span(stmt);
                let msg = format!("{} removed", stmt_kind(self.ast.stmt(stmt)));
                self.log_change(span, &msg);
                return;
            }
        }
        *slots::stmt_list_mut(&mut self.ast, owner).unwrap() = orig;
    }

    /// Splice a block's statements into the surrounding list.
    fn rule_block(&mut self, block: StmtId) {
        if self.parent_list_owner(block).is_none() {
            return; // e.g. a function body, cannot inline
        }
        let Stmt::Block(list) = self.ast.stmt(block).clone() else { return };
        let span = self.ast.stmt_span(block);
        let renames = self.adapt_block_names(block);
        if self.replaced_stmts(block, list) {
            self.log_change(span, "block inlined");
            return;
        }
        self.apply_undos(renames);
    }

    /// `if c { b } [else e]` → `b`, then → `e`.
    fn rule_if(&mut self, stmt: StmtId) {
        let Stmt::If { init, cond, body, else_ } = self.ast.stmt(stmt).clone() else {
            return;
        };
        let span = self.ast.stmt_span(stmt);
        if matches!(self.ast.stmt(body), Stmt::Block(l) if !l.is_empty()) {
            self.after_delete(&[
                init.map(NodeRef::Stmt),
                Some(NodeRef::Expr(cond)),
                else_.map(NodeRef::Stmt),
            ]);
            if self.changed_stmt(stmt, body) {
                self.log_change(span, "if a { b } -> b");
                return;
            }
        }
        if let Some(els) = else_ {
            if matches!(self.ast.stmt(els), Stmt::Block(l) if l.is_empty()) {
                return;
            }
            self.after_delete(&[
                init.map(NodeRef::Stmt),
                Some(NodeRef::Expr(cond)),
                Some(NodeRef::Stmt(body)),
            ]);
            if self.changed_stmt(stmt, els) {
                self.log_change(span, "if a {...} else c -> c");
            }
        }
    }

    /// A switch with a single case and no init collapses to the case body.
    fn rule_switch(&mut self, stmt: StmtId) {
        let Stmt::Switch { init, cases, .. } = self.ast.stmt(stmt).clone() else {
            return;
        };
        if init.is_some() || cases.len() != 1 {
            return;
        }
        let Stmt::Case { body, .. } = self.ast.stmt(cases[0]).clone() else {
            return;
        };
        let span = self.ast.stmt_span(cases[0]);
        if self.replaced_stmts(stmt, body) {
            self.log_change(span, "case inlined");
        }
    }

    /// `go f()` / `defer f()` → `f()`.
    fn rule_go_defer(&mut self, stmt: StmtId, is_go: bool) {
        let call = match self.ast.stmt(stmt) {
            Stmt::Go(c) | Stmt::Defer(c) => *c,
            _ => return,
        };
        let span = self.ast.stmt_span(stmt);
        let new = self.ast.push_stmt(Stmt::ExprStmt(call), span);
        if self.changed_stmt(stmt, new) {
            self.log_change(
                span,
                if is_go { "go a() -> a()" } else { "defer a() -> a()" },
            );
        }
    }

    /// An expression statement calling a parameter-less, result-less local
    /// function with no return or defer inside is replaced by its body.
    fn rule_call_inline(&mut self, stmt: StmtId) {
        let Stmt::ExprStmt(e) = *self.ast.stmt(stmt) else { return };
        let Expr::Call { fun, .. } = self.ast.expr(e).clone() else { return };
        let Some((params, result, body)) = self.func_details(fun) else {
            return;
        };
        if !params.is_empty() || result.is_some() {
            return;
        }
        let mut has_control = false;
        slots::walk_subtree(&self.ast, NodeRef::Stmt(body), &mut |n| {
            if let NodeRef::Stmt(s) = n {
                if matches!(self.ast.stmt(s), Stmt::Return(_) | Stmt::Defer(_)) {
                    has_control = true;
                }
            }
        });
        if has_control {
            return;
        }
        let span = self.ast.stmt_span(stmt);
        self.after_delete(&[Some(NodeRef::Stmt(stmt))]);
        let body = self.ast.clone_stmt(body);
        if self.changed_stmt(stmt, body) {
            self.log_change(span, "inlined call");
        }
    }

    // ── Expression rules ─────────────────────────────────────────────

    /// Inline a local identifier of primitive type used exactly once.
    fn rule_ident(&mut self, expr: ExprId) {
        let Expr::Ident(id) = *self.ast.expr(expr) else { return };
        let Some(&obj) = self.info.uses.get(&id) else {
            return; // declaration of the ident, not a use
        };
        if self.use_idents.get(&obj).map_or(0, |v| v.len()) > 1 {
            return; // used elsewhere
        }
        if !self.info.obj(obj).ty.is_basic() {
            return;
        }
        let Some(&decl_ident) = self.rev_defs.get(&obj) else { return };
        let is_var = match self.sem_parent(decl_ident) {
            Some(NodeRef::Spec(s)) => match self.parents.get(&NodeRef::Spec(s)) {
                Some(&NodeRef::Decl(d)) => {
                    !matches!(self.ast.decl(d), Decl::Gen { tok: DeclTok::Const, .. })
                }
                _ => true,
            },
            _ => true,
        };
        let Some(val) = self.decl_ident_value(decl_ident) else { return };
        let span = self.ast.expr_span(expr);
        let val = self.ast.clone_expr(val);
        self.after_delete(&[Some(NodeRef::Expr(expr))]);
        if self.changed_expr(expr, val) {
            if is_var {
                self.log_change(span, "var inlined");
            } else {
                self.log_change(span, "const inlined");
            }
        }
    }

    /// String literals shrink to `""`, integers to `0`.
    fn rule_lit(&mut self, expr: ExprId) {
        let Expr::Lit(lit) = self.ast.expr(expr).clone() else { return };
        let span = self.ast.expr_span(expr);
        let (replacement, display) = match lit.kind {
            LitKind::Str => ("\"\"", "\"\""),
            LitKind::Int => ("0", "0"),
            LitKind::Char => return,
        };
        if lit.value == replacement {
            return;
        }
        if let Expr::Lit(l) = self.ast.expr_mut(expr) {
            l.value = replacement.to_string();
        }
        if self.ok_change() {
            let mut shown = lit.value.clone();
            if shown.len() > 10 {
                let cut: String = shown.chars().take(7).collect();
                shown = match lit.kind {
                    LitKind::Str => format!("{}...\"", cut),
                    _ => format!("{}...", cut),
                };
            }
            self.log_change(span, &format!("{} -> {}", shown, display));
        } else if let Expr::Lit(l) = self.ast.expr_mut(expr) {
            l.value = lit.value;
        }
    }

    /// `a[l:h[:m]]` → `a`, then drop max, high, low in that order.
    fn rule_slice(&mut self, expr: ExprId) {
        let Expr::Slice { x, low, high, max } = *self.ast.expr(expr) else {
            return;
        };
        let span = self.ast.expr_span(expr);
        self.after_delete(&[
            low.map(NodeRef::Expr),
            high.map(NodeRef::Expr),
            max.map(NodeRef::Expr),
        ]);
        if self.changed_expr(expr, x) {
            self.log_change(span, "a[b:] -> a");
            return;
        }
        let orig_show = self.show_slice(expr);
        for field in [SliceField::Max, SliceField::High, SliceField::Low] {
            let Some(idx) = self.slice_field(expr, field) else { continue };
            self.after_delete(&[Some(NodeRef::Expr(idx))]);
            self.set_slice_field(expr, field, None);
            if self.ok_change() {
                let now = self.show_slice(expr);
                let span = self.ast.expr_span(idx);
                self.log_change(span, &format!("{} -> {}", orig_show, now));
                return;
            }
            self.set_slice_field(expr, field, Some(idx));
        }
    }

    fn slice_field(&self, expr: ExprId, field: SliceField) -> Option<ExprId> {
        let Expr::Slice { low, high, max, .. } = *self.ast.expr(expr) else {
            return None;
        };
        match field {
            SliceField::Low => low,
            SliceField::High => high,
            SliceField::Max => max,
        }
    }

    fn set_slice_field(&mut self, expr: ExprId, field: SliceField, val: Option<ExprId>) {
        let Expr::Slice { low, high, max, .. } = self.ast.expr_mut(expr) else {
            return;
        };
        match field {
            SliceField::Low => *low = val,
            SliceField::High => *high = val,
            SliceField::Max => *max = val,
        }
    }

    fn show_slice(&self, expr: ExprId) -> String {
        let Expr::Slice { low, high, max, .. } = *self.ast.expr(expr) else {
            return String::new();
        };
        let mut out = String::from("a[");
        if low.is_some() {
            out.push('l');
        }
        out.push(':');
        if high.is_some() {
            out.push('h');
        }
        if max.is_some() {
            out.push_str(":m");
        }
        out.push(']');
        out
    }

    /// Non-empty composite literal → empty one.
    fn rule_composite(&mut self, expr: ExprId) {
        let Expr::Composite { ty, elts } = self.ast.expr(expr).clone() else {
            return;
        };
        if elts.is_empty() {
            return;
        }
        let span = self.ast.expr_span(expr);
        let deleted: Vec<_> = elts.iter().map(|&e| Some(NodeRef::Expr(e))).collect();
        self.after_delete(&deleted);
        if let Expr::Composite { elts, .. } = self.ast.expr_mut(expr) {
            elts.clear();
        }
        if self.ok_change() {
            let t = match ty.map(|t| self.ast.expr(t).clone()) {
                Some(Expr::SliceType { .. }) => "[]T",
                _ => "T",
            };
            self.log_change(span, &format!("{}{{a, b}} -> {}{{}}", t, t));
        } else if let Expr::Composite { elts: e, .. } = self.ast.expr_mut(expr) {
            *e = elts;
        }
    }

    /// `a OP b` → `a`, then → `b`.
    fn rule_binary(&mut self, expr: ExprId) {
        let Expr::Binary { op, x, y } = *self.ast.expr(expr) else { return };
        let span = self.ast.expr_span(expr);
        self.after_delete(&[Some(NodeRef::Expr(y))]);
        if self.changed_expr(expr, x) {
            self.log_change(span, &format!("a {} b -> a", op));
            return;
        }
        self.after_delete(&[Some(NodeRef::Expr(x))]);
        if self.changed_expr(expr, y) {
            self.log_change(span, &format!("a {} b -> b", op));
        }
    }

    /// `a[i]` → `a`.
    fn rule_index(&mut self, expr: ExprId) {
        let Expr::Index { x, index } = *self.ast.expr(expr) else { return };
        let span = self.ast.expr_span(expr);
        self.after_delete(&[Some(NodeRef::Expr(index))]);
        if self.changed_expr(expr, x) {
            self.log_change(span, "a[b] -> a");
        }
    }

    /// `*a` → `a`.
    fn rule_star(&mut self, expr: ExprId) {
        let Expr::Star(x) = *self.ast.expr(expr) else { return };
        let span = self.ast.expr_span(expr);
        if self.changed_expr(expr, x) {
            self.log_change(span, "*a -> a");
        }
    }
}

#[derive(Clone, Copy)]
enum SliceField {
    Low,
    High,
    Max,
}

fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Block(_) => "BlockStmt",
        Stmt::If { .. } => "IfStmt",
        Stmt::Switch { .. } => "SwitchStmt",
        Stmt::Case { .. } => "CaseClause",
        Stmt::For { .. } => "ForStmt",
        Stmt::Assign { .. } => "AssignStmt",
        Stmt::ExprStmt(_) => "ExprStmt",
        Stmt::Return(_) => "ReturnStmt",
        Stmt::Defer(_) => "DeferStmt",
        Stmt::Go(_) => "GoStmt",
        Stmt::DeclStmt(_) => "DeclStmt",
        Stmt::Break | Stmt::Continue => "BranchStmt",
    }
}
