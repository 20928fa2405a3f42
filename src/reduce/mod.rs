//! The speculative AST-rewriting engine.
//!
//! The outer loop re-type-checks the working tree, walks it proposing local
//! rewrites from the rule catalog, and commits exactly those candidates the
//! external predicate still matches. Rules mutate in place and record undo
//! commands; the candidate driver serializes the current file to its temp
//! file, deduplicates against the memo of already-tried texts, and runs the
//! predicate. One accepted edit aborts the walk and the loop starts over,
//! until a full walk accepts nothing.

mod resolve;
mod rules;
mod slots;

use crate::diagnostics::ReduceError;
use crate::parser::ast::*;
use crate::parser::{self, SourceFile};
use crate::pretty::{self, Mode};
use crate::runner::Runner;
use crate::span::Span;
use crate::stdlib;
use crate::typeck::{
    self,
    env::{Info, ObjId, ObjKind, Type},
};
use regex::bytes::Regex;
use slots::{NodeRef, Undo};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct ReduceOptions {
    pub dir: PathBuf,
    pub match_re: String,
    pub cmd: Option<String>,
    pub verbose: bool,
}

/// Reduce the package in `opts.dir` in place. On success the input files
/// are overwritten with the smallest accepted program; if no candidate was
/// ever accepted the inputs are left untouched and
/// [`ReduceError::NoReduction`] is returned.
pub fn reduce(opts: &ReduceOptions, log_out: &mut dyn Write) -> Result<(), ReduceError> {
    let tmp_dir = tempfile::Builder::new().prefix("minoreduce").tempdir()?;
    let match_re = Regex::new(&opts.match_re)?;
    let (ast, sources, _pkg) = parser::load_dir(&opts.dir)?;
    let runner = match &opts.cmd {
        Some(cmd) if !cmd.is_empty() => Runner::Shell(cmd.clone()),
        _ => Runner::Tool,
    };

    let mut r = Reducer {
        ast,
        sources,
        info: Info::default(),
        rev_defs: HashMap::new(),
        use_idents: HashMap::new(),
        parents: HashMap::new(),
        tried: HashSet::with_capacity(16),
        dst_buf: String::new(),
        tmp_dir,
        tmp_files: Vec::new(),
        temp_stale: None,
        tries: 0,
        did_change: false,
        delete_keep_underscore: None,
        delete_keep_unchanged: None,
        cur_file: FileId(0),
        match_re,
        runner,
        verbose: opts.verbose,
        log_out,
    };

    r.create_temp_files()?;
    // The predicate must match before any change is attempted.
    r.check_run()?;
    r.parents = slots::fill_parents(&r.ast);
    if !r.reduce_loop() {
        return Err(ReduceError::NoReduction);
    }
    for i in 0..r.sources.len() {
        let text = pretty::file_to_string(&r.ast, FileId(i as u32), Mode::Formatted);
        fs::write(&r.sources[i].path, text)?;
    }
    Ok(())
}

pub(crate) struct Reducer<'a> {
    pub(crate) ast: Ast,
    sources: Vec<SourceFile>,
    pub(crate) info: Info,
    /// Object → its defining identifier.
    pub(crate) rev_defs: HashMap<ObjId, IdentId>,
    /// Object → its use-site identifiers, restricted to package-local objects.
    pub(crate) use_idents: HashMap<ObjId, Vec<IdentId>>,
    pub(crate) parents: HashMap<NodeRef, NodeRef>,
    tried: HashSet<String>,
    dst_buf: String,
    tmp_dir: TempDir,
    tmp_files: Vec<fs::File>,
    /// File whose temp copy still holds a rejected candidate.
    temp_stale: Option<FileId>,
    tries: usize,
    pub(crate) did_change: bool,
    delete_keep_underscore: Option<Vec<Undo>>,
    delete_keep_unchanged: Option<Vec<Undo>>,
    pub(crate) cur_file: FileId,
    match_re: Regex,
    runner: Runner,
    verbose: bool,
    log_out: &'a mut dyn Write,
}

impl<'a> Reducer<'a> {
    fn create_temp_files(&mut self) -> Result<(), ReduceError> {
        for i in 0..self.sources.len() {
            let file = FileId(i as u32);
            let name = self.sources[i]
                .path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| format!("file{}.mino", i).into());
            let tpath = self.tmp_dir.path().join(name);
            let f = fs::File::create(tpath)?;
            self.tmp_files.push(f);
            let mut buf = std::mem::take(&mut self.dst_buf);
            pretty::print_file(&self.ast, file, Mode::Raw, &mut buf);
            let res = self.write_temp(file, &buf);
            self.dst_buf = buf;
            res?;
        }
        Ok(())
    }

    fn write_temp(&mut self, file: FileId, text: &str) -> std::io::Result<()> {
        let f = &mut self.tmp_files[file.index()];
        f.seek(SeekFrom::Start(0))?;
        f.set_len(0)?;
        f.write_all(text.as_bytes())
    }

    fn run_cmd(&mut self) -> Vec<u8> {
        self.runner.run(self.tmp_dir.path())
    }

    fn check_run(&mut self) -> Result<(), ReduceError> {
        let out = self.run_cmd();
        if out.is_empty() {
            return Err(ReduceError::NoError);
        }
        if !self.match_re.is_match(&out) {
            return Err(ReduceError::NoMatch(
                String::from_utf8_lossy(&out).into_owned(),
            ));
        }
        Ok(())
    }

    // ── Candidate driver ─────────────────────────────────────────────

    /// Serialize the current file, dedup against the memo, write the temp
    /// file and run the predicate. Any I/O failure is a rejection.
    pub(crate) fn ok_change_no_undo(&mut self) -> bool {
        if self.did_change {
            return false;
        }
        // A rejected candidate for another file may still sit in its temp
        // file; restore it from the (already reverted) tree first. A stale
        // copy of the current file is simply overwritten below.
        if let Some(stale) = self.temp_stale {
            if stale != self.cur_file {
                let text = pretty::file_to_string(&self.ast, stale, Mode::Raw);
                if self.write_temp(stale, &text).is_err() {
                    return false;
                }
                self.temp_stale = None;
            }
        }
        let mut buf = std::mem::take(&mut self.dst_buf);
        pretty::print_file(&self.ast, self.cur_file, Mode::Raw, &mut buf);
        if self.tried.contains(&buf) {
            self.dst_buf = buf;
            return false;
        }
        self.tried.insert(buf.clone());
        self.tries += 1;
        let write_ok = self.write_temp(self.cur_file, &buf).is_ok();
        self.dst_buf = buf;
        // Until this candidate is accepted, the temp file disagrees with
        // the (about to be reverted) tree.
        self.temp_stale = Some(self.cur_file);
        if !write_ok {
            return false;
        }
        let out = self.run_cmd();
        if !self.match_re.is_match(&out) {
            return false;
        }
        self.did_change = true;
        self.temp_stale = None;
        true
    }

    /// The three-step cascade: primary edit, then keep-as-underscore, then
    /// keep-unchanged. Fallbacks are cleared on the first acceptance.
    pub(crate) fn ok_change(&mut self) -> bool {
        if self.ok_change_no_undo() {
            self.delete_keep_underscore = None;
            self.delete_keep_unchanged = None;
            return true;
        }
        if let Some(ops) = self.delete_keep_underscore.take() {
            self.apply_undos(ops);
            return self.ok_change();
        }
        if let Some(ops) = self.delete_keep_unchanged.take() {
            self.apply_undos(ops);
        }
        false
    }

    pub(crate) fn apply_undos(&mut self, ops: Vec<Undo>) {
        for op in ops.into_iter().rev() {
            self.apply_undo(op);
        }
    }

    fn apply_undo(&mut self, op: Undo) {
        match op {
            Undo::ExprSlot { parent, now, was } => {
                *slots::expr_slot(&mut self.ast, parent, now) = was;
            }
            Undo::StmtList { owner, was } => {
                if let Some(list) = slots::stmt_list_mut(&mut self.ast, owner) {
                    *list = was;
                }
            }
            Undo::Specs { decl, was } => {
                if let Decl::Gen { specs, .. } = self.ast.decl_mut(decl) {
                    *specs = was;
                }
            }
            Undo::FileDecls { file, was } => {
                self.ast.files[file.index()].decls = was;
            }
            Undo::Rename { ident, was } => {
                self.ast.idents[ident.index()].name = was;
            }
            Undo::RefixAssign { ident } => {
                self.fix_assign_tok_parent(ident);
            }
            Undo::ImportName { spec, was } => {
                if let Spec::Import { name, .. } = self.ast.spec_mut(spec) {
                    *name = was;
                }
            }
            Undo::StmtPayload { stmt, was } => {
                *self.ast.stmt_mut(stmt) = was;
            }
        }
    }

    // ── Outer loop ───────────────────────────────────────────────────

    fn reduce_loop(&mut self) -> bool {
        let mut any_changes = false;
        loop {
            // Type info is rebuilt after every accepted walk; diagnostics
            // are ignored, the predicate rejects broken programs anyway.
            self.info = typeck::check(&self.ast);
            self.fill_objs();
            self.did_change = false;
            self.walk_package();
            if !self.did_change {
                if self.verbose {
                    let _ = writeln!(self.log_out, "gave up after {} final tries", self.tries);
                }
                return any_changes;
            }
            any_changes = true;
        }
    }

    fn fill_objs(&mut self) {
        self.rev_defs = self
            .info
            .defs
            .iter()
            .map(|(&id, &obj)| (obj, id))
            .collect();
        self.use_idents.clear();
        for (&id, &obj) in &self.info.uses {
            if !self.info.obj(obj).local {
                // builtin or declared outside this package
                continue;
            }
            self.use_idents.entry(obj).or_default().push(id);
        }
        // Hash maps iterate in arbitrary order; keep candidate order stable.
        for uses in self.use_idents.values_mut() {
            uses.sort_by_key(|id| id.0);
        }
    }

    pub(crate) fn log_change(&mut self, span: Span, msg: &str) {
        if self.verbose {
            let src = &self.sources[span.file_id as usize];
            let line = src.lines.line(span.start);
            let times = if self.tries == 1 {
                "first try".to_string()
            } else {
                format!("{} tries", self.tries)
            };
            let _ = writeln!(
                self.log_out,
                "{}:{}: {} ({})",
                src.path.display(),
                line,
                msg,
                times
            );
        }
        self.tries = 0;
    }

    /// Seed the memo with the file's current text so the identity program
    /// is never proposed.
    pub(crate) fn seed_memo(&mut self) {
        let mut buf = std::mem::take(&mut self.dst_buf);
        pretty::print_file(&self.ast, self.cur_file, Mode::Raw, &mut buf);
        self.tried.insert(buf.clone());
        self.dst_buf = buf;
    }

    // ── Speculative replacement ──────────────────────────────────────

    /// Replace expression `orig` by `new` in its parent slot; commit or
    /// revert based on the predicate.
    pub(crate) fn changed_expr(&mut self, orig: ExprId, new: ExprId) -> bool {
        let parent = self.parents[&NodeRef::Expr(orig)];
        *slots::expr_slot(&mut self.ast, parent, orig) = new;
        if self.ok_change() {
            slots::register_subtree(&self.ast, NodeRef::Expr(new), parent, &mut self.parents);
            return true;
        }
        *slots::expr_slot(&mut self.ast, parent, new) = orig;
        false
    }

    /// Replace statement `orig` by `new`. When `new` is a block and `orig`
    /// sits in a statement list, try splicing the block's statements first.
    pub(crate) fn changed_stmt(&mut self, orig: StmtId, new: StmtId) -> bool {
        if let Stmt::Block(list) = self.ast.stmt(new).clone() {
            let renames = self.adapt_block_names(new);
            if self.replaced_stmts(orig, list) {
                return true;
            }
            self.apply_undos(renames);
        }
        let parent = self.parents[&NodeRef::Stmt(orig)];
        *slots::stmt_slot(&mut self.ast, parent, orig) = new;
        if self.ok_change() {
            slots::register_subtree(&self.ast, NodeRef::Stmt(new), parent, &mut self.parents);
            return true;
        }
        *slots::stmt_slot(&mut self.ast, parent, new) = orig;
        false
    }

    /// The statement list `stmt` lives in, when its parent is a list
    /// context (block or case arm); a function body is not spliceable.
    pub(crate) fn parent_list_owner(&self, stmt: StmtId) -> Option<NodeRef> {
        let owner = *self.parents.get(&NodeRef::Stmt(stmt))?;
        slots::stmt_list(&self.ast, owner).map(|_| owner)
    }

    /// Splice `with` in place of `old` in its parent list, without asking
    /// the predicate.
    fn replace_stmts_ops(&mut self, old: StmtId, with: Vec<StmtId>) -> Vec<Undo> {
        let Some(owner) = self.parent_list_owner(old) else {
            return Vec::new();
        };
        let list = slots::stmt_list_mut(&mut self.ast, owner).unwrap();
        let was = list.clone();
        let Some(pos) = list.iter().position(|&s| s == old) else {
            return Vec::new();
        };
        list.splice(pos..pos + 1, with);
        vec![Undo::StmtList { owner, was }]
    }

    /// Splice and run the predicate; on acceptance re-parent the spliced
    /// statements.
    pub(crate) fn replaced_stmts(&mut self, old: StmtId, with: Vec<StmtId>) -> bool {
        let Some(owner) = self.parent_list_owner(old) else {
            return false;
        };
        let ops = self.replace_stmts_ops(old, with.clone());
        if ops.is_empty() {
            return false;
        }
        if self.ok_change() {
            for &s in &with {
                slots::register_subtree(&self.ast, NodeRef::Stmt(s), owner, &mut self.parents);
            }
            return true;
        }
        self.apply_undos(ops);
        false
    }

    // ── Name-level helpers ───────────────────────────────────────────

    /// Parent of an identifier, skipping the wrapping identifier
    /// expression so declaration sites report their spec or statement.
    pub(crate) fn sem_parent(&self, ident: IdentId) -> Option<NodeRef> {
        let p = *self.parents.get(&NodeRef::Ident(ident))?;
        if let NodeRef::Expr(e) = p {
            if matches!(self.ast.expr(e), Expr::Ident(i) if *i == ident) {
                return self.parents.get(&NodeRef::Expr(e)).copied();
            }
        }
        Some(p)
    }

    /// The initializer expression of a declared identifier: the matching
    /// value in its value-spec or the matching rhs of its `:=`.
    pub(crate) fn decl_ident_value(&self, ident: IdentId) -> Option<ExprId> {
        match self.sem_parent(ident)? {
            NodeRef::Spec(s) => {
                let Spec::Value { names, values, .. } = self.ast.spec(s) else {
                    return None;
                };
                let i = names.iter().position(|&n| n == ident)?;
                values.get(i).copied()
            }
            NodeRef::Stmt(a) => {
                let Stmt::Assign { lhs, rhs, .. } = self.ast.stmt(a) else {
                    return None;
                };
                let i = lhs
                    .iter()
                    .position(|&l| self.ast.as_ident(l) == Some(ident))?;
                rhs.get(i).copied()
            }
            _ => None,
        }
    }

    /// Signature and body of the callee, when it is a function literal or
    /// an identifier bound to a function declared in this package.
    pub(crate) fn func_details(
        &self,
        fun: ExprId,
    ) -> Option<(Vec<Param>, Option<ExprId>, StmtId)> {
        match self.ast.expr(fun).clone() {
            Expr::FuncLit { params, result, body } => Some((params, result, body)),
            Expr::Ident(id) => {
                let obj = *self.info.uses.get(&id)?;
                if !self.info.obj(obj).local {
                    return None;
                }
                let decl_ident = *self.rev_defs.get(&obj)?;
                match self.sem_parent(decl_ident)? {
                    NodeRef::Decl(d) => {
                        let Decl::Func(f) = self.ast.decl(d) else { return None };
                        Some((f.params.clone(), f.result, f.body?))
                    }
                    _ => {
                        let val = self.decl_ident_value(decl_ident)?;
                        let Expr::FuncLit { params, result, body } =
                            self.ast.expr(val).clone()
                        else {
                            return None;
                        };
                        Some((params, result, body))
                    }
                }
            }
            _ => None,
        }
    }

    pub(crate) fn fix_assign_tok(&mut self, stmt: StmtId) {
        let Stmt::Assign { lhs, .. } = self.ast.stmt(stmt).clone() else {
            return;
        };
        let mut new_tok = AssignTok::Assign;
        for l in lhs {
            let Some(id) = self.ast.as_ident(l) else { continue };
            if self.ast.ident_name(id) == "_" {
                continue;
            }
            if self.info.defs.contains_key(&id) {
                new_tok = AssignTok::Define;
                break;
            }
        }
        if let Stmt::Assign { tok, .. } = self.ast.stmt_mut(stmt) {
            *tok = new_tok;
        }
    }

    pub(crate) fn fix_assign_tok_parent(&mut self, ident: IdentId) {
        if let Some(NodeRef::Stmt(a)) = self.sem_parent(ident) {
            if matches!(self.ast.stmt(a), Stmt::Assign { .. }) {
                self.fix_assign_tok(a);
            }
        }
    }

    // ── Structural removal ───────────────────────────────────────────

    /// Remove `spec` from its group; when the group becomes empty, remove
    /// the whole declaration from its statement list or file.
    pub(crate) fn remove_spec(&mut self, spec: SpecId) -> Vec<Undo> {
        let NodeRef::Decl(decl) = self.parents[&NodeRef::Spec(spec)] else {
            panic!("spec parent is not a declaration");
        };
        let Decl::Gen { specs, .. } = self.ast.decl_mut(decl) else {
            panic!("spec parent is not a declaration group");
        };
        let was = specs.clone();
        specs.retain(|&s| s != spec);
        let now_empty = specs.is_empty();
        let mut undos = vec![Undo::Specs { decl, was }];
        if now_empty {
            match self.parents.get(&NodeRef::Decl(decl)).copied() {
                Some(NodeRef::Stmt(ds)) => {
                    undos.extend(self.replace_stmts_ops(ds, Vec::new()));
                }
                Some(NodeRef::File(file)) => {
                    let decls = &mut self.ast.files[file.index()].decls;
                    let was = decls.clone();
                    decls.retain(|&d| d != decl);
                    undos.push(Undo::FileDecls { file, was });
                }
                _ => {}
            }
        }
        undos
    }

    /// Remove the declaration of a (now-dead) name: its value spec, or its
    /// column of a multi-assignment. Parameter-like declarations are left
    /// alone (the rename to `_` already happened).
    pub(crate) fn remove_decl(&mut self, decl_ident: IdentId) -> Vec<Undo> {
        match self.sem_parent(decl_ident) {
            Some(NodeRef::Spec(s)) => self.remove_spec(s),
            Some(NodeRef::Stmt(a)) if matches!(self.ast.stmt(a), Stmt::Assign { .. }) => {
                let Stmt::Assign { lhs, rhs, tok } = self.ast.stmt(a).clone() else {
                    return Vec::new();
                };
                if lhs.len() != rhs.len() {
                    return Vec::new();
                }
                if lhs.len() == 1 {
                    return self.replace_stmts_ops(a, Vec::new());
                }
                let Some(i) = lhs
                    .iter()
                    .position(|&l| self.ast.as_ident(l) == Some(decl_ident))
                else {
                    return Vec::new();
                };
                let was = Stmt::Assign { lhs: lhs.clone(), rhs: rhs.clone(), tok };
                let mut lhs = lhs;
                let mut rhs = rhs;
                lhs.remove(i);
                rhs.remove(i);
                *self.ast.stmt_mut(a) = Stmt::Assign { lhs, rhs, tok };
                self.fix_assign_tok(a);
                vec![Undo::StmtPayload { stmt: a, was }]
            }
            _ => Vec::new(),
        }
    }

    // ── Deferred fallbacks ───────────────────────────────────────────

    /// Called before an edit deletes `nodes`: find objects whose remaining
    /// uses all sit inside the deleted subtrees, rename their declarations
    /// to `_` and remove them outright, and arm the two fallback stages
    /// (undo removals only; additionally restore names).
    pub(crate) fn after_delete(&mut self, nodes: &[Option<NodeRef>]) {
        let objs = self.unused_after_delete(nodes);
        let mut removal_undos: Vec<Undo> = Vec::new();
        let mut restore_ops: Vec<Undo> = Vec::new();
        for obj in objs {
            match self.info.obj(obj).kind {
                ObjKind::PkgName => {
                    let obj_name = self.info.obj(obj).name.clone();
                    let Type::Pkg(path) = self.info.obj(obj).ty.clone() else {
                        continue;
                    };
                    // An import named like its package reads as unnamed.
                    let expected = if stdlib::default_name(&path) == obj_name {
                        None
                    } else {
                        Some(obj_name)
                    };
                    let Some(spec) = self.find_import_spec(expected.as_deref(), &path)
                    else {
                        continue;
                    };
                    let Spec::Import { name, path_span, .. } = self.ast.spec(spec).clone()
                    else {
                        continue;
                    };
                    let blank = self.ast.push_ident("_", path_span);
                    if let Spec::Import { name: n, .. } = self.ast.spec_mut(spec) {
                        *n = Some(blank);
                    }
                    restore_ops.push(Undo::ImportName { spec, was: name });
                    removal_undos.extend(self.remove_spec(spec));
                }
                ObjKind::Var => {
                    let Some(&decl_ident) = self.rev_defs.get(&obj) else {
                        continue;
                    };
                    let was = self.ast.ident_name(decl_ident).to_string();
                    // Reversed replay runs these back-to-front: name first,
                    // then the := / = fixup recomputed from it.
                    restore_ops.push(Undo::RefixAssign { ident: decl_ident });
                    restore_ops.push(Undo::Rename { ident: decl_ident, was });
                    self.ast.idents[decl_ident.index()].name = "_".to_string();
                    self.fix_assign_tok_parent(decl_ident);
                    removal_undos.extend(self.remove_decl(decl_ident));
                }
                _ => {}
            }
        }
        if !removal_undos.is_empty() {
            self.delete_keep_underscore = Some(removal_undos);
        }
        if !restore_ops.is_empty() {
            self.delete_keep_unchanged = Some(restore_ops);
        }
    }

    /// Objects whose entire remaining use count lies within `nodes`.
    fn unused_after_delete(&self, nodes: &[Option<NodeRef>]) -> Vec<ObjId> {
        let mut remaining: HashMap<ObjId, usize> = HashMap::new();
        let mut objs = Vec::new();
        for node in nodes.iter().flatten() {
            for ident in slots::idents_in(&self.ast, *node) {
                let Some(&obj) = self.info.uses.get(&ident) else {
                    continue;
                };
                if let Some(num) = remaining.get_mut(&obj) {
                    if *num == 1 {
                        objs.push(obj);
                    }
                    *num -= 1;
                } else if let Some(ids) = self.use_idents.get(&obj) {
                    if ids.len() == 1 {
                        objs.push(obj);
                    } else {
                        remaining.insert(obj, ids.len() - 1);
                    }
                }
            }
        }
        objs
    }

    fn find_import_spec(&self, expected_name: Option<&str>, path: &str) -> Option<SpecId> {
        let file = &self.ast.files[self.cur_file.index()];
        for &decl in &file.decls {
            let Decl::Gen { tok: DeclTok::Import, specs } = self.ast.decl(decl) else {
                continue;
            };
            for &spec in specs {
                let Spec::Import { name, path: spath, .. } = self.ast.spec(spec) else {
                    continue;
                };
                if let Some(n) = name {
                    if Some(self.ast.ident_name(*n)) != expected_name {
                        continue;
                    }
                }
                if spath == path {
                    return Some(spec);
                }
            }
        }
        None
    }

    /// Before splicing a block's statements into the enclosing list,
    /// rename declarations that would collide with outer-scope names by
    /// appending underscores until unique. Returns the undo batch for the
    /// renames.
    pub(crate) fn adapt_block_names(&mut self, block: StmtId) -> Vec<Undo> {
        let Stmt::Block(list) = self.ast.stmt(block).clone() else {
            return Vec::new();
        };
        let mut undos = Vec::new();
        let mut decl_idents = Vec::new();
        for &stmt in &list {
            // Nested blocks keep their own nesting after the splice; only
            // this level's declarations can collide.
            collect_shallow_idents(&self.ast, NodeRef::Stmt(stmt), &mut decl_idents);
        }
        for id in decl_idents {
            let Some(&obj) = self.info.defs.get(&id) else {
                continue; // use, not declaration
            };
            let scope = self.info.obj(obj).scope;
            let Some(outer) = self.info.scope(scope).parent else {
                continue;
            };
            let name = self.ast.ident_name(id).to_string();
            if self.info.scope(outer).lookup(&name).is_none() {
                continue; // no collision
            }
            let mut new_name = name.clone();
            while self.info.scope(scope).lookup(&new_name).is_some() {
                new_name.push('_');
            }
            for use_id in self.use_idents.get(&obj).cloned().unwrap_or_default() {
                undos.push(Undo::Rename { ident: use_id, was: name.clone() });
                self.ast.idents[use_id.index()].name = new_name.clone();
            }
            undos.push(Undo::Rename { ident: id, was: name });
            self.ast.idents[id.index()].name = new_name;
        }
        undos
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::span::LineIndex;
    use std::path::Path;

    /// A fully wired reducer over a single in-memory file, backed by a real
    /// temp directory and the in-process predicate.
    pub(crate) fn reducer<'a>(
        src: &str,
        match_re: &str,
        log: &'a mut Vec<u8>,
    ) -> Reducer<'a> {
        let mut ast = Ast::new();
        parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        let sources = vec![SourceFile {
            path: PathBuf::from("t.mino"),
            text: src.to_string(),
            lines: LineIndex::new(src),
        }];
        let info = typeck::check(&ast);
        let mut r = Reducer {
            ast,
            sources,
            info,
            rev_defs: HashMap::new(),
            use_idents: HashMap::new(),
            parents: HashMap::new(),
            tried: HashSet::new(),
            dst_buf: String::new(),
            tmp_dir: tempfile::Builder::new()
                .prefix("minoreduce")
                .tempdir()
                .unwrap(),
            tmp_files: Vec::new(),
            temp_stale: None,
            tries: 0,
            did_change: false,
            delete_keep_underscore: None,
            delete_keep_unchanged: None,
            cur_file: FileId(0),
            match_re: Regex::new(match_re).unwrap(),
            runner: Runner::Tool,
            verbose: false,
            log_out: log,
        };
        r.create_temp_files().unwrap();
        r.parents = slots::fill_parents(&r.ast);
        r.fill_objs();
        r
    }

    pub(crate) fn text(r: &Reducer) -> String {
        pretty::file_to_string(&r.ast, FileId(0), Mode::Raw)
    }
}

#[cfg(test)]
mod tests {
    use super::slots::NodeRef;
    use super::testutil::{reducer, text};
    use crate::parser::ast::*;
    use crate::typeck::env::ObjKind;

    const PROGRAMS: &[&str] = &[
        "package main\n\nfunc main() {\n\tif true {\n\t\tpanic(\"x\")\n\t} else {\n\t\tpanic(\"y\")\n\t}\n}\n",
        "package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k + 1)\n}\n",
        "package main\n\nfunc f() int {\n\tprint(\"s\")\n\treturn 1\n}\n\nfunc main() {\n\tx := f()\n\tprint(x)\n\tpanic(\"k\")\n}\n",
        "package main\n\ntype T struct{}\n\nfunc (t T) M() {\n\tpanic(\"m\")\n}\n\nfunc main() {\n\tx := T{}\n\tx.M()\n}\n",
        "package main\n\nfunc main() {\n\ta := []int{1, 2, 3, 4}\n\tprint(a[1:3][0])\n}\n",
    ];

    /// A walk in which every candidate is rejected must leave the tree
    /// serializing to the byte-identical pre-walk text.
    #[test]
    fn rejected_walk_leaves_tree_byte_identical() {
        for src in PROGRAMS {
            let mut log = Vec::new();
            let mut r = reducer(src, "absolutely nothing matches this", &mut log);
            let before = text(&r);
            r.walk_package();
            assert!(!r.did_change);
            assert_eq!(text(&r), before, "program: {}", src);
        }
    }

    /// The memo keeps a second identical walk from re-running candidates.
    #[test]
    fn memo_suppresses_repeat_candidates() {
        let mut log = Vec::new();
        let mut r = reducer(PROGRAMS[4], "absolutely nothing matches this", &mut log);
        r.walk_package();
        let tries_after_first = r.tries;
        assert!(tries_after_first > 0);
        r.did_change = false;
        r.walk_package();
        assert_eq!(r.tries, tries_after_first);
    }

    #[test]
    fn unused_after_delete_finds_dying_objects() {
        let mut log = Vec::new();
        let r = reducer(
            "package main\n\nfunc main() {\n\tx := 1\n\tprint(x)\n}\n",
            "absolutely nothing matches this",
            &mut log,
        );
        // The print statement holds the only use of x.
        let print_stmt = r
            .ast
            .stmts
            .iter()
            .enumerate()
            .find_map(|(i, s)| match s.node {
                Stmt::ExprStmt(_) => Some(StmtId(i as u32)),
                _ => None,
            })
            .unwrap();
        let objs = r.unused_after_delete(&[Some(NodeRef::Stmt(print_stmt))]);
        assert_eq!(objs.len(), 1);
        let obj = r.info.obj(objs[0]);
        assert_eq!(obj.name, "x");
        assert_eq!(obj.kind, ObjKind::Var);
    }

    /// Deleting the only read of a variable falls back to keeping the
    /// assignment as `_ = ...` when the initializer's side effect is load-
    /// bearing.
    #[test]
    fn delete_keeps_underscore_when_side_effect_matters() {
        let mut log = Vec::new();
        // Output is "s1panic: k"; requiring "spanic: k" forces the variant
        // where print(x) is gone but f() still runs.
        let mut r = reducer(PROGRAMS[2], "spanic: k", &mut log);
        r.walk_package();
        assert!(r.did_change);
        let now = text(&r);
        assert!(now.contains("_ = f()"), "got:\n{}", now);
        assert!(!now.contains("print(x)"), "got:\n{}", now);
    }

    /// After accepted edits, reachable nodes still have exactly one parent
    /// and the roots none.
    #[test]
    fn parent_index_consistent_after_accepts() {
        let mut log = Vec::new();
        let mut r = reducer(PROGRAMS[0], "panic: x", &mut log);
        loop {
            r.info = crate::typeck::check(&r.ast);
            r.fill_objs();
            r.did_change = false;
            r.walk_package();
            if !r.did_change {
                break;
            }
            let root = NodeRef::File(FileId(0));
            super::slots::walk_subtree(&r.ast, root, &mut |n| {
                if n == root {
                    assert!(!r.parents.contains_key(&n));
                } else {
                    assert!(r.parents.contains_key(&n), "missing parent for {:?}", n);
                }
            });
        }
        let now = text(&r);
        assert!(now.contains("panic(\"x\")"));
        assert!(!now.contains("else"), "got:\n{}", now);
    }
}

/// Identifiers in the subtree of `n`, pruning at nested blocks.
fn collect_shallow_idents(ast: &Ast, n: NodeRef, out: &mut Vec<IdentId>) {
    if let NodeRef::Ident(id) = n {
        out.push(id);
    }
    if let NodeRef::Stmt(s) = n {
        if matches!(ast.stmt(s), Stmt::Block(_)) {
            return;
        }
    }
    let mut children = Vec::new();
    slots::for_each_child(ast, n, &mut |c| children.push(c));
    for c in children {
        collect_shallow_idents(ast, c, out);
    }
}
