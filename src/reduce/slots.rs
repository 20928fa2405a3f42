//! Parent index and node-slot location.
//!
//! The parent index is an auxiliary map keyed by node identity (arena ids),
//! filled once by a preorder walk and patched incrementally when an edit is
//! accepted. Entries for detached nodes are left behind; they are harmless
//! garbage. The slot locators answer "which field of this parent currently
//! holds that child" with an exhaustive match; failing to find the slot on a
//! well-formed index is a programming error and panics.

use crate::parser::ast::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    File(FileId),
    Decl(DeclId),
    Spec(SpecId),
    Stmt(StmtId),
    Expr(ExprId),
    Ident(IdentId),
}

/// A reversible edit. Rules and the deferred-fallback machinery record
/// these as they mutate; replaying a batch in reverse restores the tree.
#[derive(Debug)]
pub enum Undo {
    ExprSlot { parent: NodeRef, now: ExprId, was: ExprId },
    StmtList { owner: NodeRef, was: Vec<StmtId> },
    Specs { decl: DeclId, was: Vec<SpecId> },
    FileDecls { file: FileId, was: Vec<DeclId> },
    Rename { ident: IdentId, was: String },
    RefixAssign { ident: IdentId },
    ImportName { spec: SpecId, was: Option<IdentId> },
    StmtPayload { stmt: StmtId, was: Stmt },
}

/// Invoke `f` for every direct child of `n`, in source order.
pub fn for_each_child(ast: &Ast, n: NodeRef, f: &mut impl FnMut(NodeRef)) {
    match n {
        NodeRef::File(id) => {
            for &d in &ast.files[id.index()].decls {
                f(NodeRef::Decl(d));
            }
        }
        NodeRef::Decl(id) => match ast.decl(id) {
            Decl::Func(fd) => {
                if let Some(recv) = &fd.recv {
                    if let Some(name) = recv.name {
                        f(NodeRef::Ident(name));
                    }
                    f(NodeRef::Expr(recv.ty));
                }
                f(NodeRef::Ident(fd.name));
                for p in &fd.params {
                    for &name in &p.names {
                        f(NodeRef::Ident(name));
                    }
                    f(NodeRef::Expr(p.ty));
                }
                if let Some(result) = fd.result {
                    f(NodeRef::Expr(result));
                }
                if let Some(body) = fd.body {
                    f(NodeRef::Stmt(body));
                }
            }
            Decl::Gen { specs, .. } => {
                for &s in specs {
                    f(NodeRef::Spec(s));
                }
            }
        },
        NodeRef::Spec(id) => match ast.spec(id) {
            Spec::Value { names, ty, values } => {
                for &name in names {
                    f(NodeRef::Ident(name));
                }
                if let Some(ty) = ty {
                    f(NodeRef::Expr(*ty));
                }
                for &v in values {
                    f(NodeRef::Expr(v));
                }
            }
            Spec::Import { name, .. } => {
                if let Some(name) = name {
                    f(NodeRef::Ident(*name));
                }
            }
            Spec::Type { name, ty } => {
                f(NodeRef::Ident(*name));
                f(NodeRef::Expr(*ty));
            }
        },
        NodeRef::Stmt(id) => match ast.stmt(id) {
            Stmt::Block(list) => {
                for &s in list {
                    f(NodeRef::Stmt(s));
                }
            }
            Stmt::If { init, cond, body, else_ } => {
                if let Some(init) = init {
                    f(NodeRef::Stmt(*init));
                }
                f(NodeRef::Expr(*cond));
                f(NodeRef::Stmt(*body));
                if let Some(else_) = else_ {
                    f(NodeRef::Stmt(*else_));
                }
            }
            Stmt::Switch { init, tag, cases } => {
                if let Some(init) = init {
                    f(NodeRef::Stmt(*init));
                }
                if let Some(tag) = tag {
                    f(NodeRef::Expr(*tag));
                }
                for &c in cases {
                    f(NodeRef::Stmt(c));
                }
            }
            Stmt::Case { exprs, body, .. } => {
                for &e in exprs {
                    f(NodeRef::Expr(e));
                }
                for &s in body {
                    f(NodeRef::Stmt(s));
                }
            }
            Stmt::For { init, cond, post, body } => {
                if let Some(init) = init {
                    f(NodeRef::Stmt(*init));
                }
                if let Some(cond) = cond {
                    f(NodeRef::Expr(*cond));
                }
                if let Some(post) = post {
                    f(NodeRef::Stmt(*post));
                }
                f(NodeRef::Stmt(*body));
            }
            Stmt::Assign { lhs, rhs, .. } => {
                for &e in lhs.iter().chain(rhs.iter()) {
                    f(NodeRef::Expr(e));
                }
            }
            Stmt::ExprStmt(e) | Stmt::Defer(e) | Stmt::Go(e) => f(NodeRef::Expr(*e)),
            Stmt::Return(exprs) => {
                for &e in exprs {
                    f(NodeRef::Expr(e));
                }
            }
            Stmt::DeclStmt(d) => f(NodeRef::Decl(*d)),
            Stmt::Break | Stmt::Continue => {}
        },
        NodeRef::Expr(id) => match ast.expr(id) {
            Expr::Ident(i) => f(NodeRef::Ident(*i)),
            Expr::Lit(_) | Expr::StructType => {}
            Expr::Composite { ty, elts } => {
                if let Some(ty) = ty {
                    f(NodeRef::Expr(*ty));
                }
                for &e in elts {
                    f(NodeRef::Expr(e));
                }
            }
            Expr::Call { fun, args } => {
                f(NodeRef::Expr(*fun));
                for &a in args {
                    f(NodeRef::Expr(a));
                }
            }
            Expr::Index { x, index } => {
                f(NodeRef::Expr(*x));
                f(NodeRef::Expr(*index));
            }
            Expr::Slice { x, low, high, max } => {
                f(NodeRef::Expr(*x));
                for &e in [low, high, max].into_iter().flatten() {
                    f(NodeRef::Expr(e));
                }
            }
            Expr::Unary { x, .. } | Expr::Star(x) | Expr::Paren(x) => f(NodeRef::Expr(*x)),
            Expr::Binary { x, y, .. } => {
                f(NodeRef::Expr(*x));
                f(NodeRef::Expr(*y));
            }
            Expr::Selector { x, sel } => {
                f(NodeRef::Expr(*x));
                f(NodeRef::Ident(*sel));
            }
            Expr::FuncLit { params, result, body } => {
                for p in params {
                    for &name in &p.names {
                        f(NodeRef::Ident(name));
                    }
                    f(NodeRef::Expr(p.ty));
                }
                if let Some(result) = result {
                    f(NodeRef::Expr(*result));
                }
                f(NodeRef::Stmt(*body));
            }
            Expr::SliceType { elt } => f(NodeRef::Expr(*elt)),
        },
        NodeRef::Ident(_) => {}
    }
}

/// Preorder walk of the subtree rooted at `n`, parents before children.
pub fn walk_subtree(ast: &Ast, n: NodeRef, f: &mut impl FnMut(NodeRef)) {
    f(n);
    let mut children = Vec::new();
    for_each_child(ast, n, &mut |c| children.push(c));
    for c in children {
        walk_subtree(ast, c, f);
    }
}

/// All identifiers in the subtree rooted at `n`.
pub fn idents_in(ast: &Ast, n: NodeRef) -> Vec<IdentId> {
    let mut out = Vec::new();
    walk_subtree(ast, n, &mut |c| {
        if let NodeRef::Ident(id) = c {
            out.push(id);
        }
    });
    out
}

/// Build the parent index for the whole package.
pub fn fill_parents(ast: &Ast) -> HashMap<NodeRef, NodeRef> {
    let mut parents = HashMap::new();
    for file in 0..ast.files.len() {
        let root = NodeRef::File(FileId(file as u32));
        fill_under(ast, root, &mut parents);
    }
    parents
}

fn fill_under(ast: &Ast, n: NodeRef, parents: &mut HashMap<NodeRef, NodeRef>) {
    let mut children = Vec::new();
    for_each_child(ast, n, &mut |c| children.push(c));
    for c in children {
        parents.insert(c, n);
        fill_under(ast, c, parents);
    }
}

/// Register `root` and its whole subtree under `parent`. Used after an
/// accepted edit inserts freshly built nodes.
pub fn register_subtree(
    ast: &Ast,
    root: NodeRef,
    parent: NodeRef,
    parents: &mut HashMap<NodeRef, NodeRef>,
) {
    parents.insert(root, parent);
    fill_under(ast, root, parents);
}

/// Mutable access to the statement list a node owns, if it owns one
/// directly (blocks and case arms; anything else is not a splice target).
pub fn stmt_list_mut(ast: &mut Ast, owner: NodeRef) -> Option<&mut Vec<StmtId>> {
    let NodeRef::Stmt(id) = owner else { return None };
    match ast.stmt_mut(id) {
        Stmt::Block(list) => Some(list),
        Stmt::Case { body, .. } => Some(body),
        _ => None,
    }
}

pub fn stmt_list(ast: &Ast, owner: NodeRef) -> Option<&Vec<StmtId>> {
    let NodeRef::Stmt(id) = owner else { return None };
    match ast.stmt(id) {
        Stmt::Block(list) => Some(list),
        Stmt::Case { body, .. } => Some(body),
        _ => None,
    }
}

/// The mutable slot in `parent` holding expression `child`.
pub fn expr_slot<'a>(ast: &'a mut Ast, parent: NodeRef, child: ExprId) -> &'a mut ExprId {
    macro_rules! hit {
        ($slot:expr) => {
            if *$slot == child {
                return $slot;
            }
        };
    }
    macro_rules! hit_opt {
        ($slot:expr) => {
            if let Some(slot) = $slot.as_mut() {
                hit!(slot);
            }
        };
    }
    macro_rules! hit_list {
        ($list:expr) => {
            for slot in $list.iter_mut() {
                hit!(slot);
            }
        };
    }
    match parent {
        NodeRef::Expr(p) => match ast.expr_mut(p) {
            Expr::Composite { ty, elts } => {
                hit_opt!(ty);
                hit_list!(elts);
            }
            Expr::Call { fun, args } => {
                hit!(fun);
                hit_list!(args);
            }
            Expr::Index { x, index } => {
                hit!(x);
                hit!(index);
            }
            Expr::Slice { x, low, high, max } => {
                hit!(x);
                hit_opt!(low);
                hit_opt!(high);
                hit_opt!(max);
            }
            Expr::Unary { x, .. } | Expr::Star(x) | Expr::Paren(x) => hit!(x),
            Expr::Binary { x, y, .. } => {
                hit!(x);
                hit!(y);
            }
            Expr::Selector { x, .. } => hit!(x),
            Expr::FuncLit { params, result, .. } => {
                for p in params.iter_mut() {
                    hit!(&mut p.ty);
                }
                hit_opt!(result);
            }
            Expr::SliceType { elt } => hit!(elt),
            Expr::Ident(_) | Expr::Lit(_) | Expr::StructType => {}
        },
        NodeRef::Stmt(p) => match ast.stmt_mut(p) {
            Stmt::If { cond, .. } => hit!(cond),
            Stmt::Switch { tag, .. } => hit_opt!(tag),
            Stmt::Case { exprs, .. } => hit_list!(exprs),
            Stmt::For { cond, .. } => hit_opt!(cond),
            Stmt::Assign { lhs, rhs, .. } => {
                hit_list!(lhs);
                hit_list!(rhs);
            }
            Stmt::ExprStmt(e) | Stmt::Defer(e) | Stmt::Go(e) => hit!(e),
            Stmt::Return(exprs) => hit_list!(exprs),
            _ => {}
        },
        NodeRef::Spec(p) => match ast.spec_mut(p) {
            Spec::Value { ty, values, .. } => {
                hit_opt!(ty);
                hit_list!(values);
            }
            Spec::Type { ty, .. } => hit!(ty),
            Spec::Import { .. } => {}
        },
        NodeRef::Decl(p) => match ast.decl_mut(p) {
            Decl::Func(fd) => {
                if let Some(recv) = fd.recv.as_mut() {
                    hit!(&mut recv.ty);
                }
                for param in fd.params.iter_mut() {
                    hit!(&mut param.ty);
                }
                hit_opt!(fd.result);
            }
            Decl::Gen { .. } => {}
        },
        _ => {}
    }
    panic!("could not find expression slot in parent {:?}", parent);
}

/// The mutable slot in `parent` holding statement `child`.
pub fn stmt_slot<'a>(ast: &'a mut Ast, parent: NodeRef, child: StmtId) -> &'a mut StmtId {
    macro_rules! hit {
        ($slot:expr) => {
            if *$slot == child {
                return $slot;
            }
        };
    }
    macro_rules! hit_opt {
        ($slot:expr) => {
            if let Some(slot) = $slot.as_mut() {
                hit!(slot);
            }
        };
    }
    match parent {
        NodeRef::Stmt(p) => match ast.stmt_mut(p) {
            Stmt::Block(list) => {
                for slot in list.iter_mut() {
                    hit!(slot);
                }
            }
            Stmt::Case { body, .. } => {
                for slot in body.iter_mut() {
                    hit!(slot);
                }
            }
            Stmt::If { init, body, else_, .. } => {
                hit_opt!(init);
                hit!(body);
                hit_opt!(else_);
            }
            Stmt::Switch { init, cases, .. } => {
                hit_opt!(init);
                for slot in cases.iter_mut() {
                    hit!(slot);
                }
            }
            Stmt::For { init, post, body, .. } => {
                hit_opt!(init);
                hit_opt!(post);
                hit!(body);
            }
            _ => {}
        },
        NodeRef::Decl(p) => {
            if let Decl::Func(fd) = ast.decl_mut(p) {
                hit_opt!(fd.body);
            }
        }
        NodeRef::Expr(p) => {
            if let Expr::FuncLit { body, .. } = ast.expr_mut(p) {
                hit!(body);
            }
        }
        _ => {}
    }
    panic!("could not find statement slot in parent {:?}", parent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::Path;

    fn parse(src: &str) -> Ast {
        let mut ast = Ast::new();
        parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        ast
    }

    #[test]
    fn every_reachable_node_has_one_parent() {
        let ast = parse(
            "package main\n\nconst k = 5\n\nfunc main() {\n\tif true {\n\t\tpanic(\"x\")\n\t} else {\n\t\tpanic(\"y\")\n\t}\n\tprint(k + 1)\n}\n",
        );
        let parents = fill_parents(&ast);
        let root = NodeRef::File(FileId(0));
        let mut count = 0usize;
        walk_subtree(&ast, root, &mut |n| {
            count += 1;
            if n == root {
                assert!(!parents.contains_key(&n), "root must have no parent");
            } else {
                assert!(parents.contains_key(&n), "missing parent for {:?}", n);
            }
        });
        // Every parent entry points at a node that is itself reachable.
        assert!(parents.len() == count - 1);
    }

    #[test]
    fn expr_slot_finds_binary_operands() {
        let mut ast = parse("package main\n\nfunc main() {\n\tprint(1 + 2)\n}\n");
        let parents = fill_parents(&ast);
        // Find the binary expr and its lhs.
        let (bin, lhs) = ast
            .exprs
            .iter()
            .enumerate()
            .find_map(|(i, e)| match e.node {
                Expr::Binary { x, .. } => Some((ExprId(i as u32), x)),
                _ => None,
            })
            .unwrap();
        assert_eq!(parents[&NodeRef::Expr(lhs)], NodeRef::Expr(bin));
        let slot = expr_slot(&mut ast, NodeRef::Expr(bin), lhs);
        assert_eq!(*slot, lhs);
    }

    #[test]
    #[should_panic(expected = "could not find expression slot")]
    fn locator_failure_panics() {
        let mut ast = parse("package main\n\nfunc main() {\n\tprint(1 + 2)\n}\n");
        let bogus = ast.push_expr(
            Expr::Lit(Lit { kind: LitKind::Int, value: "9".into() }),
            crate::span::Span::dummy(),
        );
        let bin = ast
            .exprs
            .iter()
            .enumerate()
            .find_map(|(i, e)| match e.node {
                Expr::Binary { .. } => Some(ExprId(i as u32)),
                _ => None,
            })
            .unwrap();
        expr_slot(&mut ast, NodeRef::Expr(bin), bogus);
    }
}
