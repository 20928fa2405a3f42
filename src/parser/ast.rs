//! Arena-backed syntax tree for the mino language.
//!
//! Nodes live in per-category vectors on [`Ast`] and refer to each other by
//! typed index. An index is the node's identity: it stays valid while the
//! node is reachable, which is what the reducer's parent index and the type
//! checker's Defs/Uses maps are keyed on. Detached nodes are never reused;
//! they simply become unreachable garbage in the arena.

use crate::span::{Span, Spanned};
use std::fmt;
use std::path::PathBuf;

macro_rules! define_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

define_id!(FileId, DeclId, SpecId, StmtId, ExprId, IdentId);

/// An identifier occurrence. Renaming writes through the arena, so every
/// holder of the id observes the new name.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub package: String,
    pub decls: Vec<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclTok {
    Var,
    Const,
    Import,
    Type,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Func(FuncDecl),
    Gen { tok: DeclTok, specs: Vec<SpecId> },
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: IdentId,
    pub params: Vec<Param>,
    pub result: Option<ExprId>,
    pub body: Option<StmtId>,
}

#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: Option<IdentId>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub names: Vec<IdentId>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub enum Spec {
    Value {
        names: Vec<IdentId>,
        ty: Option<ExprId>,
        values: Vec<ExprId>,
    },
    Import {
        name: Option<IdentId>,
        path: String,
        path_span: Span,
    },
    Type {
        name: IdentId,
        ty: ExprId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignTok {
    Assign,
    Define,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<StmtId>),
    If {
        init: Option<StmtId>,
        cond: ExprId,
        body: StmtId,
        else_: Option<StmtId>,
    },
    Switch {
        init: Option<StmtId>,
        tag: Option<ExprId>,
        cases: Vec<StmtId>,
    },
    Case {
        exprs: Vec<ExprId>,
        default: bool,
        body: Vec<StmtId>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: StmtId,
    },
    Assign {
        lhs: Vec<ExprId>,
        rhs: Vec<ExprId>,
        tok: AssignTok,
    },
    ExprStmt(ExprId),
    Return(Vec<ExprId>),
    Defer(ExprId),
    Go(ExprId),
    DeclStmt(DeclId),
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Str,
    Char,
}

/// A literal keeps its source text (quotes included for strings and chars),
/// the same way go/ast.BasicLit carries the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Lit {
    pub kind: LitKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Amp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(IdentId),
    Lit(Lit),
    Composite {
        ty: Option<ExprId>,
        elts: Vec<ExprId>,
    },
    Call {
        fun: ExprId,
        args: Vec<ExprId>,
    },
    Index {
        x: ExprId,
        index: ExprId,
    },
    /// `x[low:high]` or `x[low:high:max]`; a present `max` makes it the
    /// three-index form.
    Slice {
        x: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
    },
    Unary {
        op: UnaryOp,
        x: ExprId,
    },
    Binary {
        op: BinOp,
        x: ExprId,
        y: ExprId,
    },
    /// `*x`: deref in value position, pointer former in type position.
    Star(ExprId),
    Paren(ExprId),
    Selector {
        x: ExprId,
        sel: IdentId,
    },
    FuncLit {
        params: Vec<Param>,
        result: Option<ExprId>,
        body: StmtId,
    },
    /// `[]T` in type position.
    SliceType {
        elt: ExprId,
    },
    /// `struct{}` in type position (named types carry no fields).
    StructType,
}

#[derive(Debug, Default)]
pub struct Ast {
    pub files: Vec<File>,
    pub decls: Vec<Spanned<Decl>>,
    pub specs: Vec<Spanned<Spec>>,
    pub stmts: Vec<Spanned<Stmt>>,
    pub exprs: Vec<Spanned<Expr>>,
    pub idents: Vec<Ident>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()].node
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()].node
    }

    pub fn spec(&self, id: SpecId) -> &Spec {
        &self.specs[id.index()].node
    }

    pub fn spec_mut(&mut self, id: SpecId) -> &mut Spec {
        &mut self.specs[id.index()].node
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()].node
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()].node
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()].node
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()].node
    }

    pub fn ident(&self, id: IdentId) -> &Ident {
        &self.idents[id.index()]
    }

    pub fn ident_name(&self, id: IdentId) -> &str {
        &self.idents[id.index()].name
    }

    pub fn decl_span(&self, id: DeclId) -> Span {
        self.decls[id.index()].span
    }

    pub fn spec_span(&self, id: SpecId) -> Span {
        self.specs[id.index()].span
    }

    pub fn stmt_span(&self, id: StmtId) -> Span {
        self.stmts[id.index()].span
    }

    pub fn expr_span(&self, id: ExprId) -> Span {
        self.exprs[id.index()].span
    }

    pub fn push_decl(&mut self, decl: Decl, span: Span) -> DeclId {
        self.decls.push(Spanned::new(decl, span));
        DeclId(self.decls.len() as u32 - 1)
    }

    pub fn push_spec(&mut self, spec: Spec, span: Span) -> SpecId {
        self.specs.push(Spanned::new(spec, span));
        SpecId(self.specs.len() as u32 - 1)
    }

    pub fn push_stmt(&mut self, stmt: Stmt, span: Span) -> StmtId {
        self.stmts.push(Spanned::new(stmt, span));
        StmtId(self.stmts.len() as u32 - 1)
    }

    pub fn push_expr(&mut self, expr: Expr, span: Span) -> ExprId {
        self.exprs.push(Spanned::new(expr, span));
        ExprId(self.exprs.len() as u32 - 1)
    }

    pub fn push_ident(&mut self, name: impl Into<String>, span: Span) -> IdentId {
        self.idents.push(Ident { name: name.into(), span });
        IdentId(self.idents.len() as u32 - 1)
    }

    /// The identifier behind an expression, unwrapping nothing: only a plain
    /// identifier expression qualifies.
    pub fn as_ident(&self, e: ExprId) -> Option<IdentId> {
        match self.expr(e) {
            Expr::Ident(id) => Some(*id),
            _ => None,
        }
    }

    /// Base type name of a receiver or composite type: `T`, `*T` and `[]T`
    /// all give `T`.
    pub fn base_type_name(&self, ty: ExprId) -> Option<&str> {
        match self.expr(ty) {
            Expr::Ident(id) => Some(self.ident_name(*id)),
            Expr::Star(inner) | Expr::SliceType { elt: inner } => self.base_type_name(*inner),
            _ => None,
        }
    }

    /// Whether a name is exported: first character uppercase.
    pub fn exported(name: &str) -> bool {
        name.chars().next().is_some_and(|c| c.is_uppercase())
    }

    // ── Deep copies ──────────────────────────────────────────────────
    //
    // Inlining rules copy the inlined subtree into fresh nodes rather than
    // aliasing it into a second tree position. Cloned identifiers are new
    // arena entries and therefore carry no Defs/Uses info until the next
    // re-check; rules already tolerate missing info.

    pub fn clone_expr(&mut self, e: ExprId) -> ExprId {
        let span = self.expr_span(e);
        let node = self.expr(e).clone();
        let copy = match node {
            Expr::Ident(id) => {
                let id2 = self.clone_ident(id);
                Expr::Ident(id2)
            }
            Expr::Lit(lit) => Expr::Lit(lit),
            Expr::Composite { ty, elts } => Expr::Composite {
                ty: ty.map(|t| self.clone_expr(t)),
                elts: elts.iter().map(|&x| self.clone_expr(x)).collect(),
            },
            Expr::Call { fun, args } => Expr::Call {
                fun: self.clone_expr(fun),
                args: args.iter().map(|&x| self.clone_expr(x)).collect(),
            },
            Expr::Index { x, index } => Expr::Index {
                x: self.clone_expr(x),
                index: self.clone_expr(index),
            },
            Expr::Slice { x, low, high, max } => Expr::Slice {
                x: self.clone_expr(x),
                low: low.map(|e| self.clone_expr(e)),
                high: high.map(|e| self.clone_expr(e)),
                max: max.map(|e| self.clone_expr(e)),
            },
            Expr::Unary { op, x } => Expr::Unary { op, x: self.clone_expr(x) },
            Expr::Binary { op, x, y } => Expr::Binary {
                op,
                x: self.clone_expr(x),
                y: self.clone_expr(y),
            },
            Expr::Star(x) => Expr::Star(self.clone_expr(x)),
            Expr::Paren(x) => Expr::Paren(self.clone_expr(x)),
            Expr::Selector { x, sel } => Expr::Selector {
                x: self.clone_expr(x),
                sel: self.clone_ident(sel),
            },
            Expr::FuncLit { params, result, body } => Expr::FuncLit {
                params: params.iter().map(|p| self.clone_param(p.clone())).collect(),
                result: result.map(|t| self.clone_expr(t)),
                body: self.clone_stmt(body),
            },
            Expr::SliceType { elt } => Expr::SliceType { elt: self.clone_expr(elt) },
            Expr::StructType => Expr::StructType,
        };
        self.push_expr(copy, span)
    }

    pub fn clone_stmt(&mut self, s: StmtId) -> StmtId {
        let span = self.stmt_span(s);
        let node = self.stmt(s).clone();
        let copy = match node {
            Stmt::Block(list) => {
                Stmt::Block(list.iter().map(|&x| self.clone_stmt(x)).collect())
            }
            Stmt::If { init, cond, body, else_ } => Stmt::If {
                init: init.map(|s| self.clone_stmt(s)),
                cond: self.clone_expr(cond),
                body: self.clone_stmt(body),
                else_: else_.map(|s| self.clone_stmt(s)),
            },
            Stmt::Switch { init, tag, cases } => Stmt::Switch {
                init: init.map(|s| self.clone_stmt(s)),
                tag: tag.map(|e| self.clone_expr(e)),
                cases: cases.iter().map(|&c| self.clone_stmt(c)).collect(),
            },
            Stmt::Case { exprs, default, body } => Stmt::Case {
                exprs: exprs.iter().map(|&e| self.clone_expr(e)).collect(),
                default,
                body: body.iter().map(|&s| self.clone_stmt(s)).collect(),
            },
            Stmt::For { init, cond, post, body } => Stmt::For {
                init: init.map(|s| self.clone_stmt(s)),
                cond: cond.map(|e| self.clone_expr(e)),
                post: post.map(|s| self.clone_stmt(s)),
                body: self.clone_stmt(body),
            },
            Stmt::Assign { lhs, rhs, tok } => Stmt::Assign {
                lhs: lhs.iter().map(|&e| self.clone_expr(e)).collect(),
                rhs: rhs.iter().map(|&e| self.clone_expr(e)).collect(),
                tok,
            },
            Stmt::ExprStmt(e) => Stmt::ExprStmt(self.clone_expr(e)),
            Stmt::Return(es) => {
                Stmt::Return(es.iter().map(|&e| self.clone_expr(e)).collect())
            }
            Stmt::Defer(e) => Stmt::Defer(self.clone_expr(e)),
            Stmt::Go(e) => Stmt::Go(self.clone_expr(e)),
            Stmt::DeclStmt(d) => Stmt::DeclStmt(self.clone_decl(d)),
            Stmt::Break => Stmt::Break,
            Stmt::Continue => Stmt::Continue,
        };
        self.push_stmt(copy, span)
    }

    fn clone_decl(&mut self, d: DeclId) -> DeclId {
        let span = self.decl_span(d);
        let node = self.decl(d).clone();
        let copy = match node {
            Decl::Func(f) => Decl::Func(FuncDecl {
                recv: f.recv.map(|r| Receiver {
                    name: r.name.map(|n| self.clone_ident(n)),
                    ty: self.clone_expr(r.ty),
                }),
                name: self.clone_ident(f.name),
                params: f.params.iter().map(|p| self.clone_param(p.clone())).collect(),
                result: f.result.map(|t| self.clone_expr(t)),
                body: f.body.map(|b| self.clone_stmt(b)),
            }),
            Decl::Gen { tok, specs } => Decl::Gen {
                tok,
                specs: specs.iter().map(|&s| self.clone_spec(s)).collect(),
            },
        };
        self.push_decl(copy, span)
    }

    fn clone_spec(&mut self, s: SpecId) -> SpecId {
        let span = self.spec_span(s);
        let node = self.spec(s).clone();
        let copy = match node {
            Spec::Value { names, ty, values } => Spec::Value {
                names: names.iter().map(|&n| self.clone_ident(n)).collect(),
                ty: ty.map(|t| self.clone_expr(t)),
                values: values.iter().map(|&v| self.clone_expr(v)).collect(),
            },
            Spec::Import { name, path, path_span } => Spec::Import {
                name: name.map(|n| self.clone_ident(n)),
                path,
                path_span,
            },
            Spec::Type { name, ty } => Spec::Type {
                name: self.clone_ident(name),
                ty: self.clone_expr(ty),
            },
        };
        self.push_spec(copy, span)
    }

    fn clone_param(&mut self, p: Param) -> Param {
        Param {
            names: p.names.iter().map(|&n| self.clone_ident(n)).collect(),
            ty: self.clone_expr(p.ty),
        }
    }

    fn clone_ident(&mut self, id: IdentId) -> IdentId {
        let Ident { name, span } = self.ident(id).clone();
        self.push_ident(name, span)
    }
}

// ── Literal text helpers ─────────────────────────────────────────────

/// Unquote a string or character literal's source text. Understands the
/// escapes the lexer admits; returns None on malformed text.
pub fn unquote(text: &str) -> Option<String> {
    let inner = text
        .strip_prefix(['"', '\''])?
        .strip_suffix(['"', '\''])?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '0' => out.push('\0'),
            _ => return None,
        }
    }
    Some(out)
}

/// Quote a string back into literal source text.
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    push_escaped(&mut out, s, '"');
    out.push('"');
    out
}

/// Quote a character back into literal source text.
pub fn quote_char(c: char) -> String {
    let mut out = String::with_capacity(4);
    out.push('\'');
    let mut buf = [0u8; 4];
    push_escaped(&mut out, c.encode_utf8(&mut buf), '\'');
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, s: &str, quote: char) {
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::Amp => "&",
        })
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_unquote_round_trip() {
        for s in ["", "abc", "a\nb", "say \"hi\"", "tab\there"] {
            assert_eq!(unquote(&quote_str(s)).unwrap(), s);
        }
        assert_eq!(unquote(&quote_char('b')).unwrap(), "b");
        assert_eq!(unquote("'\\n'").unwrap(), "\n");
    }

    #[test]
    fn exported_names() {
        assert!(Ast::exported("Foo"));
        assert!(!Ast::exported("foo"));
        assert!(!Ast::exported("_"));
    }

    #[test]
    fn clone_expr_is_deep() {
        let mut ast = Ast::new();
        let id = ast.push_ident("x", Span::dummy());
        let x = ast.push_expr(Expr::Ident(id), Span::dummy());
        let lit = ast.push_expr(
            Expr::Lit(Lit { kind: LitKind::Int, value: "1".into() }),
            Span::dummy(),
        );
        let bin = ast.push_expr(Expr::Binary { op: BinOp::Add, x, y: lit }, Span::dummy());
        let copy = ast.clone_expr(bin);
        assert_ne!(copy, bin);
        let Expr::Binary { x: cx, y: cy, .. } = *ast.expr(copy) else {
            panic!("clone changed shape");
        };
        assert_ne!(cx, x);
        assert_ne!(cy, lit);
    }
}
