//! Print a syntax tree back into mino source text.
//!
//! Two modes: `Raw` is the minimal layout used for speculative serialization
//! and temp-file writes (it is also the memo key, so it must be
//! deterministic), `Formatted` is used once for the final output files and
//! adds blank lines between top-level declarations. Both parse back.

use crate::parser::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Raw,
    Formatted,
}

/// Print `file` into `buf`. The buffer is truncated first so callers can
/// reuse one allocation across candidates.
pub fn print_file(ast: &Ast, file: FileId, mode: Mode, buf: &mut String) {
    buf.clear();
    let mut pp = Printer { ast, buf, indent: 0, mode };
    pp.emit_file(&ast.files[file.index()]);
}

/// Convenience wrapper allocating a fresh buffer.
pub fn file_to_string(ast: &Ast, file: FileId, mode: Mode) -> String {
    let mut buf = String::new();
    print_file(ast, file, mode, &mut buf);
    buf
}

struct Printer<'a> {
    ast: &'a Ast,
    buf: &'a mut String,
    indent: usize,
    mode: Mode,
}

impl<'a> Printer<'a> {
    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push('\t');
        }
    }

    // ── File ─────────────────────────────────────────────────────────

    fn emit_file(&mut self, file: &File) {
        self.write("package ");
        self.write(&file.package.clone());
        self.newline();
        for &decl in &file.decls {
            if self.mode == Mode::Formatted {
                self.newline();
            }
            self.emit_decl(decl);
            self.newline();
        }
    }

    fn emit_decl(&mut self, id: DeclId) {
        match self.ast.decl(id) {
            Decl::Func(f) => self.emit_func(f.clone()),
            Decl::Gen { tok, specs } => self.emit_gen(*tok, specs.clone()),
        }
    }

    fn emit_gen(&mut self, tok: DeclTok, specs: Vec<SpecId>) {
        self.write(match tok {
            DeclTok::Var => "var",
            DeclTok::Const => "const",
            DeclTok::Import => "import",
            DeclTok::Type => "type",
        });
        if specs.len() == 1 {
            self.write(" ");
            self.emit_spec(specs[0]);
            return;
        }
        self.write(" (");
        self.newline();
        self.indent += 1;
        for spec in specs {
            self.write_indent();
            self.emit_spec(spec);
            self.newline();
        }
        self.indent -= 1;
        self.write_indent();
        self.write(")");
    }

    fn emit_spec(&mut self, id: SpecId) {
        match self.ast.spec(id).clone() {
            Spec::Value { names, ty, values } => {
                self.emit_ident_list(&names);
                if let Some(ty) = ty {
                    self.write(" ");
                    self.emit_expr(ty);
                }
                if !values.is_empty() {
                    self.write(" = ");
                    self.emit_expr_list(&values);
                }
            }
            Spec::Import { name, path, .. } => {
                if let Some(name) = name {
                    self.write(&self.ast.ident_name(name).to_string());
                    self.write(" ");
                }
                self.write(&quote_str(&path));
            }
            Spec::Type { name, ty } => {
                self.write(&self.ast.ident_name(name).to_string());
                self.write(" ");
                self.emit_expr(ty);
            }
        }
    }

    fn emit_func(&mut self, f: FuncDecl) {
        self.write("func ");
        if let Some(recv) = &f.recv {
            self.write("(");
            if let Some(name) = recv.name {
                self.write(&self.ast.ident_name(name).to_string());
                self.write(" ");
            }
            self.emit_expr(recv.ty);
            self.write(") ");
        }
        self.write(&self.ast.ident_name(f.name).to_string());
        self.emit_params(&f.params);
        if let Some(result) = f.result {
            self.write(" ");
            self.emit_expr(result);
        }
        if let Some(body) = f.body {
            self.write(" ");
            self.emit_stmt(body);
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.write("(");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_ident_list(&p.names);
            self.write(" ");
            self.emit_expr(p.ty);
        }
        self.write(")");
    }

    fn emit_ident_list(&mut self, ids: &[IdentId]) {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&self.ast.ident_name(id).to_string());
        }
    }

    fn emit_expr_list(&mut self, exprs: &[ExprId]) {
        for (i, &e) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expr(e);
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn emit_stmt(&mut self, id: StmtId) {
        match self.ast.stmt(id).clone() {
            Stmt::Block(list) => self.emit_block(&list),
            Stmt::If { init, cond, body, else_ } => {
                self.write("if ");
                if let Some(init) = init {
                    self.emit_stmt(init);
                    self.write("; ");
                }
                self.emit_expr(cond);
                self.write(" ");
                self.emit_stmt(body);
                if let Some(else_) = else_ {
                    self.write(" else ");
                    self.emit_stmt(else_);
                }
            }
            Stmt::Switch { init, tag, cases } => {
                self.write("switch ");
                if let Some(init) = init {
                    self.emit_stmt(init);
                    self.write("; ");
                }
                if let Some(tag) = tag {
                    self.emit_expr(tag);
                    self.write(" ");
                }
                self.write("{");
                self.newline();
                for case in cases {
                    self.emit_stmt(case);
                }
                self.write_indent();
                self.write("}");
            }
            Stmt::Case { exprs, default, body } => {
                self.write_indent();
                if default {
                    self.write("default:");
                } else {
                    self.write("case ");
                    self.emit_expr_list(&exprs);
                    self.write(":");
                }
                self.newline();
                self.indent += 1;
                for stmt in body {
                    self.write_indent();
                    self.emit_stmt(stmt);
                    self.newline();
                }
                self.indent -= 1;
            }
            Stmt::For { init, cond, post, body } => {
                self.write("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.emit_stmt(init);
                    }
                    self.write("; ");
                    if let Some(cond) = cond {
                        self.emit_expr(cond);
                    }
                    self.write("; ");
                    if let Some(post) = post {
                        self.emit_stmt(post);
                    }
                    self.write(" ");
                } else if let Some(cond) = cond {
                    self.emit_expr(cond);
                    self.write(" ");
                }
                self.emit_stmt(body);
            }
            Stmt::Assign { lhs, rhs, tok } => {
                self.emit_expr_list(&lhs);
                self.write(match tok {
                    AssignTok::Assign => " = ",
                    AssignTok::Define => " := ",
                });
                self.emit_expr_list(&rhs);
            }
            Stmt::ExprStmt(e) => self.emit_expr(e),
            Stmt::Return(exprs) => {
                self.write("return");
                if !exprs.is_empty() {
                    self.write(" ");
                    self.emit_expr_list(&exprs);
                }
            }
            Stmt::Defer(call) => {
                self.write("defer ");
                self.emit_expr(call);
            }
            Stmt::Go(call) => {
                self.write("go ");
                self.emit_expr(call);
            }
            Stmt::DeclStmt(d) => self.emit_decl(d),
            Stmt::Break => self.write("break"),
            Stmt::Continue => self.write("continue"),
        }
    }

    fn emit_block(&mut self, list: &[StmtId]) {
        self.write("{");
        self.newline();
        self.indent += 1;
        for &stmt in list {
            self.write_indent();
            self.emit_stmt(stmt);
            self.newline();
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr(&mut self, id: ExprId) {
        match self.ast.expr(id).clone() {
            Expr::Ident(i) => self.write(&self.ast.ident_name(i).to_string()),
            Expr::Lit(lit) => self.write(&lit.value),
            Expr::Composite { ty, elts } => {
                if let Some(ty) = ty {
                    self.emit_expr(ty);
                }
                self.write("{");
                self.emit_expr_list(&elts);
                self.write("}");
            }
            Expr::Call { fun, args } => {
                self.emit_expr(fun);
                self.write("(");
                self.emit_expr_list(&args);
                self.write(")");
            }
            Expr::Index { x, index } => {
                self.emit_expr(x);
                self.write("[");
                self.emit_expr(index);
                self.write("]");
            }
            Expr::Slice { x, low, high, max } => {
                self.emit_expr(x);
                self.write("[");
                if let Some(low) = low {
                    self.emit_expr(low);
                }
                self.write(":");
                if let Some(high) = high {
                    self.emit_expr(high);
                }
                if let Some(max) = max {
                    self.write(":");
                    self.emit_expr(max);
                }
                self.write("]");
            }
            Expr::Unary { op, x } => {
                self.write(&op.to_string());
                self.emit_expr(x);
            }
            Expr::Binary { op, x, y } => {
                self.emit_expr(x);
                self.write(" ");
                self.write(&op.to_string());
                self.write(" ");
                self.emit_expr(y);
            }
            Expr::Star(x) => {
                self.write("*");
                self.emit_expr(x);
            }
            Expr::Paren(x) => {
                self.write("(");
                self.emit_expr(x);
                self.write(")");
            }
            Expr::Selector { x, sel } => {
                self.emit_expr(x);
                self.write(".");
                self.write(&self.ast.ident_name(sel).to_string());
            }
            Expr::FuncLit { params, result, body } => {
                self.write("func");
                self.emit_params(&params);
                if let Some(result) = result {
                    self.write(" ");
                    self.emit_expr(result);
                }
                self.write(" ");
                self.emit_stmt(body);
            }
            Expr::SliceType { elt } => {
                self.write("[]");
                self.emit_expr(elt);
            }
            Expr::StructType => self.write("struct{}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::Path;

    fn round_trip(src: &str) {
        let mut ast = Ast::new();
        let fid = parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        let printed = file_to_string(&ast, fid, Mode::Raw);
        let mut ast2 = Ast::new();
        let fid2 =
            parser::parse_file(&mut ast2, &printed, Path::new("t.mino"), 0).unwrap();
        let reprinted = file_to_string(&ast2, fid2, Mode::Raw);
        assert_eq!(printed, reprinted, "printer output is not a fixed point");
    }

    #[test]
    fn round_trips_representative_programs() {
        round_trip("package main\n\nfunc main() {\n\tpanic(\"x\")\n}\n");
        round_trip(
            "package main\n\nimport (\n\t\"fmt\"\n\t_ \"strings\"\n)\n\nconst k = 5\n\nfunc main() {\n\tfmt.Println(k + 1)\n}\n",
        );
        round_trip(
            "package p\n\ntype T struct{}\n\nfunc (t T) M(a, b int) int {\n\tif a > b {\n\t\treturn a\n\t} else if a < b {\n\t\treturn b\n\t}\n\tswitch a {\n\tcase 1, 2:\n\t\treturn 0\n\tdefault:\n\t}\n\tfor i := 0; i < 3; i = i + 1 {\n\t\tgo f()\n\t\tdefer f()\n\t}\n\treturn a\n}\n",
        );
        round_trip(
            "package p\n\nvar (\n\ta, b = 1, 2\n\tc []int\n)\n\nfunc f() {\n\tx := []int{1, 2, 3}\n\tprint(x[1:3][0], x[:2], x[1:2:3], *&a, -b, !true)\n}\n",
        );
    }

    #[test]
    fn raw_and_formatted_differ_only_in_blank_lines() {
        let src = "package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k)\n}\n";
        let mut ast = Ast::new();
        let fid = parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
        let raw = file_to_string(&ast, fid, Mode::Raw);
        let formatted = file_to_string(&ast, fid, Mode::Formatted);
        assert_eq!(formatted, src);
        assert_eq!(raw, formatted.replace("\n\n", "\n"));
    }
}
