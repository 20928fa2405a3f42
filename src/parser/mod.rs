pub mod ast;

use crate::diagnostics::{render, CompileError, ReduceError};
use crate::lexer::{self, token::Token};
use crate::span::{LineIndex, Span, Spanned};
use ast::*;
use std::path::{Path, PathBuf};

/// Original text of one input file, kept for location reporting after the
/// working tree has drifted from the sources.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub lines: LineIndex,
}

/// Parse every `.mino` file in `dir` into one tree per file, requiring
/// exactly one package. Files are visited in name order so runs are
/// deterministic.
pub fn load_dir(dir: &Path) -> Result<(Ast, Vec<SourceFile>, String), ReduceError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "mino"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(ReduceError::Parse(format!(
            "no .mino files in {}",
            dir.display()
        )));
    }

    let mut ast = Ast::new();
    let mut sources = Vec::new();
    let mut packages: Vec<String> = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let lines = LineIndex::new(&text);
        let file_id = ast.files.len() as u32;
        match parse_file(&mut ast, &text, &path, file_id) {
            Ok(fid) => {
                let pkg = ast.files[fid.index()].package.clone();
                if !packages.contains(&pkg) {
                    packages.push(pkg);
                }
            }
            Err(err) => {
                let msg = match &err {
                    CompileError::Syntax { msg, .. } => msg.clone(),
                };
                return Err(ReduceError::Parse(render(&path, &lines, err.span(), &msg)));
            }
        }
        sources.push(SourceFile { path, text, lines });
    }
    if packages.len() != 1 {
        return Err(ReduceError::PackageCount(packages.len()));
    }
    Ok((ast, sources, packages.pop().unwrap()))
}

/// Parse a single source file into `ast`, returning its id.
pub fn parse_file(
    ast: &mut Ast,
    source: &str,
    path: &Path,
    file_id: u32,
) -> Result<FileId, CompileError> {
    let tokens = lexer::lex(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        source,
        ast,
        pos: 0,
        file_id,
        no_composite: false,
    };
    let (package, decls) = parser.parse_source()?;
    let fid = FileId(parser.ast.files.len() as u32);
    parser.ast.files.push(File {
        path: path.to_path_buf(),
        package,
        decls,
    });
    Ok(fid)
}

struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    ast: &'a mut Ast,
    pos: usize,
    file_id: u32,
    /// Set while parsing an if/switch/for header, where `ident {` opens the
    /// statement body rather than a composite literal.
    no_composite: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.node)
    }

    fn peek_is(&self, tok: Token) -> bool {
        self.peek() == Some(tok)
    }

    fn at(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => self.spanned(t.span),
            None => self.eof_span(),
        }
    }

    fn spanned(&self, span: Span) -> Span {
        Span::with_file(span.start, span.end, self.file_id)
    }

    fn eof_span(&self) -> Span {
        let end = self.source.len();
        Span::with_file(end, end, self.file_id)
    }

    fn advance(&mut self) -> Option<Spanned<Token>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.peek_is(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, CompileError> {
        match self.tokens.get(self.pos) {
            Some(t) if t.node == expected => {
                self.pos += 1;
                Ok(self.spanned(t.span))
            }
            Some(t) => Err(CompileError::syntax(
                format!("expected {}, found {}", expected, t.node),
                self.spanned(t.span),
            )),
            None => Err(CompileError::syntax(
                format!("expected {}, found end of file", expected),
                self.eof_span(),
            )),
        }
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    fn expect_ident(&mut self) -> Result<IdentId, CompileError> {
        let span = self.expect(Token::Ident)?;
        let name = self.text(span).to_string();
        Ok(self.ast.push_ident(name, span))
    }

    /// Statement terminator: an explicit or inserted `;`, or a following
    /// closing brace that ends the list.
    fn expect_terminator(&mut self) -> Result<(), CompileError> {
        if self.eat(Token::Semi) || self.peek_is(Token::RBrace) || self.peek().is_none() {
            return Ok(());
        }
        let at = self.at();
        let found = self.peek().unwrap();
        Err(CompileError::syntax(
            format!("expected ';', found {}", found),
            at,
        ))
    }

    // ── File ─────────────────────────────────────────────────────────

    fn parse_source(&mut self) -> Result<(String, Vec<DeclId>), CompileError> {
        while self.eat(Token::Semi) {}
        self.expect(Token::Package)?;
        let pkg_span = self.expect(Token::Ident)?;
        let package = self.text(pkg_span).to_string();
        self.expect_terminator()?;
        let mut decls = Vec::new();
        loop {
            while self.eat(Token::Semi) {}
            if self.peek().is_none() {
                break;
            }
            decls.push(self.parse_top_decl()?);
            self.expect_terminator()?;
        }
        Ok((package, decls))
    }

    fn parse_top_decl(&mut self) -> Result<DeclId, CompileError> {
        match self.peek() {
            Some(Token::Import) => self.parse_gen_decl(DeclTok::Import),
            Some(Token::Var) => self.parse_gen_decl(DeclTok::Var),
            Some(Token::Const) => self.parse_gen_decl(DeclTok::Const),
            Some(Token::Type) => self.parse_gen_decl(DeclTok::Type),
            Some(Token::Func) => self.parse_func_decl(),
            Some(tok) => Err(CompileError::syntax(
                format!("expected declaration, found {}", tok),
                self.at(),
            )),
            None => Err(CompileError::syntax(
                "expected declaration, found end of file",
                self.eof_span(),
            )),
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn parse_gen_decl(&mut self, tok: DeclTok) -> Result<DeclId, CompileError> {
        let start = self.at();
        self.advance(); // keyword
        let mut specs = Vec::new();
        if self.eat(Token::LParen) {
            while self.eat(Token::Semi) {}
            while !self.peek_is(Token::RParen) {
                specs.push(self.parse_spec(tok)?);
                if !self.peek_is(Token::RParen) {
                    self.expect(Token::Semi)?;
                    while self.eat(Token::Semi) {}
                }
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_spec(tok)?);
        }
        let end = self.prev_end();
        Ok(self.ast.push_decl(
            Decl::Gen { tok, specs },
            Span::with_file(start.start, end, self.file_id),
        ))
    }

    fn parse_spec(&mut self, tok: DeclTok) -> Result<SpecId, CompileError> {
        let start = self.at();
        let spec = match tok {
            DeclTok::Import => {
                let name = if self.peek_is(Token::Ident) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                let path_span = self.expect(Token::Str)?;
                let path = unquote(self.text(path_span)).ok_or_else(|| {
                    CompileError::syntax("malformed import path", path_span)
                })?;
                Spec::Import { name, path, path_span }
            }
            DeclTok::Type => {
                let name = self.expect_ident()?;
                let ty = self.parse_type()?;
                Spec::Type { name, ty }
            }
            DeclTok::Var | DeclTok::Const => {
                let mut names = vec![self.expect_ident()?];
                while self.eat(Token::Comma) {
                    names.push(self.expect_ident()?);
                }
                let ty = if !self.peek_is(Token::Assign)
                    && !self.peek_is(Token::Semi)
                    && !self.peek_is(Token::RParen)
                    && self.peek().is_some()
                {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let mut values = Vec::new();
                if self.eat(Token::Assign) {
                    values.push(self.parse_expr()?);
                    while self.eat(Token::Comma) {
                        values.push(self.parse_expr()?);
                    }
                }
                Spec::Value { names, ty, values }
            }
        };
        let end = self.prev_end();
        Ok(self
            .ast
            .push_spec(spec, Span::with_file(start.start, end, self.file_id)))
    }

    fn parse_func_decl(&mut self) -> Result<DeclId, CompileError> {
        let start = self.expect(Token::Func)?;
        let recv = if self.eat(Token::LParen) {
            // `(t T)` names the receiver; `(T)` leaves it unnamed.
            let first = self.expect_ident()?;
            let recv = if self.peek_is(Token::RParen) {
                let span = self.ast.ident(first).span;
                let ty = self.ast.push_expr(Expr::Ident(first), span);
                Receiver { name: None, ty }
            } else {
                let ty = self.parse_type()?;
                Receiver { name: Some(first), ty }
            };
            self.expect(Token::RParen)?;
            Some(recv)
        } else {
            None
        };
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let result = if !self.peek_is(Token::LBrace)
            && !self.peek_is(Token::Semi)
            && self.peek().is_some()
        {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = if self.peek_is(Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = self.prev_end();
        Ok(self.ast.push_decl(
            Decl::Func(FuncDecl { recv, name, params, result, body }),
            Span::with_file(start.start, end, self.file_id),
        ))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while !self.peek_is(Token::RParen) {
            if !params.is_empty() {
                self.expect(Token::Comma)?;
            }
            let mut names = vec![self.expect_ident()?];
            while self.eat(Token::Comma) {
                names.push(self.expect_ident()?);
            }
            let ty = self.parse_type()?;
            params.push(Param { names, ty });
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    // ── Types ────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<ExprId, CompileError> {
        let start = self.at();
        match self.peek() {
            Some(Token::Ident) => {
                let id = self.expect_ident()?;
                let span = self.ast.ident(id).span;
                Ok(self.ast.push_expr(Expr::Ident(id), span))
            }
            Some(Token::LBrack) => {
                self.advance();
                self.expect(Token::RBrack)?;
                let elt = self.parse_type()?;
                let end = self.prev_end();
                Ok(self.ast.push_expr(
                    Expr::SliceType { elt },
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(Token::Star) => {
                self.advance();
                let inner = self.parse_type()?;
                let end = self.prev_end();
                Ok(self.ast.push_expr(
                    Expr::Star(inner),
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(Token::Struct) => {
                self.advance();
                self.expect(Token::LBrace)?;
                self.expect(Token::RBrace)?;
                let end = self.prev_end();
                Ok(self.ast.push_expr(
                    Expr::StructType,
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected type, found {}", tok),
                self.at(),
            )),
            None => Err(CompileError::syntax(
                "expected type, found end of file",
                self.eof_span(),
            )),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<StmtId, CompileError> {
        let start = self.expect(Token::LBrace)?;
        let mut list = Vec::new();
        loop {
            while self.eat(Token::Semi) {}
            if self.peek_is(Token::RBrace) || self.peek().is_none() {
                break;
            }
            list.push(self.parse_stmt()?);
            self.expect_terminator()?;
        }
        let end = self.expect(Token::RBrace)?;
        Ok(self.ast.push_stmt(
            Stmt::Block(list),
            Span::with_file(start.start, end.end, self.file_id),
        ))
    }

    fn parse_stmt(&mut self) -> Result<StmtId, CompileError> {
        let start = self.at();
        match self.peek() {
            Some(Token::Var) => {
                let d = self.parse_gen_decl(DeclTok::Var)?;
                Ok(self.decl_stmt(d, start))
            }
            Some(Token::Const) => {
                let d = self.parse_gen_decl(DeclTok::Const)?;
                Ok(self.decl_stmt(d, start))
            }
            Some(Token::Type) => {
                let d = self.parse_gen_decl(DeclTok::Type)?;
                Ok(self.decl_stmt(d, start))
            }
            Some(Token::LBrace) => self.parse_block(),
            Some(Token::If) => self.parse_if(),
            Some(Token::Switch) => self.parse_switch(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Return) => {
                self.advance();
                let mut exprs = Vec::new();
                if !self.at_stmt_end() {
                    exprs.push(self.parse_expr()?);
                    while self.eat(Token::Comma) {
                        exprs.push(self.parse_expr()?);
                    }
                }
                let end = self.prev_end();
                Ok(self.ast.push_stmt(
                    Stmt::Return(exprs),
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(Token::Break) => {
                self.advance();
                Ok(self.ast.push_stmt(Stmt::Break, start))
            }
            Some(Token::Continue) => {
                self.advance();
                Ok(self.ast.push_stmt(Stmt::Continue, start))
            }
            Some(Token::Defer) => {
                self.advance();
                let call = self.parse_expr()?;
                let end = self.prev_end();
                Ok(self.ast.push_stmt(
                    Stmt::Defer(call),
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(Token::Go) => {
                self.advance();
                let call = self.parse_expr()?;
                let end = self.prev_end();
                Ok(self.ast.push_stmt(
                    Stmt::Go(call),
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(_) => self.parse_simple_stmt(),
            None => Err(CompileError::syntax(
                "expected statement, found end of file",
                self.eof_span(),
            )),
        }
    }

    fn decl_stmt(&mut self, d: DeclId, start: Span) -> StmtId {
        let end = self.prev_end();
        self.ast.push_stmt(
            Stmt::DeclStmt(d),
            Span::with_file(start.start, end, self.file_id),
        )
    }

    fn at_stmt_end(&self) -> bool {
        matches!(self.peek(), Some(Token::Semi) | Some(Token::RBrace) | None)
    }

    /// Expression statement, assignment, or short variable declaration.
    fn parse_simple_stmt(&mut self) -> Result<StmtId, CompileError> {
        let start = self.at();
        let mut lhs = vec![self.parse_expr()?];
        while self.eat(Token::Comma) {
            lhs.push(self.parse_expr()?);
        }
        let tok = match self.peek() {
            Some(Token::ColonEq) => Some(AssignTok::Define),
            Some(Token::Assign) => Some(AssignTok::Assign),
            _ => None,
        };
        if let Some(tok) = tok {
            self.advance();
            let mut rhs = vec![self.parse_expr()?];
            while self.eat(Token::Comma) {
                rhs.push(self.parse_expr()?);
            }
            let end = self.prev_end();
            return Ok(self.ast.push_stmt(
                Stmt::Assign { lhs, rhs, tok },
                Span::with_file(start.start, end, self.file_id),
            ));
        }
        if lhs.len() != 1 {
            return Err(CompileError::syntax(
                "expected assignment after expression list",
                self.at(),
            ));
        }
        let e = lhs.pop().unwrap();
        let end = self.prev_end();
        Ok(self.ast.push_stmt(
            Stmt::ExprStmt(e),
            Span::with_file(start.start, end, self.file_id),
        ))
    }

    fn parse_if(&mut self) -> Result<StmtId, CompileError> {
        let start = self.expect(Token::If)?;
        let (init, cond) = self.parse_header_cond()?;
        let cond = cond.ok_or_else(|| {
            CompileError::syntax("if statement needs a condition", self.at())
        })?;
        let body = self.parse_block()?;
        let else_ = if self.eat(Token::Else) {
            if self.peek_is(Token::If) {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        let end = self.prev_end();
        Ok(self.ast.push_stmt(
            Stmt::If { init, cond, body, else_ },
            Span::with_file(start.start, end, self.file_id),
        ))
    }

    fn parse_switch(&mut self) -> Result<StmtId, CompileError> {
        let start = self.expect(Token::Switch)?;
        let (init, tag) = if self.peek_is(Token::LBrace) {
            (None, None)
        } else {
            self.parse_header_cond()?
        };
        self.expect(Token::LBrace)?;
        let mut cases = Vec::new();
        loop {
            while self.eat(Token::Semi) {}
            match self.peek() {
                Some(Token::Case) => {
                    let cstart = self.at();
                    self.advance();
                    let mut exprs = vec![self.parse_expr()?];
                    while self.eat(Token::Comma) {
                        exprs.push(self.parse_expr()?);
                    }
                    self.expect(Token::Colon)?;
                    let body = self.parse_case_body()?;
                    let end = self.prev_end();
                    cases.push(self.ast.push_stmt(
                        Stmt::Case { exprs, default: false, body },
                        Span::with_file(cstart.start, end, self.file_id),
                    ));
                }
                Some(Token::Default) => {
                    let cstart = self.at();
                    self.advance();
                    self.expect(Token::Colon)?;
                    let body = self.parse_case_body()?;
                    let end = self.prev_end();
                    cases.push(self.ast.push_stmt(
                        Stmt::Case { exprs: Vec::new(), default: true, body },
                        Span::with_file(cstart.start, end, self.file_id),
                    ));
                }
                _ => break,
            }
        }
        let end = self.expect(Token::RBrace)?;
        Ok(self.ast.push_stmt(
            Stmt::Switch { init, tag, cases },
            Span::with_file(start.start, end.end, self.file_id),
        ))
    }

    fn parse_case_body(&mut self) -> Result<Vec<StmtId>, CompileError> {
        let mut body = Vec::new();
        loop {
            while self.eat(Token::Semi) {}
            match self.peek() {
                Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace) | None => break,
                _ => {
                    body.push(self.parse_stmt()?);
                    self.expect_terminator()?;
                }
            }
        }
        Ok(body)
    }

    fn parse_for(&mut self) -> Result<StmtId, CompileError> {
        let start = self.expect(Token::For)?;
        let mut init = None;
        let mut cond = None;
        let mut post = None;
        if !self.peek_is(Token::LBrace) {
            let was = self.no_composite;
            self.no_composite = true;
            let first = if self.peek_is(Token::Semi) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };
            if self.eat(Token::Semi) {
                init = first;
                if !self.peek_is(Token::Semi) {
                    cond = Some(self.parse_expr()?);
                }
                self.expect(Token::Semi)?;
                if !self.peek_is(Token::LBrace) {
                    post = Some(self.parse_simple_stmt()?);
                }
            } else {
                let stmt = first.ok_or_else(|| {
                    CompileError::syntax("for statement needs a condition", self.at())
                })?;
                match *self.ast.stmt(stmt) {
                    Stmt::ExprStmt(e) => cond = Some(e),
                    _ => {
                        return Err(CompileError::syntax(
                            "expected condition expression",
                            self.ast.stmt_span(stmt),
                        ))
                    }
                }
            }
            self.no_composite = was;
        }
        let body = self.parse_block()?;
        let end = self.prev_end();
        Ok(self.ast.push_stmt(
            Stmt::For { init, cond, post, body },
            Span::with_file(start.start, end, self.file_id),
        ))
    }

    /// `[init ;] cond` header of if and switch statements. Composite
    /// literals with a bare identifier type are off inside the header.
    fn parse_header_cond(
        &mut self,
    ) -> Result<(Option<StmtId>, Option<ExprId>), CompileError> {
        let was = self.no_composite;
        self.no_composite = true;
        let res = (|| {
            let first = self.parse_simple_stmt()?;
            if self.eat(Token::Semi) {
                let cond = if self.peek_is(Token::LBrace) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                return Ok((Some(first), cond));
            }
            match *self.ast.stmt(first) {
                Stmt::ExprStmt(e) => Ok((None, Some(e))),
                _ => Err(CompileError::syntax(
                    "expected condition expression",
                    self.ast.stmt_span(first),
                )),
            }
        })();
        self.no_composite = was;
        res
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<ExprId, CompileError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprId, CompileError> {
        let start = self.at();
        let mut lhs = self.parse_unary()?;
        while let Some(tok) = self.peek() {
            let Some((op, prec)) = binop_for(tok) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let end = self.prev_end();
            lhs = self.ast.push_expr(
                Expr::Binary { op, x: lhs, y: rhs },
                Span::with_file(start.start, end, self.file_id),
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprId, CompileError> {
        let start = self.at();
        let op = match self.peek() {
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Minus) => Some(UnaryOp::Minus),
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Amp) => Some(UnaryOp::Amp),
            Some(Token::Star) => {
                self.advance();
                let x = self.parse_unary()?;
                let end = self.prev_end();
                return Ok(self.ast.push_expr(
                    Expr::Star(x),
                    Span::with_file(start.start, end, self.file_id),
                ));
            }
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let x = self.parse_unary()?;
            let end = self.prev_end();
            return Ok(self.ast.push_expr(
                Expr::Unary { op, x },
                Span::with_file(start.start, end, self.file_id),
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprId, CompileError> {
        let start = self.at();
        let mut e = self.parse_operand()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.peek_is(Token::RParen) {
                        if !args.is_empty() {
                            self.expect(Token::Comma)?;
                        }
                        args.push(self.parse_expr()?);
                    }
                    let end = self.expect(Token::RParen)?;
                    e = self.ast.push_expr(
                        Expr::Call { fun: e, args },
                        Span::with_file(start.start, end.end, self.file_id),
                    );
                }
                Some(Token::LBrack) => {
                    self.advance();
                    e = self.parse_index_or_slice(e, start)?;
                }
                Some(Token::Dot) => {
                    self.advance();
                    let sel = self.expect_ident()?;
                    let end = self.prev_end();
                    e = self.ast.push_expr(
                        Expr::Selector { x: e, sel },
                        Span::with_file(start.start, end, self.file_id),
                    );
                }
                Some(Token::LBrace) if !self.no_composite && self.is_composite_type(e) => {
                    e = self.parse_composite_body(Some(e), start)?;
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn is_composite_type(&self, e: ExprId) -> bool {
        matches!(
            self.ast.expr(e),
            Expr::Ident(_) | Expr::SliceType { .. }
        )
    }

    fn parse_index_or_slice(
        &mut self,
        x: ExprId,
        start: Span,
    ) -> Result<ExprId, CompileError> {
        let low = if self.peek_is(Token::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        if self.eat(Token::Colon) {
            let high = if self.peek_is(Token::Colon) || self.peek_is(Token::RBrack) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let max = if self.eat(Token::Colon) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let end = self.expect(Token::RBrack)?;
            return Ok(self.ast.push_expr(
                Expr::Slice { x, low, high, max },
                Span::with_file(start.start, end.end, self.file_id),
            ));
        }
        let index = low.ok_or_else(|| {
            CompileError::syntax("expected index expression", self.at())
        })?;
        let end = self.expect(Token::RBrack)?;
        Ok(self.ast.push_expr(
            Expr::Index { x, index },
            Span::with_file(start.start, end.end, self.file_id),
        ))
    }

    fn parse_composite_body(
        &mut self,
        ty: Option<ExprId>,
        start: Span,
    ) -> Result<ExprId, CompileError> {
        self.expect(Token::LBrace)?;
        let mut elts = Vec::new();
        // Elements never see the header restriction.
        let was = self.no_composite;
        self.no_composite = false;
        while !self.peek_is(Token::RBrace) {
            if !elts.is_empty() {
                self.expect(Token::Comma)?;
                if self.peek_is(Token::RBrace) {
                    break;
                }
            }
            elts.push(self.parse_expr()?);
        }
        self.no_composite = was;
        let end = self.expect(Token::RBrace)?;
        Ok(self.ast.push_expr(
            Expr::Composite { ty, elts },
            Span::with_file(start.start, end.end, self.file_id),
        ))
    }

    fn parse_operand(&mut self) -> Result<ExprId, CompileError> {
        let start = self.at();
        match self.peek() {
            Some(Token::Ident) => {
                let id = self.expect_ident()?;
                let span = self.ast.ident(id).span;
                Ok(self.ast.push_expr(Expr::Ident(id), span))
            }
            Some(Token::Int) => {
                self.advance();
                let value = self.text(start).to_string();
                Ok(self
                    .ast
                    .push_expr(Expr::Lit(Lit { kind: LitKind::Int, value }), start))
            }
            Some(Token::Str) => {
                self.advance();
                let value = self.text(start).to_string();
                Ok(self
                    .ast
                    .push_expr(Expr::Lit(Lit { kind: LitKind::Str, value }), start))
            }
            Some(Token::Char) => {
                self.advance();
                let value = self.text(start).to_string();
                Ok(self
                    .ast
                    .push_expr(Expr::Lit(Lit { kind: LitKind::Char, value }), start))
            }
            Some(Token::LParen) => {
                self.advance();
                let was = self.no_composite;
                self.no_composite = false;
                let inner = self.parse_expr()?;
                self.no_composite = was;
                let end = self.expect(Token::RParen)?;
                Ok(self.ast.push_expr(
                    Expr::Paren(inner),
                    Span::with_file(start.start, end.end, self.file_id),
                ))
            }
            Some(Token::LBrack) => {
                // `[]T{...}` in expression position.
                self.advance();
                self.expect(Token::RBrack)?;
                let elt = self.parse_type()?;
                let end = self.prev_end();
                let ty = self.ast.push_expr(
                    Expr::SliceType { elt },
                    Span::with_file(start.start, end, self.file_id),
                );
                self.parse_composite_body(Some(ty), start)
            }
            Some(Token::Func) => {
                self.advance();
                let params = self.parse_params()?;
                let result = if !self.peek_is(Token::LBrace) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let body = self.parse_block()?;
                let end = self.prev_end();
                Ok(self.ast.push_expr(
                    Expr::FuncLit { params, result, body },
                    Span::with_file(start.start, end, self.file_id),
                ))
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected expression, found {}", tok),
                self.at(),
            )),
            None => Err(CompileError::syntax(
                "expected expression, found end of file",
                self.eof_span(),
            )),
        }
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }
}

fn binop_for(tok: Token) -> Option<(BinOp, u8)> {
    let op = match tok {
        Token::OrOr => (BinOp::Or, 1),
        Token::AndAnd => (BinOp::And, 2),
        Token::EqEq => (BinOp::Eq, 3),
        Token::NotEq => (BinOp::Ne, 3),
        Token::Lt => (BinOp::Lt, 3),
        Token::Le => (BinOp::Le, 3),
        Token::Gt => (BinOp::Gt, 3),
        Token::Ge => (BinOp::Ge, 3),
        Token::Plus => (BinOp::Add, 4),
        Token::Minus => (BinOp::Sub, 4),
        Token::Star => (BinOp::Mul, 5),
        Token::Slash => (BinOp::Div, 5),
        Token::Percent => (BinOp::Rem, 5),
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_src(src: &str) -> (Ast, FileId) {
        let mut ast = Ast::new();
        let fid = parse_file(&mut ast, src, Path::new("test.mino"), 0).unwrap();
        (ast, fid)
    }

    #[test]
    fn parses_package_and_func() {
        let (ast, fid) = parse_src("package main\n\nfunc main() {\n}\n");
        let file = &ast.files[fid.index()];
        assert_eq!(file.package, "main");
        assert_eq!(file.decls.len(), 1);
        let Decl::Func(f) = ast.decl(file.decls[0]) else {
            panic!("expected func decl");
        };
        assert_eq!(ast.ident_name(f.name), "main");
        assert!(f.recv.is_none());
    }

    #[test]
    fn parses_method_receiver() {
        let (ast, fid) = parse_src("package main\n\ntype T struct{}\n\nfunc (t T) M() {\n}\n");
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[1]) else {
            panic!("expected func decl");
        };
        let recv = f.recv.as_ref().unwrap();
        assert_eq!(ast.ident_name(recv.name.unwrap()), "t");
        assert_eq!(ast.base_type_name(recv.ty), Some("T"));
    }

    #[test]
    fn parses_if_with_init_and_else() {
        let (ast, fid) =
            parse_src("package main\n\nfunc f() {\n\tif x := 1; x > 0 {\n\t} else {\n\t}\n}\n");
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[0]) else { panic!() };
        let Stmt::Block(body) = ast.stmt(f.body.unwrap()) else { panic!() };
        let Stmt::If { init, else_, .. } = ast.stmt(body[0]) else {
            panic!("expected if");
        };
        assert!(init.is_some());
        assert!(else_.is_some());
    }

    #[test]
    fn header_identifier_is_not_a_composite() {
        // `if true { }` must not parse `true { }` as a composite literal.
        let (ast, fid) =
            parse_src("package main\n\nfunc f() {\n\tif true {\n\t\tpanic(\"x\")\n\t}\n}\n");
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[0]) else { panic!() };
        let Stmt::Block(body) = ast.stmt(f.body.unwrap()) else { panic!() };
        assert!(matches!(ast.stmt(body[0]), Stmt::If { .. }));
    }

    #[test]
    fn parses_composite_and_slice_exprs() {
        let (ast, fid) = parse_src(
            "package main\n\nfunc f() {\n\ta := []int{1, 2, 3}\n\tprint(a[1:3][0])\n}\n",
        );
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[0]) else { panic!() };
        let Stmt::Block(body) = ast.stmt(f.body.unwrap()) else { panic!() };
        let Stmt::Assign { rhs, tok, .. } = ast.stmt(body[0]) else { panic!() };
        assert_eq!(*tok, AssignTok::Define);
        let Expr::Composite { ty, elts } = ast.expr(rhs[0]) else { panic!() };
        assert!(matches!(ast.expr(ty.unwrap()), Expr::SliceType { .. }));
        assert_eq!(elts.len(), 3);
        let Stmt::ExprStmt(call) = ast.stmt(body[1]) else { panic!() };
        let Expr::Call { args, .. } = ast.expr(*call) else { panic!() };
        let Expr::Index { x, .. } = ast.expr(args[0]) else { panic!() };
        assert!(matches!(ast.expr(*x), Expr::Slice { .. }));
    }

    #[test]
    fn parses_grouped_imports() {
        let (ast, fid) = parse_src(
            "package main\n\nimport (\n\t\"fmt\"\n\t_ \"strings\"\n)\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
        );
        let file = &ast.files[fid.index()];
        let Decl::Gen { tok, specs } = ast.decl(file.decls[0]) else { panic!() };
        assert_eq!(*tok, DeclTok::Import);
        assert_eq!(specs.len(), 2);
        let Spec::Import { name, path, .. } = ast.spec(specs[1]) else { panic!() };
        assert_eq!(ast.ident_name(name.unwrap()), "_");
        assert_eq!(path, "strings");
    }

    #[test]
    fn parses_switch_and_for() {
        let (ast, fid) = parse_src(
            "package main\n\nfunc f(n int) {\n\tswitch n {\n\tcase 1:\n\t\tprint(1)\n\tdefault:\n\t}\n\tfor i := 0; i < n; i = i + 1 {\n\t}\n\tfor n > 0 {\n\t\tbreak\n\t}\n}\n",
        );
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[0]) else { panic!() };
        let Stmt::Block(body) = ast.stmt(f.body.unwrap()) else { panic!() };
        let Stmt::Switch { tag, cases, .. } = ast.stmt(body[0]) else { panic!() };
        assert!(tag.is_some());
        assert_eq!(cases.len(), 2);
        let Stmt::For { init, cond, post, .. } = ast.stmt(body[1]) else { panic!() };
        assert!(init.is_some() && cond.is_some() && post.is_some());
        let Stmt::For { init, cond, post, .. } = ast.stmt(body[2]) else { panic!() };
        assert!(init.is_none() && cond.is_some() && post.is_none());
    }

    #[test]
    fn go_and_defer_statements() {
        let (ast, fid) =
            parse_src("package main\n\nfunc f() {\n\tgo f()\n\tdefer f()\n}\n");
        let file = &ast.files[fid.index()];
        let Decl::Func(f) = ast.decl(file.decls[0]) else { panic!() };
        let Stmt::Block(body) = ast.stmt(f.body.unwrap()) else { panic!() };
        assert!(matches!(ast.stmt(body[0]), Stmt::Go(_)));
        assert!(matches!(ast.stmt(body[1]), Stmt::Defer(_)));
    }

    #[test]
    fn missing_package_clause_is_an_error() {
        let mut ast = Ast::new();
        assert!(parse_file(&mut ast, "func main() {}\n", Path::new("t.mino"), 0).is_err());
    }
}
