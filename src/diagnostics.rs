use crate::span::{LineIndex, Span};
use std::path::Path;
use thiserror::Error;

/// Fatal front-end error: the source could not be turned into a tree.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("syntax error: {msg}")]
    Syntax { msg: String, span: Span },
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Syntax { span, .. } => *span,
        }
    }
}

/// A type-checker diagnostic. Never fatal: the checker always produces its
/// best-effort maps and reports problems on the side. Soft diagnostics
/// (unused variables, unused imports) still fail `mino build`.
#[derive(Debug, Clone)]
pub struct Diag {
    pub msg: String,
    pub span: Span,
    pub soft: bool,
}

impl Diag {
    pub fn new(msg: impl Into<String>, span: Span) -> Self {
        Self { msg: msg.into(), span, soft: false }
    }

    pub fn soft(msg: impl Into<String>, span: Span) -> Self {
        Self { msg: msg.into(), span, soft: true }
    }
}

/// Render a diagnostic location as `path:line:col: message`.
pub fn render(path: &Path, index: &LineIndex, span: Span, msg: &str) -> String {
    let (line, col) = index.line_col(span.start);
    format!("{}:{}:{}: {}", path.display(), line, col, msg)
}

/// Terminal errors of a reduction run. Candidate-level failures (temp-file
/// I/O, printing, predicate execution) never reach this type: the candidate
/// driver absorbs them as rejections.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    BadRegex(#[from] regex::Error),

    #[error("{0}")]
    Parse(String),

    #[error("expected 1 package, got {0}")]
    PackageCount(usize),

    #[error("expected an error to occur")]
    NoError,

    #[error("error does not match:\n{0}")]
    NoMatch(String),

    #[error("could not reduce program")]
    NoReduction,
}
