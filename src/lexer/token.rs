use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // Keywords
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("func")]
    Func,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("type")]
    Type,
    #[token("struct")]
    Struct,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("defer")]
    Defer,
    #[token("go")]
    Go,

    // Literals and identifiers
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex(r"'([^'\\\n]|\\.)'")]
    Char,

    // Operators and punctuation
    #[token(":=")]
    ColonEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("=")]
    Assign,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("\n")]
    Newline,
}

impl Token {
    /// Tokens that end a statement for automatic semicolon insertion:
    /// a newline after one of these becomes an explicit `;`.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            Token::Ident
                | Token::Int
                | Token::Str
                | Token::Char
                | Token::Return
                | Token::Break
                | Token::Continue
                | Token::RParen
                | Token::RBrack
                | Token::RBrace
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Package => "'package'",
            Token::Import => "'import'",
            Token::Func => "'func'",
            Token::Var => "'var'",
            Token::Const => "'const'",
            Token::Type => "'type'",
            Token::Struct => "'struct'",
            Token::Return => "'return'",
            Token::If => "'if'",
            Token::Else => "'else'",
            Token::Switch => "'switch'",
            Token::Case => "'case'",
            Token::Default => "'default'",
            Token::For => "'for'",
            Token::Break => "'break'",
            Token::Continue => "'continue'",
            Token::Defer => "'defer'",
            Token::Go => "'go'",
            Token::Ident => "identifier",
            Token::Int => "integer literal",
            Token::Str => "string literal",
            Token::Char => "character literal",
            Token::ColonEq => "':='",
            Token::EqEq => "'=='",
            Token::NotEq => "'!='",
            Token::Le => "'<='",
            Token::Ge => "'>='",
            Token::AndAnd => "'&&'",
            Token::OrOr => "'||'",
            Token::Assign => "'='",
            Token::Lt => "'<'",
            Token::Gt => "'>'",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::Bang => "'!'",
            Token::Amp => "'&'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
            Token::LBrack => "'['",
            Token::RBrack => "']'",
            Token::Comma => "','",
            Token::Semi => "';'",
            Token::Colon => "':'",
            Token::Dot => "'.'",
            Token::Newline => "newline",
        };
        f.write_str(s)
    }
}
