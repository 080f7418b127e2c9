use std::fmt;

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Number,
    String,
    /// Back-quoted string; text keeps the quotes and raw `${...}` spans.
    TemplateString,
    Identifier,
    True,
    False,
    Nil,

    // Keywords
    And,
    Break,
    Continue,
    Case,
    Default,
    Do,
    Else,
    Elseif,
    End,
    For,
    Function,
    Global,
    Goto,
    If,
    In,
    Local,
    Not,
    Or,
    Repeat,
    Return,
    Switch,
    Then,
    Until,
    While,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Hash,
    Eq,
    /// `~=` or `!=`.
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Assign,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Colon,
    DoubleColon,
    Comma,
    Dot,
    DotDot,
    DotDotDot,
    QuestionDot,
    DoubleQuestion,

    // Compound assignment
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    DotDotAssign,

    Eof,
}

impl TokenKind {
    /// Look up a reserved word.
    #[must_use]
    pub fn keyword(text: &str) -> Option<Self> {
        let kind = match text {
            "and" => Self::And,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "case" => Self::Case,
            "default" => Self::Default,
            "do" => Self::Do,
            "else" => Self::Else,
            "elseif" => Self::Elseif,
            "end" => Self::End,
            "false" => Self::False,
            "for" => Self::For,
            "function" => Self::Function,
            "global" => Self::Global,
            "goto" => Self::Goto,
            "if" => Self::If,
            "in" => Self::In,
            "local" => Self::Local,
            "nil" => Self::Nil,
            "not" => Self::Not,
            "or" => Self::Or,
            "repeat" => Self::Repeat,
            "return" => Self::Return,
            "switch" => Self::Switch,
            "then" => Self::Then,
            "true" => Self::True,
            "until" => Self::Until,
            "while" => Self::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable form used in parser diagnostics.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::TemplateString => "template string",
            Self::Identifier => "identifier",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Nil => "'nil'",
            Self::And => "'and'",
            Self::Break => "'break'",
            Self::Continue => "'continue'",
            Self::Case => "'case'",
            Self::Default => "'default'",
            Self::Do => "'do'",
            Self::Else => "'else'",
            Self::Elseif => "'elseif'",
            Self::End => "'end'",
            Self::For => "'for'",
            Self::Function => "'function'",
            Self::Global => "'global'",
            Self::Goto => "'goto'",
            Self::If => "'if'",
            Self::In => "'in'",
            Self::Local => "'local'",
            Self::Not => "'not'",
            Self::Or => "'or'",
            Self::Repeat => "'repeat'",
            Self::Return => "'return'",
            Self::Switch => "'switch'",
            Self::Then => "'then'",
            Self::Until => "'until'",
            Self::While => "'while'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Caret => "'^'",
            Self::Hash => "'#'",
            Self::Eq => "'=='",
            Self::NotEq => "'~='",
            Self::Lt => "'<'",
            Self::Gt => "'>'",
            Self::Le => "'<='",
            Self::Ge => "'>='",
            Self::Assign => "'='",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Semicolon => "';'",
            Self::Colon => "':'",
            Self::DoubleColon => "'::'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::DotDot => "'..'",
            Self::DotDotDot => "'...'",
            Self::QuestionDot => "'?.'",
            Self::DoubleQuestion => "'??'",
            Self::PlusAssign => "'+='",
            Self::MinusAssign => "'-='",
            Self::StarAssign => "'*='",
            Self::SlashAssign => "'/='",
            Self::PercentAssign => "'%='",
            Self::DotDotAssign => "'..='",
            Self::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single token with its kind, raw source text, and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}
