//! Syntax tree for tokimun source.
//!
//! Every statement and expression carries the `Span` of its first
//! token. The tree is built once by the parser and only read afterwards.

use crate::token::Span;

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    pub block: Block,
}

/// A sequence of statements sharing one scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `local a, b = x, y`
    Local { names: Vec<String>, values: Vec<Expr> },
    /// `global a, b = x, y`
    Global { names: Vec<String>, values: Vec<Expr> },
    /// `a, t.b, t[c] = x, y, z`
    Assign { targets: Vec<Expr>, values: Vec<Expr> },
    /// `target op= value`
    CompoundAssign {
        target: Expr,
        op: BinaryOp,
        value: Expr,
    },
    /// `if c then ... elseif c then ... else ... end`
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While { condition: Expr, body: Block },
    Repeat { body: Block, condition: Expr },
    NumericFor {
        var: String,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
    },
    GenericFor {
        names: Vec<String>,
        values: Vec<Expr>,
        body: Block,
    },
    FunctionDecl {
        scope: FunctionScope,
        name: FunctionName,
        func: Function,
    },
    Return(Vec<Expr>),
    Break,
    Continue,
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
    },
    Label(String),
    Goto(String),
    Do(Block),
    /// A call used as a statement.
    Expr(Expr),
}

/// How a `function` statement binds its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionScope {
    /// `function a.b:c() end`
    Plain,
    /// `local function f() end`
    Local,
    /// `global function f() end`
    Global,
}

/// `a.b.c` or `a.b:c` in a function statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    pub path: Vec<String>,
    pub method: Option<String>,
}

/// Parameters and body shared by function statements and expressions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Function {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub body: Block,
}

/// One `case v1, v2 ...` clause of a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the expression may appear on the left of `=`.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::Index { .. } | ExprKind::Field { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    /// Numeral exactly as written.
    Number(String),
    /// String literal exactly as written, delimiters included.
    String(String),
    Template(Vec<TemplateSegment>),
    Varargs,
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `left ?? right`
    NilCoalesce {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    Field {
        object: Box<Expr>,
        name: String,
    },
    /// `object?.a.b(c)`: nil if `object` is nil, otherwise the accessors
    /// applied in order.
    OptionalChain {
        object: Box<Expr>,
        accessors: Vec<Accessor>,
    },
    Table(Vec<TableField>),
    Function(Function),
    /// Explicit parentheses, which truncate multiple results to one.
    Paren(Box<Expr>),
}

/// One link of an optional chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Field(String),
    Index(Expr),
    Call(Vec<Expr>),
    Method { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    /// Literal text with escapes still raw.
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableField {
    /// `value`
    Positional(Expr),
    /// `name = value`
    Named { name: String, value: Expr },
    /// `[key] = value`
    Keyed { key: Expr, value: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    NotEq,
    Eq,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Lua spelling of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::NotEq => "~=",
            Self::Eq => "==",
            Self::Concat => "..",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
        }
    }

    /// Left and right binding power, as in Lua's own parser.
    #[must_use]
    pub const fn priority(self) -> (u8, u8) {
        match self {
            Self::Or => (2, 2),
            Self::And => (3, 3),
            Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::NotEq | Self::Eq => (4, 4),
            Self::Concat => (10, 9),
            Self::Add | Self::Sub => (11, 11),
            Self::Mul | Self::Div | Self::Mod => (12, 12),
            Self::Pow => (15, 14),
        }
    }

    #[must_use]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Self::Concat | Self::Pow)
    }
}

/// Binding power of unary operators: above `*`, below `^`.
pub const UNARY_PRIORITY: u8 = 13;

/// Binding power of `??`, below `or`; right-associative.
pub const NIL_COALESCE_PRIORITY: (u8, u8) = (1, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Len,
    Neg,
}

impl UnaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Not => "not ",
            Self::Len => "#",
            Self::Neg => "-",
        }
    }
}
