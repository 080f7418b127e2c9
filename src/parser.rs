use std::fmt;

use crate::ast::{
    Accessor, BinaryOp, Block, Chunk, Expr, ExprKind, Function, FunctionName, FunctionScope,
    NIL_COALESCE_PRIORITY, Stmt, StmtKind, SwitchCase, TableField, TemplateSegment,
    UNARY_PRIORITY, UnaryOp,
};
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Expected a construct, found another token or end of input (`None`).
    Expected {
        expected: String,
        found: Option<String>,
    },
    /// Left side of `=` is not a name, field, or index.
    InvalidAssignmentTarget,
    /// Compound assignment on a non-assignable or multi-target left side.
    InvalidCompoundTarget,
    /// An expression other than a call used as a statement.
    NotAStatement,
    /// Second `default` clause in one switch.
    DuplicateDefault,
    /// `${}` with nothing inside.
    EmptyInterpolation,
    /// Lexical error inside a `${...}` span.
    InvalidInterpolation(String),
    /// Statements or expressions nested past `MAX_DEPTH` levels.
    TooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected {
                expected,
                found: None,
            } => write!(f, "expected {expected}, got end of input"),
            Self::Expected {
                expected,
                found: Some(t),
            } => write!(f, "expected {expected}, got '{t}'"),
            Self::InvalidAssignmentTarget => {
                write!(f, "cannot assign to this expression")
            }
            Self::InvalidCompoundTarget => {
                write!(
                    f,
                    "compound assignment needs a single variable, \
                     field, or index target"
                )
            }
            Self::NotAStatement => {
                write!(f, "expression is not a statement")
            }
            Self::DuplicateDefault => {
                write!(f, "switch has more than one 'default' clause")
            }
            Self::EmptyInterpolation => {
                write!(f, "empty interpolation in template string")
            }
            Self::InvalidInterpolation(reason) => {
                write!(f, "invalid interpolation: {reason}")
            }
            Self::TooDeep => {
                write!(f, "too many nested syntax levels (limit is {MAX_DEPTH})")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Nesting limit for blocks, operands, and accessor chains, matching
/// the reference Lua parser.
pub const MAX_DEPTH: usize = 200;

/// Parse a token stream into a `Chunk`.
///
/// Stops at the first error; there is no recovery.
///
/// # Errors
///
/// Returns `ParseError` on unexpected tokens, invalid assignment
/// targets, duplicate `default` clauses, malformed template
/// interpolations, and input nested deeper than `MAX_DEPTH`.
pub fn parse(tokens: &[Token]) -> Result<Chunk, ParseError> {
    Parser::new(tokens, 0).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Current nesting level, carried into template interpolations.
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token], depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth,
        }
    }

    /// Go one level deeper; callers restore `depth` when done.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError {
                kind: ParseErrorKind::TooDeep,
                span: self.span(),
            });
        }
        Ok(())
    }

    fn parse(mut self) -> Result<Chunk, ParseError> {
        let block = self.parse_block()?;
        self.expect(TokenKind::Eof)?;
        Ok(Chunk { block })
    }

    // -- token helpers --

    fn peek(&self) -> TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Span::new(1, 1), |t| t.span)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_expected(&self, expected: impl Into<String>) -> ParseError {
        let found = self
            .tokens
            .get(self.pos)
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text.clone());
        ParseError {
            kind: ParseErrorKind::Expected {
                expected: expected.into(),
                found,
            },
            span: self.span(),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_expected(kind.describe()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if self.peek() != TokenKind::Identifier {
            return Err(self.error_expected("identifier"));
        }
        let name = self.tokens[self.pos].text.clone();
        self.pos += 1;
        Ok(name)
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Eof
                | TokenKind::End
                | TokenKind::Else
                | TokenKind::Elseif
                | TokenKind::Until
                | TokenKind::Case
                | TokenKind::Default
        )
    }

    // -- statements --

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let mut stmts = Vec::new();

        while !self.at_block_end() {
            match self.peek() {
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Return => {
                    stmts.push(self.parse_return()?);
                    if !self.at_block_end() {
                        return Err(self.error_expected("end of block after 'return'"));
                    }
                }
                _ => stmts.push(self.parse_statement()?),
            }
        }

        Ok(Block { stmts })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        self.advance(); // skip return
        let values = if self.at_block_end() || self.peek() == TokenKind::Semicolon {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.eat(TokenKind::Semicolon);
        Ok(Stmt {
            kind: StmtKind::Return(values),
            span,
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.span();
        let depth = self.depth;
        self.enter()?;
        let kind = match self.peek() {
            TokenKind::If => self.parse_if()?,
            TokenKind::While => {
                self.advance();
                let condition = self.parse_expr()?;
                self.expect(TokenKind::Do)?;
                let body = self.parse_block()?;
                self.expect(TokenKind::End)?;
                StmtKind::While { condition, body }
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenKind::End)?;
                StmtKind::Do(body)
            }
            TokenKind::Repeat => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenKind::Until)?;
                let condition = self.parse_expr()?;
                StmtKind::Repeat { body, condition }
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Function => {
                self.advance();
                let name = self.parse_function_name()?;
                let func = self.parse_function_body()?;
                StmtKind::FunctionDecl {
                    scope: FunctionScope::Plain,
                    name,
                    func,
                }
            }
            TokenKind::Local => {
                self.advance();
                self.parse_declaration(FunctionScope::Local)?
            }
            TokenKind::Global => {
                self.advance();
                self.parse_declaration(FunctionScope::Global)?
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Goto => {
                self.advance();
                StmtKind::Goto(self.expect_identifier()?)
            }
            TokenKind::DoubleColon => {
                self.advance();
                let name = self.expect_identifier()?;
                self.expect(TokenKind::DoubleColon)?;
                StmtKind::Label(name)
            }
            TokenKind::Switch => self.parse_switch()?,
            _ => self.parse_expr_statement()?,
        };
        self.depth = depth;
        Ok(Stmt { kind, span })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // skip if
        let mut branches = Vec::new();

        loop {
            let condition = self.parse_expr()?;
            self.expect(TokenKind::Then)?;
            let body = self.parse_block()?;
            branches.push((condition, body));
            if !self.eat(TokenKind::Elseif) {
                break;
            }
        }

        let else_block = if self.eat(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(TokenKind::End)?;

        Ok(StmtKind::If {
            branches,
            else_block,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // skip for
        let first = self.expect_identifier()?;

        if self.eat(TokenKind::Assign) {
            let start = self.parse_expr()?;
            self.expect(TokenKind::Comma)?;
            let limit = self.parse_expr()?;
            let step = if self.eat(TokenKind::Comma) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Do)?;
            let body = self.parse_block()?;
            self.expect(TokenKind::End)?;
            return Ok(StmtKind::NumericFor {
                var: first,
                start,
                limit,
                step,
                body,
            });
        }

        let mut names = vec![first];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        if self.peek() != TokenKind::In {
            return Err(self.error_expected("'=' or 'in'"));
        }
        self.advance();
        let values = self.parse_expr_list()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End)?;

        Ok(StmtKind::GenericFor {
            names,
            values,
            body,
        })
    }

    /// After `local` or `global`: a function or a name list.
    fn parse_declaration(&mut self, scope: FunctionScope) -> Result<StmtKind, ParseError> {
        if self.eat(TokenKind::Function) {
            let name = self.expect_identifier()?;
            let func = self.parse_function_body()?;
            return Ok(StmtKind::FunctionDecl {
                scope,
                name: FunctionName {
                    path: vec![name],
                    method: None,
                },
                func,
            });
        }

        let names = self.parse_name_list()?;
        let values = if self.eat(TokenKind::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        Ok(if scope == FunctionScope::Global {
            StmtKind::Global { names, values }
        } else {
            StmtKind::Local { names, values }
        })
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn parse_switch(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // skip switch
        let subject = self.parse_expr()?;
        let mut cases = Vec::new();
        let mut default = None;

        loop {
            match self.peek() {
                TokenKind::Case => {
                    self.advance();
                    let values = self.parse_expr_list()?;
                    let body = self.parse_block()?;
                    cases.push(SwitchCase { values, body });
                }
                TokenKind::Default => {
                    let span = self.span();
                    self.advance();
                    if default.is_some() {
                        return Err(ParseError {
                            kind: ParseErrorKind::DuplicateDefault,
                            span,
                        });
                    }
                    default = Some(self.parse_block()?);
                }
                _ => break,
            }
        }
        self.expect(TokenKind::End)?;

        Ok(StmtKind::Switch {
            subject,
            cases,
            default,
        })
    }

    fn parse_expr_statement(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_suffixed_expr()?;

        if let Some(op) = compound_op(self.peek()) {
            if !first.is_assignable() {
                return Err(ParseError {
                    kind: ParseErrorKind::InvalidCompoundTarget,
                    span: first.span,
                });
            }
            self.advance();
            let value = self.parse_expr()?;
            return Ok(StmtKind::CompoundAssign {
                target: first,
                op,
                value,
            });
        }

        if !matches!(self.peek(), TokenKind::Assign | TokenKind::Comma) {
            return if is_call(&first) {
                Ok(StmtKind::Expr(first))
            } else {
                Err(ParseError {
                    kind: ParseErrorKind::NotAStatement,
                    span: first.span,
                })
            };
        }

        let mut targets = vec![first];
        while self.eat(TokenKind::Comma) {
            targets.push(self.parse_suffixed_expr()?);
        }
        if compound_op(self.peek()).is_some() {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidCompoundTarget,
                span: targets[0].span,
            });
        }
        if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidAssignmentTarget,
                span: bad.span,
            });
        }
        self.expect(TokenKind::Assign)?;
        let values = self.parse_expr_list()?;

        Ok(StmtKind::Assign { targets, values })
    }

    fn parse_function_name(&mut self) -> Result<FunctionName, ParseError> {
        let mut path = vec![self.expect_identifier()?];
        while self.eat(TokenKind::Dot) {
            path.push(self.expect_identifier()?);
        }
        let method = if self.eat(TokenKind::Colon) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(FunctionName { path, method })
    }

    fn parse_function_body(&mut self) -> Result<Function, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut is_vararg = false;

        if self.peek() != TokenKind::RParen {
            loop {
                if self.eat(TokenKind::DotDotDot) {
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_identifier()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End)?;

        Ok(Function {
            params,
            is_vararg,
            body,
        })
    }

    // -- expressions --

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_subexpr(0)
    }

    /// Precedence climbing: keeps folding operators whose left binding
    /// power exceeds `limit`.
    fn parse_subexpr(&mut self, limit: u8) -> Result<Expr, ParseError> {
        let span = self.span();
        let depth = self.depth;
        self.enter()?;
        let mut left = if let Some(op) = unary_op(self.peek()) {
            self.advance();
            let operand = self.parse_subexpr(UNARY_PRIORITY)?;
            Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            )
        } else {
            self.parse_simple_expr()?
        };

        loop {
            if self.peek() == TokenKind::DoubleQuestion {
                let (left_power, right_power) = NIL_COALESCE_PRIORITY;
                if left_power <= limit {
                    break;
                }
                self.advance();
                self.enter()?;
                let right = self.parse_subexpr(right_power)?;
                left = Expr::new(
                    ExprKind::NilCoalesce {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
                continue;
            }

            let Some(op) = binary_op(self.peek()) else {
                break;
            };
            let (left_power, right_power) = op.priority();
            if left_power <= limit {
                break;
            }
            self.advance();
            // Each fold nests `left` one level deeper.
            self.enter()?;
            let right = self.parse_subexpr(right_power)?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_simple_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        let kind = match self.peek() {
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::DotDotDot => ExprKind::Varargs,
            TokenKind::Number | TokenKind::String => {
                let text = self.tokens[self.pos].text.clone();
                if self.peek() == TokenKind::Number {
                    ExprKind::Number(text)
                } else {
                    ExprKind::String(text)
                }
            }
            TokenKind::TemplateString => {
                let token = &self.tokens[self.pos];
                ExprKind::Template(template_segments(token, self.depth)?)
            }
            TokenKind::LBrace => return self.parse_table(),
            TokenKind::Function => {
                self.advance();
                let func = self.parse_function_body()?;
                return Ok(Expr::new(ExprKind::Function(func), span));
            }
            _ => return self.parse_suffixed_expr(),
        };
        self.advance();
        Ok(Expr::new(kind, span))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        match self.peek() {
            TokenKind::Identifier => {
                let name = self.expect_identifier()?;
                Ok(Expr::new(ExprKind::Identifier(name), span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            _ => Err(self.error_expected("expression")),
        }
    }

    /// Primary expression followed by any run of field, index, call,
    /// method and `?.` accessors.
    fn parse_suffixed_expr(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut expr = self.parse_primary_expr()?;
        let mut chain: Option<Vec<Accessor>> = None;

        loop {
            if is_accessor_start(self.peek()) {
                self.enter()?;
            }
            let accessor = match self.peek() {
                TokenKind::QuestionDot => {
                    self.advance();
                    if let Some(accessors) = chain.take() {
                        expr = close_chain(expr, accessors);
                    }
                    chain = Some(Vec::new());
                    self.parse_optional_accessor()?
                }
                TokenKind::Dot => {
                    self.advance();
                    Accessor::Field(self.expect_identifier()?)
                }
                TokenKind::LBracket => self.parse_index_accessor()?,
                TokenKind::Colon => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    let args = self.parse_call_args()?;
                    Accessor::Method { name, args }
                }
                TokenKind::LParen | TokenKind::String | TokenKind::LBrace => {
                    Accessor::Call(self.parse_call_args()?)
                }
                _ => break,
            };

            match chain.as_mut() {
                Some(accessors) => accessors.push(accessor),
                None => expr = apply_accessor(expr, accessor),
            }
        }

        if let Some(accessors) = chain {
            expr = close_chain(expr, accessors);
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_optional_accessor(&mut self) -> Result<Accessor, ParseError> {
        match self.peek() {
            TokenKind::Identifier => Ok(Accessor::Field(self.expect_identifier()?)),
            TokenKind::LBracket => self.parse_index_accessor(),
            TokenKind::LParen => Ok(Accessor::Call(self.parse_call_args()?)),
            _ => Err(self.error_expected("field name, '[' or '(' after '?.'")),
        }
    }

    fn parse_index_accessor(&mut self) -> Result<Accessor, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let key = self.parse_expr()?;
        self.expect(TokenKind::RBracket)?;
        Ok(Accessor::Index(key))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        match self.peek() {
            TokenKind::String => Ok(vec![self.parse_simple_expr()?]),
            TokenKind::LBrace => Ok(vec![self.parse_table()?]),
            TokenKind::LParen => {
                self.advance();
                let args = if self.peek() == TokenKind::RParen {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect(TokenKind::RParen)?;
                Ok(args)
            }
            _ => Err(self.error_expected("function arguments")),
        }
    }

    fn parse_table(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();

        while self.peek() != TokenKind::RBrace {
            let field = match self.peek() {
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    self.expect(TokenKind::Assign)?;
                    TableField::Keyed {
                        key,
                        value: self.parse_expr()?,
                    }
                }
                TokenKind::Identifier if self.peek_nth(1) == TokenKind::Assign => {
                    let name = self.expect_identifier()?;
                    self.advance(); // skip =
                    TableField::Named {
                        name,
                        value: self.parse_expr()?,
                    }
                }
                _ => TableField::Positional(self.parse_expr()?),
            };
            fields.push(field);

            if !self.eat(TokenKind::Comma) && !self.eat(TokenKind::Semicolon) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Expr::new(ExprKind::Table(fields), span))
    }
}

fn close_chain(object: Expr, accessors: Vec<Accessor>) -> Expr {
    let span = object.span;
    Expr::new(
        ExprKind::OptionalChain {
            object: Box::new(object),
            accessors,
        },
        span,
    )
}

fn apply_accessor(object: Expr, accessor: Accessor) -> Expr {
    let span = object.span;
    let object = Box::new(object);
    let kind = match accessor {
        Accessor::Field(name) => ExprKind::Field { object, name },
        Accessor::Index(key) => ExprKind::Index {
            object,
            key: Box::new(key),
        },
        Accessor::Call(args) => ExprKind::Call {
            callee: object,
            args,
        },
        Accessor::Method { name, args } => ExprKind::MethodCall {
            object,
            method: name,
            args,
        },
    };
    Expr::new(kind, span)
}

const fn is_accessor_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::QuestionDot
            | TokenKind::Dot
            | TokenKind::LBracket
            | TokenKind::Colon
            | TokenKind::LParen
            | TokenKind::String
            | TokenKind::LBrace
    )
}

fn is_call(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } | ExprKind::MethodCall { .. } => true,
        ExprKind::OptionalChain { accessors, .. } => matches!(
            accessors.last(),
            Some(Accessor::Call(_) | Accessor::Method { .. })
        ),
        _ => false,
    }
}

const fn unary_op(kind: TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Hash => Some(UnaryOp::Len),
        TokenKind::Minus => Some(UnaryOp::Neg),
        _ => None,
    }
}

const fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Or => BinaryOp::Or,
        TokenKind::And => BinaryOp::And,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::DotDot => BinaryOp::Concat,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::Caret => BinaryOp::Pow,
        _ => return None,
    };
    Some(op)
}

const fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PlusAssign => BinaryOp::Add,
        TokenKind::MinusAssign => BinaryOp::Sub,
        TokenKind::StarAssign => BinaryOp::Mul,
        TokenKind::SlashAssign => BinaryOp::Div,
        TokenKind::PercentAssign => BinaryOp::Mod,
        TokenKind::DotDotAssign => BinaryOp::Concat,
        _ => return None,
    };
    Some(op)
}

// -- template strings --

fn step(pos: &mut Span, byte: u8) {
    if byte == b'\n' {
        pos.line += 1;
        pos.column = 1;
    } else {
        pos.column += 1;
    }
}

/// Split a template token into literal text and parsed `${...}`
/// expressions, in source order.
fn template_segments(token: &Token, depth: usize) -> Result<Vec<TemplateSegment>, ParseError> {
    let raw = token
        .text
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(&token.text);
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut pos = Span::new(token.span.line, token.span.column + 1);
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                for _ in 0..2 {
                    if let Some(&b) = bytes.get(i) {
                        step(&mut pos, b);
                        i += 1;
                    }
                }
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                if literal_start < i {
                    segments.push(TemplateSegment::Text(raw[literal_start..i].to_string()));
                }
                let open = pos;
                pos.column += 2;
                i += 2;

                let expr_start = i;
                let origin = pos;
                let mut depth = 1usize;
                while i < bytes.len() {
                    match bytes[i] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    step(&mut pos, bytes[i]);
                    i += 1;
                }
                if depth != 0 {
                    return Err(ParseError {
                        kind: ParseErrorKind::InvalidInterpolation(
                            "missing closing '}'".to_string(),
                        ),
                        span: open,
                    });
                }

                let expr = parse_interpolation(&raw[expr_start..i], origin, open, depth)?;
                segments.push(TemplateSegment::Expr(expr));
                step(&mut pos, b'}');
                i += 1;
                literal_start = i;
            }
            b => {
                step(&mut pos, b);
                i += 1;
            }
        }
    }

    if literal_start < bytes.len() {
        segments.push(TemplateSegment::Text(raw[literal_start..].to_string()));
    }
    Ok(segments)
}

/// Map a span inside an interpolation back onto the enclosing source.
const fn shift(span: Span, origin: Span) -> Span {
    if span.line == 1 {
        Span::new(origin.line, origin.column + span.column - 1)
    } else {
        Span::new(origin.line + span.line - 1, span.column)
    }
}

fn parse_interpolation(
    source: &str,
    origin: Span,
    open: Span,
    depth: usize,
) -> Result<Expr, ParseError> {
    if source.trim().is_empty() {
        return Err(ParseError {
            kind: ParseErrorKind::EmptyInterpolation,
            span: open,
        });
    }

    let mut tokens = tokenize(source).map_err(|e| ParseError {
        kind: ParseErrorKind::InvalidInterpolation(e.kind.to_string()),
        span: shift(e.span, origin),
    })?;
    for token in &mut tokens {
        token.span = shift(token.span, origin);
    }

    let mut parser = Parser::new(&tokens, depth);
    let expr = parser.parse_expr()?;
    if parser.peek() != TokenKind::Eof {
        return Err(parser.error_expected("'}' closing the interpolation"));
    }
    Ok(expr)
}
