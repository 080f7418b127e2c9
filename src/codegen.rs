//! Lua emitter that walks a tokimun AST once and desugars the
//! constructs plain Lua lacks.
//!
//! Produces tab-indented output, one statement per line. Generated
//! temporaries and labels share the `__tkm_` prefix and a counter owned
//! by a single `generate` call.

use std::fmt;

use crate::ast::{
    Accessor, BinaryOp, Block, Chunk, Expr, ExprKind, Function, FunctionName, FunctionScope,
    Stmt, StmtKind, SwitchCase, TableField, TemplateSegment, UNARY_PRIORITY, UnaryOp,
};
use crate::lexer::{LexErrorKind, convert_number};
use crate::token::Span;

/// Classifies a code generation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// `break` with no enclosing loop in the same function.
    BreakOutsideLoop,
    /// `continue` with no enclosing loop in the same function.
    ContinueOutsideLoop,
    /// Binary or octal numeral that could not be converted.
    InvalidNumeral(String),
    /// Assignment to something other than a name, field, or index.
    InvalidAssignmentTarget,
    /// `continue` in a `repeat` body ahead of a top-level local, whose
    /// scope the jump to the label before `until` would enter.
    ContinueIntoLocalScope(String),
}

impl fmt::Display for CodegenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BreakOutsideLoop => write!(f, "'break' outside a loop"),
            Self::ContinueOutsideLoop => write!(f, "'continue' outside a loop"),
            Self::InvalidNumeral(text) => {
                write!(f, "invalid numeric literal: {text}")
            }
            Self::InvalidAssignmentTarget => {
                write!(f, "cannot assign to this expression")
            }
            Self::ContinueIntoLocalScope(name) => {
                write!(
                    f,
                    "'continue' in repeat jumps into the scope of local '{name}'"
                )
            }
        }
    }
}

/// Error produced during code generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    pub span: Span,
}

/// Generate Lua source for a parsed chunk.
///
/// # Errors
///
/// Returns `CodegenError` for `break`/`continue` outside a loop, a
/// `continue` that would skip over a `repeat` body local, binary or
/// octal numerals that overflow, and invalid assignment targets in
/// hand-built trees.
pub fn generate(chunk: &Chunk) -> Result<String, CodegenError> {
    let mut generator = Generator::default();
    generator.block(&chunk.block)?;

    let mut out = generator.out;
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Precedence of expressions that never need parentheses.
const ATOM: u8 = u8::MAX;

#[derive(Default)]
struct Generator {
    out: String,
    indent: usize,
    next_id: usize,
    /// Enclosing loops of the current function, innermost last, with
    /// the label their `continue`s jump to.
    loops: Vec<Option<String>>,
    /// Offset of the newline ending the previous statement line in the
    /// current block, where a `;` separator can go.
    line_end: Option<usize>,
}

impl Generator {
    fn fresh(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("__tkm_{prefix}_{}", self.next_id)
    }

    fn line(&mut self, text: &str) {
        // Otherwise Lua reads a leading `(` as a call on the line above.
        if let Some(end) = self.line_end.filter(|_| text.starts_with('(')) {
            self.out.insert(end, ';');
        }
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.line_end = Some(self.out.len());
        self.out.push('\n');
    }

    fn block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.line_end = None;
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn nested(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.indent += 1;
        let result = self.block(block);
        self.indent -= 1;
        result
    }

    // -- statements --

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::Local { names, values } => {
                let names = names.join(", ");
                if values.is_empty() {
                    self.line(&format!("local {names}"));
                } else {
                    let values = self.expr_list(values)?;
                    self.line(&format!("local {names} = {values}"));
                }
            }
            StmtKind::Global { names, values } => {
                // A bare declaration has no runtime effect.
                if !values.is_empty() {
                    let values = self.expr_list(values)?;
                    self.line(&format!("{} = {values}", names.join(", ")));
                }
            }
            StmtKind::Assign { targets, values } => {
                if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
                    return Err(CodegenError {
                        kind: CodegenErrorKind::InvalidAssignmentTarget,
                        span: bad.span,
                    });
                }
                let targets = self.expr_list(targets)?;
                let values = self.expr_list(values)?;
                self.line(&format!("{targets} = {values}"));
            }
            StmtKind::CompoundAssign { target, op, value } => {
                self.compound_assign(target, *op, value)?;
            }
            StmtKind::If {
                branches,
                else_block,
            } => {
                for (i, (condition, body)) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "elseif" };
                    let condition = self.expr(condition)?;
                    self.line(&format!("{keyword} {condition} then"));
                    self.nested(body)?;
                }
                if let Some(body) = else_block {
                    self.line("else");
                    self.nested(body)?;
                }
                self.line("end");
            }
            StmtKind::While { condition, body } => {
                let condition = self.expr(condition)?;
                self.line(&format!("while {condition} do"));
                self.loop_body(body)?;
                self.line("end");
            }
            StmtKind::Repeat { body, condition } => {
                self.line("repeat");
                self.repeat_body(body)?;
                let condition = self.expr(condition)?;
                self.line(&format!("until {condition}"));
            }
            StmtKind::NumericFor {
                var,
                start,
                limit,
                step,
                body,
            } => {
                let mut bounds = vec![self.expr(start)?, self.expr(limit)?];
                if let Some(step) = step {
                    bounds.push(self.expr(step)?);
                }
                self.line(&format!("for {var} = {} do", bounds.join(", ")));
                self.loop_body(body)?;
                self.line("end");
            }
            StmtKind::GenericFor {
                names,
                values,
                body,
            } => {
                let values = self.expr_list(values)?;
                self.line(&format!("for {} in {values} do", names.join(", ")));
                self.loop_body(body)?;
                self.line("end");
            }
            StmtKind::FunctionDecl { scope, name, func } => {
                let head = function_head(*scope, name);
                let text = self.function(&head, func)?;
                self.line(&text);
            }
            StmtKind::Return(values) => {
                if values.is_empty() {
                    self.line("return");
                } else {
                    let values = self.expr_list(values)?;
                    self.line(&format!("return {values}"));
                }
            }
            StmtKind::Break => {
                if self.loops.is_empty() {
                    return Err(CodegenError {
                        kind: CodegenErrorKind::BreakOutsideLoop,
                        span: stmt.span,
                    });
                }
                self.line("break");
            }
            StmtKind::Continue => {
                let Some(Some(label)) = self.loops.last() else {
                    return Err(CodegenError {
                        kind: CodegenErrorKind::ContinueOutsideLoop,
                        span: stmt.span,
                    });
                };
                let text = format!("goto {label}");
                self.line(&text);
            }
            StmtKind::Switch {
                subject,
                cases,
                default,
            } => self.switch(subject, cases, default.as_ref())?,
            StmtKind::Label(name) => self.line(&format!("::{name}::")),
            StmtKind::Goto(name) => self.line(&format!("goto {name}")),
            StmtKind::Do(body) => {
                self.line("do");
                self.nested(body)?;
                self.line("end");
            }
            StmtKind::Expr(expr) => self.call_statement(expr)?,
        }
        Ok(())
    }

    /// Label for the loop being entered, if its body continues.
    fn enter_loop(&mut self, body: &Block) -> Option<String> {
        let label = block_continues(body).then(|| self.fresh("continue"));
        self.loops.push(label.clone());
        label
    }

    /// Body of `while` and `for`. A body that continues is wrapped in
    /// `do ... end` so the trailing label is outside every body local.
    fn loop_body(&mut self, body: &Block) -> Result<(), CodegenError> {
        let label = self.enter_loop(body);
        self.indent += 1;
        let result = match &label {
            Some(label) => {
                self.line("do");
                let result = self.nested(body);
                self.line("end");
                self.line(&format!("::{label}::"));
                result
            }
            None => self.block(body),
        };
        self.indent -= 1;
        self.loops.pop();
        result
    }

    /// Body of `repeat`. Not wrapped, since `until` sees body locals.
    fn repeat_body(&mut self, body: &Block) -> Result<(), CodegenError> {
        let label = self.enter_loop(body);
        self.indent += 1;
        let result = self.repeat_stmts(body, label.as_deref());
        self.indent -= 1;
        self.loops.pop();
        result
    }

    fn repeat_stmts(&mut self, body: &Block, label: Option<&str>) -> Result<(), CodegenError> {
        let Some(label) = label else {
            return self.block(body);
        };
        self.line_end = None;
        let mut continued = false;
        for stmt in &body.stmts {
            if let Some(name) = declared_local(stmt).filter(|_| continued) {
                return Err(CodegenError {
                    kind: CodegenErrorKind::ContinueIntoLocalScope(name.to_string()),
                    span: stmt.span,
                });
            }
            continued = continued || stmt_continues(stmt);

            // `return` must stay last in its block.
            if matches!(stmt.kind, StmtKind::Return(_)) {
                self.line("do");
                self.indent += 1;
                let result = self.stmt(stmt);
                self.indent -= 1;
                result?;
                self.line("end");
            } else {
                self.stmt(stmt)?;
            }
        }
        self.line(&format!("::{label}::"));
        Ok(())
    }

    fn switch(
        &mut self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: Option<&Block>,
    ) -> Result<(), CodegenError> {
        let subject = self.expr(subject)?;
        let temp = self.fresh("switch");
        self.line("do");
        self.indent += 1;
        let result = self.switch_chain(&temp, &subject, cases, default);
        self.indent -= 1;
        result?;
        self.line("end");
        Ok(())
    }

    fn switch_chain(
        &mut self,
        temp: &str,
        subject: &str,
        cases: &[SwitchCase],
        default: Option<&Block>,
    ) -> Result<(), CodegenError> {
        self.line(&format!("local {temp} = {subject}"));

        if cases.is_empty() {
            return default.map_or(Ok(()), |body| self.block(body));
        }

        let (_, eq_power) = BinaryOp::Eq.priority();
        for (i, case) in cases.iter().enumerate() {
            let mut tests = Vec::with_capacity(case.values.len());
            for value in &case.values {
                let value = self.expr_prec(value, eq_power + 1)?;
                tests.push(format!("{temp} == {value}"));
            }
            let condition = if tests.is_empty() {
                "false".to_string()
            } else {
                tests.join(" or ")
            };
            let keyword = if i == 0 { "if" } else { "elseif" };
            self.line(&format!("{keyword} {condition} then"));
            self.nested(&case.body)?;
        }
        if let Some(body) = default {
            self.line("else");
            self.nested(body)?;
        }
        self.line("end");
        Ok(())
    }

    /// `target op= value` becomes `target = target op value`, with a
    /// non-trivial receiver or key evaluated once into a temporary.
    fn compound_assign(
        &mut self,
        target: &Expr,
        op: BinaryOp,
        value: &Expr,
    ) -> Result<(), CodegenError> {
        let (_, right_power) = op.priority();
        let value = self.expr_prec(value, right_power + 1)?;
        let op = op.as_str();

        match &target.kind {
            ExprKind::Identifier(name) => {
                self.line(&format!("{name} = {name} {op} {value}"));
            }
            ExprKind::Field { object, name } => {
                if matches!(object.kind, ExprKind::Identifier(_)) {
                    let object = self.prefix(object)?;
                    self.line(&format!("{object}.{name} = {object}.{name} {op} {value}"));
                } else {
                    let object = self.expr(object)?;
                    let recv = self.fresh("recv");
                    self.line("do");
                    self.indent += 1;
                    self.line(&format!("local {recv} = {object}"));
                    self.line(&format!("{recv}.{name} = {recv}.{name} {op} {value}"));
                    self.indent -= 1;
                    self.line("end");
                }
            }
            ExprKind::Index { object, key } => {
                let mut temps = Vec::new();
                let mut inits = Vec::new();

                let object_text = if matches!(object.kind, ExprKind::Identifier(_)) {
                    self.prefix(object)?
                } else {
                    let recv = self.fresh("recv");
                    temps.push(recv.clone());
                    inits.push(self.expr(object)?);
                    recv
                };
                let key_text = if is_constant_key(key) {
                    self.expr(key)?
                } else {
                    let temp = self.fresh("key");
                    temps.push(temp.clone());
                    inits.push(self.expr(key)?);
                    temp
                };

                let place = format!("{object_text}[{key_text}]");
                let assignment = format!("{place} = {place} {op} {value}");
                if temps.is_empty() {
                    self.line(&assignment);
                } else {
                    self.line("do");
                    self.indent += 1;
                    self.line(&format!("local {} = {}", temps.join(", "), inits.join(", ")));
                    self.line(&assignment);
                    self.indent -= 1;
                    self.line("end");
                }
            }
            _ => {
                return Err(CodegenError {
                    kind: CodegenErrorKind::InvalidAssignmentTarget,
                    span: target.span,
                });
            }
        }
        Ok(())
    }

    fn call_statement(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        if let ExprKind::OptionalChain { object, accessors } = &expr.kind {
            // Statement form: a plain nil guard instead of a closure.
            let object = self.expr(object)?;
            let temp = self.fresh("opt");
            let access = self.accessors(temp.clone(), accessors)?;
            self.line("do");
            self.indent += 1;
            self.line(&format!("local {temp} = {object}"));
            self.line(&format!("if {temp} ~= nil then"));
            self.indent += 1;
            self.line(&access);
            self.indent -= 1;
            self.line("end");
            self.indent -= 1;
            self.line("end");
            return Ok(());
        }

        let text = self.expr(expr)?;
        self.line(&text);
        Ok(())
    }

    /// Emit a function; `head` is everything before the parameter list.
    fn function(&mut self, head: &str, func: &Function) -> Result<String, CodegenError> {
        let mut params = func.params.clone();
        if func.is_vararg {
            params.push("...".to_string());
        }

        // Loops do not extend into nested functions.
        let saved_out = std::mem::take(&mut self.out);
        let saved_loops = std::mem::take(&mut self.loops);
        let saved_line_end = self.line_end;
        let result = self.nested(&func.body);
        self.loops = saved_loops;
        self.line_end = saved_line_end;
        let body = std::mem::replace(&mut self.out, saved_out);
        result?;

        let indent = "\t".repeat(self.indent);
        Ok(format!("{head}({})\n{body}{indent}end", params.join(", ")))
    }

    // -- expressions --

    fn expr(&mut self, expr: &Expr) -> Result<String, CodegenError> {
        self.expr_prec(expr, 0)
    }

    fn expr_list(&mut self, exprs: &[Expr]) -> Result<String, CodegenError> {
        let mut parts = Vec::with_capacity(exprs.len());
        for expr in exprs {
            parts.push(self.expr(expr)?);
        }
        Ok(parts.join(", "))
    }

    /// Emit `expr`, parenthesised if it binds looser than `min`.
    fn expr_prec(&mut self, expr: &Expr, min: u8) -> Result<String, CodegenError> {
        let (text, precedence) = self.emit(expr)?;
        Ok(if precedence < min {
            format!("({text})")
        } else {
            text
        })
    }

    /// Emit `expr` where Lua requires a prefix expression: callee,
    /// indexed object, or method receiver.
    fn prefix(&mut self, expr: &Expr) -> Result<String, CodegenError> {
        let text = self.expr(expr)?;
        Ok(match expr.kind {
            ExprKind::Identifier(_)
            | ExprKind::Index { .. }
            | ExprKind::Field { .. }
            | ExprKind::Call { .. }
            | ExprKind::MethodCall { .. }
            | ExprKind::Paren(_)
            | ExprKind::NilCoalesce { .. }
            | ExprKind::OptionalChain { .. } => text,
            _ => format!("({text})"),
        })
    }

    fn args(&mut self, args: &[Expr]) -> Result<String, CodegenError> {
        Ok(format!("({})", self.expr_list(args)?))
    }

    fn emit(&mut self, expr: &Expr) -> Result<(String, u8), CodegenError> {
        let emitted = match &expr.kind {
            ExprKind::Nil => ("nil".to_string(), ATOM),
            ExprKind::Bool(value) => (value.to_string(), ATOM),
            ExprKind::Number(text) => {
                let text = convert_number(text).map_err(|kind| CodegenError {
                    kind: match kind {
                        LexErrorKind::InvalidNumeral(text) => CodegenErrorKind::InvalidNumeral(text),
                        other => CodegenErrorKind::InvalidNumeral(other.to_string()),
                    },
                    span: expr.span,
                })?;
                (text, ATOM)
            }
            ExprKind::String(text) => (text.clone(), ATOM),
            ExprKind::Template(segments) => self.template(segments)?,
            ExprKind::Varargs => ("...".to_string(), ATOM),
            ExprKind::Identifier(name) => (name.clone(), ATOM),
            ExprKind::Paren(inner) => (format!("({})", self.expr(inner)?), ATOM),
            ExprKind::Binary { op, left, right } => {
                let (left_power, right_power) = op.priority();
                let left_min = if op.is_right_associative() {
                    left_power + 1
                } else {
                    left_power
                };
                let left = self.expr_prec(left, left_min)?;
                // A unary operator already opens a new operand in Lua.
                let right = if matches!(right.kind, ExprKind::Unary { .. }) {
                    self.expr(right)?
                } else {
                    self.expr_prec(right, right_power + 1)?
                };
                (format!("{left} {} {right}", op.as_str()), left_power)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.expr_prec(operand, UNARY_PRIORITY)?;
                // `- -x`, never the comment `--x`.
                let text = if *op == UnaryOp::Neg && operand.starts_with('-') {
                    format!("- {operand}")
                } else {
                    format!("{}{operand}", op.as_str())
                };
                (text, UNARY_PRIORITY)
            }
            ExprKind::NilCoalesce { left, right } => (self.nil_coalesce(left, right)?, ATOM),
            ExprKind::Call { callee, args } => {
                let callee = self.prefix(callee)?;
                (format!("{callee}{}", self.args(args)?), ATOM)
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => {
                let object = self.prefix(object)?;
                (format!("{object}:{method}{}", self.args(args)?), ATOM)
            }
            ExprKind::Index { object, key } => {
                let object = self.prefix(object)?;
                (format!("{object}[{}]", self.expr(key)?), ATOM)
            }
            ExprKind::Field { object, name } => {
                let object = self.prefix(object)?;
                (format!("{object}.{name}"), ATOM)
            }
            ExprKind::OptionalChain { object, accessors } => {
                (self.optional_chain(object, accessors)?, ATOM)
            }
            ExprKind::Table(fields) => (self.table(fields)?, ATOM),
            ExprKind::Function(func) => (self.function("function", func)?, ATOM),
        };
        Ok(emitted)
    }

    /// `left ?? right`: `left` is evaluated once, `right` only when
    /// `left` is nil. `false` is kept.
    fn nil_coalesce(&mut self, left: &Expr, right: &Expr) -> Result<String, CodegenError> {
        let left = self.expr(left)?;
        let temp = self.fresh("nc");
        let varargs = if uses_varargs(right) { ", ..." } else { "" };
        let right = self.expr(right)?;
        Ok(format!(
            "((function({temp}{varargs}) if {temp} ~= nil then return {temp} end \
             return {right} end)({left}{varargs}))"
        ))
    }

    /// `object?.a.b`: nil as soon as `object` is nil, otherwise the
    /// accessors applied to the once-evaluated object.
    fn optional_chain(
        &mut self,
        object: &Expr,
        accessors: &[Accessor],
    ) -> Result<String, CodegenError> {
        let object = self.expr(object)?;
        let temp = self.fresh("opt");
        let varargs = if accessors.iter().any(accessor_uses_varargs) {
            ", ..."
        } else {
            ""
        };
        let access = self.accessors(temp.clone(), accessors)?;
        Ok(format!(
            "((function({temp}{varargs}) if {temp} == nil then return nil end \
             return {access} end)({object}{varargs}))"
        ))
    }

    fn accessors(&mut self, base: String, accessors: &[Accessor]) -> Result<String, CodegenError> {
        let mut text = base;
        for accessor in accessors {
            text = match accessor {
                Accessor::Field(name) => format!("{text}.{name}"),
                Accessor::Index(key) => format!("{text}[{}]", self.expr(key)?),
                Accessor::Call(args) => format!("{text}{}", self.args(args)?),
                Accessor::Method { name, args } => {
                    format!("{text}:{name}{}", self.args(args)?)
                }
            };
        }
        Ok(text)
    }

    fn table(&mut self, fields: &[TableField]) -> Result<String, CodegenError> {
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            parts.push(match field {
                TableField::Positional(value) => self.expr(value)?,
                TableField::Named { name, value } => format!("{name} = {}", self.expr(value)?),
                TableField::Keyed { key, value } => {
                    format!("[{}] = {}", self.expr(key)?, self.expr(value)?)
                }
            });
        }
        Ok(format!("{{{}}}", parts.join(", ")))
    }

    /// Concatenate literal pieces and `tostring(...)` of each embedded
    /// expression, left to right.
    fn template(&mut self, segments: &[TemplateSegment]) -> Result<(String, u8), CodegenError> {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                TemplateSegment::Text(raw) if raw.is_empty() => {}
                TemplateSegment::Text(raw) => parts.push(lua_string(raw)),
                TemplateSegment::Expr(expr) => {
                    parts.push(format!("tostring({})", self.expr(expr)?));
                }
            }
        }

        Ok(match parts.len() {
            0 => ("\"\"".to_string(), ATOM),
            1 => (parts.remove(0), ATOM),
            _ => (parts.join(" .. "), BinaryOp::Concat.priority().0),
        })
    }
}

fn function_head(scope: FunctionScope, name: &FunctionName) -> String {
    let mut head = match scope {
        FunctionScope::Local => "local function ".to_string(),
        FunctionScope::Plain | FunctionScope::Global => "function ".to_string(),
    };
    head.push_str(&name.path.join("."));
    if let Some(method) = &name.method {
        head.push(':');
        head.push_str(method);
    }
    head
}

/// Keys that are safe to evaluate twice.
const fn is_constant_key(key: &Expr) -> bool {
    matches!(
        key.kind,
        ExprKind::Identifier(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Nil
    )
}

/// Whether a `continue` in `block` targets the loop owning `block`.
fn block_continues(block: &Block) -> bool {
    block.stmts.iter().any(stmt_continues)
}

fn stmt_continues(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Continue => true,
        StmtKind::If {
            branches,
            else_block,
        } => {
            branches.iter().any(|(_, body)| block_continues(body))
                || else_block.as_ref().is_some_and(block_continues)
        }
        StmtKind::Do(body) => block_continues(body),
        StmtKind::Switch { cases, default, .. } => {
            cases.iter().any(|case| block_continues(&case.body))
                || default.as_ref().is_some_and(block_continues)
        }
        _ => false,
    }
}

/// First name a statement brings into scope for the rest of its block.
fn declared_local(stmt: &Stmt) -> Option<&str> {
    match &stmt.kind {
        StmtKind::Local { names, .. } => names.first().map(String::as_str),
        StmtKind::FunctionDecl {
            scope: FunctionScope::Local,
            name,
            ..
        } => name.path.first().map(String::as_str),
        _ => None,
    }
}

/// Whether `expr` reads `...` of the enclosing function.
fn uses_varargs(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Varargs => true,
        ExprKind::Nil
        | ExprKind::Bool(_)
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Identifier(_)
        | ExprKind::Function(_) => false,
        ExprKind::Template(segments) => segments
            .iter()
            .any(|s| matches!(s, TemplateSegment::Expr(e) if uses_varargs(e))),
        ExprKind::Binary { left, right, .. } | ExprKind::NilCoalesce { left, right } => {
            uses_varargs(left) || uses_varargs(right)
        }
        ExprKind::Unary { operand, .. } => uses_varargs(operand),
        ExprKind::Paren(inner) => uses_varargs(inner),
        ExprKind::Call { callee, args } => uses_varargs(callee) || args.iter().any(uses_varargs),
        ExprKind::MethodCall { object, args, .. } => {
            uses_varargs(object) || args.iter().any(uses_varargs)
        }
        ExprKind::Index { object, key } => uses_varargs(object) || uses_varargs(key),
        ExprKind::Field { object, .. } => uses_varargs(object),
        ExprKind::OptionalChain { object, accessors } => {
            uses_varargs(object) || accessors.iter().any(accessor_uses_varargs)
        }
        ExprKind::Table(fields) => fields.iter().any(|field| match field {
            TableField::Positional(value) | TableField::Named { value, .. } => uses_varargs(value),
            TableField::Keyed { key, value } => uses_varargs(key) || uses_varargs(value),
        }),
    }
}

fn accessor_uses_varargs(accessor: &Accessor) -> bool {
    match accessor {
        Accessor::Field(_) => false,
        Accessor::Index(key) => uses_varargs(key),
        Accessor::Call(args) | Accessor::Method { args, .. } => args.iter().any(uses_varargs),
    }
}

/// Double-quoted Lua string for raw template text.
fn lua_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(
                    next @ ('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | 'z' | 'x' | 'u' | '\\'
                    | '"' | '\'' | '0'..='9'),
                ) => {
                    out.push('\\');
                    out.push(next);
                }
                Some('\n') => out.push_str("\\n"),
                Some(next) => out.push(next),
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }

    out.push('"');
    out
}
