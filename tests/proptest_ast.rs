//! Property-based tests with proptest.
//!
//! Random operator trees are emitted, parsed back, and compared by
//! shape, which checks that the emitter parenthesises exactly where Lua
//! precedence needs it. Random sugar-heavy sources are compiled twice
//! to check that generated Lua is itself valid input and reaches a
//! fixed point after one normalising pass.

use proptest::prelude::*;
use tokimun::ast::{BinaryOp, Block, Chunk, Expr, ExprKind, Stmt, StmtKind, UnaryOp};
use tokimun::{Span, TokenKind, compile, generate, parse_str};

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

/// Lowercase name that is not a reserved word.
fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,4}".prop_filter("reserved word", |s| TokenKind::keyword(s).is_none())
}

// -- Operator trees --

fn leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        name().prop_map(|n| expr(ExprKind::Identifier(n))),
        (0u32..1000).prop_map(|n| expr(ExprKind::Number(n.to_string()))),
        any::<bool>().prop_map(|b| expr(ExprKind::Bool(b))),
    ]
}

fn binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Or),
        Just(BinaryOp::And),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Ge),
        Just(BinaryOp::Eq),
        Just(BinaryOp::NotEq),
        Just(BinaryOp::Concat),
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Mod),
        Just(BinaryOp::Pow),
    ]
}

fn unary_op() -> impl Strategy<Value = UnaryOp> {
    prop_oneof![Just(UnaryOp::Not), Just(UnaryOp::Len), Just(UnaryOp::Neg)]
}

fn tree() -> impl Strategy<Value = Expr> {
    leaf().prop_recursive(5, 48, 2, |inner| {
        prop_oneof![
            3 => (binary_op(), inner.clone(), inner.clone()).prop_map(|(op, l, r)| {
                expr(ExprKind::Binary {
                    op,
                    left: Box::new(l),
                    right: Box::new(r),
                })
            }),
            1 => (unary_op(), inner.clone()).prop_map(|(op, e)| {
                expr(ExprKind::Unary {
                    op,
                    operand: Box::new(e),
                })
            }),
            1 => inner.prop_map(|e| expr(ExprKind::Paren(Box::new(e)))),
        ]
    })
}

/// Structure of an operator tree, ignoring spans and parentheses.
fn shape(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Paren(inner) => shape(inner),
        ExprKind::Identifier(text) | ExprKind::Number(text) => text.clone(),
        ExprKind::Bool(b) => b.to_string(),
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", op.as_str(), shape(left), shape(right))
        }
        ExprKind::Unary { op, operand } => {
            format!("({} {})", op.as_str().trim(), shape(operand))
        }
        other => format!("{other:?}"),
    }
}

fn assign_x(value: Expr) -> Chunk {
    Chunk {
        block: Block {
            stmts: vec![Stmt {
                kind: StmtKind::Assign {
                    targets: vec![expr(ExprKind::Identifier("x".to_string()))],
                    values: vec![value],
                },
                span: Span::default(),
            }],
        },
    }
}

// -- Sugar sources --

fn numeral() -> impl Strategy<Value = String> {
    prop_oneof![
        "0b[01]{1,12}",
        "0o[0-7]{1,6}",
        "0x[0-9a-f]{1,4}",
        "[1-9][0-9]{0,3}",
    ]
}

fn sugar_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![name(), numeral(), Just("nil".to_string())];
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} ?? {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} .. {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("- {a} * {b}")),
            inner.clone().prop_map(|a| format!("`v=${{{a}}}!`")),
            (name(), inner.clone()).prop_map(|(o, k)| format!("{o}?.f[{k}]")),
            (name(), inner.clone()).prop_map(|(o, a)| format!("{o}?.m:call({a})")),
            inner.clone().prop_map(|a| format!("({a})")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("f({a}, {b})")),
        ]
    })
}

fn sugar_stmt() -> impl Strategy<Value = String> {
    prop_oneof![
        sugar_expr().prop_map(|e| format!("local v = {e}")),
        sugar_expr().prop_map(|e| format!("t.n += {e}")),
        sugar_expr().prop_map(|e| format!("t[k()] ..= {e}")),
        sugar_expr().prop_map(|e| format!("obj?.run({e})")),
        (sugar_expr(), sugar_expr())
            .prop_map(|(s, c)| format!("switch {s} case {c}, 1 y() default z() end")),
        sugar_expr().prop_map(|e| {
            format!("for i = 1, 3 do if {e} then continue end print(i) end")
        }),
    ]
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(sugar_stmt(), 1..=4).prop_map(|stmts| stmts.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn binary_numerals_become_decimal(n in any::<u32>()) {
        prop_assert_eq!(compile(&format!("x = 0b{n:b}")).unwrap(), format!("x = {n}\n"));
    }

    #[test]
    fn octal_numerals_become_decimal(n in any::<u32>()) {
        prop_assert_eq!(compile(&format!("x = 0o{n:o}")).unwrap(), format!("x = {n}\n"));
    }

    #[test]
    fn hex_numerals_are_verbatim(n in any::<u32>()) {
        let source = format!("x = 0x{n:X}");
        prop_assert_eq!(compile(&source).unwrap(), format!("{source}\n"));
    }

    #[test]
    fn emitted_precedence_survives_reparse(e in tree()) {
        let lua = generate(&assign_x(e.clone())).unwrap();
        let reparsed = parse_str(&lua)
            .unwrap_or_else(|err| panic!("reparse failed: {err}\n--- lua ---\n{lua}"));
        let StmtKind::Assign { values, .. } = &reparsed.block.stmts[0].kind else {
            panic!("expected assignment in:\n{lua}");
        };
        prop_assert_eq!(shape(&values[0]), shape(&e), "lua: {}", lua);
        prop_assert_eq!(generate(&reparsed).unwrap(), lua);
    }

    #[test]
    fn generated_lua_normalises_in_one_pass(source in program()) {
        let first = compile(&source)
            .unwrap_or_else(|err| panic!("compile failed: {err}\n--- source ---\n{source}"));
        let second = compile(&first)
            .unwrap_or_else(|err| panic!("recompile failed: {err}\n--- lua ---\n{first}"));
        let third = compile(&second).unwrap();
        prop_assert_eq!(third, second);
    }
}
