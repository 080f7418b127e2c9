//! Generated Lua text for each construct, checked through `compile`.

mod common;

use common::{compile_err, lua};
use tokimun::{CodegenErrorKind, Error, LexErrorKind, ParseErrorKind, parse_str};

// -----------------------------------------------------------
// Pass-through Lua.
// -----------------------------------------------------------

#[test]
fn plain_lua_is_normalised() {
    let input = "local t={1,2}   for i,v in ipairs(t) do print(i,v) end";
    assert_eq!(
        lua(input),
        "local t = {1, 2}\nfor i, v in ipairs(t) do\n\tprint(i, v)\nend\n"
    );
}

#[test]
fn strings_and_comments() {
    let input = "-- header\nlocal s = [[raw\ntext]] .. 'q\\'s' .. \"d\"\n--[[ gone ]]";
    assert_eq!(lua(input), "local s = [[raw\ntext]] .. 'q\\'s' .. \"d\"\n");
}

#[test]
fn labels_goto_and_do() {
    assert_eq!(
        lua("do ::again:: goto again end"),
        "do\n\t::again::\n\tgoto again\nend\n"
    );
}

#[test]
fn bare_return() {
    assert_eq!(
        lua("function f() return end"),
        "function f()\n\treturn\nend\n"
    );
}

#[test]
fn not_equal_is_lua_spelling() {
    assert_eq!(lua("x = a != b"), "x = a ~= b\n");
}

#[test]
fn global_function_is_plain() {
    assert_eq!(
        lua("global function greet() end"),
        "function greet()\nend\n"
    );
}

#[test]
fn parenthesised_call_truncation_is_kept() {
    assert_eq!(lua("return (f())"), "return (f())\n");
}

// -----------------------------------------------------------
// Desugaring.
// -----------------------------------------------------------

#[test]
fn numerals_in_every_position() {
    assert_eq!(
        lua("local t = {0b1, [0o10] = 0B11}"),
        "local t = {1, [8] = 3}\n"
    );
}

#[test]
fn for_loop_continue() {
    let expected = "\
for i = 1, 5 do
\tdo
\t\tif i == 3 then
\t\t\tgoto __tkm_continue_1
\t\tend
\t\tlocal doubled = i * 2
\t\tprint(doubled)
\tend
\t::__tkm_continue_1::
end
";
    assert_eq!(
        lua("for i = 1, 5 do if i == 3 then continue end local doubled = i * 2 print(doubled) end"),
        expected
    );
}

#[test]
fn continue_inside_switch_targets_loop() {
    let out = lua("for _, v in ipairs(t) do switch v case 1 continue end print(v) end");
    assert!(out.contains("goto __tkm_continue_1"));
    assert!(out.contains("::__tkm_continue_1::"));
}

#[test]
fn break_inside_switch_leaves_loop() {
    let out = lua("while true do switch x case 1 break end end");
    assert!(out.contains("\t\t\tbreak\n"));
}

#[test]
fn repeat_continue_before_return() {
    let expected = "\
repeat
\tif skip then
\t\tgoto __tkm_continue_1
\tend
\tdo
\t\treturn 1
\tend
\t::__tkm_continue_1::
until true
";
    assert_eq!(
        lua("repeat if skip then continue end return 1 until true"),
        expected
    );
}

#[test]
fn switch_case_values_keep_precedence() {
    let out = lua("switch x case a or b y() end");
    assert!(out.contains("if __tkm_switch_1 == (a or b) then"));
}

#[test]
fn switch_default_only() {
    assert_eq!(
        lua("switch x default y() end"),
        "do\n\tlocal __tkm_switch_1 = x\n\ty()\nend\n"
    );
}

#[test]
fn coalesce_chain_is_right_nested() {
    let out = lua("x = a ?? b ?? c");
    assert!(out.starts_with(
        "x = ((function(__tkm_nc_1) if __tkm_nc_1 ~= nil then return __tkm_nc_1 end return ((function(__tkm_nc_2)"
    ));
    assert!(out.ends_with("end)(a))\n"));
}

#[test]
fn optional_chain_inside_binary() {
    let out = lua("x = a?.n + 1");
    assert!(out.starts_with("x = ((function(__tkm_opt_1)"));
    assert!(out.ends_with("end)(a)) + 1\n"));
}

#[test]
fn optional_call_forwards_varargs() {
    let out = lua("function f(...) g?.(...) end");
    assert!(out.contains("local __tkm_opt_1 = g"));
    assert!(out.contains("__tkm_opt_1(...)"));

    let out = lua("function f(...) return g?.(...) end");
    assert!(out.contains("(function(__tkm_opt_1, ...)"));
    assert!(out.contains("end)(g, ...))"));
}

#[test]
fn nested_optional_chains() {
    let out = lua("x = a?.b?.c");
    // Inner chain is the object of the outer one.
    assert!(out.contains("return __tkm_opt_2.c end)(((function(__tkm_opt_1)"));
}

#[test]
fn compound_concat_and_field() {
    assert_eq!(lua("self.name ..= `!`"), "self.name = self.name .. \"!\"\n");
}

#[test]
fn compound_index_with_literal_key() {
    assert_eq!(lua("t['k'] -= 2"), "t['k'] = t['k'] - 2\n");
}

#[test]
fn template_with_only_expression() {
    assert_eq!(lua("s = `${n}`"), "s = tostring(n)\n");
}

#[test]
fn template_multiline_text() {
    assert_eq!(lua("s = `a\nb`"), "s = \"a\\nb\"\n");
}

#[test]
fn template_interpolating_a_call() {
    assert_eq!(
        lua("print(`${a.b(1)} and ${c:d()}`)"),
        "print(tostring(a.b(1)) .. \" and \" .. tostring(c:d()))\n"
    );
}

#[test]
fn call_statement_on_coalesce_gets_separator() {
    let out = lua("f();(g ?? h)()");
    assert!(out.starts_with("f();\n((function(__tkm_nc_1)"));
}

#[test]
fn assignment_through_paren_gets_separator() {
    let out = lua("local t = {}\nlocal x = print; (t).b = 1");
    assert_eq!(out, "local t = {}\nlocal x = print;\n(t).b = 1\n");
    let chunk = parse_str(&out).expect("generated Lua should parse");
    assert_eq!(chunk.block.stmts.len(), 3);
}

#[test]
fn paren_statement_after_until() {
    let out = lua("repeat n += 1 until done;(f)()");
    assert!(out.ends_with("until done;\n(f)()\n"), "{out}");
    assert_eq!(lua(&out), out);
}

// -----------------------------------------------------------
// Errors by stage.
// -----------------------------------------------------------

#[test]
fn lexical_error_on_line_five() {
    let err = compile_err("a = 1\nb = 2\nc = 3\nd = 4\ne = a ! b\n");
    let Error::Lex(e) = &err else {
        panic!("expected lex error, got {err:?}");
    };
    assert_eq!(e.kind, LexErrorKind::UnexpectedCharacter('!'));
    assert_eq!(err.span().line, 5);
    assert_eq!(
        err.to_string(),
        "unexpected character: ! (did you mean '!='?) at line 5, column 7"
    );
}

#[test]
fn deep_nesting_is_an_error() {
    let nested = |depth: usize| format!("x = {}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(lua(&nested(150)), format!("x = {}1{}\n", "(".repeat(150), ")".repeat(150)));

    let err = compile_err(&nested(300));
    assert!(matches!(
        err,
        Error::Parse(ref e) if e.kind == ParseErrorKind::TooDeep
    ));
}

#[test]
fn repeat_continue_into_local_scope_is_an_error() {
    let err = compile_err("repeat local a = f() if a then continue end local b = g() until b");
    assert!(matches!(
        err,
        Error::Codegen(ref e)
            if e.kind == CodegenErrorKind::ContinueIntoLocalScope("b".to_string())
    ));
}

#[test]
fn parse_stage_error() {
    let err = compile_err("x + 1");
    assert!(matches!(
        err,
        Error::Parse(ref e) if e.kind == ParseErrorKind::NotAStatement
    ));
}

#[test]
fn break_outside_loop_is_codegen_error() {
    let err = compile_err("function f() break end");
    let Error::Codegen(e) = err else {
        panic!("expected codegen error");
    };
    assert_eq!(e.kind, CodegenErrorKind::BreakOutsideLoop);
}

#[test]
fn octal_overflow_is_codegen_error() {
    let err = compile_err("x = 0o7777777777777777777777");
    let Error::Codegen(e) = err else {
        panic!("expected codegen error");
    };
    assert_eq!(
        e.kind,
        CodegenErrorKind::InvalidNumeral("0o7777777777777777777777".to_string())
    );
}
