//! Tests for the script parser

use super::*;
use crate::syntax::printer::print_program;

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_ok(source: &str) -> Program {
    parse_program(source).expect("Parse should succeed")
}

fn single_stmt(source: &str) -> Stmt {
    let mut program = parse_ok(source);
    assert_eq!(program.body.len(), 1, "expected one statement in {:?}", source);
    program.body.remove(0)
}

fn expr_of(source: &str) -> Expr {
    parse_expression(source).expect("Expression should parse")
}

/// Print and re-parse; the printed form must be a fixed point
fn reprint(source: &str) -> String {
    let once = print_program(&parse_ok(source));
    let twice = print_program(&parse_ok(&once));
    assert_eq!(once, twice, "printer output is not stable");
    once
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_var_declarations() {
    let stmt = single_stmt("var a = 1, b;");
    match stmt {
        Stmt::Var { kind, decls } => {
            assert_eq!(kind, VarKind::Var);
            assert_eq!(decls.len(), 2);
            assert_eq!(decls[0].name, "a");
            assert!(decls[1].init.is_none());
        }
        other => panic!("Expected Var, got {:?}", other),
    }
}

#[test]
fn test_keyword_prefixed_identifiers() {
    let program = parse_ok("var variable = newValue; doThing(); iffy = typeofx;");
    assert_eq!(program.body.len(), 3);
    match &program.body[0] {
        Stmt::Var { decls, .. } => {
            assert_eq!(decls[0].name, "variable");
            assert_eq!(decls[0].init, Some(Expr::Ident { name: "newValue".into() }));
        }
        other => panic!("Expected Var, got {:?}", other),
    }
    assert!(matches!(&program.body[1], Stmt::Expr { expr: Expr::Call { .. } }));
}

#[test]
fn test_function_declaration() {
    let stmt = single_stmt("function add(a, b) { return a + b; }");
    match stmt {
        Stmt::Function { func } => {
            assert_eq!(func.name.as_deref(), Some("add"));
            assert_eq!(func.params, vec!["a", "b"]);
            assert_eq!(func.body.len(), 1);
            assert!(!func.generator);
        }
        other => panic!("Expected Function, got {:?}", other),
    }
}

#[test]
fn test_for_loop_parts() {
    let stmt = single_stmt("for (var i = 0; i < 10; i++) { sum += i; }");
    match stmt {
        Stmt::For {
            init: Some(ForInit::Decl { .. }),
            test: Some(_),
            update: Some(Expr::Update { prefix: false, .. }),
            ..
        } => {}
        other => panic!("Unexpected for shape: {:?}", other),
    }

    let stmt = single_stmt("for (;;) {}");
    assert!(matches!(
        stmt,
        Stmt::For {
            init: None,
            test: None,
            update: None,
            ..
        }
    ));
}

#[test]
fn test_for_in_binding_forms() {
    let stmt = single_stmt("for (var k in obj) { f(k); }");
    assert!(matches!(
        stmt,
        Stmt::ForIn {
            left: ForInLeft::Decl { .. },
            ..
        }
    ));

    let stmt = single_stmt("for (o.k in obj) {}");
    assert!(matches!(
        stmt,
        Stmt::ForIn {
            left: ForInLeft::Target { .. },
            ..
        }
    ));
}

#[test]
fn test_labels_and_jumps() {
    let stmt = single_stmt("outer: while (x) { break outer; continue; }");
    match stmt {
        Stmt::Labeled { label, body } => {
            assert_eq!(label, "outer");
            match *body {
                Stmt::While { body, .. } => {
                    let stmts = body.into_block();
                    assert_eq!(
                        stmts[0],
                        Stmt::Break {
                            label: Some("outer".into())
                        }
                    );
                    assert_eq!(stmts[1], Stmt::Continue { label: None });
                }
                other => panic!("Expected While, got {:?}", other),
            }
        }
        other => panic!("Expected Labeled, got {:?}", other),
    }
}

#[test]
fn test_try_catch_finally() {
    let stmt = single_stmt("try { a(); } catch (e) { b(e); } finally { c(); }");
    match stmt {
        Stmt::Try {
            block,
            handler: Some(handler),
            finalizer: Some(finalizer),
        } => {
            assert_eq!(block.len(), 1);
            assert_eq!(handler.param, "e");
            assert_eq!(finalizer.len(), 1);
        }
        other => panic!("Expected Try, got {:?}", other),
    }
}

#[test]
fn test_switch_cases() {
    let stmt = single_stmt("switch (x) { case 1: a(); break; case 2: default: b(); }");
    match stmt {
        Stmt::Switch { cases, .. } => {
            assert_eq!(cases.len(), 3);
            assert_eq!(cases[0].body.len(), 2);
            assert!(cases[1].body.is_empty());
            assert!(cases[2].test.is_none());
        }
        other => panic!("Expected Switch, got {:?}", other),
    }
}

#[test]
fn test_optional_semicolons() {
    let program = parse_ok("var a = 1\nvar b = 2\nf(a)\n");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_comments_are_skipped() {
    let program = parse_ok("// leading\nvar a = 1; /* block */ var b = a // trailing\n");
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_object_at_statement_start_is_block() {
    let stmt = single_stmt("{ a: 1 }");
    assert!(matches!(stmt, Stmt::Block { .. }));
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_binary_precedence() {
    let expr = expr_of("1 + 2 * 3");
    match expr {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_left_associativity() {
    let expr = expr_of("a - b - c");
    match expr {
        Expr::Binary { left, right, .. } => {
            assert!(matches!(*left, Expr::Binary { .. }));
            assert_eq!(*right, Expr::Ident { name: "c".into() });
        }
        other => panic!("Expected subtraction, got {:?}", other),
    }
}

#[test]
fn test_logical_and_conditional() {
    let expr = expr_of("a && b || c ? d : e");
    match expr {
        Expr::Cond { test, .. } => match *test {
            Expr::Logical {
                op: LogicalOp::Or,
                left,
                ..
            } => assert!(matches!(
                *left,
                Expr::Logical {
                    op: LogicalOp::And,
                    ..
                }
            )),
            other => panic!("Expected ||, got {:?}", other),
        },
        other => panic!("Expected conditional, got {:?}", other),
    }
}

#[test]
fn test_compound_assignment() {
    let expr = expr_of("x.y += 2");
    match expr {
        Expr::Assign { op, target, .. } => {
            assert_eq!(op, AssignOp(Some(BinaryOp::Add)));
            assert!(matches!(*target, Expr::Member { .. }));
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_invalid_assignment_target() {
    assert!(parse_program("a + b = 3;").is_err());
}

#[test]
fn test_new_and_member_chains() {
    let expr = expr_of("new Foo.Bar(1).baz()");
    match expr {
        Expr::Call { callee, .. } => match *callee {
            Expr::Member { object, .. } => {
                assert!(matches!(*object, Expr::New { .. }));
            }
            other => panic!("Expected member, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_new_target() {
    let stmt = single_stmt("function F() { return new.target; }");
    match stmt {
        Stmt::Function { func } => {
            assert_eq!(func.body[0], Stmt::Return { arg: Some(Expr::NewTarget) });
        }
        other => panic!("Expected Function, got {:?}", other),
    }
}

#[test]
fn test_arrow_functions() {
    match expr_of("(a, b) => a + b") {
        Expr::Function { func } => {
            assert!(func.arrow);
            assert_eq!(func.params, vec!["a", "b"]);
            assert!(matches!(func.body[0], Stmt::Return { .. }));
        }
        other => panic!("Expected arrow, got {:?}", other),
    }
    match expr_of("x => { return x; }") {
        Expr::Function { func } => assert_eq!(func.params, vec!["x"]),
        other => panic!("Expected arrow, got {:?}", other),
    }
}

#[test]
fn test_generators_and_yield() {
    let stmt = single_stmt("function* g() { yield; yield* h(); }");
    match stmt {
        Stmt::Function { func } => {
            assert!(func.generator);
            assert!(matches!(
                func.body[1],
                Stmt::Expr {
                    expr: Expr::Yield { delegate: true, .. }
                }
            ));
        }
        other => panic!("Expected generator, got {:?}", other),
    }
}

#[test]
fn test_literals() {
    assert_eq!(expr_of("0x1F"), Expr::Num { value: 31.0 });
    assert_eq!(expr_of("1.5e2"), Expr::Num { value: 150.0 });
    assert_eq!(
        expr_of("'it\\'s\\n'"),
        Expr::Str {
            value: "it's\n".into()
        }
    );
    assert_eq!(expr_of("\"\\u0041\\x42\""), Expr::Str { value: "AB".into() });
    assert_eq!(expr_of("null"), Expr::Null);
    assert_eq!(expr_of("true"), Expr::Bool { value: true });
}

#[test]
fn test_object_literal_forms() {
    match expr_of("{ a: 1, 'b': 2, [k]: 3, c, m(x) { return x; } }") {
        Expr::Object { props } => {
            assert_eq!(props.len(), 5);
            assert!(matches!(props[1].key, PropKey::Str { .. }));
            assert!(matches!(props[2].key, PropKey::Computed { .. }));
            assert_eq!(props[3].value, Expr::Ident { name: "c".into() });
            assert!(matches!(props[4].value, Expr::Function { .. }));
        }
        other => panic!("Expected object, got {:?}", other),
    }
}

#[test]
fn test_unary_and_update() {
    assert!(matches!(
        expr_of("typeof x"),
        Expr::Unary {
            op: UnaryOp::Typeof,
            ..
        }
    ));
    assert!(matches!(
        expr_of("--x"),
        Expr::Update {
            op: UpdateOp::Decr,
            prefix: true,
            ..
        }
    ));
    assert!(matches!(
        expr_of("-x"),
        Expr::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn test_in_and_instanceof() {
    assert!(matches!(
        expr_of("k in o"),
        Expr::Binary {
            op: BinaryOp::In,
            ..
        }
    ));
    assert!(matches!(
        expr_of("e instanceof Error"),
        Expr::Binary {
            op: BinaryOp::InstanceOf,
            ..
        }
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_syntax_error_has_position() {
    let err = parse_program("var = ;").expect_err("should fail");
    assert!(matches!(err, ParseError::PestError(_, Some(_))));
}

#[test]
fn test_regex_literals_rejected() {
    assert!(parse_program("var r = /ab+c/;").is_err());
}

// ============================================================================
// Printer Round Trips
// ============================================================================

#[test]
fn test_printer_fixed_point() {
    reprint(
        r#"
function f(a) {
  var o = { x: 1, "y z": [1, 2] };
  if (a) { return (a + 1) * 2; } else if (!a) { return -(-a); }
  for (var i = 0; i < 3; i++) { o.x += i; }
  do { a--; } while (a > 0);
  try { g(); } catch (e) { throw e; } finally { h(); }
  return typeof a === "number" ? a : void 0;
}
(function () { return 1; })();
"#,
    );
}

#[test]
fn test_dangling_else_kept() {
    let printed = reprint("if (a) if (b) x(); else y();");
    assert!(printed.contains("if (b) {"));
    let program = parse_ok(&printed);
    match &program.body[0] {
        Stmt::If { alt, .. } => assert!(alt.is_none()),
        other => panic!("Expected If, got {:?}", other),
    }
}
