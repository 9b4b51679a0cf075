//! PEST-based parser for the accepted script dialect
//!
//! Produces the `syntax::ast` tree every pass works on. Spans are kept only for
//! error reporting; the tree itself carries none.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::syntax::ast::{
    AssignOp, BinaryOp, CatchClause, Declarator, Expr, ForInLeft, ForInit, Function,
    LogicalOp, MemberProp, Program, Prop, PropKey, Span, Stmt, SwitchCase, UnaryOp, UpdateOp,
    VarKind,
};

#[cfg(test)]
mod tests;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/js.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg, _) => write!(f, "{}", msg),
            ParseError::BuildError(msg, Some(span)) => write!(
                f,
                "{} at line {}, col {}",
                msg,
                span.start_line + 1,
                span.start_col + 1
            ),
            ParseError::BuildError(msg, None) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Some(Span {
                start: 0,
                end: 0,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            }),
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Some(Span {
                    start: 0,
                    end: 0,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                })
            }
        };
        ParseError::PestError(err.to_string(), span)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>) -> Span {
    let pest_span = pair.as_span();
    let (start_line, start_col) = pest_span.start_pos().line_col();
    let (end_line, end_col) = pest_span.end_pos().line_col();
    Span::new(
        pest_span.start(),
        pest_span.end(),
        start_line.saturating_sub(1),
        start_col.saturating_sub(1),
        end_line.saturating_sub(1),
        end_col.saturating_sub(1),
    )
}

fn unexpected(pair: &Pair<Rule>, context: &str) -> ParseError {
    ParseError::BuildError(
        format!("Unexpected {:?} in {}", pair.as_rule(), context),
        Some(pair_to_span(pair)),
    )
}

/// Next child pair; the grammar guarantees presence, so absence is a builder bug
fn next_pair<'a>(inner: &mut Pairs<'a, Rule>, parent: Span, what: &str) -> ParseResult<Pair<'a, Rule>> {
    inner
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("Missing {}", what), Some(parent)))
}

/* ===================== Public API ===================== */

/// Parse source text into a program tree
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let mut pairs = ScriptParser::parse(Rule::program, source)?;
    let program = next_pair(&mut pairs, Span::default(), "program")?;

    let mut body = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::statement => body.push(build_statement(pair)?),
            Rule::EOI => {}
            _ => return Err(unexpected(&pair, "program")),
        }
    }
    Ok(Program { body })
}

/// Parse a single expression (testing and tooling API)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let program = parse_program(&format!("({});", source))?;
    match program.body.into_iter().next() {
        Some(Stmt::Expr { expr }) => Ok(expr),
        _ => Err(ParseError::BuildError(
            "Expected a single expression".to_string(),
            None,
        )),
    }
}

/* ===================== Statement Builders ===================== */

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let inner = next_pair(&mut pair.into_inner(), span, "statement body")?;

    match inner.as_rule() {
        Rule::block => Ok(Stmt::Block {
            body: build_statements(inner.into_inner())?,
        }),
        Rule::var_stmt => {
            let decl = next_pair(&mut inner.into_inner(), span, "declaration")?;
            let (kind, decls) = build_var_decl(decl)?;
            Ok(Stmt::Var { kind, decls })
        }
        Rule::function_decl => Ok(Stmt::Function {
            func: build_function(inner)?,
        }),
        Rule::if_stmt => build_if_stmt(inner),
        Rule::while_stmt => {
            let mut parts = inner.into_inner();
            let test = build_expression(next_pair(&mut parts, span, "while test")?)?;
            let body = build_statement(next_pair(&mut parts, span, "while body")?)?;
            Ok(Stmt::While {
                test,
                body: Box::new(body),
            })
        }
        Rule::do_while_stmt => {
            let mut parts = inner.into_inner();
            let body = build_statement(next_pair(&mut parts, span, "do body")?)?;
            let test = build_expression(next_pair(&mut parts, span, "do-while test")?)?;
            Ok(Stmt::DoWhile {
                body: Box::new(body),
                test,
            })
        }
        Rule::for_in_stmt => build_for_in_stmt(inner),
        Rule::for_stmt => build_for_stmt(inner),
        Rule::return_stmt => {
            let arg = match inner.into_inner().next() {
                Some(expr) => Some(build_expression(expr)?),
                None => None,
            };
            Ok(Stmt::Return { arg })
        }
        Rule::break_stmt => Ok(Stmt::Break {
            label: inner.into_inner().next().map(|p| p.as_str().to_string()),
        }),
        Rule::continue_stmt => Ok(Stmt::Continue {
            label: inner.into_inner().next().map(|p| p.as_str().to_string()),
        }),
        Rule::throw_stmt => {
            let arg = build_expression(next_pair(&mut inner.into_inner(), span, "throw value")?)?;
            Ok(Stmt::Throw { arg })
        }
        Rule::try_stmt => build_try_stmt(inner),
        Rule::switch_stmt => build_switch_stmt(inner),
        Rule::labeled_stmt => {
            let mut parts = inner.into_inner();
            let label = next_pair(&mut parts, span, "label")?.as_str().to_string();
            let body = build_statement(next_pair(&mut parts, span, "labeled body")?)?;
            Ok(Stmt::Labeled {
                label,
                body: Box::new(body),
            })
        }
        Rule::empty_stmt => Ok(Stmt::Empty),
        Rule::expr_stmt => {
            let expr = build_expression(next_pair(&mut inner.into_inner(), span, "expression")?)?;
            Ok(Stmt::Expr { expr })
        }
        _ => Err(unexpected(&inner, "statement")),
    }
}

fn build_statements(pairs: Pairs<Rule>) -> ParseResult<Vec<Stmt>> {
    pairs.map(build_statement).collect()
}

fn build_var_kind(pair: &Pair<Rule>) -> ParseResult<VarKind> {
    match pair.as_str() {
        "var" => Ok(VarKind::Var),
        "let" => Ok(VarKind::Let),
        "const" => Ok(VarKind::Const),
        other => Err(ParseError::BuildError(
            format!("Expected 'var', 'let' or 'const', got: {}", other),
            Some(pair_to_span(pair)),
        )),
    }
}

fn build_var_decl(pair: Pair<Rule>) -> ParseResult<(VarKind, Vec<Declarator>)> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let kind = build_var_kind(&next_pair(&mut inner, span, "declaration kind")?)?;

    let mut decls = Vec::new();
    for d in inner {
        let d_span = pair_to_span(&d);
        let mut parts = d.into_inner();
        let name = next_pair(&mut parts, d_span, "declared name")?.as_str().to_string();
        let init = match parts.next() {
            Some(expr) => Some(build_assign_expr(expr)?),
            None => None,
        };
        decls.push(Declarator { name, init });
    }
    Ok((kind, decls))
}

fn build_if_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let test = build_expression(next_pair(&mut inner, span, "if test")?)?;
    let cons = build_statement(next_pair(&mut inner, span, "if consequent")?)?;
    let alt = match inner.next() {
        Some(alt) => Some(Box::new(build_statement(alt)?)),
        None => None,
    };

    Ok(Stmt::If {
        test,
        cons: Box::new(cons),
        alt,
    })
}

fn build_for_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::for_init => {
                let span = pair_to_span(&part);
                let inner = next_pair(&mut part.into_inner(), span, "for initializer")?;
                init = Some(match inner.as_rule() {
                    Rule::var_decl => {
                        let (kind, decls) = build_var_decl(inner)?;
                        ForInit::Decl { kind, decls }
                    }
                    _ => ForInit::Expr {
                        expr: build_expression(inner)?,
                    },
                });
            }
            Rule::for_test => {
                let span = pair_to_span(&part);
                test = Some(build_expression(next_pair(&mut part.into_inner(), span, "for test")?)?);
            }
            Rule::for_update => {
                let span = pair_to_span(&part);
                update = Some(build_expression(next_pair(&mut part.into_inner(), span, "for update")?)?);
            }
            Rule::statement => body = Some(build_statement(part)?),
            _ => return Err(unexpected(&part, "for statement")),
        }
    }

    let body = body.ok_or_else(|| ParseError::BuildError("Missing for body".to_string(), None))?;
    Ok(Stmt::For {
        init,
        test,
        update,
        body: Box::new(body),
    })
}

fn build_for_in_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let left_pair = next_pair(&mut inner, span, "for-in binding")?;
    let left_span = pair_to_span(&left_pair);
    let mut left_parts = left_pair.into_inner();
    let first = next_pair(&mut left_parts, left_span, "for-in binding")?;
    let left = match first.as_rule() {
        Rule::var_kind => {
            let kind = build_var_kind(&first)?;
            let name = next_pair(&mut left_parts, left_span, "for-in name")?
                .as_str()
                .to_string();
            ForInLeft::Decl { kind, name }
        }
        _ => ForInLeft::Target {
            expr: build_lhs_expr(first)?,
        },
    };

    let right = build_expression(next_pair(&mut inner, span, "for-in object")?)?;
    let body = build_statement(next_pair(&mut inner, span, "for-in body")?)?;

    Ok(Stmt::ForIn {
        left,
        right,
        body: Box::new(body),
    })
}

fn build_try_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let block = build_statements(next_pair(&mut inner, span, "try block")?.into_inner())?;
    let mut handler = None;
    let mut finalizer = None;

    for part in inner {
        match part.as_rule() {
            Rule::catch_clause => {
                let c_span = pair_to_span(&part);
                let mut parts = part.into_inner();
                let param = next_pair(&mut parts, c_span, "catch parameter")?
                    .as_str()
                    .to_string();
                let body = build_statements(next_pair(&mut parts, c_span, "catch body")?.into_inner())?;
                handler = Some(CatchClause { param, body });
            }
            Rule::finally_clause => {
                let f_span = pair_to_span(&part);
                let body = next_pair(&mut part.into_inner(), f_span, "finally body")?;
                finalizer = Some(build_statements(body.into_inner())?);
            }
            _ => return Err(unexpected(&part, "try statement")),
        }
    }

    if handler.is_none() && finalizer.is_none() {
        return Err(ParseError::BuildError(
            "try requires catch or finally".to_string(),
            Some(span),
        ));
    }

    Ok(Stmt::Try {
        block,
        handler,
        finalizer,
    })
}

fn build_switch_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let disc = build_expression(next_pair(&mut inner, span, "switch discriminant")?)?;

    let mut cases = Vec::new();
    for case in inner {
        let c_span = pair_to_span(&case);
        let mut parts = case.into_inner();
        let head = next_pair(&mut parts, c_span, "case label")?;
        let test = match head.as_rule() {
            Rule::case_test => {
                let h_span = pair_to_span(&head);
                Some(build_expression(next_pair(&mut head.into_inner(), h_span, "case test")?)?)
            }
            _ => None,
        };
        let body = build_statements(parts)?;
        cases.push(SwitchCase { test, body });
    }

    Ok(Stmt::Switch { disc, cases })
}

fn build_function(pair: Pair<Rule>) -> ParseResult<Function> {
    let mut func = Function {
        name: None,
        params: Vec::new(),
        body: Vec::new(),
        generator: false,
        arrow: false,
    };

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::star => func.generator = true,
            Rule::identifier => func.name = Some(part.as_str().to_string()),
            Rule::params => {
                func.params = part.into_inner().map(|p| p.as_str().to_string()).collect();
            }
            Rule::function_body => func.body = build_statements(part.into_inner())?,
            _ => return Err(unexpected(&part, "function")),
        }
    }
    Ok(func)
}

/* ===================== Expression Builders ===================== */

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut exprs = pair
        .into_inner()
        .map(build_assign_expr)
        .collect::<ParseResult<Vec<_>>>()?;
    if exprs.len() == 1 {
        Ok(exprs.remove(0))
    } else {
        Ok(Expr::Seq { exprs })
    }
}

fn build_assign_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, span, "expression")?;

    match first.as_rule() {
        Rule::arrow_function => build_arrow(first),
        Rule::yield_expr => {
            let mut delegate = false;
            let mut arg = None;
            for part in first.into_inner() {
                match part.as_rule() {
                    Rule::star => delegate = true,
                    _ => arg = Some(Box::new(build_assign_expr(part)?)),
                }
            }
            Ok(Expr::Yield { arg, delegate })
        }
        Rule::conditional => {
            let left = build_conditional(first)?;
            let Some(op_pair) = inner.next() else {
                return Ok(left);
            };
            let value = build_assign_expr(next_pair(&mut inner, span, "assigned value")?)?;
            if !matches!(left, Expr::Ident { .. } | Expr::Member { .. }) {
                return Err(ParseError::BuildError(
                    "Invalid assignment target".to_string(),
                    Some(span),
                ));
            }
            let text = op_pair.as_str();
            let op = if text == "=" {
                AssignOp::PLAIN
            } else {
                let bin = BinaryOp::from_token(&text[..text.len() - 1])
                    .ok_or_else(|| unexpected(&op_pair, "assignment operator"))?;
                AssignOp(Some(bin))
            };
            Ok(Expr::Assign {
                op,
                target: Box::new(left),
                value: Box::new(value),
            })
        }
        _ => Err(unexpected(&first, "assignment expression")),
    }
}

fn build_arrow(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let params = next_pair(&mut inner, span, "arrow parameters")?
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
    let body_pair = next_pair(&mut inner, span, "arrow body")?;
    let body = match body_pair.as_rule() {
        Rule::function_body => build_statements(body_pair.into_inner())?,
        _ => vec![Stmt::Return {
            arg: Some(build_assign_expr(body_pair)?),
        }],
    };
    Ok(Expr::Function {
        func: Box::new(Function {
            name: None,
            params,
            body,
            generator: false,
            arrow: true,
        }),
    })
}

fn build_conditional(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let test = build_binary_chain(next_pair(&mut inner, span, "condition")?)?;
    match inner.next() {
        None => Ok(test),
        Some(cons) => {
            let cons = build_assign_expr(cons)?;
            let alt = build_assign_expr(next_pair(&mut inner, span, "conditional alternative")?)?;
            Ok(Expr::Cond {
                test: Box::new(test),
                cons: Box::new(cons),
                alt: Box::new(alt),
            })
        }
    }
}

/// Left-associative operator levels from `logical_or` down to `multiplicative`,
/// plus the right-associative `exponent`.
fn build_binary_chain(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::unary => return build_unary(pair),
        Rule::exponent => {
            let span = pair_to_span(&pair);
            let mut inner = pair.into_inner();
            let base = build_unary(next_pair(&mut inner, span, "operand")?)?;
            return match inner.next() {
                None => Ok(base),
                Some(_op) => {
                    let power = build_binary_chain(next_pair(&mut inner, span, "exponent")?)?;
                    Ok(Expr::Binary {
                        op: BinaryOp::Exp,
                        left: Box::new(base),
                        right: Box::new(power),
                    })
                }
            };
        }
        _ => {}
    }

    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let mut left = build_binary_chain(next_pair(&mut inner, span, "operand")?)?;

    while let Some(op_pair) = inner.next() {
        let right = build_binary_chain(next_pair(&mut inner, span, "operand")?)?;
        left = match op_pair.as_rule() {
            Rule::op_or => Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            },
            Rule::op_and => Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
            _ => {
                let op = BinaryOp::from_token(op_pair.as_str())
                    .ok_or_else(|| unexpected(&op_pair, "binary expression"))?;
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
        };
    }
    Ok(left)
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, span, "unary operand")?;

    match first.as_rule() {
        Rule::prefix_update => {
            let p_span = pair_to_span(&first);
            let mut parts = first.into_inner();
            let op = build_update_op(&next_pair(&mut parts, p_span, "update operator")?);
            let arg = build_unary(next_pair(&mut parts, p_span, "update target")?)?;
            Ok(Expr::Update {
                op,
                prefix: true,
                arg: Box::new(arg),
            })
        }
        Rule::unary_op => {
            let op = UnaryOp::from_token(first.as_str())
                .ok_or_else(|| unexpected(&first, "unary expression"))?;
            let arg = build_unary(next_pair(&mut inner, span, "unary operand")?)?;
            Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            })
        }
        Rule::postfix => {
            let p_span = pair_to_span(&first);
            let mut parts = first.into_inner();
            let arg = build_lhs_expr(next_pair(&mut parts, p_span, "operand")?)?;
            match parts.next() {
                None => Ok(arg),
                Some(op) => Ok(Expr::Update {
                    op: build_update_op(&op),
                    prefix: false,
                    arg: Box::new(arg),
                }),
            }
        }
        _ => Err(unexpected(&first, "unary expression")),
    }
}

fn build_update_op(pair: &Pair<Rule>) -> UpdateOp {
    if pair.as_str() == "++" {
        UpdateOp::Incr
    } else {
        UpdateOp::Decr
    }
}

fn build_lhs_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let head = next_pair(&mut inner, span, "expression head")?;
    let mut expr = match head.as_rule() {
        Rule::new_expr => build_new_expr(head)?,
        _ => build_primary(head)?,
    };

    for suffix in inner {
        let s_span = pair_to_span(&suffix);
        let part = next_pair(&mut suffix.into_inner(), s_span, "suffix")?;
        expr = apply_suffix(expr, part)?;
    }
    Ok(expr)
}

fn apply_suffix(expr: Expr, part: Pair<Rule>) -> ParseResult<Expr> {
    match part.as_rule() {
        Rule::call_args => Ok(Expr::Call {
            callee: Box::new(expr),
            args: build_args(part)?,
        }),
        Rule::dot_access => {
            let span = pair_to_span(&part);
            let name = next_pair(&mut part.into_inner(), span, "property name")?
                .as_str()
                .to_string();
            Ok(Expr::Member {
                object: Box::new(expr),
                prop: MemberProp::Named { name },
            })
        }
        Rule::index_access => {
            let span = pair_to_span(&part);
            let index = build_expression(next_pair(&mut part.into_inner(), span, "index")?)?;
            Ok(Expr::Member {
                object: Box::new(expr),
                prop: MemberProp::Computed {
                    expr: Box::new(index),
                },
            })
        }
        _ => Err(unexpected(&part, "member or call")),
    }
}

fn build_args(pair: Pair<Rule>) -> ParseResult<Vec<Expr>> {
    pair.into_inner().map(build_assign_expr).collect()
}

fn build_new_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let callee_pair = next_pair(&mut inner, span, "constructor")?;
    let c_span = pair_to_span(&callee_pair);
    let mut callee_parts = callee_pair.into_inner();
    let head = next_pair(&mut callee_parts, c_span, "constructor")?;
    let mut callee = match head.as_rule() {
        Rule::new_expr => build_new_expr(head)?,
        _ => build_primary(head)?,
    };
    for part in callee_parts {
        callee = apply_suffix(callee, part)?;
    }

    let args = match inner.next() {
        Some(args) => build_args(args)?,
        None => Vec::new(),
    };
    Ok(Expr::New {
        callee: Box::new(callee),
        args,
    })
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let inner = match pair.as_rule() {
        Rule::primary => next_pair(&mut pair.into_inner(), span, "primary expression")?,
        _ => pair,
    };

    match inner.as_rule() {
        Rule::function_expr => Ok(Expr::Function {
            func: Box::new(build_function(inner)?),
        }),
        Rule::new_target => Ok(Expr::NewTarget),
        Rule::this_expr => Ok(Expr::This),
        Rule::literal => build_literal(inner),
        Rule::array_lit => Ok(Expr::Array {
            elements: inner
                .into_inner()
                .map(build_assign_expr)
                .collect::<ParseResult<Vec<_>>>()?,
        }),
        Rule::object_lit => build_object(inner),
        Rule::paren_expr => {
            let p_span = pair_to_span(&inner);
            build_expression(next_pair(&mut inner.into_inner(), p_span, "parenthesized expression")?)
        }
        Rule::identifier => Ok(Expr::Ident {
            name: inner.as_str().to_string(),
        }),
        _ => Err(unexpected(&inner, "primary expression")),
    }
}

fn build_literal(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let inner = next_pair(&mut pair.into_inner(), span, "literal")?;
    match inner.as_rule() {
        Rule::number => Ok(Expr::Num {
            value: parse_number(&inner)?,
        }),
        Rule::string => Ok(Expr::Str {
            value: build_string(inner)?,
        }),
        Rule::boolean => Ok(Expr::Bool {
            value: inner.as_str() == "true",
        }),
        Rule::null_lit => Ok(Expr::Null),
        _ => Err(unexpected(&inner, "literal")),
    }
}

fn parse_number(pair: &Pair<Rule>) -> ParseResult<f64> {
    let text = pair.as_str();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map(|v| v as f64).ok()
    } else {
        text.parse::<f64>().ok()
    };
    parsed.ok_or_else(|| {
        ParseError::BuildError(
            format!("Invalid number literal: {}", text),
            Some(pair_to_span(pair)),
        )
    })
}

fn build_string(pair: Pair<Rule>) -> ParseResult<String> {
    let span = pair_to_span(&pair);
    let body = next_pair(&mut pair.into_inner(), span, "string body")?;
    unescape(body.as_str()).ok_or_else(|| {
        ParseError::BuildError("Invalid escape sequence".to_string(), Some(span))
    })
}

/// Decode the escape sequences of a string literal body
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    u32::from_str_radix(&hex, 16).ok()?
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    u32::from_str_radix(&hex, 16).ok()?
                };
                // Lone surrogates have no `char`; keep them as the replacement character
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn build_object(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut props = Vec::new();

    for prop in pair.into_inner() {
        let span = pair_to_span(&prop);
        let inner = next_pair(&mut prop.into_inner(), span, "property")?;
        match inner.as_rule() {
            Rule::keyed_prop => {
                let mut parts = inner.into_inner();
                let key = build_prop_key(next_pair(&mut parts, span, "property key")?)?;
                let value = build_assign_expr(next_pair(&mut parts, span, "property value")?)?;
                props.push(Prop { key, value });
            }
            Rule::method_prop => {
                let mut parts = inner.into_inner();
                let key = build_prop_key(next_pair(&mut parts, span, "method name")?)?;
                let params = next_pair(&mut parts, span, "method parameters")?
                    .into_inner()
                    .map(|p| p.as_str().to_string())
                    .collect();
                let body = build_statements(next_pair(&mut parts, span, "method body")?.into_inner())?;
                props.push(Prop {
                    key,
                    value: Expr::Function {
                        func: Box::new(Function {
                            name: None,
                            params,
                            body,
                            generator: false,
                            arrow: false,
                        }),
                    },
                });
            }
            Rule::shorthand_prop => {
                let name = inner.as_str().trim().to_string();
                props.push(Prop {
                    key: PropKey::Named { name: name.clone() },
                    value: Expr::Ident { name },
                });
            }
            _ => return Err(unexpected(&inner, "object literal")),
        }
    }
    Ok(Expr::Object { props })
}

fn build_prop_key(pair: Pair<Rule>) -> ParseResult<PropKey> {
    let span = pair_to_span(&pair);
    let inner = next_pair(&mut pair.into_inner(), span, "property key")?;
    match inner.as_rule() {
        Rule::prop_name => Ok(PropKey::Named {
            name: inner.as_str().to_string(),
        }),
        Rule::string => Ok(PropKey::Str {
            value: build_string(inner)?,
        }),
        Rule::number => Ok(PropKey::Num {
            value: parse_number(&inner)?,
        }),
        Rule::computed_key => {
            let c_span = pair_to_span(&inner);
            let expr = build_assign_expr(next_pair(&mut inner.into_inner(), c_span, "computed key")?)?;
            Ok(PropKey::Computed {
                expr: Box::new(expr),
            })
        }
        _ => Err(unexpected(&inner, "property key")),
    }
}
