//! Administrative normal form
//!
//! After this pass a call or `new` only appears in one of two statement shapes:
//!
//! ```text
//! let $t = callee(a, b);
//! callee(a, b);
//! ```
//!
//! where every argument is atomic and a method receiver is an identifier or `this`.
//! Nested calls are named with fresh `let` bindings in evaluation order:
//!
//! ```text
//! x = f(g(1)) + h();
//! // becomes
//! let $t = g(1);
//! let $t_1 = f($t);
//! let $t_2 = h();
//! x = $t_1 + $t_2;
//! ```
//!
//! An operand evaluated before a later call is named too, so a call cannot change a
//! value the original program had already read. Conditionals whose arms call become
//! `if` statements, and a loop test that calls moves into the loop body.

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{
    Declarator, Expr, MemberProp, Program, Prop, PropKey, Stmt, UnaryOp, VarKind,
};
use crate::syntax::visit::contains_call;
use crate::syntax::{build, NameGen};

pub struct Anf;

impl Pass for Anf {
    fn name(&self) -> &'static str {
        "anf"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut rewriter = AnfRewriter {
            names: &mut cx.names,
        };
        program.body = rewriter.block(program.body)?;
        Ok(program)
    }
}

/// Values that read no state: naming them never matters
fn is_stable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Num { .. }
            | Expr::Str { .. }
            | Expr::Bool { .. }
            | Expr::Null
            | Expr::This
            | Expr::NewTarget
            | Expr::Function { .. }
    )
}

/// Expressions that normalize to a fresh temporary nothing else can assign
fn names_itself(expr: &Expr) -> bool {
    expr.is_call() || (matches!(expr, Expr::Cond { .. }) && contains_call(expr))
}

struct AnfRewriter<'a> {
    names: &'a mut NameGen,
}

impl AnfRewriter<'_> {
    fn fail(message: impl Into<String>) -> CompileError {
        CompileError::pass("anf", message)
    }

    /// `let $t = value;` and the reference to it
    fn temp(&mut self, value: Expr, pre: &mut Vec<Stmt>) -> Expr {
        let name = self.names.fresh("t");
        pre.push(build::let_(&name, value));
        build::ident(name)
    }

    fn atomic(&mut self, expr: Expr, pre: &mut Vec<Stmt>) -> Expr {
        if expr.is_atomic() {
            expr
        } else {
            self.temp(expr, pre)
        }
    }

    /// Normalize operands evaluated left to right
    fn siblings(&mut self, exprs: Vec<Expr>, pre: &mut Vec<Stmt>) -> RewriteResult<Vec<Expr>> {
        let calls: Vec<bool> = exprs.iter().map(contains_call).collect();
        let mut out = Vec::with_capacity(exprs.len());
        for (i, expr) in exprs.into_iter().enumerate() {
            let later_call = calls[i + 1..].iter().any(|c| *c);
            let named = names_itself(&expr);
            let expr = self.norm(expr, pre)?;
            if later_call && !named && !is_stable(&expr) {
                out.push(self.temp(expr, pre));
            } else {
                out.push(expr);
            }
        }
        Ok(out)
    }

    fn pair(&mut self, first: Expr, second: Expr, pre: &mut Vec<Stmt>) -> RewriteResult<[Expr; 2]> {
        self.siblings(vec![first, second], pre)?
            .try_into()
            .map_err(|_| Self::fail("operand count changed"))
    }

    /// A call-free expression equivalent to `expr`, with the calls it performed
    /// appended to `pre`
    fn norm(&mut self, expr: Expr, pre: &mut Vec<Stmt>) -> RewriteResult<Expr> {
        Ok(match expr {
            Expr::Ident { .. }
            | Expr::This
            | Expr::NewTarget
            | Expr::Num { .. }
            | Expr::Str { .. }
            | Expr::Bool { .. }
            | Expr::Null => expr,
            Expr::Function { mut func } => {
                self.function(&mut func)?;
                Expr::Function { func }
            }
            Expr::Array { elements } => Expr::Array {
                elements: self.siblings(elements, pre)?,
            },
            Expr::Object { props } => self.object(props, pre)?,
            Expr::Unary { op, arg } => {
                let arg = match op {
                    UnaryOp::Delete => self.target(*arg, false, pre)?,
                    _ => self.norm(*arg, pre)?,
                };
                build::unary(op, arg)
            }
            Expr::Update { op, prefix, arg } => {
                let arg = self.target(*arg, false, pre)?;
                build::update(op, prefix, arg)
            }
            Expr::Binary { op, left, right } => {
                let [left, right] = self.pair(*left, *right, pre)?;
                build::binary(op, left, right)
            }
            Expr::Logical { op, left, right } => {
                if contains_call(&right) {
                    return Err(Self::fail(
                        "short-circuit operator with a call on its right side",
                    ));
                }
                let left = self.norm(*left, pre)?;
                let right = self.norm(*right, pre)?;
                build::logical(op, left, right)
            }
            Expr::Assign { op, target, value } => {
                let value_calls = contains_call(&value);
                if !op.is_plain() && value_calls {
                    // read the old value before the call can change it
                    let target = self.target(*target, true, pre)?;
                    let old = self.temp(target.clone(), pre);
                    let value = self.norm(*value, pre)?;
                    let combine = op.0.ok_or_else(|| Self::fail("compound assignment"))?;
                    build::assign(target, build::binary(combine, old, value))
                } else {
                    let target = self.target(*target, value_calls, pre)?;
                    let value = self.norm(*value, pre)?;
                    build::assign_op(op, target, value)
                }
            }
            Expr::Cond { test, cons, alt } => {
                let test = self.norm(*test, pre)?;
                if !contains_call(&cons) && !contains_call(&alt) {
                    let cons = self.norm(*cons, pre)?;
                    let alt = self.norm(*alt, pre)?;
                    return Ok(build::cond(test, cons, alt));
                }
                let result = self.names.fresh("cond");
                pre.push(build::decl(VarKind::Let, &result, None));
                let cons = self.branch(*cons, &result)?;
                let alt = self.branch(*alt, &result)?;
                pre.push(build::if_(test, cons, Some(alt)));
                build::ident(result)
            }
            Expr::Call { callee, args } => {
                let call = self.call(*callee, args, false, pre)?;
                self.temp(call, pre)
            }
            Expr::New { callee, args } => {
                let call = self.call(*callee, args, true, pre)?;
                self.temp(call, pre)
            }
            Expr::Member { object, prop } => match prop {
                MemberProp::Named { name } => build::member(self.norm(*object, pre)?, name),
                MemberProp::Computed { expr } => {
                    let [object, key] = self.pair(*object, *expr, pre)?;
                    build::index(object, key)
                }
            },
            Expr::Seq { exprs } => build::seq(self.siblings(exprs, pre)?),
            Expr::Yield { arg, delegate } => Expr::Yield {
                arg: match arg {
                    Some(arg) => Some(Box::new(self.norm(*arg, pre)?)),
                    None => None,
                },
                delegate,
            },
        })
    }

    /// One arm of a conditional as statements assigning `result`
    fn branch(&mut self, arm: Expr, result: &str) -> RewriteResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        let value = self.norm(arm, &mut stmts)?;
        stmts.push(build::expr_stmt(build::assign(build::ident(result), value)));
        Ok(stmts)
    }

    fn object(&mut self, props: Vec<Prop>, pre: &mut Vec<Stmt>) -> RewriteResult<Expr> {
        // computed keys and values interleave in evaluation order
        let mut operands = Vec::new();
        let mut shapes = Vec::new();
        for prop in props {
            match prop.key {
                PropKey::Computed { expr } => {
                    operands.push(*expr);
                    shapes.push(None);
                }
                key => shapes.push(Some(key)),
            }
            operands.push(prop.value);
        }

        let mut operands = self.siblings(operands, pre)?.into_iter();
        let mut out = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let key = match shape {
                Some(key) => key,
                None => PropKey::Computed {
                    expr: Box::new(operands.next().ok_or_else(|| Self::fail("object key"))?),
                },
            };
            let value = operands.next().ok_or_else(|| Self::fail("object value"))?;
            out.push(Prop { key, value });
        }
        Ok(Expr::Object { props: out })
    }

    /// An assignment target; its object and key are named when a later call could
    /// change them
    fn target(&mut self, target: Expr, later_call: bool, pre: &mut Vec<Stmt>) -> RewriteResult<Expr> {
        match target {
            Expr::Member { object, prop } => {
                let key_calls = match &prop {
                    MemberProp::Computed { expr } => contains_call(expr),
                    MemberProp::Named { .. } => false,
                };
                let object = self.norm(*object, pre)?;
                let object = if (later_call || key_calls) && !is_stable(&object) {
                    self.temp(object, pre)
                } else {
                    object
                };
                Ok(match prop {
                    MemberProp::Named { name } => build::member(object, name),
                    MemberProp::Computed { expr } => {
                        let key = self.norm(*expr, pre)?;
                        let key = if later_call && !is_stable(&key) {
                            self.temp(key, pre)
                        } else {
                            key
                        };
                        build::index(object, key)
                    }
                })
            }
            other => self.norm(other, pre),
        }
    }

    /// A call whose callee is in call position and whose arguments are atomic
    fn call(
        &mut self,
        callee: Expr,
        args: Vec<Expr>,
        is_new: bool,
        pre: &mut Vec<Stmt>,
    ) -> RewriteResult<Expr> {
        let callee = match callee {
            Expr::Ident { .. } => callee,
            Expr::Member { object, prop } => {
                let object = self.norm(*object, pre)?;
                let object = self.atomic(object, pre);
                let prop = match prop {
                    MemberProp::Named { name } => MemberProp::Named { name },
                    MemberProp::Computed { expr } => {
                        let key = self.norm(*expr, pre)?;
                        MemberProp::Computed {
                            expr: Box::new(self.atomic(key, pre)),
                        }
                    }
                };
                Expr::Member {
                    object: Box::new(object),
                    prop,
                }
            }
            other => {
                let callee = self.norm(other, pre)?;
                self.atomic(callee, pre)
            }
        };

        let calls: Vec<bool> = args.iter().map(contains_call).collect();
        let mut atomic_args = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let later_call = calls[i + 1..].iter().any(|c| *c);
            let named = names_itself(&arg);
            let arg = self.norm(arg, pre)?;
            let arg = if arg.is_atomic() && (named || !later_call || is_stable(&arg)) {
                arg
            } else {
                self.temp(arg, pre)
            };
            atomic_args.push(arg);
        }

        Ok(if is_new {
            build::new(callee, atomic_args)
        } else {
            build::call(callee, atomic_args)
        })
    }

    /// `while` whose test calls: `while (true) { pre; if (!test) break L; body }`
    fn while_loop(&mut self, label: Option<String>, test: Expr, body: Stmt) -> RewriteResult<Stmt> {
        if !contains_call(&test) {
            let mut pre = Vec::new();
            let test = self.norm(test, &mut pre)?;
            let body = self.single(body)?;
            let stmt = Stmt::While {
                test,
                body: Box::new(body),
            };
            return Ok(match label {
                Some(label) => build::labeled(label, stmt),
                None => stmt,
            });
        }

        let label = match label {
            Some(label) => label,
            None => self.names.fresh("loop_break"),
        };
        let mut head = Vec::new();
        let test = self.norm(test, &mut head)?;
        head.push(build::if_(build::not(test), vec![build::break_(&label)], None));
        head.extend(self.block(body.into_block())?);
        Ok(build::labeled(label, build::while_(build::bool_lit(true), head)))
    }
}

impl Rewrite for AnfRewriter<'_> {
    // every statement normalizes its own expressions in `stmt`
    fn expr(&mut self, _expr: &mut Expr) -> RewriteResult<()> {
        Ok(())
    }

    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        let mut pre = Vec::new();
        let stmt = match stmt {
            Stmt::Expr {
                expr: Expr::Call { callee, args },
            } => build::expr_stmt(self.call(*callee, args, false, &mut pre)?),
            Stmt::Expr {
                expr: Expr::New { callee, args },
            } => build::expr_stmt(self.call(*callee, args, true, &mut pre)?),
            Stmt::Expr { expr } => build::expr_stmt(self.norm(expr, &mut pre)?),
            Stmt::Var { kind, decls } => {
                // one binding per statement so a call result binds directly
                for d in decls {
                    let init = match d.init {
                        Some(Expr::Call { callee, args }) => {
                            Some(self.call(*callee, args, false, &mut pre)?)
                        }
                        Some(Expr::New { callee, args }) => {
                            Some(self.call(*callee, args, true, &mut pre)?)
                        }
                        Some(init) => Some(self.norm(init, &mut pre)?),
                        None => None,
                    };
                    pre.push(Stmt::Var {
                        kind,
                        decls: vec![Declarator { name: d.name, init }],
                    });
                }
                return Ok(pre);
            }
            Stmt::Return { arg: Some(arg) } => Stmt::Return {
                arg: Some(self.norm(arg, &mut pre)?),
            },
            Stmt::Throw { arg } => build::throw(self.norm(arg, &mut pre)?),
            Stmt::If { test, cons, alt } => {
                let test = self.norm(test, &mut pre)?;
                let cons = self.single(*cons)?;
                let alt = match alt {
                    Some(alt) => Some(self.single(*alt)?),
                    None => None,
                };
                build::if_stmt(test, cons, alt)
            }
            Stmt::Labeled { label, body } if matches!(*body, Stmt::While { .. }) => {
                let Stmt::While { test, body } = *body else {
                    return Err(Self::fail("labeled loop"));
                };
                self.while_loop(Some(label), test, *body)?
            }
            Stmt::While { test, body } => self.while_loop(None, test, *body)?,
            Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForIn { .. } | Stmt::Switch { .. } => {
                return Err(Self::fail("loops and switches must be desugared first"));
            }
            other => self.descend(other)?,
        };
        pre.push(stmt);
        Ok(pre)
    }
}
