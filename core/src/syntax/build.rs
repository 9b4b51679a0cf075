//! Tree constructors
//!
//! One total, side-effect-free constructor per node shape. Passes never assemble
//! nodes by hand; they go through these so generated fragments stay uniform.

use super::ast::{
    AssignOp, BinaryOp, CatchClause, Declarator, Expr, Function, LogicalOp, MemberProp, Prop,
    PropKey, Stmt, UnaryOp, UpdateOp, VarKind,
};

/* ===================== Expressions ===================== */

pub fn ident(name: impl Into<String>) -> Expr {
    Expr::Ident { name: name.into() }
}

pub fn num(value: f64) -> Expr {
    Expr::Num { value }
}

pub fn str_lit(value: impl Into<String>) -> Expr {
    Expr::Str {
        value: value.into(),
    }
}

pub fn bool_lit(value: bool) -> Expr {
    Expr::Bool { value }
}

pub fn null() -> Expr {
    Expr::Null
}

/// `void 0`
pub fn undefined() -> Expr {
    unary(UnaryOp::Void, num(0.0))
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Expr::Array { elements }
}

pub fn object(props: Vec<(String, Expr)>) -> Expr {
    Expr::Object {
        props: props
            .into_iter()
            .map(|(name, value)| Prop {
                key: PropKey::Named { name },
                value,
            })
            .collect(),
    }
}

pub fn unary(op: UnaryOp, arg: Expr) -> Expr {
    Expr::Unary {
        op,
        arg: Box::new(arg),
    }
}

pub fn not(arg: Expr) -> Expr {
    unary(UnaryOp::Not, arg)
}

pub fn update(op: UpdateOp, prefix: bool, arg: Expr) -> Expr {
    Expr::Update {
        op,
        prefix,
        arg: Box::new(arg),
    }
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn strict_eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::StrictEq, left, right)
}

pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn and(left: Expr, right: Expr) -> Expr {
    logical(LogicalOp::And, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    logical(LogicalOp::Or, left, right)
}

/// Disjunction of all operands; `false` when empty
pub fn any(mut operands: Vec<Expr>) -> Expr {
    if operands.is_empty() {
        return bool_lit(false);
    }
    let first = operands.remove(0);
    operands.into_iter().fold(first, or)
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignOp::PLAIN, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
    }
}

pub fn cond(test: Expr, cons: Expr, alt: Expr) -> Expr {
    Expr::Cond {
        test: Box::new(test),
        cons: Box::new(cons),
        alt: Box::new(alt),
    }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

pub fn new(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::New {
        callee: Box::new(callee),
        args,
    }
}

pub fn member(object: Expr, name: impl Into<String>) -> Expr {
    Expr::Member {
        object: Box::new(object),
        prop: MemberProp::Named { name: name.into() },
    }
}

pub fn index(object: Expr, expr: Expr) -> Expr {
    Expr::Member {
        object: Box::new(object),
        prop: MemberProp::Computed {
            expr: Box::new(expr),
        },
    }
}

/// `obj.a.b.c` from a dotted path
pub fn path(root: &str, names: &[&str]) -> Expr {
    names
        .iter()
        .fold(ident(root), |object, name| member(object, *name))
}

pub fn seq(exprs: Vec<Expr>) -> Expr {
    Expr::Seq { exprs }
}

pub fn yield_star(arg: Expr) -> Expr {
    Expr::Yield {
        arg: Some(Box::new(arg)),
        delegate: true,
    }
}

pub fn yield_bare() -> Expr {
    Expr::Yield {
        arg: None,
        delegate: false,
    }
}

pub fn func_expr(func: Function) -> Expr {
    Expr::Function {
        func: Box::new(func),
    }
}

/* ===================== Functions ===================== */

pub fn function(name: Option<String>, params: Vec<String>, body: Vec<Stmt>) -> Function {
    Function {
        name,
        params,
        body,
        generator: false,
        arrow: false,
    }
}

/// Anonymous `function (params) { body }` expression
pub fn func(params: Vec<String>, body: Vec<Stmt>) -> Expr {
    func_expr(function(None, params, body))
}

/// `(params) => { body }`
pub fn arrow(params: Vec<String>, body: Vec<Stmt>) -> Expr {
    func_expr(Function {
        name: None,
        params,
        body,
        generator: false,
        arrow: true,
    })
}

/* ===================== Statements ===================== */

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr }
}

pub fn ret(arg: Expr) -> Stmt {
    Stmt::Return { arg: Some(arg) }
}

pub fn ret_void() -> Stmt {
    Stmt::Return { arg: None }
}

pub fn throw(arg: Expr) -> Stmt {
    Stmt::Throw { arg }
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block { body }
}

pub fn if_(test: Expr, cons: Vec<Stmt>, alt: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If {
        test,
        cons: Box::new(block(cons)),
        alt: alt.map(|a| Box::new(block(a))),
    }
}

/// `if` whose arms are kept as given (an `else if` chain keeps its shape)
pub fn if_stmt(test: Expr, cons: Stmt, alt: Option<Stmt>) -> Stmt {
    Stmt::If {
        test,
        cons: Box::new(cons),
        alt: alt.map(Box::new),
    }
}

pub fn while_(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While {
        test,
        body: Box::new(block(body)),
    }
}

pub fn labeled(label: impl Into<String>, body: Stmt) -> Stmt {
    Stmt::Labeled {
        label: label.into(),
        body: Box::new(body),
    }
}

pub fn break_(label: impl Into<String>) -> Stmt {
    Stmt::Break {
        label: Some(label.into()),
    }
}

pub fn decl(kind: VarKind, name: impl Into<String>, init: Option<Expr>) -> Stmt {
    Stmt::Var {
        kind,
        decls: vec![Declarator {
            name: name.into(),
            init,
        }],
    }
}

pub fn let_(name: impl Into<String>, init: Expr) -> Stmt {
    decl(VarKind::Let, name, Some(init))
}

pub fn const_(name: impl Into<String>, init: Expr) -> Stmt {
    decl(VarKind::Const, name, Some(init))
}

pub fn var(name: impl Into<String>, init: Option<Expr>) -> Stmt {
    decl(VarKind::Var, name, init)
}

/// `var a, b, c;`
pub fn var_list(names: Vec<String>) -> Stmt {
    Stmt::Var {
        kind: VarKind::Var,
        decls: names
            .into_iter()
            .map(|name| Declarator { name, init: None })
            .collect(),
    }
}

pub fn try_(block: Vec<Stmt>, handler: Option<(String, Vec<Stmt>)>, finalizer: Option<Vec<Stmt>>) -> Stmt {
    Stmt::Try {
        block,
        handler: handler.map(|(param, body)| CatchClause { param, body }),
        finalizer,
    }
}

pub fn func_decl(name: impl Into<String>, params: Vec<String>, body: Vec<Stmt>) -> Stmt {
    Stmt::Function {
        func: function(Some(name.into()), params, body),
    }
}
