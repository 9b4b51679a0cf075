//! Code generator
//!
//! Turns a tree back into source text. Parentheses are inserted from operator
//! precedence only, so printing a freshly parsed program normalizes its layout but
//! never its meaning.

use super::ast::{
    Declarator, Expr, ForInLeft, ForInit, Function, MemberProp, Program, Prop, PropKey, Stmt,
    UnaryOp, UpdateOp,
};

/// Print a whole program
pub fn print_program(program: &Program) -> String {
    let mut p = Printer::default();
    for stmt in &program.body {
        p.stmt(stmt);
    }
    p.out
}

/// Print a statement list at top level
pub fn print_stmts(stmts: &[Stmt]) -> String {
    let mut p = Printer::default();
    for stmt in stmts {
        p.stmt(stmt);
    }
    p.out
}

/// Print a single expression
pub fn print_expr(expr: &Expr) -> String {
    let mut p = Printer::default();
    p.expr(expr, prec::SEQ);
    p.out
}

mod prec {
    pub const SEQ: u8 = 1;
    pub const ASSIGN: u8 = 2;
    pub const COND: u8 = 3;
    pub const OR: u8 = 4;
    pub const AND: u8 = 5;
    pub const BIT_OR: u8 = 6;
    pub const BIT_XOR: u8 = 7;
    pub const BIT_AND: u8 = 8;
    pub const EQUALITY: u8 = 9;
    pub const RELATIONAL: u8 = 10;
    pub const SHIFT: u8 = 11;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 13;
    pub const EXPONENT: u8 = 14;
    pub const UNARY: u8 = 15;
    pub const POSTFIX: u8 = 16;
    pub const LHS: u8 = 17;
    pub const CALL: u8 = 18;
    pub const PRIMARY: u8 = 20;
}

fn binary_prec(op: super::ast::BinaryOp) -> u8 {
    use super::ast::BinaryOp::*;
    match op {
        BitOr => prec::BIT_OR,
        BitXor => prec::BIT_XOR,
        BitAnd => prec::BIT_AND,
        Eq | Ne | StrictEq | StrictNe => prec::EQUALITY,
        Lt | Le | Gt | Ge | In | InstanceOf => prec::RELATIONAL,
        Shl | Shr | UShr => prec::SHIFT,
        Add | Sub => prec::ADDITIVE,
        Mul | Div | Rem => prec::MULTIPLICATIVE,
        Exp => prec::EXPONENT,
    }
}

fn expr_prec(expr: &Expr) -> u8 {
    match expr {
        Expr::Seq { exprs } if exprs.len() > 1 => prec::SEQ,
        Expr::Seq { .. } => prec::PRIMARY,
        Expr::Assign { .. } | Expr::Yield { .. } => prec::ASSIGN,
        Expr::Function { func } if func.arrow => prec::ASSIGN,
        Expr::Cond { .. } => prec::COND,
        Expr::Logical { op, .. } => match op {
            super::ast::LogicalOp::Or => prec::OR,
            super::ast::LogicalOp::And => prec::AND,
        },
        Expr::Binary { op, .. } => binary_prec(*op),
        Expr::Unary { .. } => prec::UNARY,
        Expr::Update { prefix: true, .. } => prec::UNARY,
        Expr::Update { prefix: false, .. } => prec::POSTFIX,
        Expr::Call { .. } | Expr::New { .. } | Expr::Member { .. } => prec::CALL,
        _ => prec::PRIMARY,
    }
}

/// Would this expression, printed at statement start, begin with `{` or `function`?
fn starts_ambiguously(expr: &Expr) -> bool {
    match expr {
        Expr::Object { .. } => true,
        Expr::Function { func } => !func.arrow,
        Expr::Call { callee, .. } => {
            !matches!(**callee, Expr::Function { .. }) && starts_ambiguously(callee)
        }
        Expr::Member { object, .. } => {
            !matches!(**object, Expr::Function { .. }) && starts_ambiguously(object)
        }
        Expr::Binary { left, .. } | Expr::Logical { left, .. } => starts_ambiguously(left),
        Expr::Assign { target, .. } => starts_ambiguously(target),
        Expr::Cond { test, .. } => starts_ambiguously(test),
        Expr::Seq { exprs } => exprs.first().map(starts_ambiguously).unwrap_or(false),
        Expr::Update {
            prefix: false, arg, ..
        } => starts_ambiguously(arg),
        _ => false,
    }
}

/// Is there a call anywhere along the callee/object spine? `new` needs parens then.
fn call_in_spine(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => call_in_spine(object),
        _ => false,
    }
}

pub fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /* ===================== Statements ===================== */

    fn stmt(&mut self, stmt: &Stmt) {
        self.line_start();
        self.stmt_inline(stmt);
        self.out.push('\n');
    }

    /// Print a statement whose first line continues the current line
    fn stmt_inline(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => self.push(";"),
            Stmt::Expr { expr } => {
                if starts_ambiguously(expr) {
                    self.push("(");
                    self.expr(expr, prec::SEQ);
                    self.push(")");
                } else {
                    self.expr(expr, prec::SEQ);
                }
                self.push(";");
            }
            Stmt::Var { kind, decls } => {
                self.push(kind.as_str());
                self.push(" ");
                self.declarators(decls);
                self.push(";");
            }
            Stmt::Function { func } => self.function(func),
            Stmt::Return { arg } => match arg {
                Some(arg) => {
                    self.push("return ");
                    self.expr(arg, prec::SEQ);
                    self.push(";");
                }
                None => self.push("return;"),
            },
            Stmt::If { test, cons, alt } => {
                self.push("if (");
                self.expr(test, prec::SEQ);
                self.push(") ");
                self.body(cons);
                if let Some(alt) = alt {
                    self.push(" else ");
                    if matches!(**alt, Stmt::If { .. }) {
                        self.stmt_inline(alt);
                    } else {
                        self.body(alt);
                    }
                }
            }
            Stmt::Block { body } => self.block(body),
            Stmt::While { test, body } => {
                self.push("while (");
                self.expr(test, prec::SEQ);
                self.push(") ");
                self.body(body);
            }
            Stmt::DoWhile { body, test } => {
                self.push("do ");
                self.body(body);
                self.push(" while (");
                self.expr(test, prec::SEQ);
                self.push(");");
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push("for (");
                match init {
                    Some(ForInit::Decl { kind, decls }) => {
                        self.push(kind.as_str());
                        self.push(" ");
                        self.declarators(decls);
                    }
                    Some(ForInit::Expr { expr }) => self.expr(expr, prec::SEQ),
                    None => {}
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(test, prec::SEQ);
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(update, prec::SEQ);
                }
                self.push(") ");
                self.body(body);
            }
            Stmt::ForIn { left, right, body } => {
                self.push("for (");
                match left {
                    ForInLeft::Decl { kind, name } => {
                        self.push(kind.as_str());
                        self.push(" ");
                        self.push(name);
                    }
                    ForInLeft::Target { expr } => self.expr(expr, prec::LHS),
                }
                self.push(" in ");
                self.expr(right, prec::SEQ);
                self.push(") ");
                self.body(body);
            }
            Stmt::Labeled { label, body } => {
                self.push(label);
                self.push(": ");
                self.stmt_inline(body);
            }
            Stmt::Break { label } => {
                self.push("break");
                if let Some(l) = label {
                    self.push(" ");
                    self.push(l);
                }
                self.push(";");
            }
            Stmt::Continue { label } => {
                self.push("continue");
                if let Some(l) = label {
                    self.push(" ");
                    self.push(l);
                }
                self.push(";");
            }
            Stmt::Throw { arg } => {
                self.push("throw ");
                self.expr(arg, prec::SEQ);
                self.push(";");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.push("try ");
                self.block(block);
                if let Some(h) = handler {
                    self.push(" catch (");
                    self.push(&h.param);
                    self.push(") ");
                    self.block(&h.body);
                }
                if let Some(f) = finalizer {
                    self.push(" finally ");
                    self.block(f);
                }
            }
            Stmt::Switch { disc, cases } => {
                self.push("switch (");
                self.expr(disc, prec::SEQ);
                self.push(") {\n");
                self.indent += 1;
                for case in cases {
                    self.line_start();
                    match &case.test {
                        Some(test) => {
                            self.push("case ");
                            self.expr(test, prec::SEQ);
                            self.push(":\n");
                        }
                        None => self.push("default:\n"),
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line_start();
                self.push("}");
            }
        }
    }

    /// Loop and branch bodies always print as blocks
    fn body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { body } => self.block(body),
            other => self.block(std::slice::from_ref(other)),
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        if body.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{\n");
        self.indent += 1;
        for s in body {
            self.stmt(s);
        }
        self.indent -= 1;
        self.line_start();
        self.push("}");
    }

    fn declarators(&mut self, decls: &[Declarator]) {
        for (i, d) in decls.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&d.name);
            if let Some(init) = &d.init {
                self.push(" = ");
                self.expr(init, prec::ASSIGN);
            }
        }
    }

    fn function(&mut self, func: &Function) {
        if func.arrow {
            self.push("(");
            self.push(&func.params.join(", "));
            self.push(") => ");
            self.block(&func.body);
            return;
        }
        self.push("function");
        if func.generator {
            self.push("*");
        }
        self.push(" ");
        if let Some(name) = &func.name {
            self.push(name);
        }
        self.push("(");
        self.push(&func.params.join(", "));
        self.push(") ");
        self.block(&func.body);
    }

    /* ===================== Expressions ===================== */

    fn expr(&mut self, expr: &Expr, min: u8) {
        let needs_parens = expr_prec(expr) < min;
        if needs_parens {
            self.push("(");
        }
        self.expr_raw(expr);
        if needs_parens {
            self.push(")");
        }
    }

    fn expr_raw(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { name } => self.push(name),
            Expr::This => self.push("this"),
            Expr::NewTarget => self.push("new.target"),
            Expr::Num { value } => {
                let s = format_number(*value);
                self.push(&s);
            }
            Expr::Str { value } => {
                let s = quote_string(value);
                self.push(&s);
            }
            Expr::Bool { value } => self.push(if *value { "true" } else { "false" }),
            Expr::Null => self.push("null"),
            Expr::Array { elements } => {
                self.push("[");
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(e, prec::ASSIGN);
                }
                self.push("]");
            }
            Expr::Object { props } => self.object(props),
            Expr::Function { func } => self.function(func),
            Expr::Unary { op, arg } => {
                self.push(op.as_str());
                match op {
                    UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete => {
                        self.push(" ");
                        self.expr(arg, prec::UNARY);
                    }
                    UnaryOp::Neg | UnaryOp::Plus => {
                        let clashes = match &**arg {
                            Expr::Unary { op: inner, .. } => {
                                matches!(inner, UnaryOp::Neg | UnaryOp::Plus)
                            }
                            Expr::Update { prefix: true, .. } => true,
                            Expr::Num { value } => *value < 0.0,
                            _ => false,
                        };
                        if clashes {
                            self.push("(");
                            self.expr(arg, prec::SEQ);
                            self.push(")");
                        } else {
                            self.expr(arg, prec::UNARY);
                        }
                    }
                    _ => self.expr(arg, prec::UNARY),
                }
            }
            Expr::Update { op, prefix, arg } => {
                let op = match op {
                    UpdateOp::Incr => "++",
                    UpdateOp::Decr => "--",
                };
                if *prefix {
                    self.push(op);
                    self.expr(arg, prec::LHS);
                } else {
                    self.expr(arg, prec::LHS);
                    self.push(op);
                }
            }
            Expr::Binary { op, left, right } => {
                let p = binary_prec(*op);
                let (lp, rp) = if matches!(op, super::ast::BinaryOp::Exp) {
                    (p + 1, p)
                } else {
                    (p, p + 1)
                };
                self.expr(left, lp);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(right, rp);
            }
            Expr::Logical { op, left, right } => {
                let p = expr_prec(expr);
                self.expr(left, p);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(right, p + 1);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, prec::LHS);
                self.push(" ");
                self.push(&op.as_str());
                self.push(" ");
                self.expr(value, prec::ASSIGN);
            }
            Expr::Cond { test, cons, alt } => {
                self.expr(test, prec::OR);
                self.push(" ? ");
                self.expr(cons, prec::ASSIGN);
                self.push(" : ");
                self.expr(alt, prec::ASSIGN);
            }
            Expr::Call { callee, args } => {
                self.callee(callee, false);
                self.args(args);
            }
            Expr::New { callee, args } => {
                self.push("new ");
                self.callee(callee, true);
                self.args(args);
            }
            Expr::Member { object, prop } => {
                let wrap = matches!(**object, Expr::Num { .. } | Expr::Function { .. });
                if wrap {
                    self.push("(");
                    self.expr(object, prec::SEQ);
                    self.push(")");
                } else {
                    self.expr(object, prec::CALL);
                }
                match prop {
                    MemberProp::Named { name } => {
                        self.push(".");
                        self.push(name);
                    }
                    MemberProp::Computed { expr } => {
                        self.push("[");
                        self.expr(expr, prec::SEQ);
                        self.push("]");
                    }
                }
            }
            Expr::Seq { exprs } => {
                if exprs.len() == 1 {
                    self.push("(");
                    self.expr(&exprs[0], prec::SEQ);
                    self.push(")");
                    return;
                }
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(e, prec::ASSIGN);
                }
            }
            Expr::Yield { arg, delegate } => {
                self.push("yield");
                if *delegate {
                    self.push("*");
                }
                if let Some(arg) = arg {
                    self.push(" ");
                    self.expr(arg, prec::ASSIGN);
                }
            }
        }
    }

    fn callee(&mut self, callee: &Expr, is_new: bool) {
        let wrap = matches!(callee, Expr::Function { .. })
            || (is_new && (call_in_spine(callee) || matches!(callee, Expr::New { .. })));
        if wrap {
            self.push("(");
            self.expr(callee, prec::SEQ);
            self.push(")");
        } else {
            self.expr(callee, prec::CALL);
        }
    }

    fn args(&mut self, args: &[Expr]) {
        self.push("(");
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(a, prec::ASSIGN);
        }
        self.push(")");
    }

    fn object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{ ");
        for (i, p) in props.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            match &p.key {
                PropKey::Named { name } if is_identifier_name(name) => self.push(name),
                PropKey::Named { name } | PropKey::Str { value: name } => {
                    let s = quote_string(name);
                    self.push(&s);
                }
                PropKey::Num { value } => {
                    let s = format_number(*value);
                    self.push(&s);
                }
                PropKey::Computed { expr } => {
                    self.push("[");
                    self.expr(expr, prec::ASSIGN);
                    self.push("]");
                }
            }
            self.push(": ");
            self.expr(&p.value, prec::ASSIGN);
        }
        self.push(" }");
    }
}
