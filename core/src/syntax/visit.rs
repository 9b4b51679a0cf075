//! Tree traversal
//!
//! `Visit` walks the tree read-only, `VisitMut` in place. Override the hook you care
//! about and call the matching `walk_*` function to keep descending.

use std::collections::HashSet;

use super::ast::{
    Expr, ForInLeft, ForInit, Function, MemberProp, Program, PropKey, Stmt,
};

/* ===================== Read-only traversal ===================== */

pub trait Visit {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, func: &Function) {
        walk_function(self, func);
    }
}

pub fn walk_program<V: Visit + ?Sized>(v: &mut V, program: &Program) {
    for stmt in &program.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_function<V: Visit + ?Sized>(v: &mut V, func: &Function) {
    for stmt in &func.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Empty | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Expr { expr } | Stmt::Throw { arg: expr } => v.visit_expr(expr),
        Stmt::Var { decls, .. } => {
            for d in decls {
                if let Some(init) = &d.init {
                    v.visit_expr(init);
                }
            }
        }
        Stmt::Function { func } => v.visit_function(func),
        Stmt::Return { arg } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        Stmt::If { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_stmt(cons);
            if let Some(alt) = alt {
                v.visit_stmt(alt);
            }
        }
        Stmt::Block { body } => {
            for s in body {
                v.visit_stmt(s);
            }
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Decl { decls, .. }) => {
                    for d in decls {
                        if let Some(init) = &d.init {
                            v.visit_expr(init);
                        }
                    }
                }
                Some(ForInit::Expr { expr }) => v.visit_expr(expr),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        Stmt::ForIn { left, right, body } => {
            if let ForInLeft::Target { expr } = left {
                v.visit_expr(expr);
            }
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        Stmt::Labeled { body, .. } => v.visit_stmt(body),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            for s in block {
                v.visit_stmt(s);
            }
            if let Some(h) = handler {
                for s in &h.body {
                    v.visit_stmt(s);
                }
            }
            if let Some(f) = finalizer {
                for s in f {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::Switch { disc, cases } => {
            v.visit_expr(disc);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                for s in &case.body {
                    v.visit_stmt(s);
                }
            }
        }
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Ident { .. }
        | Expr::This
        | Expr::NewTarget
        | Expr::Num { .. }
        | Expr::Str { .. }
        | Expr::Bool { .. }
        | Expr::Null => {}
        Expr::Array { elements } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Object { props } => {
            for p in props {
                if let PropKey::Computed { expr } = &p.key {
                    v.visit_expr(expr);
                }
                v.visit_expr(&p.value);
            }
        }
        Expr::Function { func } => v.visit_function(func),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => v.visit_expr(arg),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Cond { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_expr(cons);
            v.visit_expr(alt);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Member { object, prop } => {
            v.visit_expr(object);
            if let MemberProp::Computed { expr } = prop {
                v.visit_expr(expr);
            }
        }
        Expr::Seq { exprs } => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        Expr::Yield { arg, .. } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
    }
}

/* ===================== In-place traversal ===================== */

pub trait VisitMut {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_function_mut(&mut self, func: &mut Function) {
        walk_function_mut(self, func);
    }
}

pub fn walk_program_mut<V: VisitMut + ?Sized>(v: &mut V, program: &mut Program) {
    for stmt in &mut program.body {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_function_mut<V: VisitMut + ?Sized>(v: &mut V, func: &mut Function) {
    for stmt in &mut func.body {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Empty | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Expr { expr } | Stmt::Throw { arg: expr } => v.visit_expr_mut(expr),
        Stmt::Var { decls, .. } => {
            for d in decls {
                if let Some(init) = &mut d.init {
                    v.visit_expr_mut(init);
                }
            }
        }
        Stmt::Function { func } => v.visit_function_mut(func),
        Stmt::Return { arg } => {
            if let Some(arg) = arg {
                v.visit_expr_mut(arg);
            }
        }
        Stmt::If { test, cons, alt } => {
            v.visit_expr_mut(test);
            v.visit_stmt_mut(cons);
            if let Some(alt) = alt {
                v.visit_stmt_mut(alt);
            }
        }
        Stmt::Block { body } => {
            for s in body {
                v.visit_stmt_mut(s);
            }
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            v.visit_expr_mut(test);
            v.visit_stmt_mut(body);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Decl { decls, .. }) => {
                    for d in decls {
                        if let Some(init) = &mut d.init {
                            v.visit_expr_mut(init);
                        }
                    }
                }
                Some(ForInit::Expr { expr }) => v.visit_expr_mut(expr),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr_mut(test);
            }
            if let Some(update) = update {
                v.visit_expr_mut(update);
            }
            v.visit_stmt_mut(body);
        }
        Stmt::ForIn { left, right, body } => {
            if let ForInLeft::Target { expr } = left {
                v.visit_expr_mut(expr);
            }
            v.visit_expr_mut(right);
            v.visit_stmt_mut(body);
        }
        Stmt::Labeled { body, .. } => v.visit_stmt_mut(body),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            for s in block {
                v.visit_stmt_mut(s);
            }
            if let Some(h) = handler {
                for s in &mut h.body {
                    v.visit_stmt_mut(s);
                }
            }
            if let Some(f) = finalizer {
                for s in f {
                    v.visit_stmt_mut(s);
                }
            }
        }
        Stmt::Switch { disc, cases } => {
            v.visit_expr_mut(disc);
            for case in cases {
                if let Some(test) = &mut case.test {
                    v.visit_expr_mut(test);
                }
                for s in &mut case.body {
                    v.visit_stmt_mut(s);
                }
            }
        }
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Ident { .. }
        | Expr::This
        | Expr::NewTarget
        | Expr::Num { .. }
        | Expr::Str { .. }
        | Expr::Bool { .. }
        | Expr::Null => {}
        Expr::Array { elements } => {
            for e in elements {
                v.visit_expr_mut(e);
            }
        }
        Expr::Object { props } => {
            for p in props {
                if let PropKey::Computed { expr } = &mut p.key {
                    v.visit_expr_mut(expr);
                }
                v.visit_expr_mut(&mut p.value);
            }
        }
        Expr::Function { func } => v.visit_function_mut(func),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => v.visit_expr_mut(arg),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            v.visit_expr_mut(left);
            v.visit_expr_mut(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(value);
        }
        Expr::Cond { test, cons, alt } => {
            v.visit_expr_mut(test);
            v.visit_expr_mut(cons);
            v.visit_expr_mut(alt);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr_mut(callee);
            for a in args {
                v.visit_expr_mut(a);
            }
        }
        Expr::Member { object, prop } => {
            v.visit_expr_mut(object);
            if let MemberProp::Computed { expr } = prop {
                v.visit_expr_mut(expr);
            }
        }
        Expr::Seq { exprs } => {
            for e in exprs {
                v.visit_expr_mut(e);
            }
        }
        Expr::Yield { arg, .. } => {
            if let Some(arg) = arg {
                v.visit_expr_mut(arg);
            }
        }
    }
}

/* ===================== Queries ===================== */

/// Does evaluating `expr` perform a call or `new`? Function bodies are not entered.
pub fn contains_call(expr: &Expr) -> bool {
    struct Finder(bool);

    impl Visit for Finder {
        fn visit_expr(&mut self, expr: &Expr) {
            if expr.is_call() {
                self.0 = true;
            } else if !self.0 {
                walk_expr(self, expr);
            }
        }

        fn visit_function(&mut self, _func: &Function) {}
    }

    let mut finder = Finder(false);
    finder.visit_expr(expr);
    finder.0
}

/// Does any statement (outside nested functions) perform a call?
pub fn stmts_contain_call(stmts: &[Stmt]) -> bool {
    struct Finder(bool);

    impl Visit for Finder {
        fn visit_expr(&mut self, expr: &Expr) {
            if contains_call(expr) {
                self.0 = true;
            }
        }

        fn visit_function(&mut self, _func: &Function) {}
    }

    let mut finder = Finder(false);
    for s in stmts {
        finder.visit_stmt(s);
    }
    finder.0
}

/// Does `this` occur outside nested non-arrow functions?
pub fn uses_this(stmts: &[Stmt]) -> bool {
    struct Finder(bool);

    impl Visit for Finder {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr, Expr::This) {
                self.0 = true;
            } else {
                walk_expr(self, expr);
            }
        }

        fn visit_function(&mut self, func: &Function) {
            if func.arrow {
                walk_function(self, func);
            }
        }
    }

    let mut finder = Finder(false);
    for s in stmts {
        finder.visit_stmt(s);
    }
    finder.0
}

/// Every identifier, declared name, parameter and label appearing anywhere
pub fn all_names(program: &Program) -> HashSet<String> {
    struct Collector(HashSet<String>);

    impl Visit for Collector {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            match stmt {
                Stmt::Var { decls, .. } => {
                    for d in decls {
                        self.0.insert(d.name.clone());
                    }
                }
                Stmt::Labeled { label, .. } => {
                    self.0.insert(label.clone());
                }
                Stmt::Break { label: Some(l) } | Stmt::Continue { label: Some(l) } => {
                    self.0.insert(l.clone());
                }
                Stmt::For {
                    init: Some(ForInit::Decl { decls, .. }),
                    ..
                } => {
                    for d in decls {
                        self.0.insert(d.name.clone());
                    }
                }
                Stmt::ForIn {
                    left: ForInLeft::Decl { name, .. },
                    ..
                } => {
                    self.0.insert(name.clone());
                }
                Stmt::Try {
                    handler: Some(h), ..
                } => {
                    self.0.insert(h.param.clone());
                }
                _ => {}
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Ident { name } = expr {
                self.0.insert(name.clone());
            }
            walk_expr(self, expr);
        }

        fn visit_function(&mut self, func: &Function) {
            if let Some(name) = &func.name {
                self.0.insert(name.clone());
            }
            for p in &func.params {
                self.0.insert(p.clone());
            }
            walk_function(self, func);
        }
    }

    let mut collector = Collector(HashSet::new());
    walk_program(&mut collector, program);
    collector.0
}

/// Names bound anywhere in the program by a declaration, parameter or catch clause
pub fn bound_names(program: &Program) -> HashSet<String> {
    struct Collector(HashSet<String>);

    impl Visit for Collector {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            match stmt {
                Stmt::Var { decls, .. }
                | Stmt::For {
                    init: Some(ForInit::Decl { decls, .. }),
                    ..
                } => {
                    for d in decls {
                        self.0.insert(d.name.clone());
                    }
                }
                Stmt::ForIn {
                    left: ForInLeft::Decl { name, .. },
                    ..
                } => {
                    self.0.insert(name.clone());
                }
                Stmt::Try {
                    handler: Some(h), ..
                } => {
                    self.0.insert(h.param.clone());
                }
                _ => {}
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Assign { target, .. } = expr {
                if let Some(name) = target.as_ident() {
                    self.0.insert(name.to_string());
                }
            }
            walk_expr(self, expr);
        }

        fn visit_function(&mut self, func: &Function) {
            if let Some(name) = &func.name {
                self.0.insert(name.clone());
            }
            for p in &func.params {
                self.0.insert(p.clone());
            }
            walk_function(self, func);
        }
    }

    let mut collector = Collector(HashSet::new());
    walk_program(&mut collector, program);
    collector.0
}
