//! The evaluator.
//!
//! Evaluation is a direct recursive walk over the read values. Special forms
//! are recognized by their [`Keyword`] head; any other list is a procedure
//! application.

use std::rc::Rc;

use fnv::FnvHashSet;

use crate::error::{Error, Result};
use crate::gc::ObjRef;
use crate::symbol::Symbol;
use crate::value::{Arity, Closure, Keyword, Obj, Val};
use crate::Vm;

impl Vm {
    /// Evaluate `expr` in `env`.
    ///
    /// Both `expr` and `env` must be reachable from the root set for the
    /// whole evaluation.
    pub fn eval(&mut self, env: ObjRef, expr: Val) -> Result<Val> {
        match expr {
            Val::Sym(sym) => self.lookup(env, sym),
            Val::Keyword(kw) => Err(Error::syntax(format!("invalid syntax {}", kw.name()))),
            Val::Obj(_) => match self.as_pair(expr) {
                Some(pair) => match pair.car {
                    Val::Keyword(kw) => self.eval_special(env, kw, pair.cdr),
                    head => self.eval_application(env, head, pair.cdr),
                },
                None => Ok(expr),
            },
            Val::Nil | Val::Bool(_) | Val::Char(_) => Ok(expr),
        }
    }

    fn eval_special(&mut self, env: ObjRef, kw: Keyword, rest: Val) -> Result<Val> {
        let args = self
            .list_to_vec(rest)
            .ok_or_else(|| Error::syntax(format!("invalid syntax {}", kw.name())))?;
        tracing::trace!(form = kw.name(), args = args.len(), "special form");

        match kw {
            Keyword::Quote => {
                check_form_arity(kw, Arity::Exactly(1), &args)?;
                Ok(args[0])
            }
            Keyword::Lambda => {
                check_form_arity(kw, Arity::Exactly(2), &args)?;
                let params = self.lambda_params(args[0])?;
                Ok(self.alloc(Obj::Closure(Closure {
                    params,
                    body: args[1],
                    env,
                })))
            }
            Keyword::Cond => self.eval_cond(env, &args),
            Keyword::Define => {
                check_form_arity(kw, Arity::Exactly(2), &args)?;
                let sym = self.binding_name(kw, args[0])?;
                let val = self.eval(env, args[1])?;
                self.define(env, sym, val);
                Ok(Val::Nil)
            }
            Keyword::Set => {
                check_form_arity(kw, Arity::Exactly(2), &args)?;
                let sym = self.binding_name(kw, args[0])?;
                let val = self.eval(env, args[1])?;
                self.set(env, sym, val)?;
                Ok(Val::Nil)
            }
            Keyword::Begin => {
                let mut res = Val::Nil;
                for expr in args {
                    res = self.eval(env, expr)?;
                }
                Ok(res)
            }
        }
    }

    /// `(cond (test expr) ...)`: evaluate the first `expr` whose `test` is
    /// truthy. Nil if none is.
    fn eval_cond(&mut self, env: ObjRef, clauses: &[Val]) -> Result<Val> {
        for &clause in clauses {
            let parts = match clause {
                Val::Nil => vec![],
                _ if self.as_pair(clause).is_some() => self
                    .list_to_vec(clause)
                    .ok_or_else(|| Error::syntax("invalid syntax cond"))?,
                _ => return Err(Error::type_error("cond", "list", self.type_name(clause))),
            };
            check_form_arity(Keyword::Cond, Arity::Exactly(2), &parts)?;
            if self.eval(env, parts[0])?.is_truthy() {
                return self.eval(env, parts[1]);
            }
        }
        Ok(Val::Nil)
    }

    fn binding_name(&self, kw: Keyword, target: Val) -> Result<Symbol> {
        target
            .as_sym()
            .ok_or_else(|| Error::type_error(kw.name(), "symbol", self.type_name(target)))
    }

    /// Validate a parameter list: a proper list of distinct symbols.
    fn lambda_params(&self, list: Val) -> Result<Rc<[Symbol]>> {
        let items = self
            .list_to_vec(list)
            .ok_or_else(|| Error::syntax("parameter list of lambda must be a proper list"))?;
        let mut seen = FnvHashSet::default();
        let mut params = Vec::with_capacity(items.len());
        for item in items {
            let sym = item
                .as_sym()
                .ok_or_else(|| Error::type_error("lambda", "symbol", self.type_name(item)))?;
            if !seen.insert(sym) {
                return Err(Error::syntax(format!(
                    "duplicate parameter '{}' in lambda",
                    self.symbol_name(sym)
                )));
            }
            params.push(sym);
        }
        Ok(params.into())
    }

    /// Evaluate the operator and every operand left to right, then apply.
    fn eval_application(&mut self, env: ObjRef, head: Val, rest: Val) -> Result<Val> {
        self.with_stack_frame(|vm| {
            let base = vm.heap.stack().len();
            let op = vm.eval(env, head)?;
            vm.push(op);

            let mut curr = rest;
            while curr != Val::Nil {
                let pair = vm
                    .as_pair(curr)
                    .ok_or_else(|| Error::syntax("improper argument list"))?;
                let arg = vm.eval(env, pair.car)?;
                vm.push(arg);
                curr = pair.cdr;
            }

            let args = vm.heap.stack().slice_from(base + 1).to_vec();
            vm.apply(op, &args)
        })
    }

    /// Apply a procedure to already evaluated arguments.
    ///
    /// `op` and `args` must be rooted by the caller.
    pub fn apply(&mut self, op: Val, args: &[Val]) -> Result<Val> {
        match self.obj(op) {
            Some(Obj::Builtin(builtin)) => {
                let builtin = *builtin;
                if !builtin.arity.accepts(args.len()) {
                    return Err(Error::arity(builtin.name, builtin.arity, args.len()));
                }
                tracing::trace!(name = builtin.name, args = args.len(), "call builtin");
                (builtin.func)(self, args)
            }
            Some(Obj::Closure(closure)) => {
                let Closure { params, body, env } = closure.clone();
                self.with_stack_frame(|vm| {
                    let frame = vm.extend(env, &params, args)?;
                    vm.push(Val::Obj(frame));
                    vm.eval(frame, body)
                })
            }
            _ => Err(Error::NotCallable(self.type_name(op))),
        }
    }
}

fn check_form_arity(kw: Keyword, arity: Arity, args: &[Val]) -> Result<()> {
    if arity.accepts(args.len()) {
        Ok(())
    } else {
        Err(Error::arity(kw.name(), arity, args.len()))
    }
}
