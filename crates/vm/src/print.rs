//! Printing values back as text.
//!
//! The written form reads back as an equal value for data built from nil,
//! booleans, numbers, strings, symbols and pairs. The display form prints
//! strings and characters raw.

use std::fmt::{self, Write};

use fig_syn::string::escape;
use fnv::FnvHashSet;
use itertools::Itertools;

use crate::gc::ObjRef;
use crate::value::{Obj, Val};
use crate::Vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Display,
}

struct Printer<'vm> {
    vm: &'vm Vm,
    mode: Mode,
    /// Compound objects currently being printed, for cycle detection.
    active: FnvHashSet<ObjRef>,
}

impl<'vm> Printer<'vm> {
    fn print(&mut self, val: Val, f: &mut impl Write) -> fmt::Result {
        match val {
            Val::Nil => f.write_str("()"),
            Val::Bool(true) => f.write_str("true"),
            Val::Bool(false) => f.write_str("false"),
            Val::Char(c) => match self.mode {
                Mode::Display => f.write_char(c),
                Mode::Write => write_char_literal(c, f),
            },
            Val::Sym(sym) => f.write_str(self.vm.symbol_name(sym)),
            Val::Keyword(kw) => f.write_str(kw.name()),
            Val::Obj(obj) => self.print_obj(obj, f),
        }
    }

    fn print_obj(&mut self, obj: ObjRef, f: &mut impl Write) -> fmt::Result {
        let vm = self.vm;
        match vm.heap.get(obj) {
            Obj::Number(n) => write!(f, "{}", n),
            Obj::String(s) => match self.mode {
                Mode::Display => f.write_str(s),
                Mode::Write => f.write_str(&escape(s)),
            },
            Obj::Pair(_) => self.print_list(obj, f),
            Obj::Vector(items) => {
                if !self.active.insert(obj) {
                    return f.write_str("...");
                }
                f.write_str("#(")?;
                for (i, &item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    self.print(item, f)?;
                }
                self.active.remove(&obj);
                f.write_char(')')
            }
            Obj::Builtin(builtin) => write!(f, "<function {}>", builtin.name),
            Obj::Closure(closure) => {
                let params = closure
                    .params
                    .iter()
                    .map(|&sym| vm.symbol_name(sym))
                    .join(" ");
                write!(f, "(lambda ({}) ", params)?;
                self.print(closure.body, f)?;
                f.write_char(')')
            }
            Obj::Error(err) => write!(f, "Error: {}", err),
            Obj::Env(_) => f.write_str("<environment>"),
        }
    }

    /// Print a chain of pairs, using dotted notation for an improper tail.
    fn print_list(&mut self, first: ObjRef, f: &mut impl Write) -> fmt::Result {
        if self.active.contains(&first) {
            return f.write_str("...");
        }
        let mut entered = vec![];
        let mut cell = first;

        f.write_char('(')?;
        let res = loop {
            self.active.insert(cell);
            entered.push(cell);
            let pair = match self.vm.heap.get(cell) {
                Obj::Pair(pair) => *pair,
                other => unreachable!("list cell is a {}", other.type_name()),
            };
            self.print(pair.car, f)?;

            match pair.cdr {
                Val::Nil => break Ok(()),
                Val::Obj(next) if matches!(self.vm.heap.get(next), Obj::Pair(_)) => {
                    if self.active.contains(&next) {
                        break f.write_str(" ...");
                    }
                    f.write_char(' ')?;
                    cell = next;
                }
                tail => {
                    f.write_str(" . ")?;
                    break self.print(tail, f);
                }
            }
        };
        for cell in entered {
            self.active.remove(&cell);
        }
        res?;
        f.write_char(')')
    }
}

fn write_char_literal(c: char, f: &mut impl Write) -> fmt::Result {
    match c {
        ' ' => f.write_str("#\\space"),
        '\n' => f.write_str("#\\newline"),
        '\t' => f.write_str("#\\tab"),
        c => write!(f, "#\\{}", c),
    }
}

impl Vm {
    fn print_with(&self, val: Val, mode: Mode) -> String {
        let mut printer = Printer {
            vm: self,
            mode,
            active: FnvHashSet::default(),
        };
        let mut out = String::new();
        // writing into a String never fails
        let _ = printer.print(val, &mut out);
        out
    }

    /// The written form of `val`, which reads back as an equal value.
    pub fn write_to_string(&self, val: Val) -> String {
        self.print_with(val, Mode::Write)
    }

    /// The form `display` prints.
    pub fn display_to_string(&self, val: Val) -> String {
        self.print_with(val, Mode::Display)
    }
}
