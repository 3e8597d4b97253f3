use std::fmt;
use std::rc::Rc;

use static_assertions::{assert_impl_all, const_assert};

use crate::builtins::Builtin;
use crate::env::Frame;
use crate::error::Error;
use crate::gc::{ObjRef, Trace, Tracer};
use crate::num::Number;
use crate::symbol::Symbol;

/// A value.
///
/// Immediates are stored inline. Everything else lives on the heap and is
/// referred to by an [`ObjRef`], so comparing two `Val`s with `==` is an
/// identity comparison for heap objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Val {
    /// The empty list.
    Nil,
    Bool(bool),
    Char(char),
    Sym(Symbol),
    /// A special form marker produced by the reader.
    Keyword(Keyword),
    Obj(ObjRef),
}

assert_impl_all!(Val: Copy, Eq, std::hash::Hash);
const_assert!(std::mem::size_of::<Val>() <= 16);

impl Val {
    /// Returns `true` if the val is [`Nil`].
    ///
    /// [`Nil`]: Val::Nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Everything except `false` is truthy, including nil and zero.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Val::Bool(false))
    }

    pub fn as_obj(&self) -> Option<ObjRef> {
        if let Self::Obj(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_sym(&self) -> Option<Symbol> {
        if let Self::Sym(v) = self {
            Some(*v)
        } else {
            None
        }
    }
}

/// Special form markers.
///
/// These are produced directly by the reader for the reserved words, so a
/// program cannot shadow or rebind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Quote,
    Lambda,
    Cond,
    Define,
    Set,
    Begin,
}

impl Keyword {
    pub fn name(self) -> &'static str {
        match self {
            Keyword::Quote => "quote",
            Keyword::Lambda => "lambda",
            Keyword::Cond => "cond",
            Keyword::Define => "define",
            Keyword::Set => "set!",
            Keyword::Begin => "begin",
        }
    }
}

/// A heap object.
#[derive(Debug)]
pub enum Obj {
    Number(Number),
    String(String),
    Pair(Pair),
    /// A fixed-size vector. Elements are mutable, the length is not.
    Vector(Box<[Val]>),
    Builtin(&'static Builtin),
    Closure(Closure),
    Error(Error),
    Env(Frame),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::Number(_) => "number",
            Obj::String(_) => "string",
            Obj::Pair(_) => "pair",
            Obj::Vector(_) => "vector",
            Obj::Builtin(_) => "builtin",
            Obj::Closure(_) => "closure",
            Obj::Error(_) => "error",
            Obj::Env(_) => "environment",
        }
    }
}

impl Trace for Obj {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Obj::Number(_) | Obj::String(_) | Obj::Builtin(_) | Obj::Error(_) => {}
            Obj::Pair(pair) => {
                tracer.mark_val(pair.car);
                tracer.mark_val(pair.cdr);
            }
            Obj::Vector(items) => items.iter().for_each(|v| tracer.mark_val(*v)),
            Obj::Closure(closure) => closure.trace(tracer),
            Obj::Env(frame) => frame.trace(tracer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub car: Val,
    pub cdr: Val,
}

/// A user-defined procedure.
#[derive(Debug, Clone)]
pub struct Closure {
    pub params: Rc<[Symbol]>,
    pub body: Val,
    /// The environment the closure was created in.
    pub env: ObjRef,
}

impl Trace for Closure {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.mark_val(self.body);
        tracer.mark(self.env);
    }
}

/// Number of arguments a procedure accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    /// Inclusive on both ends.
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(m) => n == m,
            Arity::AtLeast(m) => n >= m,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(lo, hi) => write!(f, "{} to {}", lo, hi),
        }
    }
}
