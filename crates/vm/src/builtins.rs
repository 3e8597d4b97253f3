//! Builtin procedures.
//!
//! Every builtin declares its [`Arity`], which is checked before the function
//! is called, so the implementations may index into `args` freely.

use std::cmp::Ordering;
use std::fmt;
use std::io::Write;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::num::Number;
use crate::value::{Arity, Obj, Pair, Val};
use crate::Vm;

pub type BuiltinFn = fn(&mut Vm, &[Val]) -> Result<Val>;

pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

macro_rules! builtins {
    ($($name:literal, $arity:expr => $func:path;)*) => {
        pub static BUILTINS: &[Builtin] = &[
            $(Builtin { name: $name, arity: $arity, func: $func },)*
        ];
    };
}

use Arity::*;

builtins! {
    // arithmetic
    "+", AtLeast(0) => add;
    "-", AtLeast(1) => sub;
    "*", AtLeast(0) => mul;
    "/", AtLeast(1) => div;
    "mod", AtLeast(1) => modulo;
    "=", Exactly(2) => num_eq;
    "<", Exactly(2) => num_lt;
    ">", Exactly(2) => num_gt;
    "<=", Exactly(2) => num_le;
    ">=", Exactly(2) => num_ge;

    // type predicates
    "null?", Exactly(1) => is_null;
    "boolean?", Exactly(1) => is_boolean;
    "symbol?", Exactly(1) => is_symbol;
    "number?", Exactly(1) => is_number;
    "integer?", Exactly(1) => is_integer;
    "char?", Exactly(1) => is_char;
    "string?", Exactly(1) => is_string;
    "pair?", Exactly(1) => is_pair;
    "list?", Exactly(1) => is_list;
    "vector?", Exactly(1) => is_vector;
    "procedure?", Exactly(1) => is_procedure;
    "eq?", Exactly(2) => eq;

    // conversions
    "char->int", Exactly(1) => char_to_int;
    "int->char", Exactly(1) => int_to_char;
    "number->string", Exactly(1) => number_to_string;
    "string->number", Exactly(1) => string_to_number;
    "symbol->string", Exactly(1) => symbol_to_string;
    "string->symbol", Exactly(1) => string_to_symbol;

    // pairs and lists
    "cons", Exactly(2) => cons;
    "car", Exactly(1) => car;
    "cdr", Exactly(1) => cdr;
    "set-car!", Exactly(2) => set_car;
    "set-cdr!", Exactly(2) => set_cdr;
    "list", AtLeast(0) => list;

    // vectors
    "make-vector", Between(1, 2) => make_vector;
    "vector-length", Exactly(1) => vector_length;
    "vector-ref", Exactly(2) => vector_ref;
    "vector-set!", Exactly(3) => vector_set;

    // strings and output
    "string-append", AtLeast(0) => string_append;
    "display", AtLeast(1) => display;

    // environment and control
    "env", Exactly(0) => env;
    "load", Exactly(1) => load;
    "exit", Between(0, 1) => exit;
    "raise", Exactly(1) => raise;
}

/// Bind every builtin in the global environment.
pub(crate) fn register_all(vm: &mut Vm) {
    let global = vm.global_env();
    for builtin in BUILTINS {
        let sym = vm.intern(builtin.name);
        let val = vm.alloc(Obj::Builtin(builtin));
        vm.define(global, sym, val);
    }
    tracing::debug!(count = BUILTINS.len(), "registered builtins");
}

fn bool_val(b: bool) -> Val {
    Val::Bool(b)
}

fn expect_number<'vm>(vm: &'vm Vm, name: &'static str, val: Val) -> Result<&'vm Number> {
    vm.as_number(val)
        .ok_or_else(|| Error::type_error(name, "number", vm.type_name(val)))
}

fn expect_integer<'vm>(vm: &'vm Vm, name: &'static str, val: Val) -> Result<&'vm BigInt> {
    vm.as_number(val)
        .and_then(Number::as_int)
        .ok_or_else(|| Error::type_error(name, "integer", vm.type_name(val)))
}

fn expect_str<'vm>(vm: &'vm Vm, name: &'static str, val: Val) -> Result<&'vm str> {
    vm.as_str(val)
        .ok_or_else(|| Error::type_error(name, "string", vm.type_name(val)))
}

fn expect_pair(vm: &Vm, name: &'static str, val: Val) -> Result<Pair> {
    vm.as_pair(val)
        .ok_or_else(|| Error::type_error(name, "pair", vm.type_name(val)))
}

fn expect_vector<'vm>(vm: &'vm Vm, name: &'static str, val: Val) -> Result<&'vm [Val]> {
    match vm.obj(val) {
        Some(Obj::Vector(items)) => Ok(&items[..]),
        _ => Err(Error::type_error(name, "vector", vm.type_name(val))),
    }
}

/// Resolve a vector index, failing when it is out of range.
fn vector_index(vm: &Vm, name: &'static str, vector: Val, index: Val) -> Result<usize> {
    let len = expect_vector(vm, name, vector)?.len();
    let index = expect_integer(vm, name, index)?;
    index
        .to_usize()
        .filter(|&i| i < len)
        .ok_or_else(|| Error::IndexOutOfBounds {
            name: name.into(),
            index: index.clone(),
            len,
        })
}

// Arithmetic.

fn fold_numbers(
    vm: &mut Vm,
    name: &'static str,
    init: Number,
    args: &[Val],
    op: impl Fn(&Number, &Number) -> Result<Number>,
) -> Result<Val> {
    let mut acc = init;
    for &arg in args {
        acc = op(&acc, expect_number(vm, name, arg)?)?;
    }
    Ok(vm.number(acc))
}

fn add(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    fold_numbers(vm, "+", Number::zero(), args, |a, b| Ok(a.add(b)))
}

fn mul(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    fold_numbers(vm, "*", Number::one(), args, |a, b| Ok(a.mul(b)))
}

fn sub(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let first = expect_number(vm, "-", args[0])?.clone();
    if args.len() == 1 {
        return Ok(vm.number(first.neg()));
    }
    fold_numbers(vm, "-", first, &args[1..], |a, b| Ok(a.sub(b)))
}

fn div(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let first = expect_number(vm, "/", args[0])?.clone();
    fold_numbers(vm, "/", first, &args[1..], Number::div)
}

fn modulo(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let mut acc = Number::from(expect_integer(vm, "mod", args[0])?.clone());
    for &arg in &args[1..] {
        let rhs = expect_number(vm, "mod", arg)?;
        acc = match acc.modulo(rhs) {
            Some(res) => res?,
            None => return Err(Error::type_error("mod", "integer", "number")),
        };
    }
    Ok(vm.number(acc))
}

fn compare(vm: &Vm, name: &'static str, args: &[Val]) -> Result<Option<Ordering>> {
    let lhs = expect_number(vm, name, args[0])?;
    let rhs = expect_number(vm, name, args[1])?;
    Ok(lhs.partial_cmp_value(rhs))
}

fn num_eq(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(compare(vm, "=", args)? == Some(Ordering::Equal)))
}

fn num_lt(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(compare(vm, "<", args)? == Some(Ordering::Less)))
}

fn num_gt(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(compare(vm, ">", args)? == Some(Ordering::Greater)))
}

fn num_le(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let ord = compare(vm, "<=", args)?;
    Ok(bool_val(matches!(ord, Some(Ordering::Less | Ordering::Equal))))
}

fn num_ge(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let ord = compare(vm, ">=", args)?;
    Ok(bool_val(matches!(
        ord,
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

// Predicates.

fn is_null(_vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(args[0].is_nil()))
}

fn is_boolean(_vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(matches!(args[0], Val::Bool(_))))
}

fn is_symbol(_vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(matches!(args[0], Val::Sym(_))))
}

fn is_number(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(vm.as_number(args[0]).is_some()))
}

fn is_integer(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(
        vm.as_number(args[0]).map_or(false, Number::is_integer),
    ))
}

fn is_char(_vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(matches!(args[0], Val::Char(_))))
}

fn is_string(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(vm.as_str(args[0]).is_some()))
}

fn is_pair(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(vm.as_pair(args[0]).is_some()))
}

fn is_list(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(vm.is_list(args[0])))
}

fn is_vector(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(matches!(vm.obj(args[0]), Some(Obj::Vector(_)))))
}

fn is_procedure(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(bool_val(matches!(
        vm.obj(args[0]),
        Some(Obj::Builtin(_) | Obj::Closure(_))
    )))
}

/// Numbers compare by value, immediates by type and value, everything else
/// by identity.
fn eq(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let (a, b) = (args[0], args[1]);
    let res = match (vm.as_number(a), vm.as_number(b)) {
        (Some(x), Some(y)) => x.num_eq(y),
        _ => a == b,
    };
    Ok(bool_val(res))
}

// Conversions.

fn char_to_int(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    match args[0] {
        Val::Char(c) => Ok(vm.number(c as u32 as i64)),
        other => Err(Error::type_error(
            "char->int",
            "character",
            vm.type_name(other),
        )),
    }
}

fn int_to_char(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let code = expect_integer(vm, "int->char", args[0])?;
    code.to_u32()
        .and_then(char::from_u32)
        .map(Val::Char)
        .ok_or_else(|| Error::type_error("int->char", "character code", "integer"))
}

fn number_to_string(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let s = expect_number(vm, "number->string", args[0])?.to_string();
    Ok(vm.string(s))
}

fn string_to_number(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let n = Number::parse(expect_str(vm, "string->number", args[0])?)?;
    Ok(vm.number(n))
}

fn symbol_to_string(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    match args[0] {
        Val::Sym(sym) => {
            let name = vm.symbol_name(sym).to_owned();
            Ok(vm.string(name))
        }
        other => Err(Error::type_error(
            "symbol->string",
            "symbol",
            vm.type_name(other),
        )),
    }
}

fn string_to_symbol(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let name = expect_str(vm, "string->symbol", args[0])?.to_owned();
    Ok(Val::Sym(vm.intern(&name)))
}

// Pairs and lists.

fn cons(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(vm.cons(args[0], args[1]))
}

fn car(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(expect_pair(vm, "car", args[0])?.car)
}

fn cdr(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(expect_pair(vm, "cdr", args[0])?.cdr)
}

fn pair_mut<'vm>(vm: &'vm mut Vm, name: &'static str, val: Val) -> Result<&'vm mut Pair> {
    let obj = match val {
        Val::Obj(obj) => obj,
        other => return Err(Error::type_error(name, "pair", vm.type_name(other))),
    };
    match vm.heap.get_mut(obj) {
        Obj::Pair(pair) => Ok(pair),
        other => Err(Error::type_error(name, "pair", other.type_name())),
    }
}

fn set_car(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    pair_mut(vm, "set-car!", args[0])?.car = args[1];
    Ok(Val::Nil)
}

fn set_cdr(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    pair_mut(vm, "set-cdr!", args[0])?.cdr = args[1];
    Ok(Val::Nil)
}

fn list(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    Ok(vm.list(args))
}

// Vectors.

fn make_vector(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let requested = expect_integer(vm, "make-vector", args[0])?;
    if requested.sign() == Sign::Minus {
        return Err(Error::type_error("make-vector", "non-negative integer", "integer"));
    }
    let too_large = || Error::Alloc {
        name: "make-vector".into(),
        size: requested.clone(),
    };
    let size = requested.to_usize().ok_or_else(too_large)?;
    let mut items = Vec::new();
    items.try_reserve_exact(size).map_err(|_| too_large())?;

    let fill = match args.get(1) {
        Some(&fill) => fill,
        None => vm.number(0i64),
    };
    items.resize(size, fill);
    Ok(vm.alloc(Obj::Vector(items.into_boxed_slice())))
}

fn vector_length(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let len = expect_vector(vm, "vector-length", args[0])?.len();
    Ok(vm.number(len as i64))
}

fn vector_ref(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let index = vector_index(vm, "vector-ref", args[0], args[1])?;
    Ok(expect_vector(vm, "vector-ref", args[0])?[index])
}

fn vector_set(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let index = vector_index(vm, "vector-set!", args[0], args[1])?;
    if let Val::Obj(obj) = args[0] {
        if let Obj::Vector(items) = vm.heap.get_mut(obj) {
            items[index] = args[2];
        }
    }
    Ok(Val::Nil)
}

// Strings and output.

fn string_append(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let mut res = String::new();
    for &arg in args {
        res.push_str(expect_str(vm, "string-append", arg)?);
    }
    Ok(vm.string(res))
}

/// Print the arguments separated by spaces, followed by a newline. Strings
/// and characters are written raw.
fn display(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let line = args
        .iter()
        .map(|&arg| vm.display_to_string(arg))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(vm.output, "{}", line).map_err(|e| Error::Io(e.to_string()))?;
    vm.output.flush().map_err(|e| Error::Io(e.to_string()))?;
    Ok(Val::Nil)
}

// Environment and control.

fn env(vm: &mut Vm, _args: &[Val]) -> Result<Val> {
    Ok(Val::Obj(vm.global_env()))
}

fn load(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let path = expect_str(vm, "load", args[0])?.to_owned();
    vm.load_file(path)
}

fn exit(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let code = match args.first() {
        Some(&code) => expect_integer(vm, "exit", code)?
            .to_i32()
            .ok_or_else(|| Error::type_error("exit", "exit status", "integer"))?,
        None => 0,
    };
    Err(Error::Exit(code))
}

fn raise(vm: &mut Vm, args: &[Val]) -> Result<Val> {
    let message = expect_str(vm, "raise", args[0])?.to_owned();
    Err(Error::UserRaised(message))
}
