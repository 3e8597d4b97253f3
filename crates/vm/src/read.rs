//! The reader: turns source text into values.

use fig_syn::string::unescape;
use fig_syn::{Lexer, SynTag};

use crate::error::{Error, Result};
use crate::gc::ObjRef;
use crate::num::Number;
use crate::value::{Keyword, Obj, Pair, Val};
use crate::Vm;

/// Reads one datum at a time from a source string.
///
/// The reader itself holds no heap values between calls, so the caller may
/// evaluate each datum before reading the next one.
pub struct Reader<'src> {
    lexer: Lexer<'src>,
}

impl<'src> Reader<'src> {
    pub fn new(src: &'src str) -> Self {
        Reader {
            lexer: Lexer::new(src),
        }
    }

    /// Read the next datum. Returns `None` once the input is exhausted.
    ///
    /// The returned value is not rooted.
    pub fn read(&mut self, vm: &mut Vm) -> Result<Option<Val>> {
        match self.lexer.peek() {
            None => Ok(None),
            Some(_) => self.read_datum(vm).map(Some),
        }
    }

    /// Read a datum that must be present.
    fn read_datum(&mut self, vm: &mut Vm) -> Result<Val> {
        let tok = match self.lexer.next() {
            Some(tok) => tok,
            None => return Err(Error::syntax("unexpected end of input")),
        };
        let slice = self.lexer.slice();
        tracing::trace!(?tok, slice, "read");

        let val = match tok {
            SynTag::LParen => return self.read_list(vm),
            SynTag::RParen => return Err(Error::syntax("unexpected ')'")),
            SynTag::Dot => return Err(Error::syntax("unexpected '.'")),
            SynTag::Tick => return self.read_quoted(vm),

            SynTag::NilKw => Val::Nil,
            SynTag::TrueKw => Val::Bool(true),
            SynTag::FalseKw => Val::Bool(false),
            SynTag::DefineKw => Val::Keyword(Keyword::Define),
            SynTag::QuoteKw => Val::Keyword(Keyword::Quote),
            SynTag::CondKw => Val::Keyword(Keyword::Cond),
            SynTag::LambdaKw => Val::Keyword(Keyword::Lambda),
            SynTag::SetKw => Val::Keyword(Keyword::Set),
            SynTag::BeginKw => Val::Keyword(Keyword::Begin),

            SynTag::Int | SynTag::Rational | SynTag::Decimal => {
                let n = Number::parse(slice)?;
                vm.number(n)
            }
            SynTag::String => {
                let s = unescape(slice);
                vm.string(s)
            }
            SynTag::UnterminatedString => {
                return Err(Error::syntax("unterminated string literal"))
            }
            SynTag::Symbol => Val::Sym(vm.intern(slice)),
            SynTag::Error => {
                return Err(Error::syntax(format!("invalid token '{}'", slice)))
            }
        };
        Ok(val)
    }

    /// Read the elements of a list whose `(` has been consumed.
    fn read_list(&mut self, vm: &mut Vm) -> Result<Val> {
        vm.with_stack_frame(|vm| {
            // the head stays rooted while the rest of the list is read
            let head = vm.push(Val::Nil);
            let mut tail: Option<ObjRef> = None;

            loop {
                match self.lexer.peek() {
                    None => return Err(Error::syntax("expected ')'")),
                    Some(SynTag::RParen) => {
                        self.lexer.next();
                        break;
                    }
                    Some(SynTag::Dot) => {
                        let last = match tail {
                            Some(last) => last,
                            None => return Err(Error::syntax("unexpected '.'")),
                        };
                        self.lexer.next();
                        if self.lexer.peek().is_none() {
                            return Err(Error::syntax("expected ')'"));
                        }
                        let cdr = self.read_datum(vm)?;
                        set_cdr(vm, last, cdr);
                        match self.lexer.next() {
                            Some(SynTag::RParen) => break,
                            _ => return Err(Error::syntax("expected ')'")),
                        }
                    }
                    Some(_) => {
                        let item = self.read_datum(vm)?;
                        let cell = vm.cons(item, Val::Nil);
                        match tail {
                            None => vm.heap.stack_mut().set(head, cell),
                            Some(last) => set_cdr(vm, last, cell),
                        }
                        tail = cell.as_obj();
                    }
                }
            }

            Ok(vm.heap.stack().get(head))
        })
    }

    /// `'x` reads as `(quote x)`.
    fn read_quoted(&mut self, vm: &mut Vm) -> Result<Val> {
        if self.lexer.peek().is_none() {
            return Err(Error::syntax("expected a datum after '"));
        }
        let quoted = self.read_datum(vm)?;
        let rest = vm.cons(quoted, Val::Nil);
        Ok(vm.cons(Val::Keyword(Keyword::Quote), rest))
    }
}

fn set_cdr(vm: &mut Vm, cell: ObjRef, cdr: Val) {
    match vm.heap.get_mut(cell) {
        Obj::Pair(Pair { cdr: slot, .. }) => *slot = cdr,
        other => unreachable!("list cell is a {}", other.type_name()),
    }
}
