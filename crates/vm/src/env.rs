//! Lexical environments.
//!
//! A frame maps symbols to values and links to the frame it was created in.
//! Frames are heap objects, so closures can keep them alive.

use fnv::FnvHashMap;
use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::gc::{ObjRef, Trace, Tracer};
use crate::symbol::Symbol;
use crate::value::{Arity, Obj, Val};
use crate::Vm;

#[derive(Debug, Default)]
pub struct Frame {
    vars: FnvHashMap<Symbol, Val>,
    parent: Option<ObjRef>,
}

impl Frame {
    pub fn new(parent: Option<ObjRef>) -> Self {
        Frame {
            vars: FnvHashMap::default(),
            parent,
        }
    }

    pub fn get(&self, sym: Symbol) -> Option<Val> {
        self.vars.get(&sym).copied()
    }
}

impl Trace for Frame {
    fn trace(&self, tracer: &mut Tracer) {
        self.vars.values().for_each(|v| tracer.mark_val(*v));
        if let Some(parent) = self.parent {
            tracer.mark(parent);
        }
    }
}

impl Vm {
    fn frame(&self, env: ObjRef) -> &Frame {
        match self.heap.get(env) {
            Obj::Env(frame) => frame,
            other => panic!("Expected an environment frame, got {}", other.type_name()),
        }
    }

    fn frame_mut(&mut self, env: ObjRef) -> &mut Frame {
        match self.heap.get_mut(env) {
            Obj::Env(frame) => frame,
            other => panic!("Expected an environment frame, got {}", other.type_name()),
        }
    }

    /// Find the frame in the chain starting at `env` that binds `sym`.
    fn binding_frame(&self, env: ObjRef, sym: Symbol) -> Option<ObjRef> {
        let mut curr = Some(env);
        while let Some(env) = curr {
            let frame = self.frame(env);
            if frame.vars.contains_key(&sym) {
                return Some(env);
            }
            curr = frame.parent;
        }
        None
    }

    /// Resolve `sym` starting at `env` and walking outwards.
    pub fn lookup(&self, env: ObjRef, sym: Symbol) -> Result<Val> {
        self.binding_frame(env, sym)
            .and_then(|frame| self.frame(frame).get(sym))
            .ok_or_else(|| self.unbound(sym))
    }

    /// Bind `sym` in `env` itself, replacing any existing binding there.
    pub fn define(&mut self, env: ObjRef, sym: Symbol, val: Val) {
        self.frame_mut(env).vars.insert(sym, val);
    }

    /// Rebind `sym` in the nearest frame that already binds it.
    pub fn set(&mut self, env: ObjRef, sym: Symbol, val: Val) -> Result<()> {
        let frame = self
            .binding_frame(env, sym)
            .ok_or_else(|| self.unbound(sym))?;
        self.frame_mut(frame).vars.insert(sym, val);
        Ok(())
    }

    /// Allocate an empty frame.
    pub fn new_frame(&mut self, parent: Option<ObjRef>) -> ObjRef {
        self.heap.alloc(Obj::Env(Frame::new(parent)))
    }

    /// Create a child frame of `env` binding `params` to `args` pairwise.
    pub fn extend(&mut self, env: ObjRef, params: &[Symbol], args: &[Val]) -> Result<ObjRef> {
        if params.len() != args.len() {
            return Err(Error::arity(
                "lambda",
                Arity::Exactly(params.len()),
                args.len(),
            ));
        }
        let mut frame = Frame::new(Some(env));
        frame.vars.extend(params.iter().copied().zip(args.iter().copied()));
        Ok(self.heap.alloc(Obj::Env(frame)))
    }

    fn unbound(&self, sym: Symbol) -> Error {
        Error::UnboundSymbol(SmolStr::clone(self.symbols.name(sym)))
    }
}
