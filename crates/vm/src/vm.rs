use std::io::Write;
use std::path::Path;

use crate::config::VmConfig;
use crate::error::{Error, Exit, Result};
use crate::gc::{Heap, ObjRef};
use crate::num::Number;
use crate::read::Reader;
use crate::symbol::{Symbol, SymbolTable};
use crate::value::{Obj, Pair, Val};

/// An interpreter instance.
///
/// Owns the heap, the execution stack, the symbol table and the global
/// environment. Builtins are registered into the global environment when the
/// instance is created.
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) symbols: SymbolTable,
    pub(crate) global: ObjRef,
    pub(crate) config: VmConfig,
    /// Where `display` writes to.
    pub(crate) output: Box<dyn Write>,
}

impl Vm {
    pub fn new() -> Vm {
        Vm::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Vm {
        let mut heap = Heap::new(&config);
        let global = heap.alloc(Obj::Env(Default::default()));
        heap.set_global(Some(global));

        let mut vm = Vm {
            heap,
            symbols: SymbolTable::new(),
            global,
            config,
            output: Box::new(std::io::stdout()),
        };
        crate::builtins::register_all(&mut vm);
        tracing::debug!(objects = vm.heap.len(), "vm initialized");
        vm
    }

    /// Redirect the output of `display`.
    pub fn with_output(mut self, output: impl Write + 'static) -> Vm {
        self.output = Box::new(output);
        self
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn global_env(&self) -> ObjRef {
        self.global
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        self.symbols.name(sym)
    }

    /// Run a full garbage collection right now. Returns the number of objects
    /// freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect()
    }

    /// Root a value on the execution stack.
    pub fn push(&mut self, val: Val) -> usize {
        self.heap.stack_mut().push(val)
    }

    pub fn pop(&mut self) -> Val {
        self.heap.stack_mut().pop()
    }

    /// Run `f` and drop whatever it left on the execution stack afterwards,
    /// whether it succeeded or not.
    pub fn with_stack_frame<T>(&mut self, f: impl FnOnce(&mut Vm) -> T) -> T {
        let height = self.heap.stack().len();
        let res = f(self);
        self.heap.stack_mut().restore(height);
        res
    }

    /// Read and evaluate every form in `text` in the global environment.
    ///
    /// Returns the value of the last form, or nil if there is none. Stops at
    /// the first error. The returned value is not rooted.
    pub fn eval_str(&mut self, text: &str) -> Result<Val> {
        let mut reader = Reader::new(text);
        self.with_stack_frame(|vm| {
            let last = vm.push(Val::Nil);
            while let Some(form) = reader.read(vm)? {
                vm.heap.stack_mut().set(last, form);
                let global = vm.global;
                let val = vm.eval(global, form)?;
                vm.heap.stack_mut().set(last, val);
            }
            Ok(vm.heap.stack().get(last))
        })
    }

    /// Evaluate a line of input at the top level.
    ///
    /// Errors other than `exit` are turned into an [`Obj::Error`] value, which
    /// prints as `Error: <message>`. The returned value is not rooted, so it
    /// should be printed before anything else is evaluated.
    pub fn eval_top_level(&mut self, text: &str) -> Result<Val, Exit> {
        match self.eval_str(text) {
            Ok(val) => Ok(val),
            Err(Error::Exit(code)) => Err(Exit(code)),
            Err(err) => {
                tracing::debug!(%err, "top-level error");
                Ok(self.alloc(Obj::Error(err)))
            }
        }
    }

    /// Evaluate every form of a source file in the global environment.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Val> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loading file");
        self.eval_str(&text)
    }

    // Object helpers.

    pub fn alloc(&mut self, obj: Obj) -> Val {
        Val::Obj(self.heap.alloc(obj))
    }

    pub fn cons(&mut self, car: Val, cdr: Val) -> Val {
        self.alloc(Obj::Pair(Pair { car, cdr }))
    }

    pub fn number(&mut self, n: impl Into<Number>) -> Val {
        self.alloc(Obj::Number(n.into()))
    }

    pub fn string(&mut self, s: impl Into<String>) -> Val {
        self.alloc(Obj::String(s.into()))
    }

    /// Build a proper list of `items`.
    pub fn list(&mut self, items: &[Val]) -> Val {
        items
            .iter()
            .rev()
            .fold(Val::Nil, |tail, &item| self.cons(item, tail))
    }

    pub fn obj(&self, val: Val) -> Option<&Obj> {
        val.as_obj().map(|obj| self.heap.get(obj))
    }

    pub fn as_pair(&self, val: Val) -> Option<Pair> {
        match self.obj(val) {
            Some(Obj::Pair(pair)) => Some(*pair),
            _ => None,
        }
    }

    pub fn as_number(&self, val: Val) -> Option<&Number> {
        match self.obj(val) {
            Some(Obj::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self, val: Val) -> Option<&str> {
        match self.obj(val) {
            Some(Obj::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self, val: Val) -> Option<&Error> {
        match self.obj(val) {
            Some(Obj::Error(e)) => Some(e),
            _ => None,
        }
    }

    /// Collect the elements of a proper list. Returns `None` for improper or
    /// circular lists.
    pub fn list_to_vec(&self, list: Val) -> Option<Vec<Val>> {
        if !self.is_list(list) {
            return None;
        }
        let mut res = vec![];
        let mut curr = list;
        while let Some(pair) = self.as_pair(curr) {
            res.push(pair.car);
            curr = pair.cdr;
        }
        Some(res)
    }

    /// Whether `val` is a proper list: nil, or pairs ending in nil.
    ///
    /// Circular lists are detected and are not proper.
    pub fn is_list(&self, val: Val) -> bool {
        let mut slow = val;
        let mut fast = val;
        loop {
            for _ in 0..2 {
                match fast {
                    Val::Nil => return true,
                    _ => match self.as_pair(fast) {
                        Some(pair) => fast = pair.cdr,
                        None => return false,
                    },
                }
            }
            slow = self.as_pair(slow).map_or(Val::Nil, |pair| pair.cdr);
            if slow == fast {
                return false;
            }
        }
    }

    /// Name used for a value in type errors.
    pub fn type_name(&self, val: Val) -> &'static str {
        match val {
            Val::Nil => "nil",
            Val::Bool(_) => "boolean",
            Val::Char(_) => "character",
            Val::Sym(_) => "symbol",
            Val::Keyword(_) => "keyword",
            Val::Obj(obj) => self.heap.get(obj).type_name(),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        let freed = self.heap.teardown();
        tracing::debug!(freed, "vm torn down");
    }
}
