use fnv::FnvHashMap;
use smol_str::SmolStr;

/// An interned name. Two symbols are the same iff their names are equal.
///
/// Symbols are never garbage collected; the table only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

static_assertions::assert_eq_size!(Symbol, u32);

#[derive(Debug, Default)]
pub struct SymbolTable {
    list: Vec<SmolStr>,
    index: FnvHashMap<SmolStr, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            list: vec![],
            index: FnvHashMap::default(),
        }
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.index.get(name) {
            sym
        } else {
            let sym = Symbol(self.list.len() as u32);
            let name = SmolStr::new(name);
            self.list.push(name.clone());
            self.index.insert(name, sym);
            sym
        }
    }

    /// Look up a symbol without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    pub fn name(&self, sym: Symbol) -> &SmolStr {
        &self.list[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("car");
        let b = table.intern("cdr");
        assert_ne!(a, b);
        assert_eq!(table.intern("car"), a);
        assert_eq!(table.name(b), "cdr");
        assert_eq!(table.get("cons"), None);
        assert_eq!(table.len(), 2);
    }
}
