use crate::value::Val;

/// The execution stack.
///
/// Values on this stack are roots of the collector. The evaluator pushes
/// every intermediate value it still needs across an allocation and pops it
/// once done. The stack has a fixed capacity; exceeding it, or popping an
/// empty stack, is a fatal error.
pub struct ExecStack {
    slots: Vec<Val>,
    capacity: usize,
}

impl ExecStack {
    pub fn new(capacity: usize) -> ExecStack {
        ExecStack {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value and return its slot index.
    pub fn push(&mut self, val: Val) -> usize {
        assert!(
            self.slots.len() < self.capacity,
            "Stack overflow: more than {} values on the execution stack",
            self.capacity
        );
        self.slots.push(val);
        self.slots.len() - 1
    }

    pub fn pop(&mut self) -> Val {
        self.slots.pop().expect("Popping empty stack")
    }

    /// Pop `n` values at once.
    pub fn popn(&mut self, n: usize) {
        let height = self
            .slots
            .len()
            .checked_sub(n)
            .expect("Popping empty stack");
        self.slots.truncate(height);
    }

    /// Drop everything above `height`.
    pub fn restore(&mut self, height: usize) {
        assert!(
            height <= self.slots.len(),
            "Stack underflow: cannot restore height {} with {} values",
            height,
            self.slots.len()
        );
        self.slots.truncate(height);
    }

    pub fn get(&self, slot: usize) -> Val {
        self.slots[slot]
    }

    pub fn set(&mut self, slot: usize, val: Val) {
        self.slots[slot] = val;
    }

    /// Values from `slot` up to the top.
    pub fn slice_from(&self, slot: usize) -> &[Val] {
        &self.slots[slot..]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Val> {
        self.slots.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear()
    }
}
