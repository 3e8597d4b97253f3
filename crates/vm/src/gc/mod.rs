//! A mark-and-sweep collected object heap.
//!
//! Every heap object lives in a slot of a [`HopSlotMap`], which doubles as
//! the registry of all live objects. Objects refer to each other through
//! [`ObjRef`] keys, so cycles need no special care. The root set is the
//! global environment plus everything on the [`ExecStack`].

mod stack;

use slotmap::HopSlotMap;

pub use self::stack::ExecStack;
use crate::config::VmConfig;
use crate::value::{Obj, Val};

slotmap::new_key_type! {
    /// A handle to a heap object.
    pub struct ObjRef;
}

/// Values that hold handles to other heap objects.
pub trait Trace {
    /// Report every handle directly reachable from `self` to the tracer.
    fn trace(&self, tracer: &mut Tracer);
}

/// Collects the handles reported during marking.
///
/// Marking is driven by an explicit worklist rather than recursion, so long
/// lists do not exhaust the native stack.
#[derive(Default)]
pub struct Tracer {
    worklist: Vec<ObjRef>,
}

impl Tracer {
    pub fn mark(&mut self, obj: ObjRef) {
        self.worklist.push(obj);
    }

    pub fn mark_val(&mut self, val: Val) {
        if let Val::Obj(obj) = val {
            self.mark(obj)
        }
    }
}

struct GcBox {
    marked: bool,
    obj: Obj,
}

/// Counters about the collector's work so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of objects ever allocated.
    pub allocated: usize,
    /// Number of objects ever freed.
    pub freed: usize,
    /// Number of completed collections.
    pub collections: usize,
}

pub struct Heap {
    objects: HopSlotMap<ObjRef, GcBox>,

    /// Values that are in use by the evaluator and must survive collection.
    stack: ExecStack,

    /// The global environment, which is always a root.
    global: Option<ObjRef>,

    /// Allocating with more live objects than this triggers a collection.
    /// This value is recalculated as `1.5 * live` after each collection.
    threshold: usize,
    min_threshold: usize,
    stress: bool,

    stats: GcStats,
}

impl Heap {
    pub fn new(config: &VmConfig) -> Heap {
        Heap {
            objects: HopSlotMap::with_key(),
            stack: ExecStack::new(config.stack_capacity),
            global: None,
            threshold: config.gc_threshold,
            min_threshold: config.gc_threshold,
            stress: config.gc_stress,
            stats: GcStats::default(),
        }
    }

    /// Allocate a new object.
    ///
    /// If the live count exceeds the threshold (or the heap runs in stress
    /// mode) a collection runs first.
    /// Objects referenced by `obj` itself are treated as roots during that
    /// collection, so a freshly built value may be stored into a new object
    /// without being pushed onto the stack first.
    pub fn alloc(&mut self, obj: Obj) -> ObjRef {
        if self.stress || self.objects.len() > self.threshold {
            self.collect_with(Some(&obj));
        }
        self.stats.allocated += 1;
        self.objects.insert(GcBox { marked: false, obj })
    }

    /// Get the object behind `obj`.
    ///
    /// # Panics
    ///
    /// Panics if the object has been freed. Reaching a freed object means
    /// some value was not rooted while it was still in use.
    pub fn get(&self, obj: ObjRef) -> &Obj {
        &self
            .objects
            .get(obj)
            .expect("Dangling object reference")
            .obj
    }

    /// Mutable version of [`Self::get`].
    pub fn get_mut(&mut self, obj: ObjRef) -> &mut Obj {
        &mut self
            .objects
            .get_mut(obj)
            .expect("Dangling object reference")
            .obj
    }

    /// Whether `obj` still refers to a live object.
    pub fn contains(&self, obj: ObjRef) -> bool {
        self.objects.contains_key(obj)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn stack(&self) -> &ExecStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ExecStack {
        &mut self.stack
    }

    pub fn global(&self) -> Option<ObjRef> {
        self.global
    }

    pub fn set_global(&mut self, global: Option<ObjRef>) {
        self.global = global;
    }

    /// Run a full collection. Returns the number of objects freed.
    pub fn collect(&mut self) -> usize {
        self.collect_with(None)
    }

    fn collect_with(&mut self, pending: Option<&Obj>) -> usize {
        let live_before = self.objects.len();

        let mut tracer = Tracer::default();
        if let Some(global) = self.global {
            tracer.mark(global);
        }
        for val in self.stack.iter() {
            tracer.mark_val(*val);
        }
        if let Some(pending) = pending {
            pending.trace(&mut tracer);
        }

        self.mark(tracer);
        let freed = self.sweep();

        let live = self.objects.len();
        self.threshold = (live + live / 2).max(self.min_threshold);
        self.stats.freed += freed;
        self.stats.collections += 1;

        tracing::debug!(
            live_before,
            live,
            freed,
            threshold = self.threshold,
            "garbage collected"
        );
        freed
    }

    fn mark(&mut self, mut tracer: Tracer) {
        while let Some(obj) = tracer.worklist.pop() {
            let gc_box = self
                .objects
                .get_mut(obj)
                .expect("Dangling object reference in root set");
            if gc_box.marked {
                continue;
            }
            gc_box.marked = true;
            gc_box.obj.trace(&mut tracer);
        }
    }

    /// Free every unmarked object and clear the marks of the survivors.
    fn sweep(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, gc_box| {
            let keep = gc_box.marked;
            gc_box.marked = false;
            keep
        });
        before - self.objects.len()
    }

    /// Drop every root and free everything.
    pub(crate) fn teardown(&mut self) -> usize {
        self.stack.clear();
        self.global = None;
        self.collect()
    }
}
