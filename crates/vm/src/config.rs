/// Initial collection threshold, in live objects.
pub const INIT_GC_THRESHOLD: usize = 500;

/// Capacity of the execution stack, in values.
pub const MAX_STACK_SIZE: usize = 8192;

/// Native stack reserved per execution stack slot. Evaluation recurses on
/// the native stack, so a thread running a [`crate::Vm`] needs room in
/// proportion to the execution stack for the latter to overflow first.
pub const NATIVE_STACK_PER_SLOT: usize = 16 * 1024;

/// Tunables of a [`crate::Vm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// An allocation that finds more live objects than this collects first.
    /// After each collection the threshold is recalculated as `1.5 * live`,
    /// but never drops below this value.
    pub gc_threshold: usize,

    /// Number of values the execution stack can hold before the runtime
    /// aborts with a stack overflow.
    pub stack_capacity: usize,

    /// Collect before every single allocation. Slow; meant for shaking out
    /// values that are used without being rooted.
    pub gc_stress: bool,
}

impl VmConfig {
    /// Native stack size for a thread that runs a vm with this config.
    pub fn native_stack_size(&self) -> usize {
        self.stack_capacity.saturating_mul(NATIVE_STACK_PER_SLOT)
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            gc_threshold: INIT_GC_THRESHOLD,
            stack_capacity: MAX_STACK_SIZE,
            gc_stress: false,
        }
    }
}
