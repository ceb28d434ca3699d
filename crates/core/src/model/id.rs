use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_generation() -> u32 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Handle to an item. `raw` is the persisted ID; `generation` names the index
/// that allocated it, so a handle kept across a prune cannot silently address
/// an unrelated item in the new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    raw: u32,
    generation: u32,
}

impl ItemId {
    pub(crate) fn new(raw: u32, generation: u32) -> Self {
        Self { raw, generation }
    }

    pub fn raw(self) -> u32 {
        self.raw
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// Hands out raw IDs for one index lineage.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Makes sure `raw` is never handed out again.
    pub fn reserve(&mut self, raw: u32) {
        self.next = self.next.max(raw + 1);
    }
}
