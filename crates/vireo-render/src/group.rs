//! Pooled identifiers for nested render queues.
//!
//! Nested passes (clipping, render-to-texture) get their own render queue.
//! Queue ids are pooled so a node that renders a sub-pass every frame reuses
//! the same id (and therefore the same queue storage) instead of allocating
//! a fresh queue per frame.

/// Stable identifier of a render queue in the renderer's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u32);

impl GroupId {
    /// The root queue every renderer starts with.
    pub const ROOT: GroupId = GroupId(0);

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Free-list pool of [`GroupId`]s.
///
/// Owned by the renderer; ids are acquired when a nested queue is created
/// and returned on explicit release, never reclaimed implicitly mid-frame.
#[derive(Debug)]
pub struct GroupCommandManager {
    next: u32,
    free: Vec<GroupId>,
}

impl GroupCommandManager {
    pub fn new() -> Self {
        Self {
            // Id 0 is the root queue, minted ids start above it.
            next: 1,
            free: Vec::new(),
        }
    }

    /// Hand out an unused id, reusing a released one when available.
    pub fn acquire(&mut self) -> GroupId {
        if let Some(id) = self.free.pop() {
            tracing::trace!(id = id.index(), "reusing pooled group id");
            return id;
        }
        let id = GroupId(self.next);
        self.next += 1;
        tracing::debug!(id = id.index(), "minted new group id");
        id
    }

    /// Return an id to the pool.
    ///
    /// Releasing the root id or an id that was never acquired is a usage
    /// error.
    pub fn release(&mut self, id: GroupId) {
        assert_ne!(id, GroupId::ROOT, "cannot release the root render queue");
        debug_assert!(
            id.0 < self.next && !self.free.contains(&id),
            "released group id {} is not live",
            id.0
        );
        self.free.push(id);
    }

    /// Number of ids currently handed out.
    pub fn live_count(&self) -> usize {
        (self.next as usize - 1) - self.free.len()
    }

    /// Drop all pooled state. Only valid between frames, as part of engine
    /// teardown or a full reset.
    pub fn reset(&mut self) {
        self.next = 1;
        self.free.clear();
    }
}

impl Default for GroupCommandManager {
    fn default() -> Self {
        Self::new()
    }
}
