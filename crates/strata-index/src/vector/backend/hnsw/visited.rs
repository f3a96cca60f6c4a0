//! Generation-stamped visited set for graph traversal.
//!
//! Clearing bumps a generation counter instead of zeroing the array; the
//! array is only wiped when the counter wraps.

#[derive(Debug, Default)]
pub(super) struct VisitedSet {
    stamps: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    /// Start a new traversal over at least `capacity` slots.
    pub(super) fn reset(&mut self, capacity: usize) {
        if capacity > self.stamps.len() {
            self.stamps.resize(capacity, 0);
        }
        if self.generation == u16::MAX {
            self.stamps.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Mark `slot` visited. Returns `true` the first time per traversal.
    #[inline]
    pub(super) fn insert(&mut self, slot: u32) -> bool {
        let stamp = &mut self.stamps[slot as usize];
        if *stamp == self.generation {
            false
        } else {
            *stamp = self.generation;
            true
        }
    }
}
