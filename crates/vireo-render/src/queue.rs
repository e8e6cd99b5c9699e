//! The per-frame ordered container of render commands.
//!
//! Commands are bucketed by the sign of their depth key. The negative and
//! positive buckets are stably sorted before rendering; the zero bucket is
//! never reordered because insertion order there *is* the scene graph's 2D
//! paint order. Same-depth siblings must keep their relative order between
//! frames or coplanar content flickers.

use crate::command::RenderCommand;

/// An ordered container of [`RenderCommand`]s with depth-bucket semantics.
#[derive(Debug, Default)]
pub struct RenderQueue {
    negative: Vec<RenderCommand>,
    zero: Vec<RenderCommand>,
    positive: Vec<RenderCommand>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command, routing it to the bucket matching the sign of its
    /// depth key.
    pub fn push(&mut self, command: RenderCommand) {
        let key = command.depth_key();
        if key < 0.0 {
            self.negative.push(command);
        } else if key > 0.0 {
            self.positive.push(command);
        } else {
            self.zero.push(command);
        }
    }

    /// Stably sort the negative and positive buckets by depth key ascending.
    ///
    /// Ties keep their submission order (`Vec::sort_by` is stable). The zero
    /// bucket is left untouched.
    pub fn sort(&mut self) {
        self.negative
            .sort_by(|a, b| a.depth_key().total_cmp(&b.depth_key()));
        self.positive
            .sort_by(|a, b| a.depth_key().total_cmp(&b.depth_key()));
    }

    /// Total number of commands across all three buckets.
    pub fn len(&self) -> usize {
        self.negative.len() + self.zero.len() + self.positive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index into the logical concatenation `negative ++ zero ++ positive`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`; out-of-range access is a programming
    /// error, not a recoverable condition.
    pub fn get(&self, index: usize) -> &RenderCommand {
        let (bucket, local) = self.locate(index);
        &bucket[local]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut RenderCommand {
        if index < self.negative.len() {
            return &mut self.negative[index];
        }
        let index = index - self.negative.len();
        if index < self.zero.len() {
            return &mut self.zero[index];
        }
        &mut self.positive[index - self.zero.len()]
    }

    fn locate(&self, index: usize) -> (&[RenderCommand], usize) {
        if index < self.negative.len() {
            return (&self.negative, index);
        }
        let index = index - self.negative.len();
        if index < self.zero.len() {
            return (&self.zero, index);
        }
        (&self.positive, index - self.zero.len())
    }

    /// Empty all three buckets, keeping their backing storage for reuse next
    /// frame.
    pub fn clear(&mut self) {
        self.negative.clear();
        self.zero.clear();
        self.positive.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::QuadCommand;
    use crate::material::{PipelineState, TextureHandle};
    use glam::Mat4;
    use std::sync::Arc;

    // Empty quad commands tagged through the texture handle make convenient
    // ordering markers.
    fn marker(depth_key: f32, tag: u64) -> RenderCommand {
        let state = PipelineState {
            texture: TextureHandle(tag),
            ..PipelineState::default()
        };
        RenderCommand::Quad(QuadCommand::new(
            depth_key,
            state,
            Arc::from(Vec::new()),
            Mat4::IDENTITY,
        ))
    }

    fn tag(command: &RenderCommand) -> u64 {
        match command {
            RenderCommand::Quad(q) => q.state.texture.0,
            _ => unreachable!(),
        }
    }

    fn keys(queue: &RenderQueue) -> Vec<f32> {
        (0..queue.len()).map(|i| queue.get(i).depth_key()).collect()
    }

    fn tags(queue: &RenderQueue) -> Vec<u64> {
        (0..queue.len()).map(|i| tag(queue.get(i))).collect()
    }

    #[test]
    fn test_push_routes_by_sign() {
        let mut queue = RenderQueue::new();
        queue.push(marker(-2.0, 0));
        queue.push(marker(0.0, 1));
        queue.push(marker(3.0, 2));
        queue.push(marker(-0.5, 3));
        assert_eq!(queue.len(), 4);
        // Logical order before sort: negatives, zeros, positives.
        assert_eq!(keys(&queue), vec![-2.0, -0.5, 0.0, 3.0]);
    }

    #[test]
    fn test_sort_orders_negative_and_positive() {
        let mut queue = RenderQueue::new();
        for key in [2.0, -1.0, 5.0, -4.0, 0.0, 1.0] {
            queue.push(marker(key, 0));
        }
        queue.sort();
        assert_eq!(keys(&queue), vec![-4.0, -1.0, 0.0, 1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut queue = RenderQueue::new();
        queue.push(marker(1.0, 10));
        queue.push(marker(-1.0, 20));
        queue.push(marker(1.0, 11));
        queue.push(marker(-1.0, 21));
        queue.push(marker(1.0, 12));
        queue.sort();
        assert_eq!(tags(&queue), vec![20, 21, 10, 11, 12]);
    }

    #[test]
    fn test_zero_bucket_keeps_submission_order() {
        let mut queue = RenderQueue::new();
        for t in [3, 1, 2] {
            queue.push(marker(0.0, t));
        }
        queue.sort();
        assert_eq!(tags(&queue), vec![3, 1, 2]);
    }

    #[test]
    fn test_clear_keeps_nothing() {
        let mut queue = RenderQueue::new();
        queue.push(marker(1.0, 0));
        queue.push(marker(-1.0, 1));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_index_panics() {
        let mut queue = RenderQueue::new();
        queue.push(marker(0.0, 0));
        let _ = queue.get(1);
    }
}
