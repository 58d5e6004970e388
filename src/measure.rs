//! Width caches for row contents and label text.

use crate::surface::{ElementRef, Surface};
use crate::tree::NodeId;
use lru::LruCache;
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;
use unicode_width::UnicodeWidthStr;

/// Measures list rows lazily, a bounded number per frame, and tracks the
/// widest row seen so far.
pub struct RowMeasurer {
    cache: LruCache<NodeId, f64>,
    queue: VecDeque<(NodeId, ElementRef)>,
    queued: HashSet<NodeId>,
    max: f64,
}

impl RowMeasurer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            max: 0.0,
        }
    }

    /// Queues `element` for measurement. Returns `false` when `node` is
    /// already measured or waiting.
    pub fn enqueue(&mut self, node: NodeId, element: ElementRef) -> bool {
        if self.cache.contains(&node) || !self.queued.insert(node) {
            return false;
        }
        self.queue.push_back((node, element));
        true
    }

    /// Measures at most `budget` queued elements. Elements that were
    /// unmounted in the meantime are dropped. Returns how many were measured.
    pub fn drain(&mut self, surface: &impl Surface, budget: usize) -> usize {
        let mut measured = 0;
        while measured < budget {
            let Some((node, element)) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&node);
            let Some(width) = surface.measure_width(element) else {
                continue;
            };
            self.cache.put(node, width);
            self.max = self.max.max(width);
            measured += 1;
        }
        measured
    }

    pub fn get(&mut self, node: NodeId) -> Option<f64> {
        self.cache.get(&node).copied()
    }

    /// The widest row measured so far.
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.queue.clear();
        self.queued.clear();
        self.max = 0.0;
    }
}

/// Memoized label widths based on terminal-style column counts.
pub struct TextMeasurer {
    cache: LruCache<String, f64>,
    char_width: f64,
}

impl TextMeasurer {
    pub fn new(capacity: NonZeroUsize, char_width: f64) -> Self {
        Self {
            cache: LruCache::new(capacity),
            char_width,
        }
    }

    pub fn measure(&mut self, text: &str) -> f64 {
        if let Some(&width) = self.cache.get(text) {
            return width;
        }
        let width = text.width() as f64 * self.char_width;
        self.cache.put(text.to_string(), width);
        width
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RetainedSurface;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn enqueue_skips_cached_and_queued_nodes() {
        let mut surface = RetainedSurface::new();
        let element = surface.create(80.0);
        let mut measurer = RowMeasurer::new(capacity(8));

        assert!(measurer.enqueue(NodeId(1), element));
        assert!(!measurer.enqueue(NodeId(1), element));
        assert_eq!(measurer.drain(&surface, 10), 1);
        assert!(!measurer.enqueue(NodeId(1), element));
        assert_eq!(measurer.get(NodeId(1)), Some(80.0));
    }

    #[test]
    fn drain_respects_budget_and_tracks_max() {
        let mut surface = RetainedSurface::new();
        let mut measurer = RowMeasurer::new(capacity(8));
        for (index, width) in [40.0, 200.0, 120.0].into_iter().enumerate() {
            let element = surface.create(width);
            measurer.enqueue(NodeId(index as u32), element);
        }
        assert_eq!(measurer.drain(&surface, 2), 2);
        assert_eq!(measurer.pending(), 1);
        assert_eq!(measurer.max(), 200.0);
        assert_eq!(measurer.drain(&surface, 2), 1);
        assert_eq!(measurer.max(), 200.0);
    }

    #[test]
    fn unmounted_elements_are_dropped() {
        let mut surface = RetainedSurface::new();
        let element = surface.create(50.0);
        let mut measurer = RowMeasurer::new(capacity(8));
        measurer.enqueue(NodeId(3), element);
        surface.remove(element);
        assert_eq!(measurer.drain(&surface, 4), 0);
        assert_eq!(measurer.get(NodeId(3)), None);
        // Can be queued again once remounted.
        let element = surface.create(50.0);
        assert!(measurer.enqueue(NodeId(3), element));
    }

    #[test]
    fn text_widths_are_memoized() {
        let mut measurer = TextMeasurer::new(capacity(2), 6.5);
        assert_eq!(measurer.measure("abcd"), 26.0);
        assert_eq!(measurer.measure("abcd"), 26.0);
        assert_eq!(measurer.len(), 1);
        // Wide characters take two columns.
        assert_eq!(measurer.measure("日本"), 26.0);
        measurer.measure("x");
        assert_eq!(measurer.len(), 2);
    }
}
