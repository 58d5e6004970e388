use crate::surface::ElementRef;

#[derive(Debug, Clone, PartialEq)]
pub struct Slot<T> {
    pub element: ElementRef,
    pub data: T,
}

/// Fixed-capacity storage for per-row entities, indexed by on-screen row
/// position. The virtualization layer decides which index a row occupies;
/// reusing an index is how slots get recycled across frames.
#[derive(Debug, Clone)]
pub struct SlotArena<T> {
    slots: Vec<Option<Slot<T>>>,
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> SlotArena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Grows or shrinks the arena, returning slots dropped off the end.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Slot<T>> {
        if capacity >= self.slots.len() {
            self.slots.resize_with(capacity, || None);
            return Vec::new();
        }
        self.slots.drain(capacity..).flatten().collect()
    }

    /// Stores `slot` at `index`, or clears the index when `slot` is `None`.
    /// Returns the previous occupant. Indices past the capacity are ignored.
    pub fn register(&mut self, index: usize, slot: Option<Slot<T>>) -> Option<Slot<T>> {
        let Some(entry) = self.slots.get_mut(index) else {
            log::warn!(
                "slot {index} is past the arena capacity of {}",
                self.slots.len()
            );
            return slot;
        };
        std::mem::replace(entry, slot)
    }

    pub fn get(&self, index: usize) -> Option<&Slot<T>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Slot<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (index, slot)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Slot<T>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|slot| (index, slot)))
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn clear(&mut self) -> Vec<Slot<T>> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RetainedSurface;

    #[test]
    fn register_replaces_and_unregisters() {
        let mut surface = RetainedSurface::new();
        let a = surface.create(0.0);
        let b = surface.create(0.0);
        let mut arena = SlotArena::with_capacity(4);

        assert!(arena.register(1, Some(Slot { element: a, data: 1 })).is_none());
        let previous = arena.register(1, Some(Slot { element: b, data: 2 }));
        assert_eq!(previous.map(|slot| slot.element), Some(a));
        assert_eq!(arena.occupied(), 1);

        let removed = arena.register(1, None);
        assert_eq!(removed.map(|slot| slot.data), Some(2));
        assert_eq!(arena.occupied(), 0);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut surface = RetainedSurface::new();
        let a = surface.create(0.0);
        let mut arena = SlotArena::with_capacity(2);
        let rejected = arena.register(5, Some(Slot { element: a, data: () }));
        assert!(rejected.is_some());
        assert_eq!(arena.occupied(), 0);
    }

    #[test]
    fn shrinking_returns_dropped_slots() {
        let mut surface = RetainedSurface::new();
        let mut arena = SlotArena::with_capacity(4);
        for index in 0..4 {
            let element = surface.create(0.0);
            arena.register(index, Some(Slot { element, data: index }));
        }
        let dropped = arena.set_capacity(2);
        assert_eq!(dropped.iter().map(|slot| slot.data).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(arena.capacity(), 2);
    }
}
