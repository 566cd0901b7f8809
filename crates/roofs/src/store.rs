use std::collections::HashMap;

use crate::host::RoofNodes;
use crate::scene::TileId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Occlusion {
    #[default]
    Open,
    Closed,
}

impl Occlusion {
    pub fn is_closed(self) -> bool {
        self == Occlusion::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoofRecord {
    pub tile: TileId,
    pub nodes: RoofNodes,
    pub state: Occlusion,
}

#[derive(Debug, Default)]
pub struct RoofStateStore {
    slots: Vec<Option<RoofRecord>>,
    free_slots: Vec<usize>,
    index: HashMap<TileId, usize>,
}

impl RoofStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the store untouched when `record.tile` is
    /// already tracked.
    pub fn insert(&mut self, record: RoofRecord) -> bool {
        if self.index.contains_key(&record.tile) {
            return false;
        }
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(record);
                slot
            }
            None => {
                self.slots.push(Some(record));
                self.slots.len() - 1
            }
        };
        self.index.insert(record.tile, slot);
        true
    }

    pub fn remove(&mut self, tile: TileId) -> Option<RoofRecord> {
        let slot = self.index.remove(&tile)?;
        let record = self.slots.get_mut(slot)?.take();
        self.free_slots.push(slot);
        record
    }

    pub fn get(&self, tile: TileId) -> Option<&RoofRecord> {
        let slot = *self.index.get(&tile)?;
        self.slots.get(slot)?.as_ref()
    }

    pub fn get_mut(&mut self, tile: TileId) -> Option<&mut RoofRecord> {
        let slot = *self.index.get(&tile)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    pub fn contains(&self, tile: TileId) -> bool {
        self.index.contains_key(&tile)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoofRecord> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RoofRecord> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn tile_ids(&self) -> Vec<TileId> {
        self.iter().map(|record| record.tile).collect()
    }

    pub fn drain(&mut self) -> Vec<RoofRecord> {
        self.index.clear();
        self.free_slots.clear();
        self.slots.drain(..).flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NodeId;

    fn record(tile: u64) -> RoofRecord {
        let base = tile * 10;
        RoofRecord {
            tile: TileId(tile),
            nodes: RoofNodes {
                container: NodeId(base),
                wrapper: NodeId(base + 1),
                sprite: NodeId(base + 2),
            },
            state: Occlusion::Open,
        }
    }

    #[test]
    fn duplicate_insert_is_rejected_without_overwrite() {
        let mut store = RoofStateStore::new();
        assert!(store.insert(record(1)));

        let mut duplicate = record(1);
        duplicate.state = Occlusion::Closed;
        assert!(!store.insert(duplicate));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(TileId(1)).expect("record").state, Occlusion::Open);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut store = RoofStateStore::new();
        store.insert(record(1));
        store.insert(record(2));
        assert_eq!(store.remove(TileId(1)).map(|r| r.tile), Some(TileId(1)));
        assert!(store.remove(TileId(1)).is_none());

        store.insert(record(3));
        assert_eq!(store.tile_ids(), vec![TileId(3), TileId(2)]);
        assert_eq!(store.slots.len(), 2);
    }

    #[test]
    fn iter_mut_updates_are_visible_through_get() {
        let mut store = RoofStateStore::new();
        store.insert(record(1));
        store.insert(record(2));
        for record in store.iter_mut() {
            record.state = Occlusion::Closed;
        }
        assert!(store.get(TileId(2)).expect("record").state.is_closed());
    }

    #[test]
    fn drain_empties_the_store() {
        let mut store = RoofStateStore::new();
        store.insert(record(1));
        store.insert(record(2));
        store.remove(TileId(1));
        let drained = store.drain();
        assert_eq!(drained.len(), 1);
        assert!(store.is_empty());
        assert!(store.insert(record(1)));
    }
}
