use crate::fixed::Ticks;
use crate::id::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Item types
// ---------------------------------------------------------------------------

/// The fixed item catalog. The discriminant is the persisted type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    Ore = 0,
    Dust = 1,
    Ingot = 2,
    Plate = 3,
    Rod = 4,
    Gear = 5,
    MachineParts = 6,
    CrushedOre = 7,
}

impl ItemType {
    /// Every type, in save-id order.
    pub const ALL: [ItemType; 8] = [
        ItemType::Ore,
        ItemType::Dust,
        ItemType::Ingot,
        ItemType::Plate,
        ItemType::Rod,
        ItemType::Gear,
        ItemType::MachineParts,
        ItemType::CrushedOre,
    ];

    pub fn save_id(self) -> u8 {
        self as u8
    }

    pub fn from_save_id(id: u8) -> Option<ItemType> {
        ItemType::ALL.get(id as usize).copied()
    }

    /// Position in [`ItemType::ALL`].
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemType::Ore => "ORE",
            ItemType::Dust => "DUST",
            ItemType::Ingot => "INGOT",
            ItemType::Plate => "PLATE",
            ItemType::Rod => "ROD",
            ItemType::Gear => "GEAR",
            ItemType::MachineParts => "MACHINE_PARTS",
            ItemType::CrushedOre => "CRUSHED_ORE",
        }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One discrete item in flight. Tiles refer to items only by [`ItemId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub item_type: ItemType,
    pub value: f32,
    /// Tick on which the item last entered a tile. `None` until first accepted.
    pub entered_tick: Option<Ticks>,
}

impl Item {
    pub fn new(id: ItemId, item_type: ItemType, value: f32) -> Self {
        Self {
            id,
            item_type,
            value,
            entered_tick: None,
        }
    }

    pub fn mark_entered(&mut self, tick: Ticks) {
        self.entered_tick = Some(tick);
    }

    /// An item that entered a tile on `tick` may not move again until the next tick.
    pub fn entered_this_tick(&self, tick: Ticks) -> bool {
        self.entered_tick == Some(tick)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns every live item. Ordered by id so iteration is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRegistry {
    items: BTreeMap<ItemId, Item>,
    next_id: u32,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a fresh id and register a new item.
    pub fn create(&mut self, item_type: ItemType, value: f32) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.items.insert(id, Item::new(id, item_type, value));
        id
    }

    /// Re-register an item restored from a save. Refuses duplicate ids.
    pub fn restore(&mut self, item: Item) -> bool {
        if self.items.contains_key(&item.id) {
            return false;
        }
        self.items.insert(item.id, item);
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// The id the next [`ItemRegistry::create`] will hand out.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Set the id counter, never below one past the largest live id.
    pub fn set_next_id(&mut self, next: u32) {
        let floor = self
            .items
            .keys()
            .next_back()
            .map_or(1, |id| id.0.saturating_add(1));
        self.next_id = next.max(floor).max(1);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
