use serde::{Deserialize, Serialize};

/// Identifies a live item in the world's item registry.
///
/// Ids are handed out in increasing order and never reused within a world;
/// they are persisted verbatim in save files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ItemId(pub u32);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_ordering() {
        assert!(ItemId(1) < ItemId(2));
        assert_eq!(ItemId(7), ItemId(7));
    }

    #[test]
    fn item_id_display() {
        assert_eq!(ItemId(42).to_string(), "#42");
    }
}
