use hashbrown::HashMap;

use crate::clock::LogicalTime;
use crate::ids::{BuffId, EntityId};

/// A buff currently held by an entity.
///
/// Never edited in place: a refresh removes the instance and inserts a
/// new one with a fresh `instance` number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBuff {
    pub buff_id: BuffId,
    /// Who applied it
    pub source: EntityId,
    /// Receiver's logical time when applied
    pub applied_at: LogicalTime,
    /// Receiver's logical time at which it expires (None = infinite)
    pub expires_at: Option<LogicalTime>,
    /// Unique per application; expiration checks carry it
    pub instance: u64,
}

impl ActiveBuff {
    pub fn is_expired(&self, now: LogicalTime) -> bool {
        matches!(self.expires_at, Some(end) if now >= end)
    }

    pub fn remaining(&self, now: LogicalTime) -> Option<LogicalTime> {
        self.expires_at.map(|end| end - now)
    }
}

/// Buffs held by one entity, at most one per buff id.
#[derive(Debug, Clone, Default)]
pub struct EntityBuffSet {
    buffs: HashMap<BuffId, ActiveBuff>,
}

impl EntityBuffSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BuffId) -> Option<&ActiveBuff> {
        self.buffs.get(&id)
    }

    pub fn contains(&self, id: BuffId) -> bool {
        self.buffs.contains_key(&id)
    }

    /// Insert a new instance. The id must not already be present.
    pub(crate) fn insert(&mut self, buff: ActiveBuff) {
        let previous = self.buffs.insert(buff.buff_id, buff);
        debug_assert!(
            previous.is_none(),
            "buff {} inserted while already active",
            buff.buff_id
        );
    }

    pub(crate) fn remove(&mut self, id: BuffId) -> Option<ActiveBuff> {
        self.buffs.remove(&id)
    }

    pub fn ids(&self) -> Vec<BuffId> {
        self.buffs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveBuff> {
        self.buffs.values()
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buff(name: &str, expires_at: Option<LogicalTime>) -> ActiveBuff {
        ActiveBuff {
            buff_id: BuffId::from_name(name),
            source: EntityId(1),
            applied_at: 0,
            expires_at,
            instance: 1,
        }
    }

    #[test]
    fn expiry_is_inclusive_of_end_time() {
        let b = buff("x", Some(10));
        assert!(!b.is_expired(9));
        assert!(b.is_expired(10));
        assert!(b.is_expired(11));
        assert_eq!(b.remaining(4), Some(6));
    }

    #[test]
    fn infinite_buffs_never_expire() {
        let b = buff("x", None);
        assert!(!b.is_expired(i64::MAX));
        assert_eq!(b.remaining(100), None);
    }

    #[test]
    fn set_keys_by_buff_id() {
        let mut set = EntityBuffSet::new();
        set.insert(buff("a", Some(5)));
        set.insert(buff("b", None));
        assert_eq!(set.len(), 2);
        assert!(set.contains(BuffId::from_name("A")));

        let removed = set.remove(BuffId::from_name("a")).unwrap();
        assert_eq!(removed.expires_at, Some(5));
        assert!(set.remove(BuffId::from_name("a")).is_none());
        assert_eq!(set.len(), 1);
    }
}
