use crate::uid::TagUid;

#[derive(Clone, Copy)]
struct Entry {
    valid: bool,
    uid: TagUid,
    last_accepted_at: u32,
}

impl Entry {
    const EMPTY: Entry = Entry {
        valid: false,
        uid: TagUid::ZERO,
        last_accepted_at: 0,
    };
}

/// Fixed-capacity per-UID cooldown cache. A reading is accepted when its UID
/// has never been cached, or when the cooldown has elapsed since that UID was
/// last accepted. At most one valid entry exists per UID.
pub struct AcceptanceGate<const CAPACITY: usize = 16> {
    entries: [Entry; CAPACITY],
    cooldown_ms: u32,
}

impl<const CAPACITY: usize> AcceptanceGate<CAPACITY> {
    pub fn new(cooldown_ms: u32) -> Self {
        AcceptanceGate {
            entries: [Entry::EMPTY; CAPACITY],
            cooldown_ms,
        }
    }

    /// Accept-or-reject for one reading. Accepting stamps the UID so the
    /// cooldown window restarts.
    pub fn should_accept(&mut self, uid: &TagUid, now_ms: u32) -> bool {
        match self.find(uid) {
            None => {
                self.remember(uid, now_ms);
                true
            }
            Some(idx) => {
                // Wrapping subtraction keeps the delta honest across a u32
                // clock wrap.
                if now_ms.wrapping_sub(self.entries[idx].last_accepted_at) >= self.cooldown_ms {
                    self.entries[idx].last_accepted_at = now_ms;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Unconditionally stamp a UID as accepted now. Used on presence edges,
    /// which skip the cooldown check but still restart the window.
    pub fn record(&mut self, uid: &TagUid, now_ms: u32) {
        match self.find(uid) {
            Some(idx) => self.entries[idx].last_accepted_at = now_ms,
            None => self.remember(uid, now_ms),
        }
    }

    /// Drops every entry; every UID becomes a first sighting again.
    pub fn clear(&mut self) {
        self.entries = [Entry::EMPTY; CAPACITY];
    }

    fn find(&self, uid: &TagUid) -> Option<usize> {
        self.entries.iter().position(|e| e.valid && e.uid == *uid)
    }

    fn remember(&mut self, uid: &TagUid, now_ms: u32) {
        let slot = self
            .entries
            .iter()
            .position(|e| !e.valid)
            .unwrap_or_else(|| self.oldest_slot());
        self.entries[slot] = Entry {
            valid: true,
            uid: *uid,
            last_accepted_at: now_ms,
        };
    }

    // Eviction victim: the entry accepted longest ago, ties to the lowest
    // slot index.
    fn oldest_slot(&self) -> usize {
        let mut oldest = 0;
        for i in 1..CAPACITY {
            if self.entries[i].last_accepted_at < self.entries[oldest].last_accepted_at {
                oldest = i;
            }
        }
        oldest
    }
}
