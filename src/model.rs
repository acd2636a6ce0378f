//! Adaptive substitution state shared by encoder and decoder.
//!
//! Every table here is updated only from bytes both sides have already
//! seen, so the decoder rebuilds it in lockstep without a side channel.

pub const CHAR_SLOTS: usize = 128;
pub const WORD_SLOTS: usize = 256;

/// Shortest word worth a 2-byte reference.
pub const MIN_WORD_LEN: usize = 3;
/// Longer letter runs are never stored.
pub const MAX_WORD_LEN: usize = 24;

#[inline]
pub fn char_slot(cp: u32) -> u8 {
    (0x9E37_79B9u32.wrapping_mul(cp) >> 25) as u8
}

#[inline]
pub fn word_slot(word: &[u8]) -> u8 {
    let mut h: u32 = 0x811C_9DC5;
    for &b in word {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    (h ^ (h >> 8) ^ (h >> 16) ^ (h >> 24)) as u8
}

#[inline]
pub fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphabetic()
}

/// First-come code point table for characters of 3 or 4 UTF-8 bytes.
/// Zero marks an empty slot.
#[derive(Debug, Clone)]
pub struct CharTable {
    slots: [u32; CHAR_SLOTS],
}

impl Default for CharTable {
    fn default() -> Self {
        Self { slots: [0; CHAR_SLOTS] }
    }
}

impl CharTable {
    pub fn get(&self, slot: u8) -> Option<u32> {
        match self.slots.get(slot as usize) {
            Some(&cp) if cp != 0 => Some(cp),
            _ => None,
        }
    }

    pub fn occupant(&self, cp: u32) -> Option<u32> {
        self.get(char_slot(cp))
    }

    pub fn insert(&mut self, cp: u32) {
        self.slots[char_slot(cp) as usize] = cp;
    }
}

/// Most-recent-wins word table.
#[derive(Debug, Clone)]
pub struct WordTable {
    slots: Vec<Vec<u8>>,
}

impl Default for WordTable {
    fn default() -> Self {
        Self { slots: vec![Vec::new(); WORD_SLOTS] }
    }
}

impl WordTable {
    pub fn get(&self, slot: u8) -> Option<&[u8]> {
        let word = &self.slots[slot as usize];
        (!word.is_empty()).then_some(word.as_slice())
    }

    /// Slot currently holding `word`, if any.
    pub fn find(&self, word: &[u8]) -> Option<u8> {
        let slot = word_slot(word);
        (self.slots[slot as usize] == word).then_some(slot)
    }

    pub fn learn(&mut self, word: &[u8]) {
        let entry = &mut self.slots[word_slot(word) as usize];
        entry.clear();
        entry.extend_from_slice(word);
    }
}

/// Follows maximal runs of ASCII letters in the plain byte stream and
/// teaches the word table each eligible run once it ends.
#[derive(Debug, Clone, Default)]
pub struct WordTracker {
    run: [u8; MAX_WORD_LEN],
    len: usize,
    overflow: bool,
}

impl WordTracker {
    pub fn observe(&mut self, byte: u8, table: &mut WordTable) {
        if is_word_byte(byte) {
            if self.len < MAX_WORD_LEN {
                self.run[self.len] = byte;
                self.len += 1;
            } else {
                self.overflow = true;
            }
        } else {
            self.end(table);
        }
    }

    /// Close the current run, e.g. at end of stream.
    pub fn end(&mut self, table: &mut WordTable) {
        if let Some(word) = self.eligible() {
            table.learn(word);
        }
        self.len = 0;
        self.overflow = false;
    }

    /// The current run, if it would be stored when it ends.
    pub fn eligible(&self) -> Option<&[u8]> {
        (!self.overflow && self.len >= MIN_WORD_LEN).then(|| &self.run[..self.len])
    }

    pub fn in_word(&self) -> bool {
        self.len > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_slot_matches_prototype_hash() {
        assert_eq!(char_slot(0x4E2D), 0x5B);
        assert_eq!(char_slot(0x6587), 0x29);
        assert!(char_slot(u32::MAX) < CHAR_SLOTS as u8);
    }

    #[test]
    fn tracker_learns_only_eligible_runs() {
        let mut table = WordTable::default();
        let mut tracker = WordTracker::default();
        for &b in b"an the " {
            tracker.observe(b, &mut table);
        }
        assert_eq!(table.find(b"an"), None);
        let slot = table.find(b"the").expect("learned");
        assert_eq!(table.get(slot), Some(&b"the"[..]));

        let long = [b'x'; MAX_WORD_LEN + 1];
        for &b in &long {
            tracker.observe(b, &mut table);
        }
        assert!(tracker.eligible().is_none());
        tracker.end(&mut table);
        assert_eq!(table.find(&long), None);
        assert_eq!(table.find(&long[..MAX_WORD_LEN]), None);
    }

    #[test]
    fn learn_replaces_slot_occupant() {
        let first = b"word".to_vec();
        let slot = word_slot(&first);
        let rival = (0..26u8)
            .flat_map(|a| {
                (0..26u8).flat_map(move |b| (0..26u8).map(move |c| vec![b'a' + a, b'a' + b, b'a' + c]))
            })
            .find(|w| word_slot(w) == slot)
            .expect("some three-letter word shares the slot");

        let mut table = WordTable::default();
        table.learn(&first);
        assert_eq!(table.find(&first), Some(slot));
        table.learn(&rival);
        assert_eq!(table.find(&first), None);
        assert_eq!(table.get(slot), Some(rival.as_slice()));
    }
}
