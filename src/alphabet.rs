//! A string-to-id table with frequency counts and online pruning.
//!
//! Ids are dense, `0..len()`, handed out in first-seen order. A pruning pass
//! throws away rare entries and rebuilds the table sorted by descending
//! frequency, so every id obtained before a prune is meaningless after it.

use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

struct Entry {
    word: String,
    count: u64,
}

pub struct Alphabet {
    word_hash: HashMap<String, usize>,
    entries: Vec<Entry>,
    max_count: u64,
    total_count: u64,
    /// Entries with a lower count are dropped by the next pruning pass.
    threshold: u64,
    /// Inserting a new entry that brings the size up to this triggers a prune.
    capacity: usize,
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::with_capacity(usize::MAX)
    }
}

impl Alphabet {
    pub fn with_capacity(capacity: usize) -> Self {
        Alphabet {
            word_hash: HashMap::new(),
            entries: Vec::new(),
            max_count: 0,
            total_count: 0,
            threshold: 1,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the id of `word`, if it is in the table.
    pub fn lookup(&self, word: &str) -> Option<usize> {
        self.word_hash.get(word).copied()
    }

    /// Adds `freq` occurrences of `word`, creating the entry if needed.
    ///
    /// Returns the entry's id. If adding the entry filled the table, a pruning
    /// pass runs first and the id is looked up again afterwards; `None` means
    /// that pass discarded the new entry.
    pub fn insert(&mut self, word: &str, freq: u64) -> Option<usize> {
        self.total_count += freq;
        if let Some(&id) = self.word_hash.get(word) {
            let entry = &mut self.entries[id];
            entry.count += freq;
            self.max_count = self.max_count.max(entry.count);
            return Some(id);
        }

        let id = self.entries.len();
        self.entries.push(Entry {
            word: word.to_string(),
            count: freq,
        });
        self.word_hash.insert(word.to_string(), id);
        self.max_count = self.max_count.max(freq);

        if self.entries.len() >= self.capacity {
            self.reduce();
            return self.lookup(word);
        }
        Some(id)
    }

    /// Raises the pruning threshold to `threshold` and drops every entry
    /// counted fewer than `threshold` times.
    ///
    /// Does nothing unless `threshold` is above the current one.
    pub fn prune(&mut self, threshold: u64) {
        if self.threshold >= threshold {
            return;
        }
        self.threshold = threshold;
        self.reduce();
    }

    /// Rebuilds the table from the entries that reach the threshold, most
    /// frequent first, then bumps the threshold for the next pass.
    fn reduce(&mut self) {
        let threshold = self.threshold;
        let mut survivors: Vec<Entry> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|entry| entry.count >= threshold)
            .collect();
        // Stable, so equal counts keep their previous id order.
        survivors.sort_by_key(|entry| Reverse(entry.count));

        self.word_hash = survivors
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.word.clone(), i))
            .collect();
        self.total_count = survivors.iter().map(|entry| entry.count).sum();
        self.max_count = survivors.first().map_or(0, |entry| entry.count);
        self.entries = survivors;

        debug!(size = self.entries.len(), threshold, "pruned table");
        self.threshold += 1;
    }

    /// Get the string for an id. Panics if `id` is out of range.
    pub fn word(&self, id: usize) -> &str {
        &self.entries[id].word
    }

    /// Get the count for an id. Panics if `id` is out of range.
    pub fn count(&self, id: usize) -> u64 {
        self.entries[id].count
    }

    pub fn counts(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.count).collect()
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// Sum of all counts currently in the table.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// `(word, count)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.word.as_str(), entry.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(words: &[&str]) -> Alphabet {
        let mut alphabet = Alphabet::default();
        for w in words {
            alphabet.insert(w, 1);
        }
        alphabet
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let mut alphabet = Alphabet::default();
        let words = ["the", "cat", "sat", "on", "the", "mat", "cat"];
        for w in words {
            let id = alphabet.insert(w, 1).unwrap();
            assert_eq!(alphabet.lookup(w), Some(id));
            assert_eq!(alphabet.word(id), w);
            assert!(id < alphabet.len());
        }
        assert_eq!(alphabet.len(), 5);
        assert_eq!(alphabet.lookup("the"), Some(0));
        assert_eq!(alphabet.lookup("mat"), Some(4));
        assert_eq!(alphabet.lookup("dog"), None);
        assert_eq!(alphabet.count(0), 2);
        assert_eq!(alphabet.max_count(), 2);
        assert_eq!(alphabet.total_count(), 7);
    }

    #[test]
    fn insert_accumulates_frequency() {
        let mut alphabet = Alphabet::default();
        alphabet.insert("x", 3);
        alphabet.insert("y", 1);
        alphabet.insert("x", 4);
        assert_eq!(alphabet.count(alphabet.lookup("x").unwrap()), 7);
        assert_eq!(alphabet.max_count(), 7);
        assert_eq!(alphabet.total_count(), 8);
    }

    #[test]
    fn prune_sorts_by_frequency_and_drops_rare_entries() {
        let mut alphabet = filled(&["a", "b", "c", "b", "d", "c", "e", "c", "a"]);
        // counts: a 2, b 2, c 3, d 1, e 1
        alphabet.prune(2);
        let entries: Vec<(&str, u64)> = alphabet.iter().collect();
        assert_eq!(entries, vec![("c", 3), ("a", 2), ("b", 2)]);
        assert_eq!(alphabet.lookup("c"), Some(0));
        assert_eq!(alphabet.lookup("d"), None);
        assert_eq!(alphabet.total_count(), 7);
        assert_eq!(alphabet.max_count(), 3);
        assert_eq!(alphabet.threshold(), 3);
    }

    #[test]
    fn prune_is_a_no_op_unless_threshold_rises() {
        let mut alphabet = filled(&["a", "b", "a"]);
        alphabet.prune(1);
        assert_eq!(alphabet.threshold(), 1);
        assert_eq!(alphabet.lookup("b"), Some(1));

        alphabet.prune(2);
        assert_eq!(alphabet.len(), 1);
        assert_eq!(alphabet.threshold(), 3);
        // 3 is not above the current threshold.
        alphabet.prune(3);
        assert_eq!(alphabet.threshold(), 3);
        assert_eq!(alphabet.len(), 1);
    }

    #[test]
    fn surviving_counts_are_preserved() {
        let mut alphabet = Alphabet::default();
        for _ in 0..5 {
            alphabet.insert("often", 1);
        }
        alphabet.insert("once", 1);
        alphabet.insert("often", 10);
        alphabet.prune(2);
        assert_eq!(alphabet.len(), 1);
        assert_eq!(alphabet.count(0), 15);

        alphabet.insert("often", 1);
        assert_eq!(alphabet.count(0), 16);
    }

    #[test]
    fn reaching_capacity_triggers_a_prune() {
        let mut alphabet = Alphabet::with_capacity(3);
        alphabet.insert("a", 1);
        alphabet.insert("a", 1);
        alphabet.insert("b", 1);
        // The third entry fills the table; nothing is below the initial
        // threshold, but the table is rebuilt and the threshold advances.
        assert_eq!(alphabet.insert("c", 1), Some(2));
        assert_eq!(alphabet.threshold(), 2);

        // The next new entry triggers a pass that drops everything seen once,
        // including the entry itself.
        assert_eq!(alphabet.insert("d", 1), None);
        let entries: Vec<(&str, u64)> = alphabet.iter().collect();
        assert_eq!(entries, vec![("a", 2)]);
        assert_eq!(alphabet.threshold(), 3);
    }

    #[test]
    fn pruning_everything_leaves_an_empty_table() {
        let mut alphabet = filled(&["a", "b"]);
        alphabet.prune(5);
        assert!(alphabet.is_empty());
        assert_eq!(alphabet.total_count(), 0);
        assert_eq!(alphabet.max_count(), 0);
    }
}
