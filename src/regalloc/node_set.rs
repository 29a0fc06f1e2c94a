//! Fixed-size bit sets allocated in the allocator arena.
//!
//! Used for interference adjacency rows and for the set of physical numbers
//! blocked while selecting a register.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

#[derive(Debug, Clone)]
pub struct BitSet<'a> {
    words: BumpVec<'a, u64>,
    len: usize,
}

impl<'a> BitSet<'a> {
    /// Empty set able to hold bits `0..len`.
    pub fn new_in(len: usize, arena: &'a Bump) -> Self {
        let mut words = BumpVec::with_capacity_in(len.div_ceil(64), arena);
        words.resize(len.div_ceil(64), 0);
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn contains(&self, bit: usize) -> bool {
        bit < self.len && self.words[bit / 64] & (1u64 << (bit % 64)) != 0
    }

    /// Set `bit`, returning whether it was newly set.
    pub fn insert(&mut self, bit: usize) -> bool {
        assert!(bit < self.len, "bit {bit} outside set of {}", self.len);
        let mask = 1u64 << (bit % 64);
        let word = &mut self.words[bit / 64];
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    pub fn remove(&mut self, bit: usize) {
        if bit < self.len {
            self.words[bit / 64] &= !(1u64 << (bit % 64));
        }
    }

    /// Set every bit in `start..end`.
    pub fn insert_range(&mut self, start: usize, end: usize) {
        for bit in start..end.min(self.len) {
            self.insert(bit);
        }
    }

    /// True when any bit in `start..end` is set.
    pub fn any_in_range(&self, start: usize, end: usize) -> bool {
        (start..end).any(|bit| self.contains(bit))
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let arena = Bump::new();
        let mut set = BitSet::new_in(130, &arena);

        assert!(set.is_empty());
        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert!(set.insert(64));
        assert!(set.insert(129));
        assert!(set.contains(64));
        assert!(!set.contains(63));
        assert!(!set.contains(500));
        assert_eq!(set.count(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 64, 129]);

        set.remove(64);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 129]);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_ranges() {
        let arena = Bump::new();
        let mut set = BitSet::new_in(16, &arena);
        set.insert_range(4, 8);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        assert!(set.any_in_range(0, 5));
        assert!(!set.any_in_range(8, 16));
        assert!(!set.any_in_range(0, 4));
    }
}
