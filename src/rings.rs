use crate::consts::SMALL_RING_MAX;
use nohash_hasher::IntSet;

/// Registry of small rings (at most [`SMALL_RING_MAX`] atoms), collected
/// once per batch by the ring pre-scan and read-only afterwards. Used to
/// erase E/Z designations for double bonds confined to small rings.
#[derive(Debug, Default, Clone)]
pub struct RingSet {
    rings: Vec<IntSet<usize>>,
}

impl RingSet {
    pub fn new() -> Self {
        RingSet::default()
    }

    /// Registers a ring unless it is too large or already present.
    pub fn add(&mut self, ring: IntSet<usize>) {
        if ring.len() > SMALL_RING_MAX {
            return;
        }
        if self.rings.iter().any(|existing| *existing == ring) {
            return;
        }
        self.rings.push(ring);
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// True if some registered ring contains both endpoints.
    pub fn contains_bond(&self, atom1: usize, atom2: usize) -> bool {
        self.rings
            .iter()
            .any(|ring| ring.contains(&atom1) && ring.contains(&atom2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(indices: &[usize]) -> IntSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn deduplicates_rings() {
        let mut rings = RingSet::new();
        rings.add(ring(&[0, 1, 2, 3, 4, 5]));
        rings.add(ring(&[5, 4, 3, 2, 1, 0]));
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn rejects_large_rings() {
        let mut rings = RingSet::new();
        rings.add(ring(&[0, 1, 2, 3, 4, 5, 6, 7]));
        assert!(rings.is_empty());
        rings.add(ring(&[0, 1, 2, 3, 4, 5, 6]));
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn bond_membership() {
        let mut rings = RingSet::new();
        rings.add(ring(&[3, 4, 5, 6, 7]));
        assert!(rings.contains_bond(4, 5));
        assert!(!rings.contains_bond(4, 8));
    }
}
