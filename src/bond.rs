use core::fmt::{Display, Formatter};

/// One half of a bond as stored in an atom's adjacency list: the index of
/// the atom on the other end plus the bond order.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct BondTarget {
    pub target: usize,
    pub bond_order: BondOrder,
}

impl BondTarget {
    pub fn new(target: usize, bond_order: BondOrder) -> BondTarget {
        BondTarget { target, bond_order }
    }
    pub fn single(target: usize) -> BondTarget {
        BondTarget {
            target,
            bond_order: BondOrder::Single,
        }
    }
    pub fn double(target: usize) -> BondTarget {
        BondTarget {
            target,
            bond_order: BondOrder::Double,
        }
    }
    pub fn triple(target: usize) -> BondTarget {
        BondTarget {
            target,
            bond_order: BondOrder::Triple,
        }
    }
    pub fn bond_order(&self) -> BondOrder {
        self.bond_order
    }
    pub fn target(&self) -> usize {
        self.target
    }
    pub fn order(&self) -> u8 {
        match self.bond_order {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 1,
            BondOrder::Coordinate => 1,
        }
    }
    /// Coordinate (dative) bonds are not part of the covalent skeleton the
    /// CIP digraph is built from.
    pub fn is_covalent(&self) -> bool {
        self.bond_order != BondOrder::Coordinate
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
    Coordinate,
}

impl Display for BondOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BondOrder::Single => write!(f, "-"),
            BondOrder::Double => write!(f, "="),
            BondOrder::Triple => write!(f, "#"),
            BondOrder::Aromatic => write!(f, ":"),
            BondOrder::Coordinate => write!(f, ""),
        }
    }
}
