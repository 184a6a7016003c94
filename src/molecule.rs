use crate::atom::Atom;
use crate::bond::{BondOrder, BondTarget};
use crate::cip::{self, CipError};
use crate::vector::Vector;
use core::fmt::{Display, Formatter};

/// A CIP stereodescriptor as stored on an atom (both ends of a resolved
/// double bond carry the E/Z value). `Undetermined` is the sentinel written
/// when a single center's computation fails internally; it never aborts the
/// batch.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum StereoDescriptor {
    R,
    S,
    /// pseudo-asymmetric "r"
    PseudoR,
    /// pseudo-asymmetric "s"
    PseudoS,
    Z,
    E,
    Undetermined,
    #[default]
    None,
}

impl StereoDescriptor {
    pub fn is_pseudo(&self) -> bool {
        matches!(self, StereoDescriptor::PseudoR | StereoDescriptor::PseudoS)
    }

    pub fn is_none(&self) -> bool {
        *self == StereoDescriptor::None
    }
}

impl Display for StereoDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StereoDescriptor::R => write!(f, "R"),
            StereoDescriptor::S => write!(f, "S"),
            StereoDescriptor::PseudoR => write!(f, "r"),
            StereoDescriptor::PseudoS => write!(f, "s"),
            StereoDescriptor::Z => write!(f, "Z"),
            StereoDescriptor::E => write!(f, "E"),
            StereoDescriptor::Undetermined => write!(f, "?"),
            StereoDescriptor::None => write!(f, ""),
        }
    }
}

/// The molecular graph the CIP engine reads: per-atom element number,
/// isotope, 3D position, adjacency list, and the stereodescriptor slot it
/// writes back into.
#[derive(Debug, Default, Clone)]
pub struct Molecule3D {
    pub atomic_numbers: Vec<u8>,
    pub isotopes: Vec<Option<u16>>,
    pub positions: Vec<Option<Vector>>,
    stereo_descriptors: Vec<StereoDescriptor>,
    atom_bonds: Vec<Vec<BondTarget>>,
}

impl Molecule3D {
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        let mut molecule = Molecule3D::default();
        for atom in atoms {
            molecule.add_atom(atom);
        }
        molecule
    }

    pub fn add_atom(&mut self, atom: Atom) {
        self.atomic_numbers.push(atom.atomic_number);
        self.isotopes.push(atom.isotope);
        self.positions.push(atom.position_vector);
        self.stereo_descriptors.push(atom.stereo_descriptor);
        self.atom_bonds.push(atom.bonds);
    }

    /// Adds a bond to the adjacency lists of both endpoints.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) {
        self.atom_bonds[atom1].push(BondTarget::new(atom2, order));
        self.atom_bonds[atom2].push(BondTarget::new(atom1, order));
    }

    pub fn len(&self) -> usize {
        self.atomic_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atomic_numbers.is_empty()
    }

    pub fn get_atomic_number(&self, atom_index: usize) -> u8 {
        self.atomic_numbers[atom_index]
    }

    pub fn get_isotope(&self, atom_index: usize) -> Option<u16> {
        self.isotopes.get(atom_index).copied().flatten()
    }

    pub fn get_atom_position(&self, atom_index: usize) -> Option<Vector> {
        self.positions.get(atom_index).copied().flatten()
    }

    pub fn get_atom_bonds(&self, atom_index: usize) -> Option<&[BondTarget]> {
        self.atom_bonds.get(atom_index).map(|bonds| bonds.as_slice())
    }

    pub fn covalent_bond_count(&self, atom_index: usize) -> usize {
        self.atom_bonds[atom_index]
            .iter()
            .filter(|bond| bond.is_covalent())
            .count()
    }

    /// The mass used by sequence Rule 2, see [`Atom::mass`].
    pub fn get_mass(&self, atom_index: usize) -> Option<f64> {
        let element = self.get_atomic_number(atom_index);
        match self.get_isotope(atom_index) {
            Some(isotope) if crate::consts::monoisotopic_mass_number(element) != Some(isotope) => {
                Some(isotope as f64)
            }
            _ => crate::consts::standard_atomic_weight(element),
        }
    }

    pub fn stereo_descriptor(&self, atom_index: usize) -> StereoDescriptor {
        self.stereo_descriptors[atom_index]
    }

    pub fn stereo_descriptors(&self) -> &[StereoDescriptor] {
        &self.stereo_descriptors
    }

    pub fn set_stereo_descriptor(&mut self, atom_index: usize, descriptor: StereoDescriptor) {
        self.stereo_descriptors[atom_index] = descriptor;
    }

    /// Assigns R/S, r/s, and E/Z descriptors to every eligible atom and
    /// double bond of the molecule. Atoms that already carry a descriptor
    /// are left untouched.
    ///
    /// # Example
    /// ```
    /// use chirality::prelude::*;
    /// use chirality::bond::BondOrder;
    ///
    /// // bromochlorofluoromethane, R configuration
    /// let mut molecule = Molecule3D::from_atoms(vec![
    ///     Atom::new(6).with_position((0.0, 0.0, 0.0)),
    ///     Atom::new(35).with_position((1.0, 1.0, 1.0)),
    ///     Atom::new(17).with_position((-1.0, 1.0, -1.0)),
    ///     Atom::new(9).with_position((1.0, -1.0, -1.0)),
    ///     Atom::new(1).with_position((-1.0, -1.0, 1.0)),
    /// ]);
    /// for i in 1..5 {
    ///     molecule.add_bond(0, i, BondOrder::Single);
    /// }
    /// molecule.assign_stereo_descriptors();
    /// assert_eq!(molecule.stereo_descriptor(0), StereoDescriptor::R);
    /// ```
    pub fn assign_stereo_descriptors(&mut self) {
        let candidates: Vec<usize> = (0..self.len()).collect();
        cip::assign_stereo_descriptors(self, &candidates);
    }

    /// Batch assignment restricted to a candidate atom set.
    pub fn assign_stereo_descriptors_for(&mut self, candidates: &[usize]) {
        cip::assign_stereo_descriptors(self, candidates);
    }

    /// Structural (Rules 1-3 only) R/S for a single atom; does not consult
    /// or produce auxiliary descriptors and does not mutate the molecule.
    pub fn atom_stereo_descriptor(
        &self,
        atom_index: usize,
    ) -> Result<StereoDescriptor, CipError> {
        cip::atom_stereo_descriptor(self, atom_index)
    }

    /// Structural (Rules 1-3 only) E/Z for the double bond between the two
    /// atoms; `StereoDescriptor::None` when the bond is not stereogenic.
    pub fn bond_stereo_descriptor(
        &self,
        atom1: usize,
        atom2: usize,
    ) -> Result<StereoDescriptor, CipError> {
        cip::bond_stereo_descriptor(self, atom1, atom2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::BondOrder;

    #[test]
    fn adjacency_is_symmetric() {
        let mut molecule = Molecule3D::from_atoms(vec![Atom::new(6), Atom::new(8)]);
        molecule.add_bond(0, 1, BondOrder::Double);
        assert_eq!(molecule.get_atom_bonds(0).unwrap()[0].target(), 1);
        assert_eq!(molecule.get_atom_bonds(1).unwrap()[0].target(), 0);
        assert_eq!(molecule.covalent_bond_count(0), 1);
    }

    #[test]
    fn isotope_mass_overrides_standard_weight() {
        let molecule = Molecule3D::from_atoms(vec![
            Atom::new(1),
            Atom::new(1).with_isotope(2),
        ]);
        assert_eq!(molecule.get_mass(0), Some(1.008));
        assert_eq!(molecule.get_mass(1), Some(2.0));
    }

    #[test]
    fn monoisotopic_label_matches_standard_weight() {
        let molecule = Molecule3D::from_atoms(vec![
            Atom::new(9),
            Atom::new(9).with_isotope(19),
        ]);
        assert_eq!(molecule.get_mass(0), molecule.get_mass(1));
    }
}
