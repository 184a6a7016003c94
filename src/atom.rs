use crate::bond::BondTarget;
use crate::consts;
use crate::molecule::StereoDescriptor;
use crate::vector::Vector;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Atom {
    pub atomic_number: u8,
    pub isotope: Option<u16>,
    pub stereo_descriptor: StereoDescriptor,
    pub position_vector: Option<Vector>,
    pub bonds: Vec<BondTarget>,
}

impl Atom {
    pub fn new(atomic_number: u8) -> Atom {
        Atom {
            atomic_number,
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: (f64, f64, f64)) -> Self {
        self.position_vector = Some(Vector::new(position.0, position.1, position.2));
        self
    }

    pub fn with_isotope(mut self, isotope: u16) -> Self {
        self.isotope = Some(isotope);
        self
    }

    pub fn with_stereo_descriptor(mut self, descriptor: StereoDescriptor) -> Self {
        self.stereo_descriptor = descriptor;
        self
    }

    pub fn isotope(&self) -> Option<u16> {
        self.isotope
    }

    pub fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    pub fn bonds(&self) -> &Vec<BondTarget> {
        &self.bonds
    }

    pub fn add_bond(&mut self, bond: BondTarget) {
        self.bonds.push(bond);
    }

    pub fn covalent_bond_count(&self) -> usize {
        self.bonds.iter().filter(|bond| bond.is_covalent()).count()
    }

    pub fn atomic_symbol(&self) -> Option<&'static str> {
        consts::atomic_symbol(self.atomic_number)
    }

    /// The mass used by sequence Rule 2: the isotope mass number when one
    /// has been identified, the element's standard atomic weight otherwise.
    /// Labeling a mononuclidic element with its only isotope changes
    /// nothing, so that case falls back to the standard weight too.
    ///
    /// # Examples
    /// ```
    /// use chirality::prelude::*;
    /// let carbon = Atom::new(6);
    /// assert_eq!(carbon.mass(), Some(12.011));
    /// let carbon13 = Atom::new(6).with_isotope(13);
    /// assert_eq!(carbon13.mass(), Some(13.0));
    /// let fluorine19 = Atom::new(9).with_isotope(19);
    /// assert_eq!(fluorine19.mass(), Atom::new(9).mass());
    /// ```
    pub fn mass(&self) -> Option<f64> {
        match self.isotope {
            Some(isotope) if consts::monoisotopic_mass_number(self.atomic_number) != Some(isotope) => {
                Some(isotope as f64)
            }
            _ => consts::standard_atomic_weight(self.atomic_number),
        }
    }

    /// Calculates the distance between two atoms.
    ///
    /// # Example
    /// ```
    /// use chirality::prelude::*;
    /// let atom1 = Atom::new(6).with_position((0.0, 0.0, 0.0));
    /// let atom2 = Atom::new(6).with_position((1.0, 0.0, 0.0));
    /// assert_eq!(atom1.distance(&atom2), 1.0);
    /// ```
    pub fn distance(&self, other: &Atom) -> f64 {
        let Some(self_position_vector) = self.position_vector else {
            return 0.0;
        };
        let Some(other_position_vector) = other.position_vector else {
            return 0.0;
        };
        (other_position_vector - self_position_vector).length()
    }
}
