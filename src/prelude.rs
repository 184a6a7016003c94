pub use crate::{
    atom::Atom,
    bond::{BondOrder, BondTarget},
    molecule::{Molecule3D, StereoDescriptor},
    vector::Vector,
};
