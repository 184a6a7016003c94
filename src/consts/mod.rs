use phf::phf_map;

// IUPAC 2013 P-93.5.1.4.1: no E/Z inside rings of up to this many members
pub const SMALL_RING_MAX: usize = 7;
// Out-of-plane distance in Angstroms below which a trivalent center is
// treated as planar (sp2) rather than pyramidal
pub const TRIGONALITY_MIN: f64 = 0.2;

/// Standard atomic weights, used by sequence Rule 2 whenever an atom has no
/// identified isotope. Conventional values for the elements without a
/// characteristic terrestrial composition.
pub static STANDARD_ATOMIC_WEIGHTS: phf::Map<u8, f64> = phf_map! {
    1u8 => 1.008, 2u8 => 4.0026, 3u8 => 6.94, 4u8 => 9.0122, 5u8 => 10.81,
    6u8 => 12.011, 7u8 => 14.007, 8u8 => 15.999, 9u8 => 18.998, 10u8 => 20.180,
    11u8 => 22.990, 12u8 => 24.305, 13u8 => 26.982, 14u8 => 28.085,
    15u8 => 30.974, 16u8 => 32.06, 17u8 => 35.45, 18u8 => 39.948,
    19u8 => 39.098, 20u8 => 40.078, 21u8 => 44.956, 22u8 => 47.867,
    23u8 => 50.942, 24u8 => 51.996, 25u8 => 54.938, 26u8 => 55.845,
    27u8 => 58.933, 28u8 => 58.693, 29u8 => 63.546, 30u8 => 65.38,
    31u8 => 69.723, 32u8 => 72.630, 33u8 => 74.922, 34u8 => 78.971,
    35u8 => 79.904, 36u8 => 83.798, 37u8 => 85.468, 38u8 => 87.62,
    39u8 => 88.906, 40u8 => 91.224, 41u8 => 92.906, 42u8 => 95.95,
    43u8 => 97.0, 44u8 => 101.07, 45u8 => 102.91, 46u8 => 106.42,
    47u8 => 107.87, 48u8 => 112.41, 49u8 => 114.82, 50u8 => 118.71,
    51u8 => 121.76, 52u8 => 127.60, 53u8 => 126.90, 54u8 => 131.29,
    55u8 => 132.91, 56u8 => 137.33, 57u8 => 138.91, 58u8 => 140.12,
    59u8 => 140.91, 60u8 => 144.24, 61u8 => 145.0, 62u8 => 150.36,
    63u8 => 151.96, 64u8 => 157.25, 65u8 => 158.93, 66u8 => 162.50,
    67u8 => 164.93, 68u8 => 167.26, 69u8 => 168.93, 70u8 => 173.05,
    71u8 => 174.97, 72u8 => 178.49, 73u8 => 180.95, 74u8 => 183.84,
    75u8 => 186.21, 76u8 => 190.23, 77u8 => 192.22, 78u8 => 195.08,
    79u8 => 196.97, 80u8 => 200.59, 81u8 => 204.38, 82u8 => 207.2,
    83u8 => 208.98, 84u8 => 209.0, 85u8 => 210.0, 86u8 => 222.0,
    87u8 => 223.0, 88u8 => 226.0, 89u8 => 227.0, 90u8 => 232.04,
    91u8 => 231.04, 92u8 => 238.03,
};

pub static ELEMENT_SYMBOLS: phf::Map<u8, &'static str> = phf_map! {
    1u8 => "H", 2u8 => "He", 3u8 => "Li", 4u8 => "Be", 5u8 => "B",
    6u8 => "C", 7u8 => "N", 8u8 => "O", 9u8 => "F", 10u8 => "Ne",
    11u8 => "Na", 12u8 => "Mg", 13u8 => "Al", 14u8 => "Si", 15u8 => "P",
    16u8 => "S", 17u8 => "Cl", 18u8 => "Ar", 19u8 => "K", 20u8 => "Ca",
    21u8 => "Sc", 22u8 => "Ti", 23u8 => "V", 24u8 => "Cr", 25u8 => "Mn",
    26u8 => "Fe", 27u8 => "Co", 28u8 => "Ni", 29u8 => "Cu", 30u8 => "Zn",
    31u8 => "Ga", 32u8 => "Ge", 33u8 => "As", 34u8 => "Se", 35u8 => "Br",
    36u8 => "Kr", 37u8 => "Rb", 38u8 => "Sr", 39u8 => "Y", 40u8 => "Zr",
    41u8 => "Nb", 42u8 => "Mo", 43u8 => "Tc", 44u8 => "Ru", 45u8 => "Rh",
    46u8 => "Pd", 47u8 => "Ag", 48u8 => "Cd", 49u8 => "In", 50u8 => "Sn",
    51u8 => "Sb", 52u8 => "Te", 53u8 => "I", 54u8 => "Xe", 55u8 => "Cs",
    56u8 => "Ba", 57u8 => "La", 58u8 => "Ce", 59u8 => "Pr", 60u8 => "Nd",
    61u8 => "Pm", 62u8 => "Sm", 63u8 => "Eu", 64u8 => "Gd", 65u8 => "Tb",
    66u8 => "Dy", 67u8 => "Ho", 68u8 => "Er", 69u8 => "Tm", 70u8 => "Yb",
    71u8 => "Lu", 72u8 => "Hf", 73u8 => "Ta", 74u8 => "W", 75u8 => "Re",
    76u8 => "Os", 77u8 => "Ir", 78u8 => "Pt", 79u8 => "Au", 80u8 => "Hg",
    81u8 => "Tl", 82u8 => "Pb", 83u8 => "Bi", 84u8 => "Po", 85u8 => "At",
    86u8 => "Rn", 87u8 => "Fr", 88u8 => "Ra", 89u8 => "Ac", 90u8 => "Th",
    91u8 => "Pa", 92u8 => "U",
};

/// Mass numbers of the mononuclidic elements. Labeling such an atom with
/// its only natural isotope adds no information, so Rule 2 treats the
/// labeled and unlabeled forms as identical.
pub static MONOISOTOPIC_MASS_NUMBERS: phf::Map<u8, u16> = phf_map! {
    4u8 => 9, 9u8 => 19, 11u8 => 23, 13u8 => 27, 15u8 => 31, 21u8 => 45,
    25u8 => 55, 27u8 => 59, 33u8 => 75, 39u8 => 89, 41u8 => 93, 45u8 => 103,
    53u8 => 127, 55u8 => 133, 59u8 => 141, 65u8 => 159, 67u8 => 165,
    69u8 => 169, 79u8 => 197, 83u8 => 209, 90u8 => 232, 91u8 => 231,
};

/// Returns the standard atomic weight of an element
///
/// # Examples
/// ```
/// use chirality::consts::standard_atomic_weight;
/// assert_eq!(standard_atomic_weight(6), Some(12.011));
/// assert_eq!(standard_atomic_weight(0), None);
/// ```
pub fn standard_atomic_weight(atomic_number: u8) -> Option<f64> {
    STANDARD_ATOMIC_WEIGHTS.get(&atomic_number).copied()
}

pub fn atomic_symbol(atomic_number: u8) -> Option<&'static str> {
    ELEMENT_SYMBOLS.get(&atomic_number).copied()
}

/// Returns the mass number of an element's single natural isotope, `None`
/// for elements with more than one
///
/// # Examples
/// ```
/// use chirality::consts::monoisotopic_mass_number;
/// assert_eq!(monoisotopic_mass_number(9), Some(19));
/// assert_eq!(monoisotopic_mass_number(17), None);
/// ```
pub fn monoisotopic_mass_number(atomic_number: u8) -> Option<u16> {
    MONOISOTOPIC_MASS_NUMBERS.get(&atomic_number).copied()
}
