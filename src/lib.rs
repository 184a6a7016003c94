pub mod atom;
pub mod bond;
pub mod cip;
pub mod consts;
pub mod molecule;
pub mod prelude;
pub mod rings;
pub mod vector;
