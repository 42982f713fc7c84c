pub mod minor_units;
pub mod reference;
