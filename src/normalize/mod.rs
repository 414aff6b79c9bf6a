//! Normalisation of units and free-text vocabularies.
//!
//! Pure functions only. Unit conversion happens at extraction time; the
//! vocabulary lookups never fail and fall back to the safest default.

mod units;
mod vocab;

pub use units::{
    parse_number, MassUnit, MoneyScale, POUND_KG, TONNE_KG, TROY_OUNCE_GRAMS,
};
pub use vocab::{normalize_commodity, normalize_stage};
