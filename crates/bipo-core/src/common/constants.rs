//! Physical and unit constants shared by the rate and concentration code.
//!
//! The analysis chain multiplies these in a fixed order, so every conversion
//! draws from this module instead of carrying its own literals.

pub const AVOGADRO: f64 = 6.022e23;
pub const LN2: f64 = std::f64::consts::LN_2;
pub const DAYS_PER_YEAR: f64 = 365.0;
pub const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;
pub const SECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * SECONDS_PER_DAY;
pub const GRAMS_PER_KILOGRAM: f64 = 1000.0;
pub const MILLIBECQUEREL_PER_BECQUEREL: f64 = 1000.0;
pub const NANOSECONDS_PER_SECOND: f64 = 1.0e9;

/// U-238 reference values.
pub const U238_HALF_LIFE_YEARS: f64 = 4.458e9;
pub const U238_MOLAR_MASS: f64 = 238.028_910;

/// Target scintillator.
pub const TARGET_MASS_GRAMS: f64 = 16.202e6;
pub const TARGET_VOLUME_M3: f64 = 20.0;
pub const TARGET_DENSITY_KG_M3: f64 = 860.0;

/// Raw cluster charge per MeV of visible energy.
pub const CHARGE_PER_MEV: f64 = 436.0;
