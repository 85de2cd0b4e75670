//! Conversions between an observed decay rate and U-238 concentration.
//!
//! All functions are closed-form rearrangements of `A = N ln2 / T½` where the
//! atom count `N` follows from the mass fraction, molar mass and Avogadro's
//! number. They are linear in their first argument, so the same call
//! propagates a one-sigma uncertainty. Inputs are never rejected.

use crate::common::PhysicsConfig;
use crate::common::constants::{
    AVOGADRO, DAYS_PER_YEAR, GRAMS_PER_KILOGRAM, LN2, MILLIBECQUEREL_PER_BECQUEREL,
    SECONDS_PER_YEAR,
};
use serde::Serialize;

/// Counts per day to mass fraction (g/g).
pub fn cpd_to_gg(cpd: f64, total_mass_g: f64, half_life_years: f64, molar_mass: f64) -> f64 {
    cpd * molar_mass * half_life_years * DAYS_PER_YEAR / total_mass_g / AVOGADRO / LN2
}

/// Mass fraction (g/g) to counts per day in `total_mass_g` of target.
pub fn gg_to_cpd(gg: f64, total_mass_g: f64, half_life_years: f64, molar_mass: f64) -> f64 {
    gg * total_mass_g * AVOGADRO * LN2 / molar_mass / half_life_years / DAYS_PER_YEAR
}

pub fn gg_to_bq_per_kg(gg: f64, half_life_years: f64, molar_mass: f64) -> f64 {
    gg * GRAMS_PER_KILOGRAM * AVOGADRO * LN2 / molar_mass / half_life_years / SECONDS_PER_YEAR
}

pub fn gg_to_mbq_per_kg(gg: f64, half_life_years: f64, molar_mass: f64) -> f64 {
    gg * MILLIBECQUEREL_PER_BECQUEREL * GRAMS_PER_KILOGRAM * AVOGADRO * LN2
        / molar_mass
        / half_life_years
        / SECONDS_PER_YEAR
}

/// Activity in mBq contained in `volume_m3` of target at `density_kg_m3`.
pub fn gg_to_mbq_per_volume(
    gg: f64,
    half_life_years: f64,
    molar_mass: f64,
    volume_m3: f64,
    density_kg_m3: f64,
) -> f64 {
    gg * MILLIBECQUEREL_PER_BECQUEREL * GRAMS_PER_KILOGRAM * AVOGADRO * LN2 * density_kg_m3
        * volume_m3
        / molar_mass
        / half_life_years
        / SECONDS_PER_YEAR
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub const fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }

    /// Applies a linear conversion to both the central value and its sigma.
    pub fn map(self, convert: impl Fn(f64) -> f64) -> Self {
        Self::new(convert(self.value), convert(self.uncertainty))
    }
}

/// The same conversions bound to one set of physics constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    physics: PhysicsConfig,
}

impl UnitConverter {
    pub const fn new(physics: PhysicsConfig) -> Self {
        Self { physics }
    }

    pub const fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn cpd_to_gg(&self, cpd: f64) -> f64 {
        cpd_to_gg(
            cpd,
            self.physics.total_mass_g,
            self.physics.half_life_years,
            self.physics.molar_mass,
        )
    }

    pub fn gg_to_cpd(&self, gg: f64) -> f64 {
        gg_to_cpd(
            gg,
            self.physics.total_mass_g,
            self.physics.half_life_years,
            self.physics.molar_mass,
        )
    }

    pub fn gg_to_mbq_per_kg(&self, gg: f64) -> f64 {
        gg_to_mbq_per_kg(gg, self.physics.half_life_years, self.physics.molar_mass)
    }

    pub fn gg_to_mbq_per_volume(&self, gg: f64) -> f64 {
        gg_to_mbq_per_volume(
            gg,
            self.physics.half_life_years,
            self.physics.molar_mass,
            self.physics.volume_m3,
            self.physics.density_kg_m3,
        )
    }

    /// Counts per day straight to mBq in the configured volume.
    pub fn cpd_to_mbq_per_volume(&self, cpd: f64) -> f64 {
        self.gg_to_mbq_per_volume(self.cpd_to_gg(cpd))
    }

    pub fn concentration(&self, cpd: Measurement) -> Concentration {
        let gg = cpd.map(|value| self.cpd_to_gg(value));
        Concentration {
            cpd,
            gg,
            mbq_per_kg: gg.map(|value| self.gg_to_mbq_per_kg(value)),
            mbq_per_volume: gg.map(|value| self.gg_to_mbq_per_volume(value)),
        }
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Concentration {
    pub cpd: Measurement,
    pub gg: Measurement,
    pub mbq_per_kg: Measurement,
    pub mbq_per_volume: Measurement,
}

#[cfg(test)]
mod tests {
    use super::{
        Measurement, UnitConverter, cpd_to_gg, gg_to_bq_per_kg, gg_to_cpd, gg_to_mbq_per_kg,
        gg_to_mbq_per_volume,
    };
    use crate::numerics::within_tolerance;

    const MASS: f64 = 1.6202e7;
    const HALF_LIFE: f64 = 4.458e9;
    const MOLAR: f64 = 238.02891;

    #[test]
    fn reference_mass_fraction_maps_to_known_cpd() {
        let cpd = gg_to_cpd(1.0e-14, MASS, HALF_LIFE, MOLAR);
        assert!(within_tolerance(cpd, 174.611_242_858_758, 0.0, 1.0e-9), "cpd={cpd}");

        let direct = 1.0e-14 * MASS * 6.022e23 * std::f64::consts::LN_2 / MOLAR / HALF_LIFE / 365.0;
        assert!(within_tolerance(cpd, direct, 0.0, 1.0e-12));
    }

    #[test]
    fn cpd_and_gg_are_inverse() {
        for gg in [1.0e-18, 1.0e-14, 3.7e-12, 0.5] {
            let back = cpd_to_gg(gg_to_cpd(gg, MASS, HALF_LIFE, MOLAR), MASS, HALF_LIFE, MOLAR);
            assert!(within_tolerance(back, gg, 0.0, 1.0e-12), "gg={gg} back={back}");
        }
    }

    #[test]
    fn activity_units_scale_consistently() {
        let gg = 1.0e-14;
        let bq = gg_to_bq_per_kg(gg, HALF_LIFE, MOLAR);
        let mbq = gg_to_mbq_per_kg(gg, HALF_LIFE, MOLAR);
        assert!(within_tolerance(mbq, 1000.0 * bq, 0.0, 1.0e-12));
        assert!(within_tolerance(mbq, 1.247_354_313_673_25e-4, 0.0, 1.0e-9));

        let volume = gg_to_mbq_per_volume(gg, HALF_LIFE, MOLAR, 20.0, 860.0);
        assert!(within_tolerance(volume, mbq * 860.0 * 20.0, 0.0, 1.0e-12));
        assert!(within_tolerance(volume, 2.145_449_419_517_99, 0.0, 1.0e-9));
    }

    #[test]
    fn conversions_accept_zero_and_negative_inputs() {
        assert_eq!(cpd_to_gg(0.0, MASS, HALF_LIFE, MOLAR), 0.0);
        assert!(gg_to_cpd(-1.0e-14, MASS, HALF_LIFE, MOLAR) < 0.0);
        assert_eq!(gg_to_mbq_per_volume(0.0, HALF_LIFE, MOLAR, 20.0, 860.0), 0.0);
    }

    #[test]
    fn converter_propagates_value_and_sigma_identically() {
        let converter = UnitConverter::default();
        let concentration = converter.concentration(Measurement::new(2.0, 0.5));

        assert!(within_tolerance(
            concentration.gg.uncertainty,
            converter.cpd_to_gg(0.5),
            0.0,
            1.0e-15
        ));
        assert!(within_tolerance(
            concentration.mbq_per_volume.value / concentration.mbq_per_volume.uncertainty,
            4.0,
            0.0,
            1.0e-12
        ));
        assert!(within_tolerance(
            concentration.mbq_per_volume.value,
            converter.cpd_to_mbq_per_volume(2.0),
            0.0,
            1.0e-15
        ));
    }

    #[test]
    fn one_count_per_day_in_target_matches_hand_calculation() {
        let converter = UnitConverter::default();
        assert!(within_tolerance(
            converter.cpd_to_gg(1.0),
            5.727_008_087_382_401e-17,
            0.0,
            1.0e-9
        ));
        assert!(within_tolerance(
            converter.cpd_to_mbq_per_volume(1.0),
            0.012_287_006_176_649_43,
            0.0,
            1.0e-9
        ));
    }
}
