//! Analysis configuration: selection cuts, physics constants and input
//! discovery settings.
//!
//! Every field defaults to the values used for the U-238 BiPo-214 analysis, so
//! an empty JSON object (or no file at all) yields the standard configuration.

use super::constants::{
    CHARGE_PER_MEV, TARGET_DENSITY_KG_M3, TARGET_MASS_GRAMS, TARGET_VOLUME_M3,
    U238_HALF_LIFE_YEARS, U238_MOLAR_MASS,
};
use crate::domain::{BipoError, BipoResult, Range, RangeError, TimeWindow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How accepted prompt/delayed combinations are turned into coincidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Every prompt x delayed combination inside the windows counts.
    #[default]
    AllPairs,
    /// Each prompt keeps only its earliest accepted delayed partner.
    FirstMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    pub prompt_energy: Range,
    pub delay_energy: Range,
    pub fiducial_radius: Range,
    pub fiducial_z: Range,
    pub dt: TimeWindow,
    pub max_dr: f64,
    pub pairing: PairingPolicy,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            prompt_energy: Range::new(0.3, 3.3),
            delay_energy: Range::new(0.75, 1.15),
            fiducial_radius: Range::new(0.0, 200.0),
            fiducial_z: Range::new(-200.0, 200.0),
            dt: TimeWindow::new(1_000, 1_500_000),
            max_dr: 150.0,
            pairing: PairingPolicy::AllPairs,
        }
    }
}

impl CutConfig {
    pub fn validate(&self) -> Result<(), RangeError> {
        self.prompt_energy.validate("prompt energy")?;
        self.delay_energy.validate("delayed energy")?;
        self.fiducial_radius.validate("fiducial radius")?;
        self.fiducial_z.validate("fiducial z")?;
        self.dt.validate("coincidence dt")?;
        if self.max_dr.is_nan() {
            return Err(RangeError::NotFinite {
                label: "maximum dr",
            });
        }
        if self.max_dr < 0.0 {
            return Err(RangeError::Negative {
                label: "maximum dr",
                value: self.max_dr,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub half_life_years: f64,
    pub molar_mass: f64,
    pub total_mass_g: f64,
    pub volume_m3: f64,
    pub density_kg_m3: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            half_life_years: U238_HALF_LIFE_YEARS,
            molar_mass: U238_MOLAR_MASS,
            total_mass_g: TARGET_MASS_GRAMS,
            volume_m3: TARGET_VOLUME_M3,
            density_kg_m3: TARGET_DENSITY_KG_M3,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> BipoResult<()> {
        let fields = [
            ("half_life_years", self.half_life_years),
            ("molar_mass", self.molar_mass),
            ("total_mass_g", self.total_mass_g),
            ("volume_m3", self.volume_m3),
            ("density_kg_m3", self.density_kg_m3),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(BipoError::input_validation(
                    "INPUT.PHYSICS_CONSTANT",
                    format!("physics constant '{}' must be finite and positive, got {}", name, value),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Glob matched against bare file names inside the input directory.
    pub file_glob: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            file_glob: "*rs_processed.json".to_string(),
        }
    }
}

/// Trigger-level preprocessing settings used when flattening cluster records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    pub charge_per_mev: f64,
    /// Minimum time since the previous muon, in nanoseconds, for both the
    /// LS-muon and any-muon clocks.
    pub muon_veto_ns: f64,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            charge_per_mev: CHARGE_PER_MEV,
            muon_veto_ns: 1.0e6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub cuts: CutConfig,
    pub physics: PhysicsConfig,
    pub input: InputConfig,
    pub flatten: FlattenConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(source: &str) -> BipoResult<Self> {
        serde_json::from_str(source).map_err(|error| {
            BipoError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse analysis configuration: {}", error),
            )
        })
    }

    pub fn load(path: &Path) -> BipoResult<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            BipoError::io_system(
                "IO.CONFIG_READ",
                format!(
                    "failed to read configuration '{}': {}",
                    path.display(),
                    error
                ),
            )
        })?;
        let config = Self::from_json_str(&source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BipoResult<()> {
        self.cuts.validate()?;
        self.physics.validate()?;
        if !(self.flatten.charge_per_mev.is_finite() && self.flatten.charge_per_mev > 0.0) {
            return Err(BipoError::input_validation(
                "INPUT.FLATTEN_SCALE",
                format!(
                    "charge_per_mev must be finite and positive, got {}",
                    self.flatten.charge_per_mev
                ),
            ));
        }
        Ok(())
    }
}
