use crate::common::CutConfig;
use crate::domain::{Event, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationKind {
    Prompt,
    Delayed,
}

impl PopulationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Delayed => "delayed",
        }
    }

    fn energy_window(self, cuts: &CutConfig) -> Range {
        match self {
            Self::Prompt => cuts.prompt_energy,
            Self::Delayed => cuts.delay_energy,
        }
    }
}

/// Candidate events passing one energy window and the fiducial cylinder,
/// kept as indices into the source slice in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    kind: PopulationKind,
    indices: Vec<usize>,
}

impl Population {
    pub(super) fn build(
        events: &[Event],
        radii: &[f64],
        kind: PopulationKind,
        cuts: &CutConfig,
    ) -> Self {
        let energy = kind.energy_window(cuts);
        let indices = events
            .iter()
            .zip(radii)
            .enumerate()
            .filter(|(_, (event, radius))| {
                energy.contains(event.energy)
                    && cuts.fiducial_radius.contains(**radius)
                    && cuts.fiducial_z.contains(event.position.z)
            })
            .map(|(index, _)| index)
            .collect();

        Self { kind, indices }
    }

    pub const fn kind(&self) -> PopulationKind {
        self.kind
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
