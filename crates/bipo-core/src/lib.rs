//! BiPo-214 delayed-coincidence analysis: event selection, rate estimation and
//! conversion to U-238 concentration, plus the batch evolution run.

pub mod common;
pub mod domain;
pub mod io;
pub mod numerics;
pub mod pipelines;
pub mod rate;
pub mod reco;
pub mod selection;
pub mod spectrum;
pub mod units;
