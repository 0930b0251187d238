//! Cloud gap filling on the merged TAC series
//!
//! Stages run in order: temporal (neighboring days), spatial-4 (edge
//! neighbors), then DEM (elevation of snowy neighbors). Each stage only
//! turns TAC 0 into 50 or 100 and raises QA_CR to its own code.

mod dem;
mod spatial4;
mod temporal;

pub use dem::{ic_impute_tac_spatial_dem, impute_tac_spatial_dem, DEM_QA};
pub use spatial4::{
    ic_impute_tac_spatial4, impute_tac_spatial4, neighbor_sum_decode_table,
    neighbor_weight_table, SPATIAL4_QA,
};
pub use temporal::{
    eligible_dates, ic_impute_tac_temporal, impute_tac_temporal, IncompleteWindow, TemporalPass,
    ELIGIBILITY_BUFFER_DAYS, TEMPORAL_PASSES,
};
