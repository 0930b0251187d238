//! Split the fused classification into cloud and snow indicator bands

use crate::imagery::band_math;
use crate::snow::bands::{CloudSnowBands, TacBands};
use snowcover_core::series::RasterFrame;
use snowcover_core::Result;

/// `Cloud_TAC` = 100 where TAC is 0, `Snow_TAC` = 100 where TAC is 100.
///
/// Land (50) is 0 in both. Masked TAC stays masked; QA_CR is carried over
/// and the frame keeps its timestamp.
pub fn split_cloud_snow_bands(frame: RasterFrame<TacBands>) -> Result<RasterFrame<CloudSnowBands>> {
    let time_start = frame.time_start;
    let mut out = frame.try_map_bands(|bands| -> Result<CloudSnowBands> {
        Ok(CloudSnowBands {
            cloud_tac: band_math(&bands.tac, |v| if v == 0.0 { 100.0 } else { 0.0 })?,
            snow_tac: band_math(&bands.tac, |v| if v == 100.0 { 100.0 } else { 0.0 })?,
            qa_cr: bands.qa_cr,
        })
    })?;
    out.time_start = time_start;
    Ok(out)
}
