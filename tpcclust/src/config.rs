use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tpccore::geometry::row::RowGeometry;

use crate::cluster::params::ClustererParams;
use crate::error::Result;
use crate::sim::deposit::SimParams;

/// Settings of a `tpcclust` run. Every section may be omitted from the file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub geometry: RowGeometry,
    pub params: ClustererParams,
    pub sim: SimParams,
}

pub fn load_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)?;
    let config: RunConfig = serde_json::from_str(&contents)?;
    Ok(config)
}
