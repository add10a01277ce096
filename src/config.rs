//! Engine settings loaded from an optional YAML file.
//!
//! ```yaml
//! pareto_threshold: 80
//! top_contributors: 10
//! sample_values: 3
//! aliases:
//!   product: ["Article"]
//!   sea_freight: ["Ocean cost"]
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::fields::{AliasTable, Role};

pub const DEFAULT_PARETO_THRESHOLD: f64 = 80.0;
pub const DEFAULT_TOP_CONTRIBUTORS: usize = 10;
pub const DEFAULT_SAMPLE_VALUES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Cumulative percentage that closes the Pareto core set.
    pub pareto_threshold: f64,
    pub top_contributors: usize,
    /// Sample values reported per column during field detection.
    pub sample_values: usize,
    /// Extra header aliases, tried after the built-in ones.
    pub aliases: BTreeMap<Role, Vec<String>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pareto_threshold: DEFAULT_PARETO_THRESHOLD,
            top_contributors: DEFAULT_TOP_CONTRIBUTORS,
            sample_values: DEFAULT_SAMPLE_VALUES,
            aliases: BTreeMap::new(),
        }
    }
}

impl EngineSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let settings: EngineSettings = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing settings YAML {path:?}"))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pareto_threshold > 0.0 && self.pareto_threshold <= 100.0) {
            bail!(
                "pareto_threshold must be in (0, 100], got {}",
                self.pareto_threshold
            );
        }
        if self.top_contributors == 0 {
            bail!("top_contributors must be at least 1");
        }
        Ok(())
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::with_extra(&self.aliases)
    }
}
