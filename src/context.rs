use serde::Serialize;

use crate::{
    config::EngineSettings,
    dimension::{Dimension, Measure},
    fields::FieldMapping,
    units::UnitConfirmation,
};

/// Everything one analysis run needs besides the data itself.
///
/// Built once per invocation and only ever borrowed by the analyses, so
/// concurrent runs over different tables each own their own mapping and unit
/// hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisContext {
    pub dimension: Dimension,
    pub mapping: FieldMapping,
    pub units: UnitConfirmation,
    pub pareto_measure: Option<Measure>,
    pub pareto_threshold: f64,
    pub top_contributors: usize,
}

impl AnalysisContext {
    pub fn new(
        dimension: Dimension,
        mapping: FieldMapping,
        units: UnitConfirmation,
        pareto_measure: Option<Measure>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            dimension,
            mapping,
            units,
            pareto_measure,
            pareto_threshold: settings.pareto_threshold,
            top_contributors: settings.top_contributors,
        }
    }

    /// Context with default settings, handy for direct analysis calls.
    pub fn with_defaults(dimension: Dimension, mapping: FieldMapping) -> Self {
        Self::new(
            dimension,
            mapping,
            UnitConfirmation::default(),
            None,
            &EngineSettings::default(),
        )
    }
}
