//! Per-dimension configuration tables.
//!
//! Every analysis is driven by the grouping [`Dimension`]. The tables here
//! (axes, quadrant profiles, Pareto measures, fixed interval bands and
//! labels) are matched exhaustively on that enum.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::Metric,
    fields::{FieldMapping, Role},
};

/// What the report groups rows by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Product,
    Customer,
    Region,
}

/// Additive value dimension used for ranking and contribution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Quantity,
    Profit,
    Amount,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Quantity, Measure::Profit, Measure::Amount];

    pub fn role(self) -> Role {
        match self {
            Measure::Quantity => Role::Quantity,
            Measure::Profit => Role::Profit,
            Measure::Amount => Role::Amount,
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            Measure::Quantity => Metric::Quantity,
            Measure::Profit => Metric::Profit,
            Measure::Amount => Metric::Amount,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.role().as_str()
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConfig {
    pub x: Metric,
    pub y: Metric,
    pub x_label: &'static str,
    pub y_label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuadrantProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeasureInfo {
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

/// Hand-authored interval bands over one aggregated measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBins {
    pub title: &'static str,
    pub unit: &'static str,
    pub field: Measure,
    pub value_field: Measure,
    pub edges: &'static [f64],
    pub labels: &'static [&'static str],
}

/// Which figure decides whether an entity is profitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitCriterion {
    UnitMargin,
    Profit,
}

const PRODUCT_QUADRANTS: [QuadrantProfile; 4] = [
    QuadrantProfile {
        name: "Star products",
        description: "High margin, high volume",
        strategy: "Protect and invest: secure capacity, stock first, step up marketing",
    },
    QuadrantProfile {
        name: "Potential products",
        description: "High margin, low volume",
        strategy: "Targeted marketing and trials; find out why volume is low",
    },
    QuadrantProfile {
        name: "Dog products",
        description: "Low margin, low volume",
        strategy: "Simplify or retire after checking strategic value",
    },
    QuadrantProfile {
        name: "Cash cow products",
        description: "Low margin, high volume",
        strategy: "Cut cost and cross-sell; review the production process and use the traffic",
    },
];

const CUSTOMER_QUADRANTS: [QuadrantProfile; 4] = [
    QuadrantProfile {
        name: "Core customers",
        description: "High amount, high profit",
        strategy: "Strategic partnership with VIP service and executive visits to build a long-term moat",
    },
    QuadrantProfile {
        name: "Growth customers",
        description: "Low amount, high profit",
        strategy: "Support and penetrate; sales follow-up to grow purchase share and frequency",
    },
    QuadrantProfile {
        name: "Opportunity customers",
        description: "Low amount, low profit",
        strategy: "Standardised service at low cost without extra resources",
    },
    QuadrantProfile {
        name: "Margin-lift customers",
        description: "High amount, low profit",
        strategy: "Lift profit by steering purchases to high-margin products and reviewing discounts",
    },
];

const REGION_QUADRANTS: [QuadrantProfile; 4] = [
    QuadrantProfile {
        name: "Core markets",
        description: "High amount, high profit",
        strategy: "Concentrate resources, build regional barriers, pilot new products here",
    },
    QuadrantProfile {
        name: "Opportunity markets",
        description: "Low amount, high profit",
        strategy: "Target high-value customers and deepen market penetration",
    },
    QuadrantProfile {
        name: "Marginal markets",
        description: "Low amount, low profit",
        strategy: "Run at minimum cost with standard service; review periodically",
    },
    QuadrantProfile {
        name: "Scale markets",
        description: "High amount, low profit",
        strategy: "Reduce logistics and channel cost; push a higher-margin product mix",
    },
];

const PRODUCT_BINS: FixedBins = FixedBins {
    title: "Sales volume distribution",
    unit: "t",
    field: Measure::Quantity,
    value_field: Measure::Profit,
    edges: &[0.0, 5.0, 10.0, 20.0, 50.0, f64::INFINITY],
    labels: &["<5t", "5-10t", "10-20t", "20-50t", ">50t"],
};

const CUSTOMER_BINS: FixedBins = FixedBins {
    title: "Purchase amount distribution",
    unit: "10k yuan",
    field: Measure::Amount,
    value_field: Measure::Profit,
    edges: &[0.0, 10.0, 50.0, 100.0, 500.0, f64::INFINITY],
    labels: &["<10", "10-50", "50-100", "100-500", ">500"],
};

const REGION_BINS: FixedBins = FixedBins {
    title: "Sales amount distribution",
    unit: "10k yuan",
    field: Measure::Amount,
    value_field: Measure::Profit,
    edges: &[0.0, 50.0, 200.0, 500.0, 1000.0, f64::INFINITY],
    labels: &["<50", "50-200", "200-500", "500-1000", ">1000"],
};

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Product, Dimension::Customer, Dimension::Region];

    pub fn as_str(self) -> &'static str {
        self.group_role().as_str()
    }

    pub fn group_role(self) -> Role {
        match self {
            Dimension::Product => Role::Product,
            Dimension::Customer => Role::Customer,
            Dimension::Region => Role::Region,
        }
    }

    pub fn axes(self) -> AxisConfig {
        match self {
            Dimension::Product => AxisConfig {
                x: Metric::Quantity,
                y: Metric::UnitMargin,
                x_label: "Sales volume (t)",
                y_label: "Unit margin (yuan/t)",
            },
            Dimension::Customer => AxisConfig {
                x: Metric::Amount,
                y: Metric::Profit,
                x_label: "Sales amount (10k yuan)",
                y_label: "Profit contribution (10k yuan)",
            },
            Dimension::Region => AxisConfig {
                x: Metric::Amount,
                y: Metric::Profit,
                x_label: "Region sales amount (10k yuan)",
                y_label: "Region profit contribution (10k yuan)",
            },
        }
    }

    /// Static profile for quadrant `id` (1..=4).
    pub fn quadrant_profile(self, id: u8) -> Option<&'static QuadrantProfile> {
        let table = match self {
            Dimension::Product => &PRODUCT_QUADRANTS,
            Dimension::Customer => &CUSTOMER_QUADRANTS,
            Dimension::Region => &REGION_QUADRANTS,
        };
        usize::from(id).checked_sub(1).and_then(|idx| table.get(idx))
    }

    pub fn default_pareto_measure(self) -> Measure {
        match self {
            Dimension::Product => Measure::Profit,
            Dimension::Customer | Dimension::Region => Measure::Amount,
        }
    }

    /// Measures offered for Pareto ranking, before filtering by the mapping.
    pub fn pareto_candidates(self) -> &'static [Measure] {
        match self {
            Dimension::Product => &[Measure::Profit, Measure::Quantity],
            Dimension::Customer | Dimension::Region => {
                &[Measure::Amount, Measure::Profit, Measure::Quantity]
            }
        }
    }

    /// Pareto candidates whose role is mapped.
    pub fn available_pareto_measures(self, mapping: &FieldMapping) -> Vec<Measure> {
        self.pareto_candidates()
            .iter()
            .copied()
            .filter(|measure| mapping.contains(measure.role()))
            .collect()
    }

    pub fn measure_info(self, measure: Measure) -> MeasureInfo {
        const WAN: &str = "10k yuan";
        match (measure, self) {
            (Measure::Profit, Dimension::Product) => MeasureInfo {
                name: "Profit",
                unit: WAN,
                description: "Ranked by product profit contribution",
            },
            (Measure::Profit, Dimension::Customer) => MeasureInfo {
                name: "Profit contribution",
                unit: WAN,
                description: "Ranked by customer profit contribution",
            },
            (Measure::Profit, Dimension::Region) => MeasureInfo {
                name: "Profit contribution",
                unit: WAN,
                description: "Ranked by region profit contribution",
            },
            (Measure::Amount, Dimension::Product) => MeasureInfo {
                name: "Sales amount",
                unit: WAN,
                description: "Ranked by product sales amount",
            },
            (Measure::Amount, Dimension::Customer) => MeasureInfo {
                name: "Purchase amount",
                unit: WAN,
                description: "Ranked by customer purchase amount",
            },
            (Measure::Amount, Dimension::Region) => MeasureInfo {
                name: "Sales amount",
                unit: WAN,
                description: "Ranked by region sales amount",
            },
            (Measure::Quantity, Dimension::Product) => MeasureInfo {
                name: "Sales volume",
                unit: "t",
                description: "Ranked by product sales volume",
            },
            (Measure::Quantity, Dimension::Customer) => MeasureInfo {
                name: "Purchase volume",
                unit: "t",
                description: "Ranked by customer purchase volume",
            },
            (Measure::Quantity, Dimension::Region) => MeasureInfo {
                name: "Sales volume",
                unit: "t",
                description: "Ranked by region sales volume",
            },
        }
    }

    pub fn fixed_bins(self) -> &'static FixedBins {
        match self {
            Dimension::Product => &PRODUCT_BINS,
            Dimension::Customer => &CUSTOMER_BINS,
            Dimension::Region => &REGION_BINS,
        }
    }

    pub fn contribution_measures(self) -> [Measure; 3] {
        match self {
            Dimension::Product => [Measure::Quantity, Measure::Profit, Measure::Amount],
            Dimension::Customer | Dimension::Region => {
                [Measure::Amount, Measure::Profit, Measure::Quantity]
            }
        }
    }

    /// Volume-like measure plotted against cost rate.
    pub fn efficiency_measure(self) -> Measure {
        match self {
            Dimension::Product => Measure::Quantity,
            Dimension::Customer | Dimension::Region => Measure::Amount,
        }
    }

    pub fn efficiency_label(self) -> &'static str {
        match self {
            Dimension::Product => "Sales volume (t)",
            Dimension::Customer => "Purchase amount (10k yuan)",
            Dimension::Region => "Sales amount (10k yuan)",
        }
    }

    pub fn profit_criterion(self) -> ProfitCriterion {
        match self {
            Dimension::Product => ProfitCriterion::UnitMargin,
            Dimension::Customer | Dimension::Region => ProfitCriterion::Profit,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_bins_have_one_label_per_band() {
        for dimension in Dimension::ALL {
            let bins = dimension.fixed_bins();
            assert_eq!(bins.edges.len(), bins.labels.len() + 1, "{dimension}");
            assert!(bins.edges.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn quadrant_profiles_cover_ids_one_to_four() {
        for dimension in Dimension::ALL {
            for id in 1..=4 {
                assert!(dimension.quadrant_profile(id).is_some());
            }
            assert!(dimension.quadrant_profile(0).is_none());
            assert!(dimension.quadrant_profile(5).is_none());
        }
        assert_eq!(
            Dimension::Product.quadrant_profile(1).map(|p| p.name),
            Some("Star products")
        );
    }

    #[test]
    fn available_pareto_measures_follow_mapping() {
        let mapping: FieldMapping = [(Role::Product, "p".to_string()), (Role::Quantity, "q".to_string())]
            .into_iter()
            .collect();
        assert_eq!(
            Dimension::Product.available_pareto_measures(&mapping),
            vec![Measure::Quantity]
        );
        assert!(Dimension::Customer.available_pareto_measures(&FieldMapping::default()).is_empty());
    }
}
