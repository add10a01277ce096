use itertools::Itertools;
use thiserror::Error;

use crate::fields::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("missing required field(s): {}", .missing.iter().join(", "))]
    Validation { missing: Vec<Role> },
    #[error("grouping field '{0}' is not mapped to any column")]
    MissingGroupField(Role),
}

impl AnalysisError {
    pub fn missing_roles(&self) -> &[Role] {
        match self {
            AnalysisError::Validation { missing } => missing,
            AnalysisError::MissingGroupField(role) => std::slice::from_ref(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_roles() {
        let err = AnalysisError::Validation {
            missing: vec![Role::Product, Role::Quantity],
        };
        assert_eq!(err.to_string(), "missing required field(s): product, quantity");
        assert_eq!(err.missing_roles(), &[Role::Product, Role::Quantity]);
    }

    #[test]
    fn missing_group_field_names_role() {
        let err = AnalysisError::MissingGroupField(Role::Region);
        assert!(err.to_string().contains("'region'"));
    }
}
