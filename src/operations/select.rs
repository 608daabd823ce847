//! Channel selection

use crate::core::{Experiment, Operation, OperationError, Parameters};
use regex::Regex;
use uuid::Uuid;

/// Keeps the channels whose name matches the `pattern` regex
#[derive(Debug, Clone)]
pub struct SelectOp {
    id: Uuid,
    name: String,
    params: Parameters,
}

impl SelectOp {
    pub fn from_parameters(name: &str, params: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            params,
        }
    }

    pub fn new(name: &str, pattern: &str) -> Self {
        let mut params = Parameters::new();
        params.set("pattern", pattern);
        Self::from_parameters(name, params)
    }

    fn pattern(&self) -> Result<Regex, OperationError> {
        let pattern = self.params.str("pattern")?;
        Regex::new(pattern).map_err(|e| OperationError::InvalidParameter {
            name: "pattern".to_string(),
            message: e.to_string(),
        })
    }
}

impl Operation for SelectOp {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &str {
        "select"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn validate(&self, input: Option<&Experiment>) -> bool {
        input.is_some() && self.pattern().is_ok()
    }

    fn apply(&self, input: Option<&Experiment>) -> Result<Experiment, OperationError> {
        let input = input.ok_or(OperationError::MissingInput)?;
        let pattern = self.pattern()?;

        let selected = input.select(|name| pattern.is_match(name));
        if selected.channels().is_empty() {
            return Err(OperationError::Computation(format!(
                "pattern '{}' matched no channels",
                pattern.as_str()
            )));
        }
        Ok(selected)
    }
}
