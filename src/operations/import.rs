//! Import - the source stage of a workflow

use crate::core::{Experiment, Operation, OperationError, Parameters};
use serde_json::Value;
use uuid::Uuid;

/// Loads an experiment from a file (`file`) or inline data (`experiment`)
///
/// The input experiment, if any, is ignored.
#[derive(Debug, Clone)]
pub struct ImportOp {
    id: Uuid,
    name: String,
    params: Parameters,
}

impl ImportOp {
    pub fn from_parameters(name: &str, params: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            params,
        }
    }

    /// Import from a `.json` / `.yaml` file
    pub fn file(name: &str, path: &str) -> Self {
        let mut params = Parameters::new();
        params.set("file", path);
        Self::from_parameters(name, params)
    }

    /// Import an experiment given inline as JSON
    pub fn inline(name: &str, experiment: Value) -> Self {
        let mut params = Parameters::new();
        params.set("experiment", experiment);
        Self::from_parameters(name, params)
    }
}

impl Operation for ImportOp {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &str {
        "import"
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

    fn validate(&self, _input: Option<&Experiment>) -> bool {
        self.params.str("file").is_ok() || self.params.get("experiment").is_some_and(Value::is_object)
    }

    fn apply(&self, _input: Option<&Experiment>) -> Result<Experiment, OperationError> {
        if let Ok(path) = self.params.str("file") {
            return Experiment::from_file(path);
        }

        let inline = self
            .params
            .get("experiment")
            .cloned()
            .ok_or_else(|| OperationError::MissingParameter {
                name: "experiment".to_string(),
            })?;
        let experiment: Experiment =
            serde_json::from_value(inline).map_err(|e| OperationError::Parse(e.to_string()))?;
        experiment.check()?;
        Ok(experiment)
    }
}
