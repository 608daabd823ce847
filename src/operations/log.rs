//! Log10 transform of a single channel

use crate::core::{Experiment, Operation, OperationError, Parameters};
use uuid::Uuid;

/// Replaces `channel` with its base-10 logarithm
///
/// Fails when the channel holds non-positive values.
#[derive(Debug, Clone)]
pub struct LogOp {
    id: Uuid,
    name: String,
    params: Parameters,
}

impl LogOp {
    pub fn from_parameters(name: &str, params: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            params,
        }
    }

    pub fn new(name: &str, channel: &str) -> Self {
        let mut params = Parameters::new();
        params.set("channel", channel);
        Self::from_parameters(name, params)
    }
}

impl Operation for LogOp {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &str {
        "log"
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
        match (input, self.params.str("channel")) {
            (Some(input), Ok(channel)) => input.has_channel(channel),
            _ => false,
        }
    }

    fn apply(&self, input: Option<&Experiment>) -> Result<Experiment, OperationError> {
        let input = input.ok_or(OperationError::MissingInput)?;
        let channel = self.params.str("channel")?;
        let values = input
            .channel(channel)
            .ok_or_else(|| OperationError::UnknownChannel(channel.to_string()))?;

        let non_positive = values.iter().filter(|v| **v <= 0.0).count();
        if non_positive > 0 {
            return Err(OperationError::Computation(format!(
                "channel '{}' has {} non-positive value(s)",
                channel, non_positive
            )));
        }

        let mut result = input.clone();
        result.add_channel(channel, values.iter().map(|v| v.log10()).collect())?;
        Ok(result)
    }
}
