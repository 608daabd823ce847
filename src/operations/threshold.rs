//! Threshold gate

use crate::core::{Experiment, Operation, OperationError, Parameters};
use uuid::Uuid;

/// Keeps the events whose `channel` value is at or above `threshold`
///
/// With `keep: below` the comparison is inverted (strictly below).
#[derive(Debug, Clone)]
pub struct ThresholdOp {
    id: Uuid,
    name: String,
    params: Parameters,
}

impl ThresholdOp {
    pub fn from_parameters(name: &str, params: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            params,
        }
    }

    pub fn new(name: &str, channel: &str, threshold: f64) -> Self {
        let mut params = Parameters::new();
        params.set("channel", channel);
        params.set("threshold", threshold);
        Self::from_parameters(name, params)
    }

    fn keep_below(&self) -> bool {
        matches!(self.params.str("keep"), Ok("below"))
    }
}

impl Operation for ThresholdOp {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &str {
        "threshold"
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
        let Some(input) = input else {
            return false;
        };
        let channel_ok = self
            .params
            .str("channel")
            .is_ok_and(|channel| input.has_channel(channel));
        let threshold_ok = self.params.f64("threshold").is_ok_and(f64::is_finite);
        let keep_ok = match self.params.get("keep") {
            None => true,
            Some(_) => matches!(self.params.str("keep"), Ok("above" | "below")),
        };

        channel_ok && threshold_ok && keep_ok
    }

    fn apply(&self, input: Option<&Experiment>) -> Result<Experiment, OperationError> {
        let input = input.ok_or(OperationError::MissingInput)?;
        let channel = self.params.str("channel")?;
        let threshold = self.params.f64("threshold")?;
        let values = input
            .channel(channel)
            .ok_or_else(|| OperationError::UnknownChannel(channel.to_string()))?;

        let below = self.keep_below();
        let mask: Vec<bool> = values
            .iter()
            .map(|v| if below { *v < threshold } else { *v >= threshold })
            .collect();

        input.filter(&mask)
    }
}
