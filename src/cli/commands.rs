//! CLI command definitions

use clap::Args;
use serde_json::Value;

/// Run a workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Parameter changes applied in order after the workflow is built (stage.param=value)
    #[arg(long, value_parser = parse_override)]
    pub set: Vec<ParameterOverride>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a workflow definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// A `stage.param=value` parameter change
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOverride {
    pub stage: String,
    pub key: String,
    pub value: Value,
}

/// Parse `stage.param=value`; the value is read as JSON, falling back to a string
pub fn parse_override(s: &str) -> Result<ParameterOverride, String> {
    let (target, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid stage.param=value pair: {}", s))?;
    let (stage, key) = target
        .rsplit_once('.')
        .ok_or_else(|| format!("Missing stage name in: {}", s))?;

    if stage.is_empty() || key.is_empty() {
        return Err(format!("Invalid stage.param=value pair: {}", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok(ParameterOverride {
        stage: stage.to_string(),
        key: key.to_string(),
        value,
    })
}
