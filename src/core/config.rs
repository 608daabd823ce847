//! Workflow definition from YAML

use crate::core::{
    operation::Parameters,
    stage::ViewDescriptor,
    state::{FailurePolicy, UpdateReport},
    workflow::Workflow,
};
use crate::operations;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level workflow definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Definition version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// What a stage does when its operation fails to compute
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Stages in chain order
    pub stages: Vec<StageConfig>,

    /// Directory relative `file` parameters are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Stage definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Display name, unique within the workflow
    pub name: String,

    /// Operation kind, e.g. "threshold"
    pub operation: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    #[serde(default)]
    pub views: Vec<ViewDescriptor>,
}

impl WorkflowConfig {
    /// Load a workflow definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a workflow definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workflow definition
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                anyhow::bail!("Stage names must not be empty");
            }
            if !seen.insert(stage.name.as_str()) {
                anyhow::bail!("Duplicate stage name: {}", stage.name);
            }
            if !operations::is_known(&stage.operation) {
                anyhow::bail!(
                    "Stage '{}' uses unknown operation '{}' (known: {})",
                    stage.name,
                    stage.operation,
                    operations::KINDS.join(", ")
                );
            }
            for view in &stage.views {
                if view.kind.trim().is_empty() {
                    anyhow::bail!("Stage '{}' has a view without a kind", stage.name);
                }
            }
        }
        Ok(())
    }

    /// Parameters for a stage, with relative `file` paths resolved
    fn stage_parameters(&self, stage: &StageConfig) -> Parameters {
        let mut parameters = stage.parameters.clone();
        let resolved = match (&self.base_dir, parameters.get("file")) {
            (Some(base), Some(Value::String(file))) if Path::new(file).is_relative() => {
                Some(base.join(file).to_string_lossy().into_owned())
            }
            _ => None,
        };
        if let Some(resolved) = resolved {
            parameters.insert("file".to_string(), Value::String(resolved));
        }
        Parameters::from(parameters)
    }

    /// Append every stage to `workflow`, each one running its update cycle
    pub fn populate(&self, workflow: &mut Workflow) -> Result<Vec<UpdateReport>> {
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let operation =
                operations::build(&stage.operation, &stage.name, self.stage_parameters(stage))
                    .with_context(|| format!("Failed to build stage '{}'", stage.name))?;

            let (id, report) = workflow.push(operation);
            workflow.set_views(id, stage.views.clone())?;
            debug!("Stage '{}' added as {}", stage.name, id);
            reports.push(report);
        }
        Ok(reports)
    }

    /// An empty workflow carrying this definition's name and policy
    pub fn new_workflow(&self) -> Workflow {
        Workflow::new(&self.name).with_failure_policy(self.failure_policy)
    }

    /// Convert the definition into a running workflow
    pub fn to_workflow(&self) -> Result<Workflow> {
        let mut workflow = self.new_workflow();
        self.populate(&mut workflow)?;
        Ok(workflow)
    }
}
