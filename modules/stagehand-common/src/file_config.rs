use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::StagehandError;
use crate::types::{Step, StepKind};

/// A sequence declared in TOML.
///
/// ```toml
/// animate = true
///
/// [[steps]]
/// id = "hero"
/// kind = "matched"
/// delay_secs = 0.2
/// animation = "spring"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceFile {
    #[serde(default)]
    pub reversed: bool,
    #[serde(default = "default_true")]
    pub animate: bool,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub id: String,
    #[serde(default)]
    pub kind: StepKind,
    #[serde(default)]
    pub delay_secs: f64,
    #[serde(default = "default_true")]
    pub keep_alive: bool,
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,
    pub animation: Option<String>,
}

fn default_true() -> bool {
    true
}

impl StepSpec {
    fn to_step(&self, index: usize) -> Result<Step<String, String>, StagehandError> {
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(StagehandError::Validation(format!(
                "step {index} ('{}'): delay_secs must be a non-negative number, got {}",
                self.id, self.delay_secs
            )));
        }

        let mut step = Step::new(self.id.clone(), self.kind)
            .with_delay(Duration::from_secs_f64(self.delay_secs))
            .keep_alive(self.keep_alive)
            .wait_for_completion(self.wait_for_completion);
        if let Some(animation) = &self.animation {
            step = step.with_animation(animation.clone());
        }
        Ok(step)
    }
}

impl SequenceFile {
    /// Build validated steps in declaration order.
    pub fn steps(&self) -> Result<Vec<Step<String, String>>, StagehandError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.to_step(i))
            .collect()
    }
}

/// Parse and validate a sequence from TOML text.
pub fn parse_sequence(content: &str) -> Result<SequenceFile, StagehandError> {
    let file: SequenceFile = toml::from_str(content)?;
    file.steps()?;
    Ok(file)
}

/// Load and parse a TOML sequence file.
pub fn load_sequence(path: &Path) -> Result<SequenceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sequence file: {}", path.display()))?;
    let file = parse_sequence(&content)
        .with_context(|| format!("Failed to parse sequence file: {}", path.display()))?;
    Ok(file)
}
