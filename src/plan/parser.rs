//! Plan Parser
//!
//! Loads plan documents from YAML files or strings and validates them.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, error, info};
use thiserror::Error;

use super::model::Plan;
use super::validator::{validate_plan, ValidationError};

/// Failure to produce a usable plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse plan: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid plan: {}", join_issues(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_issues(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Loads and validates a plan from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use stepflow::plan::load_plan;
///
/// let plan = load_plan("nightly.yaml")?;
/// println!("{} actions", plan.run.action_count());
/// # Ok::<(), stepflow::plan::PlanError>(())
/// ```
pub fn load_plan(path: impl AsRef<Path>) -> Result<Plan, PlanError> {
    let path = path.as_ref();
    info!("Loading plan from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_plan(&content)
}

/// Parses and validates a plan from YAML text.
pub fn parse_plan(yaml: &str) -> Result<Plan, PlanError> {
    let plan: Plan = serde_yaml::from_str(yaml).map_err(|e| {
        error!("Plan YAML parsing failed: {}", e);
        PlanError::Parse(e)
    })?;

    debug!(
        "Parsed plan '{}' with {} actions",
        plan.display_name(),
        plan.run.action_count()
    );

    if let Err(issues) = validate_plan(&plan) {
        for issue in &issues {
            error!("Validation: {}", issue);
        }
        return Err(PlanError::Invalid(issues));
    }

    Ok(plan)
}

/// Serializes a plan back to YAML.
pub fn plan_to_yaml(plan: &Plan) -> Result<String, PlanError> {
    Ok(serde_yaml::to_string(plan)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::model::Node;
    use std::path::PathBuf;

    const NESTED: &str = r#"
name: nightly-sync
timeout_ms: 5000
run:
  concurrent:
    - sequential:
        stop_file: /tmp/stop-sync
        steps:
          - print: fetching users
          - sleep: 200
    - print: warming cache
    - fail: upstream returned 503
"#;

    #[test]
    fn test_parse_nested_plan() {
        let plan = parse_plan(NESTED).unwrap();

        assert_eq!(plan.display_name(), "nightly-sync");
        assert_eq!(plan.timeout_ms, Some(5000));
        assert_eq!(plan.run.kind(), "concurrent");
        assert_eq!(plan.run.action_count(), 4);

        match &plan.run.children()[0] {
            Node::Sequential(group) => {
                assert_eq!(group.stop_file, Some(PathBuf::from("/tmp/stop-sync")));
                assert_eq!(group.steps[1], Node::Sleep(200));
            }
            other => panic!("expected sequential group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_action() {
        let plan = parse_plan("run:\n  print: hello\n").unwrap();
        assert_eq!(plan.run, Node::Print("hello".into()));
        assert!(plan.timeout().is_none());
    }

    #[test]
    fn test_unknown_node_kind() {
        let result = parse_plan("run:\n  retry: 3\n");
        assert!(matches!(result, Err(PlanError::Parse(_))));
    }

    #[test]
    fn test_missing_run() {
        let result = parse_plan("name: nothing\n");
        assert!(matches!(result, Err(PlanError::Parse(_))));
    }

    #[test]
    fn test_invalid_plan_reports_issues() {
        let result = parse_plan("timeout_ms: 0\nrun:\n  fail: \"\"\n");

        match result {
            Err(PlanError::Invalid(issues)) => assert_eq!(issues.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_load_plan_from_file() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(&path, NESTED).unwrap();

        let plan = load_plan(&path).unwrap();
        assert_eq!(plan.run.action_count(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let result = load_plan(dir.path().join("absent.yaml"));

        match result {
            Err(PlanError::Io { path, .. }) => assert!(path.ends_with("absent.yaml")),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let plan = parse_plan(NESTED).unwrap();
        let yaml = plan_to_yaml(&plan).unwrap();

        assert_eq!(parse_plan(&yaml).unwrap(), plan);
    }
}
