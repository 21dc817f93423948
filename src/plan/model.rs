//! Plan Data Model
//!
//! A plan is a tree of groups and actions read from YAML.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: nightly-sync
//! timeout_ms: 5000
//! run:
//!   concurrent:
//!     - sequential:
//!         stop_file: /tmp/stop-sync
//!         steps:
//!           - print: fetching users
//!           - sleep: 200
//!     - print: warming cache
//!     - fail: upstream returned 503
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A runnable plan document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Plan {
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Deadline for the whole run, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Root node
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub run: Node,
}

/// One node of the plan tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Children run in order.
    Sequential(SequentialGroup),
    /// Children run in parallel.
    Concurrent(Vec<Node>),
    /// Prints a line to stdout.
    Print(String),
    /// Waits for the given number of milliseconds, or until canceled.
    Sleep(u64),
    /// Fails with the given message.
    Fail(String),
    /// Panics with the given message.
    Panic(String),
}

/// Body of a `sequential` node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SequentialGroup {
    #[serde(default)]
    pub steps: Vec<Node>,

    /// The group stops, successfully, once this file exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_file: Option<PathBuf>,
}

/// Id given to the root node; children append their 1-based position.
pub const ROOT_ID: &str = "1";

/// Builds the id of the child at 1-based `position` under `parent`.
pub fn child_id(parent: &str, position: usize) -> String {
    format!("{}.{}", parent, position)
}

impl Plan {
    /// Returns the run deadline, if the plan sets one.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Display name, falling back to "unnamed".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

impl Node {
    /// Child nodes of a group; empty for actions.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Sequential(group) => &group.steps,
            Node::Concurrent(children) => children,
            _ => &[],
        }
    }

    /// Returns true for leaf actions.
    pub fn is_action(&self) -> bool {
        !matches!(self, Node::Sequential(_) | Node::Concurrent(_))
    }

    /// Counts the leaf actions in this subtree.
    pub fn action_count(&self) -> usize {
        if self.is_action() {
            1
        } else {
            self.children().iter().map(Node::action_count).sum()
        }
    }

    /// Short name of the node kind, as written in YAML.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Sequential(_) => "sequential",
            Node::Concurrent(_) => "concurrent",
            Node::Print(_) => "print",
            Node::Sleep(_) => "sleep",
            Node::Fail(_) => "fail",
            Node::Panic(_) => "panic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::Concurrent(vec![
            Node::Sequential(SequentialGroup {
                steps: vec![Node::Print("a".into()), Node::Sleep(10)],
                stop_file: None,
            }),
            Node::Fail("boom".into()),
            Node::Concurrent(vec![]),
        ])
    }

    #[test]
    fn test_action_count() {
        assert_eq!(sample().action_count(), 3);
        assert_eq!(Node::Print("x".into()).action_count(), 1);
        assert_eq!(Node::Concurrent(vec![]).action_count(), 0);
    }

    #[test]
    fn test_children_and_kind() {
        let root = sample();
        assert_eq!(root.kind(), "concurrent");
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.children()[0].kind(), "sequential");
        assert!(root.children()[1].is_action());
        assert!(Node::Panic("p".into()).children().is_empty());
    }

    #[test]
    fn test_child_id() {
        assert_eq!(child_id(ROOT_ID, 2), "1.2");
        assert_eq!(child_id("1.2", 3), "1.2.3");
    }

    #[test]
    fn test_plan_timeout() {
        let plan = Plan {
            name: None,
            timeout_ms: Some(250),
            run: Node::Sleep(1),
        };
        assert_eq!(plan.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(plan.display_name(), "unnamed");
    }

    #[test]
    fn test_yaml_round_trip_uses_map_form() {
        let plan = Plan {
            name: Some("demo".into()),
            timeout_ms: None,
            run: sample(),
        };

        let yaml = serde_yaml::to_string(&plan).unwrap();
        assert!(yaml.contains("concurrent:"));
        assert!(!yaml.contains('!'));

        let parsed: Plan = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, plan);
    }
}
