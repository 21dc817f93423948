//! Plan Builder
//!
//! Turns a plan tree into a tree of executable steps: `sequential` and
//! `concurrent` nodes become [`Sequential`] and [`Concurrent`] groups,
//! every other node becomes an [`Action`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::execution::{Concurrent, Sequential, SharedStep, Step};
use crate::monitoring::{Outcome, SharedTimeline};

use super::model::{child_id, Node, Plan, ROOT_ID};

/// Builds the step tree for a plan.
///
/// When a timeline is given, every action records its start and outcome
/// in it.
pub fn build_plan(plan: &Plan, timeline: Option<&SharedTimeline>) -> SharedStep {
    build_node(&plan.run, ROOT_ID, timeline)
}

fn build_node(node: &Node, id: &str, timeline: Option<&SharedTimeline>) -> SharedStep {
    let children = || -> Vec<SharedStep> {
        node.children()
            .iter()
            .enumerate()
            .map(|(index, child)| build_node(child, &child_id(id, index + 1), timeline))
            .collect()
    };

    match node {
        Node::Sequential(group) => {
            let mut sequential = Sequential::new(children());
            if let Some(path) = &group.stop_file {
                sequential = sequential.with_done(stop_file_predicate(path.clone()));
            }
            Arc::new(sequential)
        }
        Node::Concurrent(_) => Arc::new(Concurrent::new(children())),
        action => Arc::new(Action {
            id: id.to_string(),
            node: action.clone(),
            timeline: timeline.cloned(),
        }),
    }
}

fn stop_file_predicate(path: PathBuf) -> impl Fn() -> bool + Send + Sync + 'static {
    move || {
        let stop = path.exists();
        if stop {
            debug!("Stop file {} present", path.display());
        }
        stop
    }
}

/// A leaf of the plan tree.
pub struct Action {
    id: String,
    node: Node,
    timeline: Option<SharedTimeline>,
}

impl Action {
    fn record(&self, outcome: Outcome) {
        if let Some(timeline) = &self.timeline {
            // A poisoned timeline only loses reporting, never the run.
            if let Ok(mut timeline) = timeline.lock() {
                timeline.record(self.id.as_str(), outcome);
            }
        }
    }

    fn run(&self, ctx: &Context) -> Result<()> {
        match &self.node {
            Node::Print(text) => {
                println!("{}", text);
                Ok(())
            }
            Node::Sleep(ms) => match ctx.wait_timeout(Duration::from_millis(*ms)) {
                Some(err) => Err(err.into()),
                None => Ok(()),
            },
            Node::Fail(message) => Err(Error::msg(message.as_str())),
            Node::Panic(message) => {
                self.record(Outcome::Failed);
                panic!("{}", message);
            }
            Node::Sequential(_) | Node::Concurrent(_) => Ok(()),
        }
    }
}

impl Step for Action {
    fn exec(&self, ctx: &Context) -> Result<()> {
        debug!("Action {} ({}) starting", self.id, self.node.kind());
        self.record(Outcome::Started);

        let result = self.run(ctx);

        match &result {
            Ok(()) => self.record(Outcome::Completed),
            Err(err) => {
                debug!("Action {} failed: {}", self.id, err);
                self.record(Outcome::Failed);
            }
        }
        result
    }
}
