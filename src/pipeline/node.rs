// src/pipeline/node.rs

use std::fmt;

use crate::task::TaskName;

/// A pipeline tree.
///
/// Leaves name tasks; inner nodes run their children in order
/// ([`PipelineNode::Sequence`]) or concurrently ([`PipelineNode::Parallel`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNode {
    Task(TaskName),
    Sequence(Vec<PipelineNode>),
    Parallel(Vec<PipelineNode>),
}

impl PipelineNode {
    pub fn task(name: impl Into<TaskName>) -> Self {
        PipelineNode::Task(name.into())
    }

    /// Task names reachable from this node, first occurrence order.
    pub fn task_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PipelineNode::Task(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
            PipelineNode::Sequence(children) | PipelineNode::Parallel(children) => {
                for child in children {
                    child.collect_names(out);
                }
            }
        }
    }
}

/// Run `nodes` one after another, stopping at the first failure.
pub fn series<I, N>(nodes: I) -> PipelineNode
where
    I: IntoIterator<Item = N>,
    N: Into<PipelineNode>,
{
    PipelineNode::Sequence(nodes.into_iter().map(Into::into).collect())
}

/// Run `nodes` concurrently.
pub fn parallel<I, N>(nodes: I) -> PipelineNode
where
    I: IntoIterator<Item = N>,
    N: Into<PipelineNode>,
{
    PipelineNode::Parallel(nodes.into_iter().map(Into::into).collect())
}

impl From<&str> for PipelineNode {
    fn from(name: &str) -> Self {
        PipelineNode::Task(name.to_string())
    }
}

impl From<String> for PipelineNode {
    fn from(name: String) -> Self {
        PipelineNode::Task(name)
    }
}

impl fmt::Display for PipelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, children) = match self {
            PipelineNode::Task(name) => return write!(f, "{name}"),
            PipelineNode::Sequence(children) => ("series", children),
            PipelineNode::Parallel(children) => ("parallel", children),
        };
        write!(f, "{label}(")?;
        for (idx, child) in children.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{child}")?;
        }
        write!(f, ")")
    }
}
