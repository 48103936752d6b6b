use std::fmt;
use thiserror::Error;

/// One reason a bundle was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundleProblem {
    UnknownPolicy { mapping: usize, policy_id: String },
    UnknownWhitelist { mapping: usize, whitelist_id: String },
    InvalidAction { policy_id: String, rule: usize, action: String },
    EmptyField { field: &'static str },
}

impl fmt::Display for BundleProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleProblem::UnknownPolicy { mapping, policy_id } => {
                write!(f, "mapping #{mapping} references unknown policy '{policy_id}'")
            }
            BundleProblem::UnknownWhitelist {
                mapping,
                whitelist_id,
            } => write!(
                f,
                "mapping #{mapping} references unknown whitelist '{whitelist_id}'"
            ),
            BundleProblem::InvalidAction {
                policy_id,
                rule,
                action,
            } => write!(
                f,
                "policy '{policy_id}' rule #{rule} has unrecognized action '{action}' (expected GO|WARN|STOP)"
            ),
            BundleProblem::EmptyField { field } => write!(f, "bundle field '{field}' is empty"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bundle rejected: {}", join_problems(.0))]
    Invalid(Vec<BundleProblem>),
}

fn join_problems(problems: &[BundleProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no bundle mapping matches tags [{}] and the bundle has no default (*/*/*) mapping", .tags.join(", "))]
    UnmappedImage { tags: Vec<String> },
}
