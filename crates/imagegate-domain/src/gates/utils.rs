use super::TriggerError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;

/// Read-only view over a rule's parameters with typed accessors.
#[derive(Clone, Copy, Debug)]
pub struct Params<'a> {
    raw: &'a BTreeMap<String, String>,
}

impl<'a> Params<'a> {
    pub fn new(raw: &'a BTreeMap<String, String>) -> Self {
        Self { raw }
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.raw.get(name).map(String::as_str)
    }

    /// Comma-separated list; empty entries are dropped. `None` when the parameter is absent.
    pub fn list(&self, name: &str) -> Option<Vec<&'a str>> {
        self.get(name).map(split_list)
    }

    pub fn u64(&self, name: &str) -> Result<Option<u64>, TriggerError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| invalid(name, value, e.to_string()))
    }

    /// Glob list compiled into one matcher.
    pub fn globs(&self, name: &str) -> Result<Option<GlobSet>, TriggerError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let mut builder = GlobSetBuilder::new();
        for pattern in split_list(value) {
            let glob = Glob::new(pattern).map_err(|e| invalid(name, pattern, e.to_string()))?;
            builder.add(glob);
        }
        builder
            .build()
            .map(Some)
            .map_err(|e| invalid(name, value, e.to_string()))
    }
}

pub fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn invalid(param: &str, value: &str, reason: impl Into<String>) -> TriggerError {
    TriggerError::InvalidParam {
        param: param.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn is_listed(list: Option<&[&str]>, value: &str) -> bool {
    list.is_some_and(|l| l.contains(&value))
}
