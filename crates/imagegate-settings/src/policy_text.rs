//! Legacy line-oriented policy and whitelist files.
//!
//! Policy: `GATE:TRIGGER:ACTION[:PARAM=value PARAM=value ...]`, parameter values are
//! comma-separated lists; whitespace around a list comma is dropped. Whitelist:
//! `GATE:TRIGGER:ID`. Blank lines and `#` comments are ignored; any malformed line rejects the
//! whole file.

use imagegate_types::{Action, GateRule, WhitelistItem};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("line {line}: expected GATE:TRIGGER:ACTION[:PARAM=value ...], got '{text}'")]
    MalformedRule { line: usize, text: String },

    #[error("line {line}: unrecognized action '{action}' (expected GO|WARN|STOP)")]
    InvalidAction { line: usize, action: String },

    #[error("line {line}: malformed parameter '{param}' (expected NAME=value)")]
    MalformedParam { line: usize, param: String },

    #[error("line {line}: expected GATE:TRIGGER:ID, got '{text}'")]
    MalformedWhitelist { line: usize, text: String },
}

fn content_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(idx, l)| (idx + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

/// Splits a parameter list on whitespace, rejoining list values written as `a, b` or `a ,b`.
fn param_tokens(rest: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in rest.split_whitespace() {
        match tokens.last_mut() {
            Some(prev) if prev.ends_with(',') || word.starts_with(',') => prev.push_str(word),
            _ => tokens.push(word.to_string()),
        }
    }
    tokens
}

pub fn parse_policy_text(input: &str) -> Result<Vec<GateRule>, PolicyParseError> {
    let mut rules = Vec::new();
    for (line, text) in content_lines(input) {
        let mut parts = text.splitn(4, ':');
        let (Some(gate), Some(trigger), Some(action)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PolicyParseError::MalformedRule {
                line,
                text: text.to_string(),
            });
        };
        let (gate, trigger, action) = (gate.trim(), trigger.trim(), action.trim());
        if gate.is_empty() || trigger.is_empty() {
            return Err(PolicyParseError::MalformedRule {
                line,
                text: text.to_string(),
            });
        }
        let action = Action::parse(action).ok_or_else(|| PolicyParseError::InvalidAction {
            line,
            action: action.to_string(),
        })?;

        let mut params = BTreeMap::new();
        if let Some(rest) = parts.next() {
            for param in param_tokens(rest) {
                match param.split_once('=') {
                    Some((name, value)) if !name.is_empty() => {
                        params.insert(name.to_string(), value.to_string());
                    }
                    _ => {
                        return Err(PolicyParseError::MalformedParam {
                            line,
                            param,
                        });
                    }
                }
            }
        }

        rules.push(GateRule {
            gate: gate.to_string(),
            trigger: trigger.to_string(),
            action,
            params,
        });
    }
    Ok(rules)
}

pub fn render_policy_text(rules: &[GateRule]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str(&format!("{}:{}:{}", rule.gate, rule.trigger, rule.action));
        if !rule.params.is_empty() {
            let params = rule
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            out.push(':');
            out.push_str(&params);
        }
        out.push('\n');
    }
    out
}

pub fn parse_whitelist_text(input: &str) -> Result<Vec<WhitelistItem>, PolicyParseError> {
    let mut items = Vec::new();
    for (line, text) in content_lines(input) {
        let mut parts = text.splitn(3, ':').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(gate), Some(trigger), Some(id))
                if !gate.is_empty() && !trigger.is_empty() && !id.is_empty() =>
            {
                items.push(WhitelistItem::new(gate, trigger, id));
            }
            _ => {
                return Err(PolicyParseError::MalformedWhitelist {
                    line,
                    text: text.to_string(),
                });
            }
        }
    }
    Ok(items)
}

pub fn render_whitelist_text(items: &[WhitelistItem]) -> String {
    items
        .iter()
        .map(|i| format!("{}:{}:{}\n", i.gate, i.trigger, i.id))
        .collect()
}
