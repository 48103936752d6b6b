//! Config parsing, legacy policy text formats, and built-in policy presets.
//!
//! This crate is IO-free: callers read files and environment variables and hand the contents in.

#![forbid(unsafe_code)]

mod model;
mod policy_text;
mod presets;
mod resolve;

pub use model::ImagegateConfigV1;
pub use policy_text::{
    PolicyParseError, parse_policy_text, parse_whitelist_text, render_policy_text,
    render_whitelist_text,
};
pub use presets::{DEFAULT_PRESET, preset, preset_names};
pub use resolve::{EffectiveSettings, Overrides, apply_override, parse_override};

/// Parse `imagegate.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<ImagegateConfigV1> {
    let cfg: ImagegateConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the settings used by the app (defaults + config file + overrides).
pub fn resolve_settings(
    cfg: ImagegateConfigV1,
    overrides: Overrides,
) -> anyhow::Result<EffectiveSettings> {
    resolve::resolve_settings(cfg, overrides)
}
