//! Stable identifiers for gates, triggers, and trigger parameters.
//!
//! Gate and trigger names are upper-case tokens. They appear verbatim in policy files, bundles,
//! whitelists, and findings, so they must never change once published.

// Gates
pub const GATE_DOCKERFILECHECK: &str = "DOCKERFILECHECK";
pub const GATE_PKGBLACKLIST: &str = "PKGBLACKLIST";
pub const GATE_PKGDIFF: &str = "PKGDIFF";
pub const GATE_SUIDDIFF: &str = "SUIDDIFF";
pub const GATE_SUIDCHECK: &str = "SUIDCHECK";
pub const GATE_FILECHECK: &str = "FILECHECK";
pub const GATE_IMAGECHECK: &str = "IMAGECHECK";

// Triggers: DOCKERFILECHECK
pub const TRIGGER_NOFROM: &str = "NOFROM";
pub const TRIGGER_FROMSCRATCH: &str = "FROMSCRATCH";
pub const TRIGGER_NOTAG: &str = "NOTAG";
pub const TRIGGER_SUDO: &str = "SUDO";
pub const TRIGGER_EXPOSE: &str = "EXPOSE";
pub const TRIGGER_NOHEALTHCHECK: &str = "NOHEALTHCHECK";
pub const TRIGGER_EFFECTIVEUSER: &str = "EFFECTIVEUSER";

// Triggers: PKGBLACKLIST
pub const TRIGGER_PKGNAMEMATCH: &str = "PKGNAMEMATCH";
pub const TRIGGER_PKGFULLMATCH: &str = "PKGFULLMATCH";

// Triggers: PKGDIFF
pub const TRIGGER_PKGADD: &str = "PKGADD";
pub const TRIGGER_PKGDEL: &str = "PKGDEL";
pub const TRIGGER_PKGVERSIONDIFF: &str = "PKGVERSIONDIFF";

// Triggers: SUIDDIFF
pub const TRIGGER_SUIDFILEADD: &str = "SUIDFILEADD";
pub const TRIGGER_SUIDFILEDEL: &str = "SUIDFILEDEL";

// Triggers: SUIDCHECK
pub const TRIGGER_SUIDFILE: &str = "SUIDFILE";

// Triggers: FILECHECK
pub const TRIGGER_FILENAMEMATCH: &str = "FILENAMEMATCH";

// Triggers: IMAGECHECK
pub const TRIGGER_SIZEMAX: &str = "SIZEMAX";

// Params
pub const PARAM_ALLOWEDPORTS: &str = "ALLOWEDPORTS";
pub const PARAM_DENIEDPORTS: &str = "DENIEDPORTS";
pub const PARAM_ALLOWED: &str = "ALLOWED";
pub const PARAM_DENIED: &str = "DENIED";
pub const PARAM_BLACKLIST_NAMEMATCH: &str = "BLACKLIST_NAMEMATCH";
pub const PARAM_BLACKLIST_FULLMATCH: &str = "BLACKLIST_FULLMATCH";
pub const PARAM_FILECHECK_NAMEMATCH: &str = "FILECHECK_NAMEMATCH";
pub const PARAM_MAXBYTES: &str = "MAXBYTES";

/// Gate and trigger name of the terminal verdict sentinel appended to every result.
pub const FINAL: &str = "FINAL";

/// Policy id reported for an ad hoc `--policy <file>` evaluation.
pub const ADHOC_POLICY_ID: &str = "adhoc";

/// Policy id reported when a per-image stored policy or the global policy file is used.
pub const IMAGE_POLICY_ID: &str = "image";
pub const GLOBAL_POLICY_ID: &str = "global";

/// Whitelist id reported for items loaded from a `--global-whitelist` file.
pub const GLOBAL_WHITELIST_ID: &str = "global";

/// Wildcard token accepted in mapping patterns and whitelist ids.
pub const WILDCARD: &str = "*";
