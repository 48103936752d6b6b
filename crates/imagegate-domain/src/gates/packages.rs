use super::utils::invalid;
use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;

pub(super) const TRIGGERS: &[TriggerSpec] = &[
    TriggerSpec {
        name: ids::TRIGGER_PKGNAMEMATCH,
        description: "an installed package name is listed in BLACKLIST_NAMEMATCH",
        params: &[ParamSpec {
            name: ids::PARAM_BLACKLIST_NAMEMATCH,
            description: "package names",
            example: "telnet,netcat",
        }],
        needs_base: false,
        eval: name_match,
    },
    TriggerSpec {
        name: ids::TRIGGER_PKGFULLMATCH,
        description: "an installed package matches a name|version entry in BLACKLIST_FULLMATCH",
        params: &[ParamSpec {
            name: ids::PARAM_BLACKLIST_FULLMATCH,
            description: "name|version pairs",
            example: "openssl|1.0.1e,bash|4.3",
        }],
        needs_base: false,
        eval: full_match,
    },
];

fn name_match(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(names) = params.list(ids::PARAM_BLACKLIST_NAMEMATCH) else {
        return Ok(Vec::new());
    };
    Ok(names
        .into_iter()
        .filter(|name| ctx.report.packages.contains_key(*name))
        .map(|name| {
            RawFinding::with_id(name, format!("blacklisted package '{name}' is installed"))
        })
        .collect())
}

fn full_match(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(entries) = params.list(ids::PARAM_BLACKLIST_FULLMATCH) else {
        return Ok(Vec::new());
    };

    let mut pairs = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some((name, version)) = entry.split_once('|') else {
            return Err(invalid(
                ids::PARAM_BLACKLIST_FULLMATCH,
                entry,
                "expected name|version",
            ));
        };
        pairs.push((name.trim(), version.trim()));
    }

    Ok(pairs
        .into_iter()
        .filter(|(name, version)| {
            ctx.report
                .packages
                .get(*name)
                .is_some_and(|meta| meta.version == *version)
        })
        .map(|(name, version)| {
            RawFinding::with_id(
                name,
                format!("blacklisted package '{name}' version {version} is installed"),
            )
        })
        .collect())
}
