use super::utils::is_listed;
use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::diff::diff;
use crate::model::{GateContext, RawFinding};
use imagegate_types::{ImageDiff, ids};

const ALLOWED: &[ParamSpec] = &[ParamSpec {
    name: ids::PARAM_ALLOWED,
    description: "package names that may change",
    example: "ca-certificates,tzdata",
}];

pub(super) const TRIGGERS: &[TriggerSpec] = &[
    TriggerSpec {
        name: ids::TRIGGER_PKGADD,
        description: "a package was added on top of the base image",
        params: ALLOWED,
        needs_base: true,
        eval: added,
    },
    TriggerSpec {
        name: ids::TRIGGER_PKGDEL,
        description: "a package of the base image was removed",
        params: ALLOWED,
        needs_base: true,
        eval: removed,
    },
    TriggerSpec {
        name: ids::TRIGGER_PKGVERSIONDIFF,
        description: "a package's version differs from the base image",
        params: ALLOWED,
        needs_base: true,
        eval: changed,
    },
];

fn base_diff(ctx: &GateContext<'_>) -> Result<ImageDiff, TriggerError> {
    let base = ctx.base.ok_or(TriggerError::MissingBase)?;
    Ok(diff(ctx.report, base))
}

fn report(
    names: &[String],
    params: &Params<'_>,
    describe: impl Fn(&str) -> String,
) -> Vec<RawFinding> {
    let allowed = params.list(ids::PARAM_ALLOWED);
    names
        .iter()
        .filter(|name| !is_listed(allowed.as_deref(), name))
        .map(|name| RawFinding::with_id(name.clone(), describe(name)))
        .collect()
}

fn added(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let d = base_diff(ctx)?;
    Ok(report(&d.added_packages, params, |name| {
        format!("package '{name}' was added relative to base image")
    }))
}

fn removed(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let d = base_diff(ctx)?;
    Ok(report(&d.removed_packages, params, |name| {
        format!("package '{name}' was removed relative to base image")
    }))
}

fn changed(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let base = ctx.base.ok_or(TriggerError::MissingBase)?;
    let d = diff(ctx.report, base);
    Ok(report(&d.changed_packages, params, |name| {
        let from = base.packages.get(name).map(|m| m.version.as_str());
        let to = ctx.report.packages.get(name).map(|m| m.version.as_str());
        format!(
            "package '{name}' version changed from {} to {}",
            from.unwrap_or("?"),
            to.unwrap_or("?")
        )
    }))
}
