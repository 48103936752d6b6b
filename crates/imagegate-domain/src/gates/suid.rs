use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::diff::diff;
use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;

pub(super) const DIFF_TRIGGERS: &[TriggerSpec] = &[
    TriggerSpec {
        name: ids::TRIGGER_SUIDFILEADD,
        description: "a setuid file was added relative to the base image",
        params: &[],
        needs_base: true,
        eval: suid_added,
    },
    TriggerSpec {
        name: ids::TRIGGER_SUIDFILEDEL,
        description: "a setuid file of the base image is gone",
        params: &[],
        needs_base: true,
        eval: suid_removed,
    },
];

pub(super) const CHECK_TRIGGERS: &[TriggerSpec] = &[TriggerSpec {
    name: ids::TRIGGER_SUIDFILE,
    description: "a setuid file is present that no ALLOWED glob matches",
    params: &[ParamSpec {
        name: ids::PARAM_ALLOWED,
        description: "glob patterns of permitted setuid files",
        example: "/usr/bin/passwd,/bin/su",
    }],
    needs_base: false,
    eval: suid_file,
}];

fn suid_added(ctx: &GateContext<'_>, _params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let base = ctx.base.ok_or(TriggerError::MissingBase)?;
    Ok(diff(ctx.report, base)
        .added_suid_files
        .into_iter()
        .map(|path| {
            let message = format!("setuid file '{path}' was added relative to base image");
            RawFinding::with_id(path, message)
        })
        .collect())
}

fn suid_removed(
    ctx: &GateContext<'_>,
    _params: &Params<'_>,
) -> Result<Vec<RawFinding>, TriggerError> {
    let base = ctx.base.ok_or(TriggerError::MissingBase)?;
    Ok(diff(ctx.report, base)
        .removed_suid_files
        .into_iter()
        .map(|path| {
            let message = format!("setuid file '{path}' was removed relative to base image");
            RawFinding::with_id(path, message)
        })
        .collect())
}

fn suid_file(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let allowed = params.globs(ids::PARAM_ALLOWED)?;
    Ok(ctx
        .report
        .suid_files
        .iter()
        .filter(|(path, _)| !allowed.as_ref().is_some_and(|set| set.is_match(path.as_str())))
        .map(|(path, meta)| {
            let mode = meta.mode.as_deref().unwrap_or("unknown");
            RawFinding::with_id(
                path.clone(),
                format!("setuid file '{path}' (mode {mode}) is present"),
            )
        })
        .collect())
}
