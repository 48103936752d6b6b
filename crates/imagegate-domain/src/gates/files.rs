use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;

pub(super) const TRIGGERS: &[TriggerSpec] = &[TriggerSpec {
    name: ids::TRIGGER_FILENAMEMATCH,
    description: "a file path matches one of the FILECHECK_NAMEMATCH globs",
    params: &[ParamSpec {
        name: ids::PARAM_FILECHECK_NAMEMATCH,
        description: "glob patterns of forbidden paths",
        example: "**/*.pem,**/id_rsa",
    }],
    needs_base: false,
    eval: name_match,
}];

fn name_match(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(globs) = params.globs(ids::PARAM_FILECHECK_NAMEMATCH)? else {
        return Ok(Vec::new());
    };
    Ok(ctx
        .report
        .files
        .keys()
        .filter(|path| globs.is_match(path.as_str()))
        .map(|path| {
            RawFinding::with_id(
                path.clone(),
                format!("file '{path}' matches a forbidden name pattern"),
            )
        })
        .collect())
}
