use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;

pub(super) const TRIGGERS: &[TriggerSpec] = &[TriggerSpec {
    name: ids::TRIGGER_SIZEMAX,
    description: "the image is larger than MAXBYTES",
    params: &[ParamSpec {
        name: ids::PARAM_MAXBYTES,
        description: "largest permitted image size in bytes",
        example: "1073741824",
    }],
    needs_base: false,
    eval: size_max,
}];

fn size_max(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(max) = params.u64(ids::PARAM_MAXBYTES)? else {
        return Ok(Vec::new());
    };
    let size = ctx.report.size_bytes;
    if size <= max {
        return Ok(Vec::new());
    }
    Ok(vec![RawFinding::new(format!(
        "image size {size} bytes exceeds MAXBYTES={max}"
    ))])
}
