use super::utils::is_listed;
use super::{ParamSpec, Params, TriggerError, TriggerSpec};
use crate::dockerfile::{self, Instruction};
use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;

pub(super) const TRIGGERS: &[TriggerSpec] = &[
    TriggerSpec {
        name: ids::TRIGGER_NOFROM,
        description: "no Dockerfile was recorded, or it has no FROM instruction",
        params: &[],
        needs_base: false,
        eval: no_from,
    },
    TriggerSpec {
        name: ids::TRIGGER_FROMSCRATCH,
        description: "the Dockerfile builds FROM scratch",
        params: &[],
        needs_base: false,
        eval: from_scratch,
    },
    TriggerSpec {
        name: ids::TRIGGER_NOTAG,
        description: "a FROM image has no tag or uses 'latest'",
        params: &[],
        needs_base: false,
        eval: no_tag,
    },
    TriggerSpec {
        name: ids::TRIGGER_SUDO,
        description: "a RUN instruction invokes sudo",
        params: &[],
        needs_base: false,
        eval: sudo,
    },
    TriggerSpec {
        name: ids::TRIGGER_EXPOSE,
        description: "an exposed port is in DENIEDPORTS or, when ALLOWEDPORTS is set, not in it; \
                      with neither parameter every exposed port fires",
        params: &[
            ParamSpec {
                name: ids::PARAM_ALLOWEDPORTS,
                description: "ports that may be exposed",
                example: "80,443",
            },
            ParamSpec {
                name: ids::PARAM_DENIEDPORTS,
                description: "ports that must not be exposed",
                example: "22,23",
            },
        ],
        needs_base: false,
        eval: expose,
    },
    TriggerSpec {
        name: ids::TRIGGER_NOHEALTHCHECK,
        description: "the Dockerfile has no HEALTHCHECK instruction",
        params: &[],
        needs_base: false,
        eval: no_healthcheck,
    },
    TriggerSpec {
        name: ids::TRIGGER_EFFECTIVEUSER,
        description: "the effective USER (root when unset) is in DENIED or, when ALLOWED is set, \
                      not in it; with neither parameter fires for root",
        params: &[
            ParamSpec {
                name: ids::PARAM_ALLOWED,
                description: "users the image may run as",
                example: "app,nobody",
            },
            ParamSpec {
                name: ids::PARAM_DENIED,
                description: "users the image must not run as",
                example: "root",
            },
        ],
        needs_base: false,
        eval: effective_user,
    },
];

fn instructions(ctx: &GateContext<'_>) -> Option<Vec<Instruction>> {
    ctx.report.dockerfile_contents.as_deref().map(dockerfile::parse)
}

fn no_from(ctx: &GateContext<'_>, _params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(vec![RawFinding::new(
            "no Dockerfile was recorded for this image",
        )]);
    };
    if dockerfile::from_images(&parsed).is_empty() {
        return Ok(vec![RawFinding::new("Dockerfile has no FROM instruction")]);
    }
    Ok(Vec::new())
}

fn from_scratch(
    ctx: &GateContext<'_>,
    _params: &Params<'_>,
) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    Ok(dockerfile::from_images(&parsed)
        .into_iter()
        .filter(|f| f.is_scratch())
        .map(|f| RawFinding::new(format!("line {}: image is built FROM scratch", f.line)))
        .collect())
}

fn no_tag(ctx: &GateContext<'_>, _params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    let froms = dockerfile::from_images(&parsed);
    let stages: Vec<&str> = froms.iter().filter_map(|f| f.stage.as_deref()).collect();

    Ok(froms
        .iter()
        .filter(|f| !f.is_scratch() && !f.is_pinned())
        .filter(|f| !stages.contains(&f.reference.as_str()))
        .map(|f| {
            RawFinding::with_id(
                f.reference.clone(),
                format!(
                    "line {}: FROM image '{}' is not pinned to a tag other than 'latest'",
                    f.line, f.reference
                ),
            )
        })
        .collect())
}

fn sudo(ctx: &GateContext<'_>, _params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    Ok(parsed
        .iter()
        .filter(|i| i.keyword == "RUN" && dockerfile::invokes_sudo(&i.args))
        .map(|i| RawFinding::new(format!("line {}: RUN uses sudo: {}", i.line, i.args)))
        .collect())
}

fn expose(ctx: &GateContext<'_>, params: &Params<'_>) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    let allowed = params.list(ids::PARAM_ALLOWEDPORTS);
    let denied = params.list(ids::PARAM_DENIEDPORTS);

    let mut out = Vec::new();
    for port in dockerfile::exposed_ports(&parsed) {
        let reason = if is_listed(denied.as_deref(), &port) {
            Some("is in DENIEDPORTS")
        } else if allowed.is_some() && !is_listed(allowed.as_deref(), &port) {
            Some("is not in ALLOWEDPORTS")
        } else if allowed.is_none() && denied.is_none() {
            Some("is exposed")
        } else {
            None
        };
        if let Some(reason) = reason {
            let message = format!("Dockerfile exposes port {port}, which {reason}");
            out.push(RawFinding::with_id(port, message));
        }
    }
    Ok(out)
}

fn no_healthcheck(
    ctx: &GateContext<'_>,
    _params: &Params<'_>,
) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    if parsed.iter().any(|i| i.keyword == "HEALTHCHECK") {
        return Ok(Vec::new());
    }
    Ok(vec![RawFinding::new(
        "Dockerfile has no HEALTHCHECK instruction",
    )])
}

fn effective_user(
    ctx: &GateContext<'_>,
    params: &Params<'_>,
) -> Result<Vec<RawFinding>, TriggerError> {
    let Some(parsed) = instructions(ctx) else {
        return Ok(Vec::new());
    };
    let user = dockerfile::effective_user(&parsed);
    let allowed = params.list(ids::PARAM_ALLOWED);
    let denied = params.list(ids::PARAM_DENIED);

    let reason = if is_listed(denied.as_deref(), &user) {
        Some("is in DENIED")
    } else if allowed.is_some() && !is_listed(allowed.as_deref(), &user) {
        Some("is not in ALLOWED")
    } else if allowed.is_none() && denied.is_none() && user == "root" {
        Some("is root")
    } else {
        None
    };

    Ok(reason
        .map(|reason| {
            let message = format!("effective user '{user}' {reason}");
            vec![RawFinding::with_id(user, message)]
        })
        .unwrap_or_default())
}
