use imagegate_types::{Action, GateRule, ids};

pub const DEFAULT_PRESET: &str = "default";

/// Built-in policies, used when no bundle, per-image policy, or global policy file applies.
///
/// Keep these small and readable. Anything site-specific belongs in a policy file or bundle.
pub fn preset(name: &str) -> Option<Vec<GateRule>> {
    match name {
        "default" => Some(default_policy()),
        "strict" => Some(strict_policy()),
        "none" => Some(Vec::new()),
        _ => None,
    }
}

pub fn preset_names() -> &'static [&'static str] {
    &["default", "strict", "none"]
}

fn default_policy() -> Vec<GateRule> {
    vec![
        GateRule::new(ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOFROM, Action::Stop),
        GateRule::new(ids::GATE_DOCKERFILECHECK, ids::TRIGGER_FROMSCRATCH, Action::Warn),
        GateRule::new(ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOTAG, Action::Warn),
        GateRule::new(ids::GATE_DOCKERFILECHECK, ids::TRIGGER_SUDO, Action::Warn),
        GateRule::new(ids::GATE_SUIDDIFF, ids::TRIGGER_SUIDFILEADD, Action::Stop),
        GateRule::new(ids::GATE_SUIDDIFF, ids::TRIGGER_SUIDFILEDEL, Action::Warn),
        GateRule::new(ids::GATE_PKGDIFF, ids::TRIGGER_PKGVERSIONDIFF, Action::Warn),
        GateRule::new(ids::GATE_PKGDIFF, ids::TRIGGER_PKGADD, Action::Warn),
        GateRule::new(ids::GATE_PKGDIFF, ids::TRIGGER_PKGDEL, Action::Warn),
    ]
}

fn strict_policy() -> Vec<GateRule> {
    let mut rules: Vec<GateRule> = default_policy()
        .into_iter()
        .map(|mut r| {
            r.action = Action::Stop;
            r
        })
        .collect();
    rules.push(GateRule::new(
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EFFECTIVEUSER,
        Action::Stop,
    ));
    rules.push(
        GateRule::new(ids::GATE_DOCKERFILECHECK, ids::TRIGGER_EXPOSE, Action::Stop)
            .with_param(ids::PARAM_DENIEDPORTS, "22,23"),
    );
    rules.push(
        GateRule::new(ids::GATE_FILECHECK, ids::TRIGGER_FILENAMEMATCH, Action::Stop)
            .with_param(ids::PARAM_FILECHECK_NAMEMATCH, "**/id_rsa,**/*.pem,**/.aws/credentials"),
    );
    rules
}
