use imagegate_types::{
    Action, AnalysisReport, FileMeta, Finding, GateRule, Mapping, PackageMeta, PolicyBundle,
    UserType,
};
use std::collections::BTreeMap;
use time::macros::datetime;

pub fn report(image_id: &str) -> AnalysisReport {
    AnalysisReport {
        image_id: image_id.to_string(),
        family_tree: Vec::new(),
        current_tags: Vec::new(),
        all_tags: Vec::new(),
        dockerfile_contents: None,
        packages: BTreeMap::new(),
        files: BTreeMap::new(),
        suid_files: BTreeMap::new(),
        size_bytes: 0,
        user_type: UserType::None,
        analyzed_at: datetime!(2024-01-01 0:00 UTC),
    }
}

pub fn with_dockerfile(mut r: AnalysisReport, contents: &str) -> AnalysisReport {
    r.dockerfile_contents = Some(contents.to_string());
    r
}

pub fn with_packages(mut r: AnalysisReport, packages: &[(&str, &str)]) -> AnalysisReport {
    for (name, version) in packages {
        r.packages.insert(
            name.to_string(),
            PackageMeta {
                version: version.to_string(),
            },
        );
    }
    r
}

pub fn with_files(mut r: AnalysisReport, paths: &[&str]) -> AnalysisReport {
    for path in paths {
        r.files.insert(path.to_string(), FileMeta::default());
    }
    r
}

pub fn with_suid(mut r: AnalysisReport, paths: &[&str]) -> AnalysisReport {
    for path in paths {
        r.suid_files.insert(
            path.to_string(),
            FileMeta {
                mode: Some("4755".to_string()),
                size: None,
            },
        );
    }
    r
}

pub fn rule(gate: &str, trigger: &str, action: Action) -> GateRule {
    GateRule::new(gate, trigger, action)
}

pub fn finding(gate: &str, trigger: &str, id: Option<&str>, action: Action) -> Finding {
    Finding {
        gate: gate.to_string(),
        trigger: trigger.to_string(),
        id: id.map(str::to_string),
        action,
        message: format!("{gate}:{trigger}"),
        whitelisted: false,
    }
}

pub fn mapping(registry: &str, repository: &str, tag: &str, policy_id: &str) -> Mapping {
    Mapping {
        name: None,
        registry: registry.to_string(),
        repository: repository.to_string(),
        tag: tag.to_string(),
        policy_id: policy_id.to_string(),
        whitelist_ids: Vec::new(),
    }
}

/// A bundle with one single-rule policy per distinct policy id referenced by `mappings`.
pub fn bundle_with_mappings(mappings: Vec<Mapping>) -> PolicyBundle {
    let mut policies = BTreeMap::new();
    for m in &mappings {
        policies
            .entry(m.policy_id.clone())
            .or_insert_with(|| vec![rule("DOCKERFILECHECK", "NOFROM", Action::Stop)]);
    }
    PolicyBundle {
        id: "test-bundle".to_string(),
        name: "test".to_string(),
        synced_at: None,
        policies,
        whitelists: BTreeMap::new(),
        mappings,
    }
}
