use super::{Gate, GateRegistry, Params, TriggerError};
use crate::model::{GateContext, RawFinding};
use crate::test_support::{report, with_dockerfile, with_files, with_packages, with_suid};
use imagegate_types::{AnalysisReport, ids};
use std::collections::BTreeMap;

fn run(
    ctx: &GateContext<'_>,
    gate: &str,
    trigger: &str,
    params: &[(&str, &str)],
) -> Result<Vec<RawFinding>, TriggerError> {
    let (_, spec) = GateRegistry::builtin()
        .lookup(gate, trigger)
        .expect("trigger is registered");
    let raw: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (spec.eval)(ctx, &Params::new(&raw))
}

fn ids_of(findings: &[RawFinding]) -> Vec<Option<&str>> {
    findings.iter().map(|f| f.id.as_deref()).collect()
}

fn dockerfile(contents: &str) -> AnalysisReport {
    with_dockerfile(report("img"), contents)
}

#[test]
fn registry_covers_every_gate() {
    let registry = GateRegistry::new();
    assert_eq!(registry.len(), 17);
    for gate in Gate::ALL {
        assert_eq!(Gate::parse(gate.name()), Some(gate));
        for spec in gate.triggers() {
            let (found, _) = registry
                .lookup(gate.name(), spec.name)
                .expect("registered trigger");
            assert_eq!(found, gate);
        }
    }
    assert!(registry.lookup("DOCKERFILECHECK", "nofrom").is_none());
}

#[test]
fn nofrom_fires_without_dockerfile_or_from() {
    let missing = report("img");
    let out = run(&GateContext::new(&missing), ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOFROM, &[])
        .expect("eval");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, None);

    let no_from = dockerfile("RUN echo hi");
    let out = run(&GateContext::new(&no_from), ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOFROM, &[])
        .expect("eval");
    assert_eq!(out[0].message, "Dockerfile has no FROM instruction");

    let ok = dockerfile("FROM alpine:3.19");
    let out = run(&GateContext::new(&ok), ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOFROM, &[])
        .expect("eval");
    assert!(out.is_empty());
}

#[test]
fn fromscratch_and_notag() {
    let image = dockerfile(
        "FROM golang:latest AS build\nFROM build\nFROM scratch\nFROM debian\nFROM alpine:3.19",
    );
    let ctx = GateContext::new(&image);

    let scratch = run(&ctx, ids::GATE_DOCKERFILECHECK, ids::TRIGGER_FROMSCRATCH, &[]).expect("eval");
    assert_eq!(scratch.len(), 1);

    let notag = run(&ctx, ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOTAG, &[]).expect("eval");
    assert_eq!(ids_of(&notag), vec![Some("golang:latest"), Some("debian")]);
}

#[test]
fn sudo_and_healthcheck() {
    let image = dockerfile("FROM alpine:3\nRUN sudo apk add curl\nRUN echo ok");
    let ctx = GateContext::new(&image);
    let sudo = run(&ctx, ids::GATE_DOCKERFILECHECK, ids::TRIGGER_SUDO, &[]).expect("eval");
    assert_eq!(sudo.len(), 1);
    assert!(sudo[0].message.starts_with("line 2:"));

    let hc = run(&ctx, ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOHEALTHCHECK, &[]).expect("eval");
    assert_eq!(hc.len(), 1);

    let healthy = dockerfile("FROM alpine:3\nHEALTHCHECK CMD true");
    let hc = run(
        &GateContext::new(&healthy),
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_NOHEALTHCHECK,
        &[],
    )
    .expect("eval");
    assert!(hc.is_empty());
}

#[test]
fn expose_allowed_and_denied_ports() {
    let image = dockerfile("FROM alpine:3\nEXPOSE 22 80/tcp 443");
    let ctx = GateContext::new(&image);

    let all = run(&ctx, ids::GATE_DOCKERFILECHECK, ids::TRIGGER_EXPOSE, &[]).expect("eval");
    assert_eq!(ids_of(&all), vec![Some("22"), Some("80"), Some("443")]);

    let denied = run(
        &ctx,
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EXPOSE,
        &[(ids::PARAM_DENIEDPORTS, "22,23")],
    )
    .expect("eval");
    assert_eq!(ids_of(&denied), vec![Some("22")]);

    let allowed = run(
        &ctx,
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EXPOSE,
        &[(ids::PARAM_ALLOWEDPORTS, "80, 443")],
    )
    .expect("eval");
    assert_eq!(ids_of(&allowed), vec![Some("22")]);
    assert!(allowed[0].message.contains("not in ALLOWEDPORTS"));
}

#[test]
fn effective_user_rules() {
    let root = dockerfile("FROM alpine:3");
    let app = dockerfile("FROM alpine:3\nUSER app");

    let out = run(
        &GateContext::new(&root),
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EFFECTIVEUSER,
        &[],
    )
    .expect("eval");
    assert_eq!(ids_of(&out), vec![Some("root")]);

    let out = run(
        &GateContext::new(&app),
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EFFECTIVEUSER,
        &[],
    )
    .expect("eval");
    assert!(out.is_empty());

    let out = run(
        &GateContext::new(&app),
        ids::GATE_DOCKERFILECHECK,
        ids::TRIGGER_EFFECTIVEUSER,
        &[(ids::PARAM_ALLOWED, "nobody")],
    )
    .expect("eval");
    assert_eq!(ids_of(&out), vec![Some("app")]);
}

#[test]
fn package_blacklists() {
    let image = with_packages(report("img"), &[("openssl", "1.0.1e"), ("telnet", "0.17")]);
    let ctx = GateContext::new(&image);

    let names = run(
        &ctx,
        ids::GATE_PKGBLACKLIST,
        ids::TRIGGER_PKGNAMEMATCH,
        &[(ids::PARAM_BLACKLIST_NAMEMATCH, "netcat,telnet")],
    )
    .expect("eval");
    assert_eq!(ids_of(&names), vec![Some("telnet")]);

    let full = run(
        &ctx,
        ids::GATE_PKGBLACKLIST,
        ids::TRIGGER_PKGFULLMATCH,
        &[(ids::PARAM_BLACKLIST_FULLMATCH, "openssl|1.0.1e,telnet|9")],
    )
    .expect("eval");
    assert_eq!(ids_of(&full), vec![Some("openssl")]);

    let err = run(
        &ctx,
        ids::GATE_PKGBLACKLIST,
        ids::TRIGGER_PKGFULLMATCH,
        &[(ids::PARAM_BLACKLIST_FULLMATCH, "openssl")],
    )
    .unwrap_err();
    assert!(matches!(err, TriggerError::InvalidParam { .. }));
}

#[test]
fn package_diff_against_base_respects_allowed() {
    let base = with_packages(report("base"), &[("bash", "5.1"), ("vim", "9")]);
    let image = with_packages(
        report("img"),
        &[("bash", "5.2"), ("jq", "1.7"), ("tzdata", "2024a")],
    );
    let ctx = GateContext::new(&image).with_base(&base);

    let added = run(
        &ctx,
        ids::GATE_PKGDIFF,
        ids::TRIGGER_PKGADD,
        &[(ids::PARAM_ALLOWED, "tzdata")],
    )
    .expect("eval");
    assert_eq!(ids_of(&added), vec![Some("jq")]);

    let removed = run(&ctx, ids::GATE_PKGDIFF, ids::TRIGGER_PKGDEL, &[]).expect("eval");
    assert_eq!(ids_of(&removed), vec![Some("vim")]);

    let changed = run(&ctx, ids::GATE_PKGDIFF, ids::TRIGGER_PKGVERSIONDIFF, &[]).expect("eval");
    assert_eq!(ids_of(&changed), vec![Some("bash")]);
    assert_eq!(
        changed[0].message,
        "package 'bash' version changed from 5.1 to 5.2"
    );

    let no_base = GateContext::new(&image);
    assert_eq!(
        run(&no_base, ids::GATE_PKGDIFF, ids::TRIGGER_PKGADD, &[]).unwrap_err(),
        TriggerError::MissingBase
    );
}

#[test]
fn image_is_its_own_base_yields_nothing() {
    let image = with_packages(report("img"), &[("bash", "5.2")]);
    let ctx = GateContext::new(&image).with_base(&image);
    let added = run(&ctx, ids::GATE_PKGDIFF, ids::TRIGGER_PKGADD, &[]).expect("eval");
    assert!(added.is_empty());
}

#[test]
fn suid_diff_and_check() {
    let base = with_suid(report("base"), &["/usr/bin/passwd", "/usr/bin/chfn"]);
    let image = with_suid(report("img"), &["/usr/bin/passwd", "/usr/local/bin/tool"]);
    let ctx = GateContext::new(&image).with_base(&base);

    let added = run(&ctx, ids::GATE_SUIDDIFF, ids::TRIGGER_SUIDFILEADD, &[]).expect("eval");
    assert_eq!(ids_of(&added), vec![Some("/usr/local/bin/tool")]);
    let removed = run(&ctx, ids::GATE_SUIDDIFF, ids::TRIGGER_SUIDFILEDEL, &[]).expect("eval");
    assert_eq!(ids_of(&removed), vec![Some("/usr/bin/chfn")]);

    let check = run(
        &ctx,
        ids::GATE_SUIDCHECK,
        ids::TRIGGER_SUIDFILE,
        &[(ids::PARAM_ALLOWED, "/usr/bin/*")],
    )
    .expect("eval");
    assert_eq!(ids_of(&check), vec![Some("/usr/local/bin/tool")]);
    assert!(check[0].message.contains("mode 4755"));
}

#[test]
fn file_name_globs() {
    let image = with_files(
        report("img"),
        &["/root/.ssh/id_rsa", "/etc/ssl/server.pem", "/usr/bin/env"],
    );
    let ctx = GateContext::new(&image);

    let out = run(
        &ctx,
        ids::GATE_FILECHECK,
        ids::TRIGGER_FILENAMEMATCH,
        &[(ids::PARAM_FILECHECK_NAMEMATCH, "**/*.pem,**/id_rsa")],
    )
    .expect("eval");
    assert_eq!(
        ids_of(&out),
        vec![Some("/etc/ssl/server.pem"), Some("/root/.ssh/id_rsa")]
    );

    let err = run(
        &ctx,
        ids::GATE_FILECHECK,
        ids::TRIGGER_FILENAMEMATCH,
        &[(ids::PARAM_FILECHECK_NAMEMATCH, "a[")],
    )
    .unwrap_err();
    assert!(matches!(err, TriggerError::InvalidParam { .. }));
}

#[test]
fn size_max() {
    let mut image = report("img");
    image.size_bytes = 2048;
    let ctx = GateContext::new(&image);

    let over = run(
        &ctx,
        ids::GATE_IMAGECHECK,
        ids::TRIGGER_SIZEMAX,
        &[(ids::PARAM_MAXBYTES, "1024")],
    )
    .expect("eval");
    assert_eq!(over.len(), 1);

    let under = run(
        &ctx,
        ids::GATE_IMAGECHECK,
        ids::TRIGGER_SIZEMAX,
        &[(ids::PARAM_MAXBYTES, "4096")],
    )
    .expect("eval");
    assert!(under.is_empty());

    let unset = run(&ctx, ids::GATE_IMAGECHECK, ids::TRIGGER_SIZEMAX, &[]).expect("eval");
    assert!(unset.is_empty());
}
