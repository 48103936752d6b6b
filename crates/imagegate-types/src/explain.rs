//! Explain registry for gates.
//!
//! Maps gate names to human-readable explanations with remediation guidance. Trigger-level
//! details (parameters, firing conditions) live next to the trigger implementations.

use crate::ids;

/// Explanation entry for a gate.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Short description of the gate.
    pub title: &'static str,
    /// What the gate inspects and why it exists.
    pub description: &'static str,
    /// How to resolve findings.
    pub remediation: &'static str,
    /// Policy lines showing typical use.
    pub examples: ExamplePair,
}

/// Before and after examples.
#[derive(Debug, Clone)]
pub struct ExamplePair {
    /// A policy or image fact that produces findings.
    pub before: &'static str,
    /// The same after remediation.
    pub after: &'static str,
}

/// Look up an explanation by gate name.
///
/// Returns `None` if the gate is not recognized.
pub fn lookup_explanation(gate: &str) -> Option<Explanation> {
    match gate {
        ids::GATE_DOCKERFILECHECK => Some(explain_dockerfile_check()),
        ids::GATE_PKGBLACKLIST => Some(explain_pkg_blacklist()),
        ids::GATE_PKGDIFF => Some(explain_pkg_diff()),
        ids::GATE_SUIDDIFF => Some(explain_suid_diff()),
        ids::GATE_SUIDCHECK => Some(explain_suid_check()),
        ids::GATE_FILECHECK => Some(explain_file_check()),
        ids::GATE_IMAGECHECK => Some(explain_image_check()),
        _ => None,
    }
}

/// List all known gate names.
pub fn all_gate_names() -> &'static [&'static str] {
    &[
        ids::GATE_DOCKERFILECHECK,
        ids::GATE_PKGBLACKLIST,
        ids::GATE_PKGDIFF,
        ids::GATE_SUIDDIFF,
        ids::GATE_SUIDCHECK,
        ids::GATE_FILECHECK,
        ids::GATE_IMAGECHECK,
    ]
}

fn explain_dockerfile_check() -> Explanation {
    Explanation {
        title: "Dockerfile Checks",
        description: "\
Inspects the Dockerfile recorded by the analyzer.

Images built without a recorded Dockerfile, from an unpinned base, or with
risky instructions are harder to reproduce and audit:
- NOFROM fires when there is no Dockerfile or it has no FROM instruction
- NOTAG fires when the base image is untagged or uses `latest`
- SUDO, EXPOSE and EFFECTIVEUSER inspect RUN, EXPOSE and USER instructions",
        remediation: "\
Build from a pinned base image, run as an unprivileged user, and expose only
the ports the service needs.",
        examples: ExamplePair {
            before: "\
FROM centos
EXPOSE 22
RUN sudo yum install -y httpd",
            after: "\
FROM centos:7.9.2009
EXPOSE 8080
USER app",
        },
    }
}

fn explain_pkg_blacklist() -> Explanation {
    Explanation {
        title: "Package Blacklist",
        description: "\
Fails images that contain packages named in the policy, either by name alone
(PKGNAMEMATCH) or by an exact name and version (PKGFULLMATCH).",
        remediation: "\
Remove the package from the image, or upgrade it past the listed version.",
        examples: ExamplePair {
            before: "PKGBLACKLIST:PKGNAMEMATCH:STOP:BLACKLIST_NAMEMATCH=telnet,netcat",
            after: "PKGBLACKLIST:PKGFULLMATCH:STOP:BLACKLIST_FULLMATCH=openssl|1.0.1e",
        },
    }
}

fn explain_pkg_diff() -> Explanation {
    Explanation {
        title: "Package Changes From Base",
        description: "\
Compares installed packages with the image's declared base image (the root of
its family tree) and reports packages that were added, removed, or changed
version on top of the base.",
        remediation: "\
Install only the packages the application needs, or list the expected changes
in the ALLOWED parameter.",
        examples: ExamplePair {
            before: "PKGDIFF:PKGADD:WARN",
            after: "PKGDIFF:PKGADD:WARN:ALLOWED=ca-certificates,tzdata",
        },
    }
}

fn explain_suid_diff() -> Explanation {
    Explanation {
        title: "Setuid Changes From Base",
        description: "\
Reports setuid files added or removed relative to the image's base image.",
        remediation: "\
Drop the setuid bit from files that do not need it (`chmod u-s <file>`).",
        examples: ExamplePair {
            before: "SUIDDIFF:SUIDFILEADD:STOP",
            after: "SUIDDIFF:SUIDFILEADD:WARN",
        },
    }
}

fn explain_suid_check() -> Explanation {
    Explanation {
        title: "Setuid Files",
        description: "\
Reports every setuid file in the image that is not matched by an allowed glob.",
        remediation: "\
Remove the setuid bit or add the path to the ALLOWED parameter.",
        examples: ExamplePair {
            before: "SUIDCHECK:SUIDFILE:STOP",
            after: "SUIDCHECK:SUIDFILE:STOP:ALLOWED=/usr/bin/passwd,/bin/su",
        },
    }
}

fn explain_file_check() -> Explanation {
    Explanation {
        title: "File Name Checks",
        description: "\
Reports files whose path matches one of the configured globs, e.g. private keys
or package manager caches left in the image.",
        remediation: "\
Delete the files in the same layer that created them, or use a multi-stage build.",
        examples: ExamplePair {
            before: "FILECHECK:FILENAMEMATCH:STOP:FILECHECK_NAMEMATCH=**/*.pem,**/id_rsa",
            after: "FILECHECK:FILENAMEMATCH:WARN:FILECHECK_NAMEMATCH=/var/cache/**",
        },
    }
}

fn explain_image_check() -> Explanation {
    Explanation {
        title: "Image Checks",
        description: "\
Checks image-level metadata such as the on-disk size.",
        remediation: "\
Use a smaller base image and remove build-time dependencies.",
        examples: ExamplePair {
            before: "IMAGECHECK:SIZEMAX:WARN:MAXBYTES=104857600",
            after: "IMAGECHECK:SIZEMAX:STOP:MAXBYTES=1073741824",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_gate_has_an_explanation() {
        for gate in all_gate_names() {
            assert!(lookup_explanation(gate).is_some(), "missing {gate}");
        }
    }

    #[test]
    fn unknown_gate_is_none() {
        assert!(lookup_explanation("NOSUCHGATE").is_none());
    }
}
