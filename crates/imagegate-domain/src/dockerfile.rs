//! Minimal Dockerfile instruction reader used by the DOCKERFILECHECK gate.
//!
//! Handles `#` comments, `\` line continuations and case-insensitive keywords. It does not expand
//! variables or evaluate parser directives.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Upper-cased keyword (`FROM`, `RUN`, ...).
    pub keyword: String,
    /// Everything after the keyword, continuation lines joined with a single space.
    pub args: String,
    /// 1-based line of the keyword.
    pub line: usize,
}

pub fn parse(contents: &str) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let trimmed = raw.trim();

        if pending.is_none() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        // Comment lines inside a continuation are skipped, not terminators.
        if pending.is_some() && trimmed.starts_with('#') {
            continue;
        }

        let (body, continues) = match trimmed.strip_suffix('\\') {
            Some(rest) => (rest.trim_end(), true),
            None => (trimmed, false),
        };

        let (start, mut text) = pending.take().unwrap_or((idx + 1, String::new()));
        if !body.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(body);
        }

        if continues {
            pending = Some((start, text));
        } else if let Some(instruction) = split_instruction(start, &text) {
            out.push(instruction);
        }
    }

    if let Some((start, text)) = pending
        && let Some(instruction) = split_instruction(start, &text)
    {
        out.push(instruction);
    }

    out
}

fn split_instruction(line: usize, text: &str) -> Option<Instruction> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (keyword, args) = match text.split_once(char::is_whitespace) {
        Some((k, a)) => (k, a.trim()),
        None => (text, ""),
    };
    Some(Instruction {
        keyword: keyword.to_ascii_uppercase(),
        args: args.to_string(),
        line,
    })
}

/// A parsed `FROM` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FromImage {
    pub reference: String,
    pub stage: Option<String>,
    pub line: usize,
}

impl FromImage {
    pub fn is_scratch(&self) -> bool {
        self.reference.eq_ignore_ascii_case("scratch")
    }

    /// Tag portion of the reference, if any. A digest-pinned reference reports `None` here; use
    /// [`FromImage::is_pinned`] for the combined check.
    pub fn tag(&self) -> Option<&str> {
        let name = self.reference.split('@').next().unwrap_or(&self.reference);
        let last = name.rsplit('/').next().unwrap_or(name);
        last.split_once(':').map(|(_, tag)| tag)
    }

    pub fn is_pinned(&self) -> bool {
        if self.reference.contains('@') {
            return true;
        }
        matches!(self.tag(), Some(tag) if !tag.is_empty() && tag != "latest")
    }
}

/// `FROM` instructions in order, skipping `--platform=...` style flags.
pub fn from_images(instructions: &[Instruction]) -> Vec<FromImage> {
    instructions
        .iter()
        .filter(|i| i.keyword == "FROM")
        .filter_map(|i| {
            let mut words = i.args.split_whitespace().filter(|w| !w.starts_with("--"));
            let reference = words.next()?.to_string();
            let stage = match (words.next(), words.next()) {
                (Some(kw), Some(name)) if kw.eq_ignore_ascii_case("as") => Some(name.to_string()),
                _ => None,
            };
            Some(FromImage {
                reference,
                stage,
                line: i.line,
            })
        })
        .collect()
}

/// Exposed ports (protocol suffix removed), in instruction order, deduplicated.
pub fn exposed_ports(instructions: &[Instruction]) -> Vec<String> {
    let mut ports: Vec<String> = Vec::new();
    for inst in instructions.iter().filter(|i| i.keyword == "EXPOSE") {
        for word in inst.args.split_whitespace() {
            let port = word.split('/').next().unwrap_or(word).to_string();
            if !port.is_empty() && !ports.contains(&port) {
                ports.push(port);
            }
        }
    }
    ports
}

/// User from the last `USER` instruction (group stripped), or `root`.
pub fn effective_user(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .rev()
        .find(|i| i.keyword == "USER")
        .and_then(|i| i.args.split_whitespace().next())
        .map(|spec| spec.split(':').next().unwrap_or(spec).to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "root".to_string())
}

/// Whether a shell command string runs `sudo` as one of its commands.
pub fn invokes_sudo(command: &str) -> bool {
    command
        .split(|c: char| c.is_whitespace() || matches!(c, ';' | '&' | '|' | '(' | ')' | '`'))
        .any(|word| word == "sudo")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_continuations_and_skips_comments() {
        let text = "\
# syntax comment
from alpine:3.19 AS build
RUN apk add curl \\
    # inline comment
    && sudo make install

USER app:app
";
        let parsed = parse(text);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].keyword, "FROM");
        assert_eq!(parsed[0].line, 2);
        assert_eq!(parsed[1].keyword, "RUN");
        assert_eq!(parsed[1].args, "apk add curl && sudo make install");
        assert_eq!(parsed[1].line, 3);
        assert_eq!(effective_user(&parsed), "app");
    }

    #[test]
    fn trailing_continuation_at_eof_is_kept() {
        let parsed = parse("FROM busybox\nRUN echo hi \\");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].args, "echo hi");
    }

    #[test]
    fn from_image_pinning() {
        let parsed = parse(
            "FROM --platform=linux/amd64 registry.local:5000/base AS b\n\
             FROM centos:latest\n\
             FROM debian:12\n\
             FROM alpine@sha256:abcd\n\
             FROM scratch",
        );
        let froms = from_images(&parsed);
        assert_eq!(froms.len(), 5);
        assert_eq!(froms[0].reference, "registry.local:5000/base");
        assert_eq!(froms[0].stage.as_deref(), Some("b"));
        assert_eq!(froms[0].tag(), None);
        assert!(!froms[0].is_pinned());
        assert!(!froms[1].is_pinned());
        assert!(froms[2].is_pinned());
        assert!(froms[3].is_pinned());
        assert!(froms[4].is_scratch());
    }

    #[test]
    fn exposed_ports_strip_protocol_and_dedupe() {
        let parsed = parse("EXPOSE 80/tcp 443\nEXPOSE 80 53/udp");
        assert_eq!(exposed_ports(&parsed), vec!["80", "443", "53"]);
    }

    #[test]
    fn default_user_is_root() {
        assert_eq!(effective_user(&parse("FROM alpine")), "root");
    }

    #[test]
    fn sudo_detection_requires_whole_word() {
        assert!(invokes_sudo("apt-get update && sudo apt-get install x"));
        assert!(invokes_sudo("sudo -u app ls"));
        assert!(!invokes_sudo("echo pseudocode"));
        assert!(!invokes_sudo("apt-get install sudo-ldap"));
    }
}
