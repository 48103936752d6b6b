//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use imagegate_test_util::{copy_tree, fixtures_dir};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `debian:stable`, built FROM scratch.
pub const BASE: &str = "cae662172fd450bb0cd710a769079c05bfc5d8e35efa6576edc7d0377afdd4a2";
/// `acme/app:1.0`: adds curl and a setuid helper on top of BASE.
pub const APP: &str = "a172cedcae47474b615c54d510a5d84a8dea3032e958587430b413538be3f333";
/// `acme/clean:latest`: adds one config file on top of BASE.
pub const CLEAN: &str = "3b066804f6d1d077173cfe4d06002e6a61e6f21c2b2e648417962115f1afcd8e";
/// Not part of the fixture set; tests create it when they need a corrupt report.
pub const BROKEN: &str = "f526795c95399cea27c055c842c3d6ab018ed0fa4f66f701c28ab22dec28237b";

/// Wraps the deprecated cargo_bin to centralize the deprecation warning.
#[allow(deprecated)]
pub fn imagegate_cmd() -> Command {
    Command::cargo_bin("imagegate").expect("imagegate binary not found - run `cargo build` first")
}

pub fn fixture(rel: &str) -> PathBuf {
    fixtures_dir(env!("CARGO_MANIFEST_DIR")).join(rel)
}

/// A private data directory seeded with the fixture images.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let sandbox = Self::empty();
        copy_tree(&fixture("datadir"), sandbox.path()).expect("copy fixture data dir");
        sandbox
    }

    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn image_dir(&self, image_id: &str) -> PathBuf {
        self.path().join("data").join(image_id)
    }

    pub fn bundle_cache(&self) -> PathBuf {
        self.path().join("policy").join("bundle.json")
    }

    /// Store an unparseable analysis report for `image_id`.
    pub fn add_corrupt_report(&self, image_id: &str) {
        let dir = self.image_dir(image_id);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("analysis_report.json"), "{ not json").expect("write report");
    }

    /// The binary, isolated from the caller's environment and pointed at this data directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = imagegate_cmd();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("IMAGEGATE_DATA_DIR", self.path())
            .env_remove("IMAGEGATE_LOG")
            .env_remove("IMAGEGATE_TOKEN");
        for var in ["HTTP_PROXY", "HTTPS_PROXY", "ALL_PROXY", "http_proxy", "https_proxy", "all_proxy"] {
            cmd.env_remove(var);
        }
        cmd
    }
}

pub fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

/// Triggers of the non-sentinel findings of one result.
pub fn fired(result: &Value) -> Vec<String> {
    result["findings"]
        .as_array()
        .expect("findings array")
        .iter()
        .filter(|f| f["gate"] != "FINAL")
        .map(|f| format!("{}:{}", f["gate"].as_str().unwrap_or(""), f["trigger"].as_str().unwrap_or("")))
        .collect()
}
