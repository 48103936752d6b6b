use crate::model::ImagegateConfigV1;
use crate::presets;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

pub const DEFAULT_DATA_DIR_NAME: &str = ".imagegate";
pub const DEFAULT_CONN_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TOKEN_ENV: &str = "IMAGEGATE_TOKEN";

/// Values that come from outside the config file: the environment and the command line.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// Home directory, used for the default `data_dir`.
    pub home: Option<Utf8PathBuf>,
    /// Data directory from the environment (`IMAGEGATE_DATA_DIR`); wins over the config file.
    pub data_dir: Option<Utf8PathBuf>,
    /// `key=value` pairs from `--config-override`, applied in order.
    pub config: Vec<(String, String)>,
    pub workers: Option<usize>,
    pub log_json: Option<bool>,
}

/// Fully resolved settings. Paths are absolute when `data_dir` is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub data_dir: Utf8PathBuf,
    pub image_data_store: Utf8PathBuf,
    pub policy_dir: Utf8PathBuf,
    pub global_policy: Utf8PathBuf,
    pub policy_preset: String,
    pub policy_url: Option<String>,
    pub policy_bundle_id: Option<String>,
    pub conn_timeout: Duration,
    pub max_retries: u32,
    pub auth_token_env: String,
    /// `0` means "use available parallelism".
    pub workers: usize,
    pub log_json: bool,
}

impl EffectiveSettings {
    /// Location of the cached bundle.
    pub fn bundle_cache_path(&self) -> Utf8PathBuf {
        self.policy_dir.join("bundle.json")
    }
}

/// Split a `key=value` override.
pub fn parse_override(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("invalid config override '{raw}' (expected key=value)"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("invalid config override '{raw}' (empty key)");
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Set one top-level config key from a string. Unknown keys are errors.
pub fn apply_override(cfg: &mut ImagegateConfigV1, key: &str, value: &str) -> anyhow::Result<()> {
    let text = || Some(value.to_string());
    match key {
        "data_dir" => cfg.data_dir = text(),
        "image_data_store" => cfg.image_data_store = text(),
        "policy_dir" => cfg.policy_dir = text(),
        "global_policy" => cfg.global_policy = text(),
        "policy_preset" => cfg.policy_preset = text(),
        "policy_url" => cfg.policy_url = text(),
        "policy_bundle_id" => cfg.policy_bundle_id = text(),
        "auth_token_env" => cfg.auth_token_env = text(),
        "policy_conn_timeout" => {
            cfg.policy_conn_timeout = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid policy_conn_timeout: {value}"))?,
            )
        }
        "policy_max_retries" => {
            cfg.policy_max_retries = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid policy_max_retries: {value}"))?,
            )
        }
        "workers" => {
            cfg.workers = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid workers: {value}"))?,
            )
        }
        "log_json" => {
            cfg.log_json = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid log_json: {value} (expected true|false)"))?,
            )
        }
        other => anyhow::bail!("unknown config key: {other}"),
    }
    Ok(())
}

pub fn resolve_settings(
    mut cfg: ImagegateConfigV1,
    overrides: Overrides,
) -> anyhow::Result<EffectiveSettings> {
    for (key, value) in &overrides.config {
        apply_override(&mut cfg, key, value)
            .with_context(|| format!("applying config override {key}={value}"))?;
    }

    let data_dir = match (overrides.data_dir, cfg.data_dir.as_deref()) {
        (Some(dir), _) => dir,
        (None, Some(dir)) => Utf8PathBuf::from(dir),
        (None, None) => overrides
            .home
            .map(|home| home.join(DEFAULT_DATA_DIR_NAME))
            .context("cannot determine the data directory: HOME is unset; set IMAGEGATE_DATA_DIR")?,
    };

    let under = |value: Option<&str>, default: &str| -> Utf8PathBuf {
        let path = Utf8Path::new(value.unwrap_or(default));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    };

    let image_data_store = under(cfg.image_data_store.as_deref(), "data");
    let policy_dir = under(cfg.policy_dir.as_deref(), "policy");
    let global_policy = under(cfg.global_policy.as_deref(), "conf/gate.policy");

    let policy_preset = cfg
        .policy_preset
        .clone()
        .unwrap_or_else(|| presets::DEFAULT_PRESET.to_string());
    if presets::preset(&policy_preset).is_none() {
        anyhow::bail!(
            "unknown policy_preset: {policy_preset} (expected one of {})",
            presets::preset_names().join("|")
        );
    }

    if cfg.policy_max_retries == Some(0) {
        anyhow::bail!("policy_max_retries must be at least 1");
    }

    Ok(EffectiveSettings {
        image_data_store,
        policy_dir,
        global_policy,
        policy_preset,
        policy_url: cfg.policy_url.map(|u| u.trim_end_matches('/').to_string()),
        policy_bundle_id: cfg.policy_bundle_id,
        conn_timeout: Duration::from_secs(
            cfg.policy_conn_timeout.unwrap_or(DEFAULT_CONN_TIMEOUT_SECS),
        ),
        max_retries: cfg.policy_max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        auth_token_env: cfg
            .auth_token_env
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
        workers: overrides.workers.or(cfg.workers).unwrap_or(0),
        log_json: overrides.log_json.or(cfg.log_json).unwrap_or(false),
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;

    fn home() -> Overrides {
        Overrides {
            home: Some(Utf8PathBuf::from("/home/u")),
            ..Overrides::default()
        }
    }

    #[test]
    fn defaults_hang_off_home() {
        let s = resolve_settings(ImagegateConfigV1::default(), home()).expect("resolve");
        assert_eq!(s.data_dir, "/home/u/.imagegate");
        assert_eq!(s.image_data_store, "/home/u/.imagegate/data");
        assert_eq!(s.policy_dir, "/home/u/.imagegate/policy");
        assert_eq!(s.global_policy, "/home/u/.imagegate/conf/gate.policy");
        assert_eq!(s.bundle_cache_path(), "/home/u/.imagegate/policy/bundle.json");
        assert_eq!(s.conn_timeout, Duration::from_secs(45));
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.auth_token_env, "IMAGEGATE_TOKEN");
        assert_eq!(s.policy_preset, "default");
        assert_eq!(s.workers, 0);
        assert!(!s.log_json);
    }

    #[test]
    fn env_data_dir_beats_config_and_absolute_paths_stay() {
        let cfg = parse_config_toml(
            r#"
data_dir = "/srv/from-config"
policy_dir = "/etc/imagegate/policy"
policy_url = "https://bundles.example.com/v1/"
"#,
        )
        .expect("parse");
        let overrides = Overrides {
            data_dir: Some(Utf8PathBuf::from("/var/lib/imagegate")),
            ..home()
        };
        let s = resolve_settings(cfg, overrides).expect("resolve");
        assert_eq!(s.data_dir, "/var/lib/imagegate");
        assert_eq!(s.image_data_store, "/var/lib/imagegate/data");
        assert_eq!(s.policy_dir, "/etc/imagegate/policy");
        assert_eq!(s.policy_url.as_deref(), Some("https://bundles.example.com/v1"));
    }

    #[test]
    fn config_overrides_apply_in_order_and_reject_unknown_keys() {
        let overrides = Overrides {
            config: vec![
                ("policy_max_retries".into(), "5".into()),
                ("policy_max_retries".into(), "7".into()),
                ("workers".into(), "2".into()),
            ],
            ..home()
        };
        let s = resolve_settings(ImagegateConfigV1::default(), overrides).expect("resolve");
        assert_eq!(s.max_retries, 7);
        assert_eq!(s.workers, 2);

        let bad = Overrides {
            config: vec![("colour".into(), "red".into())],
            ..home()
        };
        let err = resolve_settings(ImagegateConfigV1::default(), bad).unwrap_err();
        assert!(format!("{err:#}").contains("unknown config key: colour"));
    }

    #[test]
    fn parse_override_requires_key_and_equals() {
        assert_eq!(
            parse_override("workers = 4").expect("parse"),
            ("workers".to_string(), "4".to_string())
        );
        assert!(parse_override("workers").is_err());
        assert!(parse_override("=4").is_err());
    }

    #[test]
    fn missing_home_without_data_dir_is_an_error() {
        let err = resolve_settings(ImagegateConfigV1::default(), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("IMAGEGATE_DATA_DIR"));
    }

    #[test]
    fn unknown_file_keys_and_presets_are_rejected() {
        assert!(parse_config_toml("profile = \"x\"").is_err());
        let cfg = parse_config_toml("policy_preset = \"lenient\"").expect("parse");
        assert!(resolve_settings(cfg, home()).is_err());
        let cfg = parse_config_toml("policy_max_retries = 0").expect("parse");
        assert!(resolve_settings(cfg, home()).is_err());
    }
}
