//! CLI entry point for imagegate.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, logging setup, and exit
//! codes. All business logic lives in the `imagegate-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use imagegate_app::{
    BundleSelection, EXIT_ERROR, ExitCodeScheme, ExplainOutput, GateOptions, RunContext,
    SyncRequest, SyncTarget, build_gate_report, format_explanation, format_not_found, gate_help,
    list_image_policy, load_bundle, load_policy_file, load_whitelist_file, policy_template,
    remove_image_policy, renderable_audit, renderable_bundle, renderable_gate_run, run_audit,
    run_explain, run_gate, select_images, show_bundle, sync_bundle, update_image_policy,
};
use imagegate_render::{
    RenderOptions, render_audit_markdown, render_audit_text, render_bundle_text,
    render_gate_markdown, render_gate_text,
};
use imagegate_settings::{
    EffectiveSettings, ImagegateConfigV1, Overrides, parse_config_toml, parse_override,
    render_policy_text, resolve_settings,
};
use imagegate_store::{AnalysisReportReader, BundleOrigin, FsReportReader, ImagePolicyStore};
use imagegate_types::BundleDocument;
use std::io::Read;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "imagegate.toml";
const LOG_ENV: &str = "IMAGEGATE_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "imagegate",
    version,
    about = "Policy gate evaluation for analyzed container images"
)]
struct Cli {
    /// Path to imagegate config TOML (default: ./imagegate.toml, if present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Override a config key (key=value). May be repeated; later values win.
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    config_override: Vec<String>,

    /// Log progress at info level.
    #[arg(long, global = true)]
    verbose: bool,

    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Print the JSON report instead of text.
    #[arg(long, global = true, conflicts_with = "markdown")]
    json: bool,

    /// Print a Markdown report instead of text.
    #[arg(long, global = true)]
    markdown: bool,

    /// Use the legacy exit codes (GO=0, STOP=1, WARN=2).
    #[arg(long, global = true)]
    legacy_exit_codes: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate gate policies against analyzed images.
    Gate(GateArgs),

    /// Inspect or refresh the policy bundle.
    Policybundle {
        #[command(subcommand)]
        cmd: BundleCommands,
    },

    /// Summarize every known image.
    Audit {
        #[command(subcommand)]
        cmd: AuditCommands,
    },

    /// Explain a gate or trigger (GATE or GATE:TRIGGER).
    Explain {
        /// Gate name (e.g. "SUIDDIFF") or gate and trigger (e.g. "PKGDIFF:PKGADD").
        identifier: String,
    },
}

#[derive(Args, Debug)]
struct GateArgs {
    /// Image id, id prefix, or tag to evaluate. May be repeated.
    #[arg(long = "image")]
    images: Vec<String>,

    /// File with one image per line.
    #[arg(long)]
    imagefile: Option<Utf8PathBuf>,

    /// Evaluate every analyzed image.
    #[arg(long)]
    include_all: bool,

    /// Re-evaluate even when a cached result exists.
    #[arg(long)]
    force: bool,

    /// Evaluate with this policy file instead of the resolved policy.
    #[arg(long)]
    policy: Option<Utf8PathBuf>,

    /// Evaluate against the synced policy bundle (syncing first when a remote is configured).
    #[arg(long, conflicts_with = "bundlefile")]
    run_bundle: bool,

    /// Evaluate against a bundle file.
    #[arg(long)]
    bundlefile: Option<Utf8PathBuf>,

    /// Match bundle mappings with this tag instead of the image's current tags.
    #[arg(long = "usetag")]
    use_tags: Vec<String>,

    /// Whitelist file applied on top of the resolved whitelists.
    #[arg(long)]
    global_whitelist: Option<Utf8PathBuf>,

    /// Include whitelisted findings in the output.
    #[arg(long)]
    show_whitelisted: bool,

    /// Add the trigger id column to text output.
    #[arg(long = "show-triggerids")]
    show_trigger_ids: bool,

    /// Only print the final action per image.
    #[arg(long = "resultsonly")]
    results_only: bool,

    /// Print the available gates and triggers, then exit.
    #[arg(long = "show-gatehelp")]
    show_gate_help: bool,

    /// Print a policy enabling every trigger, then exit.
    #[arg(long = "show-policytemplate")]
    show_policy_template: bool,

    /// Print the policy stored for the image.
    #[arg(long = "listpolicy", conflicts_with_all = ["update_policy", "remove_policy"])]
    list_policy: bool,

    /// Validate and store a policy file for the image.
    #[arg(long = "updatepolicy", value_name = "FILE", conflicts_with = "remove_policy")]
    update_policy: Option<Utf8PathBuf>,

    /// Remove the policy stored for the image.
    #[arg(long = "rmpolicy")]
    remove_policy: bool,

    /// Worker threads for batch evaluation (0 = available parallelism).
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum BundleCommands {
    /// Show the cached bundle.
    Show {
        /// Also print every policy and whitelist.
        #[arg(long)]
        details: bool,
    },

    /// Fetch the bundle from the configured remote (or import one) and validate it.
    Sync {
        /// Import this file instead of fetching ("-" reads stdin).
        #[arg(long)]
        infile: Option<String>,

        /// Write the validated bundle here instead of the cache ("-" writes stdout).
        #[arg(long)]
        outfile: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AuditCommands {
    /// One row per image: tags, gate status, counts, and base diff.
    Report,
}

fn main() {
    let cli = Cli::parse();
    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("imagegate error: {err:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: &Cli) -> anyhow::Result<i32> {
    // Help-style commands need no settings or data directory.
    match &cli.cmd {
        Commands::Explain { identifier } => return cmd_explain(identifier),
        Commands::Gate(args) if args.show_gate_help => {
            print!("{}", gate_help());
            return Ok(0);
        }
        Commands::Gate(args) if args.show_policy_template => {
            print!("{}", policy_template());
            return Ok(0);
        }
        _ => {}
    }

    let workers = match &cli.cmd {
        Commands::Gate(args) => args.workers,
        _ => None,
    };
    let settings = load_settings(cli, workers)?;
    init_tracing(cli, settings.log_json);
    debug!(data_dir = %settings.data_dir, "settings resolved");

    match &cli.cmd {
        Commands::Gate(args) => cmd_gate(cli, &settings, args),
        Commands::Policybundle {
            cmd: BundleCommands::Show { details },
        } => cmd_bundle_show(cli, &settings, *details),
        Commands::Policybundle {
            cmd: BundleCommands::Sync { infile, outfile },
        } => cmd_bundle_sync(&settings, infile.as_deref(), outfile.as_deref()),
        Commands::Audit {
            cmd: AuditCommands::Report,
        } => cmd_audit(cli, &settings),
        Commands::Explain { identifier } => cmd_explain(identifier),
    }
}

/// `IMAGEGATE_LOG` wins over `--verbose`/`--debug`. Logs always go to stderr.
fn init_tracing(cli: &Cli, log_json: bool) {
    let default_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("imagegate: logging disabled: {err}");
    }
}

fn env_path(key: &str) -> Option<Utf8PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Utf8PathBuf::from)
}

fn load_settings(cli: &Cli, workers: Option<usize>) -> anyhow::Result<EffectiveSettings> {
    let cfg = match &cli.config {
        Some(path) => read_config(path)?,
        None if Utf8Path::new(DEFAULT_CONFIG).is_file() => {
            read_config(Utf8Path::new(DEFAULT_CONFIG))?
        }
        None => ImagegateConfigV1::default(),
    };

    let config = cli
        .config_override
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let overrides = Overrides {
        home: env_path("HOME"),
        data_dir: env_path("IMAGEGATE_DATA_DIR"),
        config,
        workers,
        log_json: cli.log_json.then_some(true),
    };
    resolve_settings(cfg, overrides)
}

fn read_config(path: &Utf8Path) -> anyhow::Result<ImagegateConfigV1> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read config file {path}"))?;
    parse_config_toml(&text).with_context(|| format!("parse config file {path}"))
}

fn exit_scheme(cli: &Cli) -> ExitCodeScheme {
    if cli.legacy_exit_codes {
        ExitCodeScheme::Legacy
    } else {
        ExitCodeScheme::Monotonic
    }
}

fn cmd_gate(cli: &Cli, settings: &EffectiveSettings, args: &GateArgs) -> anyhow::Result<i32> {
    let mut names = args.images.clone();
    if let Some(path) = &args.imagefile {
        names.extend(read_image_file(path)?);
    }

    if args.list_policy || args.update_policy.is_some() || args.remove_policy {
        return cmd_image_policy(settings, args, &names);
    }

    if !args.use_tags.is_empty() && (names.len() != 1 || args.include_all) {
        anyhow::bail!("--usetag requires exactly one --image");
    }

    let selection = match (&args.bundlefile, args.run_bundle) {
        (Some(path), _) => BundleSelection::File(path.clone()),
        (None, true) => BundleSelection::Cached,
        (None, false) => BundleSelection::None,
    };
    let bundle = match load_bundle(settings, &selection, OffsetDateTime::now_utc())? {
        Some((bundle, origin)) => {
            if let BundleOrigin::CacheFallback { reason } = &origin {
                warn!(%reason, bundle_id = %bundle.id, "evaluating against the cached bundle");
            }
            Some(bundle)
        }
        None => None,
    };

    let options = GateOptions {
        policy_override: args
            .policy
            .as_deref()
            .map(load_policy_file)
            .transpose()?,
        use_tags: args.use_tags.clone(),
        global_whitelist: args
            .global_whitelist
            .as_deref()
            .map(load_whitelist_file)
            .transpose()?,
        show_whitelisted: args.show_whitelisted,
        force: args.force,
    };

    let ctx = RunContext::from_settings(settings)?
        .with_bundle(bundle.clone().map(Arc::new))
        .with_options(options);

    let targets = select_images(ctx.reader.as_ref(), &names, args.include_all)?;
    if targets.is_empty() {
        anyhow::bail!("no images to evaluate; pass --image, --imagefile, or --include-all");
    }

    let started = OffsetDateTime::now_utc();
    let run = run_gate(&ctx, &targets)?;
    let finished = OffsetDateTime::now_utc();
    let report = build_gate_report(&run, bundle.as_ref(), started, finished, exit_scheme(cli));

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize gate report")?
        );
    } else {
        let opts = RenderOptions {
            show_trigger_ids: args.show_trigger_ids,
            results_only: args.results_only,
        };
        let renderable = renderable_gate_run(&report);
        if cli.markdown {
            print!("{}", render_gate_markdown(&renderable, opts));
        } else {
            print!("{}", render_gate_text(&renderable, opts));
        }
    }

    Ok(report.verdict.exit_code)
}

/// Image names from a file: one per line, blank lines and `#` comments skipped.
fn read_image_file(path: &Utf8Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read image file {path}"))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn cmd_image_policy(
    settings: &EffectiveSettings,
    args: &GateArgs,
    names: &[String],
) -> anyhow::Result<i32> {
    let [name] = names else {
        anyhow::bail!("--listpolicy, --updatepolicy, and --rmpolicy take exactly one --image");
    };
    let reader = FsReportReader::new(&settings.image_data_store);
    let image_id = reader
        .resolve_name(name)
        .with_context(|| format!("resolve image {name}"))?;
    let store = ImagePolicyStore::new(&settings.image_data_store);

    if let Some(path) = &args.update_policy {
        let rules = update_image_policy(&store, &image_id, path)?;
        println!("Stored {} rule(s) for image {image_id}", rules.len());
    } else if args.remove_policy {
        if remove_image_policy(&store, &image_id)? {
            println!("Removed policy for image {image_id}");
        } else {
            println!("No policy stored for image {image_id}");
        }
    } else {
        match list_image_policy(&store, &image_id)? {
            Some(rules) => print!("{}", render_policy_text(&rules)),
            None => println!("No policy stored for image {image_id}"),
        }
    }
    Ok(0)
}

fn cmd_bundle_show(cli: &Cli, settings: &EffectiveSettings, details: bool) -> anyhow::Result<i32> {
    let bundle = show_bundle(settings)?.with_context(|| {
        format!(
            "no policy bundle at {}; run `imagegate policybundle sync`",
            settings.bundle_cache_path()
        )
    })?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&BundleDocument::from(&bundle))
                .context("serialize bundle")?
        );
    } else {
        print!("{}", render_bundle_text(&renderable_bundle(&bundle), details));
    }
    Ok(0)
}

fn cmd_bundle_sync(
    settings: &EffectiveSettings,
    infile: Option<&str>,
    outfile: Option<&str>,
) -> anyhow::Result<i32> {
    let input = match infile {
        None => None,
        Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("read bundle from stdin")?;
            Some(buf)
        }
        Some(path) => Some(std::fs::read(path).with_context(|| format!("read bundle file {path}"))?),
    };
    let target = match outfile {
        None => SyncTarget::Cache,
        Some("-") => SyncTarget::Stdout,
        Some(path) => SyncTarget::File(Utf8PathBuf::from(path)),
    };

    let outcome = sync_bundle(settings, SyncRequest { input, target }, OffsetDateTime::now_utc())?;

    match outcome.stdout {
        Some(text) => print!("{text}"),
        None => println!(
            "Synced bundle {} ({}): {} policies, {} whitelists, {} mappings",
            outcome.bundle.id,
            outcome.bundle.name,
            outcome.bundle.policies.len(),
            outcome.bundle.whitelists.len(),
            outcome.bundle.mappings.len()
        ),
    }
    Ok(0)
}

fn cmd_audit(cli: &Cli, settings: &EffectiveSettings) -> anyhow::Result<i32> {
    let ctx = RunContext::from_settings(settings)?;
    let report = run_audit(ctx.reader.as_ref(), &ctx.cache, OffsetDateTime::now_utc())?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize audit report")?
        );
    } else if cli.markdown {
        print!("{}", render_audit_markdown(&renderable_audit(&report)));
    } else {
        print!("{}", render_audit_text(&renderable_audit(&report)));
    }
    Ok(0)
}

fn cmd_explain(identifier: &str) -> anyhow::Result<i32> {
    match run_explain(identifier) {
        ExplainOutput::NotFound {
            identifier,
            available,
        } => {
            eprint!("{}", format_not_found(&identifier, &available));
            Ok(EXIT_ERROR)
        }
        found => {
            print!("{}", format_explanation(&found));
            Ok(0)
        }
    }
}
