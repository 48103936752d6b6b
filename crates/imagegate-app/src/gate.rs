//! The `gate` use case: evaluate a batch of images on a worker pool.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Context;
use imagegate_domain::{
    BundleError, GateContext, ResolveError, batch_worst, evaluate_image,
};
use imagegate_settings::PolicyParseError;
use imagegate_store::{AnalysisReportReader, CacheKey, StoreError};
use imagegate_types::{
    Action, AnalysisReport, BatchVerdict, BundleRef, ErrorKind, EvaluationResult, GateReport,
    ImageError, PolicyBundle, SCHEMA_GATE_REPORT_V1, ToolMeta, short_id,
};
use rayon::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info, info_span, warn};

use crate::context::RunContext;
use crate::policy::resolve_policy;

pub const EXIT_ERROR: i32 = 3;

/// Where in the per-image pipeline a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Resolve,
    LoadReport,
    LoadBase,
    Evaluate,
    Persist,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::Resolve => "resolve",
            FailureStage::LoadReport => "load_report",
            FailureStage::LoadBase => "load_base",
            FailureStage::Evaluate => "evaluate",
            FailureStage::Persist => "persist",
        }
    }
}

/// An image that could not be evaluated. Never folded into a verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFailure {
    /// The name as requested.
    pub image: String,
    pub stage: FailureStage,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageOutcome {
    Evaluated {
        result: EvaluationResult,
        /// Reused from the evaluation cache.
        cached: bool,
    },
    Failed(ImageFailure),
}

/// Outcomes in request order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateRun {
    pub outcomes: Vec<ImageOutcome>,
    pub worst: Option<Action>,
}

impl GateRun {
    pub fn results(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.outcomes.iter().filter_map(|o| match o {
            ImageOutcome::Evaluated { result, .. } => Some(result),
            ImageOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImageFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            ImageOutcome::Failed(f) => Some(f),
            ImageOutcome::Evaluated { .. } => None,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitCodeScheme {
    /// GO=0, WARN=1, STOP=2.
    #[default]
    Monotonic,
    /// GO=0, STOP=1, WARN=2.
    Legacy,
}

/// Any failed image outranks every verdict.
pub fn exit_code(worst: Option<Action>, failed: usize, scheme: ExitCodeScheme) -> i32 {
    if failed > 0 {
        return EXIT_ERROR;
    }
    match (worst.unwrap_or(Action::Go), scheme) {
        (Action::Go, _) => 0,
        (Action::Warn, ExitCodeScheme::Monotonic) => 1,
        (Action::Stop, ExitCodeScheme::Monotonic) => 2,
        (Action::Stop, ExitCodeScheme::Legacy) => 1,
        (Action::Warn, ExitCodeScheme::Legacy) => 2,
    }
}

/// Names to evaluate: the requested names (deduplicated, in order), or every analyzed image.
pub fn select_images(
    reader: &dyn AnalysisReportReader,
    names: &[String],
    include_all: bool,
) -> anyhow::Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    if include_all {
        let entries = reader.list().context("list images")?;
        out.extend(
            entries
                .into_iter()
                .filter(|e| e.analyzed)
                .map(|e| e.image_id),
        );
    }
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    Ok(out)
}

/// Evaluate every named image. One image failing never aborts the batch.
pub fn run_gate(ctx: &RunContext, names: &[String]) -> anyhow::Result<GateRun> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.workers)
        .thread_name(|idx| format!("imagegate-gate-{idx}"))
        .build()
        .context("build worker pool")?;

    let outcomes: Vec<ImageOutcome> =
        pool.install(|| names.par_iter().map(|name| evaluate_one(ctx, name)).collect());

    let run = GateRun {
        worst: batch_worst(outcomes.iter().filter_map(|o| match o {
            ImageOutcome::Evaluated { result, .. } => Some(result.final_action),
            ImageOutcome::Failed(_) => None,
        })),
        outcomes,
    };
    info!(
        images = names.len(),
        failed = run.failures().count(),
        worst = run.worst.map(Action::as_str).unwrap_or("none"),
        "gate run finished"
    );
    Ok(run)
}

struct StageError {
    stage: FailureStage,
    error: anyhow::Error,
}

fn at<E: Into<anyhow::Error>>(stage: FailureStage) -> impl FnOnce(E) -> StageError {
    move |e| StageError {
        stage,
        error: e.into(),
    }
}

fn evaluate_one(ctx: &RunContext, name: &str) -> ImageOutcome {
    let span = info_span!("image", name = %short_id(name));
    let _entered = span.enter();

    match try_evaluate(ctx, name) {
        Ok((result, cached)) => ImageOutcome::Evaluated { result, cached },
        Err(StageError { stage, error }) => {
            let message = format!("{error:#}");
            warn!(stage = stage.as_str(), error = %message, "image evaluation failed");
            ImageOutcome::Failed(ImageFailure {
                image: name.to_string(),
                stage,
                kind: error_kind(&error),
                message,
            })
        }
    }
}

enum Base {
    Itself,
    Loaded(AnalysisReport),
    Missing,
}

fn try_evaluate(ctx: &RunContext, name: &str) -> Result<(EvaluationResult, bool), StageError> {
    let show = ctx.options.show_whitelisted;
    let image_id = ctx
        .reader
        .resolve_name(name)
        .map_err(at(FailureStage::LoadReport))?;
    let report = ctx
        .reader
        .load(&image_id)
        .map_err(at(FailureStage::LoadReport))?;

    let policy = resolve_policy(ctx.bundle.as_deref(), &ctx.local, &ctx.options, &report)
        .map_err(at(FailureStage::Resolve))?;
    let digest = policy.digest();

    let base = load_base(ctx.reader.as_ref(), &report).map_err(at(FailureStage::LoadBase))?;
    let base_analyzed_at = match &base {
        Base::Loaded(b) if policy.needs_base() => Some(b.analyzed_at),
        _ => None,
    };
    let key = CacheKey {
        policy_digest: &digest,
        analyzed_at: report.analyzed_at,
        base_analyzed_at,
    };

    if !ctx.options.force {
        match ctx.cache.get_current(&image_id, &key) {
            Ok(Some(cached)) => {
                debug!(final_action = %cached.final_action, "reusing cached evaluation");
                return Ok((visible(cached, show), true));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable cached evaluation"),
        }
    }

    let gate_ctx = match &base {
        Base::Itself => GateContext::new(&report).with_base(&report),
        Base::Loaded(b) => GateContext::new(&report).with_base(b),
        Base::Missing => GateContext::new(&report),
    };

    let mut result = catch_unwind(AssertUnwindSafe(|| evaluate_image(&gate_ctx, &policy, true)))
        .map_err(|_| StageError {
            stage: FailureStage::Evaluate,
            error: anyhow::anyhow!("gate evaluation panicked"),
        })?;
    result.evaluated_at = Some(OffsetDateTime::now_utc());
    result.analyzed_at = Some(report.analyzed_at);
    result.base_analyzed_at = base_analyzed_at;
    for e in &result.rule_errors {
        warn!(gate = %e.gate, trigger = %e.trigger, error = %e.message, "rule skipped");
    }

    ctx.cache.put(&result).map_err(at(FailureStage::Persist))?;
    debug!(
        policy = %result.policy_id,
        final_action = %result.final_action,
        whitelisted = result.whitelisted_count,
        "evaluated"
    );
    Ok((visible(result, show), false))
}

fn load_base(reader: &dyn AnalysisReportReader, report: &AnalysisReport) -> Result<Base, StoreError> {
    let base_id = report.base_id();
    if base_id == report.image_id {
        return Ok(Base::Itself);
    }
    match reader.load(base_id) {
        Ok(base) => Ok(Base::Loaded(base)),
        Err(e) if e.is_not_found() => {
            debug!(base = %short_id(base_id), "base image not analyzed; diff triggers will be skipped");
            Ok(Base::Missing)
        }
        Err(e) => Err(e),
    }
}

/// Results are cached with whitelisted findings included; hide them for display unless asked.
fn visible(mut result: EvaluationResult, show_whitelisted: bool) -> EvaluationResult {
    if !show_whitelisted {
        result.findings.retain(|f| !f.whitelisted);
    }
    result
}

fn error_kind(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return match e {
                StoreError::Network { .. } => ErrorKind::Network,
                StoreError::Auth { .. } => ErrorKind::Auth,
                StoreError::Bundle(_) | StoreError::Policy { .. } => ErrorKind::Config,
                _ => ErrorKind::Data,
            };
        }
        if cause.is::<ResolveError>() || cause.is::<BundleError>() || cause.is::<PolicyParseError>()
        {
            return ErrorKind::Config;
        }
    }
    ErrorKind::Data
}

pub fn build_gate_report(
    run: &GateRun,
    bundle: Option<&PolicyBundle>,
    started_at: OffsetDateTime,
    finished_at: OffsetDateTime,
    scheme: ExitCodeScheme,
) -> GateReport {
    let results: Vec<EvaluationResult> = run.results().cloned().collect();
    let errors: Vec<ImageError> = run
        .failures()
        .map(|f| ImageError {
            image: f.image.clone(),
            stage: f.stage.as_str().to_string(),
            kind: f.kind,
            message: f.message.clone(),
        })
        .collect();

    GateReport {
        schema: SCHEMA_GATE_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "imagegate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at,
        bundle: bundle.map(|b| BundleRef {
            id: b.id.clone(),
            name: b.name.clone(),
        }),
        verdict: BatchVerdict {
            worst_action: run.worst,
            evaluated: results.len() as u32,
            failed: errors.len() as u32,
            exit_code: exit_code(run.worst, errors.len(), scheme),
        },
        results,
        errors,
    }
}
