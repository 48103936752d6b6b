use std::sync::Arc;

use imagegate_settings::EffectiveSettings;
use imagegate_store::{AnalysisReportReader, EvalCache, FsReportReader};
use imagegate_types::{GateRule, PolicyBundle, WhitelistItem};

use crate::policy::LocalPolicies;

/// Per-run switches for `gate`.
#[derive(Clone, Debug, Default)]
pub struct GateOptions {
    /// Evaluate with exactly these rules instead of resolving a policy.
    pub policy_override: Option<Vec<GateRule>>,
    /// Tags used for mapping resolution instead of the image's current tags.
    pub use_tags: Vec<String>,
    pub global_whitelist: Option<Vec<WhitelistItem>>,
    pub show_whitelisted: bool,
    /// Re-evaluate even when a cached result for the same policy exists.
    pub force: bool,
}

/// Everything a batch evaluation needs, threaded explicitly through the run.
pub struct RunContext {
    pub bundle: Option<Arc<PolicyBundle>>,
    pub local: LocalPolicies,
    pub reader: Arc<dyn AnalysisReportReader>,
    pub cache: Arc<EvalCache>,
    /// Worker pool width; `0` uses available parallelism.
    pub workers: usize,
    pub options: GateOptions,
}

impl RunContext {
    pub fn new(
        reader: Arc<dyn AnalysisReportReader>,
        cache: Arc<EvalCache>,
        local: LocalPolicies,
    ) -> Self {
        Self {
            bundle: None,
            local,
            reader,
            cache,
            workers: 0,
            options: GateOptions::default(),
        }
    }

    /// Reports, cache, and local policies as laid out under the configured data store.
    pub fn from_settings(settings: &EffectiveSettings) -> anyhow::Result<Self> {
        let local = LocalPolicies::from_settings(settings)?;
        let mut ctx = Self::new(
            Arc::new(FsReportReader::new(&settings.image_data_store)),
            Arc::new(EvalCache::new(&settings.image_data_store)),
            local,
        );
        ctx.workers = settings.workers;
        Ok(ctx)
    }

    pub fn with_bundle(mut self, bundle: Option<Arc<PolicyBundle>>) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn with_options(mut self, options: GateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
