#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderableAction {
    Go,
    Warn,
    Stop,
}

impl RenderableAction {
    pub fn label(self) -> &'static str {
        match self {
            RenderableAction::Go => "GO",
            RenderableAction::Warn => "WARN",
            RenderableAction::Stop => "STOP",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableFinding {
    pub gate: String,
    pub trigger: String,
    pub trigger_id: Option<String>,
    pub message: String,
    pub action: RenderableAction,
    pub whitelisted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableImage {
    pub image_id: String,
    pub short_id: String,
    pub policy_id: String,
    pub whitelist_ids: Vec<String>,
    /// In evaluation order, including the `FINAL` row.
    pub findings: Vec<RenderableFinding>,
    pub final_action: RenderableAction,
    /// Pre-formatted `GATE:TRIGGER: message` lines.
    pub rule_errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableFailure {
    pub image: String,
    pub stage: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableGateRun {
    pub bundle: Option<String>,
    pub images: Vec<RenderableImage>,
    pub failures: Vec<RenderableFailure>,
    pub worst: Option<RenderableAction>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderableCounts {
    pub packages: u32,
    pub files: u32,
    pub suid_files: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableAuditRow {
    pub short_id: String,
    pub user_type: String,
    pub current_tags: Vec<String>,
    pub analyzed: bool,
    pub gate_status: String,
    pub size_bytes: Option<u64>,
    pub counts: Option<RenderableCounts>,
    pub base_diff: Option<RenderableCounts>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableMapping {
    pub name: Option<String>,
    pub registry: String,
    pub repository: String,
    pub tag: String,
    pub policy_id: String,
    pub whitelist_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableBundle {
    pub id: String,
    pub name: String,
    pub synced_at: Option<String>,
    pub mappings: Vec<RenderableMapping>,
    /// Policy id and its rules in policy text form.
    pub policies: Vec<(String, Vec<String>)>,
    /// Whitelist id and its items in `GATE:TRIGGER:ID` form.
    pub whitelists: Vec<(String, Vec<String>)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_trigger_ids: bool,
    /// Only the final action per image.
    pub results_only: bool,
}
