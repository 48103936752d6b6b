use imagegate_types::AnalysisReport;

/// Facts a trigger may inspect: the image's report and, when loaded, its base image's report.
#[derive(Clone, Copy, Debug)]
pub struct GateContext<'a> {
    pub report: &'a AnalysisReport,
    /// `None` when the caller could not (or did not) load the base. Triggers that compare against
    /// the base report a rule error instead of firing.
    pub base: Option<&'a AnalysisReport>,
}

impl<'a> GateContext<'a> {
    pub fn new(report: &'a AnalysisReport) -> Self {
        Self { report, base: None }
    }

    pub fn with_base(mut self, base: &'a AnalysisReport) -> Self {
        self.base = Some(base);
        self
    }
}

/// A trigger hit before the rule's action is stamped on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFinding {
    pub id: Option<String>,
    pub message: String,
}

impl RawFinding {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            message: message.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            message: message.into(),
        }
    }
}
