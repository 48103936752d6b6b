//! The `audit report` use case: one row per known image.

use anyhow::Context;
use imagegate_domain::aggregate::final_from_findings;
use imagegate_domain::diff::{added_counts, diff};
use imagegate_store::{AnalysisReportReader, EvalCache, ImageEntry};
use imagegate_types::{
    AnalysisReport, AuditCounts, AuditReport, AuditRow, SCHEMA_AUDIT_REPORT_V1, ToolMeta,
    short_id,
};
use time::OffsetDateTime;
use tracing::warn;

const UNKNOWN_STATUS: &str = "UNKNOWN";

pub fn run_audit(
    reader: &dyn AnalysisReportReader,
    cache: &EvalCache,
    generated_at: OffsetDateTime,
) -> anyhow::Result<AuditReport> {
    let entries = reader.list().context("list images")?;
    let rows = entries
        .iter()
        .map(|entry| audit_row(reader, cache, entry))
        .collect();
    Ok(AuditReport {
        schema: SCHEMA_AUDIT_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "imagegate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at,
        rows,
    })
}

/// Problems with one image degrade its row instead of failing the audit.
pub fn audit_row(
    reader: &dyn AnalysisReportReader,
    cache: &EvalCache,
    entry: &ImageEntry,
) -> AuditRow {
    let gate_status = match cache.get(&entry.image_id) {
        Ok(Some(result)) => final_from_findings(&result.findings)
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        Ok(None) => UNKNOWN_STATUS.to_string(),
        Err(e) => {
            warn!(image = %short_id(&entry.image_id), error = %e, "unreadable cached evaluation");
            UNKNOWN_STATUS.to_string()
        }
    };

    let mut row = AuditRow {
        image_id: entry.image_id.clone(),
        short_id: short_id(&entry.image_id).to_string(),
        user_type: "none".to_string(),
        current_tags: Vec::new(),
        all_tags: Vec::new(),
        analyzed: false,
        gate_status,
        size_bytes: None,
        counts: None,
        base_id: None,
        base_diff: None,
    };
    if !entry.analyzed {
        return row;
    }

    let report = match reader.load(&entry.image_id) {
        Ok(report) => report,
        Err(e) => {
            warn!(image = %row.short_id, error = %e, "cannot load analysis report");
            return row;
        }
    };
    row.analyzed = true;
    row.user_type = report.user_type.as_str().to_string();
    row.current_tags = report.current_tags.clone();
    row.all_tags = report.all_tags.clone();
    row.size_bytes = Some(report.size_bytes);
    row.counts = Some(AuditCounts {
        packages: report.packages.len() as u32,
        files: report.files.len() as u32,
        suid_files: report.suid_files.len() as u32,
    });

    let base_id = report.base_id();
    if base_id != report.image_id {
        row.base_id = Some(base_id.to_string());
        row.base_diff = base_counts(reader, &report, base_id);
    }
    row
}

fn base_counts(
    reader: &dyn AnalysisReportReader,
    report: &AnalysisReport,
    base_id: &str,
) -> Option<AuditCounts> {
    match reader.load(base_id) {
        Ok(base) => {
            let (packages, files, suid_files) = added_counts(&diff(report, &base));
            Some(AuditCounts {
                packages: packages as u32,
                files: files as u32,
                suid_files: suid_files as u32,
            })
        }
        Err(e) => {
            if !e.is_not_found() {
                warn!(base = %short_id(base_id), error = %e, "cannot load base report");
            }
            None
        }
    }
}
