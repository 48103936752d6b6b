use crate::model::{RenderableAuditRow, RenderableCounts};
use crate::table::Table;

const HEADERS: [&str; 8] = [
    "Image Id",
    "Type",
    "Current Tags",
    "Analyzed",
    "Gate Status",
    "Size",
    "Counts",
    "Base Diff",
];

pub fn render_audit_text(rows: &[RenderableAuditRow]) -> String {
    if rows.is_empty() {
        return "No images found.\n".to_string();
    }
    table(rows).render_text()
}

pub fn render_audit_markdown(rows: &[RenderableAuditRow]) -> String {
    let mut out = String::from("# Imagegate audit\n\n");
    if rows.is_empty() {
        out.push_str("No images found.\n");
        return out;
    }
    out.push_str(&table(rows).render_markdown());
    out
}

fn table(rows: &[RenderableAuditRow]) -> Table {
    let mut table = Table::new(HEADERS);
    for row in rows {
        table.push([
            row.short_id.clone(),
            row.user_type.clone(),
            if row.current_tags.is_empty() {
                "<none>".to_string()
            } else {
                row.current_tags.join(",")
            },
            if row.analyzed { "yes" } else { "no" }.to_string(),
            row.gate_status.clone(),
            row.size_bytes.map(|s| s.to_string()).unwrap_or_default(),
            row.counts.map(counts).unwrap_or_default(),
            row.base_diff.map(counts).unwrap_or_default(),
        ]);
    }
    table
}

fn counts(c: RenderableCounts) -> String {
    format!("PKGS={} FILES={} SUIDFILES={}", c.packages, c.files, c.suid_files)
}
