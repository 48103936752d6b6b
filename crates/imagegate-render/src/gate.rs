use crate::model::{RenderOptions, RenderableGateRun, RenderableImage};
use crate::table::Table;

pub fn render_gate_text(run: &RenderableGateRun, opts: RenderOptions) -> String {
    let mut out = String::new();
    if let Some(bundle) = &run.bundle {
        out.push_str(&format!("Bundle: {bundle}\n\n"));
    }

    if opts.results_only {
        let mut table = Table::new(["Image Id", "Policy", "Final Action"]);
        for image in &run.images {
            table.push([
                image.short_id.as_str(),
                image.policy_id.as_str(),
                image.final_action.label(),
            ]);
        }
        if !table.is_empty() {
            out.push_str(&table.render_text());
        }
    } else {
        for (idx, image) in run.images.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str(&format!("Image Id: {}\n", image.image_id));
            out.push_str(&format!("Policy: {}\n", policy_line(image)));
            out.push_str(&findings_table(image, opts).render_text());
            if !image.rule_errors.is_empty() {
                out.push_str("Rule errors:\n");
                for e in &image.rule_errors {
                    out.push_str(&format!("  - {e}\n"));
                }
            }
        }
    }

    if !run.failures.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Failed images:\n");
        let mut table = Table::new(["Image", "Stage", "Error"]);
        for f in &run.failures {
            table.push([f.image.as_str(), f.stage.as_str(), f.message.as_str()]);
        }
        out.push_str(&table.render_text());
    }

    if !out.is_empty() {
        out.push('\n');
    }
    match run.worst {
        Some(action) => out.push_str(&format!("Worst action: {}\n", action.label())),
        None => out.push_str("Worst action: none (no images evaluated)\n"),
    }
    out
}

pub fn render_gate_markdown(run: &RenderableGateRun, opts: RenderOptions) -> String {
    let mut out = String::new();
    out.push_str("# Imagegate report\n\n");
    let worst = run.worst.map(|a| a.label()).unwrap_or("NONE");
    out.push_str(&format!(
        "- Worst action: **{}**\n- Images: {} evaluated / {} failed\n",
        worst,
        run.images.len(),
        run.failures.len()
    ));
    if let Some(bundle) = &run.bundle {
        out.push_str(&format!("- Bundle: `{bundle}`\n"));
    }
    out.push('\n');

    if opts.results_only {
        let mut table = Table::new(["Image", "Policy", "Final action"]);
        for image in &run.images {
            table.push([
                format!("`{}`", image.short_id),
                image.policy_id.clone(),
                image.final_action.label().to_string(),
            ]);
        }
        if !table.is_empty() {
            out.push_str(&table.render_markdown());
            out.push('\n');
        }
    } else {
        for image in &run.images {
            out.push_str(&format!(
                "## `{}`: {}\n\n",
                image.short_id,
                image.final_action.label()
            ));
            out.push_str(&format!("Policy: {}\n\n", policy_line(image)));
            out.push_str(&findings_table(image, opts).render_markdown());
            out.push('\n');
            for e in &image.rule_errors {
                out.push_str(&format!("> Rule error: {e}\n"));
            }
            if !image.rule_errors.is_empty() {
                out.push('\n');
            }
        }
    }

    if !run.failures.is_empty() {
        out.push_str("## Failed images\n\n");
        for f in &run.failures {
            out.push_str(&format!("- `{}` ({}): {}\n", f.image, f.stage, f.message));
        }
    }
    out
}

fn policy_line(image: &RenderableImage) -> String {
    if image.whitelist_ids.is_empty() {
        image.policy_id.clone()
    } else {
        format!(
            "{} (whitelists: {})",
            image.policy_id,
            image.whitelist_ids.join(", ")
        )
    }
}

fn findings_table(image: &RenderableImage, opts: RenderOptions) -> Table {
    let show_whitelisted = image.findings.iter().any(|f| f.whitelisted);
    let mut headers = vec!["Gate", "Trigger"];
    if opts.show_trigger_ids {
        headers.push("Trigger Id");
    }
    headers.extend(["Check Output", "Gate Action"]);
    if show_whitelisted {
        headers.push("Whitelisted");
    }

    let mut table = Table::new(headers);
    for f in &image.findings {
        let mut row = vec![f.gate.clone(), f.trigger.clone()];
        if opts.show_trigger_ids {
            row.push(f.trigger_id.clone().unwrap_or_default());
        }
        row.push(f.message.clone());
        row.push(f.action.label().to_string());
        if show_whitelisted {
            row.push(if f.whitelisted { "yes" } else { "no" }.to_string());
        }
        table.push(row);
    }
    table
}
