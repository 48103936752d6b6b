use crate::model::RenderableBundle;
use crate::table::Table;

/// Summary of a bundle; `details` adds every policy rule and whitelist item.
pub fn render_bundle_text(bundle: &RenderableBundle, details: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("Bundle: {} ({})\n", bundle.name, bundle.id));
    out.push_str(&format!(
        "Synced: {}\n",
        bundle.synced_at.as_deref().unwrap_or("never")
    ));
    out.push_str(&format!(
        "Policies: {}  Whitelists: {}  Mappings: {}\n",
        bundle.policies.len(),
        bundle.whitelists.len(),
        bundle.mappings.len()
    ));

    if !bundle.mappings.is_empty() {
        out.push('\n');
        let mut table = Table::new([
            "Mapping",
            "Registry",
            "Repository",
            "Tag",
            "Policy",
            "Whitelists",
        ]);
        for m in &bundle.mappings {
            table.push([
                m.name.clone().unwrap_or_else(|| "-".to_string()),
                m.registry.clone(),
                m.repository.clone(),
                m.tag.clone(),
                m.policy_id.clone(),
                m.whitelist_ids.join(","),
            ]);
        }
        out.push_str(&table.render_text());
    }

    if details {
        for (id, rules) in &bundle.policies {
            out.push_str(&format!("\nPolicy {id}:\n"));
            section(&mut out, rules);
        }
        for (id, items) in &bundle.whitelists {
            out.push_str(&format!("\nWhitelist {id}:\n"));
            section(&mut out, items);
        }
    }
    out
}

fn section(out: &mut String, lines: &[String]) {
    if lines.is_empty() {
        out.push_str("  (empty)\n");
    }
    for line in lines {
        out.push_str(&format!("  {line}\n"));
    }
}
