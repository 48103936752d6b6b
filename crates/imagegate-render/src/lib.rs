//! Rendering for terminal and CI surfaces (aligned text tables, Markdown).
//!
//! Renderers take the `Renderable*` model rather than the report DTOs so that output layout can
//! evolve without touching the stable JSON contract.

#![forbid(unsafe_code)]

mod audit;
mod bundle;
mod gate;
mod model;
mod table;

pub use audit::{render_audit_markdown, render_audit_text};
pub use bundle::render_bundle_text;
pub use gate::{render_gate_markdown, render_gate_text};
pub use model::{
    RenderOptions, RenderableAction, RenderableAuditRow, RenderableBundle, RenderableCounts,
    RenderableFailure, RenderableFinding, RenderableGateRun, RenderableImage, RenderableMapping,
};
pub use table::Table;
