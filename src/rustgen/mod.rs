//! Rust backend.
//!
//! Two modules per role: `lcsf_protocol_{name}.rs` (payload types, descriptors, the
//! validator codec) and `protocol_{name}.rs` (handler stubs and the dispatcher). There is
//! no round-trip support here; regenerating always overwrites both files.

pub mod main_file;
pub mod types;

use crate::cgen::GeneratedFile;
use crate::flatten::GenContext;
use crate::model::Role;
use crate::resolve::snake_case;

pub fn bridge_module_name(protocol: &str) -> String {
    format!("lcsf_protocol_{}", snake_case(protocol))
}

pub fn main_module_name(protocol: &str) -> String {
    format!("protocol_{}", snake_case(protocol))
}

/// Render both Rust modules of `role`.
pub fn generate(ctx: &GenContext<'_>, role: Role) -> Vec<GeneratedFile> {
    let proto = ctx.protocol.name.as_str();
    tracing::debug!(protocol = proto, role = role.label(), "rendering rust modules");
    vec![
        GeneratedFile {
            file_name: format!("{}.rs", bridge_module_name(proto)),
            content: types::generate_bridge_module(ctx, role),
        },
        GeneratedFile {
            file_name: format!("{}.rs", main_module_name(proto)),
            content: main_file::generate_main_module(ctx, role),
        },
    ]
}

fn module_banner(brief: &str) -> String {
    format!(
        "//! {}\n//!\n//! Generated by lcsfgen. Regenerating overwrites this file.\n\n",
        brief
    )
}

fn push_line(out: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        out.push_str("    ");
    }
    out.push_str(text);
    out.push('\n');
}
