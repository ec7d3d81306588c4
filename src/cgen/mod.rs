//! C backend: main header, per-role main modules, LCSF bridge and descriptor tables.
//!
//! Every pass is a pure function of a [`GenContext`] (plus, for the main module, an optional
//! [`ExtractedCode`] from a previous run) returning the file text. Nothing is cached between
//! passes, so regenerating from the same inputs reproduces the same bytes.

pub mod bridge;
pub mod desc;
pub mod header;
pub mod main_file;

use crate::extract::ExtractedCode;
use crate::flatten::GenContext;
use crate::model::Role;

const INDENT: &str = "    ";

/// A rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub file_name: String,
    pub content: String,
}

pub fn main_header_name(protocol: &str) -> String {
    format!("{}_Main.h", protocol)
}

pub fn main_source_name(protocol: &str, role: Role) -> String {
    format!("{}_Main_{}.c", protocol, role.suffix())
}

pub fn bridge_header_name(protocol: &str) -> String {
    format!("LCSF_Bridge_{}.h", protocol)
}

pub fn bridge_source_name(protocol: &str, role: Role) -> String {
    format!("LCSF_Bridge_{}_{}.c", protocol, role.suffix())
}

pub fn desc_name(protocol: &str) -> String {
    format!("LCSF_Desc_{}.c", protocol)
}

/// Render every C artifact. `extracted` is indexed by role (A first).
pub fn generate(ctx: &GenContext<'_>, extracted: [Option<&ExtractedCode>; 2]) -> Vec<GeneratedFile> {
    let proto = ctx.protocol.name.as_str();
    let header_source = extracted[0].or(extracted[1]);
    let mut files = vec![GeneratedFile {
        file_name: main_header_name(proto),
        content: header::generate_main_header(ctx, header_source),
    }];
    for (role, previous) in Role::BOTH.into_iter().zip(extracted) {
        files.push(GeneratedFile {
            file_name: main_source_name(proto, role),
            content: main_file::generate_main_source(ctx, role, previous),
        });
    }
    files.push(GeneratedFile {
        file_name: bridge_header_name(proto),
        content: bridge::generate_bridge_header(ctx),
    });
    for role in Role::BOTH {
        files.push(GeneratedFile {
            file_name: bridge_source_name(proto, role),
            content: bridge::generate_bridge_source(ctx, role),
        });
    }
    files.push(GeneratedFile {
        file_name: desc_name(proto),
        content: desc::generate_desc(ctx),
    });
    files
}

/// Doxygen file banner opening every generated file.
fn file_banner(file_name: &str, brief: &str) -> String {
    format!(
        "/**\n * \\file {}\n * \\brief {}\n * \\author LCSF Generator\n *\n */\n\n",
        file_name, brief
    )
}

/// Append `text` at the given indentation level.
fn push_line(out: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

/// Doxygen block for a function: `\fn`, `\brief`, `\param`s and `\return`.
fn doc_block(signature: &str, brief: &str, params: &[(&str, &str)], ret: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("/**\n");
    out.push_str(&format!(" * \\fn {}\n", signature));
    out.push_str(&format!(" * \\brief {}\n", brief));
    out.push_str(" *\n");
    for (name, text) in params {
        out.push_str(&format!(" * \\param {} {}\n", name, text));
    }
    if let Some(ret) = ret {
        out.push_str(&format!(" * \\return {}\n", ret));
    }
    out.push_str(" */\n");
    out
}

/// Include guard symbol for a header file name.
fn include_guard(file_name: &str) -> String {
    file_name.to_lowercase().replace('.', "_")
}
