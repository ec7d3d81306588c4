//! Whole-run orchestration: validate, reuse previous main modules, render, write.
//!
//! Validation failures abort before anything touches the disk. After that every artifact
//! is written independently with truncate-and-rewrite, and its outcome is recorded in the
//! returned [`GenerationReport`].

use crate::cgen::{self, GeneratedFile};
use crate::extract::{decode_source, CodeExtractor, ExtractedCode};
use crate::flatten::{prepare, GenContext, ValidationError};
use crate::model::{Protocol, Role};
use crate::rustgen;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Output directory used when neither the caller nor the environment names one.
pub const DEFAULT_OUT_DIR: &str = "lcsf_out";
/// Environment variable overriding [`DEFAULT_OUT_DIR`].
pub const OUT_DIR_ENV: &str = "LCSFGEN_OUT_DIR";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid protocol: {0}")]
    Validation(#[from] ValidationError),
}

/// `$LCSFGEN_OUT_DIR`, else `lcsf_out`.
pub fn default_out_dir() -> PathBuf {
    std::env::var_os(OUT_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub out_dir: PathBuf,
    /// Previously generated `{P}_Main_a.c` to take hand-written code from.
    pub import_a: Option<PathBuf>,
    /// Previously generated `{P}_Main_b.c` to take hand-written code from.
    pub import_b: Option<PathBuf>,
    /// Also emit the Rust modules under `rust_a/` and `rust_b/`.
    pub rust: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions::new(default_out_dir())
    }
}

impl GenerateOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        GenerateOptions {
            out_dir: out_dir.into(),
            import_a: None,
            import_b: None,
            rust: false,
        }
    }

    pub fn with_import(mut self, role: Role, path: impl Into<PathBuf>) -> Self {
        match role {
            Role::A => self.import_a = Some(path.into()),
            Role::B => self.import_b = Some(path.into()),
        }
        self
    }

    pub fn with_rust(mut self, rust: bool) -> Self {
        self.rust = rust;
        self
    }

    pub fn import_path(&self, role: Role) -> Option<&Path> {
        match role {
            Role::A => self.import_a.as_deref(),
            Role::B => self.import_b.as_deref(),
        }
    }
}

/// A rendered file, path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Outcome of importing one previous main module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub role: Role,
    pub path: PathBuf,
    /// False when the file could not be read or extracted; stubs were generated instead.
    pub complete: bool,
}

#[derive(Debug)]
pub struct ArtifactResult {
    pub path: PathBuf,
    pub result: io::Result<()>,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub artifacts: Vec<ArtifactResult>,
    pub imports: Vec<ImportOutcome>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.artifacts.iter().all(|a| a.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArtifactResult> {
        self.artifacts.iter().filter(|a| a.result.is_err())
    }
}

/// Render every artifact without touching the disk. `extracted` is indexed by role.
pub fn render(ctx: &GenContext<'_>, extracted: [Option<&ExtractedCode>; 2], rust: bool) -> Vec<RenderedFile> {
    let mut files: Vec<RenderedFile> = cgen::generate(ctx, extracted)
        .into_iter()
        .map(|f| RenderedFile {
            path: PathBuf::from(f.file_name),
            content: f.content,
        })
        .collect();
    if rust {
        for role in Role::BOTH {
            let dir = PathBuf::from(format!("rust_{}", role.suffix()));
            for GeneratedFile { file_name, content } in rustgen::generate(ctx, role) {
                files.push(RenderedFile {
                    path: dir.join(file_name),
                    content,
                });
            }
        }
    }
    files
}

/// Validate `protocol` and write every artifact under `options.out_dir`.
pub fn generate_all(protocol: &Protocol, options: &GenerateOptions) -> Result<GenerationReport, GenerateError> {
    let ctx = prepare(protocol)?;
    let mut report = GenerationReport::default();

    let mut extracted: [Option<ExtractedCode>; 2] = [None, None];
    for (slot, role) in extracted.iter_mut().zip(Role::BOTH) {
        let Some(path) = options.import_path(role) else {
            continue;
        };
        *slot = import_main_module(protocol, path);
        report.imports.push(ImportOutcome {
            role,
            path: path.to_path_buf(),
            complete: slot.is_some(),
        });
    }

    let files = render(&ctx, [extracted[0].as_ref(), extracted[1].as_ref()], options.rust);
    for file in files {
        let path = options.out_dir.join(&file.path);
        let result = write_file(&path, &file.content);
        match &result {
            Ok(()) => tracing::info!(path = %path.display(), "wrote artifact"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to write artifact"),
        }
        report.artifacts.push(ArtifactResult { path, result });
    }
    Ok(report)
}

/// Extract hand-written code from a previous main module, `None` when it cannot be trusted.
fn import_main_module(protocol: &Protocol, path: &Path) -> Option<ExtractedCode> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read previous main module, generating stubs");
            return None;
        }
    };
    let source = decode_source(&bytes);
    let mut extractor = CodeExtractor::new(protocol.name.as_str());
    if let Err(e) = extractor.extract(&source, &protocol.commands) {
        tracing::warn!(path = %path.display(), error = %e, "falling back to stub generation");
        return None;
    }
    extractor.code().cloned()
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder() {
        let opts = GenerateOptions::new("out")
            .with_import(Role::B, "old_b.c")
            .with_rust(true);
        assert_eq!(opts.import_path(Role::A), None);
        assert_eq!(opts.import_path(Role::B), Some(Path::new("old_b.c")));
        assert!(opts.rust);
    }
}
