//! Generate LCSF C (and optionally Rust) sources from a protocol description.
//!
//! Usage:
//!   lcsfgen [OPTIONS] SCHEMA.lcsf
//!
//! Options:
//!   -o, --out DIR        Output directory (default: $LCSFGEN_OUT_DIR or lcsf_out)
//!   --import-a FILE      Previous {P}_Main_a.c whose hand-written code is kept
//!   --import-b FILE      Previous {P}_Main_b.c whose hand-written code is kept
//!   --rust               Also generate the Rust modules
//!   --check              Validate and render only, write nothing
//!
//! Log verbosity follows RUST_LOG (default: info).

use anyhow::{bail, Context};
use lcsfgen::{generate_all, output, parse, prepare, render, GenerateOptions, Role};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    schema: PathBuf,
    options: GenerateOptions,
    check: bool,
}

fn take_value(args: &mut Vec<String>, flags: &[&str]) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| flags.contains(&a.as_str())) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} expects a value", args[pos]);
    }
    args.remove(pos);
    Ok(Some(args.remove(pos)))
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let out_dir = take_value(&mut args, &["-o", "--out"])?
        .map(PathBuf::from)
        .unwrap_or_else(output::default_out_dir);
    let mut options = GenerateOptions::new(out_dir).with_rust(take_flag(&mut args, "--rust"));
    if let Some(path) = take_value(&mut args, &["--import-a"])? {
        options = options.with_import(Role::A, path);
    }
    if let Some(path) = take_value(&mut args, &["--import-b"])? {
        options = options.with_import(Role::B, path);
    }
    let check = take_flag(&mut args, "--check");
    if let Some(unknown) = args.iter().find(|a| a.starts_with('-')) {
        bail!("unknown option {}", unknown);
    }
    let schema = match args.as_slice() {
        [one] => PathBuf::from(one),
        _ => bail!("Usage: lcsfgen [-o DIR] [--import-a FILE] [--import-b FILE] [--rust] [--check] SCHEMA.lcsf"),
    };
    Ok(Args { schema, options, check })
}

fn run() -> anyhow::Result<bool> {
    let args = parse_args()?;
    let source = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("reading {}", args.schema.display()))?;
    let protocol = parse(&source)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("parsing {}", args.schema.display()))?;

    if args.check {
        let ctx = prepare(&protocol).context("validating protocol")?;
        let files = render(&ctx, [None, None], args.options.rust);
        tracing::info!(protocol = %protocol.name, files = files.len(), "schema is valid");
        return Ok(true);
    }

    let report = generate_all(&protocol, &args.options)?;
    for import in report.imports.iter().filter(|i| !i.complete) {
        eprintln!(
            "warning: {} could not be reused, role {} main module regenerated from stubs",
            import.path.display(),
            import.role.label()
        );
    }
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!("error: {}: {}", failure.path.display(), e);
        }
    }
    Ok(report.is_success())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
