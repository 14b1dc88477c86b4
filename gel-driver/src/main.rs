//! Gelleau IR Driver
//!
//! `gelc` builds the demo module, and verifies, prints and reformats
//! modules stored as text or JSON.

mod cli;
mod demo;
mod target;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use gel_common::{Finding, Severity};
use gel_ir::{emit, from_json, parse_module, to_json, verify_with, Module, VerifierConfig};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process;

use crate::cli::{Cli, Command, Format};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::init();
    }

    target::initialize()?;
    let native = target::initialize_native_target()?;
    target::initialize_native_asmprinter()?;
    debug!(
        "Targets initialised for {native} ({} on {}, ready: {})",
        native.arch,
        native.os,
        target::is_ready()
    );

    let config = load_config(cli.config.as_deref(), cli.deny_warnings)?;

    let outcome = match cli.command {
        Command::Demo { output } => {
            let module = demo::build_gelleau()?;
            write_output(&render(&module, cli.format)?, output.as_deref())
        }
        Command::Emit { input, output } => {
            let module = load_module(&input)?;
            check(&module, &config)?;
            write_output(&render(&module, cli.format)?, output.as_deref())
        }
        Command::Verify { input } => {
            let module = load_module(&input)?;
            verify_command(&module, &config, cli.format)
        }
        Command::Fmt { input, in_place } => {
            let module = load_module(&input)?;
            let text = emit(&module)?;
            if in_place {
                fs::write(&input, &text)
                    .with_context(|| format!("Failed to write {}", input.display()))?;
                info!("Reformatted {}", input.display());
                Ok(())
            } else {
                write_output(&text, None)
            }
        }
    };
    target::shutdown()?;
    outcome
}

/// Verifier configuration from an optional JSON file plus command line flags
fn load_config(path: Option<&Path>, deny_warnings: bool) -> Result<VerifierConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            VerifierConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => VerifierConfig::default(),
    };
    if deny_warnings {
        config.deny_warnings = true;
    }
    Ok(config)
}

/// Read a module; `.json` files hold the serialized form, anything else is text
fn load_module(path: &Path) -> Result<Module> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let loaded = if path.extension().is_some_and(|ext| ext == "json") {
        from_json(&text)
    } else {
        parse_module(&text)
    };
    let module = loaded.with_context(|| format!("Failed to load module from {}", path.display()))?;
    debug!("Loaded module '{}' from {}", module.name, path.display());
    Ok(module)
}

fn render(module: &Module, format: Format) -> Result<String> {
    Ok(match format {
        Format::Text => emit(module)?,
        Format::Json => to_json(module)?,
    })
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Module written to: {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Refuse modules with error findings under `config`
fn check(module: &Module, config: &VerifierConfig) -> Result<()> {
    let result = verify_with(module, config);
    for finding in result.findings() {
        eprintln!("{}", colorize(finding));
    }
    if result.has_errors() {
        bail!("module '{}' failed verification: {}", module.name, result.summary());
    }
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport<'a> {
    module: &'a str,
    errors: usize,
    warnings: usize,
    findings: &'a [Finding],
}

fn verify_command(module: &Module, config: &VerifierConfig, format: Format) -> Result<()> {
    let result = verify_with(module, config);
    match format {
        Format::Json => {
            let report = VerifyReport {
                module: &module.name,
                errors: result.error_count(),
                warnings: result.warning_count(),
                findings: result.findings(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            for finding in result.findings() {
                println!("{}", colorize(finding));
            }
            if result.has_errors() {
                println!("{}", result.summary().red());
            } else {
                println!("{}", format!("Module '{}' verified: {}", module.name, result.summary()).green());
            }
        }
    }
    if result.has_errors() {
        bail!("module '{}' failed verification", module.name);
    }
    Ok(())
}

fn colorize(finding: &Finding) -> String {
    let severity = match finding.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    format!("{severity} [{}]: {}", finding.location, finding.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gel_ir::{verify, IrBuilder};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gelc-test-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_demo_module() {
        let module = demo::build_gelleau().unwrap();
        assert!(verify(&module).is_ok());
        assert_eq!(render(&module, Format::Text).unwrap(), indoc! {"
            module gelleau {
              function sum(i64 %a, i64 %b) -> i64 {
              entry:
                %0 = add %a, %b
                ret %0
              }
            }
        "});
    }

    #[test]
    fn test_json_and_text_inputs_agree() {
        let module = demo::build_gelleau().unwrap();
        let json = scratch_file("demo.json", &render(&module, Format::Json).unwrap());
        let text = scratch_file("demo.gel", &render(&module, Format::Text).unwrap());
        assert_eq!(load_module(&json).unwrap(), load_module(&text).unwrap());
    }

    #[test]
    fn test_load_errors_have_context() {
        let path = scratch_file("broken.gel", "module broken {\n  nonsense\n");
        let err = load_module(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load module"));

        let missing = Path::new("/nonexistent/module.gel");
        assert!(load_module(missing).is_err());
    }

    #[test]
    fn test_config_flags() {
        let path = scratch_file("config.json", r#"{ "max_findings": 3 }"#);
        let config = load_config(Some(&path), true).unwrap();
        assert_eq!(config.max_findings, 3);
        assert!(config.deny_warnings);
        assert!(config.check_reachability);

        assert_eq!(load_config(None, false).unwrap(), VerifierConfig::default());
    }

    #[test]
    fn test_check_respects_deny_warnings() {
        let mut builder = IrBuilder::from_module(demo::build_gelleau().unwrap());
        let dead = builder.append_block(0, "dead").unwrap();
        builder.build_ret(dead, gel_ir::Value::i64(0)).unwrap();
        let module = builder.finish();

        assert!(check(&module, &VerifierConfig::default()).is_ok());
        let strict = VerifierConfig { deny_warnings: true, ..VerifierConfig::default() };
        assert!(check(&module, &strict).is_err());
        assert!(verify_command(&module, &strict, Format::Json).is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["gelc", "--deny-warnings", "verify", "m.gel", "--format", "json"]).unwrap();
        assert!(cli.deny_warnings);
        assert_eq!(cli.format, Format::Json);
        assert!(matches!(cli.command, Command::Verify { ref input } if input == Path::new("m.gel")));

        let cli = Cli::try_parse_from(["gelc", "demo", "-o", "out.gel"]).unwrap();
        assert!(matches!(cli.command, Command::Demo { output: Some(_) }));

        assert!(Cli::try_parse_from(["gelc", "frobnicate"]).is_err());
    }
}
