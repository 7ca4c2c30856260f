//! dcevm — command-line demo of `dcevm_engine::redefine_classes`.
//!
//! Loads a fixture describing a batch of seed classes and their
//! redefinitions, runs the transaction against an `InMemoryRuntime`, and
//! prints the resulting report.

use clap::{Parser, Subcommand};
use dcevm_core::{ClassVersion, Symbol};
use dcevm_engine::runtime::ClassStub;
use dcevm_engine::{ClassDefinition, InMemoryRuntime, ManagedRuntime, RedefinitionConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}
fn status_label(label: &str) -> String {
    format!("\x1b[1;32m{:>12}\x1b[0m", label)
}

#[derive(Parser)]
#[command(
    name = "dcevm",
    about = "Dynamic Code Evolution — redefine already-loaded classes in one safepointed transaction",
    version,
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}

Examples:
  dcevm redefine fixtures/add-field.json            Run a redefinition fixture
  dcevm redefine fixtures/add-field.json --advanced  Allow schema/hierarchy changes
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a redefinition fixture against the in-memory reference runtime
    Redefine {
        /// Path to the fixture JSON (seed classes + redefinition bytes)
        fixture: PathBuf,

        /// Path to a dcevm.toml config file (defaults unless given)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Allow advanced-mode changes (schema/hierarchy), not just method bodies
        #[arg(long)]
        advanced: bool,

        /// Attempt interpreter frame forwarding for executing frames
        #[arg(long)]
        forward_points: bool,

        /// Trace verbosity, 0 (off) through 5 (per-class spans)
        #[arg(long)]
        trace: Option<u8>,

        /// Record per-phase timings in the report
        #[arg(long)]
        time: bool,
    },
}

/// The fixture shape: classes to seed the registry with, and the new bytes
/// to redefine each of a subset of them to. Both `seed` and `redefine`
/// entries are `ClassStub`-shaped JSON objects.
#[derive(Debug, serde::Deserialize)]
struct Fixture {
    #[serde(default)]
    seed: Vec<serde_json::Value>,
    #[serde(default)]
    redefine: Vec<serde_json::Value>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("reading fixture {path}: {source}")]
    ReadFixture { path: PathBuf, source: std::io::Error },
    #[error("reading config {path}: {source}")]
    ReadConfig { path: PathBuf, source: std::io::Error },
    #[error("parsing config {path}: {source}")]
    ParseConfig { path: PathBuf, source: toml::de::Error },
    #[error("parsing fixture {path}: {source}")]
    ParseFixture { path: PathBuf, source: serde_json::Error },
    #[error("seed entry is not a valid class stub: {0}")]
    BadSeed(serde_json::Error),
    #[error("redefine entry has no \"name\" field")]
    MissingName,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dcevm_engine=info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Redefine { fixture, config, advanced, forward_points, trace, time } => {
            match cmd_redefine(&fixture, config.as_deref(), advanced, forward_points, trace, time) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{} {}", red("error:"), e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn cmd_redefine(
    fixture_path: &Path,
    config_path: Option<&Path>,
    advanced: bool,
    forward_points: bool,
    trace: Option<u8>,
    time: bool,
) -> Result<(), CliError> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => RedefinitionConfig::default(),
    };
    config.allow_advanced_class_redefinition |= advanced;
    config.use_method_forward_points |= forward_points;
    if let Some(level) = trace {
        config.trace_redefine_classes = level;
    }
    config.time_redefine_classes |= time;

    let fixture = load_fixture(fixture_path)?;
    tracing::debug!(
        seed = fixture.seed.len(),
        redefine = fixture.redefine.len(),
        "loaded fixture {}",
        fixture_path.display()
    );

    let mut runtime = InMemoryRuntime::new();
    for stub_json in &fixture.seed {
        seed_one(&mut runtime, stub_json)?;
    }

    let mut defs = Vec::with_capacity(fixture.redefine.len());
    for value in &fixture.redefine {
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(CliError::MissingName)?;
        let identity = dcevm_core::ClassIdentity::new(Symbol::intern(name), 0);
        let bytes = serde_json::to_vec(value).expect("Value round-trips to JSON");
        defs.push(ClassDefinition::new(identity, bytes));
    }

    println!("{} {} class(es)", status_label("Redefining"), defs.len());
    let start = std::time::Instant::now();

    match dcevm_engine::redefine_classes(&defs, &config, &mut runtime) {
        Ok(report) => {
            let elapsed = start.elapsed();
            println!(
                "{} in {:.3}s — {} rewritten in place, {} flagged for migration{}",
                green("committed"),
                elapsed.as_secs_f64(),
                report.instances_rewritten_in_place,
                report.instances_needing_migration,
                if report.full_gc_ran { " (full GC)" } else { "" }
            );
            for (identity, flags) in &report.flags {
                println!("  {} {:?}", bold(identity.name.as_str()), flags);
            }
            if let Some(timings) = report.timings {
                println!("  total: {:?}", timings.total);
                println!(
                    "    prologue {:?}  class_loading {:?}  class_linking {:?}",
                    timings.prologue, timings.class_loading, timings.class_linking
                );
                println!(
                    "    wait_for_locks {:?}  prepare_redefinition {:?}  heap_iteration {:?}",
                    timings.wait_for_locks, timings.prepare_redefinition, timings.heap_iteration
                );
                println!(
                    "    redefinition {:?}  vm_op_epilogue {:?}",
                    timings.redefinition, timings.vm_op_epilogue
                );
            }
            Ok(())
        }
        Err(code) => {
            eprintln!("{} {:?}", red("rolled back:"), code);
            std::process::exit(1);
        }
    }
}

fn load_config(path: &Path) -> Result<RedefinitionConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CliError::ReadConfig { path: path.to_path_buf(), source })?;
    RedefinitionConfig::from_toml_str(&text)
        .map_err(|source| CliError::ParseConfig { path: path.to_path_buf(), source })
}

fn load_fixture(path: &Path) -> Result<Fixture, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CliError::ReadFixture { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseFixture { path: path.to_path_buf(), source })
}

/// Load one seed `ClassStub` into `runtime`'s registry as the first version
/// of its chain, and register its class-object/mirror heap roots.
fn seed_one(runtime: &mut InMemoryRuntime, stub_json: &serde_json::Value) -> Result<(), CliError> {
    let stub: ClassStub = serde_json::from_value(stub_json.clone()).map_err(CliError::BadSeed)?;
    let identity = dcevm_core::ClassIdentity::new(Symbol::intern(&stub.name), 0);
    let fields = stub.declared_fields();
    let mut methods = stub.declared_methods();
    for (i, method) in methods.iter_mut().enumerate() {
        method.method_id = i as u64 + 1;
    }
    let version = Arc::new(ClassVersion::new(
        identity,
        stub.super_name.as_deref().map(Symbol::intern),
        stub.interfaces.iter().map(|s| Symbol::intern(s)).collect(),
        fields,
        methods,
        stub.instance_size(),
        stub.class_size(),
        stub.is_interface,
        None,
    ));
    runtime.registry().load_initial(version);
    runtime.seed_class_roots(identity);
    Ok(())
}
