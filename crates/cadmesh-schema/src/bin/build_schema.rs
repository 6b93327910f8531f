//! Regenerates the packaged `schema.json` from the schema fragments.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use cadmesh_schema::{ResolveError, ResolveOptions, Resolver, SchemaStore, ROOT_FRAGMENT};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cadmesh-build-schema", version, about)]
struct Args {
    /// Directory holding the `*.schema.json` fragments
    #[arg(long, default_value = "extensions/TM_brep_faces/schema")]
    schema_dir: PathBuf,

    /// Where to write the resolved schema
    #[arg(short, long, default_value = "crates/cadmesh-schema/schema.json")]
    output: PathBuf,

    /// Root fragment to resolve
    #[arg(long, default_value = ROOT_FRAGMENT)]
    root: String,

    /// Maximum `$ref` nesting
    #[arg(long, default_value_t = cadmesh_schema::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Only compare against the existing output; exit non-zero if it is stale
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, ResolveError> {
    let store = SchemaStore::load_dir(&args.schema_dir)?;
    let options = ResolveOptions::default().with_max_depth(args.max_depth);
    let resolved = Resolver::with_options(&store, options).resolve_root(&args.root)?;

    if args.check {
        let current = fs::read_to_string(&args.output).map_err(|source| ResolveError::Io {
            path: args.output.clone(),
            source,
        })?;
        let current: Value = serde_json::from_str(&current).map_err(|source| ResolveError::Json {
            path: args.output.clone(),
            source,
        })?;
        if current == resolved {
            info!(output = %args.output.display(), "schema is up to date");
            return Ok(ExitCode::SUCCESS);
        }
        error!(output = %args.output.display(), "schema is stale; rerun without --check");
        return Ok(ExitCode::FAILURE);
    }

    let mut text = serde_json::to_string_pretty(&resolved).map_err(|source| ResolveError::Json {
        path: args.output.clone(),
        source,
    })?;
    text.push('\n');
    fs::write(&args.output, text).map_err(|source| ResolveError::Io {
        path: args.output.clone(),
        source,
    })?;
    info!(
        fragments = store.len(),
        output = %args.output.display(),
        "wrote resolved schema"
    );
    Ok(ExitCode::SUCCESS)
}
