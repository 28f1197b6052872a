use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use runway_engine::{InvocationEngine, ModelCatalog, ModelDescriptor, NodeDescription, Slot, UpdateOutcome, encode_value};
use runway_registry::{ModelsConfig, default_models_dir};
use runway_types::{EncodedImage, SlotValue};
use runway_util::expand_tilde;
use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Inspect and query Runway models from the terminal.
#[derive(Parser, Debug)]
#[command(name = "runway", version, about)]
struct Cli {
    /// Directory holding hosted-models.txt and local-models.txt
    #[arg(long, global = true, value_name = "DIR")]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured models
    List,
    /// Resolve a model and print its inputs and outputs
    Info {
        /// Full identifier or short name
        model: String,
    },
    /// Run a model once with the given inputs
    Query {
        /// Full identifier or short name
        model: String,
        /// Assign an input, parsed according to its type
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,
        /// Assign an image input from a file
        #[arg(long = "image", value_name = "NAME=PATH")]
        images: Vec<String>,
        /// Write image outputs here as <name>.jpg
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Open a hosted model's dashboard page in the browser
    Open {
        /// Full identifier or short name
        model: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let directory = cli
        .models_dir
        .as_deref()
        .map(|dir| expand_tilde(&dir.to_string_lossy()))
        .unwrap_or_else(default_models_dir);
    let catalog = ModelCatalog::load(ModelsConfig::new(directory.clone()))
        .with_context(|| format!("failed to load model lists from {}", directory.display()))?;
    debug!(directory = %directory.display(), models = catalog.len(), "catalog ready");

    match cli.command {
        Command::List => list(&catalog, &directory),
        Command::Info { model } => info(find(&catalog, &model)?),
        Command::Query {
            model,
            values,
            images,
            out_dir,
        } => query(find(&catalog, &model)?, &values, &images, out_dir.as_deref()),
        Command::Open { model } => open_dashboard(find(&catalog, &model)?),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn find<'a>(catalog: &'a ModelCatalog, name: &str) -> Result<&'a Arc<ModelDescriptor>> {
    catalog
        .find(name)
        .with_context(|| format!("no configured model named '{name}'"))
}

fn list(catalog: &ModelCatalog, directory: &Path) -> Result<()> {
    if catalog.is_empty() {
        println!("No models configured in {}", directory.display());
        return Ok(());
    }
    for model in catalog.models() {
        println!("{:<7} {:<32} {}", model.kind().label(), model.full_identifier(), model.base_url());
    }
    Ok(())
}

fn info(model: &ModelDescriptor) -> Result<()> {
    model.resolve();
    print_node(&model.describe());
    Ok(())
}

fn print_node(node: &NodeDescription) {
    println!("{} [{}]", node.name, node.category);
    if let Some(summary) = &node.summary {
        println!("{summary}");
    }
    for (heading, pins) in [("Inputs", &node.inputs), ("Outputs", &node.outputs)] {
        println!("\n{heading}:");
        if pins.is_empty() {
            println!("  (none)");
        }
        for pin in pins {
            println!("  {pin}");
            for line in pin.description.lines().filter(|line| !line.trim().is_empty()) {
                println!("      {line}");
            }
        }
    }
    for message in &node.messages {
        println!("\n{:?}: {}", message.severity, message.message);
    }
    if let Some(url) = &node.dashboard_url {
        println!("\nDashboard: {url}");
    }
}

fn query(model: &Arc<ModelDescriptor>, values: &[String], images: &[String], out_dir: Option<&Path>) -> Result<()> {
    let mut engine = InvocationEngine::new(Arc::clone(model));
    if engine.inputs().is_empty() {
        let reason = model
            .messages()
            .into_iter()
            .map(|message| message.message)
            .next()
            .unwrap_or_else(|| "its schema could not be resolved; rerun with RUST_LOG=debug for details".into());
        bail!("cannot query '{}': {reason}", model.full_identifier());
    }

    for assignment in values {
        let (name, raw) = split_assignment(assignment)?;
        let slot = engine
            .input(name)
            .with_context(|| format!("model has no input named '{name}'"))?;
        let value = SlotValue::parse(slot.semantic_type(), raw)?;
        engine.set_input(name, value)?;
    }
    for assignment in images {
        let (name, path) = split_assignment(assignment)?;
        let path = expand_tilde(path);
        let image = EncodedImage::open(&path).with_context(|| format!("failed to read image {}", path.display()))?;
        engine.set_input(name, SlotValue::Image(Some(image)))?;
    }

    engine.set_query(true)?;
    match engine.update()? {
        UpdateOutcome::Updated => {}
        UpdateOutcome::Skipped => {
            println!("Model returned no value");
            return Ok(());
        }
        UpdateOutcome::Idle => bail!("model has no inputs to send"),
    }

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let mut printed = Map::new();
    for slot in engine.outputs() {
        printed.insert(slot.original_name().to_string(), render_output(slot, out_dir)?);
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(printed))?);
    Ok(())
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    match assignment.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => bail!("expected NAME=VALUE, got '{assignment}'"),
    }
}

fn render_output(slot: &Slot, out_dir: Option<&Path>) -> Result<Value> {
    let SlotValue::Image(image) = slot.value() else {
        return Ok(encode_value(slot.original_name(), slot.value())?);
    };
    let Some(image) = image else {
        return Ok(Value::Null);
    };
    let Some(dir) = out_dir else {
        return Ok(Value::String(slot.value().to_string()));
    };
    let path = dir.join(format!("{}.jpg", slot.original_name()));
    fs::write(&path, image.as_bytes()).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Value::String(path.display().to_string()))
}

fn open_dashboard(model: &ModelDescriptor) -> Result<()> {
    if !model.open_editor().context("failed to open the browser")? {
        bail!("'{}' is a local model and has no dashboard page", model.full_identifier());
    }
    Ok(())
}
