use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde_json::{Value, json};

use oir_core::config::{self, CONFIG_FILE_NAME, OirConfig};
use oir_core::ir::{ComponentKind, IrDocument, SchemaKind};
use oir_core::parse;
use oir_core::parse::spec::OpenApiSpec;
use oir_core::transform;
use oir_core::transform::complexity::complexity_score;

#[derive(Parser)]
#[command(name = "oir", about = "OpenAPI 3.x intermediate representation builder", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an OpenAPI spec by building its IR
    Validate {
        /// Path to the OpenAPI spec file (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Inspect the built IR of an OpenAPI spec
    Inspect {
        /// Path to the OpenAPI spec file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Print component schemas in declaration order, with cycles
    Graph {
        /// Path to the OpenAPI spec file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the enum catalog
    Enums {
        /// Path to the OpenAPI spec file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Initialize a new oir configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input } => cmd_validate(input),

        Commands::Inspect { input, format } => cmd_inspect(input, format),

        Commands::Graph { input } => cmd_graph(input),

        Commands::Enums { input } => cmd_enums(input),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "oir", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<OirConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn read_spec(path: &Path) -> Result<OpenApiSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let parsed = match ext {
        "json" => parse::from_json(&content),
        _ => parse::from_yaml(&content),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

/// Resolve the input path, read the spec and build its IR with the
/// project's build options.
fn load_document(input: Option<PathBuf>) -> Result<(PathBuf, OpenApiSpec, IrDocument)> {
    let cfg = match try_load_config()? {
        Some(cfg) => {
            log::debug!("loaded {CONFIG_FILE_NAME}");
            cfg
        }
        None => OirConfig::default(),
    };
    let input = input.unwrap_or_else(|| PathBuf::from(&cfg.input));
    let spec = read_spec(&input)?;

    let doc = transform::build_document_with_options(&spec, &cfg.build_options())
        .with_context(|| format!("failed to build the IR of {}", input.display()))?;
    Ok((input, spec, doc))
}

fn cmd_validate(input: Option<PathBuf>) -> Result<()> {
    let (input, spec, doc) = load_document(input)?;

    eprintln!(
        "Valid OpenAPI {} spec: {} ({})",
        spec.openapi,
        spec.info.title,
        input.display()
    );
    eprintln!("  Version: {}", spec.info.version);
    for server in &doc.servers {
        eprintln!("  Server: {}", server.default_url());
    }
    eprintln!("  Paths: {}", spec.paths.len());
    eprintln!("  Operations: {}", doc.operations.len());
    eprintln!("  Webhooks: {}", doc.webhooks.len());
    eprintln!("  Components: {}", doc.components.len());
    eprintln!("  Schemas: {}", doc.schema_index.len());
    eprintln!("  Cycles: {}", doc.graph.cycles().len());
    eprintln!("  Enums: {}", doc.enums.len());

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: Option<PathBuf>, format: InspectFormat) -> Result<()> {
    let (_, _, doc) = load_document(input)?;

    let summary = build_inspect_summary(&doc);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn kind_label(kind: &SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Reference(_) => "reference",
        SchemaKind::Primitive(p) => p.as_str(),
        SchemaKind::Object(_) => "object",
        SchemaKind::Array(_) => "array",
        SchemaKind::Composition(c) => c.kind.keyword(),
        SchemaKind::Not(_) => "not",
        SchemaKind::MultiType(_) => "multi-type",
        SchemaKind::Unknown => "unknown",
    }
}

fn build_inspect_summary(doc: &IrDocument) -> Value {
    let schemas: Vec<Value> = doc
        .schemas()
        .filter_map(|c| c.as_schema().map(|node| (c, node)))
        .map(|(c, node)| {
            json!({
                "name": c.name,
                "pointer": c.pointer,
                "kind": kind_label(&node.kind),
                "depth": doc.graph.depth(&c.pointer),
                "circular": doc.is_circular(&c.pointer),
                "complexity": complexity_score(node),
                "extract": doc.should_extract(node),
            })
        })
        .collect();

    let other_components: Vec<Value> = doc
        .components
        .iter()
        .filter(|c| !matches!(c.kind, ComponentKind::Schema(_)))
        .map(|c| {
            let mut entry = json!({
                "name": c.name,
                "section": c.component_type().section(),
            });
            if let ComponentKind::SecurityScheme(scheme) = &c.kind {
                entry["scheme"] = json!(scheme.summary());
            }
            entry
        })
        .collect();

    let operations: Vec<Value> = doc
        .all_operations()
        .map(|op| {
            json!({
                "name": op.name.camel_case,
                "method": op.method.as_str(),
                "path": op.path,
                "tags": op.tags,
                "parameters": op.parameters.iter().map(|p| &p.original_name).collect::<Vec<_>>(),
                "request_body": op.request_body.as_ref().map(|b| &b.media_type),
                "main_response": op.responses.main.map(|s| s.to_string()),
                "errors": op.responses.errors.keys().collect::<Vec<_>>(),
                "secured": !op.security.is_empty(),
            })
        })
        .collect();

    json!({
        "info": {
            "title": doc.info.title,
            "version": doc.info.version,
            "openapi": doc.openapi,
        },
        "schemas": schemas,
        "components": other_components,
        "operations": operations,
        "topological_order": doc.graph.topological_order(),
        "cycles": doc.graph.cycles(),
        "enums": doc.enums.keys().collect::<Vec<_>>(),
    })
}

fn cmd_graph(input: Option<PathBuf>) -> Result<()> {
    let (_, _, doc) = load_document(input)?;

    for component in doc.ordered_schemas() {
        let Some(node) = doc.graph.node(&component.pointer) else {
            continue;
        };
        let marker = if node.circular { " (circular)" } else { "" };
        println!("{} [depth {}]{}", component.pointer, node.depth, marker);
        for dep in &node.dependencies {
            println!("  -> {dep}");
        }
    }

    let cycles = doc.graph.cycles();
    if !cycles.is_empty() {
        println!();
        println!("Cycles:");
        for cycle in cycles {
            println!("  {}", cycle.join(", "));
        }
    }
    Ok(())
}

fn cmd_enums(input: Option<PathBuf>) -> Result<()> {
    let (_, _, doc) = load_document(input)?;

    for (name, entry) in &doc.enums {
        let values: Vec<String> = entry.values.iter().map(Value::to_string).collect();
        println!("{name}: {}", values.join(" | "));
        println!("  from {}", entry.source);
    }
    if doc.enums.is_empty() {
        eprintln!("No enums found.");
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
