//! dataList CLI - validate and render data list options

use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use datalist::{
    parse_bindings, BindingGraph, DataList, DataListError, DataModel, FixSuggestion,
    HttpTransport, ListOptions, MemoryDom, MockTransport, SimpleTemplateEngine, TemplateRegistry,
    Transport,
};

#[derive(Parser)]
#[command(name = "datalist")]
#[command(about = "dataList - declarative data lists rendered from remote data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an options file and print its binding tree
    Validate {
        /// Path to the options YAML file
        file: String,
    },

    /// Fetch data and render every binding
    Render {
        /// Path to the options YAML file
        file: String,

        /// Read templates from this file instead of templateUrl
        #[arg(short, long)]
        templates: Option<String>,

        /// Override serverUrl
        #[arg(short, long)]
        server_url: Option<String>,

        /// Answer the data request from this JSON file instead of the server
        #[arg(short, long)]
        payload: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => validate_options(&file),
        Commands::Render {
            file,
            templates,
            server_url,
            payload,
        } => render_list(&file, templates, server_url, payload).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn validate_options(file: &str) -> Result<(), DataListError> {
    let options = ListOptions::load(file)?.with_env();
    options.validate()?;
    let graph = BindingGraph::build(parse_bindings(&options.bindings)?, options.parent_resolution)?;

    println!("{} Options '{}' are valid", "✓".green(), file);
    if let Some(id) = &options.list_id {
        println!("  List: {}", id);
    }
    println!("  Bindings: {}", graph.len());
    for id in graph.render_order() {
        let node = graph.node(id);
        let data = node
            .record()
            .data_key()
            .map(|key| format!(" ← {}", key))
            .unwrap_or_default();
        println!(
            "  {}{} {}{}",
            "  ".repeat(graph.depth(id)),
            node.template().cyan(),
            node.element().dimmed(),
            data
        );
    }
    println!("  Events: {}", options.events.len());
    println!("  Data URL: {}", DataModel::from_options(&options).url());

    Ok(())
}

async fn render_list(
    file: &str,
    templates: Option<String>,
    server_url: Option<String>,
    payload: Option<String>,
) -> Result<(), DataListError> {
    let mut options = ListOptions::load(file)?.with_env();
    if let Some(url) = server_url {
        options.server_url = url;
    }
    options.validate()?;

    let http: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);

    let registry = match (templates, &options.template_url) {
        (Some(path), _) => TemplateRegistry::from_document(&fs::read_to_string(path)?),
        (None, Some(url)) => TemplateRegistry::fetch(http.as_ref(), url).await?,
        (None, None) => {
            return Err(DataListError::Config {
                reason: "no templates: pass --templates or set templateUrl".to_string(),
            })
        }
    };
    println!("{} Loaded {} templates", "→".cyan(), registry.len());

    let transport: Arc<dyn Transport> = match payload {
        Some(path) => {
            let mock = MockTransport::new();
            mock.queue_body(fs::read_to_string(path)?);
            Arc::new(mock)
        }
        None => http,
    };

    let selectors: Vec<String> = options.bindings.keys().cloned().collect();
    let engine = Arc::new(SimpleTemplateEngine::new(Arc::new(registry)));
    let dom = Box::new(MemoryDom::with_elements(selectors.iter().cloned()));

    let mut list = DataList::new(options, engine, transport, dom)?;
    println!("{} {}", "→".cyan(), list.model().url());
    let changed = list.initialize().await?;
    println!("{} {} bindings updated", "✓".green(), changed.len());

    for selector in &selectors {
        println!("{}", selector.cyan().bold());
        println!("{}", list.html(selector).unwrap_or_default());
    }
    for alert in list.diagnostics().alerts() {
        println!("{} {}", "!".yellow().bold(), alert);
    }

    Ok(())
}
