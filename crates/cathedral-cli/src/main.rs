mod fetch;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cathedral_core::{Catalog, Controller, Transition, UserProfile, today};
use cathedral_store::{DirSource, SettingsHome};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};

#[derive(Parser)]
#[command(name = "cathedral", about = "Cathedral dataset access controller CLI and MCP server")]
struct Cli {
    /// Settings profile (one settings database per profile)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Directory holding the dataset JSON files
    #[arg(long, global = true, env = "CATHEDRAL_DATASETS")]
    datasets: Option<PathBuf>,

    /// Base URL to fetch the dataset JSON files from
    #[arg(long, global = true, conflicts_with = "datasets")]
    datasets_url: Option<String>,

    /// Catalog TOML replacing the built-in tables
    #[arg(long, global = true, env = "CATHEDRAL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Show mode, levels and every dataset toggle
    Status,

    /// Switch a dataset on or off (flips when neither flag is given)
    Toggle {
        /// Dataset name
        name: String,

        #[arg(long, conflicts_with = "off")]
        on: bool,

        #[arg(long)]
        off: bool,
    },

    /// Apply a mode preset: beginner, intermediate, advanced, custom
    Mode { mode: String },

    /// Set intensity: gentle, moderate, deep, advanced
    Intensity { level: String },

    /// Set safety level: maximum, standard, advanced_practitioner
    Safety { level: String },

    /// Set or clear the user profile
    Profile {
        /// Experience level (1-5)
        #[arg(long, required_unless_present = "clear")]
        level: Option<u8>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Remove the stored profile
        #[arg(long, conflicts_with_all = ["level", "name"])]
        clear: bool,
    },

    /// Print a codex node as JSON
    Node {
        id: u32,

        /// Attach correlated records from active datasets
        #[arg(long)]
        connections: bool,
    },

    /// Correlate a codex node against dataset tags
    Correlate {
        id: u32,

        /// Comma-separated dataset tags (default: every active dataset)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
    },

    /// Search active datasets by healing need
    Search { term: String },

    /// Node and angel for a day of the year
    Focus {
        /// Day of the year (default: today, UTC)
        #[arg(long)]
        day: Option<u32>,
    },

    /// Engage emergency gentle mode
    Emergency,

    /// Print the active catalog as TOML
    Catalog,
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalog::from_toml_str(&content)
        .with_context(|| format!("failed to load catalog {}", path.display()))
}

fn open_home(cli: &Cli) -> Result<SettingsHome> {
    let base_dir = std::env::var("CATHEDRAL_DATA_DIR")
        .ok()
        .map(PathBuf::from);
    SettingsHome::open(cli.profile.as_deref(), base_dir.as_deref())
        .context("failed to open settings home")
}

/// Catalog, settings store, saved settings, then datasets. Loading runs to
/// completion before any command touches a toggle.
async fn load_controller(cli: &Cli) -> Result<Controller> {
    let catalog = load_catalog(cli.catalog.as_deref())?;
    let home = open_home(cli)?;
    let store = home.open_store().context("failed to open settings store")?;

    let mut controller = Controller::new(catalog).with_store(store);
    controller.restore();

    if let Some(dir) = &cli.datasets {
        let source = DirSource::new(dir);
        tracing::debug!("loading datasets from {}", source.root().display());
        controller.load_datasets(&source);
    } else if let Some(url) = &cli.datasets_url {
        let source = fetch::prefetch(url, &controller.catalog().sources).await?;
        controller.load_datasets(&source);
    } else {
        tracing::debug!("no dataset source configured, using synthesized datasets only");
    }
    Ok(controller)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut controller = load_controller(&cli).await?;

    match &cli.command {
        Commands::Serve => cmd_serve(controller).await,
        Commands::Status => cmd_status(&cli, &controller),
        Commands::Toggle { name, on, off } => {
            let desired = match (*on, *off) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_toggle(&mut controller, name, desired)
        }
        Commands::Mode { mode } => cmd_mode(&mut controller, mode),
        Commands::Intensity { level } => cmd_intensity(&mut controller, level),
        Commands::Safety { level } => cmd_safety(&mut controller, level),
        Commands::Profile { level, name, clear } => {
            let profile = if *clear {
                None
            } else {
                level.map(|level| UserProfile {
                    name: name.clone(),
                    ..UserProfile::with_level(level)
                })
            };
            cmd_profile(&mut controller, profile)
        }
        Commands::Node { id, connections } => cmd_node(&controller, *id, *connections),
        Commands::Correlate { id, types } => cmd_correlate(&controller, *id, types),
        Commands::Search { term } => cmd_search(&controller, term),
        Commands::Focus { day } => cmd_focus(&controller, day.unwrap_or_else(today)),
        Commands::Emergency => cmd_emergency(&mut controller),
        Commands::Catalog => cmd_catalog(&controller),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn save(controller: &mut Controller) -> Result<()> {
    controller.save().context("failed to save settings")
}

async fn cmd_serve(controller: Controller) -> Result<()> {
    tracing::info!(
        "starting MCP server (mode {}, {} datasets registered)",
        controller.mode(),
        controller.registry().len()
    );
    let service = server::CathedralServer::new(controller)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

fn cmd_status(cli: &Cli, controller: &Controller) -> Result<()> {
    let status = controller.status();
    let active = status.toggles.iter().filter(|t| t.active).count();

    println!("profile:    {}", cli.profile.as_deref().unwrap_or("default"));
    println!("mode:       {}", status.mode);
    println!("intensity:  {}", status.intensity);
    println!("safety:     {}", status.safety_level);
    match &status.profile {
        Some(p) => println!("experience: {}", p.experience_level),
        None => println!("experience: (no profile)"),
    }
    println!("active:     {active}/{}", status.toggles.len());
    println!("registered: {}", status.registered.len());
    for entry in &status.toggles {
        let mark = if entry.active { "x" } else { " " };
        let category = serde_json::to_value(entry.category)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!("  [{mark}] {:<22} {category}", entry.name);
    }
    for failure in &status.failed_loads {
        println!("failed:     {failure}");
    }
    Ok(())
}

fn cmd_toggle(controller: &mut Controller, name: &str, desired: Option<bool>) -> Result<()> {
    match controller.toggle(name, desired.into()) {
        Transition::Applied { active } => {
            println!("{name}: {}", if active { "on" } else { "off" });
            Ok(())
        }
        Transition::Rejected(reason) => bail!("cannot toggle '{name}': {reason}"),
    }
}

fn cmd_mode(controller: &mut Controller, mode: &str) -> Result<()> {
    if !controller.set_mode(mode) {
        bail!("invalid mode '{mode}' (expected beginner, intermediate, advanced or custom)");
    }
    save(controller)?;
    println!(
        "mode: {} ({} datasets active, intensity {}, safety {})",
        controller.mode(),
        controller.toggles().active_names().count(),
        controller.intensity(),
        controller.safety_level()
    );
    Ok(())
}

fn cmd_intensity(controller: &mut Controller, level: &str) -> Result<()> {
    if !controller.set_intensity(level) {
        bail!("invalid intensity '{level}' (expected gentle, moderate, deep or advanced)");
    }
    save(controller)?;
    println!("intensity: {}", controller.intensity());
    Ok(())
}

fn cmd_safety(controller: &mut Controller, level: &str) -> Result<()> {
    if !controller.set_safety_level(level) {
        bail!(
            "invalid safety level '{level}' (expected maximum, standard or advanced_practitioner)"
        );
    }
    save(controller)?;
    println!("safety: {}", controller.safety_level());
    Ok(())
}

fn cmd_profile(controller: &mut Controller, profile: Option<UserProfile>) -> Result<()> {
    controller.set_profile(profile);
    save(controller)?;
    match controller.profile() {
        Some(p) => println!("experience level: {}", p.experience_level),
        None => println!("profile cleared"),
    }
    Ok(())
}

fn cmd_node(controller: &Controller, id: u32, connections: bool) -> Result<()> {
    match controller.get_node(id, connections) {
        Some(node) => print_json(&node),
        None => bail!("node {id} not found (is codex_nodes loaded and active?)"),
    }
}

fn cmd_correlate(controller: &Controller, id: u32, types: &[String]) -> Result<()> {
    let types: Vec<&str> = types.iter().map(String::as_str).collect();
    print_json(&controller.get_correlations(id, Some(types.as_slice())))
}

fn cmd_search(controller: &Controller, term: &str) -> Result<()> {
    if controller.catalog().need(term).is_none() {
        tracing::warn!("'{term}' is not a known healing need");
    }
    print_json(&controller.search_by_healing(term))
}

fn cmd_focus(controller: &Controller, day: u32) -> Result<()> {
    print_json(&controller.daily_focus(day))
}

fn cmd_emergency(controller: &mut Controller) -> Result<()> {
    controller.activate_emergency_gentle_mode();
    save(controller)?;
    println!("emergency gentle mode active (intensity gentle, safety maximum)");
    println!("grounding techniques:");
    for (i, practice) in controller.grounding_techniques().iter().enumerate() {
        println!("  {}. {practice}", i + 1);
    }
    Ok(())
}

fn cmd_catalog(controller: &Controller) -> Result<()> {
    let toml = controller
        .catalog()
        .to_toml_string()
        .context("failed to serialize catalog")?;
    print!("{toml}");
    Ok(())
}
