mod logger;
mod tui;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use facet_lens_common::Config;
use facet_lens_core::{
    filter_records, infer_fields, load_records, parse_conditions, ColumnFilter, FilterCondition,
    FilterRegistry, SavedFilterSet,
};
use log::{debug, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::Path;
use std::sync::Arc;
use std::{io, time::Duration};
use tui::app::App;
use tui::events::handle_key;
use tui::session::Session;
use tui::ui::render;

const DEFAULT_TOOL: &str = "default";

#[derive(Parser)]
#[command(name = "facet-lens", version, about = "Predicate filtering for JSON record sets")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive record browser
    Browse {
        path: String,
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
        #[arg(long)] set: Option<String>,
        #[arg(long = "where")] where_: Option<String>,
    },
    /// Print records matching a condition chain as JSON lines
    Filter {
        path: String,
        #[arg(long = "where")] where_: Option<String>,
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
        #[arg(long)] set: Option<String>,
        #[arg(long)] count: bool,
    },
    /// Distinct values of one field with counts
    Catalog {
        path: String,
        field: String,
        #[arg(long)] contains: Option<String>,
    },
    /// Infer and register filterable fields
    Fields {
        path: String,
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
    },
    /// Manage saved filter sets
    Sets {
        #[command(subcommand)]
        action: SetsAction,
    },
    /// Show or clear search history
    History {
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
        #[arg(long)] clear: bool,
    },
}

#[derive(Subcommand)]
enum SetsAction {
    List {
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
    },
    Save {
        name: String,
        #[arg(long = "where")] where_: String,
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
        #[arg(long)] global: bool,
    },
    Delete {
        name: String,
        #[arg(long, default_value = DEFAULT_TOOL)] tool: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let in_tui = matches!(cli.command, Commands::Browse { .. });
    let log_file = logger::log_file_path();
    logger::init_logger(cli.verbose, in_tui.then_some(log_file.as_path()));

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("{e}; using default config");
        Config::default()
    });
    let registry = Arc::new(FilterRegistry::open(
        config.filter.store_path(),
        config.filter.history_capacity,
    ));
    debug!("filter store: {}", config.filter.store_path().display());

    match cli.command {
        Commands::Browse { path, tool, set, where_ } => run_tui(path, tool, set, where_, config, registry.clone())?,
        Commands::Filter { path, where_, tool, set, count } => {
            run_filter(&path, where_.as_deref(), &tool, set.as_deref(), count, &config, &registry)?
        }
        Commands::Catalog { path, field, contains } => run_catalog(&path, &field, contains.as_deref())?,
        Commands::Fields { path, tool } => run_fields(&path, &tool, &registry)?,
        Commands::Sets { action } => run_sets(action, &registry)?,
        Commands::History { tool, clear } => run_history(&tool, clear, &registry),
    }
    registry.flush().map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

fn read_records(path: &str) -> anyhow::Result<Vec<serde_json::Value>> {
    if !Path::new(path).exists() {
        anyhow::bail!("file not found: {path}");
    }
    let records = load_records(Path::new(path)).map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
    info!("loaded {} records from {path}", records.len());
    Ok(records)
}

/// Conditions from a saved set followed by an ad-hoc `--where` chain.
fn build_chain(
    registry: &FilterRegistry,
    tool: &str,
    set: Option<&str>,
    where_: Option<&str>,
) -> anyhow::Result<Vec<FilterCondition>> {
    let mut chain = Vec::new();
    if let Some(name) = set {
        let saved = registry
            .find_filter_set(tool, name)
            .ok_or_else(|| anyhow::anyhow!("no filter set '{name}' for tool '{tool}'"))?;
        chain.extend(saved.conditions);
    }
    if let Some(text) = where_ {
        chain.extend(parse_conditions(text).map_err(|e| anyhow::anyhow!("{e}"))?);
    }
    Ok(chain)
}

fn run_filter(
    path: &str,
    where_: Option<&str>,
    tool: &str,
    set: Option<&str>,
    count: bool,
    config: &Config,
    registry: &FilterRegistry,
) -> anyhow::Result<()> {
    if where_.is_none() && set.is_none() {
        anyhow::bail!("filter needs --where or --set");
    }
    let records = read_records(path)?;
    let chain = build_chain(registry, tool, set, where_)?;
    let matched = filter_records(&records, &chain, config.filter.parallel_threshold);
    info!("{} of {} records matched", matched.len(), records.len());
    if count {
        println!("{}", matched.len());
        return Ok(());
    }
    for r in matched {
        println!("{}", serde_json::to_string(r)?);
    }
    Ok(())
}

fn run_catalog(path: &str, field: &str, contains: Option<&str>) -> anyhow::Result<()> {
    let records = read_records(path)?;
    let mut catalog = ColumnFilter::from_records(field, &records, None);
    if let Some(text) = contains {
        catalog.apply_substring_filter(text);
    }
    println!("{:<8} {}", "count", "value");
    for e in catalog.visible() {
        println!("{:<8} {}", e.count, e.display);
    }
    Ok(())
}

fn run_fields(path: &str, tool: &str, registry: &FilterRegistry) -> anyhow::Result<()> {
    let records = read_records(path)?;
    let fields = infer_fields(&records, records.len());
    registry.register_fields(tool, fields.clone());
    for f in &fields {
        let ops: Vec<&str> = f.operators.iter().map(|o| o.label()).collect();
        println!("{:<24} {:<20} {:<11} {}", f.name, f.label, format!("{:?}", f.kind), ops.join(","));
        if let Some(values) = &f.values {
            println!("{:<24} values: {}", "", values.join(", "));
        }
    }
    Ok(())
}

fn run_sets(action: SetsAction, registry: &FilterRegistry) -> anyhow::Result<()> {
    match action {
        SetsAction::List { tool } => {
            for s in registry.get_filter_sets(&tool) {
                let scope = if s.is_global { "global".to_string() } else { s.tool_id.clone() };
                println!(
                    "{:<20} {:<12} {}  {}",
                    s.name,
                    scope,
                    s.created_at.format("%Y-%m-%d"),
                    facet_lens_core::describe_chain(&s.conditions)
                );
            }
        }
        SetsAction::Save { name, where_, tool, global } => {
            let conditions = parse_conditions(&where_).map_err(|e| anyhow::anyhow!("{e}"))?;
            let mut set = SavedFilterSet::new(name.clone(), tool, conditions);
            if global {
                set = set.global();
            }
            registry.save_filter_set(set);
            println!("saved '{name}'");
        }
        SetsAction::Delete { name, tool } => {
            if !registry.delete_filter_set(&tool, &name) {
                anyhow::bail!("no filter set '{name}' for tool '{tool}'");
            }
            println!("deleted '{name}'");
        }
    }
    Ok(())
}

fn run_history(tool: &str, clear: bool, registry: &FilterRegistry) {
    if clear {
        registry.clear_search_history(tool);
        return;
    }
    for h in registry.search_history(tool) {
        println!("{}  {:>6}  {}", h.searched_at.format("%Y-%m-%d %H:%M"), h.result_count, h.text);
    }
}

fn run_tui(
    input_path: String,
    tool: String,
    set: Option<String>,
    where_: Option<String>,
    config: Config,
    registry: Arc<FilterRegistry>,
) -> anyhow::Result<()> {
    let records = read_records(&input_path)?;
    let mut app = App::new(input_path, tool, records, config, Arc::clone(&registry));
    if let Some(s) = Session::load() {
        app.restore_from_session(&s);
    }
    if let Some(name) = set.as_deref() {
        if !app.load_set_by_name(name) {
            anyhow::bail!("no filter set '{name}' for tool '{}'", app.tool_id);
        }
    }
    if let Some(text) = where_ {
        app.condition_input = text;
        app.apply_condition_input();
    }
    app.refresh();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick = Duration::from_millis(66); // 15Hz
    loop {
        terminal.draw(|f| render(f, &app))?;
        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key) => handle_key(&mut app, key),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollDown => app.row_down(1),
                    MouseEventKind::ScrollUp => app.row_up(1),
                    _ => {}
                },
                _ => {}
            }
        }
        app.tick();
        if app.should_quit {
            break;
        }
    }
    if let Err(e) = app.to_session().save() {
        log::warn!("failed to save session: {e}");
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
