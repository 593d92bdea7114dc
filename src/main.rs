//! `plantboard` - admin CLI and display host for the plant dashboard.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use plantboard_lib::config::{load_config, Config};
use plantboard_lib::display::{format_percent, minutes_to_time};
use plantboard_lib::error::{DashboardError, ErrorPayload, ReportError};
use plantboard_lib::ingest::import_file;
use plantboard_lib::report::{generate_crew_report, GeminiClient};
use plantboard_lib::simulation::run_simulation;
use plantboard_lib::sync::{pull_once, push_if_newer, run_sync, FirebaseStore, RemoteStore};
use plantboard_lib::template::{export_template, TEMPLATE_FILE_NAME};
use plantboard_lib::types::{MoveDirection, ObjectiveFormat};
use plantboard_lib::DashboardStore;

#[derive(Parser, Debug)]
#[command(name = "plantboard")]
#[command(about = "Plant operations dashboard: KPIs, workbook import, bonus scoring")]
#[command(version)]
struct Cli {
    /// Config file (default ~/.plantboard/config.json)
    #[arg(long, global = true, env = "PLANTBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// State file; overrides the config value
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a workbook (.xlsx / .xls / .ods)
    Import { file: PathBuf },

    /// Write the current data as an editable workbook
    Template {
        #[arg(short, long, default_value = TEMPLATE_FILE_NAME)]
        output: PathBuf,
    },

    /// Print the dashboard summary
    Status {
        /// Dump the full state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the accumulated result of a bonus objective
    BonusSet { description: String, value: f64 },

    /// Replace the announcement banner text
    Announce { text: String },

    /// Generate the crew report with Gemini
    Report,

    /// Move a dashboard widget one slot
    MoveWidget {
        index: usize,
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Switch between high and eco performance mode
    ToggleMode,

    /// Keep the store live: remote sync and, optionally, the simulation
    Run {
        /// Turn the demo simulation on
        #[arg(long)]
        simulate: bool,
    },
}

impl Command {
    /// Whether the command changes the dashboard state.
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Import { .. }
                | Command::BonusSet { .. }
                | Command::Announce { .. }
                | Command::MoveWidget { .. }
                | Command::ToggleMode
        )
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for MoveDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => MoveDirection::Up,
            Direction::Down => MoveDirection::Down,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(state) = cli.state {
        config.state_path = Some(state);
    }

    let storage = config.storage().context("Failed to resolve state path")?;
    let store = Arc::new(DashboardStore::open(storage));
    let remote = remote_store(&config);

    if let Command::Run { simulate } = cli.command {
        return run(store, remote, &config, simulate).await;
    }

    // start from the freshest copy so edits apply on top of it
    if let Some(remote) = &remote {
        pull_once(&store, remote.as_ref()).await;
    }
    let mutates = cli.command.mutates();

    match cli.command {
        Command::Import { file } => {
            let outcome = import_file(&file)
                .map_err(DashboardError::from)
                .map_err(report_error)?;
            println!("{}", outcome.summary());
            store.apply_import(outcome);
        }
        Command::Template { output } => {
            let bytes = export_template(&store.snapshot(), &output)
                .map_err(DashboardError::from)
                .map_err(report_error)?;
            println!("Plantilla escrita en {} ({} bytes)", output.display(), bytes);
        }
        Command::Status { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
            } else {
                print_status(&store);
            }
        }
        Command::BonusSet { description, value } => {
            let idx = store
                .update_bonus_result(&description, value)
                .map_err(DashboardError::from)
                .map_err(report_error)?;
            let objective = &store.snapshot().bonus_objectives[idx];
            println!("{} -> {}", objective.description, objective.status());
        }
        Command::Announce { text } => store.update_announcement(&text),
        Command::Report => {
            let key = config.gemini_api_key.clone().unwrap_or_default();
            let text = async {
                let client = GeminiClient::new(&key, &config.gemini_model)?;
                generate_crew_report(&client, &store.snapshot().crews).await
            }
            .await
            .map_err(|e: ReportError| {
                log::error!("Crew report failed: {}", e);
                anyhow::anyhow!(e.user_message())
            })?;
            println!("{}", text);
        }
        Command::MoveWidget { index, direction } => {
            let moved = store
                .move_widget(index, direction.into())
                .map_err(DashboardError::from)
                .map_err(report_error)?;
            if !moved {
                println!("El widget ya está en el extremo.");
            }
        }
        Command::ToggleMode => {
            let mode = store.toggle_performance_mode();
            println!("Modo: {:?}", mode);
        }
        Command::Run { .. } => {}
    }

    if mutates {
        if let Some(remote) = &remote {
            push_if_newer(&store, remote.as_ref()).await;
        }
    }
    Ok(())
}

fn remote_store(config: &Config) -> Option<Arc<dyn RemoteStore>> {
    if !config.sync_enabled() {
        return None;
    }
    let url = config.firebase_url.as_deref().unwrap_or_default();
    match FirebaseStore::new(url, config.firebase_auth.as_deref()) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            log::warn!("Remote sync disabled: {}", e);
            None
        }
    }
}

fn report_error(err: DashboardError) -> anyhow::Error {
    let payload = ErrorPayload::from(&err);
    log::error!("{}", payload.message);
    anyhow::anyhow!("{}\n{}", payload.message, payload.recovery_suggestion)
}

fn print_status(store: &DashboardStore) {
    let state = store.snapshot();
    let bonus = store.bonus_global();
    let best = store.best_crew();

    println!("{}", state.announcement);
    println!(
        "Actualizado: {}  |  Sincronización: {:?}  |  Simulación: {}",
        state.last_update.format("%Y-%m-%d %H:%M:%S UTC"),
        store.sync_status(),
        if state.is_simulation_active { "activa" } else { "inactiva" }
    );
    println!();
    println!(
        "Seguridad: {} días sin accidente (récord {}), LTI {} MTI {} FAC {}",
        state.safety.days_without_accident,
        state.safety.record_days,
        state.safety.lti,
        state.safety.mti,
        state.safety.fac
    );
    println!(
        "Almacén: PT {}  MP {}",
        format_percent(state.warehouse.pt_occupancy()),
        format_percent(state.warehouse.mat_occupancy())
    );
    println!("Mejor tripulación: {} ({} pts)", best.name, best.total_sum);
    println!();
    println!("Bono Planta: {}% ({})", bonus.percentage, bonus.label.as_str());
    for objective in &state.bonus_objectives {
        let value = match objective.format {
            ObjectiveFormat::Time => minutes_to_time(objective.accumulated().max(0.0).round() as u32),
            ObjectiveFormat::Percent => format_percent(objective.accumulated()),
            _ => format!("{}", objective.accumulated()),
        };
        println!(
            "  {:<32} {:>12}  {:<13} {}",
            objective.description,
            value,
            objective.status().as_str(),
            objective.weight
        );
    }
}

async fn run(
    store: Arc<DashboardStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    config: &Config,
    simulate: bool,
) -> Result<()> {
    if simulate {
        store.set_simulation_active(true);
    }

    let mut tasks = Vec::new();
    if let Some(remote) = remote {
        tasks.push(tokio::spawn(run_sync(
            store.clone(),
            remote,
            config.sync_poll_interval(),
        )));
    } else {
        log::info!("No remote configured; running local only");
    }
    tasks.push(tokio::spawn(run_simulation(store.clone(), config.simulation())));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    log::info!("Shutting down");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Command {
        let mut argv = vec!["plantboard"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_read_only_commands_do_not_mutate() {
        assert!(!command(&["status"]).mutates());
        assert!(!command(&["status", "--json"]).mutates());
        assert!(!command(&["template"]).mutates());
        assert!(!command(&["report"]).mutates());
        assert!(!command(&["run", "--simulate"]).mutates());
    }

    #[test]
    fn test_editing_commands_mutate() {
        assert!(command(&["import", "datos.xlsx"]).mutates());
        assert!(command(&["bonus-set", "Fleteo", "98.5"]).mutates());
        assert!(command(&["announce", "hola"]).mutates());
        assert!(command(&["move-widget", "2", "up"]).mutates());
        assert!(command(&["toggle-mode"]).mutates());
    }
}
