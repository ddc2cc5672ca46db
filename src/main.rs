// Entry point and high-level CLI flow.
//
// - With a FILE argument, the file goes through one load/aggregate pass and
//   the dashboard (or the failure) is printed. Exit code 1 on failure.
// - Without one, a menu lets the user load files one after another. Each
//   load replaces the previous dashboard; nothing is kept between runs.
use anyhow::{Context, Result};
use maintenance_dashboard::cli::{Args, OutputFormat};
use maintenance_dashboard::config::{Config, DEFAULT_CONFIG_FILE};
use maintenance_dashboard::loader::LoadOptions;
use maintenance_dashboard::pipeline::DashboardState;
use maintenance_dashboard::{output, util};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Print `prompt` and read one trimmed line. `None` once stdin is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask the user whether to go back to the menu after showing the dashboard.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = read_line("Back to menu (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Read a file from disk and keep its name for parser selection.
fn read_upload(path: &Path) -> Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((bytes, name))
}

/// Handle option [1]: ask for a path and run the pipeline on it.
///
/// An empty answer keeps the current state.
fn handle_load(current: DashboardState, opts: &LoadOptions) -> DashboardState {
    let Some(path) = read_line("File path: ") else {
        return current;
    };
    if path.is_empty() {
        return current;
    }
    let state = match read_upload(Path::new(&path)) {
        Ok((bytes, name)) => DashboardState::from_upload(&bytes, &name, opts),
        Err(e) => DashboardState::Failed(format!("{:#}", e)),
    };
    match &state {
        DashboardState::Ready(d) => println!(
            "Processing dataset... ({} interventions over {} days)\n",
            util::format_int(d.metrics.total_interventions),
            util::format_int(d.aggregates.daily_counts.len())
        ),
        DashboardState::Failed(msg) => eprintln!("{}: {}\n", output::FAILURE_PREFIX, msg),
        DashboardState::AwaitingInput => {}
    }
    state
}

fn interactive(config: &Config, opts: &LoadOptions) {
    let mut state = DashboardState::default();
    output::render(&state, &config.display);
    loop {
        println!("Select an option:");
        println!("[1] Load a file");
        println!("[2] Show dashboard");
        println!("[3] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => {
                state = handle_load(state, opts);
            }
            "2" => {
                println!();
                output::render(&state, &config.display);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}

/// One-shot mode. Returns the process exit code.
fn run_once(path: &Path, format: OutputFormat, config: &Config, opts: &LoadOptions) -> Result<i32> {
    let (bytes, name) = read_upload(path)?;
    let state = DashboardState::from_upload(&bytes, &name, opts);
    match (&state, format) {
        (DashboardState::Ready(d), OutputFormat::Json) => println!("{}", output::to_json(d)?),
        _ => output::render(&state, &config.display),
    }
    Ok(if matches!(state, DashboardState::Failed(_)) { 1 } else { 0 })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Handle --init-config: write a default configuration file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
    }
    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;
    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Logs go to stderr so that `--format json` output stays clean.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);
    debug!("Arguments: {:?}", args);

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let opts = config.parsing.load_options()?;

    match args.file {
        Some(ref path) => {
            let code = run_once(path, args.format, &config, &opts)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        None => interactive(&config, &opts),
    }
    Ok(())
}
