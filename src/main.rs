mod cli;

use vox_todo::api;
use vox_todo::command::{CommandOutcome, Engine, PendingRequest};
use vox_todo::config::Config;
use vox_todo::intent::{actions_from_value, Action, NewTask};
use vox_todo::services::{HttpIntentService, IntentService};
use vox_todo::storage::{self, Snapshot};
use vox_todo::task::SortKey;
use vox_todo::utils::paths::{get_logs_dir, get_pid_file_path};

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{Cli, Commands, ServeCommand};
use rusqlite::Connection;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Add { text }) => handle_add(&config, text),
        Some(Commands::Show { sort }) => handle_show(&config, sort),
        Some(Commands::Exec { file, yes }) => handle_exec(&config, &file, yes),
        Some(Commands::Say { transcript, yes }) => handle_say(&config, &transcript, yes),
        Some(Commands::Undo) => handle_undo(&config),
        Some(Commands::Serve { command, port }) => {
            handle_serve_command(command, port.unwrap_or(config.api_port))
        }
        None => handle_show(&config, None),
    }
}

/// Open the snapshot database and rebuild the engine from it.
fn load_engine(config: &Config) -> Result<(Engine, Connection)> {
    let conn = storage::open_default()?;
    storage::init_database(&conn)?;
    let snapshot = storage::load_snapshot(&conn)?;
    let (store, sort_key) = snapshot.into_store();
    let mut engine = Engine::new(store, config.clone());
    engine.set_sort_key(sort_key);
    Ok((engine, conn))
}

fn persist_engine(conn: &Connection, engine: &Engine) -> Result<()> {
    let snapshot = Snapshot {
        tasks: engine.store().tasks().to_vec(),
        sort_key: engine.sort_key(),
        undo: engine.store().undo_slot().clone(),
    };
    storage::save_snapshot(conn, &snapshot)
}

fn handle_add(config: &Config, text: String) -> Result<()> {
    let (mut engine, conn) = load_engine(config)?;

    let actions = vec![Action::AddTask {
        tasks: vec![NewTask::new(text.clone())],
    }];
    let outcome = engine.submit(actions, &text);
    persist_engine(&conn, &engine)?;

    for notice in &outcome.notices {
        println!("{}", notice);
    }
    println!("{}", outcome.summary);
    Ok(())
}

fn handle_show(config: &Config, sort: Option<String>) -> Result<()> {
    let (engine, _conn) = load_engine(config)?;

    let tasks = match sort.as_deref() {
        Some(raw) => {
            let key = SortKey::from_str(raw).map_err(|e| anyhow!(e))?;
            engine.store().sorted(key)
        }
        None => engine.display(),
    };

    if tasks.is_empty() {
        println!("No tasks yet. Add one with: voxtodo add <text>");
        return Ok(());
    }

    println!();
    for (idx, task) in tasks.iter().enumerate() {
        let marker = if task.completed { "[x]" } else { "[ ]" };
        let mut extras: Vec<String> = Vec::new();
        if let Some(due) = task.due_date {
            extras.push(format!("due {}", due.format("%b %d")));
        }
        if let Some(priority) = task.priority {
            extras.push(priority.to_string());
        }
        if let Some(location) = &task.location {
            extras.push(format!("@{}", location));
        }
        let suffix = if extras.is_empty() {
            String::new()
        } else {
            format!("  ({})", extras.join(", "))
        };
        println!("{:>3}. {} {}{}", idx + 1, marker, task.text, suffix);
    }
    println!();
    Ok(())
}

fn handle_exec(config: &Config, file: &str, yes: bool) -> Result<()> {
    let content = if file == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(file)?
    };

    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| anyhow!("Invalid action JSON: {}", e))?;
    let actions = actions_from_value(&value);
    run_command(config, actions, "", yes)
}

fn handle_say(config: &Config, transcript: &str, yes: bool) -> Result<()> {
    let endpoint = config.intent_endpoint.as_deref().ok_or_else(|| {
        anyhow!(
            "No intent service configured.\n\
             Set intent_endpoint in ~/.vox-todo/config.toml"
        )
    })?;

    let service = HttpIntentService::new(endpoint)?;
    let actions = match service.extract(transcript) {
        Ok(actions) => actions,
        Err(e) => {
            // Upstream failures are retryable, not fatal.
            eprintln!("The intent service didn't respond properly: {}", e);
            eprintln!("Please try again.");
            return Ok(());
        }
    };
    run_command(config, actions, transcript, yes)
}

/// Apply a batch, walking any confirmation or selection pauses through
/// interactive prompts (or auto-accepting with --yes).
fn run_command(config: &Config, actions: Vec<Action>, transcript: &str, yes: bool) -> Result<()> {
    let (mut engine, conn) = load_engine(config)?;

    let mut outcome = engine.submit(actions, transcript);
    let mut printed = 0;
    loop {
        printed = print_new_notices(&outcome, printed);
        if let Some(shown) = &outcome.shown {
            for (idx, task) in shown.iter().enumerate() {
                let marker = if task.completed { "[x]" } else { "[ ]" };
                println!("{:>3}. {} {}", idx + 1, marker, task.text);
            }
        }

        let Some(pending) = outcome.pending.clone() else {
            break;
        };
        outcome = resolve_pending(&mut engine, pending, yes)?;
    }

    persist_engine(&conn, &engine)?;
    println!("{}", outcome.summary);
    Ok(())
}

/// Notices accumulate across a suspension, so only print the tail that is
/// new since the last outcome.
fn print_new_notices(outcome: &CommandOutcome, printed: usize) -> usize {
    for notice in outcome.notices.iter().skip(printed) {
        println!("{}", notice);
    }
    outcome.notices.len()
}

fn resolve_pending(
    engine: &mut Engine,
    pending: PendingRequest,
    yes: bool,
) -> Result<CommandOutcome> {
    match pending {
        PendingRequest::Confirm { prompt } => {
            let accept = if yes {
                true
            } else {
                use dialoguer::Select;
                let choices = vec!["Yes", "No"];
                let selection = Select::new()
                    .with_prompt(prompt)
                    .items(&choices)
                    .default(0)
                    .interact()?;
                selection == 0
            };
            Ok(engine.confirm(accept))
        }
        PendingRequest::Select { prompt, options } => {
            let chosen: Vec<Uuid> = if yes {
                options.iter().map(|o| o.id).collect()
            } else {
                use dialoguer::MultiSelect;
                let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
                let selections = MultiSelect::new()
                    .with_prompt(prompt)
                    .items(&labels)
                    .interact()?;
                selections.into_iter().map(|i| options[i].id).collect()
            };
            Ok(engine.select(&chosen))
        }
    }
}

fn handle_undo(config: &Config) -> Result<()> {
    let (mut engine, conn) = load_engine(config)?;

    if engine.undo() {
        persist_engine(&conn, &engine)?;
        println!("Reverted the last change.");
    } else {
        println!("Nothing to undo (the undo window may have expired).");
    }
    Ok(())
}

fn handle_serve_command(command: Option<ServeCommand>, port: u16) -> Result<()> {
    match command.unwrap_or(ServeCommand::Start { daemon: false }) {
        ServeCommand::Start { daemon } => {
            if daemon {
                run_server_foreground(port)
            } else {
                handle_serve_start(port)
            }
        }
        ServeCommand::Stop => handle_serve_stop(),
        ServeCommand::Restart => handle_serve_restart(port),
        ServeCommand::Status => handle_serve_status(port),
    }
}

fn handle_serve_start(port: u16) -> Result<()> {
    if is_server_running(port) {
        println!("Server is already running on port {port}");
        return Ok(());
    }

    start_server_background(port)?;
    println!("Server started on port {port}");
    Ok(())
}

fn handle_serve_stop() -> Result<()> {
    let pid = read_pid_file()?;

    if let Some(pid) = pid {
        kill_process(pid)?;
        remove_pid_file()?;
        println!("Server stopped (PID: {pid})");
    } else {
        println!("Server is not running (no PID file found)");
    }

    Ok(())
}

fn handle_serve_restart(port: u16) -> Result<()> {
    let _ = handle_serve_stop();
    std::thread::sleep(Duration::from_millis(500));
    handle_serve_start(port)
}

fn handle_serve_status(port: u16) -> Result<()> {
    let pid = read_pid_file()?;
    let running = is_server_running(port);

    match (pid, running) {
        (Some(pid), true) => {
            println!("Server is running on port {port} (PID: {pid})");
        }
        (Some(pid), false) => {
            println!("Server PID file exists ({pid}) but server is not responding on port {port}");
            println!("Consider running 'voxtodo serve stop' to clean up");
        }
        (None, true) => {
            println!("Server is running on port {port} but no PID file found");
        }
        (None, false) => {
            println!("Server is not running");
        }
    }

    Ok(())
}

fn is_server_running(port: u16) -> bool {
    let addr = format!("127.0.0.1:{port}");
    let Ok(parsed) = addr.parse() else {
        return false;
    };
    match TcpStream::connect_timeout(&parsed, Duration::from_millis(500)) {
        Ok(mut stream) => {
            let request = format!(
                "GET /api/health HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n"
            );
            if stream.write_all(request.as_bytes()).is_ok() {
                let mut response = String::new();
                let _ = stream.read_to_string(&mut response);
                response.contains("200") || response.contains("ok")
            } else {
                false
            }
        }
        Err(_) => false,
    }
}

fn start_server_background(port: u16) -> Result<()> {
    let current_exe = env::current_exe()?;

    let child = Command::new(&current_exe)
        .args(["serve", "start", "--port", &port.to_string(), "--daemon"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    write_pid_file(child.id())?;

    std::thread::sleep(Duration::from_millis(500));

    if !is_server_running(port) {
        return Err(anyhow!(
            "Failed to start server - not responding on port {port}"
        ));
    }

    Ok(())
}

fn read_pid_file() -> Result<Option<u32>> {
    let pid_path = get_pid_file_path()?;

    if !pid_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&pid_path)?;
    let pid: u32 = content.trim().parse()?;
    Ok(Some(pid))
}

fn write_pid_file(pid: u32) -> Result<()> {
    let pid_path = get_pid_file_path()?;

    if let Some(parent) = pid_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    fs::write(&pid_path, pid.to_string())?;
    Ok(())
}

fn remove_pid_file() -> Result<()> {
    let pid_path = get_pid_file_path()?;
    if pid_path.exists() {
        fs::remove_file(&pid_path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn kill_process(pid: u32) -> Result<()> {
    Command::new("kill").args(["-9", &pid.to_string()]).output()?;
    Ok(())
}

#[cfg(windows)]
fn kill_process(pid: u32) -> Result<()> {
    Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()?;
    Ok(())
}

/// File-based logging for the daemonized server. Stdout is detached there,
/// so rolling files under ~/.vox-todo/logs/ are the only place to look.
/// The guard must stay alive for the server's lifetime.
fn init_file_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let logs_dir = get_logs_dir().ok()?;
    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Could not create logs directory: {}", e);
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "voxtodo.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .init();

    Some(guard)
}

#[tokio::main]
async fn run_server_foreground(port: u16) -> Result<()> {
    let _log_guard = init_file_logging();

    let config = Config::load()?;
    let (engine, conn) = load_engine(&config)?;
    let state = Arc::new(api::AppState::new(engine, conn));

    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{port}");

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
