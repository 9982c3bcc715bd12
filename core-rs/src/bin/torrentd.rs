//! torrentd - foreground entry point for the torrent download daemon
//!
//! Resolves settings, picks the service port, builds the instance
//! fingerprint and hands control to the instance guard. Detaching from
//! the controlling session is left to the operator or an init system;
//! the daemon itself runs in the foreground until Ctrl+C.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use torrentd_core::process::ProcessControl;
use torrentd_core::{
    default_config_dir, get_free_port, get_interface, is_port_free, is_process_alive,
    GuardOutcome, InstanceGuard, Settings, SystemProcessControl, DEFAULT_LOCK_PATH,
};

#[derive(Parser)]
#[command(name = "torrentd")]
#[command(version = "0.1.0")]
#[command(about = "Torrent download daemon", long_about = None)]
struct Cli {
    /// Lock file base path (the record lives in the .lock companion)
    #[arg(long, default_value = DEFAULT_LOCK_PATH)]
    lock_path: PathBuf,

    /// Settings file (defaults to ~/.torrentd/settings.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground
    Run {
        /// Instance name (overrides settings)
        #[arg(long)]
        name: Option<String>,

        /// Service port; 0 picks a free port (overrides settings)
        #[arg(long)]
        port: Option<u16>,

        /// Search endpoint as host:port (overrides settings)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the lock holder, its configuration and the lock age
    Status,
    /// Ask the running instance to shut down
    Stop,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { name, port, search } => {
            run_daemon(&cli.lock_path, cli.config, name, port, search)?;
        }

        Commands::Status => {
            let guard = InstanceGuard::new(&cli.lock_path);

            match guard.current_record() {
                Some(record) => {
                    let alive = is_process_alive(record.owner_pid);
                    println!("Lock: held ({})", guard.record_path().display());
                    println!(
                        "  Owner pid: {} ({})",
                        record.owner_pid,
                        if alive { "alive" } else { "dead" }
                    );
                    println!("  Name: {}", record.fingerprint.name);
                    println!(
                        "  Search: {}:{}",
                        record.fingerprint.search_host, record.fingerprint.search_port
                    );
                    println!("  Service port: {}", record.fingerprint.service_port);
                    println!("  Acquired: {}", record.acquired_at);
                    println!("  Age: {:.1}s", guard.lock_age_seconds());
                }
                None => {
                    println!("Lock: not held ({})", guard.record_path().display());
                }
            }
        }

        Commands::Stop => {
            let guard = InstanceGuard::new(&cli.lock_path);

            match guard.current_record() {
                Some(record) if is_process_alive(record.owner_pid) => {
                    SystemProcessControl.terminate(record.owner_pid)?;
                    println!("✓ Sent quit signal to pid {}", record.owner_pid);
                }
                Some(record) => {
                    println!(
                        "Lock held by pid {} which is not running; nothing to stop",
                        record.owner_pid
                    );
                }
                None => {
                    println!("No instance running");
                }
            }
        }
    }

    Ok(())
}

fn run_daemon(
    lock_path: &std::path::Path,
    config: Option<PathBuf>,
    name: Option<String>,
    port: Option<u16>,
    search: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the settings file, seeding the config dir on first run
    let settings_path = match config {
        Some(path) => path,
        None => Settings::init_config_dir(default_config_dir())?,
    };

    let mut settings = Settings::load_or_default(&settings_path);

    if let Some(name) = name {
        settings.daemon.name = name;
    }
    if let Some(port) = port {
        settings.daemon.port = port;
    }
    if let Some(search) = search {
        let (host, port) = search
            .rsplit_once(':')
            .ok_or("search endpoint must be host:port")?;
        settings.search.host = host.to_string();
        settings.search.port = port.parse()?;
    }
    settings.validate()?;

    // Pick the service port: configured if free, otherwise a fresh one
    let service_port = match settings.daemon.port {
        0 => get_free_port()?,
        p if is_port_free(p) => p,
        p => {
            eprintln!("[torrentd] Port {} is in use, picking a free one", p);
            get_free_port()?
        }
    };

    let fingerprint = settings.fingerprint(service_port);

    println!(
        "[torrentd] Starting '{}' (search {}:{}, service port {})",
        fingerprint.name, fingerprint.search_host, fingerprint.search_port, service_port
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    ctrlc::set_handler(move || {
        eprintln!("[torrentd] Received shutdown signal, stopping gracefully...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })?;

    let guard = InstanceGuard::new(lock_path);
    let outcome = guard.ensure_single_instance(&fingerprint, || {
        if let Some(addr) = get_interface() {
            println!("[torrentd] Reachable at {}:{}", addr, service_port);
        }
        println!(
            "[torrentd] Serving, downloads in {}",
            settings.storage.download_dir.display()
        );

        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(500));
        }
    });

    match outcome {
        GuardOutcome::Started => println!("[torrentd] Shutdown complete"),
        GuardOutcome::AlreadyRunning => {
            println!("[torrentd] An instance with this configuration is already running")
        }
    }

    Ok(())
}
