//! cellscout binary: CLI parsing, mode dispatch, and signal handling.

use anyhow::Result;
use cellscout::config::{IdentityPolicy, Settings};
use cellscout::executor::CommandExecutor;
use cellscout::location::GpsdSource;
use cellscout::scheduler::{self, Poller};
use cellscout::sink::{ModemInfoSink, SampleSink};
use cellscout::smart_config;
use cellscout::transcript::FileTranscript;
use cellscout::transport::SerialTransport;
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::sync::watch;

/// Cellular modem survey logger: AT-command telemetry over serial.
#[derive(Debug, Parser)]
#[command(name = "cellscout", version, about)]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Serial device path override.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate override.
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Identity mismatch policy override.
    #[arg(long, value_parser = ["warn", "enforce"])]
    identity_policy: Option<String>,

    /// Print every configured command group and exit.
    #[arg(long)]
    list_commands: bool,

    /// Run the bootstrap and setup command group only, then exit.
    #[arg(long)]
    setup_only: bool,

    /// Apply the desired-configuration document only, then exit.
    #[arg(long)]
    smart_config: bool,

    /// Desired-configuration document for --smart-config.
    #[arg(long, default_value = "config/modem_config.yaml")]
    modem_config: PathBuf,

    /// Run every command group exactly once, then exit.
    #[arg(long)]
    one_shot: bool,
}

impl Cli {
    /// Fold CLI overrides into the loaded settings. The dedicated
    /// configuration modes escalate the identity policy to `enforce`
    /// unless the user overrode it explicitly, because those modes
    /// assume device-specific command semantics end to end.
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(port) = &self.port {
            settings.serial.port = port.clone();
        }
        if let Some(baud) = self.baud_rate {
            settings.serial.baud_rate = baud;
        }
        match self.identity_policy.as_deref() {
            Some("enforce") => settings.identity.policy = IdentityPolicy::Enforce,
            Some("warn") => settings.identity.policy = IdentityPolicy::Warn,
            _ => {
                if self.setup_only || self.smart_config {
                    settings.identity.policy = IdentityPolicy::Enforce;
                }
            }
        }
    }
}

fn print_command_groups(settings: &Settings) {
    println!("cellscout command groups");
    println!("========================");
    for (name, commands) in settings.commands.all() {
        println!("\n{name}:");
        for cmd in commands {
            println!("  {cmd}");
        }
    }
}

/// Build a connected executor with a file transcript in the output
/// directory.
fn build_executor(settings: &Settings) -> Result<CommandExecutor> {
    std::fs::create_dir_all(&settings.output.data_dir)?;
    let transcript_path = settings.output.data_dir.join(format!(
        "{}_{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        settings.output.transcript_filename
    ));
    let transcript = FileTranscript::create(transcript_path)?;
    let transport = SerialTransport::new(&settings.serial);
    Ok(CommandExecutor::new(
        Box::new(transport),
        Box::new(transcript),
        &settings.executor,
    ))
}

/// Connect, bootstrap, and verify identity, for the dedicated
/// configuration modes.
async fn open_session(settings: &Settings) -> Result<CommandExecutor> {
    let mut executor = build_executor(settings)?;
    executor.connect().await?;
    executor.initialize().await?;
    scheduler::verify_identity(&mut executor, &settings.identity).await?;
    Ok(executor)
}

async fn run_setup_only(settings: &Settings) -> Result<bool> {
    let mut executor = open_session(settings).await?;

    let commands = &settings.commands.setup;
    let mut success = 0;
    for cmd in commands {
        info!("Executing: {cmd}");
        if executor.execute(cmd).await.success {
            success += 1;
        } else {
            warn!("Setup command failed: {cmd}");
        }
    }
    executor.disconnect().await?;

    info!("Setup completed: {success}/{} commands succeeded", commands.len());
    Ok(success > 0 || commands.is_empty())
}

async fn run_smart_config(settings: &Settings, document: &PathBuf) -> Result<bool> {
    let mut executor = open_session(settings).await?;
    let outcome = smart_config::run(&mut executor, document).await;
    executor.disconnect().await?;
    Ok(outcome?.all_applied())
}

async fn run_poller(settings: Settings, one_shot: bool) -> Result<()> {
    let executor = build_executor(&settings)?;
    let sample_sink = SampleSink::create(&settings.output)?;
    let info_sink = ModemInfoSink::create(&settings.output)?;
    let gpsd = GpsdSource::start(&settings.gpsd);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut poller = Poller::new(settings, executor, sample_sink, info_sink, gpsd, shutdown_rx);
    if one_shot {
        poller.run_once().await
    } else {
        poller.run().await
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let mut settings = Settings::load_from(&cli.config)?;
    cli.apply_to(&mut settings);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&settings.logging.level),
    )
    .init();

    if cli.list_commands {
        print_command_groups(&settings);
        return Ok(true);
    }

    info!("cellscout starting");
    info!("  port: {} @ {} baud", settings.serial.port, settings.serial.baud_rate);
    info!(
        "  intervals: fast {:?} / medium {:?} / slow {:?}",
        settings.intervals.fast, settings.intervals.medium, settings.intervals.slow
    );

    if cli.setup_only {
        return run_setup_only(&settings).await;
    }
    if cli.smart_config {
        return run_smart_config(&settings, &cli.modem_config).await;
    }

    run_poller(settings, cli.one_shot).await?;
    Ok(true)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
