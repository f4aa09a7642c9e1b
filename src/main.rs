//! Binary entrypoint for the mpptmon CLI.
//!
//! Commands:
//! - `listen [--port <path>] [--count <n>]` - print validated telemetry frames
//! - `history [--days <n>] [--out <csv>]` - fetch per-day history records
//! - `cmd <command>` - send one raw hex command and print the raw reply
//! - `init` - create a starter `config.toml`
//!
//! The CLI `--port` overrides the configured port; everything else comes
//! from the config file.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use mpptmon::config::Config;

#[derive(Parser)]
#[command(name = "mpptmon")]
#[command(about = "VE.Direct telemetry and history logger for Victron MPPT charge controllers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach to the text telemetry stream and print each validated frame
    Listen {
        /// VE.Direct serial port (e.g. /dev/ttyUSB0); overrides config
        #[arg(short, long)]
        port: Option<String>,
        /// Stop after this many frames (runs until interrupted when unset)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Fetch per-day history records and print the table
    History {
        /// VE.Direct serial port; overrides config
        #[arg(short, long)]
        port: Option<String>,
        /// Days of history to fetch (day 0 is today); overrides config
        #[arg(short, long)]
        days: Option<usize>,
        /// CSV output path; overrides config, empty string disables
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Send one raw hex command line and print whatever comes back
    Cmd {
        /// VE.Direct serial port; overrides config
        #[arg(short, long)]
        port: Option<String>,
        /// Hex command, with or without leading ':' and checksum
        /// (e.g. ":7F0ED0071" or "7F0ED00")
        command: String,
    },
    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Listen { port, count } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let port = resolve_port(port, &config);
            run_listen(&port, config.serial.baud_rate, count).await?;
        }
        Commands::History { port, days, out } => {
            let mut config = resolve_config(pre_config, &cli.config).await?;
            if let Some(days) = days {
                config.fetch.days = days;
                config.validate()?;
            }
            let port = resolve_port(port, &config);
            let csv_path = out.unwrap_or(config.output.csv_path.clone());
            run_history(&port, &config, &csv_path).await?;
        }
        Commands::Cmd { port, command } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let port = resolve_port(port, &config);
            run_cmd(&port, &config, &command).await?;
        }
        Commands::Init => {
            info!("Initializing new configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
    }

    Ok(())
}

/// Reuse the config loaded for logging setup; hit the filesystem only when
/// that early load failed.
async fn resolve_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    match pre_config {
        Some(config) => Ok(config),
        None => Config::load(path).await,
    }
}

/// CLI port overrides config; fall back to the configured port.
fn resolve_port(cli_port: Option<String>, config: &Config) -> String {
    match cli_port {
        Some(p) => p,
        None => config.serial.port.clone(),
    }
}

#[cfg(feature = "serial")]
async fn run_listen(port: &str, baud_rate: u32, count: Option<usize>) -> Result<()> {
    use mpptmon::vedirect::{SerialTransport, VeDirectDevice};

    let transport = SerialTransport::open(port, baud_rate)?;
    let mut device = VeDirectDevice::new(transport);
    info!("Listening for telemetry on {} (Ctrl-C to stop)", port);
    let mut seen = 0usize;
    loop {
        if let Some(frame) = device.next_frame().await? {
            for (key, value) in &frame {
                println!("{}\t{}", key, value);
            }
            println!();
            seen += 1;
            if let Some(max) = count {
                if seen >= max {
                    break;
                }
            }
        }
    }
    info!("Captured {} frames", seen);
    Ok(())
}

#[cfg(feature = "serial")]
async fn run_history(port: &str, config: &Config, csv_path: &str) -> Result<()> {
    use mpptmon::report;
    use mpptmon::vedirect::{HistoryFetcher, SerialTransport};

    let transport = SerialTransport::open(port, config.serial.baud_rate)?;
    let mut fetcher = HistoryFetcher::new(transport, config.fetch_options());
    info!("Fetching {} days of history from {}", config.fetch.days, port);
    let days = fetcher.fetch_all().await?;
    print!("{}", report::render_table(&days));
    if days.len() < config.fetch.days {
        info!(
            "Fetched {} of {} requested days (see warnings above)",
            days.len(),
            config.fetch.days
        );
    }
    if !csv_path.is_empty() {
        report::write_csv(csv_path, &days).await?;
        info!("History written to {}", csv_path);
    }
    Ok(())
}

#[cfg(feature = "serial")]
async fn run_cmd(port: &str, config: &Config, command: &str) -> Result<()> {
    use mpptmon::logutil::preview_bytes;
    use mpptmon::vedirect::{hex, SerialTransport, Transport};
    use tokio::time::{sleep, Duration, Instant};

    let line = hex::ensure_checksum(command)?;
    let mut transport = SerialTransport::open(port, config.serial.baud_rate)?;
    info!("Sending {:?}", line.trim_end());
    transport.send(line.as_bytes())?;

    let deadline = Instant::now() + Duration::from_millis(config.fetch.max_wait_ms);
    let mut buf = [0u8; 256];
    let mut got_any = false;
    while Instant::now() < deadline {
        let n = transport.read_chunk(&mut buf)?;
        if n == 0 {
            sleep(Duration::from_millis(config.fetch.poll_interval_ms)).await;
            continue;
        }
        got_any = true;
        println!("{}", preview_bytes(&buf[..n]));
    }
    if !got_any {
        info!("No response within {} ms", config.fetch.max_wait_ms);
    }
    Ok(())
}

#[cfg(not(feature = "serial"))]
async fn run_listen(_port: &str, _baud_rate: u32, _count: Option<usize>) -> Result<()> {
    anyhow::bail!("listen requires the 'serial' feature")
}

#[cfg(not(feature = "serial"))]
async fn run_history(_port: &str, _config: &Config, _csv_path: &str) -> Result<()> {
    anyhow::bail!("history requires the 'serial' feature")
}

#[cfg(not(feature = "serial"))]
async fn run_cmd(_port: &str, _config: &Config, _command: &str) -> Result<()> {
    anyhow::bail!("cmd requires the 'serial' feature")
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from config, CLI verbosity overrides upward
    let config_level = config
        .as_ref()
        .map(|c| c.logging.level.as_str())
        .unwrap_or("info");
    let base_level = match verbosity {
        0 => config_level.parse().unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            builder.format(default_log_format);
        }
    } else {
        builder.format(default_log_format);
    }
    let _ = builder.try_init();
}

fn default_log_format(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    use std::io::Write;
    writeln!(
        fmt,
        "{} [{}] {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        record.level(),
        record.args()
    )
}
