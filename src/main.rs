use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use rotating_logger::{archive, bridge, global, log_error, log_info, Level, LogConfig, Logger, TerminalAction};

/// Writes a burst of log lines through a rotating logger and reports the
/// files it produced.
#[derive(Debug, Parser)]
#[command(name = "rotating_logger", version)]
struct Args {
    /// TOML config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Active log file.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Rotation threshold in bytes.
    #[arg(long)]
    max_size: Option<u64>,

    /// Queue capacity in entries.
    #[arg(long)]
    queue: Option<usize>,

    /// Background flush period in milliseconds, 0 disables it.
    #[arg(long)]
    flush_ms: Option<u64>,

    /// Lines written by each producer thread.
    #[arg(long, default_value_t = 10_000)]
    lines: usize,

    /// Producer threads.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Color console output.
    #[arg(long)]
    color: bool,

    /// Finish with an ERROR entry that exits the process with this code.
    #[arg(long)]
    exit_on_error: Option<i32>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> rotating_logger::Result<LogConfig> {
    let mut config = match &args.config {
        Some(path) => LogConfig::from_file(path)?,
        None => LogConfig::default(),
    };
    if let Some(file) = &args.file {
        config.file_path = file.clone();
    }
    if let Some(max_size) = args.max_size {
        config.max_size_bytes = max_size;
    }
    if let Some(queue) = args.queue {
        config.queue_capacity = queue;
    }
    if let Some(flush_ms) = args.flush_ms {
        config.flush_interval = Duration::from_millis(flush_ms);
    }
    if args.color {
        config.color_output = true;
    }
    if let Some(code) = args.exit_on_error {
        config.terminal_action = TerminalAction::Exit { code };
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let path = config.file_path.clone();

    let logger = match Logger::new(config) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            tracing::error!(error = %e, "failed to start logger");
            return ExitCode::FAILURE;
        }
    };
    global::set_default(Arc::clone(&logger));
    if let Err(e) = bridge::init_log_bridge(Arc::clone(&logger), log::LevelFilter::Info) {
        tracing::warn!(error = %e, "log facade already initialized");
    }

    logger.banner("\n---------- rotating_logger ----------\n");
    let start = Instant::now();

    let producers: Vec<_> = (0..args.threads)
        .map(|id| {
            let logger = Arc::clone(&logger);
            let lines = args.lines;
            thread::spawn(move || {
                for i in 0..lines {
                    log_info!(logger, "producer={} seq={} payload={}", id, i, "x".repeat(32));
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.join().is_err() {
            tracing::error!("producer thread panicked");
        }
    }
    log::info!("producers finished after {:?}", start.elapsed());

    if args.exit_on_error.is_some() {
        log_error!(logger, "exit requested after {} lines", args.lines * args.threads);
        // Writing the entry exits the process, on the consumer or right here
        // if the queue was full. The entry keeps `pending` above zero until
        // then, so `flush` only returns if the exit never happened.
        logger.flush();
        tracing::error!("terminal entry did not exit the process");
        return ExitCode::FAILURE;
    }

    logger.log(Level::Info, &[&"shutting down"]);
    let fallback = logger.fallback_writes();
    let rotations = logger.writer().map(|w| w.rotations()).unwrap_or(0);
    drop(logger);
    global::shutdown_default();
    let elapsed = start.elapsed();

    match (archive::list_archives(&path), archive::total_size(&path)) {
        (Ok(archives), Ok(total)) => {
            println!("wrote {} lines in {:?}", args.lines * args.threads, elapsed);
            println!("rotations: {}, direct writes: {}", rotations, fallback);
            println!("archives: {}, total bytes: {}", archives.len(), total);
            ExitCode::SUCCESS
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "failed to inspect log files");
            ExitCode::FAILURE
        }
    }
}
