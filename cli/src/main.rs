#![expect(clippy::print_stdout, reason = "We are a CLI.")]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zwift_monitor_core::capture::PcapSource;
use zwift_monitor_core::diagnostics::{DiagnosticSink, FileDiagnosticSink, NullDiagnosticSink};
use zwift_monitor_core::session::{CancellationToken, CaptureSession};
use zwift_monitor_core::{CaptureConfig, EventRouter, InterfaceSelector, MonitorEvent};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Capture {
            interface,
            companion,
            dump_dir,
        } => {
            let config = CaptureConfig {
                include_companion: companion,
                ..CaptureConfig::default()
            };
            let selector = InterfaceSelector::from_str_opt(&interface);
            let source = PcapSource::open_live(&selector, &config.bpf_filter(), config.read_timeout)
                .context("failed to open live capture")?;

            run_session(source, config, dump_dir)
        }
        Command::Replay {
            file,
            companion,
            dump_dir,
        } => {
            anyhow::ensure!(file.exists(), "capture file not found: {}", file.display());

            let config = CaptureConfig {
                include_companion: companion,
                ..CaptureConfig::default()
            };
            let source = PcapSource::open_file(&file).context("failed to open capture file")?;

            run_session(source, config, dump_dir)
        }
    }
}

fn run_session(
    source: PcapSource,
    config: CaptureConfig,
    dump_dir: Option<PathBuf>,
) -> Result<()> {
    let router = EventRouter::new();
    router.subscribe(None, Box::new(print_event));

    let mut session = CaptureSession::new(router, config);
    let cancel = CancellationToken::new();

    let sink: Box<dyn DiagnosticSink> = match dump_dir {
        Some(dir) => Box::new(FileDiagnosticSink::new(dir)),
        None => Box::new(NullDiagnosticSink),
    };

    session
        .run(source, &cancel, sink.as_ref())
        .context("capture session terminated with a fatal error")
}

fn print_event(event: &MonitorEvent) {
    println!("{event:?}");
}

#[derive(Parser, Debug)]
#[command(name = "zwift-monitor", bin_name = "zwift-monitor", about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture live traffic on a network interface.
    Capture {
        /// Device name, IPv4 address, or friendly name. Empty picks the
        /// first interface with an address.
        #[arg(long, default_value = "")]
        interface: String,
        /// Also decode companion-app traffic on port 21587.
        #[arg(long)]
        companion: bool,
        /// Directory to write samples of unrecognised messages into.
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },
    /// Replay a previously captured pcap file.
    Replay {
        /// Path to the capture file.
        #[arg(long)]
        file: PathBuf,
        /// Also decode companion-app traffic on port 21587.
        #[arg(long)]
        companion: bool,
        /// Directory to write samples of unrecognised messages into.
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },
}
