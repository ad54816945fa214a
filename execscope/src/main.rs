//! # execscope - Main Entry Point
//!
//! Loads the probe, then runs the polling loop on a blocking task until
//! Ctrl+C or `--duration` requests cancellation.

#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use execscope::cli::Args;
use execscope::consumer::{
    display_statistics, display_summary, run_poll_loop, EventProcessor, OutputSink, PollConfig,
};
use execscope::export::RecordExporter;
use execscope::preflight::run_preflight_checks;
use execscope::probe::{
    attach_execve_tracepoint, init_ebpf_logger, load_ebpf_program, online_cpus, open_stores,
    open_transport, print_store_diagnostics,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    run_preflight_checks(quiet)?;

    if !quiet {
        println!("execscope v{}", env!("CARGO_PKG_VERSION"));
    }

    // ── Load and attach ─────────────────────────────────────────────────
    let mut bpf = load_ebpf_program()?;
    init_ebpf_logger(&mut bpf);

    let (events, strings) = open_stores(&mut bpf)?;
    let mut transport = open_transport(&mut bpf, args.pages)?;
    attach_execve_tracepoint(&mut bpf)?;

    // ── Output ──────────────────────────────────────────────────────────
    let exporter = args.export.as_deref().map(RecordExporter::create).transpose()?;
    if !quiet {
        if let Some(ref export_path) = args.export {
            println!("export: {}", export_path.display());
        }
    }
    let mut sink = OutputSink::new(io::stdout(), args.format, exporter);

    // ── Cancellation: Ctrl+C or duration limit ──────────────────────────
    let cancel = Arc::new(AtomicBool::new(false));
    let duration_limit = args.duration_limit();
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            let limit = async {
                match duration_limit {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = limit => {}
            }
            cancel.store(true, Ordering::Relaxed);
        });
    }

    let config = PollConfig { timeout: args.poll_timeout(), stats_interval: args.stats_interval() };
    info!("Polling every {}ms", config.timeout.as_millis());
    if !quiet {
        println!("tracing execve... (Ctrl+C to stop)");
    }

    // ── Poll loop on a single blocking task ─────────────────────────────
    let started = Instant::now();
    let loop_cancel = Arc::clone(&cancel);
    let (processor, mut sink, result) = tokio::task::spawn_blocking(move || {
        let mut processor = EventProcessor::new(events, strings);
        let result = run_poll_loop(&mut transport, &mut processor, &mut sink, &loop_cancel, config);
        (processor, sink, result)
    })
    .await
    .context("Polling task panicked")?;
    result.context("Polling loop failed")?;

    // ── Summary ─────────────────────────────────────────────────────────
    if !quiet {
        let elapsed = started.elapsed();
        let reason = match duration_limit {
            Some(limit) if elapsed >= limit => "duration limit reached",
            _ => "interrupted",
        };
        display_summary(reason, elapsed.as_secs_f64(), processor.stats());
        display_statistics(processor.stats());
        print_store_diagnostics(&bpf, &online_cpus()?)?;
    }

    if let Some(exporter) = sink.take_exporter() {
        let written = exporter.finish()?;
        if !quiet {
            if let Some(ref export_path) = args.export {
                println!("saved: {} ({written} records)", export_path.display());
            }
        }
    }

    Ok(())
}
