// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondruck — receipt printing daemon.
//
// Entry point. Initialises logging, loads configuration, opens the
// audit trail, and wires the event subscriber to the print spooler.
// Runs until interrupted; job failures never terminate the process.

mod data_dir;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use bondruck_audit::AuditLog;
use bondruck_core::AppConfig;
use bondruck_ingest::Subscriber;
use bondruck_print::{Executor, Spooler};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("bondruck starting");

    let data_dir = data_dir::data_dir();
    let config = match AppConfig::load(&data_dir.join("config.json")) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "cannot start");
            return ExitCode::FAILURE;
        }
    };

    let audit = Arc::new(AuditLog::open(&data_dir));

    // Mirror observer-visible entries to stdout: the headless stand-in
    // for a log pane.
    let mut live = audit.subscribe();
    tokio::spawn(async move {
        loop {
            match live.recv().await {
                Ok(entry) => {
                    println!("[{}] {}", entry.timestamp.to_rfc3339(), entry.message)
                }
                Err(RecvError::Lagged(missed)) => {
                    info!(missed, "live audit observer fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    audit.record_visible("Ready to receive print jobs.", true);

    let executor = Arc::new(Executor::new(config.printer.clone(), audit.clone()));
    let (spool, worker) = Spooler::spawn(executor, audit.clone());

    let subscriber = Subscriber::new(&config, audit.clone(), spool);
    let ingest = tokio::spawn(subscriber.run());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    ingest.abort();
    worker.abort();
    ExitCode::SUCCESS
}
