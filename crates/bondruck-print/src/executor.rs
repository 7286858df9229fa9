// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Executes one print job against one backend connection.
//
// The connection is owned exclusively for the duration of the job and
// closed (best effort) before the outcome is reported, whatever that
// outcome is. Errors that are a property of the environment at this
// instant come back as retryable; errors baked into the job's own data
// are terminal no matter how often the job would be retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use bondruck_audit::AuditLog;
use bondruck_core::{
    BondruckError, ErrorClass, PrintJob, PrinterDefaults, Result, TransportKind, classify,
};

use crate::backend::{BackendFactory, DefaultBackendFactory, PrinterBackend, PrinterTarget};
use crate::escpos;

/// Bound on how long a backend may take to establish its connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of executing one job. The spooler decides what happens next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Transient environment failure; the job may be re-enqueued.
    Retryable(String),
    /// The job itself can never succeed; it is discarded immediately.
    Terminal(String),
}

/// Anything the spooler can drive. The production implementation is
/// [`Executor`]; tests substitute scripted fakes.
#[async_trait]
pub trait ExecuteJob: Send + Sync {
    async fn execute(&self, job: &PrintJob) -> Outcome;
}

pub struct Executor {
    defaults: PrinterDefaults,
    audit: Arc<AuditLog>,
    factory: Box<dyn BackendFactory>,
    connect_timeout: Duration,
}

impl Executor {
    pub fn new(defaults: PrinterDefaults, audit: Arc<AuditLog>) -> Self {
        Self {
            defaults,
            audit,
            factory: Box::new(DefaultBackendFactory),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Replace the backend factory. Used by tests to script transport
    /// behaviour without a physical printer.
    pub fn with_factory(mut self, factory: Box<dyn BackendFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve the job's transport tag and endpoint against the
    /// configured defaults.
    fn resolve_target(&self, job: &PrintJob) -> Result<PrinterTarget> {
        let tag = job
            .transport
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.defaults.transport);
        let kind = TransportKind::parse(tag)
            .ok_or_else(|| BondruckError::UnsupportedTransport(tag.to_string()))?;

        match kind {
            TransportKind::Network => {
                let host = job
                    .endpoint
                    .host
                    .clone()
                    .filter(|h| !h.trim().is_empty())
                    .unwrap_or_else(|| self.defaults.host.clone());
                let port = job.endpoint.port.unwrap_or(self.defaults.port);
                if host.trim().is_empty() || port == 0 {
                    return Err(BondruckError::MissingAddress);
                }
                Ok(PrinterTarget::Network { host, port })
            }
            TransportKind::Usb => Ok(PrinterTarget::Usb {
                selector: job.endpoint.device.clone().filter(|d| !d.trim().is_empty()),
            }),
        }
    }

    async fn run(&self, job: &PrintJob) -> Result<()> {
        if job.payload.trim().is_empty() {
            return Err(BondruckError::MissingContent);
        }
        self.audit
            .record_visible(&format!("Printing content:\n{}", job.payload), true);

        let target = self.resolve_target(job)?;
        self.audit
            .record(&format!("job {} resolved to {target}", job.id));

        let mut backend = self.factory.build(&target);
        let result = self.drive(backend.as_mut(), &job.payload).await;
        // Cleanup runs no matter how the attempt ended.
        backend.close().await;
        result
    }

    async fn drive(&self, backend: &mut dyn PrinterBackend, payload: &str) -> Result<()> {
        backend.open(self.connect_timeout).await?;
        backend.write(&escpos::render_text(payload)).await?;
        backend.cut().await?;
        Ok(())
    }
}

#[async_trait]
impl ExecuteJob for Executor {
    #[instrument(skip_all, fields(job_id = %job.id, retry = job.retry_count))]
    async fn execute(&self, job: &PrintJob) -> Outcome {
        match self.run(job).await {
            Ok(()) => {
                debug!("job printed");
                self.audit.record_visible("Printed successfully.", true);
                Outcome::Success
            }
            Err(err) => match classify(&err) {
                ErrorClass::Permanent => {
                    self.audit
                        .record_visible(&format!("Job {} rejected: {err}", job.id), true);
                    Outcome::Terminal(err.to_string())
                }
                ErrorClass::Transient => {
                    warn!(error = %err, "attempt failed");
                    self.audit
                        .record_visible(&format!("Printing failed: {err}"), true);
                    Outcome::Retryable(err.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondruck_core::Endpoint;
    use std::sync::Mutex;

    /// What a scripted backend should do at each step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Script {
        Succeed,
        FailOpen,
        FailWrite,
        FailCut,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Build(PrinterTarget),
        Open,
        Write(Vec<u8>),
        Cut,
        Close,
    }

    struct ScriptedFactory {
        script: Script,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl ScriptedFactory {
        fn new(script: Script) -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    script,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl BackendFactory for ScriptedFactory {
        fn build(&self, target: &PrinterTarget) -> Box<dyn PrinterBackend> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(Call::Build(target.clone()));
            Box::new(ScriptedBackend {
                script: self.script,
                calls: self.calls.clone(),
            })
        }
    }

    struct ScriptedBackend {
        script: Script,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl ScriptedBackend {
        fn log(&self, call: Call) {
            self.calls.lock().expect("calls lock").push(call);
        }
    }

    #[async_trait]
    impl PrinterBackend for ScriptedBackend {
        async fn open(&mut self, _timeout: Duration) -> Result<()> {
            self.log(Call::Open);
            match self.script {
                Script::FailOpen => Err(BondruckError::ConnectTimeout {
                    addr: "10.0.0.5:9100".into(),
                    secs: 5,
                }),
                _ => Ok(()),
            }
        }

        async fn write(&mut self, data: &[u8]) -> Result<()> {
            self.log(Call::Write(data.to_vec()));
            match self.script {
                Script::FailWrite => Err(BondruckError::Connection("broken pipe".into())),
                _ => Ok(()),
            }
        }

        async fn cut(&mut self) -> Result<()> {
            self.log(Call::Cut);
            match self.script {
                Script::FailCut => Err(BondruckError::Connection("reset by peer".into())),
                _ => Ok(()),
            }
        }

        async fn close(&mut self) {
            self.log(Call::Close);
        }
    }

    fn make_executor(script: Script) -> (Executor, Arc<Mutex<Vec<Call>>>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = Arc::new(AuditLog::open(dir.path().join("audit")));
        let (factory, calls) = ScriptedFactory::new(script);
        let executor =
            Executor::new(PrinterDefaults::default(), audit).with_factory(Box::new(factory));
        (executor, calls, dir)
    }

    fn audit_text(executor: &Executor) -> String {
        std::fs::read_to_string(executor.audit.path()).unwrap_or_default()
    }

    #[tokio::test]
    async fn success_runs_full_sequence() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let job = PrintJob::new("Receipt #1").with_transport("network");

        let outcome = executor.execute(&job).await;
        assert_eq!(outcome, Outcome::Success);

        let calls = calls.lock().expect("calls lock");
        assert!(matches!(calls[0], Call::Build(_)));
        assert_eq!(calls[1], Call::Open);
        assert!(matches!(calls[2], Call::Write(_)));
        assert_eq!(calls[3], Call::Cut);
        assert_eq!(calls[4], Call::Close);
        assert!(audit_text(&executor).contains("Printed successfully."));
    }

    #[tokio::test]
    async fn empty_payload_is_terminal_without_touching_the_backend() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let job = PrintJob::new("");

        let outcome = executor.execute(&job).await;
        assert_eq!(outcome, Outcome::Terminal("missing content".into()));
        assert!(calls.lock().expect("calls lock").is_empty());
        assert!(audit_text(&executor).contains("rejected: missing content"));
    }

    #[tokio::test]
    async fn unknown_transport_is_terminal() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let job = PrintJob::new("Receipt #1").with_transport("serial");

        let outcome = executor.execute(&job).await;
        assert_eq!(
            outcome,
            Outcome::Terminal("unsupported printer type: serial".into())
        );
        assert!(calls.lock().expect("calls lock").is_empty());
    }

    #[tokio::test]
    async fn open_timeout_is_retryable_and_still_closed() {
        let (executor, calls, _dir) = make_executor(Script::FailOpen);
        let job = PrintJob::new("Receipt #1");

        let outcome = executor.execute(&job).await;
        assert!(matches!(outcome, Outcome::Retryable(_)));

        let calls = calls.lock().expect("calls lock");
        assert_eq!(*calls.last().expect("at least one call"), Call::Close);
        assert!(audit_text(&executor).contains("Printing failed:"));
    }

    #[tokio::test]
    async fn write_failure_is_retryable() {
        let (executor, _calls, _dir) = make_executor(Script::FailWrite);
        let outcome = executor.execute(&PrintJob::new("Receipt #1")).await;
        assert!(matches!(outcome, Outcome::Retryable(_)));
    }

    #[tokio::test]
    async fn cut_failure_is_retryable() {
        let (executor, _calls, _dir) = make_executor(Script::FailCut);
        let outcome = executor.execute(&PrintJob::new("Receipt #1")).await;
        assert!(matches!(outcome, Outcome::Retryable(_)));
    }

    #[tokio::test]
    async fn defaults_fill_missing_transport_and_endpoint() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let outcome = executor.execute(&PrintJob::new("Receipt #1")).await;
        assert_eq!(outcome, Outcome::Success);

        let calls = calls.lock().expect("calls lock");
        assert_eq!(
            calls[0],
            Call::Build(PrinterTarget::Network {
                host: "192.168.0.100".into(),
                port: 9100,
            })
        );
    }

    #[tokio::test]
    async fn job_endpoint_overrides_defaults() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let job = PrintJob::new("Receipt #1")
            .with_transport("lan")
            .with_endpoint(Endpoint {
                host: Some("10.0.0.5".into()),
                port: Some(631),
                device: None,
            });

        executor.execute(&job).await;
        let calls = calls.lock().expect("calls lock");
        assert_eq!(
            calls[0],
            Call::Build(PrinterTarget::Network {
                host: "10.0.0.5".into(),
                port: 631,
            })
        );
    }

    #[tokio::test]
    async fn usb_transport_builds_usb_target() {
        let (executor, calls, _dir) = make_executor(Script::Succeed);
        let job = PrintJob::new("Receipt #1")
            .with_transport("usb")
            .with_endpoint(Endpoint {
                host: None,
                port: None,
                device: Some("04b8:0e15".into()),
            });

        executor.execute(&job).await;
        let calls = calls.lock().expect("calls lock");
        assert_eq!(
            calls[0],
            Call::Build(PrinterTarget::Usb {
                selector: Some("04b8:0e15".into()),
            })
        );
    }

    #[tokio::test]
    async fn blank_configured_host_is_missing_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = Arc::new(AuditLog::open(dir.path().join("audit")));
        let (factory, calls) = ScriptedFactory::new(Script::Succeed);
        let defaults = PrinterDefaults {
            transport: "network".into(),
            host: String::new(),
            port: 9100,
        };
        let executor = Executor::new(defaults, audit).with_factory(Box::new(factory));

        let outcome = executor.execute(&PrintJob::new("Receipt #1")).await;
        assert_eq!(outcome, Outcome::Terminal("missing printer address".into()));
        assert!(calls.lock().expect("calls lock").is_empty());
    }
}
