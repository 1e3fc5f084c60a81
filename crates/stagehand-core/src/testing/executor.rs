use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::remote::{
    CommandOutput, RemoteExecutor, SyncDirection, SyncOutcome, SyncRequest, TransportError,
};

/// Recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Run { argv: Vec<String>, timeout: Duration },
    Sync(SyncRequest),
}

/// Scripted transport failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    Connection(String),
    Timeout,
}

impl FakeFailure {
    fn into_error(self, target: &str, operation: &str, timeout: Duration) -> TransportError {
        match self {
            Self::Connection(detail) => TransportError::Connection {
                target: target.to_string(),
                exit_code: 255,
                detail,
            },
            Self::Timeout => TransportError::Timeout {
                operation: operation.to_string(),
                timeout,
            },
        }
    }
}

#[derive(Default)]
struct FakeExecutorState {
    calls: Vec<RemoteCall>,
    runs: HashMap<String, Result<CommandOutput, FakeFailure>>,
    syncs: HashMap<(SyncDirection, bool), Result<SyncOutcome, FakeFailure>>,
}

/// Fake execution transport.
///
/// Unscripted commands exit 0 with empty output and unscripted syncs succeed.
#[derive(Clone)]
pub struct FakeExecutor {
    target: String,
    inner: Arc<Mutex<FakeExecutorState>>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new("root@fake-controller")
    }
}

impl FakeExecutor {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inner: Arc::new(Mutex::new(FakeExecutorState::default())),
        }
    }

    /// Answer every command whose program is `program`.
    pub fn on_run(&self, program: &str, output: CommandOutput) {
        self.inner.lock().runs.insert(program.to_string(), Ok(output));
    }

    pub fn fail_run(&self, program: &str, failure: FakeFailure) {
        self.inner
            .lock()
            .runs
            .insert(program.to_string(), Err(failure));
    }

    /// Answer syncs in `direction`, for both real and dry runs.
    pub fn on_sync(&self, direction: SyncDirection, outcome: SyncOutcome) {
        let mut inner = self.inner.lock();
        inner.syncs.insert((direction, false), Ok(outcome.clone()));
        inner.syncs.insert((direction, true), Ok(outcome));
    }

    pub fn fail_sync(&self, direction: SyncDirection, failure: FakeFailure) {
        let mut inner = self.inner.lock();
        inner.syncs.insert((direction, false), Err(failure.clone()));
        inner.syncs.insert((direction, true), Err(failure));
    }

    /// All calls, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn sync_requests(&self) -> Vec<SyncRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Sync(request) => Some(request),
                RemoteCall::Run { .. } => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Run { argv, .. } => Some(argv),
                RemoteCall::Sync(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteExecutor for FakeExecutor {
    fn target(&self) -> &str {
        &self.target
    }

    async fn run(&self, argv: &[&str], timeout: Duration) -> Result<CommandOutput, TransportError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Run {
            argv: argv.iter().map(|a| a.to_string()).collect(),
            timeout,
        });

        let program = argv.first().copied().unwrap_or_default();
        match inner.runs.get(program).cloned() {
            Some(Ok(output)) => Ok(output),
            Some(Err(failure)) => Err(failure.into_error(&self.target, program, timeout)),
            None => Ok(CommandOutput::default()),
        }
    }

    async fn sync_tree(&self, request: &SyncRequest) -> Result<SyncOutcome, TransportError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Sync(request.clone()));

        match inner.syncs.get(&(request.direction, request.dry_run)).cloned() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(failure)) => Err(failure.into_error(&self.target, "rsync", request.timeout)),
            None => Ok(SyncOutcome {
                success: true,
                ..Default::default()
            }),
        }
    }
}
