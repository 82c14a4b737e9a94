#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use reqwest::StatusCode;
use tokio::time::Instant;
use webclient_executor::{
    async_trait, BoxError, ClientOptions, RequestExecutor, RetryOn, RetryPolicy, Transport,
    TransportRequest, TransportResponse,
};

/// What the scripted transport does on one call.
#[derive(Clone, Debug)]
pub enum Step {
    Respond(u16, &'static str),
    Fail(&'static str),
    Hang,
}

/// In-memory transport replaying a fixed script, one step per call.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls mutex").len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, BoxError> {
        self.calls.lock().expect("calls mutex").push(Instant::now());
        self.requests.lock().expect("requests mutex").push(request);
        let step = self
            .script
            .lock()
            .expect("script mutex")
            .pop_front()
            .unwrap_or(Step::Respond(500, "script exhausted"));

        match step {
            Step::Respond(status, body) => Ok(TransportResponse::new(
                StatusCode::from_u16(status).expect("valid status"),
                body,
            )),
            Step::Fail(message) => Err(message.into()),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Reference policy (10s timeout, 3 retries from 2s) with jitter removed so
/// backoff spacing is exact.
pub fn exact_options(retry_on: RetryOn) -> ClientOptions {
    ClientOptions {
        retry: RetryPolicy {
            jitter: 0.0,
            retry_on,
            ..RetryPolicy::default()
        },
        ..ClientOptions::default()
    }
}

pub fn executor(transport: &ScriptedTransport, options: ClientOptions) -> RequestExecutor {
    RequestExecutor::new(transport.clone()).with_options(options)
}
