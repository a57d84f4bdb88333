//! Client-side step sequencer.
//!
//! Walks the fixed step order one request at a time. A failed step stays at
//! the head of the queue, so calling [`Sequencer::run`] again after fixing the
//! cause resumes exactly there.

pub mod http;

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use webinstall_common::{InstallState, InstallStep, Level, Message, StepParams, StepResponse};

use crate::errors::TransportError;
use crate::steps::Installer;

pub use http::HttpClient;

/// Sends one step request and returns the decoded response.
#[async_trait]
pub trait StepClient: Send + Sync {
    async fn invoke(
        &self,
        step: InstallStep,
        params: &StepParams,
    ) -> Result<StepResponse, TransportError>;
}

/// Calls the handlers in-process.
pub struct LocalClient {
    installer: Arc<Installer>,
}

impl LocalClient {
    pub fn new(installer: Arc<Installer>) -> Self {
        Self { installer }
    }
}

#[async_trait]
impl StepClient for LocalClient {
    async fn invoke(
        &self,
        step: InstallStep,
        params: &StepParams,
    ) -> Result<StepResponse, TransportError> {
        Ok(self.installer.execute(step, params).await.into())
    }
}

/// Receives progress while a sequence runs.
pub trait ProgressSink: Send + Sync {
    /// Called before the request for `step` is sent.
    fn step_started(&self, step: InstallStep, done: usize, total: usize);
    /// Called with the messages of the response.
    fn step_finished(&self, step: InstallStep, success: bool, messages: &[Message]);
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn step_started(&self, _step: InstallStep, _done: usize, _total: usize) {}
    fn step_finished(&self, _step: InstallStep, _success: bool, _messages: &[Message]) {}
}

/// Summary of one `run` call.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    /// Last state reached, `None` when no step succeeded yet
    pub state: Option<InstallState>,
    pub completed: usize,
    pub total: usize,
    pub messages: Vec<Message>,
    /// Step that failed and is waiting to be retried
    pub halted_at: Option<InstallStep>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SequenceReport {
    pub fn success(&self) -> bool {
        self.halted_at.is_none() && self.state == Some(InstallState::Finished)
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages.iter().filter(|m| m.level == level).count()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

pub struct Sequencer<C: StepClient> {
    client: C,
    remaining: VecDeque<InstallStep>,
    state: Option<InstallState>,
}

impl<C: StepClient> Sequencer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            remaining: InstallStep::ALL.into_iter().collect(),
            state: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn remaining(&self) -> impl Iterator<Item = InstallStep> + '_ {
        self.remaining.iter().copied()
    }

    pub fn state(&self) -> Option<InstallState> {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Run the remaining steps until one fails or none are left.
    ///
    /// Each step receives only the fields of `params` it reads.
    pub async fn run(&mut self, params: &StepParams, progress: &dyn ProgressSink) -> SequenceReport {
        let started_at = Utc::now();
        let total = InstallStep::ALL.len();
        let mut messages = Vec::new();
        let mut halted_at = None;

        while let Some(&step) = self.remaining.front() {
            let done = total - self.remaining.len();
            progress.step_started(step, done, total);
            tracing::debug!(%step, done, total, "sending step request");

            let (success, step_messages) =
                match self.client.invoke(step, &params.for_step(step)).await {
                    Ok(response) => (response.success, response.into_messages()),
                    Err(e) => {
                        tracing::warn!(%step, error = %e, "step request failed");
                        (false, vec![Message::new(Level::Danger, e.to_string())])
                    }
                };

            progress.step_finished(step, success, &step_messages);
            messages.extend(step_messages);

            if !success {
                halted_at = Some(step);
                break;
            }
            self.remaining.pop_front();
            self.state = Some(step.reached_state());
        }

        SequenceReport {
            state: self.state,
            completed: total - self.remaining.len(),
            total,
            messages,
            halted_at,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
