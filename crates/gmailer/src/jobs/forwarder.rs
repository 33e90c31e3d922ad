//! The forwarder job: once per calendar month, take the latest email
//! matching a configured Gmail query and re-send it under new sender,
//! recipient, and bcc headers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{decide, Candidate, ForwarderState, Period, PriorAction};

use super::{ready_or_report, Job};
use crate::config::ForwarderConfig;
use crate::datastore::{Datastore, DropboxClient};
use crate::error::JobError;
use crate::gmail::message::{after_boundary, replace_bcc, replace_recipient, replace_sender};
use crate::gmail::GmailClient;

/// Location of this job's state in the remote store.
const STATE_FILE: &str = "/gmailer_state.json";

pub struct GmailForwarder {
    gmail: Arc<dyn GmailClient>,
    datastore: Datastore<ForwarderState>,
    config: ForwarderConfig,
}

impl GmailForwarder {
    pub fn new(
        gmail: Arc<dyn GmailClient>,
        dropbox: Arc<dyn DropboxClient>,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            gmail,
            datastore: Datastore::new(dropbox, STATE_FILE),
            config,
        }
    }

    async fn try_run(&self, now: DateTime<Utc>) -> Result<String, JobError> {
        self.config.schedule.should_run(now)?;
        let state = self.datastore.current_state().await?;
        let candidate = self.candidate().await;

        let prior = PriorAction {
            at: state.last_email_sent,
            fingerprint: &state.email_contents,
        };
        let decision = decide(now, &prior, candidate, Period::CalendarMonth, after_boundary);
        let original = ready_or_report(decision, now, Period::CalendarMonth)?;

        self.send_and_store(now, &original).await
    }

    async fn candidate(&self) -> Candidate {
        let query = &self.config.gmail_query;
        let Some(message) = self.gmail.find_latest(query).await else {
            return Candidate::Missing {
                query: query.clone(),
            };
        };
        match self.gmail.fetch_raw(&message).await {
            Some(bytes) => Candidate::Ready(String::from_utf8_lossy(&bytes).into_owned()),
            None => Candidate::Unreadable,
        }
    }

    async fn send_and_store(&self, now: DateTime<Utc>, original: &str) -> Result<String, JobError> {
        let rewritten = replace_bcc(
            &replace_recipient(
                &replace_sender(original, &self.config.from),
                &self.config.to,
            ),
            &self.config.bcc,
        );

        let sent = self
            .gmail
            .send(rewritten.as_bytes())
            .await
            .map_err(|_| JobError::CouldNotSend)?;

        // The new fingerprint comes from the content the API actually sent,
        // not from what was submitted; without it there is nothing
        // trustworthy to persist.
        let contents = sent
            .raw
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .ok_or(JobError::UndecodableSentMessage)?;

        let new_state = ForwarderState {
            last_email_sent: now,
            email_contents: contents,
        };
        self.datastore.store(&new_state, "New email has been sent").await
    }
}

#[async_trait]
impl Job for GmailForwarder {
    fn name(&self) -> &str {
        &self.config.job_name
    }

    async fn run(&self, now: DateTime<Utc>) -> String {
        tracing::info!("Running forwarder job {}", self.config.job_name);
        match self.try_run(now).await {
            Ok(outcome) => outcome,
            Err(error) => error.to_string(),
        }
    }
}
