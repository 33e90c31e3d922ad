//! The job pipeline: schedule gate, state read, candidate, decision, send,
//! state write. Each variant parameterizes the shared engine with its own
//! period granularity, candidate source, normalization, and state update.

pub mod cleaning_rota;
pub mod forwarder;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{Decision, Period};

use crate::error::JobError;

/// One configured scheduled mailer. Every invocation makes exactly one send
/// decision and reports a single human-readable outcome, never a fault.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, now: DateTime<Utc>) -> String;
}

/// Turn a decision into the candidate content, or the suppression outcome
/// the run reports instead.
pub(crate) fn ready_or_report(
    decision: Decision,
    now: DateTime<Utc>,
    period: Period,
) -> Result<String, JobError> {
    match decision {
        Decision::ReadyToSend(content) => Ok(content),
        Decision::InvalidFutureState => Err(JobError::InvalidStateInFuture),
        Decision::NoCandidateFound { query } => Err(JobError::NoMatchingResults(query)),
        Decision::CandidateUnavailable => Err(JobError::NoRawContent),
        Decision::ExactDuplicate => Err(JobError::EmailAlreadySent),
        Decision::AlreadyDoneThisPeriod => Err(match period {
            Period::CalendarMonth => JobError::AlreadySentThisMonth(now),
            Period::CalendarDay => JobError::AlreadySentToday,
        }),
        Decision::UnknownState => Err(JobError::Unknown),
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    //! In-memory collaborators for the job tests, mirroring the live
    //! clients' observable behavior.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::datastore::{DropboxClient, ReadError, WriteError};
    use crate::gmail::{GmailClient, MessageRef, SendFailed, SentMessage};

    pub struct StubDropboxClient {
        files: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl StubDropboxClient {
        pub fn new(files: impl IntoIterator<Item = (&'static str, String)>) -> Self {
            Self {
                files: Mutex::new(
                    files
                        .into_iter()
                        .map(|(name, contents)| (name.to_string(), contents))
                        .collect(),
                ),
                fail_writes: false,
            }
        }

        pub fn failing_writes(files: impl IntoIterator<Item = (&'static str, String)>) -> Self {
            Self {
                fail_writes: true,
                ..Self::new(files)
            }
        }

        pub fn file(&self, name: &str) -> Option<String> {
            self.files.lock().unwrap().get(name).cloned()
        }
    }

    #[async_trait]
    impl DropboxClient for StubDropboxClient {
        async fn read_file(&self, filename: &str) -> Result<String, ReadError> {
            self.files
                .lock()
                .unwrap()
                .get(filename)
                .cloned()
                .ok_or_else(|| ReadError::NotFound {
                    filename: filename.to_string(),
                })
        }

        async fn write_file(&self, filename: &str, contents: &str) -> Result<(), WriteError> {
            if self.fail_writes {
                return Err(WriteError);
            }
            self.files
                .lock()
                .unwrap()
                .insert(filename.to_string(), contents.to_string());
            Ok(())
        }
    }

    pub struct StubGmailClient {
        latest: Option<MessageRef>,
        raw: Option<Vec<u8>>,
        fail_send: bool,
        echo_sent_raw: bool,
        pub sent: Mutex<Vec<Vec<u8>>>,
    }

    impl StubGmailClient {
        pub fn with_latest(raw: &str) -> Self {
            Self {
                latest: Some(MessageRef {
                    id: "msg-1".to_string(),
                }),
                raw: Some(raw.as_bytes().to_vec()),
                fail_send: false,
                echo_sent_raw: true,
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self {
                latest: None,
                raw: None,
                fail_send: false,
                echo_sent_raw: true,
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn unreadable() -> Self {
            Self {
                raw: None,
                ..Self::with_latest("")
            }
        }

        pub fn failing_send(raw: &str) -> Self {
            Self {
                fail_send: true,
                ..Self::with_latest(raw)
            }
        }

        /// A send that succeeds but whose response carries no raw content.
        pub fn sending_without_echo(raw: &str) -> Self {
            Self {
                echo_sent_raw: false,
                ..Self::with_latest(raw)
            }
        }

        pub fn sent_messages(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect()
        }
    }

    #[async_trait]
    impl GmailClient for StubGmailClient {
        async fn find_latest(&self, _query: &str) -> Option<MessageRef> {
            self.latest.clone()
        }

        async fn fetch_raw(&self, _message: &MessageRef) -> Option<Vec<u8>> {
            self.raw.clone()
        }

        async fn send(&self, raw: &[u8]) -> Result<SentMessage, SendFailed> {
            if self.fail_send {
                return Err(SendFailed);
            }
            self.sent.lock().unwrap().push(raw.to_vec());
            Ok(SentMessage {
                raw: self.echo_sent_raw.then(|| raw.to_vec()),
            })
        }
    }
}
