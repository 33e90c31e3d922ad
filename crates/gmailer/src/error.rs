//! The job outcome taxonomy.
//!
//! Every way a run can end short of a full success is a variant here, and the
//! `Display` string is the job's user-facing result. None of these are faults:
//! the runner converts them straight into its output line.

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use shared_types::NotDue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    NotDue(#[from] NotDue),

    #[error("Error downloading file {0} from Dropbox")]
    StateUnavailable(String),

    #[error("Exiting due to invalid state, previous email appears to have been sent in the future")]
    InvalidStateInFuture,

    #[error("No matching results for query: '{0}'")]
    NoMatchingResults(String),

    #[error("Error - could not get raw message content for email")]
    NoRawContent,

    #[error("Exiting as this exact email has already been sent")]
    EmailAlreadySent,

    #[error("Exiting, email has already been sent for {}", .0.format("%B %Y"))]
    AlreadySentThisMonth(DateTime<Utc>),

    #[error("Exiting as an email has already been sent today")]
    AlreadySentToday,

    #[error("Error - could not send email/s")]
    CouldNotSend,

    #[error("Error sending email with subject '{subject}' to {}", join_recipients(.recipients))]
    CouldNotSendTo {
        subject: String,
        recipients: Vec<Mailbox>,
    },

    /// The send succeeded but the API response carried no raw content, so
    /// there is nothing trustworthy to persist as the new fingerprint.
    #[error("Error - could not decode raw message, message was sent but updated state was not stored in Dropbox.")]
    UndecodableSentMessage,

    /// The send succeeded but the state write did not; `description` is the
    /// send-success fragment so the partial success stays visible.
    #[error("{description}\nError - could not store state in Dropbox")]
    StoreWriteFailed { description: String },

    #[error("Error - {0} is not a list of valid email address")]
    NotAListOfEmailAddresses(String),

    #[error("Error - could not render message template: {0}")]
    TemplateRender(String),

    #[error("Exiting due to unknown error")]
    Unknown,
}

fn join_recipients(recipients: &[Mailbox]) -> String {
    recipients
        .iter()
        .map(|mailbox| match &mailbox.name {
            Some(name) => format!("{} <{}>", name, mailbox.email),
            None => mailbox.email.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn already_sent_this_month_names_the_month() {
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 10, 30, 0).unwrap();
        assert_eq!(
            JobError::AlreadySentThisMonth(now).to_string(),
            "Exiting, email has already been sent for June 2018"
        );
    }

    #[test]
    fn send_failure_lists_recipients_with_addresses() {
        let recipients = vec![
            Mailbox::new(
                Some("Milford".to_string()),
                "milford@graves.com".parse().unwrap(),
            ),
            Mailbox::new(
                Some("Carla Azar".to_string()),
                "carla@azar.com".parse().unwrap(),
            ),
        ];
        let error = JobError::CouldNotSendTo {
            subject: "subject A".to_string(),
            recipients,
        };
        assert_eq!(
            error.to_string(),
            "Error sending email with subject 'subject A' to Milford <milford@graves.com>, Carla Azar <carla@azar.com>"
        );
    }

    #[test]
    fn store_failure_keeps_the_send_success_fragment() {
        let error = JobError::StoreWriteFailed {
            description: "New email has been sent".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "New email has been sent\nError - could not store state in Dropbox"
        );
    }
}
