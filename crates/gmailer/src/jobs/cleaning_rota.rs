//! The cleaning-rota job: on configured weekdays, alternate between a
//! "cleaning this week" announcement to every member and a reminder to the
//! member who is up next, rotating through the members list.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use lettre::message::Mailbox;
use shared_types::template::render;
use shared_types::{decide, Candidate, Member, Members, Period, PriorAction, RotaState, RotaStatus};

use super::{ready_or_report, Job};
use crate::config::RotaConfig;
use crate::datastore::{Datastore, DropboxClient};
use crate::error::JobError;
use crate::gmail::message::OutgoingEmail;
use crate::gmail::GmailClient;

/// Locations of this job's files in the remote store.
const STATE_FILE: &str = "/cleaning_rota_gmailer.json";
const MEMBERS_FILE: &str = "/members.json";

const CLEANING_SUCCESS: &str =
    "{{cleaner}} is cleaning this week - an email has been sent to all members.";
const NOT_CLEANING_SUCCESS: &str =
    "There is no cleaning this week - an email reminder has been sent to {{cleaner}} who is cleaning next week.";

pub struct CleaningRotaGmailer {
    gmail: Arc<dyn GmailClient>,
    app_state: Datastore<RotaState>,
    members: Datastore<Members>,
    config: RotaConfig,
}

/// Everything the current status determines about this week's email.
struct MailingContext {
    recipients: Vec<Mailbox>,
    subject_template: String,
    body_template: String,
    success_template: &'static str,
    cleaner_on_notice: Member,
}

impl CleaningRotaGmailer {
    pub fn new(
        gmail: Arc<dyn GmailClient>,
        dropbox: Arc<dyn DropboxClient>,
        config: RotaConfig,
    ) -> Self {
        Self {
            gmail,
            app_state: Datastore::new(dropbox.clone(), STATE_FILE),
            members: Datastore::new(dropbox, MEMBERS_FILE),
            config,
        }
    }

    async fn try_run(&self, now: DateTime<Utc>) -> Result<String, JobError> {
        self.config.schedule.should_run(now)?;
        let state = self.app_state.current_state().await?;
        let members = self.members.current_state().await?;

        let context = self.context_for(&state, &members)?;
        let model = BTreeMap::from([("cleaner", context.cleaner_on_notice.full_name())]);
        let subject = render(&context.subject_template, &model)
            .map_err(|e| JobError::TemplateRender(e.to_string()))?;
        let body = render(&context.body_template, &model)
            .map_err(|e| JobError::TemplateRender(e.to_string()))?;

        // The rendered body is the fingerprint: it is what gets persisted
        // after a send, and it carries no volatile fields.
        let prior_at = Utc.from_utc_datetime(&state.last_ran_on.and_time(NaiveTime::MIN));
        let prior = PriorAction {
            at: prior_at,
            fingerprint: &state.email_contents,
        };
        let decision = decide(
            now,
            &prior,
            Candidate::Ready(body.clone()),
            Period::CalendarDay,
            |content| content.to_string(),
        );
        let body = ready_or_report(decision, now, Period::CalendarDay)?;

        self.send_and_rotate(now, &state, &members, context, subject, body)
            .await
    }

    fn context_for(
        &self,
        state: &RotaState,
        members: &Members,
    ) -> Result<MailingContext, JobError> {
        match state.status {
            RotaStatus::CleaningThisWeek => {
                let Some(cleaner) = state.cleaner.clone() else {
                    tracing::warn!("State says cleaning this week but names no cleaner");
                    return Err(JobError::Unknown);
                };
                Ok(MailingContext {
                    recipients: members
                        .members
                        .iter()
                        .map(member_mailbox)
                        .collect::<Result<_, _>>()?,
                    subject_template: self.config.subject_a.clone(),
                    body_template: format!("{}{}", self.config.body_a, self.config.footer),
                    success_template: CLEANING_SUCCESS,
                    cleaner_on_notice: cleaner,
                })
            }
            RotaStatus::NotCleaningThisWeek => Ok(MailingContext {
                recipients: vec![member_mailbox(&state.next_up)?],
                subject_template: self.config.subject_b.clone(),
                body_template: format!("{}{}", self.config.body_b, self.config.footer),
                success_template: NOT_CLEANING_SUCCESS,
                cleaner_on_notice: state.next_up.clone(),
            }),
        }
    }

    async fn send_and_rotate(
        &self,
        now: DateTime<Utc>,
        state: &RotaState,
        members: &Members,
        context: MailingContext,
        subject: String,
        body: String,
    ) -> Result<String, JobError> {
        let email = OutgoingEmail {
            from: self.config.from.clone(),
            to: context.recipients.clone(),
            bcc: self.config.bcc.clone(),
            subject: subject.clone(),
            body: body.clone(),
        };
        let raw = email.to_raw().map_err(|e| {
            tracing::error!("Could not build outgoing message: {}", e);
            JobError::Unknown
        })?;

        self.gmail
            .send(&raw)
            .await
            .map_err(|_| JobError::CouldNotSendTo {
                subject: subject.clone(),
                recipients: context.recipients.clone(),
            })?;

        let model = BTreeMap::from([("cleaner", context.cleaner_on_notice.full_name())]);
        let success = render(context.success_template, &model)
            .map_err(|e| JobError::TemplateRender(e.to_string()))?;

        let next_status = state.status.flip();
        let cleaner = match next_status {
            RotaStatus::CleaningThisWeek => Some(state.next_up.clone()),
            RotaStatus::NotCleaningThisWeek => None,
        };
        let next_up = members
            .next_member_after(&context.cleaner_on_notice)
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("Members list is empty, cannot rotate");
                JobError::Unknown
            })?;

        let new_state = RotaState {
            status: next_status,
            cleaner,
            next_up,
            last_ran_on: now.date_naive(),
            // The exact string that went out; never re-rendered.
            email_contents: body,
        };
        self.app_state.store(&new_state, &success).await
    }
}

fn member_mailbox(member: &Member) -> Result<Mailbox, JobError> {
    let address = member
        .email
        .parse::<lettre::Address>()
        .map_err(|_| JobError::NotAListOfEmailAddresses(member.email.clone()))?;
    Ok(Mailbox::new(Some(member.full_name()), address))
}

#[async_trait]
impl Job for CleaningRotaGmailer {
    fn name(&self) -> &str {
        &self.config.job_name
    }

    async fn run(&self, now: DateTime<Utc>) -> String {
        tracing::info!("Running cleaning-rota job {}", self.config.job_name);
        match self.try_run(now).await {
            Ok(outcome) => outcome,
            Err(error) => error.to_string(),
        }
    }
}
