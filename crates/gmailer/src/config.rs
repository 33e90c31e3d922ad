//! Env-var configuration, one variable prefix per job.
//!
//! Each configured job reads `{JOB_NAME}_*` variables. Missing or malformed
//! values are configuration defects and surface as faults at startup, before
//! any job runs.

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use lettre::message::Mailbox;
use shared_types::{RunAfter, RunDays, Schedule};

use crate::gmail::message::parse_address_list;
use crate::gmail::GmailSecrets;

pub fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable must be set"))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Credentials a job needs: Gmail OAuth material plus the Dropbox token.
#[derive(Debug, Clone)]
pub struct JobSecrets {
    pub gmail: GmailSecrets,
    pub dropbox_access_token: String,
}

impl JobSecrets {
    pub fn from_env(prefix: &str) -> Result<Self> {
        Ok(Self {
            gmail: GmailSecrets {
                client_id: require_env(&format!("{prefix}_GMAIL_CLIENT_ID"))?,
                client_secret: require_env(&format!("{prefix}_GMAIL_CLIENT_SECRET"))?,
                refresh_token: require_env(&format!("{prefix}_GMAIL_REFRESH_TOKEN"))?,
            },
            dropbox_access_token: require_env(&format!("{prefix}_DROPBOX_ACCESS_TOKEN"))?,
        })
    }
}

/// Settings of the forwarder job.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub job_name: String,
    pub gmail_query: String,
    pub schedule: Schedule,
    pub from: Mailbox,
    pub to: Mailbox,
    pub bcc: Vec<Mailbox>,
}

impl ForwarderConfig {
    pub fn from_env(job_name: &str) -> Result<Self> {
        let get = |suffix: &str| require_env(&format!("{job_name}_{suffix}"));

        Ok(Self {
            job_name: job_name.to_string(),
            gmail_query: get("GMAIL_QUERY")?,
            schedule: schedule_from_env(job_name)?,
            from: mailbox(get("FROM_ADDRESS")?, get("FROM_FULLNAME")?)?,
            to: mailbox(get("TO_ADDRESS")?, get("TO_FULLNAME")?)?,
            bcc: parse_address_list(&get("BCC_ADDRESS")?)?,
        })
    }
}

/// Settings of the cleaning-rota job.
#[derive(Debug, Clone)]
pub struct RotaConfig {
    pub job_name: String,
    pub schedule: Schedule,
    pub from: Mailbox,
    pub bcc: Vec<Mailbox>,
    pub subject_a: String,
    pub body_a: String,
    pub subject_b: String,
    pub body_b: String,
    pub footer: String,
}

impl RotaConfig {
    pub fn from_env(job_name: &str) -> Result<Self> {
        let get = |suffix: &str| require_env(&format!("{job_name}_{suffix}"));

        Ok(Self {
            job_name: job_name.to_string(),
            schedule: schedule_from_env(job_name)?,
            from: mailbox(get("FROM_ADDRESS")?, get("FROM_FULLNAME")?)?,
            bcc: parse_address_list(&get("BCC_ADDRESS")?)?,
            subject_a: get("SUBJECT_A")?,
            body_a: get("BODY_A")?,
            subject_b: get("SUBJECT_B")?,
            body_b: get("BODY_B")?,
            footer: optional_env(&format!("{job_name}_FOOTER")).unwrap_or_default(),
        })
    }
}

fn schedule_from_env(prefix: &str) -> Result<Schedule> {
    let run_days = parse_run_days(&require_env(&format!("{prefix}_RUN_ON_DAYS"))?)?;

    let run_after = match optional_env(&format!("{prefix}_RUN_AFTER_TIME")) {
        Some(value) => {
            let time = NaiveTime::parse_from_str(&value, "%H:%M")
                .with_context(|| format!("'{value}' is not a HH:MM time of day"))?;
            let zone = match optional_env(&format!("{prefix}_RUN_AFTER_TZDB")) {
                Some(name) => name
                    .parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("'{name}' is not an IANA timezone: {e}"))?,
                None => chrono_tz::UTC,
            };
            Some(RunAfter { time, zone })
        }
        None => None,
    };

    Ok(Schedule {
        run_days,
        run_after,
    })
}

/// Parse run days as either day-of-month numbers (`1,2,31`) or weekday names
/// (`Monday,Wednesday`).
pub fn parse_run_days(value: &str) -> Result<RunDays> {
    let tokens: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    anyhow::ensure!(!tokens.is_empty(), "no run days configured in '{value}'");

    if tokens
        .iter()
        .all(|token| token.chars().all(|c| c.is_ascii_digit()))
    {
        let mut days = Vec::new();
        for token in &tokens {
            let day: u32 = token
                .parse()
                .with_context(|| format!("'{token}' is not a day of month"))?;
            anyhow::ensure!((1..=31).contains(&day), "day of month {day} is out of range");
            days.push(day);
        }
        Ok(RunDays::DaysOfMonth(days))
    } else {
        let mut days = Vec::new();
        for token in &tokens {
            let day = token
                .parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("'{token}' is not a weekday name"))?;
            days.push(day);
        }
        Ok(RunDays::DaysOfWeek(days))
    }
}

fn mailbox(address: String, name: String) -> Result<Mailbox> {
    let parsed = address
        .parse::<lettre::Address>()
        .with_context(|| format!("'{address}' is not a valid email address"))?;
    Ok(Mailbox::new(Some(name), parsed))
}
