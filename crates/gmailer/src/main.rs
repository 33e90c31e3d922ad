use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use gmailer::config::{ForwarderConfig, JobSecrets, RotaConfig};
use gmailer::datastore::HttpDropboxClient;
use gmailer::gmail::HttpGmailClient;
use gmailer::jobs::cleaning_rota::CleaningRotaGmailer;
use gmailer::jobs::forwarder::GmailForwarder;
use gmailer::jobs::Job;

/// One-shot invocation, intended to be fired by cron: build every configured
/// job, run each exactly once, print its outcome line.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();

    let jobs = build_jobs().await?;
    let now = Utc::now();

    for job in &jobs {
        let result = job.run(now).await;
        println!("{}: {}", job.name(), result);
    }

    Ok(())
}

/// Jobs are opted in by naming them: `GMAIL_FORWARDER_JOB_NAME` and/or
/// `CLEANING_ROTA_JOB_NAME` give the env-var prefix for that job's settings.
async fn build_jobs() -> Result<Vec<Box<dyn Job>>> {
    let mut jobs: Vec<Box<dyn Job>> = Vec::new();

    if let Ok(job_name) = std::env::var("GMAIL_FORWARDER_JOB_NAME") {
        let config = ForwarderConfig::from_env(&job_name)
            .with_context(|| format!("configuring forwarder job {job_name}"))?;
        let (gmail, dropbox) = clients(&job_name).await?;
        jobs.push(Box::new(GmailForwarder::new(gmail, dropbox, config)));
    }

    if let Ok(job_name) = std::env::var("CLEANING_ROTA_JOB_NAME") {
        let config = RotaConfig::from_env(&job_name)
            .with_context(|| format!("configuring cleaning-rota job {job_name}"))?;
        let (gmail, dropbox) = clients(&job_name).await?;
        jobs.push(Box::new(CleaningRotaGmailer::new(gmail, dropbox, config)));
    }

    anyhow::ensure!(
        !jobs.is_empty(),
        "no jobs configured: set GMAIL_FORWARDER_JOB_NAME and/or CLEANING_ROTA_JOB_NAME"
    );
    Ok(jobs)
}

async fn clients(
    job_name: &str,
) -> Result<(Arc<HttpGmailClient>, Arc<HttpDropboxClient>)> {
    let secrets = JobSecrets::from_env(job_name)?;
    let gmail = HttpGmailClient::connect(secrets.gmail)
        .await
        .with_context(|| format!("building Gmail client for {job_name}"))?;
    let dropbox = HttpDropboxClient::new(secrets.dropbox_access_token);
    Ok((Arc::new(gmail), Arc::new(dropbox)))
}
