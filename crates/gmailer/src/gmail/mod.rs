//! Gmail access: the port the jobs talk to, plus the live API client.

pub mod message;

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Reference to a message found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
}

/// The raw content the API echoed back for a sent message, when present.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub raw: Option<Vec<u8>>,
}

/// A send that did not go through. Callers attach their own context when
/// turning this into a result message.
#[derive(Debug, Clone, Copy)]
pub struct SendFailed;

/// What the jobs need from Gmail. Search and fetch are best-effort
/// (`None` when there is no usable result); send failure is explicit so
/// state is never written after a failed send.
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// The first message the API lists for the query. List order is taken as
    /// "most recent"; chronological recency is not guaranteed by the API.
    async fn find_latest(&self, query: &str) -> Option<MessageRef>;

    /// Decoded raw RFC 822 content of a message.
    async fn fetch_raw(&self, message: &MessageRef) -> Option<Vec<u8>>;

    /// Send raw RFC 822 bytes.
    async fn send(&self, raw: &[u8]) -> std::result::Result<SentMessage, SendFailed>;
}

/// OAuth material for the authorized-user flow.
#[derive(Debug, Clone)]
pub struct GmailSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Live client over the Gmail API.
pub struct HttpGmailClient {
    hub: Gmail<HttpsConnector<HttpConnector>>,
    rfc822: mime::Mime,
}

impl HttpGmailClient {
    /// Build an authenticated client from a stored refresh token.
    pub async fn connect(secrets: GmailSecrets) -> Result<Self> {
        // Use the yup_oauth2 re-exported by google_gmail1 to avoid version mismatch
        let secret = google_gmail1::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            refresh_token: secrets.refresh_token,
            key_type: "authorized_user".to_string(),
        };

        let auth = google_gmail1::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Failed to build authenticator from refresh token")?;

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = Gmail::new(client, auth);

        let rfc822 = "message/rfc822"
            .parse()
            .context("Failed to parse rfc822 mime type")?;

        Ok(Self { hub, rfc822 })
    }
}

#[async_trait]
impl GmailClient for HttpGmailClient {
    async fn find_latest(&self, query: &str) -> Option<MessageRef> {
        let result = self
            .hub
            .users()
            .messages_list("me")
            .q(query)
            .max_results(1)
            .doit()
            .await;

        match result {
            Ok((_, list)) => list
                .messages
                .unwrap_or_default()
                .into_iter()
                .find_map(|message| message.id)
                .map(|id| MessageRef { id }),
            Err(e) => {
                tracing::warn!("Gmail search failed for query '{}': {}", query, e);
                None
            }
        }
    }

    async fn fetch_raw(&self, message: &MessageRef) -> Option<Vec<u8>> {
        let result = self
            .hub
            .users()
            .messages_get("me", &message.id)
            .format("raw")
            .doit()
            .await;

        match result {
            Ok((_, fetched)) => fetched.raw,
            Err(e) => {
                tracing::warn!("Failed to fetch raw content of message {}: {}", message.id, e);
                None
            }
        }
    }

    async fn send(&self, raw: &[u8]) -> std::result::Result<SentMessage, SendFailed> {
        let result = self
            .hub
            .users()
            .messages_send(google_gmail1::api::Message::default(), "me")
            .upload(std::io::Cursor::new(raw.to_vec()), self.rfc822.clone())
            .await;

        match result {
            Ok((_, sent)) => Ok(SentMessage { raw: sent.raw }),
            Err(e) => {
                tracing::error!("Gmail send failed: {}", e);
                Err(SendFailed)
            }
        }
    }
}
