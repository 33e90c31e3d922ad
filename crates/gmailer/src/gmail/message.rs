//! Raw RFC 822 message handling.
//!
//! The forwarder re-sends a fetched message under new headers, so these
//! helpers rewrite headers directly on the raw text rather than re-parsing
//! the whole MIME structure. New messages (rota announcements) are built
//! with lettre's builder.

use lettre::message::Mailbox;
use lettre::Message;

use crate::error::JobError;

/// The divider mail clients insert between a forwarded-header block and the
/// original content. Everything before it is volatile (dates, message ids)
/// and ignored by the forwarder's duplicate comparison.
pub const HEADER_CONTENT_BOUNDARY: &str = "________________________________";

/// Content after [`HEADER_CONTENT_BOUNDARY`]; the whole content when the
/// divider is absent.
pub fn after_boundary(content: &str) -> String {
    match content.split_once(HEADER_CONTENT_BOUNDARY) {
        Some((_, rest)) => rest.to_string(),
        None => content.to_string(),
    }
}

pub fn replace_sender(raw: &str, from: &Mailbox) -> String {
    replace_header(raw, "From", &from.to_string())
}

pub fn replace_recipient(raw: &str, to: &Mailbox) -> String {
    replace_header(raw, "To", &to.to_string())
}

pub fn replace_bcc(raw: &str, bcc: &[Mailbox]) -> String {
    let value = bcc
        .iter()
        .map(|mailbox| mailbox.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    replace_header(raw, "Bcc", &value)
}

/// Replace every occurrence of a header (folded continuation lines included)
/// with a single `Name: value` line, appending it if the header was absent.
pub fn replace_header(raw: &str, name: &str, value: &str) -> String {
    let (headers, body, sep) = split_message(raw);

    let mut kept: Vec<&str> = Vec::new();
    let mut skipping = false;
    for line in headers.split(sep) {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Folded continuation of the previous header line.
            if !skipping {
                kept.push(line);
            }
            continue;
        }
        skipping = header_name_matches(line, name);
        if !skipping {
            kept.push(line);
        }
    }

    let mut rebuilt: Vec<String> = kept.iter().map(|line| line.to_string()).collect();
    rebuilt.push(format!("{name}: {value}"));
    let head = rebuilt.join(sep);

    match body {
        Some(body) => format!("{head}{sep}{sep}{body}"),
        None => head,
    }
}

fn header_name_matches(line: &str, name: &str) -> bool {
    line.len() > name.len()
        && line.as_bytes()[name.len()] == b':'
        && line[..name.len()].eq_ignore_ascii_case(name)
}

fn split_message(raw: &str) -> (&str, Option<&str>, &'static str) {
    if let Some(index) = raw.find("\r\n\r\n") {
        (&raw[..index], Some(&raw[index + 4..]), "\r\n")
    } else if let Some(index) = raw.find("\n\n") {
        (&raw[..index], Some(&raw[index + 2..]), "\n")
    } else {
        (raw, None, "\r\n")
    }
}

/// A freshly constructed outgoing email.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub bcc: Vec<Mailbox>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// Raw RFC 822 bytes for the send boundary.
    pub fn to_raw(&self) -> Result<Vec<u8>, lettre::error::Error> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.clone());
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.clone());
        }
        Ok(builder.body(self.body.clone())?.formatted())
    }
}

/// Parse a comma-separated list of `addr` or `Name <addr>` values.
pub fn parse_address_list(value: &str) -> Result<Vec<Mailbox>, JobError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<Mailbox>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| JobError::NotAListOfEmailAddresses(value.to_string()))
}
