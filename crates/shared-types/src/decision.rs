//! The duplicate-suppression engine.
//!
//! A single pure decision function shared by every job variant: given what
//! the job persisted about its previous send and the candidate content for
//! this run, decide whether sending now could duplicate an action that has
//! already effectively happened. Jobs parameterize the period granularity
//! and the content normalization; nothing here touches the network.

use chrono::{DateTime, Datelike, Utc};

/// Granularity of the "already done this period" comparison.
///
/// `CalendarDay` is calendar-date equality, not a 24-hour window: a send at
/// 23:59 and another at 00:01 the next day are different periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    CalendarMonth,
    CalendarDay,
}

impl Period {
    fn key(self, at: DateTime<Utc>) -> (i32, u32, u32) {
        match self {
            Period::CalendarMonth => (at.year(), at.month(), 0),
            Period::CalendarDay => (at.year(), at.month(), at.day()),
        }
    }
}

/// What the job persisted about its previous action.
#[derive(Debug, Clone, Copy)]
pub struct PriorAction<'a> {
    /// When the last send was recorded. Must never be later than "now" at
    /// decision time; if it is, the persisted state is corrupt.
    pub at: DateTime<Utc>,
    /// The previously sent content (or a content-derived string) used for
    /// exact-duplicate detection.
    pub fingerprint: &'a str,
}

/// The content the job is considering sending this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// The candidate source had no match for the query.
    Missing { query: String },
    /// A match was found but its content could not be retrieved.
    Unreadable,
    /// Content ready for the duplicate and period checks.
    Ready(String),
}

/// Outcome of the decision, one variant per reason not to send plus
/// [`Decision::ReadyToSend`]. Matching is exhaustive by design: a new
/// outcome cannot be added without every caller handling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The persisted timestamp is in the future: clock skew or a corrupt
    /// state file. Sending in this situation risks duplicates.
    InvalidFutureState,
    NoCandidateFound { query: String },
    CandidateUnavailable,
    ExactDuplicate,
    AlreadyDoneThisPeriod,
    ReadyToSend(String),
    /// Anything the other variants do not cover. Never sends.
    UnknownState,
}

/// Decide whether this run should send.
///
/// Checks run in a fixed precedence, first match wins:
///
/// 1. persisted timestamp later than `now` -> [`Decision::InvalidFutureState`]
/// 2. no candidate -> [`Decision::NoCandidateFound`]
/// 3. candidate content unavailable -> [`Decision::CandidateUnavailable`]
/// 4. normalized candidate equals normalized fingerprint ->
///    [`Decision::ExactDuplicate`] (this fires regardless of the period
///    comparison, so a gate firing twice for the same source never resends)
/// 5. same period key as the previous send -> [`Decision::AlreadyDoneThisPeriod`]
/// 6. previous period key strictly earlier -> [`Decision::ReadyToSend`]
pub fn decide(
    now: DateTime<Utc>,
    prior: &PriorAction<'_>,
    candidate: Candidate,
    period: Period,
    normalize: impl Fn(&str) -> String,
) -> Decision {
    if prior.at > now {
        return Decision::InvalidFutureState;
    }

    let content = match candidate {
        Candidate::Missing { query } => return Decision::NoCandidateFound { query },
        Candidate::Unreadable => return Decision::CandidateUnavailable,
        Candidate::Ready(content) => content,
    };

    if normalize(&content) == normalize(prior.fingerprint) {
        return Decision::ExactDuplicate;
    }

    use std::cmp::Ordering;
    match period.key(prior.at).cmp(&period.key(now)) {
        Ordering::Equal => Decision::AlreadyDoneThisPeriod,
        Ordering::Less => Decision::ReadyToSend(content),
        // Unreachable while the future-state check fires first, kept so an
        // ambiguous state can never fall through to a send.
        Ordering::Greater => Decision::UnknownState,
    }
}
