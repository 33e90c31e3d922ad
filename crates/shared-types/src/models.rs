//! Rota membership and the persisted per-job states.
//!
//! The state structs serialize to the exact JSON schema the jobs keep in
//! Dropbox, so field names follow that schema (camelCase) rather than Rust
//! convention.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One member of the rota, as stored in the members file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    pub email: String,
}

impl Member {
    pub fn full_name(&self) -> String {
        match &self.surname {
            Some(surname) => format!("{} {}", self.name, surname),
            None => self.name.clone(),
        }
    }
}

/// Ordered rota membership. Read-only reference data, fetched fresh each run;
/// jobs only ever move the current/next pointers in their own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    pub members: Vec<Member>,
}

impl Members {
    /// Cyclic successor: the member after the last one is the first. A member
    /// that is not in the list (stale state) also resolves to the first, so
    /// the rotation can recover. `None` only for an empty list.
    pub fn next_member_after(&self, member: &Member) -> Option<&Member> {
        match self.members.iter().position(|m| m == member) {
            Some(index) => self.members.get((index + 1) % self.members.len()),
            None => self.members.first(),
        }
    }
}

/// Whether the rota is in a cleaning week or a reminder week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotaStatus {
    CleaningThisWeek,
    NotCleaningThisWeek,
}

impl RotaStatus {
    pub fn flip(self) -> Self {
        match self {
            RotaStatus::CleaningThisWeek => RotaStatus::NotCleaningThisWeek,
            RotaStatus::NotCleaningThisWeek => RotaStatus::CleaningThisWeek,
        }
    }
}

/// Persisted state of the forwarder job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderState {
    pub last_email_sent: DateTime<Utc>,
    pub email_contents: String,
}

/// Persisted state of the cleaning-rota job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotaState {
    pub status: RotaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaner: Option<Member>,
    pub next_up: Member,
    pub last_ran_on: NaiveDate,
    pub email_contents: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(name: &str, surname: Option<&str>, email: &str) -> Member {
        Member {
            name: name.to_string(),
            surname: surname.map(str::to_string),
            email: email.to_string(),
        }
    }

    #[test]
    fn full_name_joins_name_and_surname() {
        let carla = member("Carla", Some("Azar"), "carla@azar.com");
        assert_eq!(carla.full_name(), "Carla Azar");
    }

    #[test]
    fn full_name_without_surname_is_just_the_name() {
        let milford = member("Milford", None, "milford@graves.com");
        assert_eq!(milford.full_name(), "Milford");
    }

    #[test]
    fn next_member_wraps_around_to_the_first() {
        let milford = member("Milford", None, "milford@graves.com");
        let carla = member("Carla", Some("Azar"), "carla@azar.com");
        let members = Members {
            members: vec![milford.clone(), carla.clone()],
        };

        assert_eq!(members.next_member_after(&milford), Some(&carla));
        assert_eq!(members.next_member_after(&carla), Some(&milford));
    }

    #[test]
    fn next_member_in_a_single_member_list_is_that_member() {
        let milford = member("Milford", None, "milford@graves.com");
        let members = Members {
            members: vec![milford.clone()],
        };

        assert_eq!(members.next_member_after(&milford), Some(&milford));
    }

    #[test]
    fn next_member_after_an_unknown_member_falls_back_to_the_first() {
        let milford = member("Milford", None, "milford@graves.com");
        let stranger = member("Sunny", None, "sunny@murray.com");
        let members = Members {
            members: vec![milford.clone()],
        };

        assert_eq!(members.next_member_after(&stranger), Some(&milford));
    }

    #[test]
    fn next_member_of_an_empty_list_is_none() {
        let milford = member("Milford", None, "milford@graves.com");
        let members = Members { members: vec![] };

        assert_eq!(members.next_member_after(&milford), None);
    }

    #[test]
    fn rota_state_serializes_to_the_dropbox_schema() {
        let state = RotaState {
            status: RotaStatus::NotCleaningThisWeek,
            cleaner: None,
            next_up: member("Carla", Some("Azar"), "carla@azar.com"),
            last_ran_on: NaiveDate::from_ymd_opt(2018, 6, 1).unwrap(),
            email_contents: "body A".to_string(),
        };

        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "NOT_CLEANING_THIS_WEEK",
                "nextUp": {
                    "name": "Carla",
                    "surname": "Azar",
                    "email": "carla@azar.com"
                },
                "lastRanOn": "2018-06-01",
                "emailContents": "body A"
            })
        );
    }

    #[test]
    fn member_without_surname_omits_the_field() {
        let json = serde_json::to_value(member("Milford", None, "milford@graves.com")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Milford", "email": "milford@graves.com"})
        );
    }

    #[test]
    fn forwarder_state_round_trips_iso_timestamps() {
        let raw = r#"{"lastEmailSent": "2018-06-01T09:30:00Z", "emailContents": "email body"}"#;
        let state: ForwarderState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.email_contents, "email body");
        assert_eq!(
            state.last_email_sent,
            chrono::Utc.with_ymd_and_hms(2018, 6, 1, 9, 30, 0).unwrap()
        );
    }
}
