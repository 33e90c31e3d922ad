//! Pure core shared by the gmailer jobs: the duplicate-suppression decision
//! engine, the schedule gate, rota membership, persisted job states, and
//! templated messages. No I/O lives here.

pub mod decision;
pub mod models;
pub mod schedule;
pub mod template;

pub use decision::{decide, Candidate, Decision, Period, PriorAction};
pub use models::{ForwarderState, Member, Members, RotaState, RotaStatus};
pub use schedule::{NotDue, RunAfter, RunDays, Schedule};
pub use template::TemplatedMessage;
