//! Questionnaire core: outline parsing, response snapshots, and the
//! session state machine that walks a student through the questions.

pub mod outline;
pub mod session;
pub mod snapshot;

pub use outline::{Question, default_questions};
pub use session::{Session, SessionOutcome};
pub use snapshot::{ResponseMap, ResponseSnapshot, StoredResponses, slugify};
