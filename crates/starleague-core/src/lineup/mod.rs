// Lineup legality: weekly submissions, substitutions and the star-parity rule.

pub mod parity;
pub mod submission;
pub mod substitution;

pub use parity::{next_below, parity_violations};
pub use submission::{validate_lineup, LineupPlan, LineupSubmission};
pub use substitution::{validate_substitution, SubstitutionPlan, SubstitutionRequest};
