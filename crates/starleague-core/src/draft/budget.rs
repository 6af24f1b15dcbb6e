// Per-pick star budget.

use crate::config::DraftRules;
use crate::model::RosterAggregate;

/// Stars `team` may spend on its pick in `round`.
///
/// Round 1 budgets against the captain alone: `r1_stars - captain_stars`.
/// Later rounds budget against the whole roster and hold back
/// `reserve_per_slot` for every slot that will still be empty after this
/// pick: `max_stars - roster_stars - (max_roster - 1 - roster_size) * reserve`.
pub fn budget_for(rules: &DraftRules, round: u32, captain_stars: f64, roster: &RosterAggregate) -> f64 {
    if round == 1 {
        return rules.r1_stars - captain_stars;
    }
    let open_after_pick = rules.max_roster as f64 - 1.0 - roster.size as f64;
    rules.max_stars - roster.total_stars - open_after_pick * rules.reserve_per_slot
}
