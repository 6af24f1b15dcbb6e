// Snake pick order and "on the clock" lookup.

use serde::{Deserialize, Serialize};

use crate::model::{DraftPick, TeamId};
use crate::season::{Phase, SeasonContext};
use crate::validation::{Actor, Checks, Proposal, Violation};

/// One row of the generated pick order, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSlot {
    pub round: u32,
    /// 1-based position within the round.
    pub pick_order: u32,
    pub team: TeamId,
}

/// Build a snake draft: odd rounds use `teams` in order, even rounds reverse
/// it. Produces one slot per (round, position) for `rounds` rounds.
pub fn snake_order(teams: &[TeamId], rounds: u32) -> Vec<PickSlot> {
    let mut slots = Vec::with_capacity(teams.len() * rounds as usize);
    for round in 1..=rounds {
        let forward = round % 2 == 1;
        for position in 0..teams.len() {
            let team = if forward {
                teams[position]
            } else {
                teams[teams.len() - 1 - position]
            };
            slots.push(PickSlot {
                round,
                pick_order: position as u32 + 1,
                team,
            });
        }
    }
    slots
}

/// The pick on the clock: the unfilled pick with the smallest
/// (round, pick_order). `None` once the draft is over.
pub fn next_pick(picks: &[DraftPick]) -> Option<&DraftPick> {
    picks
        .iter()
        .filter(|p| !p.is_filled())
        .min_by_key(|p| (p.round, p.pick_order))
}

/// Validate creating the season's pick order from `teams` (first-round
/// order). Only one order may exist per season.
pub fn validate_draft_order(
    ctx: &SeasonContext,
    actor: Actor,
    teams: &[TeamId],
    existing: &[DraftPick],
) -> Proposal<Vec<PickSlot>> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "set the draft order".into(),
        });
    }
    if ctx.phase() != Phase::Draft {
        checks.fail(Violation::WrongPhase {
            phase: Phase::Draft.as_str().into(),
        });
    }
    if !existing.is_empty() {
        checks.fail(Violation::DraftOrderExists { season: ctx.number() });
    }
    if teams.is_empty() {
        checks.fail(Violation::NoTeams);
    }

    let order = snake_order(teams, ctx.rules.draft.rounds);
    Proposal::from_checks(checks, actor.privilege, Some(order))
}
