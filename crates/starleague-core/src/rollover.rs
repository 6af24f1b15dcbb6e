// Week closing and season rollover.
//
// Closing a week folds every finished matchup into the standings exactly once,
// then either moves to the next week, seeds the playoffs, advances the bracket
// or crowns a champion.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{clamp_stars, Matchup, MatchupId, Pairing, Player, PlayerId, Role, Season, Standing, TeamId};
use crate::playoff::{advance, seed, Advancement, BracketPairing};
use crate::season::{Phase, SeasonClock, SeasonContext};
use crate::standings::{apply_outcome, rank, tally_week, update_standings, MatchupOutcome};
use crate::validation::{Actor, Checks, Proposal, Violation};

/// An untallied matchup together with its pairings.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupState {
    pub matchup: Matchup,
    pub pairings: Vec<Pairing>,
}

/// Everything committing a week close writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekClosePlan {
    pub season: u32,
    pub closed_week: u32,
    /// Matchups marked as tallied, playoff ones included.
    pub tallied: Vec<MatchupId>,
    /// Regular-season outcomes folded into standings.
    pub outcomes: Vec<MatchupOutcome>,
    /// Matchups left open because their remaining pairings are extended.
    pub deferred: Vec<MatchupId>,
    pub next_week: u32,
    /// Playoff matchups to create in `next_week`.
    pub new_matchups: Vec<BracketPairing>,
    pub champion: Option<TeamId>,
}

/// Validate closing the current week.
///
/// `open` holds every untallied matchup up to the current week; `standings`
/// is the season's table before this close. During the draft, closing the
/// week starts the regular season once no picks remain or the pool is dry.
pub fn validate_close_week(
    ctx: &SeasonContext,
    actor: Actor,
    open: &[MatchupState],
    standings: &[Standing],
    remaining_picks: usize,
    pool_exhausted: bool,
) -> Proposal<WeekClosePlan> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "close the week".into(),
        });
    }

    let clock = SeasonClock::new(ctx.season);
    let phase = clock.phase();
    let week = ctx.week();
    let mut plan = WeekClosePlan {
        season: ctx.number(),
        closed_week: week,
        tallied: Vec::new(),
        outcomes: Vec::new(),
        deferred: Vec::new(),
        next_week: week + 1,
        new_matchups: Vec::new(),
        champion: None,
    };

    match phase {
        Phase::Complete => {
            checks.fail(Violation::SeasonComplete);
            return Proposal::from_checks(checks, actor.privilege, None);
        }
        Phase::Draft => {
            if remaining_picks > 0 && !pool_exhausted {
                checks.fail(Violation::DraftInProgress {
                    remaining: remaining_picks,
                });
            }
            return Proposal::from_checks(checks, actor.privilege, Some(plan));
        }
        Phase::RegularSeason | Phase::Playoff => {}
    }

    let can_defer = phase == Phase::RegularSeason && !clock.is_last_regular_week();
    let mut missing = 0;
    let mut undecided = 0;
    let mut ready: Vec<&MatchupState> = Vec::new();

    for state in open {
        if state.pairings.is_empty() {
            missing += 1;
            continue;
        }
        let pending: Vec<&Pairing> = state.pairings.iter().filter(|p| !p.result.is_decided()).collect();
        if pending.is_empty() {
            ready.push(state);
        } else if can_defer && state.matchup.week == week && pending.iter().all(|p| p.extension) {
            plan.deferred.push(state.matchup.id);
        } else {
            undecided += pending.len();
        }
    }
    if missing > 0 {
        checks.fail(Violation::LineupsMissing { count: missing });
    }
    if undecided > 0 {
        checks.fail(Violation::OpenPairings { count: undecided });
    }

    // A team plays once per week, so tallies are grouped by week.
    let mut by_week: BTreeMap<u32, Vec<Matchup>> = BTreeMap::new();
    for state in &ready {
        by_week.entry(state.matchup.week).or_default().push(state.matchup.clone());
    }
    let pairings: Vec<Pairing> = ready.iter().flat_map(|s| s.pairings.iter().cloned()).collect();
    for matchups in by_week.values() {
        let wins = tally_week(matchups, &pairings);
        for (matchup, outcome) in matchups.iter().zip(update_standings(matchups, &wins)) {
            plan.tallied.push(matchup.id);
            if !matchup.room.is_playoff() {
                plan.outcomes.push(outcome);
            }
        }
    }

    if checks.has_hard_failure() {
        return Proposal::from_checks(checks, actor.privilege, None);
    }

    let mut table: HashMap<TeamId, Standing> = standings.iter().map(|s| (s.team, *s)).collect();
    for outcome in &plan.outcomes {
        apply_outcome(&mut table, ctx.number(), outcome);
    }
    let ranked: Vec<Standing> = table.into_values().collect();
    let ranking: Vec<TeamId> = rank(&ranked).iter().map(|s| s.team).collect();

    match phase {
        Phase::RegularSeason if clock.is_last_regular_week() => {
            if ctx.season.playoff_size == 0 {
                plan.champion = ranking.first().copied();
                plan.next_week = clock.complete().season().current_week;
            } else {
                match seed(&ranking, ctx.season.playoff_size) {
                    Ok(bracket) => plan.new_matchups = bracket,
                    Err(e) => checks.fail(Violation::InvalidBracket { reason: e.to_string() }),
                }
            }
        }
        Phase::Playoff => {
            let round: Vec<Matchup> = ready
                .iter()
                .filter(|s| s.matchup.week == week && s.matchup.room.is_playoff())
                .map(|s| s.matchup.clone())
                .collect();
            let wins = tally_week(&round, &pairings);
            match advance(&round, &wins, &ranking) {
                Ok(Advancement::Champion(team)) => {
                    plan.champion = Some(team);
                    plan.next_week = clock.complete().season().current_week;
                }
                Ok(Advancement::NextRound(bracket)) => plan.new_matchups = bracket,
                Err(e) => checks.fail(Violation::InvalidBracket { reason: e.to_string() }),
            }
        }
        _ => {}
    }

    Proposal::from_checks(checks, actor.privilege, Some(plan))
}

// ---------------------------------------------------------------------------
// Season start
// ---------------------------------------------------------------------------

/// Everything committing a new season writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStartPlan {
    pub season: Season,
    /// New ratings after adjustment, already clamped.
    pub ratings: Vec<(PlayerId, f64)>,
    /// Rostered non-captains returned to the undrafted pool.
    pub released: Vec<PlayerId>,
}

/// Validate starting `next` (its `current_week` is forced to 0).
///
/// `adjustments` pairs a player with a rating delta. `rostered` lists every
/// player currently on a team; captains keep their team into the new draft.
pub fn validate_start_season(
    actor: Actor,
    current: Option<&Season>,
    next: Season,
    adjustments: &[(Player, f64)],
    rostered: &[Player],
) -> Proposal<SeasonStartPlan> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "start a season".into(),
        });
    }
    if let Some(current) = current {
        if next.number <= current.number {
            checks.fail(Violation::SeasonNumberTaken { season: next.number });
        } else if SeasonClock::new(*current).phase() != Phase::Complete {
            checks.prompt(Violation::SeasonInProgress {
                season: current.number,
            });
        }
    }
    if next.regular_weeks == 0 {
        checks.fail(Violation::InvalidSchedule {
            reason: "a season needs at least one regular week".into(),
        });
    }
    if next.playoff_size == 1 || (next.playoff_size > 1 && !next.playoff_size.is_power_of_two()) {
        checks.fail(Violation::InvalidBracket {
            reason: format!("playoff size {} is not zero or a power of two", next.playoff_size),
        });
    }

    let plan = SeasonStartPlan {
        season: Season {
            current_week: 0,
            ..next
        },
        ratings: adjustments
            .iter()
            .map(|(player, delta)| (player.id, clamp_stars(player.stars + delta)))
            .collect(),
        released: rostered
            .iter()
            .filter(|p| p.team.is_some() && p.role != Role::Captain)
            .map(|p| p.id)
            .collect(),
    };
    Proposal::from_checks(checks, actor.privilege, Some(plan))
}
