// Regular-season schedule: round robin by the circle method.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Room, TeamId};
use crate::season::{Phase, SeasonContext};
use crate::validation::{Actor, Checks, Proposal, Violation};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("a schedule needs at least two teams, found {teams}")]
    TooFewTeams { teams: usize },
    #[error("team {team} is listed more than once")]
    DuplicateTeam { team: TeamId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMatchup {
    pub week: u32,
    pub room: Room,
    pub left: TeamId,
    pub right: TeamId,
}

/// Build `weeks` weeks of round-robin matchups starting at week 1.
///
/// With an odd number of teams one team sits out each week. Once every pair
/// has met, the cycle repeats with sides swapped. Rooms are numbered from 1
/// within each week.
pub fn round_robin(teams: &[TeamId], weeks: u32) -> Result<Vec<ScheduledMatchup>, ScheduleError> {
    if teams.len() < 2 {
        return Err(ScheduleError::TooFewTeams { teams: teams.len() });
    }
    let mut seen = HashSet::new();
    if let Some(dup) = teams.iter().find(|t| !seen.insert(**t)) {
        return Err(ScheduleError::DuplicateTeam { team: *dup });
    }

    let mut circle: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if circle.len() % 2 == 1 {
        circle.push(None);
    }
    let n = circle.len();
    let rounds_per_cycle = (n - 1) as u32;

    let mut schedule = Vec::new();
    for week in 1..=weeks {
        let swap = ((week - 1) / rounds_per_cycle) % 2 == 1;
        let mut room = 0;
        for i in 0..n / 2 {
            let (Some(a), Some(b)) = (circle[i], circle[n - 1 - i]) else {
                continue;
            };
            room += 1;
            let (left, right) = if swap { (b, a) } else { (a, b) };
            schedule.push(ScheduledMatchup {
                week,
                room: Room::Numbered(room),
                left,
                right,
            });
        }
        circle[1..].rotate_right(1);
    }
    Ok(schedule)
}

/// Validate generating the regular-season schedule for `teams`. Only one
/// schedule may exist per season and it must be built before week 1 is played.
pub fn validate_schedule(
    ctx: &SeasonContext,
    actor: Actor,
    teams: &[TeamId],
    existing_matchups: usize,
) -> Proposal<Vec<ScheduledMatchup>> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "schedule the season".into(),
        });
    }
    if ctx.phase() != Phase::Draft {
        checks.fail(Violation::WrongPhase {
            phase: Phase::Draft.as_str().into(),
        });
    }
    if existing_matchups > 0 {
        checks.fail(Violation::ScheduleExists { season: ctx.number() });
    }

    let schedule = match round_robin(teams, ctx.season.regular_weeks) {
        Ok(schedule) => Some(schedule),
        Err(e) => {
            checks.fail(Violation::InvalidSchedule { reason: e.to_string() });
            None
        }
    };
    Proposal::from_checks(checks, actor.privilege, schedule)
}
