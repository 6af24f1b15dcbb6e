// Result desk: reporting, undoing and extending individual pairings.

use serde::{Deserialize, Serialize};

use crate::model::{Matchup, Pairing, PairingId, PairingResult, PlayerId};
use crate::season::{Phase, SeasonContext};
use crate::validation::{Actor, Checks, Proposal, Violation};

/// What a reporter claims happened in a pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportedResult {
    Winner(PlayerId),
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPlan {
    pub pairing: PairingId,
    pub result: PairingResult,
    /// Replay references; empty records an activity result.
    pub games: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoPlan {
    pub pairing: PairingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPlan {
    pub pairing: PairingId,
    pub extension: bool,
}

fn check_phase(checks: &mut Checks, ctx: &SeasonContext) {
    if !matches!(ctx.phase(), Phase::RegularSeason | Phase::Playoff) {
        checks.fail(Violation::NotMatchWeek);
    }
}

fn check_open_week(checks: &mut Checks, matchup: &Matchup) {
    if matchup.tallied {
        checks.fail(Violation::WeekAlreadyClosed { week: matchup.week });
    }
}

/// Validate recording `reported` for `pairing`. A result must be undone
/// before it can be replaced.
pub fn validate_report(
    ctx: &SeasonContext,
    actor: Actor,
    matchup: &Matchup,
    pairing: &Pairing,
    reported: &ReportedResult,
    games: Vec<String>,
) -> Proposal<ResultPlan> {
    let mut checks = Checks::new();
    check_phase(&mut checks, ctx);
    check_open_week(&mut checks, matchup);

    if pairing.result.is_decided() {
        checks.fail(Violation::ResultAlreadyReported { slot: pairing.slot });
    }

    let result = match reported {
        ReportedResult::Dead => PairingResult::Dead,
        ReportedResult::Winner(winner) => {
            if pairing.left.is_none() || pairing.right.is_none() {
                checks.fail(Violation::PairingIncomplete { slot: pairing.slot });
            } else if !pairing.holds(*winner) {
                checks.fail(Violation::WinnerNotInPairing);
            }
            PairingResult::Winner(*winner)
        }
    };

    if !pairing.holds(actor.id) {
        checks.overridable(Violation::ReporterNotInPairing);
    }

    let plan = ResultPlan {
        pairing: pairing.id,
        result,
        games,
    };
    Proposal::from_checks(checks, actor.privilege, Some(plan))
}

/// Validate clearing a recorded result so it can be re-reported.
pub fn validate_undo(actor: Actor, matchup: &Matchup, pairing: &Pairing) -> Proposal<UndoPlan> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "undo a result".into(),
        });
    }
    if !pairing.result.is_decided() {
        checks.fail(Violation::NothingToUndo { slot: pairing.slot });
    }
    check_open_week(&mut checks, matchup);

    Proposal::from_checks(checks, actor.privilege, Some(UndoPlan { pairing: pairing.id }))
}

/// Validate toggling the extension flag on a current-week pairing. Extended
/// pairings defer their matchup's tally to the following week close.
pub fn validate_extension(
    ctx: &SeasonContext,
    actor: Actor,
    matchup: &Matchup,
    pairing: &Pairing,
    extension: bool,
) -> Proposal<ExtensionPlan> {
    let mut checks = Checks::new();
    if !actor.is_moderator() {
        checks.fail(Violation::ModeratorOnly {
            action: "extend a pairing".into(),
        });
    }
    check_phase(&mut checks, ctx);
    if ctx.phase() == Phase::Playoff || matchup.room.is_playoff() {
        checks.fail(Violation::PlayoffExtension);
    } else if extension && ctx.season.current_week == ctx.season.regular_weeks && ctx.season.playoff_size > 0 {
        checks.fail(Violation::FinalWeekExtension);
    }
    if matchup.week != ctx.week() {
        checks.fail(Violation::NotCurrentWeek { week: matchup.week });
    }
    check_open_week(&mut checks, matchup);
    if pairing.result.is_decided() {
        checks.fail(Violation::ResultAlreadyReported { slot: pairing.slot });
    }

    let plan = ExtensionPlan {
        pairing: pairing.id,
        extension,
    };
    Proposal::from_checks(checks, actor.privilege, Some(plan))
}
