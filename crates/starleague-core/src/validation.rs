// Validation outcomes shared by every engine: violations, severities and proposals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PlayerId, TeamId};

/// Elevation level of whoever is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Privilege {
    Member,
    /// Moderator-equivalent: may confirm past overridable failures.
    Moderator,
}

/// The person requesting an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: PlayerId,
    pub privilege: Privilege,
}

impl Actor {
    pub fn member(id: PlayerId) -> Self {
        Actor {
            id,
            privilege: Privilege::Member,
        }
    }

    pub fn moderator(id: PlayerId) -> Self {
        Actor {
            id,
            privilege: Privilege::Moderator,
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.privilege == Privilege::Moderator
    }
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// A single reason an action is blocked or needs confirmation. The `Display`
/// text is shown to users verbatim.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Violation {
    #[error("you are not registered in the league")]
    NotRegistered,
    #[error("only a moderator can {action}")]
    ModeratorOnly { action: String },
    #[error("no player with id {player}")]
    UnknownPlayer { player: PlayerId },
    #[error("no team with id {team}")]
    UnknownTeam { team: TeamId },

    // -- draft --
    #[error("the draft is over; no picks remain")]
    DraftComplete,
    #[error("you are not on a team")]
    NotOnTeam,
    #[error("it is not your turn; team {on_clock} is on the clock")]
    NotYourTurn { on_clock: TeamId },
    #[error("this pick will be made on behalf of team {team}")]
    PickingForTeam { team: TeamId },
    #[error("{player} already owns a team")]
    AlreadyOnTeam { player: String },
    #[error("{player} is not active")]
    PlayerInactive { player: String },
    #[error("{player} ({stars:.1} stars) exceeds the remaining budget of {budget:.2} stars")]
    BudgetExceeded {
        player: String,
        stars: f64,
        budget: f64,
    },
    #[error("only team {team}'s captain can do that")]
    NotTeamCaptain { team: TeamId },
    #[error("team {team} has no remaining picks")]
    NoPicksRemaining { team: TeamId },
    #[error("a pick order already exists for season {season}")]
    DraftOrderExists { season: u32 },
    #[error("a draft needs at least one team")]
    NoTeams,
    #[error("withdrawing deletes {remaining} remaining picks for team {team} and cannot be undone")]
    WithdrawIrrevocable { team: TeamId, remaining: usize },

    // -- lineups --
    #[error("a lineup needs at least one player")]
    EmptyLineup,
    #[error("a lineup of {size} exceeds the roster cap of {max}")]
    LineupTooLarge { size: usize, max: usize },
    #[error("{rigged} rigged pairings exceed the {slots} slots submitted")]
    RiggedCountTooLarge { rigged: u32, slots: u32 },
    #[error("this matchup is set to {expected} slots but {submitted} were submitted; clear it first")]
    SlotCountMismatch { expected: u32, submitted: u32 },
    #[error("this matchup is set to {expected} rigged pairings but {submitted} were submitted; clear it first")]
    RiggedCountMismatch { expected: u32, submitted: u32 },
    #[error("team {team} is not playing in this matchup")]
    TeamNotInMatchup { team: TeamId },
    #[error("you are not on the team you are submitting for")]
    SubmitterNotOnTeam,
    #[error("{player} is not on the submitting team")]
    PlayerNotOnTeam { player: String },
    #[error("{player} plays for the opposing team")]
    PlayerOnOpposingTeam { player: String },
    #[error("{player} holds a non-playing role")]
    NonPlayingRole { player: String },
    #[error("{player} is listed more than once")]
    DuplicatePlayer { player: String },
    #[error(
        "star parity: {player} in slot {slot} is placed above {stronger} in slot {stronger_slot} ({gap:.1} stars stronger)"
    )]
    StarParity {
        slot: u32,
        player: String,
        stronger_slot: u32,
        stronger: String,
        gap: f64,
    },
    #[error("clearing discards both submitted lineups for this matchup")]
    ClearsSubmissions,
    #[error("team {team} has no matchup this week")]
    NoMatchup { team: TeamId },

    // -- substitutions --
    #[error("{player} does not hold a slot this week")]
    OutgoingNotInLineup { player: String },
    #[error("{player} already holds a slot this week")]
    IncomingAlreadyInLineup { player: String },
    #[error("{outgoing} and {incoming} are not on the same team")]
    SubstituteNotOnSameTeam { outgoing: String, incoming: String },
    #[error("{incoming} is {gap:.1} stars stronger than {outgoing}")]
    SubstituteTooStrong {
        outgoing: String,
        incoming: String,
        gap: f64,
    },

    // -- results --
    #[error("slot {slot} already has a result; undo it first")]
    ResultAlreadyReported { slot: u32 },
    #[error("you are not playing in this pairing")]
    ReporterNotInPairing,
    #[error("the reported winner is not playing in this pairing")]
    WinnerNotInPairing,
    #[error("slot {slot} is missing a player; only a dead result can be recorded")]
    PairingIncomplete { slot: u32 },
    #[error("slot {slot} has no result to undo")]
    NothingToUndo { slot: u32 },
    #[error("week {week} has already been closed")]
    WeekAlreadyClosed { week: u32 },
    #[error("no pairing with id {pairing}")]
    UnknownPairing { pairing: i64 },
    #[error("that pairing belongs to week {week}, not the current week")]
    NotCurrentWeek { week: u32 },

    // -- week progression --
    #[error("{count} pairings are still open")]
    OpenPairings { count: usize },
    #[error("playoff pairings cannot be extended")]
    PlayoffExtension,
    #[error("pairings in the last regular week cannot be extended past playoff seeding")]
    FinalWeekExtension,
    #[error("the draft still has {remaining} picks to make")]
    DraftInProgress { remaining: usize },
    #[error("{count} matchups have no lineups yet")]
    LineupsMissing { count: usize },
    #[error("the playoff bracket cannot be built: {reason}")]
    InvalidBracket { reason: String },
    #[error("the schedule cannot be built: {reason}")]
    InvalidSchedule { reason: String },
    #[error("season {season} already has regular-season matchups")]
    ScheduleExists { season: u32 },
    #[error("season {season} is still in progress and will be superseded")]
    SeasonInProgress { season: u32 },
    #[error("season {season} already exists")]
    SeasonNumberTaken { season: u32 },
    #[error("the season is complete")]
    SeasonComplete,
    #[error("no season has been started")]
    NoSeason,
    #[error("the season has not reached the {phase} phase")]
    WrongPhase { phase: String },
    #[error("lineups and results are only accepted during regular-season and playoff weeks")]
    NotMatchWeek,
}

// ---------------------------------------------------------------------------
// Collected checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    /// Blocks everyone.
    Hard,
    /// Blocks members; moderators may confirm past it.
    Overridable,
    /// Requires explicit confirmation from anyone.
    Prompt,
}

/// Collects every violation an action triggers rather than stopping at the
/// first one.
#[derive(Debug, Default)]
pub struct Checks {
    issues: Vec<(Severity, Violation)>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unconditional failure.
    pub fn fail(&mut self, violation: Violation) {
        self.issues.push((Severity::Hard, violation));
    }

    /// Record a failure a moderator may acknowledge and proceed past.
    pub fn overridable(&mut self, violation: Violation) {
        self.issues.push((Severity::Overridable, violation));
    }

    /// Record a condition that only needs explicit confirmation.
    pub fn prompt(&mut self, violation: Violation) {
        self.issues.push((Severity::Prompt, violation));
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether an unconditional failure has been recorded.
    pub fn has_hard_failure(&self) -> bool {
        self.issues.iter().any(|(s, _)| *s == Severity::Hard)
    }

    /// Resolve the collected issues for an actor of the given privilege.
    pub fn finish(self, privilege: Privilege) -> ValidationResult {
        let blocking = |s: Severity| match privilege {
            Privilege::Member => s != Severity::Prompt,
            Privilege::Moderator => s == Severity::Hard,
        };

        let (reasons, warnings): (Vec<_>, Vec<_>) =
            self.issues.into_iter().partition(|(s, _)| blocking(*s));

        if !reasons.is_empty() {
            ValidationResult::Rejected {
                reasons: reasons.into_iter().map(|(_, v)| v).collect(),
            }
        } else if !warnings.is_empty() {
            ValidationResult::NeedsConfirmation {
                warnings: warnings.into_iter().map(|(_, v)| v).collect(),
            }
        } else {
            ValidationResult::Accepted
        }
    }
}

/// Verdict on a proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationResult {
    Accepted,
    NeedsConfirmation { warnings: Vec<Violation> },
    Rejected { reasons: Vec<Violation> },
}

impl ValidationResult {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationResult::Rejected { .. })
    }

    pub fn warnings(&self) -> &[Violation] {
        match self {
            ValidationResult::NeedsConfirmation { warnings } => warnings,
            _ => &[],
        }
    }
}

/// First half of a `propose()/commit()` pair: the verdict plus the plan that
/// committing would apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal<T> {
    pub verdict: ValidationResult,
    plan: Option<T>,
}

impl<T> Proposal<T> {
    /// Resolve `checks` for `privilege`. `plan` is discarded on rejection and
    /// must be present otherwise.
    pub fn from_checks(checks: Checks, privilege: Privilege, plan: Option<T>) -> Self {
        let verdict = checks.finish(privilege);
        let plan = if verdict.is_rejected() { None } else { plan };
        Proposal { verdict, plan }
    }

    pub fn rejected(reasons: Vec<Violation>) -> Self {
        Proposal {
            verdict: ValidationResult::Rejected { reasons },
            plan: None,
        }
    }

    pub fn plan(&self) -> Option<&T> {
        self.plan.as_ref()
    }

    /// Hand back the plan if the verdict allows a commit. Warnings require
    /// `acknowledged`.
    pub fn approve(self, acknowledged: bool) -> Option<T> {
        match self.verdict {
            ValidationResult::Accepted => self.plan,
            ValidationResult::NeedsConfirmation { .. } if acknowledged => self.plan,
            _ => None,
        }
    }
}
