// Weekly lineup submission checks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::parity::parity_violations;
use crate::model::{sort_by_strength, Matchup, MatchupId, Pairing, Player, PlayerId, Side, TeamId};
use crate::season::{Phase, SeasonContext};
use crate::validation::{Actor, Checks, Proposal, Violation};

/// A captain's (or moderator's) lineup for one side of a matchup.
#[derive(Debug, Clone)]
pub struct LineupSubmission<'a> {
    pub actor: Actor,
    /// The acting player's record. Moderators may act without one.
    pub submitter: Option<&'a Player>,
    pub team: TeamId,
    /// Players for slots 1..N, strongest slot first.
    pub lineup: &'a [Player],
    /// Leading slots exempt from the star-parity check.
    pub rigged_count: u32,
    /// Discard both sides' existing submissions before committing.
    pub clear: bool,
}

/// What committing a lineup writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupPlan {
    pub matchup: MatchupId,
    pub side: Side,
    pub players: Vec<PlayerId>,
    pub rigged_count: u32,
    pub submitter: PlayerId,
    pub clear: bool,
}

/// Validate a lineup for `matchup`. `roster` is the submitting team's full
/// roster; `pairings` are the matchup's existing pairings.
pub fn validate_lineup(
    ctx: &SeasonContext,
    submission: &LineupSubmission<'_>,
    matchup: &Matchup,
    roster: &[Player],
    pairings: &[Pairing],
) -> Proposal<LineupPlan> {
    let mut checks = Checks::new();
    let lineup = submission.lineup;
    let size = lineup.len() as u32;

    if !matches!(ctx.phase(), Phase::RegularSeason | Phase::Playoff) {
        checks.fail(Violation::NotMatchWeek);
    }

    let Some(side) = matchup.side_of(submission.team) else {
        checks.fail(Violation::TeamNotInMatchup {
            team: submission.team,
        });
        return Proposal::from_checks(checks, submission.actor.privilege, None);
    };
    let opponent = matchup.team(side.opposite());

    // Shape of the lineup.
    if lineup.is_empty() {
        checks.fail(Violation::EmptyLineup);
    }
    let max = ctx.rules.draft.max_roster;
    if lineup.len() > max {
        checks.fail(Violation::LineupTooLarge {
            size: lineup.len(),
            max,
        });
    }
    if submission.rigged_count > size {
        checks.fail(Violation::RiggedCountTooLarge {
            rigged: submission.rigged_count,
            slots: size,
        });
    }

    // Consistency with what the matchup already holds.
    if submission.clear {
        checks.prompt(Violation::ClearsSubmissions);
    } else {
        if let Some(expected) = matchup.slots.filter(|s| *s != size) {
            checks.fail(Violation::SlotCountMismatch {
                expected,
                submitted: size,
            });
        }
        if let Some(expected) = matchup.rigged_count.filter(|r| *r != submission.rigged_count) {
            checks.fail(Violation::RiggedCountMismatch {
                expected,
                submitted: submission.rigged_count,
            });
        }
    }
    for decided in pairings.iter().filter(|p| p.result.is_decided()) {
        checks.fail(Violation::ResultAlreadyReported { slot: decided.slot });
    }

    // Membership.
    if submission.submitter.and_then(|p| p.team) != Some(submission.team) {
        checks.overridable(Violation::SubmitterNotOnTeam);
    }

    let mut seen = HashSet::new();
    let mut reported_duplicates = HashSet::new();
    for player in lineup {
        if !seen.insert(player.id) {
            if reported_duplicates.insert(player.id) {
                checks.fail(Violation::DuplicatePlayer {
                    player: player.name.clone(),
                });
            }
            continue;
        }
        if player.team == Some(opponent) {
            checks.fail(Violation::PlayerOnOpposingTeam {
                player: player.name.clone(),
            });
        } else if player.team != Some(submission.team) {
            checks.overridable(Violation::PlayerNotOnTeam {
                player: player.name.clone(),
            });
        }
        if !player.role.is_playing() {
            checks.fail(Violation::NonPlayingRole {
                player: player.name.clone(),
            });
        }
    }

    // Star parity.
    let mut ranked = roster.to_vec();
    sort_by_strength(&mut ranked);
    for violation in parity_violations(
        lineup,
        &ranked,
        submission.rigged_count as usize,
        ctx.rules.lineup.parity_tolerance,
    ) {
        checks.overridable(violation);
    }

    let plan = LineupPlan {
        matchup: matchup.id,
        side,
        players: lineup.iter().map(|p| p.id).collect(),
        rigged_count: submission.rigged_count,
        submitter: submission.submitter.map_or(submission.actor.id, |p| p.id),
        clear: submission.clear,
    };
    Proposal::from_checks(checks, submission.actor.privilege, Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DraftRules, LeagueRules, LineupRules};
    use crate::model::{PairingResult, Role, Room, Season};
    use crate::validation::ValidationResult;

    const HOME: TeamId = 10;
    const AWAY: TeamId = 20;

    fn ctx() -> SeasonContext {
        SeasonContext::new(
            Season {
                number: 1,
                current_week: 2,
                regular_weeks: 7,
                playoff_size: 4,
            },
            LeagueRules {
                draft: DraftRules {
                    rounds: 5,
                    r1_stars: 9.0,
                    max_stars: 23.0,
                    max_roster: 6,
                    reserve_per_slot: 1.5,
                    undrafted_star_cap: 10.0,
                },
                lineup: LineupRules::default(),
            },
        )
    }

    fn player(id: PlayerId, stars: f64, team: TeamId) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            stars,
            active: true,
            role: Role::Player,
            team: Some(team),
        }
    }

    fn roster() -> Vec<Player> {
        // Deliberately unsorted: the validator ranks the roster itself.
        vec![
            player(3, 4.0, HOME),
            player(1, 5.0, HOME),
            player(4, 3.0, HOME),
            player(2, 5.0, HOME),
        ]
    }

    fn pick(ids: &[PlayerId]) -> Vec<Player> {
        let roster = roster();
        ids.iter()
            .map(|id| roster.iter().find(|p| p.id == *id).unwrap().clone())
            .collect()
    }

    fn matchup() -> Matchup {
        Matchup {
            id: 77,
            season: 1,
            week: 2,
            room: Room::Numbered(1),
            left: HOME,
            right: AWAY,
            slots: None,
            rigged_count: None,
            left_submitter: None,
            right_submitter: None,
            tallied: false,
        }
    }

    fn submit(
        actor: Actor,
        submitter: &Player,
        lineup: &[Player],
        rigged_count: u32,
        clear: bool,
        matchup: &Matchup,
    ) -> Proposal<LineupPlan> {
        let submission = LineupSubmission {
            actor,
            submitter: Some(submitter),
            team: HOME,
            lineup,
            rigged_count,
            clear,
        };
        validate_lineup(&ctx(), &submission, matchup, &roster(), &[])
    }

    #[test]
    fn ordered_lineup_is_accepted() {
        let captain = player(1, 5.0, HOME);
        let proposal = submit(Actor::member(1), &captain, &pick(&[1, 2, 3, 4]), 0, false, &matchup());
        assert_eq!(proposal.verdict, ValidationResult::Accepted);
        let plan = proposal.approve(false).unwrap();
        assert_eq!(plan.side, Side::Left);
        assert_eq!(plan.players, vec![1, 2, 3, 4]);
    }

    #[test]
    fn parity_violation_rejects_member_and_prompts_moderator() {
        let captain = player(1, 5.0, HOME);
        let lineup = pick(&[1, 4, 2, 3]);

        let member = submit(Actor::member(1), &captain, &lineup, 0, false, &matchup());
        match member.verdict {
            ValidationResult::Rejected { reasons } => {
                assert_eq!(reasons.len(), 1);
                assert!(matches!(reasons[0], Violation::StarParity { slot: 2, .. }));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let moderator = submit(Actor::moderator(99), &captain, &lineup, 0, false, &matchup());
        assert!(matches!(
            moderator.verdict,
            ValidationResult::NeedsConfirmation { .. }
        ));
    }

    #[test]
    fn rigged_count_exempts_top_slots() {
        let captain = player(1, 5.0, HOME);
        let proposal = submit(Actor::member(1), &captain, &pick(&[1, 4, 2, 3]), 2, false, &matchup());
        assert_eq!(proposal.verdict, ValidationResult::Accepted);
    }

    #[test]
    fn mismatched_slot_and_rigged_counts_are_rejected_unless_cleared() {
        let captain = player(1, 5.0, HOME);
        let mut existing = matchup();
        existing.slots = Some(3);
        existing.rigged_count = Some(1);
        existing.right_submitter = Some(50);

        let proposal = submit(Actor::moderator(1), &captain, &pick(&[1, 2, 3, 4]), 0, false, &existing);
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![
                    Violation::SlotCountMismatch { expected: 3, submitted: 4 },
                    Violation::RiggedCountMismatch { expected: 1, submitted: 0 },
                ]
            }
        );

        let cleared = submit(Actor::member(1), &captain, &pick(&[1, 2, 3, 4]), 0, true, &existing);
        assert_eq!(
            cleared.verdict,
            ValidationResult::NeedsConfirmation {
                warnings: vec![Violation::ClearsSubmissions]
            }
        );
        assert!(cleared.approve(true).unwrap().clear);
    }

    #[test]
    fn membership_and_duplicates_are_collected() {
        let outsider = player(60, 2.0, 99);
        let mut coach = player(5, 1.0, HOME);
        coach.role = Role::Coach;
        let opponent = player(70, 2.0, AWAY);
        let p1 = player(1, 5.0, HOME);
        let lineup = vec![p1.clone(), p1, coach, opponent];

        let proposal = submit(Actor::member(60), &outsider, &lineup, 0, false, &matchup());
        match proposal.verdict {
            ValidationResult::Rejected { reasons } => {
                assert!(reasons.contains(&Violation::SubmitterNotOnTeam));
                assert!(reasons.contains(&Violation::DuplicatePlayer { player: "P1".into() }));
                assert!(reasons.contains(&Violation::NonPlayingRole { player: "P5".into() }));
                assert!(reasons.contains(&Violation::PlayerOnOpposingTeam { player: "P70".into() }));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn team_outside_matchup_is_rejected() {
        let captain = player(1, 5.0, HOME);
        let mut other = matchup();
        other.left = 30;
        let proposal = submit(Actor::moderator(1), &captain, &pick(&[1]), 0, false, &other);
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![Violation::TeamNotInMatchup { team: HOME }]
            }
        );
    }

    #[test]
    fn decided_pairings_block_resubmission() {
        let captain = player(1, 5.0, HOME);
        let pairing = Pairing {
            id: 1,
            matchup: 77,
            slot: 1,
            left: Some(1),
            right: Some(70),
            result: PairingResult::Winner(1),
            games: vec!["replay-1".into()],
            extension: false,
            reported_at: None,
        };
        let submission = LineupSubmission {
            actor: Actor::member(1),
            submitter: Some(&captain),
            team: HOME,
            lineup: &pick(&[1, 2]),
            rigged_count: 0,
            clear: false,
        };
        let proposal = validate_lineup(&ctx(), &submission, &matchup(), &roster(), &[pairing]);
        assert!(proposal.verdict.is_rejected());
    }

    #[test]
    fn oversized_lineup_and_rigged_count_are_rejected() {
        let captain = player(1, 5.0, HOME);
        let lineup: Vec<Player> = (1..=7).map(|i| player(i, 1.0, HOME)).collect();
        let proposal = submit(Actor::moderator(1), &captain, &lineup, 9, false, &matchup());
        match proposal.verdict {
            ValidationResult::Rejected { reasons } => {
                assert!(reasons.contains(&Violation::LineupTooLarge { size: 7, max: 6 }));
                assert!(reasons.contains(&Violation::RiggedCountTooLarge { rigged: 9, slots: 7 }));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn moderator_without_player_record_needs_confirmation() {
        let submission = LineupSubmission {
            actor: Actor::moderator(0),
            submitter: None,
            team: HOME,
            lineup: &pick(&[1, 2, 3, 4]),
            rigged_count: 0,
            clear: false,
        };
        let proposal = validate_lineup(&ctx(), &submission, &matchup(), &roster(), &[]);
        assert_eq!(
            proposal.verdict,
            ValidationResult::NeedsConfirmation {
                warnings: vec![Violation::SubmitterNotOnTeam]
            }
        );
        assert_eq!(proposal.approve(true).map(|plan| plan.submitter), Some(0));

        let member = LineupSubmission {
            actor: Actor::member(0),
            ..submission
        };
        assert!(validate_lineup(&ctx(), &member, &matchup(), &roster(), &[])
            .verdict
            .is_rejected());
    }

    #[test]
    fn lineups_only_in_match_weeks() {
        let captain = player(1, 5.0, HOME);
        let mut draft_week = ctx();
        draft_week.season.current_week = 0;
        let submission = LineupSubmission {
            actor: Actor::member(1),
            submitter: Some(&captain),
            team: HOME,
            lineup: &pick(&[1, 2]),
            rigged_count: 0,
            clear: false,
        };
        assert_eq!(
            validate_lineup(&draft_week, &submission, &matchup(), &roster(), &[]).verdict,
            ValidationResult::Rejected {
                reasons: vec![Violation::NotMatchWeek]
            }
        );
    }
}
