// Mid-week substitutions: swap one player's slot to another without reordering.

use serde::{Deserialize, Serialize};

use crate::config::LineupRules;
use crate::model::{Matchup, Pairing, PairingId, Player, PlayerId, Side, STAR_EPSILON};
use crate::validation::{Actor, Checks, Proposal, Violation};

#[derive(Debug, Clone)]
pub struct SubstitutionRequest<'a> {
    pub actor: Actor,
    /// The acting player's record, if registered.
    pub actor_player: Option<&'a Player>,
    pub outgoing: &'a Player,
    pub incoming: &'a Player,
}

/// What committing a substitution writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionPlan {
    pub pairing: PairingId,
    pub side: Side,
    pub outgoing: PlayerId,
    pub incoming: PlayerId,
}

/// Validate replacing `outgoing` with `incoming` in `matchup`. `week_pairings`
/// covers every pairing of the week so an incoming player already slotted in
/// another matchup is caught too.
pub fn validate_substitution(
    rules: &LineupRules,
    request: &SubstitutionRequest<'_>,
    matchup: &Matchup,
    week_pairings: &[Pairing],
) -> Proposal<SubstitutionPlan> {
    let mut checks = Checks::new();
    let outgoing = request.outgoing;
    let incoming = request.incoming;

    let held = week_pairings
        .iter()
        .filter(|p| p.matchup == matchup.id)
        .find_map(|p| p.side_of(outgoing.id).map(|side| (p, side)));

    if held.is_none() {
        checks.fail(Violation::OutgoingNotInLineup {
            player: outgoing.name.clone(),
        });
    }
    if week_pairings.iter().any(|p| p.holds(incoming.id)) {
        checks.fail(Violation::IncomingAlreadyInLineup {
            player: incoming.name.clone(),
        });
    }
    if let Some((pairing, _)) = held {
        if pairing.result.is_decided() {
            checks.fail(Violation::ResultAlreadyReported { slot: pairing.slot });
        }
    }

    let opponent = held.map(|(_, side)| matchup.team(side.opposite()));
    if incoming.team.is_some() && incoming.team == opponent {
        checks.fail(Violation::PlayerOnOpposingTeam {
            player: incoming.name.clone(),
        });
    } else if incoming.team != outgoing.team {
        checks.overridable(Violation::SubstituteNotOnSameTeam {
            outgoing: outgoing.name.clone(),
            incoming: incoming.name.clone(),
        });
    }

    let acting_for_team = request
        .actor_player
        .is_some_and(|p| p.team.is_some() && p.team == outgoing.team);
    if !acting_for_team {
        checks.overridable(Violation::SubmitterNotOnTeam);
    }

    if !incoming.role.is_playing() {
        checks.overridable(Violation::NonPlayingRole {
            player: incoming.name.clone(),
        });
    }

    let gap = incoming.stars - outgoing.stars;
    if gap > rules.substitution_tolerance + STAR_EPSILON {
        checks.overridable(Violation::SubstituteTooStrong {
            outgoing: outgoing.name.clone(),
            incoming: incoming.name.clone(),
            gap,
        });
    }

    let plan = held.map(|(pairing, side)| SubstitutionPlan {
        pairing: pairing.id,
        side,
        outgoing: outgoing.id,
        incoming: incoming.id,
    });
    Proposal::from_checks(checks, request.actor.privilege, plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PairingResult, Role, Room, TeamId};
    use crate::validation::ValidationResult;

    const HOME: TeamId = 10;
    const AWAY: TeamId = 20;

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

    fn matchup() -> Matchup {
        Matchup {
            id: 5,
            season: 1,
            week: 3,
            room: Room::Numbered(2),
            left: HOME,
            right: AWAY,
            slots: Some(2),
            rigged_count: Some(0),
            left_submitter: Some(1),
            right_submitter: Some(11),
            tallied: false,
        }
    }

    fn pairing(id: PairingId, slot: u32, left: PlayerId, right: PlayerId) -> Pairing {
        Pairing {
            id,
            matchup: 5,
            slot,
            left: Some(left),
            right: Some(right),
            result: PairingResult::Pending,
            games: vec![],
            extension: false,
            reported_at: None,
        }
    }

    fn week() -> Vec<Pairing> {
        vec![pairing(100, 1, 1, 11), pairing(101, 2, 2, 12)]
    }

    fn request<'a>(actor: Actor, captain: &'a Player, out: &'a Player, inc: &'a Player) -> SubstitutionRequest<'a> {
        SubstitutionRequest {
            actor,
            actor_player: Some(captain),
            outgoing: out,
            incoming: inc,
        }
    }

    #[test]
    fn like_for_like_substitution_is_accepted() {
        let captain = player(1, 4.0, HOME);
        let out = player(2, 3.0, HOME);
        let inc = player(3, 3.5, HOME);
        let proposal = validate_substitution(
            &LineupRules::default(),
            &request(Actor::member(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert_eq!(proposal.verdict, ValidationResult::Accepted);
        assert_eq!(
            proposal.approve(false).unwrap(),
            SubstitutionPlan {
                pairing: 101,
                side: Side::Left,
                outgoing: 2,
                incoming: 3
            }
        );
    }

    #[test]
    fn stronger_substitute_needs_moderator() {
        let captain = player(1, 4.0, HOME);
        let out = player(2, 2.0, HOME);
        let inc = player(3, 4.5, HOME);
        let rules = LineupRules::default();

        let member = validate_substitution(
            &rules,
            &request(Actor::member(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert!(member.verdict.is_rejected());

        let moderator = validate_substitution(
            &rules,
            &request(Actor::moderator(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert_eq!(moderator.verdict.warnings().len(), 1);
        assert!(matches!(
            moderator.verdict.warnings()[0],
            Violation::SubstituteTooStrong { .. }
        ));
    }

    #[test]
    fn outgoing_must_hold_a_slot_and_incoming_must_not() {
        let captain = player(1, 4.0, HOME);
        let out = player(7, 3.0, HOME);
        let inc = player(2, 3.0, HOME);
        let proposal = validate_substitution(
            &LineupRules::default(),
            &request(Actor::moderator(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![
                    Violation::OutgoingNotInLineup { player: "P7".into() },
                    Violation::IncomingAlreadyInLineup { player: "P2".into() },
                ]
            }
        );
    }

    #[test]
    fn decided_pairing_requires_undo_first() {
        let captain = player(1, 4.0, HOME);
        let out = player(2, 3.0, HOME);
        let inc = player(3, 3.0, HOME);
        let mut pairings = week();
        pairings[1].result = PairingResult::Dead;
        let proposal = validate_substitution(
            &LineupRules::default(),
            &request(Actor::moderator(1), &captain, &out, &inc),
            &matchup(),
            &pairings,
        );
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![Violation::ResultAlreadyReported { slot: 2 }]
            }
        );
    }

    #[test]
    fn opposing_player_cannot_come_in() {
        let captain = player(1, 4.0, HOME);
        let out = player(2, 3.0, HOME);
        let inc = player(13, 3.0, AWAY);
        let proposal = validate_substitution(
            &LineupRules::default(),
            &request(Actor::moderator(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![Violation::PlayerOnOpposingTeam { player: "P13".into() }]
            }
        );
    }

    #[test]
    fn coach_and_free_agent_are_overridable() {
        let captain = player(1, 4.0, HOME);
        let out = player(2, 3.0, HOME);
        let mut inc = player(40, 2.0, 99);
        inc.role = Role::Coach;
        let proposal = validate_substitution(
            &LineupRules::default(),
            &request(Actor::moderator(1), &captain, &out, &inc),
            &matchup(),
            &week(),
        );
        assert_eq!(
            proposal.verdict,
            ValidationResult::NeedsConfirmation {
                warnings: vec![
                    Violation::SubstituteNotOnSameTeam {
                        outgoing: "P2".into(),
                        incoming: "P40".into()
                    },
                    Violation::NonPlayingRole { player: "P40".into() },
                ]
            }
        );
    }
}
