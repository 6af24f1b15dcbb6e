// Pick and withdraw legality.

use serde::{Deserialize, Serialize};

use super::budget::budget_for;
use crate::model::{DraftPick, PickId, Player, PlayerId, RosterAggregate, Role, TeamId, STAR_EPSILON};
use crate::season::{Phase, SeasonContext};
use crate::validation::{Actor, Checks, Proposal, Violation};

/// A request to draft `target`.
#[derive(Debug, Clone)]
pub struct PickRequest<'a> {
    pub actor: Actor,
    /// The team the actor belongs to, if any.
    pub picker_team: Option<TeamId>,
    pub target: &'a Player,
    /// Redirect the pick to whichever team is on the clock (moderators only).
    pub override_turn: bool,
}

/// Budget inputs for the team on the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamBudget {
    pub captain_stars: f64,
    pub roster: RosterAggregate,
}

/// What committing a pick writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickPlan {
    pub pick_id: PickId,
    pub round: u32,
    pub team: TeamId,
    pub player: PlayerId,
    pub budget: f64,
}

/// Validate a pick against the pick on the clock.
///
/// Every failure is collected: wrong turn, target already owned, inactive
/// target and budget overrun are all reported together.
pub fn validate_pick(
    ctx: &SeasonContext,
    request: &PickRequest<'_>,
    on_clock: Option<&DraftPick>,
    budget_inputs: &TeamBudget,
) -> Proposal<PickPlan> {
    let mut checks = Checks::new();
    let moderator_override = request.override_turn && request.actor.is_moderator();

    if ctx.phase() != Phase::Draft {
        checks.fail(Violation::WrongPhase {
            phase: Phase::Draft.as_str().into(),
        });
    }

    if request.picker_team.is_none() && !moderator_override {
        checks.fail(Violation::NotOnTeam);
    }

    let target = request.target;
    if target.team.is_some() {
        checks.fail(Violation::AlreadyOnTeam {
            player: target.name.clone(),
        });
    }
    if !target.active {
        checks.fail(Violation::PlayerInactive {
            player: target.name.clone(),
        });
    }

    let Some(pick) = on_clock else {
        checks.fail(Violation::DraftComplete);
        return Proposal::from_checks(checks, request.actor.privilege, None);
    };

    if request.picker_team != Some(pick.team) {
        if moderator_override {
            checks.prompt(Violation::PickingForTeam { team: pick.team });
        } else if request.override_turn {
            checks.fail(Violation::ModeratorOnly {
                action: "pick for another team".into(),
            });
        } else if request.picker_team.is_some() {
            checks.fail(Violation::NotYourTurn { on_clock: pick.team });
        }
    }

    let budget = budget_for(
        &ctx.rules.draft,
        pick.round,
        budget_inputs.captain_stars,
        &budget_inputs.roster,
    );
    if target.stars > budget + STAR_EPSILON {
        checks.fail(Violation::BudgetExceeded {
            player: target.name.clone(),
            stars: target.stars,
            budget,
        });
    }

    let plan = PickPlan {
        pick_id: pick.id,
        round: pick.round,
        team: pick.team,
        player: target.id,
        budget,
    };
    Proposal::from_checks(checks, request.actor.privilege, Some(plan))
}

/// Whether the undrafted pool has run dry: no active, unowned player rated at
/// or below `star_cap` remains.
pub fn pool_exhausted(undrafted: &[Player], star_cap: f64) -> bool {
    !undrafted
        .iter()
        .any(|p| p.active && p.is_undrafted() && p.stars <= star_cap + STAR_EPSILON)
}

/// What withdrawing a team deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawPlan {
    pub team: TeamId,
    pub picks: Vec<PickId>,
}

/// Validate withdrawing `team` from the rest of the draft. Only the team's
/// captain may do so without moderator confirmation, and the deletion is
/// always confirmed because it cannot be undone.
pub fn validate_withdraw(
    actor: Actor,
    actor_player: Option<&Player>,
    team: TeamId,
    picks: &[DraftPick],
) -> Proposal<WithdrawPlan> {
    let mut checks = Checks::new();

    let is_captain = actor_player
        .is_some_and(|p| p.team == Some(team) && p.role == Role::Captain);
    if !is_captain {
        checks.overridable(Violation::NotTeamCaptain { team });
    }

    let remaining: Vec<PickId> = picks
        .iter()
        .filter(|p| p.team == team && !p.is_filled())
        .map(|p| p.id)
        .collect();

    if remaining.is_empty() {
        checks.fail(Violation::NoPicksRemaining { team });
    } else {
        checks.prompt(Violation::WithdrawIrrevocable {
            team,
            remaining: remaining.len(),
        });
    }

    let plan = WithdrawPlan {
        team,
        picks: remaining,
    };
    Proposal::from_checks(checks, actor.privilege, Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DraftRules, LeagueRules, LineupRules};
    use crate::model::Season;
    use crate::validation::ValidationResult;

    fn ctx() -> SeasonContext {
        SeasonContext::new(
            Season {
                number: 1,
                current_week: 0,
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

    fn player(id: PlayerId, stars: f64, team: Option<TeamId>) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            stars,
            active: true,
            role: Role::Player,
            team,
        }
    }

    fn pick(id: PickId, round: u32, pick_order: u32, team: TeamId) -> DraftPick {
        DraftPick {
            id,
            season: 1,
            round,
            pick_order,
            team,
            player: None,
            picked_at: None,
        }
    }

    fn captain_budget(captain_stars: f64) -> TeamBudget {
        TeamBudget {
            captain_stars,
            roster: RosterAggregate {
                size: 1,
                total_stars: captain_stars,
            },
        }
    }

    fn reasons(proposal: &Proposal<PickPlan>) -> Vec<Violation> {
        match &proposal.verdict {
            ValidationResult::Rejected { reasons } => reasons.clone(),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn accepts_pick_within_budget_on_own_turn() {
        let target = player(100, 4.0, None);
        let request = PickRequest {
            actor: Actor::member(1),
            picker_team: Some(10),
            target: &target,
            override_turn: false,
        };
        let on_clock = pick(5, 1, 1, 10);
        let proposal = validate_pick(&ctx(), &request, Some(&on_clock), &captain_budget(4.5));
        assert_eq!(proposal.verdict, ValidationResult::Accepted);
        let plan = proposal.approve(false).unwrap();
        assert_eq!(plan.pick_id, 5);
        assert_eq!(plan.team, 10);
        assert!((plan.budget - 4.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_wrong_turn_and_budget_together() {
        let target = player(100, 5.0, None);
        let request = PickRequest {
            actor: Actor::member(1),
            picker_team: Some(20),
            target: &target,
            override_turn: false,
        };
        let on_clock = pick(5, 1, 1, 10);
        let proposal = validate_pick(&ctx(), &request, Some(&on_clock), &captain_budget(4.5));
        let reasons = reasons(&proposal);
        assert_eq!(reasons.len(), 2);
        assert!(reasons.contains(&Violation::NotYourTurn { on_clock: 10 }));
        assert!(matches!(reasons[1], Violation::BudgetExceeded { .. }));
    }

    #[test]
    fn already_owned_player_is_always_rejected() {
        let target = player(100, 2.0, Some(30));
        let on_clock = pick(5, 1, 1, 10);
        for _ in 0..3 {
            let request = PickRequest {
                actor: Actor::moderator(1),
                picker_team: Some(10),
                target: &target,
                override_turn: false,
            };
            let proposal = validate_pick(&ctx(), &request, Some(&on_clock), &captain_budget(4.0));
            assert_eq!(
                reasons(&proposal),
                vec![Violation::AlreadyOnTeam { player: "P100".into() }]
            );
        }
    }

    #[test]
    fn moderator_override_redirects_to_team_on_clock() {
        let target = player(100, 3.0, None);
        let request = PickRequest {
            actor: Actor::moderator(1),
            picker_team: None,
            target: &target,
            override_turn: true,
        };
        let on_clock = pick(7, 2, 3, 40);
        let budget = TeamBudget {
            captain_stars: 4.0,
            roster: RosterAggregate { size: 2, total_stars: 7.0 },
        };
        let proposal = validate_pick(&ctx(), &request, Some(&on_clock), &budget);
        assert_eq!(
            proposal.verdict,
            ValidationResult::NeedsConfirmation {
                warnings: vec![Violation::PickingForTeam { team: 40 }]
            }
        );
        assert_eq!(proposal.approve(true).unwrap().team, 40);
    }

    #[test]
    fn member_override_requires_moderator() {
        let target = player(100, 3.0, None);
        let request = PickRequest {
            actor: Actor::member(1),
            picker_team: Some(20),
            target: &target,
            override_turn: true,
        };
        let on_clock = pick(7, 1, 1, 10);
        let proposal = validate_pick(&ctx(), &request, Some(&on_clock), &captain_budget(4.0));
        assert!(reasons(&proposal).contains(&Violation::ModeratorOnly {
            action: "pick for another team".into()
        }));
    }

    #[test]
    fn rejects_teamless_picker_inactive_target_and_finished_draft() {
        let mut target = player(100, 3.0, None);
        target.active = false;
        let request = PickRequest {
            actor: Actor::member(1),
            picker_team: None,
            target: &target,
            override_turn: false,
        };
        let proposal = validate_pick(&ctx(), &request, None, &TeamBudget::default());
        let reasons = reasons(&proposal);
        assert!(reasons.contains(&Violation::NotOnTeam));
        assert!(reasons.contains(&Violation::PlayerInactive { player: "P100".into() }));
        assert!(reasons.contains(&Violation::DraftComplete));
    }

    #[test]
    fn rejects_picks_outside_draft_phase() {
        let mut ctx = ctx();
        ctx.season.current_week = 2;
        let target = player(100, 1.0, None);
        let request = PickRequest {
            actor: Actor::member(1),
            picker_team: Some(10),
            target: &target,
            override_turn: false,
        };
        let on_clock = pick(5, 1, 1, 10);
        let proposal = validate_pick(&ctx, &request, Some(&on_clock), &captain_budget(4.0));
        assert!(reasons(&proposal).contains(&Violation::WrongPhase { phase: "draft".into() }));
    }

    #[test]
    fn pool_exhausted_ignores_inactive_and_capped_players() {
        let mut inactive = player(1, 2.0, None);
        inactive.active = false;
        assert!(pool_exhausted(&[inactive.clone()], 10.0));
        assert!(pool_exhausted(&[player(2, 4.0, None)], 3.5));
        assert!(!pool_exhausted(&[inactive, player(3, 3.0, None)], 10.0));
    }

    #[test]
    fn withdraw_by_captain_prompts_with_remaining_picks() {
        let mut captain = player(1, 4.0, Some(10));
        captain.role = Role::Captain;
        let mut filled = pick(1, 1, 1, 10);
        filled.player = Some(55);
        let picks = vec![filled, pick(2, 2, 3, 10), pick(3, 2, 1, 20), pick(4, 3, 1, 10)];

        let proposal = validate_withdraw(Actor::member(1), Some(&captain), 10, &picks);
        assert_eq!(
            proposal.verdict,
            ValidationResult::NeedsConfirmation {
                warnings: vec![Violation::WithdrawIrrevocable { team: 10, remaining: 2 }]
            }
        );
        assert_eq!(proposal.approve(true).unwrap().picks, vec![2, 4]);
    }

    #[test]
    fn withdraw_by_non_captain_is_rejected_for_members() {
        let member = player(2, 3.0, Some(10));
        let picks = vec![pick(2, 2, 3, 10)];
        let proposal = validate_withdraw(Actor::member(2), Some(&member), 10, &picks);
        assert_eq!(
            proposal.verdict,
            ValidationResult::Rejected {
                reasons: vec![Violation::NotTeamCaptain { team: 10 }]
            }
        );
    }
}
