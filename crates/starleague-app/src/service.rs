// League service: runs each top-level operation as propose, confirm, commit.
//
// Proposals are computed against a read snapshot. Anything needing approval
// goes to the `Confirmer` outside any lock. The commit then takes the
// season's lock, opens one SQL transaction, re-validates and applies the plan
// only if nothing new turned up in between.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use starleague_core::config::{Config, LeagueRules, SeasonDefaults};
use starleague_core::db::Database;
use starleague_core::draft::{
    pool_exhausted, validate_draft_order, validate_pick, validate_withdraw, PickPlan, PickRequest, TeamBudget,
};
use starleague_core::lineup::{validate_lineup, validate_substitution, LineupPlan, LineupSubmission, SubstitutionPlan, SubstitutionRequest};
use starleague_core::model::{Matchup, Pairing, PairingId, Player, PlayerId, Season, Standing, TeamId};
use starleague_core::playoff::week_name;
use starleague_core::results::{validate_extension, validate_report, validate_undo, ExtensionPlan, ReportedResult, ResultPlan, UndoPlan};
use starleague_core::rollover::{validate_close_week, validate_start_season, MatchupState, SeasonStartPlan, WeekClosePlan};
use starleague_core::schedule::{validate_schedule, ScheduledMatchup};
use starleague_core::season::SeasonContext;
use starleague_core::standings::{player_stats, rank, PlayerStats};
use starleague_core::store::{Assignment, LeagueStore, MissingLineup};
use starleague_core::validation::{Actor, Proposal, ValidationResult, Violation};
use tracing::{info, warn};

use crate::confirm::{await_confirmation, Confirmation, ConfirmRequest, Confirmer};

/// How a top-level operation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Committed(T),
    Rejected(Vec<Violation>),
    /// The approver declined.
    Cancelled,
    /// Nobody answered within the confirmation window.
    TimedOut,
    /// Re-validation at commit time found something the approver never saw.
    Stale(Vec<Violation>),
}

impl<T> Outcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }

    pub fn committed(self) -> Option<T> {
        match self {
            Outcome::Committed(value) => Some(value),
            _ => None,
        }
    }
}

/// A committed pick plus what it means for the rest of the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct PickCommitted {
    pub plan: PickPlan,
    /// No eligible undrafted player is left.
    pub pool_exhausted: bool,
    /// No unfilled pick is left.
    pub draft_complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupCommitted {
    pub plan: LineupPlan,
    /// Sides of this week's matchups still waiting for a lineup.
    pub missing: Vec<MissingLineup>,
}

pub struct League {
    db: Database,
    rules: LeagueRules,
    defaults: SeasonDefaults,
    confirm_timeout: Duration,
    confirmer: Arc<dyn Confirmer>,
    locks: Mutex<HashMap<u32, Arc<tokio::sync::Mutex<()>>>>,
}

impl League {
    pub fn new(db: Database, config: &Config, confirmer: Arc<dyn Confirmer>) -> Self {
        League {
            db,
            rules: config.rules.clone(),
            defaults: config.season,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            confirmer,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn season_lock(&self, season: u32) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| anyhow!("season lock table poisoned"))?;
        Ok(locks.entry(season).or_default().clone())
    }

    fn context(&self, store: &dyn LeagueStore) -> Result<Option<SeasonContext>> {
        Ok(store
            .load_current_season()?
            .map(|season| SeasonContext::new(season, self.rules.clone())))
    }

    /// Propose, confirm if needed, then re-validate and apply under the
    /// season lock in a single transaction.
    async fn run<P, R, V, A>(&self, actor: Actor, action: String, propose: V, apply: A) -> Result<Outcome<R>>
    where
        V: Fn(&dyn LeagueStore) -> Result<Proposal<P>>,
        A: FnOnce(&dyn LeagueStore, P) -> Result<R>,
    {
        let season = self
            .db
            .read(|store| Ok(store.load_current_season()?.map_or(0, |s| s.number)))?;
        let first = self.db.read(|store| propose(store as &dyn LeagueStore))?;

        let acknowledged = match first.verdict {
            ValidationResult::Rejected { reasons } => {
                info!("{action} rejected for {}: {} reasons", actor.id, reasons.len());
                return Ok(Outcome::Rejected(reasons));
            }
            ValidationResult::Accepted => Vec::new(),
            ValidationResult::NeedsConfirmation { warnings } => {
                let request = ConfirmRequest {
                    actor,
                    action: action.clone(),
                    warnings,
                };
                match await_confirmation(self.confirmer.as_ref(), &request, self.confirm_timeout).await {
                    Confirmation::Approved => request.warnings,
                    Confirmation::Declined => return Ok(Outcome::Cancelled),
                    Confirmation::TimedOut => return Ok(Outcome::TimedOut),
                }
            }
        };

        let lock = self.season_lock(season)?;
        let _guard = lock.lock().await;
        self.db.transaction(|store| {
            let store: &dyn LeagueStore = store;
            let proposal = propose(store)?;
            match &proposal.verdict {
                ValidationResult::Rejected { reasons } => {
                    warn!("{action} became invalid before commit");
                    return Ok(Outcome::Stale(reasons.clone()));
                }
                ValidationResult::NeedsConfirmation { warnings }
                    if !warnings.iter().all(|w| acknowledged.contains(w)) =>
                {
                    warn!("{action} picked up new warnings before commit");
                    return Ok(Outcome::Stale(warnings.clone()));
                }
                _ => {}
            }
            let Some(plan) = proposal.approve(true) else {
                bail!("{action}: approved proposal carried no plan");
            };
            let result = apply(store, plan)?;
            info!("{action} committed by {}", actor.id);
            Ok(Outcome::Committed(result))
        })
    }

    // -----------------------------------------------------------------------
    // Draft
    // -----------------------------------------------------------------------

    /// Create the season's snake order from `teams` in first-round order.
    pub async fn initialize_draft(&self, actor: Actor, teams: Vec<TeamId>) -> Result<Outcome<usize>> {
        self.run(
            actor,
            "initialize draft".into(),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                for team in &teams {
                    if store.load_team(*team)?.is_none() {
                        return Ok(Proposal::rejected(vec![Violation::UnknownTeam { team: *team }]));
                    }
                }
                let existing = store.load_picks(ctx.number())?;
                Ok(validate_draft_order(&ctx, actor, &teams, &existing))
            },
            |store, order| {
                let season = store
                    .load_current_season()?
                    .ok_or_else(|| anyhow!("no current season"))?;
                store.insert_pick_order(season.number, &order)?;
                Ok(order.len())
            },
        )
        .await
    }

    /// Draft `target`. With `override_turn` a moderator picks for whichever
    /// team is on the clock.
    pub async fn draft_pick(&self, actor: Actor, target: PlayerId, override_turn: bool) -> Result<Outcome<PickCommitted>> {
        let cap = self.rules.draft.undrafted_star_cap;
        self.run(
            actor,
            format!("draft player {target}"),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                let picker = store.load_player(actor.id)?;
                if picker.is_none() && !actor.is_moderator() {
                    return Ok(Proposal::rejected(vec![Violation::NotRegistered]));
                }
                let Some(target) = store.load_player(target)? else {
                    return Ok(Proposal::rejected(vec![Violation::UnknownPlayer { player: target }]));
                };

                let on_clock = store.next_unfilled_pick(ctx.number())?;
                let budget = match &on_clock {
                    Some(pick) => TeamBudget {
                        captain_stars: store.load_roster_aggregate(pick.team, true)?.total_stars,
                        roster: store.load_roster_aggregate(pick.team, false)?,
                    },
                    None => TeamBudget::default(),
                };
                let request = PickRequest {
                    actor,
                    picker_team: picker.and_then(|p| p.team),
                    target: &target,
                    override_turn,
                };
                Ok(validate_pick(&ctx, &request, on_clock.as_ref(), &budget))
            },
            |store, plan| {
                store.commit_pick(plan.pick_id, plan.player)?;
                let mut player = store
                    .load_player(plan.player)?
                    .ok_or_else(|| anyhow!("player {} vanished mid-pick", plan.player))?;
                player.team = Some(plan.team);
                store.save_assignment(player.id, &Assignment::of(&player))?;

                let season = store
                    .load_current_season()?
                    .ok_or_else(|| anyhow!("no current season"))?;
                let exhausted = pool_exhausted(&store.load_undrafted(cap)?, cap);
                let complete = store.next_unfilled_pick(season.number)?.is_none();
                info!(
                    "round {} pick: team {} took {} ({:.1} stars, budget {:.2})",
                    plan.round, plan.team, player.name, player.stars, plan.budget
                );
                Ok(PickCommitted {
                    plan,
                    pool_exhausted: exhausted,
                    draft_complete: complete,
                })
            },
        )
        .await
    }

    /// Remove `team` from the rest of the draft. Returns the picks deleted.
    pub async fn withdraw(&self, actor: Actor, team: TeamId) -> Result<Outcome<usize>> {
        self.run(
            actor,
            format!("withdraw team {team} from the draft"),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                if store.load_team(team)?.is_none() {
                    return Ok(Proposal::rejected(vec![Violation::UnknownTeam { team }]));
                }
                let actor_player = store.load_player(actor.id)?;
                let picks = store.load_picks(ctx.number())?;
                Ok(validate_withdraw(actor, actor_player.as_ref(), team, &picks))
            },
            |store, plan| {
                let season = store
                    .load_current_season()?
                    .ok_or_else(|| anyhow!("no current season"))?;
                let removed = store.delete_unfilled_picks_for_team(season.number, plan.team)?;
                info!("team {} withdrew; {} picks removed", plan.team, removed);
                Ok(removed)
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Lineups
    // -----------------------------------------------------------------------

    /// Submit `players` (slot 1 first) for `team`'s matchup this week. A
    /// moderator with no player record is recorded as submitter by actor id.
    pub async fn submit_lineup(
        &self,
        actor: Actor,
        team: TeamId,
        players: Vec<PlayerId>,
        rigged_count: u32,
        clear: bool,
    ) -> Result<Outcome<LineupCommitted>> {
        self.run(
            actor,
            format!("submit lineup for team {team}"),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                let submitter = store.load_player(actor.id)?;
                if submitter.is_none() && !actor.is_moderator() {
                    return Ok(Proposal::rejected(vec![Violation::NotRegistered]));
                }
                let Some(matchup) = store.load_for_team_and_week(ctx.number(), ctx.week(), team)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoMatchup { team }]));
                };
                let mut lineup = Vec::with_capacity(players.len());
                for id in &players {
                    match store.load_player(*id)? {
                        Some(player) => lineup.push(player),
                        None => return Ok(Proposal::rejected(vec![Violation::UnknownPlayer { player: *id }])),
                    }
                }
                let roster = store.load_roster(team)?;
                let pairings = store.load_pairings(matchup.id)?;
                let submission = LineupSubmission {
                    actor,
                    submitter: submitter.as_ref(),
                    team,
                    lineup: &lineup,
                    rigged_count,
                    clear,
                };
                Ok(validate_lineup(&ctx, &submission, &matchup, &roster, &pairings))
            },
            |store, plan| {
                if plan.clear {
                    store.clear_lineup(plan.matchup)?;
                }
                store.commit_lineup(plan.matchup, plan.side, &plan.players, plan.rigged_count, plan.submitter)?;
                let matchup = store
                    .load_matchup(plan.matchup)?
                    .ok_or_else(|| anyhow!("matchup {} vanished mid-commit", plan.matchup))?;
                let missing = store.load_missing_lineups(matchup.season, matchup.week)?;
                info!(
                    "lineup of {} for matchup {} ({} side); {} lineups still missing",
                    plan.players.len(),
                    plan.matchup,
                    plan.side.as_str(),
                    missing.len()
                );
                Ok(LineupCommitted { plan, missing })
            },
        )
        .await
    }

    /// Swap `outgoing` for `incoming` in this week's pairing, or in an extended
    /// pairing from an earlier week whose matchup is still untallied.
    pub async fn substitute(
        &self,
        actor: Actor,
        outgoing: PlayerId,
        incoming: PlayerId,
    ) -> Result<Outcome<SubstitutionPlan>> {
        self.run(
            actor,
            format!("substitute {incoming} for {outgoing}"),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                let (Some(out), Some(inc)) = (store.load_player(outgoing)?, store.load_player(incoming)?) else {
                    let missing = if store.load_player(outgoing)?.is_none() { outgoing } else { incoming };
                    return Ok(Proposal::rejected(vec![Violation::UnknownPlayer { player: missing }]));
                };
                // Extended pairings from earlier weeks stay open until their
                // matchup is tallied.
                let mut candidates = store.load_week_pairings(ctx.number(), ctx.week())?;
                for deferred in store.load_untallied_matchups(ctx.number(), ctx.week())? {
                    if deferred.week < ctx.week() {
                        candidates.extend(store.load_pairings(deferred.id)?);
                    }
                }
                let held = candidates
                    .iter()
                    .filter(|p| p.holds(outgoing))
                    .min_by_key(|p| p.result.is_decided());
                let Some(held) = held else {
                    return Ok(Proposal::rejected(vec![Violation::OutgoingNotInLineup { player: out.name }]));
                };
                let matchup = store
                    .load_matchup(held.matchup)?
                    .ok_or_else(|| anyhow!("pairing {} has no matchup", held.id))?;
                let week_pairings = store.load_week_pairings(ctx.number(), matchup.week)?;
                let actor_player = store.load_player(actor.id)?;
                let request = SubstitutionRequest {
                    actor,
                    actor_player: actor_player.as_ref(),
                    outgoing: &out,
                    incoming: &inc,
                };
                Ok(validate_substitution(&ctx.rules.lineup, &request, &matchup, &week_pairings))
            },
            |store, plan| {
                store.replace_pairing_player(plan.pairing, plan.side, plan.incoming)?;
                Ok(plan)
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    fn pairing_context(
        &self,
        store: &dyn LeagueStore,
        pairing: PairingId,
    ) -> Result<std::result::Result<(SeasonContext, Matchup, Pairing), Violation>> {
        let Some(ctx) = self.context(store)? else {
            return Ok(Err(Violation::NoSeason));
        };
        let Some(found) = store.load_pairing(pairing)? else {
            return Ok(Err(Violation::UnknownPairing { pairing }));
        };
        let matchup = store
            .load_matchup(found.matchup)?
            .ok_or_else(|| anyhow!("pairing {pairing} has no matchup"))?;
        Ok(Ok((ctx, matchup, found)))
    }

    pub async fn report_result(
        &self,
        actor: Actor,
        pairing: PairingId,
        reported: ReportedResult,
        games: Vec<String>,
    ) -> Result<Outcome<ResultPlan>> {
        self.run(
            actor,
            format!("report result for pairing {pairing}"),
            |store| {
                let (ctx, matchup, found) = match self.pairing_context(store, pairing)? {
                    Ok(found) => found,
                    Err(violation) => return Ok(Proposal::rejected(vec![violation])),
                };
                Ok(validate_report(&ctx, actor, &matchup, &found, &reported, games.clone()))
            },
            |store, plan| {
                store.commit_result(plan.pairing, &plan.result, &plan.games)?;
                Ok(plan)
            },
        )
        .await
    }

    pub async fn undo_result(&self, actor: Actor, pairing: PairingId) -> Result<Outcome<UndoPlan>> {
        self.run(
            actor,
            format!("undo result for pairing {pairing}"),
            |store| {
                let (_, matchup, found) = match self.pairing_context(store, pairing)? {
                    Ok(found) => found,
                    Err(violation) => return Ok(Proposal::rejected(vec![violation])),
                };
                Ok(validate_undo(actor, &matchup, &found))
            },
            |store, plan| {
                store.undo_result(plan.pairing)?;
                Ok(plan)
            },
        )
        .await
    }

    pub async fn set_extension(&self, actor: Actor, pairing: PairingId, extension: bool) -> Result<Outcome<ExtensionPlan>> {
        self.run(
            actor,
            format!("set extension on pairing {pairing}"),
            |store| {
                let (ctx, matchup, found) = match self.pairing_context(store, pairing)? {
                    Ok(found) => found,
                    Err(violation) => return Ok(Proposal::rejected(vec![violation])),
                };
                Ok(validate_extension(&ctx, actor, &matchup, &found, extension))
            },
            |store, plan| {
                store.set_extension(plan.pairing, plan.extension)?;
                Ok(plan)
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Week and season progression
    // -----------------------------------------------------------------------

    /// Tally the week into standings and move the season forward.
    pub async fn close_week(&self, actor: Actor) -> Result<Outcome<WeekClosePlan>> {
        let cap = self.rules.draft.undrafted_star_cap;
        self.run(
            actor,
            "close the week".into(),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                let mut open = Vec::new();
                for matchup in store.load_untallied_matchups(ctx.number(), ctx.week())? {
                    let pairings = store.load_pairings(matchup.id)?;
                    open.push(MatchupState { matchup, pairings });
                }
                let standings = store.load_standings(ctx.number())?;
                let remaining = store
                    .load_picks(ctx.number())?
                    .iter()
                    .filter(|p| !p.is_filled())
                    .count();
                let exhausted = pool_exhausted(&store.load_undrafted(cap)?, cap);
                Ok(validate_close_week(&ctx, actor, &open, &standings, remaining, exhausted))
            },
            |store, plan| {
                for matchup in &plan.tallied {
                    store.mark_tallied(*matchup)?;
                }
                for outcome in &plan.outcomes {
                    store.apply_result(plan.season, outcome.differential, outcome.left, outcome.right)?;
                }
                for pairing in &plan.new_matchups {
                    store.create_matchup(&pairing.room, plan.season, plan.next_week, pairing.left, pairing.right)?;
                }
                if let Some(champion) = plan.champion {
                    store.record_champion(plan.season, champion)?;
                    info!("season {} champion: team {}", plan.season, champion);
                }
                store.advance_week(plan.season, plan.next_week)?;
                info!(
                    "closed week {} of season {}: {} matchups tallied, {} deferred",
                    plan.closed_week,
                    plan.season,
                    plan.tallied.len(),
                    plan.deferred.len()
                );
                Ok(plan)
            },
        )
        .await
    }

    /// Start season `number`, superseding the current one. Weeks and playoff
    /// size fall back to the configured defaults. `adjustments` are rating
    /// deltas applied before the draft.
    pub async fn start_season(
        &self,
        actor: Actor,
        number: u32,
        regular_weeks: Option<u32>,
        playoff_size: Option<u32>,
        adjustments: Vec<(PlayerId, f64)>,
    ) -> Result<Outcome<SeasonStartPlan>> {
        let next = Season {
            number,
            current_week: 0,
            regular_weeks: regular_weeks.unwrap_or(self.defaults.regular_weeks),
            playoff_size: playoff_size.unwrap_or(self.defaults.playoff_size),
        };
        self.run(
            actor,
            format!("start season {number}"),
            |store| {
                let current = store.load_current_season()?;
                let mut adjusted: Vec<(Player, f64)> = Vec::with_capacity(adjustments.len());
                for (id, delta) in &adjustments {
                    match store.load_player(*id)? {
                        Some(player) => adjusted.push((player, *delta)),
                        None => return Ok(Proposal::rejected(vec![Violation::UnknownPlayer { player: *id }])),
                    }
                }
                let mut rostered = Vec::new();
                for team in store.load_teams()? {
                    rostered.extend(store.load_roster(team.id)?);
                }
                Ok(validate_start_season(actor, current.as_ref(), next, &adjusted, &rostered))
            },
            |store, plan| {
                store.create_season(&plan.season)?;
                for team in store.load_active_teams()? {
                    store.ensure_standing(plan.season.number, team.id)?;
                }
                for (id, stars) in &plan.ratings {
                    if let Some(mut player) = store.load_player(*id)? {
                        player.stars = *stars;
                        store.save_assignment(*id, &Assignment::of(&player))?;
                    }
                }
                for id in &plan.released {
                    if let Some(mut player) = store.load_player(*id)? {
                        player.team = None;
                        store.save_assignment(*id, &Assignment::of(&player))?;
                    }
                }
                info!(
                    "season {} started: {} regular weeks, playoff size {}, {} players released",
                    plan.season.number,
                    plan.season.regular_weeks,
                    plan.season.playoff_size,
                    plan.released.len()
                );
                Ok(plan)
            },
        )
        .await
    }

    /// Round-robin every active team across the regular weeks.
    pub async fn schedule_regular_season(&self, actor: Actor) -> Result<Outcome<Vec<ScheduledMatchup>>> {
        self.run(
            actor,
            "schedule the regular season".into(),
            |store| {
                let Some(ctx) = self.context(store)? else {
                    return Ok(Proposal::rejected(vec![Violation::NoSeason]));
                };
                let teams: Vec<TeamId> = store.load_active_teams()?.iter().map(|t| t.id).collect();
                let mut existing = 0;
                for week in 1..=ctx.season.regular_weeks {
                    existing += store.load_matchups_for_week(ctx.number(), week)?.len();
                }
                Ok(validate_schedule(&ctx, actor, &teams, existing))
            },
            |store, schedule| {
                let season = store
                    .load_current_season()?
                    .ok_or_else(|| anyhow!("no current season"))?;
                for m in &schedule {
                    store.create_matchup(&m.room, season.number, m.week, m.left, m.right)?;
                }
                Ok(schedule)
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn current_season(&self) -> Result<Option<Season>> {
        self.db.read(|store| store.load_current_season())
    }

    /// Display name of the current week.
    pub fn current_week_name(&self) -> Result<Option<String>> {
        Ok(self
            .current_season()?
            .map(|s| week_name(s.current_week, s.regular_weeks, s.playoff_size)))
    }

    /// Current season's standings, best first.
    pub fn standings(&self) -> Result<Vec<Standing>> {
        self.db.read(|store| {
            let Some(season) = store.load_current_season()? else {
                return Ok(Vec::new());
            };
            Ok(rank(&store.load_standings(season.number)?))
        })
    }

    pub fn missing_lineups(&self) -> Result<Vec<MissingLineup>> {
        self.db.read(|store| {
            let Some(season) = store.load_current_season()? else {
                return Ok(Vec::new());
            };
            store.load_missing_lineups(season.number, season.current_week)
        })
    }

    pub fn champion(&self, season: u32) -> Result<Option<TeamId>> {
        self.db.read(|store| store.load_champion(season))
    }

    /// Per-player results across every week of the current season so far.
    pub fn player_stats(&self) -> Result<HashMap<PlayerId, PlayerStats>> {
        self.db.read(|store| {
            let Some(season) = store.load_current_season()? else {
                return Ok(HashMap::new());
            };
            let mut pairings = Vec::new();
            for week in 1..=season.current_week {
                pairings.extend(store.load_week_pairings(season.number, week)?);
            }
            let mut players = HashMap::new();
            for id in pairings.iter().flat_map(|p| [p.left, p.right]).flatten() {
                if players.contains_key(&id) {
                    continue;
                }
                if let Some(player) = store.load_player(id)? {
                    players.insert(id, player);
                }
            }
            Ok(player_stats(&pairings, &players))
        })
    }
}
