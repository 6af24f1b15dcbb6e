// Persistence contract consumed by the league service.
//
// Every method runs inside whatever transaction the caller opened; see
// `db::Database::transaction`.

use anyhow::Result;

use crate::draft::PickSlot;
use crate::model::{
    DraftPick, Matchup, MatchupId, Pairing, PairingId, PairingResult, PickId, Player, PlayerId, Role,
    RosterAggregate, Room, Season, Side, Standing, Team, TeamId,
};

/// A player's mutable draft and roster attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub team: Option<TeamId>,
    pub role: Role,
    pub stars: f64,
    pub active: bool,
}

impl Assignment {
    pub fn of(player: &Player) -> Self {
        Assignment {
            team: player.team,
            role: player.role,
            stars: player.stars,
            active: player.active,
        }
    }
}

/// A side of a matchup that has not submitted a lineup yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingLineup {
    pub matchup: MatchupId,
    pub side: Side,
    pub team: TeamId,
}

pub trait LeagueStore {
    // -- players --
    fn load_player(&self, id: PlayerId) -> Result<Option<Player>>;
    /// All players on `team`, strongest first.
    fn load_roster(&self, team: TeamId) -> Result<Vec<Player>>;
    /// Size and star total of `team`'s roster, or of its captain alone.
    fn load_roster_aggregate(&self, team: TeamId, captain_only: bool) -> Result<RosterAggregate>;
    /// Active players without a team rated at or below `max_stars`.
    fn load_undrafted(&self, max_stars: f64) -> Result<Vec<Player>>;
    fn save_assignment(&self, id: PlayerId, assignment: &Assignment) -> Result<()>;
    /// Insert or update a pool entry keyed by id; team membership is kept.
    fn upsert_player(&self, id: PlayerId, name: &str, stars: f64, role: Role, active: bool) -> Result<()>;

    // -- teams --
    fn create_team(&self, name: &str) -> Result<TeamId>;
    fn load_teams(&self) -> Result<Vec<Team>>;
    fn load_active_teams(&self) -> Result<Vec<Team>>;
    fn load_team(&self, id: TeamId) -> Result<Option<Team>>;

    // -- draft --
    fn insert_pick_order(&self, season: u32, order: &[PickSlot]) -> Result<()>;
    fn load_picks(&self, season: u32) -> Result<Vec<DraftPick>>;
    fn next_unfilled_pick(&self, season: u32) -> Result<Option<DraftPick>>;
    fn next_unfilled_pick_for_team(&self, season: u32, team: TeamId) -> Result<Option<DraftPick>>;
    fn commit_pick(&self, pick: PickId, player: PlayerId) -> Result<()>;
    /// Returns how many picks were removed.
    fn delete_unfilled_picks_for_team(&self, season: u32, team: TeamId) -> Result<usize>;

    // -- matchups and pairings --
    fn create_matchup(&self, room: &Room, season: u32, week: u32, left: TeamId, right: TeamId) -> Result<MatchupId>;
    fn load_matchup(&self, id: MatchupId) -> Result<Option<Matchup>>;
    fn load_matchups_for_week(&self, season: u32, week: u32) -> Result<Vec<Matchup>>;
    fn load_for_team_and_week(&self, season: u32, week: u32, team: TeamId) -> Result<Option<Matchup>>;
    /// Matchups up to and including `week` whose outcome is not yet in the
    /// standings.
    fn load_untallied_matchups(&self, season: u32, week: u32) -> Result<Vec<Matchup>>;
    fn load_missing_lineups(&self, season: u32, week: u32) -> Result<Vec<MissingLineup>>;
    /// Write `players` into slots 1..N on `side` and fix the matchup's slot and
    /// rigged counts.
    fn commit_lineup(
        &self,
        matchup: MatchupId,
        side: Side,
        players: &[PlayerId],
        rigged_count: u32,
        submitter: PlayerId,
    ) -> Result<()>;
    /// Drop both sides' submissions and every pairing of the matchup.
    fn clear_lineup(&self, matchup: MatchupId) -> Result<()>;
    fn load_pairing(&self, id: PairingId) -> Result<Option<Pairing>>;
    fn load_pairings(&self, matchup: MatchupId) -> Result<Vec<Pairing>>;
    fn load_week_pairings(&self, season: u32, week: u32) -> Result<Vec<Pairing>>;
    fn load_open_pairings(&self, season: u32, week: u32) -> Result<Vec<Pairing>>;
    fn replace_pairing_player(&self, pairing: PairingId, side: Side, player: PlayerId) -> Result<()>;
    fn commit_result(&self, pairing: PairingId, result: &PairingResult, games: &[String]) -> Result<()>;
    fn undo_result(&self, pairing: PairingId) -> Result<()>;
    fn set_extension(&self, pairing: PairingId, extension: bool) -> Result<()>;
    fn mark_tallied(&self, matchup: MatchupId) -> Result<()>;

    // -- standings --
    fn ensure_standing(&self, season: u32, team: TeamId) -> Result<()>;
    fn load_standings(&self, season: u32) -> Result<Vec<Standing>>;
    /// Best `n` records in ranking order.
    fn load_top_standings(&self, season: u32, n: usize) -> Result<Vec<Standing>>;
    /// Fold one matchup outcome into both teams' records. `differential` is
    /// `left wins - right wins`.
    fn apply_result(&self, season: u32, differential: i32, left: TeamId, right: TeamId) -> Result<()>;

    // -- seasons --
    fn load_current_season(&self) -> Result<Option<Season>>;
    /// Insert `season` and make it the current one.
    fn create_season(&self, season: &Season) -> Result<()>;
    fn advance_week(&self, season: u32, week: u32) -> Result<()>;
    fn record_champion(&self, season: u32, team: TeamId) -> Result<()>;
    fn load_champion(&self, season: u32) -> Result<Option<TeamId>>;
}
