// League data model: players, teams, seasons, matchups, pairings, picks and standings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat-platform snowflake identifying a player.
pub type PlayerId = i64;
/// Chat-platform snowflake identifying a team (its role id).
pub type TeamId = i64;
pub type MatchupId = i64;
pub type PairingId = i64;
pub type PickId = i64;

/// Lowest and highest star rating a player may carry.
pub const MIN_STARS: f64 = 1.0;
pub const MAX_STARS: f64 = 5.0;

/// Slack applied to star comparisons so that sums like `3.1 + 1.4` do not
/// fail a `<=` budget check through rounding.
pub const STAR_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Players and teams
// ---------------------------------------------------------------------------

/// A player's standing within their team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Player,
    Captain,
    /// Non-playing role: a coach may sit on a roster but never fills a slot.
    Coach,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Captain => "captain",
            Role::Coach => "coach",
        }
    }

    /// Parse the lowercase storage form back into a role.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "player" => Some(Role::Player),
            "captain" => Some(Role::Captain),
            "coach" => Some(Role::Coach),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self, Role::Coach)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Continuous skill rating in `[MIN_STARS, MAX_STARS]`.
    pub stars: f64,
    pub active: bool,
    pub role: Role,
    /// Owning team, `None` while the player is in the undrafted pool.
    pub team: Option<TeamId>,
}

impl Player {
    pub fn is_undrafted(&self) -> bool {
        self.team.is_none()
    }
}

/// Clamp a rating into the legal star range.
pub fn clamp_stars(stars: f64) -> f64 {
    stars.clamp(MIN_STARS, MAX_STARS)
}

/// Sort players strongest first. Ties fall back to player id so the order is
/// stable across loads.
pub fn sort_by_strength(players: &mut [Player]) {
    players.sort_by(|a, b| {
        b.stars
            .partial_cmp(&a.stars)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub active: bool,
}

/// Aggregate view over a roster used by draft budgeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterAggregate {
    pub size: usize,
    pub total_stars: f64,
}

// ---------------------------------------------------------------------------
// Seasons, matchups and pairings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub number: u32,
    /// 0 while the draft is running; regular weeks start at 1.
    pub current_week: u32,
    pub regular_weeks: u32,
    pub playoff_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Where a matchup is played: numbered rooms during the regular season,
/// symbolic labels (`sf1`, `finals`) during the playoffs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    Numbered(u32),
    Named(String),
}

impl Room {
    /// Parse the storage label: digits are a numbered room, anything else a
    /// playoff label.
    pub fn parse(label: &str) -> Self {
        match label.parse::<u32>() {
            Ok(n) => Room::Numbered(n),
            Err(_) => Room::Named(label.to_string()),
        }
    }

    pub fn is_playoff(&self) -> bool {
        matches!(self, Room::Named(_))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Numbered(n) => write!(f, "{n}"),
            Room::Named(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub id: MatchupId,
    pub season: u32,
    pub week: u32,
    pub room: Room,
    pub left: TeamId,
    pub right: TeamId,
    /// Lineup size, fixed once either side submits.
    pub slots: Option<u32>,
    /// Number of pre-arranged top pairings, fixed alongside `slots`.
    pub rigged_count: Option<u32>,
    pub left_submitter: Option<PlayerId>,
    pub right_submitter: Option<PlayerId>,
    /// Set once the matchup's outcome has been rolled into standings.
    pub tallied: bool,
}

impl Matchup {
    /// Which side `team` plays on, if it is part of this matchup.
    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if team == self.left {
            Some(Side::Left)
        } else if team == self.right {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn submitter(&self, side: Side) -> Option<PlayerId> {
        match side {
            Side::Left => self.left_submitter,
            Side::Right => self.right_submitter,
        }
    }

    pub fn has_submission(&self) -> bool {
        self.left_submitter.is_some() || self.right_submitter.is_some()
    }
}

/// Outcome of a single pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingResult {
    Pending,
    Winner(PlayerId),
    /// Declared void; counts as a tie in player statistics.
    Dead,
}

impl PairingResult {
    pub fn is_decided(&self) -> bool {
        !matches!(self, PairingResult::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub id: PairingId,
    pub matchup: MatchupId,
    /// 1-based; slot 1 is the strongest pairing.
    pub slot: u32,
    pub left: Option<PlayerId>,
    pub right: Option<PlayerId>,
    pub result: PairingResult,
    /// Replay references. Empty on a decided pairing means an activity result.
    pub games: Vec<String>,
    /// Carried over and resolved one cycle late.
    pub extension: bool,
    pub reported_at: Option<DateTime<Utc>>,
}

impl Pairing {
    pub fn player(&self, side: Side) -> Option<PlayerId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Which side `player` occupies in this pairing.
    pub fn side_of(&self, player: PlayerId) -> Option<Side> {
        if self.left == Some(player) {
            Some(Side::Left)
        } else if self.right == Some(player) {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn holds(&self, player: PlayerId) -> bool {
        self.side_of(player).is_some()
    }

    /// The side that won, if the pairing has a winner.
    pub fn winning_side(&self) -> Option<Side> {
        match self.result {
            PairingResult::Winner(p) => self.side_of(p),
            _ => None,
        }
    }

    pub fn is_activity_result(&self) -> bool {
        matches!(self.result, PairingResult::Winner(_)) && self.games.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Draft and standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPick {
    pub id: PickId,
    pub season: u32,
    pub round: u32,
    /// 1-based position within the round.
    pub pick_order: u32,
    pub team: TeamId,
    pub player: Option<PlayerId>,
    pub picked_at: Option<DateTime<Utc>>,
}

impl DraftPick {
    pub fn is_filled(&self) -> bool {
        self.player.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub season: u32,
    pub team: TeamId,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Always `3 * wins + ties`.
    pub points: u32,
    pub battle_differential: i32,
}

impl Standing {
    pub fn new(season: u32, team: TeamId) -> Self {
        Standing {
            season,
            team,
            wins: 0,
            losses: 0,
            ties: 0,
            points: 0,
            battle_differential: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: PlayerId, stars: f64) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            stars,
            active: true,
            role: Role::Player,
            team: None,
        }
    }

    #[test]
    fn role_parse_accepts_storage_form() {
        assert_eq!(Role::parse("captain"), Some(Role::Captain));
        assert_eq!(Role::parse(" Coach "), Some(Role::Coach));
        assert_eq!(Role::parse("player"), Some(Role::Player));
        assert_eq!(Role::parse("manager"), None);
        assert!(!Role::Coach.is_playing());
        assert!(Role::Captain.is_playing());
    }

    #[test]
    fn room_parse_distinguishes_numbered_and_named() {
        assert_eq!(Room::parse("3"), Room::Numbered(3));
        assert_eq!(Room::parse("sf1"), Room::Named("sf1".into()));
        assert!(Room::parse("finals").is_playoff());
        assert_eq!(Room::Numbered(7).to_string(), "7");
    }

    #[test]
    fn sort_by_strength_breaks_ties_by_id() {
        let mut players = vec![player(3, 4.0), player(2, 5.0), player(1, 4.0)];
        sort_by_strength(&mut players);
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn clamp_stars_bounds_rating() {
        assert_eq!(clamp_stars(0.2), MIN_STARS);
        assert_eq!(clamp_stars(7.5), MAX_STARS);
        assert_eq!(clamp_stars(3.3), 3.3);
    }

    #[test]
    fn pairing_sides_and_activity() {
        let pairing = Pairing {
            id: 1,
            matchup: 1,
            slot: 1,
            left: Some(10),
            right: Some(20),
            result: PairingResult::Winner(20),
            games: vec![],
            extension: false,
            reported_at: None,
        };
        assert_eq!(pairing.side_of(10), Some(Side::Left));
        assert_eq!(pairing.winning_side(), Some(Side::Right));
        assert!(pairing.is_activity_result());
        assert!(!pairing.holds(30));
    }
}
