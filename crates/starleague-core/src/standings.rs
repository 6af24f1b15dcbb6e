// Standings: weekly tallies, matchup outcomes, ranking and per-player stats.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Matchup, MatchupId, Pairing, PairingResult, Player, PlayerId, Side, Standing, TeamId};

/// Points for a matchup win. A tie is worth one.
pub const WIN_POINTS: u32 = 3;
pub const TIE_POINTS: u32 = 1;

// ---------------------------------------------------------------------------
// Team standings
// ---------------------------------------------------------------------------

/// Count decided, non-dead pairings per winning team.
///
/// Only pairings belonging to `matchups` are considered. Teams without a
/// single win are absent from the map.
pub fn tally_week(matchups: &[Matchup], pairings: &[Pairing]) -> HashMap<TeamId, u32> {
    let by_id: HashMap<MatchupId, &Matchup> = matchups.iter().map(|m| (m.id, m)).collect();
    let mut wins = HashMap::new();

    for pairing in pairings {
        let Some(matchup) = by_id.get(&pairing.matchup) else {
            continue;
        };
        if let Some(side) = pairing.winning_side() {
            *wins.entry(matchup.team(side)).or_insert(0) += 1;
        }
    }
    wins
}

/// How one matchup finished, as the store's `apply_result` consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupOutcome {
    pub matchup: MatchupId,
    pub left: TeamId,
    pub right: TeamId,
    /// `left wins - right wins`.
    pub differential: i32,
}

impl MatchupOutcome {
    pub fn winner(&self) -> Option<TeamId> {
        match self.differential.cmp(&0) {
            Ordering::Greater => Some(self.left),
            Ordering::Less => Some(self.right),
            Ordering::Equal => None,
        }
    }
}

/// Turn per-team weekly win counts into one outcome per matchup.
pub fn update_standings(matchups: &[Matchup], team_wins: &HashMap<TeamId, u32>) -> Vec<MatchupOutcome> {
    let wins = |team: &TeamId| team_wins.get(team).copied().unwrap_or(0) as i32;
    matchups
        .iter()
        .map(|m| MatchupOutcome {
            matchup: m.id,
            left: m.left,
            right: m.right,
            differential: wins(&m.left) - wins(&m.right),
        })
        .collect()
}

impl Standing {
    /// Fold one matchup into this record. `differential` is from this team's
    /// point of view: positive for a win, negative for a loss, zero for a tie.
    pub fn apply(&mut self, differential: i32) {
        match differential.cmp(&0) {
            Ordering::Greater => {
                self.wins += 1;
                self.points += WIN_POINTS;
            }
            Ordering::Less => self.losses += 1,
            Ordering::Equal => {
                self.ties += 1;
                self.points += TIE_POINTS;
            }
        }
        self.battle_differential += differential;
    }
}

/// Apply `outcome` to both teams' records, creating zeroed records on demand.
pub fn apply_outcome(table: &mut HashMap<TeamId, Standing>, season: u32, outcome: &MatchupOutcome) {
    table
        .entry(outcome.left)
        .or_insert_with(|| Standing::new(season, outcome.left))
        .apply(outcome.differential);
    table
        .entry(outcome.right)
        .or_insert_with(|| Standing::new(season, outcome.right))
        .apply(-outcome.differential);
}

/// Order standings best first: points, then battle differential, then wins,
/// then lowest team id.
pub fn rank(standings: &[Standing]) -> Vec<Standing> {
    let mut ranked = standings.to_vec();
    ranked.sort_by(compare);
    ranked
}

fn compare(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(b.battle_differential.cmp(&a.battle_differential))
        .then(b.wins.cmp(&a.wins))
        .then(a.team.cmp(&b.team))
}

// ---------------------------------------------------------------------------
// Player statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u32,
    pub losses: u32,
    /// Results awarded without a game being played.
    pub act_wins: u32,
    pub act_losses: u32,
    pub ties: u32,
    pub star_points: i32,
}

/// Star points for a played win, by how much stronger the winner was.
pub fn spread(winner_stars: f64, loser_stars: f64) -> i32 {
    let gap = winner_stars - loser_stars;
    if gap > 1.0 {
        5
    } else if gap < -1.0 {
        15
    } else {
        10
    }
}

/// Derive per-player statistics from decided pairings. Pairings with an
/// empty side or a player missing from `players` are skipped.
pub fn player_stats(pairings: &[Pairing], players: &HashMap<PlayerId, Player>) -> HashMap<PlayerId, PlayerStats> {
    let mut stats: HashMap<PlayerId, PlayerStats> = HashMap::new();

    for pairing in pairings {
        let (Some(left), Some(right)) = (pairing.left, pairing.right) else {
            continue;
        };

        match &pairing.result {
            PairingResult::Pending => {}
            PairingResult::Dead => {
                stats.entry(left).or_default().ties += 1;
                stats.entry(right).or_default().ties += 1;
            }
            PairingResult::Winner(_) => {
                let Some(side) = pairing.winning_side() else {
                    continue;
                };
                let (winner, loser) = match side {
                    Side::Left => (left, right),
                    Side::Right => (right, left),
                };

                if pairing.is_activity_result() {
                    stats.entry(winner).or_default().act_wins += 1;
                    stats.entry(loser).or_default().act_losses += 1;
                    continue;
                }

                let (Some(w), Some(l)) = (players.get(&winner), players.get(&loser)) else {
                    continue;
                };
                let points = spread(w.stars, l.stars);
                let entry = stats.entry(winner).or_default();
                entry.wins += 1;
                entry.star_points += points;
                let entry = stats.entry(loser).or_default();
                entry.losses += 1;
                entry.star_points -= points;
            }
        }
    }
    stats
}
