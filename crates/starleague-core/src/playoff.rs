// Single-elimination playoff bracket: seeding, advancement and week names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Matchup, Room, TeamId};
use crate::season::playoff_rounds;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayoffError {
    #[error("playoff size {size} is not a power of two of at least 2")]
    InvalidSize { size: u32 },
    #[error("a playoff of {size} teams needs {size} ranked teams, found {teams}")]
    NotEnoughTeams { size: u32, teams: usize },
    #[error("the previous playoff round has no matchups")]
    EmptyRound,
    #[error("{winners} teams advanced, which cannot be paired")]
    OddBracket { winners: usize },
}

/// One matchup to create for a playoff round. `left` holds the better seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPairing {
    pub room: Room,
    pub left: TeamId,
    pub right: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advancement {
    Champion(TeamId),
    NextRound(Vec<BracketPairing>),
}

/// Seed numbers (1-based) in bracket order, so that adjacent entries meet in
/// the first round and seeds 1 and 2 can only meet in the final.
pub fn bracket_order(size: u32) -> Vec<u32> {
    let mut order = vec![1];
    while (order.len() as u32) < size {
        let next = order.len() as u32 * 2 + 1;
        order = order.iter().flat_map(|&seed| [seed, next - seed]).collect();
    }
    order
}

/// Room label for matchup `index` (0-based) of a round with `count` matchups.
pub fn room_label(count: usize, index: usize) -> Room {
    let n = index + 1;
    let label = match count {
        1 => "finals".to_string(),
        2 => format!("sf{n}"),
        4 => format!("qf{n}"),
        _ => format!("r{}-{n}", count * 2),
    };
    Room::Named(label)
}

/// Build the first playoff round from teams ranked best first.
pub fn seed(ranked: &[TeamId], playoff_size: u32) -> Result<Vec<BracketPairing>, PlayoffError> {
    if playoff_size < 2 || !playoff_size.is_power_of_two() {
        return Err(PlayoffError::InvalidSize { size: playoff_size });
    }
    if ranked.len() < playoff_size as usize {
        return Err(PlayoffError::NotEnoughTeams {
            size: playoff_size,
            teams: ranked.len(),
        });
    }

    let order = bracket_order(playoff_size);
    let count = order.len() / 2;
    Ok(order
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| BracketPairing {
            room: room_label(count, i),
            left: ranked[pair[0] as usize - 1],
            right: ranked[pair[1] as usize - 1],
        })
        .collect())
}

/// Resolve a finished round. The team with more weekly wins advances; equal
/// wins go to the better regular-season rank in `ranking`. Matchups are taken
/// in creation order, which is bracket order.
pub fn advance(
    previous_round: &[Matchup],
    team_wins: &HashMap<TeamId, u32>,
    ranking: &[TeamId],
) -> Result<Advancement, PlayoffError> {
    if previous_round.is_empty() {
        return Err(PlayoffError::EmptyRound);
    }

    let mut round: Vec<&Matchup> = previous_round.iter().collect();
    round.sort_by_key(|m| m.id);

    let rank_of = |team: TeamId| ranking.iter().position(|t| *t == team).unwrap_or(usize::MAX);
    let winners: Vec<TeamId> = round
        .iter()
        .map(|m| {
            let left = team_wins.get(&m.left).copied().unwrap_or(0);
            let right = team_wins.get(&m.right).copied().unwrap_or(0);
            if left > right || (left == right && rank_of(m.left) <= rank_of(m.right)) {
                m.left
            } else {
                m.right
            }
        })
        .collect();

    match winners.len() {
        1 => Ok(Advancement::Champion(winners[0])),
        n if n % 2 == 1 => Err(PlayoffError::OddBracket { winners: n }),
        n => {
            let count = n / 2;
            Ok(Advancement::NextRound(
                winners
                    .chunks(2)
                    .enumerate()
                    .map(|(i, pair)| {
                        let (left, right) = if rank_of(pair[1]) < rank_of(pair[0]) {
                            (pair[1], pair[0])
                        } else {
                            (pair[0], pair[1])
                        };
                        BracketPairing {
                            room: room_label(count, i),
                            left,
                            right,
                        }
                    })
                    .collect(),
            ))
        }
    }
}

/// Display name for `week`. Playoff weeks are named from the end backwards.
pub fn week_name(week: u32, regular_weeks: u32, playoff_size: u32) -> String {
    if week == 0 {
        return "Draft".to_string();
    }
    if week <= regular_weeks {
        return format!("Week {week}");
    }
    let final_week = regular_weeks + playoff_rounds(playoff_size);
    if week > final_week {
        return "Season complete".to_string();
    }
    match final_week - week {
        0 => "Finals".to_string(),
        1 => "Semifinals".to_string(),
        2 => "Quarterfinals".to_string(),
        remaining => format!("Round of {}", 1u64 << (remaining + 1)),
    }
}
