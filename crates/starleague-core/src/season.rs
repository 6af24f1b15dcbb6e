// Season clock: which phase the league is in and how weeks advance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LeagueRules;
use crate::model::Season;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("season {season} is complete; start a new season")]
    SeasonComplete { season: u32 },
}

/// League phase, derived from the week counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Draft,
    RegularSeason,
    Playoff,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Draft => "draft",
            Phase::RegularSeason => "regular season",
            Phase::Playoff => "playoff",
            Phase::Complete => "complete",
        }
    }
}

/// Number of single-elimination rounds needed for a bracket of `playoff_size`
/// teams: `ceil(log2(size))`, zero when there are no playoffs.
pub fn playoff_rounds(playoff_size: u32) -> u32 {
    if playoff_size <= 1 {
        0
    } else {
        u32::BITS - (playoff_size - 1).leading_zeros()
    }
}

/// Immutable snapshot passed into every engine call in place of ambient
/// "current season" state.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonContext {
    pub season: Season,
    pub rules: LeagueRules,
}

impl SeasonContext {
    pub fn new(season: Season, rules: LeagueRules) -> Self {
        SeasonContext { season, rules }
    }

    pub fn number(&self) -> u32 {
        self.season.number
    }

    pub fn week(&self) -> u32 {
        self.season.current_week
    }

    pub fn phase(&self) -> Phase {
        SeasonClock::new(self.season).phase()
    }
}

/// Drives phase transitions for a single season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonClock {
    season: Season,
}

impl SeasonClock {
    pub fn new(season: Season) -> Self {
        SeasonClock { season }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    /// Last week of the season, playoffs included.
    pub fn final_week(&self) -> u32 {
        self.season.regular_weeks + playoff_rounds(self.season.playoff_size)
    }

    pub fn phase(&self) -> Phase {
        let week = self.season.current_week;
        if week == 0 {
            Phase::Draft
        } else if week <= self.season.regular_weeks {
            Phase::RegularSeason
        } else if week <= self.final_week() {
            Phase::Playoff
        } else {
            Phase::Complete
        }
    }

    pub fn is_last_regular_week(&self) -> bool {
        self.season.current_week == self.season.regular_weeks
    }

    /// Move to the next week. Advancing out of the final playoff week (or out
    /// of the regular season when there are no playoffs) lands in `Complete`.
    pub fn advance(&self) -> Result<SeasonClock, ClockError> {
        if self.phase() == Phase::Complete {
            return Err(ClockError::SeasonComplete {
                season: self.season.number,
            });
        }
        Ok(SeasonClock {
            season: Season {
                current_week: self.season.current_week + 1,
                ..self.season
            },
        })
    }

    /// Jump straight to `Complete`, used once a champion is declared.
    pub fn complete(&self) -> SeasonClock {
        SeasonClock {
            season: Season {
                current_week: self.final_week() + 1,
                ..self.season
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(week: u32) -> Season {
        Season {
            number: 3,
            current_week: week,
            regular_weeks: 7,
            playoff_size: 4,
        }
    }

    #[test]
    fn playoff_rounds_is_ceil_log2() {
        assert_eq!(playoff_rounds(0), 0);
        assert_eq!(playoff_rounds(1), 0);
        assert_eq!(playoff_rounds(2), 1);
        assert_eq!(playoff_rounds(4), 2);
        assert_eq!(playoff_rounds(5), 3);
        assert_eq!(playoff_rounds(8), 3);
        assert_eq!(playoff_rounds(16), 4);
    }

    #[test]
    fn phases_follow_week_counter() {
        assert_eq!(SeasonClock::new(season(0)).phase(), Phase::Draft);
        assert_eq!(SeasonClock::new(season(1)).phase(), Phase::RegularSeason);
        assert_eq!(SeasonClock::new(season(7)).phase(), Phase::RegularSeason);
        assert_eq!(SeasonClock::new(season(8)).phase(), Phase::Playoff);
        assert_eq!(SeasonClock::new(season(9)).phase(), Phase::Playoff);
        assert_eq!(SeasonClock::new(season(10)).phase(), Phase::Complete);
    }

    #[test]
    fn advance_walks_through_every_phase() {
        let mut clock = SeasonClock::new(season(0));
        let mut phases = vec![clock.phase()];
        while clock.phase() != Phase::Complete {
            clock = clock.advance().unwrap();
            phases.push(clock.phase());
        }
        assert_eq!(phases.first(), Some(&Phase::Draft));
        assert_eq!(phases.iter().filter(|p| **p == Phase::Playoff).count(), 2);
        assert_eq!(clock.season().current_week, 10);
        assert_eq!(
            clock.advance(),
            Err(ClockError::SeasonComplete { season: 3 })
        );
    }

    #[test]
    fn no_playoffs_completes_after_regular_season() {
        let clock = SeasonClock::new(Season {
            playoff_size: 0,
            ..season(7)
        });
        assert!(clock.is_last_regular_week());
        assert_eq!(clock.advance().unwrap().phase(), Phase::Complete);
    }

    #[test]
    fn complete_jumps_past_final_week() {
        let clock = SeasonClock::new(season(8)).complete();
        assert_eq!(clock.phase(), Phase::Complete);
    }
}
