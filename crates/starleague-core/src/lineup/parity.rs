// Star-parity rule: outside the rigged window a stronger player may not be
// seeded below a weaker one by more than the tolerance.

use crate::model::{Player, STAR_EPSILON};
use crate::validation::Violation;

/// The playing roster member ranked immediately below `player`, skipping
/// ties. `roster` must be sorted strongest first.
pub fn next_below<'a>(roster: &'a [Player], player: &Player) -> Option<&'a Player> {
    roster
        .iter()
        .filter(|p| p.role.is_playing())
        .find(|p| p.stars < player.stars - STAR_EPSILON)
}

/// Check every slot from `rigged_count` onwards against every later slot.
///
/// Slot `i` breaches parity when some later slot `j` holds a player more than
/// `tolerance` stars stronger, unless that player is exactly the one ranked
/// immediately below slot `i`'s player on the roster. One violation is
/// reported per offending slot, naming the first stronger player found.
pub fn parity_violations(
    lineup: &[Player],
    roster: &[Player],
    rigged_count: usize,
    tolerance: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for i in rigged_count..lineup.len() {
        let seeded = &lineup[i];
        let below = next_below(roster, seeded).map(|p| p.id);

        for (j, later) in lineup.iter().enumerate().skip(i + 1) {
            let gap = later.stars - seeded.stars;
            if gap <= tolerance + STAR_EPSILON {
                continue;
            }
            // Only reachable when the roster's ranking disagrees with the
            // lineup's star values; with one source for both it never is.
            if below == Some(later.id) {
                continue;
            }
            violations.push(Violation::StarParity {
                slot: i as u32 + 1,
                player: seeded.name.clone(),
                stronger_slot: j as u32 + 1,
                stronger: later.name.clone(),
                gap,
            });
            break;
        }
    }

    violations
}
