// Player pool import from CSV.

use std::io::Read;

use serde::Deserialize;
use starleague_core::db::Database;
use starleague_core::model::{PlayerId, Role, MAX_STARS, MIN_STARS};
use starleague_core::store::LeagueStore;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// One validated pool entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub id: PlayerId,
    pub name: String,
    pub stars: f64,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: PlayerId,
    name: String,
    stars: f64,
    #[serde(default)]
    role: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Parse `id,name,stars,role,active` rows. An empty role means `player`.
/// The first bad row fails the whole file; nothing is partially imported.
pub fn read_players<R: Read>(rdr: R) -> Result<Vec<PlayerRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        let raw = result?;
        // Header is line 1.
        let line = rows.len() as u64 + 2;

        let name = raw.name.trim().to_string();
        if name.is_empty() {
            return Err(ImportError::InvalidRow {
                line,
                message: "name is empty".into(),
            });
        }
        if !raw.stars.is_finite() || !(MIN_STARS..=MAX_STARS).contains(&raw.stars) {
            return Err(ImportError::InvalidRow {
                line,
                message: format!("stars {} outside {MIN_STARS}..={MAX_STARS}", raw.stars),
            });
        }
        let role = if raw.role.is_empty() {
            Role::Player
        } else {
            Role::parse(&raw.role).ok_or_else(|| ImportError::InvalidRow {
                line,
                message: format!("unknown role '{}'", raw.role),
            })?
        };

        rows.push(PlayerRow {
            id: raw.id,
            name,
            stars: raw.stars,
            role,
            active: raw.active,
        });
    }
    Ok(rows)
}

/// Insert or update every row in one transaction. Team assignments of
/// existing players are left alone.
pub fn import_players(db: &Database, rows: &[PlayerRow]) -> anyhow::Result<usize> {
    db.transaction(|store| {
        for row in rows {
            store.upsert_player(row.id, &row.name, row.stars, row.role, row.active)?;
        }
        Ok(())
    })?;
    info!("imported {} players into the pool", rows.len());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_with_defaults() {
        let csv = "id,name,stars,role,active\n\
                   1,Ada,4.5,captain,true\n\
                   2, Grace ,2.0,,false\n\
                   3,Linus,1.0,coach,true\n";
        let rows = read_players(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].role, Role::Captain);
        assert_eq!(rows[1].name, "Grace");
        assert_eq!(rows[1].role, Role::Player);
        assert!(!rows[1].active);
        assert_eq!(rows[2].role, Role::Coach);
    }

    #[test]
    fn out_of_range_stars_name_the_line() {
        let csv = "id,name,stars,role,active\n1,Ada,4.5,player,true\n2,Grace,7.5,player,true\n";
        match read_players(csv.as_bytes()) {
            Err(ImportError::InvalidRow { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("7.5"));
            }
            other => panic!("expected InvalidRow, got {other:?}"),
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let csv = "id,name,stars,role,active\n1,Ada,3.0,mascot,true\n";
        assert!(matches!(
            read_players(csv.as_bytes()),
            Err(ImportError::InvalidRow { line: 2, .. })
        ));
    }

    #[test]
    fn malformed_number_is_a_csv_error() {
        let csv = "id,name,stars,role,active\nabc,Ada,3.0,player,true\n";
        assert!(matches!(read_players(csv.as_bytes()), Err(ImportError::Csv(_))));
    }

    #[test]
    fn import_upserts_into_the_pool() {
        let db = Database::open(":memory:").unwrap();
        let rows = read_players("id,name,stars,role,active\n5,Ada,3.0,player,true\n".as_bytes()).unwrap();
        assert_eq!(import_players(&db, &rows).unwrap(), 1);

        let updated = read_players("id,name,stars,role,active\n5,Ada L.,3.5,captain,true\n".as_bytes()).unwrap();
        import_players(&db, &updated).unwrap();

        let player = db.read(|store| store.load_player(5)).unwrap().unwrap();
        assert_eq!(player.name, "Ada L.");
        assert_eq!(player.stars, 3.5);
        assert_eq!(player.role, Role::Captain);
        assert_eq!(player.team, None);
    }
}
