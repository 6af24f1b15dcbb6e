// SQLite persistence for the league: players, teams, draft, matchups and standings.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::draft::PickSlot;
use crate::model::{
    sort_by_strength, DraftPick, Matchup, MatchupId, Pairing, PairingId, PairingResult, PickId, Player, PlayerId,
    Role, RosterAggregate, Room, Season, Side, Standing, Team, TeamId, STAR_EPSILON,
};
use crate::standings::rank;
use crate::store::{Assignment, LeagueStore, MissingLineup};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS teams (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        name   TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS players (
        id      INTEGER PRIMARY KEY,
        name    TEXT NOT NULL,
        stars   REAL NOT NULL,
        active  INTEGER NOT NULL DEFAULT 1,
        role    TEXT NOT NULL DEFAULT 'player',
        team_id INTEGER REFERENCES teams(id)
    );

    CREATE TABLE IF NOT EXISTS seasons (
        number        INTEGER PRIMARY KEY,
        current_week  INTEGER NOT NULL,
        regular_weeks INTEGER NOT NULL,
        playoff_size  INTEGER NOT NULL,
        is_current    INTEGER NOT NULL DEFAULT 0,
        champion      INTEGER REFERENCES teams(id)
    );

    CREATE TABLE IF NOT EXISTS draft_picks (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        season     INTEGER NOT NULL,
        round      INTEGER NOT NULL,
        pick_order INTEGER NOT NULL,
        team_id    INTEGER NOT NULL REFERENCES teams(id),
        player_id  INTEGER REFERENCES players(id),
        picked_at  TEXT,
        UNIQUE(season, round, pick_order)
    );

    CREATE TABLE IF NOT EXISTS matchups (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        season          INTEGER NOT NULL,
        week            INTEGER NOT NULL,
        room            TEXT NOT NULL,
        left_team       INTEGER NOT NULL REFERENCES teams(id),
        right_team      INTEGER NOT NULL REFERENCES teams(id),
        slots           INTEGER,
        rigged_count    INTEGER,
        left_submitter  INTEGER,
        right_submitter INTEGER,
        tallied         INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS pairings (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        matchup_id   INTEGER NOT NULL REFERENCES matchups(id) ON DELETE CASCADE,
        slot         INTEGER NOT NULL,
        left_player  INTEGER,
        right_player INTEGER,
        winner       INTEGER,
        dead         INTEGER NOT NULL DEFAULT 0,
        games        TEXT NOT NULL DEFAULT '[]',
        extension    INTEGER NOT NULL DEFAULT 0,
        reported_at  TEXT,
        UNIQUE(matchup_id, slot)
    );

    CREATE TABLE IF NOT EXISTS standings (
        season              INTEGER NOT NULL,
        team_id             INTEGER NOT NULL REFERENCES teams(id),
        wins                INTEGER NOT NULL DEFAULT 0,
        losses              INTEGER NOT NULL DEFAULT 0,
        ties                INTEGER NOT NULL DEFAULT 0,
        points              INTEGER NOT NULL DEFAULT 0,
        battle_differential INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (season, team_id)
    );

    CREATE INDEX IF NOT EXISTS idx_matchups_season_week ON matchups(season, week);
    CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);
";

/// SQLite-backed league storage. All access goes through a single
/// connection guarded by a mutex; writes happen inside `transaction`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(SCHEMA)
            .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run `f` inside one SQL transaction. Any error rolls every write back.
    pub fn transaction<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin transaction")?;
        let out = {
            let store = SqliteStore { conn: &tx };
            f(&store)?
        };
        tx.commit().context("failed to commit transaction")?;
        Ok(out)
    }

    /// Run read-only queries without opening a transaction.
    pub fn read<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let conn = self.conn()?;
        f(&SqliteStore { conn: &conn })
    }
}

/// `LeagueStore` over a borrowed connection or open transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const PLAYER_COLUMNS: &str = "id, name, stars, active, role, team_id";
const MATCHUP_COLUMNS: &str = "id, season, week, room, left_team, right_team, slots, rigged_count, \
                               left_submitter, right_submitter, tallied";
const PAIRING_COLUMNS: &str = "p.id, p.matchup_id, p.slot, p.left_player, p.right_player, p.winner, p.dead, \
                               p.games, p.extension, p.reported_at";
const STANDING_COLUMNS: &str = "season, team_id, wins, losses, ties, points, battle_differential";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    let role: String = row.get(4)?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        stars: row.get(2)?,
        active: row.get(3)?,
        role: Role::parse(&role).ok_or_else(|| conversion_error(4, format!("unknown role '{role}'")))?,
        team: row.get(5)?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        active: row.get(2)?,
    })
}

fn pick_from_row(row: &Row<'_>) -> rusqlite::Result<DraftPick> {
    Ok(DraftPick {
        id: row.get(0)?,
        season: row.get(1)?,
        round: row.get(2)?,
        pick_order: row.get(3)?,
        team: row.get(4)?,
        player: row.get(5)?,
        picked_at: parse_timestamp(row.get(6)?),
    })
}

fn matchup_from_row(row: &Row<'_>) -> rusqlite::Result<Matchup> {
    let room: String = row.get(3)?;
    Ok(Matchup {
        id: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        room: Room::parse(&room),
        left: row.get(4)?,
        right: row.get(5)?,
        slots: row.get(6)?,
        rigged_count: row.get(7)?,
        left_submitter: row.get(8)?,
        right_submitter: row.get(9)?,
        tallied: row.get(10)?,
    })
}

fn pairing_from_row(row: &Row<'_>) -> rusqlite::Result<Pairing> {
    let winner: Option<PlayerId> = row.get(5)?;
    let dead: bool = row.get(6)?;
    let result = match (winner, dead) {
        (_, true) => PairingResult::Dead,
        (Some(w), false) => PairingResult::Winner(w),
        (None, false) => PairingResult::Pending,
    };
    let games_json: String = row.get(7)?;
    let games = serde_json::from_str::<Vec<String>>(&games_json)
        .map_err(|e| conversion_error(7, format!("invalid games list: {e}")))?;
    Ok(Pairing {
        id: row.get(0)?,
        matchup: row.get(1)?,
        slot: row.get(2)?,
        left: row.get(3)?,
        right: row.get(4)?,
        result,
        games,
        extension: row.get(8)?,
        reported_at: parse_timestamp(row.get(9)?),
    })
}

fn standing_from_row(row: &Row<'_>) -> rusqlite::Result<Standing> {
    Ok(Standing {
        season: row.get(0)?,
        team: row.get(1)?,
        wins: row.get(2)?,
        losses: row.get(3)?,
        ties: row.get(4)?,
        points: row.get(5)?,
        battle_differential: row.get(6)?,
    })
}

fn player_column(side: Side) -> &'static str {
    match side {
        Side::Left => "left_player",
        Side::Right => "right_player",
    }
}

fn submitter_column(side: Side) -> &'static str {
    match side {
        Side::Left => "left_submitter",
        Side::Right => "right_submitter",
    }
}

impl SqliteStore<'_> {
    fn query_players(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Player>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare player query")?;
        let players = stmt
            .query_map(params, player_from_row)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    fn query_matchups(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Matchup>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare matchup query")?;
        let matchups = stmt
            .query_map(params, matchup_from_row)
            .context("failed to query matchups")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map matchup rows")?;
        Ok(matchups)
    }

    fn query_pairings(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Pairing>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare pairing query")?;
        let pairings = stmt
            .query_map(params, pairing_from_row)
            .context("failed to query pairings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pairing rows")?;
        Ok(pairings)
    }

    fn query_picks(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<DraftPick>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare draft pick query")?;
        let picks = stmt
            .query_map(params, pick_from_row)
            .context("failed to query draft picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft pick rows")?;
        Ok(picks)
    }

    fn query_teams(&self, sql: &str) -> Result<Vec<Team>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare team query")?;
        let teams = stmt
            .query_map([], team_from_row)
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    fn load_standing(&self, season: u32, team: TeamId) -> Result<Standing> {
        let sql = format!("SELECT {STANDING_COLUMNS} FROM standings WHERE season = ?1 AND team_id = ?2");
        let standing = self
            .conn
            .query_row(&sql, params![season, team], standing_from_row)
            .optional()
            .context("failed to load standing")?;
        Ok(standing.unwrap_or_else(|| Standing::new(season, team)))
    }

    fn save_standing(&self, standing: &Standing) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO standings (season, team_id, wins, losses, ties, points, battle_differential)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(season, team_id) DO UPDATE SET
                    wins = excluded.wins,
                    losses = excluded.losses,
                    ties = excluded.ties,
                    points = excluded.points,
                    battle_differential = excluded.battle_differential",
                params![
                    standing.season,
                    standing.team,
                    standing.wins,
                    standing.losses,
                    standing.ties,
                    standing.points,
                    standing.battle_differential,
                ],
            )
            .context("failed to save standing")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LeagueStore
// ---------------------------------------------------------------------------

impl LeagueStore for SqliteStore<'_> {
    fn load_player(&self, id: PlayerId) -> Result<Option<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], player_from_row)
            .optional()
            .context("failed to load player")
    }

    fn load_roster(&self, team: TeamId) -> Result<Vec<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = ?1");
        let mut roster = self.query_players(&sql, params![team])?;
        sort_by_strength(&mut roster);
        Ok(roster)
    }

    fn load_roster_aggregate(&self, team: TeamId, captain_only: bool) -> Result<RosterAggregate> {
        let (size, total_stars): (i64, f64) = self
            .conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(stars), 0.0) FROM players
                 WHERE team_id = ?1 AND (?2 = 0 OR role = 'captain')",
                params![team, captain_only],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("failed to load roster aggregate")?;
        Ok(RosterAggregate {
            size: size as usize,
            total_stars,
        })
    }

    fn load_undrafted(&self, max_stars: f64) -> Result<Vec<Player>> {
        let sql = format!(
            "SELECT {PLAYER_COLUMNS} FROM players
             WHERE team_id IS NULL AND active = 1 AND stars <= ?1"
        );
        let mut players = self.query_players(&sql, params![max_stars + STAR_EPSILON])?;
        sort_by_strength(&mut players);
        Ok(players)
    }

    fn save_assignment(&self, id: PlayerId, assignment: &Assignment) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE players SET team_id = ?2, role = ?3, stars = ?4, active = ?5 WHERE id = ?1",
                params![
                    id,
                    assignment.team,
                    assignment.role.as_str(),
                    assignment.stars,
                    assignment.active,
                ],
            )
            .context("failed to save player assignment")?;
        if changed == 0 {
            bail!("no player with id {id}");
        }
        Ok(())
    }

    fn upsert_player(&self, id: PlayerId, name: &str, stars: f64, role: Role, active: bool) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO players (id, name, stars, role, active) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    stars = excluded.stars,
                    role = excluded.role,
                    active = excluded.active",
                params![id, name, stars, role.as_str(), active],
            )
            .context("failed to upsert player")?;
        Ok(())
    }

    fn create_team(&self, name: &str) -> Result<TeamId> {
        self.conn
            .execute("INSERT INTO teams (name) VALUES (?1)", params![name])
            .with_context(|| format!("failed to create team {name}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn load_teams(&self) -> Result<Vec<Team>> {
        self.query_teams("SELECT id, name, active FROM teams ORDER BY id")
    }

    fn load_active_teams(&self) -> Result<Vec<Team>> {
        self.query_teams("SELECT id, name, active FROM teams WHERE active = 1 ORDER BY id")
    }

    fn load_team(&self, id: TeamId) -> Result<Option<Team>> {
        self.conn
            .query_row(
                "SELECT id, name, active FROM teams WHERE id = ?1",
                params![id],
                team_from_row,
            )
            .optional()
            .context("failed to load team")
    }

    fn insert_pick_order(&self, season: u32, order: &[PickSlot]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO draft_picks (season, round, pick_order, team_id) VALUES (?1, ?2, ?3, ?4)")
            .context("failed to prepare pick order insert")?;
        for slot in order {
            stmt.execute(params![season, slot.round, slot.pick_order, slot.team])
                .with_context(|| format!("failed to insert pick {}.{}", slot.round, slot.pick_order))?;
        }
        Ok(())
    }

    fn load_picks(&self, season: u32) -> Result<Vec<DraftPick>> {
        self.query_picks(
            "SELECT id, season, round, pick_order, team_id, player_id, picked_at FROM draft_picks
             WHERE season = ?1 ORDER BY round, pick_order",
            params![season],
        )
    }

    fn next_unfilled_pick(&self, season: u32) -> Result<Option<DraftPick>> {
        Ok(self
            .query_picks(
                "SELECT id, season, round, pick_order, team_id, player_id, picked_at FROM draft_picks
                 WHERE season = ?1 AND player_id IS NULL ORDER BY round, pick_order LIMIT 1",
                params![season],
            )?
            .into_iter()
            .next())
    }

    fn next_unfilled_pick_for_team(&self, season: u32, team: TeamId) -> Result<Option<DraftPick>> {
        Ok(self
            .query_picks(
                "SELECT id, season, round, pick_order, team_id, player_id, picked_at FROM draft_picks
                 WHERE season = ?1 AND team_id = ?2 AND player_id IS NULL
                 ORDER BY round, pick_order LIMIT 1",
                params![season, team],
            )?
            .into_iter()
            .next())
    }

    fn commit_pick(&self, pick: PickId, player: PlayerId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE draft_picks SET player_id = ?2, picked_at = ?3 WHERE id = ?1 AND player_id IS NULL",
                params![pick, player, Utc::now().to_rfc3339()],
            )
            .context("failed to commit pick")?;
        if changed == 0 {
            bail!("pick {pick} does not exist or is already filled");
        }
        Ok(())
    }

    fn delete_unfilled_picks_for_team(&self, season: u32, team: TeamId) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM draft_picks WHERE season = ?1 AND team_id = ?2 AND player_id IS NULL",
                params![season, team],
            )
            .context("failed to delete unfilled picks")
    }

    fn create_matchup(&self, room: &Room, season: u32, week: u32, left: TeamId, right: TeamId) -> Result<MatchupId> {
        self.conn
            .execute(
                "INSERT INTO matchups (season, week, room, left_team, right_team) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![season, week, room.to_string(), left, right],
            )
            .context("failed to create matchup")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn load_matchup(&self, id: MatchupId) -> Result<Option<Matchup>> {
        let sql = format!("SELECT {MATCHUP_COLUMNS} FROM matchups WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], matchup_from_row)
            .optional()
            .context("failed to load matchup")
    }

    fn load_matchups_for_week(&self, season: u32, week: u32) -> Result<Vec<Matchup>> {
        let sql = format!("SELECT {MATCHUP_COLUMNS} FROM matchups WHERE season = ?1 AND week = ?2 ORDER BY id");
        self.query_matchups(&sql, params![season, week])
    }

    fn load_for_team_and_week(&self, season: u32, week: u32, team: TeamId) -> Result<Option<Matchup>> {
        let sql = format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups
             WHERE season = ?1 AND week = ?2 AND (left_team = ?3 OR right_team = ?3)
             ORDER BY id LIMIT 1"
        );
        Ok(self.query_matchups(&sql, params![season, week, team])?.into_iter().next())
    }

    fn load_untallied_matchups(&self, season: u32, week: u32) -> Result<Vec<Matchup>> {
        let sql = format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups
             WHERE season = ?1 AND week <= ?2 AND tallied = 0 ORDER BY week, id"
        );
        self.query_matchups(&sql, params![season, week])
    }

    fn load_missing_lineups(&self, season: u32, week: u32) -> Result<Vec<MissingLineup>> {
        let mut missing = Vec::new();
        for m in self.load_matchups_for_week(season, week)? {
            for side in [Side::Left, Side::Right] {
                if m.submitter(side).is_none() {
                    missing.push(MissingLineup {
                        matchup: m.id,
                        side,
                        team: m.team(side),
                    });
                }
            }
        }
        Ok(missing)
    }

    fn commit_lineup(
        &self,
        matchup: MatchupId,
        side: Side,
        players: &[PlayerId],
        rigged_count: u32,
        submitter: PlayerId,
    ) -> Result<()> {
        let column = player_column(side);
        let sql = format!(
            "INSERT INTO pairings (matchup_id, slot, {column}) VALUES (?1, ?2, ?3)
             ON CONFLICT(matchup_id, slot) DO UPDATE SET {column} = excluded.{column}"
        );
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare lineup insert")?;
        for (i, player) in players.iter().enumerate() {
            stmt.execute(params![matchup, i as u32 + 1, player])
                .with_context(|| format!("failed to write lineup slot {}", i + 1))?;
        }

        let sql = format!(
            "UPDATE matchups SET slots = ?2, rigged_count = ?3, {} = ?4 WHERE id = ?1",
            submitter_column(side)
        );
        let changed = self
            .conn
            .execute(&sql, params![matchup, players.len() as u32, rigged_count, submitter])
            .context("failed to record lineup submission")?;
        if changed == 0 {
            bail!("no matchup with id {matchup}");
        }
        Ok(())
    }

    fn clear_lineup(&self, matchup: MatchupId) -> Result<()> {
        self.conn
            .execute("DELETE FROM pairings WHERE matchup_id = ?1", params![matchup])
            .context("failed to delete pairings")?;
        self.conn
            .execute(
                "UPDATE matchups SET slots = NULL, rigged_count = NULL,
                    left_submitter = NULL, right_submitter = NULL
                 WHERE id = ?1",
                params![matchup],
            )
            .context("failed to clear lineup submissions")?;
        Ok(())
    }

    fn load_pairing(&self, id: PairingId) -> Result<Option<Pairing>> {
        let sql = format!("SELECT {PAIRING_COLUMNS} FROM pairings p WHERE p.id = ?1");
        Ok(self.query_pairings(&sql, params![id])?.into_iter().next())
    }

    fn load_pairings(&self, matchup: MatchupId) -> Result<Vec<Pairing>> {
        let sql = format!("SELECT {PAIRING_COLUMNS} FROM pairings p WHERE p.matchup_id = ?1 ORDER BY p.slot");
        self.query_pairings(&sql, params![matchup])
    }

    fn load_week_pairings(&self, season: u32, week: u32) -> Result<Vec<Pairing>> {
        let sql = format!(
            "SELECT {PAIRING_COLUMNS} FROM pairings p JOIN matchups m ON m.id = p.matchup_id
             WHERE m.season = ?1 AND m.week = ?2 ORDER BY m.id, p.slot"
        );
        self.query_pairings(&sql, params![season, week])
    }

    fn load_open_pairings(&self, season: u32, week: u32) -> Result<Vec<Pairing>> {
        let sql = format!(
            "SELECT {PAIRING_COLUMNS} FROM pairings p JOIN matchups m ON m.id = p.matchup_id
             WHERE m.season = ?1 AND m.week = ?2 AND p.winner IS NULL AND p.dead = 0
             ORDER BY m.id, p.slot"
        );
        self.query_pairings(&sql, params![season, week])
    }

    fn replace_pairing_player(&self, pairing: PairingId, side: Side, player: PlayerId) -> Result<()> {
        let sql = format!("UPDATE pairings SET {} = ?2 WHERE id = ?1", player_column(side));
        let changed = self
            .conn
            .execute(&sql, params![pairing, player])
            .context("failed to replace pairing player")?;
        if changed == 0 {
            bail!("no pairing with id {pairing}");
        }
        Ok(())
    }

    fn commit_result(&self, pairing: PairingId, result: &PairingResult, games: &[String]) -> Result<()> {
        let (winner, dead) = match result {
            PairingResult::Winner(w) => (Some(*w), false),
            PairingResult::Dead => (None, true),
            PairingResult::Pending => bail!("cannot commit a pending result"),
        };
        let games_json = serde_json::to_string(games).context("failed to serialize games")?;
        let changed = self
            .conn
            .execute(
                "UPDATE pairings SET winner = ?2, dead = ?3, games = ?4, reported_at = ?5 WHERE id = ?1",
                params![pairing, winner, dead, games_json, Utc::now().to_rfc3339()],
            )
            .context("failed to commit result")?;
        if changed == 0 {
            bail!("no pairing with id {pairing}");
        }
        Ok(())
    }

    fn undo_result(&self, pairing: PairingId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE pairings SET winner = NULL, dead = 0, games = '[]', reported_at = NULL WHERE id = ?1",
                params![pairing],
            )
            .context("failed to undo result")?;
        Ok(())
    }

    fn set_extension(&self, pairing: PairingId, extension: bool) -> Result<()> {
        self.conn
            .execute(
                "UPDATE pairings SET extension = ?2 WHERE id = ?1",
                params![pairing, extension],
            )
            .context("failed to set extension")?;
        Ok(())
    }

    fn mark_tallied(&self, matchup: MatchupId) -> Result<()> {
        self.conn
            .execute("UPDATE matchups SET tallied = 1 WHERE id = ?1", params![matchup])
            .context("failed to mark matchup tallied")?;
        Ok(())
    }

    fn ensure_standing(&self, season: u32, team: TeamId) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO standings (season, team_id) VALUES (?1, ?2)",
                params![season, team],
            )
            .context("failed to create standing")?;
        Ok(())
    }

    fn load_standings(&self, season: u32) -> Result<Vec<Standing>> {
        let sql = format!("SELECT {STANDING_COLUMNS} FROM standings WHERE season = ?1 ORDER BY team_id");
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare standings query")?;
        let standings = stmt
            .query_map(params![season], standing_from_row)
            .context("failed to query standings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map standing rows")?;
        Ok(standings)
    }

    fn load_top_standings(&self, season: u32, n: usize) -> Result<Vec<Standing>> {
        let mut ranked = rank(&self.load_standings(season)?);
        ranked.truncate(n);
        Ok(ranked)
    }

    fn apply_result(&self, season: u32, differential: i32, left: TeamId, right: TeamId) -> Result<()> {
        let mut left_standing = self.load_standing(season, left)?;
        left_standing.apply(differential);
        self.save_standing(&left_standing)?;

        let mut right_standing = self.load_standing(season, right)?;
        right_standing.apply(-differential);
        self.save_standing(&right_standing)
    }

    fn load_current_season(&self) -> Result<Option<Season>> {
        self.conn
            .query_row(
                "SELECT number, current_week, regular_weeks, playoff_size FROM seasons WHERE is_current = 1",
                [],
                |row| {
                    Ok(Season {
                        number: row.get(0)?,
                        current_week: row.get(1)?,
                        regular_weeks: row.get(2)?,
                        playoff_size: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("failed to load current season")
    }

    fn create_season(&self, season: &Season) -> Result<()> {
        self.conn
            .execute("UPDATE seasons SET is_current = 0", [])
            .context("failed to retire current season")?;
        self.conn
            .execute(
                "INSERT INTO seasons (number, current_week, regular_weeks, playoff_size, is_current)
                 VALUES (?1, ?2, ?3, ?4, 1)",
                params![
                    season.number,
                    season.current_week,
                    season.regular_weeks,
                    season.playoff_size,
                ],
            )
            .with_context(|| format!("failed to create season {}", season.number))?;
        Ok(())
    }

    fn advance_week(&self, season: u32, week: u32) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE seasons SET current_week = ?2 WHERE number = ?1",
                params![season, week],
            )
            .context("failed to advance week")?;
        if changed == 0 {
            bail!("no season {season}");
        }
        Ok(())
    }

    fn record_champion(&self, season: u32, team: TeamId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE seasons SET champion = ?2 WHERE number = ?1",
                params![season, team],
            )
            .context("failed to record champion")?;
        Ok(())
    }

    fn load_champion(&self, season: u32) -> Result<Option<TeamId>> {
        let champion: Option<Option<TeamId>> = self
            .conn
            .query_row(
                "SELECT champion FROM seasons WHERE number = ?1",
                params![season],
                |row| row.get(0),
            )
            .optional()
            .context("failed to load champion")?;
        Ok(champion.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::snake_order;

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn seed_league(db: &Database) -> (TeamId, TeamId) {
        db.transaction(|store| {
            let a = store.create_team("Alpha")?;
            let b = store.create_team("Bravo")?;
            store.create_season(&Season {
                number: 1,
                current_week: 0,
                regular_weeks: 3,
                playoff_size: 2,
            })?;
            for (id, stars) in [(1, 4.0), (2, 3.5), (3, 3.0), (11, 4.2), (12, 3.4), (13, 2.5)] {
                store.upsert_player(id, &format!("P{id}"), stars, Role::Player, true)?;
            }
            Ok((a, b))
        })
        .unwrap()
    }

    fn assign(db: &Database, player: PlayerId, team: TeamId, role: Role) {
        db.transaction(|store| {
            let mut p = store.load_player(player)?.unwrap();
            p.team = Some(team);
            p.role = role;
            store.save_assignment(player, &Assignment::of(&p))
        })
        .unwrap();
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(
            tables,
            vec!["draft_picks", "matchups", "pairings", "players", "seasons", "standings", "teams"]
        );
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = test_db();
        let result: Result<()> = db.transaction(|store| {
            store.create_team("Ghost")?;
            bail!("abort");
        });
        assert!(result.is_err());
        assert!(db.read(|store| store.load_teams()).unwrap().is_empty());
    }

    #[test]
    fn roster_and_aggregates_follow_assignments() {
        let db = test_db();
        let (a, _) = seed_league(&db);
        assign(&db, 1, a, Role::Captain);
        assign(&db, 3, a, Role::Player);

        db.read(|store| {
            let roster = store.load_roster(a)?;
            assert_eq!(roster.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);

            let all = store.load_roster_aggregate(a, false)?;
            assert_eq!(all.size, 2);
            assert!((all.total_stars - 7.0).abs() < 1e-9);

            let captain = store.load_roster_aggregate(a, true)?;
            assert_eq!(captain.size, 1);
            assert!((captain.total_stars - 4.0).abs() < 1e-9);

            let undrafted: Vec<PlayerId> = store.load_undrafted(3.5)?.iter().map(|p| p.id).collect();
            assert_eq!(undrafted, vec![2, 12, 13]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn picks_fill_in_snake_order() {
        let db = test_db();
        let (a, b) = seed_league(&db);
        db.transaction(|store| store.insert_pick_order(1, &snake_order(&[a, b], 2)))
            .unwrap();

        db.transaction(|store| {
            let first = store.next_unfilled_pick(1)?.unwrap();
            assert_eq!((first.round, first.pick_order, first.team), (1, 1, a));
            store.commit_pick(first.id, 2)?;
            assert!(store.commit_pick(first.id, 3).is_err());

            let next = store.next_unfilled_pick(1)?.unwrap();
            assert_eq!(next.team, b);
            let for_a = store.next_unfilled_pick_for_team(1, a)?.unwrap();
            assert_eq!((for_a.round, for_a.pick_order), (2, 2));

            assert_eq!(store.delete_unfilled_picks_for_team(1, a)?, 1);
            let picks = store.load_picks(1)?;
            assert_eq!(picks.len(), 3);
            assert!(picks[0].picked_at.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn lineups_results_and_clear() {
        let db = test_db();
        let (a, b) = seed_league(&db);
        db.transaction(|store| {
            let m = store.create_matchup(&Room::Numbered(1), 1, 1, a, b)?;
            assert_eq!(store.load_missing_lineups(1, 1)?.len(), 2);

            store.commit_lineup(m, Side::Left, &[1, 2], 0, 1)?;
            let missing = store.load_missing_lineups(1, 1)?;
            assert_eq!(
                missing,
                vec![MissingLineup {
                    matchup: m,
                    side: Side::Right,
                    team: b
                }]
            );

            store.commit_lineup(m, Side::Right, &[11, 12], 0, 11)?;
            let matchup = store.load_matchup(m)?.unwrap();
            assert_eq!((matchup.slots, matchup.rigged_count), (Some(2), Some(0)));
            assert_eq!(store.load_for_team_and_week(1, 1, b)?.map(|m| m.id), Some(m));

            let pairings = store.load_pairings(m)?;
            assert_eq!(pairings.len(), 2);
            assert_eq!((pairings[0].left, pairings[0].right), (Some(1), Some(11)));

            store.commit_result(pairings[0].id, &PairingResult::Winner(11), &["g1".to_string()])?;
            store.commit_result(pairings[1].id, &PairingResult::Dead, &[])?;
            assert!(store.load_open_pairings(1, 1)?.is_empty());

            let decided = store.load_pairing(pairings[0].id)?.unwrap();
            assert_eq!(decided.result, PairingResult::Winner(11));
            assert_eq!(decided.games, vec!["g1".to_string()]);
            assert!(decided.reported_at.is_some());

            store.undo_result(pairings[0].id)?;
            assert_eq!(store.load_open_pairings(1, 1)?.len(), 1);

            store.replace_pairing_player(pairings[1].id, Side::Left, 3)?;
            store.set_extension(pairings[1].id, true)?;
            let swapped = store.load_pairing(pairings[1].id)?.unwrap();
            assert_eq!(swapped.left, Some(3));
            assert!(swapped.extension);

            store.clear_lineup(m)?;
            assert!(store.load_pairings(m)?.is_empty());
            assert!(!store.load_matchup(m)?.unwrap().has_submission());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn standings_accumulate_and_rank() {
        let db = test_db();
        let (a, b) = seed_league(&db);
        db.transaction(|store| {
            store.ensure_standing(1, a)?;
            store.ensure_standing(1, b)?;
            store.apply_result(1, 1, a, b)?;
            store.apply_result(1, 0, a, b)?;

            let top = store.load_top_standings(1, 1)?;
            assert_eq!(top.len(), 1);
            assert_eq!(top[0].team, a);
            assert_eq!((top[0].wins, top[0].ties, top[0].points, top[0].battle_differential), (1, 1, 4, 1));

            let all = store.load_standings(1)?;
            let bravo = all.iter().find(|s| s.team == b).unwrap();
            assert_eq!((bravo.losses, bravo.ties, bravo.points, bravo.battle_differential), (1, 1, 1, -1));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn seasons_track_current_week_and_champion() {
        let db = test_db();
        let (a, _) = seed_league(&db);
        db.transaction(|store| {
            store.advance_week(1, 2)?;
            assert_eq!(store.load_current_season()?.unwrap().current_week, 2);

            let m = store.create_matchup(&Room::Named("finals".into()), 1, 2, a, a)?;
            store.mark_tallied(m)?;
            assert!(store.load_untallied_matchups(1, 2)?.is_empty());
            assert_eq!(store.load_matchup(m)?.unwrap().room, Room::Named("finals".into()));

            assert_eq!(store.load_champion(1)?, None);
            store.record_champion(1, a)?;
            assert_eq!(store.load_champion(1)?, Some(a));

            store.create_season(&Season {
                number: 2,
                current_week: 0,
                regular_weeks: 5,
                playoff_size: 4,
            })?;
            assert_eq!(store.load_current_season()?.unwrap().number, 2);
            Ok(())
        })
        .unwrap();
    }
}
