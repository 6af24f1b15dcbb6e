// Configuration loading and parsing (config/league.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
    draft: DraftRules,
    lineup: LineupRules,
    season: SeasonDefaults,
    #[serde(default)]
    confirmation: ConfirmationSection,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfirmationSection {
    timeout_secs: u64,
}

impl Default for ConfirmationSection {
    fn default() -> Self {
        ConfirmationSection { timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

/// Draft budgeting parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DraftRules {
    pub rounds: u32,
    /// Round-1 budget before the captain's own rating is subtracted.
    pub r1_stars: f64,
    /// Total star budget for a full roster.
    pub max_stars: f64,
    pub max_roster: usize,
    /// Stars held back for every roster slot still to fill after this pick.
    #[serde(default = "default_reserve_per_slot")]
    pub reserve_per_slot: f64,
    /// Pool is exhausted once no active undrafted player at or below this
    /// rating remains.
    #[serde(default = "default_undrafted_star_cap")]
    pub undrafted_star_cap: f64,
}

fn default_reserve_per_slot() -> f64 {
    1.5
}

fn default_undrafted_star_cap() -> f64 {
    10.0
}

/// Star-parity tolerances for lineups and substitutions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineupRules {
    #[serde(default = "default_tolerance")]
    pub parity_tolerance: f64,
    #[serde(default = "default_tolerance")]
    pub substitution_tolerance: f64,
}

fn default_tolerance() -> f64 {
    0.7
}

impl Default for LineupRules {
    fn default() -> Self {
        LineupRules {
            parity_tolerance: default_tolerance(),
            substitution_tolerance: default_tolerance(),
        }
    }
}

/// Shape of a newly started season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeasonDefaults {
    pub regular_weeks: u32,
    pub playoff_size: u32,
}

/// Rules every engine call consults. Travels inside `SeasonContext`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueRules {
    pub draft: DraftRules,
    pub lineup: LineupRules,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league_name: String,
    pub rules: LeagueRules,
    pub season: SeasonDefaults,
    pub confirm_timeout_secs: u64,
    pub db_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// `base_dir`, without copying defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("league.toml");
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse league.toml contents. `path` is only used for error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: LeagueFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let db_path = if file.database.path.trim().is_empty() {
        default_db_path()?
    } else {
        PathBuf::from(file.database.path)
    };

    Ok(Config {
        league_name: file.league.name,
        rules: LeagueRules {
            draft: file.draft,
            lineup: file.lineup,
        },
        season: file.season,
        confirm_timeout_secs: file.confirmation.timeout_secs,
        db_path,
    })
}

/// Platform data directory location used when `[database] path` is empty.
fn default_db_path() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("org", "starleague", "starleague")
        .map(|dirs| dirs.data_dir().join("league.db"))
        .ok_or_else(|| ConfigError::ValidationError {
            field: "database.path".into(),
            message: "empty and no platform data directory is available".into(),
        })
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {}: {e}", path.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let draft = &config.rules.draft;
    if draft.rounds == 0 {
        return Err(invalid("draft.rounds", "must be greater than 0"));
    }
    if draft.max_roster < 2 {
        return Err(invalid(
            "draft.max_roster",
            format!("must be at least 2, got {}", draft.max_roster),
        ));
    }

    let star_fields: &[(&str, f64)] = &[
        ("draft.r1_stars", draft.r1_stars),
        ("draft.max_stars", draft.max_stars),
        ("draft.undrafted_star_cap", draft.undrafted_star_cap),
    ];
    for (name, val) in star_fields {
        if *val <= 0.0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }

    let tolerance_fields: &[(&str, f64)] = &[
        ("draft.reserve_per_slot", draft.reserve_per_slot),
        ("lineup.parity_tolerance", config.rules.lineup.parity_tolerance),
        (
            "lineup.substitution_tolerance",
            config.rules.lineup.substitution_tolerance,
        ),
    ];
    for (name, val) in tolerance_fields {
        if *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    if config.season.regular_weeks == 0 {
        return Err(invalid("season.regular_weeks", "must be greater than 0"));
    }
    let size = config.season.playoff_size;
    if size != 0 && (size < 2 || !size.is_power_of_two()) {
        return Err(invalid(
            "season.playoff_size",
            format!("must be 0 or a power of two >= 2, got {size}"),
        ));
    }

    if config.confirm_timeout_secs == 0 {
        return Err(invalid("confirmation.timeout_secs", "must be greater than 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"
        [league]
        name = "Test League"

        [draft]
        rounds = 5
        r1_stars = 9.0
        max_stars = 23.0
        max_roster = 6

        [lineup]
        parity_tolerance = 0.7

        [season]
        regular_weeks = 7
        playoff_size = 4

        [database]
        path = "league.db"
    "#;

    fn defaults_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../defaults")
    }

    fn parse(text: &str) -> Result<Config, ConfigError> {
        let config = parse_config(text, Path::new("league.toml"))?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn parses_valid_config_with_defaults() {
        let config = parse(VALID).expect("valid config");
        assert_eq!(config.league_name, "Test League");
        assert_eq!(config.rules.draft.max_roster, 6);
        assert!((config.rules.draft.reserve_per_slot - 1.5).abs() < f64::EPSILON);
        assert!((config.rules.draft.undrafted_star_cap - 10.0).abs() < f64::EPSILON);
        assert!((config.rules.lineup.substitution_tolerance - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.season.playoff_size, 4);
        assert_eq!(config.confirm_timeout_secs, 60);
        assert_eq!(config.db_path, PathBuf::from("league.db"));
    }

    #[test]
    fn shipped_defaults_are_valid() {
        let path = defaults_dir().join("league.toml");
        let text = fs::read_to_string(&path).expect("defaults/league.toml should exist");
        let config = parse(&text).expect("shipped defaults should validate");
        assert!(config.rules.draft.rounds > 0);
    }

    #[test]
    fn rejects_non_power_of_two_playoff_size() {
        let text = VALID.replace("playoff_size = 4", "playoff_size = 6");
        match parse(&text) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "season.playoff_size")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_zero_playoff_size() {
        let text = VALID.replace("playoff_size = 4", "playoff_size = 0");
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn rejects_tiny_roster() {
        let text = VALID.replace("max_roster = 6", "max_roster = 1");
        match parse(&text) {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "draft.max_roster"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_tolerance() {
        let text = VALID.replace("parity_tolerance = 0.7", "parity_tolerance = -0.1");
        assert!(matches!(
            parse(&text),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        assert!(matches!(
            parse("[league\nname ="),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("starleague_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_then_skips() {
        let tmp = std::env::temp_dir().join("starleague_config_copy");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/league.toml"), VALID).unwrap();
        fs::write(tmp.join("defaults/secrets.toml.example"), "x = 1").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/league.toml")]);
        assert!(!tmp.join("config/secrets.toml.example").exists());

        let again = ensure_config_files(&tmp).unwrap();
        assert!(again.is_empty());

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league_name, "Test League");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("starleague_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
