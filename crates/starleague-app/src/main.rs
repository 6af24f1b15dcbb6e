// League engine entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is for command output)
// 2. Load config
// 3. Open database
// 4. Run one command through the league service

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use starleague_app::confirm::{AutoConfirm, ConfirmRequest, Confirmer};
use starleague_app::import;
use starleague_app::service::{League, Outcome};
use starleague_core::config;
use starleague_core::db::Database;
use starleague_core::model::{PairingId, PlayerId, TeamId};
use starleague_core::results::ReportedResult;
use starleague_core::store::LeagueStore;
use starleague_core::validation::Actor;
use tracing::info;

#[derive(Parser)]
#[command(name = "starleague")]
#[command(about = "Run a team league: draft, lineups, results and standings", long_about = None)]
struct Cli {
    /// Player id of whoever is acting
    #[arg(long, global = true, default_value = "0")]
    actor: PlayerId,

    /// Act without moderator privilege
    #[arg(long, global = true)]
    member: bool,

    /// Approve every confirmation prompt
    #[arg(long, short, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import the player pool from an `id,name,stars,role,active` CSV
    ImportPlayers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Register a team
    CreateTeam { name: String },
    /// Start a new season
    StartSeason {
        number: u32,
        #[arg(long)]
        weeks: Option<u32>,
        #[arg(long)]
        playoff_size: Option<u32>,
    },
    /// Set the snake draft order (first round order)
    DraftOrder {
        #[arg(value_delimiter = ',', required = true)]
        teams: Vec<TeamId>,
    },
    /// Draft a player
    Pick {
        player: PlayerId,
        /// Pick for whichever team is on the clock
        #[arg(long)]
        r#override: bool,
    },
    /// Withdraw a team from the rest of the draft
    Withdraw { team: TeamId },
    /// Generate the regular-season round robin
    Schedule,
    /// Submit a lineup, strongest slot first
    Lineup {
        team: TeamId,
        #[arg(value_delimiter = ',', required = true)]
        players: Vec<PlayerId>,
        #[arg(long, default_value = "0")]
        rigged: u32,
        /// Discard both sides' submissions first
        #[arg(long)]
        clear: bool,
    },
    /// Swap a player in this week's lineups
    Sub { outgoing: PlayerId, incoming: PlayerId },
    /// Report a pairing result
    Report {
        pairing: PairingId,
        #[arg(long, conflicts_with = "dead")]
        winner: Option<PlayerId>,
        #[arg(long)]
        dead: bool,
        /// Replay references; omit for an activity result
        #[arg(long = "game")]
        games: Vec<String>,
    },
    /// Clear a reported result
    Undo { pairing: PairingId },
    /// Extend a pairing past this week's close
    Extend {
        pairing: PairingId,
        #[arg(long)]
        off: bool,
    },
    /// Tally the week and move the season forward
    CloseWeek,
    /// Print the standings table
    Standings {
        #[arg(long)]
        json: bool,
    },
    /// List matchup sides still missing a lineup
    MissingLineups,
}

/// Asks on the terminal.
struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        let mut prompt = format!("{} needs confirmation:\n", request.action);
        for warning in &request.warnings {
            prompt.push_str(&format!("  - {warning}\n"));
        }
        prompt.push_str("proceed? [y/N] ");
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{prompt}");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;
        matches!(answer, Ok(Ok(line)) if line.trim().eq_ignore_ascii_case("y"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;
    info!("starleague starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: league={}", config.league_name);

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path.display());

    let actor = if cli.member {
        Actor::member(cli.actor)
    } else {
        Actor::moderator(cli.actor)
    };
    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirmer)
    };

    // 4. Run the command
    match cli.command {
        Command::ImportPlayers { csv } => {
            let file = std::fs::File::open(&csv).with_context(|| format!("failed to open {}", csv.display()))?;
            let rows = import::read_players(file)?;
            let count = import::import_players(&db, &rows)?;
            println!("imported {count} players");
        }
        Command::CreateTeam { name } => {
            let id = db.transaction(|store| {
                let id = store.create_team(&name)?;
                if let Some(season) = store.load_current_season()? {
                    store.ensure_standing(season.number, id)?;
                }
                Ok(id)
            })?;
            println!("team {name} created with id {id}");
        }
        command => {
            let league = League::new(db, &config, confirmer);
            run_league_command(&league, actor, command).await?;
        }
    }

    info!("starleague shut down cleanly");
    Ok(())
}

async fn run_league_command(league: &League, actor: Actor, command: Command) -> anyhow::Result<()> {
    match command {
        Command::StartSeason {
            number,
            weeks,
            playoff_size,
        } => print_outcome(
            league.start_season(actor, number, weeks, playoff_size, Vec::new()).await?,
            |plan| format!("season {} started; {} players released", plan.season.number, plan.released.len()),
        ),
        Command::DraftOrder { teams } => print_outcome(league.initialize_draft(actor, teams).await?, |n| {
            format!("draft order set: {n} picks")
        }),
        Command::Pick { player, r#override } => print_outcome(league.draft_pick(actor, player, r#override).await?, |c| {
            let mut line = format!("team {} drafted player {} in round {}", c.plan.team, c.plan.player, c.plan.round);
            if c.draft_complete {
                line.push_str("; the draft is complete");
            } else if c.pool_exhausted {
                line.push_str("; no eligible players remain");
            }
            line
        }),
        Command::Withdraw { team } => print_outcome(league.withdraw(actor, team).await?, |n| {
            format!("team {team} withdrawn; {n} picks removed")
        }),
        Command::Schedule => print_outcome(league.schedule_regular_season(actor).await?, |s| {
            format!("{} regular-season matchups scheduled", s.len())
        }),
        Command::Lineup {
            team,
            players,
            rigged,
            clear,
        } => print_outcome(league.submit_lineup(actor, team, players, rigged, clear).await?, |c| {
            format!("lineup saved; {} lineups still missing this week", c.missing.len())
        }),
        Command::Sub { outgoing, incoming } => print_outcome(league.substitute(actor, outgoing, incoming).await?, |p| {
            format!("player {} replaces {} in pairing {}", p.incoming, p.outgoing, p.pairing)
        }),
        Command::Report {
            pairing,
            winner,
            dead,
            games,
        } => {
            let reported = match (winner, dead) {
                (Some(winner), _) => ReportedResult::Winner(winner),
                (None, true) => ReportedResult::Dead,
                (None, false) => anyhow::bail!("pass --winner <id> or --dead"),
            };
            print_outcome(league.report_result(actor, pairing, reported, games).await?, |p| {
                format!("result recorded for pairing {}", p.pairing)
            })
        }
        Command::Undo { pairing } => print_outcome(league.undo_result(actor, pairing).await?, |p| {
            format!("result cleared for pairing {}", p.pairing)
        }),
        Command::Extend { pairing, off } => print_outcome(league.set_extension(actor, pairing, !off).await?, |p| {
            format!("pairing {} extension {}", p.pairing, if p.extension { "on" } else { "off" })
        }),
        Command::CloseWeek => {
            print_outcome(league.close_week(actor).await?, |plan| match plan.champion {
                Some(team) => format!("season {} complete; champion team {team}", plan.season),
                None => format!("week {} closed; now {}", plan.closed_week, plan.next_week),
            });
            if let Some(name) = league.current_week_name()? {
                println!("current week: {name}");
            }
        }
        Command::Standings { json } => {
            let table = league.standings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                println!("{:>4} {:>8} {:>4} {:>4} {:>4} {:>4} {:>6}", "#", "team", "pts", "w", "l", "t", "diff");
                for (i, s) in table.iter().enumerate() {
                    println!(
                        "{:>4} {:>8} {:>4} {:>4} {:>4} {:>4} {:>+6}",
                        i + 1,
                        s.team,
                        s.points,
                        s.wins,
                        s.losses,
                        s.ties,
                        s.battle_differential
                    );
                }
            }
        }
        Command::MissingLineups => {
            for missing in league.missing_lineups()? {
                println!("matchup {} {} side: team {}", missing.matchup, missing.side.as_str(), missing.team);
            }
        }
        Command::ImportPlayers { .. } | Command::CreateTeam { .. } => {}
    }
    Ok(())
}

fn print_outcome<T>(outcome: Outcome<T>, describe: impl FnOnce(T) -> String) {
    match outcome {
        Outcome::Committed(value) => println!("{}", describe(value)),
        Outcome::Rejected(reasons) => {
            println!("rejected:");
            for reason in reasons {
                println!("  - {reason}");
            }
        }
        Outcome::Cancelled => println!("cancelled"),
        Outcome::TimedOut => println!("confirmation timed out; nothing changed"),
        Outcome::Stale(reasons) => {
            println!("state changed before commit; nothing changed:");
            for reason in reasons {
                println!("  - {reason}");
            }
        }
    }
}

/// Initialize tracing to log to a file (stdout carries command output).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("starleague.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("starleague=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    Ok(())
}
