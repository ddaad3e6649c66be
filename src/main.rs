//! beatdate binary entrypoint: a line-oriented terminal front end over the game engine.

use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beatdate::{
    config::AppConfig,
    dao::{kv_store::FileStore, storage::KeyValueStore},
    dto::{
        leaderboard::LeaderboardView,
        outcome::{GameOutcome, PlaybackStatus, Redirect},
        phase::VisiblePhase,
        team::TeamInput,
    },
    error::GameError,
    provider::{InMemoryTrackProvider, TrackProvider},
    services::{leaderboard_service, playlist_service, session_service, team_service},
    state::{
        GameEngine, SharedEngine,
        game::{Answer, Team},
    },
};

/// Overrides the store file location from the config.
const STORE_PATH_ENV: &str = "BEATDATE_STORE_PATH";
/// Access token to seed the credentials record with.
const ACCESS_TOKEN_ENV: &str = "SPOTIFY_ACCESS_TOKEN";
/// JSON library served by the offline provider instead of the Web API.
const OFFLINE_LIBRARY_ENV: &str = "BEATDATE_OFFLINE_LIBRARY";

const HELP: &str = "\
commands:
  teams                 list registered teams
  team add <name>       register a team
  team rm <name>        remove a team
  playlist <link|id>    load, shuffle and select a playlist
  play                  start or resume the game
  before | after        answer for the active team (b / a)
  next                  move on after a result
  retry                 reload and replay the current track
  skip                  skip the current track
  show                  show the current screen
  board                 show the leaderboard
  reset                 forget the game (keeps the login)
  quit                  leave";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store_path = env::var_os(STORE_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| config.store_path.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("opening store {}", store_path.display()))?,
    );
    info!(path = %store_path.display(), "store opened");

    let provider = build_provider(&config, store.clone())?;
    let engine = GameEngine::new(config, store, provider);
    tokio::spawn(log_phase_changes(engine.clone()));

    println!("beatdate: guess whether each track came out before or after the year shown.");
    println!("type `help` for commands.");
    run_repl(&engine).await
}

/// Pick the offline library when configured, the Spotify Web API otherwise.
fn build_provider(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<Arc<dyn TrackProvider>> {
    if let Some(path) = env::var_os(OFFLINE_LIBRARY_ENV).map(PathBuf::from) {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading offline library {}", path.display()))?;
        let provider = InMemoryTrackProvider::from_json(&contents)
            .with_context(|| format!("parsing offline library {}", path.display()))?;
        info!(path = %path.display(), "using offline library");
        return Ok(Arc::new(provider));
    }

    spotify_provider(config, store)
}

#[cfg(feature = "spotify")]
fn spotify_provider(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<Arc<dyn TrackProvider>> {
    use std::time::Duration;

    use beatdate::provider::spotify::{SpotifyConfig, SpotifyProvider, SpotifyTokens};

    /// Lifetime assumed for a token passed through the environment.
    const SEEDED_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

    let token = env::var(ACCESS_TOKEN_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty());
    if let Some(token) = token {
        SpotifyTokens::new(token.trim(), SEEDED_TOKEN_LIFETIME)
            .save(store.as_ref())
            .context("saving access token")?;
        info!("seeded credentials from environment");
    }

    let provider = SpotifyProvider::new(SpotifyConfig::new(&config.spotify_api_base), store)
        .context("building Spotify client")?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "spotify"))]
fn spotify_provider(
    _config: &AppConfig,
    _store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<Arc<dyn TrackProvider>> {
    anyhow::bail!("built without the `spotify` feature; set {OFFLINE_LIBRARY_ENV} to an offline library")
}

async fn run_repl(engine: &SharedEngine) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let phase = VisiblePhase::from(&engine.phase().await);
        println!("[{phase}] >");
        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            return Ok(());
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, argument) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        match command {
            "quit" | "exit" => return Ok(()),
            "help" => println!("{HELP}"),
            _ => {
                if let Err(err) = dispatch(engine, command, argument).await {
                    print_error(&err);
                }
            }
        }
    }
}

async fn dispatch(engine: &SharedEngine, command: &str, argument: &str) -> Result<(), GameError> {
    let repository = engine.repository();

    match command {
        "teams" => print_teams(&team_service::list_teams(repository)),
        "team" => {
            let (action, name) = argument.split_once(' ').unwrap_or((argument, ""));
            let teams = match action {
                "add" => team_service::add_team(repository, TeamInput::new(name))?,
                "rm" | "remove" => team_service::remove_team(repository, name)?,
                _ => {
                    return Err(GameError::InvalidInput(
                        "usage: team add <name> | team rm <name>".into(),
                    ));
                }
            };
            print_teams(&teams);
        }
        "playlist" => {
            let playlist = playlist_service::load_playlist(engine.provider(), argument).await?;
            println!(
                "{} by {} ({} tracks)",
                playlist.name,
                playlist.owner,
                playlist.tracks.len()
            );
            playlist_service::use_playlist(repository, playlist, &mut rand::rng())?;
            println!("playlist selected; type `play` to start.");
        }
        "play" => print_outcome(&session_service::bootstrap(engine).await?),
        "next" => print_outcome(&session_service::next(engine).await?),
        "retry" => print_outcome(&session_service::retry_track(engine).await?),
        "skip" => print_outcome(&session_service::skip_track(engine).await?),
        "show" => print_outcome(&session_service::current_view(engine).await?),
        "board" => print_leaderboard(&leaderboard_service::leaderboard(engine).await),
        "reset" => {
            let redirect = session_service::reset(engine).await?;
            print_redirect(redirect);
        }
        other => match other.parse::<Answer>() {
            Ok(answer) => print_outcome(&session_service::submit_answer(engine, answer).await?),
            Err(_) => println!("unknown command `{other}`; type `help`."),
        },
    }
    Ok(())
}

fn print_teams(teams: &[Team]) {
    if teams.is_empty() {
        println!("no teams yet; add one with `team add <name>`.");
        return;
    }
    for (index, team) in teams.iter().enumerate() {
        println!("  {}. {}", index + 1, team.name);
    }
}

fn print_outcome(outcome: &GameOutcome) {
    match outcome {
        GameOutcome::Question(view) => {
            println!(
                "track {}/{} for {}: {} by {} ({})",
                view.track_number,
                view.track_count,
                view.team,
                view.track.name,
                view.track.artists,
                view.track.album
            );
            match view.playback {
                PlaybackStatus::Started => {}
                PlaybackStatus::AlreadyPlayed => println!("  (already played on this device)"),
                PlaybackStatus::Failed => println!("  (playback failed; try `retry`)"),
            }
            for failure in &view.load_failures {
                println!("  {} failed: {}", failure.stage, failure.reason);
            }
            println!("released before or after {}?", view.comparison_year);
        }
        GameOutcome::Result(view) => {
            let verdict = if view.correct { "correct" } else { "wrong" };
            println!(
                "{verdict}! {} came out in {} ({} vs {}). {} now has {} point(s).",
                view.track.name,
                view.release_year,
                view.answer,
                view.comparison_year,
                view.team,
                view.score
            );
        }
        GameOutcome::Won(view) => {
            println!("{} wins with {} points!", view.winner, view.score);
            print_leaderboard(&view.leaderboard);
        }
        GameOutcome::PlaylistExhausted(board) => {
            print_leaderboard(board);
        }
    }
    if let Some(redirect) = outcome.redirect() {
        print_redirect(redirect);
    }
}

fn print_leaderboard(board: &LeaderboardView) {
    if board.entries.is_empty() {
        println!("no standings yet.");
        return;
    }
    for entry in &board.entries {
        let correct = entry.history.iter().filter(|line| line.correct).count();
        println!(
            "  #{} {} - {} point(s), {}/{} correct",
            entry.rank,
            entry.team,
            entry.score,
            correct,
            entry.history.len()
        );
    }
}

fn print_redirect(redirect: Redirect) {
    let hint = match redirect {
        Redirect::TeamSetup => "register teams with `team add <name>`.",
        Redirect::PlaylistSelection => "choose a playlist with `playlist <link>`.",
        Redirect::Victory => "game over; `reset` to play again.",
        Redirect::PlaylistReselection => {
            "the playlist ran out; pick another with `playlist <link>` then `play`."
        }
    };
    println!("{hint}");
}

fn print_error(err: &GameError) {
    match err.redirect() {
        Some(redirect) => print_redirect(redirect),
        None => match err {
            GameError::AuthenticationRequired => {
                println!("not logged in; set {ACCESS_TOKEN_ENV} and restart.")
            }
            other => println!("error: {other}"),
        },
    }
}

/// Log phase changes published by the engine.
async fn log_phase_changes(engine: SharedEngine) {
    let mut phases = engine.phase_watcher();
    while phases.changed().await.is_ok() {
        let phase = VisiblePhase::from(&*phases.borrow_and_update());
        debug!(%phase, "phase published");
    }
}

/// Configure tracing subscribers so logs go to stderr, away from the game text.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,beatdate=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
