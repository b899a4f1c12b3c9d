use chrono::Datelike;
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use roundclock::{
    config::{Config, ConfigStore, FileConfigStore},
    prefs::PrefsDb,
    report::{write_report, OutputFormat},
    results::parse_highscores,
    source::{game_id_from_url, FileResultsSource, HttpResultsSource, ResultsSource},
    summarize_with,
    tags::{
        remove_yymm_tags, rewrite_locations, select_bad_locations, split_yymm_tags,
        CollectingSelection, Location, TagChecks,
    },
    InvalidSessionPolicy,
};
use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// round-timing statistics for challenge results and tag sanity checks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Summarizes how players paced themselves through a challenge (gaps between rounds, median and longest break, total time) and checks map locations for inconsistent date and car tags."
)]
pub struct Cli {
    /// increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// path to the config file (defaults to the platform config dir)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// summarize a saved highscores payload (`-` for stdin)
    Summarize {
        file: PathBuf,
        #[clap(flatten)]
        report: ReportArgs,
    },
    /// fetch highscores for a challenge and summarize them
    Fetch {
        /// challenge id or results page URL
        game: String,
        #[clap(flatten)]
        report: ReportArgs,
    },
    /// location tag tools
    #[clap(subcommand)]
    Tags(TagsCommand),
    /// per-map toggle for hiding "Meta -" tags
    #[clap(subcommand)]
    Meta(MetaCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// output format
    #[clap(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// include the per-round breakdown
    #[clap(long)]
    rounds: bool,

    /// drop sessions that cannot be summarized instead of failing
    #[clap(long)]
    skip_invalid: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagsCommand {
    /// print locations whose tags fail the enabled checks
    Check {
        file: PathBuf,
        #[clap(flatten)]
        checks: CheckArgs,
        /// treat this as the current year for year tags
        #[clap(long)]
        year: Option<i32>,
    },
    /// replace YY-M tags with YYYY and MM tags
    Split { file: PathBuf },
    /// remove YY-M tags
    Strip { file: PathBuf },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// flag locations without a year tag
    #[clap(long)]
    no_year: bool,
    /// flag locations with more than one year tag
    #[clap(long)]
    duplicate_year: bool,
    /// flag locations without a month tag
    #[clap(long)]
    no_month: bool,
    /// flag locations with more than one month tag
    #[clap(long)]
    duplicate_month: bool,
    /// flag locations without a car tag
    #[clap(long)]
    no_car: bool,
    /// flag locations with more than one car tag
    #[clap(long)]
    duplicate_car: bool,
    /// flag locations without a YY-M tag
    #[clap(long)]
    no_yymm: bool,
    /// flag locations with more than one YY-M tag
    #[clap(long)]
    duplicate_yymm: bool,
    /// flag locations without a copyright year tag
    #[clap(long)]
    no_copyright: bool,
    /// flag locations with more than one copyright year tag
    #[clap(long)]
    duplicate_copyright: bool,
    /// flag "Updated" locations whose YY-M tag doesn't look like newer coverage
    #[clap(long)]
    bad_update: bool,
    /// enable every check
    #[clap(long)]
    all: bool,
}

impl CheckArgs {
    fn to_tag_checks(&self) -> TagChecks {
        if self.all {
            return TagChecks::all();
        }
        TagChecks {
            no_year: self.no_year,
            duplicate_year: self.duplicate_year,
            no_month: self.no_month,
            duplicate_month: self.duplicate_month,
            no_car: self.no_car,
            duplicate_car: self.duplicate_car,
            no_yymm: self.no_yymm,
            duplicate_yymm: self.duplicate_yymm,
            no_copyright: self.no_copyright,
            duplicate_copyright: self.duplicate_copyright,
            bad_update: self.bad_update,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum MetaCommand {
    /// flip the toggle for a map and print the new state
    Toggle {
        map_id: String,
        #[clap(long)]
        db: Option<PathBuf>,
    },
    /// print the current state for a map
    Show {
        map_id: String,
        #[clap(long)]
        db: Option<PathBuf>,
    },
}

/// Effective report settings: CLI flags over config file values
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReportSettings {
    format: OutputFormat,
    show_rounds: bool,
    policy: InvalidSessionPolicy,
}

impl ReportSettings {
    fn resolve(args: &ReportArgs, cfg: &Config) -> Self {
        Self {
            format: args.format.unwrap_or(cfg.output_format),
            show_rounds: args.rounds || cfg.show_rounds,
            policy: if args.skip_invalid {
                InvalidSessionPolicy::Skip
            } else {
                cfg.invalid_sessions
            },
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let cfg = store.load();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Summarize { file, report } => {
            let source = FileResultsSource::new(file);
            run_summary(&source, ReportSettings::resolve(report, &cfg), &mut out)?;
        }
        Command::Fetch { game, report } => {
            let Some(game_id) = game_id_from_url(game) else {
                let mut cmd = Cli::command();
                cmd.error(
                    ErrorKind::ValueValidation,
                    format!("could not extract a game id from {game:?}"),
                )
                .exit();
            };
            let source = HttpResultsSource::new(game_id)?;
            run_summary(&source, ReportSettings::resolve(report, &cfg), &mut out)?;
        }
        Command::Tags(cmd) => run_tags(cmd, &cfg, &mut out)?,
        Command::Meta(cmd) => run_meta(cmd, &mut out)?,
    }

    out.flush()?;
    Ok(())
}

fn run_summary<S, W>(source: &S, settings: ReportSettings, out: &mut W) -> roundclock::Result<()>
where
    S: ResultsSource + ?Sized,
    W: Write,
{
    let highscores = parse_highscores(&source.load()?)?;
    if highscores.is_empty() {
        info!("No results found");
        return Ok(());
    }

    let sessions = highscores.into_sessions_with(settings.policy)?;
    let summaries = summarize_with(&sessions, settings.policy)?;
    info!(players = summaries.len(), "challenge summarized");
    write_report(out, &summaries, settings.format, settings.show_rounds)
}

fn read_locations(path: &Path) -> roundclock::Result<Vec<Location>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn run_tags<W: Write>(cmd: &TagsCommand, cfg: &Config, out: &mut W) -> roundclock::Result<()> {
    let (locations, file) = match cmd {
        TagsCommand::Check { file, .. } | TagsCommand::Split { file } | TagsCommand::Strip { file } => {
            (read_locations(file)?, file)
        }
    };

    let selected = match cmd {
        TagsCommand::Check { checks, year, .. } => {
            let checks = checks.to_tag_checks().merge(cfg.tag_checks);
            let current_year = year.unwrap_or_else(|| chrono::Local::now().year());
            let mut selection = CollectingSelection::default();
            select_bad_locations(&locations, &mut selection, &checks, current_year);
            selection.selected
        }
        TagsCommand::Split { .. } => rewrite_locations(&locations, split_yymm_tags),
        TagsCommand::Strip { .. } => rewrite_locations(&locations, remove_yymm_tags),
    };

    info!(
        file = %file.display(),
        total = locations.len(),
        matched = selected.len(),
        "tag pass finished"
    );
    serde_json::to_writer_pretty(&mut *out, &selected)?;
    writeln!(out)?;
    Ok(())
}

fn run_meta<W: Write>(cmd: &MetaCommand, out: &mut W) -> roundclock::Result<()> {
    let open = |db: &Option<PathBuf>| match db {
        Some(path) => PrefsDb::open_at(path),
        None => PrefsDb::open(),
    };

    match cmd {
        MetaCommand::Toggle { map_id, db } => {
            let hidden = open(db)?.toggle_meta_tags(map_id)?;
            writeln!(out, "{}", if hidden { "hidden" } else { "shown" })?;
        }
        MetaCommand::Show { map_id, db } => {
            let hidden = open(db)?.meta_tags_hidden(map_id)?;
            writeln!(out, "{}", if hidden { "hidden" } else { "shown" })?;
        }
    }
    Ok(())
}
