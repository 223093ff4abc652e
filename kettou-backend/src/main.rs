use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;

use kettou_backend::config::{BackendConfig, DEFAULT_CONFIG_PATH};
use kettou_backend::context::AppContext;
use kettou_backend::logging;
use kettou_backend::module::schedule::Schedule;
use kettou_backend::render;
use kettou_common::{RaceId, SearchEvent, Venue};

#[derive(Parser)]
#[command(name = "kettou-backend", about = "Search race entrants' pedigrees for reference names")]
struct Cli {
    /// Config file; defaults apply when it does not exist
    #[arg(long, env = "KETTOU_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one race, from the cache when possible
    Search {
        /// 12 digit race id, e.g. 202505020411
        race_id: String,
        /// Always fetch, then replace the cached rows
        #[arg(long)]
        no_cache: bool,
        /// Use local cache files only, never the remote sheet
        #[arg(long)]
        offline: bool,
        /// Print the stored HTML instead of plain lines
        #[arg(long, conflicts_with = "json")]
        html: bool,
        /// Print each event as one JSON line
        #[arg(long)]
        json: bool,
    },
    /// Build a race id from its parts
    RaceId {
        #[arg(long)]
        year: i32,
        /// Venue name (東京), code (05) or romanized name (tokyo)
        #[arg(long)]
        venue: Venue,
        /// 開催回
        #[arg(long)]
        meeting: u32,
        /// 日目
        #[arg(long)]
        day: u32,
        /// Race number, 1-12
        #[arg(long)]
        race: u32,
    },
    /// Browse the race calendar
    Schedule {
        /// Schedule CSV (default from config)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Race day (YYYY-MM-DD); lists recent and upcoming days when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// With --date and --race, print the race id
        #[arg(long, requires = "date")]
        venue: Option<Venue>,
        #[arg(long, requires = "venue")]
        race: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BackendConfig::load(&cli.config)?;

    let _logging_guard = logging::init_logging(&config.log_dir, "kettou-backend", &config.log_level)?;

    match cli.command {
        Commands::Search {
            race_id,
            no_cache,
            offline,
            html,
            json,
        } => search(&config, RaceId::new(race_id), !no_cache, offline, html, json).await,
        Commands::RaceId {
            year,
            venue,
            meeting,
            day,
            race,
        } => {
            let id = RaceId::compose(year, venue, meeting, day, race).map_err(anyhow::Error::msg)?;
            println!("{}", id);
            Ok(())
        }
        Commands::Schedule {
            csv,
            date,
            venue,
            race,
        } => {
            let path = csv.unwrap_or_else(|| config.reference.schedule_csv.clone());
            let schedule = Schedule::load_from_csv(&path).await?;
            show_schedule(&schedule, date, venue, race)
        }
    }
}

async fn search(
    config: &BackendConfig,
    race_id: RaceId,
    prefer_cache: bool,
    offline: bool,
    html: bool,
    json: bool,
) -> Result<()> {
    if !race_id.is_well_formed() {
        tracing::warn!("Race id '{}' is not 12 digits", race_id);
    }

    let ctx = AppContext::build(config, offline).await?;
    let search = ctx.race_search();

    tracing::info!("Searching race {}", race_id);
    let events = search.search(race_id.clone(), prefer_cache);
    futures::pin_mut!(events);

    let mut failure = None;
    while let Some(event) = events.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", render::describe_event(&event, html));
        }
        if let SearchEvent::ListingFailed { error } = &event {
            failure = Some(error.clone());
        }
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!("Search of race {} failed: {}", race_id, error)),
        None => Ok(()),
    }
}

fn show_schedule(
    schedule: &Schedule,
    date: Option<NaiveDate>,
    venue: Option<Venue>,
    race: Option<u32>,
) -> Result<()> {
    let Some(date) = date else {
        let today = chrono::Local::now().date_naive();
        for day in schedule.dates_within(today) {
            println!("{}", day);
        }
        return Ok(());
    };

    if let (Some(venue), Some(race)) = (venue, race) {
        println!("{}", schedule.race_id(date, venue, race)?);
        return Ok(());
    }

    let meetings = schedule.meetings_on(date);
    if meetings.is_empty() {
        println!("No races on {}", date);
    }
    for meeting in meetings.into_iter().filter(|m| venue.is_none_or(|v| v == m.venue)) {
        println!(
            "{} ({}): {}回 {}日目",
            meeting.venue,
            meeting.venue.code(),
            meeting.meeting,
            meeting.day
        );
    }
    Ok(())
}
