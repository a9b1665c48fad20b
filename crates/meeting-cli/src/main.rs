//! `meet` CLI: check availability, find free slots and manage meetings.
//!
//! ## Usage
//!
//! ```sh
//! # Is everyone free?
//! meet --calendar team.json free -a alice@x.com,bob@x.com \
//!     --start 2026-03-16T10:00:00+05:30 --end 2026-03-16T11:00:00+05:30
//!
//! # Next free 30-minute slot today, and every one of them
//! meet --calendar team.json find-slot -a alice@x.com,bob@x.com -d 30
//! meet --calendar team.json slots -a alice@x.com,bob@x.com -d 30
//!
//! # Book the next free slot (or an explicit one with `schedule`)
//! meet --calendar team.json book -t "Sync" -a alice@x.com,bob@x.com -d 30
//!
//! # Move, rename or cancel
//! meet --calendar team.json reschedule <id> --start 2026-03-16T15:00:00+05:30
//! meet --calendar team.json cancel <id>
//!
//! # Agenda for a day or the current week
//! meet --calendar team.json agenda --date 2026-03-16
//! meet --google agenda --week
//! ```

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use meeting_engine::model::parse_instant;
use meeting_engine::{
    CalendarProvider, CalendarTools, Clock, EngineConfig, FixedClock, InMemoryProvider,
    SchedulingFacade, SystemClock, ToolReply,
};
use meeting_google::GoogleCalendarProvider;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "meet",
    version,
    about = "Find common free time and manage meetings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Calendar file used as the provider; saved after changes
    #[arg(long, global = true, conflicts_with = "google")]
    calendar: Option<PathBuf>,

    /// Use Google Calendar (token from GOOGLE_CALENDAR_ACCESS_TOKEN)
    #[arg(long, global = true)]
    google: bool,

    /// Treat this RFC 3339 instant as the current time
    #[arg(long, global = true)]
    now: Option<String>,

    /// Print the full reply as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether every attendee is free in a window
    Free {
        /// Comma-separated attendee emails
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Find the next free slot today
    FindSlot {
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,
        /// Length in minutes
        #[arg(short, long)]
        duration: f64,
    },
    /// List every free slot left today
    Slots {
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,
        #[arg(short, long)]
        duration: f64,
    },
    /// Create a meeting at a given start time
    Schedule {
        #[arg(short, long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,
        #[arg(long)]
        start: String,
        #[arg(short, long)]
        duration: f64,
    },
    /// Book the next free slot today
    Book {
        #[arg(short, long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,
        #[arg(short, long)]
        duration: f64,
    },
    /// Rename or move a meeting
    Reschedule {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        /// New length in minutes (keeps the current length if omitted)
        #[arg(short, long)]
        duration: Option<f64>,
    },
    /// Cancel a meeting and notify attendees
    Cancel { id: String },
    /// Show meetings for a day or the current week
    Agenda {
        /// YYYY-MM-DD (defaults to today)
        #[arg(long, conflicts_with = "week")]
        date: Option<String>,
        #[arg(long)]
        week: bool,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Schedule { .. }
                | Commands::Book { .. }
                | Commands::Reschedule { .. }
                | Commands::Cancel { .. }
        )
    }
}

/// The real clock, or a frozen one from `--now`.
enum CliClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl Clock for CliClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self {
            CliClock::System(clock) => clock.now(),
            CliClock::Fixed(clock) => clock.now(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let clock = match &cli.now {
        Some(raw) => CliClock::Fixed(FixedClock(
            parse_instant(raw).context("Invalid --now")?,
        )),
        None => CliClock::System(SystemClock::new(
            config.clock.zone().context("Invalid [clock] configuration")?,
        )),
    };

    let reply = match (&cli.calendar, cli.google) {
        (Some(path), false) => {
            let provider = InMemoryProvider::load(path)
                .with_context(|| format!("Failed to load calendar: {}", path.display()))?;
            let reply = run(&cli.command, &provider, config, clock);
            if cli.command.mutates() {
                save_calendar(&provider, path)?;
            }
            reply
        }
        (None, true) => {
            let provider = GoogleCalendarProvider::from_env()
                .context("Failed to set up Google Calendar")?;
            run(&cli.command, &provider, config, clock)
        }
        _ => bail!("Choose a calendar: --calendar <file> or --google"),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.message);
    }
    if !reply.success {
        process::exit(1);
    }
    Ok(())
}

fn run<P: CalendarProvider>(
    command: &Commands,
    provider: P,
    config: EngineConfig,
    clock: CliClock,
) -> ToolReply {
    let facade = SchedulingFacade::with_clock(provider, config, clock);
    let tools = CalendarTools::new(&facade);

    match command {
        Commands::Free {
            attendees,
            start,
            end,
        } => tools.check_availability(attendees, start, end),
        Commands::FindSlot {
            attendees,
            duration,
        } => tools.find_next_slot(attendees, *duration),
        Commands::Slots {
            attendees,
            duration,
        } => tools.list_available_slots(attendees, *duration),
        Commands::Schedule {
            title,
            description,
            attendees,
            start,
            duration,
        } => tools.schedule_meeting(title, description, attendees, start, *duration),
        Commands::Book {
            title,
            description,
            attendees,
            duration,
        } => tools.book_next_available(title, description, attendees, *duration),
        Commands::Reschedule {
            id,
            title,
            start,
            duration,
        } => tools.update_meeting(id, title.as_deref(), start.as_deref(), *duration),
        Commands::Cancel { id } => tools.delete_meeting(id),
        Commands::Agenda { date: _, week: true } => tools.events_for_week(),
        Commands::Agenda { date, week: false } => {
            let day = match date {
                Some(day) => day.clone(),
                None => facade.now().date_naive().to_string(),
            };
            tools.events_for_day(&day)
        }
    }
}

fn save_calendar(provider: &InMemoryProvider, path: &Path) -> Result<()> {
    provider
        .save(path)
        .with_context(|| format!("Failed to write calendar: {}", path.display()))?;
    debug!(path = %path.display(), "calendar saved");
    Ok(())
}

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "meeting_engine=debug,meeting_google=debug,meeting_cli=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
