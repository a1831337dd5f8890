use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use cycle_core::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default number of journal entries shown
const JOURNAL_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "cyclecal")]
#[command(about = "Menstrual cycle tracker and forecaster", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Save cycle and period lengths, optionally marking the latest period
    Setup {
        #[arg(long)]
        cycle_length: u32,

        #[arg(long)]
        period_length: u32,

        /// First day of the latest period (YYYY-MM-DD)
        #[arg(long)]
        period_start: Option<String>,
    },

    /// Toggle a period day (YYYY-MM-DD)
    Toggle { date: String },

    /// Toggle a pregnancy day (YYYY-MM-DD)
    Pregnancy { date: String },

    /// Mark every day from START to END as period
    Range {
        start: String,
        end: String,

        /// Clear the period flag instead of setting it
        #[arg(long)]
        clear: bool,
    },

    /// Show predicted period, fertile and ovulation days
    Forecast {
        /// Forecast as of this date instead of today
        #[arg(long)]
        today: Option<String>,

        /// Project far enough to cover this date
        #[arg(long)]
        until: Option<String>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cycle summary (default)
    Status {
        #[arg(long)]
        today: Option<String>,
    },

    /// Print a month calendar
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        today: Option<String>,
    },

    /// Export recorded days to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Show recent edits
    Journal {
        #[arg(long, default_value_t = JOURNAL_LIMIT)]
        limit: usize,
    },
}

type Tracker = CycleTracker<FileStore, Local>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    cycle_core::logging::init_with_level(cycle_core::logging::level_for_verbosity(cli.verbose));

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let policy = config.forecast.policy()?;
    tracing::debug!("Using data directory {:?}", data_dir);

    let mut tracker = CycleTracker::with_forecaster(
        FileStore::in_dir(&data_dir),
        Forecaster::new(policy, Local),
    )
    .with_journal(JsonlJournal::in_dir(&data_dir));

    match cli.command {
        Some(Commands::Setup {
            cycle_length,
            period_length,
            period_start,
        }) => cmd_setup(&mut tracker, cycle_length, period_length, period_start),
        Some(Commands::Toggle { date }) => {
            let state = tracker.toggle_day(day_arg(&date)?)?;
            println!("{}: {}", date, describe_state(state));
            Ok(())
        }
        Some(Commands::Pregnancy { date }) => {
            let state = tracker.toggle_pregnancy_day(day_arg(&date)?)?;
            println!("{}: {}", date, describe_state(state));
            Ok(())
        }
        Some(Commands::Range { start, end, clear }) => {
            let changed = tracker.set_range(day_arg(&start)?, day_arg(&end)?, !clear)?;
            println!("✓ Updated {} days", changed);
            Ok(())
        }
        Some(Commands::Forecast { today, until, json }) => {
            cmd_forecast(&tracker, today_arg(today)?, until, json)
        }
        Some(Commands::Status { today }) => cmd_status(&tracker, today_arg(today)?),
        Some(Commands::Calendar { month, today }) => {
            cmd_calendar(&tracker, month, today_arg(today)?)
        }
        Some(Commands::Export { out }) => {
            let events = tracker.history()?;
            let count = export_csv(&events, &out, &Local)?;
            println!("✓ Exported {} days", count);
            println!("  CSV: {}", out.display());
            Ok(())
        }
        Some(Commands::Journal { limit }) => cmd_journal(&data_dir, limit),
        None => cmd_status(&tracker, DayKey::today()),
    }
}

fn day_arg(input: &str) -> Result<DayKey> {
    Ok(DayKey::from_date(parse_date(input)?))
}

fn today_arg(input: Option<String>) -> Result<DayKey> {
    match input {
        Some(date) => day_arg(&date),
        None => Ok(DayKey::today()),
    }
}

fn describe_state(state: DayState) -> &'static str {
    match state {
        DayState::None => "cleared",
        DayState::Period => "period",
        DayState::Pregnancy => "pregnancy",
    }
}

fn fmt_day(day: DayKey) -> String {
    day.date().format("%Y-%m-%d").to_string()
}

fn cmd_setup(
    tracker: &mut Tracker,
    cycle_length: u32,
    period_length: u32,
    period_start: Option<String>,
) -> Result<()> {
    let start = period_start.as_deref().map(day_arg).transpose()?;
    let profile = tracker.save_profile(cycle_length, period_length, start)?;

    println!("✓ Profile saved");
    println!("  Cycle length:  {} days", profile.cycle_length_days);
    println!("  Period length: {} days", profile.period_length_days);
    if let Some(start) = start {
        println!("  Latest period: {}", fmt_day(start));
    }
    Ok(())
}

fn cmd_forecast(tracker: &Tracker, today: DayKey, until: Option<String>, json: bool) -> Result<()> {
    let until = until.as_deref().map(day_arg).transpose()?;
    let forecast = tracker.forecast(today, until)?;

    let within = |days: &BTreeSet<DayKey>| -> Vec<DayKey> {
        days.iter()
            .copied()
            .filter(|day| until.map_or(true, |limit| *day <= limit))
            .collect()
    };
    let period_days = within(&forecast.predicted_period_days);
    let fertile_days = within(&forecast.fertile_days);
    let ovulation_days = within(&forecast.ovulation_days);

    if json {
        let dates = |days: &[DayKey]| days.iter().map(|d| fmt_day(*d)).collect::<Vec<_>>();
        let value = serde_json::json!({
            "today": fmt_day(today),
            "next_period_start": forecast.next_period_start.map(fmt_day),
            "cycle_length": forecast.inferred_cycle_length,
            "period_length": forecast.inferred_period_length,
            "current_cycle_day": forecast.current_cycle_day,
            "predicted_period_days": dates(&period_days),
            "fertile_days": dates(&fertile_days),
            "ovulation_days": dates(&ovulation_days),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let Some(next) = forecast.next_period_start else {
        println!("No period history yet - record a period or run `cyclecal setup`.");
        return Ok(());
    };

    println!("Next period: {}", fmt_day(next));
    if let (Some(cycle), Some(period)) = (
        forecast.inferred_cycle_length,
        forecast.inferred_period_length,
    ) {
        println!("Cycle length: {} days, period length: {} days", cycle, period);
    }
    println!();

    // Consecutive days print as one window
    for run in detect_runs(period_days) {
        println!("  period     {} .. {}", fmt_day(run.start), fmt_day(run.end));
    }
    for run in detect_runs(fertile_days) {
        println!("  fertile    {} .. {}", fmt_day(run.start), fmt_day(run.end));
    }
    for day in ovulation_days {
        println!("  ovulation  {}", fmt_day(day));
    }
    Ok(())
}

fn cmd_status(tracker: &Tracker, today: DayKey) -> Result<()> {
    let summary = tracker.summary(today)?;

    if summary.needs_setup() {
        println!("No period history yet.");
        println!("Run `cyclecal setup --cycle-length N --period-length N --period-start YYYY-MM-DD`.");
        return Ok(());
    }

    let source = if summary.from_profile { "profile" } else { "history" };
    if let Some(cycle) = summary.cycle_length {
        println!("Cycle length:  {} days ({})", cycle, source);
    }
    if let Some(period) = summary.period_length {
        println!("Period length: {} days ({})", period, source);
    }
    if let Some(run) = summary.latest_run {
        println!(
            "Latest period: {} .. {} ({} days)",
            fmt_day(run.start),
            fmt_day(run.end),
            run.length
        );
    }
    if let Some(day) = summary.current_cycle_day {
        println!("Cycle day:     {}", day);
    }
    if let Some(next) = summary.next_period_start {
        println!(
            "Next period:   {} (in {} days)",
            fmt_day(next),
            today.days_until_in(next, &Local)
        );
    }
    println!("Recorded periods: {}", summary.recorded_runs);
    Ok(())
}

fn cmd_calendar(tracker: &Tracker, month: Option<String>, today: DayKey) -> Result<()> {
    let (year, month) = match month {
        Some(input) => {
            let first = parse_date(&format!("{}-01", input.trim()))?;
            (first.year(), first.month())
        }
        None => {
            let date = today.date();
            (date.year(), date.month())
        }
    };

    let cells = tracker.month(year, month, today)?;
    let title = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();

    println!("{:^28}", title);
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    for week in cells.chunks(7) {
        let line: String = week
            .iter()
            .map(|cell| {
                if cell.in_month {
                    format!("{:>3}{}", cell.date.day(), cell.marker())
                } else {
                    "    ".to_string()
                }
            })
            .collect();
        println!("{}", line.trim_end());
    }
    println!();
    println!("* period  P pregnancy  ~ predicted  O ovulation  + fertile");
    Ok(())
}

fn cmd_journal(data_dir: &Path, limit: usize) -> Result<()> {
    let journal = JsonlJournal::in_dir(data_dir);
    let records = read_journal(journal.path())?;

    if records.is_empty() {
        println!("No edits recorded.");
        return Ok(());
    }

    let skip = records.len().saturating_sub(limit);
    for record in &records[skip..] {
        println!(
            "{}  {} ({} changes)",
            record.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            describe_edit(&record.edit),
            record.changes
        );
    }
    Ok(())
}

fn describe_edit(edit: &CycleEdit) -> String {
    match edit {
        CycleEdit::ToggleDay { day } => format!("toggle period {}", fmt_day(*day)),
        CycleEdit::TogglePregnancyDay { day } => format!("toggle pregnancy {}", fmt_day(*day)),
        CycleEdit::SetPeriodDay { day, is_period } => {
            format!("set period {} = {}", fmt_day(*day), is_period)
        }
        CycleEdit::SetPregnancyDay { day, is_pregnancy } => {
            format!("set pregnancy {} = {}", fmt_day(*day), is_pregnancy)
        }
        CycleEdit::SetRange {
            start,
            end,
            is_period,
        } => format!(
            "{} range {} .. {}",
            if *is_period { "mark" } else { "clear" },
            fmt_day(*start),
            fmt_day(*end)
        ),
        CycleEdit::SaveProfile {
            cycle_length_days,
            period_length_days,
            ..
        } => format!(
            "save profile cycle={} period={}",
            cycle_length_days, period_length_days
        ),
    }
}
