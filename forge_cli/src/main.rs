use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use forge_core::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Training load and periodization engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to the standard config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User to act as (defaults to [user] id from config)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current fatigue
    Fatigue,

    /// Record rest days
    Rest {
        /// Days rested (fractions allowed)
        days: f64,
    },

    /// Log sets of one exercise as a workout
    Log(LogArgs),

    /// Recommend a working weight
    Recommend {
        exercise: String,

        #[arg(long)]
        reps: u32,

        #[arg(long, default_value_t = 2)]
        rir: u32,
    },

    /// Recency-weighted fatigue per muscle group
    Muscles {
        /// Look-back window in days
        #[arg(long, default_value_t = 14)]
        days: u32,
    },

    /// Weekly volume against MEV/MAV/MRV
    Volume {
        /// Seed landmarks from the template of a training level first
        #[arg(long, value_name = "LEVEL")]
        init: Option<String>,

        /// Also write the summary as CSV
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },

    /// Set the landmarks of one muscle group
    Landmark {
        group: String,

        #[arg(long)]
        mev: f64,

        #[arg(long)]
        mav: f64,

        #[arg(long)]
        mrv: f64,
    },

    /// Create or show a periodized plan
    Plan {
        #[command(subcommand)]
        action: PlanCommand,
    },

    /// Check whether a deload is due
    Deload(DeloadArgs),
}

#[derive(Args)]
struct LogArgs {
    exercise: String,

    #[arg(long, default_value_t = 1)]
    sets: u32,

    #[arg(long)]
    reps: u32,

    #[arg(long, default_value_t = 0.0)]
    weight: f64,

    /// Reps in reserve of every set
    #[arg(long)]
    rir: Option<u32>,

    #[arg(long, default_value_t = 60)]
    duration: u32,
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Generate and activate a new plan
    Create {
        #[arg(long)]
        name: String,

        /// strength, hypertrophy, endurance or general-fitness
        #[arg(long)]
        goal: String,

        #[arg(long, default_value = "intermediate")]
        level: String,

        /// Sessions per week
        #[arg(long, default_value_t = 3)]
        frequency: u32,

        #[arg(long)]
        months: u32,

        /// First day of the plan (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// linear, block or undulating (defaults to the goal's template)
        #[arg(long = "type")]
        periodization: Option<String>,

        #[arg(long)]
        no_deloads: bool,

        /// Training weeks between deload weeks
        #[arg(long)]
        deload_every: Option<u32>,
    },

    /// Show today's position in the active plan
    Show,
}

#[derive(Args)]
struct DeloadArgs {
    #[arg(long, default_value = "intermediate")]
    level: String,

    #[arg(long, default_value = "hypertrophy")]
    goal: String,

    /// React to fatigue and volume instead of the calendar
    #[arg(long)]
    auto: bool,

    #[arg(long)]
    threshold: Option<f64>,

    /// Weeks between deloads
    #[arg(long)]
    frequency: Option<u32>,

    /// Record that a deload starts today instead of checking
    #[arg(long)]
    record: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        forge_core::logging::init_with_level("info");
    } else {
        forge_core::logging::init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let user = cli.user.clone().unwrap_or_else(|| config.user.id.clone());
    tracing::debug!("Data dir {} for user {}", data_dir.display(), user);

    let store = Arc::new(FileStore::open(&data_dir)?);
    let engine = TrainingEngine::new(store, config);
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Fatigue => {
            let state = engine.get_user_fatigue(&user);
            out.show(&state, |s| print_fatigue(s))
        }
        Commands::Rest { days } => {
            let state = engine.apply_rest_fatigue(&user, days)?;
            out.show(&state, |s| print_fatigue(s))
        }
        Commands::Log(args) => cmd_log(&engine, &user, args, &out),
        Commands::Recommend { exercise, reps, rir } => {
            let weight = engine.recommend_load(&user, &exercise, reps, rir)?;
            out.show(&weight, |w| match w {
                Some(w) => println!("{}: {} x{} @{} RIR", exercise, w, reps, rir),
                None => println!("No history for {} yet - log a set first.", exercise),
            })
        }
        Commands::Muscles { days } => {
            let scores = engine.recent_muscle_group_fatigue(&user, days)?;
            out.show(&scores, |scores| {
                for (group, score) in scores {
                    println!("  {:<10} {:>6.2}", group, score);
                }
            })
        }
        Commands::Volume { init, csv } => {
            if let Some(level) = init {
                engine.initialize_landmarks(&user, level.parse()?)?;
            }
            let rows = engine.get_volume_summary(&user)?;
            if let Some(path) = csv {
                forge_core::export::write_volume_summary_csv(&path, &rows)?;
            }
            out.show(&rows, |rows| print_volume(rows))
        }
        Commands::Landmark { group, mev, mav, mrv } => {
            let landmark = VolumeLandmark::new(user.as_str(), group.parse()?, mev, mav, mrv)?;
            let saved = engine.upsert_landmark(&user, landmark)?;
            out.show(&saved, |lm| {
                println!(
                    "✓ {}: MEV {} / MAV {} / MRV {}",
                    lm.muscle_group, lm.mev, lm.mav, lm.mrv
                )
            })
        }
        Commands::Plan { action } => cmd_plan(&engine, &user, action, &out),
        Commands::Deload(args) => cmd_deload(&engine, &user, args, &out),
    }
}

fn cmd_log(engine: &TrainingEngine<FileStore>, user: &str, args: LogArgs, out: &Output) -> Result<()> {
    let now = engine.now();
    let log = WorkoutLog {
        id: uuid::Uuid::new_v4(),
        user_id: user.to_string(),
        date: now,
        duration_minutes: args.duration,
        completed_sets: (0..args.sets)
            .map(|_| CompletedSet {
                exercise_id: args.exercise.clone(),
                reps: args.reps,
                weight: args.weight,
                rir: args.rir,
                timestamp: now,
            })
            .collect(),
    };

    let logged = engine.log_workout(&log)?;
    out.show(&logged, |l| {
        println!("✓ Logged {} x {}", args.sets, args.exercise);
        println!("  Intensity: {:.1}", l.intensity);
        println!("  Fatigue:   {:.1}", l.fatigue.current_fatigue);
    })
}

fn cmd_plan(
    engine: &TrainingEngine<FileStore>,
    user: &str,
    action: PlanCommand,
    out: &Output,
) -> Result<()> {
    match action {
        PlanCommand::Create {
            name,
            goal,
            level,
            frequency,
            months,
            start,
            periodization,
            no_deloads,
            deload_every,
        } => {
            let request = PlanRequest {
                name,
                goal: goal.parse()?,
                level: level.parse()?,
                frequency,
                duration_months: months,
                start_date: start.unwrap_or_else(|| engine.now().date_naive()),
                options: PlanOptions {
                    periodization_type: periodization.map(|p| p.parse()).transpose()?,
                    include_deloads: no_deloads.then_some(false),
                    deload_frequency: deload_every,
                },
            };
            let bundle = engine.create_periodized_plan(user, &request)?;
            out.show(&bundle, |b| print_plan(&b.macrocycle))
        }
        PlanCommand::Show => {
            let status = engine.get_active_plan(user)?;
            out.show(&status, |status| match status {
                Some(s) => {
                    print_plan(&s.plan.macrocycle);
                    println!();
                    println!(
                        "  Now: week {} ({}{})",
                        s.plan.microcycle.week_number,
                        s.plan.mesocycle.phase,
                        if s.plan.microcycle.is_deload { ", deload week" } else { "" }
                    );
                    if let Some(routine) = &s.plan.routine {
                        for day in routine.days_for(&s.plan.microcycle) {
                            let names: Vec<_> =
                                day.exercises.iter().map(|e| e.exercise_id.as_str()).collect();
                            println!("  {:<12} {}", day.name, names.join(", "));
                        }
                    }
                    print_deload(&s.deload_recommendation);
                }
                None => println!("No active plan. Create one with `forge plan create`."),
            })
        }
    }
}

fn cmd_deload(
    engine: &TrainingEngine<FileStore>,
    user: &str,
    args: DeloadArgs,
    out: &Output,
) -> Result<()> {
    if args.record {
        let record = engine.record_deload(user, None)?;
        return out.show(&record, |r| println!("✓ Deload recorded for {}", r.date));
    }

    let level: TrainingLevel = args.level.parse()?;
    let goal: Goal = args.goal.parse()?;
    let defaults = engine.default_schedule(level);
    let schedule = DeloadSchedule {
        auto_regulated: args.auto,
        fatigue_threshold: args.threshold.unwrap_or(defaults.fatigue_threshold),
        frequency_weeks: args.frequency.unwrap_or(defaults.frequency_weeks),
        ..defaults
    };

    let rec = engine.recommend_deload(user, level, goal, &schedule);
    out.show(&rec, |r| print_deload(r))
}

/// Human-readable or JSON output
struct Output {
    json: bool,
}

impl Output {
    fn show<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

fn print_fatigue(state: &UserFatigueState) {
    println!("Fatigue: {:.1} (baseline {:.1})", state.current_fatigue, state.baseline_fatigue);
    println!("  Recovery: {:.1} points/day", state.recovery_rate);
    println!("  Updated:  {}", state.last_updated.format("%Y-%m-%d %H:%M"));
}

fn print_volume(rows: &[VolumeSummary]) {
    println!(
        "  {:<10} {:>7} {:>5} {:>5} {:>5}  {}",
        "group", "sets/wk", "MEV", "MAV", "MRV", "status"
    );
    for row in rows {
        println!(
            "  {:<10} {:>7.1} {:>5} {:>5} {:>5}  {}",
            row.muscle_group, row.current_volume, row.mev, row.mav, row.mrv, row.status
        );
    }
    println!();
    for row in rows {
        println!("  • {}", row.recommendation);
    }
}

fn print_plan(macrocycle: &Macrocycle) {
    println!(
        "{} ({:?}, {} weeks, {} to {})",
        macrocycle.name,
        macrocycle.periodization_type,
        macrocycle.duration_weeks,
        macrocycle.start_date,
        macrocycle.end_date
    );
    for (i, meso) in macrocycle.meso_cycles.iter().enumerate() {
        // weeks() counts the deload week too
        let weeks = if meso.includes_deload {
            format!("{} + 1 deload weeks", meso.weeks().saturating_sub(1))
        } else {
            format!("{} weeks", meso.weeks())
        };
        println!("  {}. {:<10} {}", i + 1, meso.phase.to_string(), weeks);
    }
}

fn print_deload(rec: &DeloadRecommendation) {
    if rec.should_deload {
        println!("Deload: yes ({:?}, {:?})", rec.deload_type, rec.timing);
    } else {
        println!("Deload: not yet");
    }
    let codes: Vec<_> = rec.reason_codes.iter().map(|c| format!("{:?}", c)).collect();
    println!("  Reasons: {}", codes.join(", "));
}
