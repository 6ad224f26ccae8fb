//! Reminder authoring commands.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use clap::Subcommand;
use medcue_core::{NewReminder, ReminderDb};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Create a new reminder
    Add {
        /// Medicine name
        name: String,
        /// Dosage (free text, e.g. "2 tablets")
        #[arg(long, default_value = "")]
        dosage: String,
        /// Scheduled instant, UTC, "YYYY-MM-DD HH:MM"
        #[arg(long, conflicts_with = "in_minutes")]
        at: Option<String>,
        /// Schedule this many minutes from now
        #[arg(long)]
        in_minutes: Option<i64>,
        /// Active window start date, "YYYY-MM-DD"
        #[arg(long)]
        start: Option<String>,
        /// Active window end date (inclusive), "YYYY-MM-DD"
        #[arg(long)]
        end: Option<String>,
    },
    /// List reminders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a reminder (its alarms are not re-armed on the next run)
    Delete {
        /// Reminder ID
        id: String,
    },
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = ReminderDb::open_default()?;
    match action {
        ReminderAction::Add {
            name,
            dosage,
            at,
            in_minutes,
            start,
            end,
        } => {
            let scheduled_time = match (at, in_minutes) {
                (Some(at), _) => NaiveDateTime::parse_from_str(&at, "%Y-%m-%d %H:%M")?.and_utc(),
                (None, Some(minutes)) => Utc::now() + Duration::minutes(minutes),
                (None, None) => return Err("provide --at or --in-minutes".into()),
            };
            let created = db.create(NewReminder {
                medicine_name: name,
                dosage,
                scheduled_time,
                start_date: parse_date(start)?,
                end_date: parse_date(end)?,
            })?;
            println!("Reminder created: {}", created.id);
            println!(
                "  {} ({}) at {}",
                created.medicine_name,
                created.dosage,
                created.scheduled_time.format("%Y-%m-%d %H:%M UTC")
            );
        }
        ReminderAction::List { json } => {
            let reminders = db.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            } else if reminders.is_empty() {
                println!("No reminders.");
            } else {
                for r in reminders {
                    let window = match (r.start_date, r.end_date) {
                        (Some(s), Some(e)) => format!("  {s} -> {e}"),
                        (Some(s), None) => format!("  from {s}"),
                        (None, Some(e)) => format!("  until {e}"),
                        (None, None) => String::new(),
                    };
                    println!(
                        "{}  {} ({})  {}{}",
                        r.id,
                        r.medicine_name,
                        r.dosage,
                        r.scheduled_time.format("%Y-%m-%d %H:%M UTC"),
                        window
                    );
                }
            }
        }
        ReminderAction::Delete { id } => {
            if db.delete(&id)? {
                println!("Reminder deleted: {id}");
            } else {
                println!("No reminder with id {id}");
            }
        }
    }
    Ok(())
}

fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>, Box<dyn std::error::Error>> {
    raw.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(Into::into)
}
