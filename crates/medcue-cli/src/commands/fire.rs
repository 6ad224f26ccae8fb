//! Deliver a single firing immediately, the way a platform alarm would.

use std::sync::Arc;

use clap::Args;
use medcue_core::{
    on_alarm_fired, AlarmKind, Config, DeliveryPipeline, FiringPayload, MessageGenerator,
    MessageSource, OfflineMessageSource, ReminderDb,
};

use crate::sinks::{ConsoleCueSink, ConsoleSpeechSink};

#[derive(Args)]
pub struct FireArgs {
    /// Reminder ID to fire (looked up in the store)
    #[arg(long, conflicts_with = "name")]
    pub id: Option<String>,
    /// Medicine name for an ad-hoc firing
    #[arg(long)]
    pub name: Option<String>,
    /// Dosage for an ad-hoc firing
    #[arg(long, default_value = "")]
    pub dosage: String,
    /// Fire as the early alert instead of the main one
    #[arg(long)]
    pub early: bool,
    /// Minutes remaining to announce (early firings only)
    #[arg(long, default_value = "10")]
    pub minutes: i64,
    /// Skip the generation call and speak the offline fallback
    #[arg(long)]
    pub offline: bool,
}

pub fn run(args: FireArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let kind = if args.early {
        AlarmKind::Early
    } else {
        AlarmKind::Main
    };
    let minutes_remaining = if args.early { args.minutes } else { 0 };

    let payload = match (&args.id, &args.name) {
        (Some(id), _) => {
            let db = ReminderDb::open_default()?;
            let reminder = db
                .get(id)?
                .ok_or_else(|| format!("no reminder with id {id}"))?;
            FiringPayload::for_reminder(&reminder, kind, minutes_remaining)
        }
        (None, Some(name)) => FiringPayload {
            reminder_id: "adhoc".to_string(),
            medicine_name: name.clone(),
            dosage: args.dosage.clone(),
            kind,
            minutes_remaining,
            end_date: None,
        },
        (None, None) => return Err("provide --id or --name".into()),
    };

    let messages: Arc<dyn MessageSource> = if args.offline {
        Arc::new(OfflineMessageSource)
    } else {
        Arc::new(MessageGenerator::from_config(&config.generator)?)
    };
    let pipeline = DeliveryPipeline::new(
        messages,
        Arc::new(config),
        Arc::new(ConsoleCueSink),
        Arc::new(ConsoleSpeechSink),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(on_alarm_fired(&pipeline, payload))?;

    println!(
        "Delivered ({}, {} cue playbacks{})",
        report.language.display_name(),
        report.cue_playbacks,
        if report.used_fallback { ", fallback" } else { "" }
    );
    Ok(())
}
