//! Arm stored reminders on the in-process dispatcher and deliver firings
//! as they come due.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use medcue_core::{
    on_alarm_fired, Config, DeliveryPipeline, MessageGenerator, MessageSource,
    OfflineMessageSource, ReminderDb, ReminderScheduler, TokioAlarmDispatcher,
};

use crate::sinks::{ConsoleCueSink, ConsoleSpeechSink};

#[derive(Args)]
pub struct RunArgs {
    /// Stop (cancelling remaining alarms) after this many minutes
    #[arg(long)]
    pub for_minutes: Option<u64>,
    /// Skip generation calls and speak offline fallbacks
    #[arg(long)]
    pub offline: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_loop(args))
}

async fn run_loop(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = ReminderDb::open_default()?;
    let reminders = db.list()?;

    let (dispatcher, mut fired_rx) = TokioAlarmDispatcher::new();
    let dispatcher = Arc::new(dispatcher);
    let scheduler = ReminderScheduler::new(dispatcher.clone());

    let mut pending = 0usize;
    for reminder in &reminders {
        let armed = scheduler.schedule(reminder)?;
        for registration in &armed {
            println!(
                "Armed {} for {}",
                registration.request_key,
                registration.fire_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        pending += armed.len();
    }
    if pending == 0 {
        println!("Nothing to arm.");
        return Ok(());
    }

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

    let deadline = args
        .for_minutes
        .map(|minutes| tokio::time::Instant::now() + Duration::from_secs(minutes * 60));

    while pending > 0 {
        let payload = match deadline {
            Some(deadline) => tokio::select! {
                fired = fired_rx.recv() => fired,
                _ = tokio::time::sleep_until(deadline) => {
                    println!("Time limit reached, cancelling remaining alarms.");
                    for reminder in &reminders {
                        scheduler.cancel(&reminder.id)?;
                    }
                    return Ok(());
                }
            },
            None => fired_rx.recv().await,
        };

        let Some(payload) = payload else { break };
        pending -= 1;
        match on_alarm_fired(&pipeline, payload).await {
            Ok(report) => {
                if report.used_fallback {
                    println!("(fallback message used)");
                }
            }
            // Speech failure is terminal for that firing only; keep serving
            // the rest.
            Err(e) => eprintln!("delivery failed: {e}"),
        }
    }

    println!("All armed reminders delivered.");
    Ok(())
}
