use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use science_rewards::csv::{CsvError, TimedEvent, read_events, write_treasury};
use science_rewards::{BatchQueue, ScienceBus, Treasury, WriterNotifier};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: science-rewards <events.csv> [--settings <file>] [--state <file>]";
const TICK_PERIOD: Duration = Duration::from_millis(20);

struct Args {
    events: PathBuf,
    settings: PathBuf,
    state: PathBuf,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Args> {
    let mut events = None;
    let mut settings = PathBuf::from("settings.json");
    let mut state = PathBuf::from("rewards-state.json");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => settings = args.next()?.into(),
            "--state" => state = args.next()?.into(),
            _ if events.is_none() && !arg.starts_with("--") => events = Some(PathBuf::from(&arg)),
            _ => return None,
        }
    }

    Some(Args {
        events: events?,
        settings,
        state,
    })
}

/// Publish every event after its delay; bad rows are skipped.
async fn feed(events: impl Iterator<Item = Result<TimedEvent, CsvError>>, bus: ScienceBus) {
    for result in events {
        match result {
            Ok(timed) => {
                tokio::time::sleep(timed.delay).await;
                bus.publish(timed.event).await;
            }
            Err(e) => {
                warn!("{e}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let Some(args) = parse_args(env::args().skip(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let events = match read_events(&args.events) {
        Ok(events) => events,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut queue = BatchQueue::with_settings_file(
        &args.settings,
        Treasury::default(),
        WriterNotifier::stdout(),
    );
    queue.load_from_path(&args.state);

    let bus = ScienceBus::default();
    let subscription = bus.subscribe();
    let subscription_id = subscription.id();

    let feeder = tokio::spawn(feed(events, bus.clone()));
    let detach = async {
        if let Err(e) = feeder.await {
            error!("event feeder stopped: {e}");
        }
        bus.unsubscribe(subscription_id);
    };
    tokio::join!(queue.run(subscription.into_stream(), TICK_PERIOD), detach);

    if let Err(e) = queue.save_to_path(&args.state) {
        error!("{e}");
    }
    if let Err(e) = write_treasury(io::stdout().lock(), queue.ledger()) {
        error!("failed to write treasury: {e}");
    }

    ExitCode::SUCCESS
}
