use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sensorwatch::config::{Settings, WeatherSettings};
use sensorwatch::feed::FilePushFeed;
use sensorwatch::report::summarize;
use sensorwatch::sched;
use sensorwatch_adapters::ambient::AmbientAdapter;
use sensorwatch_adapters::push::{PushAdapter, PushSource};
use sensorwatch_adapters::ubidots::{PlantConfig, UbidotsAdapter};
use sensorwatch_adapters::AdapterError;
use sensorwatch_types::SourceState;

#[derive(Parser, Debug)]
#[command(name = "sensorwatch")]
#[command(about = "Multi-source sensor telemetry watcher")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "sensorwatch.toml")]
    config: PathBuf,

    /// Plant id or name to poll (defaults to the first configured)
    #[arg(short, long)]
    plant: Option<String>,

    /// Weather poll interval in seconds (overrides configuration)
    #[arg(long)]
    weather_interval: Option<u64>,

    /// Push feed refresh interval in seconds (used with push.file)
    #[arg(short, long, default_value = "1")]
    refresh: u64,

    /// Run one collection pass per pollable source, print it, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)?;
    let plant = settings.select_plant(args.plant.as_deref())?.cloned();
    let weather_interval = Duration::from_secs(
        args.weather_interval.unwrap_or(settings.weather.poll_interval_secs),
    );

    if args.once {
        return run_once(&settings, plant.as_ref()).await;
    }

    // Push source: subscription worker plus the optional file feed
    // driving it.
    let (push_handle, push_source) = PushSource::channel(&settings.push.path);
    let push_worker = sched::spawn_push(PushAdapter::new(&settings.push.path), push_source);
    let feed_task = settings.push.file.clone().map(|path| {
        info!("push feed: watching {}", path.display());
        FilePushFeed::new(path).spawn(push_handle.clone(), Duration::from_secs(args.refresh.max(1)))
    });

    // Plant source: refetches when the selected plant changes. The
    // sender is kept so a future selection surface can switch plants.
    let (plant_worker, _plant_tx) = match plant {
        Some(plant) => {
            info!("plant `{}`: selected", plant.name);
            let (tx, rx) = watch::channel(plant);
            (sched::spawn_plant(UbidotsAdapter::builder().build(), rx), Some(tx))
        }
        None => {
            info!("no plants configured");
            (sched::static_source(SourceState::no_data()), None)
        }
    };

    // Weather source: missing credentials is terminal for this source
    // only; the other sources keep running.
    let weather_worker = match build_weather(&settings.weather) {
        Ok(adapter) => sched::spawn_weather(adapter, weather_interval),
        Err(e) => {
            error!("weather: {}", e);
            sched::static_source(SourceState::failed(e.to_string()))
        }
    };

    let mut push_rx = push_worker.state();
    let mut plant_rx = plant_worker.state();
    let mut weather_rx = weather_worker.state();

    println!("{}", summarize("push", &push_rx.borrow_and_update()));
    println!("{}", summarize("plant", &plant_rx.borrow_and_update()));
    println!("{}", summarize("weather", &weather_rx.borrow_and_update()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = push_rx.changed() => {
                if changed.is_err() { break; }
                println!("{}", summarize("push", &push_rx.borrow_and_update()));
            }
            changed = plant_rx.changed() => {
                if changed.is_err() { break; }
                println!("{}", summarize("plant", &plant_rx.borrow_and_update()));
            }
            changed = weather_rx.changed() => {
                if changed.is_err() { break; }
                println!("{}", summarize("weather", &weather_rx.borrow_and_update()));
            }
        }
    }

    info!("shutting down");
    push_worker.shutdown();
    plant_worker.shutdown();
    weather_worker.shutdown();
    if let Some(task) = feed_task {
        task.abort();
    }
    Ok(())
}

/// One collection pass per pollable source, printed and done. The push
/// source is included only when a file feed is configured; a live
/// subscription has nothing to deliver in a single pass.
async fn run_once(settings: &Settings, plant: Option<&PlantConfig>) -> Result<()> {
    match &settings.push.file {
        Some(path) => {
            let adapter = PushAdapter::new(&settings.push.path);
            let mut feed = FilePushFeed::new(path);
            let state = match feed.poll() {
                Some(collection) => match adapter.reduce(&collection) {
                    Ok(Some(frame)) => SourceState::ready(Some(frame.latest), frame.history),
                    Ok(None) => SourceState::no_data(),
                    Err(e) => SourceState::failed(e.to_string()),
                },
                None => SourceState::failed(
                    feed.error().unwrap_or("push feed returned nothing").to_string(),
                ),
            };
            println!("{}", summarize("push", &state));
        }
        None => println!("push: skipped (subscription source, no file feed configured)"),
    }

    match plant {
        Some(plant) => {
            let adapter = UbidotsAdapter::builder().build();
            let state = match adapter.collect(plant).await {
                Ok(data) => sched::plant_state(plant, data),
                Err(e) => SourceState::failed(e.to_string()),
            };
            println!("{}", summarize("plant", &state));
        }
        None => println!("plant: skipped (no plants configured)"),
    }

    let state = match build_weather(&settings.weather) {
        Ok(adapter) => match adapter.collect().await {
            Ok(Some(frame)) => SourceState::ready(Some(frame.latest), frame.history),
            Ok(None) => SourceState::no_data(),
            Err(e) => SourceState::failed(e.to_string()),
        },
        Err(e) => SourceState::failed(e.to_string()),
    };
    println!("{}", summarize("weather", &state));

    Ok(())
}

/// Build the weather adapter from settings. Absent credentials surface
/// as the builder's terminal configuration error.
fn build_weather(settings: &WeatherSettings) -> Result<AmbientAdapter, AdapterError> {
    let mut builder = AmbientAdapter::builder();
    if let Some(api_key) = &settings.api_key {
        builder = builder.api_key(api_key);
    }
    if let Some(application_key) = &settings.application_key {
        builder = builder.application_key(application_key);
    }
    if let Some(device_mac) = &settings.device_mac {
        builder = builder.device_mac(device_mac);
    }
    builder.build()
}
