use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use greenhouse::clock::{ForcedWateringTimer, SharedClock, SystemClock};
use greenhouse::config::{ConfigOverrides, GreenhouseConfig};
use greenhouse::database;
use greenhouse::logging;
use greenhouse::poller::{LightGate, PollerSupervisor, SensorPollerFactory};
use greenhouse::pump::{Pump, PumpManager, PumpScheduler, SleepWindow};
use greenhouse::record::{RecordProcessor, record_queue};
use greenhouse::sensors::simulated::{
    LoggingPumpSwitch, SimulatedAdc, SimulatedCamera, SimulatedClimate,
};
use greenhouse::sensors::{
    CachingClimateSensor, CameraManager, LightSensor, SharedSensor, SoilMoistureSensor,
    ThreadSafeAdc,
};

/// How long the main loop idles when the record queue is empty.
const PROCESS_IDLE: Duration = Duration::from_millis(100);

const SOIL_MOISTURE_CHANNEL: u8 = 0;
const LIGHT_CHANNEL: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "greenhouse", version, about = "Automated greenhouse controller")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = "GREENHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds between sensor polls.
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Quiet hours during which the pump stays off. Repeatable.
    #[arg(long = "sleep-window", value_name = "HH:MM-HH:MM")]
    sleep_windows: Vec<SleepWindow>,

    /// Directory for stored records.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for photos.
    #[arg(long)]
    image_path: Option<PathBuf>,

    /// Water when soil moisture drops below this.
    #[arg(long)]
    moisture_threshold: Option<f64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            poll_interval_secs: self.poll_interval,
            sleep_windows: self.sleep_windows.clone(),
            data_dir: self.data_dir.clone(),
            image_path: self.image_path.clone(),
            moisture_threshold: self.moisture_threshold,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = GreenhouseConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.overrides());
    config.validate()?;

    let logging = logging::init_logging(&config.log_dir, config.log_filter.as_deref())?;
    let shutdown = CancellationToken::new();
    logging.start_retention_cleanup(shutdown.child_token());

    info!(
        poll_interval_secs = config.poll_interval_secs,
        data_dir = %config.data_dir.display(),
        log_dir = %logging.log_dir().display(),
        "greenhouse starting"
    );

    let result = run(&config, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = &result {
        error!(error = %e, "greenhouse exited with error");
    }
    result
}

async fn run(config: &GreenhouseConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let clock: SharedClock = SystemClock::shared();
    let zone = config.zone()?;
    let interval = config.poll_interval()?;

    let pool = database::open_database(&config.data_dir)
        .await
        .with_context(|| format!("opening database in {}", config.data_dir.display()))?;
    let stores = database::record_stores(&pool);
    let last_watering = stores.watering_events.latest_watering().await?;
    let (sender, receiver) = record_queue();
    let mut processor = RecordProcessor::new(receiver, stores);

    // Simulated hardware
    let adc = ThreadSafeAdc::shared(
        SimulatedAdc::new(20)
            .with_channel(SOIL_MOISTURE_CHANNEL, 520)
            .with_channel(LIGHT_CHANNEL, 700),
    );
    let climate = Arc::new(CachingClimateSensor::new(
        SimulatedClimate::new(22.0, 55.0),
        clock.clone(),
    ));
    let light: SharedSensor = Arc::new(LightSensor::new(adc.clone(), LIGHT_CHANNEL));

    let pump_scheduler = Arc::new(PumpScheduler::new(
        clock.clone(),
        zone,
        config.pump.sleep_windows.clone(),
    ));
    let mut pump_manager = PumpManager::new(
        Pump::new(Arc::new(LoggingPumpSwitch::default()), clock.clone()),
        pump_scheduler,
        config.pump.moisture_threshold,
        config.pump.pump_amount_ml,
        ForcedWateringTimer::new(clock.clone(), config.pump.forced_interval()),
    );
    pump_manager.resume_from_history(last_watering);

    let factory = SensorPollerFactory::new(clock.clone(), interval, sender);
    let mut pollers: Vec<PollerSupervisor> = vec![
        factory.create_temperature_poller(Arc::new(climate.temperature_sensor())),
        factory.create_humidity_poller(Arc::new(climate.humidity_sensor())),
        factory.create_ambient_light_poller(light.clone()),
        factory.create_soil_watering_poller(
            Arc::new(SoilMoistureSensor::new(adc.clone(), SOIL_MOISTURE_CHANNEL)),
            pump_manager,
        ),
    ];

    let camera = config.camera.enabled.then(|| {
        Arc::new(Mutex::new(CameraManager::new(
            &config.image_path,
            clock.clone(),
            zone,
            SimulatedCamera::default(),
        )))
    });
    if let Some(camera) = &camera {
        let light_gate = config.camera.min_light_pct.map(|min_light_pct| LightGate {
            sensor: light.clone(),
            min_light_pct,
        });
        pollers.push(factory.create_camera_poller(camera.clone(), light_gate));
    }
    drop(factory);

    for poller in &pollers {
        poller.start_async()?;
    }
    info!(pollers = pollers.len(), "All pollers started");

    processor
        .run_until(tokio::signal::ctrl_c(), &shutdown, PROCESS_IDLE)
        .await;

    for poller in &pollers {
        poller.stop();
    }
    for poller in &pollers {
        if let Err(e) = poller.join().await {
            warn!(poller = poller.name(), error = %e, "Poller ended with error");
        }
    }

    let stored = processor.drain().await?;
    info!(stored, "Flushed remaining records");

    if let Some(camera) = camera {
        camera.lock().close()?;
    }
    pool.close().await;
    info!("greenhouse stopped");
    Ok(())
}
