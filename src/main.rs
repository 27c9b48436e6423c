//! Pumpwatch - pump-test stopwatch
//!
//! Entry point for the console instrument. Without GPIO drivers linked in,
//! buttons are driven from the keyboard and the pulse sensors by simulated
//! pulse trains.

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use pumpwatch::cli::{self, Command, Key, RunOptions};
use pumpwatch::console::ConsoleDisplay;
use pumpwatch::signal::sim::{PulseTrain, PulseTrainHandle, SimulatedAnalog};
use pumpwatch::signal::source::probe_hardware;
use pumpwatch::signal::{AnalogInput, Capability, EdgeHandler, Pin};
use pumpwatch::time::Clock;
use pumpwatch::{AppConfig, MeasurementLog, MonotonicClock, Orchestrator};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Simulated flow sensor rate, about 330 l/min with the default calibration
const SIM_FLOW_HZ: f64 = 40.0;

/// Simulated engine pulse rate, 3000 1/min at one pulse per revolution
const SIM_RPM_HZ: f64 = 50.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pumpwatch=info".parse()?)
                .add_directive("pumpwatch_core=info".parse()?),
        )
        .init();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help();
            return Ok(());
        }
    };

    match command {
        Command::Version => {
            println!("pumpwatch {} (built {})", pumpwatch::VERSION, pumpwatch::BUILD_DATE);
            Ok(())
        }
        Command::Help => {
            cli::print_help();
            Ok(())
        }
        Command::WriteConfig(path) => {
            AppConfig::default().save(&path)?;
            println!("Configuration template written to {}", path.display());
            Ok(())
        }
        Command::ShowConfig(path) => {
            let config = AppConfig::load(&path);
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Run(options) => run(options),
    }
}

fn run(options: RunOptions) -> Result<()> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              Pumpwatch v{} - Pump Test Stopwatch        ║", pumpwatch::VERSION);
    println!("╚════════════════════════════════════════════════════════════╝");
    println!("Session started {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();

    let config = AppConfig::load(&options.config);
    let hardware = probe_hardware();
    if hardware.gpio.is_available() {
        warn!("GPIO present but no driver is linked in, buttons come from the keyboard");
    }

    let (analog, adc): (Capability, Option<Box<dyn AnalogInput>>) = if options.no_analog {
        (Capability::Unavailable, None)
    } else {
        // 0.4 V and 0.35 V read as 8 and 7 bar with the default calibration
        let adc: Box<dyn AnalogInput> = Box::new(SimulatedAnalog::new(0.4, 0.35).with_ripple(0.01));
        (Capability::Available, Some(adc))
    };

    let (mut orchestrator, edges) = Orchestrator::assemble(&config, analog, adc);
    orchestrator.add_sink(Box::new(MeasurementLog::new(config.logging.location.clone())));
    orchestrator.add_sink(Box::new(ConsoleDisplay::stdout()));
    info!(log = %config.logging.location.display(), "Measurement log ready");

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let mut buttons: HashMap<Pin, EdgeHandler> = HashMap::new();
    let mut trains: Vec<PulseTrainHandle> = Vec::new();
    for handler in edges {
        match handler.pin() {
            Pin::FlowPulse => trains.push(PulseTrain::spawn(handler, Arc::clone(&clock), SIM_FLOW_HZ)?),
            Pin::RpmPulse => {
                let hz = SIM_RPM_HZ * f64::from(config.revs.k);
                trains.push(PulseTrain::spawn(handler, Arc::clone(&clock), hz)?);
            }
            pin => {
                buttons.insert(pin, handler);
            }
        }
    }

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .ok();

    let consumer_running = Arc::clone(&running);
    let consumer_clock = Arc::clone(&clock);
    let consumer = std::thread::Builder::new().name("consumer".into()).spawn(move || {
        orchestrator.run(
            consumer_clock.as_ref(),
            &consumer_running,
            Duration::from_millis(pumpwatch::TICK_INTERVAL_MS),
        )
    })?;

    let (key_tx, key_rx) = crossbeam_channel::bounded::<Key>(16);
    std::thread::Builder::new().name("keyboard".into()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(key) = cli::parse_key(&line) {
                if key_tx.send(key).is_err() {
                    return;
                }
            }
        }
        let _ = key_tx.send(Key::Quit);
    })?;

    println!("Ready. Type a key and press Enter (see --help for keys). Ctrl+C or q to quit.");

    while running.load(Ordering::SeqCst) {
        match key_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Key::Quit) => break,
            Ok(Key::Press(pin)) => {
                if let Some(handler) = buttons.get_mut(&pin) {
                    if let Err(e) = handler.on_edge(clock.now()) {
                        warn!(?pin, error = %e, "Edge not delivered");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!();
    println!("Stopping...");
    running.store(false, Ordering::SeqCst);
    match consumer.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Consumer loop failed"),
        Err(_) => error!("Consumer thread panicked"),
    }
    for train in trains.iter_mut() {
        train.stop();
    }
    drop(buttons);
    println!("Done.");

    Ok(())
}
