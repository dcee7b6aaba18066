use log::{error, info};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use uniport::config::{Config, load_dotenv};
use uniport::device::button::{self, EVENT_QUEUE_DEPTH};
use uniport::device::{Buttons, Device, OvenDevice};
use uniport::registry::Registry;
use uniport::shell::Shell;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn main() {
    // Environment changes must happen before the runtime starts its threads
    load_dotenv();
    init_logger();

    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run()),
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() {
    info!("Starting uniport");

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!(
        "  Button simulation: {} (every {} ms)",
        config.buttons.simulate, config.buttons.interval_ms
    );
    info!(
        "  Oven ambient: {}C, tick {} ms",
        config.oven.ambient_celsius, config.oven.tick_ms
    );

    // Devices register in this order
    let buttons = Arc::new(Buttons::new());
    let oven = OvenDevice::new(config.oven.ambient_celsius);

    let mut registry = Registry::new();
    let devices: [&dyn Device; 2] = [&*buttons, &oven];
    for device in devices {
        if let Err(e) = registry.register_device(device) {
            error!("Failed to register device {}: {}", device.name(), e);
            std::process::exit(1);
        }
    }
    let registry = Arc::new(registry);

    let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let simulation = config.buttons.simulate.then(|| {
        button::run_button_simulation(
            buttons.clone(),
            Duration::from_millis(config.buttons.interval_ms),
            event_tx.clone(),
        )
    });

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<String>();
    let mut shell = Shell::new(registry.clone(), output_tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut oven_tick = interval(Duration::from_millis(config.oven.tick_ms));

    info!("uniport is running, type \"help\" for commands");
    prompt(&config.console.prompt);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    shell.handle_line(&line);
                    // Flush command output before the next prompt
                    while let Ok(text) = output_rx.try_recv() {
                        println!("{text}");
                    }
                    prompt(&config.console.prompt);
                }
                Ok(None) => {
                    info!("End of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read console input: {}", e);
                    break;
                }
            },
            Some(event) = event_rx.recv() => {
                button::handle_event(&event);
            }
            Some(text) = output_rx.recv() => {
                println!("{text}");
            }
            _ = oven_tick.tick() => {
                oven.tick();
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break;
            }
        }
    }

    if let Some(task) = simulation {
        task.abort();
    }
    drop(shell);

    info!("uniport stopped");
}
