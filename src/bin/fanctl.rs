use std::fs;
use std::io::Write;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use exhaust_fan::monitor::{FanMonitor, Gesture, Notice};
use exhaust_fan::{Client, Config, DEFAULT_HISTORY_LIMIT, DEFAULT_SENSOR_LIMIT};
use log::warn;
use rustyline::error::ReadlineError;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Backend base URL, up to and including `/api`. Overrides FAN_API_URL.
    #[arg(long)]
    url: Option<String>,
    /// Overrides FAN_DEVICE_1.
    #[arg(long = "device-1")]
    device_1: Option<String>,
    /// Overrides FAN_DEVICE_2.
    #[arg(long = "device-2")]
    device_2: Option<String>,
    /// Request timeout in seconds. Overrides FAN_API_TIMEOUT_SECS.
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show both fans and control them from a prompt (the default).
    Interactive,
    /// Poll both fans and append snapshots to a zstd-compressed jsonl file.
    Record {
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
    /// List every device the backend knows about.
    Devices,
    /// Recent temperature readings for a fan (1, 2 or its id).
    Readings {
        device: String,
        #[arg(short, long, default_value_t = DEFAULT_SENSOR_LIMIT)]
        limit: u32,
    },
    /// Recent control commands for a fan (1, 2 or its id).
    History {
        device: String,
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },
    Health,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(id) = &self.device_1 {
            config.device_ids[0] = id.clone();
        }
        if let Some(id) = &self.device_2 {
            config.device_ids[1] = id.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.normalised()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = cli.config()?;
    let client = Client::with_config(&config)?;

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => interactive(client, &config).await,
        Command::Record { interval } => {
            record(&client, &config, Duration::from_secs(interval)).await
        }
        Command::Devices => devices(&client).await,
        Command::Readings { device, limit } => {
            readings(&client, &resolve(&config.device_ids, &device)?, limit).await
        }
        Command::History { device, limit } => {
            history(&client, &resolve(&config.device_ids, &device)?, limit).await
        }
        Command::Health => health(&client).await,
    }
}

const HELP: &str = "\
refresh                   fetch both fans again
fan <1|2> <on|off>        switch a fan (MANUAL mode only)
mode <1|2> <auto|manual>  change a fan's mode
devices                   list every device on the backend
readings <1|2> [limit]    recent temperature readings
history <1|2> [limit]     recent control commands
health                    backend health check
quit";

async fn interactive(client: Client, config: &Config) -> Result<()> {
    println!("Connecting to {}...", client.base_url());
    let mut monitor = FanMonitor::new(client, &config.device_ids);
    monitor.handle(Gesture::Refresh).await;
    show(&mut monitor);

    let mut rl = rustyline::Editor::<()>::new()?;
    loop {
        let line = match rl.readline("fans> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        rl.add_history_entry(line.as_str());

        let parts = line.split_whitespace().collect::<Vec<_>>();
        let outcome = match parts.as_slice() {
            [] => continue,
            ["quit" | "exit" | "q"] => break,
            ["help" | "?"] => {
                println!("{HELP}");
                continue;
            }
            parts => execute(&mut monitor, &config.device_ids, parts).await,
        };

        match outcome {
            Ok(()) => show(&mut monitor),
            Err(e) => println!("{}", format!("{e:#}").red()),
        }
    }

    Ok(())
}

async fn execute(
    monitor: &mut FanMonitor<Client>,
    ids: &[String; 2],
    parts: &[&str],
) -> Result<()> {
    match parts {
        ["show"] => {}
        ["refresh" | "r"] => {
            println!("{}", "Refreshing...".dim());
            monitor.handle(Gesture::Refresh).await;
        }
        ["fan", device, state] => {
            let gesture = Gesture::Power {
                device: resolve(ids, device)?,
                on: on_off(state)?,
            };
            monitor.handle(gesture).await;
        }
        ["mode", device, mode] => {
            let gesture = Gesture::Mode {
                device: resolve(ids, device)?,
                auto: auto_manual(mode)?,
            };
            monitor.handle(gesture).await;
        }
        ["devices"] => devices(monitor.api()).await?,
        ["readings", device, rest @ ..] => {
            let limit = limit(rest, DEFAULT_SENSOR_LIMIT)?;
            readings(monitor.api(), &resolve(ids, device)?, limit).await?;
        }
        ["history", device, rest @ ..] => {
            let limit = limit(rest, DEFAULT_HISTORY_LIMIT)?;
            history(monitor.api(), &resolve(ids, device)?, limit).await?;
        }
        ["health"] => health(monitor.api()).await?,
        _ => bail!("unrecognised command, try `help`"),
    }
    Ok(())
}

fn show(monitor: &mut FanMonitor<Client>) {
    for panel in monitor.panels() {
        println!("{panel}\n");
    }
    for notice in monitor.take_notices() {
        match notice {
            Notice::Info(text) => println!("{}", text.green()),
            Notice::Failure(text) => println!("{}", text.red()),
        }
    }
}

/// `1`, `2` or one of the configured ids.
fn resolve(ids: &[String; 2], arg: &str) -> Result<String> {
    match arg {
        "1" => Ok(ids[0].clone()),
        "2" => Ok(ids[1].clone()),
        id if ids.iter().any(|known| known == id) => Ok(id.to_string()),
        other => bail!("no such fan: {other:?}"),
    }
}

fn on_off(arg: &str) -> Result<bool> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        other => bail!("expected on or off, not {other:?}"),
    }
}

fn auto_manual(arg: &str) -> Result<bool> {
    match arg {
        "auto" => Ok(true),
        "manual" => Ok(false),
        other => bail!("expected auto or manual, not {other:?}"),
    }
}

fn limit(rest: &[&str], default: u32) -> Result<u32> {
    match rest {
        [] => Ok(default),
        [limit] => limit
            .parse()
            .with_context(|| format!("reading limit {limit:?}")),
        _ => bail!("too many arguments"),
    }
}

async fn devices(client: &Client) -> Result<()> {
    for device in client.devices().await? {
        println!(
            "{:<16} {:<20} {:>8}  {:<3}  {:<6}  {}",
            device.id,
            device.name,
            device_temperature(device.last_temperature),
            if device.fan_status { "ON" } else { "OFF" },
            if device.auto_mode { "AUTO" } else { "MANUAL" },
            device.location.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn device_temperature(temperature: Option<f64>) -> String {
    match temperature {
        Some(temperature) => format!("{temperature:.1}°C"),
        None => "-".to_string(),
    }
}

async fn readings(client: &Client, device_id: &str, limit: u32) -> Result<()> {
    for reading in client.sensor_data(device_id, limit).await? {
        println!(
            "{}  {:>6.1}°C  {:<3}  {}",
            reading.timestamp,
            reading.temperature,
            if reading.fan_status { "ON" } else { "OFF" },
            if reading.auto_mode { "AUTO" } else { "MANUAL" },
        );
    }
    Ok(())
}

async fn history(client: &Client, device_id: &str, limit: u32) -> Result<()> {
    for record in client.control_history(device_id, limit).await? {
        println!(
            "{}  {:<12} {:<7} via {}",
            record.timestamp, record.command_type, record.command_value, record.source
        );
    }
    Ok(())
}

async fn health(client: &Client) -> Result<()> {
    let health = client.health().await?;
    println!(
        "{} (version {}, server time {})",
        health.status, health.version, health.timestamp
    );
    Ok(())
}

fn now() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("it's not the past")
        .as_millis()
}

async fn record(client: &Client, config: &Config, interval: Duration) -> Result<()> {
    let path = format!("fans.{}.jsonl.zst", now());
    let writer = fs::File::create(&path).with_context(|| format!("creating {path}"))?;
    let mut writer = zstd::Encoder::new(writer, 9)?;
    println!("Recording to {path}, every {}s", interval.as_secs());

    loop {
        let mut snapshot = Vec::with_capacity(config.device_ids.len());
        for id in &config.device_ids {
            match client.device(id).await {
                Ok(device) => snapshot.push(device),
                Err(e) => warn!("skipping {id} this round: {e}"),
            }
        }

        if !snapshot.is_empty() {
            writer.write_all(format!("{} ", now()).as_bytes())?;
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> [String; 2] {
        ["exhaust_fan_1".to_string(), "exhaust_fan_2".to_string()]
    }

    #[test]
    fn fans_by_slot_or_id() {
        let ids = ids();
        assert_eq!(resolve(&ids, "1").unwrap(), "exhaust_fan_1");
        assert_eq!(resolve(&ids, "2").unwrap(), "exhaust_fan_2");
        assert_eq!(resolve(&ids, "exhaust_fan_2").unwrap(), "exhaust_fan_2");
        assert!(resolve(&ids, "3").is_err());
        assert!(resolve(&ids, "exhaust_fan_3").is_err());
    }

    #[test]
    fn switch_words() {
        assert!(on_off("on").unwrap());
        assert!(!on_off("off").unwrap());
        assert!(on_off("ON").is_err());
        assert!(auto_manual("auto").unwrap());
        assert!(!auto_manual("manual").unwrap());
        assert!(auto_manual("on").is_err());
    }

    #[test]
    fn limits() {
        assert_eq!(limit(&[], 100).unwrap(), 100);
        assert_eq!(limit(&["7"], 100).unwrap(), 7);
        assert!(limit(&["-1"], 100).is_err());
        assert!(limit(&["lots"], 100).is_err());
        assert!(limit(&["1", "2"], 100).is_err());
    }

    #[test]
    fn missing_temperature_is_a_dash() {
        assert_eq!(device_temperature(Some(36.84)), "36.8°C");
        assert_eq!(device_temperature(None), "-");
    }
}
