//! Deploy example: walk a U-Boot console through a short flashing run
//!
//! Interrupts autoboot, checks the environment, locates the newest root
//! filesystem image on the boot partition and boots the board. Progress
//! and errors are printed from a notification channel.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example deploy -- --port /dev/ttyUSB0 --baud 115200
//! ```
//!
//! Engine timings, the secret and step labels can come from a TOML file:
//! ```bash
//! cargo run --example deploy -- --port /dev/ttyUSB0 --config engine.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use bootcon::config::EngineConfig;
use bootcon::driver::{CommandList, Session};
use bootcon::logfile::PlainText;
use bootcon::notify::{ChannelSink, Notification};
use bootcon::transport::SerialConfig;
use regex::bytes::Regex;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let mut done = 0;
        while let Some(event) = rx.recv().await {
            match event {
                Notification::Progress => done += 1,
                Notification::StepDone(step) => println!("step {} done ({} commands)", step, done),
                Notification::Error(report) => {
                    eprintln!("step '{}' failed: {}", report.step_label, report.debug_message);
                    eprintln!("  request: {:?}", report.request_lossy());
                    eprintln!("  answer:  {:?}", report.answer_lossy());
                }
                Notification::EndOfSequence => eprintln!("sequence aborted"),
            }
        }
    });

    // --port wins over a [serial] table in the config file
    let serial = match (&args.port, &config.serial) {
        (Some(port), _) => SerialConfig::new(port, args.baud),
        (None, Some(serial)) => serial.clone(),
        (None, None) => SerialConfig::new("/dev/ttyUSB0", args.baud),
    };
    let port = serial.port.clone();

    println!("Opening {} at {} baud...", serial.port, serial.baud_rate);
    let mut session = Session::connect(
        serial,
        config,
        ChannelSink::new(tx),
        PlainText,
    )?;
    session.logger_mut().add_metadata(format!("port: {}", port));

    let enter = CommandList::builder()
        .send("\r\n")
        .with_extra_timeout(Duration::from_secs(5))
        .with_debug_message("bootloader prompt not reached.")
        .expect("=>")
        .build()?;

    let check = CommandList::builder()
        .send("printenv bootcmd\r\n")
        .expect(r"bootcmd=(\S+)")
        .send("version\r\n")
        .expect(r"U-Boot \d{4}\.\d{2}")
        .build()?;

    let run = async {
        session.run_step(0, &enter).await?;
        session.run_step(1, &check).await?;

        let mask = Regex::new(r"rootfs-\d+\.tar")?;
        match session.latest_entry(&mask, "/boot/").await {
            Ok(image) => println!("newest image: {}", image),
            Err(err) => eprintln!("no image found: {}", err),
        }

        let boot = CommandList::builder()
            .send("boot\r\n")
            .with_extra_timeout(Duration::from_secs(args.boot_timeout))
            .with_debug_message("kernel did not start.")
            .expect("Starting kernel")
            .build()?;
        session.run_step(2, &boot).await?;
        Ok::<_, Box<dyn std::error::Error>>(())
    };

    let result = tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            Ok(())
        }
    };

    let log = session.stop().await?;
    println!("session log: {}", log.display());
    printer.await?;

    result
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    port: Option<String>,
    baud: u32,
    config: Option<PathBuf>,
    boot_timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut port = None;
        let mut baud = 115_200u32;
        let mut config = None;
        let mut boot_timeout = 60u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = Some(args[i].clone());
                    }
                }
                "--baud" | "-b" => {
                    i += 1;
                    if i < args.len() {
                        baud = args[i].parse().unwrap_or(115_200);
                    }
                }
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                }
                "--boot-timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        boot_timeout = args[i].parse().unwrap_or(60);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            port,
            baud,
            config,
            boot_timeout,
        }
    }

    fn print_help() {
        println!(
            r#"bootcon deploy example

USAGE:
    cargo run --example deploy -- [OPTIONS]

OPTIONS:
    -p, --port <PATH>           Serial device [default: config [serial] port, else /dev/ttyUSB0]
    -b, --baud <RATE>           Baud rate [default: 115200]
    -c, --config <FILE>         Engine configuration (TOML)
    -t, --boot-timeout <SECS>   Extra time allowed for the kernel to start [default: 60]
    --help                      Print this help message
"#
        );
    }
}
