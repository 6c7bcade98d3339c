use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use anyhow::{format_err, Context, Error};
use chrono::Local;
use getopts::Options;
use log::error;
use encore_core::errors;
use encore_core::helpers::load_toml;
use encore_core::pack::Packer;
use encore_core::record::Recorder;
use encore_core::settings::{Settings, SETTINGS_PATH};

const USAGE: &str = "Usage: encore record [-d] [-o OUTPUT_NAME] [TRACE_PATH]
       encore info ARCHIVE_PATH";

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) => match command.as_str() {
            "record" => record(rest),
            "info" => info(rest),
            "-h" | "--help" => {
                println!("{}", USAGE);
                Ok(())
            },
            _ => Err(format_err!("unknown command: {}", command)),
        },
        None => Err(format_err!("missing command\n{}", USAGE)),
    }
}

fn load_settings() -> Result<Settings, Error> {
    if Path::new(SETTINGS_PATH).exists() {
        load_toml::<Settings, _>(SETTINGS_PATH)
    } else {
        Ok(Settings::default())
    }
}

fn record(args: &[String]) -> Result<(), Error> {
    let mut opts = Options::new();
    opts.optflag("h", "help", "Print this help message.");
    opts.optflag("d", "decode", "Base64-decode the text fields of the trace.");
    opts.optopt("o", "output", "Output archive name.", "OUTPUT_NAME");

    let matches = opts.parse(args)
                      .context("failed to parse the command line arguments")?;
    if matches.opt_present("h") {
        println!("{}", opts.usage(USAGE));
        return Ok(());
    }

    let settings = load_settings()?;
    let decode = matches.opt_present("d") || settings.record.decode;
    let output = matches.opt_str("o")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| {
                            PathBuf::from(Local::now().format("encore-%Y%m%d-%H%M%S.dxpk").to_string())
                        });

    // An interrupt flushes the events gathered so far and exits cleanly.
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&interrupted))?;

    let mut recorder = Recorder::new(settings.device.clone(), decode, interrupted);
    match matches.free.first() {
        Some(path) => {
            let file = File::open(path)
                           .with_context(|| format!("can't open trace {}", path))?;
            let lines = BufReader::new(file).lines().map(|line| line.map_err(errors::Error::from));
            recorder.record_to(lines, &output)?;
        },
        None => {
            let lines = BufReader::new(io::stdin()).lines().map(|line| line.map_err(errors::Error::from));
            recorder.record_to(lines, &output)?;
        },
    }
    Ok(())
}

fn info(args: &[String]) -> Result<(), Error> {
    let mut opts = Options::new();
    opts.optflag("h", "help", "Print this help message.");

    let matches = opts.parse(args)
                      .context("failed to parse the command line arguments")?;
    if matches.opt_present("h") {
        println!("{}", opts.usage(USAGE));
        return Ok(());
    }

    let path = matches.free.first()
                      .ok_or_else(|| format_err!("missing required argument: archive path"))?;
    let mut packer = Packer::load_file(path)
                            .with_context(|| format!("can't load archive {}", path))?;
    println!("device: {}", packer.device());
    println!("app: {}", packer.app().unwrap_or("-"));
    println!("views: {}", packer.pool_len());
    let seq = packer.unpack_all()?;
    println!("events: {}", seq.len());
    for event in seq.top_n(seq.len()) {
        println!("  {}", event);
    }
    Ok(())
}
