//! Sentinel command line client.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

use anyhow::{bail, Context};
use chrono::Utc;
use docopt::Docopt;
use sentinel_client_lib::analysis::{AnalysisClient, AnalysisError, SampleTransport};
use sentinel_client_lib::config::Config;
use sentinel_client_lib::environment::Environment;
use sentinel_client_lib::gallery::{DeleteReport, Gallery, GalleryView};
use sentinel_client_lib::http_client::{HttpMediaHost, HttpTransport};
use sentinel_client_lib::media_host::MediaHost;
use sentinel_client_lib::model::{AnalysisBundle, VideoReference};
use sentinel_client_lib::store::VideoStore;
use sentinel_client_lib::timecode::parse_opt;
use sentinel_client_lib::upload::UploadSession;
use sentinel_client_lib::viewer::{Viewer, ViewerEffect, ViewerTab};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

const USAGE: &str = "
Uploads security footage and replays its SOP compliance analysis.

Usage:
  sentinel upload --environment ENV [--config PATH] <file>...
  sentinel list [--query TEXT] [--environment ENV] [--config PATH]
  sentinel delete [--yes] [--config PATH] <id>
  sentinel replay [--step-secs N] [--until SECS] [--tab TAB] [--config PATH] <id>
  sentinel environments
  sentinel (--version | -v)
  sentinel (--help | -h)

Options:
    --environment ENV   Environment of the footage: billing-counter, jewellery-shop, petrol-pump or vending-machine. For list, also accepts all.
    --query TEXT        Case-insensitive filter over file name and environment.
    --yes               Delete without asking for confirmation.
    --step-secs N       Playback position increment in seconds [default: 1].
    --until SECS        Stop playback at this position. Defaults to 5s past the last SOP step.
    --tab TAB           Panel to show after playback: events or characters [default: events].
    --config PATH       YAML configuration file [default: sentinel.yaml].
    --version, -v       Show tool version.
    --help, -h          Show this screen.
";

#[derive(Debug, Deserialize)]
struct Args {
    cmd_upload: bool,
    cmd_list: bool,
    cmd_delete: bool,
    cmd_replay: bool,
    cmd_environments: bool,
    flag_environment: Option<String>,
    flag_query: Option<String>,
    flag_yes: bool,
    flag_step_secs: f64,
    flag_until: Option<f64>,
    flag_tab: String,
    flag_config: String,
    arg_file: Vec<String>,
    arg_id: Option<String>,
}

fn main() {
    env_logger::init();

    let version = env!("CARGO_PKG_NAME").to_string() + ", version: " + env!("CARGO_PKG_VERSION");

    let args: Args = Docopt::new(USAGE)
        .map(|d| d.help(true))
        .map(|d| d.version(Some(version)))
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if let Err(e) = run(args) {
        error!("{:?}", e);
        println!("Error: {:#}", e);
        exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.cmd_environments {
        print_environments();
        return Ok(());
    }

    let config = load_config(Path::new(&args.flag_config))?;

    if args.cmd_upload {
        upload(&config, &args)
    } else if args.cmd_list {
        list(&config, &args)
    } else if args.cmd_delete {
        delete(&config, required_id(&args)?, args.flag_yes)
    } else if args.cmd_replay {
        replay(&config, required_id(&args)?, &args)
    } else {
        bail!("Unsupported command!")
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(Some(path))?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

fn required_id(args: &Args) -> anyhow::Result<&str> {
    args.arg_id.as_deref().context("Missing video id")
}

/// The media host is optional for listing and deleting; without a cloud name
/// those commands work on the local store only.
fn optional_host(config: &Config) -> anyhow::Result<Option<HttpMediaHost>> {
    if config.cloud_name.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(HttpMediaHost::new(config)?))
}

fn upload(config: &Config, args: &Args) -> anyhow::Result<()> {
    let environment = Environment::parse(args.flag_environment.as_deref().unwrap_or_default())?;
    let host = HttpMediaHost::new(config)?;
    let store = VideoStore::new(&config.state_dir);

    let mut session = UploadSession::new(config.clone());
    let paths: Vec<PathBuf> = args.arg_file.iter().map(PathBuf::from).collect();
    let selected = session.select_files(&paths)?;
    println!("Selected {} ({} bytes)", selected.filename, selected.size);
    session.select_environment(environment)?;

    let mut shown = 0u32;
    let reference = session.upload(&host, &store, &mut |p| {
        let pct = p as u32;
        if pct >= shown + 5 || pct == 100 {
            shown = pct;
            print!("\rUploading... {}%", pct);
            let _ = io::stdout().flush();
        }
    })?;
    println!();
    println!("Uploaded {} as {}", reference.filename, reference.id);
    println!("URL: {}", reference.url);

    if let Some(base) = &config.analysis_base_url {
        register(config, base, &reference, environment);
    }
    Ok(())
}

/// Registration failures are reported but never fail the upload.
fn register(config: &Config, base: &str, reference: &VideoReference, environment: Environment) {
    let result = HttpTransport::new(base, config.http_timeout_secs).and_then(|transport| {
        AnalysisClient::new(transport)
            .register_video(&reference.id, &reference.url, environment)
            .map_err(anyhow::Error::from)
    });
    match result {
        Ok(true) => info!("registered {} for analysis", reference.id),
        Ok(false) => warn!("analysis backend declined to register {}", reference.id),
        Err(e) => warn!("Failed to register {} for analysis: {:?}", reference.id, e),
    }
}

fn list(config: &Config, args: &Args) -> anyhow::Result<()> {
    let store = VideoStore::new(&config.state_dir);
    let host = optional_host(config)?;

    let mut gallery = Gallery::new();
    gallery.load(&store, host.as_ref().map(|h| h as &dyn MediaHost));
    if let Some(query) = &args.flag_query {
        gallery.set_query(query);
    }
    if let Some(environment) = &args.flag_environment {
        gallery.set_environment(environment);
    }

    let now = Utc::now();
    match gallery.view() {
        GalleryView::Grid(entries) => {
            for entry in entries {
                let details: Vec<String> = [
                    entry.environment_tag().to_string(),
                    entry.formatted_date(now),
                    entry.formatted_size(),
                    entry.formatted_duration(),
                ]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();

                println!("{}", entry.reference.id);
                println!("    {} | {}", entry.reference.filename, details.join(" | "));
                if let Some(thumbnail) = entry.thumbnail_url() {
                    println!("    thumbnail: {}", thumbnail);
                }
            }
        }
        GalleryView::Loading => println!("Loading videos..."),
        other => println!("{}", other.message().unwrap_or_default()),
    }
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn delete(config: &Config, id: &str, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm(&format!("Delete {}? This cannot be undone.", id))? {
        println!("Cancelled.");
        return Ok(());
    }

    let store = VideoStore::new(&config.state_dir);
    let host = optional_host(config)?;
    let mut gallery = Gallery::new();
    gallery.load(&store, None);

    match gallery.delete(id, &store, host.as_ref().map(|h| h as &dyn MediaHost))? {
        DeleteReport::Deleted => println!("Deleted {}", id),
        DeleteReport::LocalOnly(reason) => {
            println!("Removed {} locally.", id);
            println!("Warning: not deleted from the media host ({}).", reason);
        }
    }
    Ok(())
}

fn fetch_bundle(config: &Config, video: &VideoReference) -> anyhow::Result<AnalysisBundle> {
    let bundle = match &config.analysis_base_url {
        Some(base) => {
            let transport = HttpTransport::new(base, config.http_timeout_secs)?;
            let client = AnalysisClient::new(transport);
            match client.fetch_bundle(&video.id) {
                Err(AnalysisError::Status(404) | AnalysisError::NoContent) => {
                    debug!("no bundle for {}, assembling it from v1 results", video.id);
                    client
                        .fetch_results_bundle(video)
                        .with_context(|| format!("No analysis available for {}", video.id))?
                }
                other => other?,
            }
        }
        None => {
            debug!("no analysis backend configured, replaying sample analysis");
            AnalysisClient::new(SampleTransport::for_video(video)).fetch_bundle(&video.id)?
        }
    };
    Ok(bundle)
}

fn replay(config: &Config, id: &str, args: &Args) -> anyhow::Result<()> {
    if !(args.flag_step_secs > 0.0) {
        bail!("--step-secs must be positive");
    }
    let tab = match args.flag_tab.as_str() {
        "events" => ViewerTab::Events,
        "characters" => ViewerTab::Characters,
        other => bail!("Unknown tab {}. Use events or characters.", other),
    };

    let store = VideoStore::new(&config.state_dir);
    let video = store
        .load()
        .into_iter()
        .find(|v| v.id == id)
        .with_context(|| format!("Video {} not found", id))?;

    let bundle = fetch_bundle(config, &video)?;
    let until = args.flag_until.unwrap_or_else(|| {
        let last = bundle
            .event_sequence
            .iter()
            .filter_map(|s| parse_opt(s.timestamp.as_deref()))
            .max()
            .unwrap_or(0);
        f64::from(last) + 5.0
    });

    let mut viewer = Viewer::open(bundle)?;
    viewer.switch_tab(tab);
    viewer.play(0.0);

    let mut position = 0.0;
    while position <= until {
        for effect in viewer.time_update(position) {
            match effect {
                ViewerEffect::ScrollTo(i) => {
                    let step = &viewer.timeline().steps()[i];
                    println!(
                        "[{:>6.1}s] step {} done: {}",
                        position, step.expected_order, step.description
                    );
                }
                ViewerEffect::AlertRevealed(event_id) => {
                    let alerts = viewer.alerts().alerts();
                    if let Some(alert) = alerts.iter().find(|a| a.event_id == event_id) {
                        println!(
                            "[{:>6.1}s] ALERT {} ({}): {}",
                            position, alert.event_id, alert.alert_level, alert.description
                        );
                    }
                }
                ViewerEffect::Seek { .. } => {}
            }
        }
        position += args.flag_step_secs;
    }
    viewer.ended();

    println!();
    print!("{}", viewer.render());
    if tab == ViewerTab::Characters {
        for person in viewer.persons().persons() {
            println!("Actions of {}:", person.name);
            for line in viewer.persons().action_lines(&person.huid) {
                println!("      {}", line);
            }
        }
    }

    let summary = viewer.timeline().summary();
    println!();
    println!(
        "Compliance: {} done, {} missed, {} pending{}",
        summary.active,
        summary.missed,
        summary.pending,
        if summary.in_order() {
            String::new()
        } else {
            format!(", out of order: {:?}", summary.out_of_order)
        }
    );
    viewer.close();
    Ok(())
}

fn print_environments() {
    for env in Environment::ALL {
        println!("{} ({})", env.name(), env.slug());
        println!("    {}. Typical duration {}.", env.description(), env.avg_duration());
        for (i, step) in env.sop().iter().enumerate() {
            println!("    {}. {}: {}", i + 1, step.title, step.description);
        }
    }
}
