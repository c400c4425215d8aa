use anyhow::{bail, Context};
use canon_register::{EventSelector, HistoryTarget, RegisterApi};
use canon_store::CanonicalStorage;
use canon_types::{Event, EventSummary, Identifier, Version, VersionedIdentifier, YearMonth};
use chrono::NaiveDate;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::CanonConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CanonConfig::load(&cli.config)?;
    debug!(config = %cli.config.display(), storage_root = %config.storage_root.display(), "configuration loaded");
    let format = cli.format;
    match cli.command {
        Command::Ingest(args) => cmd_ingest(&config.open()?, args, format),
        Command::Show(args) => cmd_show(&config.open()?, args, format),
        Command::Events(args) => cmd_events(&config.open()?, args, format),
        Command::History(args) => cmd_history(&config.open()?, args, format),
        Command::Verify(_) => cmd_verify(&config.open()?, format),
        Command::Ls(args) => cmd_ls(&config, args, format),
    }
}

/// `YYYY-MM-DD`, `YYYY-MM`, or `YYYY`.
fn parse_period(period: &str) -> anyhow::Result<EventSelector> {
    if let Ok(day) = NaiveDate::parse_from_str(period, "%Y-%m-%d") {
        return Ok(EventSelector::Day(day));
    }
    if let Ok(month) = period.parse::<YearMonth>() {
        return Ok(EventSelector::Month(month));
    }
    match period.parse::<i32>() {
        Ok(year) if period.len() == 4 => Ok(EventSelector::Year(year)),
        _ => bail!("not a day, month, or year: {period}"),
    }
}

/// A versioned identifier if it has a version, else an e-print identifier.
fn parse_target(identifier: &str) -> anyhow::Result<HistoryTarget> {
    if let Ok(vid) = VersionedIdentifier::parse(identifier) {
        return Ok(vid.into());
    }
    let id = Identifier::parse(identifier).with_context(|| format!("not an identifier: {identifier}"))?;
    Ok(id.into())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_ingest(api: &RegisterApi, args: IngestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let events: Vec<Event> =
        serde_json::from_str(&text).with_context(|| format!("parsing events in {}", args.path.display()))?;
    api.add_events(&events)?;
    let checksum = api.checksum()?;
    match format {
        OutputFormat::Json => print_json(&json!({ "events": events.len(), "checksum": checksum.to_string() })),
        OutputFormat::Text => {
            println!("{} Ingested {} events", "✓".green().bold(), events.len().to_string().bold());
            println!("  Record: {}", checksum.to_string().cyan());
            Ok(())
        }
    }
}

fn print_version(version: &Version) {
    let status = if version.is_withdrawn { "withdrawn".red() } else { "announced".green() };
    println!("{}  {}", version.identifier.to_string().yellow().bold(), status);
    println!("  Title: {}", version.metadata.title);
    println!("  Authors: {}", version.metadata.authors);
    println!("  Announced: {} (first {})", version.announced_date, version.announced_date_first);
    println!("  Source: {}", version.source.reference.to_string().blue());
    if let Some(render) = &version.render {
        println!("  Render: {}", render.reference.to_string().blue());
    }
    for file in version.formats.values() {
        println!("  Format: {}", file.reference.to_string().blue());
    }
}

fn cmd_show(api: &RegisterApi, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    match parse_target(&args.identifier)? {
        HistoryTarget::Version(vid) => {
            let version = api.load_version(&vid)?;
            match format {
                OutputFormat::Json => print_json(&version),
                OutputFormat::Text => {
                    print_version(&version);
                    Ok(())
                }
            }
        }
        HistoryTarget::EPrint(id) => {
            let eprint = api.load_eprint(&id)?;
            match format {
                OutputFormat::Json => print_json(&eprint),
                OutputFormat::Text => {
                    println!("{}  {} versions", id.to_string().bold(), eprint.number_of_versions());
                    for version in eprint.versions.values() {
                        print_version(version);
                    }
                    Ok(())
                }
            }
        }
    }
}

fn cmd_events(api: &RegisterApi, args: EventsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (events, count) = api.load_events(parse_period(&args.period)?)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "count": count, "events": events })),
        OutputFormat::Text => {
            for event in &events {
                println!(
                    "{}  {:<16} {}",
                    event.event_date.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    event.event_type.to_string().cyan(),
                    event.identifier.to_string().yellow()
                );
            }
            println!("{} events", count.to_string().bold());
            Ok(())
        }
    }
}

fn print_summary(summary: &EventSummary) {
    println!(
        "{}  {:<16} {}",
        summary.event_date.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        summary.event_type.to_string().cyan(),
        summary.identifier.to_string().yellow()
    );
}

fn cmd_history(api: &RegisterApi, args: HistoryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let history = api.load_history(parse_target(&args.identifier)?)?;
    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Text => {
            history.iter().for_each(print_summary);
            Ok(())
        }
    }
}

fn cmd_verify(api: &RegisterApi, format: OutputFormat) -> anyhow::Result<()> {
    let invalid = api.verify()?;
    match format {
        OutputFormat::Json => {
            let keys: Vec<&str> = invalid.iter().map(|key| key.as_str()).collect();
            print_json(&json!({ "valid": invalid.is_empty(), "invalid": keys }))?;
        }
        OutputFormat::Text if invalid.is_empty() => {
            println!("{} Record integrity verified", "✓".green().bold());
            println!("  Checksum: {}", api.checksum()?.to_string().cyan());
        }
        OutputFormat::Text => {
            println!("{} {} invalid keys", "✗".red().bold(), invalid.len());
            for key in &invalid {
                println!("  {}", key.as_str().red());
            }
        }
    }
    if !invalid.is_empty() {
        bail!("record failed verification");
    }
    Ok(())
}

fn cmd_ls(config: &CanonConfig, args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let names = config.storage().list_subkeys(&args.prefix)?;
    match format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Text => {
            names.iter().for_each(|name| println!("{name}"));
            Ok(())
        }
    }
}
