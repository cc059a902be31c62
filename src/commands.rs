//! Subcommand implementations
//!
//! Each command reads its inputs fully, runs one library step, and writes a
//! single CSV or JSON document to a file or stdout. Rows with unparseable
//! values are dropped with a warning; missing columns fail the command.

use crate::activity::{lap_activity, Comment};
use crate::binning::{count_by_bucket, AssignMode, LapBinner, OutsideMargin, TimestampedEvent};
use crate::cli::{Cli, Command, GroupBy, OutputFormat};
use crate::config::{Config, EventSchema, LapSchema};
use crate::csv_output::{fmt_f64, opt_f64, CsvOutput};
use crate::emotion::{self, resolve_label, LabeledComment, EMOTIONS};
use crate::events::{parse_flag, EventIndex};
use crate::json_output;
use crate::lap_key::LapKey;
use crate::laps::{
    attach_windows, average_laps, filter_driver, to_table, DriverLap, LapInterval, LapTable,
};
use crate::table::Table;
use crate::text::{clean_text, join_title_body};
use crate::timestamp::{duration_secs, format_timestamp, Normalizer};
use crate::toxicity::{window_toxicity, Lexicon, ScoredPost};
use anyhow::{bail, Context, Result};
use chrono::Duration;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration and run the selected command
pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let normalizer = Normalizer::new(config.offset()?);
    debug!(offset = %normalizer.offset(), "normalizing timestamps");

    match cli.command {
        Command::Laps {
            telemetry,
            driver,
            shift_secs,
            output,
        } => {
            let out = laps(&config, &normalizer, &telemetry, driver.as_deref(), shift_secs)?;
            write_output(output.as_deref(), &out)
        }
        Command::Assign {
            laps,
            events,
            mode,
            margin_secs,
            reject_outside_margin,
            output,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(secs) = margin_secs {
                config.margin_secs = secs;
            }
            if reject_outside_margin {
                config.outside_margin = OutsideMargin::Reject;
            }
            let out = assign(&config, &normalizer, &laps, &events)?;
            write_output(output.as_deref(), &out)
        }
        Command::Counts {
            laps,
            events,
            format,
            output,
        } => {
            let out = counts(&config, &normalizer, &laps, &events, format)?;
            write_output(output.as_deref(), &out)
        }
        Command::Windows {
            laps,
            incidents,
            output,
        } => {
            let out = windows(&config, &normalizer, &laps, &incidents)?;
            write_output(output.as_deref(), &out)
        }
        Command::Toxicity {
            posts,
            lexicon,
            window_secs,
            output,
        } => {
            let mut config = config;
            if let Some(secs) = window_secs {
                config.toxicity.window_secs = secs;
            }
            let out = toxicity(&config, &normalizer, &posts, &lexicon)?;
            write_output(output.as_deref(), &out)
        }
        Command::Activity { comments, output } => {
            let out = activity(&config, &normalizer, &comments)?;
            write_output(output.as_deref(), &out)
        }
        Command::JoinEvents {
            comments,
            incidents,
            output,
        } => {
            let out = join_events(&config, &comments, &incidents)?;
            write_output(output.as_deref(), &out)
        }
        Command::Emotion {
            input,
            group_by,
            format,
            output,
        } => {
            let out = emotion_proportions(&config, &input, group_by, format)?;
            write_output(output.as_deref(), &out)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => {
            std::io::stdout()
                .lock()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn read_table(path: &Path) -> Result<Table> {
    let table =
        Table::from_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!(path = %path.display(), rows = table.len(), "loaded table");
    Ok(table)
}

fn warn_dropped(dropped: usize, source: &str, what: &str) {
    if dropped > 0 {
        warn!(dropped, source, "dropped rows with unparseable {}", what);
    }
}

/// Lap numbers arrive as `12`, `12.0` or `Lap 12`
fn parse_lap_number(raw: &str) -> Option<u32> {
    LapKey::parse(raw).lap_number()
}

fn load_lap_table(path: &Path, schema: &LapSchema, normalizer: &Normalizer) -> Result<LapTable> {
    let table = read_table(path)?;
    let lap_col = table.column(&schema.lap_number)?;
    let start_col = table.column(&schema.start)?;
    let end_col = table.column(&schema.end)?;

    let mut laps = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for row in table.rows() {
        let parsed = (
            parse_lap_number(table.cell(row, lap_col)),
            normalizer.normalize(table.cell(row, start_col)),
            normalizer.normalize(table.cell(row, end_col)),
        );
        match parsed {
            (Some(lap), Ok(start), Ok(end)) => laps.push(LapInterval::new(lap, start, end)),
            _ => dropped += 1,
        }
    }
    warn_dropped(dropped, table.source(), "lap number or time");

    LapTable::new(laps).with_context(|| format!("Invalid lap table {}", path.display()))
}

/// Events with the row they came from
struct LoadedEvents {
    table: Table,
    timestamp_col: usize,
    events: Vec<TimestampedEvent<usize>>,
}

fn load_events(path: &Path, schema: &EventSchema, normalizer: &Normalizer) -> Result<LoadedEvents> {
    let table = read_table(path)?;
    let timestamp_col = table.column(&schema.timestamp)?;
    let id_col = match &schema.id {
        Some(name) => Some(table.column(name)?),
        None => None,
    };

    let mut events = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for (idx, row) in table.rows().iter().enumerate() {
        match normalizer.normalize(table.cell(row, timestamp_col)) {
            Ok(ts) => {
                let id = match id_col {
                    Some(col) => table.cell(row, col).to_string(),
                    None => (idx + 1).to_string(),
                };
                events.push(TimestampedEvent::new(id, ts, idx));
            }
            Err(e) => {
                debug!(row = idx + 1, error = %e, "skipping event");
                dropped += 1;
            }
        }
    }
    warn_dropped(dropped, table.source(), "timestamp");

    Ok(LoadedEvents {
        table,
        timestamp_col,
        events,
    })
}

fn laps(
    config: &Config,
    normalizer: &Normalizer,
    path: &Path,
    driver: Option<&str>,
    shift_secs: Option<f64>,
) -> Result<String> {
    let schema = &config.telemetry;
    let table = read_table(path)?;
    let driver_col = table.column(&schema.driver)?;
    let lap_col = table.column(&schema.lap_number)?;
    let start_col = table.column(&schema.start)?;

    // an end column wins over a duration column when the file has both
    let end_col = schema.end.as_deref().and_then(|name| table.optional_column(name));
    let duration_col = match (end_col, schema.duration_secs.as_deref()) {
        (Some(_), _) => None,
        (None, Some(name)) => Some(table.column(name)?),
        (None, None) => {
            bail!(
                "{} has no lap end column '{}' and no duration column is configured",
                table.source(),
                schema.end.as_deref().unwrap_or_default()
            )
        }
    };

    let mut rows = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for row in table.rows() {
        let driver_id = table.cell(row, driver_col).trim();
        let lap = parse_lap_number(table.cell(row, lap_col));
        let start = normalizer.normalize(table.cell(row, start_col)).ok();

        let parsed = match (lap, start, end_col, duration_col) {
            (Some(lap), Some(start), Some(col), _) => normalizer
                .normalize(table.cell(row, col))
                .ok()
                .filter(|end| *end > start)
                .map(|end| DriverLap {
                    driver: driver_id.to_string(),
                    lap_number: lap,
                    start,
                    end,
                }),
            (Some(lap), Some(start), None, Some(col)) => table
                .cell(row, col)
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| DriverLap::from_duration(driver_id, lap, start, secs).ok()),
            _ => None,
        };
        match parsed {
            Some(r) => rows.push(r),
            None => dropped += 1,
        }
    }
    warn_dropped(dropped, table.source(), "lap timing");

    let rows = match driver {
        Some(id) => {
            let kept = filter_driver(&rows, id);
            if kept.is_empty() {
                bail!("No laps for driver '{}' in {}", id, table.source());
            }
            kept
        }
        None => rows,
    };

    let averaged = average_laps(&rows);
    let mut lap_table =
        to_table(&averaged).with_context(|| format!("Invalid laps derived from {}", path.display()))?;
    if let Some(secs) = shift_secs {
        let shift = shift_duration(secs)?;
        lap_table = lap_table.shifted(shift)?;
        debug!(shift_secs = secs, "shifted lap boundaries");
    }
    info!(laps = lap_table.len(), drivers = ?driver, "built lap table");

    let mut out = CsvOutput::new([
        config.laps.lap_number.as_str(),
        config.laps.start.as_str(),
        config.laps.end.as_str(),
        "Num_Drivers",
    ]);
    for (lap, avg) in lap_table.iter().zip(&averaged) {
        out.add_row(vec![
            lap.lap_number.to_string(),
            format_timestamp(&lap.start_time),
            format_timestamp(&lap.end_time),
            avg.drivers.to_string(),
        ]);
    }
    Ok(out.to_csv())
}

/// `--shift-secs` as a millisecond duration
fn shift_duration(secs: f64) -> Result<Duration> {
    let millis = (secs * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        bail!("--shift-secs out of range: {}", secs);
    }
    Duration::try_milliseconds(millis as i64)
        .with_context(|| format!("--shift-secs out of range: {}", secs))
}

fn binner(config: &Config, normalizer: &Normalizer, laps_path: &Path) -> Result<LapBinner> {
    let table = load_lap_table(laps_path, &config.laps, normalizer)?;
    Ok(LapBinner::new(table, config.binner_config()?)?)
}

fn assign(config: &Config, normalizer: &Normalizer, laps_path: &Path, events_path: &Path) -> Result<String> {
    let binner = binner(config, normalizer, laps_path)?;
    let loaded = load_events(events_path, &config.events, normalizer)?;
    let assignments = binner
        .assign_all(&loaded.events)
        .with_context(|| format!("Failed to assign laps in {}", events_path.display()))?;

    let with_distance = binner.config().mode == AssignMode::NearestMidpoint;
    let mut headers: Vec<String> = loaded.table.headers().to_vec();
    headers.push("lap".to_string());
    if with_distance {
        headers.push("distance_secs".to_string());
        headers.push("lap_mid_kst".to_string());
    }

    let mut out = CsvOutput::new(headers);
    for (event, assignment) in loaded.events.iter().zip(&assignments) {
        let mut row = loaded.table.rows()[event.payload].clone();
        row[loaded.timestamp_col] = format_timestamp(&event.timestamp);
        row.push(assignment.bucket.to_string());
        if with_distance {
            row.push(opt_f64(assignment.distance.map(duration_secs)));
            let midpoint = assignment
                .bucket
                .lap_number()
                .and_then(|n| binner.table().get(n))
                .map(|lap| format_timestamp(&lap.midpoint()));
            row.push(midpoint.unwrap_or_default());
        }
        out.add_row(row);
    }
    info!(events = out.len(), mode = ?binner.config().mode, "assigned laps");
    Ok(out.to_csv())
}

fn counts(
    config: &Config,
    normalizer: &Normalizer,
    laps_path: &Path,
    events_path: &Path,
    format: OutputFormat,
) -> Result<String> {
    let binner = binner(config, normalizer, laps_path)?;
    let loaded = load_events(events_path, &config.events, normalizer)?;
    let assignments = binner
        .assign_all(&loaded.events)
        .with_context(|| format!("Failed to assign laps in {}", events_path.display()))?;
    let counts = count_by_bucket(&assignments, binner.table());

    match format {
        OutputFormat::Json => json_output::counts_json(&counts).to_json(),
        OutputFormat::Csv => {
            let mut out = CsvOutput::new(["lap", "count"]);
            for c in &counts {
                out.add_row(vec![c.bucket.to_string(), c.count.to_string()]);
            }
            Ok(out.to_csv())
        }
    }
}

fn windows(config: &Config, normalizer: &Normalizer, laps_path: &Path, incidents_path: &Path) -> Result<String> {
    let lap_table = load_lap_table(laps_path, &config.laps, normalizer)?;
    let incidents = read_table(incidents_path)?;
    let lap_col = incidents.column(&config.incidents.lap)?;

    let lap_numbers: Vec<Option<u32>> = incidents
        .rows()
        .iter()
        .map(|row| parse_lap_number(incidents.cell(row, lap_col)))
        .collect();
    let windows = attach_windows(&lap_numbers, &lap_table);
    let unmatched = windows.iter().filter(|w| w.is_none()).count();
    if unmatched > 0 {
        warn!(unmatched, source = incidents.source(), "incidents without a matching lap");
    }

    let mut headers = incidents.headers().to_vec();
    headers.push("lap_start_time".to_string());
    headers.push("lap_end_time".to_string());
    let mut out = CsvOutput::new(headers);
    for (row, window) in incidents.rows().iter().zip(&windows) {
        let mut row = row.clone();
        match window {
            Some(w) => {
                row.push(format_timestamp(&w.start));
                row.push(format_timestamp(&w.end));
            }
            None => {
                row.push(String::new());
                row.push(String::new());
            }
        }
        out.add_row(row);
    }
    Ok(out.to_csv())
}

fn load_lexicon(config: &Config, path: &Path) -> Result<Lexicon> {
    let table = read_table(path)?;
    let term_col = table.column(&config.lexicon.term)?;
    let weight_col = config
        .lexicon
        .weight
        .as_deref()
        .and_then(|name| table.optional_column(name));

    let pairs = table.rows().iter().map(|row| {
        let weight = weight_col.and_then(|col| table.cell(row, col).trim().parse::<f64>().ok());
        (table.cell(row, term_col), weight)
    });
    let lexicon = Lexicon::from_pairs(pairs)?;
    if lexicon.is_empty() {
        bail!("Lexicon {} has no terms", path.display());
    }
    info!(terms = lexicon.len(), "loaded lexicon");
    Ok(lexicon)
}

fn toxicity(config: &Config, normalizer: &Normalizer, posts_path: &Path, lexicon_path: &Path) -> Result<String> {
    let lexicon = load_lexicon(config, lexicon_path)?;
    let loaded = load_events(posts_path, &config.events, normalizer)?;
    let table = &loaded.table;

    let text_col = match &config.events.text {
        Some(name) => Some(table.column(name)?),
        None => None,
    };
    let title_col = config.events.title.as_deref().and_then(|n| table.optional_column(n));
    let body_col = config.events.body.as_deref().and_then(|n| table.optional_column(n));
    if text_col.is_none() && title_col.is_none() && body_col.is_none() {
        bail!("{} has no text, title or body column", table.source());
    }

    let mut posts = Vec::with_capacity(loaded.events.len());
    for event in &loaded.events {
        let row = &table.rows()[event.payload];
        let raw = match text_col {
            Some(col) => table.cell(row, col).to_string(),
            None => join_title_body(
                title_col.map_or("", |c| table.cell(row, c)),
                body_col.map_or("", |c| table.cell(row, c)),
            ),
        };
        let cleaned = clean_text(&raw);
        if cleaned.is_empty() {
            continue;
        }
        posts.push(ScoredPost {
            timestamp: event.timestamp,
            toxicity: lexicon.score(&cleaned),
        });
    }
    debug!(scored = posts.len(), "scored posts");

    let windows = window_toxicity(&posts, config.toxicity_window()?)?;
    let mut out = CsvOutput::new([
        "time_bin_start",
        "time_bin_end",
        "post_count",
        "mean_toxicity",
        "sum_toxicity",
    ]);
    for w in &windows {
        out.add_row(vec![
            format_timestamp(&w.start),
            format_timestamp(&w.end),
            w.post_count.to_string(),
            opt_f64(w.mean_toxicity),
            fmt_f64(w.sum_toxicity),
        ]);
    }
    info!(windows = windows.len(), posts = posts.len(), "aggregated toxicity");
    Ok(out.to_csv())
}

fn activity(config: &Config, normalizer: &Normalizer, path: &Path) -> Result<String> {
    let schema = &config.comments;
    let table = read_table(path)?;
    let race_col = table.column(&schema.race)?;
    let lap_col = table.column(&schema.lap)?;
    let ts_col = table.column(&schema.timestamp)?;
    let text_col = table.column(&schema.text)?;

    let mut comments = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for row in table.rows() {
        match normalizer.normalize(table.cell(row, ts_col)) {
            Ok(timestamp) => comments.push(Comment {
                race: table.cell(row, race_col).to_string(),
                lap: LapKey::parse(table.cell(row, lap_col)),
                timestamp,
                text: table.cell(row, text_col).trim().to_string(),
            }),
            Err(_) => dropped += 1,
        }
    }
    warn_dropped(dropped, table.source(), "timestamp");

    let stats = lap_activity(&comments);
    let mut out = CsvOutput::new(["race", "lap", "comment_count", "avg_time_gap", "avg_text_len"]);
    for s in &stats {
        out.add_row(vec![
            s.race.clone(),
            s.lap.to_string(),
            s.comment_count.to_string(),
            opt_f64(s.avg_time_gap),
            fmt_f64(s.avg_text_len),
        ]);
    }
    Ok(out.to_csv())
}

fn join_events(config: &Config, comments_path: &Path, incidents_path: &Path) -> Result<String> {
    let schema = &config.incidents;
    let incidents = read_table(incidents_path)?;
    let race_col = incidents.column(&schema.race)?;
    let lap_col = incidents.column(&schema.lap)?;
    let flag_cols = schema
        .flags
        .iter()
        .map(|name| incidents.column(name))
        .collect::<crate::Result<Vec<_>>>()?;

    let mut index = EventIndex::new(schema.flags.iter().cloned());
    for row in incidents.rows() {
        let values = flag_cols
            .iter()
            .map(|&col| parse_flag(incidents.cell(row, col)))
            .collect();
        index.insert(
            incidents.cell(row, race_col),
            LapKey::parse(incidents.cell(row, lap_col)),
            values,
        );
    }
    info!(keys = index.len(), "indexed incidents");

    let comments = read_table(comments_path)?;
    let c_race = comments.column(&config.comments.race)?;
    let c_lap = comments.column(&config.comments.lap)?;

    // columns the join appends replace same-named input columns
    let appended: Vec<&str> = schema
        .flags
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("event_marker"))
        .collect();
    let kept: Vec<usize> = (0..comments.headers().len())
        .filter(|&i| !appended.contains(&comments.headers()[i].as_str()))
        .collect();

    let headers = kept
        .iter()
        .map(|&i| comments.headers()[i].clone())
        .chain(appended.iter().map(|s| s.to_string()));
    let mut out = CsvOutput::new(headers);
    let mut marked = 0;
    for row in comments.rows() {
        let matched = index.lookup(
            comments.cell(row, c_race),
            &LapKey::parse(comments.cell(row, c_lap)),
        );
        if matched.event_marker {
            marked += 1;
        }
        let mut cells: Vec<String> = kept.iter().map(|&i| comments.cell(row, i).to_string()).collect();
        cells.extend(matched.flags.iter().map(|v| fmt_f64(*v)));
        cells.push(u8::from(matched.event_marker).to_string());
        out.add_row(cells);
    }
    info!(comments = comments.len(), with_event = marked, "joined incident flags");
    Ok(out.to_csv())
}

fn emotion_proportions(
    config: &Config,
    path: &Path,
    group_by: GroupBy,
    format: OutputFormat,
) -> Result<String> {
    let schema = &config.emotion;
    let table = read_table(path)?;
    let label_col = table.column(&schema.label)?;
    let score_col = schema.score.as_deref().and_then(|n| table.optional_column(n));
    let (race_col, lap_col) = match group_by {
        GroupBy::Lap => (Some(table.column(&schema.race)?), Some(table.column(&schema.lap)?)),
        GroupBy::Event => (
            table.optional_column(&schema.race),
            table.optional_column(&schema.lap),
        ),
    };

    let mut flag_names = Vec::new();
    let mut flag_cols = Vec::new();
    for name in &config.incidents.flags {
        match table.optional_column(name) {
            Some(col) => {
                flag_names.push(name.clone());
                flag_cols.push(col);
            }
            None => info!(flag = %name, "flag column not in input, skipping"),
        }
    }
    let marker_col = table.optional_column(&schema.event_marker);

    let labeled: Vec<LabeledComment> = table
        .rows()
        .iter()
        .map(|row| {
            let score = score_col.and_then(|c| parse_flag(table.cell(row, c)));
            let flags: Vec<Option<f64>> = flag_cols
                .iter()
                .map(|&c| parse_flag(table.cell(row, c)))
                .collect();
            // without a marker column, any flag value marks an event
            let event_marker = match marker_col {
                Some(c) => parse_flag(table.cell(row, c)).is_some_and(|v| v != 0.0),
                None => flags.iter().any(Option::is_some),
            };
            LabeledComment {
                race: race_col.map_or("", |c| table.cell(row, c)).to_string(),
                lap: lap_col.map_or("", |c| table.cell(row, c)).to_string(),
                emotion: resolve_label(table.cell(row, label_col), score, schema.threshold),
                event_marker,
                flags: flags.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            }
        })
        .collect();

    match group_by {
        GroupBy::Event => {
            let groups = emotion::by_event(&labeled, &flag_names);
            if format == OutputFormat::Json {
                return json_output::event_groups_json(&groups).to_json();
            }
            let mut out = CsvOutput::new(
                ["group".to_string(), "samples".to_string()]
                    .into_iter()
                    .chain(EMOTIONS.iter().map(|e| e.to_string())),
            );
            for g in &groups {
                let mut row = vec![g.group.clone(), g.proportions.samples.to_string()];
                row.extend(g.proportions.shares.iter().map(|v| fmt_f64(*v)));
                out.add_row(row);
            }
            Ok(out.to_csv())
        }
        GroupBy::Lap => {
            let laps = emotion::by_lap(&labeled);
            if format == OutputFormat::Json {
                return json_output::lap_groups_json(&laps).to_json();
            }
            let mut out = CsvOutput::new(
                ["race".to_string(), "lap".to_string(), "samples".to_string()]
                    .into_iter()
                    .chain(EMOTIONS.iter().map(|e| format!("prop_{}", e))),
            );
            for l in &laps {
                let mut row = vec![l.race.clone(), l.lap.clone(), l.proportions.samples.to_string()];
                row.extend(l.proportions.shares.iter().map(|v| fmt_f64(*v)));
                out.add_row(row);
            }
            Ok(out.to_csv())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const LAPS: &str = "LapNumber,Avg_LapStartTime_KST,Avg_LapFinishTime_KST\n\
                        1,2024-03-03 00:00:00.000,2024-03-03 00:01:30.000\n\
                        2,2024-03-03 00:01:30.000,2024-03-03 00:03:00.000\n";

    #[test]
    fn test_assign_appends_lap_column() {
        let dir = tempfile::tempdir().unwrap();
        let laps = write(&dir, "laps.csv", LAPS);
        let events = write(
            &dir,
            "posts.csv",
            "post_timestamp,post_title\n\
             2024-03-03 00:01:29,a\n\
             2024-03-02T15:01:30Z,b\n\
             not a time,c\n\
             2024-03-03 00:05:00,d\n",
        );

        let out = assign(&Config::default(), &Normalizer::kst(), &laps, &events).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "post_timestamp,post_title,lap");
        assert_eq!(lines[1], "2024-03-03 00:01:29.000,a,1");
        assert_eq!(lines[2], "2024-03-03 00:01:30.000,b,2");
        assert_eq!(lines[3], "2024-03-03 00:05:00.000,d,after_race");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_assign_nearest_midpoint_writes_lap_midpoint() {
        let dir = tempfile::tempdir().unwrap();
        let laps = write(&dir, "laps.csv", LAPS);
        let events = write(
            &dir,
            "posts.csv",
            "post_timestamp,post_title\n2024-03-03 00:01:29,a\n2024-03-03 00:10:00,b\n",
        );
        let config = Config {
            mode: AssignMode::NearestMidpoint,
            ..Config::default()
        };

        let out = assign(&config, &Normalizer::kst(), &laps, &events).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "post_timestamp,post_title,lap,distance_secs,lap_mid_kst");
        assert_eq!(lines[1], "2024-03-03 00:01:29.000,a,1,44,2024-03-03 00:00:45.000");
        assert_eq!(lines[2], "2024-03-03 00:10:00.000,b,2,465,2024-03-03 00:02:15.000");
    }

    #[test]
    fn test_missing_column_names_found_columns() {
        let dir = tempfile::tempdir().unwrap();
        let laps = write(&dir, "laps.csv", "lap,start,end\n");
        let err = load_lap_table(&laps, &LapSchema::default(), &Normalizer::kst()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("LapNumber"));
        assert!(msg.contains("found: lap, start, end"));
    }

    #[test]
    fn test_counts_include_empty_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let laps = write(&dir, "laps.csv", LAPS);
        let events = write(&dir, "posts.csv", "post_timestamp\n2024-03-03 00:00:10\n");
        let out = counts(
            &Config::default(),
            &Normalizer::kst(),
            &laps,
            &events,
            OutputFormat::Csv,
        )
        .unwrap();
        assert_eq!(out, "lap,count\nbefore_race,0\n1,1\n2,0\nafter_race,0\n");
    }

    #[test]
    fn test_laps_average_and_shift() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = write(
            &dir,
            "telemetry.csv",
            "Driver,LapNumber,LapStartTime_KST,LapFinishTime_KST\n\
             VER,1,2024-03-03 00:00:00,2024-03-03 00:01:30\n\
             LEC,1,2024-03-03 00:00:02,2024-03-03 00:01:28\n\
             VER,2,2024-03-03 00:01:30,2024-03-03 00:03:00\n",
        );
        let out = laps(&Config::default(), &Normalizer::kst(), &telemetry, None, Some(10.0)).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "LapNumber,Avg_LapStartTime_KST,Avg_LapFinishTime_KST,Num_Drivers"
        );
        assert_eq!(lines[1], "1,2024-03-03 00:00:11.000,2024-03-03 00:01:39.000,2");
        assert_eq!(lines[2], "2,2024-03-03 00:01:40.000,2024-03-03 00:03:10.000,1");
    }

    #[test]
    fn test_laps_shift_out_of_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = write(
            &dir,
            "telemetry.csv",
            "Driver,LapNumber,LapStartTime_KST,LapFinishTime_KST\n\
             VER,1,2024-03-03 00:00:00,2024-03-03 00:01:30\n",
        );
        for shift in [1e13, -1e13, 1e300, f64::NAN, f64::INFINITY] {
            let result = laps(&Config::default(), &Normalizer::kst(), &telemetry, None, Some(shift));
            assert!(result.is_err(), "shift {} should fail", shift);
        }
    }

    #[test]
    fn test_laps_unknown_driver_fails() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = write(
            &dir,
            "telemetry.csv",
            "Driver,LapNumber,LapStartTime_KST,LapFinishTime_KST\n\
             VER,1,2024-03-03 00:00:00,2024-03-03 00:01:30\n",
        );
        let err = laps(&Config::default(), &Normalizer::kst(), &telemetry, Some("HAM"), None)
            .unwrap_err();
        assert!(err.to_string().contains("HAM"));
    }

    #[test]
    fn test_join_events_replaces_existing_flag_columns() {
        let dir = tempfile::tempdir().unwrap();
        let comments = write(
            &dir,
            "comments.csv",
            "race,lap,Text,ev_out\nBahrain,Lap 1,wow,9\nBahrain,2,hm,9\n",
        );
        let incidents = write(
            &dir,
            "incidents.csv",
            "race,lap,ev_unexp,ev_resp,ev_out\nBahrain,1,1,,0\n",
        );
        let out = join_events(&Config::default(), &comments, &incidents).unwrap();
        assert_eq!(
            out,
            "race,lap,Text,ev_unexp,ev_resp,ev_out,event_marker\n\
             Bahrain,Lap 1,wow,1,0,0,1\n\
             Bahrain,2,hm,0,0,0,0\n"
        );
    }
}
