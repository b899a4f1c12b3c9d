use std::io::Write;

use chrono::{Local, TimeZone};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::error::Result;
use crate::timing::{RoundDetail, SessionSummary};

const COLUMN_GAP: usize = 2;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Milliseconds as `XmYs`, truncated to whole seconds
pub fn format_duration(ms: f64) -> String {
    let total_seconds = if ms.is_finite() && ms > 0.0 {
        (ms / 1000.0).floor() as u64
    } else {
        0
    };
    format!("{}m{}s", total_seconds / 60, total_seconds % 60)
}

/// Epoch milliseconds as a local date and time
pub fn format_timestamp(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// Cells for a single results row
pub fn present_row(index: usize, s: &SessionSummary) -> Vec<String> {
    vec![
        (index + 1).to_string(),
        s.player_name.clone(),
        format_timestamp(s.first_round_start),
        format_timestamp(s.last_round_start),
        format_duration(s.total_elapsed_ms as f64),
        format_duration(s.median_gap_ms),
        format_duration(s.max_gap_ms as f64),
        s.total_points.to_string(),
    ]
}

pub fn present_round(r: &RoundDetail) -> Vec<String> {
    vec![
        format!("R{}", r.round_number),
        r.points.to_string(),
        format_timestamp(r.start_time),
        format_duration(r.guess_duration_ms as f64),
        r.gap_before_ms
            .map(|g| format_duration(g as f64))
            .unwrap_or_default(),
    ]
}

/// Left-aligned text table; widths account for wide glyphs in player names
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.width());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let mut out = String::new();
        for (i, cell) in cells.iter().enumerate() {
            out.push_str(cell);
            if i + 1 < cells.len() {
                let pad = widths[i].saturating_sub(cell.width()) + COLUMN_GAP;
                out.push_str(&" ".repeat(pad));
            }
        }
        out.trim_end().to_string()
    };

    let mut lines = vec![line(header.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .join(&" ".repeat(COLUMN_GAP)),
    );
    lines.extend(rows.iter().map(|r| line(r.iter().map(String::as_str).collect())));
    lines.join("\n")
}

const RESULTS_HEADER: [&str; 8] = [
    "#",
    "Player",
    "First round started",
    "Last round started",
    "Total time",
    "Median gap",
    "Max gap",
    "Points",
];

const ROUNDS_HEADER: [&str; 5] = ["Round", "Points", "Started", "Guess time", "Gap before"];

pub fn write_report<W: Write>(
    out: &mut W,
    summaries: &[SessionSummary],
    format: OutputFormat,
    show_rounds: bool,
) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, summaries, show_rounds),
        OutputFormat::Csv => write_csv(out, summaries, show_rounds),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, summaries)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_table<W: Write>(out: &mut W, summaries: &[SessionSummary], show_rounds: bool) -> Result<()> {
    writeln!(out, "Challenge results (ordered by start time)")?;
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| present_row(i, s))
        .collect();
    writeln!(out, "{}", render_table(&RESULTS_HEADER, &rows))?;

    if show_rounds {
        for (i, s) in summaries.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "{}. {}", i + 1, s.player_name)?;
            let rounds: Vec<Vec<String>> = s.rounds.iter().map(present_round).collect();
            writeln!(out, "{}", render_table(&ROUNDS_HEADER, &rounds))?;
        }
    }
    Ok(())
}

fn write_csv<W: Write>(out: &mut W, summaries: &[SessionSummary], show_rounds: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    if show_rounds {
        wtr.write_record([
            "player",
            "round",
            "points",
            "start_time",
            "guess_duration_ms",
            "gap_before_ms",
        ])?;
        for s in summaries {
            for r in &s.rounds {
                wtr.write_record([
                    s.player_name.clone(),
                    r.round_number.to_string(),
                    r.points.to_string(),
                    r.start_time.to_string(),
                    r.guess_duration_ms.to_string(),
                    r.gap_before_ms.map(|g| g.to_string()).unwrap_or_default(),
                ])?;
            }
        }
    } else {
        wtr.write_record([
            "player",
            "first_round_start",
            "last_round_start",
            "last_round_end",
            "total_elapsed_ms",
            "rounds_played",
            "median_gap_ms",
            "max_gap_ms",
            "total_points",
        ])?;
        for s in summaries {
            wtr.write_record([
                s.player_name.clone(),
                s.first_round_start.to_string(),
                s.last_round_start.to_string(),
                s.last_round_end.to_string(),
                s.total_elapsed_ms.to_string(),
                s.rounds_played.to_string(),
                s.median_gap_ms.to_string(),
                s.max_gap_ms.to_string(),
                s.total_points.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PlayerSession;
    use crate::timing::summarize;

    fn summaries() -> Vec<SessionSummary> {
        let sessions = vec![
            PlayerSession::new(
                "ana",
                vec![(0, 5_000).into(), (10_000, 3_000).into(), (25_000, 4_000).into()],
            ),
            PlayerSession::new("bo", vec![(100, 1_000).into()]),
        ];
        summarize(&sessions).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0m0s");
        assert_eq!(format_duration(8_500.0), "0m8s");
        assert_eq!(format_duration(29_000.0), "0m29s");
        assert_eq!(format_duration(61_999.0), "1m1s");
        assert_eq!(format_duration(3_600_000.0), "60m0s");
        assert_eq!(format_duration(-5.0), "0m0s");
    }

    #[test]
    fn test_present_round_first_has_no_gap() {
        let all = summaries();
        assert_eq!(present_round(&all[0].rounds[0])[4], "");
        assert_eq!(present_round(&all[0].rounds[2])[4], "0m12s");
    }

    #[test]
    fn test_render_table_aligns_wide_names() {
        let rows = vec![
            vec!["1".to_string(), "日本".to_string()],
            vec!["2".to_string(), "abcd".to_string()],
        ];
        let table = render_table(&["#", "Player"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "#  Player");
        assert_eq!(lines[1], "-  ------");
        assert_eq!(lines[2], "1  日本");
        assert_eq!(lines[3], "2  abcd");
    }

    #[test]
    fn test_table_report_lists_players_in_order() {
        let mut buf = Vec::new();
        write_report(&mut buf, &summaries(), OutputFormat::Table, false).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let ana = text.find("ana").unwrap();
        let bo = text.find("bo").unwrap();
        assert!(ana < bo);
        assert!(text.contains("0m29s"));
        assert!(text.contains("0m12s"));
    }

    #[test]
    fn test_table_report_with_rounds() {
        let mut buf = Vec::new();
        write_report(&mut buf, &summaries(), OutputFormat::Table, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Gap before"));
        assert!(text.contains("R3"));
    }

    #[test]
    fn test_csv_report() {
        let mut buf = Vec::new();
        write_report(&mut buf, &summaries(), OutputFormat::Csv, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("player,first_round_start"));
        assert_eq!(lines[1], "ana,0,25000,29000,29000,3,8500,12000,0");
        assert_eq!(lines[2], "bo,100,100,1100,1000,1,0,0,0");
    }

    #[test]
    fn test_csv_rounds_report() {
        let mut buf = Vec::new();
        write_report(&mut buf, &summaries(), OutputFormat::Csv, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ana,1,0,0,5000,\n"));
        assert!(text.contains("ana,2,0,10000,3000,5000\n"));
    }

    #[test]
    fn test_json_report_roundtrips() {
        let mut buf = Vec::new();
        let expected = summaries();
        write_report(&mut buf, &expected, OutputFormat::Json, false).unwrap();
        let parsed: Vec<SessionSummary> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
