use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Duration, Local, Utc};

use crate::models::{LabelCount, MoodRecord};
use crate::vocabulary::{alternate_join, marker_for};

pub fn cutoff(since_days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(since_days.max(1))
}

pub fn summarize_labels<'a>(labels: impl IntoIterator<Item = &'a String>) -> Vec<LabelCount> {
    let mut map: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *map.entry(label.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<LabelCount> = map
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();

    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    counts
}

pub fn average_mood(records: &[MoodRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: i32 = records.iter().map(|record| record.mood_level).sum();
    Some(total as f64 / records.len() as f64)
}

/// One-line summary, as shown by `today`.
pub fn describe_record(record: &MoodRecord) -> String {
    format!(
        "{} {} mood {} | emosi: {} | sumber: {}",
        record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        marker_for(record.mood_level).unwrap_or("?"),
        record.mood_level,
        alternate_join(&record.emotions),
        alternate_join(&record.emotion_sources)
    )
}

pub fn build_report(
    owner_id: &str,
    since_days: i64,
    cutoff: DateTime<Utc>,
    records: &[MoodRecord],
) -> String {
    let emotions = summarize_labels(records.iter().flat_map(|record| &record.emotions));
    let sources = summarize_labels(records.iter().flat_map(|record| &record.emotion_sources));

    let mut output = String::new();

    let _ = writeln!(output, "# Mood Journal Report");
    let _ = writeln!(
        output,
        "Generated for {} over the last {} days (since {})",
        owner_id,
        since_days.max(1),
        cutoff.with_timezone(&Local).format("%Y-%m-%d")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");

    match average_mood(records) {
        Some(average) => {
            let _ = writeln!(
                output,
                "- {} entries, average mood {:.1}",
                records.len(),
                average
            );
        }
        None => {
            let _ = writeln!(output, "No entries recorded for this window.");
        }
    }

    for (title, counts) in [("Top Emotions", &emotions), ("Top Sources", &sources)] {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {title}");
        if counts.is_empty() {
            let _ = writeln!(output, "Nothing recorded yet.");
        }
        for count in counts.iter().take(5) {
            let _ = writeln!(output, "- {}: {}", count.label, count.count);
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Entries");

    if recent.is_empty() {
        let _ = writeln!(output, "No entries recorded for this window.");
    } else {
        for record in recent.iter().take(7) {
            let _ = writeln!(output, "- {}", describe_record(record));
        }
    }

    output
}
