// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering helpers.

use std::io::{IsTerminal, Write};

use colored::Colorize;
use volley_core::{GenerationSlot, HistoryRecord, SavedPrompt, SlotStatus, TerminalStatus};

/// Whether stdout gets colors and live progress.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    pub fn detect(plain: bool) -> Self {
        Self {
            color: !plain && std::io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.color
    }

    pub fn success(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn failure(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn muted(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn star(&self, favorite: bool) -> String {
        match (favorite, self.color) {
            (true, true) => "★".yellow().to_string(),
            (true, false) => "*".to_string(),
            (false, _) => " ".to_string(),
        }
    }

    pub fn slot_status(&self, status: SlotStatus) -> String {
        let label = format!("{:<9}", status.to_string());
        match status {
            SlotStatus::Completed => self.success(&label),
            SlotStatus::Errored => self.failure(&label),
            SlotStatus::Pending | SlotStatus::Streaming => self.muted(&label),
        }
    }
}

/// Single-line live status for a running batch, redrawn in place on stderr.
pub struct Progress {
    style: Style,
    drawn: bool,
}

impl Progress {
    pub fn new(style: Style) -> Self {
        Self { style, drawn: false }
    }

    pub fn update(&mut self, slots: &[GenerationSlot], aborting: bool) {
        if !self.style.is_interactive() {
            return;
        }
        let line = progress_line(slots, aborting);
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r\x1b[2K{}", self.style.muted(&line));
        let _ = stderr.flush();
        self.drawn = true;
    }

    pub fn finish(&mut self) {
        if self.drawn {
            let _ = write!(std::io::stderr(), "\r\x1b[2K");
            self.drawn = false;
        }
    }
}

/// e.g. `[##..] 2/4 done, 1 streaming, 312 chars`
pub fn progress_line(slots: &[GenerationSlot], aborting: bool) -> String {
    let bar: String = slots
        .iter()
        .map(|s| match s.status {
            SlotStatus::Completed => '#',
            SlotStatus::Errored => '!',
            SlotStatus::Streaming => '~',
            SlotStatus::Pending => '.',
        })
        .collect();
    let done = slots.iter().filter(|s| s.status.is_terminal()).count();
    let streaming = slots.iter().filter(|s| s.status == SlotStatus::Streaming).count();
    let chars: usize = slots.iter().map(|s| s.content.chars().count()).sum();
    let mut line = format!("[{bar}] {done}/{} done, {streaming} streaming, {chars} chars", slots.len());
    if aborting {
        line.push_str(" (aborting)");
    }
    line
}

pub fn print_slots(slots: &[GenerationSlot], style: Style) {
    for slot in slots {
        println!(
            "{} {} {}",
            style.heading(&format!("#{}", slot.slot_index + 1)),
            style.slot_status(slot.status),
            style.muted(&format_duration(slot.duration_ms)),
        );
        if let Some(error) = &slot.error {
            println!("  {}", style.failure(error));
        }
        if !slot.content.is_empty() {
            for line in slot.content.lines() {
                println!("  {line}");
            }
        }
        println!();
    }
}

pub fn print_prompts(prompts: &[SavedPrompt], style: Style) {
    if prompts.is_empty() {
        println!("{}", style.muted("no saved prompts"));
        return;
    }
    for prompt in prompts {
        println!(
            "{} {}  {}  {}",
            style.star(prompt.is_favorite),
            style.muted(&prompt.id),
            style.heading(&prompt.title),
            truncate(&prompt.content, 60),
        );
    }
}

pub fn print_history(records: &[HistoryRecord], style: Style) {
    if records.is_empty() {
        println!("{}", style.muted("no runs yet"));
        return;
    }
    for record in records {
        let errored = record
            .results
            .iter()
            .filter(|r| r.status == TerminalStatus::Errored)
            .count();
        let outcome = if errored == 0 {
            style.success(&format!("{} ok", record.results.len()))
        } else {
            style.failure(&format!("{errored}/{} failed", record.results.len()))
        };
        println!(
            "{} {}  {}  {}  {}",
            style.star(record.is_favorite),
            style.muted(record.id.as_str()),
            format_timestamp(record.timestamp),
            outcome,
            truncate(&record.user_prompt, 50),
        );
    }
}

pub fn print_record(record: &HistoryRecord, style: Style) {
    println!("{} {}", style.heading("Run"), record.id);
    println!("  {}  {}", style.muted("at"), format_timestamp(record.timestamp));
    println!(
        "  {}  {} (temperature {}, thinking {}, {} outputs)",
        style.muted("model"),
        record.config.model,
        record.config.temperature,
        record.config.thinking,
        record.config.output_count,
    );
    println!();
    println!("{}", style.heading("System prompt"));
    println!("{}", indent(&record.system_prompt));
    println!("{}", style.heading("User prompt"));
    println!("{}", indent(&record.user_prompt));
    println!();

    for (i, result) in record.results.iter().enumerate() {
        let status = match result.status {
            TerminalStatus::Completed => style.success("completed"),
            TerminalStatus::Errored => style.failure("error"),
        };
        println!(
            "{} {} {}",
            style.heading(&format!("#{}", i + 1)),
            status,
            style.muted(&format_duration(result.duration_ms)),
        );
        if let Some(error) = &result.error {
            println!("  {}", style.failure(error));
        }
        println!("{}", indent(&result.content));
        println!();
    }
}

pub fn format_duration(ms: Option<u64>) -> String {
    match ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{ms}ms"),
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
    }
}

pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// First line only, cut to `max` chars.
pub fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(max).collect();
    if line.chars().count() > max || text.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {l}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(850)), "850ms");
        assert_eq!(format_duration(Some(1340)), "1.3s");
    }

    #[test]
    fn truncate_is_char_aware() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 5), "héllo…");
        assert_eq!(truncate("one\ntwo", 10), "one…");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn progress_line_counts() {
        let mut slots: Vec<GenerationSlot> = (0..4).map(GenerationSlot::pending).collect();
        slots[0].append("abc");
        slots[0].complete(Some(10));
        slots[1].append("de");
        slots[2].fail("boom", None);

        let line = progress_line(&slots, false);
        assert_eq!(line, "[#~!.] 2/4 done, 1 streaming, 5 chars");
        assert!(progress_line(&slots, true).ends_with("(aborting)"));
    }

    #[test]
    fn plain_style_has_no_escapes() {
        let style = Style::plain();
        assert_eq!(style.success("ok"), "ok");
        assert_eq!(style.star(true), "*");
        assert_eq!(style.slot_status(SlotStatus::Errored).trim_end(), "errored");
    }

    #[test]
    fn invalid_timestamp_renders_dash() {
        assert_eq!(format_timestamp(i64::MAX), "-");
    }
}
