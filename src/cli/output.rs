// Output formatting for CLI

use std::io::Write;

use anyhow::Result;
use chaptag::{AudioFile, Chapter, ChapterToc, Version};
use chrono::NaiveTime;
use serde::Serialize;

use super::config::OutputFormat;

/// Everything printed for one file
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub file: String,
    pub version: Option<Version>,
    pub tables_of_contents: Vec<&'a ChapterToc>,
    pub chapters: Vec<&'a Chapter>,
}

impl<'a> FileReport<'a> {
    pub fn new(audio: &'a AudioFile) -> Self {
        FileReport {
            file: audio.path.display().to_string(),
            version: audio.version(),
            tables_of_contents: audio.tables_of_contents(),
            chapters: audio.chapters(),
        }
    }
}

/// Tag summary printed by `detect`
#[derive(Debug, Serialize)]
pub struct Detection {
    pub file: String,
    pub version: Option<Version>,
    pub chapters: usize,
    pub tables_of_contents: usize,
}

impl Detection {
    pub fn new(audio: &AudioFile) -> Self {
        Detection {
            file: audio.path.display().to_string(),
            version: audio.version(),
            chapters: audio.chapters().len(),
            tables_of_contents: audio.tables_of_contents().len(),
        }
    }
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one file's chapters
    pub fn output_report(&self, report: &FileReport, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(report)?)?;
            }
            OutputFormat::Table => {
                self.output_table(report, writer)?;
            }
        }
        Ok(())
    }

    /// Output one file's tag summary
    pub fn output_detection(&self, detection: &Detection, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(detection)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(detection)?)?;
            }
            OutputFormat::Table => match detection.version {
                Some(version) => writeln!(
                    writer,
                    "{}: ID3v{} ({} chapters, {} tables of contents)",
                    detection.file, version, detection.chapters, detection.tables_of_contents
                )?,
                None => writeln!(writer, "{}: no ID3v2 tag", detection.file)?,
            },
        }
        Ok(())
    }

    /// Output as aligned text
    fn output_table(&self, report: &FileReport, writer: &mut dyn Write) -> Result<()> {
        match report.version {
            Some(version) => writeln!(writer, "{} (ID3v{})", report.file, version)?,
            None => {
                writeln!(writer, "{} (no ID3v2 tag)", report.file)?;
                return Ok(());
            }
        }

        for toc in &report.tables_of_contents {
            let mut markers = Vec::new();
            if toc.flags.top_level {
                markers.push("top-level");
            }
            if toc.flags.ordered {
                markers.push("ordered");
            }
            write!(writer, "  TOC {}", toc.element_id)?;
            if !markers.is_empty() {
                write!(writer, " [{}]", markers.join(", "))?;
            }
            writeln!(writer, ": {}", toc.entries.join(", "))?;
        }

        let id_width = report.chapters.iter().map(|c| c.element_id.len()).max().unwrap_or(0);
        for chapter in &report.chapters {
            writeln!(
                writer,
                "  {:<width$}  {} - {}  {}",
                chapter.element_id,
                format_time(chapter.start_time),
                format_time(chapter.end_time),
                chapter.title(),
                width = id_width
            )?;
        }
        if report.chapters.is_empty() {
            writeln!(writer, "  (no chapters)")?;
        }
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

/// Render milliseconds as HH:MM:SS.mmm, falling back to raw milliseconds past a day
pub fn format_time(ms: u32) -> String {
    NaiveTime::from_num_seconds_from_midnight_opt(ms / 1000, (ms % 1000) * 1_000_000)
        .map(|t| t.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| format!("{}ms", ms))
}
