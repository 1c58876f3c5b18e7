// CLI command implementations
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chaptag::AudioFile;
use glob::glob;
use tracing::debug;

use super::output::{Detection, FileReport, OutputFormatter};

/// Expand glob patterns; plain paths pass through untouched
pub fn expand_paths(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.contains(|c: char| matches!(c, '*' | '?' | '[')) {
            let before = paths.len();
            for entry in glob(input).with_context(|| format!("invalid glob pattern {}", input))? {
                let path = entry?;
                if path.is_file() {
                    paths.push(path);
                }
            }
            debug!(pattern = %input, matched = paths.len() - before, "expanded pattern");
        } else {
            paths.push(PathBuf::from(input));
        }
    }
    Ok(paths)
}

/// Read chapters from files; returns the number of files that failed
pub fn command_read(files: &[String], output: Option<&str>, formatter: &OutputFormatter) -> Result<usize> {
    let paths = expand_paths(files)?;
    if paths.is_empty() {
        formatter.print_info("No files found");
        return Ok(0);
    }

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    let mut failures = 0;
    for path in &paths {
        match AudioFile::open(path) {
            Ok(audio) => {
                formatter.output_report(&FileReport::new(&audio), &mut *writer)?;
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
    }
    writer.flush()?;

    if let Some(path) = output {
        formatter.print_success(&format!("Wrote {} file(s) to {}", paths.len() - failures, path));
    }
    Ok(failures)
}

/// Report tag version and chapter count per file
pub fn command_detect(files: &[String], formatter: &OutputFormatter) -> Result<usize> {
    let paths = expand_paths(files)?;
    if paths.is_empty() {
        formatter.print_info("No files found");
        return Ok(0);
    }

    let mut stdout = std::io::stdout().lock();
    let mut failures = 0;
    for path in &paths {
        match AudioFile::open(path) {
            Ok(audio) => formatter.output_detection(&Detection::new(&audio), &mut stdout)?,
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
    }
    stdout.flush()?;
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_not_globbed() {
        let paths = expand_paths(&["missing.mp3".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("missing.mp3")]);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(expand_paths(&["[".to_string()]).is_err());
    }
}
