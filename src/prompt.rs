//! Interactive questions: yes/no confirmations and picking from a list.
//!
//! The pipeline only talks to the [`Prompter`] trait. [`LinePrompter`] asks on
//! any line-oriented reader/writer pair; [`LinePrompter::terminal`] binds it to
//! stdin and stderr so piped stdout stays clean.

use crate::naming;
use std::io::{self, BufRead, BufReader, Stderr, Stdin, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::{DirEntry, WalkDir};

pub trait Prompter {
    /// Ask a yes/no question. End of input counts as "no".
    fn confirm(&self, message: &str) -> io::Result<bool>;

    /// Pick one of `choices`. `None` when the user cancels.
    fn select(&self, message: &str, choices: &[String]) -> io::Result<Option<usize>>;
}

pub struct LinePrompter<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl LinePrompter<BufReader<Stdin>, Stderr> {
    pub fn terminal() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Write `text`, then read one trimmed line. `None` on end of input.
    fn ask(&self, text: &str) -> io::Result<Option<String>> {
        {
            let mut output = self.output.lock().map_err(|_| poisoned())?;
            write!(output, "{text}")?;
            output.flush()?;
        }
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .map_err(|_| poisoned())?
            .read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_string()))
    }

    fn say(&self, text: &str) -> io::Result<()> {
        let mut output = self.output.lock().map_err(|_| poisoned())?;
        writeln!(output, "{text}")
    }
}

fn poisoned() -> io::Error {
    io::Error::other("prompt stream lock poisoned")
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{message} [y/N] "))?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")))
    }

    fn select(&self, message: &str, choices: &[String]) -> io::Result<Option<usize>> {
        if choices.is_empty() {
            return Ok(None);
        }
        self.say(message)?;
        for (i, choice) in choices.iter().enumerate() {
            self.say(&format!("  {:>3}) {choice}", i + 1))?;
        }
        loop {
            let Some(answer) = self.ask(&format!("Choose 1-{} (empty to cancel): ", choices.len()))?
            else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => self.say(&format!("'{answer}' is not a choice"))?,
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Markdown files under `root`, sorted, skipping hidden files and directories.
///
/// Unreadable entries are skipped.
pub fn find_markdown_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && naming::is_markdown(e.path()))
        .map(DirEntry::into_path)
        .collect()
}

/// Let the user pick a markdown file under `root`.
///
/// `Ok(None)` when there is nothing to pick or the user cancels.
pub fn select_markdown_file(
    prompter: &dyn Prompter,
    root: &Path,
    max_depth: usize,
) -> io::Result<Option<PathBuf>> {
    let files = find_markdown_files(root, max_depth);
    if files.is_empty() {
        tracing::warn!(root = %root.display(), "no markdown files found");
        return Ok(None);
    }
    let labels: Vec<String> = files
        .iter()
        .map(|f| f.strip_prefix(root).unwrap_or(f).display().to_string())
        .collect();
    let message = format!("Markdown files under {}:", root.display());
    Ok(prompter
        .select(&message, &labels)?
        .map(|i| files[i].clone()))
}
