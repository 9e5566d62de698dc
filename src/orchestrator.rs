//! Batch driver: run one transform over a selected set of pages with
//! uniform fetch/diff/save handling.
//!
//! Per page the state machine is Fetch → Transform → {NoChange, Changed,
//! Error}. Page-local errors are logged with the page index and title and
//! the batch moves on; transient backend errors are retried a bounded number
//! of times before aborting the run; programming errors (see
//! [`BotError::is_programming_error`]) abort immediately.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use unicode_normalization::UnicodeNormalization;

use crate::dump::DumpReader;
use crate::error::{BotError, StoreError};
use crate::fixlog::{log_page, write_proposed_save};
use crate::store::PageStore;
use crate::PageSource;

const MAX_RETRIES: u32 = 3;
const RETRY_SLEEP: Duration = Duration::from_secs(5);
/// How often (in pages) to emit a progress estimate on long runs.
const PROGRESS_EVERY: u64 = 100;

/// The argument surface shared by every bot; flatten this into each bot's
/// own `Args` struct. Exactly one selection mode governs a run, with
/// precedence `--pages` > `--pagefile` > `--cats` > `--refs` > `--stdin`.
#[derive(Debug, Clone, Default, Args)]
pub struct BotArgs {
    /// First page to process: numeric index or title cutoff
    pub start: Option<String>,

    /// Last page to process: numeric index or title cutoff
    pub end: Option<String>,

    /// Actually persist changes; without this the run is a dry run
    #[clap(long)]
    pub save: bool,

    /// Log unchanged pages too
    #[clap(short, long)]
    pub verbose: bool,

    /// Show a line diff of every change
    #[clap(long)]
    pub diff: bool,

    /// Explicit page titles to process
    #[clap(long, value_delimiter = ',')]
    pub pages: Vec<String>,

    /// File with one page title per line
    #[clap(long)]
    pub pagefile: Option<PathBuf>,

    /// Process the members of these categories
    #[clap(long, value_delimiter = ',')]
    pub cats: Vec<String>,

    /// Process the pages referencing these titles
    #[clap(long, value_delimiter = ',')]
    pub refs: Vec<String>,

    /// Read a MediaWiki XML dump from standard input
    #[clap(long)]
    pub stdin: bool,
}

/// What a per-page transform decided. `Changed` carries one note per edit
/// made; notes become the change comment, de-duplicated and counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoChange,
    Changed { text: String, notes: Vec<String> },
}

/// End-of-run accounting. Accumulates monotonically for the lifetime of one
/// process invocation; flushed to the log when the batch finishes.
#[derive(Debug, Default)]
pub struct BatchStats {
    pub pages_seen: u64,
    pub pages_changed: u64,
    pub pages_saved: u64,
    pub pages_skipped: u64,
    /// Note text → how many pages produced it.
    pub note_counts: HashMap<String, u64>,
}

enum Bound {
    Index(u64),
    Title(String),
}

impl Bound {
    fn parse(arg: &str) -> Bound {
        match arg.parse::<u64>() {
            Ok(n) => Bound::Index(n),
            Err(_) => Bound::Title(arg.to_string()),
        }
    }

    fn starts_before(&self, index: u64, title: &str) -> bool {
        match self {
            Bound::Index(n) => index >= *n,
            Bound::Title(t) => title >= t.as_str(),
        }
    }

    fn ends_after(&self, index: u64, title: &str) -> bool {
        match self {
            Bound::Index(n) => index > *n,
            Bound::Title(t) => title > t.as_str(),
        }
    }
}

/// Which pages a run covers.
pub enum Selection {
    Titles(Vec<String>),
    Dump,
}

/// Resolve the selection mode from the argument surface, honoring the
/// documented precedence order.
pub fn resolve_selection(
    args: &BotArgs,
    store: &mut Option<&mut dyn PageStore>,
) -> Result<Selection, BotError> {
    if !args.pages.is_empty() {
        return Ok(Selection::Titles(args.pages.clone()));
    }
    if let Some(path) = &args.pagefile {
        let content = fs::read_to_string(path)?;
        return Ok(Selection::Titles(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        ));
    }
    if !args.cats.is_empty() {
        let store = store.as_deref_mut().ok_or(StoreError::NoStore)?;
        let mut titles = Vec::new();
        for cat in &args.cats {
            titles.extend(with_retries(|| store.list_category_members(cat))?);
        }
        return Ok(Selection::Titles(titles));
    }
    if !args.refs.is_empty() {
        let store = store.as_deref_mut().ok_or(StoreError::NoStore)?;
        let mut titles = Vec::new();
        for target in &args.refs {
            titles.extend(with_retries(|| store.list_pages_referencing(target))?);
        }
        return Ok(Selection::Titles(titles));
    }
    if args.stdin {
        return Ok(Selection::Dump);
    }
    Err(BotError::Message(
        "no page selection given (use --pages, --pagefile, --cats, --refs or --stdin)".to_string(),
    ))
}

/// Drive `transform` over the selected pages. `store` may be `None` only
/// for a dry run over `--stdin` input.
pub fn run_batch(
    args: &BotArgs,
    mut store: Option<&mut dyn PageStore>,
    transform: &mut dyn FnMut(&str, &str) -> Result<Outcome, BotError>,
) -> Result<BatchStats, BotError> {
    if args.save && store.is_none() {
        return Err(StoreError::NoStore.into());
    }
    let selection = resolve_selection(args, &mut store)?;
    let start = args.start.as_deref().map(Bound::parse);
    let end = args.end.as_deref().map(Bound::parse);

    let mut stats = BatchStats::default();
    let started = Instant::now();
    let mut index: u64 = 0;

    match selection {
        Selection::Titles(titles) => {
            let total = titles.len();
            for title in titles {
                index += 1;
                if let Some(start) = &start {
                    if !start.starts_before(index, &title) {
                        continue;
                    }
                }
                if let Some(end) = &end {
                    if end.ends_after(index, &title) {
                        break;
                    }
                }
                let store = store.as_deref_mut().ok_or(StoreError::NoStore)?;
                let text = match with_retries(|| store.get_text(&title)) {
                    Ok(text) => text,
                    Err(StoreError::NotFound { .. }) => {
                        log_page(index, &title, "WARNING: page does not exist, skipped");
                        stats.pages_skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                process_page(args, &mut Some(store), transform, index, &title, &text, &mut stats)?;
                report_progress(index, Some(total as u64), started.elapsed());
            }
        }
        Selection::Dump => {
            let stdin = io::stdin();
            let mut reader = DumpReader::new(stdin.lock());
            while let Some(page) = reader.next_page()? {
                // main namespace only
                if page.ns != Some(0) {
                    continue;
                }
                index += 1;
                if let Some(start) = &start {
                    if !start.starts_before(index, &page.title) {
                        continue;
                    }
                }
                if let Some(end) = &end {
                    if end.ends_after(index, &page.title) {
                        break;
                    }
                }
                process_page(
                    args,
                    &mut store,
                    transform,
                    index,
                    &page.title,
                    &page.rev_text,
                    &mut stats,
                )?;
                report_progress(index, None, started.elapsed());
            }
        }
    }

    flush_stats(&stats, started.elapsed());
    Ok(stats)
}

fn process_page(
    args: &BotArgs,
    store: &mut Option<&mut dyn PageStore>,
    transform: &mut dyn FnMut(&str, &str) -> Result<Outcome, BotError>,
    index: u64,
    title: &str,
    text: &str,
    stats: &mut BatchStats,
) -> Result<(), BotError> {
    stats.pages_seen += 1;
    let outcome = match transform(title, text) {
        Ok(outcome) => outcome,
        Err(e) if e.is_programming_error() => return Err(e),
        Err(e) => {
            log_page(index, title, &format!("WARNING: {}", e));
            stats.pages_skipped += 1;
            return Ok(());
        }
    };
    let (new_text, notes) = match outcome {
        Outcome::NoChange => {
            if args.verbose {
                log_page(index, title, "no change");
            }
            return Ok(());
        }
        Outcome::Changed { text, notes } => (text, notes),
    };

    // normalize before comparing so server-side NFC does not make every
    // subsequent run look like a change
    if nfc(text) == nfc(&new_text) {
        if args.verbose {
            log_page(index, title, "no change after normalization");
        }
        return Ok(());
    }

    stats.pages_changed += 1;
    for note in &notes {
        *stats.note_counts.entry(note.clone()).or_insert(0) += 1;
    }
    let comment = compose_comment(&notes);

    if args.diff {
        print_diff(text, &new_text);
    }
    if args.save {
        let store = store.as_deref_mut().ok_or(StoreError::NoStore)?;
        match with_retries(|| store.save_text(title, &new_text, &comment)) {
            Ok(()) => {
                stats.pages_saved += 1;
                log_page(index, title, &format!("Saved with comment = {}", comment));
            }
            Err(e @ StoreError::Transient { .. }) => return Err(e.into()),
            Err(e) => {
                log_page(index, title, &format!("WARNING: save failed, skipped: {}", e));
                stats.pages_skipped += 1;
            }
        }
    } else {
        let mut stdout = io::stdout().lock();
        write_proposed_save(&mut stdout, index, title, &comment, &new_text)?;
    }
    Ok(())
}

/// Retry transient backend errors with a fixed budget and sleep; everything
/// else passes straight through. Exhausting the budget surfaces the last
/// transient error, which aborts the batch.
pub fn with_retries<T>(mut call: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
    let mut attempt = 0;
    loop {
        match call() {
            Err(StoreError::Transient { message }) if attempt < MAX_RETRIES => {
                attempt += 1;
                log::warn!(
                    "transient backend error (attempt {}/{}): {}",
                    attempt,
                    MAX_RETRIES,
                    message
                );
                thread::sleep(RETRY_SLEEP);
            }
            other => return other,
        }
    }
}

/// Compose a change comment from per-edit notes, de-duplicating repeats
/// into a count: `fix head (3); rename template`.
pub fn compose_comment(notes: &[String]) -> String {
    if notes.is_empty() {
        return "routine maintenance edit".to_string();
    }
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for note in notes {
        if !counts.contains_key(note.as_str()) {
            order.push(note);
        }
        *counts.entry(note).or_insert(0) += 1;
    }
    order
        .iter()
        .map(|note| {
            let count = counts[note];
            if count > 1 {
                format!("{} ({})", note, count)
            } else {
                note.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Estimate time remaining from progress so far. `None` until at least one
/// page is done.
pub fn estimate_remaining(done: u64, total: u64, elapsed: Duration) -> Option<Duration> {
    if done == 0 || total <= done {
        return None;
    }
    let per_page = elapsed.as_secs_f64() / done as f64;
    Some(Duration::from_secs_f64(per_page * (total - done) as f64))
}

fn report_progress(done: u64, total: Option<u64>, elapsed: Duration) {
    if done % PROGRESS_EVERY != 0 {
        return;
    }
    match total.and_then(|t| estimate_remaining(done, t, elapsed)) {
        Some(remaining) => log::info!(
            "{} pages done in {:?}, about {:?} remaining",
            done,
            elapsed,
            remaining
        ),
        None => log::info!("{} pages done in {:?}", done, elapsed),
    }
}

fn flush_stats(stats: &BatchStats, elapsed: Duration) {
    log::info!(
        "batch finished in {:?}: {} seen, {} changed, {} saved, {} skipped",
        elapsed,
        stats.pages_seen,
        stats.pages_changed,
        stats.pages_saved,
        stats.pages_skipped
    );
    let mut notes: Vec<(&String, &u64)> = stats.note_counts.iter().collect();
    notes.sort();
    for (note, count) in notes {
        log::info!("  {} x{}", note, count);
    }
}

fn nfc(text: &str) -> String {
    text.nfc().collect()
}

/// Minimal line diff for `--diff`: unchanged common prefix and suffix are
/// elided, removed lines print with `-`, added lines with `+`.
fn print_diff(old: &str, new: &str) {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let mut prefix = 0;
    while prefix < old_lines.len()
        && prefix < new_lines.len()
        && old_lines[prefix] == new_lines[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old_lines.len() - prefix
        && suffix < new_lines.len() - prefix
        && old_lines[old_lines.len() - 1 - suffix] == new_lines[new_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }
    for line in &old_lines[prefix..old_lines.len() - suffix] {
        println!("- {}", line);
    }
    for line in &new_lines[prefix..new_lines.len() - suffix] {
        println!("+ {}", line);
    }
}
