//! Replay a captured dry-run log against the live wiki.
//!
//! A previous dry run printed `Page N title: ...` lines with
//! `<from> ... <to> ... <end>` replacement notes and full proposed-save
//! text blocks. This bot parses that log and applies the recorded edits,
//! page by page, verifying each `<from>` string still occurs before
//! touching anything.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;

use wiktbot::error::BotError;
use wiktbot::fixlog::FixLog;
use wiktbot::mediawiki::MediaWikiStore;
use wiktbot::orchestrator::{run_batch, BotArgs, Outcome};
use wiktbot::store::PageStore;

#[derive(Parser)]
#[clap(about = "Apply the edits recorded in a dry-run log")]
struct Args {
    /// Log file captured from a previous dry run
    logfile: PathBuf,

    #[clap(flatten)]
    bot: BotArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();
    let mut args = Args::parse();

    let log = FixLog::parse(&fs::read_to_string(&args.logfile)?);
    let replacements = log.replacements_by_title();
    let saves: std::collections::HashMap<String, String> = log
        .saves
        .iter()
        .map(|s| (s.title.clone(), s.text.clone()))
        .collect();

    // default to the pages the log names, unless a selection was given
    if args.bot.pages.is_empty()
        && args.bot.pagefile.is_none()
        && args.bot.cats.is_empty()
        && args.bot.refs.is_empty()
        && !args.bot.stdin
    {
        args.bot.pages = log.titles();
    }

    let mut store = MediaWikiStore::from_env()?;

    let mut transform = |title: &str, text: &str| -> Result<Outcome, BotError> {
        if let Some(new_text) = saves.get(title) {
            if new_text == text {
                return Ok(Outcome::NoChange);
            }
            return Ok(Outcome::Changed {
                text: new_text.clone(),
                notes: vec!["apply logged rewrite".to_string()],
            });
        }
        let Some(fixes) = replacements.get(title) else {
            return Ok(Outcome::NoChange);
        };
        let mut out = text.to_string();
        let mut notes = Vec::new();
        for fix in fixes {
            if !out.contains(&fix.from) {
                return Err(BotError::Message(format!(
                    "logged text not found on page: {}",
                    fix.from
                )));
            }
            out = out.replacen(&fix.from, &fix.to, 1);
            notes.push(format!("replace {} with {}", fix.from, fix.to));
        }
        if notes.is_empty() {
            return Ok(Outcome::NoChange);
        }
        Ok(Outcome::Changed { text: out, notes })
    };

    run_batch(
        &args.bot,
        Some(&mut store as &mut dyn PageStore),
        &mut transform,
    )?;
    Ok(())
}
