//! Close the gaps in `head`/`head2`/`head3`... parameter chains on English
//! headword-line templates.
//!
//! A chain with a hole, say `head` and `head3` populated but `head2` empty
//! or absent, renders wrongly; this bot renumbers the populated values into
//! a contiguous run and removes the stale keys.

use std::error::Error;

use clap::Parser;
use dotenv::dotenv;

use wiktbot::chain::{fetch_chain, set_chain, HolePolicy};
use wiktbot::document::Document;
use wiktbot::mediawiki::MediaWikiStore;
use wiktbot::orchestrator::{run_batch, BotArgs, Outcome};
use wiktbot::section::find_modifiable_section;
use wiktbot::store::PageStore;
use wiktbot::BotError;

const HEADWORD_TEMPLATES: [&str; 6] = [
    "en-noun",
    "en-verb",
    "en-adj",
    "en-adv",
    "en-proper noun",
    "head",
];

#[derive(Parser)]
#[clap(about = "Renumber gappy head= chains on English headword lines")]
struct Args {
    /// Language section to edit
    #[clap(long, default_value = "English")]
    language: String,

    #[clap(flatten)]
    bot: BotArgs,
}

fn normalize(text: &str, language: &str) -> Result<Outcome, BotError> {
    let section = find_modifiable_section(text, Some(language))?;
    let mut doc = Document::parse(&section.body)?;
    let mut notes = Vec::new();
    for t in doc.templates_mut() {
        if !HEADWORD_TEMPLATES.contains(&t.name()) {
            continue;
        }
        let with_holes = fetch_chain(t, &["head"], Some("head"), HolePolicy::Allow)?;
        if !with_holes.iter().any(Option::is_none) {
            continue;
        }
        let closed: Vec<String> = with_holes.into_iter().flatten().collect();
        let closed_refs: Vec<&str> = closed.iter().map(String::as_str).collect();
        let name = t.name().to_string();
        set_chain(t, &closed_refs, &["head"], Some("head"))?;
        notes.push(format!("close gaps in head chain of {{{{{}}}}}", name));
    }
    if notes.is_empty() {
        return Ok(Outcome::NoChange);
    }
    Ok(Outcome::Changed {
        text: section.reassemble(&doc.to_wikitext()),
        notes,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let mut store = if args.bot.stdin && !args.bot.save {
        None
    } else {
        Some(MediaWikiStore::from_env()?)
    };

    let mut transform =
        |_title: &str, text: &str| -> Result<Outcome, BotError> { normalize(text, &args.language) };

    run_batch(
        &args.bot,
        store.as_mut().map(|s| s as &mut dyn PageStore),
        &mut transform,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closes_hole_in_head_chain() {
        let text = "==English==\n{{en-noun|head=a|head3=c}}\n";
        match normalize(text, "English").unwrap() {
            Outcome::Changed { text, notes } => {
                assert_eq!(text, "==English==\n{{en-noun|head=a|head2=c}}\n");
                assert_eq!(notes.len(), 1);
            }
            Outcome::NoChange => panic!("expected a change"),
        }
    }

    #[test]
    fn test_contiguous_chain_left_alone() {
        let text = "==English==\n{{en-noun|head=a|head2=b}}\n";
        assert_eq!(normalize(text, "English").unwrap(), Outcome::NoChange);
    }

    #[test]
    fn test_missing_language_section_is_reported() {
        let text = "==French==\n{{fr-noun}}\n";
        assert!(normalize(text, "English").is_err());
    }
}
