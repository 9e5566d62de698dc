//! Rename every use of one template to another name across a page set.
//!
//! Example dry run over two pages:
//!   rename_template en-plural-noun en-noun --pages dogs,cats

use std::error::Error;

use clap::Parser;
use dotenv::dotenv;

use wiktbot::document::Document;
use wiktbot::mediawiki::MediaWikiStore;
use wiktbot::orchestrator::{run_batch, BotArgs, Outcome};
use wiktbot::store::PageStore;
use wiktbot::BotError;

#[derive(Parser)]
#[clap(about = "Rename a template everywhere it is transcluded")]
struct Args {
    /// Current template name
    old: String,

    /// New template name
    new: String,

    #[clap(flatten)]
    bot: BotArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    // a dry run over a dump needs no backend at all
    let mut store = if args.bot.stdin && !args.bot.save {
        None
    } else {
        Some(MediaWikiStore::from_env()?)
    };

    let mut transform = |_title: &str, text: &str| -> Result<Outcome, BotError> {
        let mut doc = Document::parse(text)?;
        let mut notes = Vec::new();
        for t in doc.templates_mut() {
            if t.name() == args.old {
                t.rename(&args.new);
                notes.push(format!("rename {{{{{}}}}} to {{{{{}}}}}", args.old, args.new));
            }
        }
        if notes.is_empty() {
            return Ok(Outcome::NoChange);
        }
        Ok(Outcome::Changed {
            text: doc.to_wikitext(),
            notes,
        })
    };

    run_batch(
        &args.bot,
        store.as_mut().map(|s| s as &mut dyn PageStore),
        &mut transform,
    )?;
    Ok(())
}
