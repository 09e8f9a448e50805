use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Prepare Xiaohongshu posts for reposting.
#[derive(Parser, Debug)]
#[command(name = "repost", version)]
#[command(about = "Parse, fetch, rewrite and stage Xiaohongshu posts for reposting")]
pub struct Cli {
    /// Config file (RON). Defaults to ./repost.ron when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level and show rewrite diagnostics.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract post ids from share links or share text.
    Parse {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Validate a title, body and tags against the content rules.
    Check {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Run the whole pipeline for one link.
    Run {
        url: String,
        /// Rewrite the post before publishing.
        #[arg(long)]
        rewrite: bool,
        /// Extra rewrite rounds after the first; the last one is kept.
        #[arg(long, default_value_t = 0, requires = "rewrite")]
        regenerate: u32,
        /// Directory for payload.txt and images.txt.
        #[arg(long)]
        outbox: Option<PathBuf>,
        /// Stop after publish preparation without recording history.
        #[arg(long)]
        no_finalize: bool,
    },
    /// Show or edit the repost history.
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Delete one entry by id.
        #[arg(long, conflicts_with = "clear")]
        remove: Option<String>,
        /// Delete every entry.
        #[arg(long)]
        clear: bool,
    },
}
