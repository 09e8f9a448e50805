use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use engine_logging::{engine_info, FacadeLog, PipelineLog};
use repost_core::{parse_link, ValidationResult};
use repost_engine::{
    Collaborators, HistoryLog, OutboxTarget, Orchestrator, RewriteOutcome, RewriteSource,
    Rewriter,
};

use crate::settings::AppSettings;

pub fn parse(urls: &[String]) -> Result<()> {
    let mut failures = 0usize;
    for raw in urls {
        match parse_link(raw) {
            Ok(link) => {
                let canonical = link
                    .canonical_url()
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", link.post_id, link.link_type, canonical);
            }
            Err(err) => {
                failures += 1;
                println!("error\t{err}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} link(s) could not be parsed", urls.len());
    }
    Ok(())
}

pub fn check(settings: &AppSettings, title: &str, body: &str, tags: &[String]) -> Result<()> {
    let validator = settings.engine.validator()?;
    let result = validator.validate_all(title, body, tags);
    print_validation(&result);

    let cleaned = validator.clean_content(body);
    if cleaned != body {
        println!("cleaned body:\n{cleaned}");
    }
    if !result.valid {
        bail!("content failed validation");
    }
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    println!("valid: {}", result.valid);
    for error in &result.errors {
        println!("  error: {error}");
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
}

pub struct RunOptions {
    pub rewrite: bool,
    pub regenerate: u32,
    pub outbox: Option<PathBuf>,
    pub finalize: bool,
    pub verbose: bool,
}

pub async fn run(settings: &AppSettings, url: &str, options: RunOptions) -> Result<()> {
    let engine = &settings.engine;
    let log: Arc<dyn PipelineLog> = Arc::new(FacadeLog);
    let rewriter = Rewriter::new(
        engine.rewrite_backend().context("configuring rewrite backend")?,
        engine.validator()?,
        engine.rewrite.timeout(),
        log.clone(),
    );
    let outbox = options
        .outbox
        .map(OutboxTarget::new)
        .unwrap_or_else(|| engine.outbox());
    let orchestrator = Orchestrator::new(
        Collaborators {
            fetcher: engine.fetcher().context("configuring fetch backend")?,
            rewriter: Arc::new(rewriter),
            history: Arc::new(engine.history()),
            publisher: Arc::new(outbox),
            log,
        },
        engine.fetch.timeout(),
    );

    let view = orchestrator.submit(url).await?;
    engine_info!("Run {:?} ready", view.run);
    orchestrator.inspect(|state| {
        if let Some(original) = state.original() {
            println!("post {} ({} images)", original.post_id(), original.images().len());
            println!("title: {}", original.title());
            println!("{}", original.body());
        }
    });

    if options.rewrite {
        for round in 0..=options.regenerate {
            let outcome = orchestrator.request_rewrite().await?;
            println!();
            println!("rewrite {} ({})", round + 1, source_label(&outcome));
            print_rewrite(&outcome, options.verbose);
        }
    }

    let report = orchestrator.proceed().await?;
    println!();
    println!("----- publish text -----");
    println!("{}", report.payload.text);
    println!("------------------------");
    match &report.delivery {
        Ok(receipt) => {
            if let Some(location) = &receipt.location {
                println!("payload written to {}", location.display());
            }
            println!("open {} to publish", receipt.deep_link);
        }
        Err(error) => println!("publish preparation failed: {error}"),
    }

    if options.finalize {
        let entry = orchestrator.finalize().await?;
        println!("recorded history entry {}", entry.id);
    }
    Ok(())
}

fn source_label(outcome: &RewriteOutcome) -> &'static str {
    match outcome.source {
        RewriteSource::Remote => "remote",
        RewriteSource::Fallback => "local fallback",
    }
}

fn print_rewrite(outcome: &RewriteOutcome, verbose: bool) {
    let content = &outcome.content;
    println!("title: {}", content.title());
    println!("{}", content.body());
    let tags: Vec<String> = content.tags().iter().map(|t| format!("#{t}")).collect();
    println!("{}", tags.join(" "));
    if verbose {
        if let Some(diagnostic) = &outcome.diagnostic {
            println!("(remote rewrite skipped: {diagnostic})");
        }
    }
}

pub fn history(
    settings: &AppSettings,
    limit: usize,
    remove: Option<&str>,
    clear: bool,
) -> Result<()> {
    let history = settings.engine.history();
    if clear {
        history.clear().context("clearing history")?;
        println!("history cleared");
        return Ok(());
    }
    if let Some(id) = remove {
        if history.remove(id).context("removing history entry")? {
            println!("removed {id}");
        } else {
            println!("no entry {id}");
        }
        return Ok(());
    }

    let entries = history.recent(limit).context("reading history")?;
    if entries.is_empty() {
        println!("no history in {}", history.path().display());
    }
    for entry in entries {
        println!(
            "{}\t{}\t{}\t{}",
            entry.created_at.to_rfc3339(),
            entry.post_id,
            entry.id,
            entry.title
        );
    }
    Ok(())
}
