use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use coachkb_core::config::{expand_path, Config, StoreSettings};
use coachkb_core::importer::collect_import_files;
use coachkb_core::traits::KnowledgeStore;
use coachkb_select::StoreSelector;

const USAGE: &str = "Usage: coachkb [--anchor <path>] <import <path>|search <query> [k]|stats|clear>";
const DEFAULT_K: usize = 5;

/// Splits `--anchor <path>` out of the arguments; the rest is the command line.
fn parse_args(raw: Vec<String>) -> anyhow::Result<(Option<PathBuf>, Vec<String>)> {
    let mut anchor = None;
    let mut rest = Vec::new();
    let mut args = raw.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--anchor" => {
                let Some(value) = args.next() else { bail!("--anchor requires a path\n{USAGE}") };
                anchor = Some(expand_path(value));
            }
            _ => rest.push(arg),
        }
    }
    Ok((anchor, rest))
}

fn import(selector: &StoreSelector, root: &Path) -> anyhow::Result<usize> {
    let files = collect_import_files(root)?;
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let summary = selector.import_files(&files, |file| {
        pb.set_message(file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        pb.inc(1);
    })?;
    pb.finish_with_message("done");
    println!("Imported {} chunks from {} files into the {} store", summary.added, summary.files, summary.engine.as_str());
    Ok(summary.added)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::load().context("loading configuration")?;
    let mut settings = StoreSettings::from_config(&config);
    let (anchor, args) = parse_args(env::args().skip(1).collect())?;
    if let Some(anchor) = anchor {
        settings.anchor = anchor;
    }
    let mut selector = StoreSelector::from_settings(settings);

    let Some(cmd) = args.first() else { bail!("{USAGE}") };
    match cmd.as_str() {
        "import" => {
            let Some(path) = args.get(1) else { bail!("import requires a path\n{USAGE}") };
            import(&selector, &expand_path(path))?;
        }
        "search" => {
            let Some(query) = args.get(1) else { bail!("search requires a query\n{USAGE}") };
            let k = match args.get(2) {
                Some(raw) => raw.parse::<usize>().with_context(|| format!("invalid result count: {raw}"))?,
                None => DEFAULT_K,
            };
            let hits = selector.search(query, k)?;
            println!("Found {} results for \"{query}\"", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                let source = hit.metadata.get("source").and_then(|v| v.as_str()).unwrap_or("-");
                println!("\n  {}. score={:.4}  id={}  engine={}  source={source}", i + 1, hit.score, hit.id, hit.source.as_str());
                println!("     {}", hit.text);
            }
        }
        "stats" => {
            println!("{}", serde_json::to_string_pretty(&selector.stats())?);
        }
        "clear" => {
            selector.clear()?;
            println!("Cleared store at {}", selector.paths().anchor.display());
        }
        other => bail!("unknown command: {other}\n{USAGE}"),
    }
    Ok(())
}
