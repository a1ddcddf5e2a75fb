use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkmerge_core::config::{CONFIG_FILE_NAME, DATABASE_FILE_NAME, MergeConfig};
use linkmerge_core::data::Database;
use linkmerge_core::merge::{MergeProgressCallback, run_merge_cycle};
use linkmerge_core::partition::read_records;
use linkmerge_core::report::{ReportFormat, gather_report_data, generate_report, save_report};
use linkmerge_graph::{GroupKey, WebPage, reverse_url, unreverse_url};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

// Helper functions for the handlers

/// Expand `~` in a config directory argument
pub fn resolve_config_dir(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load `linkmerge.json` from the config directory, defaults if absent
pub fn load_config(config_dir: &Path) -> Result<MergeConfig> {
    MergeConfig::load_or_default(&config_dir.join(CONFIG_FILE_NAME)).map_err(|e| anyhow!(e))
}

/// Split a comma separated filter list, dropping empty entries
pub fn parse_scoring_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Write the default config and a fresh database into `config_dir`.
///
/// Refuses to touch an existing setup unless `force` is set, in which case
/// the old database is dropped first.
pub fn init_workspace(config_dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = config_dir.join(CONFIG_FILE_NAME);
    let db_path = config_dir.join(DATABASE_FILE_NAME);

    if (config_path.exists() || Database::exists(&db_path)) && !force {
        bail!(
            "{} is already initialized, use --force to overwrite",
            config_dir.display()
        );
    }

    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    MergeConfig::default()
        .save(&config_path)
        .map_err(|e| anyhow!(e))?;

    Database::drop(&db_path).with_context(|| format!("Failed to delete {}", db_path.display()))?;
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    Ok(db_path)
}

/// Human readable dump of one page
pub fn format_page(key: &GroupKey, page: &WebPage) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "URL:".bold(), page.url.bright_white()));
    out.push_str(&format!("{} {}\n", "Key:".bold(), key));

    let distance = if page.is_reachable() {
        page.distance.to_string()
    } else {
        "unreachable".to_string()
    };
    out.push_str(&format!("{} {}\n", "Distance:".bold(), distance));

    if let Some(ref referrer) = page.referrer {
        out.push_str(&format!(
            "{} {} ({})\n",
            "Referrer:".bold(),
            referrer,
            page.anchor.as_deref().unwrap_or("")
        ));
    }
    out.push_str(&format!("{} {:.4}\n", "Score:".bold(), page.score));

    if let Some(fetch_time) = page.fetch_time {
        out.push_str(&format!(
            "{} {} (every {}s, {} retries)\n",
            "Fetch:".bold(),
            fetch_time.to_rfc3339(),
            page.fetch_interval_secs,
            page.fetch_retries
        ));
    }

    if !page.marks.is_empty() {
        out.push_str(&format!("{}\n", "Marks:".bold()));
        for (mark, stamp) in page.marks.iter() {
            out.push_str(&format!("  {:<18} {}\n", mark.as_str(), stamp));
        }
    }

    out.push_str(&format!("{} {}\n", "Inlinks:".bold(), page.inlinks.len()));
    for (source, anchor) in &page.inlinks {
        out.push_str(&format!("  {} {}\n", source.cyan(), anchor.dimmed()));
    }

    out
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(msg.to_string());
    Ok(spinner)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .ok_or_else(|| anyhow!("missing PATH"))?;
    let mut force = args.get_flag("force");
    let config_dir = resolve_config_dir(path);

    let already_there = config_dir.join(CONFIG_FILE_NAME).exists()
        || Database::exists(&config_dir.join(DATABASE_FILE_NAME));

    if already_there && !force {
        println!(
            "{} linkmerge is already initialized at {}",
            "[WARNING]".yellow().bold(),
            config_dir.display().to_string().bright_white()
        );
        println!("This operation will overwrite the config and delete the page database.");
        let response = print_prompt("Do you want to continue? [y/N]:")?;
        if response != "y" && response != "yes" {
            println!("\nInitialization cancelled.");
            return Ok(());
        }
        force = true;
    }

    let spinner = spinner("Let's get this show on the road!")?;
    let db_path = init_workspace(&config_dir, force)?;

    spinner.finish_and_clear();
    print_divider();
    println!("{}", "✓ linkmerge initialization complete!".green().bold());
    println!(
        "  Config:   {}",
        config_dir.join(CONFIG_FILE_NAME).display().to_string().bright_white()
    );
    println!("  Database: {}", db_path.display().to_string().bright_white());
    print_divider();

    Ok(())
}

pub async fn handle_merge(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow!("--input is required"))?;
    let db_dir = sub_matches
        .get_one::<String>("db")
        .ok_or_else(|| anyhow!("--db is required"))?;
    let format_str = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let output = sub_matches.get_one::<PathBuf>("output");
    let page_limit = sub_matches.get_one::<usize>("pages").copied().unwrap_or(50);

    let format = ReportFormat::from_str(format_str)
        .ok_or_else(|| anyhow!("Invalid report format: {}", format_str))?;

    let config_dir = resolve_config_dir(db_dir);
    let mut config = load_config(&config_dir)?;
    if let Some(workers) = sub_matches.get_one::<usize>("workers") {
        config = config.with_workers(*workers);
    }
    if let Some(scoring) = sub_matches.get_one::<String>("scoring") {
        config = config.with_scoring_filters(parse_scoring_list(scoring));
    }

    let db_path = config_dir.join(DATABASE_FILE_NAME);
    if !Database::exists(&db_path) {
        bail!(
            "No database at {}. Run `linkmerge init` first.",
            db_path.display()
        );
    }
    let db = Arc::new(
        Database::new(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );

    let records = read_records(input).map_err(|e| anyhow!(e))?;

    if !quiet {
        println!("\n{} {}", "Merging".bold(), input.display());
        println!("Records: {}", records.len());
        println!("Workers: {}", config.workers);
        println!("Scoring: {}\n", config.scoring_filters.join(", "));
    }

    let progress_callback: Option<MergeProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{}", msg.dimmed());
        }))
    };

    let input_label = input.display().to_string();
    let summary = run_merge_cycle(
        db.clone(),
        &config,
        records,
        &input_label,
        !quiet,
        progress_callback,
    )
    .await
    .map_err(|e| anyhow!(e))
    .context("Merge failed")?;

    let data = gather_report_data(&db, &summary, page_limit)?;
    let report = generate_report(&data, format)?;

    match output {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            if !quiet {
                println!("{} Report saved to {}", "✓".green(), path.display());
            }
        }
        None => print!("{}", report),
    }

    if summary.counters.failed > 0 && !quiet {
        eprintln!(
            "{} {} keys failed to merge, see the report for details",
            "[!]".red().bold(),
            summary.counters.failed
        );
    }

    Ok(())
}

pub fn handle_show(sub_matches: &ArgMatches) -> Result<()> {
    let url = sub_matches
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let db_dir = sub_matches
        .get_one::<String>("db")
        .ok_or_else(|| anyhow!("--db is required"))?;
    let as_json = sub_matches.get_flag("json");

    let db_path = resolve_config_dir(db_dir).join(DATABASE_FILE_NAME);
    if !Database::exists(&db_path) {
        bail!("No database at {}", db_path.display());
    }
    let db = Database::new(&db_path)?;

    let key = GroupKey::from_url(url.as_str())?;
    let page = db
        .get_page(&key)?
        .ok_or_else(|| anyhow!("No page stored for {}", url))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!("{}", format_page(&key, &page));
    }

    Ok(())
}

pub fn handle_reverse(args: &ArgMatches) -> Result<()> {
    let url = args
        .get_one::<String>("URL")
        .ok_or_else(|| anyhow!("missing URL"))?;
    println!("{}", reverse_url(url)?);
    Ok(())
}

pub fn handle_unreverse(args: &ArgMatches) -> Result<()> {
    let key = args
        .get_one::<String>("KEY")
        .ok_or_else(|| anyhow!("missing KEY"))?;
    println!("{}", unreverse_url(key)?);
    Ok(())
}
