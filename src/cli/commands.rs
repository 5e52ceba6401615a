use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::warn;
use url::Url;

use crate::app::{AppContext, GuardError, Result};
use crate::compliance::classify_all;
use crate::content::{NavigationObserver, Page, PageScan, ScanOutcome};
use crate::domain::{ExtensionSettings, ListingProduct};
use crate::store::Store;

pub async fn scan(
    ctx: &AppContext,
    url: &str,
    file: Option<&Path>,
    out: Option<&Path>,
    chrome: bool,
    open_result: bool,
) -> Result<()> {
    let url = parse_page_url(url)?;
    let settings = ctx.settings()?;
    let script = ctx.content_script();

    let scan = match file {
        Some(path) => {
            let html = std::fs::read_to_string(path)?;
            script.run(Page::new(url, html), None, &settings).await
        }
        None => {
            let source = ctx.page_source(chrome).await?;
            script.scan_url(source.as_ref(), &url, &settings).await?
        }
    };

    print_scan(&scan, &settings);

    let target = match (out, open_result) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, true) => Some(default_output_path(&scan.url)),
        (None, false) => None,
    };

    if let Some(path) = target {
        std::fs::write(&path, &scan.html)?;
        println!("Wrote {}", path.display());

        if open_result {
            if let Err(e) = open::that(&path) {
                eprintln!("Failed to open {}: {}", path.display(), e);
            }
        }
    }

    Ok(())
}

pub async fn watch(ctx: &AppContext, url: &str, chrome: bool, out: Option<&Path>) -> Result<()> {
    let url = parse_page_url(url)?;
    let settings = ctx.settings()?;
    let script = ctx.content_script();
    let source = ctx.page_source(chrome).await?;
    let navigation = Arc::new(NavigationObserver::new());

    let ticker = if settings.auto_scan {
        println!("Rescanning every {}s, Ctrl-C to stop", settings.scan_interval);
        let navigation = navigation.clone();
        let period = Duration::from_secs(settings.scan_interval);
        Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.tick().await; // Skip the first immediate tick
            loop {
                timer.tick().await;
                navigation.request_rescan();
            }
        }))
    } else {
        println!("autoScan is off; enable it with `ecomguard settings set autoScan true`");
        None
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let scans = script
        .watch(
            source.as_ref(),
            url,
            &navigation,
            &settings,
            shutdown,
            |scan| {
                if settings.notifications {
                    println!("[{}]", Local::now().format("%Y-%m-%d %H:%M:%S"));
                }
                print_scan(scan, &settings);
                if let Some(path) = out {
                    if let Err(e) = std::fs::write(path, &scan.html) {
                        eprintln!("Failed to write {}: {}", path.display(), e);
                    }
                }
            },
        )
        .await?;

    if let Some(ticker) = ticker {
        ticker.abort();
    }

    println!("Stopped after {} scans", scans);
    Ok(())
}

pub fn classify(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let products: Vec<ListingProduct> = serde_json::from_str(&content)?;

    if products.is_empty() {
        println!("No products");
        return Ok(());
    }

    let verdicts = classify_all(&products);
    for verdict in &verdicts {
        if verdict.is_compliant {
            println!("✅ {}", verdict.link);
        } else {
            println!("❌ {}\n  {}", verdict.link, verdict.reasons.join(" "));
        }
    }

    let safe = verdicts.iter().filter(|v| v.is_compliant).count();
    println!(
        "{} products: {} compliant, {} flagged",
        verdicts.len(),
        safe,
        verdicts.len() - safe
    );
    Ok(())
}

pub fn stats(ctx: &AppContext, reset: bool) -> Result<()> {
    if reset {
        ctx.store.reset_stats()?;
        println!("Stats reset");
        return Ok(());
    }

    let stats = ctx.store.get_stats()?;
    println!("Total scanned:  {}", stats.total_scanned);
    println!("Safe products:  {}", stats.safe_products);
    println!("Flagged:        {}", stats.flagged_products);

    let last = stats
        .last_scan_time
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("Last scan:      {}", last);
    println!("Stored scans:   {}", ctx.store.scan_count()?);
    Ok(())
}

pub fn history(ctx: &AppContext, limit: usize) -> Result<()> {
    let scans = ctx.store.recent_scans(limit)?;

    if scans.is_empty() {
        println!("No scans");
        return Ok(());
    }

    for (_, record) in scans {
        let date = record
            .scanned_at()
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let marker = if record.result.is_compliant() { "✅" } else { "❌" };

        println!(
            "{} {} {:>6}%  {}\n  {}",
            date,
            marker,
            record.result.display_score(),
            record.product.display_title(),
            record.url
        );
    }

    Ok(())
}

pub fn show_settings(ctx: &AppContext) -> Result<()> {
    print_settings(&ctx.store.get_settings()?);
    Ok(())
}

pub fn set_setting(ctx: &AppContext, key: &str, value: &str) -> Result<()> {
    let mut settings = ctx.store.get_settings()?;
    settings.set(key, value)?;
    ctx.store.save_settings(&settings)?;
    print_settings(&settings);
    Ok(())
}

pub fn reset_settings(ctx: &AppContext) -> Result<()> {
    let settings = ExtensionSettings::default();
    ctx.store.save_settings(&settings)?;
    println!("Settings reset to defaults");
    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &ExtensionSettings) {
    println!("autoScan:      {}", settings.auto_scan);
    println!("notifications: {}", settings.notifications);
    println!("scanInterval:  {}s", settings.scan_interval);
    println!("showWarnings:  {}", settings.show_warnings);
}

fn print_scan(scan: &PageScan, settings: &ExtensionSettings) {
    for line in scan_report(scan, settings) {
        println!("{}", line);
    }
}

/// Per-scan summary lines; empty when notifications are off
fn scan_report(scan: &PageScan, settings: &ExtensionSettings) -> Vec<String> {
    if !settings.notifications {
        return Vec::new();
    }

    let mut lines = vec![scan.summary()];

    match &scan.outcome {
        ScanOutcome::Detail { report, .. } => {
            if settings.show_warnings && !report.issues.is_empty() {
                lines.push("Issues Found:".to_string());
                lines.extend(report.issues.iter().map(|issue| format!("  - {}", issue.text())));
            }
            if !report.recommendations.is_empty() {
                lines.push("Recommendations:".to_string());
                lines.extend(report.recommendations.iter().map(|r| format!("  - {}", r)));
            }
        }
        ScanOutcome::Listing { products, verdicts, .. } => {
            for (product, verdict) in products.iter().zip(verdicts) {
                let marker = if verdict.is_compliant { "✅" } else { "❌" };
                let title = if product.title.is_empty() {
                    "(Untitled)"
                } else {
                    product.title.as_str()
                };
                if verdict.reasons.is_empty() {
                    lines.push(format!("  {} {}", marker, title));
                } else {
                    lines.push(format!("  {} {}: {}", marker, title, verdict.reasons.join(" ")));
                }
            }
        }
        _ => {}
    }

    lines
}

fn default_output_path(url: &Url) -> PathBuf {
    let host = url.host_str().unwrap_or("page").replace('.', "_");
    std::env::temp_dir().join(format!("ecomguard-{}.html", host))
}

/// Resolve a page URL given on the command line
pub fn parse_page_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(GuardError::Other(format!("Unsupported URL scheme: {}", other))),
    }
}
