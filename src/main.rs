use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use meishi_organizer::publish::{IssuePublisher, PublishConfig};
use meishi_organizer::run::{run, RunConfig};

#[derive(Parser, Debug)]
#[command(
    name = "meishi-organizer",
    version,
    about = "Reconcile scanned business-card rows and export per-company documents"
)]
struct Cli {
    /// Input spreadsheet of scanned business-card rows
    input: PathBuf,

    /// SQLite database holding the reconciled contacts
    #[arg(long, default_value = "contacts.db")]
    db: PathBuf,

    /// Output directory for per-company table documents
    #[arg(long, default_value = "output")]
    table_dir: PathBuf,

    /// Output directory for per-company card-book documents
    #[arg(long, default_value = "card_book")]
    card_book_dir: PathBuf,

    /// Post per-company digests to a tracker issue after exporting
    #[arg(long, requires = "repository", requires = "issue")]
    publish: bool,

    /// Repository (OWNER/REPO) receiving the digest
    #[arg(long, env = "MEISHI_REPOSITORY")]
    repository: Option<String>,

    /// Issue number receiving the digest
    #[arg(long, env = "MEISHI_ISSUE")]
    issue: Option<String>,

    /// Marker line identifying our digest comments for cleanup
    #[arg(long, env = "MEISHI_MARKER", default_value = "Data from myBridge")]
    marker: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    println!("📇 Importing {}", cli.input.display());

    let config = RunConfig {
        input: cli.input,
        db_path: cli.db,
        table_dir: cli.table_dir,
        card_book_dir: cli.card_book_dir,
    };
    let report = run(&config)?;

    println!("✓ Inserted: {} contacts", report.tally.inserted);
    println!("✓ Updated: {} contacts", report.tally.updated);
    println!("✓ Skipped: {} rows", report.tally.skipped);
    println!("✓ Companies exported: {}", report.exported.len());
    for (organization, records) in &report.exported {
        println!("  - {} ({} contacts)", organization, records.len());
    }
    for failure in &report.export_failures {
        eprintln!("⚠️  Export failed for {}: {}", failure.organization, failure.reason);
    }

    if cli.publish {
        let repository = cli.repository.context("--repository is required with --publish")?;
        let issue = cli.issue.context("--issue is required with --publish")?;

        println!("\n📤 Publishing digest to {} issue #{}", repository, issue);
        let publisher = IssuePublisher::new(PublishConfig::new(repository, issue, cli.marker));
        publisher.publish(&report.exported)?;
        println!("✓ Digest published");
    }

    println!("\n✅ Import & per-company export complete");

    Ok(())
}
