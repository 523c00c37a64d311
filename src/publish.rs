// Issue publisher - per-organization markdown digests on a tracker issue
//
// Everything remote goes through the external `gh` client: listing and
// deleting previously posted comments, replacing the issue body with the
// table of contents, and posting one comment per organization. Only
// comments carrying the configured marker line are ever deleted.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::process::Command;
use std::thread;
use std::time::Duration;

use crate::db::ContactRecord;
use crate::export::{display_values, FIELD_LABELS};

/// Field indices included in the published digest tables: organization,
/// person name, department, position, email, organization address.
const DIGEST_COLUMNS: [usize; 6] = [0, 1, 2, 3, 4, 6];

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Publisher settings. All of it is injected; nothing is hardcoded.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Target repository, `OWNER/REPO`.
    pub repository: String,
    /// Issue number holding the digest.
    pub issue: String,
    /// Marker line appended to every posted comment. Identifies our
    /// comments for cleanup on the next publish.
    pub marker: String,
    /// Attempts per `gh` invocation before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub retry_base_delay: Duration,
}

impl PublishConfig {
    pub fn new(repository: String, issue: String, marker: String) -> Self {
        PublishConfig {
            repository,
            issue,
            marker,
            max_attempts: 4,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: u64,
    body: String,
}

// ============================================================================
// MARKDOWN RENDERING
// ============================================================================

/// Lowercase hex encoding of a name's UTF-8 bytes. Used as the anchor id
/// linking the table of contents to each organization's comment.
pub fn hex_anchor(name: &str) -> String {
    name.as_bytes().iter().map(|b| format!("{:02x}", b)).collect()
}

/// Render one organization's records as a markdown table restricted to
/// the digest column subset. Newlines inside values flatten to spaces.
pub fn markdown_table(records: &[ContactRecord]) -> String {
    let mut markdown = String::from("|");
    for col in DIGEST_COLUMNS {
        markdown.push_str(FIELD_LABELS[col]);
        markdown.push('|');
    }
    markdown.push_str("\n|");
    for _ in DIGEST_COLUMNS {
        markdown.push_str("---|");
    }
    markdown.push('\n');

    for record in records {
        let values = display_values(record);
        markdown.push('|');
        for col in DIGEST_COLUMNS {
            markdown.push_str(&values[col].replace('\n', " "));
            markdown.push('|');
        }
        markdown.push('\n');
    }

    markdown
}

/// Table-of-contents issue body: one anchor link per organization.
pub fn toc_body(organizations: &[String]) -> String {
    let mut body = String::from("## 📋 目次\n\n");
    for name in organizations {
        body.push_str(&format!("- [{}](#{})\n", name, hex_anchor(name)));
    }
    body
}

/// Body of one organization's comment: anchor, heading, table, marker.
pub fn comment_body(organization: &str, records: &[ContactRecord], marker: &str) -> String {
    format!(
        "<a id=\"{}\"></a>\n### {}\n\n{}\n{}\n",
        hex_anchor(organization),
        organization,
        markdown_table(records),
        marker,
    )
}

// ============================================================================
// PUBLISHER
// ============================================================================

pub struct IssuePublisher {
    config: PublishConfig,
}

impl IssuePublisher {
    pub fn new(config: PublishConfig) -> Self {
        IssuePublisher { config }
    }

    /// Publish the digest: clear previously posted marked comments,
    /// replace the issue body with the table of contents, then post one
    /// comment per organization in the given order.
    pub fn publish(&self, organizations: &[(String, Vec<ContactRecord>)]) -> Result<()> {
        self.delete_marked_comments()?;

        let names: Vec<String> = organizations.iter().map(|(name, _)| name.clone()).collect();
        let body = toc_body(&names);
        self.run_gh(&[
            "issue", "edit", &self.config.issue,
            "--repo", &self.config.repository,
            "--body", &body,
        ])?;

        for (name, records) in organizations {
            let comment = comment_body(name, records, &self.config.marker);
            self.run_gh(&[
                "issue", "comment", &self.config.issue,
                "--repo", &self.config.repository,
                "--body", &comment,
            ])?;
        }

        Ok(())
    }

    /// Delete every comment on the issue whose body contains the marker.
    /// One listing call cannot enumerate all comments, so list and delete
    /// until a listing comes back with no marked comments.
    fn delete_marked_comments(&self) -> Result<()> {
        loop {
            let listing_path =
                format!("/repos/{}/issues/{}/comments", self.config.repository, self.config.issue);
            let stdout = self.run_gh(&["api", &listing_path])?;

            let comments: Vec<IssueComment> =
                serde_json::from_slice(&stdout).context("failed to parse issue comment listing")?;

            let marked: Vec<u64> = comments
                .iter()
                .filter(|c| c.body.contains(&self.config.marker))
                .map(|c| c.id)
                .collect();

            if marked.is_empty() {
                return Ok(());
            }

            for id in marked {
                let delete_path =
                    format!("/repos/{}/issues/comments/{}", self.config.repository, id);
                self.run_gh(&["api", "--method", "DELETE", &delete_path])?;
            }
        }
    }

    /// Run one `gh` invocation with bounded retry and exponential backoff.
    fn run_gh(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut delay = self.config.retry_base_delay;

        for attempt in 1..=self.config.max_attempts {
            let output = Command::new("gh")
                .args(args)
                .output()
                .context("failed to spawn gh; is it installed and on PATH?")?;

            if output.status.success() {
                return Ok(output.stdout);
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            if attempt == self.config.max_attempts {
                return Err(anyhow!(
                    "gh {} failed after {} attempts: {}",
                    args.first().unwrap_or(&""),
                    attempt,
                    stderr.trim(),
                ));
            }

            tracing::warn!(
                "gh {} failed (attempt {}/{}), retrying in {:?}: {}",
                args.first().unwrap_or(&""),
                attempt,
                self.config.max_attempts,
                delay,
                stderr.trim(),
            );
            thread::sleep(delay);
            delay *= 2;
        }

        unreachable!("retry loop returns on success or final attempt")
    }
}
