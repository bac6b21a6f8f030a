//! Run-report notification
//!
//! Publishes the completed run summary to an SNS topic as a plain-text
//! report. By default the report is sent only when at least one resource was
//! processed; `always_notify` sends it unconditionally so a silent run is
//! distinguishable from a broken trigger.

use crate::aws::AwsContext;
use anyhow::{Context, Result};
use curfew_common::RunSummary;
use std::fmt::Write as _;
use tracing::info;

/// SNS publisher for run reports
pub struct Notifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl Notifier {
    pub async fn new(region: &str, topic_arn: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx, topic_arn)
    }

    pub fn from_context(ctx: &AwsContext, topic_arn: &str) -> Self {
        Self {
            client: ctx.sns_client(),
            topic_arn: topic_arn.to_string(),
        }
    }

    pub async fn publish(&self, summary: &RunSummary) -> Result<()> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject(summary))
            .message(render_body(summary))
            .send()
            .await
            .context("Failed to publish run report")?;
        info!(topic = %self.topic_arn, "Run report sent");
        Ok(())
    }
}

/// Whether the report should be sent at all.
pub fn should_notify(summary: &RunSummary, always_notify: bool) -> bool {
    always_notify || summary.total_processed > 0
}

/// One-line subject for the report.
pub fn subject(summary: &RunSummary) -> String {
    let verb = if summary.dry_run {
        "identified"
    } else {
        "deactivated"
    };
    let mut subject = format!(
        "Curfew sweep: {} of {} resources {verb}",
        summary.acted(),
        summary.total_processed,
    );
    if summary.error_count() > 0 {
        let _ = write!(subject, ", {} errors", summary.error_count());
    }
    subject
}

/// Plain-text report body.
pub fn render_body(summary: &RunSummary) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "Curfew Sweep Report");
    let _ = writeln!(body, "{}", "=".repeat(50));
    let _ = writeln!(
        body,
        "Mode: {}",
        if summary.dry_run { "DRY RUN" } else { "EXECUTED" }
    );
    if let Some(generated_at) = summary.generated_at {
        let _ = writeln!(body, "Time: {}", generated_at.to_rfc3339());
    }
    let _ = writeln!(body, "Resources processed: {}", summary.total_processed);
    let _ = writeln!(
        body,
        "Estimated monthly savings: ${:.2}",
        summary.estimated_monthly_savings_usd
    );
    let _ = writeln!(body);

    if !summary.by_kind.is_empty() {
        let _ = writeln!(body, "Outcomes by kind:");
        for (kind, counts) in &summary.by_kind {
            let _ = writeln!(
                body,
                "  {kind}: {} acted, {} failed, {} too young, {} protected, {} need approval, {} outside window",
                counts.acted,
                counts.failed,
                counts.too_young,
                counts.protected,
                counts.needs_approval,
                counts.outside_window,
            );
        }
        let _ = writeln!(body);

        let _ = writeln!(body, "Outcomes by region:");
        for (region, counts) in &summary.by_region {
            let _ = writeln!(
                body,
                "  {region}: {} acted, {} failed, {} skipped",
                counts.acted,
                counts.failed,
                counts.total() - counts.acted - counts.failed,
            );
        }
        let _ = writeln!(body);
    }

    if !summary.errors.is_empty() {
        let _ = writeln!(body, "Execution errors ({}):", summary.errors.len());
        for error in &summary.errors {
            let _ = writeln!(body, "  - {}: {}", error.resource, error.message);
        }
        let _ = writeln!(body);
    }

    if !summary.region_failures.is_empty() {
        let _ = writeln!(
            body,
            "Region failures ({}):",
            summary.region_failures.len()
        );
        for failure in &summary.region_failures {
            let _ = writeln!(body, "  - {}: {}", failure.region, failure.message);
        }
        let _ = writeln!(body);
    }

    if !summary.dry_run && summary.acted() > 0 {
        let _ = writeln!(body, "To restore resources:");
        let _ = writeln!(
            body,
            "- Compute instances: aws ec2 start-instances --instance-ids <id>"
        );
        let _ = writeln!(
            body,
            "- Databases: aws rds start-db-instance --db-instance-identifier <id>"
        );
        let _ = writeln!(
            body,
            "- Service groups: aws ecs update-service --cluster <cluster> --service <service> --desired-count <count>"
        );
    }

    body
}
