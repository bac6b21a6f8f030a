//! Run metrics publication
//!
//! Publishes per-run numeric metrics to CloudWatch for external alerting
//! (error count over a threshold, processed count over an expected
//! ceiling). Publish failures are the caller's to log; they never fail a
//! run.

use crate::aws::AwsContext;
use anyhow::{Context, Result};
use aws_sdk_cloudwatch::types::{MetricDatum, StandardUnit};
use curfew_common::RunSummary;
use std::time::Duration;
use tracing::debug;

/// CloudWatch namespace for sweep metrics
pub const METRIC_NAMESPACE: &str = "Curfew";

/// CloudWatch publisher for run metrics
pub struct MetricsPublisher {
    client: aws_sdk_cloudwatch::Client,
}

impl MetricsPublisher {
    pub async fn new(region: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx)
    }

    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.cloudwatch_client(),
        }
    }

    /// Publish the run's metrics: resources processed, execution errors,
    /// and run duration.
    pub async fn publish(&self, summary: &RunSummary, duration: Duration) -> Result<()> {
        let data = [
            (
                "ResourcesProcessed",
                summary.total_processed as f64,
                StandardUnit::Count,
            ),
            (
                "ExecutionErrors",
                summary.error_count() as f64,
                StandardUnit::Count,
            ),
            (
                "RunDurationSeconds",
                duration.as_secs_f64(),
                StandardUnit::Seconds,
            ),
        ];

        let mut request = self.client.put_metric_data().namespace(METRIC_NAMESPACE);
        for (name, value, unit) in data {
            request = request.metric_data(
                MetricDatum::builder()
                    .metric_name(name)
                    .value(value)
                    .unit(unit)
                    .build(),
            );
        }

        request
            .send()
            .await
            .context("Failed to publish run metrics")?;
        debug!(namespace = METRIC_NAMESPACE, "Run metrics published");
        Ok(())
    }
}
