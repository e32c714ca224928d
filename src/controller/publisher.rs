//! Report publishing worker
//!
//! Reports arrive on a channel and are sent once each. Failures are logged
//! and dropped; the loop has already moved on by the time they happen.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::SnitchPublisher;
use crate::domain::SnitchReport;

pub type ReportSender = mpsc::UnboundedSender<SnitchReport>;
pub type ReportReceiver = mpsc::UnboundedReceiver<SnitchReport>;

pub fn report_channel() -> (ReportSender, ReportReceiver) {
    mpsc::unbounded_channel()
}

/// Outcome counts of a publisher run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub failed: u64,
}

/// Publish every report received until all senders are dropped
pub async fn run_publisher(mut rx: ReportReceiver, publisher: Arc<dyn SnitchPublisher>) -> PublishStats {
    let mut stats = PublishStats::default();
    while let Some(report) = rx.recv().await {
        let restaurant = report.restaurant_data.name.clone();
        log::info!("Publishing snitch for user {} at {}", report.user_id, restaurant);
        match publisher.publish_snitch(report).await {
            Ok(()) => {
                stats.published += 1;
                log::info!("Snitch published ({})", restaurant);
            }
            Err(e) => {
                stats.failed += 1;
                log::error!("Could not publish snitch ({}): {}", restaurant, e);
            }
        }
    }
    stats
}
