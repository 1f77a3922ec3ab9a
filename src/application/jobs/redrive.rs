//! Cron job that replays dead-lettered invalidations.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;

use crate::cache::InvalidationConsumer;

/// Marker struct for the cron-triggered redrive job.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct RedriveDeadLettersJob;

impl From<chrono::DateTime<chrono::Utc>> for RedriveDeadLettersJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct RedriveDeadLettersContext {
    pub consumer: Arc<InvalidationConsumer>,
}

/// Requeue every dead letter and try to apply them right away.
pub async fn process_redrive_dead_letters_job(
    _job: RedriveDeadLettersJob,
    ctx: Data<RedriveDeadLettersContext>,
) -> Result<(), apalis::prelude::Error> {
    let count = ctx.consumer.redrive_dead_letters();
    if count > 0 {
        ctx.consumer.consume_pending().await;
        tracing::info!(
            redriven = count,
            still_dead = ctx.consumer.dead_letters().len(),
            "Dead-letter redrive finished"
        );
    }
    Ok(())
}

/// Parse the redrive schedule (six fields, seconds first).
pub fn redrive_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_parses_correctly() {
        let schedule = redrive_schedule("0 */5 * * * *").expect("schedule");
        let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(3).collect();
        assert_eq!(upcoming.len(), 3);
    }

    #[test]
    fn bad_schedule_is_rejected() {
        assert!(redrive_schedule("every five minutes").is_err());
    }
}
