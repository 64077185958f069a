use std::time::Duration;

use chrono::Utc;
use log::*;
use savings_engine::{events::EventProducers, RecurringChargeApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::vant::PaystackCharger;

/// Starts the recurring-charge worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Both sweeps run on the same single cadence; a tick that finds nothing due is a cheap no-op.
pub fn start_recurring_worker(
    db: SqliteDatabase,
    charger: PaystackCharger,
    producers: EventProducers,
    sweep_interval: Duration,
    charge_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        let api = RecurringChargeApi::new(db, charger, producers).with_charge_timeout(charge_timeout);
        info!("🕰️ Recurring charge worker started (every {} s)", sweep_interval.as_secs());
        loop {
            timer.tick().await;
            let now = Utc::now();
            debug!("🕰️ Running recurring contribution sweep");
            let summary = api.sweep_contributions(now).await;
            info!("🕰️ Contribution sweep complete: {summary}");
            debug!("🕰️ Running saving-circle sweep");
            let summary = api.sweep_circles(now).await;
            info!("🕰️ Circle sweep complete: {summary}");
        }
    })
}
