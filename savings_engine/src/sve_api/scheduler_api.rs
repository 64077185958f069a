use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use log::*;
use tokio::time::Duration;

use crate::{
    db_types::{CircleMember, CircleMemberStatus, Contribution, SavingCircle, StoredCard, MAX_CONSECUTIVE_FAILURES},
    events::{ContributionChargedEvent, EventProducers},
    helpers::next_contribution_date,
    traits::{CardCharger, ChargeOutcome, ChargeReceipt, ChargeRequest, LedgerError, ProviderError, SavingsLedger},
};

const DEFAULT_CHARGE_TIMEOUT: Duration = Duration::from_secs(30);

/// `RecurringChargeApi` is the time-triggered sweep that advances pending contributions and saving-circle
/// charges, tolerating partial failure per item.
///
/// One item's exception never aborts the batch: every plan and every circle member is processed behind its
/// own error boundary, and the tally of what happened comes back in a [`SweepSummary`].
pub struct RecurringChargeApi<B, C> {
    db: B,
    charger: C,
    charge_timeout: Duration,
    producers: EventProducers,
}

impl<B, C> Debug for RecurringChargeApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecurringChargeApi")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub attempted: usize,
    pub charged: usize,
    pub declined: usize,
    pub skipped_no_card: usize,
    pub skipped_circuit_broken: usize,
    pub errors: usize,
}

impl Display for SweepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} attempted, {} charged, {} declined, {} without an instrument, {} circuit-broken, {} errors",
            self.attempted, self.charged, self.declined, self.skipped_no_card, self.skipped_circuit_broken, self.errors
        )
    }
}

enum ItemOutcome {
    Charged,
    Declined,
    SkippedNoCard,
    SkippedCircuitBroken,
}

impl SweepSummary {
    fn tally(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Charged => self.charged += 1,
            ItemOutcome::Declined => self.declined += 1,
            ItemOutcome::SkippedNoCard => self.skipped_no_card += 1,
            ItemOutcome::SkippedCircuitBroken => self.skipped_circuit_broken += 1,
        }
    }
}

impl<B, C> RecurringChargeApi<B, C>
where
    B: SavingsLedger,
    C: CardCharger,
{
    pub fn new(db: B, charger: C, producers: EventProducers) -> Self {
        Self { db, charger, charge_timeout: DEFAULT_CHARGE_TIMEOUT, producers }
    }

    pub fn with_charge_timeout(mut self, timeout: Duration) -> Self {
        self.charge_timeout = timeout;
        self
    }

    /// Collects every contribution whose due date has arrived and whose window is open.
    pub async fn sweep_contributions(&self, now: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();
        let due = match self.db.due_contributions(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("💳️ Could not fetch due contributions: {e}");
                summary.errors += 1;
                return summary;
            },
        };
        summary.attempted = due.len();
        trace!("💳️ {} contributions due at {now}", due.len());
        for plan in &due {
            match self.charge_contribution(plan, now).await {
                Ok(outcome) => summary.tally(&outcome),
                Err(e) => {
                    error!("💳️ Contribution #{} failed and was skipped: {e}", plan.id);
                    summary.errors += 1;
                },
            }
        }
        summary
    }

    /// Collects due deposits from the members of every saving circle whose due date has arrived.
    pub async fn sweep_circles(&self, now: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();
        let due = match self.db.due_circles(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("💳️ Could not fetch due saving circles: {e}");
                summary.errors += 1;
                return summary;
            },
        };
        trace!("💳️ {} saving circles due at {now}", due.len());
        for circle in &due {
            if let Err(e) = self.process_circle(circle, now, &mut summary).await {
                error!("💳️ Saving circle #{} failed and was skipped: {e}", circle.id);
                summary.errors += 1;
            }
        }
        summary
    }

    /// One contribution, one attempt. An unparseable frequency is a hard error for this plan and nothing
    /// is mutated; a declined or unreachable charge only bumps the instrument's failure counter.
    async fn charge_contribution(&self, plan: &Contribution, now: DateTime<Utc>) -> Result<ItemOutcome, LedgerError> {
        let frequency = plan.frequency().map_err(|_| LedgerError::UnknownFrequency(plan.frequency.clone()))?;
        let card = match self.instrument_for(plan.card_id, &plan.user_id).await? {
            Some(card) => card,
            None => {
                warn!("💳️ Contribution #{} has no usable payment instrument", plan.id);
                return Ok(ItemOutcome::SkippedNoCard);
            },
        };
        if card.is_circuit_broken() {
            debug!("💳️ Card #{} has {} consecutive failures; skipping contribution #{}", card.id, card.failures, plan.id);
            return Ok(ItemOutcome::SkippedCircuitBroken);
        }
        let next_due = next_contribution_date(frequency, now);
        let request = ChargeRequest::new(card.token.clone(), card.payer_email.clone(), plan.amount)
            .with_metadata(serde_json::json!({ "contribution_id": plan.id, "user_id": plan.user_id }));
        match self.attempt_charge(request).await {
            Ok(outcome) if outcome.is_successful() => {
                let receipt = ChargeReceipt::new(outcome.reference.clone().into(), plan.amount);
                self.db.apply_contribution_charge(plan.id, &receipt, now, next_due).await?;
                info!("💳️ Contribution #{} charged {} (ref {})", plan.id, plan.amount, outcome.reference);
                self.call_contribution_charged_hook(&plan.user_id, plan, &receipt).await;
                Ok(ItemOutcome::Charged)
            },
            Ok(outcome) => {
                let failures = self.db.record_card_failure(card.id).await?;
                warn!(
                    "💳️ Charge for contribution #{} was declined ({}). Card #{} failure count: {failures}",
                    plan.id,
                    outcome.message.unwrap_or_else(|| "no reason".to_string()),
                    card.id
                );
                Ok(ItemOutcome::Declined)
            },
            Err(e) => {
                let failures = self.db.record_card_failure(card.id).await?;
                warn!("💳️ Charge provider unavailable for contribution #{}: {e}. Card #{} failure count: {failures}", plan.id, card.id);
                Ok(ItemOutcome::Declined)
            },
        }
    }

    /// Charges every active member of a due circle independently, then advances the circle's schedule
    /// once, whatever the per-member outcomes were.
    async fn process_circle(
        &self,
        circle: &SavingCircle,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<(), LedgerError> {
        let frequency = circle.frequency().map_err(|_| LedgerError::UnknownFrequency(circle.frequency.clone()))?;
        let members = self.db.members_of_circle(circle.id).await?;
        for member in members.iter().filter(|m| m.status == CircleMemberStatus::Active) {
            summary.attempted += 1;
            match self.charge_member(circle, member, now).await {
                Ok(outcome) => summary.tally(&outcome),
                Err(e) => {
                    error!("💳️ Member #{} of circle #{} failed and was skipped: {e}", member.id, circle.id);
                    summary.errors += 1;
                },
            }
        }
        let next_due = next_contribution_date(frequency, now);
        self.db.advance_circle_schedule(circle.id, next_due).await?;
        Ok(())
    }

    async fn charge_member(
        &self,
        circle: &SavingCircle,
        member: &CircleMember,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, LedgerError> {
        if member.failures >= MAX_CONSECUTIVE_FAILURES {
            debug!("💳️ Member #{} has {} consecutive failures; skipping", member.id, member.failures);
            return Ok(ItemOutcome::SkippedCircuitBroken);
        }
        let card = match self.instrument_for(member.card_id, &member.user_id).await? {
            Some(card) => card,
            None => {
                warn!("💳️ Member #{} of circle #{} has no usable payment instrument", member.id, circle.id);
                return Ok(ItemOutcome::SkippedNoCard);
            },
        };
        let request = ChargeRequest::new(card.token.clone(), card.payer_email.clone(), circle.deposit_amount)
            .with_metadata(serde_json::json!({ "circle_id": circle.id, "member_id": member.id }));
        match self.attempt_charge(request).await {
            Ok(outcome) if outcome.is_successful() => {
                let receipt = ChargeReceipt::new(outcome.reference.clone().into(), circle.deposit_amount);
                self.db.apply_circle_charge(circle.id, member.id, &receipt, now).await?;
                info!(
                    "💳️ Member #{} deposited {} into circle #{} (ref {})",
                    member.id, circle.deposit_amount, circle.id, outcome.reference
                );
                self.call_member_charged_hook(member, circle, &receipt).await;
                Ok(ItemOutcome::Charged)
            },
            Ok(outcome) => {
                let failures = self.db.record_member_failure(member.id).await?;
                warn!(
                    "💳️ Deposit from member #{} was declined ({}). Failure count: {failures}",
                    member.id,
                    outcome.message.unwrap_or_else(|| "no reason".to_string())
                );
                Ok(ItemOutcome::Declined)
            },
            Err(e) => {
                let failures = self.db.record_member_failure(member.id).await?;
                warn!("💳️ Charge provider unavailable for member #{}: {e}. Failure count: {failures}", member.id);
                Ok(ItemOutcome::Declined)
            },
        }
    }

    /// The item's preferred instrument: its own stored card if it has one, else the owner's preferred (or
    /// first) card on file.
    async fn instrument_for(&self, card_id: Option<i64>, user_id: &str) -> Result<Option<StoredCard>, LedgerError> {
        let card = match card_id {
            Some(id) => self.db.fetch_card(id).await?,
            None => None,
        };
        match card {
            Some(card) => Ok(Some(card)),
            None => self.db.card_for_user(user_id).await,
        }
    }

    /// Every provider call gets its own bounded timeout so a hung charge stalls one item, not the batch.
    async fn attempt_charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        match tokio::time::timeout(self.charge_timeout, self.charger.charge(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.charge_timeout.as_millis() as u64)),
        }
    }

    async fn call_contribution_charged_hook(&self, user_id: &str, plan: &Contribution, receipt: &ChargeReceipt) {
        for emitter in &self.producers.contribution_charged_producer {
            let event = ContributionChargedEvent::new(user_id, receipt.amount, receipt.reference.clone());
            trace!("💳️ Notifying contribution-charged hook subscribers for plan #{}", plan.id);
            emitter.publish_event(event).await;
        }
    }

    async fn call_member_charged_hook(&self, member: &CircleMember, circle: &SavingCircle, receipt: &ChargeReceipt) {
        for emitter in &self.producers.contribution_charged_producer {
            let event = ContributionChargedEvent::new(member.user_id.as_str(), receipt.amount, receipt.reference.clone());
            trace!("💳️ Notifying hook subscribers for circle #{}", circle.id);
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
