use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info, warn};
use prizedraw_core::repository::{FulfilmentOutcome, FulfilmentStore, PoolRepository};
use prizedraw_core::{PaymentConfirmation, Purchase};
use prizedraw_pool::{PoolError, PoolHealthMonitor};
use prizedraw_shared::PrizePool;

use crate::ClaimError;

/// Outcome of handling one payment confirmation
#[derive(Debug, Clone, Serialize)]
pub struct CompletedPurchase {
    pub purchase: Purchase,
    pub pool: Option<PrizePool>,
    /// The payment had already been handled; nothing new was written.
    pub replayed: bool,
}

impl CompletedPurchase {
    pub fn needs_manual_fulfilment(&self) -> bool {
        self.pool.is_none()
    }
}

enum Attempt {
    Done(CompletedPurchase),
    /// At least one picked pool referenced sold-out items
    Conflicted,
    Unclaimed,
}

/// Turns a confirmed payment into exactly one claimed pool, or an explicit
/// manual-fulfilment record when no pool can be had.
pub struct PurchaseOrchestrator {
    pools: Arc<dyn PoolRepository>,
    fulfilment: Arc<dyn FulfilmentStore>,
    monitor: Arc<PoolHealthMonitor>,
    supported_sizes: Vec<u8>,
    max_attempts: usize,
}

impl PurchaseOrchestrator {
    pub fn new(
        pools: Arc<dyn PoolRepository>,
        fulfilment: Arc<dyn FulfilmentStore>,
        monitor: Arc<PoolHealthMonitor>,
        supported_sizes: Vec<u8>,
    ) -> Self {
        Self {
            pools,
            fulfilment,
            monitor,
            supported_sizes,
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn complete_payment(&self, confirmation: &PaymentConfirmation) -> Result<CompletedPurchase, ClaimError> {
        confirmation.validate()?;

        if let Some(existing) = self.fulfilment.find_purchase(&confirmation.payment_reference).await? {
            info!("Payment {} already handled, replaying", confirmation.payment_reference);
            return self.replay(existing).await;
        }

        let event_id = confirmation.event_id;
        let quantity_size = confirmation.quantity_size;

        if !confirmation.is_supported_size(&self.supported_sizes) {
            if !self.monitor.event_exists(event_id).await? {
                return Err(ClaimError::EventNotFound(event_id));
            }
            warn!(
                "Payment {} asks for unsupported quantity size {}",
                confirmation.payment_reference, quantity_size
            );
            return self.manual(confirmation).await;
        }

        match self.monitor.ensure_available(event_id, quantity_size).await {
            Ok(_) => {}
            Err(PoolError::Exhausted { .. }) => return self.manual(confirmation).await,
            Err(e) => return Err(e.into()),
        }

        match self.claim_any(confirmation).await? {
            Attempt::Done(done) => return Ok(done),
            Attempt::Unclaimed => {}
            // Drawn pools reference items that have since sold; redraw from current supply and go again.
            Attempt::Conflicted => match self.monitor.regenerate_now(event_id, quantity_size).await {
                Ok(fresh) => {
                    info!(
                        "Redrew {} pools for event {} size {} after supply conflicts",
                        fresh, event_id, quantity_size
                    );
                    if let Attempt::Done(done) = self.claim_any(confirmation).await? {
                        return Ok(done);
                    }
                }
                Err(e) => warn!(
                    "Redraw for event {} size {} failed: {}",
                    event_id, quantity_size, e
                ),
            },
        }

        self.manual(confirmation).await
    }

    /// Pick and claim up to `max_attempts` pools until one goes through.
    async fn claim_any(&self, confirmation: &PaymentConfirmation) -> Result<Attempt, ClaimError> {
        let event_id = confirmation.event_id;
        let quantity_size = confirmation.quantity_size;

        let mut conflicted = false;
        for attempt in 1..=self.max_attempts {
            let Some(pool) = self.pools.pick_available(event_id, quantity_size).await? else {
                break;
            };

            let purchase = Purchase::for_pool(confirmation, pool.id);
            match self.fulfilment.claim_and_fulfil(pool.id, &purchase).await? {
                FulfilmentOutcome::Fulfilled(pool) => {
                    info!(
                        "Payment {} fulfilled with pool {} (attempt {})",
                        confirmation.payment_reference, pool.id, attempt
                    );
                    self.monitor.replenish_one(event_id, quantity_size);
                    return Ok(Attempt::Done(CompletedPurchase {
                        purchase,
                        pool: Some(pool),
                        replayed: false,
                    }));
                }
                FulfilmentOutcome::AlreadyClaimed => {
                    warn!("Pool {} was claimed concurrently, retrying", pool.id);
                }
                FulfilmentOutcome::SupplyConflict { item_id } => {
                    warn!("Pool {} can no longer be supplied (item {}), retrying", pool.id, item_id);
                    conflicted = true;
                }
                FulfilmentOutcome::DuplicatePayment => {
                    let existing = self
                        .fulfilment
                        .find_purchase(&confirmation.payment_reference)
                        .await?
                        .ok_or_else(|| ClaimError::Storage("duplicate payment without a purchase".to_string()))?;
                    return Ok(Attempt::Done(self.replay(existing).await?));
                }
            }
        }

        Ok(if conflicted { Attempt::Conflicted } else { Attempt::Unclaimed })
    }

    async fn manual(&self, confirmation: &PaymentConfirmation) -> Result<CompletedPurchase, ClaimError> {
        let purchase = Purchase::manual(confirmation);
        self.fulfilment.record_manual_fulfilment(&purchase).await?;
        error!(
            "Payment {} for event {} size {} captured but no pool could be allocated; manual fulfilment required",
            confirmation.payment_reference, confirmation.event_id, confirmation.quantity_size
        );

        Ok(CompletedPurchase {
            purchase,
            pool: None,
            replayed: false,
        })
    }

    async fn replay(&self, purchase: Purchase) -> Result<CompletedPurchase, ClaimError> {
        let pool = match purchase.pool_id {
            Some(pool_id) => self.pools.get_pool(pool_id).await?,
            None => None,
        };

        Ok(CompletedPurchase {
            purchase,
            pool,
            replayed: true,
        })
    }
}
