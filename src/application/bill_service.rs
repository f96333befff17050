use crate::application::session::SessionStore;
use crate::data::collection::{load_list, persist_list};
use crate::domain::bill::{Bill, StoredBill, sort_newest_first};
use crate::domain::error::DomainError;
use crate::domain::outcome::ReadOutcome;
use crate::domain::storage::{BILLS_KEY, KeyValueStore};
use crate::domain::user::User;
use crate::infrastructure::config::StoreConfig;
use crate::infrastructure::ids::{new_bill_id, now_timestamp};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct BillService<S: KeyValueStore> {
    store: Arc<S>,
    session: SessionStore<S>,
    latency: Duration,
}

impl<S: KeyValueStore> BillService<S> {
    pub fn new(store: Arc<S>, config: &StoreConfig) -> Self {
        Self {
            session: SessionStore::new(Arc::clone(&store)),
            store,
            latency: config.latency.bills,
        }
    }

    /// Bills of the logged-in user, newest first.
    ///
    /// Never fails: without a session the listing is empty, and unreadable
    /// storage yields an empty [`ReadOutcome::Degraded`] listing.
    #[instrument(skip(self))]
    pub async fn get_bills(&self) -> ReadOutcome<Vec<Bill>> {
        tokio::time::sleep(self.latency).await;

        let Some(user) = self.session.current() else {
            debug!("No session, returning empty bill list");
            return ReadOutcome::Fresh(Vec::new());
        };

        match load_list::<StoredBill, _>(self.store.as_ref(), BILLS_KEY) {
            Ok(all) => {
                let mut bills: Vec<Bill> = all
                    .into_iter()
                    .filter(|b| b.is_owned_by(&user.id))
                    .map(|b| b.bill)
                    .collect();
                sort_newest_first(&mut bills);
                info!(user_id = %user.id, count = bills.len(), "Bills loaded");
                ReadOutcome::Fresh(bills)
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Failed to load bills");
                ReadOutcome::Degraded {
                    value: Vec::new(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Creates the bill if its id is temporary, otherwise updates the stored
    /// record with the same id and owner.
    #[instrument(skip(self, bill), fields(bill_id = %bill.id))]
    pub async fn save_bill(&self, bill: Bill) -> Result<Bill> {
        tokio::time::sleep(self.latency).await;

        let user = self.session.current().ok_or_else(|| {
            warn!("Save attempted without a session");
            DomainError::Unauthenticated
        })?;

        self.upsert(&user, bill).map_err(|e| {
            error!(user_id = %user.id, error = %e, "Failed to save bill");
            e
        })
    }

    fn upsert(&self, owner: &User, bill: Bill) -> Result<Bill> {
        let mut all: Vec<StoredBill> = load_list(self.store.as_ref(), BILLS_KEY)?;
        let bill = bill.without_owner_tag();

        let saved = if bill.is_temporary() {
            let id = loop {
                let candidate = new_bill_id();
                if !all.iter().any(|b| b.bill.id == candidate) {
                    break candidate;
                }
            };
            let created = Bill {
                id,
                date: now_timestamp(),
                details: bill.details,
            };
            debug!(temporary_id = %bill.id, bill_id = %created.id, "Creating bill");
            all.push(StoredBill::new(created.clone(), &owner.id));
            created
        } else if let Some(existing) = all
            .iter_mut()
            .find(|b| b.bill.id == bill.id && b.is_owned_by(&owner.id))
        {
            debug!(bill_id = %bill.id, "Updating bill in place");
            *existing = StoredBill::new(bill.clone(), &owner.id);
            bill
        } else {
            // Keeps the caller's id and claims the bill for the current user.
            // This can hide a lost record, so it is logged loudly.
            warn!(
                bill_id = %bill.id,
                user_id = %owner.id,
                "Bill to update not found, storing it as a new record"
            );
            all.push(StoredBill::new(bill.clone(), &owner.id));
            bill
        };

        persist_list(self.store.as_ref(), BILLS_KEY, &all)?;
        info!(bill_id = %saved.id, user_id = %owner.id, total = all.len(), "Bill saved");
        Ok(saved)
    }
}
