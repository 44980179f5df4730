//! Table change feed backed by an in-process registry.

use std::sync::{Arc, Mutex, Weak};

use log::debug;
use tally_core::errors::Result;
use tally_core::events::{
    ChangeFeed, ChangeKind, ChangeTable, Subscription, TableChange, TableChangeCallback,
};

struct Registration {
    id: u64,
    table: ChangeTable,
    user_id: String,
    on_change: TableChangeCallback,
}

#[derive(Default)]
struct Registrations {
    next_id: u64,
    entries: Vec<Registration>,
}

/// Fan-out of row changes to table subscribers.
///
/// Callbacks run on the writing thread, outside the registry lock.
#[derive(Clone, Default)]
pub struct FeedRegistry {
    registrations: Arc<Mutex<Registrations>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a change to every subscriber of `table`. Returns the number of
    /// subscribers reached.
    pub fn emit(
        &self,
        table: ChangeTable,
        event_type: ChangeKind,
        account_id: Option<&str>,
    ) -> usize {
        let targets: Vec<TableChangeCallback> = {
            let registrations = self.registrations.lock().unwrap_or_else(|e| e.into_inner());
            registrations
                .entries
                .iter()
                .filter(|r| r.table == table)
                .map(|r| Arc::clone(&r.on_change))
                .collect()
        };

        for on_change in &targets {
            on_change(TableChange {
                table,
                event_type,
                account_scope: account_id.map(str::to_string),
            });
        }
        targets.len()
    }

    pub fn subscriber_count(&self, table: ChangeTable) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .filter(|r| r.table == table)
            .count()
    }

    /// Users currently subscribed to `table`, in subscription order.
    pub fn subscribers(&self, table: ChangeTable) -> Vec<String> {
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .filter(|r| r.table == table)
            .map(|r| r.user_id.clone())
            .collect()
    }
}

impl ChangeFeed for FeedRegistry {
    fn subscribe_table_changes(
        &self,
        table: ChangeTable,
        user_id: &str,
        on_change: TableChangeCallback,
    ) -> Result<Subscription> {
        let id = {
            let mut registrations = self.registrations.lock().unwrap_or_else(|e| e.into_inner());
            registrations.next_id += 1;
            let id = registrations.next_id;
            registrations.entries.push(Registration {
                id,
                table,
                user_id: user_id.to_string(),
                on_change,
            });
            id
        };
        debug!("Feed subscription {} on {} for {}", id, table.table_name(), user_id);

        let weak: Weak<Mutex<Registrations>> = Arc::downgrade(&self.registrations);
        Ok(Subscription::new(table.table_name(), move || {
            if let Some(registrations) = weak.upgrade() {
                registrations
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .entries
                    .retain(|r| r.id != id);
            }
        }))
    }
}
