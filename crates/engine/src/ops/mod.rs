use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod contributions;
mod cycles;
mod expenses;
mod fines;
mod groups;
mod loans;
mod meetings;
mod members;
mod reports;
mod transactions;
mod users;

pub use loans::{LateFeeReport, RepaymentOutcome};
pub use meetings::{EntryFailure, MeetingReport};
pub use members::{BatchFailure, BatchReport, MemberRemoval};
pub use fines::FinePaymentOutcome;
pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Every mutating operation runs in one database transaction: the entity
/// write, its audit entry and the cached totals of the group and member
/// commit together or not at all.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
