use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseCmd, Money, ResultEngine, Transaction, TransactionKind, reports, transactions,
    util::{normalize_optional_text, require_positive},
};

use super::{Engine, with_tx};

impl Engine {
    /// Records a group expense. Refused when it exceeds the cash balance.
    pub async fn record_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Transaction> {
        require_positive(cmd.amount, "expense")?;
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, cmd.group_id).await?;
            let log = self.transactions_of_group(&db_tx, group.id).await?;
            let available = reports::cash_balance(&log);
            if cmd.amount > available {
                return Err(EngineError::InsufficientFunds(format!(
                    "expense of {} exceeds the cash balance of {}",
                    Money::new(cmd.amount),
                    Money::new(available)
                )));
            }

            let tx = Transaction::new(
                group.id,
                None,
                group.current_cycle_id,
                TransactionKind::Expense,
                cmd.amount,
                cmd.occurred_on,
                cmd.created_by.clone(),
            )?
            .description(normalize_optional_text(cmd.description.as_deref()));
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx)
        })
    }

    /// Cash the group holds according to its ledger.
    pub async fn cash_balance(&self, group_id: Uuid) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            Ok(reports::cash_balance(&log))
        })
    }
}
