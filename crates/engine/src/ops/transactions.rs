use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    AuditEntry, AuditTarget, ChangeSet, EngineError, ResultEngine, Transaction, TransactionKind,
    transactions, util::require_reason,
};

use super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` and `to` are both inclusive business dates.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub member_id: Option<Uuid>,
    /// If true, includes voided transactions (default: false).
    pub include_voided: bool,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::InvalidState(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidState(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredOn.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredOn.lte(to));
        }
        if let Some(member_id) = filter.member_id {
            self = self.filter(transactions::Column::MemberId.eq(member_id.to_string()));
        }
        if !filter.include_voided {
            self = self.filter(transactions::Column::IsVoid.eq(false));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_on: NaiveDate,
    transaction_id: String,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Lists a group's transactions with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_on DESC, transaction_id
    /// DESC)`. The returned cursor is `None` on the last page.
    pub async fn list_transactions_page(
        &self,
        group_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(transactions::Column::OccurredOn)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredOn.lt(cursor.occurred_on))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredOn.eq(cursor.occurred_on))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
            for tx_model in rows.into_iter().take(limit as usize) {
                out.push(Transaction::try_from(tx_model)?);
            }

            let next_cursor = out.last().map(|tx| TransactionsCursor {
                occurred_on: tx.occurred_on,
                transaction_id: tx.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// A transaction with its edit history attached.
    pub async fn transaction_detail(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let mut tx = self.require_transaction(&db_tx, transaction_id).await?;
            tx.edit_history = self
                .history_of(&db_tx, AuditTarget::Transaction, tx.id)
                .await?;
            Ok(tx)
        })
    }

    /// Voids a transaction, reverting its effect on cached totals once.
    ///
    /// Deposits give back their savings, solidarity and shares. Expenses and
    /// fine payments made at a meeting only feed derived figures and are just
    /// flagged. Loan entries and payments against a fine carry their effect
    /// on the loan or fine and are refused. A second void is refused.
    pub async fn void_transaction(
        &self,
        transaction_id: Uuid,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        let reason = require_reason(reason, "void")?;
        with_tx!(self, |db_tx| {
            let mut tx = self.require_transaction(&db_tx, transaction_id).await?;
            if tx.is_void {
                return Err(EngineError::AlreadyVoided(format!(
                    "transaction {} is already void",
                    tx.id
                )));
            }

            match tx.kind {
                TransactionKind::ShareDeposit => {
                    let mut group = self.require_group(&db_tx, tx.group_id).await?;
                    group.add_savings(-tx.amount, -tx.solidarity_amount.unwrap_or_default())?;
                    self.save_group(&db_tx, &group).await?;
                    if let Some(member_id) = tx.member_id {
                        let mut member = self.require_member(&db_tx, member_id).await?;
                        member.add_shares(-tx.share_count.unwrap_or_default());
                        self.save_member(&db_tx, &member).await?;
                    }
                }
                TransactionKind::FinePayment if tx.reference_id.is_some() => {
                    return Err(EngineError::InvalidState(
                        "payments against a fine cannot be voided".to_string(),
                    ));
                }
                TransactionKind::FinePayment | TransactionKind::Expense => {}
                kind if kind.is_loan_entry() => {
                    return Err(EngineError::InvalidState(format!(
                        "{} entries cannot be voided",
                        kind.as_str()
                    )));
                }
                _ => {}
            }

            tx.is_void = true;
            tx.void_reason = Some(reason.clone());
            tx.voided_by = Some(editor.to_string());
            tx.voided_at = Some(Utc::now());
            self.save_transaction(&db_tx, &tx).await?;

            let mut changes = ChangeSet::new();
            changes.always("is_void", false, true);
            let entry = AuditEntry::new(AuditTarget::Transaction, tx.id, editor, &reason, changes);
            self.append_audit(&db_tx, &entry).await?;
            tracing::info!("transaction {} voided by {editor}", tx.id);

            tx.edit_history = self
                .history_of(&db_tx, AuditTarget::Transaction, tx.id)
                .await?;
            Ok(tx)
        })
    }

    /// Voids a share deposit. Other kinds are refused.
    pub async fn void_contribution(
        &self,
        transaction_id: Uuid,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        require_reason(reason, "void")?;
        let kind = self.transaction_detail(transaction_id).await?.kind;
        if kind != TransactionKind::ShareDeposit {
            return Err(EngineError::InvalidState(
                "only share deposits can be voided as contributions".to_string(),
            ));
        }
        self.void_transaction(transaction_id, editor, reason).await
    }
}
