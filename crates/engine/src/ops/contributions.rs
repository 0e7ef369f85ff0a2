use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AuditEntry, AuditTarget, ChangeSet, ContributionCmd, EngineError, MemberStatus, ResultEngine,
    Transaction, TransactionKind, transactions,
    util::{checked_product, normalize_optional_text, require_non_negative, require_reason},
};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn record_contribution_in(
        &self,
        db: &DatabaseTransaction,
        cmd: &ContributionCmd,
    ) -> ResultEngine<Transaction> {
        require_non_negative(cmd.share_count, "share count")?;
        require_non_negative(cmd.solidarity_amount, "solidarity amount")?;

        let mut group = self.require_group(db, cmd.group_id).await?;
        let mut member = self
            .require_member_in_group(db, cmd.group_id, cmd.member_id)
            .await?;
        if member.status == MemberStatus::Exited {
            return Err(EngineError::InvalidState(format!(
                "member {} has exited the group",
                member.full_name
            )));
        }
        group.require_share_count(cmd.share_count)?;
        let cycle = self.require_open_cycle(db, &group).await?;

        let amount = checked_product(cmd.share_count, group.share_value, "deposit")?;
        let tx = Transaction::new(
            group.id,
            Some(member.id),
            Some(cycle.id),
            TransactionKind::ShareDeposit,
            amount,
            cmd.occurred_on,
            cmd.created_by.clone(),
        )?
        .deposit(cmd.share_count, cmd.solidarity_amount)
        .description(normalize_optional_text(cmd.notes.as_deref()));

        transactions::ActiveModel::from(&tx).insert(db).await?;
        group.add_savings(amount, cmd.solidarity_amount)?;
        member.add_shares(cmd.share_count);
        self.save_group(db, &group).await?;
        self.save_member(db, &member).await?;
        Ok(tx)
    }

    /// Records a share deposit in the group's open cycle.
    ///
    /// The share count must lie within the group's `min_shares..=max_shares`.
    /// The amount is `share_count × share_value`. Group savings and
    /// solidarity and the member's share count grow accordingly.
    pub async fn record_contribution(&self, cmd: ContributionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| self.record_contribution_in(&db_tx, &cmd).await)
    }

    /// Corrects the share count and solidarity of a deposit.
    ///
    /// The old effect is reverted and the new one applied, with the amount
    /// recomputed from the group's current share value. One audit entry
    /// records the old and new figures.
    pub async fn edit_contribution(
        &self,
        transaction_id: Uuid,
        share_count: i64,
        solidarity_amount: i64,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        let reason = require_reason(reason, "contribution edit")?;
        require_non_negative(share_count, "share count")?;
        require_non_negative(solidarity_amount, "solidarity amount")?;

        with_tx!(self, |db_tx| {
            let mut tx = self.require_transaction(&db_tx, transaction_id).await?;
            if tx.kind != TransactionKind::ShareDeposit {
                return Err(EngineError::InvalidState(
                    "only share deposits can be edited".to_string(),
                ));
            }
            if tx.is_void {
                return Err(EngineError::AlreadyVoided(
                    "voided transactions cannot be edited".to_string(),
                ));
            }
            let member_id = tx.member_id.ok_or_else(|| {
                EngineError::InvalidState("deposit without a member".to_string())
            })?;

            let mut group = self.require_group(&db_tx, tx.group_id).await?;
            let mut member = self.require_member(&db_tx, member_id).await?;

            let old_shares = tx.share_count.unwrap_or_default();
            let old_solidarity = tx.solidarity_amount.unwrap_or_default();
            let old_amount = tx.amount;
            group.require_share_count(share_count)?;
            let new_amount = checked_product(share_count, group.share_value, "deposit")?;

            group.add_savings(-old_amount, -old_solidarity)?;
            member.add_shares(-old_shares);
            group.add_savings(new_amount, solidarity_amount)?;
            member.add_shares(share_count);

            tx.amount = new_amount;
            tx.share_count = Some(share_count);
            tx.solidarity_amount = Some(solidarity_amount);

            let mut changes = ChangeSet::new();
            changes
                .always("share_count", old_shares, share_count)
                .always("solidarity_amount", old_solidarity, solidarity_amount)
                .always("amount", old_amount, new_amount);

            self.save_transaction(&db_tx, &tx).await?;
            self.save_group(&db_tx, &group).await?;
            self.save_member(&db_tx, &member).await?;
            let entry = AuditEntry::new(AuditTarget::Transaction, tx.id, editor, &reason, changes);
            self.append_audit(&db_tx, &entry).await?;

            tx.edit_history = self
                .history_of(&db_tx, AuditTarget::Transaction, tx.id)
                .await?;
            Ok(tx)
        })
    }
}
