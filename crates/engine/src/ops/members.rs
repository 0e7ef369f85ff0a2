use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuditEntry, AuditTarget, ChangeSet, EngineError, Member, MemberStatus, NewMemberCmd,
    ResultEngine, attendance, fines, loans, members, transactions,
    util::{normalize_required_text, require_reason, text_or_empty},
};

use super::{Engine, with_tx};

/// One rejected row of a bulk load.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchFailure {
    /// Zero-based position of the row in the input.
    pub index: usize,
    pub error: String,
}

/// Outcome of a best-effort bulk load. Rows are applied independently, so
/// `succeeded < attempted` means a partial load.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What `delete_member` did.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberRemoval {
    /// The member has history and was marked `EXITED`.
    Exited(Member),
    /// The member had no history and was removed.
    Deleted,
}

impl Engine {
    async fn add_member_in(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        cmd: &NewMemberCmd,
    ) -> ResultEngine<Member> {
        self.require_group(db, group_id).await?;
        let member = Member {
            id: Uuid::new_v4(),
            group_id,
            full_name: normalize_required_text(
                cmd.full_name.as_deref().unwrap_or_default(),
                "member name",
            )?,
            national_id: text_or_empty(cmd.national_id.as_deref()),
            phone: text_or_empty(cmd.phone.as_deref()),
            status: MemberStatus::Active,
            total_shares: 0,
            total_loans: 0,
            joined_on: cmd.joined_on.unwrap_or_else(|| Utc::now().date_naive()),
        };

        if !member.national_id.is_empty() {
            let duplicate = members::Entity::find()
                .filter(members::Column::GroupId.eq(group_id.to_string()))
                .filter(members::Column::NationalId.eq(member.national_id.clone()))
                .one(db)
                .await?
                .is_some();
            if duplicate {
                return Err(EngineError::ExistingKey(member.national_id));
            }
        }

        members::ActiveModel::from(&member).insert(db).await?;
        Ok(member)
    }

    /// Adds a member to a group. Missing identity fields default to empty
    /// and the join date to today.
    pub async fn add_member(&self, group_id: Uuid, cmd: NewMemberCmd) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| self.add_member_in(&db_tx, group_id, &cmd).await)
    }

    /// Adds members row by row. Each row commits on its own; a rejected row
    /// is logged and reported, and the load goes on.
    pub async fn import_members(
        &self,
        group_id: Uuid,
        rows: Vec<NewMemberCmd>,
    ) -> ResultEngine<BatchReport> {
        with_tx!(self, |db_tx| self.require_group(&db_tx, group_id).await)?;

        let mut report = BatchReport {
            attempted: rows.len(),
            ..BatchReport::default()
        };
        for (index, row) in rows.iter().enumerate() {
            let outcome = with_tx!(self, |db_tx| self.add_member_in(&db_tx, group_id, row).await);
            match outcome {
                Ok(_) => report.succeeded += 1,
                Err(err @ EngineError::Database(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!("member import row {index} skipped: {err}");
                    report.failures.push(BatchFailure {
                        index,
                        error: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            "member import into {group_id}: {}/{} rows applied",
            report.succeeded,
            report.attempted
        );
        Ok(report)
    }

    pub async fn member(&self, member_id: Uuid) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| self.require_member(&db_tx, member_id).await)
    }

    /// Members of a group, by name.
    pub async fn list_members(&self, group_id: Uuid) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            members::Entity::find()
                .filter(members::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(members::Column::FullName)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Member::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    pub async fn set_member_status(
        &self,
        member_id: Uuid,
        status: MemberStatus,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Member> {
        let reason = require_reason(reason, "member status change")?;
        with_tx!(self, |db_tx| {
            let mut member = self.require_member(&db_tx, member_id).await?;
            if member.status == status {
                return Ok(member);
            }
            let mut changes = ChangeSet::new();
            changes.track("status", member.status.as_str(), status.as_str());
            member.status = status;
            self.save_member(&db_tx, &member).await?;
            self.append_audit(
                &db_tx,
                &AuditEntry::new(AuditTarget::Member, member.id, editor, &reason, changes),
            )
            .await?;
            Ok(member)
        })
    }

    /// Removes a member. Members with transactions, loans or fines are kept
    /// as `EXITED` so the ledger stays intact; others are deleted together
    /// with their attendance rows.
    pub async fn delete_member(
        &self,
        member_id: Uuid,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<MemberRemoval> {
        let reason = require_reason(reason, "member removal")?;
        with_tx!(self, |db_tx| {
            let mut member = self.require_member(&db_tx, member_id).await?;
            let id = member_id.to_string();

            let tx_count = transactions::Entity::find()
                .filter(transactions::Column::MemberId.eq(id.clone()))
                .count(&db_tx)
                .await?;
            let loan_count = loans::Entity::find()
                .filter(loans::Column::MemberId.eq(id.clone()))
                .count(&db_tx)
                .await?;
            let fine_count = fines::Entity::find()
                .filter(fines::Column::MemberId.eq(id.clone()))
                .count(&db_tx)
                .await?;

            if tx_count + loan_count + fine_count > 0 {
                let mut changes = ChangeSet::new();
                changes.always("status", member.status.as_str(), MemberStatus::Exited.as_str());
                member.status = MemberStatus::Exited;
                self.save_member(&db_tx, &member).await?;
                self.append_audit(
                    &db_tx,
                    &AuditEntry::new(AuditTarget::Member, member.id, editor, &reason, changes),
                )
                .await?;
                Ok(MemberRemoval::Exited(member))
            } else {
                attendance::Entity::delete_many()
                    .filter(attendance::Column::MemberId.eq(id.clone()))
                    .exec(&db_tx)
                    .await?;
                members::Entity::delete_by_id(id).exec(&db_tx).await?;
                tracing::info!("member {member_id} deleted by {editor}: {reason}");
                Ok(MemberRemoval::Deleted)
            }
        })
    }
}
