use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AuditEntry, AuditTarget, ChangeSet, Cycle, EngineError, Group, NewGroupCmd, ResultEngine,
    UpdateGroupCmd, cycles, groups,
    reports::{self, Reconciliation},
    scope::Resource,
    util::{normalize_required_text, require_positive, require_reason},
};

use super::{Engine, with_tx};

fn validate_share_limits(min_shares: i64, max_shares: i64) -> ResultEngine<()> {
    if min_shares < 0 || max_shares < min_shares {
        return Err(EngineError::InvalidAmount(
            "share limits must satisfy 0 <= min <= max".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Creates a group and opens its first cycle.
    pub async fn create_group(&self, cmd: NewGroupCmd) -> ResultEngine<Group> {
        let name = normalize_required_text(&cmd.name, "group name")?;
        require_positive(cmd.share_value, "share value")?;
        validate_share_limits(cmd.min_shares, cmd.max_shares)?;
        if !cmd.interest_rate.is_finite() || cmd.interest_rate < 0.0 {
            return Err(EngineError::InvalidAmount(
                "interest rate must be >= 0".to_string(),
            ));
        }

        let mut group = Group {
            id: Uuid::new_v4(),
            name,
            branch: cmd.branch.trim().to_string(),
            location: cmd.location.trim().to_string(),
            share_value: cmd.share_value,
            min_shares: cmd.min_shares,
            max_shares: cmd.max_shares,
            current_cycle_id: None,
            total_savings: 0,
            total_loans_outstanding: 0,
            total_solidarity: 0,
            created_at: Utc::now(),
        };
        let cycle = Cycle::new(group.id, cmd.cycle_start, cmd.interest_rate);
        group.current_cycle_id = Some(cycle.id);

        with_tx!(self, |db_tx| {
            let exists = groups::Entity::find()
                .filter(groups::Column::Name.eq(group.name.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(group.name));
            }

            groups::ActiveModel::from(&group).insert(&db_tx).await?;
            cycles::ActiveModel::from(&cycle).insert(&db_tx).await?;
            tracing::info!(group = %group.id, "group {} created", group.name);
            Ok(group)
        })
    }

    /// Edits a group's settings, recording one audit entry with every
    /// changed field.
    pub async fn update_group(
        &self,
        group_id: Uuid,
        cmd: UpdateGroupCmd,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Group> {
        let reason = require_reason(reason, "group edit")?;
        with_tx!(self, |db_tx| {
            let mut group = self.require_group(&db_tx, group_id).await?;
            let before = group.clone();

            if let Some(name) = cmd.name.as_deref() {
                group.name = normalize_required_text(name, "group name")?;
            }
            if let Some(branch) = cmd.branch {
                group.branch = branch.trim().to_string();
            }
            if let Some(location) = cmd.location {
                group.location = location.trim().to_string();
            }
            if let Some(share_value) = cmd.share_value {
                require_positive(share_value, "share value")?;
                group.share_value = share_value;
            }
            group.min_shares = cmd.min_shares.unwrap_or(group.min_shares);
            group.max_shares = cmd.max_shares.unwrap_or(group.max_shares);
            validate_share_limits(group.min_shares, group.max_shares)?;

            let mut changes = ChangeSet::new();
            changes
                .track("name", &before.name, &group.name)
                .track("branch", &before.branch, &group.branch)
                .track("location", &before.location, &group.location)
                .track("share_value", before.share_value, group.share_value)
                .track("min_shares", before.min_shares, group.min_shares)
                .track("max_shares", before.max_shares, group.max_shares);
            if changes.is_empty() {
                return Ok(group);
            }

            self.save_group(&db_tx, &group).await?;
            let entry = AuditEntry::new(AuditTarget::Group, group.id, editor, &reason, changes);
            self.append_audit(&db_tx, &entry).await?;
            Ok(group)
        })
    }

    pub async fn group(&self, group_id: Uuid) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| self.require_group(&db_tx, group_id).await)
    }

    /// Every group, by name.
    pub async fn list_groups(&self) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            groups::Entity::find()
                .order_by_asc(groups::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Group::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Audit trail of a group's settings.
    pub async fn group_history(&self, group_id: Uuid) -> ResultEngine<Vec<AuditEntry>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.history_of(&db_tx, AuditTarget::Group, group_id).await
        })
    }

    /// Group owning an id-addressed record.
    pub async fn group_of(&self, resource: Resource) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| self.group_of_in(&db_tx, resource).await)
    }

    /// Rebuilds the cached totals of a group and its members from the
    /// transaction log and the loan book.
    ///
    /// Returns the reconciliation as it stood before the repair.
    pub async fn recompute_group_totals(&self, group_id: Uuid) -> ResultEngine<Reconciliation> {
        with_tx!(self, |db_tx| {
            let mut group = self.require_group(&db_tx, group_id).await?;
            let members = self.members_of_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            let loans = self.loans_of_group(&db_tx, group_id).await?;

            let report = reports::reconcile(&group, &members, &log, &loans);
            if report.consistent {
                return Ok(report);
            }

            group.total_savings = report.derived.total_savings;
            group.total_loans_outstanding = report.derived.total_loans_outstanding;
            group.total_solidarity = report.derived.total_solidarity;
            self.save_group(&db_tx, &group).await?;

            for mismatch in &report.members {
                if let Some(member) = members.iter().find(|m| m.id == mismatch.member_id) {
                    let mut member = member.clone();
                    member.total_shares = mismatch.derived_shares;
                    member.total_loans = mismatch.derived_loans;
                    self.save_member(&db_tx, &member).await?;
                }
            }
            tracing::warn!(group = %group_id, "cached totals rebuilt from the ledger");
            Ok(report)
        })
    }
}
