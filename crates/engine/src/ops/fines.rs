use chrono::NaiveDate;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuditEntry, AuditTarget, ChangeSet, EngineError, Fine, FineCategory, FineStatus, Money,
    NewFineCmd, ResultEngine, Transaction, TransactionKind, UpdateFineCmd, fine_categories, fines,
    transactions,
    util::{
        normalize_lookup_key, normalize_optional_text, normalize_required_text,
        require_non_negative, require_positive, require_reason,
    },
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinePaymentOutcome {
    pub fine: Fine,
    pub transaction: Transaction,
    pub applied: i64,
    pub excess: i64,
}

impl Engine {
    /// Adds a fine category. Names are unique per group once folded, so
    /// "Retard" and "retard" cannot coexist.
    pub async fn create_fine_category(
        &self,
        group_id: Uuid,
        name: &str,
        default_amount: i64,
    ) -> ResultEngine<FineCategory> {
        let name = normalize_required_text(name, "category name")?;
        let name_norm = normalize_lookup_key(&name)?;
        require_non_negative(default_amount, "default amount")?;

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let exists = fine_categories::Entity::find()
                .filter(fine_categories::Column::GroupId.eq(group_id.to_string()))
                .filter(fine_categories::Column::NameNorm.eq(name_norm.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let category = FineCategory {
                id: Uuid::new_v4(),
                group_id,
                name,
                default_amount,
            };
            fine_categories::ActiveModel {
                id: ActiveValue::Set(category.id.to_string()),
                group_id: ActiveValue::Set(group_id.to_string()),
                name: ActiveValue::Set(category.name.clone()),
                name_norm: ActiveValue::Set(name_norm),
                default_amount: ActiveValue::Set(default_amount),
            }
            .insert(&db_tx)
            .await?;
            Ok(category)
        })
    }

    pub async fn list_fine_categories(&self, group_id: Uuid) -> ResultEngine<Vec<FineCategory>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            fine_categories::Entity::find()
                .filter(fine_categories::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(fine_categories::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(FineCategory::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Resolves a category by name, ignoring case, accents and punctuation.
    pub async fn find_fine_category(
        &self,
        group_id: Uuid,
        name: &str,
    ) -> ResultEngine<FineCategory> {
        let name_norm = normalize_lookup_key(name)?;
        with_tx!(self, |db_tx| {
            let model = fine_categories::Entity::find()
                .filter(fine_categories::Column::GroupId.eq(group_id.to_string()))
                .filter(fine_categories::Column::NameNorm.eq(name_norm))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("fine category not exists".to_string()))?;
            FineCategory::try_from(model)
        })
    }

    /// Issues a fine. Without an explicit amount the category default is
    /// charged.
    pub async fn create_fine(&self, cmd: NewFineCmd) -> ResultEngine<Fine> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, cmd.group_id).await?;
            let member = self
                .require_member_in_group(&db_tx, cmd.group_id, cmd.member_id)
                .await?;
            let category = self.require_fine_category(&db_tx, cmd.category_id).await?;
            if category.group_id != group.id {
                return Err(EngineError::KeyNotFound(
                    "fine category not exists".to_string(),
                ));
            }
            let amount = cmd.amount.unwrap_or(category.default_amount);
            require_positive(amount, "fine amount")?;

            let fine = Fine {
                id: Uuid::new_v4(),
                group_id: group.id,
                member_id: member.id,
                cycle_id: group.current_cycle_id,
                category_id: category.id,
                amount,
                paid_amount: 0,
                status: FineStatus::Unpaid,
                description: normalize_optional_text(cmd.description.as_deref()),
                issued_on: cmd.issued_on,
                history: Vec::new(),
            };
            fines::ActiveModel::from(&fine).insert(&db_tx).await?;
            Ok(fine)
        })
    }

    /// Pays a fine, up to what is still owed. The payment is recorded as a
    /// `FINE_PAYMENT` referencing the fine; the rest comes back as `excess`.
    pub async fn pay_fine(
        &self,
        fine_id: Uuid,
        amount: i64,
        paid_on: NaiveDate,
        created_by: &str,
    ) -> ResultEngine<FinePaymentOutcome> {
        require_positive(amount, "payment")?;
        with_tx!(self, |db_tx| {
            let mut fine = self.require_fine(&db_tx, fine_id).await?;
            if fine.is_void() {
                return Err(EngineError::InvalidState("fine is void".to_string()));
            }
            if fine.outstanding() == 0 {
                return Err(EngineError::InvalidState(
                    "fine is already paid".to_string(),
                ));
            }

            let (applied, excess) = fine.apply_payment(amount);
            let transaction = Transaction::new(
                fine.group_id,
                Some(fine.member_id),
                fine.cycle_id,
                TransactionKind::FinePayment,
                applied,
                paid_on,
                created_by.to_string(),
            )?
            .reference(fine.id)
            .description(fine.description.clone());
            transactions::ActiveModel::from(&transaction)
                .insert(&db_tx)
                .await?;
            self.save_fine(&db_tx, &fine).await?;

            Ok(FinePaymentOutcome {
                fine,
                transaction,
                applied,
                excess,
            })
        })
    }

    /// Edits a fine's amount or description. The status is recomputed and
    /// one audit entry records the change.
    pub async fn update_fine(
        &self,
        fine_id: Uuid,
        cmd: UpdateFineCmd,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Fine> {
        let reason = require_reason(reason, "fine edit")?;
        with_tx!(self, |db_tx| {
            let mut fine = self.require_fine(&db_tx, fine_id).await?;
            if fine.is_void() {
                return Err(EngineError::InvalidState(
                    "voided fines cannot be edited".to_string(),
                ));
            }
            let before = fine.clone();

            if let Some(amount) = cmd.amount {
                require_positive(amount, "fine amount")?;
                if amount < fine.paid_amount {
                    return Err(EngineError::InvalidAmount(format!(
                        "fine amount cannot drop below the {} already paid",
                        Money::new(fine.paid_amount)
                    )));
                }
                fine.amount = amount;
            }
            if cmd.description.is_some() {
                fine.description = normalize_optional_text(cmd.description.as_deref());
            }
            fine.refresh_status();

            let mut changes = ChangeSet::new();
            changes
                .track("amount", before.amount, fine.amount)
                .track(
                    "description",
                    before.description.as_deref().unwrap_or_default(),
                    fine.description.as_deref().unwrap_or_default(),
                )
                .track("status", before.status.as_str(), fine.status.as_str());
            if changes.is_empty() {
                return Ok(fine);
            }

            self.save_fine(&db_tx, &fine).await?;
            let entry = AuditEntry::new(AuditTarget::Fine, fine.id, editor, &reason, changes);
            self.append_audit(&db_tx, &entry).await?;
            fine.history = self.history_of(&db_tx, AuditTarget::Fine, fine.id).await?;
            Ok(fine)
        })
    }

    /// Voids an unpaid fine. Fines with any payment are refused and keep
    /// their status.
    pub async fn void_fine(&self, fine_id: Uuid, editor: &str, reason: &str) -> ResultEngine<Fine> {
        let reason = require_reason(reason, "fine void")?;
        with_tx!(self, |db_tx| {
            let mut fine = self.require_fine(&db_tx, fine_id).await?;
            if fine.is_void() {
                return Err(EngineError::AlreadyVoided(format!(
                    "fine {} is already void",
                    fine.id
                )));
            }
            if fine.paid_amount > 0 {
                return Err(EngineError::InvalidState(format!(
                    "fine has {} paid and cannot be voided",
                    fine.paid_amount
                )));
            }

            let mut changes = ChangeSet::new();
            changes.always("status", fine.status.as_str(), FineStatus::Void.as_str());
            fine.status = FineStatus::Void;
            self.save_fine(&db_tx, &fine).await?;
            let entry = AuditEntry::new(AuditTarget::Fine, fine.id, editor, &reason, changes);
            self.append_audit(&db_tx, &entry).await?;
            fine.history = self.history_of(&db_tx, AuditTarget::Fine, fine.id).await?;
            Ok(fine)
        })
    }

    /// A fine with its audit history.
    pub async fn fine(&self, fine_id: Uuid) -> ResultEngine<Fine> {
        with_tx!(self, |db_tx| {
            let mut fine = self.require_fine(&db_tx, fine_id).await?;
            fine.history = self.history_of(&db_tx, AuditTarget::Fine, fine.id).await?;
            Ok(fine)
        })
    }

    /// Fines of a group, newest first.
    pub async fn list_fines(&self, group_id: Uuid) -> ResultEngine<Vec<Fine>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            fines::Entity::find()
                .filter(fines::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(fines::Column::IssuedOn)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Fine::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
