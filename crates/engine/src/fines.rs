//! Member fines.
//!
//! A fine's status follows from how much of it has been paid, except `VOID`
//! which is set explicitly and is terminal.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AuditEntry, EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Void,
}

impl FineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::Void => "VOID",
        }
    }

    /// Status implied by the paid amount.
    pub fn from_payment(amount: i64, paid_amount: i64) -> Self {
        if paid_amount >= amount {
            Self::Paid
        } else if paid_amount > 0 {
            Self::PartiallyPaid
        } else {
            Self::Unpaid
        }
    }
}

impl TryFrom<&str> for FineStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "UNPAID" => Ok(Self::Unpaid),
            "PARTIALLY_PAID" => Ok(Self::PartiallyPaid),
            "PAID" => Ok(Self::Paid),
            "VOID" => Ok(Self::Void),
            other => Err(EngineError::InvalidState(format!(
                "invalid fine status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    pub id: Uuid,
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub category_id: Uuid,
    pub amount: i64,
    pub paid_amount: i64,
    pub status: FineStatus,
    pub description: Option<String>,
    pub issued_on: NaiveDate,
    /// Audit entries, oldest first. Only populated by detail reads.
    pub history: Vec<AuditEntry>,
}

impl Fine {
    pub fn outstanding(&self) -> i64 {
        (self.amount - self.paid_amount).max(0)
    }

    pub fn is_void(&self) -> bool {
        self.status == FineStatus::Void
    }

    /// Recomputes the status from the amounts. Voided fines stay voided.
    pub(crate) fn refresh_status(&mut self) {
        if !self.is_void() {
            self.status = FineStatus::from_payment(self.amount, self.paid_amount);
        }
    }

    /// Applies a payment, returning `(applied, excess)`.
    pub(crate) fn apply_payment(&mut self, amount: i64) -> (i64, i64) {
        let applied = amount.min(self.outstanding());
        self.paid_amount += applied;
        self.refresh_status();
        (applied, amount - applied)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub member_id: String,
    pub cycle_id: Option<String>,
    pub category_id: String,
    pub amount: i64,
    pub paid_amount: i64,
    pub status: String,
    pub description: Option<String>,
    pub issued_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fine_categories::Entity",
        from = "Column::CategoryId",
        to = "super::fine_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
}

impl Related<super::fine_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Fine> for ActiveModel {
    fn from(fine: &Fine) -> Self {
        Self {
            id: ActiveValue::Set(fine.id.to_string()),
            group_id: ActiveValue::Set(fine.group_id.to_string()),
            member_id: ActiveValue::Set(fine.member_id.to_string()),
            cycle_id: ActiveValue::Set(fine.cycle_id.map(|id| id.to_string())),
            category_id: ActiveValue::Set(fine.category_id.to_string()),
            amount: ActiveValue::Set(fine.amount),
            paid_amount: ActiveValue::Set(fine.paid_amount),
            status: ActiveValue::Set(fine.status.as_str().to_string()),
            description: ActiveValue::Set(fine.description.clone()),
            issued_on: ActiveValue::Set(fine.issued_on),
        }
    }
}

impl TryFrom<Model> for Fine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fine")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            member_id: parse_uuid(&model.member_id, "member")?,
            cycle_id: parse_optional_uuid(model.cycle_id.as_deref(), "cycle")?,
            category_id: parse_uuid(&model.category_id, "fine category")?,
            amount: model.amount,
            paid_amount: model.paid_amount,
            status: FineStatus::try_from(model.status.as_str())?,
            description: model.description,
            issued_on: model.issued_on,
            history: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine(amount: i64) -> Fine {
        Fine {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            cycle_id: None,
            category_id: Uuid::new_v4(),
            amount,
            paid_amount: 0,
            status: FineStatus::Unpaid,
            description: None,
            issued_on: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            history: Vec::new(),
        }
    }

    #[test]
    fn status_follows_payment() {
        assert_eq!(FineStatus::from_payment(1000, 0), FineStatus::Unpaid);
        assert_eq!(FineStatus::from_payment(1000, 400), FineStatus::PartiallyPaid);
        assert_eq!(FineStatus::from_payment(1000, 1000), FineStatus::Paid);
        assert_eq!(FineStatus::from_payment(1000, 1200), FineStatus::Paid);
    }

    #[test]
    fn payment_stops_at_outstanding() {
        let mut fine = fine(1000);
        assert_eq!(fine.apply_payment(300), (300, 0));
        assert_eq!(fine.status, FineStatus::PartiallyPaid);
        assert_eq!(fine.apply_payment(1000), (700, 300));
        assert_eq!(fine.status, FineStatus::Paid);
        assert_eq!(fine.outstanding(), 0);
    }

    #[test]
    fn void_is_sticky() {
        let mut fine = fine(1000);
        fine.status = FineStatus::Void;
        fine.amount = 500;
        fine.refresh_status();
        assert_eq!(fine.status, FineStatus::Void);
    }
}
