//! Savings groups.
//!
//! A `Group` owns every member, loan, transaction, fine and meeting recorded
//! for it. It also carries the cached running totals the ledger keeps up to
//! date on every mutation:
//!
//! - `total_savings`: sum of non-void share deposits
//! - `total_loans_outstanding`: sum of balances of disbursed, unpaid loans
//! - `total_solidarity`: sum of non-void solidarity contributions

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{checked_total, parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub location: String,
    /// Value of one share, in RWF.
    pub share_value: i64,
    pub min_shares: i64,
    pub max_shares: i64,
    pub current_cycle_id: Option<Uuid>,
    pub total_savings: i64,
    pub total_loans_outstanding: i64,
    pub total_solidarity: i64,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Adds (or, with negative values, removes) a deposit's effect.
    pub(crate) fn add_savings(&mut self, amount: i64, solidarity: i64) -> ResultEngine<()> {
        let savings = checked_total(self.total_savings, amount, "group savings")?;
        let solidarity = checked_total(self.total_solidarity, solidarity, "group solidarity")?;
        self.total_savings = savings;
        self.total_solidarity = solidarity;
        Ok(())
    }

    /// Adjusts the outstanding loan portfolio, never going below zero.
    pub(crate) fn add_outstanding(&mut self, delta: i64) -> ResultEngine<()> {
        self.total_loans_outstanding =
            checked_total(self.total_loans_outstanding, delta, "loan portfolio")?.max(0);
        Ok(())
    }

    /// Refuses a deposit outside the group's per-deposit share limits.
    pub(crate) fn require_share_count(&self, share_count: i64) -> ResultEngine<()> {
        if share_count < self.min_shares || share_count > self.max_shares {
            return Err(EngineError::InvalidAmount(format!(
                "share count must be between {} and {}, got {share_count}",
                self.min_shares, self.max_shares
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub branch: String,
    pub location: String,
    pub share_value: i64,
    pub min_shares: i64,
    pub max_shares: i64,
    pub current_cycle_id: Option<String>,
    pub total_savings: i64,
    pub total_loans_outstanding: i64,
    pub total_solidarity: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::members::Entity")]
    Members,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.to_string()),
            name: ActiveValue::Set(group.name.clone()),
            branch: ActiveValue::Set(group.branch.clone()),
            location: ActiveValue::Set(group.location.clone()),
            share_value: ActiveValue::Set(group.share_value),
            min_shares: ActiveValue::Set(group.min_shares),
            max_shares: ActiveValue::Set(group.max_shares),
            current_cycle_id: ActiveValue::Set(group.current_cycle_id.map(|id| id.to_string())),
            total_savings: ActiveValue::Set(group.total_savings),
            total_loans_outstanding: ActiveValue::Set(group.total_loans_outstanding),
            total_solidarity: ActiveValue::Set(group.total_solidarity),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}

impl TryFrom<Model> for Group {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "group")?,
            name: model.name,
            branch: model.branch,
            location: model.location,
            share_value: model.share_value,
            min_shares: model.min_shares,
            max_shares: model.max_shares,
            current_cycle_id: parse_optional_uuid(model.current_cycle_id.as_deref(), "cycle")?,
            total_savings: model.total_savings,
            total_loans_outstanding: model.total_loans_outstanding,
            total_solidarity: model.total_solidarity,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "Twisungane".to_string(),
            branch: "Huye".to_string(),
            location: "Ngoma".to_string(),
            share_value: 500,
            min_shares: 1,
            max_shares: 5,
            current_cycle_id: None,
            total_savings: 0,
            total_loans_outstanding: 0,
            total_solidarity: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outstanding_is_floored_at_zero() {
        let mut group = group();
        group.add_outstanding(1000).unwrap();
        group.add_outstanding(-1500).unwrap();
        assert_eq!(group.total_loans_outstanding, 0);
    }

    #[test]
    fn overflowing_totals_are_refused() {
        let mut group = group();
        group.add_savings(2500, i64::MAX).unwrap();
        assert!(group.add_savings(500, 1).is_err());
        assert_eq!(group.total_savings, 2500);
        assert_eq!(group.total_solidarity, i64::MAX);
    }

    #[test]
    fn share_limits_are_inclusive() {
        let group = group();
        assert!(group.require_share_count(1).is_ok());
        assert!(group.require_share_count(5).is_ok());
        assert!(group.require_share_count(0).is_err());
        assert!(group.require_share_count(6).is_err());
    }

    #[test]
    fn savings_revert_is_symmetric() {
        let mut group = group();
        group.add_savings(2500, 200).unwrap();
        group.add_savings(-2500, -200).unwrap();
        assert_eq!(group.total_savings, 0);
        assert_eq!(group.total_solidarity, 0);
    }
}
