//! Group members.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{checked_total, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Suspended,
    Exited,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Exited => "EXITED",
        }
    }
}

impl TryFrom<&str> for MemberStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            "EXITED" => Ok(Self::Exited),
            other => Err(EngineError::InvalidState(format!(
                "invalid member status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub group_id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub status: MemberStatus,
    /// Number of shares bought through non-void deposits.
    pub total_shares: i64,
    /// Outstanding balance over the member's disbursed loans.
    pub total_loans: i64,
    pub joined_on: NaiveDate,
}

impl Member {
    pub(crate) fn add_shares(&mut self, delta: i64) {
        self.total_shares += delta;
    }

    /// Adjusts the member's outstanding loans, never going below zero.
    pub(crate) fn add_loans(&mut self, delta: i64) -> ResultEngine<()> {
        self.total_loans = checked_total(self.total_loans, delta, "member loans")?.max(0);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub status: String,
    pub total_shares: i64,
    pub total_loans: i64,
    pub joined_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Member> for ActiveModel {
    fn from(member: &Member) -> Self {
        Self {
            id: ActiveValue::Set(member.id.to_string()),
            group_id: ActiveValue::Set(member.group_id.to_string()),
            full_name: ActiveValue::Set(member.full_name.clone()),
            national_id: ActiveValue::Set(member.national_id.clone()),
            phone: ActiveValue::Set(member.phone.clone()),
            status: ActiveValue::Set(member.status.as_str().to_string()),
            total_shares: ActiveValue::Set(member.total_shares),
            total_loans: ActiveValue::Set(member.total_loans),
            joined_on: ActiveValue::Set(member.joined_on),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "member")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            full_name: model.full_name,
            national_id: model.national_id,
            phone: model.phone,
            status: MemberStatus::try_from(model.status.as_str())?,
            total_shares: model.total_shares,
            total_loans: model.total_loans,
            joined_on: model.joined_on,
        })
    }
}
