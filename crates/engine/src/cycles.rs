//! Cycles ("seasons"): the bounded period over which deposits accumulate
//! before a share-out.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Open,
    Closed,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl TryFrom<&str> for CycleStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            other => Err(EngineError::InvalidState(format!(
                "invalid cycle status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub group_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: CycleStatus,
    /// Default monthly interest rate (percent) for loans in this cycle.
    pub interest_rate: f64,
}

impl Cycle {
    pub fn new(group_id: Uuid, start_date: NaiveDate, interest_rate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            start_date,
            end_date: None,
            status: CycleStatus::Open,
            interest_rate,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == CycleStatus::Open
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cycles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: String,
    pub interest_rate: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Cycle> for ActiveModel {
    fn from(cycle: &Cycle) -> Self {
        Self {
            id: ActiveValue::Set(cycle.id.to_string()),
            group_id: ActiveValue::Set(cycle.group_id.to_string()),
            start_date: ActiveValue::Set(cycle.start_date),
            end_date: ActiveValue::Set(cycle.end_date),
            status: ActiveValue::Set(cycle.status.as_str().to_string()),
            interest_rate: ActiveValue::Set(cycle.interest_rate),
        }
    }
}

impl TryFrom<Model> for Cycle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "cycle")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            start_date: model.start_date,
            end_date: model.end_date,
            status: CycleStatus::try_from(model.status.as_str())?,
            interest_rate: model.interest_rate,
        })
    }
}
