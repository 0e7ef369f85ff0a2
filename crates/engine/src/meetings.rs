//! Group meetings.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingKind {
    Regular,
    Special,
}

impl MeetingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::Special => "SPECIAL",
        }
    }
}

impl TryFrom<&str> for MeetingKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "REGULAR" => Ok(Self::Regular),
            "SPECIAL" => Ok(Self::Special),
            other => Err(EngineError::InvalidState(format!(
                "invalid meeting kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub group_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub held_on: NaiveDate,
    pub kind: MeetingKind,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "meetings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub cycle_id: Option<String>,
    pub held_on: Date,
    pub kind: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Meeting> for ActiveModel {
    fn from(meeting: &Meeting) -> Self {
        Self {
            id: ActiveValue::Set(meeting.id.to_string()),
            group_id: ActiveValue::Set(meeting.group_id.to_string()),
            cycle_id: ActiveValue::Set(meeting.cycle_id.map(|id| id.to_string())),
            held_on: ActiveValue::Set(meeting.held_on),
            kind: ActiveValue::Set(meeting.kind.as_str().to_string()),
            notes: ActiveValue::Set(meeting.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Meeting {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "meeting")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            cycle_id: parse_optional_uuid(model.cycle_id.as_deref(), "cycle")?,
            held_on: model.held_on,
            kind: MeetingKind::try_from(model.kind.as_str())?,
            notes: model.notes,
        })
    }
}
