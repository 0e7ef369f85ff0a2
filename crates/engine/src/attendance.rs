//! Meeting attendance, one row per member and meeting.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuditEntry, EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::Late => "LATE",
            Self::Excused => "EXCUSED",
        }
    }
}

impl TryFrom<&str> for AttendanceStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PRESENT" => Ok(Self::Present),
            "ABSENT" => Ok(Self::Absent),
            "LATE" => Ok(Self::Late),
            "EXCUSED" => Ok(Self::Excused),
            other => Err(EngineError::InvalidState(format!(
                "invalid attendance status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub status: AttendanceStatus,
    /// Corrections, oldest first. Only populated by detail reads.
    pub history: Vec<AuditEntry>,
}

impl Attendance {
    pub fn new(meeting_id: Uuid, group_id: Uuid, member_id: Uuid, status: AttendanceStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            meeting_id,
            group_id,
            member_id,
            status,
            history: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub meeting_id: String,
    pub group_id: String,
    pub member_id: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meetings::Entity",
        from = "Column::MeetingId",
        to = "super::meetings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Meeting,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meeting.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Attendance> for ActiveModel {
    fn from(row: &Attendance) -> Self {
        Self {
            id: ActiveValue::Set(row.id.to_string()),
            meeting_id: ActiveValue::Set(row.meeting_id.to_string()),
            group_id: ActiveValue::Set(row.group_id.to_string()),
            member_id: ActiveValue::Set(row.member_id.to_string()),
            status: ActiveValue::Set(row.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Attendance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "attendance")?,
            meeting_id: parse_uuid(&model.meeting_id, "meeting")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            member_id: parse_uuid(&model.member_id, "member")?,
            status: AttendanceStatus::try_from(model.status.as_str())?,
            history: Vec::new(),
        })
    }
}
