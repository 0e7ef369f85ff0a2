//! Append-only audit trail for privileged edits.
//!
//! Every edit, void or correction of a record appends one `AuditEntry` listing
//! the fields it touched. Entries are never updated or deleted; detail reads
//! attach them to the record, oldest first.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTarget {
    Group,
    Member,
    Transaction,
    Loan,
    Fine,
    Attendance,
}

impl AuditTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Member => "member",
            Self::Transaction => "transaction",
            Self::Loan => "loan",
            Self::Fine => "fine",
            Self::Attendance => "attendance",
        }
    }
}

impl TryFrom<&str> for AuditTarget {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "group" => Ok(Self::Group),
            "member" => Ok(Self::Member),
            "transaction" => Ok(Self::Transaction),
            "loan" => Ok(Self::Loan),
            "fine" => Ok(Self::Fine),
            "attendance" => Ok(Self::Attendance),
            other => Err(EngineError::InvalidState(format!(
                "invalid audit target: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Collects the fields an edit actually changed.
#[derive(Debug, Default)]
pub struct ChangeSet(Vec<FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` only when the rendered values differ.
    pub fn track(&mut self, field: &str, old: impl Display, new: impl Display) -> &mut Self {
        let (old_value, new_value) = (old.to_string(), new.to_string());
        if old_value != new_value {
            self.0.push(FieldChange {
                field: field.to_string(),
                old_value,
                new_value,
            });
        }
        self
    }

    /// Records `field` even when unchanged. Used where the edit itself is the
    /// event, such as voids.
    pub fn always(&mut self, field: &str, old: impl Display, new: impl Display) -> &mut Self {
        self.0.push(FieldChange {
            field: field.to_string(),
            old_value: old.to_string(),
            new_value: new.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<FieldChange> {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub target: AuditTarget,
    pub target_id: Uuid,
    pub editor_id: String,
    pub reason: String,
    pub changes: Vec<FieldChange>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        target: AuditTarget,
        target_id: Uuid,
        editor_id: &str,
        reason: &str,
        changes: ChangeSet,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            target_id,
            editor_id: editor_id.to_string(),
            reason: reason.to_string(),
            changes: changes.into_inner(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub target_kind: String,
    pub target_id: String,
    pub editor_id: String,
    pub reason: String,
    /// JSON array of `FieldChange`.
    pub changes: String,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&AuditEntry> for ActiveModel {
    type Error = EngineError;

    fn try_from(entry: &AuditEntry) -> ResultEngine<Self> {
        let changes = serde_json::to_string(&entry.changes)
            .map_err(|err| EngineError::InvalidState(format!("invalid audit changes: {err}")))?;
        Ok(Self {
            id: ActiveValue::Set(entry.id.to_string()),
            target_kind: ActiveValue::Set(entry.target.as_str().to_string()),
            target_id: ActiveValue::Set(entry.target_id.to_string()),
            editor_id: ActiveValue::Set(entry.editor_id.clone()),
            reason: ActiveValue::Set(entry.reason.clone()),
            changes: ActiveValue::Set(changes),
            recorded_at: ActiveValue::Set(entry.recorded_at),
        })
    }
}

impl TryFrom<Model> for AuditEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let changes = serde_json::from_str(&model.changes)
            .map_err(|err| EngineError::InvalidState(format!("invalid audit changes: {err}")))?;
        Ok(Self {
            id: parse_uuid(&model.id, "audit entry")?,
            target: AuditTarget::try_from(model.target_kind.as_str())?,
            target_id: parse_uuid(&model.target_id, "audit target")?,
            editor_id: model.editor_id,
            reason: model.reason,
            changes,
            recorded_at: model.recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_set_skips_unchanged_fields() {
        let mut changes = ChangeSet::new();
        changes
            .track("share_count", 5, 8)
            .track("solidarity_amount", 200, 200)
            .track("amount", 2500, 4000);
        let changes = changes.into_inner();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "share_count");
        assert_eq!(changes[0].old_value, "5");
        assert_eq!(changes[0].new_value, "8");
        assert_eq!(changes[1].field, "amount");
    }

    #[test]
    fn changes_survive_storage() {
        let mut changes = ChangeSet::new();
        changes.always("is_void", false, true);
        let entry = AuditEntry::new(
            AuditTarget::Transaction,
            Uuid::new_v4(),
            "leader",
            "duplicate entry",
            changes,
        );
        let active = ActiveModel::try_from(&entry).unwrap();
        let model = Model {
            id: active.id.unwrap(),
            target_kind: active.target_kind.unwrap(),
            target_id: active.target_id.unwrap(),
            editor_id: active.editor_id.unwrap(),
            reason: active.reason.unwrap(),
            changes: active.changes.unwrap(),
            recorded_at: active.recorded_at.unwrap(),
        };
        assert_eq!(AuditEntry::try_from(model).unwrap(), entry);
    }
}
