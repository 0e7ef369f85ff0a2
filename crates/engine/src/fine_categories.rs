//! Fine categories, e.g. "late arrival" or "absence", with a default amount.
//!
//! Names are matched through a folded lookup key so that meeting sheets typed
//! with or without accents resolve to the same category.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineCategory {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub default_amount: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fine_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub name_norm: String,
    pub default_amount: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::fines::Entity")]
    Fines,
}

impl Related<super::fines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for FineCategory {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fine category")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            name: model.name,
            default_amount: model.default_amount,
        })
    }
}
