use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Caller, EngineError, ResultEngine, Role, User, group_managers, users,
    users::{hash_password, verify_password},
    util::parse_uuid,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates an operator account.
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> ResultEngine<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidName(
                "username must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }
        let password_hash = hash_password(password)?;

        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username.to_string()));
            }
            let model = users::ActiveModel::new_user(username, password_hash, role)
                .insert(&db_tx)
                .await?;
            tracing::info!("user {username} created with role {}", role.as_str());
            User::try_from(model)
        })
    }

    /// Lets a group leader manage `group_id`.
    pub async fn grant_group(&self, username: &str, group_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            self.require_group(&db_tx, group_id).await?;
            let key = (username.to_string(), group_id.to_string());
            if group_managers::Entity::find_by_id(key.clone())
                .one(&db_tx)
                .await?
                .is_none()
            {
                group_managers::ActiveModel {
                    user_id: ActiveValue::Set(key.0),
                    group_id: ActiveValue::Set(key.1),
                }
                .insert(&db_tx)
                .await?;
            }
            Ok(())
        })
    }

    pub async fn revoke_group(&self, username: &str, group_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            group_managers::Entity::delete_by_id((username.to_string(), group_id.to_string()))
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Checks credentials. Unknown users and wrong passwords both yield
    /// `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Option<Caller>> {
        with_tx!(self, |db_tx| {
            let Some(model) = users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
            else {
                return Ok(None);
            };
            if !verify_password(password, &model.password_hash) {
                return Ok(None);
            }
            let user = User::try_from(model)?;
            self.caller_in(&db_tx, user).await.map(Some)
        })
    }

    /// The scoping identity of an existing user.
    pub async fn caller(&self, username: &str) -> ResultEngine<Caller> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, username).await?;
            self.caller_in(&db_tx, user).await
        })
    }

    pub async fn list_users(&self) -> ResultEngine<Vec<User>> {
        with_tx!(self, |db_tx| {
            users::Entity::find()
                .order_by_asc(users::Column::Username)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(User::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    async fn require_user(&self, db: &DatabaseTransaction, username: &str) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    async fn caller_in(&self, db: &DatabaseTransaction, user: User) -> ResultEngine<Caller> {
        let managed_groups = group_managers::Entity::find()
            .filter(group_managers::Column::UserId.eq(user.username.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|row| parse_uuid(&row.group_id, "group"))
            .collect::<ResultEngine<_>>()?;
        Ok(Caller::new(user.username, user.role, managed_groups))
    }
}
