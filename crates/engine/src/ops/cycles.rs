use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Cycle, CycleStatus, EngineError, ResultEngine, cycles,
    reports::{self, ShareOut},
};

use super::{Engine, with_tx};

impl Engine {
    /// Opens a new cycle. A group has at most one open cycle at a time.
    pub async fn open_cycle(
        &self,
        group_id: Uuid,
        start_date: NaiveDate,
        interest_rate: f64,
    ) -> ResultEngine<Cycle> {
        if !interest_rate.is_finite() || interest_rate < 0.0 {
            return Err(EngineError::InvalidAmount(
                "interest rate must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let mut group = self.require_group(&db_tx, group_id).await?;
            let open = cycles::Entity::find()
                .filter(cycles::Column::GroupId.eq(group_id.to_string()))
                .filter(cycles::Column::Status.eq(CycleStatus::Open.as_str()))
                .one(&db_tx)
                .await?;
            if open.is_some() {
                return Err(EngineError::InvalidState(format!(
                    "group {} already has an open cycle",
                    group.name
                )));
            }

            let cycle = Cycle::new(group_id, start_date, interest_rate);
            cycles::ActiveModel::from(&cycle).insert(&db_tx).await?;
            group.current_cycle_id = Some(cycle.id);
            self.save_group(&db_tx, &group).await?;
            tracing::info!("cycle {} opened for group {}", cycle.id, group.name);
            Ok(cycle)
        })
    }

    /// Closes the group's open cycle and returns its share-out.
    ///
    /// Closing is terminal. Deposits are refused until a new cycle opens.
    pub async fn close_cycle(&self, group_id: Uuid, end_date: NaiveDate) -> ResultEngine<ShareOut> {
        with_tx!(self, |db_tx| {
            let mut group = self.require_group(&db_tx, group_id).await?;
            let mut cycle = self.require_open_cycle(&db_tx, &group).await?;
            if end_date < cycle.start_date {
                return Err(EngineError::InvalidState(
                    "cycle cannot end before it starts".to_string(),
                ));
            }

            let members = self.members_of_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            let share_out = reports::share_out(&group, &members, &log, Some(cycle.id));

            cycle.status = CycleStatus::Closed;
            cycle.end_date = Some(end_date);
            self.save_cycle(&db_tx, &cycle).await?;
            group.current_cycle_id = None;
            self.save_group(&db_tx, &group).await?;
            tracing::info!("cycle {} of group {} closed", cycle.id, group.name);
            Ok(share_out)
        })
    }

    /// The open cycle, if any.
    pub async fn current_cycle(&self, group_id: Uuid) -> ResultEngine<Option<Cycle>> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            match group.current_cycle_id {
                Some(id) => self.require_cycle(&db_tx, id).await.map(Some),
                None => Ok(None),
            }
        })
    }

    /// Cycles of a group, newest first.
    pub async fn list_cycles(&self, group_id: Uuid) -> ResultEngine<Vec<Cycle>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            cycles::Entity::find()
                .filter(cycles::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(cycles::Column::StartDate)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Cycle::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
