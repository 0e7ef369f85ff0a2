use chrono::NaiveDate;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Fine, Loan, ResultEngine, Transaction, fines, loans,
    reports::{
        self, GroupSummary, MemberStatement, PortfolioSummary, Reconciliation, ShareOut,
    },
    transactions,
};

use super::{Engine, with_tx};

impl Engine {
    pub async fn group_summary(&self, group_id: Uuid) -> ResultEngine<GroupSummary> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            let members = self.members_of_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            let fines = self.fines_of_group(&db_tx, group_id).await?;
            Ok(reports::group_summary(&group, &members, &log, &fines))
        })
    }

    pub async fn member_statement(&self, member_id: Uuid) -> ResultEngine<MemberStatement> {
        with_tx!(self, |db_tx| {
            let member = self.require_member(&db_tx, member_id).await?;
            let id = member_id.to_string();
            let log = transactions::Entity::find()
                .filter(transactions::Column::MemberId.eq(id.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let loans = loans::Entity::find()
                .filter(loans::Column::MemberId.eq(id.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Loan::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let fines = fines::Entity::find()
                .filter(fines::Column::MemberId.eq(id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Fine::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(reports::member_statement(&member, &log, &loans, &fines))
        })
    }

    pub async fn portfolio_summary(
        &self,
        group_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<PortfolioSummary> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let loans = self.loans_of_group(&db_tx, group_id).await?;
            Ok(reports::portfolio_summary(&loans, today))
        })
    }

    /// Share-out the group would get if its open cycle closed now.
    pub async fn share_out_preview(&self, group_id: Uuid) -> ResultEngine<ShareOut> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            let members = self.members_of_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            Ok(reports::share_out(&group, &members, &log, group.current_cycle_id))
        })
    }

    /// Compares cached totals with the figures derived from the ledger.
    /// Read-only; see `recompute_group_totals` for the repair.
    pub async fn reconcile_group(&self, group_id: Uuid) -> ResultEngine<Reconciliation> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            let members = self.members_of_group(&db_tx, group_id).await?;
            let log = self.transactions_of_group(&db_tx, group_id).await?;
            let loans = self.loans_of_group(&db_tx, group_id).await?;
            Ok(reports::reconcile(&group, &members, &log, &loans))
        })
    }
}
