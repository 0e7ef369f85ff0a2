//! Access scoping.
//!
//! A [`Caller`] is who asks; [`Scoped`] wraps the engine so that every call
//! is checked against the caller's groups before it runs. `SUPER_ADMIN` and
//! `ADMIN` reach every group; a `GROUP_LEADER` only the groups it manages.
//!
//! Operations addressed by a record id (a loan, a fine, ...) first resolve
//! the group owning that record, then authorize.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Attendance, AttendanceStatus, AuditEntry, BatchReport, ContributionCmd, Cycle, Engine,
    EngineError, ExpenseCmd, Fine, FineCategory, FinePaymentOutcome, Group, LateFeePolicy,
    LateFeeReport, Loan, LoanApplicationCmd, LoanStatus, Meeting, MeetingCmd, MeetingReport,
    Member, MemberRemoval, MemberStatus, NewFineCmd, NewGroupCmd, NewMemberCmd,
    RepaymentOutcome, ResultEngine, Role, Transaction, TransactionListFilter, UpdateFineCmd,
    UpdateGroupCmd, User,
    reports::{GroupSummary, MemberStatement, PortfolioSummary, Reconciliation, ShareOut},
};

/// A group-owned record addressed by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Group(Uuid),
    Member(Uuid),
    Cycle(Uuid),
    Loan(Uuid),
    Transaction(Uuid),
    Fine(Uuid),
    FineCategory(Uuid),
    Meeting(Uuid),
    Attendance(Uuid),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub username: String,
    pub role: Role,
    pub managed_groups: HashSet<Uuid>,
}

impl Caller {
    pub fn new(username: impl Into<String>, role: Role, managed_groups: HashSet<Uuid>) -> Self {
        Self {
            username: username.into(),
            role,
            managed_groups,
        }
    }

    pub fn can_access(&self, group_id: Uuid) -> bool {
        self.role.is_global() || self.managed_groups.contains(&group_id)
    }

    pub fn authorize(&self, group_id: Uuid) -> ResultEngine<()> {
        if !self.can_access(group_id) {
            return Err(EngineError::Forbidden(format!(
                "{} cannot access group {group_id}",
                self.username
            )));
        }
        Ok(())
    }

    /// Operations reserved to administrators, such as creating groups.
    pub fn require_admin(&self) -> ResultEngine<()> {
        if !self.role.is_global() {
            return Err(EngineError::Forbidden(format!(
                "{} is not an administrator",
                self.username
            )));
        }
        Ok(())
    }

    pub fn require_super_admin(&self) -> ResultEngine<()> {
        if self.role != Role::SuperAdmin {
            return Err(EngineError::Forbidden(format!(
                "{} is not a super administrator",
                self.username
            )));
        }
        Ok(())
    }
}

impl Engine {
    pub fn scoped<'a>(&'a self, caller: &'a Caller) -> Scoped<'a> {
        Scoped {
            engine: self,
            caller,
        }
    }
}

/// The engine as seen by one caller.
#[derive(Clone, Copy, Debug)]
pub struct Scoped<'a> {
    engine: &'a Engine,
    caller: &'a Caller,
}

impl Scoped<'_> {
    async fn authorize(&self, resource: Resource) -> ResultEngine<()> {
        if self.caller.role.is_global() {
            return Ok(());
        }
        let group_id = self.engine.group_of(resource).await?;
        self.caller.authorize(group_id)
    }

    // Groups

    pub async fn create_group(&self, cmd: NewGroupCmd) -> ResultEngine<Group> {
        self.caller.require_admin()?;
        self.engine.create_group(cmd).await
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        cmd: UpdateGroupCmd,
        reason: &str,
    ) -> ResultEngine<Group> {
        self.caller.authorize(group_id)?;
        self.engine
            .update_group(group_id, cmd, &self.caller.username, reason)
            .await
    }

    pub async fn group(&self, group_id: Uuid) -> ResultEngine<Group> {
        self.caller.authorize(group_id)?;
        self.engine.group(group_id).await
    }

    /// Groups visible to the caller.
    pub async fn list_groups(&self) -> ResultEngine<Vec<Group>> {
        let groups = self.engine.list_groups().await?;
        Ok(groups
            .into_iter()
            .filter(|g| self.caller.can_access(g.id))
            .collect())
    }

    pub async fn group_history(&self, group_id: Uuid) -> ResultEngine<Vec<AuditEntry>> {
        self.caller.authorize(group_id)?;
        self.engine.group_history(group_id).await
    }

    pub async fn recompute_group_totals(&self, group_id: Uuid) -> ResultEngine<Reconciliation> {
        self.caller.require_admin()?;
        self.engine.recompute_group_totals(group_id).await
    }

    // Members

    pub async fn add_member(&self, group_id: Uuid, cmd: NewMemberCmd) -> ResultEngine<Member> {
        self.caller.authorize(group_id)?;
        self.engine.add_member(group_id, cmd).await
    }

    pub async fn import_members(
        &self,
        group_id: Uuid,
        rows: Vec<NewMemberCmd>,
    ) -> ResultEngine<BatchReport> {
        self.caller.authorize(group_id)?;
        self.engine.import_members(group_id, rows).await
    }

    pub async fn member(&self, member_id: Uuid) -> ResultEngine<Member> {
        self.authorize(Resource::Member(member_id)).await?;
        self.engine.member(member_id).await
    }

    pub async fn list_members(&self, group_id: Uuid) -> ResultEngine<Vec<Member>> {
        self.caller.authorize(group_id)?;
        self.engine.list_members(group_id).await
    }

    pub async fn set_member_status(
        &self,
        member_id: Uuid,
        status: MemberStatus,
        reason: &str,
    ) -> ResultEngine<Member> {
        self.authorize(Resource::Member(member_id)).await?;
        self.engine
            .set_member_status(member_id, status, &self.caller.username, reason)
            .await
    }

    pub async fn delete_member(&self, member_id: Uuid, reason: &str) -> ResultEngine<MemberRemoval> {
        self.authorize(Resource::Member(member_id)).await?;
        self.engine
            .delete_member(member_id, &self.caller.username, reason)
            .await
    }

    // Cycles

    pub async fn open_cycle(
        &self,
        group_id: Uuid,
        start_date: NaiveDate,
        interest_rate: f64,
    ) -> ResultEngine<Cycle> {
        self.caller.authorize(group_id)?;
        self.engine
            .open_cycle(group_id, start_date, interest_rate)
            .await
    }

    pub async fn close_cycle(&self, group_id: Uuid, end_date: NaiveDate) -> ResultEngine<ShareOut> {
        self.caller.authorize(group_id)?;
        self.engine.close_cycle(group_id, end_date).await
    }

    pub async fn current_cycle(&self, group_id: Uuid) -> ResultEngine<Option<Cycle>> {
        self.caller.authorize(group_id)?;
        self.engine.current_cycle(group_id).await
    }

    pub async fn list_cycles(&self, group_id: Uuid) -> ResultEngine<Vec<Cycle>> {
        self.caller.authorize(group_id)?;
        self.engine.list_cycles(group_id).await
    }

    // Contributions and transactions

    /// Records a deposit on behalf of the caller, who becomes its author.
    pub async fn record_contribution(&self, mut cmd: ContributionCmd) -> ResultEngine<Transaction> {
        self.caller.authorize(cmd.group_id)?;
        cmd.created_by = self.caller.username.clone();
        self.engine.record_contribution(cmd).await
    }

    pub async fn edit_contribution(
        &self,
        transaction_id: Uuid,
        share_count: i64,
        solidarity_amount: i64,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        self.authorize(Resource::Transaction(transaction_id)).await?;
        self.engine
            .edit_contribution(
                transaction_id,
                share_count,
                solidarity_amount,
                &self.caller.username,
                reason,
            )
            .await
    }

    pub async fn void_transaction(
        &self,
        transaction_id: Uuid,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        self.authorize(Resource::Transaction(transaction_id)).await?;
        self.engine
            .void_transaction(transaction_id, &self.caller.username, reason)
            .await
    }

    pub async fn void_contribution(
        &self,
        transaction_id: Uuid,
        reason: &str,
    ) -> ResultEngine<Transaction> {
        self.authorize(Resource::Transaction(transaction_id)).await?;
        self.engine
            .void_contribution(transaction_id, &self.caller.username, reason)
            .await
    }

    pub async fn transaction_detail(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        self.authorize(Resource::Transaction(transaction_id)).await?;
        self.engine.transaction_detail(transaction_id).await
    }

    pub async fn list_transactions_page(
        &self,
        group_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        self.caller.authorize(group_id)?;
        self.engine
            .list_transactions_page(group_id, limit, cursor, filter)
            .await
    }

    // Loans

    pub async fn apply_for_loan(&self, cmd: LoanApplicationCmd) -> ResultEngine<Loan> {
        self.caller.authorize(cmd.group_id)?;
        self.engine.apply_for_loan(cmd).await
    }

    pub async fn update_loan_status(&self, loan_id: Uuid, status: LoanStatus) -> ResultEngine<Loan> {
        self.authorize(Resource::Loan(loan_id)).await?;
        self.engine
            .update_loan_status(loan_id, status, &self.caller.username)
            .await
    }

    pub async fn repay_loan(
        &self,
        loan_id: Uuid,
        amount: i64,
        occurred_on: NaiveDate,
    ) -> ResultEngine<RepaymentOutcome> {
        self.authorize(Resource::Loan(loan_id)).await?;
        self.engine
            .repay_loan(loan_id, amount, occurred_on, &self.caller.username)
            .await
    }

    pub async fn apply_late_fees(
        &self,
        group_id: Uuid,
        policy: LateFeePolicy,
        today: NaiveDate,
    ) -> ResultEngine<LateFeeReport> {
        self.caller.authorize(group_id)?;
        self.engine
            .apply_late_fees(group_id, policy, today, &self.caller.username)
            .await
    }

    pub async fn loan(&self, loan_id: Uuid) -> ResultEngine<(Loan, Vec<AuditEntry>)> {
        self.authorize(Resource::Loan(loan_id)).await?;
        self.engine.loan(loan_id).await
    }

    pub async fn list_loans(
        &self,
        group_id: Uuid,
        status: Option<LoanStatus>,
    ) -> ResultEngine<Vec<Loan>> {
        self.caller.authorize(group_id)?;
        self.engine.list_loans(group_id, status).await
    }

    // Fines

    pub async fn create_fine_category(
        &self,
        group_id: Uuid,
        name: &str,
        default_amount: i64,
    ) -> ResultEngine<FineCategory> {
        self.caller.authorize(group_id)?;
        self.engine
            .create_fine_category(group_id, name, default_amount)
            .await
    }

    pub async fn list_fine_categories(&self, group_id: Uuid) -> ResultEngine<Vec<FineCategory>> {
        self.caller.authorize(group_id)?;
        self.engine.list_fine_categories(group_id).await
    }

    pub async fn create_fine(&self, cmd: NewFineCmd) -> ResultEngine<Fine> {
        self.caller.authorize(cmd.group_id)?;
        self.engine.create_fine(cmd).await
    }

    pub async fn pay_fine(
        &self,
        fine_id: Uuid,
        amount: i64,
        paid_on: NaiveDate,
    ) -> ResultEngine<FinePaymentOutcome> {
        self.authorize(Resource::Fine(fine_id)).await?;
        self.engine
            .pay_fine(fine_id, amount, paid_on, &self.caller.username)
            .await
    }

    pub async fn update_fine(
        &self,
        fine_id: Uuid,
        cmd: UpdateFineCmd,
        reason: &str,
    ) -> ResultEngine<Fine> {
        self.authorize(Resource::Fine(fine_id)).await?;
        self.engine
            .update_fine(fine_id, cmd, &self.caller.username, reason)
            .await
    }

    pub async fn void_fine(&self, fine_id: Uuid, reason: &str) -> ResultEngine<Fine> {
        self.authorize(Resource::Fine(fine_id)).await?;
        self.engine
            .void_fine(fine_id, &self.caller.username, reason)
            .await
    }

    pub async fn fine(&self, fine_id: Uuid) -> ResultEngine<Fine> {
        self.authorize(Resource::Fine(fine_id)).await?;
        self.engine.fine(fine_id).await
    }

    pub async fn list_fines(&self, group_id: Uuid) -> ResultEngine<Vec<Fine>> {
        self.caller.authorize(group_id)?;
        self.engine.list_fines(group_id).await
    }

    // Expenses

    pub async fn record_expense(&self, mut cmd: ExpenseCmd) -> ResultEngine<Transaction> {
        self.caller.authorize(cmd.group_id)?;
        cmd.created_by = self.caller.username.clone();
        self.engine.record_expense(cmd).await
    }

    pub async fn cash_balance(&self, group_id: Uuid) -> ResultEngine<i64> {
        self.caller.authorize(group_id)?;
        self.engine.cash_balance(group_id).await
    }

    // Meetings

    pub async fn submit_meeting(&self, mut cmd: MeetingCmd) -> ResultEngine<MeetingReport> {
        self.caller.authorize(cmd.group_id)?;
        cmd.created_by = self.caller.username.clone();
        self.engine.submit_meeting(cmd).await
    }

    pub async fn correct_attendance(
        &self,
        attendance_id: Uuid,
        status: AttendanceStatus,
        reason: &str,
    ) -> ResultEngine<Attendance> {
        self.authorize(Resource::Attendance(attendance_id)).await?;
        self.engine
            .correct_attendance(attendance_id, status, &self.caller.username, reason)
            .await
    }

    pub async fn meeting(&self, meeting_id: Uuid) -> ResultEngine<(Meeting, Vec<Attendance>)> {
        self.authorize(Resource::Meeting(meeting_id)).await?;
        self.engine.meeting(meeting_id).await
    }

    pub async fn list_meetings(&self, group_id: Uuid) -> ResultEngine<Vec<Meeting>> {
        self.caller.authorize(group_id)?;
        self.engine.list_meetings(group_id).await
    }

    // Reports

    pub async fn group_summary(&self, group_id: Uuid) -> ResultEngine<GroupSummary> {
        self.caller.authorize(group_id)?;
        self.engine.group_summary(group_id).await
    }

    pub async fn member_statement(&self, member_id: Uuid) -> ResultEngine<MemberStatement> {
        self.authorize(Resource::Member(member_id)).await?;
        self.engine.member_statement(member_id).await
    }

    pub async fn portfolio_summary(
        &self,
        group_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<PortfolioSummary> {
        self.caller.authorize(group_id)?;
        self.engine.portfolio_summary(group_id, today).await
    }

    pub async fn share_out_preview(&self, group_id: Uuid) -> ResultEngine<ShareOut> {
        self.caller.authorize(group_id)?;
        self.engine.share_out_preview(group_id).await
    }

    pub async fn reconcile_group(&self, group_id: Uuid) -> ResultEngine<Reconciliation> {
        self.caller.authorize(group_id)?;
        self.engine.reconcile_group(group_id).await
    }

    // Users

    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> ResultEngine<User> {
        self.caller.require_admin()?;
        if role == Role::SuperAdmin {
            self.caller.require_super_admin()?;
        }
        self.engine.create_user(username, password, role).await
    }

    pub async fn grant_group(&self, username: &str, group_id: Uuid) -> ResultEngine<()> {
        self.caller.require_admin()?;
        self.engine.grant_group(username, group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_reach_every_group() {
        let admin = Caller::new("root", Role::Admin, HashSet::new());
        assert!(admin.authorize(Uuid::new_v4()).is_ok());
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_super_admin().is_err());
    }

    #[test]
    fn leaders_are_confined_to_their_groups() {
        let mine = Uuid::new_v4();
        let leader = Caller::new("leader", Role::GroupLeader, HashSet::from([mine]));
        assert!(leader.authorize(mine).is_ok());
        assert!(matches!(
            leader.authorize(Uuid::new_v4()),
            Err(EngineError::Forbidden(_))
        ));
        assert!(leader.require_admin().is_err());
    }
}
