use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuditEntry, AuditTarget, ChangeSet, EngineError, LateFeePolicy, Loan, LoanApplicationCmd,
    LoanStatus, MemberStatus, ResultEngine, Transaction, TransactionKind, loans, transactions,
    util::{normalize_optional_text, require_positive},
};

use super::{BatchFailure, Engine, with_tx};

/// Result of a repayment. Whatever exceeds the balance is returned as
/// `excess` for the caller to refund or redirect.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepaymentOutcome {
    pub loan: Loan,
    pub applied: i64,
    pub excess: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LateFeeReport {
    /// Loans that were charged.
    pub count: usize,
    pub total_fees: i64,
    pub failures: Vec<BatchFailure>,
}

impl Engine {
    /// Files a loan application. Nothing is disbursed until the loan moves
    /// to `ACTIVE`.
    pub async fn apply_for_loan(&self, cmd: LoanApplicationCmd) -> ResultEngine<Loan> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, cmd.group_id).await?;
            let member = self
                .require_member_in_group(&db_tx, cmd.group_id, cmd.member_id)
                .await?;
            if member.status != MemberStatus::Active {
                return Err(EngineError::InvalidState(format!(
                    "member {} is not active",
                    member.full_name
                )));
            }

            let interest_rate = match cmd.interest_rate {
                Some(rate) => rate,
                None => self.require_open_cycle(&db_tx, &group).await?.interest_rate,
            };
            let start_date = cmd.start_date.unwrap_or_else(|| Utc::now().date_naive());
            let loan = Loan::apply(
                group.id,
                member.id,
                cmd.principal,
                interest_rate,
                cmd.duration_months,
                start_date,
                normalize_optional_text(Some(&cmd.purpose)).unwrap_or_default(),
            )?;
            loans::ActiveModel::from(&loan).insert(&db_tx).await?;
            tracing::info!(
                "loan {} requested by {} for {}",
                loan.id,
                member.full_name,
                loan.principal
            );
            Ok(loan)
        })
    }

    /// Moves a loan through its lifecycle.
    ///
    /// Entering `ACTIVE` disburses the loan: the group's outstanding
    /// portfolio and the member's loan total grow by the balance and a
    /// disbursement of the principal is recorded. `CLEARED` is only reachable
    /// at a zero balance.
    pub async fn update_loan_status(
        &self,
        loan_id: Uuid,
        status: LoanStatus,
        editor: &str,
    ) -> ResultEngine<Loan> {
        with_tx!(self, |db_tx| {
            let mut loan = self.require_loan(&db_tx, loan_id).await?;
            let previous = loan.status;
            if !previous.can_transition_to(status) {
                return Err(EngineError::InvalidState(format!(
                    "loan cannot move from {} to {}",
                    previous.as_str(),
                    status.as_str()
                )));
            }
            if status == LoanStatus::Cleared && loan.balance > 0 {
                return Err(EngineError::InvalidState(format!(
                    "loan still owes {}",
                    loan.balance
                )));
            }

            if status == LoanStatus::Active {
                let mut group = self.require_group(&db_tx, loan.group_id).await?;
                let mut member = self.require_member(&db_tx, loan.member_id).await?;
                group.add_outstanding(loan.balance)?;
                member.add_loans(loan.balance)?;

                let disbursement = Transaction::new(
                    group.id,
                    Some(member.id),
                    group.current_cycle_id,
                    TransactionKind::LoanDisbursement,
                    loan.principal,
                    Utc::now().date_naive(),
                    editor.to_string(),
                )?
                .reference(loan.id)
                .description(Some(format!("Loan disbursement to {}", member.full_name)));
                transactions::ActiveModel::from(&disbursement)
                    .insert(&db_tx)
                    .await?;
                self.save_group(&db_tx, &group).await?;
                self.save_member(&db_tx, &member).await?;
            }

            loan.status = status;
            self.save_loan(&db_tx, &loan).await?;

            let mut changes = ChangeSet::new();
            changes.always("status", previous.as_str(), status.as_str());
            let entry = AuditEntry::new(
                AuditTarget::Loan,
                loan.id,
                editor,
                &format!("status changed to {}", status.as_str()),
                changes,
            );
            self.append_audit(&db_tx, &entry).await?;
            Ok(loan)
        })
    }

    pub(super) async fn repay_loan_in(
        &self,
        db: &DatabaseTransaction,
        mut loan: Loan,
        amount: i64,
        occurred_on: NaiveDate,
        created_by: &str,
    ) -> ResultEngine<RepaymentOutcome> {
        require_positive(amount, "repayment")?;
        if !loan.status.is_outstanding() {
            return Err(EngineError::InvalidState(format!(
                "loan is {} and cannot be repaid",
                loan.status.as_str()
            )));
        }

        let mut group = self.require_group(db, loan.group_id).await?;
        let mut member = self.require_member(db, loan.member_id).await?;
        let (applied, excess) = loan.apply_repayment(amount);
        group.add_outstanding(-applied)?;
        member.add_loans(-applied)?;

        let repayment = Transaction::new(
            group.id,
            Some(member.id),
            group.current_cycle_id,
            TransactionKind::LoanRepayment,
            applied,
            occurred_on,
            created_by.to_string(),
        )?
        .reference(loan.id);
        transactions::ActiveModel::from(&repayment).insert(db).await?;
        self.save_loan(db, &loan).await?;
        self.save_group(db, &group).await?;
        self.save_member(db, &member).await?;

        if excess > 0 {
            tracing::info!("repayment on loan {} exceeds balance by {excess}", loan.id);
        }
        Ok(RepaymentOutcome {
            loan,
            applied,
            excess,
        })
    }

    /// Applies a repayment to an `ACTIVE` or `DEFAULTED` loan.
    ///
    /// At most the remaining balance is applied; a loan reaching zero is
    /// `CLEARED`. Overpayment comes back as `excess`.
    pub async fn repay_loan(
        &self,
        loan_id: Uuid,
        amount: i64,
        occurred_on: NaiveDate,
        created_by: &str,
    ) -> ResultEngine<RepaymentOutcome> {
        with_tx!(self, |db_tx| {
            let loan = self.require_loan(&db_tx, loan_id).await?;
            self.repay_loan_in(&db_tx, loan, amount, occurred_on, created_by)
                .await
        })
    }

    /// The member's oldest loan still owing money.
    pub(super) async fn outstanding_loan_of(
        &self,
        db: &DatabaseTransaction,
        member_id: Uuid,
    ) -> ResultEngine<Option<Loan>> {
        loans::Entity::find()
            .filter(loans::Column::MemberId.eq(member_id.to_string()))
            .filter(loans::Column::Status.is_in([
                LoanStatus::Active.as_str(),
                LoanStatus::Defaulted.as_str(),
            ]))
            .order_by_asc(loans::Column::StartDate)
            .one(db)
            .await?
            .map(Loan::try_from)
            .transpose()
    }

    /// Charges a late fee on every `ACTIVE` loan past its due date and marks
    /// it `DEFAULTED`.
    ///
    /// Each loan is charged in its own transaction; a failure is logged and
    /// reported without stopping the run. Defaulted loans are not charged
    /// again, so a second run on the same day charges nothing.
    pub async fn apply_late_fees(
        &self,
        group_id: Uuid,
        policy: LateFeePolicy,
        today: NaiveDate,
        created_by: &str,
    ) -> ResultEngine<LateFeeReport> {
        policy.validate()?;
        let overdue: Vec<Loan> = with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            loans::Entity::find()
                .filter(loans::Column::GroupId.eq(group_id.to_string()))
                .filter(loans::Column::Status.eq(LoanStatus::Active.as_str()))
                .filter(loans::Column::DueDate.lt(today))
                .order_by_asc(loans::Column::DueDate)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Loan::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })?;

        let mut report = LateFeeReport::default();
        for (index, loan) in overdue.into_iter().enumerate() {
            let loan_id = loan.id;
            let outcome = with_tx!(self, |db_tx| {
                self.charge_late_fee(&db_tx, loan, policy, today, created_by)
                    .await
            });
            match outcome {
                Ok(fee) => {
                    report.count += 1;
                    report.total_fees += fee;
                }
                Err(err) => {
                    tracing::warn!("late fee on loan {loan_id} skipped: {err}");
                    report.failures.push(BatchFailure {
                        index,
                        error: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            "late fees for group {group_id}: {} loans charged, {} in total",
            report.count,
            report.total_fees
        );
        Ok(report)
    }

    async fn charge_late_fee(
        &self,
        db: &DatabaseTransaction,
        mut loan: Loan,
        policy: LateFeePolicy,
        today: NaiveDate,
        created_by: &str,
    ) -> ResultEngine<i64> {
        let mut group = self.require_group(db, loan.group_id).await?;
        let mut member = self.require_member(db, loan.member_id).await?;
        let fee = loan.apply_penalty(policy)?;
        group.add_outstanding(fee)?;
        member.add_loans(fee)?;

        let penalty = Transaction::new(
            group.id,
            Some(member.id),
            group.current_cycle_id,
            TransactionKind::LoanPenalty,
            fee,
            today,
            created_by.to_string(),
        )?
        .reference(loan.id)
        .description(Some(format!("Late fee, loan due {}", loan.due_date)));
        transactions::ActiveModel::from(&penalty).insert(db).await?;
        self.save_loan(db, &loan).await?;
        self.save_group(db, &group).await?;
        self.save_member(db, &member).await?;
        Ok(fee)
    }

    /// A loan with its status history.
    pub async fn loan(&self, loan_id: Uuid) -> ResultEngine<(Loan, Vec<AuditEntry>)> {
        with_tx!(self, |db_tx| {
            let loan = self.require_loan(&db_tx, loan_id).await?;
            let history = self.history_of(&db_tx, AuditTarget::Loan, loan.id).await?;
            Ok((loan, history))
        })
    }

    /// Loans of a group, newest first, optionally narrowed to one status.
    pub async fn list_loans(
        &self,
        group_id: Uuid,
        status: Option<LoanStatus>,
    ) -> ResultEngine<Vec<Loan>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let mut query = loans::Entity::find()
                .filter(loans::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(loans::Column::CreatedAt);
            if let Some(status) = status {
                query = query.filter(loans::Column::Status.eq(status.as_str()));
            }
            query
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Loan::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
