//! Member loans.
//!
//! Interest is simple and flat: `principal × rate/100 × months`, added once at
//! application time. A month is counted as 30 days when computing the due
//! date.
//!
//! Lifecycle:
//!
//! ```text
//! PENDING ──► APPROVED ──► ACTIVE ──► CLEARED
//!    │           │           │
//!    └──► REJECTED ◄─┘       └──► DEFAULTED ──► CLEARED
//! ```
//!
//! Only the move into `ACTIVE` disburses money; repayments and late fees
//! drive the later states.

use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{checked_total, parse_uuid},
};

/// Length of a loan month, in days.
pub const DAYS_PER_MONTH: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    Cleared,
    Rejected,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Active => "ACTIVE",
            Self::Cleared => "CLEARED",
            Self::Rejected => "REJECTED",
            Self::Defaulted => "DEFAULTED",
        }
    }

    /// Loans whose balance counts toward the outstanding portfolio.
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Active | Self::Defaulted)
    }

    /// Whether `self → next` is an allowed status change. Moves into
    /// `CLEARED` are additionally gated on a zero balance by the caller.
    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Active | Rejected)
                | (Approved, Active | Rejected)
                | (Active, Defaulted | Cleared)
                | (Defaulted, Cleared)
        )
    }
}

impl TryFrom<&str> for LoanStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "ACTIVE" => Ok(Self::Active),
            "CLEARED" => Ok(Self::Cleared),
            "REJECTED" => Ok(Self::Rejected),
            "DEFAULTED" => Ok(Self::Defaulted),
            other => Err(EngineError::InvalidState(format!(
                "invalid loan status: {other}"
            ))),
        }
    }
}

/// Late fee charged on overdue loans.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LateFeePolicy {
    /// A flat amount in RWF.
    Fixed(i64),
    /// A percentage of the remaining balance.
    Percentage(f64),
}

impl LateFeePolicy {
    pub fn fee_for(self, balance: i64) -> i64 {
        match self {
            Self::Fixed(amount) => amount,
            Self::Percentage(percent) => (balance as f64 * percent / 100.0).round() as i64,
        }
    }

    pub(crate) fn validate(self) -> ResultEngine<()> {
        let valid = match self {
            Self::Fixed(amount) => amount > 0,
            Self::Percentage(percent) => percent.is_finite() && percent > 0.0,
        };
        if !valid {
            return Err(EngineError::InvalidAmount(
                "late fee must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flat interest owed over the whole loan duration.
pub fn flat_interest(principal: i64, rate_per_month: f64, duration_months: u32) -> i64 {
    (principal as f64 * rate_per_month / 100.0 * f64::from(duration_months)).round() as i64
}

/// Due date of a loan starting on `start` and lasting `duration_months`.
pub fn due_date(start: NaiveDate, duration_months: u32) -> ResultEngine<NaiveDate> {
    start
        .checked_add_days(Days::new(u64::from(duration_months) * DAYS_PER_MONTH))
        .ok_or_else(|| EngineError::InvalidAmount("loan duration too long".to_string()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub principal: i64,
    /// Monthly interest rate, in percent.
    pub interest_rate: f64,
    pub duration_months: u32,
    pub total_repayable: i64,
    pub balance: i64,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Builds a pending loan application.
    pub fn apply(
        group_id: Uuid,
        member_id: Uuid,
        principal: i64,
        interest_rate: f64,
        duration_months: u32,
        start_date: NaiveDate,
        purpose: String,
    ) -> ResultEngine<Self> {
        if principal <= 0 {
            return Err(EngineError::InvalidAmount(
                "loan amount must be > 0".to_string(),
            ));
        }
        if !interest_rate.is_finite() || interest_rate < 0.0 {
            return Err(EngineError::InvalidAmount(
                "interest rate must be >= 0".to_string(),
            ));
        }
        if duration_months == 0 {
            return Err(EngineError::InvalidAmount(
                "loan duration must be at least one month".to_string(),
            ));
        }

        let total_repayable = checked_total(
            principal,
            flat_interest(principal, interest_rate, duration_months),
            "amount repayable",
        )?;
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            member_id,
            principal,
            interest_rate,
            duration_months,
            total_repayable,
            balance: total_repayable,
            status: LoanStatus::Pending,
            start_date,
            due_date: due_date(start_date, duration_months)?,
            purpose,
            created_at: Utc::now(),
        })
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.balance > 0
    }

    /// Applies a repayment, returning `(applied, excess)`.
    ///
    /// The balance never goes below zero: whatever exceeds it is reported as
    /// `excess` and left for the caller to handle.
    pub(crate) fn apply_repayment(&mut self, amount: i64) -> (i64, i64) {
        let applied = amount.min(self.balance);
        self.balance -= applied;
        if self.balance == 0 {
            self.status = LoanStatus::Cleared;
        }
        (applied, amount - applied)
    }

    /// Adds a late fee to the loan and marks it defaulted. Returns the fee.
    pub(crate) fn apply_penalty(&mut self, policy: LateFeePolicy) -> ResultEngine<i64> {
        let fee = policy.fee_for(self.balance);
        let balance = checked_total(self.balance, fee, "loan balance")?;
        let total_repayable = checked_total(self.total_repayable, fee, "amount repayable")?;
        self.balance = balance;
        self.total_repayable = total_repayable;
        self.status = LoanStatus::Defaulted;
        Ok(fee)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub member_id: String,
    pub principal: i64,
    pub interest_rate: f64,
    pub duration_months: i32,
    pub total_repayable: i64,
    pub balance: i64,
    pub status: String,
    pub start_date: Date,
    pub due_date: Date,
    pub purpose: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Loan> for ActiveModel {
    fn from(loan: &Loan) -> Self {
        Self {
            id: ActiveValue::Set(loan.id.to_string()),
            group_id: ActiveValue::Set(loan.group_id.to_string()),
            member_id: ActiveValue::Set(loan.member_id.to_string()),
            principal: ActiveValue::Set(loan.principal),
            interest_rate: ActiveValue::Set(loan.interest_rate),
            duration_months: ActiveValue::Set(i32::try_from(loan.duration_months).unwrap_or(i32::MAX)),
            total_repayable: ActiveValue::Set(loan.total_repayable),
            balance: ActiveValue::Set(loan.balance),
            status: ActiveValue::Set(loan.status.as_str().to_string()),
            start_date: ActiveValue::Set(loan.start_date),
            due_date: ActiveValue::Set(loan.due_date),
            purpose: ActiveValue::Set(loan.purpose.clone()),
            created_at: ActiveValue::Set(loan.created_at),
        }
    }
}

impl TryFrom<Model> for Loan {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "loan")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            member_id: parse_uuid(&model.member_id, "member")?,
            principal: model.principal,
            interest_rate: model.interest_rate,
            duration_months: u32::try_from(model.duration_months).map_err(|_| {
                EngineError::InvalidState("invalid stored loan duration".to_string())
            })?,
            total_repayable: model.total_repayable,
            balance: model.balance,
            status: LoanStatus::try_from(model.status.as_str())?,
            start_date: model.start_date,
            due_date: model.due_date,
            purpose: model.purpose,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending(amount: i64, rate: f64, months: u32) -> Loan {
        Loan::apply(
            Uuid::new_v4(),
            Uuid::new_v4(),
            amount,
            rate,
            months,
            date(2026, 1, 1),
            "seeds".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn flat_interest_is_not_compounded() {
        let loan = pending(50_000, 5.0, 3);
        assert_eq!(loan.total_repayable, 57_500);
        assert_eq!(loan.balance, 57_500);
        assert_eq!(loan.status, LoanStatus::Pending);
    }

    #[test]
    fn oversized_loans_are_refused() {
        let err = Loan::apply(
            Uuid::new_v4(),
            Uuid::new_v4(),
            i64::MAX,
            5.0,
            12,
            date(2026, 1, 1),
            String::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn due_date_counts_thirty_day_months() {
        let loan = pending(10_000, 2.0, 2);
        assert_eq!(loan.due_date, date(2026, 3, 2));
    }

    #[test]
    fn repayment_reports_overpayment() {
        let mut loan = pending(1000, 0.0, 1);
        loan.status = LoanStatus::Active;
        assert_eq!(loan.apply_repayment(400), (400, 0));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.apply_repayment(900), (600, 300));
        assert_eq!(loan.balance, 0);
        assert_eq!(loan.status, LoanStatus::Cleared);
    }

    #[test]
    fn penalty_grows_balance_and_repayable() {
        let mut loan = pending(10_000, 0.0, 1);
        loan.status = LoanStatus::Active;
        loan.apply_repayment(2_000);
        let fee = loan.apply_penalty(LateFeePolicy::Percentage(10.0)).unwrap();
        assert_eq!(fee, 800);
        assert_eq!(loan.balance, 8_800);
        assert_eq!(loan.total_repayable, 10_800);
        assert_eq!(loan.status, LoanStatus::Defaulted);

        let fee = loan.apply_penalty(LateFeePolicy::Fixed(500)).unwrap();
        assert_eq!(fee, 500);
        assert_eq!(loan.balance, 9_300);

        assert!(loan.apply_penalty(LateFeePolicy::Fixed(i64::MAX)).is_err());
        assert_eq!(loan.balance, 9_300);
        assert_eq!(loan.status, LoanStatus::Defaulted);
    }

    #[test]
    fn transition_table() {
        assert!(LoanStatus::Pending.can_transition_to(LoanStatus::Active));
        assert!(LoanStatus::Approved.can_transition_to(LoanStatus::Active));
        assert!(LoanStatus::Active.can_transition_to(LoanStatus::Defaulted));
        assert!(!LoanStatus::Active.can_transition_to(LoanStatus::Active));
        assert!(!LoanStatus::Cleared.can_transition_to(LoanStatus::Active));
        assert!(!LoanStatus::Rejected.can_transition_to(LoanStatus::Approved));
        assert!(!LoanStatus::Defaulted.can_transition_to(LoanStatus::Active));
    }

    #[test]
    fn rejects_bad_applications() {
        let start = date(2026, 1, 1);
        let group = Uuid::new_v4();
        let member = Uuid::new_v4();
        assert!(Loan::apply(group, member, 0, 5.0, 3, start, String::new()).is_err());
        assert!(Loan::apply(group, member, 100, -1.0, 3, start, String::new()).is_err());
        assert!(Loan::apply(group, member, 100, 5.0, 0, start, String::new()).is_err());
    }
}
