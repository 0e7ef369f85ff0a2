use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response body for endpoints that create a record.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

/// Request body for operations that only need a justification.
#[derive(Debug, Serialize, Deserialize)]
pub struct Reason {
    pub reason: String,
}

pub mod user {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum Role {
        SuperAdmin,
        Admin,
        GroupLeader,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub username: String,
        pub password: String,
        pub role: Role,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupGrant {
        pub group_id: Uuid,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        /// Price of one share, in RWF.
        pub share_value: i64,
        /// Start of the first savings cycle.
        pub cycle_start: NaiveDate,
        pub branch: Option<String>,
        pub location: Option<String>,
        pub min_shares: Option<i64>,
        pub max_shares: Option<i64>,
        /// Monthly loan interest of the first cycle, in percent.
        pub interest_rate: Option<f64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        pub branch: Option<String>,
        pub location: Option<String>,
        pub share_value: Option<i64>,
        pub min_shares: Option<i64>,
        pub max_shares: Option<i64>,
        pub reason: String,
    }
}

pub mod member {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum MemberStatus {
        Active,
        Suspended,
        Exited,
    }

    /// A member row. Only the name is required; imports may leave anything
    /// else out.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MemberNew {
        pub full_name: Option<String>,
        pub national_id: Option<String>,
        pub phone: Option<String>,
        pub joined_on: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberImport {
        pub members: Vec<MemberNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberStatusUpdate {
        pub status: MemberStatus,
        pub reason: String,
    }

    /// Response body for a member removal.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "outcome", rename_all = "snake_case")]
    pub enum MemberRemoved {
        /// The member had ledger history and was marked `EXITED`.
        Exited { id: Uuid },
        Deleted,
    }
}

pub mod cycle {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CycleOpen {
        pub start_date: NaiveDate,
        pub interest_rate: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CycleClose {
        pub end_date: NaiveDate,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum TransactionKind {
        ShareDeposit,
        LoanDisbursement,
        LoanRepayment,
        LoanPenalty,
        FinePayment,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionNew {
        pub member_id: Uuid,
        pub shares: i64,
        #[serde(default)]
        pub solidarity: i64,
        pub occurred_on: NaiveDate,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionEdit {
        pub shares: i64,
        #[serde(default)]
        pub solidarity: i64,
        pub reason: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub amount: i64,
        pub occurred_on: NaiveDate,
        pub description: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        /// Page size (default: 50).
        pub limit: Option<u64>,
        /// Opaque cursor returned by the previous page.
        pub cursor: Option<String>,
        /// Inclusive business date bounds.
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub kinds: Option<Vec<TransactionKind>>,
        pub member_id: Option<Uuid>,
        pub include_voided: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount: i64,
        pub occurred_on: NaiveDate,
        pub member_id: Option<Uuid>,
        pub share_count: Option<i64>,
        pub solidarity_amount: Option<i64>,
        pub description: Option<String>,
        pub reference_id: Option<Uuid>,
        pub is_void: bool,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub next_cursor: Option<String>,
    }
}

pub mod loan {
    use super::*;

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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanApply {
        pub member_id: Uuid,
        pub principal: i64,
        pub duration_months: u32,
        /// Defaults to the rate of the open cycle.
        pub interest_rate: Option<f64>,
        pub purpose: Option<String>,
        pub start_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanStatusUpdate {
        pub status: LoanStatus,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoanListQuery {
        pub status: Option<LoanStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanRepay {
        pub amount: i64,
        pub occurred_on: NaiveDate,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", content = "value", rename_all = "snake_case")]
    pub enum LateFeePolicy {
        Fixed(i64),
        Percentage(f64),
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LateFees {
        pub policy: LateFeePolicy,
        /// Run date (default: today).
        pub today: Option<NaiveDate>,
    }
}

pub mod fine {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FineCategoryNew {
        pub name: String,
        pub default_amount: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FineNew {
        pub member_id: Uuid,
        pub category_id: Uuid,
        /// Defaults to the category amount.
        pub amount: Option<i64>,
        pub description: Option<String>,
        pub issued_on: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FinePay {
        pub amount: i64,
        pub paid_on: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FineUpdate {
        pub amount: Option<i64>,
        pub description: Option<String>,
        pub reason: String,
    }
}

pub mod meeting {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum MeetingKind {
        #[default]
        Regular,
        Special,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum AttendanceStatus {
        Present,
        Absent,
        Late,
        Excused,
    }

    /// One line of a meeting sheet. Money columns default to zero.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MeetingEntryNew {
        pub member_id: Uuid,
        pub attendance: AttendanceStatus,
        #[serde(default)]
        pub shares: i64,
        #[serde(default)]
        pub solidarity: i64,
        #[serde(default)]
        pub loan_repayment: i64,
        #[serde(default)]
        pub fines_paid: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MeetingNew {
        pub held_on: NaiveDate,
        #[serde(default)]
        pub kind: MeetingKind,
        pub notes: Option<String>,
        pub entries: Vec<MeetingEntryNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AttendanceCorrection {
        pub status: AttendanceStatus,
        pub reason: String,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PortfolioQuery {
        /// Reference date for overdue loans (default: today).
        pub today: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CashBalance {
        pub group_id: Uuid,
        pub cash_balance: i64,
    }
}
