//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. Optional fields are set through
//! builder-style methods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AttendanceStatus, MeetingKind};

/// Create a group together with its first cycle.
#[derive(Clone, Debug)]
pub struct NewGroupCmd {
    pub name: String,
    pub branch: String,
    pub location: String,
    pub share_value: i64,
    pub min_shares: i64,
    pub max_shares: i64,
    pub cycle_start: NaiveDate,
    /// Monthly loan interest (percent) for the first cycle.
    pub interest_rate: f64,
}

impl NewGroupCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, share_value: i64, cycle_start: NaiveDate) -> Self {
        Self {
            name: name.into(),
            branch: String::new(),
            location: String::new(),
            share_value,
            min_shares: 1,
            max_shares: 5,
            cycle_start,
            interest_rate: 0.0,
        }
    }

    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    #[must_use]
    pub fn share_limits(mut self, min_shares: i64, max_shares: i64) -> Self {
        self.min_shares = min_shares;
        self.max_shares = max_shares;
        self
    }

    #[must_use]
    pub fn interest_rate(mut self, interest_rate: f64) -> Self {
        self.interest_rate = interest_rate;
        self
    }
}

/// Audited edit of a group's settings. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateGroupCmd {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub location: Option<String>,
    pub share_value: Option<i64>,
    pub min_shares: Option<i64>,
    pub max_shares: Option<i64>,
}

/// Add a member. Everything but the name may be missing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewMemberCmd {
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub joined_on: Option<NaiveDate>,
}

impl NewMemberCmd {
    #[must_use]
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn national_id(mut self, national_id: impl Into<String>) -> Self {
        self.national_id = Some(national_id.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn joined_on(mut self, joined_on: NaiveDate) -> Self {
        self.joined_on = Some(joined_on);
        self
    }
}

/// Record a share deposit.
#[derive(Clone, Debug)]
pub struct ContributionCmd {
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub share_count: i64,
    pub solidarity_amount: i64,
    pub occurred_on: NaiveDate,
    pub notes: Option<String>,
    pub created_by: String,
}

impl ContributionCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        member_id: Uuid,
        share_count: i64,
        occurred_on: NaiveDate,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            group_id,
            member_id,
            share_count,
            solidarity_amount: 0,
            occurred_on,
            notes: None,
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn solidarity(mut self, amount: i64) -> Self {
        self.solidarity_amount = amount;
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Apply for a loan. Without an explicit rate the current cycle's rate is
/// used; without a start date the loan starts on the application day.
#[derive(Clone, Debug)]
pub struct LoanApplicationCmd {
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub principal: i64,
    pub interest_rate: Option<f64>,
    pub duration_months: u32,
    pub purpose: String,
    pub start_date: Option<NaiveDate>,
}

impl LoanApplicationCmd {
    #[must_use]
    pub fn new(group_id: Uuid, member_id: Uuid, principal: i64, duration_months: u32) -> Self {
        Self {
            group_id,
            member_id,
            principal,
            interest_rate: None,
            duration_months,
            purpose: String::new(),
            start_date: None,
        }
    }

    #[must_use]
    pub fn interest_rate(mut self, rate: f64) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }
}

/// Issue a fine. Without an amount the category default applies.
#[derive(Clone, Debug)]
pub struct NewFineCmd {
    pub group_id: Uuid,
    pub member_id: Uuid,
    pub category_id: Uuid,
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub issued_on: NaiveDate,
}

impl NewFineCmd {
    #[must_use]
    pub fn new(group_id: Uuid, member_id: Uuid, category_id: Uuid, issued_on: NaiveDate) -> Self {
        Self {
            group_id,
            member_id,
            category_id,
            amount: None,
            description: None,
            issued_on,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Audited edit of a fine. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateFineCmd {
    pub amount: Option<i64>,
    pub description: Option<String>,
}

/// Record a group expense.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: Uuid,
    pub amount: i64,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    pub created_by: String,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        amount: i64,
        occurred_on: NaiveDate,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            group_id,
            amount,
            occurred_on,
            description: None,
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One member's line on a meeting sheet.
///
/// Money effects only apply to members who attended (present or late).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeetingEntry {
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

impl MeetingEntry {
    #[must_use]
    pub fn present(member_id: Uuid) -> Self {
        Self {
            member_id,
            attendance: AttendanceStatus::Present,
            shares: 0,
            solidarity: 0,
            loan_repayment: 0,
            fines_paid: 0,
        }
    }

    #[must_use]
    pub fn absent(member_id: Uuid) -> Self {
        Self {
            attendance: AttendanceStatus::Absent,
            ..Self::present(member_id)
        }
    }

    #[must_use]
    pub fn shares(mut self, shares: i64) -> Self {
        self.shares = shares;
        self
    }

    #[must_use]
    pub fn solidarity(mut self, solidarity: i64) -> Self {
        self.solidarity = solidarity;
        self
    }

    #[must_use]
    pub fn loan_repayment(mut self, amount: i64) -> Self {
        self.loan_repayment = amount;
        self
    }

    #[must_use]
    pub fn fines_paid(mut self, amount: i64) -> Self {
        self.fines_paid = amount;
        self
    }

    pub(crate) fn attended(&self) -> bool {
        matches!(
            self.attendance,
            AttendanceStatus::Present | AttendanceStatus::Late
        )
    }
}

/// Submit a whole meeting sheet.
#[derive(Clone, Debug)]
pub struct MeetingCmd {
    pub group_id: Uuid,
    pub held_on: NaiveDate,
    pub kind: MeetingKind,
    pub notes: Option<String>,
    pub entries: Vec<MeetingEntry>,
    pub created_by: String,
}

impl MeetingCmd {
    #[must_use]
    pub fn new(group_id: Uuid, held_on: NaiveDate, created_by: impl Into<String>) -> Self {
        Self {
            group_id,
            held_on,
            kind: MeetingKind::Regular,
            notes: None,
            entries: Vec::new(),
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: MeetingKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn entry(mut self, entry: MeetingEntry) -> Self {
        self.entries.push(entry);
        self
    }
}
