//! Ledger entries.
//!
//! A `Transaction` records one money movement of a group. Entries are never
//! physically deleted: a void flags them and removes their weight from every
//! total, while keeping them visible for audit.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AuditEntry, EngineError, ResultEngine,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    ShareDeposit,
    LoanRepayment,
    FinePayment,
    Expense,
    LoanDisbursement,
    LoanPenalty,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShareDeposit => "SHARE_DEPOSIT",
            Self::LoanRepayment => "LOAN_REPAYMENT",
            Self::FinePayment => "FINE_PAYMENT",
            Self::Expense => "EXPENSE",
            Self::LoanDisbursement => "LOAN_DISBURSEMENT",
            Self::LoanPenalty => "LOAN_PENALTY",
        }
    }

    /// Entries whose effect lives on a loan rather than on the ledger alone.
    pub fn is_loan_entry(self) -> bool {
        matches!(
            self,
            Self::LoanRepayment | Self::LoanDisbursement | Self::LoanPenalty
        )
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SHARE_DEPOSIT" => Ok(Self::ShareDeposit),
            "LOAN_REPAYMENT" => Ok(Self::LoanRepayment),
            "FINE_PAYMENT" => Ok(Self::FinePayment),
            "EXPENSE" => Ok(Self::Expense),
            "LOAN_DISBURSEMENT" => Ok(Self::LoanDisbursement),
            "LOAN_PENALTY" => Ok(Self::LoanPenalty),
            other => Err(EngineError::InvalidState(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Absent for group-level entries such as expenses.
    pub member_id: Option<Uuid>,
    pub cycle_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: i64,
    pub occurred_on: NaiveDate,
    /// Deposits only.
    pub share_count: Option<i64>,
    /// Deposits only.
    pub solidarity_amount: Option<i64>,
    pub description: Option<String>,
    /// Loan or fine the entry belongs to.
    pub reference_id: Option<Uuid>,
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Audit entries, oldest first. Only populated by detail reads.
    pub edit_history: Vec<AuditEntry>,
}

impl Transaction {
    pub fn new(
        group_id: Uuid,
        member_id: Option<Uuid>,
        cycle_id: Option<Uuid>,
        kind: TransactionKind,
        amount: i64,
        occurred_on: NaiveDate,
        created_by: String,
    ) -> ResultEngine<Self> {
        if amount < 0 {
            return Err(EngineError::InvalidAmount("amount must be >= 0".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            member_id,
            cycle_id,
            kind,
            amount,
            occurred_on,
            share_count: None,
            solidarity_amount: None,
            description: None,
            reference_id: None,
            is_void: false,
            void_reason: None,
            voided_by: None,
            voided_at: None,
            created_by,
            created_at: Utc::now(),
            edit_history: Vec::new(),
        })
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    #[must_use]
    pub fn deposit(mut self, share_count: i64, solidarity_amount: i64) -> Self {
        self.share_count = Some(share_count);
        self.solidarity_amount = Some(solidarity_amount);
        self
    }

    /// Amount counted by aggregates: zero once voided.
    pub fn effective_amount(&self) -> i64 {
        if self.is_void { 0 } else { self.amount }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub member_id: Option<String>,
    pub cycle_id: Option<String>,
    pub kind: String,
    pub amount: i64,
    pub occurred_on: Date,
    pub share_count: Option<i64>,
    pub solidarity_amount: Option<i64>,
    pub description: Option<String>,
    pub reference_id: Option<String>,
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTimeUtc>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            group_id: ActiveValue::Set(tx.group_id.to_string()),
            member_id: ActiveValue::Set(tx.member_id.map(|id| id.to_string())),
            cycle_id: ActiveValue::Set(tx.cycle_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount: ActiveValue::Set(tx.amount),
            occurred_on: ActiveValue::Set(tx.occurred_on),
            share_count: ActiveValue::Set(tx.share_count),
            solidarity_amount: ActiveValue::Set(tx.solidarity_amount),
            description: ActiveValue::Set(tx.description.clone()),
            reference_id: ActiveValue::Set(tx.reference_id.map(|id| id.to_string())),
            is_void: ActiveValue::Set(tx.is_void),
            void_reason: ActiveValue::Set(tx.void_reason.clone()),
            voided_by: ActiveValue::Set(tx.voided_by.clone()),
            voided_at: ActiveValue::Set(tx.voided_at),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            member_id: parse_optional_uuid(model.member_id.as_deref(), "member")?,
            cycle_id: parse_optional_uuid(model.cycle_id.as_deref(), "cycle")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            occurred_on: model.occurred_on,
            share_count: model.share_count,
            solidarity_amount: model.solidarity_amount,
            description: model.description,
            reference_id: parse_optional_uuid(model.reference_id.as_deref(), "reference")?,
            is_void: model.is_void,
            void_reason: model.void_reason,
            voided_by: model.voided_by,
            voided_at: model.voided_at,
            created_by: model.created_by,
            created_at: model.created_at,
            edit_history: Vec::new(),
        })
    }
}
