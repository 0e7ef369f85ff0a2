//! Ledger engine for group savings and loan associations.
//!
//! Groups collect share deposits from their members during a savings cycle,
//! lend the pooled money back as flat-interest loans, levy fines and spend
//! on expenses. Every movement of money is a [`Transaction`] in an
//! append-only log; groups and members also carry cached totals that the
//! engine keeps in step with the log inside the same database transaction.
//!
//! Corrections never rewrite history: transactions are voided, and edits to
//! groups, members, fines, loans and attendance leave an [`AuditEntry`].

pub use attendance::{Attendance, AttendanceStatus};
pub use audit::{AuditEntry, AuditTarget, ChangeSet, FieldChange};
pub use commands::{
    ContributionCmd, ExpenseCmd, LoanApplicationCmd, MeetingCmd, MeetingEntry, NewFineCmd,
    NewGroupCmd, NewMemberCmd, UpdateFineCmd, UpdateGroupCmd,
};
pub use cycles::{Cycle, CycleStatus};
pub use error::EngineError;
pub use fine_categories::FineCategory;
pub use fines::{Fine, FineStatus};
pub use groups::Group;
pub use loans::{DAYS_PER_MONTH, LateFeePolicy, Loan, LoanStatus, due_date, flat_interest};
pub use meetings::{Meeting, MeetingKind};
pub use members::{Member, MemberStatus};
pub use money::Money;
pub use ops::{
    BatchFailure, BatchReport, Engine, EngineBuilder, EntryFailure, FinePaymentOutcome,
    LateFeeReport, MeetingReport, MemberRemoval, RepaymentOutcome, TransactionListFilter,
};
pub use scope::{Caller, Resource, Scoped};
pub use transactions::{Transaction, TransactionKind};
pub use users::{Role, User};

mod attendance;
mod audit;
mod commands;
mod cycles;
mod error;
mod fine_categories;
mod fines;
mod group_managers;
mod groups;
mod loans;
mod meetings;
mod members;
mod money;
mod ops;
pub mod reports;
mod scope;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
