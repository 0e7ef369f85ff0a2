//! Read-side aggregates.
//!
//! Everything here is a pure function over records already loaded from the
//! store. Voided transactions weigh zero in every figure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Fine, Group, Loan, LoanStatus, Member, Transaction, TransactionKind};

/// Share of the cycle's share value distributed as estimated profit.
pub const SHARE_OUT_PROFIT_PERCENT: i64 = 10;

fn sum_kind(transactions: &[Transaction], kind: TransactionKind) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.kind == kind)
        .map(Transaction::effective_amount)
        .sum()
}

/// Cash the group is assumed to hold.
///
/// `deposits + fine payments - expenses - disbursed principal`. Repayments and
/// penalties are deliberately left out; expense validation relies on this
/// exact figure.
pub fn cash_balance(transactions: &[Transaction]) -> i64 {
    sum_kind(transactions, TransactionKind::ShareDeposit)
        + sum_kind(transactions, TransactionKind::FinePayment)
        - sum_kind(transactions, TransactionKind::Expense)
        - sum_kind(transactions, TransactionKind::LoanDisbursement)
}

/// Per-kind sums over the non-void part of a transaction log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub deposits: i64,
    pub solidarity: i64,
    pub fines_collected: i64,
    pub expenses: i64,
    pub disbursed: i64,
    pub repaid: i64,
    pub penalties: i64,
    pub cash_balance: i64,
}

impl LedgerTotals {
    pub fn from_log(transactions: &[Transaction]) -> Self {
        let solidarity = transactions
            .iter()
            .filter(|tx| tx.kind == TransactionKind::ShareDeposit && !tx.is_void)
            .filter_map(|tx| tx.solidarity_amount)
            .sum();
        Self {
            deposits: sum_kind(transactions, TransactionKind::ShareDeposit),
            solidarity,
            fines_collected: sum_kind(transactions, TransactionKind::FinePayment),
            expenses: sum_kind(transactions, TransactionKind::Expense),
            disbursed: sum_kind(transactions, TransactionKind::LoanDisbursement),
            repaid: sum_kind(transactions, TransactionKind::LoanRepayment),
            penalties: sum_kind(transactions, TransactionKind::LoanPenalty),
            cash_balance: cash_balance(transactions),
        }
    }
}

/// Shares a member bought through non-void deposits.
pub fn member_shares(transactions: &[Transaction], member_id: Uuid) -> i64 {
    transactions
        .iter()
        .filter(|tx| {
            tx.kind == TransactionKind::ShareDeposit
                && !tx.is_void
                && tx.member_id == Some(member_id)
        })
        .filter_map(|tx| tx.share_count)
        .sum()
}

/// Balance still owed on disbursed loans.
pub fn outstanding_balance<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> i64 {
    loans
        .into_iter()
        .filter(|loan| loan.status.is_outstanding())
        .map(|loan| loan.balance)
        .sum()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberPayout {
    pub member_id: Uuid,
    pub full_name: String,
    pub shares: i64,
    pub invested: i64,
    pub profit: i64,
    pub payout: i64,
}

/// End-of-cycle distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareOut {
    pub group_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub share_value: i64,
    pub total_shares: i64,
    pub total_shares_value: i64,
    pub estimated_profit: i64,
    pub value_per_share: f64,
    pub payouts: Vec<MemberPayout>,
}

/// Shares a member bought through non-void deposits of one cycle.
pub fn member_shares_in_cycle(
    transactions: &[Transaction],
    member_id: Uuid,
    cycle_id: Uuid,
) -> i64 {
    transactions
        .iter()
        .filter(|tx| {
            tx.kind == TransactionKind::ShareDeposit
                && !tx.is_void
                && tx.member_id == Some(member_id)
                && tx.cycle_id == Some(cycle_id)
        })
        .filter_map(|tx| tx.share_count)
        .sum()
}

/// Computes the share-out of one cycle from the deposits made in it.
///
/// Profit is estimated as a fixed percentage of the shares' value and split
/// pro rata over shares. Members without shares in the cycle are left out;
/// without a cycle nothing is distributed.
pub fn share_out(
    group: &Group,
    members: &[Member],
    transactions: &[Transaction],
    cycle_id: Option<Uuid>,
) -> ShareOut {
    let holdings: Vec<(&Member, i64)> = members
        .iter()
        .map(|member| {
            let shares = cycle_id
                .map(|cycle| member_shares_in_cycle(transactions, member.id, cycle))
                .unwrap_or_default();
            (member, shares.max(0))
        })
        .collect();

    let total_shares: i64 = holdings.iter().map(|(_, shares)| shares).sum();
    let total_shares_value = total_shares.saturating_mul(group.share_value);
    // Never larger than the shares' value, so the narrowing cannot truncate.
    let estimated_profit =
        (i128::from(total_shares_value) * i128::from(SHARE_OUT_PROFIT_PERCENT) / 100) as i64;

    let value_per_share = if total_shares > 0 {
        group.share_value as f64 + estimated_profit as f64 / total_shares as f64
    } else {
        group.share_value as f64
    };

    let payouts = holdings
        .into_iter()
        .filter(|(_, shares)| *shares > 0)
        .map(|(member, shares)| {
            let invested = shares.saturating_mul(group.share_value);
            let profit =
                (estimated_profit as f64 * shares as f64 / total_shares as f64).round() as i64;
            MemberPayout {
                member_id: member.id,
                full_name: member.full_name.clone(),
                shares,
                invested,
                profit,
                payout: invested.saturating_add(profit),
            }
        })
        .collect();

    ShareOut {
        group_id: group.id,
        cycle_id,
        share_value: group.share_value,
        total_shares,
        total_shares_value,
        estimated_profit,
        value_per_share,
        payouts,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: Group,
    pub member_count: usize,
    pub active_members: usize,
    pub ledger: LedgerTotals,
    pub open_fines: usize,
    pub fines_outstanding: i64,
}

pub fn group_summary(
    group: &Group,
    members: &[Member],
    transactions: &[Transaction],
    fines: &[Fine],
) -> GroupSummary {
    let open: Vec<&Fine> = fines
        .iter()
        .filter(|f| !f.is_void() && f.outstanding() > 0)
        .collect();
    GroupSummary {
        group: group.clone(),
        member_count: members.len(),
        active_members: members
            .iter()
            .filter(|m| m.status == crate::MemberStatus::Active)
            .count(),
        ledger: LedgerTotals::from_log(transactions),
        open_fines: open.len(),
        fines_outstanding: open.iter().map(|f| f.outstanding()).sum(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberStatement {
    pub member: Member,
    pub shares: i64,
    pub deposited: i64,
    pub solidarity: i64,
    pub loans: Vec<Loan>,
    pub loans_outstanding: i64,
    pub fines: Vec<Fine>,
    pub fines_outstanding: i64,
    pub transactions: Vec<Transaction>,
}

/// Statement of one member. Inputs may cover the whole group; they are
/// filtered to the member here.
pub fn member_statement(
    member: &Member,
    transactions: &[Transaction],
    loans: &[Loan],
    fines: &[Fine],
) -> MemberStatement {
    let own: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| tx.member_id == Some(member.id))
        .cloned()
        .collect();
    let deposits = own
        .iter()
        .filter(|tx| tx.kind == TransactionKind::ShareDeposit && !tx.is_void);
    let deposited = deposits.clone().map(|tx| tx.amount).sum();
    let solidarity = deposits.filter_map(|tx| tx.solidarity_amount).sum();

    let loans: Vec<Loan> = loans
        .iter()
        .filter(|l| l.member_id == member.id)
        .cloned()
        .collect();
    let fines: Vec<Fine> = fines
        .iter()
        .filter(|f| f.member_id == member.id)
        .cloned()
        .collect();

    MemberStatement {
        member: member.clone(),
        shares: member_shares(&own, member.id),
        deposited,
        solidarity,
        loans_outstanding: outstanding_balance(&loans),
        fines_outstanding: fines
            .iter()
            .filter(|f| !f.is_void())
            .map(Fine::outstanding)
            .sum(),
        loans,
        fines,
        transactions: own,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub pending: usize,
    pub approved: usize,
    pub active: usize,
    pub defaulted: usize,
    pub cleared: usize,
    pub rejected: usize,
    pub outstanding: i64,
    pub overdue_loans: usize,
    pub overdue_balance: i64,
}

pub fn portfolio_summary(loans: &[Loan], today: NaiveDate) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    for loan in loans {
        match loan.status {
            LoanStatus::Pending => summary.pending += 1,
            LoanStatus::Approved => summary.approved += 1,
            LoanStatus::Active => summary.active += 1,
            LoanStatus::Defaulted => summary.defaulted += 1,
            LoanStatus::Cleared => summary.cleared += 1,
            LoanStatus::Rejected => summary.rejected += 1,
        }
        if loan.status.is_outstanding() {
            summary.outstanding += loan.balance;
            if loan.is_overdue(today) {
                summary.overdue_loans += 1;
                summary.overdue_balance += loan.balance;
            }
        }
    }
    summary
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTotals {
    pub total_savings: i64,
    pub total_loans_outstanding: i64,
    pub total_solidarity: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMismatch {
    pub member_id: Uuid,
    pub cached_shares: i64,
    pub derived_shares: i64,
    pub cached_loans: i64,
    pub derived_loans: i64,
}

/// Cached totals against the figures rebuilt from the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub group_id: Uuid,
    pub cached: CachedTotals,
    pub derived: CachedTotals,
    pub members: Vec<MemberMismatch>,
    pub consistent: bool,
}

/// Totals a group should carry given its log and loans.
pub fn derive_group_totals(transactions: &[Transaction], loans: &[Loan]) -> CachedTotals {
    let ledger = LedgerTotals::from_log(transactions);
    CachedTotals {
        total_savings: ledger.deposits,
        total_loans_outstanding: outstanding_balance(loans),
        total_solidarity: ledger.solidarity,
    }
}

pub fn reconcile(
    group: &Group,
    members: &[Member],
    transactions: &[Transaction],
    loans: &[Loan],
) -> Reconciliation {
    let cached = CachedTotals {
        total_savings: group.total_savings,
        total_loans_outstanding: group.total_loans_outstanding,
        total_solidarity: group.total_solidarity,
    };
    let derived = derive_group_totals(transactions, loans);

    let members: Vec<MemberMismatch> = members
        .iter()
        .map(|member| MemberMismatch {
            member_id: member.id,
            cached_shares: member.total_shares,
            derived_shares: member_shares(transactions, member.id),
            cached_loans: member.total_loans,
            derived_loans: outstanding_balance(loans.iter().filter(|l| l.member_id == member.id)),
        })
        .filter(|m| m.cached_shares != m.derived_shares || m.cached_loans != m.derived_loans)
        .collect();

    Reconciliation {
        group_id: group.id,
        consistent: cached == derived && members.is_empty(),
        cached,
        derived,
        members,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::MemberStatus;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn group(share_value: i64) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "Dukorere Hamwe".to_string(),
            branch: String::new(),
            location: String::new(),
            share_value,
            min_shares: 1,
            max_shares: 5,
            current_cycle_id: None,
            total_savings: 0,
            total_loans_outstanding: 0,
            total_solidarity: 0,
            created_at: Utc::now(),
        }
    }

    fn member(group: &Group, name: &str, shares: i64) -> Member {
        Member {
            id: Uuid::new_v4(),
            group_id: group.id,
            full_name: name.to_string(),
            national_id: String::new(),
            phone: String::new(),
            status: MemberStatus::Active,
            total_shares: shares,
            total_loans: 0,
            joined_on: day(),
        }
    }

    fn tx(group: &Group, kind: TransactionKind, amount: i64) -> Transaction {
        Transaction::new(group.id, None, None, kind, amount, day(), "test".to_string()).unwrap()
    }

    #[test]
    fn cash_balance_ignores_repayments_and_voids() {
        let group = group(500);
        let mut voided = tx(&group, TransactionKind::ShareDeposit, 9_000);
        voided.is_void = true;
        let log = vec![
            tx(&group, TransactionKind::ShareDeposit, 10_000),
            tx(&group, TransactionKind::FinePayment, 500),
            tx(&group, TransactionKind::Expense, 1_500),
            tx(&group, TransactionKind::LoanDisbursement, 5_000),
            tx(&group, TransactionKind::LoanRepayment, 2_000),
            tx(&group, TransactionKind::LoanPenalty, 300),
            voided,
        ];
        assert_eq!(cash_balance(&log), 4_000);

        let totals = LedgerTotals::from_log(&log);
        assert_eq!(totals.deposits, 10_000);
        assert_eq!(totals.repaid, 2_000);
        assert_eq!(totals.penalties, 300);
        assert_eq!(totals.cash_balance, 4_000);
    }

    fn deposit(member: &Member, shares: i64, cycle_id: Uuid, share_value: i64) -> Transaction {
        let tx = Transaction::new(
            member.group_id,
            Some(member.id),
            Some(cycle_id),
            TransactionKind::ShareDeposit,
            shares * share_value,
            day(),
            "test".to_string(),
        )
        .unwrap();
        tx.deposit(shares, 0)
    }

    #[test]
    fn share_out_splits_profit_by_shares() {
        let group = group(1_000);
        let cycle = Uuid::new_v4();
        let uwase = member(&group, "Uwase", 30);
        let mugisha = member(&group, "Mugisha", 10);
        let ineza = member(&group, "Ineza", 0);
        let log = vec![
            deposit(&uwase, 20, cycle, 1_000),
            deposit(&uwase, 10, cycle, 1_000),
            deposit(&mugisha, 10, cycle, 1_000),
        ];
        let out = share_out(&group, &[uwase, mugisha, ineza], &log, Some(cycle));
        assert_eq!(out.cycle_id, Some(cycle));
        assert_eq!(out.total_shares, 40);
        assert_eq!(out.total_shares_value, 40_000);
        assert_eq!(out.estimated_profit, 4_000);
        assert!((out.value_per_share - 1_100.0).abs() < f64::EPSILON);
        assert_eq!(out.payouts.len(), 2);
        assert_eq!(out.payouts[0].payout, 33_000);
        assert_eq!(out.payouts[1].payout, 11_000);
    }

    #[test]
    fn share_out_counts_only_the_cycle_being_closed() {
        let group = group(500);
        let (earlier, current) = (Uuid::new_v4(), Uuid::new_v4());
        let keza = member(&group, "Keza", 12);
        let mut voided = deposit(&keza, 4, current, 500);
        voided.is_void = true;
        let log = vec![deposit(&keza, 10, earlier, 500), deposit(&keza, 2, current, 500), voided];

        let out = share_out(&group, std::slice::from_ref(&keza), &log, Some(current));
        assert_eq!(out.total_shares, 2);
        assert_eq!(out.payouts[0].payout, 1_100);

        let out = share_out(&group, &[keza], &log, None);
        assert_eq!(out.total_shares, 0);
        assert!(out.payouts.is_empty());
        assert!((out.value_per_share - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn portfolio_counts_overdue() {
        let group = group(500);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut overdue =
            Loan::apply(group.id, Uuid::new_v4(), 10_000, 0.0, 1, start, String::new()).unwrap();
        overdue.status = LoanStatus::Active;
        let pending =
            Loan::apply(group.id, Uuid::new_v4(), 5_000, 0.0, 6, start, String::new()).unwrap();

        let summary = portfolio_summary(&[overdue, pending], day());
        assert_eq!(summary.active, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.outstanding, 10_000);
        assert_eq!(summary.overdue_loans, 1);
        assert_eq!(summary.overdue_balance, 10_000);
    }

    #[test]
    fn reconcile_flags_drift() {
        let mut group = group(500);
        let member = member(&group, "Habimana", 3);
        let deposit = tx(&group, TransactionKind::ShareDeposit, 1_500)
            .deposit(3, 100);
        let deposit = Transaction {
            member_id: Some(member.id),
            ..deposit
        };
        group.total_savings = 1_500;
        group.total_solidarity = 100;

        let report = reconcile(&group, &[member.clone()], &[deposit.clone()], &[]);
        assert!(report.consistent);

        group.total_savings = 2_000;
        let report = reconcile(&group, &[member], &[deposit], &[]);
        assert!(!report.consistent);
        assert_eq!(report.derived.total_savings, 1_500);
    }
}
