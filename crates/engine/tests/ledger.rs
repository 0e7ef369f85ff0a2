use chrono::NaiveDate;
use sea_orm::Database;
use uuid::Uuid;

use engine::{
    AttendanceStatus, ContributionCmd, Engine, EngineError, ExpenseCmd, FineStatus, Group,
    LateFeePolicy, LoanApplicationCmd, LoanStatus, MeetingCmd, MeetingEntry, Member,
    MemberRemoval, MemberStatus, NewFineCmd, NewGroupCmd, NewMemberCmd, Role, TransactionKind,
    TransactionListFilter, UpdateFineCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

/// A group with a 500 RWF share, 1 to 10 shares per deposit, a 5% monthly
/// rate and one member.
async fn group_with_member(engine: &Engine, name: &str) -> (Group, Member) {
    let group = engine
        .create_group(
            NewGroupCmd::new(name, 500, day(1, 1))
                .interest_rate(5.0)
                .share_limits(1, 10),
        )
        .await
        .unwrap();
    let member = engine
        .add_member(group.id, NewMemberCmd::named("Alice Uwase").national_id("1199"))
        .await
        .unwrap();
    (group, member)
}

async fn deposit(engine: &Engine, group: &Group, member: &Member, shares: i64) -> Uuid {
    engine
        .record_contribution(ContributionCmd::new(
            group.id,
            member.id,
            shares,
            day(1, 10),
            "clerk",
        ))
        .await
        .unwrap()
        .id
}

async fn active_loan(engine: &Engine, group: &Group, member: &Member, start: NaiveDate) -> Uuid {
    let loan = engine
        .apply_for_loan(
            LoanApplicationCmd::new(group.id, member.id, 50_000, 3).start_date(start),
        )
        .await
        .unwrap();
    engine
        .update_loan_status(loan.id, LoanStatus::Active, "leader")
        .await
        .unwrap();
    loan.id
}

#[tokio::test]
async fn deposit_then_void_restores_totals() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Twisungane").await;

    let tx = engine
        .record_contribution(
            ContributionCmd::new(group.id, member.id, 4, day(1, 10), "clerk").solidarity(200),
        )
        .await
        .unwrap();
    assert_eq!(tx.amount, 2_000);

    let group_after = engine.group(group.id).await.unwrap();
    assert_eq!(group_after.total_savings, 2_000);
    assert_eq!(group_after.total_solidarity, 200);
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 4);

    let voided = engine
        .void_transaction(tx.id, "leader", "entered twice")
        .await
        .unwrap();
    assert!(voided.is_void);
    assert_eq!(voided.edit_history.len(), 1);

    let group_after = engine.group(group.id).await.unwrap();
    assert_eq!(group_after.total_savings, 0);
    assert_eq!(group_after.total_solidarity, 0);
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 0);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);
}

#[tokio::test]
async fn second_void_is_rejected_and_totals_move_once() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Abishyize").await;
    let first = deposit(&engine, &group, &member, 2).await;
    deposit(&engine, &group, &member, 3).await;

    engine.void_transaction(first, "leader", "typo").await.unwrap();
    let err = engine
        .void_transaction(first, "leader", "typo again")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyVoided(_)));

    let group = engine.group(group.id).await.unwrap();
    assert_eq!(group.total_savings, 1_500);
}

#[tokio::test]
async fn void_requires_a_reason() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Dufatanye").await;
    let tx = deposit(&engine, &group, &member, 1).await;

    let err = engine.void_transaction(tx, "leader", "   ").await.unwrap_err();
    assert!(matches!(err, EngineError::MissingReason(_)));
    assert!(!engine.transaction_detail(tx).await.unwrap().is_void);
}

#[tokio::test]
async fn editing_a_deposit_moves_totals_by_the_difference() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Turwanye").await;
    let tx = deposit(&engine, &group, &member, 5).await;
    assert_eq!(engine.group(group.id).await.unwrap().total_savings, 2_500);

    let edited = engine
        .edit_contribution(tx, 8, 0, "leader", "miscounted")
        .await
        .unwrap();
    assert_eq!(edited.amount, 4_000);
    assert_eq!(edited.share_count, Some(8));
    assert_eq!(edited.edit_history.len(), 1);
    let fields: Vec<&str> = edited.edit_history[0]
        .changes
        .iter()
        .map(|c| c.field.as_str())
        .collect();
    assert!(fields.contains(&"share_count"));
    assert!(fields.contains(&"amount"));

    assert_eq!(engine.group(group.id).await.unwrap().total_savings, 4_000);
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 8);
}

#[tokio::test]
async fn repeated_edits_keep_totals_in_step() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Twizerane").await;
    let tx = engine
        .record_contribution(
            ContributionCmd::new(group.id, member.id, 5, day(1, 10), "clerk").solidarity(200),
        )
        .await
        .unwrap();

    engine
        .edit_contribution(tx.id, 8, 0, "leader", "miscounted")
        .await
        .unwrap();
    let edited = engine
        .edit_contribution(tx.id, 3, 50, "leader", "miscounted again")
        .await
        .unwrap();
    assert_eq!(edited.amount, 1_500);
    assert_eq!(edited.solidarity_amount, Some(50));
    assert_eq!(edited.edit_history.len(), 2);

    let group_after = engine.group(group.id).await.unwrap();
    assert_eq!(group_after.total_savings, 1_500);
    assert_eq!(group_after.total_solidarity, 50);
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 3);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);
}

#[tokio::test]
async fn only_live_deposits_can_be_edited() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Tugire Amahoro").await;
    deposit(&engine, &group, &member, 4).await;
    let voided = deposit(&engine, &group, &member, 2).await;
    engine
        .void_transaction(voided, "leader", "entered twice")
        .await
        .unwrap();
    let expense = engine
        .record_expense(ExpenseCmd::new(group.id, 500, day(1, 12), "clerk"))
        .await
        .unwrap();

    let err = engine
        .edit_contribution(voided, 3, 0, "leader", "late correction")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyVoided(_)));

    let err = engine
        .edit_contribution(expense.id, 3, 0, "leader", "wrong screen")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    let group_after = engine.group(group.id).await.unwrap();
    assert_eq!(group_after.total_savings, 2_000);
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 4);
    assert_eq!(engine.transaction_detail(voided).await.unwrap().edit_history.len(), 1);
}

#[tokio::test]
async fn deposits_outside_limits_or_range_are_refused() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Ubumwe").await;

    for shares in [0, 11, i64::MAX / 100] {
        let err = engine
            .record_contribution(ContributionCmd::new(
                group.id,
                member.id,
                shares,
                day(1, 10),
                "clerk",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)), "{shares} shares");
    }

    engine
        .record_contribution(
            ContributionCmd::new(group.id, member.id, 1, day(1, 10), "clerk")
                .solidarity(i64::MAX),
        )
        .await
        .unwrap();
    let second = ContributionCmd::new(group.id, member.id, 1, day(1, 11), "clerk").solidarity(1);
    let err = engine.record_contribution(second).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(engine.group(group.id).await.unwrap().total_savings, 500);

    let tx = deposit(&engine, &group, &member, 2).await;
    let err = engine
        .edit_contribution(tx, 11, 0, "leader", "miscounted")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let costly = engine
        .create_group(NewGroupCmd::new("Inkingi", i64::MAX / 2, day(1, 1)))
        .await
        .unwrap();
    let saver = engine
        .add_member(costly.id, NewMemberCmd::named("Jean Mugabo"))
        .await
        .unwrap();
    let err = engine
        .record_contribution(ContributionCmd::new(costly.id, saver.id, 3, day(1, 10), "clerk"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(engine.group(costly.id).await.unwrap().total_savings, 0);
}

#[tokio::test]
async fn loan_lifecycle_keeps_the_portfolio_in_step() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Komeza").await;

    let loan = engine
        .apply_for_loan(
            LoanApplicationCmd::new(group.id, member.id, 50_000, 3).start_date(day(2, 1)),
        )
        .await
        .unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.total_repayable, 57_500);
    assert_eq!(engine.group(group.id).await.unwrap().total_loans_outstanding, 0);

    engine
        .update_loan_status(loan.id, LoanStatus::Approved, "leader")
        .await
        .unwrap();
    let active = engine
        .update_loan_status(loan.id, LoanStatus::Active, "leader")
        .await
        .unwrap();
    assert_eq!(active.balance, 57_500);
    assert_eq!(
        engine.group(group.id).await.unwrap().total_loans_outstanding,
        57_500
    );
    assert_eq!(engine.member(member.id).await.unwrap().total_loans, 57_500);

    let partial = engine
        .repay_loan(loan.id, 20_000, day(3, 1), "clerk")
        .await
        .unwrap();
    assert_eq!(partial.applied, 20_000);
    assert_eq!(partial.loan.balance, 37_500);
    assert_eq!(partial.loan.status, LoanStatus::Active);

    let last = engine
        .repay_loan(loan.id, 40_000, day(4, 1), "clerk")
        .await
        .unwrap();
    assert_eq!(last.applied, 37_500);
    assert_eq!(last.excess, 2_500);
    assert_eq!(last.loan.status, LoanStatus::Cleared);
    assert_eq!(engine.group(group.id).await.unwrap().total_loans_outstanding, 0);
    assert_eq!(engine.member(member.id).await.unwrap().total_loans, 0);

    let (_, history) = engine.loan(loan.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);
}

#[tokio::test]
async fn loan_status_changes_follow_the_lifecycle() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Jyambere").await;
    let loan = engine
        .apply_for_loan(LoanApplicationCmd::new(group.id, member.id, 10_000, 1))
        .await
        .unwrap();

    let err = engine
        .update_loan_status(loan.id, LoanStatus::Cleared, "leader")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    engine
        .update_loan_status(loan.id, LoanStatus::Rejected, "leader")
        .await
        .unwrap();
    let err = engine
        .repay_loan(loan.id, 1_000, day(2, 1), "clerk")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn late_fees_charge_each_overdue_loan_once() {
    let engine = engine_with_db().await;
    let (group, alice) = group_with_member(&engine, "Twiteze").await;
    let bob = engine
        .add_member(group.id, NewMemberCmd::named("Bob Habimana"))
        .await
        .unwrap();
    let carol = engine
        .add_member(group.id, NewMemberCmd::named("Carol Mukamana"))
        .await
        .unwrap();

    active_loan(&engine, &group, &alice, day(1, 1)).await;
    active_loan(&engine, &group, &bob, day(1, 15)).await;
    // Due well after the run date.
    active_loan(&engine, &group, &carol, day(6, 1)).await;

    let today = day(6, 1);
    let report = engine
        .apply_late_fees(group.id, LateFeePolicy::Fixed(1_000), today, "system")
        .await
        .unwrap();
    assert_eq!(report.count, 2);
    assert_eq!(report.total_fees, 2_000);
    assert!(report.failures.is_empty());

    let rerun = engine
        .apply_late_fees(group.id, LateFeePolicy::Fixed(1_000), today, "system")
        .await
        .unwrap();
    assert_eq!(rerun.count, 0);

    let defaulted = engine
        .list_loans(group.id, Some(LoanStatus::Defaulted))
        .await
        .unwrap();
    assert_eq!(defaulted.len(), 2);
    assert!(defaulted.iter().all(|l| l.balance == 58_500));

    let group_after = engine.group(group.id).await.unwrap();
    assert_eq!(group_after.total_loans_outstanding, 3 * 57_500 + 2_000);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);
}

#[tokio::test]
async fn fine_status_follows_payments_and_paid_fines_cannot_be_voided() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Ubumwe").await;
    let category = engine
        .create_fine_category(group.id, "Late arrival", 1_000)
        .await
        .unwrap();

    let fine = engine
        .create_fine(NewFineCmd::new(group.id, member.id, category.id, day(1, 10)))
        .await
        .unwrap();
    assert_eq!(fine.amount, 1_000);
    assert_eq!(fine.status, FineStatus::Unpaid);

    let paid = engine
        .pay_fine(fine.id, 400, day(1, 17), "clerk")
        .await
        .unwrap();
    assert_eq!(paid.fine.status, FineStatus::PartiallyPaid);
    assert_eq!(paid.transaction.kind, TransactionKind::FinePayment);
    assert_eq!(paid.transaction.reference_id, Some(fine.id));

    let err = engine
        .void_fine(fine.id, "leader", "forgiven")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(
        engine.fine(fine.id).await.unwrap().status,
        FineStatus::PartiallyPaid
    );

    let rest = engine
        .pay_fine(fine.id, 1_000, day(1, 24), "clerk")
        .await
        .unwrap();
    assert_eq!(rest.applied, 600);
    assert_eq!(rest.excess, 400);
    assert_eq!(rest.fine.status, FineStatus::Paid);

    let err = engine
        .void_transaction(paid.transaction.id, "leader", "mistake")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn fines_can_be_edited_and_voided_with_history() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Icyerekezo").await;
    let category = engine
        .create_fine_category(group.id, "Absence", 2_000)
        .await
        .unwrap();
    let fine = engine
        .create_fine(
            NewFineCmd::new(group.id, member.id, category.id, day(1, 10)).amount(1_500),
        )
        .await
        .unwrap();

    let edited = engine
        .update_fine(
            fine.id,
            UpdateFineCmd {
                amount: Some(2_500),
                description: None,
            },
            "leader",
            "repeated absence",
        )
        .await
        .unwrap();
    assert_eq!(edited.amount, 2_500);
    assert_eq!(edited.history.len(), 1);

    let voided = engine
        .void_fine(fine.id, "leader", "sick leave")
        .await
        .unwrap();
    assert_eq!(voided.status, FineStatus::Void);
    assert_eq!(voided.history.len(), 2);

    let err = engine
        .void_fine(fine.id, "leader", "again")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyVoided(_)));
}

#[tokio::test]
async fn fine_categories_are_unique_per_group() {
    let engine = engine_with_db().await;
    let (group, _) = group_with_member(&engine, "Imbaraga").await;
    engine
        .create_fine_category(group.id, "Late arrival", 500)
        .await
        .unwrap();

    let err = engine
        .create_fine_category(group.id, "  LATE   arrival ", 700)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let found = engine
        .find_fine_category(group.id, "late arrival")
        .await
        .unwrap();
    assert_eq!(found.default_amount, 500);
}

#[tokio::test]
async fn meeting_entries_apply_independently() {
    let engine = engine_with_db().await;
    let (group, alice) = group_with_member(&engine, "Terimbere").await;
    let bob = engine
        .add_member(group.id, NewMemberCmd::named("Bob Habimana"))
        .await
        .unwrap();
    let carol = engine
        .add_member(group.id, NewMemberCmd::named("Carol Mukamana"))
        .await
        .unwrap();

    let cmd = MeetingCmd::new(group.id, day(2, 5), "clerk")
        .entry(MeetingEntry::present(alice.id).shares(3).solidarity(100))
        // Bob has no loan to repay: his whole entry is rejected.
        .entry(MeetingEntry::present(bob.id).shares(2).loan_repayment(5_000))
        .entry(MeetingEntry::absent(carol.id).shares(4));
    let report = engine.submit_meeting(cmd).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].member_id, bob.id);

    assert_eq!(engine.member(alice.id).await.unwrap().total_shares, 3);
    assert_eq!(engine.member(bob.id).await.unwrap().total_shares, 0);
    // Absent members are marked but their money columns are ignored.
    assert_eq!(engine.member(carol.id).await.unwrap().total_shares, 0);
    assert_eq!(engine.group(group.id).await.unwrap().total_savings, 1_500);

    let (_, rows) = engine.meeting(report.meeting.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    let carol_row = rows.iter().find(|r| r.member_id == carol.id).unwrap();
    assert_eq!(carol_row.status, AttendanceStatus::Absent);

    let corrected = engine
        .correct_attendance(carol_row.id, AttendanceStatus::Excused, "leader", "was sick")
        .await
        .unwrap();
    assert_eq!(corrected.status, AttendanceStatus::Excused);
    assert_eq!(corrected.history.len(), 1);
}

#[tokio::test]
async fn meeting_repayments_go_to_the_outstanding_loan() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Twubakane").await;
    let loan_id = active_loan(&engine, &group, &member, day(1, 5)).await;

    let report = engine
        .submit_meeting(
            MeetingCmd::new(group.id, day(2, 5), "clerk")
                .entry(MeetingEntry::present(member.id).loan_repayment(60_000).fines_paid(300)),
        )
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.repayment_excess, vec![(member.id, 2_500)]);

    let (loan, _) = engine.loan(loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Cleared);
    assert_eq!(engine.group(group.id).await.unwrap().total_loans_outstanding, 0);
}

#[tokio::test]
async fn expenses_cannot_exceed_cash() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Girubuzima").await;
    deposit(&engine, &group, &member, 10).await;
    assert_eq!(engine.cash_balance(group.id).await.unwrap(), 5_000);

    let err = engine
        .record_expense(ExpenseCmd::new(group.id, 6_000, day(1, 20), "clerk"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let expense = engine
        .record_expense(
            ExpenseCmd::new(group.id, 1_200, day(1, 20), "clerk").description("Ledger books"),
        )
        .await
        .unwrap();
    assert_eq!(expense.kind, TransactionKind::Expense);
    assert_eq!(engine.cash_balance(group.id).await.unwrap(), 3_800);

    engine
        .void_transaction(expense.id, "leader", "refunded")
        .await
        .unwrap();
    assert_eq!(engine.cash_balance(group.id).await.unwrap(), 5_000);
}

#[tokio::test]
async fn deposits_need_an_open_cycle() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Ejo Heza").await;
    deposit(&engine, &group, &member, 6).await;

    let share_out = engine.close_cycle(group.id, day(12, 31)).await.unwrap();
    assert_eq!(share_out.total_shares, 6);
    assert_eq!(share_out.total_shares_value, 3_000);
    assert_eq!(share_out.estimated_profit, 300);
    assert_eq!(share_out.payouts[0].payout, 3_300);

    let err = engine
        .record_contribution(ContributionCmd::new(
            group.id,
            member.id,
            1,
            day(12, 31),
            "clerk",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert!(engine.current_cycle(group.id).await.unwrap().is_none());

    let reopened = engine.open_cycle(group.id, day(12, 31), 4.0).await.unwrap();
    assert_eq!(
        engine.current_cycle(group.id).await.unwrap().map(|c| c.id),
        Some(reopened.id)
    );
    let err = engine
        .open_cycle(group.id, day(12, 31), 4.0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(engine.list_cycles(group.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn second_cycle_pays_out_only_its_own_deposits() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Amizero").await;
    deposit(&engine, &group, &member, 10).await;

    let first = engine.close_cycle(group.id, day(6, 30)).await.unwrap();
    assert_eq!(first.total_shares, 10);
    assert_eq!(first.estimated_profit, 500);

    let cycle = engine.open_cycle(group.id, day(7, 1), 5.0).await.unwrap();
    engine
        .record_contribution(ContributionCmd::new(group.id, member.id, 2, day(7, 10), "clerk"))
        .await
        .unwrap();

    let preview = engine.share_out_preview(group.id).await.unwrap();
    assert_eq!(preview.cycle_id, Some(cycle.id));
    assert_eq!(preview.total_shares, 2);

    let second = engine.close_cycle(group.id, day(12, 31)).await.unwrap();
    assert_eq!(second.cycle_id, Some(cycle.id));
    assert_eq!(second.total_shares, 2);
    assert_eq!(second.estimated_profit, 100);
    let payouts: Vec<i64> = second.payouts.iter().map(|p| p.payout).collect();
    assert_eq!(payouts, vec![1_100]);

    // The member keeps the lifetime count; only the distribution is per cycle.
    assert_eq!(engine.member(member.id).await.unwrap().total_shares, 12);
}

#[tokio::test]
async fn mixed_activity_over_two_cycles_reconciles() {
    let engine = engine_with_db().await;
    let (group, alice) = group_with_member(&engine, "Hirwa").await;
    let bob = engine
        .add_member(group.id, NewMemberCmd::named("Bob Habimana"))
        .await
        .unwrap();

    let alice_deposit = engine
        .record_contribution(
            ContributionCmd::new(group.id, alice.id, 4, day(1, 10), "clerk").solidarity(100),
        )
        .await
        .unwrap();
    deposit(&engine, &group, &bob, 6).await;
    let mistake = deposit(&engine, &group, &bob, 3).await;
    engine
        .edit_contribution(alice_deposit.id, 2, 0, "leader", "miscounted")
        .await
        .unwrap();
    engine
        .void_transaction(mistake, "leader", "entered twice")
        .await
        .unwrap();
    engine
        .record_expense(ExpenseCmd::new(group.id, 500, day(1, 20), "clerk"))
        .await
        .unwrap();

    let loan_id = active_loan(&engine, &group, &alice, day(1, 5)).await;
    engine
        .repay_loan(loan_id, 20_000, day(2, 5), "clerk")
        .await
        .unwrap();
    let fees = engine
        .apply_late_fees(group.id, LateFeePolicy::Fixed(1_000), day(6, 1), "system")
        .await
        .unwrap();
    assert_eq!(fees.count, 1);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);

    let first = engine.close_cycle(group.id, day(6, 30)).await.unwrap();
    assert_eq!(first.total_shares, 8);
    assert_eq!(first.estimated_profit, 400);

    engine.open_cycle(group.id, day(7, 1), 5.0).await.unwrap();
    engine
        .record_contribution(ContributionCmd::new(group.id, bob.id, 2, day(7, 10), "clerk"))
        .await
        .unwrap();
    let second = engine.close_cycle(group.id, day(12, 31)).await.unwrap();
    assert_eq!(second.total_shares, 2);
    assert_eq!(second.payouts.len(), 1);
    assert_eq!(second.payouts[0].member_id, bob.id);

    let report = engine.reconcile_group(group.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.cached.total_savings, 5_000);
    assert_eq!(report.cached.total_solidarity, 0);
    assert_eq!(report.cached.total_loans_outstanding, 38_500);
    assert_eq!(engine.cash_balance(group.id).await.unwrap(), 5_000 - 500 - 50_000);
}

#[tokio::test]
async fn late_fee_that_would_overflow_is_skipped() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Jyambere").await;
    let loan_id = active_loan(&engine, &group, &member, day(1, 5)).await;

    let report = engine
        .apply_late_fees(group.id, LateFeePolicy::Fixed(i64::MAX), day(6, 1), "system")
        .await
        .unwrap();
    assert_eq!(report.count, 0);
    assert_eq!(report.failures.len(), 1);

    let (loan, _) = engine.loan(loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.balance, 57_500);
    assert!(engine.reconcile_group(group.id).await.unwrap().consistent);
}

#[tokio::test]
async fn exited_members_cannot_deposit_or_borrow() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Kundwa").await;
    engine
        .set_member_status(member.id, MemberStatus::Exited, "leader", "moved away")
        .await
        .unwrap();

    let err = engine
        .record_contribution(ContributionCmd::new(group.id, member.id, 1, day(1, 3), "clerk"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    let err = engine
        .apply_for_loan(LoanApplicationCmd::new(group.id, member.id, 5_000, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn deleting_a_member_keeps_ledger_history() {
    let engine = engine_with_db().await;
    let (group, saver) = group_with_member(&engine, "Humura").await;
    let newcomer = engine
        .add_member(group.id, NewMemberCmd::named("Eric Nsengimana"))
        .await
        .unwrap();
    deposit(&engine, &group, &saver, 1).await;

    let removed = engine
        .delete_member(saver.id, "leader", "left the group")
        .await
        .unwrap();
    match removed {
        MemberRemoval::Exited(member) => assert_eq!(member.status, MemberStatus::Exited),
        MemberRemoval::Deleted => panic!("member with deposits must be kept"),
    }

    let removed = engine
        .delete_member(newcomer.id, "leader", "registered by mistake")
        .await
        .unwrap();
    assert_eq!(removed, MemberRemoval::Deleted);
    assert!(matches!(
        engine.member(newcomer.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn import_reports_rejected_rows() {
    let engine = engine_with_db().await;
    let (group, _) = group_with_member(&engine, "Abakundana").await;

    let rows = vec![
        NewMemberCmd::named("Diane Ingabire").national_id("2200"),
        NewMemberCmd::default(),
        NewMemberCmd::named("Duplicate Id").national_id("1199"),
        NewMemberCmd::named("Fabrice Ndayisaba"),
    ];
    let report = engine.import_members(group.id, rows).await.unwrap();
    assert_eq!(report.attempted, 4);
    assert_eq!(report.succeeded, 2);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
    assert_eq!(engine.list_members(group.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn transactions_page_newest_first() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Tuzamurane").await;
    for d in 1..=5 {
        engine
            .record_contribution(ContributionCmd::new(
                group.id,
                member.id,
                d,
                day(3, d as u32),
                "clerk",
            ))
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let (first, cursor) = engine
        .list_transactions_page(group.id, 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].occurred_on, day(3, 5));
    assert_eq!(first[1].occurred_on, day(3, 4));

    let (second, cursor) = engine
        .list_transactions_page(group.id, 2, cursor.as_deref(), &filter)
        .await
        .unwrap();
    assert_eq!(second[0].occurred_on, day(3, 3));

    let (last, cursor) = engine
        .list_transactions_page(group.id, 2, cursor.as_deref(), &filter)
        .await
        .unwrap();
    assert_eq!(last.len(), 1);
    assert!(cursor.is_none());

    let err = engine
        .list_transactions_page(group.id, 2, Some("not-a-cursor"), &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn recompute_repairs_nothing_on_a_clean_ledger() {
    let engine = engine_with_db().await;
    let (group, member) = group_with_member(&engine, "Shyira Hamwe").await;
    deposit(&engine, &group, &member, 3).await;
    active_loan(&engine, &group, &member, day(1, 5)).await;

    let report = engine.recompute_group_totals(group.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.derived.total_savings, 1_500);
    assert_eq!(report.derived.total_loans_outstanding, 57_500);
}

#[tokio::test]
async fn group_leaders_only_reach_their_groups() {
    let engine = engine_with_db().await;
    let (mine, member) = group_with_member(&engine, "Twisungane").await;
    let (other, _) = group_with_member(&engine, "Abishyize").await;

    engine
        .create_user("leader", "s3cret", Role::GroupLeader)
        .await
        .unwrap();
    engine.grant_group("leader", mine.id).await.unwrap();

    assert!(
        engine
            .authenticate("leader", "wrong")
            .await
            .unwrap()
            .is_none()
    );
    let caller = engine
        .authenticate("leader", "s3cret")
        .await
        .unwrap()
        .unwrap();
    let scoped = engine.scoped(&caller);

    let visible = scoped.list_groups().await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, mine.id);

    assert!(matches!(
        scoped.group(other.id).await.unwrap_err(),
        EngineError::Forbidden(_)
    ));
    scoped
        .record_contribution(ContributionCmd::new(mine.id, member.id, 2, day(1, 9), "ignored"))
        .await
        .unwrap();
    let statement = scoped.member_statement(member.id).await.unwrap();
    assert_eq!(statement.shares, 2);
    assert_eq!(statement.transactions[0].created_by, "leader");

    assert!(matches!(
        scoped
            .create_group(NewGroupCmd::new("Rogue", 100, day(1, 1)))
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));
}

#[tokio::test]
async fn duplicate_users_are_rejected() {
    let engine = engine_with_db().await;
    engine.create_user("admin", "pw", Role::Admin).await.unwrap();
    let err = engine
        .create_user("admin", "pw2", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}
