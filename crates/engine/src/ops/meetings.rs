use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Attendance, AttendanceStatus, AuditEntry, AuditTarget, ChangeSet, ContributionCmd,
    EngineError, Meeting, MeetingCmd, MeetingEntry, ResultEngine, Transaction, TransactionKind,
    attendance, meetings, transactions,
    util::{normalize_optional_text, require_non_negative, require_reason},
};

use super::{Engine, with_tx};

/// One meeting line that could not be applied.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryFailure {
    /// Zero-based position of the entry on the sheet.
    pub index: usize,
    pub member_id: Uuid,
    pub error: String,
}

/// Outcome of a meeting submission.
///
/// Each entry commits on its own: a failing entry leaves nothing behind and
/// does not affect the others.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeetingReport {
    pub meeting: Meeting,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<EntryFailure>,
    /// Repayments above the loan balance, per member.
    pub repayment_excess: Vec<(Uuid, i64)>,
}

impl Engine {
    /// Records a meeting sheet.
    ///
    /// The meeting is created first. Then, per entry: an attendance row and,
    /// for members who attended, their share deposit, a repayment on their
    /// outstanding loan and a direct fine payment.
    pub async fn submit_meeting(&self, cmd: MeetingCmd) -> ResultEngine<MeetingReport> {
        let meeting = with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, cmd.group_id).await?;
            let meeting = Meeting {
                id: Uuid::new_v4(),
                group_id: group.id,
                cycle_id: group.current_cycle_id,
                held_on: cmd.held_on,
                kind: cmd.kind,
                notes: normalize_optional_text(cmd.notes.as_deref()),
            };
            meetings::ActiveModel::from(&meeting).insert(&db_tx).await?;
            Ok(meeting)
        })?;

        let mut report = MeetingReport {
            meeting,
            attempted: cmd.entries.len(),
            succeeded: 0,
            failures: Vec::new(),
            repayment_excess: Vec::new(),
        };
        for (index, entry) in cmd.entries.iter().enumerate() {
            let outcome = with_tx!(self, |db_tx| {
                self.apply_meeting_entry(&db_tx, &report.meeting, entry, &cmd.created_by)
                    .await
            });
            match outcome {
                Ok(excess) => {
                    report.succeeded += 1;
                    if excess > 0 {
                        report.repayment_excess.push((entry.member_id, excess));
                    }
                }
                Err(err @ EngineError::Database(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "meeting {} entry {index} for member {} skipped: {err}",
                        report.meeting.id,
                        entry.member_id
                    );
                    report.failures.push(EntryFailure {
                        index,
                        member_id: entry.member_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            "meeting {} recorded: {}/{} entries applied",
            report.meeting.id,
            report.succeeded,
            report.attempted
        );
        Ok(report)
    }

    /// Applies one sheet line, returning the repayment excess.
    async fn apply_meeting_entry(
        &self,
        db: &DatabaseTransaction,
        meeting: &Meeting,
        entry: &MeetingEntry,
        created_by: &str,
    ) -> ResultEngine<i64> {
        require_non_negative(entry.shares, "shares")?;
        require_non_negative(entry.solidarity, "solidarity")?;
        require_non_negative(entry.loan_repayment, "loan repayment")?;
        require_non_negative(entry.fines_paid, "fines paid")?;

        let member = self
            .require_member_in_group(db, meeting.group_id, entry.member_id)
            .await?;
        let already_marked = attendance::Entity::find()
            .filter(attendance::Column::MeetingId.eq(meeting.id.to_string()))
            .filter(attendance::Column::MemberId.eq(member.id.to_string()))
            .one(db)
            .await?
            .is_some();
        if already_marked {
            return Err(EngineError::ExistingKey(format!(
                "{} already on the sheet",
                member.full_name
            )));
        }
        let row = Attendance::new(meeting.id, meeting.group_id, member.id, entry.attendance);
        attendance::ActiveModel::from(&row).insert(db).await?;

        if !entry.attended() {
            return Ok(0);
        }

        if entry.shares > 0 {
            let cmd = ContributionCmd::new(
                meeting.group_id,
                member.id,
                entry.shares,
                meeting.held_on,
                created_by,
            )
            .solidarity(entry.solidarity);
            self.record_contribution_in(db, &cmd).await?;
        }

        let mut excess = 0;
        if entry.loan_repayment > 0 {
            let loan = self.outstanding_loan_of(db, member.id).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!("no outstanding loan for {}", member.full_name))
            })?;
            excess = self
                .repay_loan_in(db, loan, entry.loan_repayment, meeting.held_on, created_by)
                .await?
                .excess;
        }

        if entry.fines_paid > 0 {
            let payment = Transaction::new(
                meeting.group_id,
                Some(member.id),
                meeting.cycle_id,
                TransactionKind::FinePayment,
                entry.fines_paid,
                meeting.held_on,
                created_by.to_string(),
            )?
            .description(Some("Fines paid at meeting".to_string()));
            transactions::ActiveModel::from(&payment).insert(db).await?;
        }

        Ok(excess)
    }

    /// Corrects an attendance record and audits the change.
    pub async fn correct_attendance(
        &self,
        attendance_id: Uuid,
        status: AttendanceStatus,
        editor: &str,
        reason: &str,
    ) -> ResultEngine<Attendance> {
        let reason = require_reason(reason, "attendance correction")?;
        with_tx!(self, |db_tx| {
            let mut row = self.require_attendance(&db_tx, attendance_id).await?;
            if row.status != status {
                let mut changes = ChangeSet::new();
                changes.track("status", row.status.as_str(), status.as_str());
                row.status = status;
                self.save_attendance(&db_tx, &row).await?;
                let entry =
                    AuditEntry::new(AuditTarget::Attendance, row.id, editor, &reason, changes);
                self.append_audit(&db_tx, &entry).await?;
            }
            row.history = self
                .history_of(&db_tx, AuditTarget::Attendance, row.id)
                .await?;
            Ok(row)
        })
    }

    /// A meeting with its attendance rows.
    pub async fn meeting(&self, meeting_id: Uuid) -> ResultEngine<(Meeting, Vec<Attendance>)> {
        with_tx!(self, |db_tx| {
            let meeting = self.require_meeting(&db_tx, meeting_id).await?;
            let rows = attendance::Entity::find()
                .filter(attendance::Column::MeetingId.eq(meeting_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Attendance::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok((meeting, rows))
        })
    }

    /// Meetings of a group, newest first.
    pub async fn list_meetings(&self, group_id: Uuid) -> ResultEngine<Vec<Meeting>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            meetings::Entity::find()
                .filter(meetings::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(meetings::Column::HeldOn)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Meeting::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
