//! Meeting sheets and attendance API endpoints.

use api_types::meeting::{
    AttendanceCorrection, AttendanceStatus as ApiAttendance, MeetingKind as ApiKind, MeetingNew,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    Attendance, AttendanceStatus, Caller, Meeting, MeetingCmd, MeetingEntry, MeetingKind,
    MeetingReport,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_attendance(status: ApiAttendance) -> AttendanceStatus {
    match status {
        ApiAttendance::Present => AttendanceStatus::Present,
        ApiAttendance::Absent => AttendanceStatus::Absent,
        ApiAttendance::Late => AttendanceStatus::Late,
        ApiAttendance::Excused => AttendanceStatus::Excused,
    }
}

#[derive(Serialize)]
pub struct MeetingDetail {
    meeting: Meeting,
    attendance: Vec<Attendance>,
}

pub async fn meeting_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MeetingNew>,
) -> Result<(StatusCode, Json<MeetingReport>), ServerError> {
    let kind = match payload.kind {
        ApiKind::Regular => MeetingKind::Regular,
        ApiKind::Special => MeetingKind::Special,
    };
    let mut cmd = MeetingCmd::new(group_id, payload.held_on, caller.username.clone()).kind(kind);
    if let Some(notes) = payload.notes {
        cmd = cmd.notes(notes);
    }
    for entry in payload.entries {
        cmd = cmd.entry(MeetingEntry {
            member_id: entry.member_id,
            attendance: map_attendance(entry.attendance),
            shares: entry.shares,
            solidarity: entry.solidarity,
            loan_repayment: entry.loan_repayment,
            fines_paid: entry.fines_paid,
        });
    }

    let report = state.engine.scoped(&caller).submit_meeting(cmd).await?;
    if !report.failures.is_empty() {
        tracing::warn!(
            "meeting {}: {} of {} entries rejected",
            report.meeting.id,
            report.failures.len(),
            report.attempted
        );
    }
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Meeting>>, ServerError> {
    let meetings = state.engine.scoped(&caller).list_meetings(group_id).await?;
    Ok(Json(meetings))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(meeting_id): Path<Uuid>,
) -> Result<Json<MeetingDetail>, ServerError> {
    let (meeting, attendance) = state.engine.scoped(&caller).meeting(meeting_id).await?;
    Ok(Json(MeetingDetail {
        meeting,
        attendance,
    }))
}

pub async fn correct_attendance(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(attendance_id): Path<Uuid>,
    Json(payload): Json<AttendanceCorrection>,
) -> Result<Json<Attendance>, ServerError> {
    let attendance = state
        .engine
        .scoped(&caller)
        .correct_attendance(
            attendance_id,
            map_attendance(payload.status),
            &payload.reason,
        )
        .await?;
    Ok(Json(attendance))
}
