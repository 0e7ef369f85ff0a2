use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{router, run_with_listener};

mod fines;
mod groups;
mod loans;
mod meetings;
mod members;
mod reports;
mod server;
mod transactions;
mod user;

pub mod types {
    pub mod user {
        pub use api_types::user::{GroupGrant, Role, UserNew};
        pub use engine::{Caller, User};
    }

    pub mod group {
        pub use api_types::group::{GroupNew, GroupUpdate};
        pub use engine::Group;
    }

    pub mod member {
        pub use api_types::member::{
            MemberImport, MemberNew, MemberRemoved, MemberStatus, MemberStatusUpdate,
        };
        pub use engine::{BatchReport, Member};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            ContributionEdit, ContributionNew, ExpenseNew, TransactionKind, TransactionList,
            TransactionListResponse, TransactionView,
        };
    }

    pub mod loan {
        pub use api_types::loan::{
            LateFeePolicy, LateFees, LoanApply, LoanListQuery, LoanRepay, LoanStatus,
            LoanStatusUpdate,
        };
        pub use engine::{LateFeeReport, Loan, RepaymentOutcome};
    }

    pub mod fine {
        pub use api_types::fine::{FineCategoryNew, FineNew, FinePay, FineUpdate};
        pub use engine::{Fine, FineCategory, FinePaymentOutcome};
    }

    pub mod meeting {
        pub use api_types::meeting::{
            AttendanceCorrection, AttendanceStatus, MeetingEntryNew, MeetingKind, MeetingNew,
        };
        pub use engine::{Attendance, Meeting, MeetingReport};
    }

    pub mod report {
        pub use api_types::report::{CashBalance, PortfolioQuery};
        pub use engine::reports::{
            GroupSummary, MemberStatement, PortfolioSummary, Reconciliation, ShareOut,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::MissingReason(_)
        | EngineError::AlreadyVoided(_)
        | EngineError::InvalidState(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InsufficientFunds(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidCursor(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::MissingReason("x".to_string()),
            EngineError::AlreadyVoided("x".to_string()),
            EngineError::InsufficientFunds("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn engine_database_maps_to_500() {
        let err = EngineError::Database(sea_orm::DbErr::Custom("disk full".to_string()));
        let res = ServerError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
