//! Initial schema.
//!
//! - `users`, `group_managers`: operators and the groups a leader manages
//! - `groups`, `cycles`: associations and their savings cycles
//! - `members`: people enrolled in a group
//! - `transactions`: the append-only money log
//! - `loans`: the loan book
//! - `fine_categories`, `fines`: penalty catalogue and issued fines
//! - `meetings`, `attendance`: meeting sheets
//! - `audit_entries`: field-level edit history of every record

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    Branch,
    Location,
    ShareValue,
    MinShares,
    MaxShares,
    CurrentCycleId,
    TotalSavings,
    TotalLoansOutstanding,
    TotalSolidarity,
    CreatedAt,
}

#[derive(Iden)]
enum GroupManagers {
    Table,
    UserId,
    GroupId,
}

#[derive(Iden)]
enum Cycles {
    Table,
    Id,
    GroupId,
    StartDate,
    EndDate,
    Status,
    InterestRate,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    GroupId,
    FullName,
    NationalId,
    Phone,
    Status,
    TotalShares,
    TotalLoans,
    JoinedOn,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    GroupId,
    MemberId,
    CycleId,
    Kind,
    Amount,
    OccurredOn,
    ShareCount,
    SolidarityAmount,
    Description,
    ReferenceId,
    IsVoid,
    VoidReason,
    VoidedBy,
    VoidedAt,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Loans {
    Table,
    Id,
    GroupId,
    MemberId,
    Principal,
    InterestRate,
    DurationMonths,
    TotalRepayable,
    Balance,
    Status,
    StartDate,
    DueDate,
    Purpose,
    CreatedAt,
}

#[derive(Iden)]
enum FineCategories {
    Table,
    Id,
    GroupId,
    Name,
    NameNorm,
    DefaultAmount,
}

#[derive(Iden)]
enum Fines {
    Table,
    Id,
    GroupId,
    MemberId,
    CycleId,
    CategoryId,
    Amount,
    PaidAmount,
    Status,
    Description,
    IssuedOn,
}

#[derive(Iden)]
enum Meetings {
    Table,
    Id,
    GroupId,
    CycleId,
    HeldOn,
    Kind,
    Notes,
}

#[derive(Iden)]
enum Attendance {
    Table,
    Id,
    MeetingId,
    GroupId,
    MemberId,
    Status,
}

#[derive(Iden)]
enum AuditEntries {
    Table,
    Id,
    TargetKind,
    TargetId,
    EditorId,
    Reason,
    Changes,
    RecordedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::Branch).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Groups::Location)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Groups::ShareValue).big_integer().not_null())
                    .col(ColumnDef::new(Groups::MinShares).big_integer().not_null())
                    .col(ColumnDef::new(Groups::MaxShares).big_integer().not_null())
                    .col(ColumnDef::new(Groups::CurrentCycleId).string())
                    .col(
                        ColumnDef::new(Groups::TotalSavings)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Groups::TotalLoansOutstanding)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Groups::TotalSolidarity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Groups::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-groups-name-unique")
                    .table(Groups::Table)
                    .col(Groups::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Group managers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupManagers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupManagers::UserId).string().not_null())
                    .col(ColumnDef::new(GroupManagers::GroupId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupManagers::UserId)
                            .col(GroupManagers::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_managers-user_id")
                            .from(GroupManagers::Table, GroupManagers::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_managers-group_id")
                            .from(GroupManagers::Table, GroupManagers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Cycles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Cycles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cycles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Cycles::GroupId).string().not_null())
                    .col(ColumnDef::new(Cycles::StartDate).date().not_null())
                    .col(ColumnDef::new(Cycles::EndDate).date())
                    .col(ColumnDef::new(Cycles::Status).string().not_null())
                    .col(ColumnDef::new(Cycles::InterestRate).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cycles-group_id")
                            .from(Cycles::Table, Cycles::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cycles-group_id-start_date")
                    .table(Cycles::Table)
                    .col(Cycles::GroupId)
                    .col(Cycles::StartDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Members::GroupId).string().not_null())
                    .col(ColumnDef::new(Members::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Members::NationalId)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Members::Phone).string().not_null().default(""))
                    .col(ColumnDef::new(Members::Status).string().not_null())
                    .col(
                        ColumnDef::new(Members::TotalShares)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Members::TotalLoans)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Members::JoinedOn).date().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-group_id")
                            .from(Members::Table, Members::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-group_id")
                    .table(Members::Table)
                    .col(Members::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::GroupId).string().not_null())
                    .col(ColumnDef::new(Transactions::MemberId).string())
                    .col(ColumnDef::new(Transactions::CycleId).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::OccurredOn).date().not_null())
                    .col(ColumnDef::new(Transactions::ShareCount).big_integer())
                    .col(ColumnDef::new(Transactions::SolidarityAmount).big_integer())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::ReferenceId).string())
                    .col(
                        ColumnDef::new(Transactions::IsVoid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::VoidReason).string())
                    .col(ColumnDef::new(Transactions::VoidedBy).string())
                    .col(ColumnDef::new(Transactions::VoidedAt).timestamp())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-group_id")
                            .from(Transactions::Table, Transactions::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-group_id-occurred_on-id")
                    .table(Transactions::Table)
                    .col(Transactions::GroupId)
                    .col(Transactions::OccurredOn)
                    .col(Transactions::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-member_id")
                    .table(Transactions::Table)
                    .col(Transactions::MemberId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Loans
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Loans::GroupId).string().not_null())
                    .col(ColumnDef::new(Loans::MemberId).string().not_null())
                    .col(ColumnDef::new(Loans::Principal).big_integer().not_null())
                    .col(ColumnDef::new(Loans::InterestRate).double().not_null())
                    .col(ColumnDef::new(Loans::DurationMonths).integer().not_null())
                    .col(
                        ColumnDef::new(Loans::TotalRepayable)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Loans::Balance).big_integer().not_null())
                    .col(ColumnDef::new(Loans::Status).string().not_null())
                    .col(ColumnDef::new(Loans::StartDate).date().not_null())
                    .col(ColumnDef::new(Loans::DueDate).date().not_null())
                    .col(ColumnDef::new(Loans::Purpose).string().not_null().default(""))
                    .col(ColumnDef::new(Loans::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-group_id")
                            .from(Loans::Table, Loans::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-member_id")
                            .from(Loans::Table, Loans::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-group_id-status")
                    .table(Loans::Table)
                    .col(Loans::GroupId)
                    .col(Loans::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Fine categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FineCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FineCategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FineCategories::GroupId).string().not_null())
                    .col(ColumnDef::new(FineCategories::Name).string().not_null())
                    .col(ColumnDef::new(FineCategories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(FineCategories::DefaultAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fine_categories-group_id")
                            .from(FineCategories::Table, FineCategories::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fine_categories-group_id-name_norm-unique")
                    .table(FineCategories::Table)
                    .col(FineCategories::GroupId)
                    .col(FineCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Fines
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Fines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Fines::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Fines::GroupId).string().not_null())
                    .col(ColumnDef::new(Fines::MemberId).string().not_null())
                    .col(ColumnDef::new(Fines::CycleId).string())
                    .col(ColumnDef::new(Fines::CategoryId).string().not_null())
                    .col(ColumnDef::new(Fines::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Fines::PaidAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Fines::Status).string().not_null())
                    .col(ColumnDef::new(Fines::Description).string())
                    .col(ColumnDef::new(Fines::IssuedOn).date().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fines-member_id")
                            .from(Fines::Table, Fines::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fines-category_id")
                            .from(Fines::Table, Fines::CategoryId)
                            .to(FineCategories::Table, FineCategories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fines-group_id")
                    .table(Fines::Table)
                    .col(Fines::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 10. Meetings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Meetings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meetings::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Meetings::GroupId).string().not_null())
                    .col(ColumnDef::new(Meetings::CycleId).string())
                    .col(ColumnDef::new(Meetings::HeldOn).date().not_null())
                    .col(ColumnDef::new(Meetings::Kind).string().not_null())
                    .col(ColumnDef::new(Meetings::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-meetings-group_id")
                            .from(Meetings::Table, Meetings::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 11. Attendance
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attendance::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attendance::MeetingId).string().not_null())
                    .col(ColumnDef::new(Attendance::GroupId).string().not_null())
                    .col(ColumnDef::new(Attendance::MemberId).string().not_null())
                    .col(ColumnDef::new(Attendance::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-attendance-meeting_id")
                            .from(Attendance::Table, Attendance::MeetingId)
                            .to(Meetings::Table, Meetings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-attendance-member_id")
                            .from(Attendance::Table, Attendance::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-attendance-meeting_id-member_id-unique")
                    .table(Attendance::Table)
                    .col(Attendance::MeetingId)
                    .col(Attendance::MemberId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 12. Audit entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEntries::TargetKind).string().not_null())
                    .col(ColumnDef::new(AuditEntries::TargetId).string().not_null())
                    .col(ColumnDef::new(AuditEntries::EditorId).string().not_null())
                    .col(ColumnDef::new(AuditEntries::Reason).string().not_null())
                    .col(ColumnDef::new(AuditEntries::Changes).text().not_null())
                    .col(
                        ColumnDef::new(AuditEntries::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-audit_entries-target")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::TargetKind)
                    .col(AuditEntries::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Meetings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Fines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FineCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cycles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupManagers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
