use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Attendance, AuditEntry, AuditTarget, Cycle, EngineError, Fine, FineCategory, Group, Loan,
    Meeting, Member, ResultEngine, Transaction, attendance, audit, cycles, fine_categories, fines,
    groups, loans, meetings, members, scope::Resource, transactions,
};

use super::Engine;

/// Generates a `require_*` lookup returning the domain value, or
/// `KeyNotFound` when the row does not exist.
macro_rules! impl_require {
    ($require_fn:ident, $module:ident, $domain:ty, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<$domain> {
            let model = $module::Entity::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))?;
            <$domain>::try_from(model)
        }
    };
}

/// Generates a `save_*` writer persisting every column of a domain value.
macro_rules! impl_save {
    ($save_fn:ident, $module:ident, $domain:ty) => {
        pub(super) async fn $save_fn(
            &self,
            db: &DatabaseTransaction,
            value: &$domain,
        ) -> ResultEngine<()> {
            $module::ActiveModel::from(value).update(db).await?;
            Ok(())
        }
    };
}

/// Generates a `*_of_group` loader over a group-owned table.
macro_rules! impl_group_rows {
    ($load_fn:ident, $module:ident, $domain:ty) => {
        pub(super) async fn $load_fn(
            &self,
            db: &DatabaseTransaction,
            group_id: Uuid,
        ) -> ResultEngine<Vec<$domain>> {
            $module::Entity::find()
                .filter($module::Column::GroupId.eq(group_id.to_string()))
                .all(db)
                .await?
                .into_iter()
                .map(<$domain>::try_from)
                .collect()
        }
    };
}

impl Engine {
    impl_require!(require_group, groups, Group, "group not exists");
    impl_require!(require_member, members, Member, "member not exists");
    impl_require!(require_cycle, cycles, Cycle, "cycle not exists");
    impl_require!(require_loan, loans, Loan, "loan not exists");
    impl_require!(
        require_transaction,
        transactions,
        Transaction,
        "transaction not exists"
    );
    impl_require!(require_fine, fines, Fine, "fine not exists");
    impl_require!(
        require_fine_category,
        fine_categories,
        FineCategory,
        "fine category not exists"
    );
    impl_require!(require_meeting, meetings, Meeting, "meeting not exists");
    impl_require!(
        require_attendance,
        attendance,
        Attendance,
        "attendance not exists"
    );

    impl_save!(save_group, groups, Group);
    impl_save!(save_member, members, Member);
    impl_save!(save_cycle, cycles, Cycle);
    impl_save!(save_loan, loans, Loan);
    impl_save!(save_transaction, transactions, Transaction);
    impl_save!(save_fine, fines, Fine);
    impl_save!(save_attendance, attendance, Attendance);

    impl_group_rows!(members_of_group, members, Member);
    impl_group_rows!(loans_of_group, loans, Loan);
    impl_group_rows!(fines_of_group, fines, Fine);

    /// Full transaction log of a group, oldest first.
    pub(super) async fn transactions_of_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(transactions::Column::OccurredOn)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// A member that must belong to `group_id`. Members of other groups are
    /// reported as missing.
    pub(super) async fn require_member_in_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        member_id: Uuid,
    ) -> ResultEngine<Member> {
        let member = self.require_member(db, member_id).await?;
        if member.group_id != group_id {
            return Err(EngineError::KeyNotFound("member not exists".to_string()));
        }
        Ok(member)
    }

    /// The group's open cycle. Deposits and meetings need one.
    pub(super) async fn require_open_cycle(
        &self,
        db: &DatabaseTransaction,
        group: &Group,
    ) -> ResultEngine<Cycle> {
        let cycle_id = group.current_cycle_id.ok_or_else(|| {
            EngineError::InvalidState(format!("group {} has no open cycle", group.name))
        })?;
        let cycle = self.require_cycle(db, cycle_id).await?;
        if !cycle.is_open() {
            return Err(EngineError::InvalidState(format!(
                "group {} has no open cycle",
                group.name
            )));
        }
        Ok(cycle)
    }

    pub(super) async fn append_audit(
        &self,
        db: &DatabaseTransaction,
        entry: &AuditEntry,
    ) -> ResultEngine<()> {
        audit::ActiveModel::try_from(entry)?.insert(db).await?;
        Ok(())
    }

    /// Audit entries of one record, oldest first.
    pub(super) async fn history_of(
        &self,
        db: &DatabaseTransaction,
        target: AuditTarget,
        target_id: Uuid,
    ) -> ResultEngine<Vec<AuditEntry>> {
        audit::Entity::find()
            .filter(audit::Column::TargetKind.eq(target.as_str()))
            .filter(audit::Column::TargetId.eq(target_id.to_string()))
            .order_by_asc(audit::Column::RecordedAt)
            .all(db)
            .await?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }

    /// Group owning an id-addressed record.
    pub(super) async fn group_of_in(
        &self,
        db: &DatabaseTransaction,
        resource: Resource,
    ) -> ResultEngine<Uuid> {
        let group_id = match resource {
            Resource::Group(id) => self.require_group(db, id).await?.id,
            Resource::Member(id) => self.require_member(db, id).await?.group_id,
            Resource::Cycle(id) => self.require_cycle(db, id).await?.group_id,
            Resource::Loan(id) => self.require_loan(db, id).await?.group_id,
            Resource::Transaction(id) => self.require_transaction(db, id).await?.group_id,
            Resource::Fine(id) => self.require_fine(db, id).await?.group_id,
            Resource::FineCategory(id) => self.require_fine_category(db, id).await?.group_id,
            Resource::Meeting(id) => self.require_meeting(db, id).await?.group_id,
            Resource::Attendance(id) => self.require_attendance(db, id).await?.group_id,
        };
        Ok(group_id)
    }
}
