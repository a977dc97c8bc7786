//! SeaORM repository implementations

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use super::entity;
use super::mapper::{audit_from_models, result_active_model};
use crate::contract::{Audit, NewAudit};
use crate::domain::repository::AuditRepository;

pub struct SeaOrmAuditRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmAuditRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditRepository for SeaOrmAuditRepository {
    async fn create(&self, audit: NewAudit) -> Result<Audit> {
        let txn = self.db.begin().await?;

        let row = entity::Entity::insert(entity::ActiveModel::from(&audit))
            .exec_with_returning(&txn)
            .await?;

        if !audit.criterion_results.is_empty() {
            let rows = audit
                .criterion_results
                .iter()
                .map(|r| result_active_model(row.id, r));
            entity::result::Entity::insert_many(rows).exec(&txn).await?;
        }

        let results = entity::result::Entity::find()
            .filter(entity::result::Column::AuditId.eq(row.id))
            .order_by_asc(entity::result::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(audit_from_models(row, results))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Audit>> {
        let Some(row) = entity::Entity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };

        let results = entity::result::Entity::find()
            .filter(entity::result::Column::AuditId.eq(id))
            .order_by_asc(entity::result::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(Some(audit_from_models(row, results)))
    }

    async fn list_all(&self) -> Result<Vec<Audit>> {
        let rows = entity::Entity::find()
            .order_by_desc(entity::Column::FetchedAt)
            .order_by_desc(entity::Column::Id)
            .all(&*self.db)
            .await?;

        let results = rows.load_many(entity::result::Entity, &*self.db).await?;

        Ok(rows
            .into_iter()
            .zip(results)
            .map(|(row, results)| audit_from_models(row, results))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let txn = self.db.begin().await?;

        // SQLite only honours the cascade with foreign_keys enabled
        entity::result::Entity::delete_many()
            .filter(entity::result::Column::AuditId.eq(id))
            .exec(&txn)
            .await?;
        let res = entity::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }
}
