//! Database migrations for the audits module

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_website_audits::Migration),
            Box::new(m20250301_000002_create_website_audit_results::Migration),
        ]
    }
}

mod m20250301_000001_create_website_audits {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_website_audits"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WebsiteAudits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WebsiteAudits::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(WebsiteAudits::Url).string_len(2048).not_null())
                        .col(
                            ColumnDef::new(WebsiteAudits::FetchedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(WebsiteAudits::StatusCode).integer())
                        .col(ColumnDef::new(WebsiteAudits::ElapsedMs).big_integer())
                        .col(ColumnDef::new(WebsiteAudits::PageTitle).string_len(512))
                        .col(ColumnDef::new(WebsiteAudits::Score).double())
                        .col(ColumnDef::new(WebsiteAudits::Results).json().not_null())
                        .col(
                            ColumnDef::new(WebsiteAudits::Raw)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(WebsiteAudits::Rendered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WebsiteAudits::Ai)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_website_audits_fetched_at")
                        .table(WebsiteAudits::Table)
                        .col(WebsiteAudits::FetchedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WebsiteAudits::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WebsiteAudits {
        Table,
        Id,
        Url,
        FetchedAt,
        StatusCode,
        ElapsedMs,
        PageTitle,
        Score,
        Results,
        Raw,
        Rendered,
        Ai,
    }
}

mod m20250301_000002_create_website_audit_results {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_website_audit_results"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WebsiteAuditResults::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WebsiteAuditResults::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(WebsiteAuditResults::AuditId).big_integer().not_null())
                        .col(ColumnDef::new(WebsiteAuditResults::Code).string_len(16).not_null())
                        .col(ColumnDef::new(WebsiteAuditResults::Title).string_len(255).not_null())
                        .col(ColumnDef::new(WebsiteAuditResults::Level).string_len(3).not_null())
                        .col(ColumnDef::new(WebsiteAuditResults::Principle).string_len(32).not_null())
                        .col(ColumnDef::new(WebsiteAuditResults::Verdict).string_len(8).not_null())
                        .col(
                            ColumnDef::new(WebsiteAuditResults::Source)
                                .string_len(16)
                                .not_null()
                                .default("raw"),
                        )
                        .col(ColumnDef::new(WebsiteAuditResults::Score).small_integer())
                        .col(ColumnDef::new(WebsiteAuditResults::ScoreHint).double())
                        .col(ColumnDef::new(WebsiteAuditResults::Details).json().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_website_audit_results_audit")
                                .from(WebsiteAuditResults::Table, WebsiteAuditResults::AuditId)
                                .to(WebsiteAudits::Table, WebsiteAudits::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_website_audit_results_audit_code")
                        .table(WebsiteAuditResults::Table)
                        .col(WebsiteAuditResults::AuditId)
                        .col(WebsiteAuditResults::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_website_audit_results_code")
                        .table(WebsiteAuditResults::Table)
                        .col(WebsiteAuditResults::Code)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WebsiteAuditResults::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WebsiteAuditResults {
        Table,
        Id,
        AuditId,
        Code,
        Title,
        Level,
        Principle,
        Verdict,
        Source,
        Score,
        ScoreHint,
        Details,
    }

    #[derive(DeriveIden)]
    enum WebsiteAudits {
        Table,
        Id,
    }
}
