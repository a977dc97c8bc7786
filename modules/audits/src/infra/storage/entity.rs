//! SeaORM entities for database tables

use sea_orm::entity::prelude::*;

/// Audits table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "website_audits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub url: String,

    pub fetched_at: DateTimeUtc,

    /// HTTP status of the static fetch
    pub status_code: Option<i32>,

    pub elapsed_ms: Option<i64>,

    pub page_title: Option<String>,

    /// Coverage-penalized score on the 0..2 scale
    pub score: Option<f64>,

    /// Per-code map, score breakdown and recommendations
    pub results: Json,

    pub raw: bool,

    pub rendered: bool,

    pub ai: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "result::Entity")]
    Results,
}

impl Related<result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Criterion results module
pub mod result {
    use sea_orm::entity::prelude::*;

    /// Per-criterion results table entity
    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "website_audit_results")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub audit_id: i64,

        /// WCAG code, unique per audit
        pub code: String,

        pub title: String,

        /// A, AA or AAA; empty for legacy rows
        pub level: String,

        pub principle: String,

        pub verdict: String,

        pub source: String,

        /// NULL for not applicable
        pub score: Option<i16>,

        pub score_hint: Option<f64>,

        pub details: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::AuditId",
            to = "super::Column::Id",
            on_delete = "Cascade"
        )]
        Audit,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Audit.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
