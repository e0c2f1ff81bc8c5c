use crate::entities::{
    production_models, production_posts, staged_media, staged_models, staged_posts, sync_runs,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema,
};
use std::env;
use std::time::Duration;
use tracing::info;

/// Indexes SeaORM cannot derive from the entities (compound keys, plain lookups)
const SQLITE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_staged_posts_model_folder ON staged_posts(model_id, folder_name)",
    "CREATE INDEX IF NOT EXISTS idx_staged_media_post_id ON staged_media(post_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_production_posts_model_key ON production_posts(model_id, object_key)",
    "CREATE INDEX IF NOT EXISTS idx_sync_runs_started_at ON sync_runs(started_at)",
];

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url =
        env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();

    if builder == DatabaseBackend::Postgres {
        info!("🔄 Running SQLx migrations for PostgreSQL...");
        let pool = db.get_postgres_connection_pool();
        sqlx::migrate!("./migrations").run(pool).await?;
        return Ok(());
    }

    info!("🔄 Running SeaORM auto-migrations for SQLite/Other...");
    let schema = Schema::new(builder);

    // Order matters for foreign keys: models -> posts -> media, production models -> posts
    let stmts = vec![
        (
            "staged_models",
            schema
                .create_table_from_entity(staged_models::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "staged_posts",
            schema
                .create_table_from_entity(staged_posts::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "staged_media",
            schema
                .create_table_from_entity(staged_media::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "production_models",
            schema
                .create_table_from_entity(production_models::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "production_posts",
            schema
                .create_table_from_entity(production_posts::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "sync_runs",
            schema
                .create_table_from_entity(sync_runs::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        db.execute(builder.build(&stmt)).await?;
        info!("   - Table '{}' checked/created", name);
    }

    for query in SQLITE_INDEXES {
        db.execute(sea_orm::Statement::from_string(builder, query.to_string()))
            .await?;
    }

    Ok(())
}
