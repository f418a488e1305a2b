/// Schema migration tests
///
/// Require `DATABASE_URL`; each test returns early when it is unset.

use crm_shared::db::migrations::{ensure_database_exists, get_migration_status, run_migrations};
use sqlx::PgPool;

async fn connect() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    ensure_database_exists(&url)
        .await
        .expect("Database should exist or be creatable");
    Some(PgPool::connect(&url).await.expect("Failed to connect"))
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let Some(pool) = connect().await else {
        return;
    };

    run_migrations(&pool).await.expect("First run should succeed");
    let first = get_migration_status(&pool).await.unwrap();

    run_migrations(&pool).await.expect("Second run should succeed");
    let second = get_migration_status(&pool).await.unwrap();

    assert!(first.applied_migrations >= 1);
    assert_eq!(first.applied_migrations, second.applied_migrations);
    assert_eq!(first.latest_version, second.latest_version);
}

#[tokio::test]
async fn test_migration_creates_all_tables() {
    let Some(pool) = connect().await else {
        return;
    };
    run_migrations(&pool).await.unwrap();

    for table in [
        "users",
        "customers",
        "leads",
        "sales",
        "tasks",
        "activities",
        "notifications",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(exists, "Table {} should exist", table);
    }
}

#[tokio::test]
async fn test_migration_creates_enums() {
    let Some(pool) = connect().await else {
        return;
    };
    run_migrations(&pool).await.unwrap();

    let labels: Vec<String> = sqlx::query_scalar(
        "SELECT e.enumlabel::text FROM pg_enum e \
         JOIN pg_type t ON t.oid = e.enumtypid \
         WHERE t.typname = 'lead_status' ORDER BY e.enumsortorder",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(labels, ["new", "contacted", "qualified", "converted", "lost"]);

    for type_name in [
        "user_role",
        "record_source",
        "customer_status",
        "sale_status",
        "task_priority",
        "task_status",
        "notification_kind",
    ] {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_type WHERE typname = $1)")
                .bind(type_name)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(exists, "Type {} should exist", type_name);
    }
}
