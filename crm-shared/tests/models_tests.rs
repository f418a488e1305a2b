/// Model queries against a real database
///
/// Require `DATABASE_URL`; each test returns early when it is unset. Every
/// test works under a freshly created user.

use crm_shared::{
    db::migrations::run_migrations,
    models::{
        activity::{kinds, Activity, ActivityFilter, NewActivity},
        customer::{Customer, CustomerFilter, CustomerInput, CustomerStatus, RecordSource},
        lead::{Lead, LeadInput, LeadStatus},
        notification::{NewNotification, Notification, NotificationKind},
        sale::{Sale, SaleInput, SaleStatus},
        search::search,
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::{CreateUser, User},
    },
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn setup() -> Option<(PgPool, User)> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    run_migrations(&pool).await.expect("Migrations should apply");

    let user = User::create(
        &pool,
        CreateUser {
            name: "Model Tester".to_string(),
            email: format!("Model-{}@Example.com", Uuid::new_v4()),
            password_hash: "$argon2id$not-a-real-hash".to_string(),
            company: None,
            phone: None,
        },
    )
    .await
    .unwrap();

    Some((pool, user))
}

fn customer(name: &str) -> CustomerInput {
    CustomerInput {
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_user_email_is_stored_lowercase_and_unique() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    assert_eq!(user.email, user.email.to_lowercase());

    let found = User::find_by_email(&pool, &user.email.to_uppercase())
        .await
        .unwrap()
        .expect("Lookup should ignore case");
    assert_eq!(found.id, user.id);

    let err = User::create(
        &pool,
        CreateUser {
            name: "Copy".to_string(),
            email: user.email.clone(),
            password_hash: "x".to_string(),
            company: None,
            phone: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false));
}

#[tokio::test]
async fn test_refresh_token_fingerprint_round_trip() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    User::set_refresh_token(&pool, user.id, "abc123").await.unwrap();
    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token_matches("abc123"));
    assert!(!stored.refresh_token_matches("other"));

    User::clear_refresh_token(&pool, user.id).await.unwrap();
    let cleared = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(!cleared.refresh_token_matches("abc123"));
}

#[tokio::test]
async fn test_customer_listing_is_owner_scoped_and_filtered() {
    let Some((pool, user)) = setup().await else {
        return;
    };
    let Some((_, stranger)) = setup().await else {
        return;
    };

    Customer::create(&pool, user.id, customer("Acme")).await.unwrap();
    Customer::create(
        &pool,
        user.id,
        CustomerInput {
            status: CustomerStatus::Inactive,
            ..customer("Globex")
        },
    )
    .await
    .unwrap();
    Customer::create(&pool, stranger.id, customer("Initech")).await.unwrap();

    let all = Customer::list_by_owner(&pool, user.id, &CustomerFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Globex", "Newest first");

    let inactive = Customer::list_by_owner(
        &pool,
        user.id,
        &CustomerFilter {
            status: Some(CustomerStatus::Inactive),
        },
    )
    .await
    .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].name, "Globex");
}

#[tokio::test]
async fn test_deleting_customer_removes_its_sales() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let acme = Customer::create(&pool, user.id, customer("Acme")).await.unwrap();
    let sale = Sale::create(
        &pool,
        user.id,
        SaleInput {
            customer_id: acme.id,
            description: "Annual plan".to_string(),
            amount: 1200.0,
            status: SaleStatus::Paid,
            sale_date: None,
        },
    )
    .await
    .unwrap();

    assert!(Customer::delete(&pool, acme.id).await.unwrap());
    assert!(Sale::find_by_id(&pool, sale.id).await.unwrap().is_none());
    assert!(!Customer::delete(&pool, acme.id).await.unwrap());
}

#[tokio::test]
async fn test_negative_sale_amount_violates_check() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let acme = Customer::create(&pool, user.id, customer("Acme")).await.unwrap();
    let err = Sale::create(
        &pool,
        user.id,
        SaleInput {
            customer_id: acme.id,
            description: "Refund".to_string(),
            amount: -1.0,
            status: SaleStatus::Pending,
            sale_date: None,
        },
    )
    .await
    .unwrap_err();

    assert!(err
        .as_database_error()
        .map(|e| e.is_check_violation())
        .unwrap_or(false));
}

#[tokio::test]
async fn test_convert_lead_links_both_records() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let lead = Lead::create(
        &pool,
        user.id,
        LeadInput {
            name: "Bruno".to_string(),
            email: Some("bruno@example.com".to_string()),
            company: Some("Initech".to_string()),
            source: RecordSource::Event,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(lead.status, LeadStatus::New);

    let (converted, customer) = lead.convert(&pool).await.unwrap().unwrap();

    assert_eq!(converted.status, LeadStatus::Converted);
    assert_eq!(converted.customer_id, Some(customer.id));
    assert_eq!(customer.lead_id, Some(lead.id));
    assert_eq!(customer.source, RecordSource::Lead);
    assert_eq!(customer.status, CustomerStatus::Active);
    assert_eq!(customer.company.as_deref(), Some("Initech"));
    assert_eq!(customer.owner_id, user.id);

    assert!(lead.convert(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_conversions_create_one_customer() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let lead = Lead::create(
        &pool,
        user.id,
        LeadInput {
            name: "Carla".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            let lead = lead.clone();
            tokio::spawn(async move { lead.convert(&pool).await.unwrap() })
        })
        .collect();

    let mut converted = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            converted += 1;
        }
    }
    assert_eq!(converted, 1);

    let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE lead_id = $1")
        .bind(lead.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(customers, 1);
}

#[tokio::test]
async fn test_task_completion_timestamps() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let task = Task::create(
        &pool,
        user.id,
        CreateTask {
            title: "Send proposal".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(task.kind, "general");
    assert!(task.completed_at.is_none());

    let done = task
        .update(
            &pool,
            UpdateTask {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.title, "Send proposal");
    assert!(done.completed_at.is_some());

    let reopened = done
        .update(
            &pool,
            UpdateTask {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn test_notification_read_state() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    for title in ["One", "Two"] {
        Notification::create(
            &pool,
            user.id,
            NewNotification::new(NotificationKind::Info, title, "Body"),
        )
        .await
        .unwrap();
    }
    assert_eq!(Notification::count_unread(&pool, user.id).await.unwrap(), 2);

    let first = Notification::list_by_owner(&pool, user.id, &Default::default())
        .await
        .unwrap()
        .remove(0);
    let read = Notification::set_read(&pool, first.id, true)
        .await
        .unwrap()
        .unwrap();
    assert!(read.read);
    assert!(read.read_at.is_some());
    assert_eq!(Notification::count_unread(&pool, user.id).await.unwrap(), 1);

    assert_eq!(Notification::mark_all_read(&pool, user.id).await.unwrap(), 1);
    assert_eq!(Notification::count_unread(&pool, user.id).await.unwrap(), 0);

    let unread = Notification::set_read(&pool, first.id, false)
        .await
        .unwrap()
        .unwrap();
    assert!(unread.read_at.is_none());
}

#[tokio::test]
async fn test_activity_log_filters_by_kind() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    Activity::record(
        &pool,
        user.id,
        NewActivity::new(kinds::CUSTOMER_CREATED, "Customer Acme created")
            .metadata(json!({ "source": "test" })),
    )
    .await
    .unwrap();
    Activity::record(&pool, user.id, NewActivity::new(kinds::EXPORT, "Exported sales"))
        .await
        .unwrap();

    let exports = Activity::list_by_owner(
        &pool,
        user.id,
        &ActivityFilter {
            limit: None,
            kind: Some(kinds::EXPORT.to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].description, "Exported sales");

    let recent = Activity::recent(&pool, user.id).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].metadata.0["source"], "test");
}

#[tokio::test]
async fn test_search_matches_across_kinds() {
    let Some((pool, user)) = setup().await else {
        return;
    };

    let acme = Customer::create(&pool, user.id, customer("Acme Industries")).await.unwrap();
    Lead::create(
        &pool,
        user.id,
        LeadInput {
            name: "Ana".to_string(),
            company: Some("ACME Labs".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    Sale::create(
        &pool,
        user.id,
        SaleInput {
            customer_id: acme.id,
            description: "Acme renewal".to_string(),
            amount: 99.0,
            status: SaleStatus::Pending,
            sale_date: None,
        },
    )
    .await
    .unwrap();

    let results = search(&pool, user.id, " acme ").await.unwrap();
    assert_eq!(results.customers.len(), 1);
    assert_eq!(results.leads.len(), 1);
    assert_eq!(results.sales.len(), 1);
    assert_eq!(results.total, 3);

    let none = search(&pool, user.id, "zzz-no-match").await.unwrap();
    assert_eq!(none.total, 0);
}
