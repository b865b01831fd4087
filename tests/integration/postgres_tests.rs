//! Storage tests against a live PostgreSQL database
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_tests -- --ignored
//!
//! Every test creates its own equipment under a unique category, so runs can
//! share a database.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;

use equipment_lending_server::{
    error::AppError,
    models::{
        equipment::{EquipmentInput, EquipmentSearch},
        request::{BorrowRequest, CreateBorrowRequest, RequestStatus},
        user::{Identity, Role},
    },
    repository::Repository,
    services::{auth::JwtVerifier, Services},
};

async fn connect() -> Option<Services> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    Some(Services::with_verifier(
        Repository::postgres(pool),
        Arc::new(JwtVerifier::new("unused", 1)),
    ))
}

fn unique(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn input(name: &str, category: &str, quantity: i32) -> EquipmentInput {
    EquipmentInput {
        name: name.to_string(),
        category: category.to_string(),
        description: Some(format!("{} for coursework", name)),
        condition: Some("good".to_string()),
        location: None,
        quantity,
        specifications: vec!["Battery included".to_string()],
        usage_instructions: None,
        restrictions: None,
        last_maintenance: None,
        maintenance_interval: Some(90),
    }
}

fn staff() -> Identity {
    Identity::new("staff@campus.edu", Role::Staff)
}

async fn submit(services: &Services, requester: &str, equipment_id: i32) -> BorrowRequest {
    services
        .requests
        .create(
            &Identity::new(requester, Role::Student),
            CreateBorrowRequest {
                requester_id: None,
                requester_name: Some("Test Student".to_string()),
                equipment_id,
                request_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
                return_date: NaiveDate::from_ymd_opt(2026, 3, 8).expect("valid date"),
                notes: None,
            },
        )
        .await
        .expect("Failed to create request")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_approvals_reserve_once() {
    let Some(services) = connect().await else { return };
    let services = Arc::new(services);
    let category = unique("race");

    let equipment = services
        .equipment
        .create(&input("Oscilloscope", &category, 1))
        .await
        .expect("Failed to create equipment");

    let mut pending = Vec::new();
    for i in 0..16 {
        let request = submit(&services, &format!("student{}@campus.edu", i), equipment.id).await;
        pending.push(request.id);
    }

    let handles: Vec<_> = pending
        .into_iter()
        .map(|id| {
            let services = services.clone();
            tokio::spawn(async move {
                let result = services.approvals.approve(&staff(), id, None).await;
                result
            })
        })
        .collect();

    let mut approved = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(request) => {
                assert_eq!(request.status, RequestStatus::Approved);
                approved += 1;
            }
            Err(AppError::InsufficientAvailability(_)) => insufficient += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(approved, 1);
    assert_eq!(insufficient, 15);

    let equipment = services.equipment.get_by_id(equipment.id).await.unwrap();
    assert_eq!(equipment.available, 0);

    // Status filter goes through `status = ANY($1)` and the TEXT round trip
    let mine = |rows: Vec<BorrowRequest>| {
        rows.into_iter()
            .filter(|r| r.equipment_id == equipment.id)
            .count()
    };
    let approved_rows = services.approvals.list_by_status("approved").await.unwrap();
    assert_eq!(mine(approved_rows), 1);
    let pending_rows = services.approvals.list_by_status("PENDING").await.unwrap();
    assert_eq!(mine(pending_rows), 15);
}

#[tokio::test]
#[ignore]
async fn test_lending_scenario() {
    let Some(services) = connect().await else { return };
    let category = unique("scenario");

    let equipment = services
        .equipment
        .create(&input("Camera", &category, 2))
        .await
        .unwrap();
    assert_eq!(equipment.available, 2);
    assert!(equipment.last_maintenance.is_some());

    let a = submit(&services, "a@campus.edu", equipment.id).await;
    let b = submit(&services, "b@campus.edu", equipment.id).await;
    assert_eq!(a.status, RequestStatus::Pending);

    let a = services.approvals.approve(&staff(), a.id, None).await.unwrap();
    assert_eq!(a.status, RequestStatus::Approved);
    assert_eq!(a.reviewed_by.as_deref(), Some("staff@campus.edu"));
    assert_eq!(services.equipment.get_by_id(equipment.id).await.unwrap().available, 1);

    let b = services
        .requests
        .update_status(&staff(), b.id, RequestStatus::Approved)
        .await
        .unwrap();
    assert_eq!(b.status, RequestStatus::Approved);
    assert_eq!(services.equipment.get_by_id(equipment.id).await.unwrap().available, 0);

    let c = submit(&services, "c@campus.edu", equipment.id).await;
    assert!(matches!(
        services.approvals.approve(&staff(), c.id, None).await,
        Err(AppError::InsufficientAvailability(_))
    ));
    let c = services.requests.get(&staff(), c.id).await.unwrap();
    assert_eq!(c.status, RequestStatus::Pending);
    assert!(c.reviewed_by.is_none());

    let a = services
        .requests
        .return_request(&Identity::new("a@campus.edu", Role::Student), a.id)
        .await
        .unwrap();
    assert_eq!(a.status, RequestStatus::Returned);
    assert_eq!(services.equipment.get_by_id(equipment.id).await.unwrap().available, 1);

    // Terminal states refuse further transitions and leave inventory alone
    assert!(matches!(
        services
            .requests
            .update_status(&staff(), a.id, RequestStatus::Overdue)
            .await,
        Err(AppError::InvalidTransition(_))
    ));
    assert_eq!(services.equipment.get_by_id(equipment.id).await.unwrap().available, 1);

    // An edit resets available to quantity; the next release is clamped
    services
        .equipment
        .update(equipment.id, &input("Camera", &category, 2))
        .await
        .unwrap();
    services
        .requests
        .update_status(&staff(), b.id, RequestStatus::Returned)
        .await
        .unwrap();
    let updated = services.equipment.get_by_id(equipment.id).await.unwrap();
    assert_eq!(updated.available, 2);
    assert_eq!(updated.quantity, 2);
    assert_eq!(updated.last_maintenance, equipment.last_maintenance);
}

#[tokio::test]
#[ignore]
async fn test_failed_reservation_rolls_back() {
    let Some(services) = connect().await else { return };
    let category = unique("rollback");

    let equipment = services
        .equipment
        .create(&input("Projector", &category, 1))
        .await
        .unwrap();
    let request = submit(&services, "d@campus.edu", equipment.id).await;
    services.equipment.delete(equipment.id).await.unwrap();

    assert!(matches!(
        services.approvals.approve(&staff(), request.id, None).await,
        Err(AppError::NotFound(_))
    ));

    let request = services.requests.get(&staff(), request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.reviewed_by.is_none());
    assert!(request.reviewed_at.is_none());
}

#[tokio::test]
#[ignore]
async fn test_search_treats_wildcards_literally() {
    let Some(services) = connect().await else { return };
    let category = unique("search");

    services
        .equipment
        .create(&input("Lens 100% coverage", &category, 1))
        .await
        .unwrap();
    services
        .equipment
        .create(&input("Lens 1000 series", &category, 1))
        .await
        .unwrap();
    services
        .equipment
        .create(&input("Lens_cap", &category, 1))
        .await
        .unwrap();

    let search = |q: &str| EquipmentSearch {
        q: Some(q.to_string()),
        category: Some(category.to_uppercase()),
    };

    let rows = services.equipment.search(&search("100%")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Lens 100% coverage");

    let rows = services.equipment.search(&search("0_s")).await.unwrap();
    assert!(rows.is_empty());

    let rows = services.equipment.search(&search("COURSEWORK")).await.unwrap();
    assert_eq!(rows.len(), 3);
}
