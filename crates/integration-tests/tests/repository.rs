//! Repository behavior against `PostgreSQL`.
//!
//! These tests require a migrated database in `CRM_DATABASE_URL`:
//!
//! ```bash
//! cargo run -p clients-finder-cli -- migrate
//! cargo test -p clients-finder-integration-tests -- --ignored
//! ```
//!
//! Every test tags its rows with a fresh UUID and filters on it, so runs do
//! not interfere with each other or with existing data.

use clients_finder_core::{ClientStatus, DeliveryStatus, EmailAddress, EmailMethod};
use clients_finder_integration_tests::{insert_client, sample_client, test_pool};
use clients_finder_server::db::{
    ClientFilter, ClientRepository, Direction, EmailHistoryRepository, InsertOutcome,
    NoteRepository, RepositoryError,
};
use clients_finder_server::services::{OutgoingEmail, OutreachService};

fn tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn tagged_filter(tag: &str) -> ClientFilter {
    ClientFilter {
        search_words: vec![tag.to_string()],
        ..ClientFilter::default()
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_insert_is_idempotent_on_place_id() {
    let pool = test_pool().await;
    let repo = ClientRepository::new(&pool);
    let client = sample_client("Idempotent Cafe");

    let first = repo.insert(&client).await.expect("first insert");
    assert!(matches!(first, InsertOutcome::Inserted(_)));

    let second = repo.insert(&client).await.expect("second insert");
    assert_eq!(second, InsertOutcome::AlreadyExists);

    let stored = repo
        .find_by_place_id(&client.place_id)
        .await
        .expect("lookup");
    if let InsertOutcome::Inserted(id) = first {
        assert_eq!(stored, Some(id));
        repo.delete(id).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_filters_narrow_results() {
    let pool = test_pool().await;
    let repo = ClientRepository::new(&pool);
    let tag = tag();

    let mut with_site = sample_client(&format!("Everest Lodge {tag}"));
    with_site.website = Some("https://everestlodge.example".to_string());
    let mut with_phone = sample_client(&format!("Annapurna Gym {tag}"));
    with_phone.phone = Some("+977 61-000000".to_string());
    with_phone.city = Some("Pokhara".to_string());
    let mut blank_site = sample_client(&format!("Blank Site Cafe {tag}"));
    blank_site.website = Some(String::new());

    let ids = [
        insert_client(&pool, &with_site).await,
        insert_client(&pool, &with_phone).await,
        insert_client(&pool, &blank_site).await,
    ];

    let all = tagged_filter(&tag);
    assert_eq!(repo.count(&all).await.expect("count"), 3);

    let websites = ClientFilter {
        has_website: Some(true),
        ..tagged_filter(&tag)
    };
    let found = repo.list(&websites, None, None).await.expect("list");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ids[0]);

    let no_website = ClientFilter {
        has_website: Some(false),
        ..tagged_filter(&tag)
    };
    assert_eq!(repo.count(&no_website).await.expect("count"), 2);

    let pokhara = ClientFilter {
        city: Some("pokh".to_string()),
        ..tagged_filter(&tag)
    };
    let found = repo.list(&pokhara, None, None).await.expect("list");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ids[1]);

    // Every search word must match some column.
    let two_words = ClientFilter {
        search_words: vec![tag.clone(), "lodge".to_string()],
        ..ClientFilter::default()
    };
    assert_eq!(repo.count(&two_words).await.expect("count"), 1);

    let page = repo.list(&all, Some(2), Some(1)).await.expect("page");
    assert_eq!(page.len(), 2);
    // Newest first: offset 1 skips the last insert.
    assert_eq!(page[0].id, ids[1]);

    for id in ids {
        repo.delete(id).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_navigation_wraps_within_filter() {
    let pool = test_pool().await;
    let repo = ClientRepository::new(&pool);
    let tag = tag();

    let mut ids = Vec::new();
    for name in ["First", "Second", "Third"] {
        ids.push(insert_client(&pool, &sample_client(&format!("{name} {tag}"))).await);
    }
    let filter = tagged_filter(&tag);

    let next = repo
        .adjacent(ids[0], Direction::Next, &filter)
        .await
        .expect("next");
    assert_eq!(next, Some(ids[1]));

    let wrapped = repo
        .adjacent(ids[2], Direction::Next, &filter)
        .await
        .expect("wrap");
    assert_eq!(wrapped, Some(ids[0]));

    let prev = repo
        .adjacent(ids[0], Direction::Prev, &filter)
        .await
        .expect("prev");
    assert_eq!(prev, Some(ids[2]));

    for id in &ids {
        repo.delete(*id).await.expect("cleanup");
    }
    assert!(matches!(
        repo.adjacent(ids[0], Direction::Next, &filter).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_navigation_visits_clients_sharing_a_timestamp() {
    let pool = test_pool().await;
    let repo = ClientRepository::new(&pool);
    let tag = tag();

    let mut ids = Vec::new();
    for name in ["Twin A", "Twin B", "Later"] {
        ids.push(insert_client(&pool, &sample_client(&format!("{name} {tag}"))).await);
    }
    sqlx::query(
        "UPDATE clients SET created_at = TIMESTAMPTZ '2024-06-10 06:13:20+00' \
         WHERE id = ANY($1)",
    )
    .bind(vec![ids[0].as_i32(), ids[1].as_i32()])
    .execute(&pool)
    .await
    .expect("align timestamps");
    let filter = tagged_filter(&tag);

    let next = repo
        .adjacent(ids[0], Direction::Next, &filter)
        .await
        .expect("next");
    assert_eq!(next, Some(ids[1]));

    let prev = repo
        .adjacent(ids[1], Direction::Prev, &filter)
        .await
        .expect("prev");
    assert_eq!(prev, Some(ids[0]));

    for id in ids {
        repo.delete(id).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_notes_are_scoped_and_cascade() {
    let pool = test_pool().await;
    let notes = NoteRepository::new(&pool);
    let owner = insert_client(&pool, &sample_client("Note Owner")).await;
    let other = insert_client(&pool, &sample_client("Other Client")).await;

    let note = notes
        .create(owner, "Owner wants a booking page")
        .await
        .expect("create");
    notes
        .create(owner, "Follow up after Dashain")
        .await
        .expect("create");

    let listed = notes.list_for_client(owner).await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].content, "Follow up after Dashain");

    // A note cannot be edited through another client.
    assert!(matches!(
        notes.update(other, note.id, "hijacked").await,
        Err(RepositoryError::NotFound)
    ));

    let edited = notes
        .update(owner, note.id, "Owner wants a booking page and menu")
        .await
        .expect("update");
    assert!(edited.updated_at >= edited.created_at);

    let clients = ClientRepository::new(&pool);
    clients.delete(owner).await.expect("delete owner");
    assert!(notes.list_for_client(owner).await.expect("list").is_empty());
    clients.delete(other).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_status_update_and_outreach_transition() {
    let pool = test_pool().await;
    let repo = ClientRepository::new(&pool);
    let id = insert_client(&pool, &sample_client("Status Cafe")).await;

    assert_eq!(
        repo.advance_after_outreach(id).await.expect("advance"),
        Some(ClientStatus::Contacted)
    );
    // Already contacted: nothing moves.
    assert_eq!(repo.advance_after_outreach(id).await.expect("advance"), None);

    let updated = repo
        .update_status(id, ClientStatus::Lead)
        .await
        .expect("update");
    assert_eq!(updated.status, ClientStatus::Lead);

    repo.delete(id).await.expect("cleanup");
    assert!(matches!(
        repo.update_status(id, ClientStatus::Closed).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CRM_DATABASE_URL)"]
async fn test_failed_send_is_recorded_without_status_change() {
    let pool = test_pool().await;
    let id = insert_client(&pool, &sample_client("Unreachable Cafe")).await;

    let email = OutgoingEmail {
        to: EmailAddress::parse("owner@unreachable.example").expect("address"),
        recipient_name: Some("Unreachable Cafe".to_string()),
        reply_to: None,
        subject: "A website for Unreachable Cafe".to_string(),
        body: "Namaste".to_string(),
        attachments: Vec::new(),
    };

    // No transport configured: the attempt fails and is logged.
    let outcome = OutreachService::default()
        .send(&pool, &email, Some(id), false, true)
        .await
        .expect("send with client never errors");
    assert!(!outcome.success);
    assert_eq!(outcome.method, EmailMethod::Smtp);
    assert_eq!(outcome.error.as_deref(), Some("SMTP is not configured"));

    let history = EmailHistoryRepository::new(&pool)
        .list_for_client(id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, DeliveryStatus::Failed);
    assert_eq!(history[0].recipient, "owner@unreachable.example");

    let client = ClientRepository::new(&pool)
        .get(id)
        .await
        .expect("get")
        .expect("client exists");
    assert_eq!(client.status, ClientStatus::Pending);

    ClientRepository::new(&pool).delete(id).await.expect("cleanup");
}
