//! HTTP round trips against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database in `CRM_DATABASE_URL`
//! - The server running against it (cargo run -p clients-finder-server)
//!
//! Run with: cargo test -p clients-finder-integration-tests -- --ignored

use std::io::Cursor;

use calamine::{Reader, open_workbook_auto_from_rs};
use clients_finder_integration_tests::{base_url, insert_client, sample_client, test_pool};
use clients_finder_server::db::ClientRepository;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn http() -> Client {
    Client::new()
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn test_health() {
    let resp = http()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn test_client_lifecycle() {
    let pool = test_pool().await;
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let id = insert_client(&pool, &sample_client(&format!("Lifecycle Cafe {tag}"))).await;
    let base = base_url();
    let client = http();

    // Listed under its search tag
    let resp = client
        .get(format!("{base}/api/clients"))
        .query(&[("search", tag.as_str()), ("status", "all")])
        .send()
        .await
        .expect("list");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["total"], 1);
    assert_eq!(body["clients"][0]["id"], id.as_i32());
    assert_eq!(body["clients"][0]["status"], "PENDING");

    // Status change
    let resp = client
        .patch(format!("{base}/api/clients/{id}"))
        .json(&json!({ "status": "lead" }))
        .send()
        .await
        .expect("patch");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "LEAD");

    // Notes
    let resp = client
        .post(format!("{base}/api/clients/{id}/notes"))
        .json(&json!({ "content": "  Asked for a quote  " }))
        .send()
        .await
        .expect("create note");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let note: Value = resp.json().await.expect("json");
    assert_eq!(note["content"], "Asked for a quote");

    let resp = client
        .get(format!("{base}/api/clients/{id}/notes"))
        .send()
        .await
        .expect("list notes");
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["notes"].as_array().map(Vec::len), Some(1));

    // Export carries the filter in its name
    let resp = client
        .get(format!("{base}/api/clients/export"))
        .query(&[("search", tag.as_str()), ("status", "LEAD")])
        .send()
        .await
        .expect("export");
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("clients_status-LEAD_"));
    assert!(!resp.bytes().await.expect("bytes").is_empty());

    // Delete cascades to notes
    let resp = client
        .delete(format!("{base}/api/clients/{id}"))
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["success"], true);

    let resp = client
        .get(format!("{base}/api/clients/{id}"))
        .send()
        .await
        .expect("get");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(
        ClientRepository::new(&pool)
            .get(id)
            .await
            .expect("query")
            .is_none()
    );
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn test_export_rows_match_filtered_total() {
    let pool = test_pool().await;
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let mut ids = Vec::new();
    for (suffix, website) in [
        ("A", Some("https://a.example.com")),
        ("B", Some("https://b.example.com")),
        ("C", None),
    ] {
        let mut new_client = sample_client(&format!("Export Cafe {tag} {suffix}"));
        new_client.website = website.map(ToString::to_string);
        ids.push(insert_client(&pool, &new_client).await);
    }
    let base = base_url();
    let client = http();
    let filters = [("search", tag.as_str()), ("hasWebsite", "true")];

    let resp = client
        .get(format!("{base}/api/clients"))
        .query(&filters)
        .send()
        .await
        .expect("list");
    let body: Value = resp.json().await.expect("json");
    let total = body["total"].as_u64().expect("total");
    assert_eq!(total, 2);

    let resp = client
        .get(format!("{base}/api/clients/export"))
        .query(&filters)
        .send()
        .await
        .expect("export");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.bytes().await.expect("bytes").to_vec();
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).expect("xlsx");
    let range = workbook.worksheet_range("Clients").expect("sheet");

    // Header row plus one row per matching client
    assert_eq!(range.height() as u64 - 1, total);

    let repo = ClientRepository::new(&pool);
    for id in ids {
        repo.delete(id).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn test_templates_render_for_client() {
    let pool = test_pool().await;
    let id = insert_client(&pool, &sample_client("Template Cafe")).await;
    let base = base_url();
    let client = http();

    let resp = client
        .post(format!("{base}/api/templates"))
        .json(&json!({
            "name": "No website pitch",
            "subject": "A website for {{CLIENT_NAME}}",
            "body": "Namaste {{ CLIENT_NAME }} in {{CLIENT_CITY}}. {{UNKNOWN}}",
            "targetType": "NO_WEBSITE"
        }))
        .send()
        .await
        .expect("create template");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let template: Value = resp.json().await.expect("json");
    let template_id = template["id"].as_i64().expect("template id");

    let resp = client
        .get(format!("{base}/api/templates/{template_id}/preview"))
        .query(&[("clientId", id.as_i32())])
        .send()
        .await
        .expect("preview");
    assert_eq!(resp.status(), StatusCode::OK);
    let rendered: Value = resp.json().await.expect("json");
    assert_eq!(rendered["subject"], "A website for Template Cafe");
    assert_eq!(
        rendered["body"],
        "Namaste Template Cafe in Kathmandu. {{UNKNOWN}}"
    );

    let resp = client
        .get(format!("{base}/api/clients/{id}/templates"))
        .send()
        .await
        .expect("applicable");
    let body: Value = resp.json().await.expect("json");
    let applicable = body["templates"].as_array().cloned().unwrap_or_default();
    assert!(applicable.iter().any(|t| t["id"] == template_id));

    let resp = client
        .patch(format!("{base}/api/templates/{template_id}"))
        .json(&json!({ "targetType": "HAS_WEBSITE" }))
        .send()
        .await
        .expect("patch template");
    let patched: Value = resp.json().await.expect("json");
    assert_eq!(patched["targetType"], "HAS_WEBSITE");
    assert_eq!(patched["name"], "No website pitch");

    client
        .delete(format!("{base}/api/templates/{template_id}"))
        .send()
        .await
        .expect("delete template");
    ClientRepository::new(&pool)
        .delete(id)
        .await
        .expect("cleanup");
}
