use axum::http::StatusCode;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use pulse_core::config::Config;
use pulse_core::db::PulseDb;
use pulse_core::score::Scores;
use pulse_core::workspace::{BillingLink, Member, Workspace};
use pulse_llm::ScriptedGenerator;
use pulse_server::billing::MockPortal;
use pulse_server::{build_router, AppState};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const IDENTITY: &str = "x-pulse-member";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    _dir: TempDir,
    state: AppState,
    generator: Arc<ScriptedGenerator>,
    billing: Arc<MockPortal>,
    workspace: Workspace,
    alice: Member,
    bob: Member,
}

/// Two-member workspace on a fresh SQLite file.
fn fixture(generator: ScriptedGenerator) -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = PulseDb::open(&dir.path().join("pulse.db")).unwrap();
    let workspace = Workspace::new("Acme");
    db.create_workspace(&workspace).unwrap();
    let alice = Member::new(&workspace.id, "alice@acme.test").with_name("Alice Smith");
    let bob = Member::new(&workspace.id, "bob@acme.test");
    db.add_member(&alice).unwrap();
    db.add_member(&bob).unwrap();

    let generator = Arc::new(generator);
    let billing = Arc::new(MockPortal::default());
    let state = AppState::new(db, Config::default(), generator.clone(), billing.clone());
    Fixture {
        _dir: dir,
        state,
        generator,
        billing,
        workspace,
        alice,
        bob,
    }
}

impl Fixture {
    fn app(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Complete the pulse from two weeks ago with both members' answers and feedback.
    fn complete_earlier_pulse(&self, alice: u8, bob: u8) {
        let at = Utc::now() - Duration::weeks(2);
        let db = &self.state.db;
        db.submit_response(
            &self.workspace.id,
            &self.alice.id,
            Scores::uniform(alice),
            Some("We disagree on hiring".into()),
            &at,
        )
        .unwrap();
        db.submit_response(
            &self.workspace.id,
            &self.bob.id,
            Scores::uniform(bob),
            Some("Too many meetings".into()),
            &at,
        )
        .unwrap();
    }
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    member: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(id) = member {
        builder = builder.header(IDENTITY, id);
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str, member: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, Some(member), None).await
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    member: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(member), Some(body)).await
}

fn answers(score: u8) -> serde_json::Value {
    serde_json::json!({
        "vision": score,
        "workload": score,
        "communication": score,
        "strategy": score,
        "wellbeing": score,
    })
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_needs_no_identity() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, body) = send(fx.app(), "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, body) = send(fx.app(), "GET", "/api/dashboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(fx.app(), "GET", "/api/dashboard", Some("   "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_member_is_not_found() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, _) = get(fx.app(), "/api/team", "no-such-member").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Pulse submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pulse_completes_when_every_member_submits() {
    let fx = fixture(ScriptedGenerator::new());

    let (status, body) = get(fx.app(), "/api/pulse/current", &fx.alice.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["expected"], 2);

    let (status, body) = post_json(fx.app(), "/api/pulse", &fx.alice.id, answers(8)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["pulse"]["status"], "partial");
    assert_eq!(body["submitted"], 1);

    let mut bob = answers(6);
    bob["feedback"] = serde_json::json!("  ");
    let (status, body) = post_json(fx.app(), "/api/pulse", &fx.bob.id, bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pulse"]["status"], "completed");
    assert!(body["pulse"]["completed_at"].is_string());
    assert!(body["response"].get("feedback").is_none());

    let (_, body) = get(fx.app(), "/api/pulse/current", &fx.bob.id).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["submitted"], 2);
    assert_eq!(body["submitted_by_me"], true);
}

#[tokio::test]
async fn resubmission_replaces_previous_answers() {
    let fx = fixture(ScriptedGenerator::new());
    post_json(fx.app(), "/api/pulse", &fx.alice.id, answers(3)).await;
    let (status, body) = post_json(fx.app(), "/api/pulse", &fx.alice.id, answers(9)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submitted"], 1);
    assert_eq!(body["pulse"]["status"], "partial");
    assert_eq!(body["response"]["scores"]["vision"], 9);
}

#[tokio::test]
async fn out_of_range_score_is_rejected_without_writes() {
    let fx = fixture(ScriptedGenerator::new());
    let mut bad = answers(5);
    bad["strategy"] = serde_json::json!(11);
    let (status, body) = post_json(fx.app(), "/api/pulse", &fx.alice.id, bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("strategy"));

    let (_, body) = get(fx.app(), "/api/pulse/current", &fx.alice.id).await;
    assert_eq!(body["status"], "pending");
    assert!(body.get("pulse_id").is_none());
}

#[tokio::test]
async fn missing_answer_is_rejected() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, body) = post_json(
        fx.app(),
        "/api/pulse",
        &fx.alice.id,
        serde_json::json!({ "vision": 5, "workload": 5, "communication": 5, "strategy": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("wellbeing"));
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_reports_alignment_and_feedback() {
    let fx = fixture(ScriptedGenerator::new());
    fx.complete_earlier_pulse(4, 4);

    let (status, body) = get(fx.app(), "/api/dashboard", &fx.alice.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace_name"], "Acme");
    assert_eq!(body["member_count"], 2);
    assert_eq!(body["alignment"]["current"], 40);
    assert_eq!(body["alignment"]["emergency"], true);
    assert_eq!(body["series"].as_array().unwrap().len(), 1);
    assert_eq!(body["current_pulse"]["status"], "pending");
    assert_eq!(body["recent_feedback"].as_array().unwrap().len(), 2);

    let (status, body) = get(fx.app(), "/api/alignment", &fx.bob.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alignment"]["current"], 40);
    assert!(body.get("workspace_name").is_none());
}

// ---------------------------------------------------------------------------
// Action items
// ---------------------------------------------------------------------------

#[tokio::test]
async fn action_item_lifecycle() {
    let fx = fixture(ScriptedGenerator::new());

    let (status, item) = post_json(
        fx.app(),
        "/api/actions",
        &fx.alice.id,
        serde_json::json!({ "title": "  Weekly sync  ", "due_date": "2026-10-30" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{item}");
    assert_eq!(item["title"], "Weekly sync");
    assert_eq!(item["status"], "committed");
    assert_eq!(item["ai_generated"], false);
    let id = item["id"].as_str().unwrap().to_string();

    let (status, done) = send(
        fx.app(),
        "PUT",
        &format!("/api/actions/{id}/status"),
        Some(&fx.bob.id),
        Some(serde_json::json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    assert!(done["completed_at"].is_string());

    let (_, open) = get(fx.app(), "/api/actions?open=true", &fx.alice.id).await;
    assert!(open["items"].as_array().unwrap().is_empty());
    let (_, all) = get(fx.app(), "/api/actions", &fx.alice.id).await;
    assert_eq!(all["items"].as_array().unwrap().len(), 1);

    let uri = format!("/api/actions/{id}");
    let (status, body) = send(fx.app(), "DELETE", &uri, Some(&fx.alice.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], id.as_str());
    let (status, _) = send(fx.app(), "DELETE", &uri, Some(&fx.alice.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_item_rejects_blank_title_and_unknown_status() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, _) = post_json(
        fx.app(),
        "/api/actions",
        &fx.alice.id,
        serde_json::json!({ "title": "   " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, item) = post_json(
        fx.app(),
        "/api/actions",
        &fx.alice.id,
        serde_json::json!({ "title": "Ship it" }),
    )
    .await;
    let id = item["id"].as_str().unwrap();
    let (status, _) = send(
        fx.app(),
        "PUT",
        &format!("/api/actions/{id}/status"),
        Some(&fx.alice.id),
        Some(serde_json::json!({ "status": "abandoned" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn action_items_are_scoped_to_the_workspace() {
    let fx = fixture(ScriptedGenerator::new());
    let other = Workspace::new("Other Co");
    fx.state.db.create_workspace(&other).unwrap();
    let outsider = Member::new(&other.id, "eve@other.test");
    fx.state.db.add_member(&outsider).unwrap();

    let (_, item) = post_json(
        fx.app(),
        "/api/actions",
        &fx.alice.id,
        serde_json::json!({ "title": "Private" }),
    )
    .await;
    let uri = format!("/api/actions/{}", item["id"].as_str().unwrap());

    let (_, listed) = get(fx.app(), "/api/actions", &outsider.id).await;
    assert!(listed["items"].as_array().unwrap().is_empty());
    let (status, _) = send(fx.app(), "DELETE", &uri, Some(&outsider.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generated_suggestions_are_stored() {
    let reply = r#"Here you go:
[{"title": "Hiring rubric", "description": "Agree on criteria"},
 {"title": "No-meeting Wednesdays"},
 {"title": "   "}]"#;
    let fx = fixture(ScriptedGenerator::always(reply));
    fx.complete_earlier_pulse(7, 7);

    let (status, body) = post_json(
        fx.app(),
        "/api/actions/generate",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["source"], "parsed");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["status"], "suggested");
    assert_eq!(items[0]["ai_generated"], true);
    assert!(items[0]["pulse_id"].is_string());

    let requests = fx.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].max_tokens, 1000);
    assert!(requests[0].prompt.contains("1. We disagree on hiring"));
    assert!(requests[0].prompt.contains("2. Too many meetings"));

    let (_, listed) = get(fx.app(), "/api/actions?open=true", &fx.bob.id).await;
    assert_eq!(listed["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unparseable_suggestions_store_nothing() {
    let fx = fixture(ScriptedGenerator::always("I cannot help with that."));

    let (status, body) = post_json(
        fx.app(),
        "/api/actions/generate",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert!(body["items"].as_array().unwrap().is_empty());
    assert!(fx.generator.requests()[0]
        .prompt
        .contains("No recent feedback available"));

    let (_, listed) = get(fx.app(), "/api/actions", &fx.alice.id).await;
    assert!(listed["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn generator_failure_degrades_to_empty_suggestions() {
    let fx = fixture(ScriptedGenerator::new().then_fail("connection reset"));
    let (status, body) = post_json(
        fx.app(),
        "/api/actions/generate",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["source"], "fallback");
    assert!(body["items"].as_array().unwrap().is_empty());

    let (_, listed) = get(fx.app(), "/api/actions", &fx.alice.id).await;
    assert!(listed["items"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Emergency call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn emergency_call_falls_back_to_default_agenda() {
    let fx = fixture(ScriptedGenerator::always(
        "MEDIATION SCRIPT:\nWelcome both of you.",
    ));

    let (_, latest) = get(fx.app(), "/api/emergency-call/latest", &fx.alice.id).await;
    assert!(latest["emergency_call"].is_null());

    let (status, body) = post_json(
        fx.app(),
        "/api/emergency-call",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let call = &body["emergency_call"];
    assert_eq!(call["alignment_score"], 75);
    assert_eq!(call["agenda_source"], "fallback");
    assert_eq!(call["agenda"].as_array().unwrap().len(), 6);
    assert_eq!(call["mediation_script"], "Welcome both of you.");
    assert_eq!(call["status"], "generated");
    assert_eq!(call["triggered_by"], fx.alice.id.as_str());

    let requests = fx.generator.requests();
    assert_eq!(requests[0].max_tokens, 3000);
    assert!(requests[0].prompt.contains("75/100"));
    assert!(requests[0].prompt.contains("None provided"));

    let (_, latest) = get(fx.app(), "/api/emergency-call/latest", &fx.bob.id).await;
    assert_eq!(latest["emergency_call"]["id"], call["id"]);
}

#[tokio::test]
async fn emergency_call_uses_latest_completed_score_and_parsed_agenda() {
    let reply = r#"AGENDA (format as JSON array):
[{"title": "Check-in", "duration": "10 mins", "description": "Feelings first"}]

MEDIATION SCRIPT:
Let's begin."#;
    let fx = fixture(ScriptedGenerator::always(reply));
    fx.complete_earlier_pulse(4, 3);

    let (status, body) = post_json(
        fx.app(),
        "/api/emergency-call",
        &fx.alice.id,
        serde_json::json!({ "context": "Equity split dispute" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let call = &body["emergency_call"];
    assert_eq!(call["alignment_score"], 35);
    assert_eq!(call["agenda_source"], "parsed");
    assert_eq!(call["agenda"][0]["title"], "Check-in");
    assert_eq!(call["mediation_script"], "Let's begin.");

    let prompt = &fx.generator.requests()[0].prompt;
    assert!(prompt.contains("Equity split dispute"));
    assert!(prompt.contains("Acme"));
}

#[tokio::test]
async fn emergency_call_generator_failure_is_bad_gateway() {
    let fx = fixture(ScriptedGenerator::new().then_fail("connection reset"));
    let (status, body) = post_json(
        fx.app(),
        "/api/emergency-call",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "text generation failed");

    let (_, latest) = get(fx.app(), "/api/emergency-call/latest", &fx.alice.id).await;
    assert!(latest["emergency_call"].is_null());
}

// ---------------------------------------------------------------------------
// Team & billing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_lists_members_with_initials() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, body) = get(fx.app(), "/api/team", &fx.alice.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace"]["name"], "Acme");
    assert_eq!(body["workspace"]["invite_code"], fx.workspace.invite_code.as_str());

    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let alice = members
        .iter()
        .find(|m| m["email"] == "alice@acme.test")
        .unwrap();
    assert_eq!(alice["initials"], "AS");
    assert_eq!(alice["is_me"], true);
}

#[tokio::test]
async fn billing_portal_requires_customer() {
    let fx = fixture(ScriptedGenerator::new());
    let (status, body) = post_json(
        fx.app(),
        "/api/billing/portal",
        &fx.alice.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No billing account");
    assert!(fx.billing.calls().is_empty());
}

#[tokio::test]
async fn billing_portal_returns_session_url() {
    let fx = fixture(ScriptedGenerator::new());
    fx.state
        .db
        .set_billing(
            &fx.workspace.id,
            &BillingLink {
                customer_id: Some("cus_42".into()),
                ..BillingLink::default()
            },
        )
        .unwrap();

    let (status, body) = post_json(
        fx.app(),
        "/api/billing/portal",
        &fx.bob.id,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], fx.state.config.billing.return_url.as_str());
    assert_eq!(fx.billing.calls(), vec!["cus_42".to_string()]);
}
