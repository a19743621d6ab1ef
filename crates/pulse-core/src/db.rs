//! Relational store backed by SQLite.
//!
//! # Tables
//!
//! ```text
//! workspaces       id PK, invite_code UNIQUE
//! members          id PK, workspace_id FK, UNIQUE(workspace_id, email)
//! pulses           id PK, workspace_id FK, UNIQUE(workspace_id, week_start)
//! pulse_responses  id PK, pulse_id FK, member_id FK, UNIQUE(pulse_id, member_id)
//! action_items     id PK, workspace_id FK
//! emergency_calls  id PK, workspace_id FK, agenda as JSON text
//! ```
//!
//! Responses are returned in first-submission order (`rowid`); an upsert
//! updates the row in place so a resubmission keeps its position and id.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::action_item::ActionItem;
use crate::emergency::{AgendaSource, EmergencyCall};
use crate::error::{PulseError, Result};
use crate::pulse::{normalize_feedback, Pulse, PulseResponse, PulseWithResponses};
use crate::score::Scores;
use crate::types::{ActionStatus, PulseStatus};
use crate::week::WeekStart;
use crate::workspace::{BillingLink, Member, Workspace};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workspaces (
    id                      TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    invite_code             TEXT NOT NULL UNIQUE,
    billing_customer_id     TEXT,
    billing_subscription_id TEXT,
    subscription_status     TEXT NOT NULL DEFAULT 'trialing',
    plan                    TEXT NOT NULL DEFAULT 'free',
    created_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    id           TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    email        TEXT NOT NULL,
    full_name    TEXT,
    role         TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (workspace_id, email)
);

CREATE TABLE IF NOT EXISTS pulses (
    id           TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    week_start   TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'pending',
    created_at   TEXT NOT NULL,
    completed_at TEXT,
    UNIQUE (workspace_id, week_start)
);

CREATE TABLE IF NOT EXISTS pulse_responses (
    id            TEXT PRIMARY KEY,
    pulse_id      TEXT NOT NULL REFERENCES pulses(id) ON DELETE CASCADE,
    member_id     TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
    vision        INTEGER NOT NULL CHECK (vision BETWEEN 1 AND 10),
    workload      INTEGER NOT NULL CHECK (workload BETWEEN 1 AND 10),
    communication INTEGER NOT NULL CHECK (communication BETWEEN 1 AND 10),
    strategy      INTEGER NOT NULL CHECK (strategy BETWEEN 1 AND 10),
    wellbeing     INTEGER NOT NULL CHECK (wellbeing BETWEEN 1 AND 10),
    feedback      TEXT,
    submitted_at  TEXT NOT NULL,
    UNIQUE (pulse_id, member_id)
);

CREATE TABLE IF NOT EXISTS action_items (
    id           TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    pulse_id     TEXT REFERENCES pulses(id) ON DELETE SET NULL,
    title        TEXT NOT NULL,
    description  TEXT,
    assignee_id  TEXT REFERENCES members(id) ON DELETE SET NULL,
    status       TEXT NOT NULL,
    due_date     TEXT,
    ai_generated INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS emergency_calls (
    id               TEXT PRIMARY KEY,
    workspace_id     TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    triggered_by     TEXT NOT NULL,
    alignment_score  INTEGER NOT NULL,
    mediation_script TEXT NOT NULL,
    agenda           TEXT NOT NULL,
    agenda_source    TEXT NOT NULL,
    status           TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_workspace ON members(workspace_id);
CREATE INDEX IF NOT EXISTS idx_pulses_workspace_week ON pulses(workspace_id, week_start);
CREATE INDEX IF NOT EXISTS idx_action_items_workspace ON action_items(workspace_id, created_at);
CREATE INDEX IF NOT EXISTS idx_emergency_calls_workspace ON emergency_calls(workspace_id, created_at);
";

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// Read a text column through the type's `FromStr`.
fn parse_col<T: FromStr<Err = PulseError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn write_failed(e: rusqlite::Error) -> PulseError {
    PulseError::StoreWriteFailed(e.to_string())
}

/// SQLite treats a negative LIMIT as unbounded.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

const WORKSPACE_COLS: &str = "id, name, invite_code, billing_customer_id, billing_subscription_id, \
     subscription_status, plan, created_at";

fn row_to_workspace(row: &Row<'_>) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get(0)?,
        name: row.get(1)?,
        invite_code: row.get(2)?,
        billing: BillingLink {
            customer_id: row.get(3)?,
            subscription_id: row.get(4)?,
            subscription_status: parse_col(row, 5)?,
            plan: parse_col(row, 6)?,
        },
        created_at: row.get(7)?,
    })
}

const MEMBER_COLS: &str = "id, workspace_id, email, full_name, role, created_at";

fn row_to_member(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const PULSE_COLS: &str = "id, workspace_id, week_start, status, created_at, completed_at";

fn row_to_pulse(row: &Row<'_>) -> rusqlite::Result<Pulse> {
    Ok(Pulse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        week_start: parse_col(row, 2)?,
        status: parse_col(row, 3)?,
        created_at: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

const RESPONSE_COLS: &str = "id, pulse_id, member_id, vision, workload, communication, strategy, \
     wellbeing, feedback, submitted_at";

fn row_to_response(row: &Row<'_>) -> rusqlite::Result<PulseResponse> {
    Ok(PulseResponse {
        id: row.get(0)?,
        pulse_id: row.get(1)?,
        member_id: row.get(2)?,
        scores: Scores {
            vision: row.get(3)?,
            workload: row.get(4)?,
            communication: row.get(5)?,
            strategy: row.get(6)?,
            wellbeing: row.get(7)?,
        },
        feedback: row.get(8)?,
        submitted_at: row.get(9)?,
    })
}

const ACTION_COLS: &str = "id, workspace_id, pulse_id, title, description, assignee_id, status, \
     due_date, ai_generated, created_at, completed_at";

fn row_to_action(row: &Row<'_>) -> rusqlite::Result<ActionItem> {
    Ok(ActionItem {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        pulse_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        assignee_id: row.get(5)?,
        status: parse_col(row, 6)?,
        due_date: row.get(7)?,
        ai_generated: row.get(8)?,
        created_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

const CALL_COLS: &str = "id, workspace_id, triggered_by, alignment_score, mediation_script, agenda, \
     agenda_source, status, created_at";

fn row_to_call(row: &Row<'_>) -> rusqlite::Result<EmergencyCall> {
    let agenda_json: String = row.get(5)?;
    let agenda = serde_json::from_str(&agenda_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let source: String = row.get(6)?;
    Ok(EmergencyCall {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        triggered_by: row.get(2)?,
        alignment_score: row.get(3)?,
        mediation_script: row.get(4)?,
        agenda,
        agenda_source: AgendaSource::parse(&source),
        status: parse_col(row, 7)?,
        created_at: row.get(8)?,
    })
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Outcome of one response submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub pulse: Pulse,
    pub response: PulseResponse,
    pub submitted: usize,
    pub expected: usize,
    /// Whether this submission moved the pulse to a new status.
    pub transitioned: bool,
}

// ---------------------------------------------------------------------------
// PulseDb
// ---------------------------------------------------------------------------

/// SQLite store for workspaces, pulses and their artifacts.
pub struct PulseDb {
    conn: Mutex<Connection>,
}

impl PulseDb {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PulseError::Store("connection lock poisoned".to_string()))
    }

    // -----------------------------------------------------------------------
    // Workspaces
    // -----------------------------------------------------------------------

    pub fn create_workspace(&self, ws: &Workspace) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO workspaces (id, name, invite_code, billing_customer_id, \
             billing_subscription_id, subscription_status, plan, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ws.id,
                ws.name,
                ws.invite_code,
                ws.billing.customer_id,
                ws.billing.subscription_id,
                ws.billing.subscription_status.as_str(),
                ws.billing.plan.as_str(),
                ws.created_at,
            ],
        )
        .map_err(write_failed)?;
        Ok(())
    }

    pub fn workspace(&self, id: &str) -> Result<Workspace> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {WORKSPACE_COLS} FROM workspaces WHERE id = ?1"),
            params![id],
            row_to_workspace,
        )
        .optional()?
        .ok_or_else(|| PulseError::WorkspaceNotFound(id.to_string()))
    }

    pub fn workspace_by_invite(&self, code: &str) -> Result<Option<Workspace>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {WORKSPACE_COLS} FROM workspaces WHERE invite_code = ?1"),
                params![code],
                row_to_workspace,
            )
            .optional()?)
    }

    pub fn set_billing(&self, workspace_id: &str, billing: &BillingLink) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE workspaces SET billing_customer_id = ?2, billing_subscription_id = ?3, \
                 subscription_status = ?4, plan = ?5 WHERE id = ?1",
                params![
                    workspace_id,
                    billing.customer_id,
                    billing.subscription_id,
                    billing.subscription_status.as_str(),
                    billing.plan.as_str(),
                ],
            )
            .map_err(write_failed)?;
        if changed == 0 {
            return Err(PulseError::WorkspaceNotFound(workspace_id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    /// Add a member. The workspace must exist and the email be unused there.
    pub fn add_member(&self, member: &Member) -> Result<()> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1)",
            params![member.workspace_id],
            |r| r.get(0),
        )?;
        if !exists {
            return Err(PulseError::WorkspaceNotFound(member.workspace_id.clone()));
        }
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM members WHERE workspace_id = ?1 AND email = ?2)",
            params![member.workspace_id, member.email],
            |r| r.get(0),
        )?;
        if taken {
            return Err(PulseError::InvalidInput(format!(
                "{} is already a member of this workspace",
                member.email
            )));
        }
        conn.execute(
            "INSERT INTO members (id, workspace_id, email, full_name, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member.id,
                member.workspace_id,
                member.email,
                member.full_name,
                member.role,
                member.created_at,
            ],
        )
        .map_err(write_failed)?;
        Ok(())
    }

    pub fn member(&self, id: &str) -> Result<Member> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {MEMBER_COLS} FROM members WHERE id = ?1"),
            params![id],
            row_to_member,
        )
        .optional()?
        .ok_or_else(|| PulseError::MemberNotFound(id.to_string()))
    }

    /// Members of a workspace, oldest first.
    pub fn members(&self, workspace_id: &str) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBER_COLS} FROM members WHERE workspace_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map(params![workspace_id], row_to_member)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_members(&self, workspace_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        count_members(&conn, workspace_id)
    }

    /// Remove a member. Pulses are not re-evaluated.
    pub fn remove_member(&self, workspace_id: &str, member_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM members WHERE id = ?1 AND workspace_id = ?2",
                params![member_id, workspace_id],
            )
            .map_err(write_failed)?;
        if removed == 0 {
            return Err(PulseError::MemberNotFound(member_id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pulses
    // -----------------------------------------------------------------------

    /// Record one member's answers for the week containing `at`.
    ///
    /// Runs as a single transaction: the week's pulse is created on demand,
    /// the response is upserted, the pulse is re-evaluated against fresh
    /// counts, and its status is written only if it changed. On any failure
    /// nothing is persisted.
    pub fn submit_response<Tz: TimeZone>(
        &self,
        workspace_id: &str,
        member_id: &str,
        scores: Scores,
        feedback: Option<String>,
        at: &DateTime<Tz>,
    ) -> Result<Submission> {
        scores.validate()?;
        let week = WeekStart::of_datetime(at);
        let now = at.with_timezone(&Utc);

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(write_failed)?;
        let submission = submit_in(&tx, workspace_id, member_id, scores, feedback, week, now)
            .map_err(|e| match e {
                PulseError::Store(msg) => PulseError::StoreWriteFailed(msg),
                other => other,
            })?;
        tx.commit().map_err(write_failed)?;

        if submission.transitioned {
            tracing::debug!(
                pulse = %submission.pulse.id,
                week = %week,
                status = %submission.pulse.status,
                submitted = submission.submitted,
                expected = submission.expected,
                "pulse status changed"
            );
        }
        Ok(submission)
    }

    pub fn pulse_for_week(
        &self,
        workspace_id: &str,
        week: WeekStart,
    ) -> Result<Option<PulseWithResponses>> {
        let conn = self.conn()?;
        let pulse = conn
            .query_row(
                &format!("SELECT {PULSE_COLS} FROM pulses WHERE workspace_id = ?1 AND week_start = ?2"),
                params![workspace_id, week.to_string()],
                row_to_pulse,
            )
            .optional()?;
        pulse.map(|p| with_responses(&conn, p)).transpose()
    }

    pub fn pulse(&self, id: &str) -> Result<PulseWithResponses> {
        let conn = self.conn()?;
        let pulse = conn
            .query_row(
                &format!("SELECT {PULSE_COLS} FROM pulses WHERE id = ?1"),
                params![id],
                row_to_pulse,
            )
            .optional()?
            .ok_or_else(|| PulseError::PulseNotFound(id.to_string()))?;
        with_responses(&conn, pulse)
    }

    /// Most recent pulses by `week_start`, newest first, optionally filtered
    /// by status.
    pub fn recent_pulses(
        &self,
        workspace_id: &str,
        status: Option<PulseStatus>,
        limit: usize,
    ) -> Result<Vec<PulseWithResponses>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PULSE_COLS} FROM pulses \
             WHERE workspace_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY week_start DESC LIMIT ?3"
        ))?;
        let pulses = stmt
            .query_map(
                params![workspace_id, status.map(|s| s.as_str()), limit as i64],
                row_to_pulse,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        pulses
            .into_iter()
            .map(|p| with_responses(&conn, p))
            .collect()
    }

    pub fn latest_completed_pulse(&self, workspace_id: &str) -> Result<Option<PulseWithResponses>> {
        Ok(self
            .recent_pulses(workspace_id, Some(PulseStatus::Completed), 1)?
            .into_iter()
            .next())
    }

    // -----------------------------------------------------------------------
    // Action items
    // -----------------------------------------------------------------------

    pub fn insert_action_item(&self, item: &ActionItem) -> Result<()> {
        self.insert_action_items(std::slice::from_ref(item))
    }

    /// Insert all items or none.
    pub fn insert_action_items(&self, items: &[ActionItem]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(write_failed)?;
        for item in items {
            insert_action(&tx, item).map_err(write_failed)?;
        }
        tx.commit().map_err(write_failed)?;
        Ok(())
    }

    /// Items newest first. `open_only` excludes completed items.
    pub fn action_items(
        &self,
        workspace_id: &str,
        open_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<ActionItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLS} FROM action_items \
             WHERE workspace_id = ?1 AND (?2 = 0 OR status != 'completed') \
             ORDER BY created_at DESC, rowid DESC LIMIT ?3"
        ))?;
        let items = stmt
            .query_map(params![workspace_id, open_only, sql_limit(limit)], row_to_action)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn action_item(&self, workspace_id: &str, id: &str) -> Result<ActionItem> {
        let conn = self.conn()?;
        action_in(&conn, workspace_id, id)
    }

    pub fn update_action_status(
        &self,
        workspace_id: &str,
        id: &str,
        status: ActionStatus,
        now: DateTime<Utc>,
    ) -> Result<ActionItem> {
        let conn = self.conn()?;
        let mut item = action_in(&conn, workspace_id, id)?;
        item.set_status(status, now);
        conn.execute(
            "UPDATE action_items SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![item.id, item.status.as_str(), item.completed_at],
        )
        .map_err(write_failed)?;
        Ok(item)
    }

    pub fn delete_action_item(&self, workspace_id: &str, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM action_items WHERE id = ?1 AND workspace_id = ?2",
                params![id, workspace_id],
            )
            .map_err(write_failed)?;
        if removed == 0 {
            return Err(PulseError::ActionItemNotFound(id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Emergency calls
    // -----------------------------------------------------------------------

    pub fn insert_emergency_call(&self, call: &EmergencyCall) -> Result<()> {
        let agenda = serde_json::to_string(&call.agenda)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO emergency_calls (id, workspace_id, triggered_by, alignment_score, \
             mediation_script, agenda, agenda_source, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                call.id,
                call.workspace_id,
                call.triggered_by,
                call.alignment_score,
                call.mediation_script,
                agenda,
                call.agenda_source.as_str(),
                call.status.as_str(),
                call.created_at,
            ],
        )
        .map_err(write_failed)?;
        Ok(())
    }

    pub fn latest_emergency_call(&self, workspace_id: &str) -> Result<Option<EmergencyCall>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {CALL_COLS} FROM emergency_calls WHERE workspace_id = ?1 \
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![workspace_id],
                row_to_call,
            )
            .optional()?)
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

fn count_members(conn: &Connection, workspace_id: &str) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM members WHERE workspace_id = ?1",
        params![workspace_id],
        |r| r.get(0),
    )?;
    Ok(n as usize)
}

fn with_responses(conn: &Connection, pulse: Pulse) -> Result<PulseWithResponses> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESPONSE_COLS} FROM pulse_responses WHERE pulse_id = ?1 ORDER BY rowid"
    ))?;
    let responses = stmt
        .query_map(params![pulse.id], row_to_response)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(PulseWithResponses { pulse, responses })
}

fn action_in(conn: &Connection, workspace_id: &str, id: &str) -> Result<ActionItem> {
    conn.query_row(
        &format!("SELECT {ACTION_COLS} FROM action_items WHERE id = ?1 AND workspace_id = ?2"),
        params![id, workspace_id],
        row_to_action,
    )
    .optional()?
    .ok_or_else(|| PulseError::ActionItemNotFound(id.to_string()))
}

fn insert_action(tx: &Transaction<'_>, item: &ActionItem) -> rusqlite::Result<usize> {
    tx.execute(
        "INSERT INTO action_items (id, workspace_id, pulse_id, title, description, assignee_id, \
         status, due_date, ai_generated, created_at, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.id,
            item.workspace_id,
            item.pulse_id,
            item.title,
            item.description,
            item.assignee_id,
            item.status.as_str(),
            item.due_date,
            item.ai_generated,
            item.created_at,
            item.completed_at,
        ],
    )
}

fn submit_in(
    tx: &Transaction<'_>,
    workspace_id: &str,
    member_id: &str,
    scores: Scores,
    feedback: Option<String>,
    week: WeekStart,
    now: DateTime<Utc>,
) -> Result<Submission> {
    let member_ws: Option<String> = tx
        .query_row(
            "SELECT workspace_id FROM members WHERE id = ?1",
            params![member_id],
            |r| r.get(0),
        )
        .optional()?;
    if member_ws.as_deref() != Some(workspace_id) {
        return Err(PulseError::MemberNotFound(member_id.to_string()));
    }

    // Insert-or-fetch the week's pulse.
    let fresh = Pulse::new(workspace_id, week, now);
    tx.execute(
        "INSERT INTO pulses (id, workspace_id, week_start, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (workspace_id, week_start) DO NOTHING",
        params![
            fresh.id,
            workspace_id,
            week.to_string(),
            fresh.status.as_str(),
            fresh.created_at,
        ],
    )?;
    let mut pulse = tx.query_row(
        &format!("SELECT {PULSE_COLS} FROM pulses WHERE workspace_id = ?1 AND week_start = ?2"),
        params![workspace_id, week.to_string()],
        row_to_pulse,
    )?;

    // Upsert this member's response; a resubmission keeps its row id.
    tx.execute(
        "INSERT INTO pulse_responses (id, pulse_id, member_id, vision, workload, communication, \
         strategy, wellbeing, feedback, submitted_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT (pulse_id, member_id) DO UPDATE SET \
             vision = excluded.vision, workload = excluded.workload, \
             communication = excluded.communication, strategy = excluded.strategy, \
             wellbeing = excluded.wellbeing, feedback = excluded.feedback, \
             submitted_at = excluded.submitted_at",
        params![
            uuid::Uuid::new_v4().to_string(),
            pulse.id,
            member_id,
            scores.vision,
            scores.workload,
            scores.communication,
            scores.strategy,
            scores.wellbeing,
            normalize_feedback(feedback),
            now,
        ],
    )?;
    let response = tx.query_row(
        &format!("SELECT {RESPONSE_COLS} FROM pulse_responses WHERE pulse_id = ?1 AND member_id = ?2"),
        params![pulse.id, member_id],
        row_to_response,
    )?;

    let submitted: i64 = tx.query_row(
        "SELECT COUNT(DISTINCT member_id) FROM pulse_responses WHERE pulse_id = ?1",
        params![pulse.id],
        |r| r.get(0),
    )?;
    let submitted = submitted as usize;
    let expected = count_members(tx, workspace_id)?;

    let transitioned = pulse.reevaluate(submitted, expected, now);
    if transitioned {
        tx.execute(
            "UPDATE pulses SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![pulse.id, pulse.status.as_str(), pulse.completed_at],
        )?;
    }

    Ok(Submission {
        pulse,
        response,
        submitted,
        expected,
        transitioned,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_item::NewActionItem;
    use crate::emergency::default_agenda;
    use crate::suggest::SuggestedAction;
    use crate::types::CallStatus;
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: PulseDb,
        ws: Workspace,
        members: Vec<Member>,
    }

    fn fixture(member_count: usize) -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = PulseDb::open(&dir.path().join("pulse.db")).unwrap();
        let ws = Workspace::new("Acme");
        db.create_workspace(&ws).unwrap();
        let members = (0..member_count)
            .map(|i| {
                let m = Member::new(&ws.id, format!("m{i}@acme.test"));
                db.add_member(&m).unwrap();
                m
            })
            .collect();
        Fixture {
            _dir: dir,
            db,
            ws,
            members,
        }
    }

    /// Wednesday 2026-10-14, noon UTC.
    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn count(db: &PulseDb, table: &str) -> i64 {
        let conn = db.conn().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn open_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pulse.db");
        drop(PulseDb::open(&path).unwrap());
        let db = PulseDb::open(&path).unwrap();
        assert_eq!(count(&db, "pulses"), 0);
    }

    #[test]
    fn first_submission_creates_partial_pulse() {
        let f = fixture(2);
        let sub = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(8), None, &wednesday())
            .unwrap();
        assert_eq!(sub.pulse.status, PulseStatus::Partial);
        assert_eq!(sub.pulse.week_start.to_string(), "2026-10-12");
        assert_eq!((sub.submitted, sub.expected), (1, 2));
        assert!(sub.transitioned);
        assert_eq!(count(&f.db, "pulses"), 1);
    }

    #[test]
    fn last_member_completes_pulse() {
        let f = fixture(2);
        let at = wednesday();
        f.db.submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(8), None, &at)
            .unwrap();
        let later = at + Duration::days(2);
        let sub = f
            .db
            .submit_response(&f.ws.id, &f.members[1].id, Scores::uniform(6), None, &later)
            .unwrap();
        assert_eq!(sub.pulse.status, PulseStatus::Completed);
        assert_eq!(sub.pulse.completed_at, Some(later));

        let stored = f.db.pulse(&sub.pulse.id).unwrap();
        assert_eq!(stored.pulse.status, PulseStatus::Completed);
        assert_eq!(stored.alignment_score(), Some(70));
    }

    #[test]
    fn resubmission_overwrites_without_duplicating() {
        let f = fixture(2);
        let m = &f.members[0].id;
        let first = f
            .db
            .submit_response(&f.ws.id, m, Scores::uniform(3), Some("meh".into()), &wednesday())
            .unwrap();
        let second = f
            .db
            .submit_response(&f.ws.id, m, Scores::uniform(9), Some("  ".into()), &wednesday())
            .unwrap();
        assert_eq!(first.response.id, second.response.id);
        assert_eq!(second.response.scores, Scores::uniform(9));
        assert_eq!(second.response.feedback, None);
        assert_eq!(second.submitted, 1);
        assert!(!second.transitioned);
        assert_eq!(count(&f.db, "pulse_responses"), 1);
    }

    #[test]
    fn same_week_shares_one_pulse() {
        let f = fixture(3);
        let monday = Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2026, 10, 18, 22, 0, 0).unwrap();
        let a = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(5), None, &monday)
            .unwrap();
        let b = f
            .db
            .submit_response(&f.ws.id, &f.members[1].id, Scores::uniform(5), None, &sunday)
            .unwrap();
        assert_eq!(a.pulse.id, b.pulse.id);
        assert_eq!(count(&f.db, "pulses"), 1);
    }

    #[test]
    fn completed_pulse_keeps_timestamp_and_is_not_reopened() {
        let f = fixture(1);
        let at = wednesday();
        let done = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(7), None, &at)
            .unwrap();
        assert!(done.pulse.is_completed());

        // Membership grows; the completed pulse is left alone.
        let newcomer = Member::new(&f.ws.id, "late@acme.test");
        f.db.add_member(&newcomer).unwrap();
        let again = f
            .db
            .submit_response(
                &f.ws.id,
                &f.members[0].id,
                Scores::uniform(9),
                None,
                &(at + Duration::hours(5)),
            )
            .unwrap();
        assert_eq!(again.pulse.status, PulseStatus::Completed);
        assert_eq!(again.pulse.completed_at, Some(at));
        assert_eq!(again.expected, 2);
    }

    #[test]
    fn removing_member_does_not_complete_pulse() {
        let f = fixture(2);
        let sub = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(7), None, &wednesday())
            .unwrap();
        f.db.remove_member(&f.ws.id, &f.members[1].id).unwrap();
        let stored = f.db.pulse(&sub.pulse.id).unwrap();
        assert_eq!(stored.pulse.status, PulseStatus::Partial);
    }

    #[test]
    fn unknown_member_writes_nothing() {
        let f = fixture(1);
        let err = f
            .db
            .submit_response(&f.ws.id, "ghost", Scores::uniform(5), None, &wednesday())
            .unwrap_err();
        assert!(matches!(err, PulseError::MemberNotFound(_)));
        assert_eq!(count(&f.db, "pulses"), 0);
    }

    #[test]
    fn member_of_other_workspace_is_rejected() {
        let f = fixture(1);
        let other = Workspace::new("Other");
        f.db.create_workspace(&other).unwrap();
        let err = f
            .db
            .submit_response(&other.id, &f.members[0].id, Scores::uniform(5), None, &wednesday())
            .unwrap_err();
        assert!(matches!(err, PulseError::MemberNotFound(_)));
    }

    #[test]
    fn invalid_scores_rejected_before_write() {
        let f = fixture(1);
        let mut scores = Scores::uniform(5);
        scores.strategy = 11;
        let err = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, scores, None, &wednesday())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(count(&f.db, "pulses"), 0);
    }

    #[test]
    fn failed_upsert_rolls_back_pulse_creation() {
        let f = fixture(1);
        {
            let conn = f.db.conn().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_responses BEFORE INSERT ON pulse_responses \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        }
        let err = f
            .db
            .submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(5), None, &wednesday())
            .unwrap_err();
        assert!(matches!(err, PulseError::StoreWriteFailed(_)));
        assert_eq!(count(&f.db, "pulses"), 0);
        assert_eq!(count(&f.db, "pulse_responses"), 0);
    }

    #[test]
    fn recent_pulses_newest_first_with_status_filter() {
        let f = fixture(2);
        let base = wednesday();
        for weeks_back in 0..3 {
            let at = base - Duration::weeks(weeks_back);
            f.db.submit_response(&f.ws.id, &f.members[0].id, Scores::uniform(6), None, &at)
                .unwrap();
            if weeks_back > 0 {
                f.db.submit_response(&f.ws.id, &f.members[1].id, Scores::uniform(8), None, &at)
                    .unwrap();
            }
        }
        let all = f.db.recent_pulses(&f.ws.id, None, 8).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].pulse.week_start > all[1].pulse.week_start);
        assert_eq!(all[0].pulse.status, PulseStatus::Partial);

        let completed = f
            .db
            .recent_pulses(&f.ws.id, Some(PulseStatus::Completed), 8)
            .unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].responses.len(), 2);
        assert_eq!(completed[0].responses[0].member_id, f.members[0].id);

        let latest = f.db.latest_completed_pulse(&f.ws.id).unwrap().unwrap();
        assert_eq!(latest.pulse.id, completed[0].pulse.id);
        assert_eq!(f.db.recent_pulses(&f.ws.id, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn workspace_and_members_roundtrip() {
        let f = fixture(2);
        let ws = f.db.workspace(&f.ws.id).unwrap();
        assert_eq!(ws.name, "Acme");
        assert_eq!(ws.invite_code, f.ws.invite_code);
        assert_eq!(f.db.members(&f.ws.id).unwrap().len(), 2);
        assert_eq!(
            f.db.member(&f.members[1].id).unwrap().email,
            "m1@acme.test"
        );
        assert_eq!(
            f.db.workspace_by_invite(&f.ws.invite_code).unwrap().unwrap().id,
            f.ws.id
        );
        assert!(matches!(
            f.db.workspace("nope"),
            Err(PulseError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn duplicate_member_email_is_invalid_input() {
        let f = fixture(1);
        let dup = Member::new(&f.ws.id, "m0@acme.test");
        assert!(f.db.add_member(&dup).unwrap_err().is_invalid_input());
        let orphan = Member::new("missing", "x@acme.test");
        assert!(matches!(
            f.db.add_member(&orphan),
            Err(PulseError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn billing_link_updates() {
        let f = fixture(0);
        let link = BillingLink {
            customer_id: Some("cus_123".into()),
            ..Default::default()
        };
        f.db.set_billing(&f.ws.id, &link).unwrap();
        let ws = f.db.workspace(&f.ws.id).unwrap();
        assert_eq!(ws.billing.customer_id.as_deref(), Some("cus_123"));
        assert!(f.db.set_billing("missing", &link).is_err());
    }

    #[test]
    fn action_item_crud() {
        let f = fixture(1);
        let manual = ActionItem::manual(
            &f.ws.id,
            NewActionItem {
                title: "Weekly sync".into(),
                due_date: chrono::NaiveDate::from_ymd_opt(2026, 10, 20),
                ..Default::default()
            },
        )
        .unwrap();
        f.db.insert_action_item(&manual).unwrap();
        let suggested = ActionItem::suggested(
            &f.ws.id,
            None,
            SuggestedAction {
                title: "Role doc".into(),
                description: Some("who owns what".into()),
            },
        );
        f.db.insert_action_items(&[suggested.clone()]).unwrap();

        let all = f.db.action_items(&f.ws.id, false, None).unwrap();
        assert_eq!(all.len(), 2);
        let stored = f.db.action_item(&f.ws.id, &manual.id).unwrap();
        assert_eq!(stored.due_date, manual.due_date);

        let done = f
            .db
            .update_action_status(&f.ws.id, &manual.id, ActionStatus::Completed, Utc::now())
            .unwrap();
        assert!(done.completed_at.is_some());
        let open = f.db.action_items(&f.ws.id, true, Some(5)).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, suggested.id);
        assert!(open[0].ai_generated);

        let reopened = f
            .db
            .update_action_status(&f.ws.id, &manual.id, ActionStatus::InProgress, Utc::now())
            .unwrap();
        assert!(reopened.completed_at.is_none());

        f.db.delete_action_item(&f.ws.id, &manual.id).unwrap();
        assert!(matches!(
            f.db.delete_action_item(&f.ws.id, &manual.id),
            Err(PulseError::ActionItemNotFound(_))
        ));
    }

    #[test]
    fn action_items_are_tenant_scoped() {
        let f = fixture(0);
        let other = Workspace::new("Other");
        f.db.create_workspace(&other).unwrap();
        let item = ActionItem::manual(
            &f.ws.id,
            NewActionItem {
                title: "Private".into(),
                ..Default::default()
            },
        )
        .unwrap();
        f.db.insert_action_item(&item).unwrap();
        assert!(f.db.action_item(&other.id, &item.id).is_err());
        assert!(f.db.delete_action_item(&other.id, &item.id).is_err());
        assert!(f.db.action_items(&other.id, false, None).unwrap().is_empty());
    }

    #[test]
    fn emergency_call_roundtrip_and_latest() {
        let f = fixture(1);
        assert!(f.db.latest_emergency_call(&f.ws.id).unwrap().is_none());
        let mut call = EmergencyCall {
            id: "c1".into(),
            workspace_id: f.ws.id.clone(),
            triggered_by: f.members[0].id.clone(),
            alignment_score: 42,
            mediation_script: "Welcome.".into(),
            agenda: default_agenda(),
            agenda_source: AgendaSource::Fallback,
            status: CallStatus::Generated,
            created_at: wednesday(),
        };
        f.db.insert_emergency_call(&call).unwrap();
        call.id = "c2".into();
        call.created_at = wednesday() + Duration::hours(1);
        call.agenda_source = AgendaSource::Parsed;
        f.db.insert_emergency_call(&call).unwrap();

        let latest = f.db.latest_emergency_call(&f.ws.id).unwrap().unwrap();
        assert_eq!(latest.id, "c2");
        assert_eq!(latest.agenda.len(), 6);
        assert_eq!(latest.agenda_source, AgendaSource::Parsed);
        assert_eq!(latest.status, CallStatus::Generated);
    }
}
