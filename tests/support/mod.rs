#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use momentum_sync::calendar::{CalendarProvider, InsertOutcome};
use momentum_sync::db::Database;
use momentum_sync::error::ProviderError;
use momentum_sync::models::{EventDescriptor, TokenGrant};
use momentum_sync::sync::{SyncContext, SyncDispatcher, SyncExecutor, SyncSettings};

/// In-memory calendar that behaves like the real provider: inserting an id
/// twice yields a conflict.
#[derive(Default)]
pub struct FakeCalendar {
    pub inserted: Mutex<Vec<EventDescriptor>>,
    pub tokens_used: Mutex<Vec<String>>,
    existing: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    grant: Mutex<Option<TokenGrant>>,
    pub refresh_calls: Mutex<Vec<String>>,
}

impl FakeCalendar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make inserts of `event_id` fail with a server error.
    pub fn fail_on(&self, event_id: &str) {
        self.failing.lock().unwrap().insert(event_id.to_string());
    }

    pub fn grant_on_refresh(&self, access_token: &str, expires_in: i64) {
        *self.grant.lock().unwrap() = Some(TokenGrant {
            access_token: access_token.to_string(),
            expires_in: Some(expires_in),
        });
    }

    pub fn inserted_ids(&self) -> Vec<String> {
        self.inserted
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.existing.lock().unwrap().len()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn insert_event(
        &self,
        access_token: &str,
        _calendar_id: &str,
        event: &EventDescriptor,
    ) -> Result<InsertOutcome, ProviderError> {
        self.tokens_used
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.inserted.lock().unwrap().push(event.clone());

        if self.failing.lock().unwrap().contains(&event.id) {
            return Err(ProviderError::Status {
                status: 500,
                body: "backend error".to_string(),
            });
        }
        if self.existing.lock().unwrap().insert(event.id.clone()) {
            Ok(InsertOutcome::Created)
        } else {
            Ok(InsertOutcome::Conflict)
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.refresh_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.grant
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::Status {
                status: 400,
                body: "invalid_grant".to_string(),
            })
    }
}

/// Dispatcher that only records who it was asked to sync.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub dispatched: Mutex<Vec<String>>,
}

impl SyncDispatcher for RecordingDispatcher {
    fn dispatch(&self, uid: &str) {
        self.dispatched.lock().unwrap().push(uid.to_string());
    }
}

pub fn database() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        calendar_id: "primary".to_string(),
        time_zone: chrono_tz::America::New_York,
    }
}

pub fn executor(db: &Database, calendar: Arc<FakeCalendar>) -> SyncExecutor {
    SyncExecutor::new(SyncContext::with_database(db.clone(), calendar, settings()))
}

pub fn connect(db: &Database, uid: &str, access_token: &str) {
    db.set_document(
        &format!("users/{uid}/private/credentials"),
        json!({
            "googleCalendar": {
                "access_token": access_token,
                "refresh_token": "refresh",
                "email": format!("{uid}@example.com"),
                "created_at": "2024-01-01T00:00:00Z"
            }
        }),
        false,
    )
    .expect("Failed to store credential");
}

pub fn put_tasks(db: &Database, uid: &str, tasks: serde_json::Value) {
    db.set_document(
        &format!("users/{uid}/tasks/list"),
        json!({ "list": tasks }),
        false,
    )
    .expect("Failed to store tasks");
}

pub fn task(id: &str, due: &str, start: &str, end: &str) -> serde_json::Value {
    json!({
        "id": id,
        "text": format!("Task {id}"),
        "dueDate": due,
        "startTime": start,
        "endTime": end,
        "category": "work",
        "completed": false
    })
}
