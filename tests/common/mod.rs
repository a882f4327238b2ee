#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use financeu::auth::{Identity, Session, SessionService, SignInCredentials};
use financeu::auth_store::AuthStore;
use financeu::db::{
    Expense, ExpenseStore, ExpenseUpdate, NewExpense, ProfileRow, ProfileStore, ProfileUpdate,
    ProfileUpsert,
};
use financeu::error::{Error, Result};
use financeu::storage::KeyValueStorage;

pub const PASSWORD: &str = "correct horse";

pub fn identity(email: &str) -> Identity {
    Identity::new(&uuid::Uuid::new_v4().to_string(), Some(email))
}

pub fn session_for(identity: &Identity) -> Session {
    Session::new(
        &format!("access-{}", identity.id),
        &format!("refresh-{}", identity.id),
        3600,
        identity.clone(),
    )
}

pub fn complete_row(user_id: &str, name: &str, budget: f64) -> ProfileRow {
    ProfileRow {
        id: Some(serde_json::json!(7)),
        created_at: Some("2024-05-01T10:00:00+00:00".to_string()),
        user_id: Some(user_id.to_string()),
        full_name: Some(name.to_string()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        monthly_budget: Some(budget),
    }
}

/// Session service holding one session in memory.
///
/// When gated, each session lookup reads the current session and then waits
/// for a permit from [`FakeSessions::release`] before answering.
#[derive(Default)]
pub struct FakeSessions {
    current: Mutex<Option<Session>>,
    accounts: Mutex<HashMap<String, Identity>>,
    gate: Option<Semaphore>,
    pub lookups: AtomicUsize,
    pub fail_current: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub activated: AtomicUsize,
}

impl FakeSessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        })
    }

    /// Let `n` gated session lookups answer
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Wait until `n` session lookups have started
    pub async fn wait_for_lookups(&self, n: usize) {
        while self.lookups.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    /// Register an account that can sign in with [`PASSWORD`]
    pub fn with_account(self: Arc<Self>, identity: &Identity) -> Arc<Self> {
        self.accounts.lock().unwrap().insert(
            identity.email.clone().unwrap_or_default(),
            identity.clone(),
        );
        self
    }

    /// Pretend a session survived from an earlier run
    pub fn set_current(&self, session: Option<Session>) {
        *self.current.lock().unwrap() = session;
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionService for FakeSessions {
    async fn sign_in(&self, credentials: &SignInCredentials) -> Result<Session> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let identity = self
            .accounts
            .lock()
            .unwrap()
            .get(&credentials.email)
            .cloned();
        match identity {
            Some(identity) if credentials.password == PASSWORD => {
                let session = session_for(&identity);
                self.set_current(Some(session.clone()));
                Ok(session)
            }
            _ => Err(Error::auth("Invalid login credentials")),
        }
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        let current = self.current();
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.fail_current.load(Ordering::SeqCst) {
            return Err(Error::auth("network unreachable"));
        }
        Ok(current)
    }

    async fn set_active_session(&self, session: Session) -> Result<()> {
        self.activated.fetch_add(1, Ordering::SeqCst);
        self.set_current(Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.set_current(None);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(Error::auth("network unreachable"));
        }
        Ok(())
    }
}

/// Profile and expense tables kept in memory.
///
/// When gated, each profile read waits for a permit from [`FakeStore::release`].
#[derive(Default)]
pub struct FakeStore {
    profiles: Mutex<HashMap<String, ProfileRow>>,
    expenses: Mutex<Vec<Expense>>,
    next_expense_id: AtomicI64,
    gate: Option<Semaphore>,
    pub fail: AtomicBool,
    pub completion_calls: AtomicUsize,
    pub find_calls: AtomicUsize,
    pub upserts: Mutex<Vec<ProfileUpsert>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        })
    }

    /// Let `n` gated profile reads proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn insert_profile(&self, user_id: &str, row: ProfileRow) {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id.to_string(), row);
    }

    pub fn profile_row(&self, user_id: &str) -> Option<ProfileRow> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    pub fn expense_count(&self) -> usize {
        self.expenses.lock().unwrap().len()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn check_fail(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::database(500, "connection reset"));
        }
        Ok(())
    }

    fn row(&self, user_id: &str) -> Result<ProfileRow> {
        self.check_fail()?;
        self.profile_row(user_id).ok_or(Error::NotFound)
    }
}

#[async_trait]
impl ProfileStore for FakeStore {
    async fn profile_completion(&self, user_id: &str) -> Result<ProfileRow> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let row = self.row(user_id)?;
        Ok(ProfileRow {
            full_name: row.full_name,
            monthly_budget: row.monthly_budget,
            ..Default::default()
        })
    }

    async fn find_profile(&self, user_id: &str) -> Result<ProfileRow> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.row(user_id)
    }

    async fn upsert_profile(&self, profile: &ProfileUpsert) -> Result<()> {
        self.check_fail()?;
        self.upserts.lock().unwrap().push(profile.clone());
        let mut profiles = self.profiles.lock().unwrap();
        let row = profiles
            .entry(profile.user_id.clone())
            .or_insert_with(|| ProfileRow {
                id: Some(serde_json::json!(1)),
                user_id: Some(profile.user_id.clone()),
                ..Default::default()
            });
        row.full_name = Some(profile.full_name.clone());
        row.email = Some(profile.email.clone());
        row.monthly_budget = Some(profile.monthly_budget);
        Ok(())
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        self.check_fail()?;
        let mut profiles = self.profiles.lock().unwrap();
        let row = profiles.get_mut(user_id).ok_or(Error::NotFound)?;
        if let Some(full_name) = &update.full_name {
            row.full_name = Some(full_name.clone());
        }
        if let Some(email) = &update.email {
            row.email = Some(email.clone());
        }
        if let Some(budget) = update.monthly_budget {
            row.monthly_budget = Some(budget);
        }
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for FakeStore {
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>> {
        self.check_fail()?;
        let mut expenses: Vec<Expense> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|expense| expense.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(expenses)
    }

    async fn add_expense(&self, expense: &NewExpense) -> Result<()> {
        self.check_fail()?;
        let id = self.next_expense_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.expenses.lock().unwrap().push(Expense {
            id,
            user_id: Some(expense.user_id.clone()),
            title: expense.title.clone(),
            cost: expense.cost,
            created_at: None,
        });
        Ok(())
    }

    async fn update_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<()> {
        self.check_fail()?;
        let mut expenses = self.expenses.lock().unwrap();
        let expense = expenses
            .iter_mut()
            .find(|expense| expense.id == id)
            .ok_or(Error::NotFound)?;
        expense.title = update.title.clone();
        expense.cost = update.cost;
        Ok(())
    }

    async fn delete_expense(&self, id: i64) -> Result<()> {
        self.check_fail()?;
        self.expenses.lock().unwrap().retain(|expense| expense.id != id);
        Ok(())
    }
}

/// Storage whose every operation fails
pub struct FailingStorage;

#[async_trait]
impl KeyValueStorage for FailingStorage {
    async fn get_item(&self, _name: &str) -> Result<Option<String>> {
        Err(Error::storage("storage unavailable"))
    }

    async fn set_item(&self, _name: &str, _value: &str) -> Result<()> {
        Err(Error::storage("storage unavailable"))
    }

    async fn remove_item(&self, _name: &str) -> Result<()> {
        Err(Error::storage("storage unavailable"))
    }
}

pub fn store_with(sessions: &Arc<FakeSessions>, profiles: &Arc<FakeStore>) -> AuthStore {
    AuthStore::new(sessions.clone(), profiles.clone())
}
