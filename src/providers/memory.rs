use crate::core::loan::{Loan, LoanStatus, LoanType, LoanUpdate, NewLoan};
use crate::core::service::{AuthService, BackendError, LoanService, Session};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct Account {
    user_id: String,
    password: String,
    name: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// access token -> user id
    tokens: HashMap<String, String>,
    loans: HashMap<String, Loan>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn issue_session(&mut self, email: &str, user_id: &str, name: &str) -> Session {
        let token = self.next_id("token");
        self.tokens.insert(token.clone(), user_id.to_string());
        Session {
            access_token: token,
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: Some(name.to_string()),
            expires_at: None,
        }
    }

    fn authorize(&self, session: &Session) -> Result<String, BackendError> {
        self.tokens
            .get(&session.access_token)
            .cloned()
            .ok_or_else(|| BackendError::Auth("Invalid or expired session".to_string()))
    }

    fn owned_loan(&mut self, user_id: &str, id: &str) -> Result<&mut Loan, BackendError> {
        self.loans
            .get_mut(id)
            .filter(|loan| loan.user_id.as_deref() == Some(user_id))
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

/// In-process backend with the same visibility rules as the hosted one:
/// every user only sees their own loans.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with one demo account owning a handful of sample loans,
    /// already signed in.
    pub async fn demo() -> (Self, Session) {
        let backend = Self::new();
        let mut state = backend.inner.lock().await;
        state.accounts.insert(
            DEMO_EMAIL.to_string(),
            Account {
                user_id: "demo-user".to_string(),
                password: String::new(),
                name: "Demo User".to_string(),
            },
        );
        let samples = [
            (5000, "Home Renovation", LoanStatus::Approved, LoanType::Personal),
            (2000, "Education", LoanStatus::Pending, LoanType::Education),
            (10000, "Business Expansion", LoanStatus::Rejected, LoanType::Business),
            (3000, "Medical Expenses", LoanStatus::Approved, LoanType::Personal),
            (7500, "Vehicle Purchase", LoanStatus::Paid, LoanType::Vehicle),
        ];
        let dates = [
            ("2023-01-15", "2023-07-15"),
            ("2023-02-20", "2023-08-20"),
            ("2023-03-10", "2023-09-10"),
            ("2023-04-05", "2023-10-05"),
            ("2023-05-18", "2023-11-18"),
        ];
        let rows = samples.into_iter().zip(dates);
        for ((amount, purpose, status, loan_type), (created, due)) in rows {
            let id = state.next_id("loan");
            state.loans.insert(
                id.clone(),
                Loan {
                    id,
                    user_id: Some("demo-user".to_string()),
                    amount: Decimal::from(amount),
                    purpose: purpose.to_string(),
                    description: None,
                    status,
                    created_at: format!("{created}T00:00:00"),
                    start_date: Some(created.to_string()),
                    due_date: Some(due.to_string()),
                    interest_rate: Some(Decimal::new(50, 1)),
                    term: Some(12),
                    borrower_name: Some("Demo User".to_string()),
                    loan_type: Some(loan_type),
                },
            );
        }
        let session = state.issue_session(DEMO_EMAIL, "demo-user", "Demo User");
        drop(state);
        (backend, session)
    }
}

pub const DEMO_EMAIL: &str = "demo@loanboard.local";

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, BackendError> {
        let mut state = self.inner.lock().await;
        if state.accounts.contains_key(email) {
            return Err(BackendError::Auth("User already registered".to_string()));
        }
        let user_id = state.next_id("user");
        debug!("Registering {} as {}", email, user_id);
        let session = state.issue_session(email, &user_id, name);
        state.accounts.insert(
            email.to_string(),
            Account {
                user_id,
                password: password.to_string(),
                name: name.to_string(),
            },
        );
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut state = self.inner.lock().await;
        let (user_id, name) = state
            .accounts
            .get(email)
            .filter(|account| account.password == password)
            .map(|account| (account.user_id.clone(), account.name.clone()))
            .ok_or_else(|| BackendError::Auth("Invalid login credentials".to_string()))?;
        Ok(state.issue_session(email, &user_id, &name))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let mut state = self.inner.lock().await;
        state.tokens.remove(&session.access_token);
        Ok(())
    }
}

#[async_trait]
impl LoanService for MemoryBackend {
    async fn list_loans(&self, session: &Session) -> Result<Vec<Loan>, BackendError> {
        let state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        let mut loans: Vec<Loan> = state
            .loans
            .values()
            .filter(|loan| loan.user_id.as_deref() == Some(user_id.as_str()))
            .cloned()
            .collect();
        loans.sort_by(|a, b| {
            b.created_instant()
                .cmp(&a.created_instant())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(loans)
    }

    async fn get_loan(&self, session: &Session, id: &str) -> Result<Loan, BackendError> {
        let mut state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        state.owned_loan(&user_id, id).map(|loan| loan.clone())
    }

    async fn create_loan(&self, session: &Session, new: &NewLoan) -> Result<Loan, BackendError> {
        let mut state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        let id = state.next_id("loan");
        let loan = Loan {
            id: id.clone(),
            user_id: Some(user_id),
            amount: new.amount,
            purpose: new.purpose.clone(),
            description: Some(new.description.clone()),
            status: new.status,
            created_at: Utc::now().to_rfc3339(),
            start_date: Some(new.start_date.to_string()),
            due_date: new.due_date.map(|d| d.to_string()),
            interest_rate: Some(new.interest_rate),
            term: Some(new.term),
            borrower_name: Some(new.borrower_name.clone()),
            loan_type: Some(new.loan_type),
        };
        debug!("Created loan {}", id);
        state.loans.insert(id, loan.clone());
        Ok(loan)
    }

    async fn update_loan(
        &self,
        session: &Session,
        id: &str,
        update: &LoanUpdate,
    ) -> Result<Loan, BackendError> {
        let mut state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        let loan = state.owned_loan(&user_id, id)?;
        loan.amount = update.amount;
        loan.purpose = update.purpose.clone();
        loan.description = Some(update.description.clone());
        loan.interest_rate = Some(update.interest_rate);
        loan.term = Some(update.term);
        loan.borrower_name = Some(update.borrower_name.clone());
        loan.loan_type = Some(update.loan_type);
        loan.start_date = Some(update.start_date.to_string());
        if let Some(due_date) = update.due_date {
            loan.due_date = Some(due_date.to_string());
        }
        Ok(loan.clone())
    }

    async fn update_status(
        &self,
        session: &Session,
        id: &str,
        status: LoanStatus,
    ) -> Result<Loan, BackendError> {
        let mut state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        let loan = state.owned_loan(&user_id, id)?;
        loan.status = status;
        Ok(loan.clone())
    }

    async fn delete_loan(&self, session: &Session, id: &str) -> Result<(), BackendError> {
        let mut state = self.inner.lock().await;
        let user_id = state.authorize(session)?;
        state.owned_loan(&user_id, id)?;
        state.loans.remove(id);
        debug!("Deleted loan {}", id);
        Ok(())
    }
}
