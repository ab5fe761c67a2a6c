use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::deadlines::clock::FixedClock;
use crate::workflows::deadlines::domain::{
    Client, ClientId, ClientStatus, DueDate, GstReturn, Invoice, InvoiceStatus, Money, Notice,
    NoticeStatus, Notification, NotificationDraft, Obligation, ObligationId, ObligationKind,
    RegistrationStatus, ReturnStatus, ReturnType, UserId,
};
use crate::workflows::deadlines::memory::InMemoryEntityStore;
use crate::workflows::deadlines::repository::{
    ClientWithObligations, EntityStore, ReportingWindow, StoreError,
};
use crate::workflows::deadlines::{
    compliance_router, ComplianceApi, ComplianceEngine, EngineConfig,
};

pub(super) const PRACTITIONER: &str = "ca-priya";

pub(super) fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(super) fn now() -> DateTime<Utc> {
    at("2024-11-20T09:00:00Z")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn client(id: &str, name: &str) -> Client {
    Client {
        id: ClientId(id.to_string()),
        name: name.to_string(),
        gstin: format!("27{}F1ZV", id.to_uppercase()),
        registration_status: RegistrationStatus::Active,
        status: ClientStatus::Active,
        practitioner: UserId(PRACTITIONER.to_string()),
    }
}

pub(super) fn gst_return(
    id: &str,
    client_id: &str,
    period: &str,
    due: &str,
    status: ReturnStatus,
) -> GstReturn {
    GstReturn {
        id: ObligationId(id.to_string()),
        client_id: ClientId(client_id.to_string()),
        return_type: ReturnType::Gstr3b,
        period: period.to_string(),
        due_date: DueDate(due.to_string()),
        status,
        filed_at: None,
        tax_liability: Some(Money::from_rupees(42_000)),
    }
}

pub(super) fn notice(id: &str, client_id: &str, due: &str, status: NoticeStatus) -> Notice {
    Notice {
        id: ObligationId(id.to_string()),
        client_id: ClientId(client_id.to_string()),
        notice_number: format!("ASMT-10/{id}"),
        subject: "Discrepancy between GSTR-1 and GSTR-3B".to_string(),
        due_date: DueDate(due.to_string()),
        status,
        resolved_at: None,
        demand_amount: None,
    }
}

pub(super) fn invoice(
    id: &str,
    client_id: &str,
    issued_on: NaiveDate,
    due: &str,
    rupees: i64,
    status: InvoiceStatus,
) -> Invoice {
    Invoice {
        id: ObligationId(id.to_string()),
        client_id: ClientId(client_id.to_string()),
        invoice_number: id.to_uppercase(),
        issued_on,
        due_date: DueDate(due.to_string()),
        amount: Money::from_rupees(rupees),
        status,
        paid_at: None,
    }
}

pub(super) fn engine_for<S: EntityStore + 'static>(store: Arc<S>) -> ComplianceEngine<S> {
    ComplianceEngine::new(store, EngineConfig::default())
}

/// Two clients, five returns (three overdue, two filed), one pending notice.
pub(super) fn practice_store() -> Arc<InMemoryEntityStore> {
    let store = Arc::new(InMemoryEntityStore::new());
    store
        .insert_client(client("c-1", "Sharma Textiles"))
        .expect("insert client");
    store
        .insert_client(client("c-2", "Kaveri Foods"))
        .expect("insert client");

    for record in [
        gst_return("r-1", "c-1", "08-2024", "2024-09-20", ReturnStatus::Draft),
        gst_return("r-2", "c-1", "09-2024", "2024-10-20", ReturnStatus::Pending),
        gst_return("r-3", "c-2", "09-2024", "2024-10-20", ReturnStatus::Draft),
        gst_return("r-4", "c-2", "08-2024", "2024-09-20", ReturnStatus::Filed),
        gst_return("r-5", "c-1", "07-2024", "2024-08-20", ReturnStatus::Filed),
    ] {
        store.insert_return(record).expect("insert return");
    }

    store
        .insert_notice(notice("n-1", "c-2", "2024-11-05", NoticeStatus::Pending))
        .expect("insert notice");

    store
}

pub(super) fn router_for(store: Arc<InMemoryEntityStore>) -> axum::Router {
    let engine = Arc::new(engine_for(store));
    compliance_router(ComplianceApi::new(engine, Arc::new(FixedClock(now()))))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn find_outstanding(
        &self,
        _kind: ObligationKind,
        _before_or_on: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn find_notifications_since(
        &self,
        _recipient: &UserId,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn create_notification(&self, _draft: NotificationDraft) -> Result<Notification, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn find_all_clients_with_obligations(
        &self,
        _window: ReportingWindow,
    ) -> Result<Vec<ClientWithObligations>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_client(&self, _id: &ClientId) -> Result<Option<Client>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn find_invoices_issued_in(&self, _year: i32) -> Result<Vec<Invoice>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Delegates to an in-memory store but fails notification writes whose title
/// contains `poisoned_marker`, either as a rejection or as an outage.
pub(super) struct FaultyWrites {
    pub(super) inner: InMemoryEntityStore,
    pub(super) poisoned_marker: String,
    pub(super) outage: bool,
}

impl EntityStore for FaultyWrites {
    fn find_outstanding(
        &self,
        kind: ObligationKind,
        before_or_on: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        self.inner.find_outstanding(kind, before_or_on)
    }

    fn find_notifications_since(
        &self,
        recipient: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        self.inner.find_notifications_since(recipient, since)
    }

    fn create_notification(&self, draft: NotificationDraft) -> Result<Notification, StoreError> {
        if draft.title.contains(&self.poisoned_marker) {
            return Err(if self.outage {
                StoreError::Unavailable("connection reset".to_string())
            } else {
                StoreError::Rejected("title too long".to_string())
            });
        }
        self.inner.create_notification(draft)
    }

    fn find_all_clients_with_obligations(
        &self,
        window: ReportingWindow,
    ) -> Result<Vec<ClientWithObligations>, StoreError> {
        self.inner.find_all_clients_with_obligations(window)
    }

    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, StoreError> {
        self.inner.fetch_client(id)
    }

    fn find_invoices_issued_in(&self, year: i32) -> Result<Vec<Invoice>, StoreError> {
        self.inner.find_invoices_issued_in(year)
    }
}
