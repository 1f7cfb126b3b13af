//! Change events.
//!
//! Every successful write publishes a [`ChangeEvent`] on the [`EventBus`].
//! Subscribers receive events in publish order and may narrow what they see
//! to one table or one user. A subscription ends when it is dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Tables that publish changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// User profiles.
    Users,
    /// Projects and plots.
    Projects,
    /// Work-unit assignments and logs.
    UnitWork,
    /// RAMS documents.
    RamsDocuments,
    /// RAMS signatures.
    Signatures,
    /// The task-plan RAMS register.
    Register,
    /// Delivery requests.
    Deliveries,
    /// Site notices.
    Notices,
    /// Notifications.
    Notifications,
    /// Qualifications.
    Qualifications,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Users => "users",
            Self::Projects => "projects",
            Self::UnitWork => "unit_work",
            Self::RamsDocuments => "rams_documents",
            Self::Signatures => "contractor_rams_signatures",
            Self::Register => "task_plan_rams_register",
            Self::Deliveries => "delivery_requests",
            Self::Notices => "site_notices",
            Self::Notifications => "smart_notifications",
            Self::Qualifications => "qualifications",
        };
        f.write_str(s)
    }
}

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A committed change to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Table changed.
    pub table: Table,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Row id.
    pub record_id: i64,
    /// User the row belongs to, when it belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// When the change was published.
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Build an event stamped now.
    #[must_use]
    pub fn new(table: Table, kind: ChangeKind, record_id: i64) -> Self {
        Self {
            table,
            kind,
            record_id,
            user_id: None,
            at: Utc::now(),
        }
    }

    /// Attach the owning user.
    #[must_use]
    pub fn for_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Fan-out of change events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        trace!(
            table = %event.table,
            kind = %event.kind,
            record_id = event.record_id,
            "Publishing change"
        );
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to every change.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            table: None,
            user_id: None,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A filtered stream of change events.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    table: Option<Table>,
    user_id: Option<i64>,
}

impl Subscription {
    /// Only deliver changes to one table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Only deliver changes belonging to one user.
    #[must_use]
    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    fn wants(&self, event: &ChangeEvent) -> bool {
        self.table.map_or(true, |t| t == event.table)
            && self.user_id.map_or(true, |u| event.user_id == Some(u))
    }

    /// Wait for the next matching event. Returns `None` once the bus is gone.
    ///
    /// A subscriber that falls behind skips the events it missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscriber lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscriber lagged, skipping ahead");
                }
                Err(_) => return None,
            }
        }
    }

    /// Hand every matching event to a handler on a background task.
    ///
    /// The task ends when the bus is dropped or the handle is aborted.
    pub fn forward<H>(mut self, handler: H) -> JoinHandle<()>
    where
        H: EventHandler + 'static,
    {
        tokio::spawn(async move {
            while let Some(event) = self.recv().await {
                handler.handle(&event).await;
            }
            debug!("Change forwarding finished");
        })
    }
}

/// Something that reacts to change events.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// React to one event.
    async fn handle(&self, event: &ChangeEvent);
}

/// Handler that writes every change to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

#[async_trait::async_trait]
impl EventHandler for LogEvents {
    async fn handle(&self, event: &ChangeEvent) {
        debug!(
            table = %event.table,
            kind = %event.kind,
            record_id = event.record_id,
            user_id = ?event.user_id,
            "Record changed"
        );
    }
}
