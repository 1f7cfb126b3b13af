//! The site service.
//!
//! [`Site`] owns the store, the loaded configuration and the event bus, and
//! is the one place where access rules, compliance gating and notifications
//! meet the records. Every mutating operation takes the acting [`Session`]
//! explicitly, writes through [`Storage`], then publishes a [`ChangeEvent`].
//! An operation that writes more than one row, such as a change plus the
//! notifications it sends, runs as one storage unit and holds its events
//! back until that unit commits. A failed operation publishes
//! nothing and leaves the store unchanged.

mod deliveries;
mod notices;
mod notifications;
mod projects;
mod qualifications;
mod rams;
mod users;

use regex::Regex;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{ChangeEvent, ChangeKind, EventBus, Table};
use crate::records::notifications::NewNotification;
use crate::session::Session;
use crate::storage::{Storage, StorageStats};

pub use qualifications::QualificationView;
pub use rams::Reading;

/// Records, rules and change feed for one site database.
#[derive(Debug)]
pub struct Site {
    storage: Storage,
    config: Config,
    events: EventBus,
    email_pattern: Regex,
}

impl Site {
    /// Open the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Self::with_storage(storage, config)
    }

    /// Build a site over an already opened store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for an invalid configuration.
    pub fn with_storage(storage: Storage, config: Config) -> Result<Self> {
        config.validate()?;
        let email_pattern =
            Regex::new(&config.users.email_pattern).map_err(|e| Error::ConfigValidation {
                message: format!("users.email_pattern: {e}"),
            })?;
        let events = EventBus::new(config.events.channel_capacity);
        info!(database = %storage.path().display(), "Site ready");
        Ok(Self {
            storage,
            config,
            events,
            email_pattern,
        })
    }

    /// Open a session for a stored user, looked up by email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUser`] if no profile has that email, or
    /// [`Error::InactiveUser`] if the profile is deactivated.
    pub fn session_for(&self, email: &str) -> Result<Session> {
        let user = self
            .storage
            .find_user_by_email(email)?
            .ok_or_else(|| Error::UnknownUser {
                email: email.trim().to_lowercase(),
            })?;
        let session = Session::for_user(&user)?;
        debug!(user_id = session.user_id(), role = %session.role(), "Session opened");
        Ok(session)
    }

    /// The change feed.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    fn publish(&self, table: Table, kind: ChangeKind, record_id: i64, user_id: Option<i64>) {
        self.events.publish(change_event(table, kind, record_id, user_id));
    }

    /// Run `work` as one storage unit, then publish the events it recorded.
    /// Nothing is published when the unit rolls back.
    fn commit<T>(&self, work: impl FnOnce(&Storage, &mut Outbox) -> Result<T>) -> Result<T> {
        let mut outbox = Outbox::default();
        let value = self.storage.atomically(|store| work(store, &mut outbox))?;
        debug!(events = outbox.events.len(), "Unit committed");
        for event in outbox.events {
            self.events.publish(event);
        }
        Ok(value)
    }

    /// Store a notification for a user and announce it.
    fn notify(&self, user_id: i64, notification: NewNotification) -> Result<i64> {
        self.commit(|store, outbox| outbox.notify(store, user_id, notification))
    }
}

/// Change events held back until the writes they describe have committed.
#[derive(Debug, Default)]
struct Outbox {
    events: Vec<ChangeEvent>,
}

impl Outbox {
    fn record(&mut self, table: Table, kind: ChangeKind, record_id: i64, user_id: Option<i64>) {
        self.events.push(change_event(table, kind, record_id, user_id));
    }

    /// Store a notification inside the current unit.
    fn notify(
        &mut self,
        storage: &Storage,
        user_id: i64,
        notification: NewNotification,
    ) -> Result<i64> {
        let notification = notification.into_notification(user_id)?;
        let id = storage.insert_notification(&notification)?;
        self.record(Table::Notifications, ChangeKind::Insert, id, Some(user_id));
        Ok(id)
    }
}

fn change_event(
    table: Table,
    kind: ChangeKind,
    record_id: i64,
    user_id: Option<i64>,
) -> ChangeEvent {
    let event = ChangeEvent::new(table, kind, record_id);
    match user_id {
        Some(user_id) => event.for_user(user_id),
        None => event,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::records::notifications::NotificationCategory;
    use crate::records::users::User;
    use crate::session::Role;

    /// Make every notification insert fail, as a full or locked feed would.
    pub(crate) fn refuse_notifications(site: &Site) {
        site.storage.refuse_writes_to("smart_notifications");
    }

    pub(crate) fn create_test_site() -> Site {
        crate::logging::init_test_logging();
        let storage = Storage::open_in_memory().expect("failed to create test storage");
        Site::with_storage(storage, Config::default()).expect("failed to create test site")
    }

    /// Store a user directly and open a session for them.
    pub(crate) fn session(site: &Site, email: &str, role: Role) -> Session {
        site.storage
            .insert_user(&User::new(email, "Test User", role))
            .unwrap();
        site.session_for(email).unwrap()
    }

    #[test]
    fn test_session_for_unknown_user() {
        let site = create_test_site();
        let err = site.session_for("nobody@example.com").unwrap_err();
        assert!(matches!(err, Error::UnknownUser { .. }));
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_session_for_is_case_insensitive() {
        let site = create_test_site();
        session(&site, "sam@example.com", Role::Manager);
        let again = site.session_for(" SAM@example.com ").unwrap();
        assert_eq!(again.role(), Role::Manager);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.users.email_pattern = "([".to_string();
        let storage = Storage::open_in_memory().unwrap();
        assert!(Site::with_storage(storage, config).is_err());
    }

    #[test]
    fn test_notify_publishes_event() {
        let site = create_test_site();
        let mut feed = site.events().subscribe().table(Table::Notifications);
        let id = site
            .notify(
                7,
                NewNotification::about(
                    NotificationCategory::General,
                    "Hello",
                    "World",
                    "home",
                ),
            )
            .unwrap();
        let event = feed.try_recv().unwrap();
        assert_eq!(event.record_id, id);
        assert_eq!(event.user_id, Some(7));
    }

    #[test]
    fn test_failed_unit_publishes_nothing() {
        let site = create_test_site();
        let mut feed = site.events().subscribe();
        let result: Result<()> = site.commit(|store, outbox| {
            outbox.record(Table::Users, ChangeKind::Insert, 1, None);
            store.insert_user(&User::new("a@example.com", "A", Role::Operative))?;
            Err(Error::internal("abandon"))
        });
        assert!(result.is_err());
        assert!(feed.try_recv().is_none());
        assert_eq!(site.stats().unwrap().users, 0);
    }

    #[test]
    fn test_refused_notification_is_not_announced() {
        let site = create_test_site();
        refuse_notifications(&site);
        let mut feed = site.events().subscribe();
        let message =
            NewNotification::about(NotificationCategory::General, "Hello", "World", "home");
        assert!(site.notify(7, message).is_err());
        assert!(feed.try_recv().is_none());
    }
}
