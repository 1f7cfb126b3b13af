//! Site notice board.

use chrono::Utc;
use tracing::info;

use super::Site;
use crate::error::Result;
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::records::notices::{NewSiteNotice, SiteNotice};
use crate::records::notifications::{NewNotification, NotificationCategory};
use crate::records::Priority;
use crate::session::{Permission, Session};

impl Site {
    /// Post a notice to a project board, or site-wide.
    ///
    /// High and urgent notices are also pushed to every other active user's
    /// notification feed, in the same unit as the notice itself.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::PostNotice`], [`crate::Error::NotFound`] for an unknown
    /// project, or a validation error.
    pub fn post_notice(&self, session: &Session, input: NewSiteNotice) -> Result<SiteNotice> {
        session.require(Permission::PostNotice)?;
        if let Some(project_id) = input.project_id {
            self.storage.get_project(project_id)?;
        }
        let poster = session.user_id();
        let mut notice = input.into_notice(poster)?;
        let notice = self.commit(move |store, outbox| {
            let id = store.insert_notice(&notice)?;
            notice.id = Some(id);
            outbox.record(Table::Notices, ChangeKind::Insert, id, None);

            if notice.priority >= Priority::High {
                let recipients = store
                    .list_users()?
                    .into_iter()
                    .filter(|u| u.is_active() && u.id != Some(poster))
                    .filter_map(|u| u.id);
                for user_id in recipients {
                    outbox.notify(store, user_id, alert(&notice, id))?;
                }
            }
            Ok(notice)
        })?;
        info!(
            id = notice.id,
            notice_type = %notice.notice_type,
            priority = %notice.priority,
            "Notice posted"
        );
        Ok(notice)
    }

    /// Notices for a board, most urgent first. With `active_only`, expired
    /// notices are left out. Facets: `type`, `priority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_notices(
        &self,
        project_id: Option<i64>,
        active_only: bool,
        filter: &ListFilter,
    ) -> Result<Vec<SiteNotice>> {
        let active_at = active_only.then(Utc::now);
        Ok(filter.apply(self.storage.list_notices(project_id, active_at)?))
    }

    /// Take a notice down.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] unless the poster or a holder
    /// of [`Permission::PostNotice`], or [`crate::Error::NotFound`].
    pub fn remove_notice(&self, session: &Session, id: i64) -> Result<()> {
        let notice = self.storage.get_notice(id)?;
        session.require_self_or(notice.posted_by, Permission::PostNotice)?;
        self.storage.delete_notice(id)?;
        self.publish(Table::Notices, ChangeKind::Delete, id, None);
        Ok(())
    }
}

fn alert(notice: &SiteNotice, id: i64) -> NewNotification {
    NewNotification::about(
        NotificationCategory::Notice,
        format!("{}: {}", notice.notice_type, notice.title),
        notice.body.clone(),
        format!("notice:{id}"),
    )
    .with_priority(notice.priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::records::notices::NoticeType;
    use crate::session::Role;
    use crate::site::tests::{create_test_site, refuse_notifications, session};
    use chrono::Duration;

    fn notice(priority: Priority) -> NewSiteNotice {
        NewSiteNotice {
            project_id: None,
            notice_type: NoticeType::Safety,
            title: "Crane lift".to_string(),
            body: "Exclusion zone around plot 14 from 10:00".to_string(),
            priority,
            expires_at: None,
        }
    }

    #[test]
    fn test_operative_cannot_post() {
        let site = create_test_site();
        let op = session(&site, "op@example.com", Role::Operative);
        let err = site.post_notice(&op, notice(Priority::Normal)).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_urgent_notice_reaches_everyone_else() {
        let site = create_test_site();
        let sup = session(&site, "sup@example.com", Role::Supervisor);
        let a = session(&site, "a@example.com", Role::Operative);
        let b = session(&site, "b@example.com", Role::Operative);

        site.post_notice(&sup, notice(Priority::Normal)).unwrap();
        assert_eq!(site.storage.unread_count(a.user_id()).unwrap(), 0);

        site.post_notice(&sup, notice(Priority::Urgent)).unwrap();
        assert_eq!(site.storage.unread_count(a.user_id()).unwrap(), 1);
        assert_eq!(site.storage.unread_count(b.user_id()).unwrap(), 1);
        assert_eq!(site.storage.unread_count(sup.user_id()).unwrap(), 0);
        let feed = site.storage.list_notifications(a.user_id(), true).unwrap();
        assert_eq!(feed[0].title, "safety: Crane lift");
    }

    #[test]
    fn test_urgent_notice_not_kept_when_alerts_fail() {
        let site = create_test_site();
        let sup = session(&site, "sup@example.com", Role::Supervisor);
        session(&site, "op@example.com", Role::Operative);
        refuse_notifications(&site);
        let mut board = site.events().subscribe().table(Table::Notices);

        assert!(site.post_notice(&sup, notice(Priority::Urgent)).is_err());
        assert!(site
            .list_notices(None, false, &ListFilter::new())
            .unwrap()
            .is_empty());
        assert!(board.try_recv().is_none());

        let posted = site.post_notice(&sup, notice(Priority::Normal)).unwrap();
        let event = board.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(Some(event.record_id), posted.id);
    }

    #[test]
    fn test_unknown_project_rejected() {
        let site = create_test_site();
        let sup = session(&site, "sup@example.com", Role::Supervisor);
        let mut input = notice(Priority::Normal);
        input.project_id = Some(42);
        let err = site.post_notice(&sup, input).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_list_orders_by_priority_and_filters_type() {
        let site = create_test_site();
        let sup = session(&site, "sup@example.com", Role::Supervisor);
        site.post_notice(&sup, notice(Priority::Low)).unwrap();
        site.post_notice(&sup, notice(Priority::Urgent)).unwrap();
        let mut dabs = notice(Priority::Normal);
        dabs.notice_type = NoticeType::Dabs;
        dabs.expires_at = Some(Utc::now() + Duration::hours(8));
        site.post_notice(&sup, dabs).unwrap();

        let all = site.list_notices(None, true, &ListFilter::new()).unwrap();
        let priorities: Vec<_> = all.iter().map(|n| n.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::Normal, Priority::Low]
        );

        let filter = ListFilter::new().facet("type", "dabs");
        assert_eq!(site.list_notices(None, true, &filter).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_notice() {
        let site = create_test_site();
        let sup = session(&site, "sup@example.com", Role::Supervisor);
        let op = session(&site, "op@example.com", Role::Operative);
        let id = site.post_notice(&sup, notice(Priority::Low)).unwrap().id.unwrap();

        assert!(site.remove_notice(&op, id).unwrap_err().is_access_denied());
        site.remove_notice(&sup, id).unwrap();
        assert!(site
            .list_notices(None, false, &ListFilter::new())
            .unwrap()
            .is_empty());
    }
}
