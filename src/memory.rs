//! Process-local store used when no `DATABASE_URL` is configured and by tests.
//!
//! Listings go through [`specification::select`], so a predicate filters
//! these tables the same way it filters the Postgres ones.

use std::collections::BTreeSet;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    courses::{
        repo::CourseStore,
        repo_types::{Course, COURSE_USERS},
    },
    error::Duplicate,
    notifications::{repo::NotificationStore, repo_types::Notification},
    specification::{self, Filterable, Page, Pageable, Predicate, Value},
    users::{
        repo::UserStore,
        repo_types::{User, USER_COURSES},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    courses: Vec<Course>,
    /// (course_id, user_id)
    subscriptions: BTreeSet<(Uuid, Uuid)>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn courses_of(&self, user_id: Uuid) -> Vec<Uuid> {
        self.subscriptions
            .iter()
            .filter(|(_, u)| *u == user_id)
            .map(|(c, _)| *c)
            .collect()
    }

    fn users_of(&self, course_id: Uuid) -> Vec<Uuid> {
        self.subscriptions
            .iter()
            .filter(|(c, _)| *c == course_id)
            .map(|(_, u)| *u)
            .collect()
    }
}

/// A row plus the ids it is linked to through one join table.
struct Linked<T> {
    row: T,
    relation: &'static str,
    links: Vec<Uuid>,
}

impl<T: Filterable> Filterable for Linked<T> {
    fn field(&self, column: &str) -> Option<Value> {
        self.row.field(column)
    }

    fn related(&self, relation: &str) -> &[Uuid] {
        if relation == self.relation {
            &self.links
        } else {
            &[]
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.users.iter().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn list_users(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<User>> {
        let t = self.tables.read().await;
        let rows = t.users.iter().map(|u| Linked {
            row: u.clone(),
            relation: USER_COURSES.name,
            links: t.courses_of(u.id),
        });
        Ok(specification::select(rows, spec, pageable).map(|l| l.row))
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.id == user.id) {
            bail!("duplicate user {}", user.id);
        }
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(Duplicate("Username is already taken".into()).into());
        }
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(Duplicate("Email is already taken".into()).into());
        }
        t.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| anyhow!("user {} does not exist", user.id))?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        t.subscriptions.retain(|(_, u)| *u != id);
        t.notifications.retain(|n| n.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let t = self.tables.read().await;
        Ok(t.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<Course>> {
        let t = self.tables.read().await;
        let rows = t.courses.iter().map(|c| Linked {
            row: c.clone(),
            relation: COURSE_USERS.name,
            links: t.users_of(c.id),
        });
        Ok(specification::select(rows, spec, pageable).map(|l| l.row))
    }

    async fn insert_course(&self, course: &Course) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if t.courses.iter().any(|c| c.id == course.id) {
            bail!("duplicate course {}", course.id);
        }
        t.courses.push(course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .courses
            .iter_mut()
            .find(|c| c.id == course.id)
            .ok_or_else(|| anyhow!("course {} does not exist", course.id))?;
        *slot = course.clone();
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.courses.len();
        t.courses.retain(|c| c.id != id);
        if t.courses.len() == before {
            return Ok(false);
        }
        t.subscriptions.retain(|(c, _)| *c != id);
        Ok(true)
    }

    async fn is_subscribed(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.subscriptions.contains(&(course_id, user_id)))
    }

    async fn subscribe(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if !t.subscriptions.insert((course_id, user_id)) {
            return Err(Duplicate("Subscription already exists".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn list_notifications(
        &self,
        spec: &Predicate,
        pageable: &Pageable,
    ) -> anyhow::Result<Page<Notification>> {
        let t = self.tables.read().await;
        Ok(specification::select(t.notifications.iter().cloned(), spec, pageable))
    }

    async fn find_notification(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Notification>> {
        let t = self.tables.read().await;
        Ok(t
            .notifications
            .iter()
            .find(|n| n.id == id && n.user_id == user_id)
            .cloned())
    }

    async fn insert_notification(&self, notification: &Notification) -> anyhow::Result<()> {
        self.tables.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn update_notification(&self, notification: &Notification) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .notifications
            .iter_mut()
            .find(|n| n.id == notification.id)
            .ok_or_else(|| anyhow!("notification {} does not exist", notification.id))?;
        *slot = notification.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        courses::repo_types::{CourseLevel, CourseStatus},
        specification::Sort,
        users::repo_types::UserType,
    };
    use time::OffsetDateTime;

    fn user(username: &str) -> User {
        User::new(
            username.into(),
            format!("{username}@ead.dev"),
            "hash".into(),
            format!("{username} Silva"),
            UserType::Student,
        )
    }

    fn course(name: &str) -> Course {
        let now = OffsetDateTime::now_utc();
        Course {
            id: Uuid::new_v4(),
            name: name.into(),
            description: "desc".into(),
            image_url: None,
            course_status: CourseStatus::InProgress,
            course_level: CourseLevel::Beginner,
            user_instructor: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn all(size: u32) -> Pageable {
        Pageable {
            page: 0,
            size,
            sort: Some(Sort::asc("username")),
        }
    }

    #[tokio::test]
    async fn username_is_unique() {
        let store = MemoryStore::default();
        store.insert_user(&user("bruno")).await.unwrap();
        assert!(store.insert_user(&user("bruno")).await.is_err());
        assert!(store.username_exists("bruno").await.unwrap());
        assert!(store.email_exists("BRUNO@ead.dev").await.unwrap());
    }

    #[tokio::test]
    async fn email_is_unique_ignoring_case() {
        let store = MemoryStore::default();
        store.insert_user(&user("bruno")).await.unwrap();
        let mut other = user("bruna");
        other.email = "Bruno@EAD.dev".into();
        let err = store.insert_user(&other).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<Duplicate>().map(|d| d.0.as_str()),
            Some("Email is already taken")
        );
    }

    #[tokio::test]
    async fn second_subscription_is_a_duplicate() {
        let store = MemoryStore::default();
        let (a, rust) = (user("ana"), course("Rust"));
        store.insert_user(&a).await.unwrap();
        store.insert_course(&rust).await.unwrap();
        store.subscribe(rust.id, a.id).await.unwrap();
        let err = store.subscribe(rust.id, a.id).await.unwrap_err();
        assert!(err.downcast_ref::<Duplicate>().is_some());
    }

    #[tokio::test]
    async fn users_of_course_follow_subscriptions() {
        let store = MemoryStore::default();
        let (a, b) = (user("ana"), user("beto"));
        let rust = course("Rust");
        store.insert_user(&a).await.unwrap();
        store.insert_user(&b).await.unwrap();
        store.insert_course(&rust).await.unwrap();
        store.subscribe(rust.id, b.id).await.unwrap();

        let page = store
            .list_users(&Predicate::related(&USER_COURSES, rust.id), &all(10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, b.id);

        let courses = store
            .list_courses(&Predicate::related(&COURSE_USERS, b.id), &Pageable { sort: None, ..all(10) })
            .await
            .unwrap();
        assert_eq!(courses.content, vec![rust]);
    }

    #[tokio::test]
    async fn deleting_a_course_drops_its_subscriptions() {
        let store = MemoryStore::default();
        let a = user("ana");
        let rust = course("Rust");
        store.insert_user(&a).await.unwrap();
        store.insert_course(&rust).await.unwrap();
        store.subscribe(rust.id, a.id).await.unwrap();
        assert!(store.subscribe(rust.id, a.id).await.is_err());

        assert!(store.delete_course(rust.id).await.unwrap());
        assert!(!store.is_subscribed(rust.id, a.id).await.unwrap());
        assert!(!store.delete_course(rust.id).await.unwrap());
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_their_user() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let n = Notification::new(owner, "t".into(), "m".into());
        store.insert_notification(&n).await.unwrap();
        assert!(store.find_notification(n.id, owner).await.unwrap().is_some());
        assert!(store.find_notification(n.id, Uuid::new_v4()).await.unwrap().is_none());
    }
}
