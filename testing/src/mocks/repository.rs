use portal_core::environment::Clock;
use portal_core::repository::RepoFuture;
use portal_core::{NewUser, RepositoryError, User, UserRepository};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

/// In-memory user repository.
///
/// Mirrors the Postgres repository's contract: ids are assigned
/// sequentially from 1, emails are unique, and `list` orders by id.
/// [`set_unavailable`](Self::set_unavailable) makes every operation fail
/// with [`RepositoryError::Internal`].
#[derive(Clone)]
pub struct InMemoryUserRepository {
    store: Arc<Mutex<Store>>,
    unavailable: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserRepository {
    /// Create an empty repository using the default test clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(super::test_clock()))
    }

    /// Create an empty repository stamping records with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            unavailable: Arc::new(AtomicBool::new(false)),
            clock,
        }
    }

    /// Toggle simulated backend failure.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|store| store.users.len()).unwrap_or_default()
    }

    /// `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Internal("repository unavailable".to_string()));
        }
        self.store
            .lock()
            .map_err(|_| RepositoryError::Internal("repository lock poisoned".to_string()))
    }

    fn email_taken(store: &Store, email: &str, except: Option<i64>) -> bool {
        store
            .users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryUserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserRepository")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn create<'a>(&'a self, user: &'a NewUser) -> RepoFuture<'a, User> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut store = self.lock()?;
            if Self::email_taken(&store, &user.email, None) {
                return Err(RepositoryError::Conflict("users_email_key".to_string()));
            }

            store.next_id += 1;
            let created = User {
                id: store.next_id,
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                role: user.role,
                created_at: now,
                updated_at: now,
            };
            store.users.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn get_by_id(&self, id: i64) -> RepoFuture<'_, User> {
        Box::pin(async move {
            self.lock()?
                .users
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn get_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, User> {
        Box::pin(async move {
            self.lock()?
                .users
                .values()
                .find(|u| u.email == email)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn update<'a>(&'a self, user: &'a User) -> RepoFuture<'a, User> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut store = self.lock()?;
            if Self::email_taken(&store, &user.email, Some(user.id)) {
                return Err(RepositoryError::Conflict("users_email_key".to_string()));
            }

            let existing = store
                .users
                .get_mut(&user.id)
                .ok_or(RepositoryError::NotFound)?;
            existing.name.clone_from(&user.name);
            existing.email.clone_from(&user.email);
            existing.role = user.role;
            existing.updated_at = now;
            Ok(existing.clone())
        })
    }

    fn delete(&self, id: i64) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            self.lock()?
                .users
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn list(&self, limit: i64, offset: i64) -> RepoFuture<'_, (Vec<User>, i64)> {
        Box::pin(async move {
            let store = self.lock()?;
            let total = i64::try_from(store.users.len()).unwrap_or(i64::MAX);
            let page = store
                .users
                .values()
                .skip(usize::try_from(offset).unwrap_or(0))
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect();
            Ok((page, total))
        })
    }

    fn ping(&self) -> RepoFuture<'_, ()> {
        Box::pin(async move { self.lock().map(|_| ()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use portal_core::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids_and_rejects_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(&new_user("a@b.co")).await.unwrap();
        let second = repo.create(&new_user("c@d.co")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let dup = repo.create(&new_user("a@b.co")).await.unwrap_err();
        assert!(matches!(dup, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_checks_email_uniqueness_against_others_only() {
        let repo = InMemoryUserRepository::new();
        let mut a = repo.create(&new_user("a@b.co")).await.unwrap();
        repo.create(&new_user("c@d.co")).await.unwrap();

        a.name = "Renamed".to_string();
        assert_eq!(repo.update(&a).await.unwrap().name, "Renamed");

        a.email = "c@d.co".to_string();
        assert!(matches!(
            repo.update(&a).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn list_pages_in_id_order_with_total() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            repo.create(&new_user(&format!("u{i}@b.co"))).await.unwrap();
        }

        let (page, total) = repo.list(2, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|u| u.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn unavailable_fails_everything_as_internal() {
        let repo = InMemoryUserRepository::new();
        repo.set_unavailable(true);
        assert!(matches!(repo.ping().await, Err(RepositoryError::Internal(_))));
        assert!(matches!(
            repo.get_by_id(1).await,
            Err(RepositoryError::Internal(_))
        ));
    }
}
