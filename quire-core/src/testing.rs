//! In-memory provider for exercising scopes without a database
//!
//! Writes made inside a transaction stay on the connection until commit and
//! vanish on rollback, which is enough to observe atomicity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::IdentityStore;
use crate::error::{DbError, Result};
use crate::identity::User;
use crate::provider::{ConnectionProvider, StoreConnection};

#[derive(Debug, Default)]
pub struct MemoryStats {
    connects: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    releases: AtomicUsize,
    abandons: AtomicUsize,
    lookups: AtomicUsize,
}

macro_rules! counter {
    ($($name:ident),*) => {
        impl MemoryStats {
            $(pub fn $name(&self) -> usize {
                self.$name.load(Ordering::SeqCst)
            })*
        }
    };
}

counter!(connects, begins, commits, rollbacks, releases, abandons, lookups);

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Debug, Default)]
struct MemoryStore {
    posts: Vec<String>,
    users: HashMap<i32, User>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    connect: bool,
    begin: bool,
    begin_stalls: bool,
    commit: bool,
    rollback: bool,
    release: bool,
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    store: Arc<Mutex<MemoryStore>>,
    stats: Arc<MemoryStats>,
    serial: AtomicU64,
    faults: Faults,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let mut provider = Self::new();
        provider.faults.connect = true;
        provider
    }

    pub fn failing_begin(mut self) -> Self {
        self.faults.begin = true;
        self
    }

    /// BEGIN is sent but never answered.
    pub fn stalled_begin(mut self) -> Self {
        self.faults.begin_stalls = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.faults.commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.faults.rollback = true;
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.faults.release = true;
        self
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    pub fn add_user(&self, id: i32, username: &str) -> User {
        let user = User {
            id,
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().users.insert(id, user.clone());
        user
    }

    pub fn seed_post(&self, title: &str) {
        self.store.lock().unwrap().posts.push(title.to_owned());
    }

    pub fn committed_posts(&self) -> Vec<String> {
        self.store.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Conn = MemoryConn;

    async fn connect(&self) -> Result<MemoryConn> {
        if self.faults.connect {
            return Err(DbError::connection(sqlx::Error::PoolTimedOut));
        }
        bump(&self.stats.connects);
        Ok(MemoryConn {
            serial: self.serial.fetch_add(1, Ordering::SeqCst),
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            faults: self.faults,
            pending: None,
        })
    }
}

#[derive(Debug)]
pub struct MemoryConn {
    serial: u64,
    store: Arc<Mutex<MemoryStore>>,
    stats: Arc<MemoryStats>,
    faults: Faults,
    pending: Option<Vec<String>>,
}

impl MemoryConn {
    /// Distinct per established connection
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Insert a post title; titles are unique. Returns the new row count.
    pub fn insert_post(&mut self, title: &str) -> Result<i64> {
        let mut visible = self.posts();
        if visible.iter().any(|t| t == title) {
            return Err(DbError::Conflict {
                resource: "post",
                detail: "posts_title_key".to_owned(),
            });
        }
        match self.pending.as_mut() {
            Some(pending) => pending.push(title.to_owned()),
            None => self.store.lock().unwrap().posts.push(title.to_owned()),
        }
        visible.push(title.to_owned());
        Ok(visible.len() as i64)
    }

    /// Posts as seen from this connection, uncommitted writes included
    pub fn posts(&self) -> Vec<String> {
        let mut posts = self.store.lock().unwrap().posts.clone();
        if let Some(pending) = &self.pending {
            posts.extend(pending.iter().cloned());
        }
        posts
    }
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {what} failure"))
}

#[async_trait]
impl StoreConnection for MemoryConn {
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error> {
        bump(&self.stats.begins);
        if self.faults.begin {
            return Err(injected("begin"));
        }
        if self.faults.begin_stalls {
            std::future::pending::<()>().await;
        }
        self.pending = Some(Vec::new());
        Ok(())
    }

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error> {
        let pending = self.pending.take().unwrap_or_default();
        if self.faults.commit {
            return Err(injected("commit"));
        }
        bump(&self.stats.commits);
        self.store.lock().unwrap().posts.extend(pending);
        Ok(())
    }

    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error> {
        self.pending = None;
        if self.faults.rollback {
            return Err(injected("rollback"));
        }
        bump(&self.stats.rollbacks);
        Ok(())
    }

    async fn release(self) -> std::result::Result<(), sqlx::Error> {
        if self.faults.release {
            return Err(injected("release"));
        }
        bump(&self.stats.releases);
        Ok(())
    }

    fn abandon(self) {
        bump(&self.stats.abandons);
    }
}

#[async_trait]
impl IdentityStore for MemoryConn {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>> {
        bump(&self.stats.lookups);
        Ok(self.store.lock().unwrap().users.get(&id).cloned())
    }
}
