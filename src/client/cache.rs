//! Client state cache.
//!
//! A single authoritative mirror of server-confirmed entities. The cache is
//! owned explicitly by the caller and mutated through one reducer; actions
//! apply an event only after the server confirms the corresponding mutation,
//! so a failed call never leaves a partial update behind.
//!
//! Each collection is `None` until first loaded; `None` is "not yet loaded"
//! and distinct from an empty loaded collection.

use crate::auth::{ADMIN_LEVEL, HOST_LEVEL, MOD_LEVEL};
use crate::models::{Account, AccountView, Category, Theme, VotingCategory};

use super::ClientError;

/// Server-confirmed client state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheState {
    pub me: Option<AccountView>,
    pub users: Option<Vec<Account>>,
    pub categories: Option<Vec<Category>>,
    pub themes: Option<Vec<Theme>>,
    pub voting_categories: Option<Vec<VotingCategory>>,
}

/// A confirmed server result to fold into the cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    MeLoaded(Option<AccountView>),
    UsersLoaded(Vec<Account>),
    UserAdded(Account),
    UserRemoved(String),
    CategoriesLoaded(Vec<Category>),
    CategoryCreated(Category),
    CategoryUpdated(Category),
    CategoryDeleted(String),
    /// Theme responses always carry the entire collection
    ThemesReplaced(Vec<Theme>),
    VotingCategoriesLoaded(Vec<VotingCategory>),
}

impl CacheState {
    /// Fold a confirmed event into the cache.
    ///
    /// Splice rules: add appends; update and remove locate the entity by its
    /// natural key and replace or delete at that index. A key that cannot be
    /// located, or a splice into a collection that was never loaded, is an
    /// invariant violation, never a silent no-op.
    pub fn apply(&mut self, event: CacheEvent) -> Result<(), ClientError> {
        match event {
            CacheEvent::MeLoaded(me) => {
                self.me = me;
            }
            CacheEvent::UsersLoaded(users) => {
                self.users = Some(users);
            }
            CacheEvent::UserAdded(account) => {
                loaded(&mut self.users, "users")?.push(account);
            }
            CacheEvent::UserRemoved(external_id) => {
                let users = loaded(&mut self.users, "users")?;
                let index = position(
                    users.iter().position(|u| u.external_id == external_id),
                    "users",
                    &external_id,
                )?;
                users.remove(index);
            }
            CacheEvent::CategoriesLoaded(categories) => {
                self.categories = Some(categories);
            }
            CacheEvent::CategoryCreated(category) => {
                loaded(&mut self.categories, "categories")?.push(category);
            }
            CacheEvent::CategoryUpdated(category) => {
                let categories = loaded(&mut self.categories, "categories")?;
                let index = position(
                    categories.iter().position(|c| c.id == category.id),
                    "categories",
                    &category.id,
                )?;
                categories[index] = category;
            }
            CacheEvent::CategoryDeleted(id) => {
                let categories = loaded(&mut self.categories, "categories")?;
                let index =
                    position(categories.iter().position(|c| c.id == id), "categories", &id)?;
                categories.remove(index);
            }
            CacheEvent::ThemesReplaced(themes) => {
                self.themes = Some(themes);
            }
            CacheEvent::VotingCategoriesLoaded(voting_categories) => {
                self.voting_categories = Some(voting_categories);
            }
        }
        Ok(())
    }

    /// Advisory UI predicate; the server never trusts it.
    pub fn is_host(&self) -> bool {
        self.level_at_least(HOST_LEVEL)
    }

    /// Advisory UI predicate; the server never trusts it.
    pub fn is_mod(&self) -> bool {
        self.level_at_least(MOD_LEVEL)
    }

    /// Advisory UI predicate; the server never trusts it.
    pub fn is_admin(&self) -> bool {
        self.level_at_least(ADMIN_LEVEL)
    }

    fn level_at_least(&self, level: i64) -> bool {
        self.me.as_ref().is_some_and(|me| me.level >= level)
    }
}

fn loaded<'a, T>(
    collection: &'a mut Option<Vec<T>>,
    what: &str,
) -> Result<&'a mut Vec<T>, ClientError> {
    collection.as_mut().ok_or_else(|| {
        ClientError::Invariant(format!("Spliced into {} before it was loaded", what))
    })
}

fn position(index: Option<usize>, what: &str, key: &str) -> Result<usize, ClientError> {
    index.ok_or_else(|| ClientError::Invariant(format!("No entry {} in cached {}", key, what)))
}
