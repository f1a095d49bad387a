//! In-memory fakes shared by the service tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use netdock_core::AppResult;
use netdock_domain::{Role, RoleId, UserId};
use tokio::sync::Mutex;

use crate::{
    ActiveRoleService, ActiveRoleSession, PasswordHasher, RoleGate, RoleRepository, UserRecord,
    UserRepository,
};

pub(crate) fn role_named(name: &str) -> Role {
    Role::new(RoleId::new(), name, None, BTreeSet::new())
        .unwrap_or_else(|_| panic!("role '{name}' should be constructible"))
}

#[derive(Default)]
pub(crate) struct InMemoryRoleRepository {
    catalog: Mutex<Vec<Role>>,
    assignments: Mutex<HashSet<(UserId, RoleId)>>,
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Role>> {
        Ok(self
            .catalog
            .lock()
            .await
            .iter()
            .find(|role| role.is_called(identifier))
            .cloned())
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .catalog
            .lock()
            .await
            .iter()
            .find(|role| role.id() == role_id)
            .cloned())
    }

    async fn find_assigned(&self, user_id: UserId, role_id: RoleId) -> AppResult<Option<Role>> {
        if !self.assignments.lock().await.contains(&(user_id, role_id)) {
            return Ok(None);
        }

        self.find_by_id(role_id).await
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let assignments = self.assignments.lock().await;
        Ok(self
            .catalog
            .lock()
            .await
            .iter()
            .filter(|role| assignments.contains(&(user_id, role.id())))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Role>> {
        Ok(self.catalog.lock().await.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryUserRepository {
    records: Mutex<HashMap<UserId, UserRecord>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.records.lock().await.get(&user_id).cloned())
    }

    async fn set_active_role(&self, user_id: UserId, role_id: Option<RoleId>) -> AppResult<()> {
        if let Some(record) = self.records.lock().await.get_mut(&user_id) {
            record.active_role_id = role_id;
        }

        Ok(())
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        if let Some(record) = self.records.lock().await.get_mut(&user_id) {
            record.password_hash = Some(password_hash.to_owned());
        }

        Ok(())
    }

    async fn record_failed_login(&self, user_id: UserId) -> AppResult<()> {
        if let Some(record) = self.records.lock().await.get_mut(&user_id) {
            record.failed_login_count += 1;
        }

        Ok(())
    }

    async fn reset_failed_logins(&self, user_id: UserId) -> AppResult<()> {
        if let Some(record) = self.records.lock().await.get_mut(&user_id) {
            record.failed_login_count = 0;
            record.locked_until = None;
        }

        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemorySession {
    override_id: Mutex<Option<RoleId>>,
}

#[async_trait]
impl ActiveRoleSession for InMemorySession {
    async fn active_role_id(&self) -> AppResult<Option<RoleId>> {
        Ok(*self.override_id.lock().await)
    }

    async fn set_active_role_id(&self, role_id: RoleId) -> AppResult<()> {
        *self.override_id.lock().await = Some(role_id);
        Ok(())
    }

    async fn clear_active_role_id(&self) -> AppResult<()> {
        *self.override_id.lock().await = None;
        Ok(())
    }
}

/// Transparent fake hasher: hashes are `hashed:<password>`.
pub(crate) struct FakePasswordHasher;

impl PasswordHasher for FakePasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("hashed:{password}"))
    }
}

pub(crate) struct Fixture {
    roles: Arc<InMemoryRoleRepository>,
    users: Arc<InMemoryUserRepository>,
    session: InMemorySession,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            roles: Arc::new(InMemoryRoleRepository::default()),
            users: Arc::new(InMemoryUserRepository::default()),
            session: InMemorySession::default(),
        }
    }

    pub(crate) fn active_roles(&self) -> ActiveRoleService {
        ActiveRoleService::new(self.roles.clone(), self.users.clone())
    }

    pub(crate) fn gate(&self) -> RoleGate {
        RoleGate::new(self.roles.clone(), self.active_roles())
    }

    pub(crate) fn user_repository(&self) -> Arc<InMemoryUserRepository> {
        self.users.clone()
    }

    pub(crate) fn session(&self) -> &InMemorySession {
        &self.session
    }

    /// Creates a user record assigned the given roles, adding any role
    /// missing from the catalog along the way.
    pub(crate) async fn user_with_roles(&self, role_names: &[&str]) -> UserRecord {
        let user = UserRecord {
            id: UserId::new(),
            email: format!("user-{}@example.com", UserId::new()),
            display_name: "Test User".to_owned(),
            password_hash: None,
            is_superuser: false,
            active_role_id: None,
            failed_login_count: 0,
            locked_until: None,
        };

        self.users
            .records
            .lock()
            .await
            .insert(user.id, user.clone());

        for name in role_names {
            let role = match self.find_role(name).await {
                Some(role) => role,
                None => self.catalog_role(name).await,
            };
            self.roles
                .assignments
                .lock()
                .await
                .insert((user.id, role.id()));
        }

        user
    }

    pub(crate) async fn superuser(&self) -> UserRecord {
        let mut user = self.user_with_roles(&[]).await;
        user.is_superuser = true;

        self.users
            .records
            .lock()
            .await
            .insert(user.id, user.clone());
        user
    }

    pub(crate) async fn user_with_password(&self, email: &str, password: &str) -> UserRecord {
        let mut user = self.user_with_roles(&[]).await;
        user.email = email.to_owned();
        user.password_hash = Some(format!("hashed:{password}"));

        self.users
            .records
            .lock()
            .await
            .insert(user.id, user.clone());
        user
    }

    /// Adds a role to the catalog without assigning it to anyone.
    pub(crate) async fn catalog_role(&self, name: &str) -> Role {
        let role = role_named(name);
        self.roles.catalog.lock().await.push(role.clone());
        role
    }

    /// Looks up a catalog role by slug or name.
    pub(crate) async fn role(&self, identifier: &str) -> Role {
        self.find_role(identifier)
            .await
            .unwrap_or_else(|| panic!("role '{identifier}' should exist in the catalog"))
    }

    async fn find_role(&self, identifier: &str) -> Option<Role> {
        self.roles
            .catalog
            .lock()
            .await
            .iter()
            .find(|role| role.is_called(identifier))
            .cloned()
    }

    pub(crate) async fn set_session_override(&self, role_id: RoleId) {
        *self.session.override_id.lock().await = Some(role_id);
    }

    pub(crate) async fn session_override(&self) -> Option<RoleId> {
        *self.session.override_id.lock().await
    }

    pub(crate) async fn durable_pointer(&self, user_id: UserId) -> Option<RoleId> {
        self.users
            .records
            .lock()
            .await
            .get(&user_id)
            .and_then(|record| record.active_role_id)
    }

    pub(crate) async fn store_durable_pointer(&self, user_id: UserId, role_id: RoleId) {
        if let Some(record) = self.users.records.lock().await.get_mut(&user_id) {
            record.active_role_id = Some(role_id);
        }
    }
}
