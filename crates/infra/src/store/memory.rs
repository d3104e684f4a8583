//! In-memory auth store for tests and single-process dev setups.
//!
//! All state sits behind one `RwLock`. Every mutation, including
//! `replace_grants_for_role`, happens under a single write guard with no
//! await point, so readers see either the state before or after it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use menugate_auth::resource::would_create_cycle;
use menugate_auth::{
    CrudFlags, Grant, GrantSpec, GrantStore, Identity, IdentityStatus, IdentityStore, NewIdentity, ResourceGrant,
    ResourceNode, ResourceStore, Role, RoleStore, StoreError, normalize_grant_set,
};
use menugate_core::{IdentityId, ResourceId, RoleId};

#[derive(Debug, Default)]
struct State {
    identities: HashMap<IdentityId, Identity>,
    roles: HashMap<RoleId, Role>,
    memberships: BTreeSet<(IdentityId, RoleId)>,
    resources: HashMap<ResourceId, ResourceNode>,
    grants: HashMap<(RoleId, ResourceId), Grant>,
}

impl State {
    fn require_role(&self, role_id: RoleId) -> Result<(), StoreError> {
        if self.roles.contains_key(&role_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("role {role_id}")))
        }
    }

    fn require_resource(&self, resource_id: ResourceId) -> Result<(), StoreError> {
        if self.resources.contains_key(&resource_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("resource {resource_id}")))
        }
    }

    fn identity_mut(&mut self, id: IdentityId) -> Result<&mut Identity, StoreError> {
        self.identities
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("identity {id}")))
    }
}

/// In-memory implementation of every storage port.
#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    inner: RwLock<State>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityStore for InMemoryAuthStore {
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let identity = identity.into_identity()?;
        let mut state = self.write()?;

        if state.identities.contains_key(&identity.id) {
            return Err(StoreError::Conflict(format!("identity {} already exists", identity.id)));
        }
        if state.identities.values().any(|i| i.username == identity.username) {
            return Err(StoreError::Conflict(format!("username '{}' is taken", identity.username)));
        }

        state.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        Ok(self.read()?.identities.get(&id).cloned())
    }

    async fn find_identity_by_credential(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.read()?;
        Ok(state.identities.values().find(|i| i.username == username).cloned())
    }

    async fn set_identity_status(&self, id: IdentityId, status: IdentityStatus) -> Result<(), StoreError> {
        self.write()?.identity_mut(id)?.status = status;
        Ok(())
    }

    async fn set_active_token(&self, id: IdentityId, token: Option<&str>) -> Result<(), StoreError> {
        self.write()?.identity_mut(id)?.active_token = token.map(str::to_string);
        Ok(())
    }

    async fn get_active_token(&self, id: IdentityId) -> Result<Option<String>, StoreError> {
        let state = self.read()?;
        state
            .identities
            .get(&id)
            .map(|i| i.active_token.clone())
            .ok_or_else(|| StoreError::NotFound(format!("identity {id}")))
    }
}

#[async_trait]
impl RoleStore for InMemoryAuthStore {
    async fn create_role(&self, role: Role) -> Result<Role, StoreError> {
        let mut state = self.write()?;

        if state.roles.contains_key(&role.id) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.id)));
        }
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!("role name '{}' is taken", role.name)));
        }

        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let state = self.read()?;
        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(roles)
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.roles.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("role {id}")));
        }
        state.memberships.retain(|(_, role_id)| *role_id != id);
        state.grants.retain(|(role_id, _), _| *role_id != id);
        Ok(())
    }

    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.identities.contains_key(&identity_id) {
            return Err(StoreError::NotFound(format!("identity {identity_id}")));
        }
        state.require_role(role_id)?;
        state.memberships.insert((identity_id, role_id));
        Ok(())
    }

    async fn revoke_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        self.write()?.memberships.remove(&(identity_id, role_id));
        Ok(())
    }

    async fn find_roles_for_identity(&self, identity_id: IdentityId) -> Result<Vec<Role>, StoreError> {
        let state = self.read()?;
        let mut roles: Vec<Role> = state
            .memberships
            .iter()
            .filter(|(i, _)| *i == identity_id)
            .filter_map(|(_, role_id)| state.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(roles)
    }
}

#[async_trait]
impl ResourceStore for InMemoryAuthStore {
    async fn create_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        node.validate()?;
        let mut state = self.write()?;

        if state.resources.contains_key(&node.id) {
            return Err(StoreError::Conflict(format!("resource {} already exists", node.id)));
        }
        if node.parent_id == Some(node.id) {
            return Err(StoreError::Invalid(format!("resource {} cannot be its own parent", node.id)));
        }

        state.resources.insert(node.id, node.clone());
        Ok(node)
    }

    async fn update_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        node.validate()?;
        let mut state = self.write()?;

        if !state.resources.contains_key(&node.id) {
            return Err(StoreError::NotFound(format!("resource {}", node.id)));
        }
        if let Some(parent) = node.parent_id {
            let nodes: Vec<ResourceNode> = state.resources.values().cloned().collect();
            if would_create_cycle(&nodes, node.id, parent) {
                return Err(StoreError::Invalid(format!(
                    "moving resource {} under {parent} would create a cycle",
                    node.id
                )));
            }
        }

        state.resources.insert(node.id, node.clone());
        Ok(node)
    }

    async fn delete_resource(&self, id: ResourceId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.resources.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("resource {id}")));
        }
        state.grants.retain(|(_, resource_id), _| *resource_id != id);
        Ok(())
    }

    async fn find_all_resource_nodes(&self) -> Result<Vec<ResourceNode>, StoreError> {
        let state = self.read()?;
        let mut nodes: Vec<ResourceNode> = state.resources.values().cloned().collect();
        nodes.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        Ok(nodes)
    }
}

#[async_trait]
impl GrantStore for InMemoryAuthStore {
    async fn create_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let mut state = self.write()?;
        state.require_role(role_id)?;
        state.require_resource(resource_id)?;

        if state.grants.contains_key(&(role_id, resource_id)) {
            return Err(StoreError::Conflict(format!(
                "role {role_id} already has a grant on resource {resource_id}"
            )));
        }

        let grant = Grant::new(role_id, resource_id, flags);
        state.grants.insert((role_id, resource_id), grant.clone());
        Ok(grant)
    }

    async fn get_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<Grant>, StoreError> {
        Ok(self.read()?.grants.get(&(role_id, resource_id)).cloned())
    }

    async fn update_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let mut state = self.write()?;
        let grant = state
            .grants
            .get_mut(&(role_id, resource_id))
            .ok_or_else(|| StoreError::NotFound(format!("grant for role {role_id} on resource {resource_id}")))?;
        grant.flags = flags;
        Ok(grant.clone())
    }

    async fn upsert_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let mut state = self.write()?;
        state.require_role(role_id)?;
        state.require_resource(resource_id)?;

        let grant = state
            .grants
            .entry((role_id, resource_id))
            .and_modify(|g| g.flags = flags)
            .or_insert_with(|| Grant::new(role_id, resource_id, flags));
        Ok(grant.clone())
    }

    async fn delete_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<(), StoreError> {
        match self.write()?.grants.remove(&(role_id, resource_id)) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!(
                "grant for role {role_id} on resource {resource_id}"
            ))),
        }
    }

    async fn list_grants_for_role(&self, role_id: RoleId) -> Result<Vec<Grant>, StoreError> {
        let state = self.read()?;
        let mut grants: Vec<Grant> = state
            .grants
            .values()
            .filter(|g| g.role_id == role_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.resource_id);
        Ok(grants)
    }

    async fn find_grants_for_role(&self, role_id: RoleId) -> Result<Vec<ResourceGrant>, StoreError> {
        let state = self.read()?;
        let mut records: Vec<ResourceGrant> = state
            .grants
            .values()
            .filter(|g| g.role_id == role_id)
            .filter_map(|g| {
                state.resources.get(&g.resource_id).map(|resource| ResourceGrant {
                    role_id,
                    resource: resource.clone(),
                    flags: g.flags,
                })
            })
            .collect();
        records.sort_by(|a, b| {
            a.resource
                .order
                .cmp(&b.resource.order)
                .then(a.resource.id.cmp(&b.resource.id))
        });
        Ok(records)
    }

    async fn replace_grants_for_role(
        &self,
        role_id: RoleId,
        grants: Vec<GrantSpec>,
    ) -> Result<Vec<Grant>, StoreError> {
        let specs = normalize_grant_set(grants)?;
        let mut state = self.write()?;

        // Validate everything before the first mutation; an error leaves the old set.
        state.require_role(role_id)?;
        for spec in &specs {
            state.require_resource(spec.resource_id)?;
        }

        state.grants.retain(|(r, _), _| *r != role_id);
        let mut installed = Vec::with_capacity(specs.len());
        for spec in specs {
            let grant = Grant::new(role_id, spec.resource_id, spec.flags);
            state.grants.insert((role_id, spec.resource_id), grant.clone());
            installed.push(grant);
        }

        tracing::debug!(role_id = %role_id, grants = installed.len(), "grant set replaced");
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rid(n: u128) -> ResourceId {
        ResourceId::from_uuid(Uuid::from_u128(n))
    }

    async fn seeded() -> (InMemoryAuthStore, Role) {
        let store = InMemoryAuthStore::new();
        let role = store.create_role(Role::new("Editor", None).unwrap()).await.unwrap();
        for n in 1..=3u128 {
            store
                .create_resource(ResourceNode::new(format!("r{n}"), format!("/r{n}")).with_id(rid(n)))
                .await
                .unwrap();
        }
        (store, role)
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let store = InMemoryAuthStore::new();
        store.create_identity(NewIdentity::new("alice", "h")).await.unwrap();
        let err = store.create_identity(NewIdentity::new(" alice ", "h")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_grant_refuses_duplicate_pair() {
        let (store, role) = seeded().await;
        store.create_grant(role.id, rid(1), CrudFlags::read_only()).await.unwrap();
        let err = store.create_grant(role.id, rid(1), CrudFlags::ALL).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn upsert_overwrites_in_place() {
        let (store, role) = seeded().await;
        let first = store.upsert_grant(role.id, rid(1), CrudFlags::read_only()).await.unwrap();
        let second = store.upsert_grant(role.id, rid(1), CrudFlags::ALL).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_grants_for_role(role.id).await.unwrap().len(), 1);
        assert_eq!(store.get_grant(role.id, rid(1)).await.unwrap().unwrap().flags, CrudFlags::ALL);
    }

    #[tokio::test]
    async fn update_missing_grant_is_not_found() {
        let (store, role) = seeded().await;
        let err = store.update_grant(role.id, rid(2), CrudFlags::ALL).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_replace_keeps_old_set() {
        let (store, role) = seeded().await;
        store
            .replace_grants_for_role(role.id, vec![GrantSpec::new(rid(1), CrudFlags::read_only())])
            .await
            .unwrap();

        let err = store
            .replace_grants_for_role(
                role.id,
                vec![GrantSpec::new(rid(2), CrudFlags::ALL), GrantSpec::new(rid(99), CrudFlags::ALL)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let grants = store.list_grants_for_role(role.id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].resource_id, rid(1));
    }

    #[tokio::test]
    async fn replace_rejects_duplicate_resources() {
        let (store, role) = seeded().await;
        let err = store
            .replace_grants_for_role(
                role.id,
                vec![GrantSpec::new(rid(1), CrudFlags::ALL), GrantSpec::new(rid(1), CrudFlags::NONE)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn deleting_resource_cascades_grants_but_not_children() {
        let (store, role) = seeded().await;
        let child = ResourceNode::new("child", "/r1/child").with_id(rid(10)).with_parent(rid(1));
        store.create_resource(child).await.unwrap();
        store.upsert_grant(role.id, rid(1), CrudFlags::ALL).await.unwrap();

        store.delete_resource(rid(1)).await.unwrap();

        assert!(store.get_grant(role.id, rid(1)).await.unwrap().is_none());
        let nodes = store.find_all_resource_nodes().await.unwrap();
        let orphan = nodes.iter().find(|n| n.id == rid(10)).unwrap();
        assert_eq!(orphan.parent_id, Some(rid(1)));
    }

    #[tokio::test]
    async fn reparenting_into_own_subtree_is_refused() {
        let (store, _) = seeded().await;
        let child = ResourceNode::new("child", "/r1/child").with_id(rid(10)).with_parent(rid(1));
        store.create_resource(child).await.unwrap();

        let moved = ResourceNode::new("r1", "/r1").with_id(rid(1)).with_parent(rid(10));
        let err = store.update_resource(moved).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn deleting_role_removes_assignments_and_grants() {
        let (store, role) = seeded().await;
        let alice = store.create_identity(NewIdentity::new("alice", "h")).await.unwrap();
        store.assign_role(alice.id, role.id).await.unwrap();
        store.upsert_grant(role.id, rid(1), CrudFlags::ALL).await.unwrap();

        store.delete_role(role.id).await.unwrap();

        assert!(store.find_roles_for_identity(alice.id).await.unwrap().is_empty());
        assert!(store.list_grants_for_role(role.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn grants_are_joined_in_display_order() {
        let store = InMemoryAuthStore::new();
        let role = store.create_role(Role::new("Viewer", None).unwrap()).await.unwrap();
        store
            .create_resource(ResourceNode::new("late", "/late").with_id(rid(1)).with_order(5))
            .await
            .unwrap();
        store
            .create_resource(ResourceNode::new("early", "/early").with_id(rid(2)).with_order(1))
            .await
            .unwrap();
        store.upsert_grant(role.id, rid(1), CrudFlags::read_only()).await.unwrap();
        store.upsert_grant(role.id, rid(2), CrudFlags::read_only()).await.unwrap();

        let names: Vec<String> = store
            .find_grants_for_role(role.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.resource.name)
            .collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn active_token_of_unknown_identity_is_not_found() {
        let store = InMemoryAuthStore::new();
        let err = store.get_active_token(IdentityId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
