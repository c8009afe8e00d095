//! Entity schema shared by client and server.
//!
//! The store serves instances of named entities. Three entities play special
//! roles in the protocol: the session entity backs authentication tokens, the
//! user entity identifies people, and the client entity identifies the
//! application itself. A [`Schema`] is validated once at construction, so the
//! rest of the crate can rely on every role being present exactly once.

use std::fmt;

/// Protocol roles an entity can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    Session,
    User,
    Client,
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityRole::Session => "session",
            EntityRole::User => "user",
            EntityRole::Client => "client",
        };
        f.write_str(name)
    }
}

/// One entity exposed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    role: Option<EntityRole>,
    searchable: bool,
}

impl EntityDescriptor {
    /// A plain resource entity, searchable by default.
    pub fn resource(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: None, searchable: true }
    }

    /// The entity backing authentication sessions. Never searchable.
    pub fn session(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: Some(EntityRole::Session), searchable: false }
    }

    /// The entity representing users.
    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: Some(EntityRole::User), searchable: true }
    }

    /// The entity representing API clients.
    pub fn client(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: Some(EntityRole::Client), searchable: true }
    }

    /// Overrides whether search requests may target this entity.
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Option<EntityRole> {
        self.role
    }

    pub fn searchable(&self) -> bool {
        self.searchable
    }
}

/// Ways a schema can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate entity name {0:?}")]
    DuplicateEntity(String),

    #[error("schema needs exactly one {0} entity, found none")]
    MissingRole(EntityRole),

    #[error("schema needs exactly one {0} entity, found more than one")]
    DuplicateRole(EntityRole),
}

/// A validated set of entity descriptors.
///
/// Guarantees unique entity names and exactly one entity per
/// [`EntityRole`]. The session entity is forced unsearchable regardless of
/// how its descriptor was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    entities: Vec<EntityDescriptor>,
    session: usize,
    user: usize,
    client: usize,
}

impl Schema {
    pub fn new(mut entities: Vec<EntityDescriptor>) -> Result<Self, SchemaError> {
        let mut session = None;
        let mut user = None;
        let mut client = None;
        for (index, entity) in entities.iter().enumerate() {
            if entities[..index].iter().any(|other| other.name == entity.name) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
            let Some(role) = entity.role else { continue };
            let slot = match role {
                EntityRole::Session => &mut session,
                EntityRole::User => &mut user,
                EntityRole::Client => &mut client,
            };
            if slot.replace(index).is_some() {
                return Err(SchemaError::DuplicateRole(role));
            }
        }
        let session = session.ok_or(SchemaError::MissingRole(EntityRole::Session))?;
        let user = user.ok_or(SchemaError::MissingRole(EntityRole::User))?;
        let client = client.ok_or(SchemaError::MissingRole(EntityRole::Client))?;
        entities[session].searchable = false;
        Ok(Self { entities, session, user, client })
    }

    /// Looks an entity up by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn session_entity(&self) -> &EntityDescriptor {
        &self.entities[self.session]
    }

    pub fn user_entity(&self) -> &EntityDescriptor {
        &self.entities[self.user]
    }

    pub fn client_entity(&self) -> &EntityDescriptor {
        &self.entities[self.client]
    }
}
