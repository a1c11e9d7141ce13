//! Single authorization gate consulted at the top of every mutating operation.

use log::debug;
use mongodb::bson::oid::ObjectId;

use crate::models::{Actor, Role};
use crate::services::MarketError;

/// Relationship the actor must hold with the target resource.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    /// Only the owning user.
    Owner(ObjectId),
    /// Either side of an engagement, or a moderator.
    Party { client_id: ObjectId, influencer_id: ObjectId },
    /// Moderators only.
    Moderator,
}

pub fn authorize(actor: &Actor, access: Access) -> Result<(), MarketError> {
    let allowed = match access {
        Access::Owner(owner) => actor.user_id == owner,
        Access::Party { client_id, influencer_id } => {
            actor.is_admin() || actor.user_id == client_id || actor.user_id == influencer_id
        }
        Access::Moderator => actor.is_admin(),
    };

    if allowed {
        Ok(())
    } else {
        debug!("authorization denied for {} ({}) on {:?}", actor.user_id, actor.role.as_str(), access);
        Err(MarketError::NotOwner)
    }
}

pub fn require_role(actor: &Actor, role: Role) -> Result<(), MarketError> {
    if actor.role == role {
        Ok(())
    } else {
        debug!("{} acting as {} where {} is required", actor.user_id, actor.role.as_str(), role.as_str());
        Err(MarketError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_access() {
        let owner = ObjectId::new();
        assert!(authorize(&Actor::client(owner), Access::Owner(owner)).is_ok());
        assert!(authorize(&Actor::client(ObjectId::new()), Access::Owner(owner)).is_err());
        // Moderators do not inherit ownership.
        assert!(authorize(&Actor::admin(ObjectId::new()), Access::Owner(owner)).is_err());
    }

    #[test]
    fn party_access() {
        let client_id = ObjectId::new();
        let influencer_id = ObjectId::new();
        let access = Access::Party { client_id, influencer_id };

        assert!(authorize(&Actor::client(client_id), access).is_ok());
        assert!(authorize(&Actor::influencer(influencer_id), access).is_ok());
        assert!(authorize(&Actor::admin(ObjectId::new()), access).is_ok());
        assert!(authorize(&Actor::influencer(ObjectId::new()), access).is_err());
    }

    #[test]
    fn role_requirement() {
        let id = ObjectId::new();
        assert!(require_role(&Actor::influencer(id), Role::Influencer).is_ok());
        assert!(matches!(require_role(&Actor::client(id), Role::Influencer), Err(MarketError::NotOwner)));
    }
}
