use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Influencer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Influencer => "influencer",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated caller of an operation, as supplied by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ObjectId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: ObjectId, role: Role) -> Self {
        Actor { user_id, role }
    }

    pub fn client(user_id: ObjectId) -> Self {
        Actor::new(user_id, Role::Client)
    }

    pub fn influencer(user_id: ObjectId) -> Self {
        Actor::new(user_id, Role::Influencer)
    }

    pub fn admin(user_id: ObjectId) -> Self {
        Actor::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
