//! Mock account lookup. There are no passwords; an email is enough to sign in.

use entity::{User, UserRole};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{DealRoomError, DealRoomResult},
    room::DealRoom,
};

#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl DealRoom {
    pub fn login(&self, email: &str) -> DealRoomResult<User> {
        let user = self
            .users
            .find_by_email(email)
            .ok_or_else(|| DealRoomError::validation("Invalid credentials"))?;
        info!(user_id = %user.id, "user signed in");
        Ok(user)
    }

    pub fn register(&self, registration: Registration) -> DealRoomResult<User> {
        let name = registration.name.trim();
        let email = registration.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(DealRoomError::validation("Name and email are required"));
        }
        if self.users.find_by_email(email).is_some() {
            return Err(DealRoomError::validation(
                "User with this email already exists",
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role: registration.role,
            avatar: None,
        };
        self.users.register(user.clone())?;
        info!(user_id = %user.id, role = user.role.as_str(), "user registered");
        Ok(user)
    }
}
