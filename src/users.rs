//! User account management.

use crate::auth::hash_password;
use crate::db::{User, UserInput, UserStore, UserUpdate, now_timestamp};
use crate::error::{AppError, Result};
use std::sync::Arc;

/// User service.
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a new user service.
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create a new user with a hashed password.
    pub fn create(&self, input: &UserInput) -> Result<User> {
        validate_email(&input.email)?;
        if input.password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        if self.users.find_by_email(&input.email)?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: input.email.clone(),
            password_hash: hash_password(&input.password)?,
            name: input.name.clone(),
            phone: input.phone,
            dni: input.dni.clone(),
            city: input.city.clone(),
            birth_date: input.birth_date,
            registration_date: now_timestamp(),
        };

        self.users.insert(&user)
    }

    /// Get a user by id.
    pub fn get(&self, id: &str) -> Result<User> {
        self.users
            .find_by_id(id)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Get all users.
    pub fn list(&self) -> Result<Vec<User>> {
        self.users.list()
    }

    /// Update a user. A missing password keeps the stored hash.
    pub fn update(&self, id: &str, update: &UserUpdate) -> Result<()> {
        validate_email(&update.email)?;
        if update.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let old = self.get(id)?;

        if let Some(existing) = self.users.find_by_email(&update.email)?
            && existing.id != old.id
        {
            return Err(AppError::Conflict("Email is already used".to_string()));
        }

        let password_hash = match &update.password {
            Some(password) if !password.is_empty() => hash_password(password)?,
            _ => old.password_hash.clone(),
        };

        let user = User {
            id: old.id.clone(),
            email: update.email.clone(),
            password_hash,
            name: update.name.clone(),
            phone: update.phone,
            dni: update.dni.clone(),
            city: update.city.clone(),
            birth_date: update.birth_date,
            registration_date: old.registration_date,
        };

        let updated = self.users.update(&user)?;
        if updated.matched == 1 && updated.modified == 1 {
            Ok(())
        } else if updated.matched == 1 && updated.modified == 0 {
            Err(AppError::NotModified("User not updated".to_string()))
        } else {
            Err(AppError::NotFound("User not found".to_string()))
        }
    }

    /// Delete a user by id.
    pub fn delete(&self, id: &str) -> Result<()> {
        let deleted = self.users.delete(id)?;
        if deleted.deleted != 1 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.contains('@') && !email.starts_with('@') && !email.ends_with('@');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("A valid email is required".to_string()))
    }
}
