//! Ownership guard for mutations on user-owned resources
//!
//! Every owned row resolves to a user through its owner chain: directly
//! (`cars`, `posts`, `comments`), through its car (`service_updates`,
//! `mods`) or through whichever parent it hangs off (`images`). Repositories
//! fetch that owner inside the mutating transaction and pass it here before
//! touching the row.

use thiserror::Error;
use uuid::Uuid;

/// Resource kinds protected by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Car,
    Post,
    Comment,
    Image,
    Mod,
    ServiceUpdate,
}

impl Resource {
    /// Capitalised name used at the start of a message
    pub fn title(self) -> &'static str {
        match self {
            Resource::Car => "Car",
            Resource::Post => "Post",
            Resource::Comment => "Comment",
            Resource::Image => "Image",
            Resource::Mod => "Mod",
            Resource::ServiceUpdate => "Service update",
        }
    }

    /// Lower-case name used inside a message
    pub fn noun(self) -> &'static str {
        match self {
            Resource::Car => "car",
            Resource::Post => "post",
            Resource::Comment => "comment",
            Resource::Image => "image",
            Resource::Mod => "mod",
            Resource::ServiceUpdate => "service update",
        }
    }
}

/// Outcome of a guarded mutation that did not go through
#[derive(Error, Debug)]
pub enum OwnershipError {
    #[error("{} not found", .0.title())]
    NotFound(Resource),

    #[error("not authorized to modify this {}", .0.noun())]
    Forbidden(Resource),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Check the owner found for a row against the acting user
///
/// `owner` is `None` when the row itself does not exist.
pub fn ensure_owner(
    owner: Option<Uuid>,
    actor: Uuid,
    resource: Resource,
) -> Result<(), OwnershipError> {
    match owner {
        None => Err(OwnershipError::NotFound(resource)),
        Some(owner) if owner == actor => Ok(()),
        Some(_) => Err(OwnershipError::Forbidden(resource)),
    }
}
