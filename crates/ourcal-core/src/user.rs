//! User directory types

use serde::{Deserialize, Serialize};

/// A calendar user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}
