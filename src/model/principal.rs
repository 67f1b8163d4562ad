use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

/// Authenticated caller, as handed over by the authentication layer.
#[derive(Clone, Debug, Serialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    /// Label recorded in the activity log.
    pub fn actor(principal: Option<&Principal>) -> String {
        principal.map_or_else(|| "system".to_owned(), ToString::to_string)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let role = match self.role {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
        };
        write!(f, "{role}:{}", self.id)
    }
}
