use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ProjectId);
uuid_id!(RoleId);
uuid_id!(KanbanId);
uuid_id!(ColumnId);
uuid_id!(ElementId);
uuid_id!(PageId);
uuid_id!(CommentId);

/// Flat role tag used at the API boundary.
///
/// Inside the graph a membership carries the richer
/// [`ProjectRole`], which binds the custom role id to the tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    Admin,
    StandardUser,
    CustomRole,
}

/// Role a user holds inside one project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProjectRole {
    Admin,
    StandardUser,
    Custom(RoleId),
}

impl ProjectRole {
    pub fn role_type(&self) -> RoleType {
        match self {
            Self::Admin => RoleType::Admin,
            Self::StandardUser => RoleType::StandardUser,
            Self::Custom(_) => RoleType::CustomRole,
        }
    }

    pub fn custom_role(&self) -> Option<RoleId> {
        match self {
            Self::Custom(id) => Some(*id),
            _ => None,
        }
    }
}

/// Lifecycle status of a kanban element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementStatus {
    Alive,
    Archived,
    /// Trashed, pending permanent deletion.
    Utilise,
}

impl ElementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alive => "ALIVE",
            Self::Archived => "ARCHIVED",
            Self::Utilise => "UTILISE",
        }
    }

    /// Whether elements in this status take part in column ordering.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Self::Utilise)
    }
}

impl fmt::Display for ElementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALIVE" => Ok(Self::Alive),
            "ARCHIVED" => Ok(Self::Archived),
            "UTILISE" => Ok(Self::Utilise),
            other => Err(ParseError::ElementStatus(other.to_string())),
        }
    }
}

/// Which fields an archive/trash search matches against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    Name,
    Tag,
    Both,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Tag => "TAG",
            Self::Both => "BOTH",
        }
    }

    pub fn matches_name(&self) -> bool {
        matches!(self, Self::Name | Self::Both)
    }

    pub fn matches_tag(&self) -> bool {
        matches!(self, Self::Tag | Self::Both)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NAME" => Ok(Self::Name),
            "TAG" => Ok(Self::Tag),
            "BOTH" => Ok(Self::Both),
            _ => Err(ParseError::SearchType(s.to_string())),
        }
    }
}

/// Kind of entity an id refers to, used in not-found and grant errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    Project,
    Membership,
    Role,
    Kanban,
    Column,
    Element,
    Comment,
    Page,
    VisitMark,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Membership => "project membership",
            Self::Role => "custom role",
            Self::Kanban => "kanban",
            Self::Column => "kanban column",
            Self::Element => "kanban element",
            Self::Comment => "element comment",
            Self::Page => "page",
            Self::VisitMark => "visit mark",
        };
        f.write_str(name)
    }
}

/// Encodes a [`ProjectRole`] as the `(role_type, role_id)` pair stored on disk.
pub fn encode_project_role(role: &ProjectRole) -> (&'static str, Option<String>) {
    match role {
        ProjectRole::Admin => ("ADMIN", None),
        ProjectRole::StandardUser => ("STANDARD_USER", None),
        ProjectRole::Custom(id) => ("CUSTOM_ROLE", Some(id.to_string())),
    }
}

/// Inverse of [`encode_project_role`].
pub fn decode_project_role(role_type: &str, role_id: Option<&str>) -> Result<ProjectRole, ParseError> {
    match (role_type, role_id) {
        ("ADMIN", _) => Ok(ProjectRole::Admin),
        ("STANDARD_USER", _) => Ok(ProjectRole::StandardUser),
        ("CUSTOM_ROLE", Some(id)) => RoleId::parse(id)
            .map(ProjectRole::Custom)
            .map_err(|_| ParseError::RoleId(id.to_string())),
        ("CUSTOM_ROLE", None) => Err(ParseError::MissingRoleId),
        (other, _) => Err(ParseError::RoleType(other.to_string())),
    }
}
