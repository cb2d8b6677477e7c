use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    System,
    Assistant,
    AppInfo,
    AppError,
}

/// One transcript entry. Wire roles (user/system/assistant) travel to the
/// backend and into saved chats; app roles are rendered locally only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::System => "system",
            Role::Assistant => "assistant",
            Role::AppInfo => "app/info",
            Role::AppError => "app/error",
        }
    }

    /// Role string used in request bodies; `None` for local-only entries.
    pub fn api_role(self) -> Option<&'static str> {
        match self {
            Role::User => Some("user"),
            Role::System => Some("system"),
            Role::Assistant => Some("assistant"),
            Role::AppInfo | Role::AppError => None,
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }

    pub fn is_app(self) -> bool {
        matches!(self, Role::AppInfo | Role::AppError)
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, String> {
        match value {
            "user" => Ok(Role::User),
            "system" => Ok(Role::System),
            "assistant" => Ok(Role::Assistant),
            "app/info" => Ok(Role::AppInfo),
            "app/error" => Ok(Role::AppError),
            _ => Err(format!("invalid role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn user_with_images(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: if images.is_empty() {
                None
            } else {
                Some(images)
            },
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self::new(Role::AppInfo, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Role::AppError, format!("Error: {}", content.into()))
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn is_app(&self) -> bool {
        self.role.is_app()
    }

    /// True for entries that belong in request bodies and saved chats.
    pub fn is_api_visible(&self) -> bool {
        self.role.api_role().is_some()
    }
}
