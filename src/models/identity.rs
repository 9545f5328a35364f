use serde::{Deserialize, Serialize};

/// Papel do usuário emitido pelo provedor de sessão
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Professor,
    Admin,
    #[default]
    #[serde(other)]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Professor => "professor",
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Professors and admins may edit shared resources such as prompts.
    pub fn can_edit_prompts(&self) -> bool {
        matches!(self, UserRole::Professor | UserRole::Admin)
    }
}

/// Identidade autenticada `{userId, email, role}` (somente leitura)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }
}
