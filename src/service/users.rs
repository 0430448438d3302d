use crate::api::BackendApi;
use crate::error::AnidexError;
use crate::types::community::UserRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_ROLE: &str = "customer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedUser {
    pub user: UserRecord,
    pub created: bool,
}

#[derive(Clone)]
pub struct UserService {
    backend: BackendApi,
}

impl UserService {
    pub fn new(backend: BackendApi) -> Self {
        Self { backend }
    }

    /// Ensure the signed-in user has a backend record; creates it on first sight.
    pub async fn sync_user(&self, mut profile: UserRecord) -> Result<SyncedUser, AnidexError> {
        if profile.uid.trim().is_empty() || profile.email.trim().is_empty() {
            return Err(AnidexError::InvalidInput("uid and email are required".into()));
        }
        match self.backend.get_user(&profile.uid).await {
            Ok(user) => Ok(SyncedUser {
                user,
                created: false,
            }),
            Err(e) if e.is_not_found() => {
                profile.role = Some(DEFAULT_ROLE.to_string());
                self.backend.create_user(&profile).await?;
                info!(uid = %profile.uid, email = %profile.email, "user record created");
                Ok(SyncedUser {
                    user: profile,
                    created: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}
