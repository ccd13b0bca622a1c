//! Role grants for confidently attributed joins.

use std::collections::HashMap;

use async_trait::async_trait;
use herald_invites::{GuildId, InviteCode, Member};
use tokio::sync::Mutex;

use crate::error::GrantError;

/// Performs the privileged action for a confident attribution.
///
/// Only confident attributions reach a granter. Ambiguous ones are logged.
#[async_trait]
pub trait RoleGranter: Send + Sync {
    async fn grant(&self, guild: GuildId, member: &Member, code: &InviteCode) -> Result<(), GrantError>;
}

/// A role handed to a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub guild: GuildId,
    pub member: Member,
    pub code: InviteCode,
    pub role: String,
}

/// Grants a fixed role per invite code and remembers every grant.
#[derive(Debug, Default)]
pub struct RoleMapGranter {
    roles: HashMap<GuildId, HashMap<InviteCode, String>>,
    granted: Mutex<Vec<Grant>>,
}

impl RoleMapGranter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `code` in `guild` to `role`.
    #[must_use]
    pub fn with_role(mut self, guild: GuildId, code: impl Into<InviteCode>, role: impl Into<String>) -> Self {
        self.roles
            .entry(guild)
            .or_default()
            .insert(code.into(), role.into());
        self
    }

    pub fn role_for(&self, guild: GuildId, code: &str) -> Option<&str> {
        self.roles.get(&guild)?.get(code).map(String::as_str)
    }

    /// Every grant so far, oldest first.
    pub async fn grants(&self) -> Vec<Grant> {
        self.granted.lock().await.clone()
    }
}

#[async_trait]
impl RoleGranter for RoleMapGranter {
    async fn grant(&self, guild: GuildId, member: &Member, code: &InviteCode) -> Result<(), GrantError> {
        let role = self
            .role_for(guild, code.as_str())
            .ok_or_else(|| GrantError::UnknownInvite(code.to_string()))?;

        tracing::info!("Granting role {} to {} in guild {} (invite {})", role, member, guild, code);

        self.granted.lock().await.push(Grant {
            guild,
            member: member.clone(),
            code: code.clone(),
            role: role.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_mapped_role() {
        let granter = RoleMapGranter::new().with_role(GuildId(1), "abc", "Friends");
        let member = Member::new(5, "ada");

        granter.grant(GuildId(1), &member, &"abc".into()).await.unwrap();

        let grants = granter.grants().await;
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].role, "Friends");
        assert_eq!(grants[0].member, member);
    }

    #[tokio::test]
    async fn unmapped_code_is_refused() {
        let granter = RoleMapGranter::new().with_role(GuildId(1), "abc", "Friends");
        let member = Member::new(5, "ada");

        let err = granter.grant(GuildId(1), &member, &"zzz".into()).await.unwrap_err();
        assert_eq!(err, GrantError::UnknownInvite("zzz".into()));

        // Same code in another guild is a different invite.
        assert!(granter.grant(GuildId(2), &member, &"abc".into()).await.is_err());
        assert!(granter.grants().await.is_empty());
    }
}
