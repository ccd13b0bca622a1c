//! Identifiers shared by the tracker and its collaborators.

use std::borrow::Borrow;
use std::fmt;

/// A guild (community) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque invite code, unique within one guild at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InviteCode(String);

impl InviteCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InviteCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for InviteCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl Borrow<str> for InviteCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The member a join event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    pub id: UserId,
    pub name: String,
}

impl Member {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            name: name.into(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A member joined a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberJoin {
    pub guild: GuildId,
    pub member: Member,
}

impl MemberJoin {
    pub fn new(guild: GuildId, member: Member) -> Self {
        Self { guild, member }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_code_borrows_as_str() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(InviteCode::new("abc"));
        assert!(set.contains("abc"));
    }

    #[test]
    fn member_display() {
        let member = Member::new(42, "ferris");
        assert_eq!(member.to_string(), "ferris (42)");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ids_serialize_transparently() {
        let join = MemberJoin::new(GuildId(7), Member::new(1, "a"));
        let json = serde_json::to_string(&join).unwrap();
        assert_eq!(json, r#"{"guild":7,"member":{"id":1,"name":"a"}}"#);
    }
}
