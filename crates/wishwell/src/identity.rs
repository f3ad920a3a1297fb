//! Author/supporter identity.

/// Who created or supported a wish: an authenticated user or an anonymous
/// session — exactly one, never both.
///
/// The "exactly one" invariant lives in [`Identity::from_parts`] rather
/// than in optional-field checks at every call site. When raw row data
/// carries both a user id and a session id, the user id wins, matching the
/// write path (session ids are forced to NULL when a user id is present).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    User(i64),
    Session(String),
}

impl Identity {
    pub fn user(id: i64) -> Self {
        Identity::User(id)
    }

    pub fn session(id: impl Into<String>) -> Self {
        Identity::Session(id.into())
    }

    /// Build an identity from optional raw parts. Returns `None` when
    /// neither part is present.
    pub fn from_parts(user_id: Option<i64>, session_id: Option<String>) -> Option<Self> {
        match (user_id, session_id) {
            (Some(uid), _) => Some(Identity::User(uid)),
            (None, Some(sid)) => Some(Identity::Session(sid)),
            (None, None) => None,
        }
    }

    /// The user id, if this is a user identity.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::User(id) => Some(*id),
            Identity::Session(_) => None,
        }
    }

    /// The session id, if this is a session identity.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Identity::User(_) => None,
            Identity::Session(id) => Some(id),
        }
    }

    /// Tagged form disambiguating the two identity kinds in one set:
    /// `user_<id>` or `session_<id>`.
    pub fn tag(&self) -> String {
        match self {
            Identity::User(id) => format!("user_{id}"),
            Identity::Session(id) => format!("session_{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(Identity::from_parts(None, None), None);
        assert_eq!(
            Identity::from_parts(Some(7), None),
            Some(Identity::User(7))
        );
        assert_eq!(
            Identity::from_parts(None, Some("abc".into())),
            Some(Identity::Session("abc".into()))
        );
        // The user id wins when a row carries both.
        assert_eq!(
            Identity::from_parts(Some(7), Some("abc".into())),
            Some(Identity::User(7))
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(Identity::user(3).tag(), "user_3");
        assert_eq!(Identity::session("abc").tag(), "session_abc");
    }
}
