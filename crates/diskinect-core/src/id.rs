//! Identity types

use std::fmt;

/// Sensor-assigned user identity.
///
/// Stable for the lifetime of one physical person's tracking session.
/// `UserId::NONE` (0) is never handed out by the sensor and stands for
/// "no active user".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(pub u32);

impl UserId {
    pub const NONE: UserId = UserId(0);

    #[inline]
    pub fn new(id: u32) -> Self {
        UserId(id)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == UserId::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// `None` for `UserId::NONE`, otherwise the id itself
    #[inline]
    pub fn into_option(self) -> Option<UserId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "User(none)")
        } else {
            write!(f, "User({})", self.0)
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_none() {
        assert!(UserId::NONE.is_none());
        assert!(UserId::new(3).is_some());
        assert_eq!(UserId::new(0).into_option(), None);
        assert_eq!(UserId::new(7).into_option(), Some(UserId(7)));
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(format!("{}", UserId::new(42)), "42");
        assert_eq!(format!("{:?}", UserId::NONE), "User(none)");
    }
}
