//! Command handlers

pub mod ask;
pub mod chat;
pub mod cloud;
pub mod config;
pub mod doc;
pub mod status;
pub mod sync;
pub mod task;
pub mod watch;

use anyhow::{bail, Result};

use rose_core::directory::{self, User};

/// Resolve the acting user from `--user` / `ROSE_USER`
pub fn acting_user(name: Option<&str>) -> Result<User> {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        bail!(
            "No user given. Pass --user NAME or set ROSE_USER.\n\
             Known users: {}",
            known_usernames()
        );
    };

    match directory::lookup(name) {
        Some(user) => Ok(user),
        None => bail!(
            "Unknown user: '{}'\nKnown users: {}",
            name,
            known_usernames()
        ),
    }
}

fn known_usernames() -> String {
    directory::roster()
        .into_iter()
        .map(|u| u.username)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acting_user_resolves_roster_member() {
        let user = acting_user(Some("SELCUK")).unwrap();
        assert!(user.can_assign_tasks());
    }

    #[test]
    fn test_acting_user_requires_a_name() {
        assert!(acting_user(None).is_err());
        assert!(acting_user(Some("  ")).is_err());
        let err = acting_user(Some("nobody")).unwrap_err().to_string();
        assert!(err.contains("Unknown user"));
    }
}
