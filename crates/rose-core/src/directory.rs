//! Team directory
//!
//! The static roster of the team. Users are resolved by username; the role
//! callsign is what records carry as assignee, sender and owner.

use serde::Serialize;

/// Callsign of the team captain, the only member allowed to create tasks
pub const CAPTAIN_CALLSIGN: &str = "RoseUnitX";

struct Member {
    username: &'static str,
    callsign: &'static str,
    real_name: &'static str,
    job_title: &'static str,
}

const ROSTER: &[Member] = &[
    Member {
        username: "akif",
        callsign: "RoseAero",
        real_name: "Akif",
        job_title: "Mekanik Ekip Lideri",
    },
    Member {
        username: "tunahan",
        callsign: "RoseOps",
        real_name: "Tunahan",
        job_title: "Mekanik Personeli",
    },
    Member {
        username: "ceren",
        callsign: "RoseFlight",
        real_name: "Ceren",
        job_title: "Aviyonik Uzmanı",
    },
    Member {
        username: "sare",
        callsign: "RoseCore",
        real_name: "Sare",
        job_title: "Aviyonik Uzmanı",
    },
    Member {
        username: "aleyna",
        callsign: "RoseSystems",
        real_name: "Aleyna",
        job_title: "Sosyal Medya & İletişim",
    },
    Member {
        username: "fahri",
        callsign: "RoseCommand",
        real_name: "Fahri",
        job_title: "Aviyonik Ekip Lideri",
    },
    Member {
        username: "selçuk",
        callsign: CAPTAIN_CALLSIGN,
        real_name: "Selçuk",
        job_title: "Takım Kaptanı / Yazılım & Tasarım",
    },
    Member {
        username: "hakkı",
        callsign: "RoseSecure",
        real_name: "Hakkı",
        job_title: "Mekanik & Kalite Kontrol",
    },
    Member {
        username: "cengiz",
        callsign: "RoseEngineers",
        real_name: "Cengiz",
        job_title: "Sosyal Medya & İletişim",
    },
];

/// A resolved team member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub role_callsign: String,
    pub real_name: String,
    pub job_title: String,
}

impl User {
    fn from_member(m: &Member) -> Self {
        Self {
            username: m.username.to_string(),
            display_name: format!("{} ({})", m.real_name, m.callsign),
            role_callsign: m.callsign.to_string(),
            real_name: m.real_name.to_string(),
            job_title: m.job_title.to_string(),
        }
    }

    /// Whether this user may create tasks
    pub fn can_assign_tasks(&self) -> bool {
        self.role_callsign == CAPTAIN_CALLSIGN
    }
}

/// Fold Turkish letters to ASCII so `selcuk` and `HAKKI` resolve
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' | 'i' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            other => other,
        })
        .filter(|c| *c != '\u{307}')
        .collect()
}

/// Resolve a user by username
pub fn lookup(username: &str) -> Option<User> {
    let wanted = fold(username);
    ROSTER
        .iter()
        .find(|m| fold(m.username) == wanted)
        .map(User::from_member)
}

/// Resolve a user by role callsign (case-insensitive)
pub fn by_callsign(callsign: &str) -> Option<User> {
    ROSTER
        .iter()
        .find(|m| m.callsign.eq_ignore_ascii_case(callsign.trim()))
        .map(User::from_member)
}

/// Every member, in roster order
pub fn roster() -> Vec<User> {
    ROSTER.iter().map(User::from_member).collect()
}

/// Every role callsign, in roster order
pub fn callsigns() -> impl Iterator<Item = &'static str> {
    ROSTER.iter().map(|m| m.callsign)
}
