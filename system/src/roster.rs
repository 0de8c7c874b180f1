use crate::types::Role;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

// NOTE: the role rides inside the display string, so a name that itself ends
// in " (ADMIN)" or similar is misread. Fixing that means sending structured
// roster records, which is a wire change this side can't make alone.
static ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+\((ADMIN|DRAWER|PARTICIPANT)\)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub name: String,
    /// `None` when the display string didn't carry a recognizable role.
    pub role: Option<Role>,
}

/// Parses `"<name> (<ROLE>)"`. Never fails: anything else keeps the whole
/// string as the name with no role.
pub fn parse_entry(display: &str) -> RosterEntry {
    ENTRY
        .captures(display)
        .and_then(|caps| {
            let role = match &caps[2] {
                "ADMIN" => Role::Admin,
                "DRAWER" => Role::Drawer,
                "PARTICIPANT" => Role::Participant,
                _ => return None,
            };
            Some(RosterEntry {
                name: caps[1].to_owned(),
                role: Some(role),
            })
        })
        .unwrap_or_else(|| RosterEntry {
            name: display.to_owned(),
            role: None,
        })
}

pub fn parse_roster<S: AsRef<str>>(list: &[S]) -> Vec<RosterEntry> {
    list.iter().map(|s| parse_entry(s.as_ref())).collect()
}

/// Drawer first, then admins, then everyone else; ties keep input order.
pub fn sorted_for_display(entries: &[RosterEntry]) -> Vec<RosterEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| match e.role {
        Some(Role::Drawer) => 0,
        Some(Role::Admin) => 1,
        _ => 2,
    });
    sorted
}

pub fn drawer_name(entries: &[RosterEntry]) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.role == Some(Role::Drawer))
        .map(|e| e.name.as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub is_drawer: bool,
    pub is_admin: bool,
}

impl RoleInfo {
    /// Looks up the first entry named `me`. No match means neither flag.
    pub fn derive(entries: &[RosterEntry], me: &str) -> RoleInfo {
        entries
            .iter()
            .find(|e| e.name == me)
            .map(|e| RoleInfo {
                is_drawer: e.role == Some(Role::Drawer),
                is_admin: e.role == Some(Role::Admin),
            })
            .unwrap_or_default()
    }

    pub fn is_privileged(&self) -> bool {
        self.is_drawer || self.is_admin
    }
}

/// The header line. The guesser branch never carries the word itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum StatusLine {
    Drawing {
        word: Option<String>,
    },
    Supervising {
        drawer: Option<String>,
        word: Option<String>,
    },
    Guessing {
        drawer: Option<String>,
        #[serde(rename = "wordLen")]
        word_len: Option<u32>,
    },
}

impl StatusLine {
    pub fn derive(
        role: RoleInfo,
        drawer: Option<&str>,
        secret_word: Option<&str>,
        word_len: Option<u32>,
    ) -> StatusLine {
        if role.is_drawer {
            StatusLine::Drawing {
                word: secret_word.map(str::to_owned),
            }
        } else if role.is_admin {
            StatusLine::Supervising {
                drawer: drawer.map(str::to_owned),
                word: secret_word.map(str::to_owned),
            }
        } else {
            StatusLine::Guessing {
                drawer: drawer.map(str::to_owned),
                word_len,
            }
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNDECIDED: &str = "(undecided)";
        const WAITING: &str = "(waiting for word)";
        match self {
            StatusLine::Drawing { word } => write!(
                f,
                "You are this round's artist. Word: {}",
                word.as_deref().unwrap_or(WAITING)
            ),
            StatusLine::Supervising { drawer, word } => write!(
                f,
                "Drawer: {}, word: {}",
                drawer.as_deref().unwrap_or(UNDECIDED),
                word.as_deref().unwrap_or(WAITING)
            ),
            StatusLine::Guessing { drawer, word_len } => {
                write!(
                    f,
                    "{} is drawing. The word has ",
                    drawer.as_deref().unwrap_or(UNDECIDED)
                )?;
                match word_len {
                    Some(n) => write!(f, "{} letters.", n),
                    None => write!(f, "? letters."),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_roster_in_order() {
        let roster = parse_roster(&["Kim (DRAWER)", "Lee (PARTICIPANT)", "garbage"]);
        assert_eq!(
            roster,
            vec![
                RosterEntry {
                    name: "Kim".into(),
                    role: Some(Role::Drawer)
                },
                RosterEntry {
                    name: "Lee".into(),
                    role: Some(Role::Participant)
                },
                RosterEntry {
                    name: "garbage".into(),
                    role: None
                },
            ]
        );
    }

    #[test]
    fn parsing_is_total() {
        for input in &["", " ", "(ADMIN)", " (ADMIN)", "Kim (admin)", "Kim(ADMIN)", "Kim (HOST)"] {
            let entry = parse_entry(input);
            assert_eq!(entry.name, *input);
            assert_eq!(entry.role, None);
        }
    }

    #[test]
    fn names_with_spaces_keep_them() {
        let entry = parse_entry("Mary Ann (ADMIN)");
        assert_eq!(entry.name, "Mary Ann");
        assert_eq!(entry.role, Some(Role::Admin));
    }

    #[test]
    fn role_suffix_inside_a_name_is_misread() {
        // the display-string coupling: the last suffix wins
        let entry = parse_entry("Bob (ADMIN) (PARTICIPANT)");
        assert_eq!(entry.name, "Bob (ADMIN)");
        assert_eq!(entry.role, Some(Role::Participant));
    }

    #[test]
    fn display_sort_is_stable() {
        let roster = parse_roster(&[
            "a (PARTICIPANT)",
            "b (ADMIN)",
            "c (PARTICIPANT)",
            "d (DRAWER)",
            "e",
        ]);
        let names: Vec<String> = sorted_for_display(&roster)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["d", "b", "a", "c", "e"]);
    }

    #[test]
    fn role_flags_are_exclusive() {
        let roster = parse_roster(&["Kim (DRAWER)", "Boss (ADMIN)", "Lee (PARTICIPANT)"]);
        assert_eq!(
            RoleInfo::derive(&roster, "Kim"),
            RoleInfo {
                is_drawer: true,
                is_admin: false
            }
        );
        assert_eq!(
            RoleInfo::derive(&roster, "Boss"),
            RoleInfo {
                is_drawer: false,
                is_admin: true
            }
        );
        assert_eq!(RoleInfo::derive(&roster, "Lee"), RoleInfo::default());
        assert_eq!(RoleInfo::derive(&roster, "Nobody"), RoleInfo::default());
    }

    #[test]
    fn first_matching_entry_wins() {
        let roster = parse_roster(&["Kim (PARTICIPANT)", "Kim (DRAWER)"]);
        assert!(!RoleInfo::derive(&roster, "Kim").is_drawer);
    }

    #[test]
    fn status_line_branches() {
        let drawer = RoleInfo {
            is_drawer: true,
            is_admin: false,
        };
        let admin = RoleInfo {
            is_drawer: false,
            is_admin: true,
        };
        let guest = RoleInfo::default();

        assert_eq!(
            StatusLine::derive(drawer, Some("Kim"), Some("apple"), Some(5)).to_string(),
            "You are this round's artist. Word: apple"
        );
        assert_eq!(
            StatusLine::derive(admin, Some("Kim"), Some("apple"), Some(5)).to_string(),
            "Drawer: Kim, word: apple"
        );
        let guessing = StatusLine::derive(guest, Some("Kim"), Some("apple"), Some(5));
        assert_eq!(guessing.to_string(), "Kim is drawing. The word has 5 letters.");
        assert!(!guessing.to_string().contains("apple"));
        assert_eq!(
            StatusLine::derive(guest, None, None, None).to_string(),
            "(undecided) is drawing. The word has ? letters."
        );
    }
}
