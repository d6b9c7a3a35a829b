//! Inbound UI actions.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use dupegrid_core::{DomainKey, Ino, PathKey};

/// An action taken by the user in the review UI.
///
/// Pair actions carry only `(ino, path)`; the owning group is resolved
/// against the current hierarchy when the action is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "action", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UiAction {
    /// Keep this path; any other original in its group is cleared.
    SetOriginal { ino: Ino, path: CompactString },
    /// Flip the delete mark of a path.
    ToggleDelete { ino: Ino, path: CompactString },
    /// Clear the original of a group.
    ClearOriginal { hash: CompactString, size: u64 },
    /// Queue every non-original path of a group.
    MarkGroupDelete { hash: CompactString, size: u64 },
    /// Clear every delete mark of a group.
    ClearGroupDeletes { hash: CompactString, size: u64 },
    /// Clear every delete mark everywhere.
    ClearQueue,
}

impl UiAction {
    /// Mark a path as original.
    pub fn set_original(ino: Ino, path: impl Into<CompactString>) -> Self {
        Self::SetOriginal {
            ino,
            path: path.into(),
        }
    }

    /// Flip a path's delete mark.
    pub fn toggle_delete(ino: Ino, path: impl Into<CompactString>) -> Self {
        Self::ToggleDelete {
            ino,
            path: path.into(),
        }
    }

    /// Queue every non-original path of a group.
    pub fn mark_group_delete(key: &DomainKey) -> Self {
        Self::MarkGroupDelete {
            hash: key.hash.as_str().into(),
            size: key.size,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The pair targeted by a pair-level action.
    pub fn pair(&self) -> Option<PathKey> {
        match self {
            Self::SetOriginal { ino, path } | Self::ToggleDelete { ino, path } => {
                Some(PathKey::new(*ino, path.clone()))
            }
            _ => None,
        }
    }

    /// The group targeted by a group-level action.
    pub fn group(&self) -> Option<DomainKey> {
        match self {
            Self::ClearOriginal { hash, size }
            | Self::MarkGroupDelete { hash, size }
            | Self::ClearGroupDeletes { hash, size } => {
                Some(DomainKey::new(hash.clone(), *size))
            }
            _ => None,
        }
    }
}

/// What an applied action changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The original was set.
    OriginalSet,
    /// The original was cleared; holds the former original.
    OriginalCleared(Option<PathKey>),
    /// A delete mark was flipped; holds the new mark.
    DeleteToggled(bool),
    /// Paths newly queued for deletion.
    DeletesMarked(usize),
    /// Delete marks cleared.
    DeletesCleared(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_shape() {
        let action: UiAction = serde_json::from_str(
            r#"{"action": "set_original", "ino": 888, "path": "/mnt/user/share/single.txt"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            UiAction::set_original(Ino::new(888), "/mnt/user/share/single.txt")
        );
        assert_eq!(action.name(), "set_original");

        let action: UiAction = serde_json::from_str(r#"{"action": "clear_queue"}"#).unwrap();
        assert_eq!(action, UiAction::ClearQueue);
        assert!(action.pair().is_none());
        assert!(action.group().is_none());
    }

    #[test]
    fn test_group_action_key() {
        let key = DomainKey::new("H", 10);
        let action = UiAction::mark_group_delete(&key);
        assert_eq!(action.group(), Some(key));

        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#""action":"mark_group_delete""#));
    }
}
