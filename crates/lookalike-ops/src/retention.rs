//! Which members of a duplicate group or image cluster to drop.

use std::path::{Component, Path, PathBuf};

/// How members of a finding are selected for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// List findings, remove nothing.
    ReportOnly,
    /// Remove every member that lies under this directory.
    DeleteIn(PathBuf),
    /// Ask a [`KeepChooser`] which single member to keep.
    Prompt,
}

/// Answer from a [`KeepChooser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepChoice {
    /// Keep the member at this index and remove the rest.
    Keep(usize),
    /// Keep every member.
    KeepAll,
    /// The answer could not be understood; the group is skipped.
    Invalid,
}

/// Source of interactive keep decisions.
pub trait KeepChooser {
    fn choose(&mut self, members: &[PathBuf]) -> KeepChoice;
}

/// Outcome of applying a policy to one finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to remove.
    Keep,
    /// Remove these members, in member order.
    Remove(Vec<PathBuf>),
    /// The chooser gave an unusable answer.
    Invalid,
}

impl RetentionPolicy {
    /// Decide what to remove from `members`. Never selects every member.
    pub fn decide(&self, members: &[PathBuf], chooser: &mut dyn KeepChooser) -> Decision {
        if members.len() < 2 {
            return Decision::Keep;
        }

        match self {
            Self::ReportOnly => Decision::Keep,
            Self::DeleteIn(prefix) => under_prefix(members, prefix),
            Self::Prompt => match chooser.choose(members) {
                KeepChoice::KeepAll => Decision::Keep,
                KeepChoice::Keep(index) if index < members.len() => Decision::Remove(
                    members
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, path)| path.clone())
                        .collect(),
                ),
                KeepChoice::Keep(_) | KeepChoice::Invalid => Decision::Invalid,
            },
        }
    }
}

fn under_prefix(members: &[PathBuf], prefix: &Path) -> Decision {
    let prefix = lexical_clean(prefix);
    let matching: Vec<usize> = members
        .iter()
        .enumerate()
        .filter(|(_, path)| lexical_clean(path).starts_with(&prefix))
        .map(|(i, _)| i)
        .collect();

    // With every member under the prefix, the first one survives.
    let skip = usize::from(matching.len() == members.len());
    let victims: Vec<PathBuf> = matching
        .into_iter()
        .skip(skip)
        .map(|i| members[i].clone())
        .collect();

    if victims.is_empty() {
        Decision::Keep
    } else {
        Decision::Remove(victims)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
