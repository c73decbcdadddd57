//! Behavior Registry - role profiles stored as `hat-<role>.md` files
//!
//! Profiles are read from disk on every lookup so the registry reflects the
//! current on-disk state; there is no cache to invalidate.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::domain::Role;
use crate::error::{FactoryError, Result};
use crate::storage::write_atomic;

/// Heading under which retrospective checklist items are collected
pub const CHECKLIST_HEADING: &str = "## Retrospective Checklist";

/// Maps roles to their behavior profile text
#[derive(Debug, Clone)]
pub struct BehaviorRegistry {
    profiles_dir: PathBuf,
}

impl BehaviorRegistry {
    pub fn new(profiles_dir: impl AsRef<Path>) -> Self {
        Self {
            profiles_dir: profiles_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the profile file for a role
    pub fn profile_path(&self, role: Role) -> PathBuf {
        self.profiles_dir.join(format!("hat-{}.md", role))
    }

    /// Load the profile text for a role
    pub fn resolve(&self, role: Role) -> Result<String> {
        let path = self.profile_path(role);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Loaded profile for {} from {:?}", role, path);
                Ok(text)
            }
            Err(e) => {
                warn!("Profile for {} unreadable at {:?}: {}", role, path, e);
                Err(FactoryError::UnknownRole(role))
            }
        }
    }

    /// Validate a role name, then load its profile
    pub fn resolve_name(&self, name: &str) -> Result<(Role, String)> {
        let role: Role = name.parse()?;
        let text = self.resolve(role)?;
        Ok((role, text))
    }

    /// Roles that currently have a profile on disk, in role order
    pub fn available(&self) -> Vec<Role> {
        let pattern = self.profiles_dir.join("hat-*.md");
        let Some(pattern) = pattern.to_str() else {
            return Vec::new();
        };
        let Ok(paths) = glob::glob(pattern) else {
            return Vec::new();
        };

        let mut roles: Vec<Role> = paths
            .flatten()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                stem.strip_prefix("hat-")?.parse().ok()
            })
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }

    /// Append a checklist bullet to a role's profile
    ///
    /// Returns `false` when the item is already present. The profile must
    /// exist; the section heading is created on first use. Whitespace runs in
    /// the item, newlines included, collapse to single spaces so the bullet
    /// stays on one line.
    pub fn append_checklist_item(&self, role: Role, item: &str) -> Result<bool> {
        let current = self.resolve(role)?;
        let item = item.split_whitespace().collect::<Vec<_>>().join(" ");
        let bullet = format!("- [ ] {}", item);

        if current.lines().any(|line| line.trim_end() == bullet) {
            return Ok(false);
        }

        let updated = insert_checklist_bullet(&current, &bullet);
        write_atomic(&self.profile_path(role), &updated)?;
        debug!("Added checklist item to {} profile: {}", role, item);
        Ok(true)
    }
}

/// Insert a bullet at the end of the checklist section, creating it if absent
fn insert_checklist_bullet(profile: &str, bullet: &str) -> String {
    let lines: Vec<&str> = profile.lines().collect();

    let Some(heading) = lines.iter().position(|line| line.trim_end() == CHECKLIST_HEADING) else {
        let mut out = profile.trim_end().to_string();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(CHECKLIST_HEADING);
        out.push_str("\n\n");
        out.push_str(bullet);
        out.push('\n');
        return out;
    };

    let section_end = lines[heading + 1..]
        .iter()
        .position(|line| line.starts_with("## "))
        .map(|offset| heading + 1 + offset)
        .unwrap_or(lines.len());

    // Insert after the last non-blank line of the section
    let mut insert_at = section_end;
    while insert_at > heading + 1 && lines[insert_at - 1].trim().is_empty() {
        insert_at -= 1;
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    out.extend_from_slice(&lines[..insert_at]);
    if insert_at == heading + 1 {
        out.push("");
    }
    out.push(bullet);
    if insert_at < lines.len() {
        out.push("");
        out.extend(lines[insert_at..].iter().skip_while(|line| line.trim().is_empty()));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}
