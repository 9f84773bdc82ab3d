// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lockbox folder` subcommands.

use std::collections::{BTreeMap, HashSet};

use clap::Subcommand;
use lockbox_core::{FolderRecord, LockboxError};
use lockbox_vault::Vault;

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Create a folder.
    Add {
        name: String,
        /// Parent folder id.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show the folder tree, or the direct children of `--parent`.
    List {
        #[arg(long)]
        parent: Option<String>,
    },
    /// Move a folder under another one, or to the top level without `--parent`.
    Mv {
        id: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename a folder.
    Rename { id: String, name: String },
    /// Delete a folder. Without `--permanent` it can be restored.
    Rm {
        id: String,
        /// Remove the folder row; its children move up one level.
        #[arg(long)]
        permanent: bool,
    },
    /// Undo a folder delete.
    Restore { id: String },
}

pub async fn run_folder(vault: &Vault, command: FolderCommand) -> Result<(), LockboxError> {
    let records = vault.records();
    match command {
        FolderCommand::Add { name, parent } => {
            let folder = records.create_folder(&name, parent.as_deref()).await?;
            println!("{}", folder.id);
        }
        FolderCommand::List { parent: Some(parent) } => {
            let folders = records.list_folders(Some(&parent)).await?;
            for folder in &folders {
                println!("{}  {}", folder.id, folder.name);
            }
        }
        FolderCommand::List { parent: None } => {
            let folders = records.list_folders(None).await?;
            if folders.is_empty() {
                println!("No folders.");
            }
            for line in tree_lines(&folders) {
                println!("{line}");
            }
        }
        FolderCommand::Mv { id, parent } => {
            records.move_folder(&id, parent.as_deref()).await?;
            println!("Moved {id}");
        }
        FolderCommand::Rename { id, name } => {
            let folder = records.rename_folder(&id, &name).await?;
            println!("Renamed {id} to {}", folder.name);
        }
        FolderCommand::Rm { id, permanent: true } => {
            records.permanently_delete_folder(&id).await?;
            println!("Deleted {id}");
        }
        FolderCommand::Rm { id, permanent: false } => {
            records.soft_delete_folder(&id).await?;
            println!("Deleted {id} (restore with `lockbox folder restore`)");
        }
        FolderCommand::Restore { id } => {
            records.restore_folder(&id).await?;
            println!("Restored {id}");
        }
    }
    Ok(())
}

/// Indented tree rows. Folders whose parent is absent from `folders` (for
/// instance a deleted one) are shown at the top level.
fn tree_lines(folders: &[FolderRecord]) -> Vec<String> {
    let ids: HashSet<&str> = folders.iter().map(|f| f.id.as_str()).collect();
    let mut children: BTreeMap<Option<&str>, Vec<&FolderRecord>> = BTreeMap::new();
    for folder in folders {
        let parent = folder
            .parent_id
            .as_deref()
            .filter(|p| ids.contains(p));
        children.entry(parent).or_default().push(folder);
    }

    let mut lines = Vec::with_capacity(folders.len());
    let mut visited = HashSet::new();
    let mut stack: Vec<(&FolderRecord, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|f| (*f, 0)).collect())
        .unwrap_or_default();

    while let Some((folder, depth)) = stack.pop() {
        if !visited.insert(folder.id.as_str()) {
            continue;
        }
        lines.push(format!("{}{}  {}", "  ".repeat(depth), folder.name, folder.id));
        if let Some(kids) = children.get(&Some(folder.id.as_str())) {
            stack.extend(kids.iter().rev().map(|f| (*f, depth + 1)));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, parent: Option<&str>, name: &str) -> FolderRecord {
        FolderRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            name: name.to_string(),
            created_at: 0,
            updated_at: 0,
            deleted: false,
        }
    }

    #[test]
    fn tree_indents_children_under_parents() {
        let folders = vec![
            folder("b", None, "Personal"),
            folder("a", None, "Work"),
            folder("c", Some("a"), "Clients"),
            folder("d", Some("c"), "Acme"),
        ];
        assert_eq!(
            tree_lines(&folders),
            vec!["Personal  b", "Work  a", "  Clients  c", "    Acme  d"]
        );
    }

    #[test]
    fn orphaned_folders_surface_at_top_level() {
        let folders = vec![folder("x", Some("gone"), "Orphan")];
        assert_eq!(tree_lines(&folders), vec!["Orphan  x"]);
    }

    #[test]
    fn tree_terminates_on_a_cycle() {
        let folders = vec![
            folder("r", None, "Root"),
            folder("a", Some("b"), "A"),
            folder("b", Some("a"), "B"),
        ];
        assert_eq!(tree_lines(&folders), vec!["Root  r"]);
    }
}
