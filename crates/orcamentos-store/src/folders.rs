use chrono::Utc;
use orcamentos_shared::constants::{FOLDERS_DOCUMENT, QUOTES_DOCUMENT};
use orcamentos_shared::{Folder, FolderUpdate, NewFolder, Quote};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::records::RecordStore;
use crate::storage::DocumentStorage;

impl<S: DocumentStorage> RecordStore<S> {
    pub fn list_folders(&self) -> Vec<Folder> {
        self.load_or_empty(FOLDERS_DOCUMENT)
    }

    pub fn get_folder(&self, id: &str) -> Option<Folder> {
        self.list_folders().into_iter().find(|f| f.id == id)
    }

    pub fn create_folder(&self, new: NewFolder) -> Result<Folder> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_DOCUMENT)?;
        let name = check_folder_name(&folders, &new.name, None)?;

        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name,
            color: new.color,
            description: new.description,
            created_at: Utc::now(),
            updated_at: None,
        };
        folders.push(folder.clone());
        self.save(FOLDERS_DOCUMENT, &folders)?;

        tracing::info!(id = %folder.id, name = %folder.name, "folder created");
        Ok(folder)
    }

    pub fn update_folder(&self, id: &str, update: &FolderUpdate) -> Result<Folder> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_DOCUMENT)?;
        let name = match &update.name {
            Some(name) => Some(check_folder_name(&folders, name, Some(id))?),
            None => None,
        };

        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::folder_not_found(id))?;
        if let Some(name) = name {
            folder.name = name;
        }
        if let Some(color) = &update.color {
            folder.color = color.clone();
        }
        if let Some(description) = &update.description {
            folder.description = description.clone();
        }
        folder.updated_at = Some(Utc::now());
        let updated = folder.clone();

        self.save(FOLDERS_DOCUMENT, &folders)?;
        Ok(updated)
    }

    /// Delete an empty folder. Returns `false` if no such folder.
    pub fn delete_folder(&self, id: &str) -> Result<bool> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_DOCUMENT)?;
        let Some(folder) = folders.iter().find(|f| f.id == id) else {
            return Ok(false);
        };

        let quotes: Vec<Quote> = self.load(QUOTES_DOCUMENT)?;
        let count = quotes
            .iter()
            .filter(|q| q.folder_id.as_deref() == Some(id))
            .count();
        if count > 0 {
            return Err(StoreError::FolderNotEmpty {
                name: folder.name.clone(),
                count,
            });
        }

        folders.retain(|f| f.id != id);
        self.save(FOLDERS_DOCUMENT, &folders)?;

        tracing::info!(id, "folder deleted");
        Ok(true)
    }
}

/// Trim `name` and make sure no other folder already uses it.
fn check_folder_name(folders: &[Folder], name: &str, except: Option<&str>) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::BlankFolderName);
    }
    let taken = folders
        .iter()
        .filter(|f| Some(f.id.as_str()) != except)
        .any(|f| f.has_name(name));
    if taken {
        return Err(StoreError::DuplicateFolderName(name.to_string()));
    }
    Ok(name.to_string())
}
