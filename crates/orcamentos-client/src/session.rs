//! The session context: remote records, realtime subscriptions and presence
//! bundled behind one explicitly opened and closed handle.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use orcamentos_net::{
    ChangeFeed, RealtimeHub, RemoteConfig, RemoteRecordService, RestBackend, SseFeed,
};
use orcamentos_shared::attachment::encode_batch;
use orcamentos_shared::report::QuoteReport;
use orcamentos_shared::{
    find_duplicate, Candidate, Folder, FolderUpdate, IdGrain, NewFolder, Quote, QuoteUpdate,
};
use tracing::{info, warn};

use crate::connectivity::{Connectivity, ConnectivityFlag};
use crate::error::{ClientError, Result};
use crate::presence::{PresenceConfig, PresenceManager};
use crate::submission::{QuoteForm, SubmissionReceipt};

pub struct Session {
    remote: RemoteRecordService,
    hub: RealtimeHub,
    presence: PresenceManager,
    connectivity: Arc<dyn Connectivity>,
    grain: IdGrain,
}

impl Session {
    /// Open a session over an existing backend and change feed. Presence is
    /// registered and the stale-user sweep started; a failed registration is
    /// logged and the session stays usable.
    pub async fn open(
        remote: RemoteRecordService,
        feed: Arc<dyn ChangeFeed>,
        connectivity: Arc<dyn Connectivity>,
        presence: PresenceConfig,
    ) -> Self {
        let presence = PresenceManager::new(remote.clone(), presence);
        if let Err(e) = presence.register().await {
            warn!(error = %e, "Presence registration failed");
        }
        presence.start_cleanup();

        info!(online = connectivity.is_online(), "Session opened");
        Self {
            remote,
            hub: RealtimeHub::new(feed),
            presence,
            connectivity,
            grain: IdGrain::default(),
        }
    }

    /// Open a session against the backend at `config`.
    pub async fn connect(
        config: RemoteConfig,
        connectivity: Arc<dyn Connectivity>,
        presence: PresenceConfig,
    ) -> Result<Self> {
        let backend = RestBackend::new(config.clone())?;
        let feed = SseFeed::new(config)?;
        Ok(Self::open(
            RemoteRecordService::new(Arc::new(backend)),
            Arc::new(feed),
            connectivity,
            presence,
        )
        .await)
    }

    /// Open a session configured from `ORCAMENTOS_BACKEND_URL` and
    /// `ORCAMENTOS_BACKEND_KEY`.
    pub async fn from_env() -> Result<Self> {
        let config = RemoteConfig::from_env()?;
        Self::connect(
            config,
            Arc::new(ConnectivityFlag::default()),
            PresenceConfig::default(),
        )
        .await
    }

    /// Grain used by the duplicate check on submission.
    pub fn with_grain(mut self, grain: IdGrain) -> Self {
        self.grain = grain;
        self
    }

    pub fn remote(&self) -> &RemoteRecordService {
        &self.remote
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    pub fn presence(&self) -> &PresenceManager {
        &self.presence
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    // -- Quotes -------------------------------------------------------------

    /// Validate the form, reject it if it repeats an existing quote, then
    /// save the quote and each of its attachments.
    pub async fn submit_quote(
        &self,
        form: &QuoteForm,
        today: NaiveDate,
    ) -> Result<SubmissionReceipt> {
        let fields = form.validate(today)?;

        let existing = self
            .remote
            .try_list_quotes(None)
            .await
            .map_err(|source| ClientError::CheckFailed {
                what: "orçamentos duplicados",
                source,
            })?;
        if let Some(duplicate) = find_duplicate(&existing, &Candidate::from(&fields), self.grain) {
            info!(id = %duplicate.id, "Duplicate quote rejected");
            return Err(ClientError::Duplicate {
                id: duplicate.id.clone(),
                submitted_on: duplicate.submitted_on,
            });
        }

        let quote = self
            .remote
            .create_quote(&fields)
            .await
            .ok_or(ClientError::RemoteWriteFailed("salvar o orçamento"))?;

        let (encoded, failed) = encode_batch(&quote.id, &form.attachments);
        let mut attachment_errors: Vec<String> = failed.iter().map(ToString::to_string).collect();
        let mut attachments_stored = 0;
        for attachment in &encoded {
            match self.remote.create_attachment(attachment).await {
                Some(_) => attachments_stored += 1,
                None => attachment_errors.push(format!(
                    "Não foi possível salvar o anexo {}",
                    attachment.name
                )),
            }
        }

        info!(
            id = %quote.id,
            attachments = attachments_stored,
            failed = attachment_errors.len(),
            "Quote submitted"
        );
        Ok(SubmissionReceipt {
            quote,
            attachments_stored,
            attachment_errors,
        })
    }

    pub async fn update_quote(&self, id: &str, update: &QuoteUpdate) -> Result<()> {
        if self.remote.update_quote(id, update).await {
            Ok(())
        } else {
            Err(ClientError::RemoteWriteFailed("atualizar o orçamento"))
        }
    }

    /// Delete a quote together with its attachments. The quote is kept when
    /// its attachments cannot be removed.
    pub async fn delete_quote(&self, id: &str) -> Result<()> {
        if !self.remote.delete_attachments(id).await {
            warn!(id, "Attachments not removed, keeping quote");
            return Err(ClientError::RemoteWriteFailed("excluir os anexos do orçamento"));
        }
        if self.remote.delete_quote(id).await {
            Ok(())
        } else {
            Err(ClientError::RemoteWriteFailed("excluir o orçamento"))
        }
    }

    /// Report content for a saved quote, with its stored attachments.
    pub async fn report(&self, quote: &Quote) -> QuoteReport {
        let attachments = self.remote.list_attachments(&quote.id).await;
        QuoteReport::build(&quote.fields, &attachments, Some(&quote.id), Utc::now())
    }

    // -- Folders ------------------------------------------------------------

    pub async fn create_folder(&self, folder: NewFolder) -> Result<Folder> {
        let folders = self.checked_folders().await?;
        let name = check_folder_name(&folders, &folder.name, None)?;

        self.remote
            .create_folder(&NewFolder { name, ..folder })
            .await
            .ok_or(ClientError::RemoteWriteFailed("criar a pasta"))
    }

    pub async fn update_folder(&self, id: &str, update: &FolderUpdate) -> Result<()> {
        let mut update = update.clone();
        if let Some(name) = &update.name {
            let folders = self.checked_folders().await?;
            update.name = Some(check_folder_name(&folders, name, Some(id))?);
        }

        if self.remote.update_folder(id, &update).await {
            Ok(())
        } else {
            Err(ClientError::RemoteWriteFailed("atualizar a pasta"))
        }
    }

    /// Delete an empty folder. Returns `false` if no such folder.
    pub async fn delete_folder(&self, id: &str) -> Result<bool> {
        let folders = self.checked_folders().await?;
        let Some(folder) = folders.iter().find(|f| f.id == id) else {
            return Ok(false);
        };

        let count = self
            .remote
            .try_list_quotes(Some(id))
            .await
            .map_err(|source| ClientError::CheckFailed {
                what: "os orçamentos da pasta",
                source,
            })?
            .len();
        if count > 0 {
            return Err(ClientError::FolderNotEmpty {
                name: folder.name.clone(),
                count,
            });
        }

        if self.remote.delete_folder(id).await {
            Ok(true)
        } else {
            Err(ClientError::RemoteWriteFailed("excluir a pasta"))
        }
    }

    async fn checked_folders(&self) -> Result<Vec<Folder>> {
        self.remote
            .try_list_folders()
            .await
            .map_err(|source| ClientError::CheckFailed {
                what: "as pastas existentes",
                source,
            })
    }

    /// Stop every subscription and background task and remove this session
    /// from the presence list.
    pub async fn close(self) {
        self.hub.unsubscribe_all();
        self.presence.remove().await;
        info!("Session closed");
    }
}

fn check_folder_name(folders: &[Folder], name: &str, except: Option<&str>) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::BlankFolderName);
    }
    if folders
        .iter()
        .filter(|f| Some(f.id.as_str()) != except)
        .any(|f| f.has_name(name))
    {
        return Err(ClientError::DuplicateFolderName(name.to_string()));
    }
    Ok(name.to_string())
}
