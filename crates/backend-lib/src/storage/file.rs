// ============================
// sessiongate-backend/src/storage/file.rs
// ============================
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs as tokio_fs, sync::Mutex};
use uuid::Uuid;

use super::{SessionStore, StoreError};
use crate::auth::Session;

const SESSIONS_DIR: &str = "sessions";
const FILE_PREFIX: &str = "session-";
const FILE_SUFFIX: &str = ".json";

/// On-disk record: the session plus its wall-clock deadline
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    expires_at: DateTime<Utc>,
    session: Session,
}

impl Envelope {
    fn new(session: Session, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            expires_at,
            session,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Sessions as one JSON file each under `<root>/sessions`, surviving restarts.
///
/// Writes go to a temporary file that is renamed into place, so readers never
/// see a partial record. Mutations are serialized by a store-wide lock so the
/// read-modify-write in `touch` cannot interleave with `set` or `delete`.
#[derive(Debug)]
pub struct FlatFileSessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

/// Session ids are generated by us; anything else never reaches the disk.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl FlatFileSessionStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(SESSIONS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        is_safe_id(id).then(|| self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}")))
    }

    async fn read_envelope(path: &Path) -> Result<Option<Envelope>, StoreError> {
        match tokio_fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_envelope(&self, path: &Path, envelope: &Envelope) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(envelope)?;
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio_fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio_fs::rename(&tmp, path).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(path: &Path) -> Result<(), StoreError> {
        match tokio_fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Every session file currently in the directory
    async fn session_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        let mut dir = tokio_fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl SessionStore for FlatFileSessionStore {
    async fn set(&self, id: &str, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| StoreError::Unavailable(format!("unsupported session id: {id:?}")))?;
        let envelope = Envelope::new(session.clone(), ttl);
        let _guard = self.write_lock.lock().await;
        self.write_envelope(&path, &envelope).await
    }

    async fn replace(&self, id: &str, session: &Session, ttl: Duration) -> Result<bool, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        match Self::read_envelope(&path).await? {
            Some(envelope) if envelope.is_live(Utc::now()) => {
                self.write_envelope(&path, &Envelope::new(session.clone(), ttl)).await?;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        match Self::read_envelope(&path).await? {
            Some(envelope) if envelope.is_live(Utc::now()) => Ok(Some(envelope.session)),
            Some(_) => {
                let _guard = self.write_lock.lock().await;
                // re-check under the lock: a concurrent set may have revived it
                if let Some(envelope) = Self::read_envelope(&path).await? {
                    if envelope.is_live(Utc::now()) {
                        return Ok(Some(envelope.session));
                    }
                    Self::remove(&path).await?;
                }
                Ok(None)
            },
            None => Ok(None),
        }
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>, ttl: Duration) -> Result<bool, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        match Self::read_envelope(&path).await? {
            Some(mut envelope) if envelope.is_live(Utc::now()) => {
                envelope.session.last_activity = at;
                let envelope = Envelope::new(envelope.session, ttl);
                self.write_envelope(&path, &envelope).await?;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        Self::remove(&path).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let now = Utc::now();
        let mut sessions = Vec::new();
        for path in self.session_files().await? {
            match Self::read_envelope(&path).await {
                Ok(Some(envelope)) if envelope.is_live(now) && envelope.session.user_id == user_id => {
                    sessions.push(envelope.session);
                },
                Ok(_) => {},
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session file"),
            }
        }
        Ok(sessions)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut removed = 0;
        for path in self.session_files().await? {
            if let Ok(Some(envelope)) = Self::read_envelope(&path).await {
                if !envelope.is_live(now) {
                    Self::remove(&path).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let probe = self.dir.join(format!(".health-{}.probe", Uuid::new_v4()));
        tokio_fs::write(&probe, b"ok").await?;
        Self::remove(&probe).await
    }
}
