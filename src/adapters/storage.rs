use crate::domain::model::Ledger;
use crate::domain::ports::LedgerStore;
use crate::utils::error::LedgerError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Ledger kept as a newline-delimited text file, one id per line.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("ledger"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn display_path(path: &Path) -> String {
        path.display().to_string()
    }
}

pub fn parse_ledger(content: &str) -> Ledger {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn serialize_ledger(ids: &Ledger) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(id);
        out.push('\n');
    }
    out
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

impl LedgerStore for FileLedger {
    async fn load(&self) -> Result<Ledger, LedgerError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_ledger(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No ledger at {}, starting with an empty set",
                    self.path.display()
                );
                Ok(Ledger::new())
            }
            Err(source) => Err(LedgerError::Read {
                path: Self::display_path(&self.path),
                source,
            }),
        }
    }

    async fn commit(&self, ids: &Ledger) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| LedgerError::Write {
                    path: Self::display_path(parent),
                    source,
                })?;
        }

        // Write-then-rename: the old ledger stays intact until the rename.
        let temp_path = self.temp_path();
        if let Err(source) = write_synced(&temp_path, serialize_ledger(ids).as_bytes()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(LedgerError::Write {
                path: Self::display_path(&temp_path),
                source,
            });
        }

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| LedgerError::Write {
                path: Self::display_path(&self.path),
                source,
            })?;

        tracing::info!(
            "Saved {} listing ids to {}",
            ids.len(),
            self.path.display()
        );
        Ok(())
    }
}
