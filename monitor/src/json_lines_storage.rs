use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use duty_monitor::{EpochStorage, Summaries};
use duty_summary::EpochMeta;
use fs_err::tokio as fs;
use tracing::debug;
use types::primitives::Epoch;

/// Stores each epoch as `summaries-{epoch}.jsonl` (one validator per line)
/// and `meta-{epoch}.json` in a single directory.
///
/// Files are written to a temporary path first and renamed into place.
pub struct JsonLinesStorage {
    directory: PathBuf,
}

impl JsonLinesStorage {
    pub async fn new(directory: PathBuf) -> Result<Self> {
        fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    fn summaries_path(&self, epoch: Epoch) -> PathBuf {
        self.directory.join(format!("summaries-{epoch}.jsonl"))
    }

    fn meta_path(&self, epoch: Epoch) -> PathBuf {
        self.directory.join(format!("meta-{epoch}.json"))
    }
}

#[async_trait]
impl EpochStorage for JsonLinesStorage {
    async fn write_summaries(&self, epoch: Epoch, summaries: Summaries<'_>) -> Result<()> {
        let mut contents = vec![];
        let mut count = 0_usize;

        for summary in summaries {
            serde_json::to_writer(&mut contents, &summary)?;
            contents.push(b'\n');
            count += 1;
        }

        let path = self.summaries_path(epoch);

        write_atomically(&path, contents).await?;

        debug!("wrote {count} validator summaries to {}", path.display());

        Ok(())
    }

    async fn write_epoch_meta(&self, epoch: Epoch, meta: &EpochMeta) -> Result<()> {
        let contents = serde_json::to_vec_pretty(meta)?;
        write_atomically(&self.meta_path(epoch), contents).await
    }

    async fn epoch_meta(&self, epoch: Epoch) -> Result<Option<EpochMeta>> {
        let path = self.meta_path(epoch);

        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let meta = serde_json::from_slice(&contents)
            .with_context(|| format!("failed to parse epoch metadata in {}", path.display()))?;

        Ok(Some(meta))
    }
}

async fn write_atomically(path: &Path, contents: Vec<u8>) -> Result<()> {
    let temporary_path = path.with_extension("tmp");

    fs::write(&temporary_path, contents).await?;
    fs::rename(&temporary_path, path).await?;

    Ok(())
}
