//! Directory-backed message queue, shareable between worker processes.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<source>/tmp/                     partially written messages
//! <root>/<source>/ready/<at>-<seq>-<id>.json     <at> = visible-at (unix ms)
//! <root>/<source>/inflight/<at>-<seq>-<id>.json  <at> = lease deadline (unix ms)
//! <root>/<source>/dead/                    records that could not be decoded
//! ```
//!
//! Every state change is a `rename`, which is atomic within one filesystem.
//! A receiver claims a message by renaming it from `ready/` to `inflight/`;
//! when two processes race for the same file only one rename succeeds and
//! the loser moves on to the next candidate. The in-flight file name is the
//! lease: a reaped and reclaimed message gets a new name, so the receipt of
//! the old lease no longer matches anything.
//!
//! `<seq>` is a per-process counter. FIFO holds for messages sent by one
//! process; messages sent by different processes within the same
//! millisecond are ordered by `<seq>` and then by id, which is arbitrary.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use crate::domain::{Message, MessageId, QueueError, Receipt, Received, Source};
use crate::observability::QueueCounts;
use crate::ports::{Clock, MessageQueue};

const READY_DIR: &str = "ready";
const INFLIGHT_DIR: &str = "inflight";
const TMP_DIR: &str = "tmp";
const DEAD_DIR: &str = "dead";

/// Parsed `<at>-<seq>-<id>.json` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryName {
    at_ms: u64,
    seq: u64,
    id: MessageId,
}

impl EntryName {
    fn render(&self) -> String {
        // zero padding keeps lexicographic order equal to (at, seq) order
        format!("{:020}-{:012}-{}.json", self.at_ms, self.seq, self.id)
    }

    fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let mut parts = stem.splitn(3, '-');
        let at_ms = parts.next()?.parse().ok()?;
        let seq = parts.next()?.parse().ok()?;
        let id = parts.next()?.parse().ok()?;
        Some(Self { at_ms, seq, id })
    }
}

pub struct FileMessageQueue<C> {
    root: PathBuf,
    clock: C,
    visibility_timeout: Duration,
    seq: AtomicU64,
}

impl<C: Clock> FileMessageQueue<C> {
    pub fn new(root: impl Into<PathBuf>, clock: C, visibility_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            clock,
            visibility_timeout,
            seq: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().timestamp_millis().max(0) as u64
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn dir(&self, source: &Source, kind: &str) -> PathBuf {
        self.root.join(source.as_str()).join(kind)
    }

    async fn ensure_dirs(&self, source: &Source) -> Result<(), QueueError> {
        for kind in [READY_DIR, INFLIGHT_DIR, TMP_DIR] {
            fs::create_dir_all(self.dir(source, kind)).await?;
        }
        Ok(())
    }

    /// Entry names in `dir`, sorted oldest first. A missing dir is empty.
    async fn list(&self, dir: &Path) -> Result<Vec<(String, EntryName)>, QueueError> {
        let mut entries = Vec::new();
        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            match EntryName::parse(file_name) {
                Some(parsed) => entries.push((file_name.to_string(), parsed)),
                None => tracing::debug!(file = %file_name, "ignoring foreign file in queue dir"),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Rename, treating "source vanished" as losing a race.
    async fn try_rename(&self, from: &Path, to: &Path) -> Result<bool, QueueError> {
        match fs::rename(from, to).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Park an undecodable claimed record in `dead/` so it is never handed out again.
    async fn bury(
        &self,
        source: &Source,
        claimed_path: &Path,
        file_name: &str,
    ) -> Result<(), QueueError> {
        let dead = self.dir(source, DEAD_DIR);
        fs::create_dir_all(&dead).await?;
        self.try_rename(claimed_path, &dead.join(file_name)).await?;
        Ok(())
    }

    /// Move expired leases back to `ready/`.
    async fn reap_expired(&self, source: &Source, now_ms: u64) -> Result<(), QueueError> {
        let inflight = self.dir(source, INFLIGHT_DIR);
        let ready = self.dir(source, READY_DIR);
        for (file_name, entry) in self.list(&inflight).await? {
            if entry.at_ms > now_ms {
                continue;
            }
            let back = EntryName {
                at_ms: now_ms,
                seq: self.next_seq(),
                id: entry.id,
            };
            if self
                .try_rename(&inflight.join(&file_name), &ready.join(back.render()))
                .await?
            {
                tracing::warn!(
                    message_id = %entry.id,
                    source = %source,
                    "visibility timeout expired, message will be redelivered"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> MessageQueue for FileMessageQueue<C> {
    async fn send(&self, message: Message, delay: Duration) -> Result<(), QueueError> {
        let at_ms = u64::try_from(delay.as_millis())
            .ok()
            .and_then(|delay_ms| self.now_ms().checked_add(delay_ms))
            .ok_or(QueueError::DelayOutOfRange(delay))?;
        let source = message.source().clone();
        self.ensure_dirs(&source).await?;

        let entry = EntryName {
            at_ms,
            seq: self.next_seq(),
            id: message.id(),
        };
        let file_name = entry.render();
        let tmp_path = self.dir(&source, TMP_DIR).join(&file_name);
        let bytes = serde_json::to_vec(&message)?;

        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, self.dir(&source, READY_DIR).join(&file_name)).await?;
        Ok(())
    }

    async fn receive(&self, source: &Source) -> Result<Option<Received>, QueueError> {
        let now_ms = self.now_ms();
        self.reap_expired(source, now_ms).await?;

        let ready = self.dir(source, READY_DIR);
        let inflight = self.dir(source, INFLIGHT_DIR);
        let timeout_ms = u64::try_from(self.visibility_timeout.as_millis()).unwrap_or(u64::MAX);
        let lease_deadline = now_ms.saturating_add(timeout_ms);

        for (file_name, entry) in self.list(&ready).await? {
            // sorted by visible-at, so nothing after this is due either
            if entry.at_ms > now_ms {
                break;
            }
            let claimed = EntryName {
                at_ms: lease_deadline,
                seq: entry.seq,
                id: entry.id,
            };
            let claimed_name = claimed.render();
            let claimed_path = inflight.join(&claimed_name);
            if !self.try_rename(&ready.join(&file_name), &claimed_path).await? {
                continue;
            }
            let bytes = match fs::read(&claimed_path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let message: Message = match serde_json::from_slice(&bytes) {
                Ok(message) => message,
                Err(err) => {
                    tracing::warn!(
                        file = %file_name,
                        source = %source,
                        error = %err,
                        "queue record is corrupt, moving it to dead/"
                    );
                    self.bury(source, &claimed_path, &claimed_name).await?;
                    continue;
                }
            };
            let receipt = Receipt::new(message.id(), claimed_name);
            return Ok(Some(Received { message, receipt }));
        }
        Ok(None)
    }

    async fn delete(&self, source: &Source, receipt: &Receipt) -> Result<(), QueueError> {
        // the lease is a file name we handed out; anything else is not ours
        let is_ours = EntryName::parse(receipt.lease())
            .is_some_and(|e| e.id == receipt.message_id() && e.render() == receipt.lease());
        if !is_ours {
            return Ok(());
        }
        let path = self.dir(source, INFLIGHT_DIR).join(receipt.lease());
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    message_id = %receipt.message_id(),
                    source = %source,
                    "stale or unknown receipt, nothing deleted"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn counts(&self, source: &Source) -> Result<QueueCounts, QueueError> {
        let now_ms = self.now_ms();
        let mut counts = QueueCounts::default();
        for (_, entry) in self.list(&self.dir(source, READY_DIR)).await? {
            if entry.at_ms <= now_ms {
                counts.ready += 1;
            } else {
                counts.delayed += 1;
            }
        }
        counts.in_flight = self.list(&self.dir(source, INFLIGHT_DIR)).await?.len();
        Ok(counts)
    }
}
