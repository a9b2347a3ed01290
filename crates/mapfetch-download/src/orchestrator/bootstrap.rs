//! Mandatory resource download that gates everything else.
//!
//! `start` probes the missing size and then transfers files one by one
//! until the engine reports there are none left. The sync entry points
//! (`start`, `retry`) drive the whole transfer on the caller's thread; the
//! async service instead calls `begin_start`/`begin_retry` and steps the
//! transfer itself on a blocking worker so it stays responsive.

use serde::{Deserialize, Serialize};

use mapfetch_core::{BootstrapChunk, BootstrapPhase, ErrorCode, StorageError, StorageEvent, StorageResult};

use super::{LOG_TARGET, Orchestrator};

/// Observable state of the bootstrap download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapStatus {
    pub phase: BootstrapPhase,
    /// Bytes transferred so far in this attempt.
    pub downloaded: u64,
    /// Bytes missing when the attempt started.
    pub total: u64,
    /// Set while the host holds the transfer between files.
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl Orchestrator {
    /// Begin the bootstrap download and run it to the end.
    ///
    /// Only valid before the first start; use [`retry`](Self::retry) after a
    /// failure. Returns the phase reached.
    pub fn start(&mut self) -> StorageResult<BootstrapPhase> {
        self.begin_start()?;
        Ok(self.drive_bootstrap())
    }

    /// Restart a failed bootstrap from size computation and run it to the
    /// end.
    pub fn retry(&mut self) -> StorageResult<BootstrapPhase> {
        self.begin_retry()?;
        Ok(self.drive_bootstrap())
    }

    /// Give up after a failure.
    pub fn cancel(&mut self) -> StorageResult<BootstrapPhase> {
        if self.bootstrap.phase != BootstrapPhase::Failed {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "cancel"));
        }
        let error = self.bootstrap.error;
        self.set_phase(BootstrapPhase::Cancelled, error);
        Ok(self.bootstrap.phase)
    }

    /// Probe the missing size without transferring anything.
    pub fn begin_start(&mut self) -> StorageResult<BootstrapPhase> {
        if self.bootstrap.phase != BootstrapPhase::NotStarted {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "start"));
        }
        Ok(self.compute_bootstrap_size())
    }

    /// Re-probe the missing size after a failure.
    pub fn begin_retry(&mut self) -> StorageResult<BootstrapPhase> {
        if self.bootstrap.phase != BootstrapPhase::Failed {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "retry"));
        }
        tracing::info!(target: LOG_TARGET, "Retrying bootstrap download");
        Ok(self.compute_bootstrap_size())
    }

    /// Hold the transfer: the current file is abandoned and no further file
    /// starts until [`resume_bootstrap`](Self::resume_bootstrap).
    pub fn pause_bootstrap(&mut self) -> StorageResult<()> {
        if self.bootstrap.phase != BootstrapPhase::Transferring || self.bootstrap.paused {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "pause"));
        }
        self.bootstrap.paused = true;
        self.bootstrap_abandoned = true;
        self.engine.cancel_bootstrap_file();
        tracing::info!(target: LOG_TARGET, downloaded = self.bootstrap.downloaded, "Bootstrap paused");
        Ok(())
    }

    /// Release a paused transfer. The caller drives it on again.
    pub fn resume_bootstrap(&mut self) -> StorageResult<()> {
        if self.bootstrap.phase != BootstrapPhase::Transferring || !self.bootstrap.paused {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "resume"));
        }
        self.bootstrap.paused = false;
        tracing::info!(target: LOG_TARGET, "Bootstrap resumed");
        Ok(())
    }

    /// Whether another bootstrap file should be transferred now.
    pub fn wants_bootstrap_step(&self) -> bool {
        self.bootstrap.phase == BootstrapPhase::Transferring && !self.bootstrap.paused
    }

    /// Transfer one bootstrap file on the caller's thread.
    pub fn bootstrap_step(&mut self) -> StorageResult<BootstrapPhase> {
        if !self.wants_bootstrap_step() {
            return Err(StorageError::invalid_phase(self.bootstrap.phase, "transfer"));
        }
        let chunk = self.engine.transfer_next_bootstrap_file();
        Ok(self.apply_bootstrap_chunk(chunk))
    }

    /// Transfer files until the bootstrap completes, fails or is paused.
    pub fn drive_bootstrap(&mut self) -> BootstrapPhase {
        while self.wants_bootstrap_step() {
            let chunk = self.engine.transfer_next_bootstrap_file();
            self.apply_bootstrap_chunk(chunk);
        }
        self.bootstrap.phase
    }

    /// Apply the outcome of one bootstrap file transfer.
    ///
    /// Outcomes arriving outside `Transferring` are dropped. The first
    /// failure after a pause is the engine acknowledging the abandoned file
    /// and is dropped as well, even when the transfer was resumed before it
    /// arrived.
    pub fn apply_bootstrap_chunk(&mut self, chunk: BootstrapChunk) -> BootstrapPhase {
        if self.bootstrap.phase != BootstrapPhase::Transferring {
            tracing::debug!(target: LOG_TARGET, ?chunk, "Ignoring stale bootstrap chunk");
            return self.bootstrap.phase;
        }
        let abandoned = std::mem::take(&mut self.bootstrap_abandoned);

        if chunk.bytes > 0 && !chunk.result.is_failure() {
            self.bootstrap.downloaded = self.bootstrap.downloaded.saturating_add(chunk.bytes);
            self.events.publish(&StorageEvent::BootstrapProgress {
                downloaded: self.bootstrap.downloaded,
                total: self.bootstrap.total,
            });
        }

        match chunk.result {
            ErrorCode::NoMoreFiles => self.set_phase(BootstrapPhase::Complete, None),
            code if code.is_failure() && abandoned => {
                tracing::debug!(target: LOG_TARGET, %code, "Bootstrap file abandoned by pause");
            }
            code if code.is_failure() => {
                tracing::warn!(target: LOG_TARGET, %code, "Bootstrap transfer failed");
                self.set_phase(BootstrapPhase::Failed, Some(code));
            }
            _ => {}
        }
        self.bootstrap.phase
    }

    pub const fn bootstrap_phase(&self) -> BootstrapPhase {
        self.bootstrap.phase
    }

    pub const fn bootstrap_status(&self) -> BootstrapStatus {
        self.bootstrap
    }

    fn compute_bootstrap_size(&mut self) -> BootstrapPhase {
        self.bootstrap.downloaded = 0;
        self.bootstrap.total = 0;
        self.bootstrap.paused = false;
        self.bootstrap_abandoned = false;
        self.set_phase(BootstrapPhase::ComputingSize, None);

        match self.engine.probe_bootstrap_size() {
            Ok(0) => {
                tracing::info!(target: LOG_TARGET, "Bootstrap resources already present");
                self.set_phase(BootstrapPhase::Complete, None);
            }
            Ok(total) => {
                self.bootstrap.total = total;
                tracing::info!(target: LOG_TARGET, total, "Bootstrap transfer required");
                self.set_phase(BootstrapPhase::Transferring, None);
            }
            Err(code) => {
                tracing::warn!(target: LOG_TARGET, %code, "Bootstrap size probe failed");
                self.set_phase(BootstrapPhase::Failed, Some(code));
            }
        }
        self.bootstrap.phase
    }

    fn set_phase(&mut self, next: BootstrapPhase, error: Option<ErrorCode>) {
        let current = self.bootstrap.phase;
        if !current.can_transition_to(next) {
            tracing::error!(target: LOG_TARGET, from = %current, to = %next, "Rejected bootstrap transition");
            return;
        }
        self.bootstrap.phase = next;
        self.bootstrap.error = error;
        tracing::debug!(target: LOG_TARGET, from = %current, to = %next, "Bootstrap phase changed");
        self.events
            .publish(&StorageEvent::BootstrapPhaseChanged { phase: next, error });
    }
}
