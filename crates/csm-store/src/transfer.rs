//! Chunked streaming engine shared by the drivers.
//!
//! A transfer moves through `Start → Streaming → {Completed | Aborted | Failed}`.
//! The progress callback is invoked once at `Start` with zero bytes processed,
//! then after every chunk with the cumulative count. A `false` return stops
//! the transfer before the next chunk is moved.

use std::io::{self, Read, Write};

use csm_types::Progress;
use tracing::{debug, trace};

use crate::traits::ProgressCallback;

/// Lifecycle of a single transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    Start,
    Streaming,
    Completed,
    /// Stopped by the progress callback.
    Aborted,
    /// Stopped by an I/O error.
    Failed,
}

/// Why a transfer did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("aborted by progress callback after {processed} of {total} bytes")]
    Aborted { processed: u64, total: u64 },

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// One in-flight transfer: its progress record, state and observer.
struct Transfer<'a> {
    progress: Progress,
    state: TransferState,
    callback: Option<&'a ProgressCallback>,
}

impl<'a> Transfer<'a> {
    fn start(total_size: u64, callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            progress: Progress::start(total_size),
            state: TransferState::Start,
            callback,
        }
    }

    /// Report progress; `false` means the callback asked to stop.
    fn notify(&self) -> bool {
        self.callback.map_or(true, |cb| cb(&self.progress))
    }

    fn advance(&mut self, processed: u64) -> bool {
        self.state = TransferState::Streaming;
        self.progress.update(processed);
        trace!(
            processed,
            total = self.progress.total_size(),
            "transfer chunk"
        );
        self.notify()
    }

    fn abort(&mut self) -> TransferError {
        self.state = TransferState::Aborted;
        debug!(
            processed = self.progress.processed(),
            total = self.progress.total_size(),
            state = ?self.state,
            "transfer aborted by callback"
        );
        TransferError::Aborted {
            processed: self.progress.processed(),
            total: self.progress.total_size(),
        }
    }

    fn fail(&mut self, e: io::Error) -> TransferError {
        self.state = TransferState::Failed;
        debug!(error = %e, state = ?self.state, "transfer failed");
        TransferError::Io(e)
    }

    fn complete(mut self) -> Progress {
        self.state = TransferState::Completed;
        debug!(
            bytes = self.progress.processed(),
            state = ?self.state,
            "transfer completed"
        );
        self.progress
    }
}

fn check_chain_size(chain_size: usize) -> Result<(), TransferError> {
    if chain_size == 0 {
        return Err(TransferError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chain size must be non-zero",
        )));
    }
    Ok(())
}

/// Write `content` to `sink` in chunks of at most `chain_size` bytes.
///
/// Returns the final progress record. On abort or failure the sink may hold
/// a prefix of `content`; discarding it is the caller's job.
pub fn write_chunks<W: Write>(
    sink: &mut W,
    content: &[u8],
    chain_size: usize,
    callback: Option<&ProgressCallback>,
) -> Result<Progress, TransferError> {
    check_chain_size(chain_size)?;
    let mut transfer = Transfer::start(content.len() as u64, callback);
    if !transfer.notify() {
        return Err(transfer.abort());
    }

    let mut written: u64 = 0;
    for chunk in content.chunks(chain_size) {
        if let Err(e) = sink.write_all(chunk) {
            return Err(transfer.fail(e));
        }
        written += chunk.len() as u64;
        if !transfer.advance(written) {
            return Err(transfer.abort());
        }
    }
    if let Err(e) = sink.flush() {
        return Err(transfer.fail(e));
    }
    Ok(transfer.complete())
}

/// Read all of `source` in chunks of `chain_size` bytes.
///
/// `total_size` is the expected length used for progress reporting. Content
/// is only returned when every callback invocation allowed the transfer to
/// continue; partial content is never handed out.
pub fn read_chunks<R: Read>(
    source: &mut R,
    total_size: u64,
    chain_size: usize,
    callback: Option<&ProgressCallback>,
) -> Result<Vec<u8>, TransferError> {
    check_chain_size(chain_size)?;
    let mut transfer = Transfer::start(total_size, callback);
    if !transfer.notify() {
        return Err(transfer.abort());
    }

    let capacity = usize::try_from(total_size).unwrap_or(0);
    let mut content = Vec::with_capacity(capacity);
    let mut buf = vec![0u8; chain_size];
    loop {
        let n = match fill(source, &mut buf) {
            Ok(n) => n,
            Err(e) => return Err(transfer.fail(e)),
        };
        if n == 0 {
            break;
        }
        content.extend_from_slice(&buf[..n]);
        if !transfer.advance(content.len() as u64) {
            return Err(transfer.abort());
        }
    }
    transfer.complete();
    Ok(content)
}

/// Fill `buf` from `source`, stopping early only at end of input.
fn fill<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
