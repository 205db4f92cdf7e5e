//! Batch planning: how many attachments fit in the next request.

use crate::error::{Result, SubmitError};
use crate::submission::attachment::ByteLength;
use serde::Serialize;

/// Size target for one request body (document + attachments), in bytes.
pub const DEFAULT_CEILING: u64 = 10_000_000;

/// Half-open range `[start, end)` of attachment indices in one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchWindow {
    pub start: usize,
    pub end: usize,
}

impl BatchWindow {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when attachments remain beyond this window.
    pub fn is_partial(&self, total: usize) -> bool {
        self.end < total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
    ceiling: u64,
}

impl Default for BatchPlanner {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
        }
    }
}

impl BatchPlanner {
    pub fn new(ceiling: u64) -> Result<Self> {
        if ceiling == 0 {
            return Err(SubmitError::Planning(
                "batch ceiling must be at least 1 byte".to_string(),
            ));
        }
        Ok(Self { ceiling })
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Index one past the last attachment of the batch beginning at `start`.
    ///
    /// The document counts against every batch. The first attachment is
    /// always taken, even when it alone overflows the ceiling, so the
    /// result is greater than `start` whenever anything is left.
    pub fn plan<D, A>(&self, document: &D, attachments: &[A], start: usize) -> usize
    where
        D: ByteLength + ?Sized,
        A: ByteLength,
    {
        let mut total = document.byte_len();
        let mut end = start;

        for attachment in attachments.iter().skip(start) {
            total = total.saturating_add(attachment.byte_len());
            if total > self.ceiling && end > start {
                break;
            }
            end += 1;
        }

        end.max(start)
    }

    pub fn window<D, A>(&self, document: &D, attachments: &[A], start: usize) -> BatchWindow
    where
        D: ByteLength + ?Sized,
        A: ByteLength,
    {
        BatchWindow::new(start, self.plan(document, attachments, start))
    }

    /// Every window from `start` to the end of the list, in send order.
    pub fn windows<'a, D, A>(
        &'a self,
        document: &'a D,
        attachments: &'a [A],
        start: usize,
    ) -> impl Iterator<Item = BatchWindow> + 'a
    where
        D: ByteLength + ?Sized,
        A: ByteLength,
    {
        let mut next = start;
        std::iter::from_fn(move || {
            let window = self.window(document, attachments, next);
            if window.is_empty() {
                return None;
            }
            next = window.end;
            Some(window)
        })
    }
}

/// Plan with the default ceiling.
pub fn plan_batch<D, A>(document: &D, attachments: &[A], start: usize) -> usize
where
    D: ByteLength + ?Sized,
    A: ByteLength,
{
    BatchPlanner::default().plan(document, attachments, start)
}
