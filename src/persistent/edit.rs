//! Edit tokens for transient batches.
//!
//! A transient stamps every node it creates with its [`EditToken`]. While the
//! batch is open, a node carrying the batch's token was built by that batch
//! and nothing published can see it, so it may be changed in place. Any other
//! node (no token, or a token from another batch) is copied first.
//!
//! Tokens are minted from a process-wide counter and never reused. A
//! finalized batch drops its token, so the nodes it stamped can never match a
//! live token again: they are frozen from then on.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of one transient batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EditToken(NonZeroU64);

impl EditToken {
    /// Mints a token that no other batch has held.
    pub(crate) fn mint() -> Self {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and a u64 does not wrap in practice.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Returns `true` when a node stamped `stamp` may be edited under `live`.
    ///
    /// A published node (`stamp == None`) is never editable, and neither is
    /// any node when no batch is live.
    #[inline]
    pub(crate) fn allows(live: Option<Self>, stamp: Option<Self>) -> bool {
        matches!((live, stamp), (Some(live), Some(stamp)) if live == stamp)
    }
}
