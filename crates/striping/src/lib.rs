//! Keyed mutual exclusion via lock striping.
//!
//! # Purpose
//!
//! [`StripingLock`] resolves an arbitrary key to a [`ReentrantLock`] so that operations on the
//! same key are serialized while unrelated keys proceed in parallel. The resolution is pluggable
//! through [`LockStrategy`]:
//!
//! - [`FixedStripes`]: a preallocated table of locks indexed by a spread hash of the key. Bounded
//!   memory, no reclamation; distinct keys sharing a slot serialize spuriously.
//! - [`DynamicStripes`]: one lock per distinct key, created on first use and reclaimed as soon as
//!   the last user checks it back in.
//!
//! # Mental Model
//!
//! 1. **Checkout:** the strategy hands out the key's lock. Dynamic strategies bump a reference
//!    count *before* returning, so the lock cannot be reclaimed under the caller.
//! 2. **Acquire:** the caller blocks, tries, waits with a deadline, or waits interruptibly on
//!    the returned lock. A [`StripeGuard`] owns the hold.
//! 3. **Release:** dropping the guard releases the hold first, then checks the lease back in.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`StripingLock`] | Facade composing a strategy behind `Arc<dyn LockStrategy>`. |
//! | [`ReentrantLock`] | Thread-owned, reentrant lock with hold counting and monitoring. |
//! | [`Condition`] | Condition variable bound to one [`ReentrantLock`]. |
//! | [`Interrupt`] | Cancellation token for interruptible waits. |
//! | [`StripingConfig`] | Serde-loadable strategy selection. |
//!
//! # Invariants
//!
//! - A dynamic lock must never be reclaimed while held, waited on, or checked out.
//!   - Enforced in: [`DynamicStripes`] checkout/checkin CAS loop.
//!   - Tested by: `strategy::dynamic::tests::contended_lock_is_reclaimed_after_release`
//!   - Failure symptom: two threads hold "the" lock for one key at the same time.
//!
//! - Guards release the hold before returning their lease.
//!   - Enforced in: field order of [`StripeGuard`].
//!   - Tested by: `striping::tests::guard_release_precedes_checkin`
//!   - Failure symptom: a dynamic lock is reclaimed while still owned.
//!
//! Monitoring queries (`is_locked`, `queue_length`, ...) are snapshots for diagnostics only.

mod condition;
mod config;
mod error;
mod interrupt;
mod reentrant;
mod spread;
mod strategy;
mod striping;

pub use condition::Condition;
pub use config::{DEFAULT_STRIPES, StripingConfig};
pub use error::LockError;
pub use interrupt::Interrupt;
pub use reentrant::{ReentrantGuard, ReentrantLock};
pub use spread::spread;
pub use strategy::{DynamicStripes, FixedStripes, LockStrategy, StrategyKind};
pub use striping::{StripeCondition, StripeGuard, StripingLock};
