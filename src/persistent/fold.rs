//! Fork/join folding over the trie.
//!
//! A fold splits along the trie's structure: every child subtree becomes one
//! task, seeded with a fresh identity value, while the node's own inline
//! entries are reduced on the calling task. Child results are then merged
//! into the local accumulator with `combine`.
//!
//! Where the tasks actually run is up to a [`TaskScheduler`]:
//!
//! - [`Sequential`] runs every task immediately on the caller's thread
//! - [`ScopedThreads`] runs every task on a thread of a [`std::thread::scope`]
//!
//! With the `rayon` feature, [`LeanMap::par_fold`](crate::LeanMap::par_fold)
//! folds on the rayon pool instead.
//!
//! `combine` is applied in an unspecified grouping. For a deterministic
//! result it must be associative and `identity()` must be its neutral
//! element; `reduce_one` must fold entries independently of visit order.

use std::sync::Arc;
use std::thread::{Scope, ScopedJoinHandle};

use smallvec::SmallVec;

use super::node::Node;

/// Width of one branch level; no node has more children than this.
const MAX_CHILDREN: usize = 32;

/// Runs fold tasks and hands back their results.
///
/// `'scope` bounds everything a task may borrow; for a thread pool it is the
/// lifetime of the pool's scope.
pub trait TaskScheduler<'scope> {
    /// A forked task whose result can be joined.
    type Handle<T: Send + 'scope>;

    /// Starts `task`, possibly on another thread.
    fn fork<T, F>(&self, task: F) -> Self::Handle<T>
    where
        T: Send + 'scope,
        F: FnOnce() -> T + Send + 'scope;

    /// Waits for a forked task and returns its result.
    ///
    /// A panic inside the task is resumed on the joining thread.
    fn join<T: Send + 'scope>(&self, handle: Self::Handle<T>) -> T;
}

/// Scheduler that runs each task to completion as soon as it is forked.
///
/// # Examples
///
/// ```rust
/// use leanmap::{LeanMap, Sequential};
///
/// let map: LeanMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
/// let total = map.fold(|| 0, |left, right| left + right, |sum, _, value| sum + *value, &Sequential);
/// assert_eq!(total, 45);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequential;

impl<'scope> TaskScheduler<'scope> for Sequential {
    type Handle<T: Send + 'scope> = T;

    fn fork<T, F>(&self, task: F) -> Self::Handle<T>
    where
        T: Send + 'scope,
        F: FnOnce() -> T + Send + 'scope,
    {
        task()
    }

    fn join<T: Send + 'scope>(&self, handle: Self::Handle<T>) -> T {
        handle
    }
}

/// Scheduler that spawns each task on a scoped thread.
///
/// # Examples
///
/// ```rust
/// use leanmap::{LeanMap, ScopedThreads};
///
/// let map: LeanMap<u64, u64> = (0..1_000).map(|key| (key, key)).collect();
/// let total = std::thread::scope(|scope| {
///     map.fold(
///         || 0,
///         |left, right| left + right,
///         |sum, _, value| sum + *value,
///         &ScopedThreads::new(scope),
///     )
/// });
/// assert_eq!(total, 499_500);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScopedThreads<'scope, 'env> {
    scope: &'scope Scope<'scope, 'env>,
}

impl<'scope, 'env> ScopedThreads<'scope, 'env> {
    /// Creates a scheduler spawning into `scope`.
    pub const fn new(scope: &'scope Scope<'scope, 'env>) -> Self {
        Self { scope }
    }
}

impl<'scope> TaskScheduler<'scope> for ScopedThreads<'scope, '_> {
    type Handle<T: Send + 'scope> = ScopedJoinHandle<'scope, T>;

    fn fork<T, F>(&self, task: F) -> Self::Handle<T>
    where
        T: Send + 'scope,
        F: FnOnce() -> T + Send + 'scope,
    {
        self.scope.spawn(task)
    }

    fn join<T: Send + 'scope>(&self, handle: Self::Handle<T>) -> T {
        handle
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    }
}

/// The three functions of one fold, shared by all of its tasks.
pub(crate) struct Folder<I, C, R> {
    pub(crate) identity: I,
    pub(crate) combine: C,
    pub(crate) reduce_one: R,
}

impl<I, C, R> Folder<I, C, R> {
    /// Reduces the inline entries of `node` into a fresh identity value.
    fn reduce_entries<K, V, A>(&self, node: &Node<K, V>) -> A
    where
        I: Fn() -> A,
        R: Fn(A, &K, &V) -> A,
    {
        node.entries()
            .fold((self.identity)(), |accumulator, (key, value)| {
                (self.reduce_one)(accumulator, key, value)
            })
    }
}

/// Folds the subtree at `node`, forking one task per child.
pub(crate) fn fold_node<'scope, K, V, A, S, I, C, R>(
    node: &'scope Node<K, V>,
    folder: &Arc<Folder<I, C, R>>,
    scheduler: &S,
) -> A
where
    K: Send + Sync + 'scope,
    V: Send + Sync + 'scope,
    A: Send + 'scope,
    S: TaskScheduler<'scope> + Clone + Send + 'scope,
    I: Fn() -> A + Send + Sync + 'scope,
    C: Fn(A, A) -> A + Send + Sync + 'scope,
    R: Fn(A, &K, &V) -> A + Send + Sync + 'scope,
{
    let handles: SmallVec<[S::Handle<A>; MAX_CHILDREN]> = node
        .children()
        .map(|child| {
            let child: &'scope Node<K, V> = child;
            let folder = Arc::clone(folder);
            let task_scheduler = scheduler.clone();
            #[cfg(feature = "tracing")]
            tracing::trace!(children = child.node_arity(), "forking subtree fold");
            scheduler.fork(move || fold_node(child, &folder, &task_scheduler))
        })
        .collect();

    let local = folder.reduce_entries(node);
    handles.into_iter().fold(local, |accumulator, handle| {
        (folder.combine)(accumulator, scheduler.join(handle))
    })
}

/// Folds the subtree at `node` on the rayon pool.
#[cfg(feature = "rayon")]
pub(crate) fn par_fold_node<K, V, A, I, C, R>(node: &Node<K, V>, folder: &Folder<I, C, R>) -> A
where
    K: Send + Sync,
    V: Send + Sync,
    A: Send,
    I: Fn() -> A + Send + Sync,
    C: Fn(A, A) -> A + Send + Sync,
    R: Fn(A, &K, &V) -> A + Send + Sync,
{
    use rayon::prelude::*;

    let children: SmallVec<[&Node<K, V>; MAX_CHILDREN]> =
        node.children().map(|child| &**child).collect();
    let (local, below) = rayon::join(
        || folder.reduce_entries(node),
        || {
            children
                .par_iter()
                .map(|child| par_fold_node(child, folder))
                .reduce(|| (folder.identity)(), |left, right| (folder.combine)(left, right))
        },
    );
    (folder.combine)(local, below)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::hash::compute_hash;
    use crate::persistent::node::NodeRef;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn build(size: u64) -> NodeRef<u64, u64> {
        let mut root = Arc::new(Node::empty(None));
        for key in 0..size {
            Node::assoc(&mut root, None, 0, compute_hash(&key), key, key);
        }
        root
    }

    macro_rules! sum_folder {
        () => {
            Arc::new(Folder {
                identity: || 0_u64,
                combine: |left: u64, right: u64| left + right,
                reduce_one: |sum: u64, _: &u64, value: &u64| sum + value,
            })
        };
    }

    #[rstest]
    fn test_sequential_fork_runs_immediately() {
        let counter = AtomicUsize::new(0);
        let handle = Sequential.fork(|| counter.fetch_add(1, Ordering::SeqCst));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(Sequential.join(handle), 0);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5_000)]
    fn test_sequential_fold_sums_values(#[case] size: u64) {
        let root = build(size);
        let total = fold_node(&root, &sum_folder!(), &Sequential);
        assert_eq!(total, (0..size).sum::<u64>());
    }

    #[rstest]
    fn test_scoped_fold_matches_sequential() {
        let root = build(2_000);
        let sequential = fold_node(&root, &sum_folder!(), &Sequential);
        let threaded = std::thread::scope(|scope| {
            fold_node(&root, &sum_folder!(), &ScopedThreads::new(scope))
        });
        assert_eq!(sequential, threaded);
    }

    #[rstest]
    fn test_scoped_join_resumes_panics() {
        let result = std::panic::catch_unwind(|| {
            std::thread::scope(|scope| {
                let threads = ScopedThreads::new(scope);
                let handle = threads.fork(|| -> u8 { panic!("task failed") });
                threads.join(handle)
            })
        });
        assert!(result.is_err());
    }

    #[cfg(feature = "rayon")]
    #[rstest]
    fn test_rayon_fold_matches_sequential() {
        let root = build(3_000);
        let folder = sum_folder!();
        assert_eq!(
            par_fold_node(&root, &folder),
            fold_node(&root, &folder, &Sequential)
        );
    }
}
