//! Chunk-driven traversal helpers.
//!
//! These are the loops an operator layer runs on top of a layout: one
//! callback per contiguous run, with the run described as a [`Chunk`]
//! (`start`, `len`, `step`). Element access goes through [`Storage`].

use crate::chunk::Chunk;
use crate::layout::StrideLayout;
use crate::order::Order;
use crate::storage::Storage;
use crate::Result;

/// Call `f` once per contiguous run of `layout` traversed in `order`.
///
/// Runs are produced lazily; the first error returned by `f` stops the
/// traversal and is propagated.
pub fn for_each_chunk<F>(layout: &StrideLayout, order: Order, mut f: F) -> Result<()>
where
    F: FnMut(Chunk) -> Result<()>,
{
    let mut chunks = layout.chunk_iter(order);
    while chunks.has_next() {
        f(chunks.next_chunk()?)?;
    }
    Ok(())
}

/// Copy the elements of `layout` into a new vector, in `order`.
pub fn gather<S>(storage: &S, layout: &StrideLayout, order: Order) -> Result<Vec<S::Item>>
where
    S: Storage + ?Sized,
{
    let mut out = Vec::with_capacity(layout.size());
    for_each_chunk(layout, order, |chunk| {
        for pointer in chunk.pointers() {
            out.push(storage.get(pointer)?);
        }
        Ok(())
    })?;
    Ok(out)
}

/// Write `value` to every element of `layout`.
pub fn fill<S>(storage: &mut S, layout: &StrideLayout, value: S::Item) -> Result<()>
where
    S: Storage + ?Sized,
{
    // visiting order is irrelevant, let compaction pick the longest runs
    for_each_chunk(layout, Order::A, |chunk| {
        for pointer in chunk.pointers() {
            storage.set(pointer, value)?;
        }
        Ok(())
    })
}

/// Left fold over the elements of `layout` in `order`.
pub fn fold<S, A, F>(
    storage: &S,
    layout: &StrideLayout,
    order: Order,
    init: A,
    mut f: F,
) -> Result<A>
where
    S: Storage + ?Sized,
    F: FnMut(A, S::Item) -> A,
{
    let mut chunks = layout.chunk_iter(order);
    let mut acc = init;
    while chunks.has_next() {
        let chunk = chunks.next_chunk()?;
        for pointer in chunk.pointers() {
            acc = f(acc, storage.get(pointer)?);
        }
    }
    Ok(acc)
}

/// Parallel version of [`for_each_chunk`] on the rayon thread pool.
///
/// Run starts are materialized and handed out to worker threads, so runs are
/// not visited in traversal order. Layouts smaller than
/// [`MIN_PARALLEL_LEN`](crate::MIN_PARALLEL_LEN) elements, and single-thread
/// pools, fall back to the sequential traversal.
#[cfg(feature = "parallel")]
pub fn for_each_chunk_parallel<F>(layout: &StrideLayout, order: Order, f: F) -> Result<()>
where
    F: Fn(Chunk) -> Result<()> + Sync + Send,
{
    use rayon::prelude::*;

    let nthreads = rayon::current_num_threads();
    if nthreads <= 1 || layout.size() < crate::MIN_PARALLEL_LEN {
        return for_each_chunk(layout, order, f);
    }

    let loops = layout.chunks(order);
    let (len, step) = (loops.loop_size(), loops.loop_step());
    tracing::debug!(
        chunk_count = loops.chunk_count(),
        loop_size = len,
        nthreads,
        "dispatching chunks in parallel"
    );
    loops
        .offsets()
        .par_iter()
        .try_for_each(|&start| f(Chunk { start, len, step }))
}
