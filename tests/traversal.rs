use rand::{rngs::StdRng, Rng, SeedableRng};
use strided_layout::{
    chunk_offsets, ChunkDescriptor, LayoutError, Order, PointerIterator, Shape, StrideLayout,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn layout(dims: &[usize], offset: usize, strides: &[isize]) -> StrideLayout {
    StrideLayout::from_dims(dims, offset, strides).unwrap()
}

/// Random layout of rank 1..=4 with possibly negative, zero or padded strides.
fn random_layout(rng: &mut StdRng) -> StrideLayout {
    let rank = rng.gen_range(1..=4);
    let dims: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=4)).collect();
    let strides: Vec<isize> = (0..rank).map(|_| rng.gen_range(-6..=8)).collect();
    // shift the base so the lowest reachable pointer is >= 0
    let reach: isize = dims
        .iter()
        .zip(&strides)
        .map(|(&d, &s)| if s < 0 { -s * (d as isize - 1) } else { 0 })
        .sum();
    let offset = reach as usize + rng.gen_range(0..3);
    layout(&dims, offset, &strides)
}

/// Pointers of every logical index, enumerated in a C or F order.
fn naive_pointers(l: &StrideLayout, order: Order) -> Vec<usize> {
    (0..l.size())
        .map(|pos| l.pointer(&l.shape().index(order, pos).unwrap()).unwrap())
        .collect()
}

fn sorted(mut v: Vec<usize>) -> Vec<usize> {
    v.sort_unstable();
    v
}

#[test]
fn test_pointer_and_chunk_coverage_agree() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let l = random_layout(&mut rng);
        for order in [Order::C, Order::F, Order::S, Order::A] {
            let flat: Vec<usize> = l.ptr_iter(order).collect();
            let loops = l.chunks(order);
            let chunked: Vec<usize> = loops.pointers().collect();
            assert_eq!(flat, chunked, "{l} {order}");
            assert_eq!(loops.chunk_count() * loops.loop_size(), l.size(), "{l} {order}");
            assert_eq!(sorted(flat), sorted(naive_pointers(&l, Order::C)), "{l} {order}");
        }
    }
}

#[test]
fn test_c_and_f_traversal_follow_logical_order() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..100 {
        let l = random_layout(&mut rng);
        for order in [Order::C, Order::F] {
            let flat: Vec<usize> = l.ptr_iter(order).collect();
            assert_eq!(flat, naive_pointers(&l, order), "{l} {order}");
        }
    }
}

#[test]
fn test_lazy_and_eager_offsets_agree() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let l = random_layout(&mut rng);
        for order in [Order::C, Order::F, Order::S] {
            let eager = ChunkDescriptor::of(&l, order);
            let lazy = l.chunk_iter(order);
            assert_eq!(lazy.loop_size(), eager.loop_size());
            assert_eq!(lazy.loop_step(), eager.loop_step());
            assert_eq!(lazy.chunk_count(), eager.chunk_count());
            assert_eq!(lazy.compute_chunk_offsets(), eager.offsets());
            assert_eq!(lazy.collect::<Vec<_>>(), eager.offsets(), "{l} {order}");
        }
    }
}

#[test]
fn test_scalar_layout() {
    let l = StrideLayout::dense(Shape::scalar(), 3, Order::C).unwrap();
    let loops = l.chunks(Order::A);
    assert_eq!(
        (loops.loop_size(), loops.loop_step(), loops.chunk_count()),
        (1, 1, 1)
    );
    assert_eq!(loops.offsets(), &[3]);
    assert_eq!(l.ptr_iter(Order::C).collect::<Vec<_>>(), vec![3]);
}

#[test]
fn test_dense_round_trip() {
    let l = StrideLayout::dense(Shape::new(&[2, 3]).unwrap(), 0, Order::C).unwrap();

    let c = l.chunks(Order::C);
    assert_eq!((c.loop_size(), c.loop_step(), c.chunk_count()), (6, 1, 1));
    assert_eq!(c.offsets(), &[0]);

    let f = l.chunks(Order::F);
    assert_eq!((f.loop_size(), f.loop_step(), f.chunk_count()), (2, 3, 3));
    assert_eq!(f.chunk_positions().collect::<Vec<_>>(), vec![0, 2, 4]);
    assert_eq!(f.offsets(), &[0, 1, 2]);
}

#[test]
fn test_odometer_offsets() {
    // C-ordered [2, 3, 4]: inner run of 4, outer axes [3, 2] with strides [4, 12]
    let l = StrideLayout::dense(Shape::new(&[2, 3, 4]).unwrap(), 0, Order::C).unwrap();
    let outer = l.compute_f_layout(Order::C, false);
    assert_eq!(outer.dims(), &[4, 3, 2]);
    let starts = chunk_offsets(0, &outer.dims()[1..], &outer.strides()[1..]).unwrap();
    assert_eq!(starts, vec![0, 4, 8, 12, 16, 20]);
}

#[test]
fn test_padded_view_is_not_merged() {
    let l = layout(&[3, 3], 0, &[9, 1]);
    let loops = l.chunks(Order::C);
    assert_eq!(loops.loop_size(), 3);
    assert_eq!(loops.chunk_count(), 3);
    assert_eq!(loops.offsets(), &[0, 9, 18]);
}

#[test]
fn test_exhaustion_is_reported() {
    let l = layout(&[2, 2], 0, &[5, 1]);
    let mut it = l.ptr_iter(Order::C);
    for _ in 0..4 {
        it.next_pointer().unwrap();
    }
    assert!(!it.has_next());
    assert_eq!(it.next_pointer(), Err(LayoutError::IteratorExhausted));

    let mut chunks = l.chunk_iter(Order::C);
    assert_eq!(chunks.by_ref().count(), 2);
    assert_eq!(chunks.next_offset(), Err(LayoutError::IteratorExhausted));
    assert_eq!(chunks.next(), None);
}

#[test]
fn test_empty_layout_has_no_chunks() {
    let l = layout(&[3, 0, 2], 0, &[1, 3, 3]);
    for order in [Order::C, Order::F, Order::S, Order::A] {
        let loops = l.chunks(order);
        assert_eq!(loops.chunk_count() * loops.loop_size(), 0);
        assert!(loops.offsets().is_empty());
        assert_eq!(l.ptr_iter(order).count(), 0);
    }
}

#[test]
fn test_broadcast_axis_is_revisited() {
    let row = layout(&[1, 3], 2, &[3, 1]);
    let b = row.broadcast(&[4, 3]).unwrap();
    let loops = b.chunks(Order::C);
    assert_eq!((loops.loop_size(), loops.loop_step()), (3, 1));
    assert_eq!(loops.offsets(), &[2, 2, 2, 2]);
}
