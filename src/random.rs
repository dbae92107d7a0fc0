use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of the random choices a pattern makes.
pub trait Entropy {
    /// A uniformly distributed byte.
    fn byte(&mut self) -> u8;

    /// A uniformly distributed index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T
    where
        Self: Sized,
    {
        &items[self.index(items.len())]
    }
}

/// [`Entropy`] backed by a `rand` generator.
pub struct RngSource<R>(R);

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Entropy for RngSource<R> {
    fn byte(&mut self) -> u8 {
        self.0.gen()
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Replays a fixed list of values, cycling when it runs out.
///
/// `byte` yields the value truncated to a byte, `index` yields it modulo `len`.
#[cfg(test)]
pub struct Scripted {
    values: Vec<usize>,
    next: usize,
}

#[cfg(test)]
impl Scripted {
    pub fn new(values: impl IntoIterator<Item = usize>) -> Self {
        let values: Vec<_> = values.into_iter().collect();
        assert!(!values.is_empty(), "scripted entropy needs at least one value");
        Self { values, next: 0 }
    }

    fn advance(&mut self) -> usize {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

#[cfg(test)]
impl Entropy for Scripted {
    fn byte(&mut self) -> u8 {
        self.advance() as u8
    }

    fn index(&mut self, len: usize) -> usize {
        self.advance() % len
    }
}
