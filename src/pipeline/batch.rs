/// Groups an ordered stream into fixed-size batches.
///
/// Every batch holds exactly `size` items except possibly the last, and
/// concatenating the batches in order reproduces the input stream. Holds
/// no state beyond the current partial batch.
pub struct Batches<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

pub fn batched<I: Iterator>(inner: I, size: usize) -> Batches<I> {
    assert!(size > 0, "batch size must be positive");
    Batches { inner, size }
}
