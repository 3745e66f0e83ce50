/// An encoded image buffer that can be handed to a `Mutator`.
///
/// Mutators only ever read through `as_bytes`; the bytes they return are a
/// fresh allocation, so the caller's buffer stays usable after the call.
pub trait Input: Clone + Send + Sync + std::fmt::Debug + 'static {
    fn as_bytes(&self) -> &[u8];
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;

    /// Copies the buffer into an owned working vector.
    fn to_working_copy(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Input for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }
    fn len(&self) -> usize {
        self.len()
    }
    fn is_empty(&self) -> bool {
        self.is_empty()
    }
}
