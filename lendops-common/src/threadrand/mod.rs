use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static THREAD_RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_entropy());
}

pub struct SecureRng {}

impl SecureRng {
    /// # Safety
    ///
    /// The reference is only valid on the current thread and must not be
    /// held across a call that re-enters this function.
    unsafe fn get_ref() -> &'static mut ChaCha20Rng {
        THREAD_RNG.with(|rng| &mut *rng.get())
    }

    pub fn next_u32() -> u32 {
        let rng = unsafe { Self::get_ref() };
        rng.gen()
    }

    pub fn next_u64() -> u64 {
        let rng = unsafe { Self::get_ref() };
        rng.gen()
    }

    pub fn next_u128() -> u128 {
        let rng = unsafe { Self::get_ref() };
        rng.gen()
    }

    pub fn fill(dest: &mut [u8]) {
        let rng = unsafe { Self::get_ref() };
        rng.fill(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_changes_buffer() {
        let mut buf = [0u8; 32];
        SecureRng::fill(&mut buf);

        assert_ne!(buf, [0u8; 32]);
    }

    #[test]
    fn test_successive_values_differ() {
        assert_ne!(SecureRng::next_u128(), SecureRng::next_u128());
    }
}
