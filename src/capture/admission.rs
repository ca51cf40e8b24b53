// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot admission gate for still requests

use std::sync::atomic::{AtomicBool, Ordering};

/// At most one still request may be in flight between issue and frame outcome
///
/// Acquiring never blocks; a caller that fails to acquire has to retry once the
/// token is released. Releasing an already free token does nothing.
#[derive(Debug, Default)]
pub struct AdmissionToken {
    held: AtomicBool,
}

impl AdmissionToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token; `false` if it is already held
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give the token back; returns whether it was held
    pub fn release(&self) -> bool {
        self.held.swap(false, Ordering::AcqRel)
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_holder() {
        let token = AdmissionToken::new();
        assert!(token.try_acquire());
        assert!(!token.try_acquire());
        assert!(token.is_held());
    }

    #[test]
    fn test_double_release_is_harmless() {
        let token = AdmissionToken::new();
        assert!(token.try_acquire());
        assert!(token.release());
        assert!(!token.release());
        assert!(!token.is_held());
        // Still a single slot afterwards
        assert!(token.try_acquire());
        assert!(!token.try_acquire());
    }

    #[test]
    fn test_contended_acquire_admits_one() {
        let token = Arc::new(AdmissionToken::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let token = Arc::clone(&token);
                std::thread::spawn(move || token.try_acquire())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
