// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Request sequencing for replies that can arrive out of order.
//!
//! Each logical operation kind owns one `RequestSequence`. Issuing a request
//! takes the next number; a reply is only applied when its number is still
//! the latest issued.

/// Monotonic sequence number source for one kind of request.
#[derive(Debug, Default, Clone)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number.
    pub fn next(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    /// Check whether a reply tagged `seq` is still the latest issued.
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    /// Make every outstanding reply stale.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_is_current() {
        let mut seq = RequestSequence::new();
        let first = seq.next();
        let second = seq.next();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn test_invalidate_drops_outstanding() {
        let mut seq = RequestSequence::new();
        let issued = seq.next();
        seq.invalidate();
        assert!(!seq.is_current(issued));
        let fresh = seq.next();
        assert!(seq.is_current(fresh));
    }
}
