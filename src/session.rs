pub const DEFAULT_TOTAL_ROUNDS: usize = 5;

/// Ordered reaction times for one run of `total_rounds` rounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: u64,
    times: Vec<u64>,
    round_index: usize,
    total_rounds: usize,
}

impl Session {
    /// `total_rounds` is clamped to at least one round
    pub fn new(id: u64, total_rounds: usize) -> Self {
        let total_rounds = total_rounds.max(1);
        Self {
            id,
            times: Vec::with_capacity(total_rounds),
            round_index: 1,
            total_rounds,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn times(&self) -> &[u64] {
        &self.times
    }

    /// 1-based index of the round currently being played
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }

    pub fn last_time(&self) -> Option<u64> {
        self.times.last().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.times.len() == self.total_rounds
    }

    /// Record one reaction time. Returns false, leaving the session untouched,
    /// if every round already has a time.
    ///
    /// The round index advances only while rounds remain, so a finished
    /// session reports `round_index == total_rounds`.
    pub fn append(&mut self, ms: u64) -> bool {
        if self.is_complete() {
            return false;
        }
        self.times.push(ms);
        if !self.is_complete() {
            self.round_index += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let s = Session::new(3, 5);
        assert_eq!(s.id(), 3);
        assert_eq!(s.round_index(), 1);
        assert_eq!(s.total_rounds(), 5);
        assert!(s.times().is_empty());
        assert!(!s.is_complete());
        assert_eq!(s.last_time(), None);
    }

    #[test]
    fn test_zero_rounds_clamped() {
        let s = Session::new(0, 0);
        assert_eq!(s.total_rounds(), 1);
    }

    #[test]
    fn test_append_advances_round() {
        let mut s = Session::new(0, 3);
        assert!(s.append(180));
        assert_eq!(s.times(), &[180]);
        assert_eq!(s.round_index(), 2);
        assert_eq!(s.times().len(), s.round_index() - 1);
        assert_eq!(s.last_time(), Some(180));
    }

    #[test]
    fn test_complete_after_total_rounds() {
        let mut s = Session::new(0, 3);
        s.append(100);
        s.append(200);
        assert!(!s.is_complete());
        s.append(300);
        assert!(s.is_complete());
        assert_eq!(s.round_index(), 3);
    }

    #[test]
    fn test_append_refused_when_full() {
        let mut s = Session::new(0, 1);
        assert!(s.append(250));
        assert!(!s.append(260));
        assert_eq!(s.times(), &[250]);
    }
}
