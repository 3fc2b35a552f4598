use std::time::Duration;

pub const DEFAULT_TIP_INTERVAL: Duration = Duration::from_secs(5);

pub const TIPS: [&str; 4] = [
    "Did you know? BIT offers world-class education!",
    "Tip: Explore BIT's innovative research labs.",
    "Stay updated with campus events via BIT websites.",
    "Remember to check out the latest BIT news on the dashboard!",
];

/// Cyclic pointer into a fixed list of banner tips.
#[derive(Debug, Clone)]
pub struct TipRotator {
    tips: &'static [&'static str],
    index: usize,
}

impl TipRotator {
    pub fn new(tips: &'static [&'static str]) -> Self {
        Self { tips, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &'static str {
        self.tips.get(self.index).copied().unwrap_or_default()
    }

    pub fn rotate(&mut self) {
        if !self.tips.is_empty() {
            self.index = (self.index + 1) % self.tips.len();
        }
    }
}

impl Default for TipRotator {
    fn default() -> Self {
        Self::new(&TIPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_returns_to_start() {
        let mut tips = TipRotator::default();
        assert_eq!(tips.index(), 0);
        for _ in 0..TIPS.len() {
            tips.rotate();
        }
        assert_eq!(tips.index(), 0);
        assert_eq!(tips.current(), TIPS[0]);
    }

    #[test]
    fn test_rotate_advances_in_order() {
        let mut tips = TipRotator::default();
        tips.rotate();
        assert_eq!(tips.current(), "Tip: Explore BIT's innovative research labs.");
        tips.rotate();
        tips.rotate();
        assert_eq!(tips.index(), 3);
    }

    #[test]
    fn test_empty_list_is_inert() {
        let mut tips = TipRotator::new(&[]);
        tips.rotate();
        assert_eq!(tips.index(), 0);
        assert_eq!(tips.current(), "");
    }
}
