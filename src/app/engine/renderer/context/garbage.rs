use std::collections::VecDeque;

/// Resources waiting for the device to finish with them.
///
/// Each entry is tagged with the submit index that was current when it was
/// retired. Tags never decrease, so completed entries are always at the front.
#[derive(Debug)]
pub struct GarbageQueue<T> {
    zombies: VecDeque<(u64, T)>,
}

impl<T> Default for GarbageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GarbageQueue<T> {
    pub fn new() -> Self {
        Self {
            zombies: VecDeque::new(),
        }
    }

    pub fn retire(&mut self, submit_index: u64, zombie: T) {
        debug_assert!(
            self.zombies.back().is_none_or(|(last, _)| *last <= submit_index),
            "garbage retired out of submit order"
        );
        self.zombies.push_back((submit_index, zombie));
    }

    /// Removes every zombie whose submit index the device has completed.
    pub fn collect(&mut self, completed: u64) -> Vec<T> {
        let mut ready = Vec::new();
        while self
            .zombies
            .front()
            .is_some_and(|(submit_index, _)| *submit_index <= completed)
        {
            if let Some((_, zombie)) = self.zombies.pop_front() {
                ready.push(zombie);
            }
        }
        ready
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.zombies.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.zombies.is_empty()
    }
}
