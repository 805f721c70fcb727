// Design from the Bitcoin Core source code, file src/script/interpreter.cpp

// Original Bitcoin Core copyright header:
// Copyright (c) 2009-2010 Satoshi Nakamoto
// Copyright (c) 2009-2021 The Bitcoin Core developers
// Distributed under the MIT software license, see the accompanying
// file COPYING or http://www.opensource.org/licenses/mit-license.php.

/// A data type to abstract out the condition stack during script execution.
///
/// Conceptually it acts like a vector of booleans, one for each level of
/// nested IF/THEN/ELSE, indicating whether we're in the active or inactive
/// branch of each.
///
/// The elements on the stack cannot be observed individually; we only need
/// to expose whether the stack is empty and whether or not any false values
/// are present at all. To implement OP_ELSE, a toggle_top modifier is added,
/// which flips the last value without returning it.
///
/// This uses an optimized implementation that does not materialize the
/// actual stack. Instead, it just stores the size of the would-be stack,
/// and the position of the first false value in it.
#[derive(Debug, Clone, Default)]
pub struct ConditionStack {
    /// The size of the implied stack.
    stack_size: u32,
    /// The position of the first false value on the implied stack, or
    /// NO_FALSE if all true.
    first_false_pos: u32,
}

impl ConditionStack {
    const NO_FALSE: u32 = u32::MAX;

    pub fn new() -> Self {
        Self {
            stack_size: 0,
            first_false_pos: Self::NO_FALSE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack_size == 0
    }

    pub fn all_true(&self) -> bool {
        self.first_false_pos == Self::NO_FALSE
    }

    pub fn push_back(&mut self, f: bool) {
        if self.first_false_pos == Self::NO_FALSE && !f {
            // The stack consists of all true values, and a false is added.
            // The first false value will appear at the current size.
            self.first_false_pos = self.stack_size;
        }
        self.stack_size += 1;
    }

    pub fn pop_back(&mut self) {
        self.stack_size -= 1;
        if self.first_false_pos == self.stack_size {
            // When popping off the first false value, everything becomes true.
            self.first_false_pos = Self::NO_FALSE;
        }
    }

    pub fn toggle_top(&mut self) {
        if self.first_false_pos == Self::NO_FALSE {
            // The current stack is all true values; the first false will be the top.
            self.first_false_pos = self.stack_size - 1;
        } else if self.first_false_pos == self.stack_size - 1 {
            // The top is the first false value; toggling it will make everything true.
            self.first_false_pos = Self::NO_FALSE;
        }
        // Toggling anything but the first false value is unobservable.
    }
}

#[cfg(test)]
mod tests {
    use super::ConditionStack;

    #[test]
    fn test_matches_naive_vector() {
        // Exercise every push/toggle/pop interleaving 4 levels deep and
        // compare against a plain Vec<bool> model.
        fn check(ops: &[u8]) {
            let mut cs = ConditionStack::new();
            let mut model: Vec<bool> = Vec::new();

            for &op in ops {
                match op {
                    0 => {
                        cs.push_back(false);
                        model.push(false);
                    }
                    1 => {
                        cs.push_back(true);
                        model.push(true);
                    }
                    2 if !model.is_empty() => {
                        cs.toggle_top();
                        let top = model.last_mut().unwrap();
                        *top = !*top;
                    }
                    3 if !model.is_empty() => {
                        cs.pop_back();
                        model.pop();
                    }
                    _ => {}
                }

                assert_eq!(cs.is_empty(), model.is_empty());
                assert_eq!(cs.all_true(), model.iter().all(|&b| b));
            }
        }

        for a in 0..4u8 {
            for b in 0..4u8 {
                for c in 0..4u8 {
                    for d in 0..4u8 {
                        check(&[a, b, c, d]);
                        check(&[1, a, 0, b, 2, c, 3, d]);
                    }
                }
            }
        }
    }
}
