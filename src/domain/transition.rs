// ============================================================
// Layer 3 — Transition System
// ============================================================
// A configuration is a stack and a buffer of slots. Each slot
// holds the index of a token (the head of the subtree it
// stands for) and a representation of type T. Slot 0 of both
// sequences is a guard that is never removed, so "empty"
// always means length 1.
//
//   stack:  [guard, s_k, ..., s_1, s_0]       s_0 = top
//   buffer: [guard, t_n-1, ..., t_1, t_0]     t_0 = next token
//
// Sizes passed to the legality predicate are CONTENT sizes
// (length - 1).
//
// T = ()           symbolic replay of a finished derivation
// T = Tensor row   the neural parser in ml::parser, which
//                  mirrors every change into its encoders

use crate::domain::{action::{Action, ActionSet}, error::ParseError, parse::ParseResult};

// ─── Legality ─────────────────────────────────────────────────────────────────
/// Whether `action` may be taken.
///
/// `stack_tokens` lists the token indices of the real stack entries,
/// bottom first (no guard).
pub fn is_legal(action: &Action, buffer_size: usize, stack_size: usize, stack_tokens: &[usize]) -> bool {
    // SWAP, LEFT-ARC and RIGHT-ARC all need two real stack items
    let can_reduce = stack_size >= 2;
    match action {
        Action::Shift => buffer_size > 0 && !(buffer_size == 1 && stack_size > 1),
        Action::Swap => {
            if !can_reduce {
                return false;
            }
            let top = stack_tokens[stack_tokens.len() - 1];
            let second = stack_tokens[stack_tokens.len() - 2];
            second < top
        }
        Action::LeftArc(_) => can_reduce,
        // the last remaining arc must attach left, to the root
        Action::RightArc(_) => can_reduce && !(buffer_size == 0 && stack_size == 2),
    }
}

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
struct Slot<T> {
    token: Option<usize>,
    repr:  T,
}

/// What an applied action did, so callers can mirror it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Buffer top moved to the stack
    Shift,
    /// Second stack item moved back to the buffer
    Swap { returned: usize },
    /// Two stack items replaced by their composition
    Arc { head: usize, dependent: usize },
}

#[derive(Debug, Clone)]
pub struct Configuration<T> {
    stack:  Vec<Slot<T>>,
    buffer: Vec<Slot<T>>,
    result: ParseResult,
}

impl<T> Configuration<T> {
    /// Initial configuration: guards only on the stack, all tokens on
    /// the buffer with token 0 on top.
    pub fn new(stack_guard: T, buffer_guard: T, tokens: Vec<T>) -> Self {
        let token_count = tokens.len();
        let mut buffer = Vec::with_capacity(token_count + 1);
        buffer.push(Slot { token: None, repr: buffer_guard });
        buffer.extend(
            tokens
                .into_iter()
                .enumerate()
                .rev()
                .map(|(i, repr)| Slot { token: Some(i), repr }),
        );
        Self {
            stack: vec![Slot { token: None, repr: stack_guard }],
            buffer,
            result: ParseResult::unattached(token_count),
        }
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Token indices of the real stack entries, bottom first
    pub fn stack_tokens(&self) -> Vec<usize> {
        self.stack.iter().filter_map(|s| s.token).collect()
    }

    /// Stack holds just the root and the buffer is drained
    pub fn is_terminal(&self) -> bool {
        self.stack_size() == 1 && self.buffer_size() == 0
    }

    /// Representation at the top of the stack (the guard when empty)
    pub fn stack_top(&self) -> &T {
        &self.stack[self.stack.len() - 1].repr
    }

    /// Representation at the top of the buffer (the guard when empty)
    pub fn buffer_top(&self) -> &T {
        &self.buffer[self.buffer.len() - 1].repr
    }

    /// Legal action indices in ActionSet enumeration order
    pub fn legal_actions(&self, actions: &ActionSet) -> Vec<usize> {
        let (buffer_size, stack_size) = (self.buffer_size(), self.stack_size());
        let stack_tokens = self.stack_tokens();
        actions
            .iter()
            .filter(|(_, a)| is_legal(a, buffer_size, stack_size, &stack_tokens))
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply `action`. `compose(head, dependent)` builds the new subtree
    /// representation for arc actions.
    ///
    /// Only underflow is checked here; legality is the caller's business.
    pub fn apply<F>(&mut self, action: &Action, compose: F) -> Result<Applied, ParseError>
    where
        F: FnOnce(&T, &T) -> T,
    {
        match action {
            Action::Shift => {
                let slot = self.pop_buffer().ok_or(ParseError::BufferUnderflow)?;
                self.stack.push(slot);
                Ok(Applied::Shift)
            }
            Action::Swap => {
                let (upper, lower) = self.pop_pair(action)?;
                let returned = lower.token.unwrap_or_default();
                self.buffer.push(lower);
                self.stack.push(upper);
                Ok(Applied::Swap { returned })
            }
            Action::LeftArc(label) | Action::RightArc(label) => {
                let (upper, lower) = self.pop_pair(action)?;
                let (head, dep) = match action {
                    Action::LeftArc(_) => (upper, lower),
                    _ => (lower, upper),
                };
                let (Some(head_token), Some(dep_token)) = (head.token, dep.token) else {
                    return Err(ParseError::StackUnderflow {
                        action: action.to_string(),
                        size:   self.stack_size(),
                    });
                };
                self.result.attach(dep_token, head_token, label);
                let repr = compose(&head.repr, &dep.repr);
                self.stack.push(Slot { token: Some(head_token), repr });
                Ok(Applied::Arc { head: head_token, dependent: dep_token })
            }
        }
    }

    /// Heads and relations recorded so far
    pub fn result(&self) -> &ParseResult {
        &self.result
    }

    pub fn into_result(self) -> ParseResult {
        self.result
    }

    fn require_two(&self, action: &Action) -> Result<(), ParseError> {
        if self.stack_size() < 2 {
            return Err(ParseError::StackUnderflow {
                action: action.to_string(),
                size:   self.stack_size(),
            });
        }
        Ok(())
    }

    /// Pop a real stack item; `None` rather than ever removing the guard
    fn pop_stack(&mut self) -> Option<Slot<T>> {
        if self.stack.len() > 1 { self.stack.pop() } else { None }
    }

    fn pop_buffer(&mut self) -> Option<Slot<T>> {
        if self.buffer.len() > 1 { self.buffer.pop() } else { None }
    }

    fn pop_pair(&mut self, action: &Action) -> Result<(Slot<T>, Slot<T>), ParseError> {
        self.require_two(action)?;
        match (self.pop_stack(), self.pop_stack()) {
            (Some(upper), Some(lower)) => Ok((upper, lower)),
            _ => Err(ParseError::StackUnderflow {
                action: action.to_string(),
                size:   self.stack_size(),
            }),
        }
    }
}

// ─── Replay ───────────────────────────────────────────────────────────────────
/// Re-execute a finished derivation over `token_count` tokens and return
/// the head/relation maps. Rejects underflow and derivations that leave
/// tokens on the buffer.
pub fn replay<'a, I>(token_count: usize, sequence: I) -> Result<ParseResult, ParseError>
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut config = Configuration::new((), (), vec![(); token_count]);
    for action in sequence {
        config.apply(action, |_, _| ())?;
    }
    if config.buffer_size() != 0 {
        return Err(ParseError::Incomplete { buffer: config.buffer_size() });
    }
    Ok(config.into_result())
}

/// Like `replay`, but every step must pass `is_legal` and the derivation
/// must end in the terminal configuration. A reference accepted here is
/// one the configuration loop can follow step for step.
pub fn replay_legal<'a, I>(token_count: usize, sequence: I) -> Result<ParseResult, ParseError>
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut config = Configuration::new((), (), vec![(); token_count]);
    for (step, action) in sequence.into_iter().enumerate() {
        let stack_tokens = config.stack_tokens();
        if !is_legal(action, config.buffer_size(), config.stack_size(), &stack_tokens) {
            return Err(ParseError::IllegalReference { step, action: action.to_string() });
        }
        config.apply(action, |_, _| ())?;
    }
    if config.buffer_size() > 0 || config.stack_size() > 1 {
        return Err(ParseError::Unfinished {
            stack:  config.stack_size(),
            buffer: config.buffer_size(),
        });
    }
    Ok(config.into_result())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn left(l: &str) -> Action {
        Action::LeftArc(l.into())
    }

    fn right(l: &str) -> Action {
        Action::RightArc(l.into())
    }

    #[test]
    fn test_replay_the_cat_sat() {
        let actions = [Action::Shift, Action::Shift, left("det"), Action::Shift, right("root")];
        let result = replay(3, &actions).unwrap();
        assert_eq!(result.heads(), &[Some(1), None, Some(1)]);
        assert_eq!(result.relation(0), Some("det"));
        assert_eq!(result.relation(2), Some("root"));
        assert_eq!(result.relation(1), None);
    }

    #[test]
    fn test_replay_legal_accepts_left_root_arc() {
        let actions = [Action::Shift, Action::Shift, left("det"), Action::Shift, left("root")];
        let result = replay_legal(3, &actions).unwrap();
        assert_eq!(result.heads(), &[Some(1), Some(2), None]);
        assert_eq!(result, replay(3, &actions).unwrap());
    }

    #[test]
    fn test_replay_legal_rejects_final_right_arc() {
        // replays, but RIGHT-ARC is illegal once the buffer is drained
        let actions = [Action::Shift, Action::Shift, left("det"), Action::Shift, right("root")];
        assert!(replay(3, &actions).is_ok());
        assert_eq!(
            replay_legal(3, &actions),
            Err(ParseError::IllegalReference { step: 4, action: "RIGHT-ARC(root)".into() })
        );
    }

    #[test]
    fn test_replay_legal_rejects_swap_out_of_order() {
        // after SHIFT SHIFT SWAP SHIFT the stack reads [1, 0]; swapping back is illegal
        let actions = [Action::Shift, Action::Shift, Action::Swap, Action::Shift, Action::Swap];
        assert_eq!(
            replay_legal(2, &actions),
            Err(ParseError::IllegalReference { step: 4, action: "SWAP".into() })
        );
    }

    #[test]
    fn test_replay_legal_rejects_unfinished_stack() {
        assert_eq!(
            replay_legal(2, &[Action::Shift, Action::Shift]),
            Err(ParseError::Unfinished { stack: 2, buffer: 0 })
        );
        assert_eq!(replay_legal(0, std::iter::empty()), Ok(ParseResult::unattached(0)));
    }

    #[test]
    fn test_failed_pop_never_removes_a_guard() {
        let mut c = Configuration::new('s', 'b', vec!['x']);
        assert!(c.apply(&left("x"), |_, _| 'c').is_err());
        c.apply(&Action::Shift, |_, _| 'c').unwrap();
        assert_eq!(c.apply(&Action::Shift, |_, _| 'c'), Err(ParseError::BufferUnderflow));
        assert!(c.apply(&Action::Swap, |_, _| 'c').is_err());
        assert_eq!((c.stack_size(), c.buffer_size()), (1, 0));
        assert_eq!(*c.buffer_top(), 'b');
        assert_eq!(*c.stack_top(), 'x');
    }

    #[test]
    fn test_replay_is_deterministic() {
        let actions = [Action::Shift, Action::Shift, Action::Shift, left("a"), left("b")];
        assert_eq!(replay(3, &actions), replay(3, &actions));
    }

    #[test]
    fn test_replay_rejects_underflow() {
        assert_eq!(
            replay(1, &[Action::Shift, Action::Shift]),
            Err(ParseError::BufferUnderflow)
        );
        assert!(matches!(
            replay(2, &[Action::Shift, left("x")]),
            Err(ParseError::StackUnderflow { size: 1, .. })
        ));
        assert!(matches!(
            replay(2, &[Action::Shift, Action::Swap]),
            Err(ParseError::StackUnderflow { .. })
        ));
    }

    #[test]
    fn test_replay_rejects_unfinished_buffer() {
        assert_eq!(
            replay(2, &[Action::Shift]),
            Err(ParseError::Incomplete { buffer: 1 })
        );
    }

    #[test]
    fn test_legality_with_empty_buffer_and_two_on_stack() {
        let tokens = [0, 1];
        assert!(!is_legal(&right("x"), 0, 2, &tokens));
        assert!(!is_legal(&Action::Shift, 0, 2, &tokens));
        assert!(is_legal(&left("x"), 0, 2, &tokens));
    }

    #[test]
    fn test_shift_blocked_when_only_last_token_remains() {
        assert!(!is_legal(&Action::Shift, 1, 2, &[0, 1]));
        assert!(is_legal(&Action::Shift, 1, 1, &[0]));
        assert!(is_legal(&Action::Shift, 2, 2, &[0, 1]));
    }

    #[test]
    fn test_reductions_need_two_items() {
        for action in [Action::Swap, left("x"), right("x")] {
            assert!(!is_legal(&action, 3, 1, &[0]));
            assert!(!is_legal(&action, 3, 0, &[]));
        }
    }

    #[test]
    fn test_swap_only_for_pairs_in_token_order() {
        // second below top precedes it: may be swapped back
        assert!(is_legal(&Action::Swap, 1, 2, &[0, 2]));
        // second already follows top: swapping again could cycle
        assert!(!is_legal(&Action::Swap, 1, 2, &[2, 0]));
    }

    #[test]
    fn test_size_arithmetic() {
        let mut c = Configuration::new((), (), vec![(); 3]);
        assert_eq!((c.stack_size(), c.buffer_size()), (0, 3));

        assert_eq!(c.apply(&Action::Shift, |_, _| ()), Ok(Applied::Shift));
        c.apply(&Action::Shift, |_, _| ()).unwrap();
        assert_eq!((c.stack_size(), c.buffer_size()), (2, 1));

        assert_eq!(
            c.apply(&Action::Swap, |_, _| ()),
            Ok(Applied::Swap { returned: 0 })
        );
        assert_eq!((c.stack_size(), c.buffer_size()), (1, 2));
        assert_eq!(c.stack_tokens(), vec![1]);

        c.apply(&Action::Shift, |_, _| ()).unwrap();
        assert_eq!(
            c.apply(&right("x"), |_, _| ()),
            Ok(Applied::Arc { head: 1, dependent: 0 })
        );
        assert_eq!((c.stack_size(), c.buffer_size()), (1, 1));
    }

    #[test]
    fn test_compose_receives_head_then_dependent() {
        let mut c = Configuration::new(-1, -1, vec![10, 20]);
        c.apply(&Action::Shift, |_, _| 0).unwrap();
        c.apply(&Action::Shift, |_, _| 0).unwrap();
        c.apply(&left("x"), |head, dep| head * 100 + dep).unwrap();
        assert_eq!(*c.stack_top(), 20 * 100 + 10);
        assert_eq!(*c.buffer_top(), -1);
        assert!(c.is_terminal());
    }

    #[test]
    fn test_initial_buffer_puts_first_token_on_top() {
        let c = Configuration::new('s', 'b', vec!['x', 'y', 'z']);
        assert_eq!(*c.buffer_top(), 'x');
        assert_eq!(*c.stack_top(), 's');
        assert!(!c.is_terminal());
    }

    #[test]
    fn test_legal_actions_follow_set_order() {
        let set: ActionSet = ["RIGHT-ARC(r)", "SWAP", "SHIFT", "LEFT-ARC(l)"]
            .into_iter()
            .collect();
        let mut c = Configuration::new((), (), vec![(); 4]);
        assert_eq!(c.legal_actions(&set), vec![2]);
        c.apply(&Action::Shift, |_, _| ()).unwrap();
        c.apply(&Action::Shift, |_, _| ()).unwrap();
        assert_eq!(c.legal_actions(&set), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_swap_derivation_counts() {
        // 0 is swapped behind 1 and attached once 1 is back on the stack
        let actions = [
            Action::Shift,
            Action::Shift,
            Action::Swap,
            Action::Shift,
            right("a"),
            Action::Shift,
            left("b"),
        ];
        let result = replay_legal(3, &actions).unwrap();
        assert_eq!(result.heads(), &[Some(1), Some(2), None]);

        let shifts = actions.iter().filter(|a| **a == Action::Shift).count();
        let swaps = actions.iter().filter(|a| **a == Action::Swap).count();
        let arcs = actions.iter().filter(|a| a.is_arc()).count();
        assert_eq!(shifts, 3 + swaps);
        assert_eq!(arcs, 3 - 1);
    }
}
