//! Character diff between two texts
//!
//! Positions are Unicode scalar values, never bytes, so a delta never splits
//! a multi-byte character. Between two `Equal` runs all removed text is
//! gathered into one `Delete` followed by one `Insert`, which keeps deltas
//! short and the output canonical.

use similar::{capture_diff_slices, Algorithm, DiffOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Insert(String),
    Delete(String),
    Equal(String),
}

impl Op {
    pub fn text(&self) -> &str {
        match self {
            Op::Insert(s) | Op::Delete(s) | Op::Equal(s) => s,
        }
    }

    /// Length in characters, the unit the wire format counts in.
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// Diff `old` against `new`. Never emits an empty op.
pub fn diff(old: &str, new: &str) -> Vec<Op> {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut ops = Vec::new();
    let mut deleted = String::new();
    let mut inserted = String::new();

    for op in capture_diff_slices(Algorithm::Myers, &old_chars, &new_chars) {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                flush_edits(&mut ops, &mut deleted, &mut inserted);
                push_equal(&mut ops, &old_chars[old_index..old_index + len]);
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => deleted.extend(&old_chars[old_index..old_index + old_len]),
            DiffOp::Insert {
                new_index, new_len, ..
            } => inserted.extend(&new_chars[new_index..new_index + new_len]),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                deleted.extend(&old_chars[old_index..old_index + old_len]);
                inserted.extend(&new_chars[new_index..new_index + new_len]);
            }
        }
    }
    flush_edits(&mut ops, &mut deleted, &mut inserted);

    ops
}

fn flush_edits(ops: &mut Vec<Op>, deleted: &mut String, inserted: &mut String) {
    if !deleted.is_empty() {
        ops.push(Op::Delete(std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        ops.push(Op::Insert(std::mem::take(inserted)));
    }
}

fn push_equal(ops: &mut Vec<Op>, chars: &[char]) {
    if chars.is_empty() {
        return;
    }
    if let Some(Op::Equal(prev)) = ops.last_mut() {
        prev.extend(chars);
    } else {
        ops.push(Op::Equal(chars.iter().collect()));
    }
}

/// The text the ops were computed from (equal + delete).
pub fn source_text(ops: &[Op]) -> String {
    ops.iter()
        .filter(|op| !matches!(op, Op::Insert(_)))
        .map(Op::text)
        .collect()
}

/// The text the ops produce (equal + insert).
pub fn target_text(ops: &[Op]) -> String {
    ops.iter()
        .filter(|op| !matches!(op, Op::Delete(_)))
        .map(Op::text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_is_single_equal() {
        assert_eq!(diff("same", "same"), vec![Op::Equal("same".into())]);
    }

    #[test]
    fn test_both_empty() {
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn test_pure_insert_and_delete() {
        assert_eq!(diff("", "abc"), vec![Op::Insert("abc".into())]);
        assert_eq!(diff("hello", ""), vec![Op::Delete("hello".into())]);
    }

    #[test]
    fn test_insertion_in_middle() {
        let ops = diff("hello world", "hello wonderful world");
        assert_eq!(source_text(&ops), "hello world");
        assert_eq!(target_text(&ops), "hello wonderful world");
        assert!(ops.iter().any(|op| matches!(op, Op::Insert(_))));
        assert!(!ops.iter().any(|op| matches!(op, Op::Delete(_))));
    }

    #[test]
    fn test_delete_precedes_insert_between_equals() {
        let ops = diff("the cat sat", "the dog sat");
        let kinds: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                Op::Equal(_) => "=",
                Op::Delete(_) => "-",
                Op::Insert(_) => "+",
            })
            .collect();

        for pair in kinds.windows(2) {
            assert_ne!(pair[0], pair[1], "adjacent ops of one kind must merge");
            assert_ne!(pair, ["+", "-"], "delete always precedes insert");
        }
    }

    #[test]
    fn test_multibyte_chars_counted_once() {
        let ops = diff("日本", "日本語");
        assert_eq!(
            ops,
            vec![Op::Equal("日本".into()), Op::Insert("語".into())]
        );
        assert_eq!(ops[0].char_len(), 2);
    }

    proptest! {
        #[test]
        fn ops_reproduce_both_sides(a in "\\PC{0,64}", b in "\\PC{0,64}") {
            let ops = diff(&a, &b);
            prop_assert_eq!(source_text(&ops), a);
            prop_assert_eq!(target_text(&ops), b);
            prop_assert!(ops.iter().all(|op| !op.text().is_empty()));
        }
    }
}
