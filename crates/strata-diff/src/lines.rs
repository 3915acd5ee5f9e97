//! Per-change line interning and the prefix/suffix trim primitives.

use std::collections::HashMap;

/// Dense interning table for the lines of one change.
///
/// Ids are assigned in first-seen order starting at zero and are shared by
/// both sides of the change, so equal lines get equal ids. A table borrows
/// the decoded text it was built from and is dropped with it once the
/// change's diff is done.
#[derive(Debug, Default)]
pub struct LineTable<'a> {
    ids: HashMap<&'a str, u32>,
    lines: Vec<&'a str>,
}

impl<'a> LineTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `line`, assigning the next free one if it is new.
    pub fn intern(&mut self, line: &'a str) -> u32 {
        if let Some(&id) = self.ids.get(line) {
            return id;
        }
        // u32::MAX distinct lines would need more than 4 GiB of text.
        let id = self.lines.len() as u32;
        self.ids.insert(line, id);
        self.lines.push(line);
        id
    }

    /// Intern every line of `text`, keeping `\n` terminators.
    pub fn intern_text(&mut self, text: &'a str) -> Vec<u32> {
        text.split_inclusive('\n').map(|l| self.intern(l)).collect()
    }

    pub fn line(&self, id: u32) -> Option<&'a str> {
        self.lines.get(id as usize).copied()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Length of the common prefix of `a` and `b`.
pub fn common_prefix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the common suffix of `a` and `b`.
pub fn common_suffix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_lines_share_ids_across_sides() {
        let old = "a\nb\nc\n";
        let new = "c\na\nd\n";
        let mut table = LineTable::new();
        let old_ids = table.intern_text(old);
        let new_ids = table.intern_text(new);
        assert_eq!(old_ids, vec![0, 1, 2]);
        assert_eq!(new_ids, vec![2, 0, 3]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.line(3), Some("d\n"));
        assert_eq!(table.line(4), None);
    }

    #[test]
    fn missing_final_newline_is_a_distinct_line() {
        let mut table = LineTable::new();
        let ids = table.intern_text("x\nx");
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(table.line(1), Some("x"));
    }

    #[test]
    fn empty_text_interns_nothing() {
        let mut table = LineTable::new();
        assert!(table.intern_text("").is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn prefix_and_suffix() {
        let a = [1, 2, 3, 4, 5];
        let b = [1, 2, 9, 4, 5];
        assert_eq!(common_prefix_len(&a, &b), 2);
        assert_eq!(common_suffix_len(&a, &b), 2);
        assert_eq!(common_prefix_len(&a, &a), 5);
        assert_eq!(common_suffix_len::<u32>(&[], &[1]), 0);
    }

    #[test]
    fn suffix_after_prefix_does_not_overlap() {
        let a = [7, 7, 7];
        let b = [7, 7];
        let prefix = common_prefix_len(&a, &b);
        assert_eq!(prefix, 2);
        assert_eq!(common_suffix_len(&a[prefix..], &b[prefix..]), 0);
    }
}
