//! Ordered-list relocation shared by sibling reordering and cross-parent moves.
//!
//! These functions know nothing about node kinds. Requested positions are
//! clamped to the destination list; `None` appends.

/// Insert `element` at `requested`, clamped to `list.len()`. Returns the
/// index actually used.
pub fn insert_clamped<T>(list: &mut Vec<T>, element: T, requested: Option<usize>) -> usize {
    let index = match requested {
        Some(i) => i.min(list.len()),
        None => list.len(),
    };
    list.insert(index, element);
    index
}

/// Move `element` out of `source` (no-op if absent) and into `destination`.
/// Returns the applied index in `destination`.
pub fn move_between<T: PartialEq>(
    source: &mut Vec<T>,
    destination: &mut Vec<T>,
    element: T,
    requested: Option<usize>,
) -> usize {
    if let Some(pos) = source.iter().position(|e| *e == element) {
        source.remove(pos);
    }
    insert_clamped(destination, element, requested)
}

/// Reorder `element` within a single list. Removal happens before clamping,
/// so `requested` is relative to the list without the element.
pub fn reorder<T: PartialEq>(list: &mut Vec<T>, element: T, requested: Option<usize>) -> usize {
    if let Some(pos) = list.iter().position(|e| *e == element) {
        list.remove(pos);
    }
    insert_clamped(list, element, requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_between_lists_inserts_at_index() {
        let mut a = vec!['x', 'y', 'z'];
        let mut b = vec!['p', 'q'];
        let idx = move_between(&mut a, &mut b, 'y', Some(1));
        assert_eq!(idx, 1);
        assert_eq!(a, vec!['x', 'z']);
        assert_eq!(b, vec!['p', 'y', 'q']);
    }

    #[test]
    fn out_of_range_index_clamps_to_end() {
        let mut a = vec![1, 2];
        let mut b = vec![10, 20];
        let idx = move_between(&mut a, &mut b, 1, Some(99));
        assert_eq!(idx, 2);
        assert_eq!(b, vec![10, 20, 1]);
    }

    #[test]
    fn none_appends() {
        let mut a = vec![1];
        let mut b = vec![10, 20, 30];
        let idx = move_between(&mut a, &mut b, 1, None);
        assert_eq!(idx, 3);
        assert!(a.is_empty());
        assert_eq!(b.last(), Some(&1));
    }

    #[test]
    fn element_missing_from_source_is_still_inserted() {
        let mut a: Vec<u8> = vec![];
        let mut b = vec![5];
        let idx = move_between(&mut a, &mut b, 7, Some(0));
        assert_eq!(idx, 0);
        assert_eq!(b, vec![7, 5]);
    }

    #[test]
    fn reorder_removes_before_clamping() {
        // Moving the first of three to index 2 lands at the end of the
        // two-element list left after removal
        let mut list = vec!['a', 'b', 'c'];
        let idx = reorder(&mut list, 'a', Some(2));
        assert_eq!(idx, 2);
        assert_eq!(list, vec!['b', 'c', 'a']);

        let mut list = vec!['a', 'b', 'c'];
        let idx = reorder(&mut list, 'a', Some(3));
        assert_eq!(idx, 2);
        assert_eq!(list, vec!['b', 'c', 'a']);
    }

    #[test]
    fn reorder_to_same_position_keeps_structure() {
        let mut list = vec![1, 2, 3];
        let idx = reorder(&mut list, 2, Some(1));
        assert_eq!(idx, 1);
        assert_eq!(list, vec![1, 2, 3]);

        let idx = reorder(&mut list, 3, Some(50));
        assert_eq!(idx, 2);
        assert_eq!(list, vec![1, 2, 3]);
    }

    #[test]
    fn reorder_to_front() {
        let mut list = vec![1, 2, 3];
        let idx = reorder(&mut list, 3, Some(0));
        assert_eq!(idx, 0);
        assert_eq!(list, vec![3, 1, 2]);
    }
}
