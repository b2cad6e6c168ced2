use super::{ListEditQual, Path, Payload, Reference};

/// A composable list edit with six item buckets and an "is explicit" flag.
///
/// The wire format stores a header byte describing which buckets follow;
/// see [crate::usdc] for the encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOp<T> {
    /// When set, the op resets the list to `explicit_items`.
    pub explicit: bool,

    pub explicit_items: Vec<T>,
    pub added_items: Vec<T>,
    pub prepended_items: Vec<T>,
    pub appended_items: Vec<T>,
    pub deleted_items: Vec<T>,
    pub ordered_items: Vec<T>,
}

pub type TokenListOp = ListOp<String>;
pub type StringListOp = ListOp<String>;
pub type PathListOp = ListOp<Path>;
pub type ReferenceListOp = ListOp<Reference>;
pub type PayloadListOp = ListOp<Payload>;
pub type IntListOp = ListOp<i32>;
pub type Int64ListOp = ListOp<i64>;
pub type UintListOp = ListOp<u32>;
pub type Uint64ListOp = ListOp<u64>;

impl<T> Default for ListOp<T> {
    fn default() -> Self {
        ListOp {
            explicit: false,
            explicit_items: Vec::new(),
            added_items: Vec::new(),
            prepended_items: Vec::new(),
            appended_items: Vec::new(),
            deleted_items: Vec::new(),
            ordered_items: Vec::new(),
        }
    }
}

impl<T> ListOp<T> {
    /// Make an explicit list op from items alone.
    pub fn explicit(items: Vec<T>) -> Self {
        ListOp {
            explicit: true,
            explicit_items: items,
            ..Default::default()
        }
    }

    /// True when every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.explicit_items.is_empty()
            && self.added_items.is_empty()
            && self.prepended_items.is_empty()
            && self.appended_items.is_empty()
            && self.deleted_items.is_empty()
            && self.ordered_items.is_empty()
    }

    /// Flatten into `(qualifier, items)` pairs, one per non-empty bucket.
    ///
    /// An explicit op short-circuits to a single `ResetToExplicit` pair.
    /// Otherwise buckets are reported in the order: explicit, add, append,
    /// delete, prepend, order.
    pub fn decode(&self) -> Vec<(ListEditQual, &[T])> {
        if self.explicit {
            return vec![(ListEditQual::ResetToExplicit, self.explicit_items.as_slice())];
        }

        let buckets = [
            (ListEditQual::ResetToExplicit, &self.explicit_items),
            (ListEditQual::Add, &self.added_items),
            (ListEditQual::Append, &self.appended_items),
            (ListEditQual::Delete, &self.deleted_items),
            (ListEditQual::Prepend, &self.prepended_items),
            (ListEditQual::Order, &self.ordered_items),
        ];

        buckets
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(qual, items)| (qual, items.as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_explicit() {
        let op = TokenListOp::explicit(vec!["a".to_string(), "b".to_string()]);

        let decoded = op.decode();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, ListEditQual::ResetToExplicit);
        assert_eq!(decoded[0].1, ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn decode_explicit_flag_wins() {
        // The explicit flag short-circuits even with other buckets filled.
        let op = ListOp::<i32> {
            explicit: true,
            explicit_items: vec![1],
            appended_items: vec![2],
            ..Default::default()
        };

        let decoded = op.decode();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], (ListEditQual::ResetToExplicit, [1].as_slice()));
    }

    #[test]
    fn decode_bucket_order() {
        let op = ListOp::<i32> {
            prepended_items: vec![1],
            appended_items: vec![2],
            deleted_items: vec![3],
            ..Default::default()
        };

        let quals: Vec<_> = op.decode().into_iter().map(|(q, _)| q).collect();
        assert_eq!(
            quals,
            vec![ListEditQual::Append, ListEditQual::Delete, ListEditQual::Prepend]
        );
    }

    #[test]
    fn empty_op() {
        let op = PathListOp::default();
        assert!(op.is_empty());
        assert!(op.decode().is_empty());
    }
}
