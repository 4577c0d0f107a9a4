//! Position maintainer: gap-free `1..n` sequences per scope.
//!
//! Everything here is pure. A [`ScopeList`] is an in-memory snapshot of one
//! scope's ordered members (index `i` holds position `i + 1`), and every
//! operation mutates the snapshot and returns a [`PositionPlan`]: the
//! minimal set of `(item, old position, new position)` rows that the store
//! adapter must write for the persisted scope to match the snapshot.
//!
//! Because a snapshot can only represent a contiguous sequence, invariant
//! I1 holds after every operation by construction. Loading a snapshot from
//! stored rows ([`ScopeList::from_ranked`]) is where a broken sequence is
//! detected.

use std::collections::{HashMap, HashSet};

use crate::model::ItemId;
use crate::scope::Scope;

/// 1-based ordinal within a scope.
pub type Position = u32;

/// Contiguity and membership failures. Never caused by user input; a
/// `PositionError` reaching the engine aborts the enclosing transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("item {item} is not a member of {scope}")]
    NotInScope { item: ItemId, scope: Scope },

    #[error("item {item} is already a member of {scope}")]
    AlreadyInScope { item: ItemId, scope: Scope },

    #[error("{scope}: expected position {expected}, found {found}")]
    Gap {
        scope: Scope,
        expected: Position,
        found: Position,
    },

    #[error("{scope}: position {position} held by both {first} and {second}")]
    Duplicate {
        scope: Scope,
        position: Position,
        first: ItemId,
        second: ItemId,
    },

    #[error("{scope}: item {item} listed more than once")]
    RepeatedMember { scope: Scope, item: ItemId },
}

// ---------------------------------------------------------------------------
// PositionPlan
// ---------------------------------------------------------------------------

/// One position write. `None` means "not positioned".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub item_id: ItemId,
    pub from: Option<Position>,
    pub to: Option<Position>,
}

/// The rows an operation rewrites, in first-touched order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionPlan {
    updates: Vec<PositionUpdate>,
}

impl PositionPlan {
    #[must_use]
    pub fn from_updates(updates: impl IntoIterator<Item = PositionUpdate>) -> Self {
        Self::default().merge(Self {
            updates: updates.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn updates(&self) -> &[PositionUpdate] {
        &self.updates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    #[must_use]
    pub fn get(&self, item: ItemId) -> Option<&PositionUpdate> {
        self.updates.iter().find(|update| update.item_id == item)
    }

    /// Sequence `next` after `self`. An item touched by both keeps its
    /// original `from` and takes the final `to`.
    #[must_use]
    pub fn merge(mut self, next: Self) -> Self {
        let mut index: HashMap<ItemId, usize> = self
            .updates
            .iter()
            .enumerate()
            .map(|(i, update)| (update.item_id, i))
            .collect();

        for update in next.updates {
            if let Some(&i) = index.get(&update.item_id) {
                self.updates[i].to = update.to;
            } else {
                index.insert(update.item_id, self.updates.len());
                self.updates.push(update);
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// ScopeList
// ---------------------------------------------------------------------------

fn slot(index: usize) -> Position {
    Position::try_from(index + 1).unwrap_or(Position::MAX)
}

/// Ordered members of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeList {
    scope: Scope,
    members: Vec<ItemId>,
}

impl ScopeList {
    #[must_use]
    pub const fn empty(scope: Scope) -> Self {
        Self {
            scope,
            members: Vec::new(),
        }
    }

    /// Build a snapshot from stored `(item, position)` rows, verifying that
    /// the positions are exactly `1..n`.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::Gap`] or [`PositionError::Duplicate`] when
    /// the stored sequence is not contiguous, and
    /// [`PositionError::RepeatedMember`] when an item appears twice.
    pub fn from_ranked(
        scope: Scope,
        rows: impl IntoIterator<Item = (ItemId, Position)>,
    ) -> Result<Self, PositionError> {
        let mut rows: Vec<(ItemId, Position)> = rows.into_iter().collect();
        rows.sort_by_key(|&(item, position)| (position, item));

        let mut seen = HashSet::with_capacity(rows.len());
        let mut members = Vec::with_capacity(rows.len());
        for (index, &(item, position)) in rows.iter().enumerate() {
            if !seen.insert(item) {
                return Err(PositionError::RepeatedMember { scope, item });
            }
            let expected = slot(index);
            if position != expected {
                if index > 0 && rows[index - 1].1 == position {
                    return Err(PositionError::Duplicate {
                        scope,
                        position,
                        first: rows[index - 1].0,
                        second: item,
                    });
                }
                return Err(PositionError::Gap {
                    scope,
                    expected,
                    found: position,
                });
            }
            members.push(item);
        }

        Ok(Self { scope, members })
    }

    /// Re-sequence possibly broken rows: order by stored position (unpositioned
    /// rows last), ties and unpositioned rows by id, then number `1..n`.
    ///
    /// Returns the repaired snapshot and the writes needed to reach it.
    #[must_use]
    pub fn repaired(
        scope: Scope,
        rows: impl IntoIterator<Item = (ItemId, Option<Position>)>,
    ) -> (Self, PositionPlan) {
        let mut rows: Vec<(ItemId, Option<Position>)> = rows.into_iter().collect();
        rows.sort_by_key(|&(item, position)| (position.is_none(), position, item));
        rows.dedup_by_key(|row| row.0);

        let updates = rows
            .iter()
            .enumerate()
            .filter(|&(index, &(_, stored))| stored != Some(slot(index)))
            .map(|(index, &(item_id, stored))| PositionUpdate {
                item_id,
                from: stored,
                to: Some(slot(index)),
            })
            .collect::<Vec<_>>();

        let list = Self {
            scope,
            members: rows.into_iter().map(|(item, _)| item).collect(),
        };
        (list, PositionPlan { updates })
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn members(&self) -> &[ItemId] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: ItemId) -> bool {
        self.members.contains(&item)
    }

    #[must_use]
    pub fn position_of(&self, item: ItemId) -> Option<Position> {
        self.index_of(item).map(slot)
    }

    /// `(item, position)` pairs in order.
    pub fn ranked(&self) -> impl Iterator<Item = (ItemId, Position)> + '_ {
        self.members
            .iter()
            .enumerate()
            .map(|(index, &item)| (item, slot(index)))
    }

    fn index_of(&self, item: ItemId) -> Option<usize> {
        self.members.iter().position(|&member| member == item)
    }

    fn require_index(&self, item: ItemId) -> Result<usize, PositionError> {
        self.index_of(item).ok_or(PositionError::NotInScope {
            item,
            scope: self.scope,
        })
    }

    /// Rows whose position differs between `before` and the current members.
    fn diff(&self, before: &[ItemId]) -> PositionPlan {
        let old: HashMap<ItemId, Position> = before
            .iter()
            .enumerate()
            .map(|(index, &item)| (item, slot(index)))
            .collect();

        let mut updates: Vec<PositionUpdate> = before
            .iter()
            .filter(|item| !self.members.contains(item))
            .map(|&item_id| PositionUpdate {
                item_id,
                from: old.get(&item_id).copied(),
                to: None,
            })
            .collect();

        for (item_id, position) in self.ranked() {
            let from = old.get(&item_id).copied();
            if from != Some(position) {
                updates.push(PositionUpdate {
                    item_id,
                    from,
                    to: Some(position),
                });
            }
        }
        PositionPlan { updates }
    }

    /// Assign `max + 1` (or `1` in an empty scope). No other item moves.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::AlreadyInScope`] if `item` is a member.
    pub fn append_bottom(&mut self, item: ItemId) -> Result<PositionPlan, PositionError> {
        if self.contains(item) {
            return Err(PositionError::AlreadyInScope {
                item,
                scope: self.scope,
            });
        }
        self.members.push(item);
        Ok(PositionPlan {
            updates: vec![PositionUpdate {
                item_id: item,
                from: None,
                to: Some(slot(self.members.len() - 1)),
            }],
        })
    }

    /// Clear `item`'s position and shift every later item up by one.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::NotInScope`] if `item` is not a member.
    pub fn remove(&mut self, item: ItemId) -> Result<PositionPlan, PositionError> {
        let index = self.require_index(item)?;
        let before = self.members.clone();
        self.members.remove(index);
        Ok(self.diff(&before))
    }

    /// Move `item` to `new_position` (clamped to `[1, n]`). Items between the
    /// old and new slot shift by one toward the vacated slot; all others keep
    /// their positions.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::NotInScope`] if `item` is not a member.
    pub fn move_within(
        &mut self,
        item: ItemId,
        new_position: Position,
    ) -> Result<PositionPlan, PositionError> {
        let index = self.require_index(item)?;
        let last = self.members.len() - 1;
        let target = usize::try_from(new_position.max(1) - 1)
            .unwrap_or(last)
            .min(last);
        if target == index {
            return Ok(PositionPlan::default());
        }

        let before = self.members.clone();
        let moved = self.members.remove(index);
        self.members.insert(target, moved);
        Ok(self.diff(&before))
    }

    /// Move `item` directly after `predecessor`, or to the top when there is
    /// none.
    ///
    /// The predecessor's slot is read with `item` taken out of the sequence,
    /// so `predecessor.position + 1` always lands `item` right below it no
    /// matter which direction it travels.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::NotInScope`] if either item is not a member.
    pub fn place_after(
        &mut self,
        item: ItemId,
        predecessor: Option<ItemId>,
    ) -> Result<PositionPlan, PositionError> {
        let index = self.require_index(item)?;
        let target = match predecessor {
            None => 1,
            Some(pred) => {
                let pred_index = self.require_index(pred)?;
                let pred_position = if pred_index > index {
                    slot(pred_index - 1)
                } else {
                    slot(pred_index)
                };
                pred_position + 1
            }
        };
        self.move_within(item, target)
    }
}

/// Move `item` from one scope to another: remove it from `from` (closing the
/// gap), then append it to `to` and, when `target` is given, move it there.
///
/// # Errors
///
/// Returns [`PositionError::NotInScope`] if `item` is not in `from`, or
/// [`PositionError::AlreadyInScope`] if it is already in `to`.
pub fn transfer(
    from: &mut ScopeList,
    to: &mut ScopeList,
    item: ItemId,
    target: Option<Position>,
) -> Result<PositionPlan, PositionError> {
    if to.contains(item) {
        return Err(PositionError::AlreadyInScope {
            item,
            scope: to.scope(),
        });
    }
    let mut plan = from.remove(item)?.merge(to.append_bottom(item)?);
    if let Some(position) = target {
        plan = plan.merge(to.move_within(item, position)?);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectId, SprintId};

    fn scope(sprint: i64) -> Scope {
        Scope::sprint(ProjectId::new(1), SprintId::new(sprint))
    }

    fn ids(raw: &[i64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId::new).collect()
    }

    fn list(sprint: i64, raw: &[i64]) -> ScopeList {
        ScopeList::from_ranked(
            scope(sprint),
            ids(raw).into_iter().enumerate().map(|(i, id)| (id, slot(i))),
        )
        .unwrap()
    }

    fn order(list: &ScopeList) -> Vec<i64> {
        list.members().iter().map(|id| id.get()).collect()
    }

    fn moved(plan: &PositionPlan) -> Vec<(i64, Option<Position>, Option<Position>)> {
        plan.updates()
            .iter()
            .map(|u| (u.item_id.get(), u.from, u.to))
            .collect()
    }

    #[test]
    fn from_ranked_accepts_unsorted_contiguous_rows() {
        let rows = [
            (ItemId::new(3), 3),
            (ItemId::new(1), 1),
            (ItemId::new(2), 2),
        ];
        let list = ScopeList::from_ranked(scope(1), rows).unwrap();
        assert_eq!(order(&list), vec![1, 2, 3]);
    }

    #[test]
    fn from_ranked_detects_gap() {
        let rows = [(ItemId::new(1), 1), (ItemId::new(2), 3)];
        let err = ScopeList::from_ranked(scope(1), rows).unwrap_err();
        assert_eq!(
            err,
            PositionError::Gap {
                scope: scope(1),
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn from_ranked_detects_duplicate() {
        let rows = [(ItemId::new(1), 1), (ItemId::new(2), 1)];
        let err = ScopeList::from_ranked(scope(1), rows).unwrap_err();
        assert!(matches!(err, PositionError::Duplicate { position: 1, .. }));
    }

    #[test]
    fn from_ranked_detects_zero_based_sequence() {
        let rows = [(ItemId::new(1), 0), (ItemId::new(2), 1)];
        let err = ScopeList::from_ranked(scope(1), rows).unwrap_err();
        assert!(matches!(err, PositionError::Gap { expected: 1, found: 0, .. }));
    }

    #[test]
    fn append_bottom_touches_only_new_item() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        let plan = list.append_bottom(ItemId::new(6)).unwrap();
        assert_eq!(moved(&plan), vec![(6, None, Some(6))]);
        assert_eq!(list.position_of(ItemId::new(6)), Some(6));
    }

    #[test]
    fn append_bottom_in_empty_scope_is_one() {
        let mut list = ScopeList::empty(scope(1));
        let plan = list.append_bottom(ItemId::new(9)).unwrap();
        assert_eq!(moved(&plan), vec![(9, None, Some(1))]);
    }

    #[test]
    fn append_rejects_existing_member() {
        let mut list = list(1, &[1, 2]);
        assert!(matches!(
            list.append_bottom(ItemId::new(2)),
            Err(PositionError::AlreadyInScope { .. })
        ));
    }

    #[test]
    fn remove_closes_gap_below_only() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        let plan = list.remove(ItemId::new(3)).unwrap();
        assert_eq!(
            moved(&plan),
            vec![(3, Some(3), None), (4, Some(4), Some(3)), (5, Some(5), Some(4))]
        );
        assert_eq!(order(&list), vec![1, 2, 4, 5]);
    }

    #[test]
    fn remove_last_item_touches_nothing_else() {
        let mut list = list(1, &[1, 2, 3]);
        let plan = list.remove(ItemId::new(3)).unwrap();
        assert_eq!(moved(&plan), vec![(3, Some(3), None)]);
    }

    #[test]
    fn move_within_up_shifts_range_down() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        let plan = list.move_within(ItemId::new(4), 2).unwrap();
        assert_eq!(order(&list), vec![1, 4, 2, 3, 5]);
        assert_eq!(
            moved(&plan),
            vec![(4, Some(4), Some(2)), (2, Some(2), Some(3)), (3, Some(3), Some(4))]
        );
    }

    #[test]
    fn move_within_down_shifts_range_up() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        list.move_within(ItemId::new(2), 4).unwrap();
        assert_eq!(order(&list), vec![1, 3, 4, 2, 5]);
    }

    #[test]
    fn move_within_clamps_out_of_range_targets() {
        let mut list = list(1, &[1, 2, 3]);
        list.move_within(ItemId::new(1), 99).unwrap();
        assert_eq!(order(&list), vec![2, 3, 1]);
        list.move_within(ItemId::new(1), 0).unwrap();
        assert_eq!(order(&list), vec![1, 2, 3]);
    }

    #[test]
    fn move_within_to_same_slot_is_empty_plan() {
        let mut list = list(1, &[1, 2, 3]);
        assert!(list.move_within(ItemId::new(2), 2).unwrap().is_empty());
    }

    #[test]
    fn place_after_predecessor_below_matches_client_order() {
        // A B C D E, drop C after D -> A B D C E
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        let plan = list.place_after(ItemId::new(3), Some(ItemId::new(4))).unwrap();
        assert_eq!(order(&list), vec![1, 2, 4, 3, 5]);
        assert_eq!(moved(&plan), vec![(4, Some(4), Some(3)), (3, Some(3), Some(4))]);
    }

    #[test]
    fn place_after_predecessor_above() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        list.place_after(ItemId::new(5), Some(ItemId::new(1))).unwrap();
        assert_eq!(order(&list), vec![1, 5, 2, 3, 4]);
    }

    #[test]
    fn place_after_nothing_moves_to_top() {
        let mut list = list(1, &[1, 2, 3, 4, 5]);
        list.place_after(ItemId::new(5), None).unwrap();
        assert_eq!(order(&list), vec![5, 1, 2, 3, 4]);
    }

    #[test]
    fn transfer_closes_source_and_appends_target() {
        let mut s1 = list(1, &[1, 2, 3, 4, 5]);
        let mut s2 = list(2, &[6, 7, 8]);
        let plan = transfer(&mut s1, &mut s2, ItemId::new(2), None).unwrap();

        assert_eq!(order(&s1), vec![1, 3, 4, 5]);
        assert_eq!(order(&s2), vec![6, 7, 8, 2]);
        assert_eq!(plan.get(ItemId::new(2)).unwrap().from, Some(2));
        assert_eq!(plan.get(ItemId::new(2)).unwrap().to, Some(4));
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn transfer_with_target_position() {
        let mut s1 = list(1, &[1, 2]);
        let mut s2 = list(2, &[6, 7, 8]);
        transfer(&mut s1, &mut s2, ItemId::new(1), Some(1)).unwrap();
        assert_eq!(order(&s2), vec![1, 6, 7, 8]);
        assert_eq!(order(&s1), vec![2]);
    }

    #[test]
    fn repaired_orders_by_position_then_id_with_nulls_last() {
        let rows = [
            (ItemId::new(5), None),
            (ItemId::new(2), Some(7)),
            (ItemId::new(3), Some(2)),
            (ItemId::new(4), None),
            (ItemId::new(1), Some(2)),
        ];
        let (list, plan) = ScopeList::repaired(scope(1), rows);
        assert_eq!(order(&list), vec![1, 3, 2, 4, 5]);
        assert_eq!(
            moved(&plan),
            vec![
                (1, Some(2), Some(1)),
                (3, Some(2), Some(2)),
                (2, Some(7), Some(3)),
                (4, None, Some(4)),
                (5, None, Some(5)),
            ]
            .into_iter()
            .filter(|(_, from, to)| from != to)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn merge_keeps_first_from_and_last_to() {
        let a = PositionPlan::from_updates([PositionUpdate {
            item_id: ItemId::new(1),
            from: Some(3),
            to: None,
        }]);
        let b = PositionPlan::from_updates([PositionUpdate {
            item_id: ItemId::new(1),
            from: None,
            to: Some(1),
        }]);
        let merged = a.merge(b);
        assert_eq!(moved(&merged), vec![(1, Some(3), Some(1))]);
    }
}
