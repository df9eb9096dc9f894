//! Eisenhower matrix: outlines grouped by importance and urgency.
//!
//! # Invariants
//! - An outline is urgent (important) when its urgency (importance) is above
//!   half of the configured maximum.
//! - Outlines with neither flag and no importance at all are left out.
//! - Within a quadrant, rows keep the order of the underlying outlines table.

use crate::config::TieBreak;
use crate::model::ValidationLimits;
use crate::projection::{project_outlines, OutlineRow, SortField};
use crate::repo::RepositoryState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Urgent and important.
    DoFirst,
    /// Urgent, not important.
    DoSoon,
    /// Important, not urgent.
    PlanDedicatedTime,
    /// Neither, but with some importance.
    DoSometime,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::DoFirst,
        Quadrant::DoSoon,
        Quadrant::PlanDedicatedTime,
        Quadrant::DoSometime,
    ];

    pub fn classify(importance: u8, urgency: u8, limits: &ValidationLimits) -> Option<Self> {
        let important = importance > limits.max_importance / 2;
        let urgent = urgency > limits.max_urgency / 2;
        match (urgent, important) {
            (true, true) => Some(Self::DoFirst),
            (true, false) => Some(Self::DoSoon),
            (false, true) => Some(Self::PlanDedicatedTime),
            (false, false) if importance > 0 => Some(Self::DoSometime),
            (false, false) => None,
        }
    }
}

/// Descending key used inside every quadrant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSort {
    #[default]
    Importance,
    Urgency,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EisenhowerMatrix {
    pub do_first: Vec<OutlineRow>,
    pub do_soon: Vec<OutlineRow>,
    pub plan_dedicated_time: Vec<OutlineRow>,
    pub do_sometime: Vec<OutlineRow>,
}

impl EisenhowerMatrix {
    pub fn quadrant(&self, quadrant: Quadrant) -> &[OutlineRow] {
        match quadrant {
            Quadrant::DoFirst => &self.do_first,
            Quadrant::DoSoon => &self.do_soon,
            Quadrant::PlanDedicatedTime => &self.plan_dedicated_time,
            Quadrant::DoSometime => &self.do_sometime,
        }
    }

    /// Number of outlines placed in any quadrant.
    pub fn len(&self) -> usize {
        Quadrant::ALL
            .iter()
            .map(|quadrant| self.quadrant(*quadrant).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn quadrant_mut(&mut self, quadrant: Quadrant) -> &mut Vec<OutlineRow> {
        match quadrant {
            Quadrant::DoFirst => &mut self.do_first,
            Quadrant::DoSoon => &mut self.do_soon,
            Quadrant::PlanDedicatedTime => &mut self.plan_dedicated_time,
            Quadrant::DoSometime => &mut self.do_sometime,
        }
    }
}

/// Sorts every outline by `sort_by` descending and deals the rows into
/// their quadrants.
pub fn eisenhower(
    state: &RepositoryState,
    sort_by: MatrixSort,
    limits: &ValidationLimits,
    tie_break: TieBreak,
) -> EisenhowerMatrix {
    let field = match sort_by {
        MatrixSort::Importance => SortField::Importance,
        MatrixSort::Urgency => SortField::Urgency,
    };
    let mut matrix = EisenhowerMatrix::default();
    for row in project_outlines(state, field, false, tie_break) {
        if let Some(quadrant) = Quadrant::classify(row.importance, row.urgency, limits) {
            matrix.quadrant_mut(quadrant).push(row);
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::{eisenhower, MatrixSort, Quadrant};
    use crate::config::TieBreak;
    use crate::model::{OutlineDraft, OutlineId, ValidationLimits};
    use crate::repo::RepositoryState;

    fn outline(state: &mut RepositoryState, importance: u8, urgency: u8) -> OutlineId {
        state
            .create_outline(
                OutlineDraft::new("o")
                    .with_importance(importance)
                    .with_urgency(urgency),
                &ValidationLimits::default(),
                1,
            )
            .expect("outline should be created")
            .0
    }

    #[test]
    fn classification_splits_the_scale_in_half() {
        let limits = ValidationLimits::default();
        assert_eq!(Quadrant::classify(3, 3, &limits), Some(Quadrant::DoFirst));
        assert_eq!(Quadrant::classify(2, 5, &limits), Some(Quadrant::DoSoon));
        assert_eq!(
            Quadrant::classify(4, 2, &limits),
            Some(Quadrant::PlanDedicatedTime)
        );
        assert_eq!(Quadrant::classify(1, 0, &limits), Some(Quadrant::DoSometime));
        assert_eq!(Quadrant::classify(0, 2, &limits), None);
    }

    #[test]
    fn quadrants_follow_the_requested_sort() {
        let mut state = RepositoryState::new();
        let calm = outline(&mut state, 4, 3);
        let pressing = outline(&mut state, 3, 5);
        let soon = outline(&mut state, 1, 4);
        outline(&mut state, 0, 0);

        let limits = ValidationLimits::default();
        let by_importance = eisenhower(
            &state,
            MatrixSort::Importance,
            &limits,
            TieBreak::IdAscending,
        );
        let ids: Vec<OutlineId> = by_importance.do_first.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![calm, pressing]);
        assert_eq!(by_importance.do_soon[0].id, soon);
        assert_eq!(by_importance.len(), 3);

        let by_urgency = eisenhower(&state, MatrixSort::Urgency, &limits, TieBreak::IdAscending);
        let ids: Vec<OutlineId> = by_urgency
            .quadrant(Quadrant::DoFirst)
            .iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![pressing, calm]);
    }
}
