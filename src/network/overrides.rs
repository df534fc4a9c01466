use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::network::topology::checked_cost;
use crate::network::{Direction, LinkStatus, Snapshot};

/// A what-if edit to one link, addressed by its stable index.
///
/// Each field only replaces itself: changing the forward cost leaves the
/// reverse cost untouched. Costs are signed so that a bad value in an
/// override file is reported against its link when the edit is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEdit {
    pub stable_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
}

impl LinkEdit {
    pub fn new(stable_index: usize) -> Self {
        Self {
            stable_index,
            ..Self::default()
        }
    }

    pub fn forward_cost(mut self, cost: u32) -> Self {
        self.forward_cost = Some(i64::from(cost));
        self
    }

    pub fn reverse_cost(mut self, cost: u32) -> Self {
        self.reverse_cost = Some(i64::from(cost));
        self
    }

    pub fn status(mut self, status: LinkStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Override file shape: `{ "edits": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideSet {
    #[serde(default)]
    pub edits: Vec<LinkEdit>,
}

impl OverrideSet {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

impl Snapshot {
    /// Returns a new snapshot with `edits` applied. Later edits to the same
    /// link win. The result is validated like any other snapshot.
    pub fn apply_edits(&self, edits: &[LinkEdit]) -> Result<Snapshot, TopologyError> {
        let mut links = self.links().to_vec();

        for edit in edits {
            let link = links
                .iter_mut()
                .find(|l| l.stable_index == edit.stable_index)
                .ok_or(TopologyError::UnknownLink(edit.stable_index))?;

            if let Some(value) = edit.forward_cost {
                link.forward_cost = checked_cost(value, edit.stable_index, Direction::Forward)?;
            }
            if let Some(value) = edit.reverse_cost {
                link.reverse_cost = checked_cost(value, edit.stable_index, Direction::Reverse)?;
            }
            if let Some(status) = edit.status {
                link.status = status;
            }
            debug!("Applied edit to link #{}", edit.stable_index);
        }

        self.with_links(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Link, Node};

    fn snapshot() -> Snapshot {
        Snapshot::new(
            vec![Node::new("A", "x"), Node::new("B", "y")],
            vec![Link::new(0, "A", "B", 10, 20)],
        )
        .unwrap()
    }

    #[test]
    fn test_forward_edit_leaves_reverse_alone() {
        let before = snapshot();
        let after = before.apply_edits(&[LinkEdit::new(0).forward_cost(99)]).unwrap();

        let link = after.link(0).unwrap();
        assert_eq!(link.forward_cost, 99);
        assert_eq!(link.reverse_cost, 20);
        // original untouched
        assert_eq!(before.link(0).unwrap().forward_cost, 10);
    }

    #[test]
    fn test_status_edit() {
        let after = snapshot()
            .apply_edits(&[LinkEdit::new(0).status(LinkStatus::Down)])
            .unwrap();
        assert!(!after.link(0).unwrap().is_up());
    }

    #[test]
    fn test_unknown_link_is_rejected() {
        let err = snapshot().apply_edits(&[LinkEdit::new(9).forward_cost(1)]).unwrap_err();
        assert_eq!(err, TopologyError::UnknownLink(9));
    }

    #[test]
    fn test_zero_cost_edit_is_rejected() {
        let err = snapshot().apply_edits(&[LinkEdit::new(0).reverse_cost(0)]).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidCost { direction: Direction::Reverse, .. }
        ));
    }

    #[test]
    fn test_negative_cost_in_override_file_names_the_link() {
        let set = OverrideSet::from_json(r#"{"edits": [{"stable_index": 0, "forward_cost": -5}]}"#).unwrap();
        let err = snapshot().apply_edits(&set.edits).unwrap_err();
        assert_eq!(
            err,
            TopologyError::InvalidCost {
                stable_index: 0,
                direction: Direction::Forward,
                value: -5
            }
        );
    }

    #[test]
    fn test_oversized_cost_edit_is_rejected() {
        let edit = LinkEdit {
            reverse_cost: Some(i64::from(u32::MAX) + 1),
            ..LinkEdit::new(0)
        };
        let err = snapshot().apply_edits(&[edit]).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidCost { stable_index: 0, direction: Direction::Reverse, .. }
        ));
    }

    #[test]
    fn test_override_file_shape() {
        let set = OverrideSet::from_json(
            r#"{"edits": [{"stable_index": 0, "status": "down"}, {"stable_index": 0, "forward_cost": 5}]}"#,
        )
        .unwrap();
        assert_eq!(set.edits.len(), 2);
        assert_eq!(set.edits[0].status, Some(LinkStatus::Down));
        assert_eq!(set.edits[1].forward_cost, Some(5));
        assert_eq!(set.edits[1].reverse_cost, None);
    }
}
