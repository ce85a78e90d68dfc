//! crates/buildestimate_core/src/floors.rs
//!
//! Keeps the per-floor configuration list in step with the floor count.

use crate::domain::{ConstructionDetails, FloorConfig, KitchenType, MAX_FLOORS};
use crate::error::{DomainError, DomainResult};

/// Produces the floor list for `floors` floors.
///
/// Entries are matched by `floor_number`, not by position: a configured floor
/// is carried over untouched, a missing one gets `FloorConfig::default_for`,
/// and anything above `floors` is dropped. The result is ordered 1..=floors.
pub fn reconcile(configs: &[FloorConfig], floors: u32) -> Vec<FloorConfig> {
    (1..=floors)
        .map(|n| {
            configs
                .iter()
                .find(|f| f.floor_number == n)
                .cloned()
                .unwrap_or_else(|| FloorConfig::default_for(n))
        })
        .collect()
}

/// A partial edit of one floor's layout.
#[derive(Debug, Clone, Default)]
pub struct FloorEdit {
    pub rooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub kitchen_type: Option<KitchenType>,
}

impl ConstructionDetails {
    /// Changes the floor count and reconciles the floor list.
    ///
    /// Returns `Ok(false)` without touching anything when the count is
    /// unchanged, so in-progress floor edits survive.
    pub fn set_floors(&mut self, floors: u32) -> DomainResult<bool> {
        if floors == 0 || floors > MAX_FLOORS {
            return Err(DomainError::Validation(format!(
                "floors must be between 1 and {}",
                MAX_FLOORS
            )));
        }
        if floors == self.floors {
            return Ok(false);
        }
        self.floor_configs = reconcile(&self.floor_configs, floors);
        self.floors = floors;
        Ok(true)
    }

    pub fn update_floor(&mut self, floor_number: u32, edit: FloorEdit) -> DomainResult<()> {
        let floor = self
            .floor_configs
            .iter_mut()
            .find(|f| f.floor_number == floor_number)
            .ok_or_else(|| {
                DomainError::Validation(format!("floor {} is not part of this build", floor_number))
            })?;
        if let Some(rooms) = edit.rooms {
            floor.rooms = rooms;
        }
        if let Some(bathrooms) = edit.bathrooms {
            floor.bathrooms = bathrooms;
        }
        if let Some(kitchen_type) = edit.kitchen_type {
            floor.kitchen_type = kitchen_type;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(n: u32, rooms: u32) -> FloorConfig {
        FloorConfig {
            floor_number: n,
            rooms,
            bathrooms: 3,
            kitchen_type: KitchenType::WithChimney,
        }
    }

    fn numbers(configs: &[FloorConfig]) -> Vec<u32> {
        configs.iter().map(|f| f.floor_number).collect()
    }

    #[test]
    fn reconcile_is_idempotent() {
        let prior = vec![floor(1, 4), floor(3, 6)];
        for n in 1..=5 {
            let once = reconcile(&prior, n);
            assert_eq!(reconcile(&once, n), once, "n = {}", n);
        }
    }

    #[test]
    fn reconcile_keeps_existing_entries_by_floor_number() {
        // Positional order differs from floor order on purpose.
        let prior = vec![floor(2, 5), floor(1, 4)];
        let result = reconcile(&prior, 3);
        assert_eq!(result[0], floor(1, 4));
        assert_eq!(result[1], floor(2, 5));
        assert_eq!(result[2], FloorConfig::default_for(3));
    }

    #[test]
    fn reconcile_yields_exactly_one_to_n() {
        let prior = vec![floor(1, 1), floor(1, 9), floor(7, 2)];
        for n in 1..=5 {
            let result = reconcile(&prior, n);
            assert_eq!(numbers(&result), (1..=n).collect::<Vec<_>>());
        }
        // Duplicates resolve to the first entry.
        assert_eq!(reconcile(&prior, 1)[0].rooms, 1);
    }

    #[test]
    fn shrinking_truncates_without_reordering() {
        let prior = vec![floor(1, 4), floor(2, 5), floor(3, 6)];
        assert_eq!(reconcile(&prior, 2), vec![floor(1, 4), floor(2, 5)]);
    }

    #[test]
    fn growing_appends_defaults_in_order() {
        let prior = vec![floor(1, 4)];
        let result = reconcile(&prior, 3);
        assert_eq!(result[0], floor(1, 4));
        assert_eq!(numbers(&result[1..]), vec![2, 3]);
        assert!(result[1..].iter().all(|f| f.rooms == 2
            && f.bathrooms == 1
            && f.kitchen_type == KitchenType::WithoutChimney));
    }

    #[test]
    fn unchanged_floor_count_does_not_mutate() {
        let mut details = ConstructionDetails::default();
        details
            .update_floor(1, FloorEdit { rooms: Some(7), ..FloorEdit::default() })
            .unwrap();
        let before = details.clone();
        assert!(!details.set_floors(1).unwrap());
        assert_eq!(details, before);
    }

    #[test]
    fn set_floors_preserves_edits_across_resizes() {
        let mut details = ConstructionDetails::default();
        details
            .update_floor(1, FloorEdit { kitchen_type: Some(KitchenType::WithChimney), ..FloorEdit::default() })
            .unwrap();
        assert!(details.set_floors(3).unwrap());
        assert!(details.set_floors(1).unwrap());
        assert_eq!(details.floors(), 1);
        assert_eq!(details.floor_configs()[0].kitchen_type, KitchenType::WithChimney);
        assert!(details.validate().is_ok());
    }

    #[test]
    fn set_floors_rejects_out_of_range_counts() {
        let mut details = ConstructionDetails::default();
        assert!(details.set_floors(0).is_err());
        assert!(details.set_floors(MAX_FLOORS + 1).is_err());
        assert_eq!(details.floors(), 1);
    }

    #[test]
    fn editing_unknown_floor_is_rejected() {
        let mut details = ConstructionDetails::default();
        let err = details.update_floor(2, FloorEdit::default()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
