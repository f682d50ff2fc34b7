//! Viewport fitting.
//!
//! On every input change the controller picks at most one fit, in
//! priority order:
//!
//! 1. the selected region, whenever the selection changes;
//! 2. the focus region, once per `(level, code)`;
//! 3. the extent of the whole level, once per level visit.
//!
//! After a level has been fitted nothing moves the camera again until the
//! selection or the level changes, so user pan/zoom is kept.

use std::collections::BTreeSet;

use regioniq_choropleth_models::{CameraCommand, EnrichedFeature, FitReason};
use regioniq_region_models::{BoundingBox, RegionLevel};

/// Extent shown when a level has no usable bounding box.
pub const DEFAULT_EXTENT: BoundingBox = BoundingBox::new(-8.65, 49.86, 1.77, 60.86);

/// A region identified by level and boundary code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegionRef {
    pub level: RegionLevel,
    pub code: String,
}

impl RegionRef {
    #[must_use]
    pub fn new(level: RegionLevel, code: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
        }
    }
}

/// Inputs the camera reacts to.
#[derive(Debug, Clone, Copy)]
pub struct CameraInput<'a> {
    pub level: RegionLevel,
    pub selected: Option<&'a RegionRef>,
    pub focus: Option<&'a RegionRef>,
    pub features: &'a [EnrichedFeature],
}

#[derive(Debug, Default)]
pub struct CameraController {
    active_level: Option<RegionLevel>,
    fitted_levels: BTreeSet<RegionLevel>,
    last_selection: Option<RegionRef>,
    last_focus: Option<RegionRef>,
}

impl CameraController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `level` has been fitted since it became active.
    #[must_use]
    pub fn is_fitted(&self, level: RegionLevel) -> bool {
        self.fitted_levels.contains(&level)
    }

    /// Forgets all fit history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the fit to perform for `input`, if any.
    pub fn update(&mut self, input: &CameraInput<'_>) -> Option<CameraCommand> {
        if self.active_level != Some(input.level) {
            self.active_level = Some(input.level);
            self.fitted_levels.clear();
            self.last_selection = None;
            self.last_focus = None;
        }

        if let Some(selected) = input.selected.filter(|s| s.level == input.level) {
            if let Some(bbox) = bbox_of(input.features, &selected.code) {
                if self.last_selection.as_ref() == Some(selected) {
                    return None;
                }
                self.last_selection = Some(selected.clone());
                self.fitted_levels.insert(input.level);
                return Some(fit(bbox, FitReason::Selection));
            }
        } else {
            self.last_selection = None;
        }

        if let Some(focus) = input.focus {
            if self.last_focus.as_ref() != Some(focus) {
                if let Some(bbox) = bbox_of(input.features, &focus.code) {
                    self.last_focus = Some(focus.clone());
                    self.fitted_levels.insert(input.level);
                    return Some(fit(bbox, FitReason::Focus));
                }
            }
        }

        if self.fitted_levels.contains(&input.level) || input.features.is_empty() {
            return None;
        }
        self.fitted_levels.insert(input.level);

        let extent = input
            .features
            .iter()
            .filter_map(|f| f.bbox.filter(BoundingBox::is_valid))
            .reduce(|acc, b| acc.union(&b))
            .filter(BoundingBox::is_valid);
        Some(match extent {
            Some(bbox) => fit(bbox, FitReason::LevelExtent),
            None => fit(DEFAULT_EXTENT, FitReason::DefaultExtent),
        })
    }
}

const fn fit(bbox: BoundingBox, reason: FitReason) -> CameraCommand {
    CameraCommand::FitBounds { bbox, reason }
}

fn bbox_of(features: &[EnrichedFeature], code: &str) -> Option<BoundingBox> {
    features
        .iter()
        .find(|f| f.code == code)
        .and_then(|f| f.bbox)
        .filter(BoundingBox::is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::JsonObject;

    fn feature(code: &str, bbox: Option<BoundingBox>) -> EnrichedFeature {
        EnrichedFeature {
            code: code.to_string(),
            name: None,
            value: None,
            selected: false,
            in_parent: true,
            bbox,
            geometry: None,
            properties: JsonObject::new(),
        }
    }

    fn features() -> Vec<EnrichedFeature> {
        vec![
            feature("TLC", Some(BoundingBox::new(-2.7, 54.4, -1.2, 55.8))),
            feature("TLI", Some(BoundingBox::new(-0.5, 51.3, 0.3, 51.7))),
            feature("TLX", Some(BoundingBox::new(200.0, 0.0, 201.0, 1.0))),
        ]
    }

    fn input<'a>(
        level: RegionLevel,
        selected: Option<&'a RegionRef>,
        focus: Option<&'a RegionRef>,
        features: &'a [EnrichedFeature],
    ) -> CameraInput<'a> {
        CameraInput {
            level,
            selected,
            focus,
            features,
        }
    }

    fn reason(command: Option<CameraCommand>) -> Option<FitReason> {
        command.map(|CameraCommand::FitBounds { reason, .. }| reason)
    }

    #[test]
    fn level_fits_once() {
        let fs = features();
        let mut camera = CameraController::new();
        let first = camera.update(&input(RegionLevel::Itl1, None, None, &fs));
        let Some(CameraCommand::FitBounds { bbox, reason }) = first else {
            panic!("expected a level fit");
        };
        assert_eq!(reason, FitReason::LevelExtent);
        assert_eq!(bbox, BoundingBox::new(-2.7, 51.3, 0.3, 55.8));
        assert!(camera.is_fitted(RegionLevel::Itl1));
        assert_eq!(camera.update(&input(RegionLevel::Itl1, None, None, &fs)), None);
    }

    #[test]
    fn waits_for_geometry_before_level_fit() {
        let mut camera = CameraController::new();
        assert_eq!(camera.update(&input(RegionLevel::Lad, None, None, &[])), None);
        assert!(!camera.is_fitted(RegionLevel::Lad));
    }

    #[test]
    fn invalid_extent_uses_default() {
        let fs = vec![feature("TLX", Some(BoundingBox::new(200.0, 0.0, 201.0, 1.0)))];
        let mut camera = CameraController::new();
        assert_eq!(
            camera.update(&input(RegionLevel::Itl1, None, None, &fs)),
            Some(fit(DEFAULT_EXTENT, FitReason::DefaultExtent))
        );
    }

    #[test]
    fn selection_refits_on_every_change() {
        let fs = features();
        let tlc = RegionRef::new(RegionLevel::Itl1, "TLC");
        let tli = RegionRef::new(RegionLevel::Itl1, "TLI");
        let mut camera = CameraController::new();

        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, Some(&tlc), None, &fs))),
            Some(FitReason::Selection)
        );
        assert_eq!(camera.update(&input(RegionLevel::Itl1, Some(&tlc), None, &fs)), None);
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, Some(&tli), None, &fs))),
            Some(FitReason::Selection)
        );
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, Some(&tlc), None, &fs))),
            Some(FitReason::Selection)
        );
    }

    #[test]
    fn selection_on_other_level_is_ignored() {
        let fs = features();
        let lad = RegionRef::new(RegionLevel::Lad, "TLC");
        let mut camera = CameraController::new();
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, Some(&lad), None, &fs))),
            Some(FitReason::LevelExtent)
        );
    }

    #[test]
    fn invalid_selection_bbox_falls_through() {
        let fs = features();
        let bad = RegionRef::new(RegionLevel::Itl1, "TLX");
        let mut camera = CameraController::new();
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, Some(&bad), None, &fs))),
            Some(FitReason::LevelExtent)
        );
    }

    #[test]
    fn focus_fits_once_per_pair() {
        let fs = features();
        let focus = RegionRef::new(RegionLevel::Itl1, "TLI");
        let mut camera = CameraController::new();

        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, None, Some(&focus), &fs))),
            Some(FitReason::Focus)
        );
        assert_eq!(camera.update(&input(RegionLevel::Itl1, None, Some(&focus), &fs)), None);
    }

    #[test]
    fn level_change_rearms_fitting() {
        let fs = features();
        let mut camera = CameraController::new();
        camera.update(&input(RegionLevel::Itl1, None, None, &fs));
        let lad = vec![feature("E09000001", Some(BoundingBox::new(-0.11, 51.51, -0.07, 51.52)))];
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Lad, None, None, &lad))),
            Some(FitReason::LevelExtent)
        );
        assert_eq!(
            reason(camera.update(&input(RegionLevel::Itl1, None, None, &fs))),
            Some(FitReason::LevelExtent)
        );
    }
}
