// SPDX-License-Identifier: GPL-3.0-only

//! Focus and exposure metering
//!
//! Metering regions come from two sources: a tap on the preview, or the faces
//! reported with preview results. A tap wins for a while
//! ([`crate::config::CaptureTiming::touch_focus_revert`]) and focus then returns
//! to faces. Face focus uses a dead band so small jitter does not retrigger the
//! autofocus sweep.

pub mod overlay;

pub use overlay::{OverlayGeometry, PreviewRect, face_bounds_to_preview};

use crate::backends::camera::{
    AfMode, AfTrigger, CameraCharacteristics, CaptureRequest, Face, Rect, RequestTag,
    SizeCandidate,
};
use crate::config::FocusTuning;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where focus currently comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeFocus {
    /// Follow the primary detected face
    #[default]
    AutoFocusToFaces,
    /// Hold the region of the last tap
    TouchFocus,
}

/// Sensor-space metering rectangle and its weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusRegion {
    pub rect: Rect,
    pub weight: u32,
}

impl FocusRegion {
    pub fn new(rect: Rect, weight: u32) -> Self {
        Self { rect, weight }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.rect.center_x(), self.rect.center_y())
    }
}

/// How many metering regions the device accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeteringSupport {
    pub max_regions_ae: u32,
    pub max_regions_af: u32,
}

impl MeteringSupport {
    pub fn af_supported(&self) -> bool {
        self.max_regions_af >= 1
    }

    pub fn ae_supported(&self) -> bool {
        self.max_regions_ae >= 1
    }
}

impl From<&CameraCharacteristics> for MeteringSupport {
    fn from(characteristics: &CameraCharacteristics) -> Self {
        Self {
            max_regions_ae: characteristics.max_regions_ae,
            max_regions_af: characteristics.max_regions_af,
        }
    }
}

/// Requests that retarget the preview session onto new regions
///
/// Submit order: stop repeating, `cancel`, `trigger`. When the result tagged
/// [`RequestTag::Focus`] completes, `steady` becomes the repeating request.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusPlan {
    pub cancel: CaptureRequest,
    pub trigger: CaptureRequest,
    pub steady: CaptureRequest,
}

/// Build the requests that move metering to `regions`
pub fn apply_region(
    regions: &[FocusRegion],
    preview: &CaptureRequest,
    metering: MeteringSupport,
) -> FocusPlan {
    let mut cancel = preview.clone();
    cancel.af_trigger = AfTrigger::Cancel;
    cancel.tag = Some(RequestTag::Focus);

    let mut trigger = preview.clone();
    trigger.af_trigger = AfTrigger::Idle;
    if metering.af_supported() {
        trigger.af_mode = AfMode::Auto;
        trigger.af_regions = regions.to_vec();
        trigger.af_trigger = AfTrigger::Start;
    }
    if metering.ae_supported() {
        trigger.ae_regions = regions.to_vec();
    }
    trigger.tag = Some(RequestTag::Focus);

    // Same regions, but the sweep must not restart on every repeat
    let mut steady = trigger.clone();
    steady.af_trigger = AfTrigger::Idle;
    steady.tag = None;

    FocusPlan {
        cancel,
        trigger,
        steady,
    }
}

/// Whether the device is held in landscape, from the orientation sensor degrees
///
/// Readings outside `0..360` (the sensor reports -1 when the device lies flat)
/// count as landscape.
pub fn is_landscape(degrees: i32) -> bool {
    match degrees {
        0..=44 | 315..=359 => false,
        45..=134 => true,
        135..=224 => false,
        _ => true,
    }
}

/// Tracks the focus mode and the last metered centre
#[derive(Debug, Clone)]
pub struct FocusController {
    mode: ModeFocus,
    tuning: FocusTuning,
    /// Centre of the last region produced; `None` until something was focused
    last_center: Option<(i32, i32)>,
}

impl FocusController {
    pub fn new(tuning: FocusTuning) -> Self {
        Self {
            mode: ModeFocus::AutoFocusToFaces,
            tuning,
            last_center: None,
        }
    }

    pub fn mode(&self) -> ModeFocus {
        self.mode
    }

    pub fn last_center(&self) -> Option<(i32, i32)> {
        self.last_center
    }

    /// Map a tap on the preview to a sensor-space region and switch to touch focus
    ///
    /// The sensor is mounted 90° to the view: view y runs along sensor x and view
    /// x runs backwards along sensor y.
    pub fn focus_at_point(
        &mut self,
        x: f32,
        y: f32,
        view_width: u32,
        view_height: u32,
        sensor: SizeCandidate,
    ) -> FocusRegion {
        let view_width = view_width.max(1) as f32;
        let view_height = view_height.max(1) as f32;
        let focus_x = (y / view_height * sensor.width as f32) as i32;
        let focus_y = ((1.0 - x / view_width) * sensor.height as f32) as i32;

        let half = self.tuning.touch_half_size;
        let rect = Rect::new(
            (focus_x - half).max(0),
            (focus_y - half).max(0),
            (focus_x + half).min(sensor.width as i32),
            (focus_y + half).min(sensor.height as i32),
        );

        let region = FocusRegion::new(rect, self.tuning.metering_weight);
        self.last_center = Some(region.center());
        self.mode = ModeFocus::TouchFocus;
        debug!(x, y, rect = ?rect, "Touch focus");
        region
    }

    /// Return to face tracking once the touch hold expired
    pub fn revert_to_faces(&mut self) {
        if self.mode == ModeFocus::TouchFocus {
            debug!("Touch focus expired, following faces");
        }
        self.mode = ModeFocus::AutoFocusToFaces;
    }

    /// Regions to meter for a new face detection, if a refocus is due
    ///
    /// Only the first face decides; every face becomes a region. Nothing is
    /// produced in touch mode or for an empty list.
    pub fn on_faces_detected(
        &mut self,
        faces: &[Face],
        overlay_faded: bool,
    ) -> Option<Vec<FocusRegion>> {
        if self.mode != ModeFocus::AutoFocusToFaces {
            return None;
        }
        let primary = faces.first()?;

        let moved = match self.last_center {
            None => true,
            Some((cx, cy)) => {
                let threshold = self.tuning.face_move_threshold;
                let fx = primary.bounds.center_x();
                let fy = primary.bounds.center_y();
                cx < fx - threshold
                    || cx > fx + threshold
                    || cy < fy - threshold
                    || cy > fy + threshold
            }
        };

        if !moved && !overlay_faded {
            return None;
        }

        self.last_center = Some((primary.bounds.center_x(), primary.bounds.center_y()));
        Some(
            faces
                .iter()
                .map(|face| FocusRegion::new(face.bounds, self.tuning.metering_weight))
                .collect(),
        )
    }

    /// Forget everything (camera closed or switched)
    pub fn reset(&mut self) {
        self.mode = ModeFocus::AutoFocusToFaces;
        self.last_center = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR: SizeCandidate = SizeCandidate::new(4000, 3000);

    fn face_at(cx: i32, cy: i32) -> Face {
        Face::new(Rect::new(cx - 100, cy - 100, cx + 100, cy + 100), 90)
    }

    #[test]
    fn test_touch_maps_to_rotated_sensor() {
        let mut focus = FocusController::new(FocusTuning::default());
        // Centre of a 1080x1920 portrait view
        let region = focus.focus_at_point(540.0, 960.0, 1080, 1920, SENSOR);
        assert_eq!(region.center(), (2000, 1500));
        assert_eq!(region.rect.width(), 200);
        assert_eq!(region.weight, 999);
        assert_eq!(focus.mode(), ModeFocus::TouchFocus);
    }

    #[test]
    fn test_touch_region_clipped_to_sensor() {
        let mut focus = FocusController::new(FocusTuning::default());
        // Top-right corner of the view is sensor origin
        let region = focus.focus_at_point(1080.0, 0.0, 1080, 1920, SENSOR);
        assert_eq!(region.rect, Rect::new(0, 0, 100, 100));

        let region = focus.focus_at_point(0.0, 1920.0, 1080, 1920, SENSOR);
        assert_eq!(region.rect, Rect::new(3900, 2900, 4000, 3000));
    }

    #[test]
    fn test_faces_ignored_in_touch_mode() {
        let mut focus = FocusController::new(FocusTuning::default());
        focus.focus_at_point(10.0, 10.0, 100, 100, SENSOR);
        assert!(focus.on_faces_detected(&[face_at(500, 500)], false).is_none());

        focus.revert_to_faces();
        assert!(focus.on_faces_detected(&[face_at(500, 500)], false).is_some());
    }

    #[test]
    fn test_jitter_inside_dead_band_refocuses_once() {
        let mut focus = FocusController::new(FocusTuning::default());
        let jitter = [(1000, 1000), (1020, 990), (980, 1040), (1050, 950), (1000, 1000)];
        let produced = jitter
            .iter()
            .filter(|(x, y)| focus.on_faces_detected(&[face_at(*x, *y)], false).is_some())
            .count();
        assert_eq!(produced, 1);

        // Strictly beyond the threshold
        assert!(focus.on_faces_detected(&[face_at(1051, 1000)], false).is_some());
    }

    #[test]
    fn test_faded_overlay_forces_refocus() {
        let mut focus = FocusController::new(FocusTuning::default());
        assert!(focus.on_faces_detected(&[face_at(700, 700)], false).is_some());
        assert!(focus.on_faces_detected(&[face_at(700, 700)], false).is_none());
        assert!(focus.on_faces_detected(&[face_at(700, 700)], true).is_some());
    }

    #[test]
    fn test_every_face_becomes_a_region() {
        let mut focus = FocusController::new(FocusTuning::default());
        let regions = focus
            .on_faces_detected(&[face_at(700, 700), face_at(2000, 2000)], false)
            .unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(focus.last_center(), Some((700, 700)));
        assert!(focus.on_faces_detected(&[], false).is_none());
    }

    #[test]
    fn test_plan_respects_metering_support() {
        let region = FocusRegion::new(Rect::new(0, 0, 10, 10), 999);
        let preview = CaptureRequest::preview();

        let plan = apply_region(
            &[region],
            &preview,
            MeteringSupport {
                max_regions_ae: 1,
                max_regions_af: 0,
            },
        );
        assert_eq!(plan.cancel.af_trigger, AfTrigger::Cancel);
        assert_eq!(plan.cancel.tag, Some(RequestTag::Focus));
        assert!(plan.trigger.af_regions.is_empty());
        assert_eq!(plan.trigger.af_trigger, AfTrigger::Idle);
        assert_eq!(plan.trigger.ae_regions, vec![region]);
        assert_eq!(plan.trigger.tag, Some(RequestTag::Focus));

        let plan = apply_region(
            &[region],
            &preview,
            MeteringSupport {
                max_regions_ae: 0,
                max_regions_af: 1,
            },
        );
        assert_eq!(plan.trigger.af_mode, AfMode::Auto);
        assert_eq!(plan.trigger.af_trigger, AfTrigger::Start);
        assert!(plan.trigger.ae_regions.is_empty());
        assert_eq!(plan.steady.af_trigger, AfTrigger::Idle);
        assert_eq!(plan.steady.tag, None);
        assert_eq!(plan.steady.af_regions, vec![region]);
    }

    #[test]
    fn test_is_landscape_bands() {
        assert!(!is_landscape(0));
        assert!(!is_landscape(44));
        assert!(is_landscape(45));
        assert!(is_landscape(134));
        assert!(!is_landscape(135));
        assert!(!is_landscape(224));
        assert!(is_landscape(225));
        assert!(is_landscape(314));
        assert!(!is_landscape(315));
        assert!(!is_landscape(359));
    }

    #[test]
    fn test_is_landscape_unknown_reading() {
        assert!(is_landscape(-1));
        assert!(is_landscape(360));
    }
}
