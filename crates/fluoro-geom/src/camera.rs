use glam::{DMat3, DVec3};

use crate::rigid::RigidTransform;

/// Pinhole projective camera with an attached flat-panel detector.
///
/// The camera frame has the X-ray source (pinhole) at the origin and the
/// detector plane at `z == focal_len`. Column/row pixel indices map to
/// physical detector points through the intrinsic matrix; the extrinsic
/// transform places the camera frame in the world.
///
/// The intrinsic matrix, detector counts and detector spacings are kept
/// jointly consistent: [`CameraModel::setup`] is the single mutation point
/// and recomputes the derived focal length, and the resize helpers
/// ([`CameraModel::downsample`], [`CameraModel::move_focal_pt`]) always go
/// through it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    intrins: DMat3,
    extrins: RigidTransform,
    num_det_rows: usize,
    num_det_cols: usize,
    det_row_spacing: f64,
    det_col_spacing: f64,
    focal_len: f64,
}

impl CameraModel {
    /// Creates a camera, computing the derived geometry.
    ///
    /// See [`CameraModel::setup`] for the argument contract.
    pub fn new(
        intrins: DMat3,
        extrins: RigidTransform,
        num_det_rows: usize,
        num_det_cols: usize,
        det_row_spacing: f64,
        det_col_spacing: f64,
    ) -> Self {
        let mut cam = Self {
            intrins: DMat3::IDENTITY,
            extrins: RigidTransform::IDENTITY,
            num_det_rows: 0,
            num_det_cols: 0,
            det_row_spacing: 0.0,
            det_col_spacing: 0.0,
            focal_len: 0.0,
        };
        cam.setup(
            intrins,
            extrins,
            num_det_rows,
            num_det_cols,
            det_row_spacing,
            det_col_spacing,
        );
        cam
    }

    /// Builds an intrinsic matrix from a focal length, principal point and
    /// detector spacings.
    pub fn intrins_from_focal_len(
        focal_len: f64,
        principal_pt: (f64, f64),
        det_row_spacing: f64,
        det_col_spacing: f64,
    ) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(focal_len / det_col_spacing, 0.0, 0.0),
            DVec3::new(0.0, focal_len / det_row_spacing, 0.0),
            DVec3::new(principal_pt.0, principal_pt.1, 1.0),
        )
    }

    /// Re-initializes the camera; all derived geometry is recomputed.
    ///
    /// Detector dimensions and spacings must be positive; violations are
    /// programming errors.
    pub fn setup(
        &mut self,
        intrins: DMat3,
        extrins: RigidTransform,
        num_det_rows: usize,
        num_det_cols: usize,
        det_row_spacing: f64,
        det_col_spacing: f64,
    ) {
        assert!(num_det_rows > 0 && num_det_cols > 0);
        assert!(det_row_spacing > 0.0 && det_col_spacing > 0.0);

        self.intrins = intrins;
        self.extrins = extrins;
        self.num_det_rows = num_det_rows;
        self.num_det_cols = num_det_cols;
        self.det_row_spacing = det_row_spacing;
        self.det_col_spacing = det_col_spacing;

        // fx is in pixel units; the physical source-to-detector distance is
        // recovered with the column spacing
        self.focal_len = (intrins.x_axis.x * det_col_spacing).abs();
        assert!(self.focal_len > 0.0);
    }

    /// Intrinsic 3x3 matrix.
    pub fn intrins(&self) -> &DMat3 {
        &self.intrins
    }

    /// Extrinsic transform placing the camera frame in the world.
    pub fn extrins(&self) -> &RigidTransform {
        &self.extrins
    }

    /// Number of detector rows.
    pub fn num_det_rows(&self) -> usize {
        self.num_det_rows
    }

    /// Number of detector columns.
    pub fn num_det_cols(&self) -> usize {
        self.num_det_cols
    }

    /// Physical spacing between detector rows.
    pub fn det_row_spacing(&self) -> f64 {
        self.det_row_spacing
    }

    /// Physical spacing between detector columns.
    pub fn det_col_spacing(&self) -> f64 {
        self.det_col_spacing
    }

    /// Source-to-detector distance.
    pub fn focal_len(&self) -> f64 {
        self.focal_len
    }

    /// The pinhole location in the camera frame.
    pub fn focal_pt(&self) -> DVec3 {
        DVec3::ZERO
    }

    /// Physical detector point for a (possibly fractional) pixel index, in
    /// the camera frame.
    pub fn detector_pt(&self, row: f64, col: f64) -> DVec3 {
        let dir = self.intrins.inverse() * DVec3::new(col, row, 1.0);
        dir * (self.focal_len / dir.z)
    }

    /// Unit direction of the ray through a pixel, in the camera frame.
    pub fn pixel_ray_dir(&self, row: f64, col: f64) -> DVec3 {
        self.detector_pt(row, col).normalize()
    }

    /// All detector pixel-center points in row-major order.
    ///
    /// The intrinsic inverse is hoisted out of the loop; this is the bulk
    /// form the ray caster consumes once per projection pass.
    pub fn detector_grid(&self) -> Vec<DVec3> {
        let intrins_inv = self.intrins.inverse();

        let mut pts = Vec::with_capacity(self.num_det_rows * self.num_det_cols);
        for row in 0..self.num_det_rows {
            for col in 0..self.num_det_cols {
                let dir = intrins_inv * DVec3::new(col as f64, row as f64, 1.0);
                pts.push(dir * (self.focal_len / dir.z));
            }
        }

        pts
    }

    /// Resamples the detector by `ds_factor` (0.5 halves each dimension).
    ///
    /// The physical detector extent and the source-to-detector distance are
    /// preserved: pixel counts scale by the factor, spacings scale by the
    /// realized inverse ratio, and the intrinsics are rescaled to match.
    pub fn downsample(&self, ds_factor: f64) -> CameraModel {
        assert!(ds_factor > 0.0);

        let new_cols = ((self.num_det_cols as f64 * ds_factor).round() as usize).max(1);
        let new_rows = ((self.num_det_rows as f64 * ds_factor).round() as usize).max(1);

        // the realized per-axis ratios can differ slightly from ds_factor
        // after rounding
        let col_ratio = new_cols as f64 / self.num_det_cols as f64;
        let row_ratio = new_rows as f64 / self.num_det_rows as f64;

        let new_col_spacing = self.det_col_spacing / col_ratio;
        let new_row_spacing = self.det_row_spacing / row_ratio;

        let mut intrins = self.intrins;
        intrins.x_axis.x *= self.det_col_spacing / new_col_spacing;
        intrins.y_axis.y *= self.det_row_spacing / new_row_spacing;
        intrins.z_axis.x *= col_ratio;
        intrins.z_axis.y *= row_ratio;

        CameraModel::new(
            intrins,
            self.extrins,
            new_rows,
            new_cols,
            new_row_spacing,
            new_col_spacing,
        )
    }

    /// Moves the X-ray source by `offset` (camera frame) while holding the
    /// detector fixed in space, and returns the camera re-expressed in the
    /// frame of the moved source.
    ///
    /// The principal point and focal length absorb the shift:
    /// `cx' = cx + dx/spacing`, `cy' = cy + dy/spacing`, `f' = f - dz`.
    pub fn move_focal_pt(&self, offset: DVec3) -> CameraModel {
        let new_focal_len = self.focal_len - offset.z;
        assert!(new_focal_len > 0.0);

        let mut intrins = self.intrins;
        intrins.x_axis.x = new_focal_len / self.det_col_spacing;
        intrins.y_axis.y = new_focal_len / self.det_row_spacing;
        intrins.z_axis.x += offset.x / self.det_col_spacing;
        intrins.z_axis.y += offset.y / self.det_row_spacing;

        let extrins = self.extrins * RigidTransform::from_translation(offset);

        CameraModel::new(
            intrins,
            extrins,
            self.num_det_rows,
            self.num_det_cols,
            self.det_row_spacing,
            self.det_col_spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_cam() -> CameraModel {
        let intrins =
            CameraModel::intrins_from_focal_len(1000.0, (63.5, 63.5), 0.5, 0.5);
        CameraModel::new(intrins, RigidTransform::IDENTITY, 128, 128, 0.5, 0.5)
    }

    #[test]
    fn test_focal_len_derived() {
        let cam = test_cam();
        assert_relative_eq!(cam.focal_len(), 1000.0);
    }

    #[test]
    fn test_principal_ray_hits_detector_center() {
        let cam = test_cam();
        let pt = cam.detector_pt(63.5, 63.5);
        assert_relative_eq!(pt.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pt.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pt.z, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_detector_pt_spacing() {
        let cam = test_cam();
        let a = cam.detector_pt(0.0, 0.0);
        let b = cam.detector_pt(0.0, 1.0);
        assert_relative_eq!((b - a).length(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_downsample_preserves_focal_len_and_extent() {
        let cam = test_cam();
        let ds = cam.downsample(0.5);

        assert_eq!(ds.num_det_rows(), 64);
        assert_eq!(ds.num_det_cols(), 64);
        assert_relative_eq!(ds.focal_len(), cam.focal_len(), epsilon = 1e-9);
        assert_relative_eq!(
            ds.num_det_cols() as f64 * ds.det_col_spacing(),
            cam.num_det_cols() as f64 * cam.det_col_spacing(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_move_focal_pt_keeps_detector_fixed() {
        let cam = test_cam();
        let offset = DVec3::new(2.0, -1.0, 30.0);
        let moved = cam.move_focal_pt(offset);

        // any detector pixel must land on the same world point
        for (row, col) in [(0.0, 0.0), (63.5, 63.5), (100.0, 17.0)] {
            let world_orig = cam.extrins().transform_point(cam.detector_pt(row, col));
            let world_moved = moved
                .extrins()
                .transform_point(moved.detector_pt(row, col));
            assert_relative_eq!(world_orig.x, world_moved.x, epsilon = 1e-9);
            assert_relative_eq!(world_orig.y, world_moved.y, epsilon = 1e-9);
            assert_relative_eq!(world_orig.z, world_moved.z, epsilon = 1e-9);
        }
    }

    #[test]
    #[should_panic]
    fn test_zero_rows_is_a_programming_error() {
        let intrins = CameraModel::intrins_from_focal_len(1000.0, (0.0, 0.0), 1.0, 1.0);
        let _ = CameraModel::new(intrins, RigidTransform::IDENTITY, 0, 10, 1.0, 1.0);
    }
}
