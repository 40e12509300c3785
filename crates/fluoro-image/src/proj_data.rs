use std::collections::HashMap;

use glam::DVec2;

use fluoro_geom::CameraModel;

use crate::error::ImageError;
use crate::image2::{Image2, PixelScalar};
use crate::resize::resize_bilinear;

/// In-plane rotation that brings the projection to a "patient up"
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotToPatUp {
    /// Already patient-up.
    Zero,
    /// Rotated 90 degrees.
    Ninety,
    /// Rotated 180 degrees.
    OneEighty,
    /// Rotated 270 degrees.
    TwoSeventy,
}

/// A projection: camera model, detector image and optional named 2D
/// landmarks (pixel coordinates).
#[derive(Debug, Clone)]
pub struct ProjData<T> {
    /// Camera model associated with the image.
    pub cam: CameraModel,
    /// Detector image.
    pub img: Image2<T>,
    /// Named 2D landmarks in pixel coordinates.
    pub landmarks: HashMap<String, DVec2>,
    /// Rotation needed to bring the image patient-up, when known.
    pub rot_to_pat_up: Option<RotToPatUp>,
}

impl<T: PixelScalar> ProjData<T> {
    /// Pairs a camera with an image; no landmarks, unknown orientation.
    pub fn new(cam: CameraModel, img: Image2<T>) -> Self {
        Self {
            cam,
            img,
            landmarks: HashMap::new(),
            rot_to_pat_up: None,
        }
    }

    /// Downsamples the camera model, image and landmarks together.
    ///
    /// The camera geometry drives the new image shape so the pair stays
    /// consistent; landmark pixel coordinates scale with the factor.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidDownsampleFactor`] for non-positive
    /// factors.
    pub fn downsample(&self, ds_factor: f64) -> Result<ProjData<T>, ImageError> {
        if ds_factor <= 0.0 {
            return Err(ImageError::InvalidDownsampleFactor(ds_factor));
        }

        let cam = self.cam.downsample(ds_factor);

        let mut img = Image2::from_size_val(
            cam.num_det_rows(),
            cam.num_det_cols(),
            cam.det_row_spacing(),
            cam.det_col_spacing(),
            T::default(),
        );
        resize_bilinear(&self.img, &mut img)?;

        debug_assert!(img.rows() == cam.num_det_rows());
        debug_assert!(img.cols() == cam.num_det_cols());

        let landmarks = self
            .landmarks
            .iter()
            .map(|(name, pt)| (name.clone(), *pt * ds_factor))
            .collect();

        Ok(ProjData {
            cam,
            img,
            landmarks,
            rot_to_pat_up: self.rot_to_pat_up,
        })
    }
}

/// Downsamples a list of projections by a common factor.
pub fn downsample_proj_data<T: PixelScalar>(
    src_projs: &[ProjData<T>],
    ds_factor: f64,
) -> Result<Vec<ProjData<T>>, ImageError> {
    src_projs.iter().map(|p| p.downsample(ds_factor)).collect()
}

/// Extracts the camera model of every projection.
pub fn extract_cam_models<T: PixelScalar>(proj_data: &[ProjData<T>]) -> Vec<CameraModel> {
    proj_data.iter().map(|p| p.cam.clone()).collect()
}

/// Applies a patient-up rotation to a detector image in place.
///
/// A 180 degree rotation flips rows and columns; zero is a no-op. The 90
/// and 270 degree cases would change the detector shape and are reported
/// as unsupported.
pub fn modify_for_pat_up<T: PixelScalar>(
    img: &mut Image2<T>,
    rot_to_pat_up: RotToPatUp,
) -> Result<(), ImageError> {
    match rot_to_pat_up {
        RotToPatUp::Zero => Ok(()),
        RotToPatUp::OneEighty => {
            // flipping rows and then columns of a single-channel row-major
            // image is a full reversal of the flat buffer
            img.as_slice_mut().reverse();
            Ok(())
        }
        RotToPatUp::Ninety => Err(ImageError::UnsupportedPatUpRotation(90)),
        RotToPatUp::TwoSeventy => Err(ImageError::UnsupportedPatUpRotation(270)),
    }
}
