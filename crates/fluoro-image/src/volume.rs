use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::error::ImageError;

/// A 3D voxel grid with ITK-style physical geometry.
///
/// Voxels are stored x-fastest: `data[(z * ny + y) * nx + x]`. The physical
/// position of a (continuous) voxel index is
/// `origin + direction * (spacing .* index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    size: [usize; 3],
    spacing: DVec3,
    origin: DVec3,
    direction: DMat3,
    data: Vec<f32>,
}

impl Volume {
    /// Creates a volume from existing voxel data.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidShape`] when the data length does not
    /// match the grid size.
    pub fn new(
        size: [usize; 3],
        spacing: DVec3,
        origin: DVec3,
        direction: DMat3,
        data: Vec<f32>,
    ) -> Result<Self, ImageError> {
        let num_voxels = size[0] * size[1] * size[2];
        if data.len() != num_voxels {
            return Err(ImageError::InvalidShape(data.len(), num_voxels));
        }

        Ok(Self {
            size,
            spacing,
            origin,
            direction,
            data,
        })
    }

    /// Creates a volume filled with a constant value, axis-aligned at the
    /// given origin.
    pub fn from_size_val(size: [usize; 3], spacing: DVec3, origin: DVec3, val: f32) -> Self {
        Self {
            size,
            spacing,
            origin,
            direction: DMat3::IDENTITY,
            data: vec![val; size[0] * size[1] * size[2]],
        }
    }

    /// Grid size `(nx, ny, nz)`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Physical voxel spacing.
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    /// Physical position of voxel index (0, 0, 0).
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Direction cosine matrix.
    pub fn direction(&self) -> &DMat3 {
        &self.direction
    }

    /// Affine map from continuous voxel index to physical space.
    pub fn idx_to_phys(&self) -> DMat4 {
        let lin = self.direction * DMat3::from_diagonal(self.spacing);
        DMat4::from_cols(
            DVec4::new(lin.x_axis.x, lin.x_axis.y, lin.x_axis.z, 0.0),
            DVec4::new(lin.y_axis.x, lin.y_axis.y, lin.y_axis.z, 0.0),
            DVec4::new(lin.z_axis.x, lin.z_axis.y, lin.z_axis.z, 0.0),
            DVec4::new(self.origin.x, self.origin.y, self.origin.z, 1.0),
        )
    }

    /// Affine map from physical space to continuous voxel index.
    pub fn phys_to_idx(&self) -> DMat4 {
        self.idx_to_phys().inverse()
    }

    /// Physical position of the volume center.
    pub fn center_phys(&self) -> DVec3 {
        let center_idx = DVec3::new(
            self.size[0] as f64 / 2.0,
            self.size[1] as f64 / 2.0,
            self.size[2] as f64 / 2.0,
        );
        self.idx_to_phys().transform_point3(center_idx)
    }

    /// Voxel value at an integer index; indices are clamped to the grid.
    #[inline]
    pub fn voxel_clamped(&self, x: i64, y: i64, z: i64) -> f32 {
        let xi = x.clamp(0, self.size[0] as i64 - 1) as usize;
        let yi = y.clamp(0, self.size[1] as i64 - 1) as usize;
        let zi = z.clamp(0, self.size[2] as i64 - 1) as usize;
        self.data[(zi * self.size[1] + yi) * self.size[0] + xi]
    }

    /// The voxel data as a flat slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The voxel data as a mutable flat slice.
    pub fn as_slice_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
