use fluoro_geom::RigidTransform;
use fluoro_image::Image2;

use crate::raycaster::RayCaster;

/// Optional per-object intermediate-frame corrections of a
/// [`RayCastSceneFn`] pass.
///
/// Each object's camera-to-volume transforms can be corrected about an
/// intermediate coordinate frame (for example an anatomical frame). The
/// two `wrt_vol` cases compose differently and the operation order
/// matters; both forms are contractual:
///
/// - frame expressed with respect to the volume:
///   `pre(inter)` then `post(inter.inverse() * ref)`
/// - frame expressed with respect to the reference:
///   `pre(ref * inter)` then `post(inter.inverse())`
#[derive(Debug, Clone, Default)]
pub struct SceneInterFrames {
    /// Per-object intermediate frames.
    pub frames: Vec<RigidTransform>,
    /// Whether each frame is expressed with respect to the volume (true)
    /// or the reference frame (false).
    pub wrt_vol: Vec<bool>,
    /// Per-object reference camera-world-to-volume transforms.
    pub ref_frames_cam_world_to_vol: Vec<RigidTransform>,
}

/// One multi-object forward-projection pass over every camera.
///
/// Objects are rendered in order: the first with the replace store policy,
/// the rest accumulating, so multiple volumes (e.g. surgical hardware over
/// anatomy) composite into one scene. Each object's transform is broadcast
/// to every camera. After the pass the ray caster's projection count and
/// camera associations are restored; only the rendered buffer (and the
/// per-projection transforms, which the pass overwrites by design) differ.
#[derive(Debug, Clone, Default)]
pub struct RayCastSceneFn {
    /// Volume indices to project; empty means every volume, in order.
    pub vols_to_proj: Vec<usize>,
    /// Per-object camera-world-to-volume transforms.
    pub cam_world_to_vols: Vec<RigidTransform>,
    /// Optional per-object intermediate-frame corrections.
    pub inter_frames: Option<SceneInterFrames>,
    /// Rendered scene, one projection per camera; filled by
    /// [`RayCastSceneFn::run`].
    pub projs: Vec<Image2<f32>>,
}

impl RayCastSceneFn {
    /// Runs the pass.
    ///
    /// The object count must match the transform list (and the
    /// intermediate-frame lists when supplied); mismatches are programming
    /// errors.
    pub fn run(&mut self, ray_caster: &mut RayCaster) {
        let vols_to_proj_specified = !self.vols_to_proj.is_empty();

        let nv = if vols_to_proj_specified {
            self.vols_to_proj.len()
        } else {
            ray_caster.num_vols()
        };

        assert!(self.cam_world_to_vols.len() == nv);

        if let Some(inter) = &self.inter_frames {
            assert!(inter.frames.len() == nv);
            assert!(inter.wrt_vol.len() == nv);
            assert!(inter.ref_frames_cam_world_to_vol.len() == nv);
        }

        let num_cams = ray_caster.num_camera_models();

        // save off the state the pass clobbers
        let prev_num_projs = ray_caster.num_projs();
        let prev_cam_assocs = ray_caster.camera_model_proj_associations().to_vec();

        // one projection per camera for this pass
        ray_caster.set_num_projs(num_cams);

        for vol_idx in 0..nv {
            let ray_caster_vol_idx = if vols_to_proj_specified {
                self.vols_to_proj[vol_idx]
            } else {
                vol_idx
            };
            assert!(ray_caster_vol_idx < ray_caster.num_vols());

            if vol_idx != 0 {
                ray_caster.use_proj_store_accum_method();
            } else {
                ray_caster.use_proj_store_replace_method();
            }

            ray_caster.distribute_xform_among_cam_models(&self.cam_world_to_vols[vol_idx]);

            if let Some(inter) = &self.inter_frames {
                let frame = inter.frames[vol_idx];
                let ref_frame = inter.ref_frames_cam_world_to_vol[vol_idx];

                if inter.wrt_vol[vol_idx] {
                    ray_caster.pre_multiply_all_xforms(&frame);
                    ray_caster.post_multiply_all_xforms(&(frame.inverse() * ref_frame));
                } else {
                    ray_caster.pre_multiply_all_xforms(&(ref_frame * frame));
                    ray_caster.post_multiply_all_xforms(&frame.inverse());
                }
            }

            ray_caster.compute(ray_caster_vol_idx);
        }

        self.projs = (0..num_cams).map(|cam_idx| ray_caster.proj(cam_idx)).collect();

        // restore the externally observable configuration
        ray_caster.set_num_projs(prev_num_projs);
        ray_caster.set_camera_model_proj_associations(prev_cam_assocs);
    }
}
