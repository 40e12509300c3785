#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use fluoro_geom as geom;

#[doc(inline)]
pub use fluoro_image as image;

#[doc(inline)]
pub use fluoro_metrics as metrics;

#[doc(inline)]
pub use fluoro_raycast as raycast;

#[doc(inline)]
pub use fluoro_regi as regi;
