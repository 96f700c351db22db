//! Pixel-level transforms over decoded [`Image`](crate::raster::Image)s.
//!
//! | Operation | Function |
//! |---|---|
//! | **Orientation** | [`get_orientation`], [`auto_orient`], [`rotate`], [`flip_horizontal`] |
//! | **Alpha** | [`ensure_alpha`], [`flatten`] |
//! | **Trim** | [`trim`], [`find_trim`] |
//! | **Resize** | [`resize`], [`resize_premultiplied`], [`fill`] |
//! | **Crop** | [`extract_area`], [`crop`], [`smart_crop`] |
//! | **Composite** | [`composite`], [`apply_watermark`] |
//! | **Filters** | [`blur`], [`sharpen`] |
//! | **Strip** | [`strip`] |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math, unit testable without pixels
//! - **Gravity**: the nine anchor points used by crops and watermarks
//! - **Operations**: one file per concern, each taking `&Image` and returning
//!   a new image
//!
//! No transform mutates its input.

mod calculations;
mod composite;
mod filter;
mod geometry;
mod gravity;
mod normalize;
mod resize;
mod strip;
mod trim;

pub use calculations::{cover_dimensions, equalize_margins, scaled_extent};
pub use composite::{apply_watermark, composite};
pub use filter::{Sharpening, blur, sharpen};
pub use geometry::{Angle, crop, extract_area, fill, flip_horizontal, rotate, smart_crop};
pub use gravity::Gravity;
pub use normalize::{auto_orient, ensure_alpha, flatten, get_orientation, is_animated};
pub use resize::{MAX_OUTPUT_PIXELS, resize, resize_premultiplied};
pub use strip::{KEPT_FIELDS, strip};
pub use trim::{Background, find_trim, trim};
