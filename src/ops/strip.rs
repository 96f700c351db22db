//! Metadata stripping.

use crate::raster::Image;
use crate::raster::metadata::fields;

/// Fields that survive [`strip`]. Anything not listed is dropped, including
/// fields this crate does not know about yet.
pub const KEPT_FIELDS: &[&str] = &[fields::ICC_PROFILE];

/// Copy of `image` whose metadata holds only the colour profile, if it had
/// one. Pixels are untouched.
pub fn strip(image: &Image) -> Image {
    let mut out = image.clone();
    out.metadata_mut().retain(|name, _| KEPT_FIELDS.contains(&name));
    tracing::debug!(
        kept = out.metadata().len(),
        dropped = image.metadata().len() - out.metadata().len(),
        "stripped metadata"
    );
    out
}
