//! AV1 still-image decoding for AVIF and AV1-compressed HEIF.
//!
//! The `image` crate's `"avif"` feature only provides the encoder (rav1e).
//! Decoding goes through `avif-parse` for the ISOBMFF container and `rav1d`
//! (pure Rust port of dav1d) for the AV1 bitstream. HEIF files carrying HEVC
//! or AVC items fail in the container parser and surface as
//! [`PipelineError::DecodeFailure`].

use crate::error::{PipelineError, Result};
use crate::raster::{Image, Interpretation, PixelBuffer};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::{Dav1dContext, Dav1dSettings};
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::ptr::NonNull;

fn failure(message: impl Into<String>) -> PipelineError {
    PipelineError::DecodeFailure(message.into())
}

/// Decode the primary item of an AV1-in-ISOBMFF container, plus its alpha
/// item when there is one, to 8-bit sRGB (3 bands) or sRGB + alpha (4).
pub(crate) fn decode(bytes: &[u8]) -> Result<Image> {
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
        .map_err(|e| failure(format!("failed to parse AV1 container: {e:?}")))?;
    if avif.primary_item.is_empty() {
        return Err(failure("AV1 container has an empty primary item"));
    }

    let (width, height, rgb) = Av1Decoder::open()?.decode(&avif.primary_item, picture_to_rgb)?;
    let Some(alpha_item) = avif.alpha_item.as_deref().filter(|item| !item.is_empty()) else {
        return Image::new(width, height, 3, Interpretation::Srgb, PixelBuffer::U8(rgb))
            .map_err(|e| failure(format!("decoded AV1 picture is malformed: {e}")));
    };

    let (alpha_w, alpha_h, alpha) = Av1Decoder::open()?.decode(alpha_item, picture_to_alpha)?;
    if (alpha_w, alpha_h) != (width, height) {
        return Err(failure(format!(
            "alpha item is {alpha_w}x{alpha_h}, colour item is {width}x{height}"
        )));
    }
    tracing::debug!(
        width,
        height,
        premultiplied = avif.premultiplied_alpha,
        "merging AV1 alpha item"
    );
    let rgba = interleave_alpha(&rgb, &alpha, avif.premultiplied_alpha);
    Image::new(width, height, 4, Interpretation::Srgb, PixelBuffer::U8(rgba))
        .map_err(|e| failure(format!("decoded AV1 picture is malformed: {e}")))
}

/// Append `alpha` as a fourth band, undoing premultiplication if the
/// container says the colour item carries it.
fn interleave_alpha(rgb: &[u8], alpha: &[u8], premultiplied: bool) -> Vec<u8> {
    rgb.chunks_exact(3)
        .zip(alpha)
        .flat_map(|(px, &a)| {
            let colour = |c: u8| match (premultiplied, a) {
                (false, _) | (true, 255) => c,
                (true, 0) => 0,
                (true, a) => ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8,
            };
            [colour(px[0]), colour(px[1]), colour(px[2]), a]
        })
        .collect()
}

/// A single-threaded rav1d context, closed on drop.
struct Av1Decoder {
    ctx: Option<Dav1dContext>,
}

impl Av1Decoder {
    fn open() -> Result<Self> {
        let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
        let settings_ptr =
            NonNull::new(settings.as_mut_ptr()).ok_or_else(|| failure("rav1d settings pointer"))?;
        unsafe { dav1d::dav1d_default_settings(settings_ptr) };
        let mut settings = unsafe { settings.assume_init() };
        settings.n_threads = 1;
        settings.max_frame_delay = 1;

        let mut decoder = Self { ctx: None };
        let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut decoder.ctx), NonNull::new(&mut settings)) };
        if rc.0 != 0 {
            return Err(failure(format!("rav1d open failed ({})", rc.0)));
        }
        Ok(decoder)
    }

    /// Feed one AV1 item and hand the resulting picture to `convert` while
    /// rav1d still owns its planes.
    fn decode<T>(self, item: &[u8], convert: impl FnOnce(&Dav1dPicture) -> Result<T>) -> Result<T> {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), item.len()) };
        if buf.is_null() {
            return Err(failure("rav1d data_create failed"));
        }
        unsafe { std::ptr::copy_nonoverlapping(item.as_ptr(), buf, item.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(self.ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(failure(format!("rav1d send_data failed ({})", rc.0)));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(self.ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(failure(format!("rav1d get_picture failed ({})", rc.0)));
        }
        let converted = convert(&pic);
        unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };
        converted
    }
}

impl Drop for Av1Decoder {
    fn drop(&mut self) {
        if self.ctx.is_some() {
            unsafe { dav1d::dav1d_close(NonNull::new(&mut self.ctx)) };
        }
    }
}

fn picture_size(pic: &Dav1dPicture) -> Result<(u32, u32, u32)> {
    let width = u32::try_from(pic.p.w).map_err(|_| failure("negative picture width"))?;
    let height = u32::try_from(pic.p.h).map_err(|_| failure("negative picture height"))?;
    let bpc = pic.p.bpc as u32;
    if !(1..=16).contains(&bpc) {
        return Err(failure(format!("unsupported AV1 bit depth {bpc}")));
    }
    Ok((width, height, bpc))
}

fn plane(pic: &Dav1dPicture, index: usize) -> Result<*const u8> {
    pic.data[index]
        .map(|p| p.as_ptr() as *const u8)
        .ok_or_else(|| failure(format!("AV1 picture is missing plane {index}")))
}

/// Full-range luma of an alpha item, scaled to 8 bits.
fn picture_to_alpha(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>)> {
    let (width, height, bpc) = picture_size(pic)?;
    let y_ptr = plane(pic, 0)?;
    let scale = 255.0 / ((1u32 << bpc) - 1) as f32;
    let alpha = (0..height)
        .flat_map(|row| (0..width).map(move |col| (row, col)))
        .map(|(row, col)| {
            let a = read_sample(y_ptr, pic.stride[0], col, row, bpc);
            (a * scale).round().clamp(0.0, 255.0) as u8
        })
        .collect();
    Ok((width, height, alpha))
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>)> {
    let (width, height, bpc) = picture_size(pic)?;
    let layout = pic.p.layout;
    let y_ptr = plane(pic, 0)?;

    let planes = if layout == DAV1D_PIXEL_LAYOUT_I400 {
        YuvPlanes {
            y_ptr,
            u_ptr: y_ptr,
            v_ptr: y_ptr,
            y_stride: pic.stride[0],
            uv_stride: 0,
            width,
            height,
            bpc,
            ss_x: false,
            ss_y: false,
            monochrome: true,
        }
    } else {
        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            _ => return Err(failure(format!("unsupported AV1 pixel layout: {layout}"))),
        };
        YuvPlanes {
            y_ptr,
            u_ptr: plane(pic, 1)?,
            v_ptr: plane(pic, 2)?,
            y_stride: pic.stride[0],
            uv_stride: pic.stride[1],
            width,
            height,
            bpc,
            ss_x,
            ss_y,
            monochrome: false,
        }
    };
    Ok((width, height, planes.to_rgb()))
}

/// Decoded YUV plane data from rav1d, ready for RGB conversion.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (e.g. I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Convert YUV planes to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in 0..self.height {
            for col in 0..self.width {
                let y = read_sample(self.y_ptr, self.y_stride, col, row, self.bpc);
                let [r, g, b] = if self.monochrome {
                    [y; 3]
                } else {
                    let u_col = if self.ss_x { col / 2 } else { col };
                    let u_row = if self.ss_y { row / 2 } else { row };
                    let cb = read_sample(self.u_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;
                    let cr = read_sample(self.v_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;
                    ycbcr_to_rgb(y, cb, cr)
                };
                rgb.extend([r, g, b].map(|v| (v * scale).round().clamp(0.0, 255.0) as u8));
            }
        }
        rgb
    }
}

/// BT.601 full-range YCbCr → RGB, chroma already centred on zero.
fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [f32; 3] {
    [
        y + 1.402 * cr,
        y - 0.344136 * cb - 0.714136 * cr,
        y + 1.772 * cb,
    ]
}

/// Read one sample from a plane; depths above 8 bits are stored as u16.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { (ptr.offset(byte_offset) as *const u16).read_unaligned() }) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_grey() {
        let [r, g, b] = ycbcr_to_rgb(100.0, 0.0, 0.0);
        assert_eq!((r, g, b), (100.0, 100.0, 100.0));
    }

    #[test]
    fn positive_cr_pushes_towards_red() {
        let [r, _, b] = ycbcr_to_rgb(100.0, 0.0, 50.0);
        assert!(r > 100.0);
        assert_eq!(b, 100.0);
    }

    #[test]
    fn i444_planes_convert_per_pixel() {
        let y = [10u8, 200];
        let u = [128u8, 128];
        let v = [128u8, 128];
        let planes = YuvPlanes {
            y_ptr: y.as_ptr(),
            u_ptr: u.as_ptr(),
            v_ptr: v.as_ptr(),
            y_stride: 2,
            uv_stride: 2,
            width: 2,
            height: 1,
            bpc: 8,
            ss_x: false,
            ss_y: false,
            monochrome: false,
        };
        assert_eq!(planes.to_rgb(), vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn straight_alpha_is_appended() {
        let rgba = interleave_alpha(&[10, 20, 30, 40, 50, 60], &[255, 7], false);
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 7]);
    }

    #[test]
    fn premultiplied_alpha_is_undone() {
        let rgba = interleave_alpha(&[50, 100, 0, 9, 9, 9], &[128, 0], true);
        assert_eq!(rgba, vec![100, 199, 0, 128, 0, 0, 0, 0]);
    }

    #[test]
    fn garbage_is_decode_failure() {
        assert!(matches!(
            decode(b"definitely not an avif"),
            Err(PipelineError::DecodeFailure(_))
        ));
    }
}
