// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fitting a photo onto a page.
//
// The rule matches what the structured Windows print method does on the
// printer's own page bounds:
//   1. rotate the image 90° when its orientation disagrees with the page,
//   2. scale by max(page_w / img_w, page_h / img_h) so the page is covered,
//   3. crop the overflow equally from both sides.
// For templated jobs the same rule is applied here, ahead of time, to render
// a page-sized image with the `image` crate.

use std::path::Path;

use image::imageops::FilterType;
use tracing::{debug, instrument};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::types::PageSize;

/// Resolution used when rendering template pages.
pub const TEMPLATE_DPI: u32 = 300;

/// Region of the (possibly rotated) source image that ends up on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// How an image maps onto a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    /// Rotate the source 90° clockwise before scaling.
    pub rotate: bool,
    /// Source pixels to page pixels, applied after rotation.
    pub scale: f64,
    /// Visible part of the source, in post-rotation coordinates.
    pub crop: CropRect,
}

fn is_landscape(width: u32, height: u32) -> bool {
    width > height
}

/// Compute rotation, cover scale and centred crop for an image on a page.
///
/// All dimensions must be non-zero.
pub fn fit_to_page(image_w: u32, image_h: u32, page_w: u32, page_h: u32) -> PageFit {
    let rotate = is_landscape(image_w, image_h) != is_landscape(page_w, page_h);
    let (w, h) = if rotate {
        (image_h, image_w)
    } else {
        (image_w, image_h)
    };

    let scale = f64::max(
        f64::from(page_w) / f64::from(w),
        f64::from(page_h) / f64::from(h),
    );

    let crop_w = ((f64::from(page_w) / scale).round() as u32).clamp(1, w);
    let crop_h = ((f64::from(page_h) / scale).round() as u32).clamp(1, h);

    PageFit {
        rotate,
        scale,
        crop: CropRect {
            x: (w - crop_w) / 2,
            y: (h - crop_h) / 2,
            width: crop_w,
            height: crop_h,
        },
    }
}

/// Render `source` onto a page of `page` inches at `dpi` and save it as PNG
/// at `dest`.
///
/// CPU bound; call from `spawn_blocking`.
#[instrument(skip_all, fields(source = %source.display(), dest = %dest.display()))]
pub fn render_page(source: &Path, page: PageSize, dpi: u32, dest: &Path) -> Result<()> {
    if !page.is_valid() {
        return Err(PhotoprintError::Render(format!(
            "invalid page size {}x{} in",
            page.width_inch, page.height_inch
        )));
    }

    let img = image::open(source)
        .map_err(|e| PhotoprintError::Render(format!("decode {}: {e}", source.display())))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PhotoprintError::Render("image has no pixels".into()));
    }

    let (page_w, page_h) = page.pixels_at(dpi);
    let fit = fit_to_page(img.width(), img.height(), page_w, page_h);
    debug!(
        rotate = fit.rotate,
        scale = fit.scale,
        crop_w = fit.crop.width,
        crop_h = fit.crop.height,
        page_w,
        page_h,
        "fitting image to template page"
    );

    let oriented = if fit.rotate { img.rotate90() } else { img };
    let page_image = oriented
        .crop_imm(fit.crop.x, fit.crop.y, fit.crop.width, fit.crop.height)
        .resize_exact(page_w, page_h, FilterType::Lanczos3);

    page_image
        .save_with_format(dest, image::ImageFormat::Png)
        .map_err(|e| PhotoprintError::Render(format!("write {}: {e}", dest.display())))?;
    Ok(())
}
