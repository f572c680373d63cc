use std::fmt;

use bytemuck::{Pod, Zeroable};
use static_assertions::assert_eq_size;

/// Straight (non-premultiplied) RGBA8 pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

assert_eq_size!(Rgba8, u32);

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Channel-wise multiply, alpha included.
    pub fn tinted(self, tint: Rgba8) -> Self {
        let mul = |a: u8, b: u8| ((a as u32 * b as u32 + 127) / 255) as u8;
        Self::new(
            mul(self.r, tint.r),
            mul(self.g, tint.g),
            mul(self.b, tint.b),
            mul(self.a, tint.a),
        )
    }
}

/// `top` composited over `bottom`.
pub fn composite(bottom: Rgba8, top: Rgba8) -> Rgba8 {
    let top_alpha = top.a as u32;
    if top_alpha == 255 {
        return top;
    }
    if top_alpha == 0 {
        return bottom;
    }
    let bottom_alpha = bottom.a as u32 * (255 - top_alpha) / 255;
    let out_alpha = top_alpha + bottom_alpha;
    if out_alpha == 0 {
        return Rgba8::TRANSPARENT;
    }
    let mix = |t: u8, b: u8| {
        ((t as u32 * top_alpha + b as u32 * bottom_alpha + out_alpha / 2) / out_alpha) as u8
    };
    Rgba8::new(
        mix(top.r, bottom.r),
        mix(top.g, bottom.g),
        mix(top.b, bottom.b),
        out_alpha as u8,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `inner` is relative to `self`; the result is clipped to `self`.
    pub fn sub_rect(self, inner: PixelRect) -> PixelRect {
        let x = inner.x.min(self.width);
        let y = inner.y.min(self.height);
        PixelRect {
            x: self.x + x,
            y: self.y + y,
            width: inner.width.min(self.width - x),
            height: inner.height.min(self.height - y),
        }
    }
}

/// Overlap of a source rect placed at `(dst_x, dst_y)` with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClippedCopy {
    dst_x: u32,
    dst_y: u32,
    src_x: u32,
    src_y: u32,
    width: u32,
    height: u32,
}

fn clip_copy(
    dst_width: u32,
    dst_height: u32,
    dst_x: i64,
    dst_y: i64,
    src_rect: PixelRect,
) -> Option<ClippedCopy> {
    let skip_x = (-dst_x).max(0);
    let skip_y = (-dst_y).max(0);
    let start_x = dst_x.max(0);
    let start_y = dst_y.max(0);
    let width = (src_rect.width as i64 - skip_x).min(dst_width as i64 - start_x);
    let height = (src_rect.height as i64 - skip_y).min(dst_height as i64 - start_y);
    if width <= 0 || height <= 0 {
        return None;
    }
    Some(ClippedCopy {
        dst_x: start_x as u32,
        dst_y: start_y as u32,
        src_x: src_rect.x + skip_x as u32,
        src_y: src_rect.y + skip_y as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// CPU raster surface. Every drawing operation clips against the surface.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    // pixels.len() == width * height, row-major
    pixels: Box<[Rgba8]>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba8::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize].into_boxed_slice(),
        }
    }

    /// Wraps tightly packed RGBA8 bytes. `None` when the length does not match.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return None;
        }
        let pixels: &[Rgba8] = bytemuck::cast_slice(bytes);
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        self.pixels[self.offset(x, y)]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        let offset = self.offset(x, y);
        self.pixels[offset] = color;
    }

    /// Pixel at coordinates taken modulo the surface size.
    pub fn pixel_wrapped(&self, x: u32, y: u32) -> Rgba8 {
        self.pixel(x % self.width, y % self.height)
    }

    pub fn fill(&mut self, color: Rgba8) {
        self.pixels.fill(color);
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba8) {
        let Some(clip) = clip_copy(self.width, self.height, rect.x as i64, rect.y as i64, rect)
        else {
            return;
        };
        for row in 0..clip.height {
            let start = self.offset(clip.dst_x, clip.dst_y + row);
            self.pixels[start..start + clip.width as usize].fill(color);
        }
    }

    /// Straight copy, no blending.
    pub fn copy_from(&mut self, dst_x: i64, dst_y: i64, source: &Surface, src_rect: PixelRect) {
        let Some(clip) = clip_copy(self.width, self.height, dst_x, dst_y, src_rect) else {
            return;
        };
        for row in 0..clip.height {
            let src_start = source.offset(clip.src_x, clip.src_y + row);
            let dst_start = self.offset(clip.dst_x, clip.dst_y + row);
            let len = clip.width as usize;
            self.pixels[dst_start..dst_start + len]
                .copy_from_slice(&source.pixels[src_start..src_start + len]);
        }
    }

    /// Straight copy of `dst_rect` from a tileable source starting at `src_origin`.
    pub fn copy_wrapped(&mut self, dst_rect: PixelRect, source: &Surface, src_origin: (u32, u32)) {
        self.for_each_wrapped(dst_rect, source, src_origin, |_, src| src);
    }

    /// Destination-over: `source` is drawn beneath whatever `dst_rect` already holds.
    pub fn fill_under_wrapped(
        &mut self,
        dst_rect: PixelRect,
        source: &Surface,
        src_origin: (u32, u32),
    ) {
        self.for_each_wrapped(dst_rect, source, src_origin, |dst, src| composite(src, dst));
    }

    fn for_each_wrapped(
        &mut self,
        dst_rect: PixelRect,
        source: &Surface,
        src_origin: (u32, u32),
        mut blend: impl FnMut(Rgba8, Rgba8) -> Rgba8,
    ) {
        let Some(clip) = clip_copy(
            self.width,
            self.height,
            dst_rect.x as i64,
            dst_rect.y as i64,
            PixelRect::new(0, 0, dst_rect.width, dst_rect.height),
        ) else {
            return;
        };
        for row in 0..clip.height {
            let src_y = src_origin.1 + row;
            for column in 0..clip.width {
                let src = source.pixel_wrapped(src_origin.0 + column, src_y);
                let offset = self.offset(clip.dst_x + column, clip.dst_y + row);
                self.pixels[offset] = blend(self.pixels[offset], src);
            }
        }
    }

    /// Source-over draw of a sprite region.
    pub fn draw_sprite(&mut self, dst_x: i64, dst_y: i64, source: &Surface, src_rect: PixelRect) {
        self.blend_region(dst_x, dst_y, source, src_rect, composite);
    }

    /// Source-over draw with every source pixel multiplied by `tint`.
    pub fn draw_sprite_tinted(
        &mut self,
        dst_x: i64,
        dst_y: i64,
        source: &Surface,
        src_rect: PixelRect,
        tint: Rgba8,
    ) {
        self.blend_region(dst_x, dst_y, source, src_rect, |dst, src| {
            composite(dst, src.tinted(tint))
        });
    }

    /// Destination-out: destination alpha is reduced by the mask's alpha.
    pub fn erase_with_mask(&mut self, dst_x: i64, dst_y: i64, mask: &Surface, src_rect: PixelRect) {
        self.blend_region(dst_x, dst_y, mask, src_rect, |dst, src| {
            let keep = 255 - src.a as u32;
            dst.with_alpha(((dst.a as u32 * keep + 127) / 255) as u8)
        });
    }

    fn blend_region(
        &mut self,
        dst_x: i64,
        dst_y: i64,
        source: &Surface,
        src_rect: PixelRect,
        mut blend: impl FnMut(Rgba8, Rgba8) -> Rgba8,
    ) {
        let Some(clip) = clip_copy(self.width, self.height, dst_x, dst_y, src_rect) else {
            return;
        };
        for row in 0..clip.height {
            for column in 0..clip.width {
                let src = source.pixel(clip.src_x + column, clip.src_y + row);
                let offset = self.offset(clip.dst_x + column, clip.dst_y + row);
                self.pixels[offset] = blend(self.pixels[offset], src);
            }
        }
    }
}
