//! In-memory surface.
//!
//! Backs the host simulation and the tests: every fill and frame push lands
//! in a plain `Vec<u16>` that can be inspected pixel by pixel.

use crate::app::ports::{Region, SurfacePort};
use crate::color::Rgb565;
use crate::error::SurfaceError;

pub struct FrameBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
    pushes: usize,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            pushes: 0,
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .map(Rgb565)
    }

    /// `true` if every pixel of `area` has `color`.
    pub fn region_is(&self, area: Region, color: Rgb565) -> bool {
        (area.y..area.y + area.height)
            .all(|y| (area.x..area.x + area.width).all(|x| self.pixel(x, y) == Some(color)))
    }

    /// Number of distinct pixels in `area` that differ from `color`.
    pub fn count_not(&self, area: Region, color: Rgb565) -> usize {
        (area.y..area.y + area.height)
            .flat_map(|y| (area.x..area.x + area.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.pixel(x, y) != Some(color))
            .count()
    }

    /// Fills plus frame pushes seen so far.
    pub fn transfers(&self) -> usize {
        self.pushes
    }

    fn check(&self, area: Region) -> Result<(), SurfaceError> {
        if area.fits(self.width, self.height) {
            Ok(())
        } else {
            Err(SurfaceError::OutOfBounds)
        }
    }
}

impl SurfacePort for FrameBuffer {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn fill_region(&mut self, area: Region, color: Rgb565) -> Result<(), SurfaceError> {
        self.check(area)?;
        let stride = self.width as usize;
        for y in area.y as usize..(area.y + area.height) as usize {
            let row = y * stride;
            self.pixels[row + area.x as usize..row + (area.x + area.width) as usize].fill(color.raw());
        }
        self.pushes += 1;
        Ok(())
    }

    fn push_frame(&mut self, area: Region, pixels: &[u16]) -> Result<(), SurfaceError> {
        self.check(area)?;
        if pixels.len() < area.pixel_count() {
            return Err(SurfaceError::OutOfBounds);
        }
        let stride = self.width as usize;
        let width = area.width as usize;
        for (i, src) in pixels.chunks_exact(width).take(area.height as usize).enumerate() {
            let row = (area.y as usize + i) * stride + area.x as usize;
            self.pixels[row..row + width].copy_from_slice(src);
        }
        self.pushes += 1;
        Ok(())
    }
}
