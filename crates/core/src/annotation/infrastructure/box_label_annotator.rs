use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, Canvas};
use imageproc::rect::Rect;

use super::bitmap_font::{draw_text_mut, text_size};
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::constants::{BOX_COLOR, BOX_THICKNESS, LABEL_COLOR, LABEL_OFFSET, LABEL_SCALE};
use crate::shared::detection::Detection;
use crate::shared::frame::{luminance, Frame};

/// Outlines each face and writes its caption above the box.
///
/// The caption's bottom edge sits `LABEL_OFFSET` pixels above the box's top
/// edge and is clipped, not moved, when it runs off the frame.
pub struct BoxLabelAnnotator {
    box_color: [u8; 3],
    label_color: [u8; 3],
    thickness: u32,
    label_scale: u32,
}

impl BoxLabelAnnotator {
    pub fn new() -> Self {
        Self {
            box_color: BOX_COLOR,
            label_color: LABEL_COLOR,
            thickness: BOX_THICKNESS,
            label_scale: LABEL_SCALE,
        }
    }

    fn draw_all<P, C>(&self, canvas: &mut C, detections: &[Detection], box_px: P, label_px: P)
    where
        P: Pixel,
        C: Canvas<Pixel = P>,
    {
        for det in detections {
            let r = det.bbox;
            for inset in 0..self.thickness {
                let w = r.width.saturating_sub(2 * inset);
                let h = r.height.saturating_sub(2 * inset);
                if w == 0 || h == 0 {
                    break;
                }
                let rect = Rect::at((r.x + inset) as i32, (r.y + inset) as i32).of_size(w, h);
                draw_hollow_rect_mut(canvas, rect, box_px);
            }

            let caption = det.caption();
            let (_, text_h) = text_size(&caption, self.label_scale);
            let text_y = r.y as i32 - LABEL_OFFSET as i32 - text_h as i32;
            draw_text_mut(canvas, label_px, r.x as i32, text_y, self.label_scale, &caption);
        }
    }
}

impl Default for BoxLabelAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator for BoxLabelAnnotator {
    fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Frame {
        if detections.is_empty() {
            return frame.clone();
        }
        let (w, h) = (frame.width(), frame.height());

        let data = match frame.channels() {
            3 => {
                let Some(mut img): Option<RgbImage> = ImageBuffer::from_raw(w, h, frame.data().to_vec()) else {
                    log::warn!("Frame {} has inconsistent dimensions; not annotated", frame.index());
                    return frame.clone();
                };
                self.draw_all(&mut img, detections, Rgb(self.box_color), Rgb(self.label_color));
                img.into_raw()
            }
            1 => {
                let Some(mut img): Option<GrayImage> = ImageBuffer::from_raw(w, h, frame.data().to_vec()) else {
                    log::warn!("Frame {} has inconsistent dimensions; not annotated", frame.index());
                    return frame.clone();
                };
                let [br, bg, bb] = self.box_color;
                let [lr, lg, lb] = self.label_color;
                self.draw_all(
                    &mut img,
                    detections,
                    Luma([luminance(br, bg, bb)]),
                    Luma([luminance(lr, lg, lb)]),
                );
                img.into_raw()
            }
            n => {
                log::warn!("Cannot annotate {n}-channel frame {}", frame.index());
                return frame.clone();
            }
        };

        Frame::new(data, w, h, frame.channels(), frame.index())
    }
}
