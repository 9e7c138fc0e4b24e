use crate::shared::frame::Frame;
use crate::shared::startup_error::StartupError;
use crate::video::domain::frame_source::{AcquisitionError, FrameSource, SourceSpec};

/// Pulls frames from a capture device or media file via ffmpeg-next.
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// Decoding is lazy: one `acquire` reads only as many packets as it takes
/// to produce the next picture.
pub struct FfmpegFrameSource {
    state: Option<DecodeState>,
    name: String,
}

// Safety: FfmpegFrameSource is owned by exactly one pipeline and only used
// from one thread at a time. The raw pointers inside ffmpeg types are never
// shared across threads.
unsafe impl Send for FfmpegFrameSource {}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameSource {
    /// Opens the device or file. Failure here is fatal for the caller.
    pub fn open(spec: &SourceSpec) -> Result<Self, StartupError> {
        let name = spec.to_string();
        let open_error = |message: String| StartupError::SourceOpen {
            source_name: name.clone(),
            message,
        };

        ffmpeg_next::init().map_err(|e| open_error(e.to_string()))?;

        let ictx = match spec {
            SourceSpec::File(path) => ffmpeg_next::format::input(path),
            SourceSpec::Device(index) => open_device(*index),
        }
        .map_err(|e| open_error(e.to_string()))?;

        let (video_stream_index, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| open_error("no video stream found".to_string()))?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| open_error(e.to_string()))?;
            let decoder = codec_ctx
                .decoder()
                .video()
                .map_err(|e| open_error(e.to_string()))?;
            (stream.index(), decoder)
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_error(e.to_string()))?;

        log::info!("Opened {name} ({width}x{height})");

        Ok(Self {
            state: Some(DecodeState {
                ictx,
                decoder,
                scaler,
                width,
                height,
                video_stream_index,
                frame_index: 0,
                flushing: false,
                done: false,
            }),
            name,
        })
    }

    /// Native frame size, or `None` once released.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|s| (s.width, s.height))
    }
}

impl FrameSource for FfmpegFrameSource {
    fn acquire(&mut self) -> Result<Frame, AcquisitionError> {
        let state = self.state.as_mut().ok_or(AcquisitionError::Released)?;
        state.next_frame()
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Released {}", self.name);
        }
    }
}

impl DecodeState {
    fn next_frame(&mut self) -> Result<Frame, AcquisitionError> {
        if self.done {
            return Err(AcquisitionError::EndOfStream);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(frame);
        }

        if self.flushing {
            self.done = true;
            return Err(AcquisitionError::EndOfStream);
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    if let Some(frame) = self.try_receive()? {
                        return Ok(frame);
                    }
                    self.done = true;
                    return Err(AcquisitionError::EndOfStream);
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                    continue;
                }
                Err(e) => {
                    self.done = true;
                    return Err(AcquisitionError::Disconnected(e.to_string()));
                }
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(frame);
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, AcquisitionError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| AcquisitionError::Decode(e.to_string()))?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Opens a capture device through the platform's ffmpeg input device.
fn open_device(index: u32) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    ffmpeg_next::device::register_all();
    let (format_name, url) = device_locator(index).ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == format_name)
        .ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
    let ctx = ffmpeg_next::format::open_with(
        &url,
        &ffmpeg_next::format::Format::Input(format),
        ffmpeg_next::Dictionary::new(),
    )?;
    Ok(ctx.input())
}

/// Input device name and URL for a camera ordinal on this platform.
fn device_locator(index: u32) -> Option<(&'static str, String)> {
    #[cfg(target_os = "linux")]
    {
        Some(("video4linux2,v4l2", format!("/dev/video{index}")))
    }
    #[cfg(target_os = "macos")]
    {
        Some(("avfoundation", format!("{index}")))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = index;
        None
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
