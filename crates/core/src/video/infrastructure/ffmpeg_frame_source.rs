use crate::shared::frame::{Frame, RGB_CHANNELS};
use crate::video::domain::frame_source::FrameSource;

/// Where the ffmpeg source reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameInput {
    /// A capture device selected by index, resolved per platform.
    Camera(u32),
    /// Any URL or path ffmpeg can open, optionally forcing a demuxer
    /// (e.g. `v4l2`, `avfoundation`).
    Url { url: String, format: Option<String> },
}

impl FrameInput {
    /// Resolves to the URL and demuxer name handed to libavformat.
    fn locate(&self) -> Result<(String, Option<String>), String> {
        match self {
            FrameInput::Url { url, format } => Ok((url.clone(), format.clone())),
            FrameInput::Camera(index) => camera_location(*index),
        }
    }
}

fn camera_location(index: u32) -> Result<(String, Option<String>), String> {
    if cfg!(target_os = "linux") {
        Ok((format!("/dev/video{index}"), Some("video4linux2".to_string())))
    } else if cfg!(target_os = "macos") {
        Ok((index.to_string(), Some("avfoundation".to_string())))
    } else {
        Err(format!(
            "camera index {index} cannot be resolved on this platform; pass an input URL instead"
        ))
    }
}

/// Decodes frames from a camera or clip via ffmpeg-next (libavdevice +
/// libavformat + libavcodec), converting each to RGB24.
///
/// Clips can loop so that a recorded session stands in for a live camera.
pub struct FfmpegFrameSource {
    input: FrameInput,
    looping: bool,
    stream: Option<OpenStream>,
    fps: Option<f64>,
    next_index: usize,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(input: FrameInput) -> Self {
        Self {
            input,
            looping: false,
            stream: None,
            fps: None,
            next_index: 0,
        }
    }

    /// Rewind to the first frame at end of input instead of running dry.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn decode_next(&mut self) -> Result<Option<Frame>, ffmpeg_next::Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let mut frame = stream.next_frame(self.next_index)?;
        if frame.is_none() && self.looping {
            log::debug!("End of input reached, rewinding");
            stream.rewind()?;
            frame = stream.next_frame(self.next_index)?;
        }
        if frame.is_some() {
            self.next_index += 1;
        }
        Ok(frame)
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (url, format) = self.input.locate()?;
        let stream = OpenStream::open(&url, format.as_deref())?;
        log::info!(
            "Opened {url} ({}x{}, {})",
            stream.width,
            stream.height,
            stream
                .fps
                .map(|f| format!("{f:.1} fps"))
                .unwrap_or_else(|| "unknown fps".to_string())
        );
        self.fps = stream.fps;
        self.stream = Some(stream);
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Frame> {
        match self.decode_next() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Frame decode failed: {e}");
                None
            }
        }
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Released frame source");
        }
    }
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    fps: Option<f64>,
    eof: bool,
}

impl OpenStream {
    fn open(url: &str, demuxer: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let ictx = open_input(url, demuxer)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let rate = stream.rate();
        let fps = (rate.denominator() != 0 && rate.numerator() > 0)
            .then(|| rate.numerator() as f64 / rate.denominator() as f64);

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let (width, height) = (decoder.width(), decoder.height());

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            fps,
            eof: false,
        })
    }

    fn next_frame(&mut self, index: usize) -> Result<Option<Frame>, ffmpeg_next::Error> {
        loop {
            if let Some(frame) = self.receive(index)? {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }
            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if self.decoder.send_packet(&packet).is_err() {
                        continue;
                    }
                }
                None => {
                    self.decoder.send_eof()?;
                    self.eof = true;
                }
            }
        }
    }

    fn receive(&mut self, index: usize) -> Result<Option<Frame>, ffmpeg_next::Error> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, index)))
    }

    fn rewind(&mut self) -> Result<(), ffmpeg_next::Error> {
        self.ictx.seek(0, ..)?;
        self.decoder.flush();
        self.eof = false;
        Ok(())
    }
}

fn open_input(
    url: &str,
    demuxer: Option<&str>,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    let Some(name) = demuxer else {
        return Ok(ffmpeg_next::format::input(url)?);
    };
    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == name)
        .ok_or_else(|| format!("ffmpeg has no video input device '{name}'"))?;
    Ok(ffmpeg_next::format::open_with(url, &format, device_options())?.input())
}

/// Demuxer options for live devices: hand out packets as they arrive
/// instead of queueing them, so the live frame stays close to the camera.
fn device_options() -> ffmpeg_next::Dictionary<'static> {
    let mut options = ffmpeg_next::Dictionary::new();
    options.set("fflags", "nobuffer");
    options.set("max_delay", "0");
    options
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row padding (stride > width * 3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * RGB_CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
