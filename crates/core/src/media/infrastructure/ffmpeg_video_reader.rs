use std::path::Path;

use crate::media::domain::frame_source::FrameSource;
use crate::shared::constants::VIDEO_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Whether `path` has a video container extension (case-insensitive).
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decodes a video file via ffmpeg-next into RGB frames indexed from 1.
///
/// The decoder and RGB scaler are built in `open`, so `frames` only pulls
/// packets. Frames are decoded one at a time; long recordings are never
/// buffered.
pub struct FfmpegVideoReader {
    video: Option<OpenVideo>,
}

struct OpenVideo {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: the reader is driven from one thread at a time and never shares
// the raw ffmpeg contexts it owns.
unsafe impl Send for FfmpegVideoReader {}

impl FfmpegVideoReader {
    pub fn new() -> Self {
        Self { video: None }
    }
}

impl Default for FfmpegVideoReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegVideoReader {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| format!("No video stream in {}", path.display()))?;
        let stream_index = stream.index();
        let total_frames = stream.frames().max(0) as usize;

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
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

        log::info!(
            "Opened video {} ({width}x{height}, ~{total_frames} frames)",
            path.display()
        );
        self.video = Some(OpenVideo {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        Ok(SourceMetadata {
            total_frames,
            source_path: Some(path.to_path_buf()),
            frame_paths: Vec::new(),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(video) = self.video.as_mut() else {
            return Box::new(std::iter::once(Err("video reader is not open".into())));
        };
        Box::new(VideoFrames {
            video,
            next_index: 1,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.video = None;
    }
}

struct VideoFrames<'a> {
    video: &'a mut OpenVideo,
    next_index: usize,
    flushing: bool,
    done: bool,
}

impl VideoFrames<'_> {
    /// Next decoded frame already buffered in the decoder, if any.
    fn receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.video.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.video.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let pixels = packed_rgb(&rgb, self.video.width, self.video.height);
        let frame = Frame::new(
            pixels,
            self.video.width,
            self.video.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for VideoFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(frame) = self.receive() {
            return Some(frame);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.video.input.packets().next() else {
                // Drain what the decoder still holds
                let _ = self.video.decoder.send_eof();
                self.flushing = true;
                let frame = self.receive();
                self.done = frame.is_none();
                return frame;
            };
            if stream.index() != self.video.stream_index {
                continue;
            }
            if let Err(e) = self.video.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }
            if let Some(frame) = self.receive() {
                return Some(frame);
            }
        }
    }
}

/// Row-packed RGB24 bytes; ffmpeg rows may carry stride padding.
fn packed_rgb(frame: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    frame
        .data(0)
        .chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}
