// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tracking feed reader.
//!
//! The analytics service pushes annotated frames as a
//! `multipart/x-mixed-replace` stream of JPEG parts. A background thread
//! splits the stream into parts, decodes them, and hands the frames to the
//! event loop tagged with the session generation they belong to.

use super::client::ServiceClient;
use super::media::VideoFrame;
use crate::util::geometry::NativeSize;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

const DEFAULT_BOUNDARY: &str = "frame";
const READ_CHUNK: usize = 16 * 1024;
const MAX_PART_BYTES: usize = 32 * 1024 * 1024;

/// Extract the multipart boundary from a content type header.
pub fn boundary_from_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').trim_start_matches("--").to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BOUNDARY.to_string())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Splits a multipart/x-mixed-replace body into part payloads.
pub struct MjpegReader<R> {
    inner: R,
    marker: Vec<u8>,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: Read> MjpegReader<R> {
    pub fn new(inner: R, boundary: &str) -> Self {
        Self {
            inner,
            marker: format!("--{}", boundary).into_bytes(),
            buf: Vec::new(),
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        if self.buf.len() > MAX_PART_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "feed part exceeds size limit"));
        }
        Ok(())
    }

    /// Read the next part's body, `None` once the stream ends.
    pub fn next_part(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let Some(start) = find(&self.buf, &self.marker, 0) else {
                if self.eof {
                    return Ok(None);
                }
                self.fill()?;
                continue;
            };
            let body_start = start + self.marker.len();
            if self.buf[body_start..].starts_with(b"--") {
                // Closing boundary.
                return Ok(None);
            }
            let end = match find(&self.buf, &self.marker, body_start) {
                Some(end) => end,
                None if self.eof => self.buf.len(),
                None => {
                    self.fill()?;
                    continue;
                }
            };
            let part: Vec<u8> = self.buf[body_start..end].to_vec();
            self.buf.drain(..end);
            match parse_part(&part) {
                Some(body) => return Ok(Some(body)),
                None if self.eof && self.buf.is_empty() => return Ok(None),
                None => continue,
            }
        }
    }
}

/// Strip part headers and the trailing line break from one part.
fn parse_part(part: &[u8]) -> Option<Vec<u8>> {
    let headers_end = find(part, b"\r\n\r\n", 0)?;
    let headers = String::from_utf8_lossy(&part[..headers_end]);
    let mut body = &part[headers_end + 4..];

    let content_length = headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    });
    match content_length {
        Some(len) if len <= body.len() => body = &body[..len],
        _ => {
            if let Some(stripped) = body.strip_suffix(b"\r\n") {
                body = stripped;
            }
        }
    }
    (!body.is_empty()).then(|| body.to_vec())
}

/// Decode one JPEG part into an RGBA frame.
pub fn decode_frame(bytes: &[u8]) -> Result<VideoFrame, image::ImageError> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
    let rgba = image.to_rgba8();
    Ok(VideoFrame {
        size: NativeSize::new(rgba.width(), rgba.height()),
        rgba: rgba.into_raw(),
    })
}

/// Message from a feed thread to the event loop.
pub enum FeedEvent {
    Frame { generation: u64, frame: VideoFrame },
    Ended { generation: u64, error: Option<String> },
}

/// Handle to a running feed thread.
pub struct FeedHandle {
    stop: Arc<AtomicBool>,
}

impl FeedHandle {
    /// Handle for a reader thread polling `stop`.
    pub(super) fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    /// Ask the feed thread to stop after its current frame.
    pub fn close(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Start reading the tracking feed on a background thread.
///
/// `wake` is called after every message so the event loop repaints.
pub fn spawn_feed<F>(client: ServiceClient, generation: u64, sender: Sender<FeedEvent>, wake: F) -> FeedHandle
where
    F: Fn() + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();

    std::thread::spawn(move || {
        let result = (|| -> Result<(), String> {
            let (content_type, response) = client.open_feed().map_err(|e| e.to_string())?;
            let boundary = boundary_from_content_type(&content_type);
            log::info!("Tracking feed {} open (boundary {})", generation, boundary);
            let mut reader = MjpegReader::new(response, &boundary);

            while !flag.load(Ordering::Relaxed) {
                let Some(part) = reader.next_part().map_err(|e| e.to_string())? else {
                    break;
                };
                match decode_frame(&part) {
                    Ok(frame) => {
                        if sender.send(FeedEvent::Frame { generation, frame }).is_err() {
                            break;
                        }
                        wake();
                    }
                    Err(e) => log::debug!("Skipping undecodable feed part: {}", e),
                }
            }
            Ok(())
        })();

        if !flag.load(Ordering::Relaxed) {
            let _ = sender.send(FeedEvent::Ended {
                generation,
                error: result.err(),
            });
            wake();
        }
        log::info!("Tracking feed {} closed", generation);
    });

    FeedHandle::new(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(out.len()).min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn stream(parts: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            out.extend_from_slice(part);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; boundary=frame"),
            "frame"
        );
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace;boundary=\"--abc\""),
            "abc"
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), "frame");
    }

    #[test]
    fn test_reader_splits_parts() {
        let data = stream(&[b"first", b"second\r\npayload", b"third"]);
        let mut reader = MjpegReader::new(Cursor::new(data), "frame");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"first");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"second\r\npayload");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"third");
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_reader_handles_small_reads() {
        let data = stream(&[b"aaaaaaaaaa", b"bbbbbbbbbb"]);
        let mut reader = MjpegReader::new(Trickle { data, pos: 0, step: 3 }, "frame");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"aaaaaaaaaa");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"bbbbbbbbbb");
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_reader_honours_content_length() {
        let data = b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\nabcXX\r\n--frame--\r\n".to_vec();
        let mut reader = MjpegReader::new(Cursor::new(data), "frame");
        assert_eq!(reader.next_part().unwrap().unwrap(), b"abc");
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_decode_frame_reads_jpeg() {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let frame = decode_frame(&jpeg).unwrap();
        assert_eq!(frame.size, NativeSize::new(4, 3));
        assert_eq!(frame.rgba.len(), 4 * 3 * 4);
    }

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(decode_frame(b"not a jpeg").is_err());
    }
}
