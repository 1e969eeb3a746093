//! WAV encoding and decoding.

use std::io::Write;
use std::path::Path;

use sd_engine::Frame;
use sd_ir::{AudioBuffer, Sample};

use crate::FormatError;

const FORMAT_PCM: u16 = 1;
const FORMAT_FLOAT: u16 = 3;

// --- Writing ---

/// 44-byte header for 16-bit stereo PCM holding `frames` frames.
fn header(frames: usize, sample_rate: u32) -> [u8; 44] {
    const CHANNELS: u16 = 2;
    const BITS: u16 = 16;
    let block_align = CHANNELS * (BITS / 8);
    let data_size = (frames as u32).saturating_mul(block_align as u32);

    let mut h = [0u8; 44];
    let fields: [(usize, &[u8]); 13] = [
        (0, b"RIFF"),
        (4, &36u32.saturating_add(data_size).to_le_bytes()),
        (8, b"WAVE"),
        (12, b"fmt "),
        (16, &16u32.to_le_bytes()),
        (20, &FORMAT_PCM.to_le_bytes()),
        (22, &CHANNELS.to_le_bytes()),
        (24, &sample_rate.to_le_bytes()),
        (28, &(sample_rate * block_align as u32).to_le_bytes()),
        (32, &block_align.to_le_bytes()),
        (34, &BITS.to_le_bytes()),
        (36, b"data"),
        (40, &data_size.to_le_bytes()),
    ];
    for (at, bytes) in fields {
        h[at..at + bytes.len()].copy_from_slice(bytes);
    }
    h
}

fn frame_bytes(frame: &Frame) -> [u8; 4] {
    let (l, r) = frame.to_i16();
    let (l, r) = (l.to_le_bytes(), r.to_le_bytes());
    [l[0], l[1], r[0], r[1]]
}

/// Write frames as a 16-bit stereo WAV stream. Samples are clamped to
/// full scale.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&header(frames.len(), sample_rate))?;
    for frame in frames {
        w.write_all(&frame_bytes(frame))?;
    }
    Ok(())
}

/// Encode frames as an in-memory 16-bit stereo WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + frames.len() * 4);
    buf.extend_from_slice(&header(frames.len(), sample_rate));
    for frame in frames {
        buf.extend_from_slice(&frame_bytes(frame));
    }
    buf
}

// --- Reading ---

/// Decode a WAV file from raw bytes.
///
/// Accepts 8/16/24-bit integer PCM and 32-bit float, mono or stereo.
pub fn load_wav(data: &[u8], name: &str) -> Result<Sample, FormatError> {
    let header = parse_header(data)?;
    let end = (header.data_offset + header.data_size).min(data.len());
    let raw = &data[header.data_offset..end];
    let interleaved = decode_samples(raw, &header)?;
    let buffer = AudioBuffer::from_interleaved(header.num_channels, &interleaved);
    Ok(Sample::new(name, buffer, header.sample_rate))
}

/// Read and decode a WAV file, naming the sample after the file stem.
pub fn load_wav_file(path: impl AsRef<Path>) -> Result<Sample, FormatError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("sample");
    load_wav(&data, name)
}

struct WavHeader {
    format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || pos + 24 > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            let format = read_u16_le(data, pos + 8);
            let channels = read_u16_le(data, pos + 10);
            let rate = read_u32_le(data, pos + 12);
            let bits = read_u16_le(data, pos + 22);
            fmt = Some((format, channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos = pos.saturating_add(8 + chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (format, num_channels, sample_rate, bits_per_sample) = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::UnexpectedEof)?;

    let supported = matches!((format, bits_per_sample), (FORMAT_PCM, 8 | 16 | 24) | (FORMAT_FLOAT, 32));
    if !supported || !(1..=2).contains(&num_channels) || sample_rate == 0 {
        return Err(FormatError::Unsupported { format, bits: bits_per_sample, channels: num_channels });
    }

    Ok(WavHeader { format, num_channels, sample_rate, bits_per_sample, data_offset, data_size })
}

/// Decode interleaved samples to f32 in -1.0..1.0.
fn decode_samples(raw: &[u8], header: &WavHeader) -> Result<Vec<f32>, FormatError> {
    let samples = match (header.format, header.bits_per_sample) {
        // 8-bit WAV is unsigned, centered on 128
        (FORMAT_PCM, 8) => raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
        (FORMAT_PCM, 16) => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
        (FORMAT_PCM, 24) => raw
            .chunks_exact(3)
            .map(|c| (i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8) as f32 / 8_388_608.0)
            .collect(),
        (FORMAT_FLOAT, 32) => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        (format, bits) => {
            return Err(FormatError::Unsupported { format, bits, channels: header.num_channels })
        }
    };
    Ok(samples)
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal WAV file from raw parameters.
    fn make_wav(format: u16, channels: u16, sample_rate: u32, bits: u16, pcm_data: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm_data.len() as u32;

        let mut buf = Vec::new();
        buf.extend(b"RIFF");
        buf.extend(&(36 + data_size).to_le_bytes());
        buf.extend(b"WAVE");
        buf.extend(b"fmt ");
        buf.extend(&16u32.to_le_bytes());
        buf.extend(&format.to_le_bytes());
        buf.extend(&channels.to_le_bytes());
        buf.extend(&sample_rate.to_le_bytes());
        buf.extend(&byte_rate.to_le_bytes());
        buf.extend(&block_align.to_le_bytes());
        buf.extend(&bits.to_le_bytes());
        buf.extend(b"data");
        buf.extend(&data_size.to_le_bytes());
        buf.extend(pcm_data);
        buf
    }

    #[test]
    fn load_8bit_mono() {
        let wav = make_wav(1, 1, 22050, 8, &[128, 255, 0, 192]);
        let sample = load_wav(&wav, "test").unwrap();
        assert_eq!(sample.sample_rate, 22050);
        assert_eq!(sample.frames(), 4);
        assert_eq!(sample.data.channel(0), &[0.0, 127.0 / 128.0, -1.0, 0.5]);
    }

    #[test]
    fn load_16bit_stereo() {
        let pcm: Vec<u8> = [16384i16, -16384, -32768, 0].iter().flat_map(|&v| v.to_le_bytes()).collect();
        let wav = make_wav(1, 2, 44100, 16, &pcm);
        let sample = load_wav(&wav, "stereo").unwrap();
        assert_eq!(sample.data.channels(), 2);
        assert_eq!(sample.data.channel(0), &[0.5, -1.0]);
        assert_eq!(sample.data.channel(1), &[-0.5, 0.0]);
        assert_eq!(sample.name.as_str(), "stereo");
    }

    #[test]
    fn load_24bit_and_float() {
        let wav = make_wav(1, 1, 48000, 24, &[0x00, 0x00, 0x40, 0x00, 0x00, 0xC0]);
        let sample = load_wav(&wav, "s24").unwrap();
        assert_eq!(sample.data.channel(0), &[0.5, -0.5]);

        let pcm: Vec<u8> = [0.25f32, -0.75].iter().flat_map(|v| v.to_le_bytes()).collect();
        let wav = make_wav(3, 1, 48000, 32, &pcm);
        let sample = load_wav(&wav, "f32").unwrap();
        assert_eq!(sample.data.channel(0), &[0.25, -0.75]);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut wav = make_wav(1, 1, 8000, 8, &[128, 128]);
        // Splice a LIST chunk between fmt and data
        let list = [b"LIST".as_slice(), &3u32.to_le_bytes(), &[1, 2, 3, 0]].concat();
        wav.splice(36..36, list);
        let sample = load_wav(&wav, "list").unwrap();
        assert_eq!(sample.frames(), 2);
    }

    #[test]
    fn unsupported_encodings_rejected() {
        let wav = make_wav(1, 1, 8000, 12, &[0, 0]);
        assert!(matches!(load_wav(&wav, "x"), Err(FormatError::Unsupported { bits: 12, .. })));
        let wav = make_wav(1, 4, 8000, 16, &[0; 8]);
        assert!(matches!(load_wav(&wav, "x"), Err(FormatError::Unsupported { channels: 4, .. })));
    }

    #[test]
    fn invalid_header_rejected() {
        assert!(matches!(load_wav(b"not a wav file", "bad"), Err(FormatError::InvalidHeader)));
        assert!(matches!(load_wav(&[0; 10], "short"), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn written_header_and_data() {
        let frames = [Frame::new(0.5, -0.5), Frame::new(2.0, 0.0)];
        let bytes = frames_to_wav(&frames, 44100);
        assert_eq!(bytes.len(), 44 + 8);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(read_u32_le(&bytes, 4), 36 + 8);
        assert_eq!(read_u32_le(&bytes, 24), 44100);
        assert_eq!(read_u32_le(&bytes, 40), 8);
        assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), 16384);
        assert_eq!(i16::from_le_bytes([bytes[48], bytes[49]]), 32767);

        let mut streamed = Vec::new();
        write_wav(&mut streamed, &frames, 44100).unwrap();
        assert_eq!(streamed, bytes);
    }

    #[test]
    fn written_file_loads_back() {
        let frames: Vec<Frame> = (0..100).map(|i| Frame::mono(i as f32 / 200.0)).collect();
        let sample = load_wav(&frames_to_wav(&frames, 22050), "bounce").unwrap();
        assert_eq!(sample.frames(), 100);
        assert_eq!(sample.sample_rate, 22050);
        assert!((sample.data.channel(1)[50] - 0.25).abs() < 1e-3);
    }
}
