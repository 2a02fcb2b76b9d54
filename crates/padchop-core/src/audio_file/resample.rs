//! Offline sample-rate conversion with a rubato `FastFixedIn` resampler
//!
//! The whole file is converted at load time. The resampler's output delay is
//! trimmed and the result is cut to `round(len * to / from)` frames, so cue
//! positions in seconds line up with the original file.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::DecodeError;
use crate::types::Sample;

/// Input frames per rubato call
const CHUNK_FRAMES: usize = 1024;

/// Convert channel-separated audio from `from_rate` to `to_rate`
///
/// Equal rates return a copy of the input.
pub fn resample(
    channels: &[Vec<Sample>],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<Vec<Sample>>, DecodeError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(DecodeError::Resample(format!(
            "invalid rates {}Hz -> {}Hz",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || channels.is_empty() {
        return Ok(channels.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let channel_count = channels.len();
    let input_len = channels[0].len();
    let expected = (input_len as f64 * ratio).round() as usize;

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Cubic,
        CHUNK_FRAMES,
        channel_count,
    )
    .map_err(|e| DecodeError::Resample(format!("resampler init: {e}")))?;

    let delay = resampler.output_delay();
    let mut output_buf = vec![vec![0f32; resampler.output_frames_max()]; channel_count];
    let mut resampled: Vec<Vec<Sample>> =
        vec![Vec::with_capacity(expected + delay + CHUNK_FRAMES); channel_count];

    let mut pos = 0;
    while pos < input_len {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input_len);
        let slices: Vec<&[f32]> = channels.iter().map(|c| &c[pos..end]).collect();

        let result = if end - pos == needed {
            resampler.process_into_buffer(&slices[..], &mut output_buf[..], None)
        } else {
            resampler.process_partial_into_buffer(Some(&slices[..]), &mut output_buf[..], None)
        };
        let (_, produced) = result.map_err(|e| DecodeError::Resample(e.to_string()))?;
        append_frames(&mut resampled, &output_buf, produced);
        pos = end;
    }

    // Push zeros through until the delayed tail is out
    while resampled[0].len() < expected + delay {
        let (_, produced) = resampler
            .process_partial_into_buffer(None::<&[&[f32]]>, &mut output_buf[..], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        if produced == 0 {
            break;
        }
        append_frames(&mut resampled, &output_buf, produced);
    }

    for channel in &mut resampled {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }

    log::debug!(
        "Resampled {} frames {}Hz -> {} frames {}Hz",
        input_len,
        from_rate,
        expected,
        to_rate
    );

    Ok(resampled)
}

fn append_frames(resampled: &mut [Vec<Sample>], output_buf: &[Vec<f32>], produced: usize) {
    for (dst, src) in resampled.iter_mut().zip(output_buf) {
        dst.extend_from_slice(&src[..produced]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, freq: f32, rate: u32) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_same_rate_is_copy() {
        let input = vec![vec![0.1, 0.2, 0.3]];
        assert_eq!(resample(&input, 48000, 48000).unwrap(), input);
    }

    #[test]
    fn test_output_length() {
        let input = vec![sine(44100, 440.0, 44100), vec![0.0; 44100]];
        let out = resample(&input, 44100, 48000).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 48000);
        assert_eq!(out[1].len(), 48000);

        let down = resample(&[vec![0.0; 4800]], 48000, 16000).unwrap();
        assert_eq!(down[0].len(), 1600);
    }

    #[test]
    fn test_preserves_level_and_alignment() {
        let input = vec![sine(48000, 220.0, 48000)];
        let out = resample(&input, 48000, 44100).unwrap();
        let expected = sine(44100, 220.0, 44100);
        // Skip the edges, where the filter sees the zero padding
        let max_err = out[0][1000..43000]
            .iter()
            .zip(&expected[1000..43000])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 0.1, "max error {}", max_err);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(resample(&[vec![0.0; 10]], 0, 48000).is_err());
    }
}
