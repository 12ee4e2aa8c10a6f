//! BlazeFace face detector using ONNX Runtime via `ort`.
//!
//! The model is loaded once per [`BlazefaceDetectorFactory`]; retuning only
//! builds a new detector value around the shared session with a different
//! minimum confidence.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::detection::domain::detection_parameter::DetectionParameter;
use crate::detection::domain::face_detector::{FaceDetector, FaceDetectorFactory};
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::frame::Frame;
use crate::shared::region::{Region, DEFAULT_IOU_THRESHOLD};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Sigmoid scores live in (0, 1); a threshold above 1 can never match.
const MAX_CONFIDENCE: f64 = 1.0;

/// Loads the BlazeFace model and hands out detectors for a given confidence.
pub struct BlazefaceDetectorFactory {
    session: Arc<Mutex<ort::session::Session>>,
    anchors: Arc<Vec<[f32; 2]>>,
}

impl BlazefaceDetectorFactory {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded BlazeFace model from {}", model_path.display());
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            anchors: Arc::new(generate_anchors()),
        })
    }
}

impl FaceDetectorFactory for BlazefaceDetectorFactory {
    fn retune(
        &self,
        parameter: DetectionParameter,
    ) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        check_confidence(parameter)?;
        Ok(Box::new(OnnxBlazefaceDetector {
            session: self.session.clone(),
            anchors: self.anchors.clone(),
            confidence: parameter.value(),
        }))
    }
}

fn check_confidence(parameter: DetectionParameter) -> Result<(), String> {
    if parameter.value() > MAX_CONFIDENCE {
        return Err(format!(
            "BlazeFace confidence must be in (0, {MAX_CONFIDENCE}], got {parameter}"
        ));
    }
    Ok(())
}

/// BlazeFace detector bound to one minimum confidence.
pub struct OnnxBlazefaceDetector {
    session: Arc<Mutex<ort::session::Session>>,
    anchors: Arc<Vec<[f32; 2]>>,
    confidence: f64,
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;

        let (reg_data, score_data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| "BlazeFace session lock poisoned")?;
            let outputs = session.run(ort::inputs![input_value])?;

            // regressors: [1, 896, 16], classificators: [1, 896, 1]
            if outputs.len() < 2 {
                return Err(
                    format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
                );
            }
            let regressors = outputs[0].try_extract_array::<f32>()?;
            let scores = outputs[1].try_extract_array::<f32>()?;
            (
                regressors.iter().copied().collect::<Vec<f32>>(),
                scores.iter().copied().collect::<Vec<f32>>(),
            )
        };

        let candidates = decode(
            &reg_data,
            &score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        Ok(Region::suppress_overlaps(&candidates, DEFAULT_IOU_THRESHOLD))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes anchor-relative boxes whose score clears `confidence` into frame
/// coordinates.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    fw: u32,
    fh: u32,
) -> Vec<Region> {
    let mut regions = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if (score as f64) < confidence {
            continue;
        }

        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        let anchor = &anchors[i];
        let cx = anchor[0] + reg_data[reg_offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[reg_offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[reg_offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[reg_offset + 3] / INPUT_SIZE as f32;

        let x1 = ((cx - w / 2.0) * fw as f32).max(0.0);
        let y1 = ((cy - h / 2.0) * fh as f32).max(0.0);
        let x2 = ((cx + w / 2.0) * fw as f32).min(fw as f32);
        let y2 = ((cy + h / 2.0) * fh as f32).min(fh as f32);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        regions.push(Region {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as i32,
            height: (y2 - y1) as i32,
            score: score as f64,
        });
    }

    regions
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell followed by an
/// 8×8 grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn param(v: f64) -> DetectionParameter {
        DetectionParameter::new(v).unwrap()
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::filled(200, 100, [128, 128, 128], 0);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::filled(50, 50, [255, 255, 255], 0);
        let tensor = preprocess(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 × 2 + 8×8 × 6 = 512 + 384
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[rstest]
    #[case::typical(0.8, true)]
    #[case::upper_bound(1.0, true)]
    #[case::above_one(1.1, false)]
    fn test_check_confidence(#[case] value: f64, #[case] accepted: bool) {
        assert_eq!(check_confidence(param(value)).is_ok(), accepted);
    }

    fn single_anchor_outputs(raw_score: f32) -> (Vec<f32>, Vec<f32>, Vec<[f32; 2]>) {
        let mut reg = vec![0.0f32; 16];
        reg[2] = 32.0; // w = 0.25 of input
        reg[3] = 32.0;
        (reg, vec![raw_score], vec![[0.5, 0.5]])
    }

    #[test]
    fn test_decode_keeps_score_above_confidence() {
        let (reg, scores, anchors) = single_anchor_outputs(2.0); // sigmoid ≈ 0.88
        let regions = decode(&reg, &scores, &anchors, 0.8, 100, 100);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].x, 37);
        assert_eq!(regions[0].width, 25);
    }

    #[test]
    fn test_decode_drops_score_below_confidence() {
        let (reg, scores, anchors) = single_anchor_outputs(2.0);
        let regions = decode(&reg, &scores, &anchors, 0.95, 100, 100);
        assert!(regions.is_empty());
    }

    #[test]
    fn test_lower_confidence_admits_more_candidates() {
        let mut reg = vec![0.0f32; 32];
        reg[2] = 16.0;
        reg[3] = 16.0;
        reg[18] = 16.0;
        reg[19] = 16.0;
        let scores = vec![3.0, 1.0]; // ≈ 0.95, ≈ 0.73
        let anchors = vec![[0.2, 0.2], [0.8, 0.8]];

        let strict = decode(&reg, &scores, &anchors, 0.8, 100, 100);
        let relaxed = decode(&reg, &scores, &anchors, 0.8 * 0.9 * 0.9, 100, 100);

        assert_eq!(strict.len(), 1);
        assert_eq!(relaxed.len(), 2);
    }
}
