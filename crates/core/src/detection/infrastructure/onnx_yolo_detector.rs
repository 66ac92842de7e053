/// YOLOv8 person detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, class filtering, NMS and the
/// mapping from letterbox space back to frame pixels.
use std::path::Path;

use crate::detection::domain::person_detector::PersonDetector;
use crate::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_IOU_THRESHOLD, PERSON_CLASS_ID};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Number of box values (cx, cy, w, h) that precede the class scores.
const BOX_VALUES: usize = 4;

/// Tuning knobs for [`OnnxYoloDetector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloOptions {
    pub confidence: f64,
    pub iou_threshold: f64,
    pub class_id: usize,
}

impl Default for YoloOptions {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            class_id: PERSON_CLASS_ID,
        }
    }
}

/// COCO-trained YOLO detector that reports a single class.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    options: YoloOptions,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, options: YoloOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Person detector ready: input {input_size}px, confidence {:.2}",
            options.confidence
        );

        Ok(Self {
            session,
            options,
            input_size,
        })
    }
}

impl PersonDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_output(data, &shape, &self.options)?;
        let kept = nms(&mut raw, self.options.iou_threshold);

        Ok(kept
            .iter()
            .map(|d| letterbox.to_frame(d, frame.width(), frame.height()))
            .collect())
    }

    fn set_confidence(&mut self, confidence: f64) {
        self.options.confidence = confidence;
    }

    fn confidence(&self) -> Option<f64> {
        Some(self.options.confidence)
    }
}

/// Return the preferred ONNX execution providers for the current platform.
///
/// ONNX Runtime falls back to CPU if the provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding applied by [`letterbox`], needed to undo it.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, det: &RawDetection, frame_w: u32, frame_h: u32) -> Detection {
        let unmap = |v: f64, pad: u32, limit: u32| -> i32 {
            (((v - pad as f64) / self.scale).round()).clamp(0.0, limit as f64) as i32
        };
        Detection::new(
            unmap(det.x1, self.pad_x, frame_w),
            unmap(det.y1, self.pad_y, frame_h),
            unmap(det.x2, self.pad_x, frame_w),
            unmap(det.y2, self.pad_y, frame_h),
            det.confidence,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO training convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbour resize into the padded region.
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

/// Decode a `[1, 4 + classes, anchors]` (or `[1, anchors, 4 + classes]`)
/// output into letterbox-space boxes of the configured class.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    options: &YoloOptions,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    // Anchors always outnumber features, which tells the two layouts apart.
    let transposed = shape[1] < shape[2];
    let (num_anchors, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    let score_index = BOX_VALUES + options.class_id;
    if score_index >= num_feats {
        return Err(format!(
            "Class {} not present in model output with {num_feats} features",
            options.class_id
        )
        .into());
    }
    if data.len() < num_anchors * num_feats {
        return Err("YOLO output tensor is shorter than its shape".into());
    }

    let value = |anchor: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_anchors + anchor] as f64
        } else {
            data[anchor * num_feats + feat] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_anchors {
        let conf = value(i, score_index);
        if conf < options.confidence {
            continue;
        }
        let cx = value(i, 0);
        let cy = value(i, 1);
        let w = value(i, 2);
        let h = value(i, 3);
        dets.push(RawDetection {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence: conf,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let overlaps = keep.iter().any(|k| {
            bbox_iou(
                &[k.x1, k.y1, k.x2, k.y2],
                &[det.x1, det.y1, det.x2, det.y2],
            ) > iou_thresh
        });
        if !overlaps {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
