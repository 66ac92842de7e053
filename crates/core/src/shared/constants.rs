pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";

/// COCO class index for "person".
pub const PERSON_CLASS_ID: usize = 0;

pub const DEFAULT_CONFIDENCE: f64 = 0.45;
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.45;

/// Live threshold adjustment step and bounds.
pub const CONFIDENCE_STEP: f64 = 0.05;
pub const MIN_CONFIDENCE: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.99;

pub const DEFAULT_ABSENCE_GRACE_SECONDS: f64 = 2.0;
pub const DEFAULT_EVENT_COOLDOWN_SECONDS: f64 = 10.0;
pub const DEFAULT_CLIP_DURATION_SECONDS: f64 = 8.0;
pub const DEFAULT_CLIP_FPS: f64 = 20.0;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// UTC timestamp embedded in snapshot and clip file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Local timestamp written at the start of each event log line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

pub const DEFAULT_LOG_FILE_NAME: &str = "detections.log";

/// JPEG quality for saved snapshots and notification photos alike.
pub const JPEG_QUALITY: u8 = 85;
