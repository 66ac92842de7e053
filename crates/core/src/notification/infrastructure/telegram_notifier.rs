use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::notification::domain::notification_sink::NotificationSink;
use crate::shared::constants::JPEG_QUALITY;
use crate::shared::detection::{confidence_summary, Detection};
use crate::shared::frame::Frame;
use crate::video::infrastructure::image_file_writer::encode_jpeg;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const QUEUE_CAPACITY: usize = 16;
const DRAIN_GRACE: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SESSION_START_TEXT: &str = "🟢 *Security camera started*. Watching for people.";
const SESSION_END_TEXT: &str = "🔴 *Security camera stopped.*";

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout: DEFAULT_TIMEOUT,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }
}

enum Outbound {
    Photo { frame: Frame, caption: String },
    Text(String),
}

/// Sends alerts through the Telegram Bot API from a single background worker.
///
/// Calls only enqueue; a full queue drops the message with a warning.
/// Each request carries the configured timeout and is never retried.
pub struct TelegramNotifier {
    tx: Option<Sender<Outbound>>,
    done_rx: Receiver<()>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, std::io::Error> {
        let (tx, rx) = crossbeam_channel::bounded::<Outbound>(QUEUE_CAPACITY);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        let worker = std::thread::Builder::new()
            .name("telegram-notifier".into())
            .spawn(move || {
                run_worker(config, rx);
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            tx: Some(tx),
            done_rx,
            worker: Some(worker),
        })
    }

    fn enqueue(&self, message: Outbound) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        match tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("[Telegram] Notification queue full, dropping message");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("[Telegram] Notification worker stopped, dropping message");
            }
        }
    }
}

impl NotificationSink for TelegramNotifier {
    fn send_arrival_alert(&self, frame: &Frame, detections: &[Detection], timestamp: DateTime<Utc>) {
        self.enqueue(Outbound::Photo {
            frame: frame.clone(),
            caption: arrival_caption(detections, timestamp),
        });
    }

    fn send_session_start(&self) {
        self.enqueue(Outbound::Text(SESSION_START_TEXT.to_string()));
    }

    fn send_session_end(&self) {
        self.enqueue(Outbound::Text(SESSION_END_TEXT.to_string()));
    }
}

impl Drop for TelegramNotifier {
    fn drop(&mut self) {
        // Closing the queue lets the worker finish what is already queued.
        self.tx = None;
        match self.done_rx.recv_timeout(DRAIN_GRACE) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                log::warn!("[Telegram] Pending notifications abandoned on shutdown");
            }
        }
    }
}

/// Markdown caption attached to an arrival photo.
pub fn arrival_caption(detections: &[Detection], timestamp: DateTime<Utc>) -> String {
    format!(
        "🚨 *PERSON DETECTED*\n🕐 `{}`\n👤 Count: *{}*\n📊 Confidence: `{}`",
        timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        detections.len(),
        confidence_summary(detections)
    )
}

fn run_worker(config: TelegramConfig, rx: Receiver<Outbound>) {
    let client = match reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("[Telegram] Could not create HTTP client: {e}");
            return;
        }
    };

    for message in rx {
        let result = match message {
            Outbound::Photo { frame, caption } => match encode_jpeg(&frame, JPEG_QUALITY) {
                Ok(jpeg) => send_photo(&client, &config, jpeg, &caption),
                Err(e) => {
                    log::warn!("[Telegram] JPEG encoding failed, sending text only: {e}");
                    send_text(&client, &config, &caption)
                }
            },
            Outbound::Text(text) => send_text(&client, &config, &text),
        };
        if let Err(e) = result {
            log::warn!("[Telegram] {e}");
        }
    }
}

fn send_photo(
    client: &reqwest::blocking::Client,
    config: &TelegramConfig,
    jpeg: Vec<u8>,
    caption: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let photo = reqwest::blocking::multipart::Part::bytes(jpeg)
        .file_name("snapshot.jpg")
        .mime_str("image/jpeg")?;
    let form = reqwest::blocking::multipart::Form::new()
        .text("chat_id", config.chat_id.clone())
        .text("caption", caption.to_string())
        .text("parse_mode", "Markdown")
        .part("photo", photo);

    let response = client
        .post(config.method_url("sendPhoto"))
        .multipart(form)
        .send()
        .map_err(|e| format!("sendPhoto error: {}", e.without_url()))?;
    check_response("sendPhoto", response)
}

fn send_text(
    client: &reqwest::blocking::Client,
    config: &TelegramConfig,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = [
        ("chat_id", config.chat_id.as_str()),
        ("text", text),
        ("parse_mode", "Markdown"),
    ];
    let response = client
        .post(config.method_url("sendMessage"))
        .form(&params)
        .send()
        .map_err(|e| format!("sendMessage error: {}", e.without_url()))?;
    check_response("sendMessage", response)
}

fn check_response(
    method: &str,
    response: reqwest::blocking::Response,
) -> Result<(), Box<dyn std::error::Error>> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().unwrap_or_default();
    Err(format!("{method} failed ({status}): {body}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Instant;

    fn unreachable_config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
            timeout: Duration::from_millis(200),
            api_base: "http://127.0.0.1:9".into(),
        }
    }

    #[test]
    fn test_arrival_caption_lists_count_and_confidences() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let detections = [
            Detection::new(0, 0, 10, 10, 0.91),
            Detection::new(5, 5, 20, 20, 0.47),
        ];

        let caption = arrival_caption(&detections, ts);

        assert!(caption.contains("*PERSON DETECTED*"));
        assert!(caption.contains("2024-03-05 14:07:09 UTC"));
        assert!(caption.contains("Count: *2*"));
        assert!(caption.contains("91%, 47%"));
    }

    #[test]
    fn test_method_url_embeds_token() {
        let config = TelegramConfig::new("123:abc", "42");
        assert_eq!(
            config.method_url("sendPhoto"),
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_sends_never_block_even_when_queue_overflows() {
        let notifier = TelegramNotifier::new(unreachable_config()).unwrap();
        let frame = Frame::filled(32, 24, 100, 0);
        let detections = [Detection::new(0, 0, 10, 10, 0.8)];

        let start = Instant::now();
        notifier.send_session_start();
        for _ in 0..(QUEUE_CAPACITY * 4) {
            notifier.send_arrival_alert(&frame, &detections, Utc::now());
        }
        notifier.send_session_end();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_drop_waits_at_most_drain_grace() {
        let notifier = TelegramNotifier::new(unreachable_config()).unwrap();
        for _ in 0..QUEUE_CAPACITY {
            notifier.send_session_start();
        }

        let start = Instant::now();
        drop(notifier);
        assert!(start.elapsed() < DRAIN_GRACE + Duration::from_secs(1));
    }
}
