use chrono::{DateTime, Utc};

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Outbound alert channel used by the presence tracker.
///
/// Every method must return without waiting on delivery. Implementations
/// copy whatever they need from the arguments before returning and log
/// their own failures; nothing is reported back to the caller.
pub trait NotificationSink: Send {
    fn send_arrival_alert(&self, frame: &Frame, detections: &[Detection], timestamp: DateTime<Utc>);

    fn send_session_start(&self);

    fn send_session_end(&self);
}

/// Sink used when no notification channel is configured.
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn send_arrival_alert(&self, _frame: &Frame, _detections: &[Detection], _timestamp: DateTime<Utc>) {}
    fn send_session_start(&self) {}
    fn send_session_end(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_all_methods_are_noop() {
        let sink = NullNotificationSink;
        sink.send_session_start();
        sink.send_arrival_alert(
            &Frame::filled(8, 8, 0, 0),
            &[Detection::new(0, 0, 4, 4, 0.9)],
            Utc::now(),
        );
        sink.send_session_end();
    }
}
