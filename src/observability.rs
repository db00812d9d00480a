use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("shapeshifter.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("shapeshifter.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("shapeshifter.client.request_duration_seconds");

pub(crate) static CHAT_SENDS: Counter = Counter::new("shapeshifter.chat.sends");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("shapeshifter.chat.send_failures");
pub(crate) static CHAT_CREATED: Counter = Counter::new("shapeshifter.chat.created");

pub(crate) static UPLOAD_FILES: Counter = Counter::new("shapeshifter.upload.files");
pub(crate) static UPLOAD_REJECTED: Counter = Counter::new("shapeshifter.upload.rejected");
pub(crate) static UPLOAD_FAILURES: Counter = Counter::new("shapeshifter.upload.failures");
pub(crate) static UPLOAD_BYTES: Counter = Counter::new("shapeshifter.upload.bytes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&CHAT_CREATED);

    collector.register_counter(&UPLOAD_FILES);
    collector.register_counter(&UPLOAD_REJECTED);
    collector.register_counter(&UPLOAD_FAILURES);
    collector.register_counter(&UPLOAD_BYTES);
}
