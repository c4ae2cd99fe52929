//! Stream consumption and latency measurement.
//!
//! [`StreamConsumer`] drives a [`Transport`] in either delivery mode and
//! records when each piece of the answer arrived:
//!
//! - [`consume`](StreamConsumer::consume) pulls fragments one at a time until
//!   the stream is exhausted, accumulating text and a timestamped log.
//! - [`complete`](StreamConsumer::complete) waits for one full response.
//! - [`compare`](StreamConsumer::compare) runs both and reports the timings
//!   side by side.
//!
//! All times are measured on a monotonic clock from the moment the request is
//! submitted.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::{Interrupted, Result, TransportError};
use crate::stream::Fragment;
use crate::transport::Transport;
use crate::usage::Usage;

/// A fragment together with the time it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Time since the request was submitted.
    pub elapsed: Duration,
    /// The fragment as received.
    pub fragment: Fragment,
}

/// Everything received from one streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consumption {
    /// Concatenated content of every fragment, in arrival order.
    pub full_text: String,
    /// Every fragment received, in arrival order.
    pub log: Vec<LogEntry>,
    /// Time from submission until the stream closed or failed.
    pub elapsed: Duration,
}

impl Consumption {
    fn record(&mut self, elapsed: Duration, fragment: Fragment) {
        if let Some(text) = fragment.text() {
            self.full_text.push_str(text);
        }
        self.log.push(LogEntry { elapsed, fragment });
    }

    /// Number of fragments received.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.log.len()
    }

    /// Arrival time of the first fragment carrying content.
    #[must_use]
    pub fn time_to_first_content(&self) -> Option<Duration> {
        self.log
            .iter()
            .find(|entry| entry.fragment.has_content())
            .map(|entry| entry.elapsed)
    }

    /// Iterates over the fragments, without timestamps.
    pub fn fragments(&self) -> impl DoubleEndedIterator<Item = &Fragment> {
        self.log.iter().map(|entry| &entry.fragment)
    }

    /// Finish reason reported by the stream, if any.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.fragments()
            .rev()
            .find_map(|fragment| fragment.finish_reason.as_deref())
    }
}

/// A value together with how long it took to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timed<T> {
    /// The produced value.
    pub value: T,
    /// Time from submission until the value was available.
    pub elapsed: Duration,
}

/// Side-by-side timings of a blocking and a streamed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyReport {
    /// Time until the blocking response was complete.
    pub blocking: Duration,
    /// Time until the streamed response closed.
    pub streaming_total: Duration,
    /// Time until the first streamed content arrived.
    pub time_to_first_content: Option<Duration>,
    /// Number of fragments in the streamed response.
    pub fragment_count: usize,
    /// Usage counters from the blocking response. Streams carry none.
    pub usage: Option<Usage>,
    /// Text of the blocking response.
    pub blocking_text: String,
    /// Concatenated text of the streamed response.
    pub streamed_text: String,
}

impl LatencyReport {
    /// Returns `true` if both modes produced the same text.
    #[must_use]
    pub fn texts_match(&self) -> bool {
        self.blocking_text == self.streamed_text
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "blocking:              {:>8.3}s", self.blocking.as_secs_f64())?;
        match self.time_to_first_content {
            Some(ttfc) => writeln!(f, "streaming first token: {:>8.3}s", ttfc.as_secs_f64())?,
            None => writeln!(f, "streaming first token:      n/a")?,
        }
        writeln!(
            f,
            "streaming total:       {:>8.3}s ({} fragments)",
            self.streaming_total.as_secs_f64(),
            self.fragment_count
        )?;
        if let Some(usage) = self.usage {
            writeln!(
                f,
                "usage:                 {} prompt + {} completion = {} tokens",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            )?;
        }
        write!(f, "texts match:           {}", self.texts_match())
    }
}

/// Issues chat requests through a transport and times the answers.
#[derive(Debug, Clone)]
pub struct StreamConsumer<T> {
    transport: T,
}

impl<T: Transport> StreamConsumer<T> {
    /// Creates a consumer over the given transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Streams a response to completion.
    ///
    /// Pulls fragments until the transport reports the stream exhausted,
    /// logging each with its arrival time and appending non-empty content to
    /// the accumulated text. A fragment with both a role and content is
    /// logged whole; only its content is accumulated.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the request does not select streaming, the
    /// stream cannot be opened, or a pull fails. Its `partial` field holds
    /// exactly the fragments received before the failure.
    pub async fn consume(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<Consumption, Interrupted> {
        let mut consumption = Consumption::default();

        if !request.stream {
            return Err(Interrupted {
                error: TransportError::invalid_request("consume requires a streaming request"),
                partial: consumption,
            });
        }

        let start = Instant::now();
        let mut source = match self.transport.open_stream(request).await {
            Ok(source) => source,
            Err(error) => {
                consumption.elapsed = start.elapsed();
                tracing::warn!(transport = self.transport.name(), %error, "failed to open stream");
                return Err(Interrupted {
                    error,
                    partial: consumption,
                });
            }
        };

        loop {
            match source.next_fragment().await {
                Ok(Some(fragment)) => {
                    let elapsed = start.elapsed();
                    tracing::debug!(
                        index = consumption.log.len(),
                        elapsed_ms = elapsed.as_millis(),
                        content_len = fragment.text().map_or(0, str::len),
                        "received fragment"
                    );
                    consumption.record(elapsed, fragment);
                }
                Ok(None) => {
                    consumption.elapsed = start.elapsed();
                    tracing::info!(
                        transport = self.transport.name(),
                        fragments = consumption.fragment_count(),
                        chars = consumption.full_text.chars().count(),
                        elapsed_ms = consumption.elapsed.as_millis(),
                        "stream closed"
                    );
                    return Ok(consumption);
                }
                Err(error) => {
                    consumption.elapsed = start.elapsed();
                    tracing::warn!(
                        transport = self.transport.name(),
                        fragments = consumption.fragment_count(),
                        %error,
                        "stream failed"
                    );
                    return Err(Interrupted {
                        error,
                        partial: consumption,
                    });
                }
            }
        }
    }

    /// Requests one complete response and times it.
    ///
    /// The request is sent with streaming disabled regardless of its flag.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn complete(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<Timed<ChatResponse>, TransportError> {
        let request = request.clone().blocking();

        let start = Instant::now();
        let response = self.transport.complete(&request).await?;
        let elapsed = start.elapsed();

        tracing::info!(
            transport = self.transport.name(),
            elapsed_ms = elapsed.as_millis(),
            total_tokens = response.usage.map(|u| u.total_tokens),
            "completion received"
        );

        Ok(Timed {
            value: response,
            elapsed,
        })
    }

    /// Runs the request in both delivery modes, one after the other.
    ///
    /// # Errors
    ///
    /// Returns the first failure from either mode.
    pub async fn compare(&self, request: &ChatRequest) -> Result<LatencyReport> {
        let blocking = self.complete(request).await?;
        let streamed = self.consume(&request.clone().stream()).await?;

        let report = LatencyReport {
            blocking: blocking.elapsed,
            streaming_total: streamed.elapsed,
            time_to_first_content: streamed.time_to_first_content(),
            fragment_count: streamed.fragment_count(),
            usage: blocking.value.usage,
            blocking_text: blocking.value.text().unwrap_or_default().to_owned(),
            streamed_text: streamed.full_text,
        };

        if !report.texts_match() {
            tracing::debug!("blocking and streamed texts differ");
        }

        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::message::Role;
    use crate::mock::ScriptedTransport;

    fn two_request() -> ChatRequest {
        ChatRequest::new("m").user("1+1?").temperature(0.0).stream()
    }

    #[tokio::test]
    async fn test_consume_accumulates_content() {
        let transport = ScriptedTransport::new().with_fragments(vec![
            Fragment::role(Role::Assistant),
            Fragment::content("Two"),
            Fragment::empty(),
        ]);
        let consumer = StreamConsumer::new(transport);

        let consumption = assert_ok!(consumer.consume(&two_request()).await);
        assert_eq!(consumption.full_text, "Two");
        assert_eq!(consumption.fragment_count(), 3);
        assert_eq!(consumption.log[0].fragment.role, Some(Role::Assistant));
    }

    #[tokio::test]
    async fn test_consume_rejects_blocking_request() {
        let consumer = StreamConsumer::new(ScriptedTransport::echoing(["x"]));
        let err = assert_err!(consumer.consume(&two_request().blocking()).await);
        assert!(matches!(err.error, TransportError::InvalidRequest(_)));
        assert_eq!(consumer.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_consume_open_failure() {
        let transport = ScriptedTransport::echoing(["x"])
            .fail_on_open(TransportError::auth("scripted", "bad key"));
        let consumer = StreamConsumer::new(transport);

        let err = assert_err!(consumer.consume(&two_request()).await);
        assert!(matches!(err.error, TransportError::Auth { .. }));
        assert!(err.partial.log.is_empty());
    }

    #[tokio::test]
    async fn test_role_and_content_in_one_fragment() {
        let both = Fragment {
            role: Some(Role::Assistant),
            content: Some("Hi".to_owned()),
            finish_reason: None,
        };
        let consumer =
            StreamConsumer::new(ScriptedTransport::new().with_fragments(vec![both.clone()]));

        let consumption = assert_ok!(consumer.consume(&two_request()).await);
        assert_eq!(consumption.full_text, "Hi");
        assert_eq!(consumption.log[0].fragment, both);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consume_timestamps() {
        let transport = ScriptedTransport::echoing(["a", "b"])
            .with_fragment_delay(Duration::from_millis(10));
        let consumer = StreamConsumer::new(transport);

        let consumption = assert_ok!(consumer.consume(&two_request()).await);
        let times: Vec<u128> = consumption.log.iter().map(|e| e.elapsed.as_millis()).collect();
        assert_eq!(times, vec![10, 20, 30, 40]);
        assert_eq!(
            consumption.time_to_first_content(),
            Some(Duration::from_millis(20))
        );
        assert_eq!(consumption.elapsed, Duration::from_millis(40));
        assert_eq!(consumption.finish_reason(), Some("stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_is_timed() {
        let consumer = StreamConsumer::new(ScriptedTransport::echoing(["Two"]));
        let timed = assert_ok!(consumer.complete(&two_request()).await);
        assert_eq!(timed.value.text(), Some("Two"));
        assert_eq!(timed.elapsed, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_compare_reports_both_modes() {
        let transport = ScriptedTransport::echoing(["Tw", "o"])
            .with_completion(ChatResponse::from_text("Two").with_usage(Usage::new(12, 1)));
        let consumer = StreamConsumer::new(transport);

        let report = assert_ok!(consumer.compare(&two_request().blocking()).await);
        assert!(report.texts_match());
        assert_eq!(report.fragment_count, 4);
        assert_eq!(report.usage, Some(Usage::new(12, 1)));
        assert!(report.time_to_first_content.is_some());
        assert_eq!(consumer.transport().calls(), 2);

        let rendered = report.to_string();
        assert!(rendered.contains("4 fragments"));
        assert!(rendered.contains("texts match:           true"));
    }

    #[tokio::test]
    async fn test_compare_propagates_stream_failure() {
        let transport =
            ScriptedTransport::echoing(["a", "b"]).fail_after(1, TransportError::network("reset"));
        let consumer = StreamConsumer::new(transport);

        let err = assert_err!(consumer.compare(&two_request()).await);
        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::Network(_))
        ));
    }

    #[test]
    fn test_report_display_without_content() {
        let report = LatencyReport {
            blocking: Duration::from_millis(1500),
            streaming_total: Duration::from_millis(1600),
            time_to_first_content: None,
            fragment_count: 2,
            usage: None,
            blocking_text: String::new(),
            streamed_text: String::new(),
        };
        let rendered = report.to_string();
        assert!(rendered.contains("1.500s"));
        assert!(rendered.contains("n/a"));
        assert!(!rendered.contains("usage"));
    }
}
