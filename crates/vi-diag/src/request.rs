//! Active diagnostic requests and the options they are added with

use std::fmt;

use vi_core::FrequencyClock;

use crate::protocol::{DiagnosticRequest, DiagnosticResponse, RequestHandle};

/// Recurring requests may not be sent more often than this
pub const MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ: f64 = 10.0;

/// Responses are awaited for one period of this frequency (100 ms)
pub const DIAGNOSTIC_RESPONSE_TIMEOUT_HZ: f64 = 10.0;

/// Replaces the linearly scaled value of a response
pub type ResponseDecoder = Box<dyn Fn(&DiagnosticResponse, f64) -> f64 + Send>;

/// Called with every response relayed for a request
pub type ResponseCallback = Box<dyn Fn(&ActiveRequest, &DiagnosticResponse, f64) + Send>;

/// How a request is relayed and scheduled
pub struct RequestOptions {
    pub name: Option<String>,
    pub parse_payload: bool,
    pub factor: f64,
    pub offset: f64,
    pub decoder: Option<ResponseDecoder>,
    pub callback: Option<ResponseCallback>,
    /// 0 for a one-shot request
    pub frequency_hz: f64,
    pub wait_for_multiple_responses: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            name: None,
            parse_payload: false,
            factor: 1.0,
            offset: 0.0,
            decoder: None,
            callback: None,
            frequency_hz: 0.0,
            wait_for_multiple_responses: false,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("name", &self.name)
            .field("parse_payload", &self.parse_payload)
            .field("factor", &self.factor)
            .field("offset", &self.offset)
            .field("decoder", &self.decoder.is_some())
            .field("callback", &self.callback.is_some())
            .field("frequency_hz", &self.frequency_hz)
            .field("wait_for_multiple_responses", &self.wait_for_multiple_responses)
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay responses as a named numeric signal
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn parse_payload(mut self, parse: bool) -> Self {
        self.parse_payload = parse;
        self
    }

    pub fn with_scale(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&DiagnosticResponse, f64) -> f64 + Send + 'static,
    {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActiveRequest, &DiagnosticResponse, f64) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn with_frequency(mut self, frequency_hz: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    pub fn wait_for_multiple_responses(mut self, wait: bool) -> Self {
        self.wait_for_multiple_responses = wait;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency_hz != 0.0
    }
}

/// A request occupying a pool slot
pub struct ActiveRequest {
    /// Address of the bus the request is sent on
    pub bus: u8,
    pub handle: RequestHandle,
    /// Empty when responses are relayed as raw diagnostic records
    pub generic_name: String,
    pub parse_payload: bool,
    pub factor: f64,
    pub offset: f64,
    pub decoder: Option<ResponseDecoder>,
    pub callback: Option<ResponseCallback>,
    pub recurring: bool,
    pub frequency_clock: FrequencyClock,
    pub timeout_clock: FrequencyClock,
    pub wait_for_multiple_responses: bool,
    /// Sent and not yet completed
    pub in_flight: bool,
}

impl fmt::Debug for ActiveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveRequest")
            .field("bus", &self.bus)
            .field("request", self.handle.request())
            .field("generic_name", &self.generic_name)
            .field("recurring", &self.recurring)
            .field("frequency_hz", &self.frequency_clock.frequency_hz)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl ActiveRequest {
    pub(crate) fn new(
        bus: u8,
        request: DiagnosticRequest,
        options: RequestOptions,
        max_name_length: usize,
    ) -> Self {
        let generic_name = options
            .name
            .map(|name| name.chars().take(max_name_length).collect())
            .unwrap_or_default();

        Self {
            bus,
            handle: RequestHandle::new(request),
            generic_name,
            parse_payload: options.parse_payload,
            factor: options.factor,
            offset: options.offset,
            decoder: options.decoder,
            callback: options.callback,
            recurring: options.frequency_hz != 0.0,
            frequency_clock: FrequencyClock::new(options.frequency_hz),
            timeout_clock: FrequencyClock::new(DIAGNOSTIC_RESPONSE_TIMEOUT_HZ),
            wait_for_multiple_responses: options.wait_for_multiple_responses,
            in_flight: false,
        }
    }

    pub fn request(&self) -> &DiagnosticRequest {
        self.handle.request()
    }

    pub fn generic_name(&self) -> Option<&str> {
        if self.generic_name.is_empty() {
            None
        } else {
            Some(&self.generic_name)
        }
    }

    /// Whether the response window has passed; the timeout is never staggered
    pub fn timed_out(&mut self, now_ms: u64) -> bool {
        self.timeout_clock.elapsed(now_ms, false)
    }

    /// Whether the current exchange is over: a response arrived (unless
    /// several are awaited) or the window closed on a transmitted request.
    pub fn is_completed(&mut self, now_ms: u64) -> bool {
        (!self.wait_for_multiple_responses && self.handle.completed())
            || (self.timed_out(now_ms) && self.handle.sent())
    }

    /// Whether this tick should transmit the request
    pub(crate) fn should_send(&mut self, now_ms: u64) -> bool {
        !self.in_flight
            && ((!self.recurring && !self.handle.completed())
                || (self.recurring && self.frequency_clock.elapsed(now_ms, true)))
    }
}
