//! Request/response correlation.
//!
//! Exactly one command is outstanding at a time. The reader side publishes
//! each assembled frame into a single [`ResponseSlot`]; the sender clears the
//! slot, writes its frame, and waits for the slot to fill.

use log::{debug, warn};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::constants::{MAX_SEND_ATTEMPTS, RESPONSE_TIMEOUT_MS};
use crate::error::{Result, TecError};
use crate::frame::{FrameAssembler, Response};
use crate::transport::{ByteListener, PortSettings, Transport};

#[derive(Debug, Default)]
struct SlotState {
    response: Option<Response>,
    closed: bool,
}

/// Single-capacity handoff between the reader thread and the sender
#[derive(Debug, Default)]
pub struct ResponseSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a frame, replacing any frame nobody has taken yet
    pub fn publish(&self, response: Response) {
        let mut state = self.lock();
        if let Some(stale) = state.response.replace(response) {
            debug!("Dropping untaken response {:?}", stale.as_str());
        }
        self.ready.notify_all();
    }

    /// Empty the slot; returns whatever was discarded
    pub fn clear(&self) -> Option<Response> {
        self.lock().response.take()
    }

    /// No more frames will arrive; wakes any waiter
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Block until a frame is available and take it
    pub fn wait(&self, timeout: Duration) -> Result<Response> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if let Some(response) = state.response.take() {
                return Ok(response);
            }
            if state.closed {
                return Err(TecError::Disconnected);
            }
            state = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(TecError::Timeout {
                            waited_ms: saturating_millis(timeout),
                        });
                    }
                    self.ready
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.ready.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Feeds assembled frames from the byte stream into the slot
struct SlotFeeder {
    assembler: FrameAssembler,
    slot: Arc<ResponseSlot>,
}

impl ByteListener for SlotFeeder {
    fn on_bytes(&mut self, bytes: &[u8]) {
        for response in self.assembler.extend(bytes) {
            debug!("Received: {}", response);
            self.slot.publish(response);
        }
    }

    fn on_closed(&mut self) {
        if !self.assembler.pending().is_empty() {
            debug!("Discarding partial frame {:?}", self.assembler.pending());
        }
        self.slot.close();
    }
}

/// Bounds on a single send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total writes of one command before giving up on NAKs
    pub max_attempts: u32,
    /// Wait for each response
    pub response_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_SEND_ATTEMPTS,
            response_timeout: Duration::from_millis(RESPONSE_TIMEOUT_MS),
        }
    }
}

/// Sends commands over a transport and matches them with responses
pub struct Correlator<T: Transport> {
    transport: T,
    slot: Arc<ResponseSlot>,
    policy: RetryPolicy,
}

impl<T: Transport> Correlator<T> {
    /// Take ownership of `transport` and start consuming its byte stream
    pub fn new(mut transport: T, policy: RetryPolicy) -> Result<Self> {
        let slot = Arc::new(ResponseSlot::new());
        transport.register_listener(Box::new(SlotFeeder {
            assembler: FrameAssembler::new(),
            slot: Arc::clone(&slot),
        }))?;

        Ok(Correlator {
            transport,
            slot,
            policy,
        })
    }

    pub fn configure(&mut self, settings: &PortSettings) -> Result<()> {
        self.transport.configure(settings)
    }

    /// False once closed, or once the reader stopped delivering bytes
    pub fn is_open(&self) -> bool {
        !self.slot.is_closed()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a command and wait for its response, resending the identical
    /// frame while the device answers with a NAK.
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        let frame = command.frame();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.slot.is_closed() {
                return Err(TecError::Disconnected);
            }
            if let Some(stale) = self.slot.clear() {
                debug!("Discarding unsolicited response {:?}", stale.as_str());
            }

            debug!("Sending:  {}", command);
            self.transport.write_text(&frame)?;

            let response = self.slot.wait(self.policy.response_timeout)?;
            if !response.is_nak() {
                return Ok(response);
            }
            warn!(
                "Device rejected {} (attempt {}/{}): {:?}",
                command,
                attempt,
                max_attempts,
                response.as_str()
            );
        }

        Err(TecError::Rejected {
            attempts: max_attempts,
        })
    }

    /// Release the transport; later sends fail with `Disconnected`
    pub fn close(&mut self) -> Result<()> {
        self.slot.close();
        self.transport.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Opcode;
    use std::collections::VecDeque;
    use std::thread;

    /// Replies to each write through the listener, from the writer's thread
    struct ScriptedTransport {
        listener: Option<Box<dyn ByteListener>>,
        replies: VecDeque<&'static str>,
        written: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn new(replies: &[&'static str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            let transport = ScriptedTransport {
                listener: None,
                replies: replies.iter().copied().collect(),
                written: Arc::clone(&written),
            };
            (transport, written)
        }
    }

    impl Transport for ScriptedTransport {
        fn configure(&mut self, _settings: &PortSettings) -> Result<()> {
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<()> {
            self.written.lock().unwrap().push(text.to_string());
            if let (Some(listener), Some(reply)) = (self.listener.as_mut(), self.replies.pop_front()) {
                listener.on_bytes(reply.as_bytes());
            }
            Ok(())
        }

        fn register_listener(&mut self, listener: Box<dyn ByteListener>) -> Result<()> {
            self.listener = Some(listener);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            if let Some(mut listener) = self.listener.take() {
                listener.on_closed();
            }
            Ok(())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            response_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_send_returns_response() {
        let (transport, written) = ScriptedTransport::new(&["*09c4b1^"]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        let command = Command::read(Opcode::ReadTemperature).unwrap();

        let response = correlator.send(&command).unwrap();
        assert_eq!(response.as_str(), "*09c4b1");
        assert_eq!(*written.lock().unwrap(), vec!["*01000021\r".to_string()]);
    }

    #[test]
    fn test_nak_resends_identical_frame_once() {
        let (transport, written) = ScriptedTransport::new(&["*XXXX60^", "*006424^"]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        let command = Command::raw(Opcode::OutputEnable, 1).unwrap();

        let response = correlator.send(&command).unwrap();
        assert_eq!(response.as_str(), "*006424");
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], written[1]);
    }

    #[test]
    fn test_nak_exhausts_attempts() {
        let (transport, written) =
            ScriptedTransport::new(&["*XXXX60^", "*XXXX60^", "*XXXX60^", "*006424^"]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        let command = Command::raw(Opcode::OutputEnable, 1).unwrap();

        match correlator.send(&command) {
            Err(TecError::Rejected { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(written.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_no_reply_times_out() {
        let (transport, _written) = ScriptedTransport::new(&[]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        let command = Command::read(Opcode::ReadTemperature).unwrap();

        assert!(matches!(correlator.send(&command), Err(TecError::Timeout { .. })));
    }

    #[test]
    fn test_send_after_close_fails() {
        let (transport, written) = ScriptedTransport::new(&["*09c4b1^"]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        correlator.close().unwrap();
        let command = Command::read(Opcode::ReadTemperature).unwrap();

        assert!(matches!(correlator.send(&command), Err(TecError::Disconnected)));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reader_stop_closes_correlator() {
        let (transport, _written) = ScriptedTransport::new(&[]);
        let mut correlator = Correlator::new(transport, policy(3)).unwrap();
        assert!(correlator.is_open());

        if let Some(mut listener) = correlator.transport.listener.take() {
            listener.on_closed();
        }

        assert!(!correlator.is_open());
        let command = Command::read(Opcode::ReadTemperature).unwrap();
        assert!(matches!(correlator.send(&command), Err(TecError::Disconnected)));
    }

    #[test]
    fn test_unbounded_timeout() {
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
        assert_eq!(saturating_millis(Duration::from_millis(250)), 250);

        let slot = Arc::new(ResponseSlot::new());
        let producer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(Response::new("*0064"));
        });
        assert_eq!(slot.wait(Duration::MAX).unwrap().as_str(), "*0064");
        handle.join().unwrap();
    }

    #[test]
    fn test_slot_handoff_across_threads() {
        let slot = Arc::new(ResponseSlot::new());
        let producer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(Response::new("*0064"));
        });

        let response = slot.wait(Duration::from_secs(2)).unwrap();
        assert_eq!(response.as_str(), "*0064");
        handle.join().unwrap();
        assert!(slot.clear().is_none());
    }

    #[test]
    fn test_slot_close_wakes_waiter() {
        let slot = Arc::new(ResponseSlot::new());
        let closer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.close();
        });

        assert!(matches!(slot.wait(Duration::from_secs(2)), Err(TecError::Disconnected)));
        handle.join().unwrap();
    }

    #[test]
    fn test_slot_keeps_latest() {
        let slot = ResponseSlot::new();
        slot.publish(Response::new("a"));
        slot.publish(Response::new("b"));
        assert_eq!(slot.wait(Duration::from_millis(10)).unwrap().as_str(), "b");
        assert!(matches!(
            slot.wait(Duration::from_millis(10)),
            Err(TecError::Timeout { waited_ms: 10 })
        ));
    }
}
