//! Tail state machine.
//!
//! The tailer feeds every read result into [`TailMachine::on_read`] together with
//! what the supervisor currently knows about the producer, and gets back the next
//! [`TailAction`]. Reaching end-of-file is never treated as completion by itself:
//! the stream only closes on the sentinel line, or after a final drain pass once
//! completion is known out of band.

use crate::core::status::ProducerStatus;

/// Result of one read attempt at the tail cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete record line, terminator stripped.
    Line(String),
    /// The end-of-log sentinel.
    Sentinel,
    /// New bytes arrived but the line is not terminated yet.
    Partial,
    /// Nothing new since the last read.
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// At the current end of file, waiting for the producer.
    AwaitingData,
    /// Handing out lines as fast as they can be read.
    Delivering,
    /// Completion is known; reading out whatever is left.
    Draining,
    Closed,
}

/// What the tail loop should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailAction {
    /// Send the line, then read again without delay.
    Emit(String),
    /// Read again without delay.
    ReadAgain,
    /// Sleep for one poll interval, then read from the same cursor.
    Wait,
    Close,
}

/// Why a tail stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEnd {
    /// The sentinel line was read.
    Completed,
    /// The producer was known to be gone and the remaining lines were drained.
    Drained,
    /// The consumer went away.
    Disconnected,
    /// The log became unreadable.
    Failed,
}

impl TailEnd {
    /// Whether every line the producer will ever write has been delivered.
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Completed | Self::Drained)
    }
}

/// Per-stream tail state. One instance per consumer.
#[derive(Debug, Clone)]
pub struct TailMachine {
    state: TailState,
    idle_polls: u32,
    idle_poll_limit: u32,
    end: Option<TailEnd>,
}

impl TailMachine {
    /// `idle_poll_limit` bounds how many consecutive empty polls are tolerated for a
    /// log with no known producer (e.g. one left over from an earlier process).
    pub fn new(idle_poll_limit: u32) -> Self {
        Self {
            state: TailState::AwaitingData,
            idle_polls: 0,
            idle_poll_limit,
            end: None,
        }
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// Set once the machine reaches [`TailState::Closed`].
    pub fn end(&self) -> Option<TailEnd> {
        self.end
    }

    /// Advance on a read result. `producer` is the supervisor's view of the
    /// producer, sampled after the read.
    pub fn on_read(
        &mut self,
        outcome: ReadOutcome,
        producer: Option<ProducerStatus>,
    ) -> TailAction {
        if self.state == TailState::Closed {
            return TailAction::Close;
        }

        match outcome {
            ReadOutcome::Line(line) => {
                self.idle_polls = 0;
                if self.state != TailState::Draining {
                    self.state = TailState::Delivering;
                }
                TailAction::Emit(line)
            }
            ReadOutcome::Sentinel => self.close(TailEnd::Completed),
            ReadOutcome::Partial => {
                self.idle_polls = 0;
                self.wait_or_drain(producer)
            }
            ReadOutcome::Eof => {
                if self.state == TailState::Draining {
                    return self.close(TailEnd::Drained);
                }
                self.idle_polls = self.idle_polls.saturating_add(1);
                self.wait_or_drain(producer)
            }
        }
    }

    /// Mark the stream as ended for a reason outside the read path.
    pub fn abort(&mut self, end: TailEnd) {
        self.state = TailState::Closed;
        self.end = Some(end);
    }

    fn wait_or_drain(&mut self, producer: Option<ProducerStatus>) -> TailAction {
        if self.state == TailState::Draining {
            // Anything still unterminated once the producer is gone never completes.
            return self.close(TailEnd::Drained);
        }
        let producer_gone = match producer {
            Some(status) => status.is_terminal(),
            None => self.idle_polls >= self.idle_poll_limit,
        };
        if producer_gone {
            // The status was sampled after this read, so one more pass sees every write.
            self.state = TailState::Draining;
            TailAction::ReadAgain
        } else {
            self.state = TailState::AwaitingData;
            TailAction::Wait
        }
    }

    fn close(&mut self, end: TailEnd) -> TailAction {
        self.abort(end);
        TailAction::Close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> ReadOutcome {
        ReadOutcome::Line(text.to_string())
    }

    #[test]
    fn empty_log_waits_while_producer_runs() {
        let mut machine = TailMachine::new(3);
        for _ in 0..10 {
            let action = machine.on_read(ReadOutcome::Eof, Some(ProducerStatus::Running));
            assert_eq!(action, TailAction::Wait);
            assert_eq!(machine.state(), TailState::AwaitingData);
        }
    }

    #[test]
    fn lines_are_emitted_then_sentinel_closes() {
        let mut machine = TailMachine::new(3);
        let running = Some(ProducerStatus::Running);

        assert_eq!(machine.on_read(line("a"), running), TailAction::Emit("a".to_string()));
        assert_eq!(machine.state(), TailState::Delivering);
        assert_eq!(machine.on_read(ReadOutcome::Eof, running), TailAction::Wait);
        assert_eq!(machine.on_read(line("b"), running), TailAction::Emit("b".to_string()));
        assert_eq!(machine.on_read(ReadOutcome::Sentinel, running), TailAction::Close);
        assert_eq!(machine.state(), TailState::Closed);
        assert_eq!(machine.end(), Some(TailEnd::Completed));
    }

    #[test]
    fn finished_producer_without_sentinel_drains_once() {
        let mut machine = TailMachine::new(3);
        let finished = Some(ProducerStatus::Failed);

        assert_eq!(machine.on_read(ReadOutcome::Eof, finished), TailAction::ReadAgain);
        assert_eq!(machine.state(), TailState::Draining);
        assert_eq!(machine.on_read(line("late"), finished), TailAction::Emit("late".to_string()));
        assert_eq!(machine.state(), TailState::Draining);
        assert_eq!(machine.on_read(ReadOutcome::Eof, finished), TailAction::Close);
        assert_eq!(machine.end(), Some(TailEnd::Drained));
    }

    #[test]
    fn unknown_producer_closes_after_idle_limit() {
        let mut machine = TailMachine::new(3);

        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Wait);
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Wait);
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::ReadAgain);
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Close);
        assert_eq!(machine.end(), Some(TailEnd::Drained));
    }

    #[test]
    fn new_bytes_reset_idle_count() {
        let mut machine = TailMachine::new(2);

        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Wait);
        assert_eq!(machine.on_read(ReadOutcome::Partial, None), TailAction::Wait);
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Wait);
        assert_eq!(machine.on_read(line("x"), None), TailAction::Emit("x".to_string()));
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::Wait);
        assert_eq!(machine.on_read(ReadOutcome::Eof, None), TailAction::ReadAgain);
    }

    #[test]
    fn closed_machine_stays_closed() {
        let mut machine = TailMachine::new(2);
        machine.abort(TailEnd::Disconnected);
        assert_eq!(
            machine.on_read(line("ignored"), Some(ProducerStatus::Running)),
            TailAction::Close
        );
        assert_eq!(machine.end(), Some(TailEnd::Disconnected));
    }

    #[test]
    fn only_sentinel_and_drain_count_as_complete() {
        assert!(TailEnd::Completed.is_complete());
        assert!(TailEnd::Drained.is_complete());
        assert!(!TailEnd::Disconnected.is_complete());
        assert!(!TailEnd::Failed.is_complete());
    }
}
