/// Playback engine - drives ticks on a timer thread
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info};

use super::{Frame, FrameConsumer, Sequencer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Run state of a clock. Transitions that don't apply are refused and
/// return `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transport {
    state: TransportState,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn start(&mut self) -> bool {
        self.transition(TransportState::Stopped, TransportState::Running)
    }

    pub fn pause(&mut self) -> bool {
        self.transition(TransportState::Running, TransportState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(TransportState::Paused, TransportState::Running)
    }

    pub fn stop(&mut self) -> bool {
        if self.state == TransportState::Stopped {
            return false;
        }
        self.state = TransportState::Stopped;
        true
    }

    /// One timer fire: tick only while running.
    pub fn fire(&self, sequencer: &mut Sequencer) -> Option<Frame> {
        (self.state == TransportState::Running).then(|| sequencer.tick())
    }

    fn transition(&mut self, from: TransportState, to: TransportState) -> bool {
        if self.state != from {
            return false;
        }
        self.state = to;
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started,
    Ticked { generation: u64, live: usize },
    Paused,
    Resumed,
    Stopped,
}

/// Transport plus the id of the worker allowed to tick. A worker whose
/// epoch is stale exits at its next check.
#[derive(Default)]
struct Clock {
    transport: Transport,
    epoch: u64,
}

#[derive(Default)]
struct Shared {
    clock: Mutex<Clock>,
    wake: Condvar,
}

impl Shared {
    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sequencer shared with the clock thread.
///
/// Lock order: the sequencer before the engine's transport, never the
/// reverse. The engine's controls only take the transport, so they may be
/// called while the caller holds the sequencer.
pub type SharedSequencer = Arc<Mutex<Sequencer>>;
pub type BoxedConsumer = Box<dyn FrameConsumer + Send>;

pub struct PlaybackEngine {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            shared: Arc::new(Shared::default()),
            worker: None,
        }
    }

    /// Spawn the clock thread. Refused unless stopped.
    pub fn start(&mut self, sequencer: SharedSequencer, consumer: Option<BoxedConsumer>) -> bool {
        let epoch = {
            let mut clock = self.shared.clock();
            if !clock.transport.start() {
                return false;
            }
            clock.epoch += 1;
            clock.epoch
        };
        // wake a previous worker so it sees the new epoch and exits
        self.shared.wake.notify_all();

        info!("playback started");
        let _ = self.sender.send(PlaybackEvent::Started);

        let shared = Arc::clone(&self.shared);
        let sender = self.sender.clone();
        self.worker = Some(thread::spawn(move || {
            run_clock(shared, epoch, sequencer, consumer, sender);
        }));
        true
    }

    /// Once this returns no further tick starts until [`resume`](Self::resume).
    pub fn pause(&self) -> bool {
        let paused = self.shared.clock().transport.pause();
        if paused {
            info!("playback paused");
            let _ = self.sender.send(PlaybackEvent::Paused);
            self.shared.wake.notify_all();
        }
        paused
    }

    pub fn resume(&self) -> bool {
        let resumed = self.shared.clock().transport.resume();
        if resumed {
            info!("playback resumed");
            let _ = self.sender.send(PlaybackEvent::Resumed);
            self.shared.wake.notify_all();
        }
        resumed
    }

    /// Stop the clock. A tick in progress finishes before this returns; the
    /// thread itself exits on its own without being joined.
    pub fn stop(&mut self) -> bool {
        let stopped = self.shared.clock().transport.stop();
        self.shared.wake.notify_all();

        if stopped {
            info!("playback stopped");
            let _ = self.sender.send(PlaybackEvent::Stopped);
        }
        stopped
    }

    pub fn state(&self) -> TransportState {
        self.shared.clock().transport.state()
    }

    /// Running and the clock thread is still alive.
    pub fn is_running(&self) -> bool {
        let alive = self
            .worker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        alive && self.state() == TransportState::Running
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_sequencer(sequencer: &Mutex<Sequencer>) -> MutexGuard<'_, Sequencer> {
    sequencer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_clock(
    shared: Arc<Shared>,
    epoch: u64,
    sequencer: SharedSequencer,
    mut consumer: Option<BoxedConsumer>,
    sender: Sender<PlaybackEvent>,
) {
    loop {
        // delay is re-read every tick so speed changes apply immediately
        let deadline = Instant::now() + lock_sequencer(&sequencer).params().delay();

        {
            let mut clock = shared.clock();
            loop {
                if clock.epoch != epoch {
                    debug!("clock thread replaced, exiting");
                    return;
                }
                match clock.transport.state() {
                    TransportState::Stopped => {
                        debug!("clock thread exiting");
                        return;
                    }
                    TransportState::Paused => {
                        clock = shared
                            .wake
                            .wait(clock)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    TransportState::Running => {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        clock = shared
                            .wake
                            .wait_timeout(clock, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                    }
                }
            }
        }

        // sequencer first, then the transport is re-checked and held for the
        // tick so pause and stop land between ticks
        let mut seq = lock_sequencer(&sequencer);
        let clock = shared.clock();
        if clock.epoch != epoch {
            return;
        }
        let Some(frame) = clock.transport.fire(&mut seq) else {
            continue;
        };
        drop(seq);

        if let Some(consumer) = consumer.as_mut() {
            consumer.render(&frame.cells);
            consumer.sound(&frame);
        }
        let _ = sender.send(PlaybackEvent::Ticked {
            generation: frame.generation,
            live: frame.cells.live_count(),
        });
        drop(clock);
    }
}
