//! Frame scheduling gate
//!
//! Ticks are self-rescheduling: each one carries a ticket, and a ticket is
//! only honoured while its generation is current. Starting a new motion,
//! restarting, or disposing the view bumps the generation so any frame
//! callback still queued by the platform becomes a no-op.

/// Permission to run one scheduled tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct FrameLoop {
    generation: u64,
    running: bool,
    disposed: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new tick chain, invalidating any outstanding tickets
    pub fn start(&mut self) -> Option<FrameTicket> {
        if self.disposed {
            return None;
        }
        self.generation += 1;
        self.running = true;
        Some(FrameTicket {
            generation: self.generation,
        })
    }

    /// Stop the current chain; pending tickets go stale
    pub fn cancel(&mut self) {
        if self.running {
            log::debug!("Cancelling frame chain {}", self.generation);
        }
        self.generation += 1;
        self.running = false;
    }

    /// Permanently stop scheduling (render target torn down)
    pub fn dispose(&mut self) {
        self.cancel();
        self.disposed = true;
    }

    /// Whether a ticket may touch shared state
    pub fn admits(&self, ticket: FrameTicket) -> bool {
        !self.disposed && self.running && ticket.generation == self.generation
    }

    /// Mark the chain finished after its final tick
    pub fn finish(&mut self, ticket: FrameTicket) {
        if ticket.generation == self.generation {
            self.running = false;
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
