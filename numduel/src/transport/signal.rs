//! Signal transport: events ride on queued signals, received via signalfd.
//!
//! | Event                   | signal        | payload                     |
//! |-------------------------|---------------|-----------------------------|
//! | `Ready`                 | `SIGRTMIN`    | round                       |
//! | `Begin`                 | `SIGRTMIN+1`  | `round << 1 \| thinker bit` |
//! | `Guess`                 | `SIGRTMIN+2`  | guessed value               |
//! | `Verdict` (correct)     | `SIGUSR1`     | attempts                    |
//! | `Verdict` (incorrect)   | `SIGUSR2`     | attempts                    |
//! | `Terminate`             | `SIGTERM`     | none                        |
//!
//! There is no asynchronous handler. Every game signal is blocked in every
//! thread ([`block_game_signals`] must run on the main thread before the
//! runtime starts its workers) and read synchronously from a signalfd, so one
//! notification is fully processed, reply included, before the next is read.
//!
//! Standard signals do not queue. The protocol never has two events of the
//! same kind in flight in the same direction, so at most one instance of each
//! is ever pending.
//!
//! The kernel hands out pending signals lowest number first, standard signals
//! before real-time ones. Numbers are assigned so that every pair of events
//! one side can send back to back is read in the order it was sent:
//! - peer: `Ready` then its first `Guess` (Ready < Guess)
//! - host: correct `Verdict` then `Begin` or `Terminate` (SIGUSR1 < SIGTERM < RT)

use std::fs::File;
use std::io::{self, Read};
use std::mem::{self, MaybeUninit};
use std::os::fd::{FromRawFd, OwnedFd};

use async_trait::async_trait;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::io::unix::AsyncFd;

use super::{Transport, TransportError};
use crate::bridge::protocol::Event;
use crate::round::Role;

const NAME: &str = "signal";

fn rt_signal(offset: i32) -> i32 {
    libc::SIGRTMIN() + offset
}

fn ready_signal() -> i32 {
    rt_signal(0)
}

fn begin_signal() -> i32 {
    rt_signal(1)
}

fn guess_signal() -> i32 {
    rt_signal(2)
}

/// Every signal this transport consumes.
fn game_signals() -> Vec<i32> {
    vec![
        guess_signal(),
        begin_signal(),
        ready_signal(),
        libc::SIGUSR1,
        libc::SIGUSR2,
        libc::SIGTERM,
    ]
}

fn game_sigset() -> io::Result<libc::sigset_t> {
    let mut set = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: sigemptyset initialises the set before sigaddset touches it.
    unsafe {
        if libc::sigemptyset(set.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }
        for signo in game_signals() {
            if libc::sigaddset(set.as_mut_ptr(), signo) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(set.assume_init())
    }
}

/// Block the game signals on the calling thread.
///
/// Threads inherit the mask, so calling this on the main thread before any
/// other thread exists covers the whole process. A game signal arriving at a
/// thread that does not block it would run the default action and kill the
/// process.
pub fn block_game_signals() -> io::Result<()> {
    let set = game_sigset()?;
    // SAFETY: `set` is initialised; a null old-set pointer is allowed.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    tracing::debug!("Game signals blocked");
    Ok(())
}

/// Map an event to the signal number and optional payload that carry it.
fn encode(event: Event) -> Result<(i32, Option<usize>), TransportError> {
    let unencodable = || TransportError::Unencodable {
        event: event.name(),
        transport: NAME,
    };

    let encoded = match event {
        Event::Guess { value } => (guess_signal(), Some(value as usize)),
        Event::Verdict { correct, attempts } => {
            let signo = if correct { libc::SIGUSR1 } else { libc::SIGUSR2 };
            (signo, Some(attempts as usize))
        }
        Event::Terminate => (libc::SIGTERM, None),
        Event::Begin { round, role } => {
            let packed = u64::from(round) << 1 | u64::from(role == Role::Thinker);
            let packed = usize::try_from(packed).map_err(|_| unencodable())?;
            (begin_signal(), Some(packed))
        }
        Event::Ready { round } => (ready_signal(), Some(round as usize)),
    };
    Ok(encoded)
}

/// Turn a received signal back into an event. `None` for anything that is
/// not part of the game or not from the peer.
fn decode(signo: i32, payload: u64, sender: u32, peer: i32) -> Option<Event> {
    // Termination may come from the peer or from whoever runs the game.
    if signo == libc::SIGTERM {
        return Some(Event::Terminate);
    }
    if i64::from(sender) != i64::from(peer) {
        return None;
    }

    let word = u32::try_from(payload).ok();
    if signo == guess_signal() {
        word.map(|value| Event::Guess { value })
    } else if signo == libc::SIGUSR1 || signo == libc::SIGUSR2 {
        word.map(|attempts| Event::Verdict {
            correct: signo == libc::SIGUSR1,
            attempts,
        })
    } else if signo == begin_signal() {
        let round = u32::try_from(payload >> 1).ok()?;
        let role = if payload & 1 == 1 {
            Role::Thinker
        } else {
            Role::Guesser
        };
        Some(Event::Begin { round, role })
    } else if signo == ready_signal() {
        word.map(|round| Event::Ready { round })
    } else {
        None
    }
}

pub struct SignalTransport {
    peer: i32,
    fd: AsyncFd<File>,
}

impl SignalTransport {
    /// Open a signalfd for the game signals and bind to `peer`.
    ///
    /// The signals must already be blocked (see [`block_game_signals`]).
    /// Must be called inside a tokio runtime.
    pub fn open(peer: i32) -> io::Result<Self> {
        let set = game_sigset()?;
        // SAFETY: `set` is initialised; -1 asks for a new descriptor.
        let raw = unsafe { libc::signalfd(-1, &set, libc::SFD_NONBLOCK | libc::SFD_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: signalfd just returned this descriptor and nothing else owns it.
        let owned = unsafe { OwnedFd::from_raw_fd(raw) };

        tracing::debug!(peer, fd = raw, "Opened signalfd");
        Ok(Self {
            peer,
            fd: AsyncFd::new(File::from(owned))?,
        })
    }

    pub fn peer(&self) -> i32 {
        self.peer
    }
}

fn read_siginfo(file: &mut File) -> io::Result<libc::signalfd_siginfo> {
    let mut buf = [0u8; mem::size_of::<libc::signalfd_siginfo>()];
    let n = file.read(&mut buf)?;
    if n != buf.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short signalfd read: {n} bytes"),
        ));
    }
    // SAFETY: the kernel wrote a whole signalfd_siginfo, a plain integer struct.
    Ok(unsafe { std::ptr::read_unaligned(buf.as_ptr().cast::<libc::signalfd_siginfo>()) })
}

#[async_trait]
impl Transport for SignalTransport {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        let (signo, payload) = encode(event)?;
        let failed = |source: io::Error| TransportError::SendFailed {
            event: event.name(),
            pid: self.peer,
            source,
        };

        match payload {
            Some(word) => {
                let value = libc::sigval {
                    sival_ptr: word as *mut libc::c_void,
                };
                // SAFETY: plain syscall; the payload is an integer, never dereferenced.
                let rc = unsafe { libc::sigqueue(self.peer, signo, value) };
                if rc != 0 {
                    return Err(failed(io::Error::last_os_error()));
                }
            }
            None => {
                kill(Pid::from_raw(self.peer), Signal::SIGTERM)
                    .map_err(|errno| failed(io::Error::from(errno)))?;
            }
        }

        tracing::trace!(%event, signo, peer = self.peer, "Signal sent");
        Ok(())
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        loop {
            let info = {
                let mut guard = self.fd.readable_mut().await?;
                match guard.try_io(|fd| read_siginfo(fd.get_mut())) {
                    Ok(result) => result?,
                    Err(_would_block) => continue,
                }
            };

            let signo = info.ssi_signo as i32;
            match decode(signo, info.ssi_ptr, info.ssi_pid, self.peer) {
                Some(event) => {
                    tracing::trace!(%event, signo, sender = info.ssi_pid, "Signal received");
                    return Ok(event);
                }
                None => {
                    tracing::warn!(signo, sender = info.ssi_pid, "Ignoring unrelated signal");
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
