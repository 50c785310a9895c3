//! The Stenura session.
//!
//! Opening a machine opens the serial device (9600 8N1, no flow control),
//! opens REALTIME.000 on the machine, drains whatever strokes it has been
//! holding, and then keeps three workers running over the shared port:
//!
//! - the *reader* blocks on whole reply packets and hands each to whichever
//!   pending request carries its sequence number;
//! - the *retrier* re-sends requests the machine has not answered, backing
//!   off by one retry interval per attempt, and fails them for good after
//!   three tries;
//! - the *poller* asks for new realtime bytes every 100 ms and feeds the
//!   decoded chords to the queue, in device order.
//!
//! All port writes go through one mutex so frames never interleave.
//! Shutdown is cooperative: a stop flag every loop checks, read timeouts so
//! the reader keeps checking it, and a close on the queue.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use steno_core::chord::Chord;
use steno_core::input::{ChordSource, SourceError};

use crate::decode::{decode_stroke, STROKE_LEN};
use crate::packet::{Request, Response};
use crate::queue::ChordQueue;
use crate::Error;

pub const BAUD_RATE: u32 = 9600;

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const RETRY_INTERVAL: Duration = Duration::from_secs(2);
const RETRY_TICK: Duration = Duration::from_millis(250);
const MAX_TRIES: u32 = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Callback = Box<dyn FnOnce(Option<Response>) + Send>;

/// A request that has been written and is waiting for its reply.
struct Pending {
    seq: u8,
    frame: Vec<u8>,
    sent_at: Instant,
    tries: u32,
    /// Runs with the reply, or with None on timeout.  Either way it runs
    /// exactly once.
    done: Callback,
}

struct Shared {
    writer: Mutex<Box<dyn SerialPort>>,
    pending: Mutex<Vec<Pending>>,
    next_seq: AtomicU8,
    stop: AtomicBool,
}

impl Shared {
    fn next_seq(&self) -> u8 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn write(&self, frame: &[u8]) -> Result<(), Error> {
        let mut port = self.writer.lock().unwrap();
        port.write_all(frame)?;
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Register a request and write it out.  The callback runs from a worker
/// thread with the reply, or with None if every retry goes unanswered.
fn send_request(shared: &Shared, req: &Request, done: Callback) -> Result<(), Error> {
    let frame = req.encode();
    {
        let mut pending = shared.pending.lock().unwrap();
        pending.push(Pending {
            seq: req.seq,
            frame: frame.clone(),
            sent_at: Instant::now(),
            tries: 1,
            done,
        });
    }
    shared.write(&frame)
}

/// Send a request and block for its reply.
fn call(shared: &Shared, req: &Request) -> Result<Response, Error> {
    let (tx, rx) = mpsc::sync_channel(1);
    send_request(
        shared,
        req,
        Box::new(move |reply| {
            let _ = tx.send(reply);
        }),
    )?;

    loop {
        match rx.recv_timeout(RETRY_TICK) {
            Ok(Some(reply)) => return Ok(reply),
            Ok(None) | Err(RecvTimeoutError::Disconnected) => return Err(Error::Timeout),
            Err(RecvTimeoutError::Timeout) => {
                if shared.stopped() {
                    return Err(Error::Timeout);
                }
            }
        }
    }
}

/// One retrier pass.  Overdue messages with tries left are re-sent with
/// their counter bumped; messages out of tries are removed and returned so
/// their callbacks can run outside the lock.
fn retry_sweep(pending: &mut Vec<Pending>, now: Instant) -> (Vec<Vec<u8>>, Vec<Pending>) {
    let mut resend = Vec::new();
    let mut expired = Vec::new();

    let mut at = 0;
    while at < pending.len() {
        let msg = &mut pending[at];
        if now.duration_since(msg.sent_at) <= RETRY_INTERVAL * msg.tries {
            at += 1;
            continue;
        }
        if msg.tries < MAX_TRIES {
            msg.tries += 1;
            resend.push(msg.frame.clone());
            at += 1;
        } else {
            expired.push(pending.remove(at));
        }
    }

    (resend, expired)
}

fn spawn_reader(shared: Arc<Shared>, mut port: Box<dyn SerialPort>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shared.stopped() {
            match Response::read_from(&mut port) {
                Ok(reply) => {
                    let found = {
                        let mut pending = shared.pending.lock().unwrap();
                        pending
                            .iter()
                            .position(|p| p.seq == reply.seq)
                            .map(|at| pending.remove(at))
                    };
                    match found {
                        Some(msg) => (msg.done)(Some(reply)),
                        None => log::warn!("reply with no pending request: seq {}", reply.seq),
                    }
                }
                // Read timeouts just mean nothing arrived; they keep the
                // stop flag checked.
                Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::TimedOut => (),
                Err(e) => log::warn!("reader: {}", e),
            }
        }
    })
}

fn spawn_retrier(shared: Arc<Shared>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shared.stopped() {
            thread::sleep(RETRY_TICK);
            let (resend, expired) = {
                let mut pending = shared.pending.lock().unwrap();
                retry_sweep(&mut pending, Instant::now())
            };
            for frame in resend {
                if let Err(e) = shared.write(&frame) {
                    log::warn!("retrier: {}", e);
                }
            }
            for msg in expired {
                log::warn!("request seq {} went unanswered, giving up", msg.seq);
                (msg.done)(None);
            }
        }

        // On the way out, fail whatever is still in flight so no caller is
        // left parked.
        let leftover: Vec<_> = shared.pending.lock().unwrap().drain(..).collect();
        for msg in leftover {
            (msg.done)(None);
        }
    })
}

fn spawn_poller(shared: Arc<Shared>, queue: Arc<ChordQueue>, start: u16) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut offset = start;
        while !shared.stopped() {
            match call(&shared, &Request::read_bytes(shared.next_seq(), offset)) {
                Ok(reply) => {
                    offset = offset.wrapping_add(reply.p1);
                    if let Some(data) = reply.data {
                        if data.len() % STROKE_LEN != 0 {
                            log::warn!(
                                "realtime data of {} bytes is not whole strokes",
                                data.len()
                            );
                        }
                        for frame in data.chunks_exact(STROKE_LEN) {
                            match decode_stroke(frame) {
                                Ok(chord) if chord.is_empty() => (),
                                Ok(chord) => {
                                    if !queue.push(chord) {
                                        return;
                                    }
                                }
                                Err(e) => log::warn!("poller: {}", e),
                            }
                        }
                    }
                }
                Err(Error::Timeout) => log::warn!("realtime poll timed out"),
                Err(e) => log::warn!("poller: {}", e),
            }
            thread::sleep(POLL_INTERVAL);
        }
    })
}

/// An open Stentura-family machine.
pub struct StenuraMachine {
    shared: Arc<Shared>,
    queue: Arc<ChordQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl StenuraMachine {
    /// Open the device, bring the session up, and start the realtime poll.
    pub fn open(path: &str) -> Result<StenuraMachine, Error> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        let reader_port = port.try_clone()?;

        let shared = Arc::new(Shared {
            writer: Mutex::new(port),
            pending: Mutex::new(Vec::new()),
            next_seq: AtomicU8::new(0),
            stop: AtomicBool::new(false),
        });
        let queue = Arc::new(ChordQueue::new());

        let mut workers = Vec::new();
        workers.push(spawn_reader(Arc::clone(&shared), reader_port));
        workers.push(spawn_retrier(Arc::clone(&shared)));

        // Open the realtime file, then step past whatever the machine has
        // been holding since it was last read.
        let session = (|| {
            call(&shared, &Request::open_realtime(shared.next_seq()))?;
            let mut offset = 0u16;
            loop {
                let reply = call(&shared, &Request::read_bytes(shared.next_seq(), offset))?;
                offset = offset.wrapping_add(reply.p1);
                if reply.data.is_none() {
                    return Ok(offset);
                }
            }
        })();

        let offset = match session {
            Ok(offset) => offset,
            Err(e) => {
                shared.stop.store(true, Ordering::Relaxed);
                queue.close();
                for worker in workers {
                    let _ = worker.join();
                }
                return Err(e);
            }
        };

        workers.push(spawn_poller(Arc::clone(&shared), Arc::clone(&queue), offset));

        Ok(StenuraMachine {
            shared,
            queue,
            workers,
        })
    }
}

impl ChordSource for StenuraMachine {
    fn read(&mut self) -> Result<Chord, SourceError> {
        self.queue.pop().ok_or(SourceError::Closed)
    }
}

impl Drop for StenuraMachine {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        self.queue.close();
        // Fail outstanding requests promptly; the retrier sweeps again on
        // its way out for anything that races in after this.
        let leftover: Vec<_> = self.shared.pending.lock().unwrap().drain(..).collect();
        for msg in leftover {
            (msg.done)(None);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
