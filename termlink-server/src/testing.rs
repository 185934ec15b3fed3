//! In-memory PTY backend for tests

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use termlink_utils::{Result, TermlinkError};

use crate::pty::{PtyBackend, PtyConfig, PtyProcess, SpawnedPty};

/// Exit code reported for a killed mock process
pub const KILLED_EXIT_CODE: i32 = 1;

struct MockState {
    writes: Mutex<Vec<Vec<u8>>>,
    wrote: Condvar,
    stalled: AtomicBool,
    resizes: Mutex<Vec<(u16, u16)>>,
    kills: AtomicUsize,
    process_name: Mutex<Option<String>>,
    output: Mutex<Option<std_mpsc::Sender<Vec<u8>>>>,
    exit_code: Mutex<Option<i32>>,
    exited: Condvar,
}

/// Test double for a spawned process
#[derive(Clone)]
pub struct MockPty {
    state: Arc<MockState>,
}

impl MockPty {
    /// Create a mock process whose foreground process is `name`
    pub fn spawn(name: &str) -> (MockPty, SpawnedPty) {
        let (tx, rx) = std_mpsc::channel();
        let mock = MockPty {
            state: Arc::new(MockState {
                writes: Mutex::new(Vec::new()),
                wrote: Condvar::new(),
                stalled: AtomicBool::new(false),
                resizes: Mutex::new(Vec::new()),
                kills: AtomicUsize::new(0),
                process_name: Mutex::new(Some(name.to_string())),
                output: Mutex::new(Some(tx)),
                exit_code: Mutex::new(None),
                exited: Condvar::new(),
            }),
        };

        let spawned = SpawnedPty {
            process: Arc::new(mock.clone()),
            reader: Box::new(ChannelReader {
                rx,
                buf: Vec::new(),
            }),
        };

        (mock, spawned)
    }

    /// Produce terminal output
    pub fn emit(&self, data: &[u8]) {
        if let Some(tx) = self.state.output.lock().as_ref() {
            let _ = tx.send(data.to_vec());
        }
    }

    /// End the process with an exit code
    pub fn exit(&self, code: i32) {
        let mut exit_code = self.state.exit_code.lock();
        if exit_code.is_none() {
            *exit_code = Some(code);
        }
        self.state.output.lock().take();
        self.state.exited.notify_all();
    }

    pub fn set_process_name(&self, name: Option<&str>) {
        *self.state.process_name.lock() = name.map(str::to_string);
    }

    /// Make writes block until released or the process exits, like a child
    /// that has stopped reading its input
    pub fn stall_writes(&self, stall: bool) {
        let _exit_code = self.state.exit_code.lock();
        self.state.stalled.store(stall, Ordering::SeqCst);
        self.state.exited.notify_all();
    }

    /// Block until at least `count` writes have landed or a few seconds pass
    pub fn wait_for_writes(&self, count: usize) -> Vec<Vec<u8>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut writes = self.state.writes.lock();
        while writes.len() < count {
            if self.state.wrote.wait_until(&mut writes, deadline).timed_out() {
                break;
            }
        }
        writes.clone()
    }

    /// Every write, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.writes.lock().clone()
    }

    /// All writes concatenated
    pub fn written(&self) -> String {
        self.writes()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn resizes(&self) -> Vec<(u16, u16)> {
        self.state.resizes.lock().clone()
    }

    pub fn kill_count(&self) -> usize {
        self.state.kills.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.state.exit_code.lock().is_some()
    }
}

impl PtyProcess for MockPty {
    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut exit_code = self.state.exit_code.lock();
        while self.state.stalled.load(Ordering::SeqCst) && exit_code.is_none() {
            self.state.exited.wait(&mut exit_code);
        }
        if exit_code.is_some() {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        drop(exit_code);

        self.state.writes.lock().push(data.to_vec());
        self.state.wrote.notify_all();
        Ok(())
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        if self.has_exited() {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        self.state.resizes.lock().push((cols, rows));
        Ok(())
    }

    fn kill(&self) -> Result<()> {
        self.state.kills.fetch_add(1, Ordering::SeqCst);
        self.exit(KILLED_EXIT_CODE);
        Ok(())
    }

    fn wait(&self) -> Result<i32> {
        let mut exit_code = self.state.exit_code.lock();
        loop {
            if let Some(code) = *exit_code {
                return Ok(code);
            }
            self.state.exited.wait(&mut exit_code);
        }
    }

    fn process_name(&self) -> Option<String> {
        self.state.process_name.lock().clone()
    }
}

struct ChannelReader {
    rx: std_mpsc::Receiver<Vec<u8>>,
    buf: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.buf.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.buf = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.buf.drain(..n);
        Ok(n)
    }
}

/// Backend that hands out [`MockPty`] processes and remembers them
#[derive(Default)]
pub struct MockBackend {
    spawned: Mutex<Vec<(PtyConfig, MockPty)>>,
    fail: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent spawns fail as if PTY allocation broke
    pub fn fail_spawns(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().len()
    }

    /// Mock process for the n-th spawn
    pub fn process(&self, index: usize) -> MockPty {
        self.spawned.lock()[index].1.clone()
    }

    /// Config passed to the n-th spawn
    pub fn config(&self, index: usize) -> PtyConfig {
        self.spawned.lock()[index].0.clone()
    }

    pub fn processes(&self) -> Vec<MockPty> {
        self.spawned.lock().iter().map(|(_, p)| p.clone()).collect()
    }
}

impl PtyBackend for MockBackend {
    fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TermlinkError::ProcessSpawn("no PTY devices available".into()));
        }
        let (mock, spawned) = MockPty::spawn(&config.program_name());
        self.spawned.lock().push((config.clone(), mock));
        Ok(spawned)
    }
}
