//! In-memory stand-ins for PTY processes and WebSocket peers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use termbridge_pty::{
    wait_for_exit, Geometry, ProcessControl, ProcessExit, ProcessHandle, ProcessSignal, PtyError,
    SpawnOptions, Supervisor, Termination,
};
use tokio::io::DuplexStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::session::SessionSettings;

/// Exit code a fake process reports when it is terminated.
pub(crate) const HANGUP_EXIT: u32 = 129;

/// Observations recorded by a fake process.
#[derive(Clone, Default)]
pub(crate) struct FakeRecord {
    pub terminations: Arc<AtomicUsize>,
    pub resizes: Arc<Mutex<Vec<Geometry>>>,
    pub signals: Arc<Mutex<Vec<ProcessSignal>>>,
}

impl FakeRecord {
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn resizes(&self) -> Vec<Geometry> {
        self.resizes.lock().unwrap().clone()
    }

    pub fn signals(&self) -> Vec<ProcessSignal> {
        self.signals.lock().unwrap().clone()
    }
}

struct FakeControl {
    record: FakeRecord,
    exit_tx: Arc<watch::Sender<Option<ProcessExit>>>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
    geometry: Geometry,
    terminated: bool,
}

#[async_trait]
impl ProcessControl for FakeControl {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn resize(&mut self, geometry: Geometry) -> Result<(), PtyError> {
        self.geometry = geometry;
        self.record.resizes.lock().unwrap().push(geometry);
        Ok(())
    }

    fn signal(&mut self, signal: ProcessSignal) -> Result<(), PtyError> {
        self.record.signals.lock().unwrap().push(signal);
        Ok(())
    }

    fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>> {
        self.exit_rx.clone()
    }

    async fn terminate(&mut self, _grace: Duration) -> Termination {
        if self.terminated {
            return Termination::AlreadyTerminated;
        }
        self.terminated = true;
        self.record.terminations.fetch_add(1, Ordering::SeqCst);
        let recorded = *self.exit_rx.borrow();
        if let Some(exit) = recorded {
            return Termination::Exited(Some(exit));
        }
        let exit = ProcessExit { code: HANGUP_EXIT };
        self.exit_tx.send_replace(Some(exit));
        Termination::Exited(Some(exit))
    }
}

/// The far side of a fake process: what the "program" sees.
pub(crate) struct FakeProcess {
    /// Bytes written here come out of the process.
    pub output: mpsc::Sender<Vec<u8>>,
    /// Bytes the session delivered as input.
    pub input: mpsc::Receiver<Vec<u8>>,
    pub record: FakeRecord,
    exit_tx: Arc<watch::Sender<Option<ProcessExit>>>,
}

impl FakeProcess {
    pub fn exit(&self, code: u32) {
        self.exit_tx.send_replace(Some(ProcessExit { code }));
    }

    pub fn exit_status(&self) -> Option<ProcessExit> {
        *self.exit_tx.borrow()
    }

    pub fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>> {
        self.exit_tx.subscribe()
    }
}

pub(crate) fn fake_process(depth: usize) -> (ProcessHandle, FakeProcess) {
    let (output_tx, output_rx) = mpsc::channel(depth);
    let (input_tx, input_rx) = mpsc::channel(depth);
    let (exit_tx, exit_rx) = watch::channel(None);
    let exit_tx = Arc::new(exit_tx);
    let record = FakeRecord::default();

    let control = FakeControl {
        record: record.clone(),
        exit_tx: Arc::clone(&exit_tx),
        exit_rx,
        geometry: Geometry::default(),
        terminated: false,
    };
    let handle = ProcessHandle {
        control: Box::new(control),
        output: output_rx,
        input: input_tx,
    };
    let fake = FakeProcess {
        output: output_tx,
        input: input_rx,
        record,
        exit_tx,
    };
    (handle, fake)
}

pub(crate) enum FakeBehavior {
    FailSpawn,
    /// A line-oriented shell that understands `echo <text>` and `exit`.
    Echo,
    /// `Echo`, but each spawn blocks for the given time first.
    SlowEcho(Duration),
}

pub(crate) struct FakeSupervisor {
    behavior: FakeBehavior,
    runtime: Handle,
    spawn_calls: AtomicUsize,
    records: Mutex<Vec<FakeRecord>>,
}

impl FakeSupervisor {
    /// Must be called from inside a runtime.
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            runtime: Handle::current(),
            spawn_calls: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn spawn_calls(&self) -> usize {
        self.spawn_calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<FakeRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl Supervisor for FakeSupervisor {
    fn spawn(&self, options: &SpawnOptions) -> Result<ProcessHandle, PtyError> {
        self.spawn_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            FakeBehavior::FailSpawn => Err(PtyError::SpawnFailed(format!(
                "{}: No such file or directory",
                options.program
            ))),
            FakeBehavior::Echo | FakeBehavior::SlowEcho(_) => {
                if let FakeBehavior::SlowEcho(delay) = self.behavior {
                    std::thread::sleep(delay);
                }
                let (handle, fake) = fake_process(options.output_depth);
                self.records.lock().unwrap().push(fake.record.clone());
                self.runtime.spawn(echo_shell(fake));
                Ok(handle)
            }
        }
    }
}

async fn echo_shell(mut fake: FakeProcess) {
    let mut exited = fake.exit_watch();
    let mut line = Vec::new();
    if fake.output.send(b"$ ".to_vec()).await.is_err() {
        return;
    }
    loop {
        let chunk = tokio::select! {
            chunk = fake.input.recv() => chunk,
            _ = wait_for_exit(&mut exited) => return,
        };
        let Some(chunk) = chunk else { return };
        line.extend_from_slice(&chunk);

        while let Some(end) = line.iter().position(|b| *b == b'\n') {
            let command: Vec<u8> = line.drain(..=end).collect();
            let command = String::from_utf8_lossy(&command).trim_end().to_string();
            if command == "exit" {
                fake.exit(0);
                return;
            }
            let reply = match command.strip_prefix("echo ") {
                Some(text) => format!("{text}\r\n$ "),
                None => format!("{command}: command not found\r\n$ "),
            };
            if fake.output.send(reply.into_bytes()).await.is_err() {
                return;
            }
        }
    }
}

/// A connected server/client WebSocket pair over an in-memory pipe.
pub(crate) async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    tokio::join!(
        WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        WebSocketStream::from_raw_socket(client_io, Role::Client, None),
    )
}

pub(crate) fn test_settings() -> SessionSettings {
    SessionSettings {
        grace_period: Duration::from_millis(200),
        drain_timeout: Duration::from_millis(100),
        close_timeout: Duration::from_millis(500),
        control_frames: true,
        ping_interval: None,
    }
}

pub(crate) fn test_peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40_000))
}

/// Everything a client received before the connection ended.
pub(crate) struct Received {
    pub bytes: Vec<u8>,
    pub close: Option<CloseFrame>,
}

impl Received {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Read until the server closes the connection.
pub(crate) async fn read_until_close<S>(client: &mut S) -> Received
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut received = Received {
        bytes: Vec::new(),
        close: None,
    };
    loop {
        match tokio::time::timeout(Duration::from_secs(5), client.next()).await {
            Ok(Some(Ok(Message::Binary(bytes)))) => received.bytes.extend_from_slice(&bytes),
            Ok(Some(Ok(Message::Text(text)))) => received.bytes.extend_from_slice(text.as_bytes()),
            Ok(Some(Ok(Message::Close(frame)))) => {
                received.close = frame;
                return received;
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) | Ok(None) => return received,
            Err(_) => panic!("connection still open after 5s"),
        }
    }
}

/// Read until the accumulated output contains `needle`.
pub(crate) async fn read_until<S>(client: &mut S, needle: &str) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut bytes = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.contains(needle) {
            return text;
        }
        match tokio::time::timeout_at(deadline, client.next()).await {
            Ok(Some(Ok(Message::Binary(chunk)))) => bytes.extend_from_slice(&chunk),
            Ok(Some(Ok(_))) => {}
            Ok(other) => panic!("stream ended before {needle:?}: {other:?}; got {text:?}"),
            Err(_) => panic!("timed out waiting for {needle:?}; got {text:?}"),
        }
    }
}

/// Poll `check` until it holds or three seconds pass.
pub(crate) async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
