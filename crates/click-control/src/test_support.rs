//! In-process fake router for tests.
//!
//! [`FakeRouter`] listens on an ephemeral TCP port, accepts a single
//! connection, sends a greeting, and answers `READ` and `WRITEDATA` commands
//! from an in-memory handler table the way a Click router would.

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use click_config::SocketEndpoint;

use crate::status::{
    CODE_HANDLER_ERR, CODE_NO_ELEMENT, CODE_NO_HANDLER, CODE_NO_PERMISSION, CODE_OK,
    CODE_SYNTAX_ERR, CODE_UNIMPLEMENTED,
};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Greeting sent by Click 1.x routers.
pub const DEFAULT_GREETING: &str = "Click::ControlSocket/1.3";

/// Behaviour of one handler in the fake router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandler {
    value: Vec<u8>,
    readable: bool,
    writable: bool,
    error: Option<String>,
}

impl FakeHandler {
    /// A handler that returns `value` and rejects writes.
    #[must_use]
    pub fn read_only(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            readable: true,
            writable: false,
            error: None,
        }
    }

    /// A handler that stores written data and returns it on read.
    #[must_use]
    pub fn read_write(value: impl Into<Vec<u8>>) -> Self {
        Self {
            writable: true,
            ..Self::read_only(value)
        }
    }

    /// A handler that accepts writes but cannot be read.
    #[must_use]
    pub fn write_only() -> Self {
        Self {
            value: Vec::new(),
            readable: false,
            writable: true,
            error: None,
        }
    }

    /// A handler whose every call fails with status 520 and `message`.
    ///
    /// Multi-line messages are sent as continuation lines.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            value: Vec::new(),
            readable: true,
            writable: true,
            error: Some(message.into()),
        }
    }
}

/// Builder for [`FakeRouter`].
#[derive(Debug, Clone)]
pub struct FakeRouterBuilder {
    greeting: String,
    handlers: BTreeMap<String, FakeHandler>,
}

impl Default for FakeRouterBuilder {
    fn default() -> Self {
        Self {
            greeting: String::from(DEFAULT_GREETING),
            handlers: BTreeMap::new(),
        }
    }
}

impl FakeRouterBuilder {
    /// Overrides the greeting line (without terminator).
    #[must_use]
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Registers a handler under its full address, e.g. `src.rate` or `version`.
    #[must_use]
    pub fn handler(mut self, address: impl Into<String>, handler: FakeHandler) -> Self {
        self.handlers.insert(address.into(), handler);
        self
    }

    /// Starts serving on an ephemeral local port.
    pub fn spawn(self) -> io::Result<FakeRouter> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<io::Result<()>>>> = Arc::new(Mutex::new(None));
        let state = RouterState {
            handlers: self.handlers,
            requests: Arc::clone(&requests),
        };
        let greeting = self.greeting;
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = serve_client(&listener, &greeting, state);
            let mut guard = result_clone.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = Some(outcome);
        });
        Ok(FakeRouter {
            port,
            requests,
            result,
            handle: Some(handle),
        })
    }
}

/// A fake router serving one ControlSocket connection on a background thread.
pub struct FakeRouter {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    result: Arc<Mutex<Option<io::Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeRouter {
    /// Starts configuring a router with the default greeting.
    #[must_use]
    pub fn builder() -> FakeRouterBuilder {
        FakeRouterBuilder::default()
    }

    /// Local port the router listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Endpoint clients should connect to.
    #[must_use]
    pub fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.port)
    }

    /// Waits for the client to disconnect and returns the command lines it sent.
    pub fn take_requests(&mut self) -> io::Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| io::Error::other("fake router thread panicked"))?;
        }
        let outcome = self
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Err(error)) = outcome {
            return Err(error);
        }
        Ok(self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

impl Drop for FakeRouter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct RouterState {
    handlers: BTreeMap<String, FakeHandler>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RouterState {
    fn record(&self, line: &str) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }

    fn lookup(&self, address: &str) -> Result<&FakeHandler, Reply> {
        if let Some(handler) = self.handlers.get(address) {
            return Ok(handler);
        }
        if let Some((element, _)) = address.rsplit_once('.') {
            let prefix = format!("{element}.");
            if !self.handlers.keys().any(|key| key.starts_with(&prefix)) {
                return Err(Reply::status(
                    CODE_NO_ELEMENT,
                    &format!("No element named `{element}'"),
                ));
            }
        }
        Err(Reply::status(
            CODE_NO_HANDLER,
            &format!("No handler named `{address}'"),
        ))
    }

    fn read(&self, address: &str) -> Reply {
        match self.lookup(address) {
            Err(reply) => reply,
            Ok(FakeHandler {
                error: Some(message),
                ..
            }) => Reply::status(CODE_HANDLER_ERR, message),
            Ok(handler) if !handler.readable => Reply::status(
                CODE_NO_PERMISSION,
                &format!("Handler `{address}' is write-only"),
            ),
            Ok(handler) => {
                let mut reply = Reply::status(CODE_OK, &format!("Read handler `{address}' OK"));
                reply
                    .bytes
                    .extend_from_slice(format!("DATA {}\r\n", handler.value.len()).as_bytes());
                reply.bytes.extend_from_slice(&handler.value);
                reply
            }
        }
    }

    fn write(&mut self, address: &str, data: Vec<u8>) -> Reply {
        let handler = match self.lookup(address) {
            Err(reply) => return reply,
            Ok(handler) => handler.clone(),
        };
        if let Some(message) = &handler.error {
            return Reply::status(CODE_HANDLER_ERR, message);
        }
        if !handler.writable {
            return Reply::status(
                CODE_NO_PERMISSION,
                &format!("Handler `{address}' is read-only"),
            );
        }
        self.handlers.insert(
            address.to_owned(),
            FakeHandler {
                value: data,
                ..handler
            },
        );
        Reply::status(CODE_OK, &format!("Write handler `{address}' OK"))
    }
}

struct Reply {
    bytes: Vec<u8>,
}

impl Reply {
    /// Renders `message` as status lines, one per message line.
    fn status(code: u16, message: &str) -> Self {
        let lines: Vec<&str> = message.trim_end_matches('\n').split('\n').collect();
        let last = lines.len().saturating_sub(1);
        let mut bytes = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let separator = if index == last { ' ' } else { '-' };
            bytes.extend_from_slice(format!("{code}{separator}{line}\r\n").as_bytes());
        }
        Self { bytes }
    }
}

fn serve_client(listener: &TcpListener, greeting: &str, state: RouterState) -> io::Result<()> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return serve_connection(stream, greeting, state),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            // No client arrived; exit cleanly so tests that never connect do not hang.
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(error) => return Err(error),
        }
    }
}

fn serve_connection(stream: TcpStream, greeting: &str, mut state: RouterState) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(IDLE_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    writer.write_all(format!("{greeting}\r\n").as_bytes())?;
    writer.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(());
            }
            Err(error) => return Err(error),
        }
        let command = line.trim_end();
        state.record(command);
        let reply = match command.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["READ", address] => state.read(address),
            ["WRITEDATA", address, length] => match length.parse::<usize>() {
                Ok(length) => {
                    let mut data = vec![0_u8; length];
                    reader.read_exact(&mut data)?;
                    state.write(address, data)
                }
                Err(_) => Reply::status(CODE_SYNTAX_ERR, "Syntax error"),
            },
            ["READ" | "WRITEDATA", ..] => Reply::status(CODE_SYNTAX_ERR, "Syntax error"),
            _ => Reply::status(CODE_UNIMPLEMENTED, "Unimplemented command"),
        };
        writer.write_all(&reply.bytes)?;
        writer.flush()?;
    }
}
