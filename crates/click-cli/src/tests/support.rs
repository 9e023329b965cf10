//! Test support for CLI behavioural and unit coverage.
//!
//! Supplies a static configuration loader, a fake router preloaded with a
//! small configuration, and a world that captures CLI output.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::Cursor;
use std::net::TcpListener;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use click_config::{Config, SocketEndpoint};
use click_control::test_support::{FakeHandler, FakeRouter, FakeRouterBuilder};
use rstest::fixture;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) const ROUTER_VERSION: &str = "2.0.1";
pub(super) const ROUTER_CONFIG: &str = "src :: InfiniteSource;\nsrc -> sink :: Discard;\n";

/// A config loader that returns a fixed configuration.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Router with two elements, a handful of handlers and the global listings.
pub(super) fn sample_router() -> FakeRouterBuilder {
    FakeRouter::builder()
        .greeting("Click::ControlSocket/1.3")
        .handler("version", FakeHandler::read_only(format!("{ROUTER_VERSION}\n")))
        .handler("list", FakeHandler::read_only("2\nsrc\nsink\n"))
        .handler("classes", FakeHandler::read_only("Discard\nInfiniteSource\n"))
        .handler("packages", FakeHandler::read_only(""))
        .handler("requirements", FakeHandler::read_only("userlevel\n"))
        .handler("config", FakeHandler::read_only(ROUTER_CONFIG))
        .handler("flatconfig", FakeHandler::read_only("src :: InfiniteSource;\n"))
        .handler("src.handlers", FakeHandler::read_only("rate\trw\nreset\tw\ncount\tr\n"))
        .handler("src.rate", FakeHandler::read_write("10"))
        .handler("src.reset", FakeHandler::write_only())
        .handler("src.count", FakeHandler::read_only("42\n"))
        .handler("sink.count", FakeHandler::failing("counter\nunavailable"))
}

/// Test world holding CLI state, the fake router and captured output.
#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub router: Option<FakeRouter>,
    pub stdin: Vec<u8>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<String>,
}

impl TestWorld {
    pub fn start_router(&mut self) -> Result<()> {
        let router = sample_router().spawn().context("spawn fake router")?;
        self.config.control_socket = router.endpoint();
        self.router = Some(router);
        Ok(())
    }

    /// Points the configuration at a local port nothing listens on.
    pub fn configure_unreachable_router(&mut self) -> Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind placeholder listener")?;
        let port = listener.local_addr().context("placeholder address")?.port();
        drop(listener);
        self.config.control_socket = SocketEndpoint::tcp("127.0.0.1", port);
        Ok(())
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args = Self::build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut stdin = Cursor::new(self.stdin.clone());
        let mut io = IoStreams::new(&mut stdin, &mut self.stdout, &mut self.stderr, false);
        self.exit_code = Some(run_with_loader(args, &mut io, &loader));
        if let Some(mut router) = self.router.take() {
            self.requests = router.take_requests()?;
        }
        Ok(())
    }

    fn build_args(command: &str) -> Vec<OsString> {
        std::iter::once(OsString::from("clickctl"))
            .chain(command.split_whitespace().map(OsString::from))
            .collect()
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub fn assert_success(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::SUCCESS,
            "expected success, got {exit:?}; stderr: {:?}",
            self.stderr_text()?
        );
        Ok(())
    }

    pub fn assert_failure(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::FAILURE,
            "expected failure exit code, got {exit:?}"
        );
        Ok(())
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
