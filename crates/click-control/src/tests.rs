//! Exchange-level tests against scripted transports and the fake router.


use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rstest::rstest;

use crate::status::MAX_LINE_LENGTH;
use crate::test_support::{FakeHandler, FakeRouter};
use crate::{
    ClientOptions, ControlError, ControlSocket, ErrorKind, HandlerAddress, HandlerDescriptor,
};
use scripted::ScriptedStream;

fn scripted_socket(response: &[u8], chunk: usize) -> crate::Result<ControlSocket<ScriptedStream>> {
    ControlSocket::handshake(
        ScriptedStream::new(response.to_vec(), chunk),
        "scripted",
        &ClientOptions::default(),
    )
}

fn read_response(payload: &[u8]) -> Vec<u8> {
    let mut response = b"Click::ControlSocket/1.3\r\n200 Read handler OK\r\n".to_vec();
    response.extend_from_slice(format!("DATA {}\r\n", payload.len()).as_bytes());
    response.extend_from_slice(payload);
    response
}

#[test]
fn version_is_read_and_trimmed() -> Result<()> {
    let mut socket = scripted_socket(b"click/1.0\n200 OK\nDATA 6\n1.0.0\n", 4096)?;
    assert_eq!(socket.version()?, "1.0.0");
    Ok(())
}

#[test]
fn read_sends_addressed_request_line() -> Result<()> {
    let stream = ScriptedStream::new(read_response(b"42"), 4096);
    let written = stream.written_log();
    let mut socket = ControlSocket::handshake(stream, "scripted", &ClientOptions::default())?;

    assert_eq!(socket.read(Some("q"), "length")?, b"42");
    assert_eq!(written.borrow().as_slice(), b"READ q.length\n");
    Ok(())
}

#[test]
fn write_sends_length_prefixed_data() -> Result<()> {
    let stream = ScriptedStream::new(b"click/1.0\n200 Write handler OK\n".to_vec(), 4096);
    let written = stream.written_log();
    let mut socket = ControlSocket::handshake(stream, "scripted", &ClientOptions::default())?;

    socket.write(Some("src"), "rate", b"1000")?;
    assert_eq!(written.borrow().as_slice(), b"WRITEDATA src.rate 4\n1000");
    Ok(())
}

#[rstest]
fn payload_survives_any_chunking(
    #[values(1, 2, 3, 7, 64, 4096)] chunk: usize,
    #[values(0, 1, 5, 300)] length: usize,
) -> Result<()> {
    let payload: Vec<u8> = (0..length).map(|index| (index % 251) as u8).collect();
    let mut socket = scripted_socket(&read_response(&payload), chunk)?;
    assert_eq!(socket.read(None, "data")?, payload);
    Ok(())
}

#[test]
fn consecutive_reads_stay_frame_aligned() -> Result<()> {
    let mut response = read_response(b"a\nb\n");
    response.extend_from_slice(b"200 OK\r\nDATA 3\r\nxyz");
    let mut socket = scripted_socket(&response, 1)?;

    assert_eq!(socket.read(None, "first")?, b"a\nb\n");
    assert_eq!(socket.read(None, "second")?, b"xyz");
    Ok(())
}

#[rstest]
#[case(b"click/2.0\n".as_slice(), ErrorKind::VersionMismatch)]
#[case(b"click/0.9\n".as_slice(), ErrorKind::VersionMismatch)]
#[case(b"hello router\n".as_slice(), ErrorKind::Protocol)]
#[case(b"".as_slice(), ErrorKind::Transport)]
fn handshake_failures_shut_the_transport(
    #[case] greeting: &[u8],
    #[case] expected: ErrorKind,
) {
    let stream = ScriptedStream::new(greeting.to_vec(), 4096);
    let shutdowns = stream.shutdown_counter();
    let error = ControlSocket::handshake(stream, "scripted", &ClientOptions::default())
        .expect_err("handshake must fail");
    assert_eq!(error.kind(), expected);
    assert_eq!(shutdowns.get(), 1);
}

#[rstest]
#[case(0, true)]
#[case(3, true)]
#[case(4, false)]
fn minimum_minor_version_is_configurable(#[case] min_minor: u32, #[case] accepted: bool) {
    let options = ClientOptions {
        min_protocol_minor: min_minor,
        ..ClientOptions::default()
    };
    let result = ControlSocket::handshake(
        ScriptedStream::new(b"Click::ControlSocket/1.3\n".to_vec(), 4096),
        "scripted",
        &options,
    );
    assert_eq!(result.is_ok(), accepted);
    if let Ok(socket) = result {
        assert_eq!(socket.protocol_minor_version(), 3);
    }
}

#[test]
fn malformed_length_closes_the_connection() -> Result<()> {
    let mut socket = scripted_socket(b"click/1.0\n200 OK\nDATA\n", 4096)?;

    let error = socket.read(None, "version").expect_err("length is malformed");
    assert!(matches!(error, ControlError::MalformedLength { .. }));
    assert!(socket.is_closed());

    let error = socket.version().expect_err("connection is closed");
    assert_eq!(error.kind(), ErrorKind::Closed);
    Ok(())
}

#[test]
fn truncated_payload_closes_the_connection() -> Result<()> {
    let mut socket = scripted_socket(b"click/1.0\n200 OK\nDATA 10\nshort", 3)?;
    let error = socket.read(None, "data").expect_err("payload is truncated");
    assert!(matches!(error, ControlError::ConnectionClosed));
    assert!(socket.is_closed());
    Ok(())
}

#[rstest]
#[case(b"DATA 18446744073709551615\n".as_slice(), ErrorKind::Transport)]
#[case(b"DATA 99999999999999999999999\n".as_slice(), ErrorKind::Protocol)]
fn inflated_length_fails_without_panicking(
    #[case] length_line: &[u8],
    #[case] expected: ErrorKind,
) -> Result<()> {
    let mut response = b"click/1.0\n200 OK\n".to_vec();
    response.extend_from_slice(length_line);
    response.extend_from_slice(b"tiny");
    let mut socket = scripted_socket(&response, 4096)?;

    let error = socket.read(None, "data").expect_err("length exceeds the payload");
    assert_eq!(error.kind(), expected);
    assert!(socket.is_closed());
    Ok(())
}

fn unterminated_line(prefix: &[u8]) -> Vec<u8> {
    let mut line = prefix.to_vec();
    line.resize(MAX_LINE_LENGTH + 16, b'x');
    line
}

#[test]
fn overlong_greeting_is_rejected() {
    let stream = ScriptedStream::new(unterminated_line(b"click/1."), 4096);
    let shutdowns = stream.shutdown_counter();
    let error = ControlSocket::handshake(stream, "scripted", &ClientOptions::default())
        .expect_err("greeting never ends");
    assert!(matches!(error, ControlError::MalformedGreeting { .. }));
    assert_eq!(shutdowns.get(), 1);
}

#[test]
fn overlong_status_line_closes_the_connection() -> Result<()> {
    let mut response = b"click/1.0\n".to_vec();
    response.extend(unterminated_line(b"200-"));
    let mut socket = scripted_socket(&response, 4096)?;

    let error = socket.read(None, "version").expect_err("status line never ends");
    assert!(matches!(error, ControlError::MalformedStatusLine { .. }));
    assert!(socket.is_closed());
    Ok(())
}

#[test]
fn line_at_the_limit_is_accepted() -> Result<()> {
    let mut response = b"click/1.0\n".to_vec();
    let mut status = b"200 ".to_vec();
    status.resize(MAX_LINE_LENGTH - 1, b'k');
    status.push(b'\n');
    response.extend(status);
    response.extend_from_slice(b"DATA 2\nok");
    let mut socket = scripted_socket(&response, 4096)?;

    assert_eq!(socket.read(None, "data")?, b"ok");
    Ok(())
}

#[test]
fn close_is_idempotent_and_swallows_errors() -> Result<()> {
    let stream = ScriptedStream::new(b"click/1.0\n".to_vec(), 4096);
    let shutdowns = stream.shutdown_counter();
    let mut socket = ControlSocket::handshake(stream, "scripted", &ClientOptions::default())?;

    socket.close();
    socket.close();
    assert!(socket.is_closed());
    assert_eq!(shutdowns.get(), 1);
    Ok(())
}

fn sample_router() -> Result<FakeRouter> {
    FakeRouter::builder()
        .greeting("click/1.0")
        .handler("version", FakeHandler::read_only("2.0.1\n"))
        .handler("list", FakeHandler::read_only("2\nsrc\nsink\n"))
        .handler("classes", FakeHandler::read_only("Counter\nDiscard\nQueue\n"))
        .handler("packages", FakeHandler::read_only(""))
        .handler("requirements", FakeHandler::read_only("linuxmodule\n"))
        .handler("config", FakeHandler::read_only("src :: InfiniteSource;\n"))
        .handler("flatconfig", FakeHandler::read_only("src :: InfiniteSource;\n"))
        .handler("src.handlers", FakeHandler::read_only("rate\trw\nreset w\ncount r\n"))
        .handler("src.rate", FakeHandler::read_write("10"))
        .handler("src.reset", FakeHandler::write_only())
        .handler("src.count", FakeHandler::read_only("0"))
        .handler("src.limit", FakeHandler::failing("limit must be\npositive"))
        .spawn()
        .context("spawn fake router")
}

fn connect(router: &FakeRouter) -> crate::Result<ControlSocket> {
    ControlSocket::connect(&router.endpoint(), &ClientOptions::default())
}

#[test]
fn written_data_reads_back_unchanged() -> Result<()> {
    let mut router = sample_router()?;
    let mut socket = connect(&router)?;
    let data = b"12\0\xff rate\n".to_vec();

    socket.write(Some("src"), "rate", &data)?;
    assert_eq!(socket.read(Some("src"), "rate")?, data);
    socket.close();

    let requests = router.take_requests()?;
    assert_eq!(
        requests,
        vec![
            format!("WRITEDATA src.rate {}", data.len()),
            String::from("READ src.rate")
        ]
    );
    Ok(())
}

#[test]
fn directory_helpers_parse_router_listings() -> Result<()> {
    let router = sample_router()?;
    let mut socket = connect(&router)?;

    assert_eq!(socket.version()?, "2.0.1");
    assert_eq!(socket.list_element_names()?, ["src", "sink"]);
    assert_eq!(socket.list_classes()?, ["Counter", "Discard", "Queue"]);
    assert!(socket.list_packages()?.is_empty());
    assert_eq!(socket.list_requirements()?, ["linuxmodule"]);
    assert_eq!(socket.config()?, "src :: InfiniteSource;\n");
    assert_eq!(socket.flat_config()?, "src :: InfiniteSource;\n");
    assert_eq!(
        socket.list_handlers("src")?,
        vec![
            HandlerDescriptor::new(HandlerAddress::element("src", "rate"), true, true),
            HandlerDescriptor::new(HandlerAddress::element("src", "reset"), false, true),
            HandlerDescriptor::new(HandlerAddress::element("src", "count"), true, false),
        ]
    );
    Ok(())
}

#[test]
fn classified_errors_leave_the_connection_usable() -> Result<()> {
    let router = sample_router()?;
    let mut socket = connect(&router)?;

    let missing = socket.read(Some("src"), "bogus").expect_err("no such handler");
    assert!(matches!(missing, ControlError::NoSuchHandler { ref handler } if handler == "src.bogus"));

    let element = socket.list_handlers("ghost").expect_err("no such element");
    assert!(matches!(element, ControlError::NoSuchElement { ref element } if element == "ghost"));

    let denied = socket.write(Some("src"), "count", b"1").expect_err("read-only handler");
    assert_eq!(denied.kind(), ErrorKind::PermissionDenied);

    let unreadable = socket.read(Some("src"), "reset").expect_err("write-only handler");
    assert_eq!(unreadable.kind(), ErrorKind::PermissionDenied);

    assert!(!socket.is_closed());
    assert_eq!(socket.version()?, "2.0.1");
    Ok(())
}

#[test]
fn handler_errors_carry_every_message_line() -> Result<()> {
    let router = sample_router()?;
    let mut socket = connect(&router)?;

    match socket.write(Some("src"), "limit", b"-1") {
        Err(ControlError::Handler { handler, message }) => {
            assert_eq!(handler, "src.limit");
            assert_eq!(message, "limit must be\npositive\n");
        }
        other => panic!("expected handler error, got {other:?}"),
    }

    match socket.read(Some("src"), "limit") {
        Err(ControlError::Handler { message, .. }) => {
            assert_eq!(message, "limit must bepositive");
        }
        other => panic!("expected handler error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn read_timeout_discards_the_connection() -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind silent router")?;
    let port = listener.local_addr().context("local addr")?.port();
    let server = thread::spawn(move || -> std::io::Result<()> {
        let (mut stream, _) = listener.accept()?;
        stream.write_all(b"click/1.0\n")?;
        thread::sleep(Duration::from_millis(500));
        Ok(())
    });

    let options = ClientOptions {
        read_timeout: Some(Duration::from_millis(50)),
        ..ClientOptions::default()
    };
    let endpoint = click_config::SocketEndpoint::tcp("127.0.0.1", port);
    let mut socket = ControlSocket::connect(&endpoint, &options)?;
    let error = socket.version().expect_err("router never answers");
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(socket.is_closed());

    server
        .join()
        .map_err(|_| anyhow::anyhow!("silent router panicked"))??;
    Ok(())
}
