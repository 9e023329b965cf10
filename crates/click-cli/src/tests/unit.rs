//! Unit coverage for the runner, outside the behavioural scenarios.

use super::support::*;

use std::io::Cursor;
use std::process::ExitCode;

use anyhow::{Context, Result};
use click_control::test_support::FakeHandler;
use rstest::rstest;
use serde_json::{Value, json};

use crate::{IoStreams, run_with_loader};

#[rstest]
#[case("--help")]
#[case("--version")]
fn help_and_version_flags_succeed_on_stdout(#[case] flag: &str) -> Result<()> {
    let mut stdin = Cursor::new(Vec::new());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut io = IoStreams::new(&mut stdin, &mut stdout, &mut stderr, false);
    let loader = StaticConfigLoader::new(click_config::Config::default());

    let exit = run_with_loader(["clickctl", flag].map(Into::into), &mut io, &loader);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(String::from_utf8(stdout)?.contains("clickctl"));
    assert!(stderr.is_empty());
    Ok(())
}

#[test]
fn unknown_command_is_a_usage_error() -> Result<()> {
    let mut world = TestWorld::default();
    world.run("reboot")?;
    world.assert_failure()?;
    assert!(world.stderr_text()?.contains("unrecognized subcommand"));
    Ok(())
}

fn json_stdout(world: &TestWorld) -> Result<Value> {
    serde_json::from_str(&world.stdout_text()?).context("stdout is not JSON")
}

#[test]
fn element_list_renders_as_json_array() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("--output json list")?;
    world.assert_success()?;
    assert_eq!(json_stdout(&world)?, json!(["src", "sink"]));
    Ok(())
}

#[test]
fn redirected_output_defaults_to_json() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("handlers src")?;
    world.assert_success()?;
    assert_eq!(
        json_stdout(&world)?,
        json!([
            { "name": "rate", "address": "src.rate", "readable": true, "writable": true },
            { "name": "reset", "address": "src.reset", "readable": false, "writable": true },
            { "name": "count", "address": "src.count", "readable": true, "writable": false },
        ])
    );
    Ok(())
}

#[test]
fn info_gathers_every_listing() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("--output json info")?;
    world.assert_success()?;
    assert_eq!(
        json_stdout(&world)?,
        json!({
            "version": ROUTER_VERSION,
            "classes": ["Discard", "InfiniteSource"],
            "config": ROUTER_CONFIG,
            "elements": ["src", "sink"],
            "packages": [],
            "requirements": ["userlevel"],
        })
    );
    assert_eq!(
        world.requests,
        [
            "READ version",
            "READ classes",
            "READ config",
            "READ list",
            "READ packages",
            "READ requirements",
        ]
    );
    Ok(())
}

#[rstest]
#[case("config", "READ config", ROUTER_CONFIG)]
#[case("config --flat", "READ flatconfig", "src :: InfiniteSource;\n")]
#[case("classes", "READ classes", "Discard\nInfiniteSource\n")]
#[case("packages", "READ packages", "")]
#[case("requirements", "READ requirements", "userlevel\n")]
fn listings_render_for_humans(
    #[case] command: &str,
    #[case] request: &str,
    #[case] expected: &str,
) -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run(&format!("--output human {command}"))?;
    world.assert_success()?;
    assert_eq!(world.stdout_text()?, expected);
    assert_eq!(world.requests, [request]);
    Ok(())
}

#[test]
fn binary_payloads_pass_through_untouched() -> Result<()> {
    let payload = vec![0_u8, 255, 10, 13, 7];
    let router = sample_router()
        .handler("src.snapshot", FakeHandler::read_only(payload.clone()))
        .spawn()?;
    let mut world = TestWorld::default();
    world.config.control_socket = router.endpoint();
    world.router = Some(router);

    world.run("--output human read src.snapshot")?;
    world.assert_success()?;
    assert_eq!(world.stdout, payload);
    Ok(())
}

#[test]
fn json_write_reports_a_receipt() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("--output json write src.rate 250")?;
    world.assert_success()?;
    assert_eq!(
        json_stdout(&world)?,
        json!({ "handler": "src.rate", "bytes": 3 })
    );
    Ok(())
}

#[test]
fn malformed_handler_address_is_rejected() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("read src.")?;
    world.assert_failure()?;
    assert!(world.stderr_text()?.contains("invalid handler address"));
    assert!(world.requests.is_empty());
    Ok(())
}

#[test]
fn permission_errors_are_reported() -> Result<()> {
    let mut world = TestWorld::default();
    world.start_router()?;
    world.run("read src.reset")?;
    world.assert_failure()?;
    assert!(
        world
            .stderr_text()?
            .contains("permission denied calling handler `src.reset'")
    );
    Ok(())
}
