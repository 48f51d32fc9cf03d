use crate::engine::EventHandler;
use crate::event::{Buffer, Connection, Event, FirmwareVersion, Status};
use crate::router::{LifecycleRouter, Report, ServerRouter};
use crate::tests::mock::{MockEngine, MockReporter};
use mockall::predicate::eq;
use mockall::Sequence;

#[test]
fn test_server_connection_active_reported() {
    let mut engine = MockEngine::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::ConnectionActive { connection: 1 }))
        .times(1)
        .return_const(());

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(1, true);

    let status = router.handle_event(&mut engine, &Event::ConnectionActive(&connection));
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_server_data_received_reported_and_closed() {
    let mut sequence = Sequence::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::DataReceived {
            connection: 0,
            length: 4,
        }))
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());

    let mut engine = MockEngine::new();
    engine
        .expect_close_connection()
        .withf(|connection, graceful| connection.number() == 0 && !graceful)
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(()));

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(0, true);
    let segments: [&[u8]; 1] = [b"PING"];

    let status = router.handle_event(
        &mut engine,
        &Event::DataReceived {
            connection: &connection,
            buffer: Some(Buffer::new(&segments)),
        },
    );
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_server_data_received_total_length_of_all_segments() {
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::DataReceived {
            connection: 4,
            length: 40,
        }))
        .times(1)
        .return_const(());

    let mut engine = MockEngine::new();
    engine.expect_close_connection().times(1).returning(|_, _| Ok(()));

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(4, true);
    let segments: [&[u8]; 3] = [&[0x1; 16], &[0x2; 16], &[0x3; 8]];

    router.handle_event(
        &mut engine,
        &Event::DataReceived {
            connection: &connection,
            buffer: Some(Buffer::new(&segments)),
        },
    );
}

#[test]
fn test_server_data_received_without_buffer() {
    // No report expected
    let reporter = MockReporter::new();

    let mut engine = MockEngine::new();
    engine
        .expect_close_connection()
        .withf(|connection, graceful| connection.number() == 2 && !graceful)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(2, true);

    let status = router.handle_event(
        &mut engine,
        &Event::DataReceived {
            connection: &connection,
            buffer: None,
        },
    );
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_server_close_failure_reported() {
    let mut sequence = Sequence::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::DataReceived {
            connection: 3,
            length: 4,
        }))
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    reporter
        .expect_report()
        .with(eq(Report::CloseFailed { connection: 3 }))
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());

    let mut engine = MockEngine::new();
    engine.expect_close_connection().times(1).returning(|_, _| Err(7));

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(3, true);
    let segments: [&[u8]; 1] = [b"PING"];

    let status = router.handle_event(
        &mut engine,
        &Event::DataReceived {
            connection: &connection,
            buffer: Some(Buffer::new(&segments)),
        },
    );
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_server_connection_closed_reported() {
    let mut engine = MockEngine::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::ConnectionClosed { connection: 1 }))
        .times(1)
        .return_const(());

    let mut router = ServerRouter::with_reporter(reporter);
    let connection = Connection::new(1, false);

    let status = router.handle_event(&mut engine, &Event::ConnectionClosed(&connection));
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_server_lifecycle_events_ignored() {
    let mut engine = MockEngine::new();
    let mut router = ServerRouter::with_reporter(MockReporter::new());

    assert_eq!(Status::Ok, router.handle_event(&mut engine, &Event::InitFinished));
    assert_eq!(Status::Ok, router.handle_event(&mut engine, &Event::Reset));
    assert_eq!(Status::Ok, router.handle_event(&mut engine, &Event::VersionNotSupported));
}

#[test]
fn test_lifecycle_version_not_supported_reported() {
    let mut engine = MockEngine::new();
    engine
        .expect_minimum_firmware_version()
        .times(1)
        .return_const(FirmwareVersion::new(1, 7, 0));
    engine
        .expect_current_firmware_version()
        .times(1)
        .return_const(FirmwareVersion::new(1, 6, 2));

    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::UnsupportedFirmware {
            minimum: FirmwareVersion::new(1, 7, 0),
            current: FirmwareVersion::new(1, 6, 2),
        }))
        .times(1)
        .return_const(());

    let mut router = LifecycleRouter::with_reporter(reporter);
    let status = router.handle_event(&mut engine, &Event::VersionNotSupported);
    assert_eq!(Status::Ok, status);
}

#[test]
fn test_lifecycle_init_finished_reported() {
    let mut engine = MockEngine::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::Initialized))
        .times(1)
        .return_const(());

    let mut router = LifecycleRouter::with_reporter(reporter);
    assert_eq!(Status::Ok, router.handle_event(&mut engine, &Event::InitFinished));
}

#[test]
fn test_lifecycle_reset_reported() {
    let mut engine = MockEngine::new();
    let mut reporter = MockReporter::new();
    reporter
        .expect_report()
        .with(eq(Report::DeviceReset))
        .times(1)
        .return_const(());

    let mut router = LifecycleRouter::with_reporter(reporter);
    assert_eq!(Status::Ok, router.handle_event(&mut engine, &Event::Reset));
}

#[test]
fn test_lifecycle_connection_events_ignored() {
    let mut engine = MockEngine::new();
    let mut router = LifecycleRouter::with_reporter(MockReporter::new());
    let connection = Connection::new(0, true);
    let segments: [&[u8]; 1] = [b"PING"];

    assert_eq!(
        Status::Ok,
        router.handle_event(&mut engine, &Event::ConnectionActive(&connection))
    );
    assert_eq!(
        Status::Ok,
        router.handle_event(
            &mut engine,
            &Event::DataReceived {
                connection: &connection,
                buffer: Some(Buffer::new(&segments)),
            }
        )
    );
    assert_eq!(
        Status::Ok,
        router.handle_event(&mut engine, &Event::ConnectionClosed(&connection))
    );
}

#[test]
fn test_report_messages() {
    use alloc::string::ToString;

    assert_eq!(
        "Connection 1 active as server",
        Report::ConnectionActive { connection: 1 }.to_string()
    );
    assert_eq!(
        "Server connection 0 data received with 4 bytes",
        Report::DataReceived {
            connection: 0,
            length: 4
        }
        .to_string()
    );
    assert_eq!(
        "Server connection 2 closed",
        Report::ConnectionClosed { connection: 2 }.to_string()
    );
    assert_eq!("Library initialized", Report::Initialized.to_string());
    assert_eq!("Device reset detected", Report::DeviceReset.to_string());
    assert_eq!(
        "Current AT version 1.6.2 is not supported, minimum required AT version is 1.7.0",
        Report::UnsupportedFirmware {
            minimum: FirmwareVersion::new(1, 7, 0),
            current: FirmwareVersion::new(1, 6, 2),
        }
        .to_string()
    );
}
