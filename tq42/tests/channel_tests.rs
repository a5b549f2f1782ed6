use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use tonic::{Code, Status};

use tq42::channel::{Channel, ReconnectPolicy, Retry, SessionConf, SessionEnd};
use tq42::errors::Error;
use tq42::protocol::{Ask, Parameter, Payload, Tell};
use tq42::test_utils::{ask_message, completion_message, MockTransport, Step};

static INIT: Once = Once::new();
const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Debug;
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

fn initialize() {
    INIT.call_once(|| {
        env_logger::builder()
            // Suppress everything below `warn` for third-party modules
            .filter_level(log::LevelFilter::Warn)
            // Allow everything above `LOG_LEVEL` from current package
            .filter_module(env!("CARGO_PKG_NAME"), LOG_LEVEL)
            .is_test(true)
            .init();
    });
}

async fn squares(ask: Ask) -> Result<Tell, std::io::Error> {
    let results = ask
        .parameters
        .iter()
        .map(|parameter| parameter.values.iter().map(|value| value * value).sum::<f64>())
        .collect();
    Ok(Tell::for_ask(ask, results))
}

async fn shifted(ask: Ask) -> Result<Tell, std::io::Error> {
    let candidates: Vec<Parameter> = ask
        .parameters
        .iter()
        .map(|parameter| {
            Parameter::from(
                parameter
                    .values
                    .iter()
                    .map(|value| value + 1.0)
                    .collect::<Vec<f64>>(),
            )
        })
        .collect();
    let results = vec![0.0; candidates.len()];
    Ok(Tell::for_ask(ask, results).with_candidates(candidates))
}

fn tells(transport: &MockTransport) -> Vec<(u64, Tell)> {
    transport
        .sent()
        .into_iter()
        .filter_map(|message| match message.payload {
            Payload::Tell(tell) => Some((message.sequential_message_id, tell)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn optimization_round_trip() {
    initialize();

    let transport = MockTransport::new();
    transport.script([
        Step::Receive(ask_message(1, &["x", "y"], &[&[1.0, 2.0], &[3.0, 4.0]])),
        Step::Receive(ask_message(3, &["x", "y"], &[&[0.0, 0.5]])),
        Step::Receive(completion_message(5)),
    ]);

    let channel = Channel::create(&transport).await.unwrap();
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = finished.clone();

    let end = channel
        .connect(
            squares,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            Some(Duration::from_secs(3600)),
            Some(MESSAGE_TIMEOUT),
        )
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Completed);
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    let tells = tells(&transport);
    assert_eq!(tells.len(), 2);
    assert_eq!(tells[0].0, 2);
    assert_eq!(tells[0].1.results, vec![5.0, 25.0]);
    assert_eq!(tells[0].1.headers, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(tells[1].0, 4);
    assert_eq!(tells[1].1.results, vec![0.25]);

    let streams = transport.streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].channel_id, "channel-1");
    assert!(streams[0].closed);
}

#[tokio::test(start_paused = true)]
async fn candidates_are_sent_with_tell() {
    initialize();

    let transport = MockTransport::new();
    transport.script([
        Step::Receive(ask_message(1, &["x"], &[&[1.0], &[2.0]])),
        Step::Receive(completion_message(3)),
    ]);

    let channel = Channel::from_id(transport.clone(), "optimizer");
    channel
        .connect(shifted, || {}, None, Some(MESSAGE_TIMEOUT))
        .await
        .unwrap();

    let tells = tells(&transport);
    assert_eq!(
        tells[0].1.candidates,
        Some(vec![Parameter::from(vec![2.0]), Parameter::from(vec![3.0])])
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_channels_are_independent() {
    initialize();

    let objective = MockTransport::new();
    objective.script([
        Step::Receive(ask_message(1, &["x"], &[&[3.0]])),
        Step::Receive(completion_message(3)),
    ]);

    let optimizer = MockTransport::new();
    optimizer.script([
        Step::Receive(ask_message(1, &["x"], &[&[1.0]])),
        Step::Fail(Status::unavailable("connection reset")),
    ]);
    optimizer.script([
        Step::Receive(ask_message(1, &["x"], &[&[1.0]])),
        Step::Receive(ask_message(3, &["x"], &[&[2.0]])),
        Step::Receive(completion_message(5)),
    ]);

    let objective_channel = Channel::from_id(objective.clone(), "objective");
    let optimizer_channel = Channel::from_id(optimizer.clone(), "optimizer");

    let (objective_end, optimizer_end) = tokio::join!(
        objective_channel.connect(squares, || {}, None, Some(MESSAGE_TIMEOUT)),
        optimizer_channel.connect(shifted, || {}, None, Some(MESSAGE_TIMEOUT)),
    );

    assert_eq!(objective_end.unwrap(), SessionEnd::Completed);
    assert_eq!(optimizer_end.unwrap(), SessionEnd::Completed);

    assert_eq!(tells(&objective).len(), 1);
    let optimizer_tells: Vec<u64> = tells(&optimizer).into_iter().map(|(id, _)| id).collect();
    assert_eq!(optimizer_tells, vec![2, 4]);
    assert_eq!(optimizer.streams().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn silent_server_stalls_session() {
    initialize();

    let transport = MockTransport::new();
    transport.script([Step::Receive(ask_message(1, &["x"], &[&[1.0]])), Step::Stall]);

    let channel = Channel::from_id(transport.clone(), "quiet");
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = finished.clone();

    let end = channel
        .connect(
            squares,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
            Some(MESSAGE_TIMEOUT),
        )
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Stalled);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(transport.streams()[0].closed);
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnects_surface_transport_error() {
    initialize();

    let transport = MockTransport::new();
    transport.script([Step::Fail(Status::internal("stream broken"))]);
    transport.fail_ready(Status::unavailable("no route"));

    let channel = Channel::from_id(transport.clone(), "broken");
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = finished.clone();

    let conf = SessionConf::default()
        .message_timeout(Some(MESSAGE_TIMEOUT))
        .reconnect(
            ReconnectPolicy::default().with_retry(Retry::Attempts(3, Duration::from_millis(500))),
        );

    let result = channel
        .connect_with_conf(
            squares,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            conf,
        )
        .await;

    match result {
        Err(err @ Error::Transport(_)) => assert_eq!(err.code(), Some(Code::Internal)),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        transport.ready_calls(),
        vec![
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(1500),
        ]
    );
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_is_not_retried() {
    initialize();

    let transport = MockTransport::new();
    transport.fail_open(Status::permission_denied("not your channel"));

    let channel = Channel::from_id(transport.clone(), "foreign");
    let result = channel
        .connect(squares, || {}, None, Some(MESSAGE_TIMEOUT))
        .await;

    assert!(matches!(result, Err(Error::PermissionDenied(_))));
    assert!(transport.ready_calls().is_empty());
}
