//! End-to-end handshake scenarios over scripted collaborators.

use handshake::{
    Config, DatagramKind, DriveError, FlowState, HandshakeState, InfoEvent, ProtocolVersion,
    RecordKind, Role, Transport,
};
use test_support::{
    Fixture, Observed, Recorder, client_fresh, client_headers, client_plan, server_fresh,
    server_headers, server_plan, server_renegotiate_plan,
};

fn callback_count(trace: &[Observed], event: InfoEvent) -> usize {
    trace
        .iter()
        .filter(|observed| matches!(observed, Observed::Callback(e, _) if *e == event))
        .count()
}

fn record_writes(trace: &[Observed]) -> Vec<RecordKind> {
    trace
        .iter()
        .filter_map(|observed| match observed {
            Observed::RecordWrite(kind) => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn client_fresh_stream_completes_in_one_call() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    assert_eq!(fixture.session.flow_state(), FlowState::Uninited);
    assert_eq!(fixture.session.hand_state(), HandshakeState::Ok);
    assert!(fixture.session.is_finished());
    assert!(fixture.session.client_app_data_allowed());

    let stats = fixture.ctx.stats();
    assert_eq!(stats.sess_connect(), 1);
    assert_eq!(stats.sess_connect_renegotiate(), 0);
    assert_eq!(stats.sess_accept(), 0);
    assert_eq!(stats.sess_accept_renegotiate(), 0);
}

#[test]
fn start_and_exit_callbacks_fire_exactly_once_on_success() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let trace = fixture.recorder.snapshot();
    assert_eq!(callback_count(&trace, InfoEvent::HandshakeStart), 1);
    assert_eq!(callback_count(&trace, InfoEvent::ConnectExit), 1);
    assert_eq!(
        trace.last(),
        Some(&Observed::Callback(InfoEvent::ConnectExit, 1))
    );
}

#[test]
fn one_loop_event_per_header_and_write_transition() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let trace = fixture.recorder.snapshot();
    let headers = trace
        .iter()
        .filter(|o| matches!(o, Observed::HeaderRead(_)))
        .count();
    let transitions = trace
        .iter()
        .filter(|o| matches!(o, Observed::TransitionWrite))
        .count();
    assert_eq!(headers, 4);
    assert_eq!(transitions, 7);
    assert_eq!(
        callback_count(&trace, InfoEvent::ConnectLoop),
        headers + transitions
    );
    assert_eq!(callback_count(&trace, InfoEvent::AcceptLoop), 0);
}

#[test]
fn change_cipher_spec_routes_through_its_own_record_path() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    assert_eq!(
        record_writes(&fixture.recorder.snapshot()),
        vec![
            RecordKind::Handshake,
            RecordKind::Handshake,
            RecordKind::ChangeCipherSpec,
            RecordKind::Handshake,
        ]
    );
}

#[test]
fn transition_hooks_run_once_per_message() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let trace = fixture.recorder.snapshot();
    let reads = trace
        .iter()
        .filter(|o| matches!(o, Observed::TransitionRead(_)))
        .count();
    assert_eq!(reads, 4);
}

#[test]
fn single_suspension_resumes_transparently() {
    let mut baseline = client_fresh(Transport::Stream, &[]);
    baseline.session.drive(Role::Client).expect("handshake completes");

    // Block the fourth transport operation once.
    let mut fixture = client_fresh(Transport::Stream, &[3]);
    assert!(matches!(
        fixture.session.drive(Role::Client),
        Err(DriveError::WouldBlock)
    ));
    fixture.session.drive(Role::Client).expect("resumed handshake completes");

    assert_eq!(
        fixture.recorder.trace_without_exits(),
        baseline.recorder.trace_without_exits()
    );
    assert_eq!(fixture.ctx.stats().sess_connect(), 1);
}

#[test]
fn suspension_reports_a_negative_exit_value() {
    let mut fixture = client_fresh(Transport::Stream, &[0]);
    assert!(matches!(
        fixture.session.drive(Role::Client),
        Err(DriveError::WouldBlock)
    ));
    assert_eq!(
        fixture.recorder.snapshot().last(),
        Some(&Observed::Callback(InfoEvent::ConnectExit, -1))
    );

    fixture.session.drive(Role::Client).expect("resumed handshake completes");
    assert_eq!(
        fixture.recorder.snapshot().last(),
        Some(&Observed::Callback(InfoEvent::ConnectExit, 1))
    );
}

#[test]
fn server_fresh_stream_completes() {
    let mut fixture = server_fresh(true);
    fixture.session.drive(Role::Server).expect("handshake completes");

    assert_eq!(fixture.session.hand_state(), HandshakeState::Ok);
    assert_eq!(fixture.ctx.stats().sess_accept(), 1);
    assert_eq!(fixture.ctx.stats().sess_accept_renegotiate(), 0);

    let trace = fixture.recorder.snapshot();
    assert_eq!(callback_count(&trace, InfoEvent::AcceptLoop), 11);
    assert_eq!(callback_count(&trace, InfoEvent::ConnectLoop), 0);
    assert_eq!(record_writes(&trace).len(), 5);
}

#[test]
fn first_server_write_iteration_defers_to_the_peer() {
    // The server has nothing to say before the ClientHello: its first write
    // transition finishes the phase without preparing or constructing
    // anything.
    let mut fixture = server_fresh(true);
    fixture.session.drive(Role::Server).expect("handshake completes");

    let trace = fixture.recorder.snapshot();
    let first_header = trace
        .iter()
        .position(|o| matches!(o, Observed::HeaderRead(_)))
        .expect("a header is read");
    let before_first_header = &trace[..first_header];

    assert_eq!(
        before_first_header
            .iter()
            .filter(|o| matches!(o, Observed::TransitionWrite))
            .count(),
        1
    );
    assert!(
        !before_first_header
            .iter()
            .any(|o| matches!(o, Observed::PreWork(_) | Observed::Construct))
    );
}

#[test]
fn datagram_client_stops_the_timer_at_each_read_phase_end() {
    let mut fixture = client_fresh(Transport::Datagram(DatagramKind::Udp), &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let trace = fixture.recorder.snapshot();
    let stops = trace
        .iter()
        .filter(|o| matches!(o, Observed::TimerStop))
        .count();
    let starts = trace
        .iter()
        .filter(|o| matches!(o, Observed::TimerStart))
        .count();
    // One stop per read-phase boundary, one start per send.
    assert_eq!(stops, 2);
    assert_eq!(starts, 4);
    // Datagram bodies arrive with their headers.
    assert!(!trace.iter().any(|o| matches!(o, Observed::BodyRead(_))));
}

#[test]
fn datagram_bodies_keep_their_declared_length() {
    let mut fixture = client_fresh(Transport::Datagram(DatagramKind::Udp), &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let lengths: Vec<usize> = fixture
        .recorder
        .snapshot()
        .iter()
        .filter_map(|o| match o {
            Observed::ProcessMessage(len) => Some(*len),
            _ => None,
        })
        .collect();
    assert_eq!(lengths, vec![90, 1024, 0, 12]);
}

#[test]
fn renegotiation_reenters_initialization() {
    let (mut write_plan, read_plan) = server_plan(true);
    write_plan.extend(server_renegotiate_plan());
    let config = handshake::Config::builder()
        .version(handshake::ProtocolVersion::Tls12)
        .build();
    let mut fixture = Fixture::assemble(config, server_headers(), write_plan, read_plan, &[]);

    fixture.session.drive(Role::Server).expect("fresh handshake completes");
    assert_eq!(fixture.session.flow_state(), FlowState::Uninited);
    assert_eq!(fixture.session.hand_state(), HandshakeState::Ok);

    fixture.session.mark_renegotiate();
    assert_eq!(fixture.session.flow_state(), FlowState::Renegotiate);
    // The handshake position survives renegotiation entry: the server
    // transitions from its completed position to HelloRequest.
    assert_eq!(fixture.session.hand_state(), HandshakeState::Ok);

    fixture.session.drive(Role::Server).expect("renegotiation completes");
    assert_eq!(fixture.session.flow_state(), FlowState::Uninited);

    let stats = fixture.ctx.stats();
    assert_eq!(stats.sess_accept(), 1);
    assert_eq!(stats.sess_accept_renegotiate(), 1);

    let trace = fixture.recorder.snapshot();
    assert_eq!(callback_count(&trace, InfoEvent::HandshakeStart), 2);
    assert!(fixture.session.session_state().is_renegotiating());
}

#[test]
fn session_callback_shadows_the_context_callback() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    let shadow = Recorder::new();
    let log = shadow.clone();
    fixture
        .session
        .set_info_callback(Box::new(move |_state, event, value| {
            log.log(Observed::Callback(event, value));
        }));
    fixture.session.drive(Role::Client).expect("handshake completes");

    // The context-level callback saw nothing; the session-level one saw the
    // full notification stream.
    assert!(
        fixture
            .recorder
            .snapshot()
            .iter()
            .all(|o| !matches!(o, Observed::Callback(..)))
    );
    assert_eq!(
        shadow.count(|o| matches!(o, Observed::Callback(InfoEvent::HandshakeStart, _))),
        1
    );
    assert_eq!(
        shadow.count(|o| matches!(o, Observed::Callback(InfoEvent::ConnectLoop, _))),
        11
    );
    assert_eq!(
        shadow.count(|o| matches!(o, Observed::Callback(InfoEvent::ConnectExit, 1))),
        1
    );
}

#[test]
fn pending_heartbeats_are_cancelled_at_handshake_entry() {
    let config = Config::builder()
        .version(ProtocolVersion::Dtls12)
        .transport(Transport::Datagram(DatagramKind::Udp))
        .heartbeat(true)
        .build();
    let (write_plan, read_plan) = client_plan();
    let mut fixture = Fixture::assemble(config, client_headers(), write_plan, read_plan, &[]);

    fixture
        .session
        .session_state_mut()
        .heartbeat_mut()
        .expect("heartbeat extension enabled")
        .set_response_pending(true);

    fixture.session.drive(Role::Client).expect("handshake completes");

    let heartbeat = fixture.session.session_state().heartbeat().unwrap();
    assert!(!heartbeat.response_pending());
    assert_eq!(heartbeat.sequence(), 1);

    // The cancellation stopped the datagram timer before anything else
    // happened, ahead of the two read-phase stops.
    let trace = fixture.recorder.snapshot();
    assert_eq!(trace.first(), Some(&Observed::TimerStop));
    assert_eq!(
        trace.iter().filter(|o| matches!(o, Observed::TimerStop)).count(),
        3
    );
}

#[test]
fn session_state_is_reset_for_the_client_hello() {
    let mut fixture = client_fresh(Transport::Stream, &[]);
    fixture.session.drive(Role::Client).expect("handshake completes");

    let state = fixture.session.session_state();
    assert_eq!(state.role(), Role::Client);
    assert_eq!(state.client_random(), &[0; 32]);
    assert!(!state.session_hit());
    assert!(!state.certificate_request());
    assert_eq!(state.in_handshake(), 0);
}
