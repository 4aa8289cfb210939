//! Behavioural tests for gateway sessions using `rstest-bdd`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::error::CallError;
use crate::notification::Notification;
use crate::payload::Raw;
use crate::session::{PendingReply, Session};
use crate::tests::support::{FakePeer, connected, quiet_config};

struct SessionWorld {
    session: Option<Session>,
    peer: Option<FakePeer>,
    calls: HashMap<String, PendingReply<Raw>>,
    notifications: Option<mpsc::UnboundedReceiver<Notification>>,
    runtime: Runtime,
}

impl SessionWorld {
    fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime should build");
        Self {
            session: None,
            peer: None,
            calls: HashMap::new(),
            notifications: None,
            runtime,
        }
    }

    fn session(&self) -> &Session {
        self.session.as_ref().expect("session should be connected")
    }
}

#[fixture]
fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}

/// A quoted method or notification name from a feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuotedName(String);

impl FromStr for QuotedName {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self(raw.trim_matches('"').to_owned()))
    }
}

impl QuotedName {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[given("a session connected to a scripted gateway")]
fn given_connected_session(world: &RefCell<SessionWorld>) {
    let mut state = world.borrow_mut();
    let (sender, receiver) = mpsc::unbounded_channel();
    let builder = Session::builder(quiet_config()).notification_handler(sender);
    let (session, peer) = state.runtime.block_on(connected(builder));
    state.session = Some(session);
    state.peer = Some(peer);
    state.notifications = Some(receiver);
}

#[when("the client calls {method} with payload byte {byte}")]
fn when_client_calls(world: &RefCell<SessionWorld>, method: QuotedName, byte: u8) {
    let mut state = world.borrow_mut();
    let name = method.0;
    let pending = state
        .runtime
        .block_on(state.session().issue::<Raw, Raw>(&name, &Raw::from(vec![byte])))
        .expect("issue should succeed");
    state.calls.insert(name, pending);
}

#[when("the gateway answers request {sequence} with payload byte {byte}")]
fn when_gateway_answers(world: &RefCell<SessionWorld>, sequence: u16, byte: u8) {
    let mut state = world.borrow_mut();
    let SessionWorld { runtime, peer, .. } = &mut *state;
    let gateway = peer.as_mut().expect("gateway should be running");
    runtime.block_on(gateway.reply(sequence, &[byte]));
}

#[when("the gateway sends a frame of {len} bytes")]
fn when_gateway_sends_short_frame(world: &RefCell<SessionWorld>, len: usize) {
    let mut state = world.borrow_mut();
    let SessionWorld { runtime, peer, .. } = &mut *state;
    let gateway = peer.as_mut().expect("gateway should be running");
    runtime.block_on(gateway.send_raw(vec![0x03; len]));
}

#[when("the gateway pushes the notification {name}")]
fn when_gateway_notifies(world: &RefCell<SessionWorld>, name: QuotedName) {
    let mut state = world.borrow_mut();
    let SessionWorld { runtime, peer, .. } = &mut *state;
    let gateway = peer.as_mut().expect("gateway should be running");
    runtime.block_on(gateway.notify(name.as_str(), &[]));
}

#[when("the session is closed")]
fn when_session_closed(world: &RefCell<SessionWorld>) {
    let state = world.borrow();
    state.runtime.block_on(state.session().close());
}

#[then("the gateway receives request {sequence} for {method}")]
fn then_gateway_receives(world: &RefCell<SessionWorld>, sequence: u16, method: QuotedName) {
    let mut state = world.borrow_mut();
    let SessionWorld { runtime, peer, .. } = &mut *state;
    let gateway = peer.as_mut().expect("gateway should be running");
    let request = runtime.block_on(gateway.next_request());
    assert_eq!(request.sequence, sequence);
    assert_eq!(request.name, method.as_str());
}

#[then("the call to {method} resolves with payload byte {byte}")]
fn then_call_resolves(world: &RefCell<SessionWorld>, method: QuotedName, byte: u8) {
    let mut state = world.borrow_mut();
    let pending = state
        .calls
        .remove(method.as_str())
        .expect("call should have been issued");
    let reply = state.runtime.block_on(pending.wait()).expect("reply should arrive");
    assert_eq!(reply.as_bytes(), &[byte]);
}

#[then("the call to {method} is abandoned")]
fn then_call_abandoned(world: &RefCell<SessionWorld>, method: QuotedName) {
    let mut state = world.borrow_mut();
    let pending = state
        .calls
        .remove(method.as_str())
        .expect("call should have been issued");
    let outcome = state.runtime.block_on(pending.wait());
    assert!(matches!(outcome, Err(CallError::Abandoned { .. })));
}

#[then("calling {method} fails because the session is closed")]
fn then_call_rejected(world: &RefCell<SessionWorld>, method: QuotedName) {
    let state = world.borrow();
    let outcome = state.runtime.block_on(
        state
            .session()
            .issue::<Raw, Raw>(method.as_str(), &Raw::default()),
    );
    assert!(matches!(outcome, Err(CallError::Closed)));
}

#[then("the handler receives {name}")]
fn then_handler_receives(world: &RefCell<SessionWorld>, name: QuotedName) {
    let mut state = world.borrow_mut();
    let SessionWorld {
        runtime,
        notifications,
        ..
    } = &mut *state;
    let receiver = notifications.as_mut().expect("handler should be installed");
    let notification = runtime
        .block_on(async { tokio::time::timeout(Duration::from_secs(5), receiver.recv()).await })
        .expect("notification should arrive")
        .expect("channel should stay open");
    assert_eq!(notification.name, name.as_str());
}

#[scenario(path = "tests/features/gateway_session.feature")]
fn gateway_session_behaviour(world: RefCell<SessionWorld>) {
    let _ = world;
}
