//! Local broker over real sockets: network clients talking to each other
//! and to the device's own session.

use std::time::Duration;

use crate::mock_hw::TestClient;

use doorbell::app::ports::{BusError, InboundMessage, MessageBus};
use doorbell::mqtt::LocalBroker;

const CONNACK: u8 = 0x20;
const SUBACK: u8 = 0x90;

fn running_broker(max_clients: usize) -> LocalBroker {
    let mut broker = LocalBroker::new(0, max_clients);
    broker.start().unwrap();
    broker
}

fn port(broker: &LocalBroker) -> u16 {
    broker.local_addr().unwrap().port()
}

/// Poll the broker and drain `clients` until `done` holds.
fn pump(
    broker: &mut LocalBroker,
    clients: &mut [&mut TestClient],
    done: impl Fn(&[&mut TestClient]) -> bool,
) {
    for _ in 0..100 {
        broker.poll();
        for client in clients.iter_mut() {
            client.drain();
        }
        if done(clients) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("broker did not settle");
}

#[test]
fn publication_reaches_other_subscriber() {
    let mut broker = running_broker(4);
    let mut listener = TestClient::connect(port(&broker), "listener");
    listener.subscribe(1, "doorRing");
    let mut talker = TestClient::connect(port(&broker), "talker");

    pump(&mut broker, &mut [&mut listener, &mut talker], |c| {
        c[0].acks.len() == 2 && c[1].acks.len() == 1
    });
    assert_eq!(listener.acks[0].0, CONNACK);
    assert_eq!(listener.acks[1], (SUBACK, vec![0, 1, 0]));

    talker.publish("doorRing", "hello");
    pump(&mut broker, &mut [&mut listener, &mut talker], |c| {
        !c[0].received.is_empty()
    });
    assert_eq!(listener.payloads("doorRing"), vec!["hello"]);
    assert!(talker.received.is_empty());
}

#[test]
fn wildcard_filter_is_refused() {
    let mut broker = running_broker(4);
    let mut client = TestClient::connect(port(&broker), "wild");
    client.subscribe(7, "door/#");

    pump(&mut broker, &mut [&mut client], |c| c[0].acks.len() == 2);
    assert_eq!(client.acks[1], (SUBACK, vec![0, 7, 0x80]));
}

#[test]
fn device_session_receives_commands_and_replies() {
    let mut broker = running_broker(4);
    broker.connect("device").unwrap();
    broker.subscribe("cmd").unwrap();

    let mut client = TestClient::connect(port(&broker), "phone");
    client.subscribe(1, "response");
    client.publish("cmd", "ping");

    let mut inbox = Vec::new();
    for _ in 0..100 {
        broker.poll();
        inbox.extend(std::iter::from_fn(|| broker.take_message()));
        if !inbox.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(
        inbox,
        vec![InboundMessage {
            topic: "cmd".into(),
            payload: "ping".into()
        }]
    );

    broker.publish("response", "pong").unwrap();
    pump(&mut broker, &mut [&mut client], |c| !c[0].received.is_empty());
    assert_eq!(client.payloads("response"), vec!["pong"]);
}

#[test]
fn clients_beyond_limit_are_refused() {
    let mut broker = running_broker(1);
    let mut first = TestClient::connect(port(&broker), "first");
    pump(&mut broker, &mut [&mut first], |c| c[0].acks.len() == 1);

    let mut second = TestClient::connect(port(&broker), "second");
    for _ in 0..10 {
        broker.poll();
        second.drain();
    }
    assert!(second.acks.is_empty());
    assert_eq!(broker.client_count(), 1);
}

#[test]
fn silent_client_frees_its_slot_after_keep_alive() {
    let mut broker = running_broker(1);
    let mut sleeper = TestClient::connect_with_keep_alive(port(&broker), "sleeper", 1);
    pump(&mut broker, &mut [&mut sleeper], |c| c[0].acks.len() == 1);
    assert_eq!(broker.client_count(), 1);

    std::thread::sleep(Duration::from_millis(1600));
    broker.poll();
    assert_eq!(broker.client_count(), 0);

    let mut fresh = TestClient::connect(port(&broker), "fresh");
    pump(&mut broker, &mut [&mut fresh], |c| c[0].acks.len() == 1);
    assert_eq!(fresh.acks[0], (CONNACK, vec![0, 0]));
}

#[test]
fn stopped_broker_drops_device_session() {
    let mut broker = running_broker(4);
    broker.connect("device").unwrap();
    assert!(broker.is_connected());

    broker.stop();
    assert!(!broker.is_connected());
    assert_eq!(broker.publish("doorRing", "x"), Err(BusError::NotConnected));
    assert_eq!(broker.connect("device"), Err(BusError::BrokerDown));
}
